use clap::{Parser, Subcommand};
use std::path::PathBuf;
use workflow::config::PipelineConfig;
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Offline satellite-health training workflow driver")]
struct Args {
    /// Load a pipeline config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the dataset/artifact directory
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

/// Pipeline stages, in run order.
#[derive(Subcommand)]
enum Command {
    /// Produce the synthetic telemetry and anomaly tables
    Generate,
    /// Engineer features and write the train/test dataset dumps
    Preprocess,
    /// Fit the sequence anomaly classifier
    TrainAnomaly,
    /// Fit the battery-lifetime regressor
    TrainLifetime,
    /// Fit the root-cause classifier
    TrainRootCause,
    /// Convert the anomaly model for the web client
    Export,
    /// Run every stage in pipeline order
    All,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = args.config {
        PipelineConfig::load(path)?
    } else {
        PipelineConfig::default()
    };
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    let runner = Runner::new(config);
    match args.command {
        Command::Generate => runner.generate(),
        Command::Preprocess => runner.preprocess(),
        Command::TrainAnomaly => runner.train_anomaly(),
        Command::TrainLifetime => runner.train_lifetime(),
        Command::TrainRootCause => runner.train_root_cause(),
        Command::Export => runner.export(),
        Command::All => runner.run_all(),
    }
}
