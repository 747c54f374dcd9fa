#![recursion_limit = "256"]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use flappy_dqn::config::AppConfig;
use flappy_dqn::error::{CheckpointError, TrainingError};
use flappy_dqn::training::Trainer;

/// Train a DQN agent on the flappy environment.
#[derive(Parser)]
#[command(name = "train", about = "Train a DQN agent headlessly")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override number of training episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Override learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Override the base random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Resume training from the latest checkpoint
    #[arg(long)]
    resume: bool,

    /// Override the checkpoint directory
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    let mut app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(episodes) = cli.episodes {
        app_config.training.num_episodes = episodes;
    }
    if let Some(lr) = cli.lr {
        app_config.dqn.learning_rate = lr;
    }
    if let Some(seed) = cli.seed {
        app_config.training.seed = seed;
    }
    if let Some(dir) = cli.checkpoint_dir {
        app_config.checkpoint.checkpoint_dir = dir;
    }
    app_config
        .validate()
        .context("validating configuration after CLI overrides")?;

    let trainer = Trainer::new(app_config.training.clone(), app_config.checkpoint.clone());
    let mut env = trainer.seeded_env(app_config.env.clone());
    let mut agent = trainer.seeded_agent(app_config.dqn.clone());

    if cli.resume {
        match trainer.resume(&mut agent, None) {
            Ok(_) => {}
            Err(TrainingError::Checkpoint(CheckpointError::NoLatestSymlink(dir))) => {
                tracing::warn!(dir = %dir.display(), "no checkpoint to resume from, starting fresh");
            }
            Err(e) => return Err(e).context("resuming from latest checkpoint"),
        }
    }

    let metrics = trainer
        .train(&mut agent, &mut env)
        .context("training failed")?;

    tracing::info!(
        episodes = metrics.total_episodes(),
        best_score = metrics.best_score(),
        avg_score = metrics.average_score(100),
        epsilon = agent.epsilon(),
        checkpoints = %trainer.checkpoint_manager().checkpoint_dir().display(),
        "done"
    );
    Ok(())
}
