#![recursion_limit = "256"]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use flappy_dqn::ai::DqnAgent;
use flappy_dqn::checkpoint::CheckpointManager;
use flappy_dqn::config::AppConfig;
use flappy_dqn::env::Environment;
use flappy_dqn::training::play_episode;

/// Play a trained DQN agent and report its scores.
#[derive(Parser)]
#[command(name = "flappy_dqn", about = "Evaluate a trained DQN agent")]
struct Cli {
    /// Checkpoint directory, or a policy file saved by the agent
    #[arg(long, default_value = "checkpoints/latest")]
    model: PathBuf,

    /// Number of episodes to play
    #[arg(long, default_value_t = 10)]
    episodes: usize,

    /// Exploration rate while playing (0 plays greedily)
    #[arg(long, default_value_t = 0.0)]
    epsilon: f32,

    /// Configuration used when `--model` is a bare policy file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    let app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // A checkpoint directory carries the configuration the network was
    // trained with; a bare policy file relies on --config.
    let (dqn_config, env_config, policy_path) = if cli.model.is_dir() {
        let manager = CheckpointManager::new(app_config.checkpoint.clone());
        let data = manager
            .load_checkpoint(&cli.model)
            .with_context(|| format!("reading checkpoint {}", cli.model.display()))?;
        tracing::info!(
            episode = data.metadata.episode,
            eval_score = data.metadata.metrics.eval_score,
            "loaded checkpoint metadata"
        );
        let policy_path = data.policy_path();
        (data.metadata.hyperparameters, data.metadata.env, policy_path)
    } else {
        (app_config.dqn.clone(), app_config.env.clone(), cli.model.clone())
    };
    env_config
        .validate()
        .context("validating environment configuration")?;

    let seed = app_config.training.seed;
    let mut agent = DqnAgent::from_seed(dqn_config, seed);
    agent
        .load(&policy_path)
        .with_context(|| format!("loading model {}", policy_path.display()))?;
    agent.set_epsilon(cli.epsilon.clamp(0.0, 1.0));
    let explore = cli.epsilon > 0.0;

    let mut env = Environment::from_seed(env_config, seed);
    let max_steps = app_config.training.max_steps_per_episode;
    let mut total_score = 0u64;
    let mut best_score = 0u32;
    for episode in 1..=cli.episodes {
        let result = play_episode(&mut env, &mut agent, max_steps, explore)
            .context("playing evaluation episode")?;
        println!(
            "Episode {:>4}: score {:>4} | reward {:>8.2} | steps {:>6}{}",
            episode,
            result.score,
            result.total_reward,
            result.steps,
            if result.crashed { "" } else { " (step cap)" }
        );
        total_score += u64::from(result.score);
        best_score = best_score.max(result.score);
    }

    if cli.episodes > 0 {
        println!(
            "Average score over {} episodes: {:.2} (best {})",
            cli.episodes,
            total_score as f64 / cli.episodes as f64,
            best_score
        );
    }
    Ok(())
}
