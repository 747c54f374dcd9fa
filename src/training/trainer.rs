use std::path::Path;

use crate::ai::{DqnAgent, DqnConfig, RandomAgent};
use crate::checkpoint::{
    CheckpointData, CheckpointManager, CheckpointManagerConfig, CheckpointMetrics,
};
use crate::env::{EnvConfig, Environment};
use crate::error::{ConfigError, TrainingError};
use crate::training::episode::{derive_seed, evaluate, run_training_episode};
use crate::training::metrics::TrainingMetrics;

const ENV_STREAM: u64 = 0;
const AGENT_STREAM: u64 = 1;
const EVAL_STREAM: u64 = 2;
const BASELINE_STREAM: u64 = 3;

/// Trainer configuration. Log, eval and checkpoint intervals of 0 disable
/// the corresponding step.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub num_episodes: usize,
    pub max_steps_per_episode: usize,
    pub batch_size: usize,
    /// Episodes between target network syncs.
    pub target_sync_interval: usize,
    pub log_interval: usize,
    pub eval_interval: usize,
    pub eval_episodes: usize,
    pub checkpoint_interval: usize,
    /// Base seed; environment, agent and evaluation seeds derive from it.
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            num_episodes: 5_000,
            max_steps_per_episode: 10_000,
            batch_size: 32,
            target_sync_interval: 10,
            log_interval: 100,
            eval_interval: 500,
            eval_episodes: 10,
            checkpoint_interval: 1000,
            seed: 42,
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps_per_episode == 0 {
            return Err(ConfigError::Validation(
                "training.max_steps_per_episode must be > 0".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Validation(
                "training.batch_size must be > 0".into(),
            ));
        }
        if self.target_sync_interval == 0 {
            return Err(ConfigError::Validation(
                "training.target_sync_interval must be > 0".into(),
            ));
        }
        Ok(())
    }
}

fn is_due(interval: usize, episode: usize) -> bool {
    interval > 0 && episode % interval == 0
}

/// Episode-loop orchestrator for a DQN agent.
pub struct Trainer {
    config: TrainerConfig,
    checkpoint_manager: CheckpointManager,
}

impl Trainer {
    pub fn new(config: TrainerConfig, checkpoint_config: CheckpointManagerConfig) -> Self {
        Trainer {
            config,
            checkpoint_manager: CheckpointManager::new(checkpoint_config),
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn checkpoint_manager(&self) -> &CheckpointManager {
        &self.checkpoint_manager
    }

    /// Training environment seeded from the base seed.
    pub fn seeded_env(&self, env_config: EnvConfig) -> Environment {
        Environment::from_seed(env_config, derive_seed(self.config.seed, ENV_STREAM))
    }

    /// Fresh agent seeded from the base seed.
    pub fn seeded_agent(&self, dqn_config: DqnConfig) -> DqnAgent {
        DqnAgent::from_seed(dqn_config, derive_seed(self.config.seed, AGENT_STREAM))
    }

    /// Restore `agent` from the checkpoint at `dir`, or from the latest one
    /// when `dir` is `None`.
    pub fn resume(
        &self,
        agent: &mut DqnAgent,
        dir: Option<&Path>,
    ) -> Result<CheckpointData, TrainingError> {
        let data = match dir {
            Some(dir) => self.checkpoint_manager.load_checkpoint(dir)?,
            None => self.checkpoint_manager.load_latest()?,
        };
        data.restore(agent)?;
        tracing::info!(
            path = %data.path.display(),
            episode = data.metadata.episode,
            epsilon = agent.epsilon(),
            "resumed from checkpoint"
        );
        Ok(data)
    }

    /// Run `num_episodes` episodes, continuing the agent's episode count.
    pub fn train(
        &self,
        agent: &mut DqnAgent,
        env: &mut Environment,
    ) -> Result<TrainingMetrics, TrainingError> {
        let mut metrics = TrainingMetrics::new();
        let mut eval_env = Environment::from_seed(
            env.config().clone(),
            derive_seed(self.config.seed, EVAL_STREAM),
        );

        let baseline_score = self.baseline_eval(env.config())?;

        let start_episode = agent.episode_count() + 1;
        let end_episode = agent.episode_count() + self.config.num_episodes;

        tracing::info!(
            episodes = self.config.num_episodes,
            start_episode,
            end_episode,
            batch_size = self.config.batch_size,
            baseline_score,
            "starting DQN training"
        );

        for episode in start_episode..=end_episode {
            let trace = run_training_episode(
                env,
                agent,
                self.config.max_steps_per_episode,
                self.config.batch_size,
            )?;
            for &loss in &trace.losses {
                metrics.record_update(loss);
            }
            metrics.record_episode(trace.result);

            if is_due(self.config.target_sync_interval, episode) {
                agent.sync_target();
                tracing::debug!(episode, "target network synced");
            }

            if is_due(self.config.log_interval, episode) {
                let window = self.config.log_interval;
                tracing::info!(
                    episode,
                    epsilon = agent.epsilon(),
                    loss = metrics.average_loss(window),
                    avg_score = metrics.average_score(window),
                    avg_reward = metrics.average_reward(window),
                    avg_len = metrics.average_length(window),
                    best = metrics.best_score(),
                    buffer = agent.buffer_len(),
                    "training progress"
                );
            }

            let eval_due = is_due(self.config.eval_interval, episode);
            let checkpoint_due = is_due(self.config.checkpoint_interval, episode);
            if !(eval_due || checkpoint_due) {
                continue;
            }

            // One evaluation serves both the log line and the checkpoint.
            let eval_score = self.greedy_eval(agent, &mut eval_env)?;
            metrics.record_eval(episode, eval_score);

            if eval_due {
                tracing::info!(
                    episode,
                    episodes = self.config.eval_episodes,
                    eval_score,
                    baseline_score,
                    "greedy evaluation"
                );
            }

            if checkpoint_due {
                let window = self.config.log_interval.max(1);
                let ckpt_metrics = CheckpointMetrics {
                    eval_score,
                    average_score: metrics.average_score(window),
                    best_score: metrics.best_score(),
                    average_reward: metrics.average_reward(window),
                    current_loss: metrics.average_loss(window),
                    training_steps: agent.step_count(),
                    epsilon: agent.epsilon(),
                };
                let path = self.checkpoint_manager.save_checkpoint(
                    agent,
                    env.config(),
                    &ckpt_metrics,
                    episode,
                )?;
                tracing::info!(
                    path = %path.display(),
                    episode,
                    eval_score,
                    "checkpoint saved"
                );
            }
        }

        tracing::info!(
            total_episodes = metrics.total_episodes(),
            best = metrics.best_score(),
            steps = agent.step_count(),
            "training complete"
        );
        Ok(metrics)
    }

    /// Mean score of a uniformly random policy on its own seeded environment.
    fn baseline_eval(&self, env_config: &EnvConfig) -> Result<f32, TrainingError> {
        let mut env = Environment::from_seed(
            env_config.clone(),
            derive_seed(self.config.seed, BASELINE_STREAM),
        );
        let mut random =
            RandomAgent::from_seed(derive_seed(self.config.seed, BASELINE_STREAM + 1));
        Ok(evaluate(
            &mut env,
            &mut random,
            self.config.eval_episodes,
            self.config.max_steps_per_episode,
        )?)
    }

    fn greedy_eval(
        &self,
        agent: &mut DqnAgent,
        eval_env: &mut Environment,
    ) -> Result<f32, TrainingError> {
        Ok(evaluate(
            eval_env,
            agent,
            self.config.eval_episodes,
            self.config.max_steps_per_episode,
        )?)
    }
}
