use serde::{Deserialize, Serialize};

use crate::ai::DqnConfig;
use crate::env::EnvConfig;

/// Metrics snapshot at checkpoint time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    /// Mean score of the greedy evaluation run for this checkpoint.
    pub eval_score: f32,
    pub average_score: f32,
    pub best_score: u32,
    pub average_reward: f32,
    pub current_loss: f32,
    pub training_steps: usize,
    pub epsilon: f32,
}

/// Top-level checkpoint metadata written to metadata.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub episode: usize,
    pub timestamp: u64,
    pub algorithm: String,
    pub metrics: CheckpointMetrics,
    pub hyperparameters: DqnConfig,
    /// Absent in checkpoints written before the environment was recorded.
    #[serde(default)]
    pub env: EnvConfig,
}

/// DQN-specific training state written to training_state.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqnTrainingState {
    pub epsilon: f32,
    pub step_count: usize,
    pub episode_count: usize,
    pub learning_rate: f64,
    pub gamma: f32,
    pub epsilon_start: f32,
    pub epsilon_min: f32,
    pub epsilon_decay: f32,
    pub replay_capacity: usize,
    pub hidden_sizes: Vec<usize>,
}
