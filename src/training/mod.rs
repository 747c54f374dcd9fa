//! Training infrastructure: episode runner, trainer loop, replay buffer and
//! metrics collection.

pub mod episode;
pub mod metrics;
pub mod replay_buffer;
pub mod trainer;

pub use episode::{derive_seed, evaluate, play_episode, run_training_episode, EpisodeTrace};
pub use metrics::{EpisodeResult, TrainingMetrics};
pub use replay_buffer::ReplayBuffer;
pub use trainer::{Trainer, TrainerConfig};
