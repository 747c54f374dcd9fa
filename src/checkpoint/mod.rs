//! Model persistence: versioned checkpoint directories with metadata,
//! a `latest` pointer, and pruning.

mod manager;
mod metadata;

pub use manager::{CheckpointData, CheckpointManager, CheckpointManagerConfig};
pub use metadata::{CheckpointMetadata, CheckpointMetrics, DqnTrainingState};
