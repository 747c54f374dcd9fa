//! Obstacle-course simulation: agent body, obstacle queue, feature extraction
//! and the reset/step state machine.

mod body;
mod environment;
mod state;

pub use body::{Action, AgentBody, Obstacle, ACTION_COUNT};
pub use environment::{EnvConfig, EnvStatus, Environment, StepInfo, StepOutcome};
pub use state::{StateVector, STATE_SIZE};
