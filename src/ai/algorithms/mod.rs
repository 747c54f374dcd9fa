mod dqn;

pub use dqn::{DqnAgent, DqnConfig};
