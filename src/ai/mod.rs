//! Agent trait, the DQN algorithm, its value network and state encoding.

mod agent;
pub mod algorithms;
pub mod networks;
mod random;
pub mod state_encoding;

pub use agent::{Agent, Transition, UpdateMetrics};
pub use algorithms::{DqnAgent, DqnConfig};
pub use networks::{QNetwork, QNetworkConfig};
pub use random::RandomAgent;
