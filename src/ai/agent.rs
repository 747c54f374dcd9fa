use crate::env::{Action, StateVector};

/// One (state, action, reward, next state, terminal) record of interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub state: StateVector,
    pub action: Action,
    pub reward: f32,
    pub next_state: StateVector,
    pub terminal: bool,
}

/// Metrics returned from a training update.
#[derive(Debug, Clone, Default)]
pub struct UpdateMetrics {
    pub loss: f32,
    pub mean_q: f32,
}

/// Universal interface for anything that can drive the environment.
pub trait Agent {
    /// Select an action given the current observation.
    /// When `explore` is true, the agent may explore; otherwise it exploits.
    fn select_action(&mut self, state: &StateVector, explore: bool) -> usize;

    /// Return the agent's display name.
    fn name(&self) -> &str;
}
