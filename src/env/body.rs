use serde::{Deserialize, Serialize};

use crate::error::EnvError;

/// Number of discrete actions the environment accepts.
pub const ACTION_COUNT: usize = 2;

/// A discrete control input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Idle,
    Flap,
}

impl Action {
    pub fn index(self) -> usize {
        match self {
            Action::Idle => 0,
            Action::Flap => 1,
        }
    }
}

impl TryFrom<usize> for Action {
    type Error = EnvError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Action::Idle),
            1 => Ok(Action::Flap),
            other => Err(EnvError::InvalidAction(other)),
        }
    }
}

/// The controlled body. `y` is the top edge; the body never moves horizontally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentBody {
    pub x: f32,
    pub y: f32,
    pub velocity: f32,
    pub width: f32,
    pub height: f32,
}

impl AgentBody {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// A pipe pair with an open gap between `gap_top` and `gap_bottom`.
/// `x` is the leading (left) edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub x: f32,
    pub gap_top: f32,
    pub gap_bottom: f32,
    pub passed: bool,
}

impl Obstacle {
    /// Create an obstacle whose gap of `gap_height` is centered on `gap_center`.
    pub fn new(x: f32, gap_center: f32, gap_height: f32) -> Self {
        Obstacle {
            x,
            gap_top: gap_center - gap_height / 2.0,
            gap_bottom: gap_center + gap_height / 2.0,
            passed: false,
        }
    }

    pub fn gap_center(&self) -> f32 {
        (self.gap_top + self.gap_bottom) / 2.0
    }

    pub fn trailing_edge(&self, width: f32) -> f32 {
        self.x + width
    }

    /// Whether `body` overlaps this obstacle's columns while not fully inside
    /// the gap.
    pub fn collides_with(&self, body: &AgentBody, width: f32) -> bool {
        let overlaps_horizontally = self.x < body.right() && self.trailing_edge(width) > body.x;
        overlaps_horizontally && (body.y < self.gap_top || body.bottom() > self.gap_bottom)
    }
}
