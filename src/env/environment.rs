use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::body::{Action, AgentBody, Obstacle};
use super::state::StateVector;
use crate::error::{ConfigError, EnvError};

/// World geometry, physics constants and reward schedule.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub world_width: f32,
    pub world_height: f32,
    /// Height of the ground band at the bottom of the world.
    pub ground_height: f32,
    pub body_x: f32,
    pub body_width: f32,
    pub body_height: f32,
    pub start_y: f32,
    pub gravity: f32,
    pub flap_impulse: f32,
    pub scroll_speed: f32,
    pub obstacle_width: f32,
    pub gap_height: f32,
    /// Keeps spawned gaps away from the ceiling and the ground.
    pub gap_margin: f32,
    pub max_obstacles: usize,
    /// A new obstacle spawns once the last one is this far from the right edge.
    pub spawn_spacing: f32,
    pub survival_reward: f32,
    pub pass_reward: f32,
    pub crash_penalty: f32,
}

impl Default for EnvConfig {
    fn default() -> Self {
        EnvConfig {
            world_width: 288.0,
            world_height: 512.0,
            ground_height: 70.0,
            body_x: 50.0,
            body_width: 34.0,
            body_height: 24.0,
            start_y: 256.0,
            gravity: 0.5,
            flap_impulse: -8.0,
            scroll_speed: 3.0,
            obstacle_width: 52.0,
            gap_height: 100.0,
            gap_margin: 50.0,
            max_obstacles: 3,
            spawn_spacing: 150.0,
            survival_reward: 0.2,
            pass_reward: 2.0,
            crash_penalty: -1.0,
        }
    }
}

impl EnvConfig {
    /// Inclusive range the gap center is drawn from.
    pub fn gap_center_range(&self) -> (f32, f32) {
        (
            self.gap_height + self.gap_margin,
            self.world_height - self.gap_margin - self.gap_height,
        )
    }

    /// Lowest y the body's bottom edge may reach before hitting the ground.
    pub fn ground_y(&self) -> f32 {
        self.world_height - self.ground_height
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world_width <= 0.0 || self.world_height <= 0.0 {
            return Err(ConfigError::Validation(
                "env.world_width and env.world_height must be > 0".into(),
            ));
        }
        if self.ground_height < 0.0 || self.ground_height >= self.world_height {
            return Err(ConfigError::Validation(
                "env.ground_height must be in [0, world_height)".into(),
            ));
        }
        if self.obstacle_width <= 0.0 || self.gap_height <= 0.0 {
            return Err(ConfigError::Validation(
                "env.obstacle_width and env.gap_height must be > 0".into(),
            ));
        }
        let (low, high) = self.gap_center_range();
        if low > high {
            return Err(ConfigError::Validation(
                "env.gap_margin leaves no room for the gap".into(),
            ));
        }
        if self.start_y <= 0.0 || self.start_y + self.body_height >= self.ground_y() {
            return Err(ConfigError::Validation(
                "env.start_y must place the body between the ceiling and the ground".into(),
            ));
        }
        if self.scroll_speed <= 0.0 {
            return Err(ConfigError::Validation(
                "env.scroll_speed must be > 0".into(),
            ));
        }
        if self.max_obstacles == 0 {
            return Err(ConfigError::Validation(
                "env.max_obstacles must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

/// Lifecycle of an [`Environment`]. Only `Ready` accepts `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvStatus {
    Ready,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepInfo {
    pub score: u32,
}

/// Result of a single [`Environment::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub state: StateVector,
    pub reward: f32,
    pub terminal: bool,
    pub info: StepInfo,
}

/// Side-scrolling obstacle course.
///
/// A new environment starts `Terminated`; call [`Environment::reset`] before
/// the first step. All randomness (gap placement) is drawn from the injected
/// RNG, so two environments built from the same seed replay identically.
pub struct Environment {
    config: EnvConfig,
    body: AgentBody,
    obstacles: VecDeque<Obstacle>,
    score: u32,
    ticks: u64,
    status: EnvStatus,
    rng: StdRng,
}

impl Environment {
    pub fn new(config: EnvConfig, rng: StdRng) -> Self {
        let body = Self::initial_body(&config);
        Environment {
            obstacles: VecDeque::with_capacity(config.max_obstacles + 1),
            config,
            body,
            score: 0,
            ticks: 0,
            status: EnvStatus::Terminated,
            rng,
        }
    }

    pub fn from_seed(config: EnvConfig, seed: u64) -> Self {
        Self::new(config, StdRng::seed_from_u64(seed))
    }

    fn initial_body(config: &EnvConfig) -> AgentBody {
        AgentBody {
            x: config.body_x,
            y: config.start_y,
            velocity: 0.0,
            width: config.body_width,
            height: config.body_height,
        }
    }

    /// Start a new episode and return its first observation.
    pub fn reset(&mut self) -> StateVector {
        self.body = Self::initial_body(&self.config);
        self.obstacles.clear();
        self.spawn_obstacle();
        self.score = 0;
        self.ticks = 0;
        self.status = EnvStatus::Ready;
        self.observe()
    }

    /// Advance the simulation by one tick.
    pub fn step(&mut self, action: usize) -> Result<StepOutcome, EnvError> {
        if self.status == EnvStatus::Terminated {
            return Err(EnvError::InvalidState);
        }
        let action = Action::try_from(action)?;

        let mut reward = self.config.survival_reward;

        if action == Action::Flap {
            self.body.velocity = self.config.flap_impulse;
        }
        self.body.velocity += self.config.gravity;
        self.body.y += self.body.velocity;

        let width = self.config.obstacle_width;
        for obs in self.obstacles.iter_mut() {
            obs.x -= self.config.scroll_speed;
            if !obs.passed && obs.trailing_edge(width) < self.body.x {
                obs.passed = true;
                self.score += 1;
                reward += self.config.pass_reward;
            }
        }

        while self.obstacles.front().is_some_and(|obs| obs.x <= -width) {
            self.obstacles.pop_front();
        }

        if self.needs_obstacle() {
            self.spawn_obstacle();
        }

        let terminal = self.check_collision();
        if terminal {
            reward = self.config.crash_penalty;
            self.status = EnvStatus::Terminated;
        }
        self.ticks += 1;

        Ok(StepOutcome {
            state: self.observe(),
            reward,
            terminal,
            info: StepInfo { score: self.score },
        })
    }

    fn needs_obstacle(&self) -> bool {
        if self.obstacles.len() >= self.config.max_obstacles {
            return false;
        }
        match self.obstacles.back() {
            None => true,
            Some(last) => last.x < self.config.world_width - self.config.spawn_spacing,
        }
    }

    fn spawn_obstacle(&mut self) {
        let (low, high) = self.config.gap_center_range();
        let center = self.rng.random_range(low..=high);
        self.obstacles.push_back(Obstacle::new(
            self.config.world_width,
            center,
            self.config.gap_height,
        ));
    }

    fn check_collision(&self) -> bool {
        if self.body.y <= 0.0 || self.body.bottom() >= self.config.ground_y() {
            return true;
        }
        self.obstacles
            .iter()
            .any(|obs| obs.collides_with(&self.body, self.config.obstacle_width))
    }

    /// The obstacle the body has to clear next: the first unpassed one still
    /// ahead of the body, else the front of the queue.
    pub fn next_obstacle(&self) -> Option<&Obstacle> {
        let width = self.config.obstacle_width;
        self.obstacles
            .iter()
            .find(|obs| !obs.passed && obs.trailing_edge(width) > self.body.x)
            .or_else(|| self.obstacles.front())
    }

    /// Current observation. Never cached; derived from the live state.
    pub fn observe(&self) -> StateVector {
        StateVector::observe(
            &self.body,
            self.next_obstacle(),
            self.config.world_width,
            self.config.world_height,
        )
    }

    pub fn body(&self) -> &AgentBody {
        &self.body
    }

    pub fn obstacles(&self) -> &VecDeque<Obstacle> {
        &self.obstacles
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn status(&self) -> EnvStatus {
        self.status
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }
}
