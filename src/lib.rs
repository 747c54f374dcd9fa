//! # Flappy DQN
//!
//! A side-scrolling "flap through the gaps" environment and a Deep Q-Network
//! agent that learns to play it, built on the Burn ML framework.
//!
//! ## Modules
//!
//! - [`env`]: world simulation, physics, rewards and the feature vector
//! - [`ai`]: agent trait, DQN algorithm, Q-network, state encoding
//! - [`training`]: episode runner, trainer loop, replay buffer, metrics
//! - [`checkpoint`]: model persistence and versioning
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: structured error types

#![recursion_limit = "256"]

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod env;
pub mod error;
pub mod training;
