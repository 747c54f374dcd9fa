use std::fs;
use std::path::{Path, PathBuf};

use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::{DefaultRecorder, FileRecorder, Recorder};
use burn::tensor::TensorData;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ai::agent::{Agent, Transition, UpdateMetrics};
use crate::ai::networks::{QNetwork, QNetworkConfig, QNetworkRecord};
use crate::ai::state_encoding::{encode_state, encode_states_batch};
use crate::checkpoint::DqnTrainingState;
use crate::env::{Action, StateVector, ACTION_COUNT, STATE_SIZE};
use crate::error::{EnvError, ModelError};
use crate::training::replay_buffer::ReplayBuffer;

type InferBackend = NdArray<f32>;
type TrainBackend = Autodiff<InferBackend>;

/// DQN hyperparameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    pub learning_rate: f64,
    pub gamma: f32,
    pub epsilon_start: f32,
    pub epsilon_min: f32,
    /// Multiplicative decay applied to epsilon after every learning step.
    pub epsilon_decay: f32,
    pub replay_capacity: usize,
    pub hidden_sizes: Vec<usize>,
    pub dropout: f64,
}

impl Default for DqnConfig {
    fn default() -> Self {
        DqnConfig {
            learning_rate: 5e-4,
            gamma: 0.99,
            epsilon_start: 1.0,
            epsilon_min: 0.01,
            epsilon_decay: 0.9995,
            replay_capacity: 50_000,
            hidden_sizes: vec![64, 64, 32],
            dropout: 0.2,
        }
    }
}

impl DqnConfig {
    fn network_config(&self) -> QNetworkConfig {
        QNetworkConfig::new(STATE_SIZE, ACTION_COUNT, self.hidden_sizes.clone())
            .with_dropout(self.dropout)
    }
}

/// DQN agent with policy + target networks, replay buffer, and Adam optimizer.
pub struct DqnAgent {
    q_network: QNetwork<TrainBackend>,
    target_network: QNetwork<InferBackend>,
    optimizer: burn::optim::adaptor::OptimizerAdaptor<burn::optim::Adam, QNetwork<TrainBackend>, TrainBackend>,
    replay_buffer: ReplayBuffer,
    config: DqnConfig,
    device: <TrainBackend as Backend>::Device,
    epsilon: f32,
    step_count: usize,
    episode_count: usize,
    rng: StdRng,
}

impl DqnAgent {
    /// Build an agent whose every random draw (weight init, exploration,
    /// replay sampling) derives from `rng`.
    pub fn new(config: DqnConfig, mut rng: StdRng) -> Self {
        let device = Default::default();
        TrainBackend::seed(rng.random());

        let q_network: QNetwork<TrainBackend> = config.network_config().init(&device);
        let target_network = q_network.valid();
        let optimizer = AdamConfig::new().init();

        let epsilon = config.epsilon_start;
        let replay_buffer = ReplayBuffer::new(config.replay_capacity);

        DqnAgent {
            q_network,
            target_network,
            optimizer,
            replay_buffer,
            config,
            device,
            epsilon,
            step_count: 0,
            episode_count: 0,
            rng,
        }
    }

    pub fn from_seed(config: DqnConfig, seed: u64) -> Self {
        Self::new(config, StdRng::seed_from_u64(seed))
    }

    /// Q-values of the policy network for `state`, one per action.
    pub fn q_values(&self, state: &StateVector) -> Vec<f32> {
        let input = encode_state::<InferBackend>(state, &self.device);
        self.q_network
            .valid()
            .forward(input)
            .into_data()
            .to_vec()
            .expect("f32 tensor data extraction")
    }

    /// Q-values of the target network for `state`.
    pub fn target_q_values(&self, state: &StateVector) -> Vec<f32> {
        let input = encode_state::<InferBackend>(state, &self.device);
        self.target_network
            .forward(input)
            .into_data()
            .to_vec()
            .expect("f32 tensor data extraction")
    }

    /// Select action: epsilon-greedy when exploring, greedy otherwise.
    fn pick_action(&mut self, state: &StateVector, explore: bool) -> usize {
        if explore && self.rng.random_range(0.0..1.0) < self.epsilon {
            return self.rng.random_range(0..ACTION_COUNT);
        }
        greedy_action(&self.q_values(state))
    }

    /// Store a transition in the replay buffer, evicting the oldest when full.
    /// Illegal actions are rejected and nothing is stored.
    pub fn record(
        &mut self,
        state: StateVector,
        action: usize,
        reward: f32,
        next_state: StateVector,
        terminal: bool,
    ) -> Result<(), EnvError> {
        self.record_transition(Transition {
            state,
            action: Action::try_from(action)?,
            reward,
            next_state,
            terminal,
        });
        Ok(())
    }

    pub fn record_transition(&mut self, transition: Transition) {
        self.replay_buffer.push(transition);
    }

    /// One gradient step on a uniformly sampled batch. Returns `None` without
    /// touching any state while the buffer holds fewer than `batch_size`
    /// transitions.
    pub fn learn(&mut self, batch_size: usize) -> Option<UpdateMetrics> {
        if batch_size == 0 || self.replay_buffer.len() < batch_size {
            return None;
        }
        let batch = self.replay_buffer.sample(&mut self.rng, batch_size);
        let metrics = self.train_step(&batch);
        self.decay_epsilon();
        Some(metrics)
    }

    /// Perform one gradient update on the policy network.
    fn train_step(&mut self, batch: &[Transition]) -> UpdateMetrics {
        let batch_size = batch.len();

        let states: Vec<StateVector> = batch.iter().map(|t| t.state).collect();
        let state_tensors = encode_states_batch::<TrainBackend>(&states, &self.device);
        let q_all = self.q_network.forward(state_tensors); // [B, A]

        // One-hot action mask [B, A] to extract Q(s, a)
        let mut action_mask_data = vec![0.0f32; batch_size * ACTION_COUNT];
        for (i, t) in batch.iter().enumerate() {
            action_mask_data[i * ACTION_COUNT + t.action.index()] = 1.0;
        }
        let action_mask = Tensor::<TrainBackend, 2>::from_data(
            TensorData::new(action_mask_data, [batch_size, ACTION_COUNT]),
            &self.device,
        );
        let q_taken = (q_all * action_mask).sum_dim(1); // [B, 1]

        let targets = Tensor::<TrainBackend, 2>::from_data(
            TensorData::new(self.compute_targets(batch), [batch_size, 1]),
            &self.device,
        );

        let mean_q: f32 = q_taken
            .clone()
            .mean()
            .into_data()
            .to_vec::<f32>()
            .expect("f32 tensor data extraction")[0];

        // MSE loss
        let diff = q_taken - targets;
        let loss = (diff.clone() * diff).mean();
        let loss_val: f32 = loss
            .clone()
            .into_data()
            .to_vec::<f32>()
            .expect("f32 loss tensor extraction")[0];

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.q_network);
        self.q_network =
            self.optimizer
                .step(self.config.learning_rate, self.q_network.clone(), grads);
        self.step_count += 1;

        UpdateMetrics {
            loss: loss_val,
            mean_q,
        }
    }

    /// Learning targets from the target network. Terminal transitions are
    /// absorbing: their target is the stored reward alone.
    pub(crate) fn compute_targets(&self, batch: &[Transition]) -> Vec<f32> {
        let next_states: Vec<StateVector> = batch.iter().map(|t| t.next_state).collect();
        let next_tensors = encode_states_batch::<InferBackend>(&next_states, &self.device);
        let next_max_q: Vec<f32> = self
            .target_network
            .forward(next_tensors)
            .max_dim(1)
            .into_data()
            .to_vec()
            .expect("f32 tensor data extraction");
        bootstrap_targets(batch, &next_max_q, self.config.gamma)
    }

    fn decay_epsilon(&mut self) {
        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);
    }

    /// Overwrite the target network with an exact copy of the policy network.
    pub fn sync_target(&mut self) {
        self.target_network = self.q_network.valid();
    }

    /// Count a finished episode. Only used for bookkeeping and checkpoints.
    pub fn mark_episode_end(&mut self) {
        self.episode_count += 1;
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Set epsilon directly (e.g. 0.0 for pure greedy inference).
    pub fn set_epsilon(&mut self, eps: f32) {
        self.epsilon = eps;
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn buffer_len(&self) -> usize {
        self.replay_buffer.len()
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    /// Path the recorder actually writes for `path`.
    pub fn model_file(path: &Path) -> PathBuf {
        path.with_extension(<DefaultRecorder as FileRecorder<InferBackend>>::file_extension())
    }

    /// Persist the policy network parameters.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ModelError::Save(e.to_string()))?;
        }
        let recorder = DefaultRecorder::default();
        self.q_network
            .valid()
            .save_file(path.to_path_buf(), &recorder)
            .map_err(|e| ModelError::Save(e.to_string()))
    }

    /// Restore the policy network and reset the target network to match.
    /// On failure both networks are left untouched.
    pub fn load(&mut self, path: &Path) -> Result<(), ModelError> {
        let file = Self::model_file(path);
        if !file.is_file() {
            return Err(ModelError::ModelNotFound(file));
        }

        let corrupt = |reason: String| ModelError::ModelCorrupt {
            path: file.clone(),
            reason,
        };
        let recorder = DefaultRecorder::default();
        let record: QNetworkRecord<TrainBackend> = recorder
            .load(path.to_path_buf(), &self.device)
            .map_err(|e| corrupt(e.to_string()))?;
        let network_config = self.config.network_config();
        network_config.check_record(&record).map_err(corrupt)?;
        let q_network = network_config.init(&self.device).load_record(record);

        self.target_network = q_network.valid();
        self.q_network = q_network;
        tracing::debug!(path = %file.display(), "loaded policy network");
        Ok(())
    }

    /// Export current training state for checkpointing.
    pub fn training_state(&self) -> DqnTrainingState {
        DqnTrainingState {
            epsilon: self.epsilon,
            step_count: self.step_count,
            episode_count: self.episode_count,
            learning_rate: self.config.learning_rate,
            gamma: self.config.gamma,
            epsilon_start: self.config.epsilon_start,
            epsilon_min: self.config.epsilon_min,
            epsilon_decay: self.config.epsilon_decay,
            replay_capacity: self.config.replay_capacity,
            hidden_sizes: self.config.hidden_sizes.clone(),
        }
    }

    /// Restore counters, epsilon and scalar hyperparameters from a checkpoint.
    /// Network shape and buffer capacity stay as constructed.
    pub fn restore_training_state(&mut self, state: &DqnTrainingState) {
        if state.hidden_sizes != self.config.hidden_sizes {
            tracing::warn!(
                saved = ?state.hidden_sizes,
                current = ?self.config.hidden_sizes,
                "checkpoint network shape differs from configuration"
            );
        }
        self.epsilon = state.epsilon;
        self.step_count = state.step_count;
        self.episode_count = state.episode_count;
        self.config.learning_rate = state.learning_rate;
        self.config.gamma = state.gamma;
        self.config.epsilon_start = state.epsilon_start;
        self.config.epsilon_min = state.epsilon_min;
        self.config.epsilon_decay = state.epsilon_decay;
    }

    /// Serialize training state to JSON.
    pub fn training_state_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.training_state())
    }

    pub fn restore_training_state_json(&mut self, json: &str) -> Result<(), serde_json::Error> {
        let state: DqnTrainingState = serde_json::from_str(json)?;
        self.restore_training_state(&state);
        Ok(())
    }
}

impl Agent for DqnAgent {
    fn select_action(&mut self, state: &StateVector, explore: bool) -> usize {
        self.pick_action(state, explore)
    }

    fn name(&self) -> &str {
        "DQN"
    }
}

/// Index of the largest value; ties go to the lowest index.
fn greedy_action(q_values: &[f32]) -> usize {
    let mut best_action = 0;
    let mut best_q = f32::NEG_INFINITY;
    for (action, &q) in q_values.iter().enumerate() {
        if q > best_q {
            best_q = q;
            best_action = action;
        }
    }
    best_action
}

/// `r` for terminal transitions, `r + gamma * max_a' Q_target(s', a')` otherwise.
fn bootstrap_targets(batch: &[Transition], next_max_q: &[f32], gamma: f32) -> Vec<f32> {
    batch
        .iter()
        .zip(next_max_q)
        .map(|(t, &max_q)| {
            if t.terminal {
                t.reward
            } else {
                t.reward + gamma * max_q
            }
        })
        .collect()
}
