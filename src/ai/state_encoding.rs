use burn::prelude::*;
use burn::tensor::TensorData;

use crate::env::{StateVector, STATE_SIZE};

/// Encode one observation as a tensor of shape [1, 5].
pub fn encode_state<B: Backend>(state: &StateVector, device: &B::Device) -> Tensor<B, 2> {
    encode_states_batch(std::slice::from_ref(state), device)
}

/// Encode multiple observations as a batched tensor of shape [batch, 5].
pub fn encode_states_batch<B: Backend>(states: &[StateVector], device: &B::Device) -> Tensor<B, 2> {
    let mut flat = Vec::with_capacity(states.len() * STATE_SIZE);
    for state in states {
        flat.extend_from_slice(&state.to_array());
    }
    Tensor::<B, 2>::from_data(TensorData::new(flat, [states.len(), STATE_SIZE]), device)
}
