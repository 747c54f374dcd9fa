use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, Relu};
use burn::prelude::*;

/// Action-value network: a stack of affine layers with ReLU in between.
///
/// ```text
/// Input:   [batch, 5]
/// Hidden:  5 -> 64 -> 64 -> 32, ReLU after each (dropout after the first)
/// Output:  32 -> 2  (Q-values, one per action)
/// ```
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
    dropout: Dropout,
    relu: Relu,
}

#[derive(Config, Debug)]
pub struct QNetworkConfig {
    pub state_size: usize,
    pub action_size: usize,
    pub hidden_sizes: Vec<usize>,
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl QNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> QNetwork<B> {
        let mut hidden = Vec::with_capacity(self.hidden_sizes.len());
        let mut width = self.state_size;
        for &size in &self.hidden_sizes {
            hidden.push(LinearConfig::new(width, size).init(device));
            width = size;
        }

        QNetwork {
            hidden,
            output: LinearConfig::new(width, self.action_size).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            relu: Relu::new(),
        }
    }

    /// Check that a loaded record has the layer count and weight shapes this
    /// config builds. Loading a mismatched record into a module panics, so
    /// this must pass first.
    pub fn check_record<B: Backend>(&self, record: &QNetworkRecord<B>) -> Result<(), String> {
        if record.hidden.len() != self.hidden_sizes.len() {
            return Err(format!(
                "expected {} hidden layers, found {}",
                self.hidden_sizes.len(),
                record.hidden.len()
            ));
        }

        let mut width = self.state_size;
        for (i, (layer, &size)) in record.hidden.iter().zip(&self.hidden_sizes).enumerate() {
            let dims = layer.weight.val().dims();
            if dims != [width, size] {
                return Err(format!(
                    "hidden layer {i}: expected weight {:?}, found {:?}",
                    [width, size],
                    dims
                ));
            }
            width = size;
        }

        let dims = record.output.weight.val().dims();
        if dims != [width, self.action_size] {
            return Err(format!(
                "output layer: expected weight {:?}, found {:?}",
                [width, self.action_size],
                dims
            ));
        }
        Ok(())
    }
}

impl<B: Backend> QNetwork<B> {
    /// Forward pass: input [batch, state_size] -> output [batch, action_size].
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = input;
        for (i, layer) in self.hidden.iter().enumerate() {
            x = self.relu.forward(layer.forward(x));
            if i == 0 {
                x = self.dropout.forward(x);
            }
        }
        self.output.forward(x)
    }
}
