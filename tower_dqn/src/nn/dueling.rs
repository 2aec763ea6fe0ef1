//! Dueling Q-network.
//!
//! A shared feature extractor feeds two heads:
//! - **Value stream** `V(s)`: how good the state is, independent of action
//! - **Advantage stream** `A(s, a)`: how much better each action is than average
//!
//! They are recombined per sample as
//!
//! ```text
//! Q(s, a) = V(s) + A(s, a) - mean_a' A(s, a')
//! ```
//!
//! Subtracting the mean advantage makes the decomposition identifiable: the
//! mean of `Q(s, ·)` over actions equals `V(s)`.
//!
//! # Usage
//!
//! ```ignore
//! use tower_dqn::nn::{DuelingQNetworkConfig, QFunction};
//!
//! let network = DuelingQNetworkConfig::new(25, 5).init::<Backend>(&device);
//! let q = network.q_values(states); // [batch, 5]
//! ```

use burn::module::Module;
use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

use crate::config::DqnConfig;

/// Evaluation interface shared by the online network and the target store.
pub trait QFunction<B: Backend> {
    /// Q-values for every action, `[batch, n_actions]`.
    fn q_values(&self, states: Tensor<B, 2>) -> Tensor<B, 2>;

    /// Width of the observation vector.
    fn input_size(&self) -> usize;

    /// Number of discrete actions.
    fn n_actions(&self) -> usize;
}

/// Configuration for [`DuelingQNetwork`].
#[derive(Debug, Clone, PartialEq)]
pub struct DuelingQNetworkConfig {
    /// Observation width.
    pub input_size: usize,
    /// Number of discrete actions.
    pub n_actions: usize,
    /// Width of both shared feature layers.
    pub feature_size: usize,
    /// Width of the hidden layer in each head.
    pub head_size: usize,
}

impl DuelingQNetworkConfig {
    /// Create a config with the default hidden sizes (256 shared, 128 per head).
    pub fn new(input_size: usize, n_actions: usize) -> Self {
        Self {
            input_size,
            n_actions,
            feature_size: 256,
            head_size: 128,
        }
    }

    /// Set the shared feature width.
    pub fn with_feature_size(mut self, feature_size: usize) -> Self {
        self.feature_size = feature_size;
        self
    }

    /// Set the per-head hidden width.
    pub fn with_head_size(mut self, head_size: usize) -> Self {
        self.head_size = head_size;
        self
    }

    /// Initialize the network with fresh parameters.
    pub fn init<B: Backend>(&self, device: &B::Device) -> DuelingQNetwork<B> {
        DuelingQNetwork {
            feature_in: LinearConfig::new(self.input_size, self.feature_size).init(device),
            feature_hidden: LinearConfig::new(self.feature_size, self.feature_size).init(device),
            value_hidden: LinearConfig::new(self.feature_size, self.head_size).init(device),
            value_out: LinearConfig::new(self.head_size, 1).init(device),
            advantage_hidden: LinearConfig::new(self.feature_size, self.head_size).init(device),
            advantage_out: LinearConfig::new(self.head_size, self.n_actions).init(device),
            activation: Relu::new(),
            input_size: self.input_size,
            n_actions: self.n_actions,
        }
    }
}

impl From<&DqnConfig> for DuelingQNetworkConfig {
    fn from(config: &DqnConfig) -> Self {
        Self::new(config.input_size, config.n_actions)
            .with_feature_size(config.feature_size)
            .with_head_size(config.head_size)
    }
}

/// Dueling Q-network: shared MLP trunk with value and advantage heads.
#[derive(Module, Debug)]
pub struct DuelingQNetwork<B: Backend> {
    feature_in: Linear<B>,
    feature_hidden: Linear<B>,
    value_hidden: Linear<B>,
    value_out: Linear<B>,
    advantage_hidden: Linear<B>,
    advantage_out: Linear<B>,
    activation: Relu,
    input_size: usize,
    n_actions: usize,
}

impl<B: Backend> DuelingQNetwork<B> {
    /// Forward pass returning combined Q-values `[batch, n_actions]`.
    pub fn forward(&self, states: Tensor<B, 2>) -> Tensor<B, 2> {
        let (value, advantage) = self.forward_streams(states);
        dueling_combine(value, advantage)
    }

    /// Forward pass returning the raw streams: `V` `[batch, 1]` and `A` `[batch, n_actions]`.
    pub fn forward_streams(&self, states: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let x = self.activation.forward(self.feature_in.forward(states));
        let features = self.activation.forward(self.feature_hidden.forward(x));

        let value = self.activation.forward(self.value_hidden.forward(features.clone()));
        let value = self.value_out.forward(value);

        let advantage = self.activation.forward(self.advantage_hidden.forward(features));
        let advantage = self.advantage_out.forward(advantage);

        (value, advantage)
    }
}

impl<B: Backend> QFunction<B> for DuelingQNetwork<B> {
    fn q_values(&self, states: Tensor<B, 2>) -> Tensor<B, 2> {
        self.forward(states)
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn n_actions(&self) -> usize {
        self.n_actions
    }
}

/// Combine value and advantage streams: `V + (A - mean_a A)`, mean taken per sample.
///
/// # Arguments
/// * `value` - `[batch, 1]`
/// * `advantage` - `[batch, n_actions]`
pub fn dueling_combine<B: Backend>(value: Tensor<B, 2>, advantage: Tensor<B, 2>) -> Tensor<B, 2> {
    let mean_advantage = advantage.clone().mean_dim(1);
    value + (advantage - mean_advantage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::Distribution;

    type B = Autodiff<NdArray<f32>>;

    #[test]
    fn test_forward_shapes() {
        let device = Default::default();
        let network = DuelingQNetworkConfig::new(25, 5).init::<B>(&device);

        let states = Tensor::<B, 2>::zeros([7, 25], &device);
        let (value, advantage) = network.forward_streams(states.clone());
        assert_eq!(value.dims(), [7, 1]);
        assert_eq!(advantage.dims(), [7, 5]);
        assert_eq!(network.forward(states).dims(), [7, 5]);
        assert_eq!(network.input_size(), 25);
        assert_eq!(network.n_actions(), 5);
    }

    #[test]
    fn test_dueling_combine_constructed() {
        let device = Default::default();
        let value = Tensor::<B, 2>::from_floats([[1.0], [2.0]], &device);
        let advantage = Tensor::<B, 2>::from_floats([[1.0, 2.0, 3.0], [0.0, 0.0, 3.0]], &device);

        let q = dueling_combine(value, advantage).into_data();
        let expected = [0.0, 1.0, 2.0, 1.0, 1.0, 4.0];
        for (got, want) in q.iter::<f32>().zip(expected) {
            assert!((got - want).abs() < 1e-6, "expected {want}, got {got}");
        }
    }

    #[test]
    fn test_mean_q_equals_value() {
        let device = Default::default();
        let network = DuelingQNetworkConfig::new(6, 4)
            .with_feature_size(16)
            .with_head_size(8)
            .init::<B>(&device);

        let states = Tensor::<B, 2>::random([32, 6], Distribution::Normal(0.0, 1.0), &device);
        let (value, _) = network.forward_streams(states.clone());
        let mean_q = network.forward(states).mean_dim(1);

        let value = value.into_data();
        let mean_q = mean_q.into_data();
        for (v, m) in value.iter::<f32>().zip(mean_q.iter::<f32>()) {
            assert!((v - m).abs() < 1e-4, "mean Q {m} should equal V {v}");
        }
    }

    #[test]
    fn test_config_from_dqn_config() {
        let dqn = DqnConfig::default().with_hidden(64, 32);
        let config = DuelingQNetworkConfig::from(&dqn);
        assert_eq!(config.input_size, 25);
        assert_eq!(config.n_actions, 5);
        assert_eq!(config.feature_size, 64);
        assert_eq!(config.head_size, 32);
    }
}
