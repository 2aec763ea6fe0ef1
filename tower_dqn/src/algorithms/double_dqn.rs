//! Double DQN update.
//!
//! # Algorithm
//!
//! For a sampled batch of `(s, a, r, s', done)`:
//!
//! 1. `Q(s, a)` from the online network, gathered at the taken actions
//! 2. `a* = argmax_a Q_online(s', a)`: the online network *selects*
//! 3. `Q_target(s', a*)`: the target network *evaluates*
//! 4. `y = r + γ · Q_target(s', a*) · (1 - done)`
//! 5. Minimize `mean((Q(s, a) - y)²)` over the online parameters
//!
//! Decoupling selection from evaluation removes the overestimation bias of
//! taking `max_a Q_target(s', a)` directly.
//!
//! Steps 2-4 run on the inner (non-autodiff) backend, so the target `y`
//! carries no gradient.

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::config::DqnConfig;
use crate::core::{ReplayBuffer, TargetNetwork, TransitionBatch};
use crate::nn::{DuelingQNetwork, QFunction};

/// Scalars reported by one optimization step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossInfo {
    /// Mean squared TD error.
    pub loss: f32,
    /// Mean `Q(s, a)` over the batch.
    pub mean_q: f32,
    /// Mean TD target over the batch.
    pub mean_target: f32,
}

/// Compute Double DQN targets.
///
/// `y = r + γ · Q_target(s', argmax_a Q_online(s', a)) · (1 - done)`
///
/// # Arguments
/// - `rewards`: Rewards [batch]
/// - `dones`: Terminal flags (1.0 for terminal) [batch]
/// - `next_q_online`: Online Q-values at next states [batch, n_actions]
/// - `next_q_target`: Target Q-values at next states [batch, n_actions]
/// - `gamma`: Discount factor
pub fn double_dqn_targets<B: Backend>(
    rewards: Tensor<B, 1>,
    dones: Tensor<B, 1>,
    next_q_online: Tensor<B, 2>,
    next_q_target: Tensor<B, 2>,
    gamma: f32,
) -> Tensor<B, 1> {
    let best_actions = next_q_online.argmax(1);
    let next_q: Tensor<B, 1> = next_q_target.gather(1, best_actions).flatten(0, 1);

    let not_done = dones.mul_scalar(-1.0).add_scalar(1.0);
    rewards + next_q.mul(not_done).mul_scalar(gamma)
}

/// Mean squared error between predicted Q-values and targets.
pub fn td_loss<B: Backend>(q_values: Tensor<B, 1>, targets: Tensor<B, 1>) -> Tensor<B, 1> {
    (q_values - targets).powf_scalar(2.0).mean()
}

/// Owns the online network, its target copy and the optimizer.
pub struct DqnLearner<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<DuelingQNetwork<B>, B>,
{
    policy: DuelingQNetwork<B>,
    target: TargetNetwork<B>,
    optimizer: O,
    gamma: f32,
    learning_rate: f64,
    batch_size: usize,
    learn_steps: usize,
    device: B::Device,
}

impl<B, O> DqnLearner<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<DuelingQNetwork<B>, B>,
{
    /// Create a learner. The target network starts as a snapshot of `policy`.
    pub fn new(policy: DuelingQNetwork<B>, optimizer: O, config: &DqnConfig, device: B::Device) -> Self {
        let target = TargetNetwork::snapshot(&policy);
        Self {
            policy,
            target,
            optimizer,
            gamma: config.gamma,
            learning_rate: config.learning_rate,
            batch_size: config.batch_size,
            learn_steps: 0,
            device,
        }
    }

    /// Run one update if the buffer holds more than `batch_size` transitions.
    pub fn train_step(&mut self, buffer: &mut ReplayBuffer) -> Option<LossInfo> {
        if buffer.len() <= self.batch_size {
            return None;
        }
        let batch = buffer.sample(self.batch_size)?;
        Some(self.train_on_batch(&batch))
    }

    /// Run one update on an explicit batch.
    pub fn train_on_batch(&mut self, batch: &TransitionBatch) -> LossInfo {
        let n = batch.len();
        let dim = batch.state_dim;
        let device = &self.device;

        // Bootstrap targets, computed without autodiff
        let next_states = Tensor::<B::InnerBackend, 1>::from_floats(batch.next_states.as_slice(), device)
            .reshape([n, dim]);
        let rewards = Tensor::<B::InnerBackend, 1>::from_floats(batch.rewards.as_slice(), device);
        let dones = Tensor::<B::InnerBackend, 1>::from_floats(batch.dones.as_slice(), device);

        let next_q_online = self.policy.valid().q_values(next_states.clone());
        let next_q_target = self.target.q_values(next_states);
        let targets = double_dqn_targets(rewards, dones, next_q_online, next_q_target, self.gamma);
        let mean_target = targets.clone().mean().into_scalar().elem::<f32>();
        let targets = Tensor::<B, 1>::from_inner(targets);

        // Online prediction at taken actions
        let states = Tensor::<B, 1>::from_floats(batch.states.as_slice(), device).reshape([n, dim]);
        let action_indices: Vec<i32> = batch.actions.iter().map(|&a| a as i32).collect();
        let actions = Tensor::<B, 1, Int>::from_ints(action_indices.as_slice(), device).reshape([n, 1]);

        let q_values: Tensor<B, 1> = self.policy.q_values(states).gather(1, actions).flatten(0, 1);
        let mean_q = q_values.clone().detach().mean().into_scalar().elem::<f32>();

        let loss = td_loss(q_values, targets);
        let loss_value = loss.clone().detach().into_scalar().elem::<f32>();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.policy);
        self.policy = self.optimizer.step(self.learning_rate, self.policy.clone(), grads);
        self.learn_steps += 1;

        LossInfo {
            loss: loss_value,
            mean_q,
            mean_target,
        }
    }

    /// Copy the online parameters into the target network.
    pub fn sync_target(&mut self) {
        self.target.sync_from(&self.policy);
    }

    /// Replace the online network (e.g. from a checkpoint) and re-snapshot the target.
    pub fn load_policy(&mut self, policy: DuelingQNetwork<B>) {
        self.target = TargetNetwork::snapshot(&policy);
        self.policy = policy;
    }

    /// The online network.
    pub fn policy(&self) -> &DuelingQNetwork<B> {
        &self.policy
    }

    /// The target store.
    pub fn target(&self) -> &TargetNetwork<B> {
        &self.target
    }

    /// Number of optimization steps taken.
    pub fn learn_steps(&self) -> usize {
        self.learn_steps
    }

    /// Batch size used by [`train_step`](Self::train_step).
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Device the networks live on.
    pub fn device(&self) -> &B::Device {
        &self.device
    }
}

/// Index of the highest Q-value for a single state.
pub fn greedy_action<B: Backend, Q: QFunction<B>>(q: &Q, state: &[f32], device: &B::Device) -> u32 {
    let input = Tensor::<B, 1>::from_floats(state, device).reshape([1, state.len()]);
    q.q_values(input).argmax(1).into_scalar().elem::<i64>() as u32
}
