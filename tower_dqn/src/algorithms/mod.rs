//! Learning algorithm components.
//!
//! - `double_dqn`: Double DQN targets, TD loss and the learner that owns the networks
//! - `action_selector`: Epsilon-greedy action selection

pub mod action_selector;
pub mod double_dqn;

pub use action_selector::{ActionChoice, EpsilonGreedy};
pub use double_dqn::{double_dqn_targets, greedy_action, td_loss, DqnLearner, LossInfo};
