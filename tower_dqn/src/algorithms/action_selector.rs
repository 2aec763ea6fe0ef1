//! Epsilon-greedy action selection.

use burn::prelude::*;

use super::double_dqn::greedy_action;
use crate::core::EpsilonSchedule;
use crate::nn::QFunction;

/// Action picked by [`EpsilonGreedy::choose`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionChoice {
    pub action: u32,
    /// True when the action was drawn uniformly at random.
    pub explored: bool,
}

/// Epsilon-greedy selector over a Q-function.
#[derive(Debug, Clone)]
pub struct EpsilonGreedy {
    schedule: EpsilonSchedule,
    n_actions: u32,
    rng: fastrand::Rng,
}

impl EpsilonGreedy {
    /// Create a selector over `n_actions` actions.
    pub fn new(schedule: EpsilonSchedule, n_actions: u32) -> Self {
        Self::with_rng(schedule, n_actions, fastrand::Rng::new())
    }

    /// Create a selector with a reproducible random stream.
    pub fn with_seed(schedule: EpsilonSchedule, n_actions: u32, seed: u64) -> Self {
        Self::with_rng(schedule, n_actions, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(schedule: EpsilonSchedule, n_actions: u32, rng: fastrand::Rng) -> Self {
        assert!(n_actions > 0, "need at least one action");
        Self {
            schedule,
            n_actions,
            rng,
        }
    }

    /// Pick an action for `state`.
    ///
    /// With probability ε a uniform random action; otherwise the argmax of `q`.
    /// The network is only evaluated on the greedy branch.
    pub fn choose<B: Backend, Q: QFunction<B>>(
        &mut self,
        q: &Q,
        state: &[f32],
        device: &B::Device,
    ) -> ActionChoice {
        if self.rng.f32() < self.schedule.value() {
            ActionChoice {
                action: self.rng.u32(..self.n_actions),
                explored: true,
            }
        } else {
            ActionChoice {
                action: greedy_action(q, state, device),
                explored: false,
            }
        }
    }

    /// Decay ε by one environment step.
    pub fn decay(&mut self) {
        self.schedule.step();
    }

    /// The decay schedule.
    pub fn schedule(&self) -> &EpsilonSchedule {
        &self.schedule
    }

    /// Current ε.
    pub fn epsilon(&self) -> f32 {
        self.schedule.value()
    }

    /// Number of actions.
    pub fn n_actions(&self) -> u32 {
        self.n_actions
    }
}
