//! Target network store and hard-sync schedule.
//!
//! The target network provides the bootstrap values for TD targets. It is
//! never trained: the only way its parameters change is a full snapshot copy
//! of the online network.
//!
//! The store holds the network on the autodiff backend's *inner* backend,
//! so no gradient can flow into it and no optimizer can accept it.
//!
//! ```text
//! step:   0     1 ... 999   1000  1001 ...
//! sync:   yes   no    no    yes   no
//! ```

use burn::module::{AutodiffModule, Module, ModuleMapper, Param};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::nn::{DuelingQNetwork, QFunction};

/// Frozen copy of the online Q-network.
///
/// Exposes only snapshot and evaluation.
pub struct TargetNetwork<B: AutodiffBackend> {
    model: DuelingQNetwork<B::InnerBackend>,
    syncs: usize,
}

impl<B: AutodiffBackend> TargetNetwork<B> {
    /// Create a target store initialized from the online network.
    pub fn snapshot(policy: &DuelingQNetwork<B>) -> Self {
        Self {
            model: policy.valid(),
            syncs: 0,
        }
    }

    /// Overwrite all target parameters with the online network's.
    pub fn sync_from(&mut self, policy: &DuelingQNetwork<B>) {
        self.model = policy.valid();
        self.syncs += 1;
    }

    /// Q-values of the frozen network, `[batch, n_actions]`.
    pub fn q_values(&self, states: Tensor<B::InnerBackend, 2>) -> Tensor<B::InnerBackend, 2> {
        self.model.q_values(states)
    }

    /// Read-only access to the frozen network.
    pub fn model(&self) -> &DuelingQNetwork<B::InnerBackend> {
        &self.model
    }

    /// Number of syncs since construction (the initial snapshot not included).
    pub fn syncs(&self) -> usize {
        self.syncs
    }
}

/// Decides when the target network is refreshed.
///
/// Sync happens when `step % interval == 0`; the step counter starts at 0 and
/// is incremented after the check, so the first environment step syncs.
#[derive(Debug, Clone)]
pub struct TargetSyncSchedule {
    interval: usize,
    step: usize,
}

impl TargetSyncSchedule {
    /// Create a schedule syncing every `interval` steps.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero.
    pub fn new(interval: usize) -> Self {
        assert!(interval > 0, "target sync interval must be > 0");
        Self { interval, step: 0 }
    }

    /// Advance one environment step. Returns whether a sync is due on this step.
    pub fn tick(&mut self) -> bool {
        let due = self.step % self.interval == 0;
        self.step += 1;
        due
    }

    /// Number of steps ticked so far.
    pub fn steps(&self) -> usize {
        self.step
    }
}

/// Collects every float parameter of a module, flattened, in traversal order.
struct ParamExtractor {
    values: Vec<f32>,
}

impl<B: Backend> ModuleMapper<B> for ParamExtractor {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let data = param.val().into_data();
        self.values.extend(data.iter::<f32>());
        param
    }
}

/// Flatten all float parameters of a module into one vector.
///
/// Traversal order is deterministic for a given architecture, so two modules
/// of the same structure can be compared element by element.
pub fn flatten_params<B: Backend, M: Module<B>>(module: &M) -> Vec<f32> {
    let mut extractor = ParamExtractor { values: Vec::new() };
    let _ = module.clone().map(&mut extractor);
    extractor.values
}
