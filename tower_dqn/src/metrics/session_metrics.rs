//! Counters describing a session's progress.

use crate::algorithms::LossInfo;

/// Session counters. Owned by the single session thread.
#[derive(Debug, Clone, Default)]
pub struct SessionMetrics {
    /// Observations processed.
    env_steps: usize,
    /// Optimization steps taken.
    learn_steps: usize,
    /// Target network syncs.
    target_syncs: usize,
    /// Malformed or oversized lines dropped.
    skipped_lines: usize,
    /// Actions drawn at random.
    explored_actions: usize,
    /// Most recent optimization step.
    last_loss: Option<LossInfo>,
}

impl SessionMetrics {
    /// Create zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one processed observation.
    pub fn increment_env_steps(&mut self) {
        self.env_steps += 1;
    }

    /// Record one optimization step.
    pub fn record_learn_step(&mut self, info: LossInfo) {
        self.learn_steps += 1;
        self.last_loss = Some(info);
    }

    /// Record one target sync.
    pub fn increment_target_syncs(&mut self) {
        self.target_syncs += 1;
    }

    /// Record one dropped line.
    pub fn increment_skipped_lines(&mut self) {
        self.skipped_lines += 1;
    }

    /// Record one exploratory action.
    pub fn increment_explored_actions(&mut self) {
        self.explored_actions += 1;
    }

    pub fn env_steps(&self) -> usize {
        self.env_steps
    }

    pub fn learn_steps(&self) -> usize {
        self.learn_steps
    }

    pub fn target_syncs(&self) -> usize {
        self.target_syncs
    }

    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    pub fn explored_actions(&self) -> usize {
        self.explored_actions
    }

    pub fn last_loss(&self) -> Option<LossInfo> {
        self.last_loss
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
