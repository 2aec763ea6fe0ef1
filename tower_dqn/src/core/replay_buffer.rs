//! Uniform replay buffer for the Double DQN learner.
//!
//! - **Preallocated arena**: all `capacity` slots are allocated up front as
//!   flat struct-of-arrays planes, so pushes never reallocate
//! - **Ring semantics**: the write cursor wraps and overwrites the oldest slot
//! - **Uniform sampling with replacement** over the filled slots
//!
//! The buffer is owned by a single session, so it needs no locking.

use super::transition::{Transition, TransitionBatch};

/// Configuration for the replay buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayBufferConfig {
    /// Maximum number of transitions to store.
    pub capacity: usize,
    /// Width of the state vectors.
    pub state_dim: usize,
}

impl ReplayBufferConfig {
    /// Create a new buffer config.
    pub fn new(capacity: usize, state_dim: usize) -> Self {
        Self {
            capacity,
            state_dim,
        }
    }
}

/// Fixed-capacity ring buffer of transitions.
pub struct ReplayBuffer {
    config: ReplayBufferConfig,
    states: Vec<f32>,
    actions: Vec<u32>,
    rewards: Vec<f32>,
    next_states: Vec<f32>,
    dones: Vec<f32>,
    /// Next slot to write.
    ptr: usize,
    /// Number of filled slots.
    size: usize,
    rng: fastrand::Rng,
}

impl ReplayBuffer {
    /// Create a buffer with all slots allocated.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(config: ReplayBufferConfig) -> Self {
        Self::with_rng(config, fastrand::Rng::new())
    }

    /// Create a buffer whose sampling is reproducible.
    pub fn with_seed(config: ReplayBufferConfig, seed: u64) -> Self {
        Self::with_rng(config, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(config: ReplayBufferConfig, rng: fastrand::Rng) -> Self {
        assert!(config.capacity > 0, "replay buffer capacity must be > 0");
        let plane = config.capacity * config.state_dim;
        Self {
            states: vec![0.0; plane],
            actions: vec![0; config.capacity],
            rewards: vec![0.0; config.capacity],
            next_states: vec![0.0; plane],
            dones: vec![0.0; config.capacity],
            ptr: 0,
            size: 0,
            rng,
            config,
        }
    }

    /// Store one transition, overwriting the oldest when full.
    pub fn push(&mut self, state: &[f32], action: u32, reward: f32, next_state: &[f32], done: bool) {
        let dim = self.config.state_dim;
        debug_assert_eq!(state.len(), dim, "state width mismatch");
        debug_assert_eq!(next_state.len(), dim, "next_state width mismatch");

        let row = self.ptr * dim..(self.ptr + 1) * dim;
        self.states[row.clone()].copy_from_slice(&state[..dim]);
        self.next_states[row].copy_from_slice(&next_state[..dim]);
        self.actions[self.ptr] = action;
        self.rewards[self.ptr] = reward;
        self.dones[self.ptr] = if done { 1.0 } else { 0.0 };

        self.ptr = (self.ptr + 1) % self.config.capacity;
        self.size = (self.size + 1).min(self.config.capacity);
    }

    /// Store a [`Transition`] record.
    pub fn push_transition(&mut self, transition: &Transition) {
        self.push(
            &transition.state,
            transition.action,
            transition.reward,
            &transition.next_state,
            transition.done,
        );
    }

    /// Sample `batch_size` transitions uniformly with replacement.
    ///
    /// Returns `None` if the buffer is empty.
    pub fn sample(&mut self, batch_size: usize) -> Option<TransitionBatch> {
        if self.size == 0 {
            return None;
        }

        let dim = self.config.state_dim;
        let mut batch = TransitionBatch::with_capacity(batch_size, dim);
        for _ in 0..batch_size {
            let idx = self.rng.usize(..self.size);
            let row = idx * dim..(idx + 1) * dim;
            batch.states.extend_from_slice(&self.states[row.clone()]);
            batch.next_states.extend_from_slice(&self.next_states[row]);
            batch.actions.push(self.actions[idx]);
            batch.rewards.push(self.rewards[idx]);
            batch.dones.push(self.dones[idx]);
        }

        Some(batch)
    }

    /// Read back the transition stored in slot `idx`.
    ///
    /// Slots are in physical order; once the buffer has wrapped, the oldest
    /// transition sits at the write cursor.
    pub fn get(&self, idx: usize) -> Option<Transition> {
        if idx >= self.size {
            return None;
        }
        let dim = self.config.state_dim;
        let row = idx * dim..(idx + 1) * dim;
        Some(Transition {
            state: self.states[row.clone()].to_vec(),
            action: self.actions[idx],
            reward: self.rewards[idx],
            next_state: self.next_states[row].to_vec(),
            done: self.dones[idx] > 0.5,
        })
    }

    /// Stored transitions from oldest to newest.
    pub fn iter_chronological(&self) -> impl Iterator<Item = Transition> + '_ {
        let start = if self.size == self.config.capacity { self.ptr } else { 0 };
        (0..self.size).filter_map(move |i| self.get((start + i) % self.config.capacity))
    }

    /// Current number of stored transitions.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Maximum number of transitions.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Buffer utilization (0.0 to 1.0).
    pub fn utilization(&self) -> f32 {
        self.size as f32 / self.config.capacity as f32
    }

    /// Forget all transitions. Storage stays allocated.
    pub fn clear(&mut self) {
        self.ptr = 0;
        self.size = 0;
    }

    /// Get the configuration.
    pub fn config(&self) -> &ReplayBufferConfig {
        &self.config
    }
}
