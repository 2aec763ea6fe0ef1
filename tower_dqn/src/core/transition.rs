//! Transition types for the replay buffer and learner.
//!
//! - `Transition`: one (state, action, reward, next_state, done) experience
//! - `TransitionBatch`: stacked transitions in the flat layout the learner
//!   turns into tensors

/// One step of experience.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Observation the action was taken in.
    pub state: Vec<f32>,
    /// Discrete action index.
    pub action: u32,
    /// Reward received after the action.
    pub reward: f32,
    /// Observation that followed the action.
    pub next_state: Vec<f32>,
    /// Episode ended on this step.
    pub done: bool,
}

impl Transition {
    /// Create a new transition.
    pub fn new(state: Vec<f32>, action: u32, reward: f32, next_state: Vec<f32>, done: bool) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            done,
        }
    }
}

/// A batch of transitions in struct-of-arrays layout.
///
/// `states` and `next_states` are row-major `[len, state_dim]` planes.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionBatch {
    pub states: Vec<f32>,
    pub actions: Vec<u32>,
    pub rewards: Vec<f32>,
    pub next_states: Vec<f32>,
    /// Terminal flags as 1.0 / 0.0.
    pub dones: Vec<f32>,
    pub state_dim: usize,
}

impl TransitionBatch {
    /// Create an empty batch with room for `capacity` transitions.
    pub fn with_capacity(capacity: usize, state_dim: usize) -> Self {
        Self {
            states: Vec::with_capacity(capacity * state_dim),
            actions: Vec::with_capacity(capacity),
            rewards: Vec::with_capacity(capacity),
            next_states: Vec::with_capacity(capacity * state_dim),
            dones: Vec::with_capacity(capacity),
            state_dim,
        }
    }

    /// Stack a slice of transitions.
    ///
    /// # Panics
    ///
    /// Panics if the transitions do not all share the same state width.
    pub fn from_transitions(transitions: &[Transition]) -> Self {
        let state_dim = transitions.first().map_or(0, |t| t.state.len());
        let mut batch = Self::with_capacity(transitions.len(), state_dim);
        for t in transitions {
            assert_eq!(t.state.len(), state_dim, "inconsistent state width");
            assert_eq!(t.next_state.len(), state_dim, "inconsistent next_state width");
            batch.states.extend_from_slice(&t.state);
            batch.actions.push(t.action);
            batch.rewards.push(t.reward);
            batch.next_states.extend_from_slice(&t.next_state);
            batch.dones.push(if t.done { 1.0 } else { 0.0 });
        }
        batch
    }

    /// Number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Get the transition at `idx` as an owned record.
    pub fn get(&self, idx: usize) -> Transition {
        let row = idx * self.state_dim..(idx + 1) * self.state_dim;
        Transition {
            state: self.states[row.clone()].to_vec(),
            action: self.actions[idx],
            reward: self.rewards[idx],
            next_state: self.next_states[row].to_vec(),
            done: self.dones[idx] > 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transitions_layout() {
        let transitions = vec![
            Transition::new(vec![1.0, 2.0], 0, 0.5, vec![3.0, 4.0], false),
            Transition::new(vec![5.0, 6.0], 1, -1.0, vec![7.0, 8.0], true),
        ];
        let batch = TransitionBatch::from_transitions(&transitions);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.state_dim, 2);
        assert_eq!(batch.states, vec![1.0, 2.0, 5.0, 6.0]);
        assert_eq!(batch.next_states, vec![3.0, 4.0, 7.0, 8.0]);
        assert_eq!(batch.actions, vec![0, 1]);
        assert_eq!(batch.dones, vec![0.0, 1.0]);
        assert_eq!(batch.get(1), transitions[1]);
    }

    #[test]
    fn test_empty_batch() {
        let batch = TransitionBatch::from_transitions(&[]);
        assert!(batch.is_empty());
        assert_eq!(batch.state_dim, 0);
    }
}
