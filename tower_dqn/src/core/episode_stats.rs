//! Per-episode bookkeeping for the session loop.
//!
//! Tracks the running reward of the in-progress episode, a rolling window of
//! completed episode totals, the episode counter and the last termination
//! cause reported by the game.

use std::collections::VecDeque;

/// Summary emitted when an episode ends.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    /// 1-based index of the completed episode.
    pub episode: usize,
    /// Total reward of the episode.
    pub reward: f32,
    /// Mean total reward over the rolling window, this episode included.
    pub avg_reward: f32,
    /// Last termination cause seen; empty until the game reports one.
    pub cause: String,
}

/// Episode state owned by a session.
#[derive(Debug, Clone)]
pub struct EpisodeTracker {
    current_reward: f32,
    window: VecDeque<f32>,
    window_size: usize,
    episodes: usize,
    last_cause: String,
}

impl EpisodeTracker {
    /// Create a tracker averaging over the last `window_size` episodes.
    ///
    /// # Panics
    ///
    /// Panics if `window_size` is zero.
    pub fn new(window_size: usize) -> Self {
        assert!(window_size > 0, "reward window must be > 0");
        Self {
            current_reward: 0.0,
            window: VecDeque::with_capacity(window_size),
            window_size,
            episodes: 0,
            last_cause: String::new(),
        }
    }

    /// Add a step reward to the in-progress episode.
    pub fn add_reward(&mut self, reward: f32) {
        self.current_reward += reward;
    }

    /// Remember the latest termination cause. It persists until replaced.
    pub fn set_cause(&mut self, cause: &str) {
        self.last_cause.clear();
        self.last_cause.push_str(cause);
    }

    /// Close the in-progress episode and start a new one.
    pub fn finish_episode(&mut self) -> EpisodeSummary {
        let reward = self.current_reward;
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(reward);
        self.episodes += 1;
        self.current_reward = 0.0;

        EpisodeSummary {
            episode: self.episodes,
            reward,
            avg_reward: self.avg_reward(),
            cause: self.last_cause.clone(),
        }
    }

    /// Reward accumulated so far in the in-progress episode.
    pub fn current_reward(&self) -> f32 {
        self.current_reward
    }

    /// Mean over the rolling window, 0.0 before any episode completes.
    pub fn avg_reward(&self) -> f32 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window.iter().sum::<f32>() / self.window.len() as f32
    }

    /// Number of completed episodes.
    pub fn episodes(&self) -> usize {
        self.episodes
    }

    /// Last termination cause.
    pub fn last_cause(&self) -> &str {
        &self.last_cause
    }
}
