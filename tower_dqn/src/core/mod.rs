//! Core data structures for the DQN agent.

pub mod episode_stats;
pub mod exploration;
pub mod replay_buffer;
pub mod target_network;
pub mod transition;

pub use episode_stats::{EpisodeSummary, EpisodeTracker};
pub use exploration::EpsilonSchedule;
pub use replay_buffer::{ReplayBuffer, ReplayBufferConfig};
pub use target_network::{flatten_params, TargetNetwork, TargetSyncSchedule};
pub use transition::{Transition, TransitionBatch};
