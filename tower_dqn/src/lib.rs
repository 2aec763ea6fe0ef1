//! # Tower DQN: Online Double DQN for a Stacking Game
//!
//! A value-based agent that learns while it plays. The game connects over a
//! duplex byte stream and sends one observation per line; the agent answers
//! every line with an action index or `RESET`.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             Session                              │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  stream ──▶ LineFramer ──▶ Observation::parse                    │
//! │                                   │                              │
//! │                                   ▼                              │
//! │   ReplayBuffer ◀── push ── (pending state, action, reward, ...)  │
//! │        │                                                         │
//! │        └── sample ──▶ DqnLearner ──▶ DuelingQNetwork (online)    │
//! │                           │                                      │
//! │                           └── hard sync ──▶ TargetNetwork        │
//! │                                                                  │
//! │   EpsilonGreedy ──▶ AgentCommand ──▶ stream                      │
//! │                                                                  │
//! │   Checkpointer (every N episodes + on shutdown)                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use burn::backend::{Autodiff, NdArray};
//! use tower_dqn::{DqnConfig, DuelingQNetwork, Session, SessionConfig};
//!
//! type B = Autodiff<NdArray<f32>>;
//!
//! let dqn = DqnConfig::new().with_batch_size(256);
//! let optimizer = dqn.create_optimizer::<B, DuelingQNetwork<B>>();
//! let mut session = Session::<B, _>::new(
//!     &dqn,
//!     SessionConfig::new("tricky_towers_ai"),
//!     optimizer,
//!     Default::default(),
//! )?;
//! let outcome = session.run(tcp_stream)?;
//! ```

pub mod algorithms;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod metrics;
pub mod nn;
pub mod protocol;
pub mod session;

// Configuration
pub use config::{ConfigError, DqnConfig, SessionConfig};

// Experience and schedules
pub use core::{
    EpisodeSummary, EpisodeTracker, EpsilonSchedule, ReplayBuffer, ReplayBufferConfig,
    TargetNetwork, TargetSyncSchedule, Transition, TransitionBatch,
};

// Networks
pub use nn::{DuelingQNetwork, DuelingQNetworkConfig, QFunction};

// Learning
pub use algorithms::{ActionChoice, DqnLearner, EpsilonGreedy, LossInfo};

// Wire protocol
pub use protocol::{AgentCommand, Frame, LineFramer, Observation, ParseError};

// Model checkpointing
pub use checkpoint::{CheckpointError, Checkpointer, CheckpointerConfig};

pub use metrics::{
    ConsoleLogger, CsvLogger, EpisodeRecord, MetricsLogger, MultiLogger, SessionMetrics,
};

pub use session::{Session, SessionError, SessionOutcome, SessionState};
