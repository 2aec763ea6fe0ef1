//! Model checkpointing module.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tower_dqn::checkpoint::{Checkpointer, CheckpointerConfig, CheckpointError};
//!
//! let mut checkpointer = Checkpointer::new(CheckpointerConfig::new("tricky_towers_ai"));
//!
//! // On startup:
//! match checkpointer.load(network.clone(), &device) {
//!     Ok(loaded) => network = loaded,
//!     Err(CheckpointError::NotFound(_)) => {}
//!     Err(e) => log::warn!("starting fresh: {e}"),
//! }
//!
//! // Every 50 episodes:
//! if checkpointer.should_save(episode) {
//!     checkpointer.save(&network)?;
//! }
//! ```

pub mod checkpointer;

pub use checkpointer::{CheckpointError, Checkpointer, CheckpointerConfig};
