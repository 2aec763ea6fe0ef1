//! Neural network modules.
//!
//! - [`dueling`]: Dueling Q-network with separate value and advantage streams

pub mod dueling;

pub use dueling::{dueling_combine, DuelingQNetwork, DuelingQNetworkConfig, QFunction};
