//! Line protocol spoken with the game.
//!
//! ```text
//!   game  ──  f1,...,f25|reward|done[|cause]\n  ──▶  agent
//!   game  ◀──  RESET\n  |  <action>\n           ──  agent
//! ```

pub mod command;
pub mod framing;
pub mod message;

pub use command::AgentCommand;
pub use framing::{Frame, LineFramer};
pub use message::{Observation, ParseError};
