//! Replies sent from the agent to the game.

use std::fmt;
use std::io::{self, Write};

/// One reply line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentCommand {
    /// Start a new episode. Sent on connect and after every terminal observation.
    Reset,
    /// Take the action with this index.
    Act(u32),
}

impl AgentCommand {
    /// Write the command followed by `\n`.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{self}")
    }
}

impl fmt::Display for AgentCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reset => f.write_str("RESET"),
            Self::Act(action) => write!(f, "{action}"),
        }
    }
}
