//! Connection-scoped training session.
//!
//! A [`Session`] owns the learner, replay buffer, exploration schedule and
//! checkpointer for one connected game, and drives them from the observation
//! stream.

mod session;

pub use session::{Session, SessionError, SessionOutcome, SessionState};

#[cfg(test)]
mod tests;
