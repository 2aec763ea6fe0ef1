//! Observation lines sent by the game.
//!
//! Format: `f1,f2,...,fN|reward|done[|cause]`
//!
//! - `f1..fN`: comma-separated floats, exactly `N = input_size` of them
//! - `reward`: float
//! - `done`: `0` or `1`
//! - `cause`: optional free text (may itself contain `|`)

use thiserror::Error;

/// Why a line could not be parsed. Malformed lines are skipped by the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("missing `{0}` field")]
    MissingField(&'static str),

    #[error("expected {expected} state values, found {found}")]
    StateArity { expected: usize, found: usize },

    #[error("invalid number in {field}: {value:?}")]
    InvalidNumber { field: String, value: String },

    #[error("done flag must be 0 or 1, got {0:?}")]
    InvalidDone(String),
}

/// One parsed observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub state: Vec<f32>,
    pub reward: f32,
    pub done: bool,
    /// Termination cause, when the game reported one on this line.
    pub cause: Option<String>,
}

impl Observation {
    /// Parse a single line (without its trailing newline).
    pub fn parse(line: &str, input_size: usize) -> Result<Self, ParseError> {
        let mut fields = line.trim().splitn(4, '|');

        let state_field = fields.next().ok_or(ParseError::MissingField("state"))?;
        let reward_field = fields.next().ok_or(ParseError::MissingField("reward"))?;
        let done_field = fields.next().ok_or(ParseError::MissingField("done"))?;
        let cause = fields.next().map(|c| c.trim().to_string());

        let tokens: Vec<&str> = state_field.split(',').collect();
        if tokens.len() != input_size {
            return Err(ParseError::StateArity {
                expected: input_size,
                found: tokens.len(),
            });
        }
        let state = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| parse_f32(token, || format!("state[{i}]")))
            .collect::<Result<Vec<f32>, _>>()?;

        let reward = parse_f32(reward_field, || "reward".to_string())?;

        let done = match done_field.trim() {
            "0" => false,
            "1" => true,
            other => return Err(ParseError::InvalidDone(other.to_string())),
        };

        Ok(Self {
            state,
            reward,
            done,
            cause,
        })
    }
}

fn parse_f32(token: &str, field: impl FnOnce() -> String) -> Result<f32, ParseError> {
    let token = token.trim();
    token.parse::<f32>().map_err(|_| ParseError::InvalidNumber {
        field: field(),
        value: token.to_string(),
    })
}
