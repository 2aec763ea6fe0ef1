//! Agent configuration.
//!
//! Two configuration structs cover the whole agent:
//!
//! - [`DqnConfig`]: learning hyperparameters (network shape, replay, Double DQN,
//!   exploration, optimizer)
//! - [`SessionConfig`]: everything about the stream session (checkpointing,
//!   reporting window, framing limits)
//!
//! Defaults reproduce the settings the agent was tuned with for the stacking game.

use std::path::PathBuf;

use burn::grad_clipping::GradientClippingConfig;
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, Optimizer};
use burn::tensor::backend::AutodiffBackend;

/// Configuration error returned by [`DqnConfig::validate`] and [`SessionConfig::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A size or interval that must be positive was zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    /// A probability or coefficient fell outside its valid range.
    #[error("{name} must be in {range}, got {value}")]
    OutOfRange {
        name: &'static str,
        range: &'static str,
        value: f64,
    },
    /// The replay buffer can never hold more than one batch, so learning would never start.
    #[error("memory_size ({memory_size}) must exceed batch_size ({batch_size})")]
    BufferTooSmall {
        memory_size: usize,
        batch_size: usize,
    },
}

// ============================================================================
// DQN Configuration
// ============================================================================

/// Hyperparameters for the Double DQN learner and its dueling Q-network.
#[derive(Debug, Clone, PartialEq)]
pub struct DqnConfig {
    // ========================================================================
    // Network Shape
    // ========================================================================
    /// Length of the observation feature vector.
    pub input_size: usize,

    /// Number of discrete actions.
    pub n_actions: usize,

    /// Width of the two shared feature layers.
    pub feature_size: usize,

    /// Width of the hidden layer in the value and advantage heads.
    pub head_size: usize,

    // ========================================================================
    // Replay
    // ========================================================================
    /// Replay buffer capacity (transitions).
    pub memory_size: usize,

    /// Transitions per gradient step. Learning starts once the buffer holds
    /// strictly more than this many transitions.
    pub batch_size: usize,

    // ========================================================================
    // Double DQN
    // ========================================================================
    /// Discount factor for future rewards.
    pub gamma: f32,

    /// Environment steps between hard target-network syncs.
    pub target_update: usize,

    /// Adam learning rate.
    pub learning_rate: f64,

    /// Maximum gradient norm. None = no clipping.
    pub max_grad_norm: Option<f32>,

    // ========================================================================
    // Exploration
    // ========================================================================
    /// Initial epsilon.
    pub epsilon_start: f32,

    /// Epsilon floor.
    pub epsilon_end: f32,

    /// Multiplicative decay applied once per environment step.
    pub epsilon_decay: f32,
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            input_size: 25,
            n_actions: 5,
            feature_size: 256,
            head_size: 128,

            memory_size: 100_000,
            batch_size: 512,

            gamma: 0.99,
            target_update: 1000,
            learning_rate: 1e-4,
            max_grad_norm: None,

            epsilon_start: 1.0,
            epsilon_end: 0.05,
            epsilon_decay: 0.9999,
        }
    }
}

impl DqnConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: set observation and action sizes.
    pub fn with_io(mut self, input_size: usize, n_actions: usize) -> Self {
        self.input_size = input_size;
        self.n_actions = n_actions;
        self
    }

    /// Builder pattern: set hidden layer widths.
    pub fn with_hidden(mut self, feature_size: usize, head_size: usize) -> Self {
        self.feature_size = feature_size;
        self.head_size = head_size;
        self
    }

    /// Builder pattern: set replay capacity.
    pub fn with_memory_size(mut self, memory_size: usize) -> Self {
        self.memory_size = memory_size;
        self
    }

    /// Builder pattern: set batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Builder pattern: set discount factor.
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    /// Builder pattern: set target sync interval.
    pub fn with_target_update(mut self, target_update: usize) -> Self {
        self.target_update = target_update;
        self
    }

    /// Builder pattern: set learning rate.
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Builder pattern: set gradient clipping.
    pub fn with_max_grad_norm(mut self, max_grad_norm: Option<f32>) -> Self {
        self.max_grad_norm = max_grad_norm;
        self
    }

    /// Builder pattern: set the exploration schedule.
    pub fn with_epsilon(mut self, start: f32, end: f32, decay: f32) -> Self {
        self.epsilon_start = start;
        self.epsilon_end = end;
        self.epsilon_decay = decay;
        self
    }

    /// Check the configuration for values that would break training.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("input_size", self.input_size),
            ("n_actions", self.n_actions),
            ("feature_size", self.feature_size),
            ("head_size", self.head_size),
            ("memory_size", self.memory_size),
            ("batch_size", self.batch_size),
            ("target_update", self.target_update),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }

        if self.memory_size <= self.batch_size {
            return Err(ConfigError::BufferTooSmall {
                memory_size: self.memory_size,
                batch_size: self.batch_size,
            });
        }

        check_range("gamma", self.gamma as f64, 0.0, 1.0, "[0, 1]")?;
        check_range("epsilon_end", self.epsilon_end as f64, 0.0, 1.0, "[0, 1]")?;
        check_range(
            "epsilon_start",
            self.epsilon_start as f64,
            self.epsilon_end as f64,
            1.0,
            "[epsilon_end, 1]",
        )?;
        if !(self.epsilon_decay > 0.0 && self.epsilon_decay <= 1.0) {
            return Err(ConfigError::OutOfRange {
                name: "epsilon_decay",
                range: "(0, 1]",
                value: self.epsilon_decay as f64,
            });
        }

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "learning_rate",
                range: "(0, inf)",
                value: self.learning_rate,
            });
        }

        if let Some(max_norm) = self.max_grad_norm {
            if !(max_norm.is_finite() && max_norm > 0.0) {
                return Err(ConfigError::OutOfRange {
                    name: "max_grad_norm",
                    range: "(0, inf)",
                    value: max_norm as f64,
                });
            }
        }

        Ok(())
    }

    /// Create the Adam optimizer for the online network.
    pub fn create_optimizer<B, M>(&self) -> impl Optimizer<M, B>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
    {
        let mut adam_config = AdamConfig::new();

        if let Some(max_norm) = self.max_grad_norm {
            adam_config =
                adam_config.with_grad_clipping(Some(GradientClippingConfig::Norm(max_norm)));
        }

        adam_config.init()
    }
}

fn check_range(
    name: &'static str,
    value: f64,
    low: f64,
    high: f64,
    range: &'static str,
) -> Result<(), ConfigError> {
    if value.is_finite() && value >= low && value <= high {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, range, value })
    }
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Settings for one streaming session with the game.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Checkpoint location. The recorder stores it with a `.bin` extension.
    pub checkpoint_path: PathBuf,

    /// Save a checkpoint after every N completed episodes.
    pub checkpoint_every_episodes: usize,

    /// Number of recent episodes in the rolling reward average.
    pub reward_window: usize,

    /// Bytes requested per read from the stream.
    pub read_chunk: usize,

    /// Longest unterminated line kept across reads before it is dropped.
    pub max_line_len: usize,

    /// Try to resume from `checkpoint_path` on startup.
    pub resume: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: PathBuf::from("tricky_towers_ai"),
            checkpoint_every_episodes: 50,
            reward_window: 50,
            read_chunk: 4096,
            max_line_len: 64 * 1024,
            resume: true,
        }
    }
}

impl SessionConfig {
    /// Create a config with the given checkpoint path.
    pub fn new(checkpoint_path: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_path: checkpoint_path.into(),
            ..Default::default()
        }
    }

    /// Builder pattern: set checkpoint interval in episodes.
    pub fn with_checkpoint_every(mut self, episodes: usize) -> Self {
        self.checkpoint_every_episodes = episodes;
        self
    }

    /// Builder pattern: set the rolling reward window.
    pub fn with_reward_window(mut self, window: usize) -> Self {
        self.reward_window = window;
        self
    }

    /// Builder pattern: set read chunk size.
    pub fn with_read_chunk(mut self, read_chunk: usize) -> Self {
        self.read_chunk = read_chunk;
        self
    }

    /// Builder pattern: set the partial-line limit.
    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    /// Builder pattern: enable or disable resuming from a checkpoint.
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("checkpoint_every_episodes", self.checkpoint_every_episodes),
            ("reward_window", self.reward_window),
            ("read_chunk", self.read_chunk),
            ("max_line_len", self.max_line_len),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        Ok(())
    }
}
