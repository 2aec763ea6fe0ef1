//! Policy checkpointing.
//!
//! A checkpoint holds the online network's parameters only: no optimizer
//! state, no target network, no replay buffer. It is written with burn's
//! `BinFileRecorder`, which appends the `.bin` extension to the configured path.

use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings, RecorderError};
use burn::tensor::backend::Backend;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration for the checkpointer.
#[derive(Debug, Clone)]
pub struct CheckpointerConfig {
    /// Checkpoint path without extension.
    pub path: PathBuf,
    /// Completed episodes between periodic saves.
    pub save_every_episodes: usize,
}

impl Default for CheckpointerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tricky_towers_ai"),
            save_every_episodes: 50,
        }
    }
}

impl CheckpointerConfig {
    /// Create a config writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the periodic save interval in episodes.
    pub fn with_save_every_episodes(mut self, episodes: usize) -> Self {
        self.save_every_episodes = episodes;
        self
    }
}

/// Error type for checkpointing operations.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// No checkpoint file exists yet.
    #[error("no checkpoint at {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be decoded into the network.
    #[error("checkpoint could not be decoded: {0}")]
    Corrupt(String),

    #[error("checkpoint I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Saves and restores the policy network.
#[derive(Debug, Clone)]
pub struct Checkpointer {
    config: CheckpointerConfig,
    saves: usize,
}

impl Checkpointer {
    /// Create a new checkpointer. Nothing touches the filesystem until the first save.
    pub fn new(config: CheckpointerConfig) -> Self {
        Self { config, saves: 0 }
    }

    /// Get the configuration.
    pub fn config(&self) -> &CheckpointerConfig {
        &self.config
    }

    /// Path of the file the recorder actually reads and writes.
    pub fn file_path(&self) -> PathBuf {
        self.config.path.with_extension("bin")
    }

    /// Whether a periodic save is due after `episode` completed episodes.
    pub fn should_save(&self, episode: usize) -> bool {
        self.config.save_every_episodes > 0
            && episode > 0
            && episode % self.config.save_every_episodes == 0
    }

    /// Write `model`'s parameters, replacing any previous checkpoint.
    pub fn save<B: Backend, M: Module<B>>(&mut self, model: &M) -> Result<PathBuf, CheckpointError> {
        if let Some(parent) = self.config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        // Surface the OS error for an unwritable target before the recorder flattens it.
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.file_path())?;

        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        model
            .clone()
            .save_file(&self.config.path, &recorder)
            .map_err(|e| CheckpointError::Io(recorder_io_error(e)))?;

        self.saves += 1;
        Ok(self.file_path())
    }

    /// Load parameters into `model_template`.
    ///
    /// The template must have the same architecture as the saved network.
    pub fn load<B: Backend, M: Module<B>>(
        &self,
        model_template: M,
        device: &B::Device,
    ) -> Result<M, CheckpointError> {
        let file = self.file_path();
        if !file.exists() {
            return Err(CheckpointError::NotFound(file));
        }
        ensure_readable(&file)?;

        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        model_template
            .load_file(&self.config.path, &recorder, device)
            .map_err(|e| match e {
                RecorderError::FileNotFound(msg) => {
                    CheckpointError::Io(io::Error::new(ErrorKind::NotFound, msg))
                }
                other => CheckpointError::Corrupt(other.to_string()),
            })
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

/// Open and read one byte, so permission and file-type errors keep their `io::ErrorKind`.
fn ensure_readable(file: &Path) -> io::Result<()> {
    io::copy(&mut File::open(file)?.take(1), &mut io::sink())?;
    Ok(())
}

fn recorder_io_error(error: RecorderError) -> io::Error {
    match error {
        RecorderError::FileNotFound(msg) => io::Error::new(ErrorKind::NotFound, msg),
        other => io::Error::other(other.to_string()),
    }
}
