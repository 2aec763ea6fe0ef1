//! Episode loggers.
//!
//! Provides different output backends for completed-episode records.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::core::EpisodeSummary;

/// One completed episode, as handed to loggers.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeRecord {
    /// 1-based episode index.
    pub episode: usize,
    /// Episode total reward.
    pub reward: f32,
    /// Rolling average reward.
    pub avg_reward: f32,
    /// Last termination cause.
    pub cause: String,
    /// Exploration rate when the episode ended.
    pub epsilon: f32,
    /// Environment steps processed so far.
    pub steps: usize,
    /// Replay buffer fill.
    pub buffer_len: usize,
}

impl EpisodeRecord {
    /// Create a record from an episode summary.
    pub fn new(summary: &EpisodeSummary) -> Self {
        Self {
            episode: summary.episode,
            reward: summary.reward,
            avg_reward: summary.avg_reward,
            cause: summary.cause.clone(),
            epsilon: 0.0,
            steps: 0,
            buffer_len: 0,
        }
    }

    /// Set training progress fields.
    pub fn with_progress(mut self, epsilon: f32, steps: usize, buffer_len: usize) -> Self {
        self.epsilon = epsilon;
        self.steps = steps;
        self.buffer_len = buffer_len;
        self
    }
}

/// Logger trait for different logging backends.
pub trait MetricsLogger: Send {
    /// Log a completed episode.
    fn log_episode(&mut self, record: &EpisodeRecord);

    /// Flush any buffered output.
    fn flush(&mut self);
}

/// Prints one line per episode to stdout.
#[derive(Debug, Default)]
pub struct ConsoleLogger;

impl ConsoleLogger {
    pub fn new() -> Self {
        Self
    }

    /// The console line for a record.
    pub fn format(record: &EpisodeRecord) -> String {
        format!(
            "Ep: {} | R: {:.1} | Avg: {:.1} | Cause: {}",
            record.episode, record.reward, record.avg_reward, record.cause
        )
    }
}

impl MetricsLogger for ConsoleLogger {
    fn log_episode(&mut self, record: &EpisodeRecord) {
        println!("{}", Self::format(record));
    }

    fn flush(&mut self) {
        // stdout is line-buffered
    }
}

/// CSV file logger for analysis.
pub struct CsvLogger {
    writer: BufWriter<File>,
}

impl CsvLogger {
    /// Create the file and write the header row.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "episode,reward,avg_reward,epsilon,steps,buffer_len,cause")?;

        Ok(Self { writer })
    }
}

impl MetricsLogger for CsvLogger {
    fn log_episode(&mut self, record: &EpisodeRecord) {
        if let Err(e) = writeln!(
            self.writer,
            "{},{:.4},{:.4},{:.6},{},{},{}",
            record.episode,
            record.reward,
            record.avg_reward,
            record.epsilon,
            record.steps,
            record.buffer_len,
            csv_field(&record.cause)
        ) {
            log::warn!("failed to write CSV row: {e}");
        }
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}

impl Drop for CsvLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Quote a free-text field when it would break the row.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Multi-logger that writes to multiple backends.
#[derive(Default)]
pub struct MultiLogger {
    loggers: Vec<Box<dyn MetricsLogger>>,
}

impl MultiLogger {
    /// Create a new multi-logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a logger.
    pub fn add<L: MetricsLogger + 'static>(mut self, logger: L) -> Self {
        self.loggers.push(Box::new(logger));
        self
    }

    /// Number of attached loggers.
    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }
}

impl MetricsLogger for MultiLogger {
    fn log_episode(&mut self, record: &EpisodeRecord) {
        for logger in &mut self.loggers {
            logger.log_episode(record);
        }
    }

    fn flush(&mut self) {
        for logger in &mut self.loggers {
            logger.flush();
        }
    }
}
