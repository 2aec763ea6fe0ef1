//! Session metrics and episode logging.
//!
//! ## Metrics
//!
//! - [`SessionMetrics`]: Counters for steps, learning, syncs and dropped lines
//!
//! ## Loggers
//!
//! - [`ConsoleLogger`]: One line per episode on stdout
//! - [`CsvLogger`]: CSV file logging for analysis
//! - [`MultiLogger`]: Combine multiple loggers

pub mod logger;
pub mod session_metrics;

pub use logger::{ConsoleLogger, CsvLogger, EpisodeRecord, MetricsLogger, MultiLogger};
pub use session_metrics::SessionMetrics;
