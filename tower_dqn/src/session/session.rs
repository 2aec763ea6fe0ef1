//! Streaming training session.
//!
//! One session serves one connected game over a duplex byte stream:
//!
//! ```text
//! AwaitingConnection ──run()──▶ Streaming ──EOF──▶ Terminated
//!                                   │
//!                                   └──I/O error──▶ Faulted
//! ```
//!
//! For every observation line, in order:
//!
//! 1. accumulate the reward into the episode total
//! 2. push `(last_state, last_action, reward, state, done)` if a step is pending
//! 3. learn, once the buffer holds more than a batch
//! 4. choose the next action, then decay epsilon
//! 5. hard-sync the target network every `target_update` steps
//! 6. on `done`: close the episode and reply `RESET`; otherwise reply with the action
//!
//! Both exit states run the final checkpoint save before `run` returns.

use std::io::{self, ErrorKind, Read, Write};
use std::path::PathBuf;

use burn::module::AutodiffModule;
use burn::optim::Optimizer;
use burn::tensor::backend::AutodiffBackend;
use thiserror::Error;

use crate::algorithms::{DqnLearner, EpsilonGreedy};
use crate::checkpoint::{CheckpointError, Checkpointer, CheckpointerConfig};
use crate::config::{ConfigError, DqnConfig, SessionConfig};
use crate::core::{
    EpisodeTracker, EpsilonSchedule, ReplayBuffer, ReplayBufferConfig, TargetSyncSchedule,
};
use crate::metrics::{ConsoleLogger, EpisodeRecord, MetricsLogger, SessionMetrics};
use crate::nn::{DuelingQNetwork, DuelingQNetworkConfig};
use crate::protocol::{AgentCommand, Frame, LineFramer, Observation};

/// Errors that end or prevent a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("stream I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingConnection,
    Streaming,
    /// The peer closed the stream.
    Terminated,
    /// The stream failed with an I/O error.
    Faulted,
}

/// Summary returned by [`Session::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Completed episodes.
    pub episodes: usize,
    /// Observations processed.
    pub steps: usize,
    pub final_state: SessionState,
}

/// A step whose successor observation has not arrived yet.
struct PendingStep {
    state: Vec<f32>,
    action: u32,
}

/// Owns all training state for one connection.
pub struct Session<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<DuelingQNetwork<B>, B>,
{
    config: SessionConfig,
    input_size: usize,
    learner: DqnLearner<B, O>,
    buffer: ReplayBuffer,
    selector: EpsilonGreedy,
    sync_schedule: TargetSyncSchedule,
    episodes: EpisodeTracker,
    checkpointer: Checkpointer,
    logger: Box<dyn MetricsLogger>,
    metrics: SessionMetrics,
    pending: Option<PendingStep>,
    save_due: bool,
    state: SessionState,
}

impl<B, O> Session<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<DuelingQNetwork<B>, B>,
{
    /// Build networks, buffer and schedules, then try to resume from the checkpoint.
    ///
    /// A missing checkpoint starts fresh silently; an unreadable one starts
    /// fresh with a warning.
    pub fn new(
        dqn: &DqnConfig,
        config: SessionConfig,
        optimizer: O,
        device: B::Device,
    ) -> Result<Self, SessionError> {
        dqn.validate()?;
        config.validate()?;

        let policy = DuelingQNetworkConfig::from(dqn).init::<B>(&device);
        let learner = DqnLearner::new(policy, optimizer, dqn, device);
        let buffer = ReplayBuffer::new(ReplayBufferConfig::new(dqn.memory_size, dqn.input_size));
        let schedule = EpsilonSchedule::new(dqn.epsilon_start, dqn.epsilon_end, dqn.epsilon_decay);
        let selector = EpsilonGreedy::new(schedule, dqn.n_actions as u32);
        let checkpointer = Checkpointer::new(
            CheckpointerConfig::new(config.checkpoint_path.clone())
                .with_save_every_episodes(config.checkpoint_every_episodes),
        );

        let mut session = Self {
            input_size: dqn.input_size,
            learner,
            buffer,
            selector,
            sync_schedule: TargetSyncSchedule::new(dqn.target_update),
            episodes: EpisodeTracker::new(config.reward_window),
            checkpointer,
            logger: Box::new(ConsoleLogger::new()),
            metrics: SessionMetrics::new(),
            pending: None,
            save_due: false,
            state: SessionState::AwaitingConnection,
            config,
        };

        if session.config.resume {
            session.try_resume();
        }

        Ok(session)
    }

    /// Replace the episode logger.
    pub fn with_logger(mut self, logger: Box<dyn MetricsLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Make replay sampling and exploration reproducible.
    ///
    /// Discards anything already in the replay buffer.
    pub fn with_seed(mut self, seed: u64) -> Self {
        let buffer_config = self.buffer.config().clone();
        self.buffer = ReplayBuffer::with_seed(buffer_config, seed);
        let schedule = self.selector.schedule().clone();
        self.selector =
            EpsilonGreedy::with_seed(schedule, self.selector.n_actions(), seed.wrapping_add(1));
        self
    }

    fn try_resume(&mut self) {
        let template = self.learner.policy().clone();
        match self.checkpointer.load::<B, _>(template, self.learner.device()) {
            Ok(policy) => {
                self.learner.load_policy(policy);
                log::info!(
                    "resumed from checkpoint {}",
                    self.checkpointer.file_path().display()
                );
            }
            Err(CheckpointError::NotFound(path)) => {
                log::info!("no checkpoint at {}, starting fresh", path.display());
            }
            Err(e) => {
                log::warn!("ignoring unreadable checkpoint, starting fresh: {e}");
            }
        }
    }

    /// Serve one connection until it closes or fails.
    ///
    /// Sends `RESET` first, then answers every observation line. The final
    /// checkpoint save runs on every exit path before this returns.
    pub fn run<S: Read + Write>(&mut self, mut stream: S) -> Result<SessionOutcome, SessionError> {
        self.state = SessionState::Streaming;
        log::info!("session streaming");

        let result = self.stream_loop(&mut stream);
        self.state = match &result {
            Ok(()) => SessionState::Terminated,
            Err(_) => SessionState::Faulted,
        };

        match &result {
            Ok(()) => log::info!("peer closed the stream"),
            Err(e) => log::error!("session faulted: {e}"),
        }
        // Shutdown logs its own failure; the stream outcome decides the result.
        let _ = self.shutdown();
        drop(stream);

        result?;
        Ok(self.outcome())
    }

    fn stream_loop<S: Read + Write>(&mut self, stream: &mut S) -> Result<(), SessionError> {
        AgentCommand::Reset.write_to(stream)?;
        stream.flush()?;

        let mut framer = LineFramer::new(self.config.max_line_len);
        let mut chunk = vec![0u8; self.config.read_chunk];

        loop {
            let n = match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            for frame in framer.push(&chunk[..n]) {
                self.handle_frame(frame, stream)?;
            }
        }

        if let Some(frame) = framer.finish() {
            self.handle_frame(frame, stream)?;
        }
        Ok(())
    }

    fn handle_frame<W: Write>(&mut self, frame: Frame, out: &mut W) -> io::Result<()> {
        match frame {
            Frame::Line(line) => self.handle_line(&line, out).map(|_| ()),
            Frame::Oversized => {
                log::debug!(
                    "dropping line longer than {} bytes",
                    self.config.max_line_len
                );
                self.metrics.increment_skipped_lines();
                Ok(())
            }
        }
    }

    /// Process one observation line and write the reply to `out`.
    ///
    /// Returns the reply, or `None` when the line was malformed and skipped.
    pub fn handle_line<W: Write>(
        &mut self,
        line: &str,
        out: &mut W,
    ) -> io::Result<Option<AgentCommand>> {
        let observation = match Observation::parse(line, self.input_size) {
            Ok(observation) => observation,
            Err(e) => {
                log::debug!("skipping malformed line: {e}");
                self.metrics.increment_skipped_lines();
                return Ok(None);
            }
        };

        let command = self.advance(observation);
        command.write_to(out)?;
        out.flush()?;

        if std::mem::take(&mut self.save_due) {
            if let Err(e) = self.save_checkpoint() {
                log::warn!("periodic checkpoint failed: {e}");
            }
        }

        Ok(Some(command))
    }

    fn advance(&mut self, observation: Observation) -> AgentCommand {
        let Observation {
            state,
            reward,
            done,
            cause,
        } = observation;

        if let Some(cause) = cause {
            self.episodes.set_cause(&cause);
        }
        self.episodes.add_reward(reward);

        if let Some(pending) = self.pending.take() {
            self.buffer
                .push(&pending.state, pending.action, reward, &state, done);
        }

        if let Some(info) = self.learner.train_step(&mut self.buffer) {
            self.metrics.record_learn_step(info);
        }

        let choice = {
            let inference = self.learner.policy().valid();
            self.selector
                .choose::<B::InnerBackend, _>(&inference, &state, self.learner.device())
        };
        if choice.explored {
            self.metrics.increment_explored_actions();
        }
        self.selector.decay();

        if self.sync_schedule.tick() {
            self.learner.sync_target();
            self.metrics.increment_target_syncs();
            log::debug!("target network synced at step {}", self.metrics.env_steps());
        }
        self.metrics.increment_env_steps();

        if done {
            let summary = self.episodes.finish_episode();
            let record = EpisodeRecord::new(&summary).with_progress(
                self.selector.epsilon(),
                self.metrics.env_steps(),
                self.buffer.len(),
            );
            self.logger.log_episode(&record);
            self.save_due = self.checkpointer.should_save(summary.episode);
            AgentCommand::Reset
        } else {
            self.pending = Some(PendingStep {
                state,
                action: choice.action,
            });
            AgentCommand::Act(choice.action)
        }
    }

    /// Save the policy network now.
    pub fn save_checkpoint(&mut self) -> Result<PathBuf, SessionError> {
        let path = self.checkpointer.save::<B, _>(self.learner.policy())?;
        log::info!("saved checkpoint to {}", path.display());
        Ok(path)
    }

    /// Final save and log flush. Failures are logged, not retried.
    pub fn shutdown(&mut self) -> Result<PathBuf, SessionError> {
        self.logger.flush();
        let result = self.save_checkpoint();
        if let Err(e) = &result {
            log::error!("final checkpoint save failed: {e}");
        }
        result
    }

    /// Current outcome counters.
    pub fn outcome(&self) -> SessionOutcome {
        SessionOutcome {
            episodes: self.episodes.episodes(),
            steps: self.metrics.env_steps(),
            final_state: self.state,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    pub fn episodes(&self) -> &EpisodeTracker {
        &self.episodes
    }

    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    pub fn learner(&self) -> &DqnLearner<B, O> {
        &self.learner
    }

    pub fn checkpointer(&self) -> &Checkpointer {
        &self.checkpointer
    }

    /// Current exploration rate.
    pub fn epsilon(&self) -> f32 {
        self.selector.epsilon()
    }

    /// Whether a (state, action) pair is waiting for its successor observation.
    pub fn has_pending_step(&self) -> bool {
        self.pending.is_some()
    }
}
