//! End-to-end tests driving a [`Session`] over a scripted byte stream.

use super::*;
use crate::checkpoint::CheckpointError;
use crate::config::{DqnConfig, SessionConfig};
use crate::core::flatten_params;
use crate::metrics::{EpisodeRecord, MetricsLogger};
use crate::nn::DuelingQNetwork;
use crate::protocol::AgentCommand;
use burn::backend::{Autodiff, NdArray};
use burn::optim::Optimizer;
use burn::prelude::*;
use std::fs;
use std::io::{self, ErrorKind, Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

type B = Autodiff<NdArray<f32>>;

// =============================================================================
// Test Helpers and Mock Types
// =============================================================================

/// Duplex stream that replays a fixed script in chunks and records replies.
struct ScriptedPeer {
    input: Vec<u8>,
    cursor: usize,
    chunk: usize,
    /// Fail the first read after the script is exhausted instead of closing.
    fault_at_end: bool,
    output: Vec<u8>,
}

impl ScriptedPeer {
    fn new(script: &str) -> Self {
        Self {
            input: script.as_bytes().to_vec(),
            cursor: 0,
            chunk: usize::MAX,
            fault_at_end: false,
            output: Vec::new(),
        }
    }

    fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk;
        self
    }

    fn with_fault(mut self) -> Self {
        self.fault_at_end = true;
        self
    }

    fn replies(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.output)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Read for ScriptedPeer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.input.len() - self.cursor;
        if remaining == 0 {
            if self.fault_at_end {
                return Err(io::Error::new(ErrorKind::ConnectionReset, "peer vanished"));
            }
            return Ok(0);
        }
        let n = remaining.min(self.chunk).min(buf.len());
        buf[..n].copy_from_slice(&self.input[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }
}

impl Write for ScriptedPeer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Logger that keeps every record for inspection.
struct Collecting(Arc<Mutex<Vec<EpisodeRecord>>>);

impl MetricsLogger for Collecting {
    fn log_episode(&mut self, record: &EpisodeRecord) {
        self.0.lock().unwrap().push(record.clone());
    }

    fn flush(&mut self) {}
}

fn small_dqn() -> DqnConfig {
    DqnConfig::default()
        .with_io(4, 3)
        .with_hidden(16, 8)
        .with_memory_size(128)
        .with_batch_size(4)
}

fn session_config(dir: &Path) -> SessionConfig {
    SessionConfig::new(dir.join("ckpt").join("agent"))
}

fn make_session(
    dqn: &DqnConfig,
    config: SessionConfig,
) -> Session<B, impl Optimizer<DuelingQNetwork<B>, B>> {
    let device = <B as Backend>::Device::default();
    let optimizer = dqn.create_optimizer::<B, DuelingQNetwork<B>>();
    Session::new(dqn, config, optimizer, device)
        .unwrap()
        .with_seed(7)
}

fn observation(values: [f32; 4], reward: f32, done: bool) -> String {
    let features: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("{}|{}|{}\n", features.join(","), reward, u8::from(done))
}

fn is_action(reply: &str, n_actions: u32) -> bool {
    reply.parse::<u32>().map(|a| a < n_actions).unwrap_or(false)
}

// =============================================================================
// Stream Handling
// =============================================================================

#[test]
fn test_two_line_episode_end_to_end() {
    let dir = tempdir().unwrap();
    let records = Arc::new(Mutex::new(Vec::new()));
    let mut session = make_session(&small_dqn(), session_config(dir.path()))
        .with_logger(Box::new(Collecting(Arc::clone(&records))));

    let mut peer = ScriptedPeer::new("0.1,0.2,0.3,0.4|0.5|0\n0.5,0.6,0.7,0.8|1.0|1|fell\n");
    let outcome = session.run(&mut peer).unwrap();

    let replies = peer.replies();
    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0], "RESET");
    assert!(is_action(&replies[1], 3), "unexpected reply {:?}", replies[1]);
    assert_eq!(replies[2], "RESET");

    assert_eq!(outcome.episodes, 1);
    assert_eq!(outcome.steps, 2);
    assert_eq!(outcome.final_state, SessionState::Terminated);

    assert_eq!(session.buffer().len(), 1);
    let stored = session.buffer().get(0).unwrap();
    assert_eq!(stored.state, vec![0.1, 0.2, 0.3, 0.4]);
    assert_eq!(stored.next_state, vec![0.5, 0.6, 0.7, 0.8]);
    assert_eq!(stored.reward, 1.0);
    assert!(stored.done);
    assert!(!session.has_pending_step());

    let records = records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].episode, 1);
    assert!((records[0].reward - 1.5).abs() < 1e-6);
    assert_eq!(records[0].cause, "fell");
}

#[test]
fn test_first_observation_stores_nothing() {
    let dir = tempdir().unwrap();
    let mut session = make_session(&small_dqn(), session_config(dir.path()));
    let mut out = Vec::new();

    let reply = session.handle_line("0,0,0,0|0|0", &mut out).unwrap();
    assert!(matches!(reply, Some(AgentCommand::Act(a)) if a < 3));
    assert!(session.buffer().is_empty());
    assert!(session.has_pending_step());
}

#[test]
fn test_malformed_lines_are_skipped() {
    let dir = tempdir().unwrap();
    let mut session = make_session(&small_dqn(), session_config(dir.path()));
    let mut out = Vec::new();

    assert_eq!(session.handle_line("garbage", &mut out).unwrap(), None);
    assert_eq!(session.handle_line("1,2,3|0|0", &mut out).unwrap(), None);
    assert_eq!(session.handle_line("1,2,3,x|0|0", &mut out).unwrap(), None);
    assert_eq!(session.handle_line("1,2,3,4|0|2", &mut out).unwrap(), None);

    assert!(out.is_empty(), "no reply for skipped lines");
    assert_eq!(session.metrics().skipped_lines(), 4);
    assert_eq!(session.metrics().env_steps(), 0);
    assert!(!session.has_pending_step());
}

#[test]
fn test_malformed_line_does_not_break_the_stream() {
    let dir = tempdir().unwrap();
    let mut session = make_session(&small_dqn(), session_config(dir.path()));

    let script = format!(
        "{}not|a|line\n{}",
        observation([0.0; 4], 0.0, false),
        observation([1.0; 4], 1.0, true)
    );
    let mut peer = ScriptedPeer::new(&script);
    session.run(&mut peer).unwrap();

    let replies = peer.replies();
    assert_eq!(replies.len(), 3);
    assert_eq!(replies[2], "RESET");
    assert_eq!(session.metrics().skipped_lines(), 1);
    assert_eq!(session.buffer().len(), 1);
}

#[test]
fn test_lines_split_across_reads() {
    let dir = tempdir().unwrap();
    let mut session = make_session(&small_dqn(), session_config(dir.path()));

    let script: String = (0..5)
        .map(|i| observation([i as f32; 4], 0.25, false))
        .collect();
    let mut peer = ScriptedPeer::new(&script).with_chunk(3);
    let outcome = session.run(&mut peer).unwrap();

    assert_eq!(outcome.steps, 5);
    assert_eq!(session.metrics().skipped_lines(), 0);
    let replies = peer.replies();
    assert_eq!(replies.len(), 6);
    assert!(replies[1..].iter().all(|r| is_action(r, 3)));
    assert_eq!(session.buffer().len(), 4);
}

#[test]
fn test_small_read_buffer_reassembles_lines() {
    let dir = tempdir().unwrap();
    let config = session_config(dir.path()).with_read_chunk(5);
    let mut session = make_session(&small_dqn(), config);

    let script = format!(
        "{}{}",
        observation([0.5; 4], 0.0, false),
        observation([1.5; 4], 2.0, true)
    );
    let mut peer = ScriptedPeer::new(&script);
    let outcome = session.run(&mut peer).unwrap();

    assert_eq!(outcome.steps, 2);
    assert_eq!(outcome.episodes, 1);
    assert_eq!(session.metrics().skipped_lines(), 0);
    assert_eq!(peer.replies().last().map(String::as_str), Some("RESET"));
}

#[test]
fn test_reward_window_limits_average() {
    let dir = tempdir().unwrap();
    let records = Arc::new(Mutex::new(Vec::new()));
    let config = session_config(dir.path()).with_reward_window(2);
    let mut session = make_session(&small_dqn(), config)
        .with_logger(Box::new(Collecting(Arc::clone(&records))));
    let mut out = Vec::new();

    for reward in [1.0f32, 2.0, 4.0] {
        let line = observation([0.0; 4], reward, true);
        session.handle_line(line.trim(), &mut out).unwrap();
    }

    let records = records.lock().unwrap();
    assert_eq!(records.len(), 3);
    assert!((records[2].avg_reward - 3.0).abs() < 1e-6);
}

#[test]
fn test_unterminated_final_line_is_processed() {
    let dir = tempdir().unwrap();
    let mut session = make_session(&small_dqn(), session_config(dir.path()));

    let mut peer = ScriptedPeer::new("1,2,3,4|0|0");
    let outcome = session.run(&mut peer).unwrap();

    assert_eq!(outcome.steps, 1);
    assert_eq!(peer.replies().len(), 2);
}

#[test]
fn test_oversized_line_is_dropped() {
    let dir = tempdir().unwrap();
    let config = session_config(dir.path()).with_max_line_len(32);
    let mut session = make_session(&small_dqn(), config);

    let long = format!("{}|0|0\n", vec!["0.000001"; 4].join(","));
    let script = format!("{long}1,2,3,4|0|0\n");
    let mut peer = ScriptedPeer::new(&script);
    session.run(&mut peer).unwrap();

    assert_eq!(session.metrics().skipped_lines(), 1);
    assert_eq!(session.metrics().env_steps(), 1);
}

#[test]
fn test_reset_ends_episode_and_clears_pending() {
    let dir = tempdir().unwrap();
    let mut session = make_session(&small_dqn(), session_config(dir.path()));
    let mut out = Vec::new();

    session.handle_line("0,0,0,0|0|0", &mut out).unwrap();
    let reply = session.handle_line("1,1,1,1|-1|1|hit", &mut out).unwrap();
    assert_eq!(reply, Some(AgentCommand::Reset));
    assert!(!session.has_pending_step());

    // The first step of the next episode must not be linked to the terminal one.
    session.handle_line("2,2,2,2|0|0", &mut out).unwrap();
    assert_eq!(session.buffer().len(), 1);
    assert_eq!(session.episodes().episodes(), 1);
    assert_eq!(session.episodes().current_reward(), 0.0);
}

// =============================================================================
// Learning and Target Sync
// =============================================================================

#[test]
fn test_learning_starts_after_more_than_a_batch() {
    let dir = tempdir().unwrap();
    let mut session = make_session(&small_dqn(), session_config(dir.path()));
    let mut out = Vec::new();

    // Observation k stores k-1 transitions; batch 4 needs 5.
    for i in 0..5 {
        let line = observation([i as f32; 4], 0.1, false);
        session.handle_line(line.trim(), &mut out).unwrap();
    }
    assert_eq!(session.metrics().learn_steps(), 0);

    for i in 5..8 {
        let line = observation([i as f32; 4], 0.1, false);
        session.handle_line(line.trim(), &mut out).unwrap();
    }
    assert_eq!(session.metrics().learn_steps(), 3);
    assert_eq!(session.learner().learn_steps(), 3);
    assert!(session.metrics().last_loss().unwrap().loss.is_finite());
}

#[test]
fn test_target_syncs_every_interval() {
    let dir = tempdir().unwrap();
    let dqn = small_dqn().with_target_update(3);
    let mut session = make_session(&dqn, session_config(dir.path()));
    let mut out = Vec::new();

    for i in 0..7 {
        let line = observation([i as f32; 4], 0.0, false);
        session.handle_line(line.trim(), &mut out).unwrap();
    }
    // Steps 0, 3 and 6.
    assert_eq!(session.metrics().target_syncs(), 3);
    assert_eq!(
        flatten_params(session.learner().target().model()),
        flatten_params(session.learner().policy())
    );
}

#[test]
fn test_explored_actions_counted() {
    let dir = tempdir().unwrap();
    let always = small_dqn().with_epsilon(1.0, 1.0, 1.0);
    let mut session = make_session(&always, session_config(dir.path()));
    let mut out = Vec::new();

    for _ in 0..6 {
        session.handle_line("0,0,0,0|0|0", &mut out).unwrap();
    }
    assert_eq!(session.metrics().explored_actions(), 6);

    let dir = tempdir().unwrap();
    let never = small_dqn().with_epsilon(0.0, 0.0, 1.0);
    let mut session = make_session(&never, session_config(dir.path()));
    for _ in 0..6 {
        session.handle_line("0,0,0,0|0|0", &mut out).unwrap();
    }
    assert_eq!(session.metrics().explored_actions(), 0);
    assert_eq!(session.metrics().env_steps(), 6);
}

#[test]
fn test_epsilon_decays_per_step() {
    let dir = tempdir().unwrap();
    let dqn = small_dqn().with_epsilon(1.0, 0.1, 0.5);
    let mut session = make_session(&dqn, session_config(dir.path()));
    let mut out = Vec::new();

    for _ in 0..2 {
        session.handle_line("0,0,0,0|0|0", &mut out).unwrap();
    }
    assert!((session.epsilon() - 0.25).abs() < 1e-6);

    for _ in 0..10 {
        session.handle_line("0,0,0,0|0|0", &mut out).unwrap();
    }
    assert!((session.epsilon() - 0.1).abs() < 1e-6);
}

// =============================================================================
// Checkpointing and Shutdown
// =============================================================================

#[test]
fn test_stream_close_saves_checkpoint() {
    let dir = tempdir().unwrap();
    let mut session = make_session(&small_dqn(), session_config(dir.path()));

    let mut peer = ScriptedPeer::new("1,2,3,4|0|0\n");
    session.run(&mut peer).unwrap();

    assert!(session.checkpointer().file_path().exists());
    assert_eq!(session.checkpointer().saves(), 1);
    assert_eq!(session.state(), SessionState::Terminated);
}

#[test]
fn test_io_fault_still_saves_checkpoint() {
    let dir = tempdir().unwrap();
    let mut session = make_session(&small_dqn(), session_config(dir.path()));

    let mut peer = ScriptedPeer::new("1,2,3,4|0|0\n").with_fault();
    let result = session.run(&mut peer);

    assert!(matches!(result, Err(SessionError::Io(_))));
    assert_eq!(session.state(), SessionState::Faulted);
    assert!(session.checkpointer().file_path().exists());
    assert_eq!(session.metrics().env_steps(), 1);
}

#[test]
fn test_periodic_checkpoint_after_episodes() {
    let dir = tempdir().unwrap();
    let config = session_config(dir.path()).with_checkpoint_every(2);
    let mut session = make_session(&small_dqn(), config);
    let mut out = Vec::new();

    for episode in 1..=4 {
        session.handle_line("0,0,0,0|0|0", &mut out).unwrap();
        session.handle_line("1,1,1,1|1|1|fell", &mut out).unwrap();
        assert_eq!(session.checkpointer().saves(), episode / 2);
    }
}

#[test]
fn test_resume_restores_saved_policy() {
    let dir = tempdir().unwrap();
    let dqn = small_dqn();

    let saved = {
        let mut first = make_session(&dqn, session_config(dir.path()));
        let mut peer = ScriptedPeer::new("1,2,3,4|0|0\n");
        first.run(&mut peer).unwrap();
        flatten_params(first.learner().policy())
    };

    let resumed = make_session(&dqn, session_config(dir.path()));
    assert_eq!(flatten_params(resumed.learner().policy()), saved);
    assert_eq!(flatten_params(resumed.learner().target().model()), saved);
}

#[test]
fn test_unreadable_checkpoint_starts_fresh() {
    let dir = tempdir().unwrap();
    let config = session_config(dir.path());
    let file = config.checkpoint_path.with_extension("bin");
    fs::create_dir_all(file.parent().unwrap()).unwrap();
    fs::write(&file, b"").unwrap();

    let session = make_session(&small_dqn(), config);
    assert_eq!(session.state(), SessionState::AwaitingConnection);
    assert_eq!(
        flatten_params(session.learner().target().model()),
        flatten_params(session.learner().policy())
    );
}

#[test]
fn test_shutdown_reports_save_failure() {
    let dir = tempdir().unwrap();
    // A regular file where the checkpoint directory should be.
    let blocker = dir.path().join("ckpt");
    fs::write(&blocker, b"not a directory").unwrap();

    let mut session = make_session(&small_dqn(), session_config(dir.path()));
    let result = session.shutdown();
    assert!(matches!(
        result,
        Err(SessionError::Checkpoint(CheckpointError::Io(_)))
    ));
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempdir().unwrap();
    let dqn = small_dqn().with_batch_size(0);
    let device = <B as Backend>::Device::default();
    let optimizer = dqn.create_optimizer::<B, DuelingQNetwork<B>>();

    let result = Session::new(&dqn, session_config(dir.path()), optimizer, device);
    assert!(matches!(result, Err(SessionError::Config(_))));
}
