//! Training server for the stacking game.
//!
//! Listens for one game connection, then learns online from its observation
//! stream until the game disconnects.
//!
//! ```bash
//! cargo run --release -- --port 5005 --checkpoint tricky_towers_ai --csv episodes.csv
//! ```

use std::net::TcpListener;
use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::backend::{Autodiff, NdArray};
use clap::Parser;

use tower_dqn::{
    ConsoleLogger, CsvLogger, DqnConfig, DuelingQNetwork, MultiLogger, Session, SessionConfig,
};

type TrainBackend = Autodiff<NdArray<f32>>;

#[derive(Parser)]
#[command(
    name = "tower-dqn",
    about = "Online Double DQN agent for the stacking game"
)]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = 5005)]
    port: u16,
    /// Checkpoint path; `.bin` is appended.
    #[arg(long, default_value = "tricky_towers_ai")]
    checkpoint: PathBuf,
    #[arg(long, default_value_t = 50)]
    checkpoint_every: usize,
    /// Start from fresh parameters even if a checkpoint exists.
    #[arg(long, default_value_t = false)]
    no_resume: bool,
    /// Also append episode summaries to this CSV file.
    #[arg(long)]
    csv: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 1e-4)]
    lr: f64,
    #[arg(long, default_value_t = 512)]
    batch_size: usize,
    #[arg(long, default_value_t = 100_000)]
    memory_size: usize,
    /// Clip gradients to this global L2 norm.
    #[arg(long)]
    max_grad_norm: Option<f32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let args = Args::parse();

    let dqn = DqnConfig::new()
        .with_learning_rate(args.lr)
        .with_batch_size(args.batch_size)
        .with_memory_size(args.memory_size)
        .with_max_grad_norm(args.max_grad_norm);
    let session_config = SessionConfig::new(&args.checkpoint)
        .with_checkpoint_every(args.checkpoint_every)
        .with_resume(!args.no_resume);

    let mut logger = MultiLogger::new().add(ConsoleLogger::new());
    if let Some(path) = &args.csv {
        let csv = CsvLogger::new(path)
            .with_context(|| format!("failed to open CSV log {}", path.display()))?;
        logger = logger.add(csv);
    }

    let device = Default::default();
    let optimizer = dqn.create_optimizer::<TrainBackend, DuelingQNetwork<TrainBackend>>();
    let mut session = Session::<TrainBackend, _>::new(&dqn, session_config, optimizer, device)
        .context("failed to initialize training session")?
        .with_logger(Box::new(logger));
    if let Some(seed) = args.seed {
        session = session.with_seed(seed);
    }

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr).with_context(|| format!("failed to bind {addr}"))?;
    log::info!("waiting for the game on {addr}");

    let (stream, peer) = listener.accept().context("failed to accept connection")?;
    stream.set_nodelay(true).context("failed to disable Nagle")?;
    log::info!("game connected from {peer}");

    let outcome = session.run(stream).context("training session failed")?;
    log::info!(
        "session ended after {} episodes, {} steps",
        outcome.episodes,
        outcome.steps
    );
    Ok(())
}
