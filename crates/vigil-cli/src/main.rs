//! Vigil service binary: HTTP gateway, task consumer, and guardian monitor
//! in one process, plus small control-plane helpers for the agent registry.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vigil_core::{AgentState, VigilError, VigilResult};
use vigil_gateway::{build_router, AppState};
use vigil_governance::{LogViolationSink, StateGate, StateValidator, ViolationSink};
use vigil_guardian::{AlertSink, GuardianMonitor, HttpAlertSink};
use vigil_store::{AgentRegistry, SqliteStore, TaskStore};
use vigil_sync::{LoggingPageService, SyncConfig, TaskConsumer, TaskProcessor};

#[derive(Parser)]
#[command(name = "vigil", about = "Agent governance and task orchestration service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the gateway, task consumer, and guardian monitor.
    Serve(ServeArgs),
    /// Set an agent's lifecycle state (control-plane helper).
    SetAgent(SetAgentArgs),
    /// List registered agents and their states.
    ListAgents(DbArgs),
}

#[derive(Args)]
struct DbArgs {
    /// Path to the SQLite database file.
    #[arg(long, env = "VIGIL_DB_PATH", default_value = "vigil.db")]
    db: PathBuf,
}

#[derive(Args)]
struct SetAgentArgs {
    #[command(flatten)]
    db: DbArgs,
    /// Agent id.
    id: String,
    /// One of: active, paused, killed.
    state: String,
}

#[derive(Args)]
struct ServeArgs {
    #[command(flatten)]
    db: DbArgs,

    /// Address to bind the HTTP gateway.
    #[arg(long, env = "VIGIL_BIND_ADDR", default_value = "127.0.0.1:3100")]
    bind: String,

    /// Delay between consumer poll ticks, in milliseconds.
    #[arg(long, env = "VIGIL_SYNC_POLL_INTERVAL_MS", default_value_t = 30_000)]
    sync_poll_interval_ms: u64,

    /// Maximum tasks fetched per consumer tick.
    #[arg(long, env = "VIGIL_SYNC_BATCH_SIZE", default_value_t = 10)]
    sync_batch_size: usize,

    /// Delay between guardian sweeps, in milliseconds.
    #[arg(long, env = "VIGIL_GUARDIAN_POLL_INTERVAL_MS", default_value_t = 30_000)]
    guardian_poll_interval_ms: u64,

    /// Base URL of the external alert endpoint.
    #[arg(long, env = "VIGIL_ALERT_ENDPOINT", default_value = "http://localhost:3000")]
    alert_endpoint: String,

    /// Identity the consumer reports in logs and alerts.
    #[arg(long, env = "VIGIL_WORKER_ID", default_value = "task-sync-001")]
    worker_id: String,

    /// Emit logs as JSON.
    #[arg(long, env = "VIGIL_LOG_JSON")]
    log_json: bool,

    /// Directory for the violation JSONL log. Disabled when unset.
    #[arg(long, env = "VIGIL_VIOLATION_LOG_DIR")]
    violation_log_dir: Option<PathBuf>,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> VigilResult<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::SetAgent(args) => set_agent(args),
        Command::ListAgents(args) => list_agents(args).await,
    }
}

async fn serve(args: ServeArgs) -> VigilResult<()> {
    init_tracing(args.log_json);

    let db = SqliteStore::open(&args.db.db)?;
    let tasks: Arc<dyn TaskStore> = Arc::new(db.task_store());
    let registry: Arc<dyn AgentRegistry> = Arc::new(db.agent_registry());

    let violations: Arc<dyn ViolationSink> = match args.violation_log_dir {
        Some(dir) => Arc::new(LogViolationSink::with_jsonl(dir)),
        None => Arc::new(LogViolationSink::new()),
    };
    let alerts: Arc<dyn AlertSink> = Arc::new(HttpAlertSink::new(&args.alert_endpoint));

    // Consumer loop.
    let validator = StateValidator::new(registry.clone(), violations.clone());
    let processor = TaskProcessor::new(validator, Arc::new(LoggingPageService), alerts.clone());
    let consumer = Arc::new(TaskConsumer::new(
        tasks.clone(),
        processor,
        alerts.clone(),
        SyncConfig {
            worker_id: args.worker_id,
            poll_interval: Duration::from_millis(args.sync_poll_interval_ms),
            batch_size: args.sync_batch_size,
        },
    ));
    let _consumer = consumer.start();

    // Guardian loop.
    let guardian = Arc::new(GuardianMonitor::new(
        registry.clone(),
        violations.clone(),
        alerts,
    ));
    let _guardian = guardian.start(Duration::from_millis(args.guardian_poll_interval_ms));

    // Gateway.
    let gate = Arc::new(StateGate::new(violations));
    let app = build_router(Arc::new(AppState { tasks, gate }));
    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    info!(addr = %args.bind, "vigil gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn set_agent(args: SetAgentArgs) -> VigilResult<()> {
    init_tracing(false);
    let state = AgentState::parse(&args.state).ok_or_else(|| {
        VigilError::Config(format!(
            "unknown state '{}', expected active, paused, or killed",
            args.state
        ))
    })?;
    let db = SqliteStore::open(&args.db.db)?;
    db.put_agent(&args.id, state)?;
    info!(agent_id = %args.id, state = %state, "agent state set");
    Ok(())
}

async fn list_agents(args: DbArgs) -> VigilResult<()> {
    let db = SqliteStore::open(&args.db)?;
    for agent in db.agent_registry().list().await? {
        println!("{}\t{}", agent.id, agent.state);
    }
    Ok(())
}
