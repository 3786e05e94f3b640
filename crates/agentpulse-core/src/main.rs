//! AgentPulse CLI
//!
//! Command-line interface for the AgentPulse live activity monitor.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use agentpulse::channel::{MemoryStore, RealtimeChannel};
use agentpulse::config::LoggingConfig;
use agentpulse::db::{Database, RedisChannel};
use agentpulse::demo::spawn_demo_feed;
use agentpulse::format::RoleDirectory;
use agentpulse::models::{ConnectionStatus, EventId, EventRecord, NewEvent};
use agentpulse::sync::{EventSource, PulseSession, PulseView};
use agentpulse::tui::App;
use agentpulse::Config;
use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::sync::{oneshot, watch};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// AgentPulse - Live activity pulse for AI agents
#[derive(Parser)]
#[command(name = "agentpulse")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "AGENTPULSE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (for commands that support it)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the TUI dashboard
    Dashboard {
        /// Use a synthetic in-memory feed instead of PostgreSQL and Redis
        #[arg(long)]
        demo: bool,
    },

    /// Print pulse updates to stdout as they happen
    Watch {
        /// Use a synthetic in-memory feed instead of PostgreSQL and Redis
        #[arg(long)]
        demo: bool,
    },

    /// Show the newest stored event
    Latest,

    /// Create an event and notify subscribers
    Publish {
        /// Agent role identifier (omit for a system event)
        #[arg(long)]
        role: Option<String>,

        /// Event content
        #[arg(long)]
        content: String,
    },

    /// Show system health status
    Health,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // The dashboard owns the terminal, so its logs go to a file
    let to_file = matches!(cli.command, Commands::Dashboard { .. });
    let _guard = match init_logging(&config.logging, cli.verbose, to_file) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error initializing logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Dashboard { demo } => run_dashboard(config, demo).await,
        Commands::Watch { demo } => run_watch(config, demo, cli.format).await,
        Commands::Latest => run_latest(config, cli.format).await,
        Commands::Publish { role, content } => {
            run_publish(config, role.as_deref(), &content, cli.format).await
        }
        Commands::Health => run_health(config, cli.format).await,
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(
    logging: &LoggingConfig,
    verbose: bool,
    to_file: bool,
) -> anyhow::Result<Option<WorkerGuard>> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let json = logging.format == "json";

    if to_file {
        let path = log_file_path(logging).context("no location for the dashboard log file")?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;
        let file_name = path.file_name().unwrap_or_else(|| "agentpulse.log".as_ref());

        let appender = tracing_appender::rolling::never(dir, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false);
        if json {
            builder.json().init();
        } else {
            builder.init();
        }
        return Ok(Some(guard));
    }

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(None)
}

fn log_file_path(logging: &LoggingConfig) -> Option<PathBuf> {
    logging.file.clone().or_else(|| {
        directories::ProjectDirs::from("dev", "agentpulse", "agentpulse")
            .map(|dirs| dirs.data_local_dir().join("agentpulse.log"))
    })
}

/// Event source and realtime channel for a session
struct Backend {
    source: Arc<dyn EventSource>,
    channel: Box<dyn RealtimeChannel>,
    /// Newest stored events, for the dashboard's history pane
    history: Vec<EventRecord>,
    feed: Option<FeedGuard>,
}

/// Stops the demo feed when dropped
struct FeedGuard(tokio::task::JoinHandle<()>);

impl Drop for FeedGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn connect_backend(config: &Config, demo: bool) -> anyhow::Result<Backend> {
    if demo {
        info!("Using synthetic demo feed");
        let store = MemoryStore::new();
        let channel = Box::new(store.channel());
        let history = store.recent(config.tui.history);
        let feed = FeedGuard(spawn_demo_feed(store.clone()));
        return Ok(Backend {
            source: Arc::new(store),
            channel,
            history,
            feed: Some(feed),
        });
    }

    let db = Database::new(config)
        .await
        .context("connecting to the event store")?;
    let channel = RedisChannel::new(&config.redis).context("opening the realtime channel")?;
    let events = db.events();

    let limit = i64::try_from(config.tui.history).unwrap_or(i64::MAX);
    let history = events.recent(limit).await.unwrap_or_else(|e| {
        warn!(error = %e, "Could not load recent events");
        Vec::new()
    });

    Ok(Backend {
        source: Arc::new(events),
        channel: Box::new(channel),
        history,
        feed: None,
    })
}

/// Running session task and the handles to observe and stop it
struct SessionHandle {
    views: watch::Receiver<PulseView>,
    stop: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
    _feed: Option<FeedGuard>,
}

impl SessionHandle {
    /// Stop the session and wait for its teardown
    async fn stop(self) -> anyhow::Result<()> {
        let _ = self.stop.send(());
        self.task.await.context("pulse session task")?;
        Ok(())
    }
}

/// Start a session on `backend` and drive it in the background
fn spawn_session(config: &Config, backend: Backend) -> anyhow::Result<SessionHandle> {
    let session = PulseSession::start(backend.source, backend.channel, &config.pulse)?;
    let views = session.subscribe_view();

    let (stop, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(session.run_until(async move {
        let _ = stop_rx.await;
    }));

    Ok(SessionHandle {
        views,
        stop,
        task,
        _feed: backend.feed,
    })
}

async fn run_dashboard(config: Config, demo: bool) -> anyhow::Result<()> {
    info!(demo, "Starting TUI dashboard");

    let mut backend = connect_backend(&config, demo).await?;
    let history = std::mem::take(&mut backend.history);
    let session = spawn_session(&config, backend)?;

    let mut app = App::from_config(&config);
    app.backfill(history);
    let result = app.run(session.views.clone()).await;

    if let Err(e) = session.stop().await {
        warn!(error = %e, "Pulse session task failed");
    }

    result.map_err(Into::into)
}

async fn run_watch(config: Config, demo: bool, format: OutputFormat) -> anyhow::Result<()> {
    info!(demo, "Watching pulse");

    let backend = connect_backend(&config, demo).await?;
    let mut session = spawn_session(&config, backend)?;
    let roles = RoleDirectory::with_labels(&config.roles.labels);

    let mut shown: Option<(Option<EventId>, ConnectionStatus)> = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = session.views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = session.views.borrow_and_update().clone();
                let key = (view.latest.as_ref().map(|e| e.id.clone()), view.status);
                if shown.as_ref() == Some(&key) {
                    continue;
                }
                shown = Some(key);
                print_view(&view, &roles, config.pulse.truncate_len, format)?;
            }
        }
    }

    session.stop().await
}

fn print_view(
    view: &PulseView,
    roles: &RoleDirectory,
    truncate_len: usize,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string(view)?);
        return Ok(());
    }

    let marker = if view.just_arrived { "*" } else { " " };
    match &view.latest {
        Some(_) => println!(
            "{marker} [{}] {} ({}): {}",
            view.status.label(),
            view.role_label(roles).unwrap_or_default(),
            view.time_ago(Utc::now()).unwrap_or_default(),
            view.snippet(truncate_len).unwrap_or_default(),
        ),
        None => println!("{marker} [{}] waiting for agent activity", view.status.label()),
    }
    Ok(())
}

fn print_event(event: &EventRecord, roles: &RoleDirectory, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string(event)?);
    } else {
        println!(
            "#{} {} {}: {}",
            event.id,
            event.created_at.to_rfc3339(),
            roles.display(event.role()),
            event.content
        );
    }
    Ok(())
}

async fn run_latest(config: Config, format: OutputFormat) -> anyhow::Result<()> {
    let db = Database::new(&config).await?;
    let roles = RoleDirectory::with_labels(&config.roles.labels);

    match db.events().latest().await? {
        Some(event) => print_event(&event, &roles, format)?,
        None if format == OutputFormat::Json => println!("null"),
        None => println!("No events yet"),
    }
    Ok(())
}

async fn run_publish(
    config: Config,
    role: Option<&str>,
    content: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let db = Database::new(&config).await?;
    let roles = RoleDirectory::with_labels(&config.roles.labels);

    let (event, published) = db.create_event(&NewEvent::new(role, content)).await?;
    match published {
        Ok(receivers) => info!(event_id = %event.id, receivers, "Event published"),
        Err(e) => warn!(event_id = %event.id, error = %e, "Event stored but not broadcast"),
    }

    print_event(&event, &roles, format)
}

async fn run_health(config: Config, format: OutputFormat) -> anyhow::Result<()> {
    let db = Database::new(&config).await;
    let (postgres, redis) = match &db {
        Ok(db) => (
            db.postgres.health_check().await.map_err(|e| e.to_string()),
            db.redis.health_check().await.map_err(|e| e.to_string()),
        ),
        Err(e) => (Err(e.to_string()), Err("not checked".to_string())),
    };

    if format == OutputFormat::Json {
        let report = serde_json::json!({
            "postgres": postgres.as_ref().err(),
            "redis": redis.as_ref().err(),
            "healthy": postgres.is_ok() && redis.is_ok(),
        });
        println!("{report}");
    } else {
        println!("System Health Check");
        println!("-------------------");
        for (name, check) in [("PostgreSQL", &postgres), ("Redis", &redis)] {
            match check {
                Ok(()) => println!("{name:<11} ok"),
                Err(e) => println!("{name:<11} FAILED ({e})"),
            }
        }
    }

    if postgres.is_err() || redis.is_err() {
        anyhow::bail!("one or more backing services are unhealthy");
    }
    Ok(())
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "agentpulse", &mut io::stdout());
}
