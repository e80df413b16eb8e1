use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use streaming_portal::cli_style::get_styles;
use streaming_portal::config::{AppConfig, CliConfig, FileConfig};
use streaming_portal::server::{run_server, RequestsLoggingLevel, ServerConfig};
use streaming_portal::{Portal, SessionManager, SqliteStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles = get_styles())]
struct CliArgs {
    /// Path to the SQLite database file, created if missing.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// How long a store query may wait on a locked database, in milliseconds.
    #[clap(long, default_value_t = 2000)]
    pub store_timeout_ms: u64,

    /// Seconds of inactivity after which a session expires.
    #[clap(long, default_value_t = 300)]
    pub session_idle_timeout_sec: u64,

    /// Seconds after login after which a session expires regardless of activity.
    #[clap(long, default_value_t = 86400)]
    pub session_max_lifetime_sec: u64,

    /// Interval in seconds between expired session sweeps.
    #[clap(long, default_value_t = 60)]
    pub session_prune_interval_sec: u64,
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        CliConfig {
            db_path: args.db_path.clone(),
            port: args.port,
            logging_level: args.logging_level.clone(),
            frontend_dir_path: args.frontend_dir_path.clone(),
            store_timeout_ms: args.store_timeout_ms,
            session_idle_timeout_sec: args.session_idle_timeout_sec,
            session_max_lifetime_sec: args.session_max_lifetime_sec,
            session_prune_interval_sec: args.session_prune_interval_sec,
        }
    }
}

fn spawn_session_pruning(sessions: SessionManager, interval: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        // Skip the first immediate tick, wait for the first interval
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = sessions.prune_expired() {
                error!("Failed to prune expired sessions: {}", e);
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to install the tracing subscriber")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&CliConfig::from(&cli_args), file_config)?;

    info!("Opening SQLite database at {:?}...", config.db_path);
    let store = Arc::new(SqliteStore::new(&config.db_path, config.store_timeout)?);

    let portal = Arc::new(Portal::new(
        store.clone(),
        store,
        config.session.policy(),
    ));

    info!(
        "Sessions expire after {}s idle or {}s total, sweeping every {}s",
        config.session.idle_timeout.as_secs(),
        config.session.max_lifetime.as_secs(),
        config.session.prune_interval.as_secs()
    );
    spawn_session_pruning(portal.sessions().clone(), config.session.prune_interval);

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level,
        port: config.port,
        frontend_dir_path: config.frontend_dir_path,
        secure_cookie: config.session.secure_cookie,
    };

    info!("Ready to serve at port {}!", server_config.port);
    run_server(server_config, portal).await
}
