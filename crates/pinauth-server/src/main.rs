//! PIN auth relay: entry point.
//!
//! Accepts WebSocket connections from the front-end, lets each client claim a
//! numeric PIN, and evicts the previous holder when a PIN is claimed twice.
//!
//! # Usage
//!
//! ```text
//! pinauth-server [OPTIONS]
//!
//! Options:
//!   --port           <PORT>   WebSocket listener port [default: 5000]
//!   --bind           <IP>     Listener bind address [default: 0.0.0.0]
//!   --client-url     <URL>    Allowed browser Origin, or `*` [default: http://localhost:3000]
//!   --environment    <MODE>   development | production [default: development]
//!   --sweep-interval <SECS>   Expired-session purge period [default: 30]
//!   --store          <URL>    Session store [default: memory]
//! ```
//!
//! # Environment variable overrides
//!
//! Every flag can also come from the environment (CLI args take precedence).
//! A `.env` file in the working directory is loaded first.
//!
//! | Variable                  | Default                 |
//! |---------------------------|-------------------------|
//! | `PIN_AUTH_PORT`           | `5000`                  |
//! | `PIN_AUTH_BIND`           | `0.0.0.0`               |
//! | `CLIENT_URL`              | `http://localhost:3000` |
//! | `PIN_AUTH_ENV`            | `development`           |
//! | `PIN_AUTH_SWEEP_INTERVAL` | `30`                    |
//! | `PIN_AUTH_STORE`          | `memory`                |

use std::net::{IpAddr, SocketAddr};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pinauth_core::SessionRegistry;
use pinauth_server::domain::{Environment, ServerConfig};
use pinauth_server::infrastructure::{run_server, spawn_expiry_sweeper};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// PIN auth relay.
///
/// Binds each numeric PIN to a single live WebSocket connection.
#[derive(Debug, Parser)]
#[command(
    name = "pinauth-server",
    about = "Single-device PIN session relay over WebSocket",
    version
)]
struct Cli {
    /// TCP port for the WebSocket listener.
    #[arg(long, default_value_t = 5000, env = "PIN_AUTH_PORT")]
    port: u16,

    /// IP address to bind to.  `127.0.0.1` keeps the relay local-only.
    #[arg(long, default_value = "0.0.0.0", env = "PIN_AUTH_BIND")]
    bind: String,

    /// The only browser origin allowed to open a WebSocket; `*` allows any.
    #[arg(long, default_value = "http://localhost:3000", env = "CLIENT_URL")]
    client_url: String,

    /// Deployment mode; selects the default log level.
    #[arg(long, default_value = "development", env = "PIN_AUTH_ENV")]
    environment: Environment,

    /// Seconds between purges of expired sessions.
    #[arg(long, default_value_t = 30, env = "PIN_AUTH_SWEEP_INTERVAL")]
    sweep_interval: u64,

    /// Session store connection string.  Only `memory` is available.
    #[arg(long, default_value = "memory", env = "PIN_AUTH_STORE")]
    store: String,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not an IP address or
    /// `--sweep-interval` is zero.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let ip: IpAddr = self
            .bind
            .parse()
            .with_context(|| format!("invalid bind address: '{}'", self.bind))?;

        if self.sweep_interval == 0 {
            bail!("--sweep-interval must be at least 1 second");
        }

        let allowed_origin = match self.client_url.trim() {
            "" | "*" => None,
            url => Some(url.to_owned()),
        };

        Ok(ServerConfig {
            bind_addr: SocketAddr::new(ip, self.port),
            allowed_origin,
            environment: self.environment,
            sweep_interval: Duration::from_secs(self.sweep_interval),
        })
    }
}

/// Opens the session store named by `url`.
///
/// # Errors
///
/// Returns an error for any store other than the in-memory one.
fn open_registry(url: &str) -> anyhow::Result<SessionRegistry> {
    match url.trim() {
        "memory" | "memory://" => Ok(SessionRegistry::in_memory()),
        other => bail!("unsupported session store '{other}' (only 'memory' is available)"),
    }
}

/// Routes panics through `tracing` so they show up with the rest of the logs.
/// The runtime isolates the panicking task; the process keeps serving.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        error!("unhandled panic: {info}");
    }));
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Configuration ────────────────────────────────────────────────────────
    // Load .env first so its values act as environment fallbacks for clap.
    // A missing .env file is normal in production.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let store_url = cli.store.clone();
    let config = cli.into_server_config()?;

    // ── Logging setup ────────────────────────────────────────────────────────
    // RUST_LOG wins; otherwise the environment mode picks debug or info.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.environment.default_log_filter())),
        )
        .init();
    install_panic_hook();

    // ── Session store ────────────────────────────────────────────────────────
    // Fails fast on an unsupported store rather than serving without state.
    let registry = open_registry(&store_url)?;

    info!(
        "PIN auth relay starting: bind={}, origin={}, env={}",
        config.bind_addr,
        config.allowed_origin.as_deref().unwrap_or("*"),
        config.environment
    );

    // ── Graceful shutdown flag ───────────────────────────────────────────────
    // Ctrl+C clears the flag; the accept loop and the sweeper both poll it.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    // ── Expiry sweeper ───────────────────────────────────────────────────────
    // Lookups already hide expired sessions; the sweeper reclaims the memory.
    let sweeper = spawn_expiry_sweeper(
        registry.clone(),
        config.sweep_interval,
        Arc::clone(&running),
    );

    // ── Main server loop ─────────────────────────────────────────────────────
    // Returns once the shutdown flag is cleared.
    run_server(config, registry, running).await?;
    sweeper.abort();

    info!("PIN auth relay stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
