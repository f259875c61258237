//! Server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for runtime settings.  It is
//! a plain struct with no environment reads of its own: `main.rs` fills it
//! from CLI flags (which fall back to environment variables), and tests build
//! it directly.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Deployment mode.  Only affects the default log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub fn default_log_filter(self) -> &'static str {
        match self {
            Self::Development => "debug",
            Self::Production => "info",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!(
                "unknown environment '{other}' (expected 'development' or 'production')"
            )),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Development => "development",
            Self::Production => "production",
        })
    }
}

/// All runtime configuration for the relay.
///
/// # Example
///
/// ```rust
/// use pinauth_server::domain::ServerConfig;
///
/// let cfg = ServerConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 5000);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: SocketAddr,

    /// The only `Origin` a browser may connect from.
    ///
    /// `None` accepts every origin.  Handshakes that carry no `Origin` header
    /// at all (native clients, tests) are always accepted.
    pub allowed_origin: Option<String>,

    pub environment: Environment,

    /// How often the background sweeper purges expired sessions.
    ///
    /// Lookups hide expired sessions regardless of this interval; it only
    /// bounds how long their memory is held.
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    /// | Field           | Default                 |
    /// |-----------------|-------------------------|
    /// | bind_addr       | `0.0.0.0:5000`          |
    /// | allowed_origin  | `http://localhost:3000` |
    /// | environment     | development             |
    /// | sweep_interval  | 30 seconds              |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            allowed_origin: Some("http://localhost:3000".to_owned()),
            environment: Environment::Development,
            sweep_interval: Duration::from_secs(30),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_is_5000() {
        assert_eq!(ServerConfig::default().bind_addr.port(), 5000);
    }

    #[test]
    fn test_default_origin_is_local_frontend() {
        assert_eq!(
            ServerConfig::default().allowed_origin.as_deref(),
            Some("http://localhost:3000")
        );
    }

    #[test]
    fn test_default_sweep_interval_is_30s() {
        assert_eq!(
            ServerConfig::default().sweep_interval,
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_environment_parses_long_and_short_forms() {
        assert_eq!("production".parse(), Ok(Environment::Production));
        assert_eq!("PROD".parse(), Ok(Environment::Production));
        assert_eq!("dev".parse(), Ok(Environment::Development));
    }

    #[test]
    fn test_environment_rejects_unknown() {
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_environment_log_filters() {
        assert_eq!(Environment::Development.default_log_filter(), "debug");
        assert_eq!(Environment::Production.default_log_filter(), "info");
    }

    #[test]
    fn test_environment_display_round_trips() {
        for env in [Environment::Development, Environment::Production] {
            assert_eq!(env.to_string().parse(), Ok(env));
        }
    }
}
