//! Server configuration from environment variables

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:7252";
pub const DEFAULT_MAX_ROUNDS: u32 = 20;
pub const DEFAULT_SNAPSHOT_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Upper bound for a room's round count
    pub max_rounds: u32,
    /// Load on start and write periodically when set
    pub snapshot_path: Option<PathBuf>,
    pub snapshot_interval: Duration,
    /// Fixed seed for the role shuffler (reproducible games)
    pub role_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 7252))),
            max_rounds: DEFAULT_MAX_ROUNDS,
            snapshot_path: None,
            snapshot_interval: Duration::from_secs(DEFAULT_SNAPSHOT_INTERVAL_SECS),
            role_seed: None,
        }
    }
}

/// Read and parse a variable, warning and returning None on garbage
fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", name, raw);
            None
        }
    }
}

impl ServerConfig {
    /// Load from `BIND_ADDR`, `MAX_ROUNDS`, `SNAPSHOT_PATH`,
    /// `SNAPSHOT_INTERVAL_SECS` and `ROLE_SEED`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_rounds = match parse_var::<u32>("MAX_ROUNDS") {
            Some(0) => {
                tracing::warn!("MAX_ROUNDS must be at least 1, using {}", DEFAULT_MAX_ROUNDS);
                DEFAULT_MAX_ROUNDS
            }
            Some(n) => n,
            None => DEFAULT_MAX_ROUNDS,
        };

        let snapshot_interval = match parse_var::<u64>("SNAPSHOT_INTERVAL_SECS") {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => defaults.snapshot_interval,
        };

        let snapshot_path = std::env::var("SNAPSHOT_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let role_seed = parse_var("ROLE_SEED");
        if role_seed.is_some() {
            tracing::warn!("ROLE_SEED is set - role deals are reproducible");
        }

        Self {
            bind_addr: parse_var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            max_rounds,
            snapshot_path,
            snapshot_interval,
            role_seed,
        }
    }
}
