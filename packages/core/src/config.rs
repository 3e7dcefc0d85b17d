use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cli::Cli;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub provider_timeout: Duration,
    pub provider_total_timeout: Duration,
    pub chain_build_timeout: Duration,
    pub poll_interval_seconds: u64,
    pub api_port: u16,
    pub l1_chain_key: String,
    pub chains_file: Option<PathBuf>,
    pub etherscan_api_key: Option<String>,
    pub coingecko_api_key: Option<String>,
    pub fetch_meta_ttl: Duration,
    pub snapshot_cache_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_millis(8_000),
            provider_total_timeout: Duration::from_millis(15_000),
            chain_build_timeout: Duration::from_millis(25_000),
            poll_interval_seconds: 60,
            api_port: 8080,
            l1_chain_key: "ethereum".to_string(),
            chains_file: None,
            etherscan_api_key: None,
            coingecko_api_key: None,
            fetch_meta_ttl: Duration::from_secs(3_600),
            snapshot_cache_ttl: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Unset or empty variables
    /// take their defaults; malformed ones are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let millis = |name: &str, default: Duration| -> Result<Duration, String> {
            parse_or(var(name), name, default.as_millis() as u64).map(Duration::from_millis)
        };
        let seconds = |name: &str, default: Duration| -> Result<Duration, String> {
            parse_or(var(name), name, default.as_secs()).map(Duration::from_secs)
        };

        let poll_interval_seconds = parse_or(
            var("POLL_INTERVAL_SECONDS"),
            "POLL_INTERVAL_SECONDS",
            defaults.poll_interval_seconds,
        )?;
        if poll_interval_seconds == 0 {
            return Err("POLL_INTERVAL_SECONDS must be greater than zero".to_string());
        }

        Ok(Self {
            provider_timeout: millis("PROVIDER_TIMEOUT_MS", defaults.provider_timeout)?,
            provider_total_timeout: millis("PROVIDER_TOTAL_TIMEOUT_MS", defaults.provider_total_timeout)?,
            chain_build_timeout: millis("CHAIN_BUILD_TIMEOUT_MS", defaults.chain_build_timeout)?,
            poll_interval_seconds,
            api_port: parse_or(var("API_PORT"), "API_PORT", defaults.api_port)?,
            l1_chain_key: var("L1_CHAIN_KEY").unwrap_or(defaults.l1_chain_key),
            chains_file: var("CHAINS_FILE").map(PathBuf::from),
            etherscan_api_key: var("ETHERSCAN_API_KEY"),
            coingecko_api_key: var("COINGECKO_API_KEY"),
            fetch_meta_ttl: seconds("FETCH_META_TTL_SECONDS", defaults.fetch_meta_ttl)?,
            snapshot_cache_ttl: seconds("SNAPSHOT_CACHE_TTL_SECONDS", defaults.snapshot_cache_ttl)?,
        })
    }

    /// Command-line flags win over the environment.
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        if let Some(port) = cli.port {
            self.api_port = port;
        }
        if let Some(interval) = cli.poll_interval.filter(|i| *i > 0) {
            self.poll_interval_seconds = interval;
        }
        if let Some(path) = &cli.chains_file {
            self.chains_file = Some(path.clone());
        }
        self
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, name: &str, default: T) -> Result<T, String> {
    match raw {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid number, got '{}'", name, value)),
        None => Ok(default),
    }
}
