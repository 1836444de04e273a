/// Configuration management
///
/// Loads configuration from environment variables (and a `.env` file when
/// present).
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `CHORE_DUE_AFTER_DAYS`: days until an assigned chore is due; 0 disables
///   due dates (default: 7)
/// - `CHORE_RNG_SEED`: fixed seed for the distribution shuffle (default:
///   seeded from the OS)
/// - `LOG_FILTER`: tracing filter used when `RUST_LOG` is unset (default:
///   `choreshare=info`)
/// - `LOG_JSON`: emit JSON log lines (default: false)
///
/// # Example
///
/// ```no_run
/// use choreshare_core::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// choreshare_shared::telemetry::init_tracing(&config.log.filter, config.log.json)?;
/// # Ok(())
/// # }
/// ```

use std::env;
use std::str::FromStr;

use anyhow::Context;
use choreshare_shared::db::pool::DatabaseConfig;

use crate::engine::{RandomSource, StdRandom};
use crate::orchestrator::DistributorConfig;

/// Complete service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database pool configuration
    pub database: DatabaseConfig,

    /// Distribution settings
    pub distributor: DistributorConfig,

    /// Fixed seed for the shuffle, if any
    pub rng_seed: Option<u64>,

    /// Logging configuration
    pub log: LogConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Default filter directive
    pub filter: String,

    /// JSON output
    pub json: bool,
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a variable has an
    /// unparsable value.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?;
        if max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }

        let due_after_days = parse_or(&lookup, "CHORE_DUE_AFTER_DAYS", 7u32)?;

        let rng_seed = lookup("CHORE_RNG_SEED")
            .map(|seed| {
                seed.trim()
                    .parse::<u64>()
                    .with_context(|| format!("CHORE_RNG_SEED is not a valid u64: {seed}"))
            })
            .transpose()?;

        let filter = lookup("LOG_FILTER").unwrap_or_else(|| "choreshare=info".to_string());
        let json = parse_or(&lookup, "LOG_JSON", false)?;

        Ok(Self {
            database: DatabaseConfig {
                url,
                max_connections,
                min_connections: max_connections.min(DatabaseConfig::default().min_connections),
                ..Default::default()
            },
            distributor: DistributorConfig { due_after_days },
            rng_seed,
            log: LogConfig { filter, json },
        })
    }

    /// Random source for the distributor: seeded if `CHORE_RNG_SEED` is set
    pub fn random_source(&self) -> Box<dyn RandomSource> {
        match self.rng_seed {
            Some(seed) => Box::new(StdRandom::seeded(seed)),
            None => Box::new(StdRandom::from_entropy()),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {value}")),
        None => Ok(default),
    }
}
