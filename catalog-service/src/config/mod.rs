use secrecy::Secret;
use service_core::config::{self as core_config, get_env, get_env_parsed, is_prod};
use service_core::error::AppError;

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub events: EventConfig,
    pub staleness: StalenessConfig,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: Secret<String>,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct EventConfig {
    pub backend: EventBackend,
    pub redis_url: Secret<String>,
    /// Consumer name within the subscription group.
    pub instance_id: String,
    pub block_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone)]
pub struct StalenessConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl StalenessConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs.max(1))
    }
}

impl CatalogConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common = core_config::Config::load()?;
        let is_prod = is_prod();

        let instance_id = match std::env::var("INSTANCE_ID") {
            Ok(id) => id,
            Err(_) => format!("catalog-{}", uuid::Uuid::new_v4()),
        };

        Ok(CatalogConfig {
            common,
            mongodb: MongoConfig {
                uri: Secret::new(get_env("MONGODB_URI", None, is_prod)?),
                database: get_env("MONGODB_DATABASE", Some("catalog_db"), is_prod)?,
            },
            events: EventConfig {
                backend: get_env_parsed("EVENT_BACKEND", Some("redis"), is_prod)?,
                redis_url: Secret::new(get_env(
                    "REDIS_URL",
                    Some("redis://localhost:6379"),
                    is_prod,
                )?),
                instance_id,
                block_ms: get_env_parsed("EVENT_BLOCK_MS", Some("5000"), false)?,
            },
            staleness: StalenessConfig {
                enabled: get_env_parsed("STALENESS_JOB_ENABLED", Some("true"), false)?,
                interval_secs: get_env_parsed("STALENESS_JOB_INTERVAL_SECS", Some("300"), false)?,
            },
        })
    }
}

impl std::str::FromStr for EventBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(EventBackend::Redis),
            "memory" => Ok(EventBackend::Memory),
            _ => Err(format!("Invalid event backend: {}", s)),
        }
    }
}
