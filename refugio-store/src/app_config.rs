use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub payments: PaymentsConfig,
    pub mail: MailConfig,
    pub frontend: FrontendConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentsConfig {
    pub base_url: String,
    pub access_token: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    pub endpoint: String,
    pub api_key: String,
    pub from_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FrontendConfig {
    /// Base URL the post-payment redirects point at.
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// How long a hold blocks its date range while payment completes.
    pub hold_ttl_minutes: i64,
    /// TTL on the per-cabin booking lock; bounds staleness if a release is lost.
    pub cabin_lock_seconds: u64,
    /// How often the expiry sweeper removes dead holds.
    pub hold_sweep_interval_seconds: u64,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file (optional)
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file that stays out of git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of REFUGIO)
            // E.g. `REFUGIO__SERVER__PORT=9000` would set `server.port`
            .add_source(config::Environment::with_prefix("REFUGIO").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
