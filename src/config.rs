use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::net::{IpAddr, SocketAddr};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Cadence of the automation scans, in minutes.
    pub tick_interval_minutes: u64,
    /// How far ahead of a scheduled start the reminder fires, in minutes.
    pub reminder_lead_minutes: i64,
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(unused)]
pub struct AppConfig {
    pub name: String,
    pub environment: Environment,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = env::var("SERVER_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string())
            .parse::<IpAddr>()
            .context("Failed to parse SERVER_HOST")?;

        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .context("Failed to parse SERVER_PORT")?;

        let db_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://gigwork.db".to_string());
        let db_max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(val) => Some(val.parse().context("Failed to parse DATABASE_MAX_CONNECTIONS")?),
            Err(_) => Some(5),
        };

        let tick_interval_minutes = env::var("SCHEDULER_TICK_INTERVAL_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .context("Failed to parse SCHEDULER_TICK_INTERVAL_MINUTES")?;
        let reminder_lead_minutes = env::var("SCHEDULER_REMINDER_LEAD_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("Failed to parse SCHEDULER_REMINDER_LEAD_MINUTES")?;
        let scheduler_enabled = env::var("SCHEDULER_ENABLED")
            .map(|v| v.parse().unwrap_or(true))
            .unwrap_or(true);

        let environment_str =
            env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let environment = match environment_str.to_lowercase().as_str() {
            "production" => Environment::Production,
            "staging" => Environment::Staging,
            _ => Environment::Development,
        };
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "Gigwork Backend".to_string());

        Ok(Config {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: db_url,
                max_connections: db_max_connections,
            },
            scheduler: SchedulerConfig {
                tick_interval_minutes,
                reminder_lead_minutes,
                enabled: scheduler_enabled,
            },
            app: AppConfig {
                name: app_name,
                environment,
            },
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }

    #[allow(unused)]
    pub fn is_production(&self) -> bool {
        self.app.environment == Environment::Production
    }
}

// Global config instance, initialized once at startup.
use once_cell::sync::OnceCell;

static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn init() -> Result<&'static Config> {
    CONFIG.get_or_try_init(Config::from_env)
}

pub fn get() -> &'static Config {
    CONFIG.get().expect("Config is not initialized")
}
