// Configuration management with layered configuration (defaults, file, env)

use crate::retry::BackoffKind;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub nats: NatsConfig,
    pub external_api: ExternalApiConfig,
    pub scheduler: SchedulerConfig,
    pub publisher: PublisherConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsConfig {
    pub url: String,
    pub stream_name: String,
    pub max_age_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalApiConfig {
    /// Base URL; the event identifier is appended as the last path segment
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub poll_interval_seconds: u64,
    /// Maximum number of ticks running at once across all events
    pub worker_pool_size: usize,
    pub shutdown_grace_seconds: u64,
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    pub topic: String,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff: BackoffKind,
    /// Only used by exponential backoff
    pub max_delay_ms: u64,
    /// Only used by exponential backoff
    pub jitter_factor: f64,
    pub ack_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Built-in defaults so every key is present
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }

        if self.nats.url.is_empty() {
            return Err("NATS URL cannot be empty".to_string());
        }
        if self.nats.stream_name.is_empty() {
            return Err("NATS stream_name cannot be empty".to_string());
        }

        if self.external_api.base_url.is_empty() {
            return Err("External API base_url cannot be empty".to_string());
        }
        if self.external_api.timeout_seconds == 0 {
            return Err("External API timeout_seconds must be greater than 0".to_string());
        }

        if self.scheduler.poll_interval_seconds == 0 {
            return Err("Scheduler poll_interval_seconds must be greater than 0".to_string());
        }
        if self.scheduler.worker_pool_size == 0 {
            return Err("Scheduler worker_pool_size must be greater than 0".to_string());
        }

        if self.publisher.topic.is_empty() {
            return Err("Publisher topic cannot be empty".to_string());
        }
        if self.publisher.max_attempts == 0 {
            return Err("Publisher max_attempts must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.publisher.jitter_factor) {
            return Err("Publisher jitter_factor must be between 0.0 and 1.0".to_string());
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8081,
            },
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                stream_name: "EVENT_STATUS".to_string(),
                max_age_seconds: 86400, // 24 hours
            },
            external_api: ExternalApiConfig {
                base_url: "http://localhost:8081/mock".to_string(),
                timeout_seconds: 5,
            },
            scheduler: SchedulerConfig {
                poll_interval_seconds: 10,
                worker_pool_size: 4,
                shutdown_grace_seconds: 5,
            },
            publisher: PublisherConfig {
                topic: "event-status-topic".to_string(),
                max_attempts: 3,
                base_delay_ms: 1000,
                backoff: BackoffKind::Linear,
                max_delay_ms: 30_000,
                jitter_factor: 0.1,
                ack_timeout_seconds: 5,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
            },
        }
    }
}
