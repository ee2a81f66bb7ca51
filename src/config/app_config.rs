use std::path::PathBuf;

use serde::Deserialize;

use crate::domain::reproduction::GestationPolicy;
use crate::domain::DomainError;
use crate::infrastructure::observability::ObservabilityConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub reproduction: GestationPolicy,
    #[serde(default)]
    pub alerts: AlertSettings,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub reports: ReportSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// `memory` or `postgres`
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Plain-text keys accepted in `Authorization: Bearer` or `X-API-Key`
    #[serde(default)]
    pub api_keys: Vec<String>,
}

/// Thresholds used by the alert rules
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AlertSettings {
    #[serde(default = "default_birth_warning_days")]
    pub birth_warning_days: i64,
    #[serde(default = "default_health_warning_days")]
    pub health_warning_days: i64,
    #[serde(default = "default_capacity_warning_ratio")]
    pub capacity_warning_ratio: f64,
}

/// Six-field cron expressions (with seconds) for each background job
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_pregnancy_cron")]
    pub pregnancy_cron: String,
    #[serde(default = "default_health_cron")]
    pub health_cron: String,
    #[serde(default = "default_capacity_cron")]
    pub capacity_cron: String,
    #[serde(default = "default_feed_cron")]
    pub feed_cron: String,
    #[serde(default = "default_notification_retry_cron")]
    pub notification_retry_cron: String,
    #[serde(default = "default_report_cleanup_cron")]
    pub report_cleanup_cron: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_true")]
    pub log_channel: bool,
    #[serde(default)]
    pub webhook: Option<WebhookSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSettings {
    pub url: String,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportSettings {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_download_secret")]
    pub download_secret: String,
    #[serde(default = "default_download_ttl_secs")]
    pub download_ttl_secs: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DashboardSettings {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_backend() -> String {
    "memory".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_birth_warning_days() -> i64 {
    7
}

fn default_health_warning_days() -> i64 {
    3
}

fn default_capacity_warning_ratio() -> f64 {
    0.9
}

fn default_pregnancy_cron() -> String {
    "0 0 6 * * *".to_string()
}

fn default_health_cron() -> String {
    "0 15 6 * * *".to_string()
}

fn default_capacity_cron() -> String {
    "0 0 * * * *".to_string()
}

fn default_feed_cron() -> String {
    "0 30 6 * * *".to_string()
}

fn default_notification_retry_cron() -> String {
    "0 */5 * * * *".to_string()
}

fn default_report_cleanup_cron() -> String {
    "0 0 3 * * *".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    300
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./reports")
}

fn default_retention_days() -> u32 {
    30
}

fn default_download_secret() -> String {
    "change-me".to_string()
}

fn default_download_ttl_secs() -> u64 {
    3600
}

fn default_chunk_size() -> usize {
    64 * 1024
}

fn default_cache_ttl_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_keys: Vec::new(),
        }
    }
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            birth_warning_days: default_birth_warning_days(),
            health_warning_days: default_health_warning_days(),
            capacity_warning_ratio: default_capacity_warning_ratio(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pregnancy_cron: default_pregnancy_cron(),
            health_cron: default_health_cron(),
            capacity_cron: default_capacity_cron(),
            feed_cron: default_feed_cron(),
            notification_retry_cron: default_notification_retry_cron(),
            report_cleanup_cron: default_report_cleanup_cron(),
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            log_channel: true,
            webhook: None,
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            retention_days: default_retention_days(),
            download_secret: default_download_secret(),
            download_ttl_secs: default_download_ttl_secs(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.api_keys")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Check cross-field constraints that serde defaults cannot express
    pub fn validate(&self) -> Result<(), DomainError> {
        self.reproduction.validate()?;

        if !(0.0..=1.0).contains(&self.alerts.capacity_warning_ratio) {
            return Err(DomainError::configuration(
                "alerts.capacity_warning_ratio must be between 0 and 1",
            ));
        }

        if self.notifications.max_attempts == 0 {
            return Err(DomainError::configuration(
                "notifications.max_attempts must be at least 1",
            ));
        }

        if self.reports.chunk_size == 0 {
            return Err(DomainError::configuration(
                "reports.chunk_size must be greater than zero",
            ));
        }

        if self.reports.download_secret.is_empty() {
            return Err(DomainError::configuration(
                "reports.download_secret must not be empty",
            ));
        }

        Ok(())
    }
}
