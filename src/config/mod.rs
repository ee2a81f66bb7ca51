//! Layered application configuration

mod app_config;

pub use app_config::{
    AlertSettings, AppConfig, AuthConfig, DashboardSettings, LogFormat, LoggingConfig,
    NotificationSettings, ReportSettings, SchedulerConfig, ServerConfig, StorageSettings,
    WebhookSettings,
};
