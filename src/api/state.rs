//! Application state shared by all handlers

use std::sync::Arc;
use std::time::Duration;

use crate::api::middleware::ApiKeyAuth;
use crate::config::AppConfig;
use crate::domain::notification::RetryPolicy;
use crate::domain::DomainError;
use crate::infrastructure::download::DownloadSigner;
use crate::infrastructure::notification::build_channels;
use crate::infrastructure::services::{
    AlertService, CuyService, DashboardService, ExpenseService, FeedService, HealthService,
    HousingService, NotificationService, ReportService, ReproductionService, SalesService,
};
use crate::infrastructure::storage::Stores;

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub housing: Arc<HousingService>,
    pub cuyes: Arc<CuyService>,
    pub reproduction: Arc<ReproductionService>,
    pub feed: Arc<FeedService>,
    pub health: Arc<HealthService>,
    pub sales: Arc<SalesService>,
    pub expenses: Arc<ExpenseService>,
    pub dashboard: Arc<DashboardService>,
    pub alerts: Arc<AlertService>,
    pub notifications: Arc<NotificationService>,
    pub reports: Arc<ReportService>,
    pub auth: Arc<ApiKeyAuth>,
    /// Read size used when streaming report files
    pub chunk_size: usize,
}

impl AppState {
    /// Wire every service over the given stores
    pub fn from_stores(config: &AppConfig, stores: Stores) -> Result<Self, DomainError> {
        config.validate()?;

        let policy = config.reproduction;
        let housing = Arc::new(HousingService::new(stores.clone()));
        let cuyes = Arc::new(CuyService::new(stores.clone(), housing.clone()));
        let reproduction = Arc::new(ReproductionService::new(
            stores.clone(),
            housing.clone(),
            cuyes.clone(),
            policy,
        ));
        let feed = Arc::new(FeedService::new(stores.clone()));
        let health = Arc::new(HealthService::new(stores.clone(), cuyes.clone()));
        let sales = Arc::new(SalesService::new(
            stores.clone(),
            housing.clone(),
            cuyes.clone(),
        ));
        let expenses = Arc::new(ExpenseService::new(stores.clone()));
        let dashboard = Arc::new(DashboardService::new(
            stores.clone(),
            housing.clone(),
            policy,
            config.alerts.birth_warning_days,
            Duration::from_secs(config.dashboard.cache_ttl_secs),
        ));

        let notifications = Arc::new(NotificationService::new(
            stores.clone(),
            build_channels(&config.notifications)?,
            RetryPolicy {
                max_attempts: config.notifications.max_attempts,
                retry_delay_secs: config.notifications.retry_delay_secs,
            },
        ));
        let alerts = Arc::new(AlertService::new(
            stores.clone(),
            housing.clone(),
            notifications.clone(),
            policy,
            config.alerts,
        ));
        let reports = Arc::new(ReportService::new(
            stores.clone(),
            config.reports.output_dir.clone(),
            DownloadSigner::new(
                config.reports.download_secret.clone(),
                config.reports.download_ttl_secs,
            ),
        ));

        Ok(Self {
            stores,
            housing,
            cuyes,
            reproduction,
            feed,
            health,
            sales,
            expenses,
            dashboard,
            alerts,
            notifications,
            reports,
            auth: Arc::new(ApiKeyAuth::new(config.auth.enabled, &config.auth.api_keys)),
            chunk_size: config.reports.chunk_size,
        })
    }
}
