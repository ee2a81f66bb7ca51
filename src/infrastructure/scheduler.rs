//! Cron-driven background jobs
//!
//! Each job runs in its own task: compute the next occurrence of its cron
//! expression, sleep until then, run, log the outcome and loop. A failing
//! run is logged and counted; the task keeps going until the shared
//! cancellation token fires.

use std::sync::Arc;

use chrono::Utc;
use croner::Cron;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::SchedulerConfig;
use crate::domain::alert::AlertRule;
use crate::domain::DomainError;
use crate::infrastructure::observability::record_job_run;
use crate::infrastructure::services::{AlertService, NotificationService, ReportService};

/// Work performed by a scheduled job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Alerts(AlertRule),
    NotificationRetry,
    ReportCleanup,
}

impl JobKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Alerts(AlertRule::Pregnancy) => "pregnancy_alerts",
            Self::Alerts(AlertRule::Health) => "health_alerts",
            Self::Alerts(AlertRule::Capacity) => "capacity_alerts",
            Self::Alerts(AlertRule::Feed) => "feed_alerts",
            Self::NotificationRetry => "notification_retry",
            Self::ReportCleanup => "report_cleanup",
        }
    }
}

pub struct ScheduledJob {
    pub kind: JobKind,
    pub expression: String,
    schedule: Cron,
}

impl std::fmt::Debug for ScheduledJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledJob")
            .field("kind", &self.kind)
            .field("expression", &self.expression)
            .finish()
    }
}

impl ScheduledJob {
    pub fn new(kind: JobKind, expression: &str) -> Result<Self, DomainError> {
        let schedule = Cron::new(expression)
            .with_seconds_required()
            .parse()
            .map_err(|e| {
                DomainError::configuration(format!(
                    "Invalid cron expression '{}' for job {}: {}",
                    expression,
                    kind.name(),
                    e
                ))
            })?;

        Ok(Self {
            kind,
            expression: expression.to_string(),
            schedule,
        })
    }

    fn until_next(&self) -> Result<std::time::Duration, DomainError> {
        let now = Utc::now();
        let next = self
            .schedule
            .find_next_occurrence(&now, false)
            .map_err(|e| {
                DomainError::internal(format!("No next run for job {}: {}", self.kind.name(), e))
            })?;

        Ok((next - now).to_std().unwrap_or_default())
    }
}

pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
    alerts: Arc<AlertService>,
    notifications: Arc<NotificationService>,
    reports: Arc<ReportService>,
    retention_days: u32,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("jobs", &self.jobs)
            .field("retention_days", &self.retention_days)
            .finish()
    }
}

impl Scheduler {
    pub fn new(
        config: &SchedulerConfig,
        retention_days: u32,
        alerts: Arc<AlertService>,
        notifications: Arc<NotificationService>,
        reports: Arc<ReportService>,
    ) -> Result<Self, DomainError> {
        let jobs = vec![
            ScheduledJob::new(JobKind::Alerts(AlertRule::Pregnancy), &config.pregnancy_cron)?,
            ScheduledJob::new(JobKind::Alerts(AlertRule::Health), &config.health_cron)?,
            ScheduledJob::new(JobKind::Alerts(AlertRule::Capacity), &config.capacity_cron)?,
            ScheduledJob::new(JobKind::Alerts(AlertRule::Feed), &config.feed_cron)?,
            ScheduledJob::new(JobKind::NotificationRetry, &config.notification_retry_cron)?,
            ScheduledJob::new(JobKind::ReportCleanup, &config.report_cleanup_cron)?,
        ];

        Ok(Self {
            jobs,
            alerts,
            notifications,
            reports,
            retention_days,
        })
    }

    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    /// Start one task per job; all of them stop when `token` is cancelled
    pub fn spawn(self: Arc<Self>, token: CancellationToken) -> Vec<JoinHandle<()>> {
        (0..self.jobs.len())
            .map(|index| {
                let scheduler = Arc::clone(&self);
                let token = token.clone();
                tokio::spawn(async move { scheduler.job_loop(index, token).await })
            })
            .collect()
    }

    async fn job_loop(&self, index: usize, token: CancellationToken) {
        let job = &self.jobs[index];
        info!(job = job.kind.name(), cron = %job.expression, "Scheduled job started");

        loop {
            let wait = match job.until_next() {
                Ok(wait) => wait,
                Err(e) => {
                    error!(job = job.kind.name(), error = %e, "Scheduled job stopped");
                    return;
                }
            };

            tokio::select! {
                _ = token.cancelled() => {
                    debug!(job = job.kind.name(), "Scheduled job cancelled");
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            match self.run(job.kind).await {
                Ok(affected) => {
                    record_job_run(job.kind.name(), true);
                    info!(job = job.kind.name(), affected, "Scheduled job finished");
                }
                Err(e) => {
                    record_job_run(job.kind.name(), false);
                    error!(job = job.kind.name(), error = %e, "Scheduled job failed");
                }
            }
        }
    }

    /// Run a job once, returning how many records it touched
    pub async fn run(&self, kind: JobKind) -> Result<usize, DomainError> {
        match kind {
            JobKind::Alerts(rule) => {
                let outcome = self.alerts.run_rule(rule).await?;
                Ok(outcome.created.len() + outcome.resolved)
            }
            JobKind::NotificationRetry => self.notifications.process_due().await,
            JobKind::ReportCleanup => self.reports.cleanup(self.retention_days).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlertSettings;
    use crate::domain::notification::RetryPolicy;
    use crate::domain::reproduction::GestationPolicy;
    use crate::infrastructure::download::DownloadSigner;
    use crate::infrastructure::services::HousingService;
    use crate::infrastructure::storage::Stores;
    use std::time::Duration;

    fn scheduler(config: &SchedulerConfig) -> Result<Scheduler, DomainError> {
        let stores = Stores::in_memory();
        let housing = Arc::new(HousingService::new(stores.clone()));
        let notifications = Arc::new(NotificationService::new(
            stores.clone(),
            Vec::new(),
            RetryPolicy::default(),
        ));
        let alerts = Arc::new(AlertService::new(
            stores.clone(),
            housing,
            notifications.clone(),
            GestationPolicy::default(),
            AlertSettings::default(),
        ));
        let dir = std::env::temp_dir().join("cuy-farm-scheduler-test");
        let reports = Arc::new(ReportService::new(
            stores,
            dir,
            DownloadSigner::new("secret", 60),
        ));

        Scheduler::new(config, 30, alerts, notifications, reports)
    }

    #[test]
    fn test_default_schedule_parses() {
        let scheduler = scheduler(&SchedulerConfig::default()).unwrap();
        let names: Vec<_> = scheduler.jobs().iter().map(|j| j.kind.name()).collect();

        assert_eq!(
            names,
            vec![
                "pregnancy_alerts",
                "health_alerts",
                "capacity_alerts",
                "feed_alerts",
                "notification_retry",
                "report_cleanup"
            ]
        );
    }

    #[test]
    fn test_invalid_cron_is_configuration_error() {
        let config = SchedulerConfig {
            feed_cron: "every day".to_string(),
            ..Default::default()
        };

        let err = scheduler(&config).unwrap_err();
        assert!(matches!(err, DomainError::Configuration { .. }));
        assert!(err.to_string().contains("feed_alerts"));
    }

    #[test]
    fn test_next_run_is_bounded_by_schedule() {
        let job = ScheduledJob::new(JobKind::NotificationRetry, "* * * * * *").unwrap();
        assert!(job.until_next().unwrap() <= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_run_jobs_on_empty_farm() {
        let scheduler = scheduler(&SchedulerConfig::default()).unwrap();

        for rule in AlertRule::all() {
            assert_eq!(scheduler.run(JobKind::Alerts(rule)).await.unwrap(), 0);
        }
        assert_eq!(scheduler.run(JobKind::NotificationRetry).await.unwrap(), 0);
        assert_eq!(scheduler.run(JobKind::ReportCleanup).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_tasks_stop_on_cancel() {
        let scheduler = Arc::new(scheduler(&SchedulerConfig::default()).unwrap());
        let token = CancellationToken::new();

        let handles = scheduler.spawn(token.clone());
        assert_eq!(handles.len(), 6);

        token.cancel();
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .unwrap()
                .unwrap();
        }
    }
}
