//! Alert rules, deduplication and lifecycle

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{today, HousingService, NotificationService};
use crate::config::AlertSettings;
use crate::domain::alert::{
    Alert, AlertId, AlertKind, AlertQuery, AlertReference, AlertRule, AlertSeverity, AlertStatus,
    RuleOutcome,
};
use crate::domain::reproduction::GestationPolicy;
use crate::domain::{DomainError, Page, Pagination};
use crate::infrastructure::observability::{record_alert_created, record_alerts_resolved};
use crate::infrastructure::storage::Stores;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateAlertsRequest {
    /// Rules to run; all of them when absent or empty
    #[serde(default)]
    pub rules: Option<Vec<AlertRule>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertSummary {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    /// Unresolved alerts only
    pub by_severity: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct AlertService {
    stores: Stores,
    housing: Arc<HousingService>,
    notifications: Arc<NotificationService>,
    policy: GestationPolicy,
    settings: AlertSettings,
    /// Held for a whole rule pass so dedup sees every alert created before it
    runs: Arc<Mutex<()>>,
}

impl AlertService {
    pub fn new(
        stores: Stores,
        housing: Arc<HousingService>,
        notifications: Arc<NotificationService>,
        policy: GestationPolicy,
        settings: AlertSettings,
    ) -> Self {
        Self {
            stores,
            housing,
            notifications,
            policy,
            settings,
            runs: Arc::new(Mutex::new(())),
        }
    }

    /// Run the requested rules (all when empty) in a fixed order
    pub async fn generate(&self, rules: &[AlertRule]) -> Result<Vec<RuleOutcome>, DomainError> {
        let rules: Vec<AlertRule> = if rules.is_empty() {
            AlertRule::all().to_vec()
        } else {
            AlertRule::all()
                .into_iter()
                .filter(|r| rules.contains(r))
                .collect()
        };

        let mut outcomes = Vec::with_capacity(rules.len());
        for rule in rules {
            outcomes.push(self.run_rule(rule).await?);
        }

        Ok(outcomes)
    }

    /// Evaluate one rule, create new alerts and resolve the ones that no longer apply
    pub async fn run_rule(&self, rule: AlertRule) -> Result<RuleOutcome, DomainError> {
        let _guard = self.runs.lock().await;
        let date = today();
        let candidates = match rule {
            AlertRule::Pregnancy => self.pregnancy_candidates(date).await?,
            AlertRule::Health => self.health_candidates(date).await?,
            AlertRule::Capacity => self.capacity_candidates().await?,
            AlertRule::Feed => self.feed_candidates().await?,
        };

        let mut open: HashMap<String, Alert> = self
            .stores
            .alerts
            .list()
            .await?
            .into_iter()
            .filter(|a| !a.is_resolved() && rule.owns(a.kind))
            .map(|a| (a.dedup_key.clone(), a))
            .collect();

        let produced: HashSet<String> = candidates.iter().map(|c| c.dedup_key.clone()).collect();
        let mut outcome = RuleOutcome::for_rule(rule);

        for candidate in candidates {
            match open.get_mut(&candidate.dedup_key) {
                Some(existing) => {
                    if candidate.severity > existing.severity {
                        debug!(
                            id = %existing.id,
                            severity = candidate.severity.as_str(),
                            "Escalating alert"
                        );
                        existing.severity = candidate.severity;
                        existing.message = candidate.message;
                        self.stores.alerts.update(existing.clone()).await?;
                    }
                }
                None => {
                    let alert = self.stores.alerts.create(candidate).await?;
                    record_alert_created(alert.kind.as_str(), alert.severity.as_str());
                    info!(
                        id = %alert.id,
                        kind = %alert.kind,
                        severity = alert.severity.as_str(),
                        "Alert raised"
                    );

                    if let Err(e) = self.notifications.dispatch(&alert).await {
                        warn!(id = %alert.id, error = %e, "Failed to dispatch alert");
                    }

                    open.insert(alert.dedup_key.clone(), alert.clone());
                    outcome.created.push(alert);
                }
            }
        }

        for (key, mut alert) in open {
            if produced.contains(&key) {
                continue;
            }

            alert.resolve();
            self.stores.alerts.update(alert).await?;
            outcome.resolved += 1;
        }

        if outcome.resolved > 0 {
            record_alerts_resolved(rule.as_str(), outcome.resolved);
        }

        info!(
            rule = rule.as_str(),
            created = outcome.created.len(),
            resolved = outcome.resolved,
            "Alert rule evaluated"
        );
        Ok(outcome)
    }

    pub async fn get(&self, id: &str) -> Result<Alert, DomainError> {
        let alert_id = AlertId::parse(id)?;
        self.stores
            .alerts
            .get(&alert_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Alert '{}' not found", id)))
    }

    /// Matching alerts, newest first
    pub async fn list(
        &self,
        query: &AlertQuery,
        pagination: Pagination,
    ) -> Result<Page<Alert>, DomainError> {
        let mut alerts: Vec<Alert> = self
            .stores
            .alerts
            .list()
            .await?
            .into_iter()
            .filter(|a| query.matches(a))
            .collect();

        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::from_sorted(alerts, pagination))
    }

    pub async fn mark_read(&self, id: &str) -> Result<Alert, DomainError> {
        let mut alert = self.get(id).await?;
        alert.mark_read()?;
        self.stores.alerts.update(alert).await
    }

    /// Mark every active alert read, returning how many changed
    pub async fn mark_all_read(&self) -> Result<usize, DomainError> {
        let mut count = 0;

        for mut alert in self.stores.alerts.list().await? {
            if alert.status != AlertStatus::Active {
                continue;
            }
            alert.mark_read()?;
            self.stores.alerts.update(alert).await?;
            count += 1;
        }

        info!(count, "Marked alerts as read");
        Ok(count)
    }

    pub async fn resolve(&self, id: &str) -> Result<Alert, DomainError> {
        let mut alert = self.get(id).await?;

        if alert.is_resolved() {
            return Err(DomainError::validation(format!(
                "Alert '{}' is already resolved",
                alert.id
            )));
        }

        alert.resolve();
        info!(id = %alert.id, "Alert resolved manually");
        self.stores.alerts.update(alert).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), DomainError> {
        let alert = self.get(id).await?;
        info!(id = %alert.id, "Deleting alert");
        self.stores.alerts.delete(&alert.id).await?;
        Ok(())
    }

    pub async fn summary(&self) -> Result<AlertSummary, DomainError> {
        let mut summary = AlertSummary {
            by_status: [AlertStatus::Active, AlertStatus::Read, AlertStatus::Resolved]
                .iter()
                .map(|s| (s.as_str().to_string(), 0))
                .collect(),
            by_severity: [AlertSeverity::Info, AlertSeverity::Warning, AlertSeverity::Critical]
                .iter()
                .map(|s| (s.as_str().to_string(), 0))
                .collect(),
            ..Default::default()
        };

        for alert in self.stores.alerts.list().await? {
            summary.total += 1;
            *summary
                .by_status
                .entry(alert.status.as_str().to_string())
                .or_default() += 1;

            if !alert.is_resolved() {
                *summary
                    .by_severity
                    .entry(alert.severity.as_str().to_string())
                    .or_default() += 1;
            }
        }

        Ok(summary)
    }

    async fn cuy_codes(&self) -> Result<HashMap<String, String>, DomainError> {
        Ok(self
            .stores
            .cuyes
            .list()
            .await?
            .into_iter()
            .map(|c| (c.id.to_string(), c.code))
            .collect())
    }

    async fn pregnancy_candidates(&self, date: NaiveDate) -> Result<Vec<Alert>, DomainError> {
        let codes = self.cuy_codes().await?;
        let mut alerts = Vec::new();

        for pregnancy in self.stores.pregnancies.list().await? {
            if !pregnancy.is_active() {
                continue;
            }

            let female = codes
                .get(pregnancy.female_id.as_str())
                .cloned()
                .unwrap_or_else(|| pregnancy.female_id.to_string());
            let reference = AlertReference::new("pregnancy", pregnancy.id.as_str());

            if pregnancy.is_overdue(date, &self.policy) {
                alerts.push(Alert::new(
                    AlertKind::BirthOverdue,
                    AlertSeverity::Critical,
                    format!("Parto atrasado: {}", female),
                    format!(
                        "Cuy {} was mated on {} and has exceeded {} days of gestation",
                        female, pregnancy.mating_date, self.policy.gestation_max_days
                    ),
                    reference,
                ));
                continue;
            }

            let days = pregnancy.days_until_birth(date);
            if days <= self.settings.birth_warning_days {
                let severity = if days <= 2 {
                    AlertSeverity::Critical
                } else {
                    AlertSeverity::Warning
                };

                alerts.push(Alert::new(
                    AlertKind::BirthImminent,
                    severity,
                    format!("Parto próximo: {}", female),
                    format!(
                        "Cuy {} is expected to give birth on {} ({} days)",
                        female, pregnancy.expected_birth_date, days
                    ),
                    reference,
                ));
            }
        }

        Ok(alerts)
    }

    async fn health_candidates(&self, date: NaiveDate) -> Result<Vec<Alert>, DomainError> {
        let codes = self.cuy_codes().await?;
        let mut alerts = Vec::new();

        for record in self.stores.health_records.list().await? {
            let Some(follow_up) = record.follow_up_date.filter(|_| record.is_open()) else {
                continue;
            };

            let days = (follow_up - date).num_days();
            if days > self.settings.health_warning_days {
                continue;
            }

            let cuy = codes
                .get(record.cuy_id.as_str())
                .cloned()
                .unwrap_or_else(|| record.cuy_id.to_string());
            let severity = if days < 0 {
                AlertSeverity::Critical
            } else {
                AlertSeverity::Warning
            };

            alerts.push(Alert::new(
                AlertKind::HealthFollowUp,
                severity,
                format!("Seguimiento sanitario: {}", cuy),
                format!(
                    "{} follow-up for cuy {} is due on {}: {}",
                    record.kind.as_str(),
                    cuy,
                    follow_up,
                    record.description
                ),
                AlertReference::new("health_record", record.id.as_str()),
            ));
        }

        Ok(alerts)
    }

    async fn capacity_candidates(&self) -> Result<Vec<Alert>, DomainError> {
        let mut alerts = Vec::new();

        for (cage, occupancy) in self.housing.all_occupancies().await? {
            let reference = AlertReference::new("cage", cage.id.as_str());

            if occupancy.is_full() {
                alerts.push(Alert::new(
                    AlertKind::CageFull,
                    AlertSeverity::Critical,
                    format!("Jaula llena: {}", cage.code),
                    format!(
                        "Cage {} holds {} of {} cuyes",
                        cage.code, occupancy.occupied, occupancy.capacity
                    ),
                    reference,
                ));
            } else if occupancy.ratio >= self.settings.capacity_warning_ratio {
                alerts.push(Alert::new(
                    AlertKind::CageNearCapacity,
                    AlertSeverity::Warning,
                    format!("Jaula casi llena: {}", cage.code),
                    format!(
                        "Cage {} holds {} of {} cuyes ({:.0}%)",
                        cage.code,
                        occupancy.occupied,
                        occupancy.capacity,
                        occupancy.ratio * 100.0
                    ),
                    reference,
                ));
            }
        }

        Ok(alerts)
    }

    async fn feed_candidates(&self) -> Result<Vec<Alert>, DomainError> {
        Ok(self
            .stores
            .feeds
            .list()
            .await?
            .into_iter()
            .filter(|f| f.is_low_stock())
            .map(|feed| {
                let severity = if feed.stock_kg <= 0.0 {
                    AlertSeverity::Critical
                } else {
                    AlertSeverity::Warning
                };

                Alert::new(
                    AlertKind::LowFeedStock,
                    severity,
                    format!("Stock bajo: {}", feed.name),
                    format!(
                        "{} has {} kg left (minimum {} kg)",
                        feed.name, feed.stock_kg, feed.min_stock_kg
                    ),
                    AlertReference::new("feed", feed.id.as_str()),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cuy::{Cuy, Sex};
    use crate::domain::feed::{FeedItem, FeedKind};
    use crate::domain::health::{HealthKind, HealthRecord};
    use crate::domain::housing::{Cage, CageKind, Shed};
    use crate::domain::notification::{MockNotificationChannel, NotificationChannel, RetryPolicy};
    use crate::domain::reproduction::Pregnancy;
    use chrono::Duration;
    use rust_decimal::Decimal;

    struct Fixture {
        service: AlertService,
        stores: Stores,
    }

    fn fixture_with(channels: Vec<Arc<dyn NotificationChannel>>) -> Fixture {
        let stores = Stores::in_memory();
        let housing = Arc::new(HousingService::new(stores.clone()));
        let notifications = Arc::new(NotificationService::new(
            stores.clone(),
            channels,
            RetryPolicy::default(),
        ));

        Fixture {
            service: AlertService::new(
                stores.clone(),
                housing,
                notifications,
                GestationPolicy::default(),
                AlertSettings::default(),
            ),
            stores,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Vec::new())
    }

    async fn female(stores: &Stores, code: &str) -> Cuy {
        let born = today() - Duration::days(300);
        let cuy = Cuy::new(code, Sex::Female, "Peru", born, today()).unwrap();
        stores.cuyes.create(cuy).await.unwrap()
    }

    async fn pregnant(stores: &Stores, code: &str, days_ago: i64) -> Pregnancy {
        let cuy = female(stores, code).await;
        let pregnancy = Pregnancy::new(
            cuy.id,
            None,
            today() - Duration::days(days_ago),
            &GestationPolicy::default(),
        );
        stores.pregnancies.create(pregnancy).await.unwrap()
    }

    async fn feed(stores: &Stores, stock: f64) -> FeedItem {
        let feed = FeedItem::new("Alfalfa", FeedKind::Forage, stock, 10.0, Decimal::ONE).unwrap();
        stores.feeds.create(feed).await.unwrap()
    }

    #[tokio::test]
    async fn test_pregnancy_rule_severities() {
        let f = fixture();
        pregnant(&f.stores, "H-1", 62).await; // 5 days left
        pregnant(&f.stores, "H-2", 66).await; // 1 day left
        pregnant(&f.stores, "H-3", 80).await; // overdue
        pregnant(&f.stores, "H-4", 10).await; // far away

        let outcome = f.service.run_rule(AlertRule::Pregnancy).await.unwrap();
        assert_eq!(outcome.created.len(), 3);

        let severity_of = |kind: AlertKind, title: &str| {
            outcome
                .created
                .iter()
                .find(|a| a.kind == kind && a.title.ends_with(title))
                .map(|a| a.severity)
        };
        assert_eq!(severity_of(AlertKind::BirthImminent, "H-1"), Some(AlertSeverity::Warning));
        assert_eq!(severity_of(AlertKind::BirthImminent, "H-2"), Some(AlertSeverity::Critical));
        assert_eq!(severity_of(AlertKind::BirthOverdue, "H-3"), Some(AlertSeverity::Critical));
    }

    #[tokio::test]
    async fn test_rules_deduplicate_open_alerts() {
        let f = fixture();
        feed(&f.stores, 5.0).await;

        let first = f.service.run_rule(AlertRule::Feed).await.unwrap();
        assert_eq!(first.created.len(), 1);

        let second = f.service.run_rule(AlertRule::Feed).await.unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.resolved, 0);

        // reading an alert does not allow a duplicate either
        f.service
            .mark_read(first.created[0].id.as_str())
            .await
            .unwrap();
        let third = f.service.run_rule(AlertRule::Feed).await.unwrap();
        assert!(third.created.is_empty());
    }

    #[tokio::test]
    async fn test_condition_cleared_auto_resolves() {
        let f = fixture();
        let mut item = feed(&f.stores, 5.0).await;
        f.service.run_rule(AlertRule::Feed).await.unwrap();

        item.stock_kg = 50.0;
        f.stores.feeds.update(item).await.unwrap();

        let outcome = f.service.run_rule(AlertRule::Feed).await.unwrap();
        assert_eq!(outcome.resolved, 1);

        let summary = f.service.summary().await.unwrap();
        assert_eq!(summary.by_status["resolved"], 1);
        assert_eq!(summary.by_severity["warning"], 0);
    }

    #[tokio::test]
    async fn test_resolved_alert_can_be_raised_again() {
        let f = fixture();
        feed(&f.stores, 0.0).await;

        let first = f.service.run_rule(AlertRule::Feed).await.unwrap();
        assert_eq!(first.created[0].severity, AlertSeverity::Critical);
        f.service.resolve(first.created[0].id.as_str()).await.unwrap();

        let again = f.service.run_rule(AlertRule::Feed).await.unwrap();
        assert_eq!(again.created.len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_rule() {
        let f = fixture();
        let shed = f.stores.sheds.create(Shed::new("A").unwrap()).await.unwrap();
        let full = f
            .stores
            .cages
            .create(Cage::new(shed.id.clone(), "J-1", 1, CageKind::Breeding).unwrap())
            .await
            .unwrap();
        f.stores
            .cages
            .create(Cage::new(shed.id, "J-2", 10, CageKind::Rearing).unwrap())
            .await
            .unwrap();

        let cuy = female(&f.stores, "H-1").await.with_cage(full.id.clone());
        f.stores.cuyes.update(cuy).await.unwrap();

        let outcome = f.service.run_rule(AlertRule::Capacity).await.unwrap();
        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.created[0].kind, AlertKind::CageFull);
        assert_eq!(
            outcome.created[0].reference,
            Some(AlertReference::new("cage", full.id.as_str()))
        );
    }

    #[tokio::test]
    async fn test_health_follow_up_rule() {
        let f = fixture();
        let cuy = female(&f.stores, "H-1").await;

        let mut overdue = HealthRecord::new(
            cuy.id.clone(),
            HealthKind::Treatment,
            today() - Duration::days(10),
            "Antibiotico",
        )
        .unwrap();
        overdue.set_follow_up(Some(today() - Duration::days(1))).unwrap();
        f.stores.health_records.create(overdue).await.unwrap();

        let mut later = HealthRecord::new(cuy.id, HealthKind::Checkup, today(), "Control").unwrap();
        later.set_follow_up(Some(today() + Duration::days(30))).unwrap();
        f.stores.health_records.create(later).await.unwrap();

        let outcome = f.service.run_rule(AlertRule::Health).await.unwrap();
        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.created[0].severity, AlertSeverity::Critical);
    }

    #[tokio::test]
    async fn test_new_alerts_are_dispatched() {
        let mut channel = MockNotificationChannel::new();
        channel.expect_name().return_const("log".to_string());
        channel.expect_send().times(1).returning(|_| Ok(()));

        let f = fixture_with(vec![Arc::new(channel)]);
        feed(&f.stores, 1.0).await;

        f.service.generate(&[AlertRule::Feed]).await.unwrap();
        f.service.generate(&[AlertRule::Feed]).await.unwrap();

        assert_eq!(f.stores.notifications.count().await.unwrap(), 1);
    }

    #[derive(Debug)]
    struct SlowChannel;

    #[async_trait::async_trait]
    impl NotificationChannel for SlowChannel {
        fn name(&self) -> &str {
            "slow"
        }

        async fn send(&self, _alert: &Alert) -> Result<(), DomainError> {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_overlapping_runs_do_not_duplicate_alerts() {
        let f = fixture_with(vec![Arc::new(SlowChannel)]);
        feed(&f.stores, 1.0).await;
        let other =
            FeedItem::new("Maiz", FeedKind::Concentrate, 2.0, 10.0, Decimal::ONE).unwrap();
        f.stores.feeds.create(other).await.unwrap();

        let (a, b) = tokio::join!(
            f.service.run_rule(AlertRule::Feed),
            f.service.run_rule(AlertRule::Feed)
        );
        assert_eq!(a.unwrap().created.len() + b.unwrap().created.len(), 2);

        let open: Vec<Alert> = f
            .stores
            .alerts
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|a| !a.is_resolved())
            .collect();
        let keys: HashSet<_> = open.iter().map(|a| a.dedup_key.clone()).collect();
        assert_eq!(open.len(), 2);
        assert_eq!(keys.len(), 2);
    }

    #[tokio::test]
    async fn test_generate_runs_all_rules_by_default() {
        let f = fixture();
        let outcomes = f.service.generate(&[]).await.unwrap();
        let rules: Vec<_> = outcomes.iter().filter_map(|o| o.rule).collect();
        assert_eq!(rules, AlertRule::all().to_vec());
    }

    #[tokio::test]
    async fn test_mark_all_read() {
        let f = fixture();
        feed(&f.stores, 1.0).await;
        f.service.run_rule(AlertRule::Feed).await.unwrap();

        assert_eq!(f.service.mark_all_read().await.unwrap(), 1);
        assert_eq!(f.service.mark_all_read().await.unwrap(), 0);

        let summary = f.service.summary().await.unwrap();
        assert_eq!(summary.by_status["read"], 1);
    }
}
