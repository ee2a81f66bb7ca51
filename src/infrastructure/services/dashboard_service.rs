//! Farm dashboard with a short-lived cache

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate, Utc};
use moka::future::Cache;
use rust_decimal::Decimal;
use tracing::debug;

use super::{today, HousingService};
use crate::domain::alert::AlertStatus;
use crate::domain::cuy::{Sex, Stage};
use crate::domain::dashboard::{
    month_start, AlertMetrics, DashboardMetrics, FinanceMetrics, HousingMetrics,
    PopulationMetrics, ReproductionMetrics,
};
use crate::domain::reproduction::{GestationPolicy, LitterStatistics};
use crate::domain::sales::SalesStatistics;
use crate::domain::DomainError;
use crate::infrastructure::storage::Stores;

#[derive(Debug, Clone)]
pub struct DashboardService {
    stores: Stores,
    housing: Arc<HousingService>,
    policy: GestationPolicy,
    birth_warning_days: i64,
    cache: Cache<NaiveDate, Arc<DashboardMetrics>>,
}

impl DashboardService {
    pub fn new(
        stores: Stores,
        housing: Arc<HousingService>,
        policy: GestationPolicy,
        birth_warning_days: i64,
        cache_ttl: Duration,
    ) -> Self {
        let cache = Cache::builder()
            .time_to_live(cache_ttl)
            .max_capacity(4)
            .build();

        Self {
            stores,
            housing,
            policy,
            birth_warning_days,
            cache,
        }
    }

    /// Metrics for today, served from cache unless `refresh` is set
    pub async fn metrics(&self, refresh: bool) -> Result<Arc<DashboardMetrics>, DomainError> {
        let date = today();

        if !refresh {
            if let Some(cached) = self.cache.get(&date).await {
                debug!(%date, "Dashboard cache hit");
                return Ok(cached);
            }
        }

        let metrics = Arc::new(self.compute(date).await?);
        self.cache.insert(date, metrics.clone()).await;
        Ok(metrics)
    }

    async fn compute(&self, date: NaiveDate) -> Result<DashboardMetrics, DomainError> {
        Ok(DashboardMetrics {
            date,
            population: self.population().await?,
            housing: self.housing_metrics().await?,
            reproduction: self.reproduction(date).await?,
            finance: self.finance(date).await?,
            low_stock_feeds: self
                .stores
                .feeds
                .list()
                .await?
                .iter()
                .filter(|f| f.is_low_stock())
                .count(),
            alerts: self.alerts().await?,
            generated_at: Utc::now(),
        })
    }

    async fn population(&self) -> Result<PopulationMetrics, DomainError> {
        let mut metrics = PopulationMetrics {
            by_sex: [Sex::Male, Sex::Female]
                .iter()
                .map(|s| (s.as_str().to_string(), 0))
                .collect(),
            by_stage: Stage::all()
                .iter()
                .map(|s| (s.as_str().to_string(), 0))
                .collect(),
            ..Default::default()
        };

        for cuy in self.stores.cuyes.list().await?.iter().filter(|c| c.is_active()) {
            metrics.active += 1;
            *metrics.by_sex.entry(cuy.sex.as_str().to_string()).or_default() += 1;
            *metrics
                .by_stage
                .entry(cuy.stage.as_str().to_string())
                .or_default() += 1;
        }

        Ok(metrics)
    }

    async fn housing_metrics(&self) -> Result<HousingMetrics, DomainError> {
        let occupancies = self.housing.all_occupancies().await?;
        let capacity: u32 = occupancies.iter().map(|(_, o)| o.capacity).sum();
        let occupied: u32 = occupancies.iter().map(|(_, o)| o.occupied).sum();

        Ok(HousingMetrics {
            sheds: self.stores.sheds.count().await?,
            cages: occupancies.len(),
            capacity,
            occupied,
            occupancy_ratio: if capacity == 0 {
                0.0
            } else {
                occupied as f64 / capacity as f64
            },
        })
    }

    async fn reproduction(&self, date: NaiveDate) -> Result<ReproductionMetrics, DomainError> {
        let pregnancies = self.stores.pregnancies.list().await?;
        let active: Vec<_> = pregnancies.iter().filter(|p| p.is_active()).collect();

        let since = date.checked_sub_days(Days::new(30)).unwrap_or(NaiveDate::MIN);
        let litters = self.stores.litters.list().await?;
        let recent = LitterStatistics::from_litters(
            litters.iter().filter(|l| l.birth_date >= since && l.birth_date <= date),
        );

        Ok(ReproductionMetrics {
            active_pregnancies: active.len(),
            births_due_soon: active
                .iter()
                .filter(|p| (0..=self.birth_warning_days).contains(&p.days_until_birth(date)))
                .count(),
            overdue: active
                .iter()
                .filter(|p| p.is_overdue(date, &self.policy))
                .count(),
            litters_last_30_days: recent.litters,
            average_litter_size: LitterStatistics::from_litters(&litters).average_litter_size,
        })
    }

    async fn finance(&self, date: NaiveDate) -> Result<FinanceMetrics, DomainError> {
        let start = month_start(date);
        let in_month = |d: NaiveDate| d >= start && d <= date;

        let sales = self.stores.sales.list().await?;
        let sales = SalesStatistics::from_sales(sales.iter().filter(|s| in_month(s.date)));

        let expenses: Decimal = self
            .stores
            .expenses
            .list()
            .await?
            .iter()
            .filter(|e| in_month(e.date))
            .map(|e| e.amount)
            .sum();

        Ok(FinanceMetrics {
            sales_count: sales.sales,
            revenue: sales.revenue,
            expenses,
            net: sales.revenue - expenses,
        })
    }

    async fn alerts(&self) -> Result<AlertMetrics, DomainError> {
        let mut metrics = AlertMetrics::default();

        for alert in self.stores.alerts.list().await?.iter().filter(|a| !a.is_resolved()) {
            metrics.active += 1;
            if alert.status == AlertStatus::Active {
                metrics.unread += 1;
            }
            *metrics
                .by_severity
                .entry(alert.severity.as_str().to_string())
                .or_default() += 1;
        }

        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alert::{Alert, AlertKind, AlertReference, AlertSeverity};
    use crate::domain::cuy::Cuy;
    use crate::domain::expense::{Expense, ExpenseCategory};
    use crate::domain::housing::{Cage, CageKind, Shed};
    use crate::domain::reproduction::Pregnancy;

    fn service(stores: &Stores) -> DashboardService {
        DashboardService::new(
            stores.clone(),
            Arc::new(HousingService::new(stores.clone())),
            GestationPolicy::default(),
            7,
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_metrics_aggregate_farm_state() {
        let stores = Stores::in_memory();
        let shed = stores.sheds.create(Shed::new("A").unwrap()).await.unwrap();
        let cage = stores
            .cages
            .create(Cage::new(shed.id, "J-1", 4, CageKind::Breeding).unwrap())
            .await
            .unwrap();

        let born = today() - chrono::Duration::days(200);
        let female = Cuy::new("H-1", Sex::Female, "Peru", born, today())
            .unwrap()
            .with_stage(Stage::Breeder)
            .with_cage(cage.id.clone());
        let female = stores.cuyes.create(female).await.unwrap();

        let mating = today() - chrono::Duration::days(64);
        stores
            .pregnancies
            .create(Pregnancy::new(female.id, None, mating, &GestationPolicy::default()))
            .await
            .unwrap();

        let expense = Expense::new(today(), ExpenseCategory::Feed, Decimal::new(50, 0), "Alfalfa")
            .unwrap();
        stores.expenses.create(expense).await.unwrap();

        stores
            .alerts
            .create(Alert::new(
                AlertKind::CageFull,
                AlertSeverity::Critical,
                "Jaula llena",
                "J-1",
                AlertReference::new("cage", cage.id.as_str()),
            ))
            .await
            .unwrap();

        let metrics = service(&stores).metrics(false).await.unwrap();

        assert_eq!(metrics.population.active, 1);
        assert_eq!(metrics.population.by_sex["female"], 1);
        assert_eq!(metrics.population.by_sex["male"], 0);
        assert_eq!(metrics.housing.capacity, 4);
        assert_eq!(metrics.housing.occupied, 1);
        assert_eq!(metrics.housing.occupancy_ratio, 0.25);
        assert_eq!(metrics.reproduction.active_pregnancies, 1);
        assert_eq!(metrics.reproduction.births_due_soon, 1);
        assert_eq!(metrics.finance.expenses, Decimal::new(50, 0));
        assert_eq!(metrics.finance.net, Decimal::new(-50, 0));
        assert_eq!(metrics.alerts.unread, 1);
        assert_eq!(metrics.alerts.by_severity["critical"], 1);
    }

    #[tokio::test]
    async fn test_cached_until_refresh() {
        let stores = Stores::in_memory();
        let service = service(&stores);

        let first = service.metrics(false).await.unwrap();
        assert_eq!(first.housing.sheds, 0);

        stores.sheds.create(Shed::new("B").unwrap()).await.unwrap();

        let cached = service.metrics(false).await.unwrap();
        assert_eq!(cached.housing.sheds, 0);

        let fresh = service.metrics(true).await.unwrap();
        assert_eq!(fresh.housing.sheds, 1);
    }
}
