//! Dashboard aggregate metrics

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize)]
pub struct PopulationMetrics {
    pub active: usize,
    pub by_sex: BTreeMap<String, usize>,
    pub by_stage: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HousingMetrics {
    pub sheds: usize,
    pub cages: usize,
    pub capacity: u32,
    pub occupied: u32,
    pub occupancy_ratio: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReproductionMetrics {
    pub active_pregnancies: usize,
    pub births_due_soon: usize,
    pub overdue: usize,
    pub litters_last_30_days: usize,
    pub average_litter_size: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FinanceMetrics {
    pub sales_count: usize,
    pub revenue: Decimal,
    pub expenses: Decimal,
    pub net: Decimal,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertMetrics {
    pub active: usize,
    pub unread: usize,
    pub by_severity: BTreeMap<String, usize>,
}

/// Snapshot of the farm for a single day
#[derive(Debug, Clone, Serialize)]
pub struct DashboardMetrics {
    pub date: NaiveDate,
    pub population: PopulationMetrics,
    pub housing: HousingMetrics,
    pub reproduction: ReproductionMetrics,
    /// Month to date
    pub finance: FinanceMetrics,
    pub low_stock_feeds: usize,
    pub alerts: AlertMetrics,
    pub generated_at: DateTime<Utc>,
}

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day0(0).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_start() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(month_start(date), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }
}
