//! Sale (venta) entity

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::cuy::CuyId;
use crate::domain::id::entity_id;
use crate::domain::query::DateRange;
use crate::domain::storage::StorageEntity;
use crate::domain::DomainError;

entity_id!(
    /// Identifier of a sale
    SaleId,
    "sale"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    #[default]
    Completed,
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Transfer,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItem {
    pub cuy_id: CuyId,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub date: NaiveDate,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    pub items: Vec<SaleItem>,
    pub total: Decimal,
    pub status: SaleStatus,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    pub fn new(
        date: NaiveDate,
        customer_name: impl Into<String>,
        items: Vec<SaleItem>,
        payment_method: PaymentMethod,
    ) -> Result<Self, DomainError> {
        let customer_name = customer_name.into().trim().to_string();

        if customer_name.is_empty() {
            return Err(DomainError::validation("Customer name cannot be empty"));
        }

        validate_items(&items)?;
        let total = items.iter().map(|item| item.price).sum();
        let now = Utc::now();

        Ok(Self {
            id: SaleId::generate(),
            date,
            customer_name,
            customer_phone: None,
            items,
            total,
            status: SaleStatus::Completed,
            payment_method,
            notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_completed(&self) -> bool {
        self.status == SaleStatus::Completed
    }

    pub fn cuy_ids(&self) -> impl Iterator<Item = &CuyId> {
        self.items.iter().map(|item| &item.cuy_id)
    }

    pub fn cancel(&mut self) -> Result<(), DomainError> {
        if !self.is_completed() {
            return Err(DomainError::validation(format!(
                "Sale '{}' is already cancelled",
                self.id
            )));
        }

        self.status = SaleStatus::Cancelled;
        self.touch();
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn validate_items(items: &[SaleItem]) -> Result<(), DomainError> {
    if items.is_empty() {
        return Err(DomainError::validation("A sale needs at least one item"));
    }

    let mut seen = HashSet::new();

    for item in items {
        if !seen.insert(&item.cuy_id) {
            return Err(DomainError::validation(format!(
                "Cuy '{}' appears more than once in the sale",
                item.cuy_id
            )));
        }

        if item.price <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "Price for cuy '{}' must be greater than zero",
                item.cuy_id
            )));
        }
    }

    Ok(())
}

impl StorageEntity for Sale {
    type Key = SaleId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

#[derive(Debug, Clone, Default)]
pub struct SaleQuery {
    pub status: Option<SaleStatus>,
    pub range: DateRange,
    /// Case-insensitive substring of the customer name
    pub customer: Option<String>,
}

impl SaleQuery {
    pub fn matches(&self, sale: &Sale) -> bool {
        if self.status.is_some_and(|s| s != sale.status) {
            return false;
        }

        if !self.range.contains(sale.date) {
            return false;
        }

        if let Some(ref customer) = self.customer {
            let needle = customer.trim().to_lowercase();

            if !sale.customer_name.to_lowercase().contains(&needle) {
                return false;
            }
        }

        true
    }
}

/// Revenue figures over completed sales
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SalesStatistics {
    pub sales: usize,
    pub units_sold: usize,
    pub revenue: Decimal,
    pub average_price: Decimal,
    /// Revenue keyed by `YYYY-MM`
    pub revenue_by_month: BTreeMap<String, Decimal>,
}

impl SalesStatistics {
    pub fn from_sales<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> Self {
        let mut stats = Self::default();

        for sale in sales.into_iter().filter(|s| s.is_completed()) {
            stats.sales += 1;
            stats.units_sold += sale.items.len();
            stats.revenue += sale.total;
            *stats
                .revenue_by_month
                .entry(sale.date.format("%Y-%m").to_string())
                .or_insert(Decimal::ZERO) += sale.total;
        }

        if stats.units_sold > 0 {
            stats.average_price = (stats.revenue / Decimal::from(stats.units_sold)).round_dp(2);
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(price: i64) -> SaleItem {
        SaleItem {
            cuy_id: CuyId::generate(),
            price: Decimal::new(price, 0),
            weight_kg: None,
        }
    }

    #[test]
    fn test_total_is_sum_of_items() {
        let items = vec![item(30), item(45)];
        let sale = Sale::new(date(2024, 5, 1), "Rosa", items, PaymentMethod::Cash).unwrap();
        assert_eq!(sale.total, Decimal::new(75, 0));
        assert!(sale.is_completed());
    }

    #[test]
    fn test_sale_validation() {
        assert!(Sale::new(date(2024, 5, 1), "Rosa", vec![], PaymentMethod::Cash).is_err());
        assert!(Sale::new(date(2024, 5, 1), " ", vec![item(10)], PaymentMethod::Cash).is_err());
        assert!(Sale::new(date(2024, 5, 1), "Rosa", vec![item(0)], PaymentMethod::Cash).is_err());

        let dup = item(10);
        assert!(
            Sale::new(date(2024, 5, 1), "Rosa", vec![dup.clone(), dup], PaymentMethod::Cash)
                .is_err()
        );
    }

    #[test]
    fn test_cancel_twice_fails() {
        let mut sale =
            Sale::new(date(2024, 5, 1), "Rosa", vec![item(30)], PaymentMethod::Transfer).unwrap();
        sale.cancel().unwrap();
        assert!(sale.cancel().is_err());
    }

    #[test]
    fn test_statistics_ignore_cancelled() {
        let a = Sale::new(date(2024, 4, 10), "A", vec![item(30), item(40)], PaymentMethod::Cash)
            .unwrap();
        let b = Sale::new(date(2024, 5, 2), "B", vec![item(50)], PaymentMethod::Cash).unwrap();
        let mut c = Sale::new(date(2024, 5, 3), "C", vec![item(99)], PaymentMethod::Cash).unwrap();
        c.cancel().unwrap();

        let stats = SalesStatistics::from_sales(&[a, b, c]);

        assert_eq!(stats.sales, 2);
        assert_eq!(stats.units_sold, 3);
        assert_eq!(stats.revenue, Decimal::new(120, 0));
        assert_eq!(stats.average_price, Decimal::new(40, 0));
        assert_eq!(stats.revenue_by_month.get("2024-04"), Some(&Decimal::new(70, 0)));
        assert_eq!(stats.revenue_by_month.get("2024-05"), Some(&Decimal::new(50, 0)));
    }

    #[test]
    fn test_query_customer_substring() {
        let sale =
            Sale::new(date(2024, 5, 1), "Restaurante El Cuy", vec![item(30)], PaymentMethod::Cash)
                .unwrap();
        let query = SaleQuery {
            customer: Some("el cuy".to_string()),
            ..Default::default()
        };
        assert!(query.matches(&sale));
    }
}
