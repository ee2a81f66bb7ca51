//! Feed inventory entities

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::id::entity_id;
use crate::domain::storage::StorageEntity;
use crate::domain::DomainError;

entity_id!(
    /// Identifier of a feed item
    FeedId,
    "feed"
);

entity_id!(
    /// Identifier of a stock movement
    FeedMovementId,
    "feed movement"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// Alfalfa, chala and other green fodder
    #[default]
    Forage,
    Concentrate,
    Supplement,
    Other,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forage => "forage",
            Self::Concentrate => "concentrate",
            Self::Supplement => "supplement",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: FeedId,
    pub name: String,
    pub kind: FeedKind,
    pub stock_kg: f64,
    pub min_stock_kg: f64,
    /// Cost per kilogram
    pub unit_cost: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeedItem {
    pub fn new(
        name: impl Into<String>,
        kind: FeedKind,
        stock_kg: f64,
        min_stock_kg: f64,
        unit_cost: Decimal,
    ) -> Result<Self, DomainError> {
        let name = name.into().trim().to_string();

        if name.is_empty() {
            return Err(DomainError::validation("Feed name cannot be empty"));
        }

        validate_non_negative("stock_kg", stock_kg)?;
        validate_non_negative("min_stock_kg", min_stock_kg)?;
        validate_cost(unit_cost)?;
        let now = Utc::now();

        Ok(Self {
            id: FeedId::generate(),
            name,
            kind,
            stock_kg,
            min_stock_kg,
            unit_cost,
            supplier: None,
            notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_kg <= self.min_stock_kg
    }

    pub fn restock(&mut self, quantity_kg: f64) -> Result<(), DomainError> {
        validate_quantity(quantity_kg)?;
        self.stock_kg += quantity_kg;
        self.touch();
        Ok(())
    }

    pub fn consume(&mut self, quantity_kg: f64) -> Result<(), DomainError> {
        validate_quantity(quantity_kg)?;

        if quantity_kg > self.stock_kg {
            return Err(DomainError::validation(format!(
                "Insufficient stock of '{}': {} kg available, {} kg requested",
                self.name, self.stock_kg, quantity_kg
            )));
        }

        self.stock_kg -= quantity_kg;
        self.touch();
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl StorageEntity for FeedItem {
    type Key = FeedId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    In,
    Out,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedMovement {
    pub id: FeedMovementId,
    pub feed_id: FeedId,
    pub kind: MovementKind,
    pub quantity_kg: f64,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FeedMovement {
    pub fn new(feed_id: FeedId, kind: MovementKind, quantity_kg: f64, date: NaiveDate) -> Self {
        Self {
            id: FeedMovementId::generate(),
            feed_id,
            kind,
            quantity_kg,
            date,
            unit_cost: None,
            notes: None,
            created_at: Utc::now(),
        }
    }
}

impl StorageEntity for FeedMovement {
    type Key = FeedMovementId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

pub fn validate_quantity(quantity_kg: f64) -> Result<(), DomainError> {
    if !quantity_kg.is_finite() || quantity_kg <= 0.0 {
        return Err(DomainError::validation("Quantity must be greater than zero"));
    }

    Ok(())
}

pub fn validate_non_negative(field: &str, value: f64) -> Result<(), DomainError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DomainError::validation(format!(
            "{} cannot be negative",
            field
        )));
    }

    Ok(())
}

pub fn validate_cost(cost: Decimal) -> Result<(), DomainError> {
    if cost.is_sign_negative() {
        return Err(DomainError::validation("Unit cost cannot be negative"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alfalfa() -> FeedItem {
        FeedItem::new("Alfalfa", FeedKind::Forage, 100.0, 20.0, Decimal::new(150, 2)).unwrap()
    }

    #[test]
    fn test_feed_creation() {
        let item = alfalfa();
        assert_eq!(item.name, "Alfalfa");
        assert!(!item.is_low_stock());
    }

    #[test]
    fn test_feed_rejects_negative_values() {
        assert!(FeedItem::new("X", FeedKind::Other, -1.0, 0.0, Decimal::ZERO).is_err());
        assert!(FeedItem::new("X", FeedKind::Other, 1.0, 0.0, Decimal::new(-1, 0)).is_err());
        assert!(FeedItem::new(" ", FeedKind::Other, 1.0, 0.0, Decimal::ZERO).is_err());
    }

    #[test]
    fn test_consume_and_restock() {
        let mut item = alfalfa();

        item.consume(85.0).unwrap();
        assert!((item.stock_kg - 15.0).abs() < f64::EPSILON);
        assert!(item.is_low_stock());

        item.restock(50.0).unwrap();
        assert!((item.stock_kg - 65.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_consume_more_than_stock_fails() {
        let mut item = alfalfa();
        let err = item.consume(100.5).unwrap_err();
        assert!(err.to_string().contains("Insufficient stock"));
        assert!((item.stock_kg - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut item = alfalfa();
        assert!(item.restock(0.0).is_err());
        assert!(item.consume(-3.0).is_err());
    }
}
