//! Shed (galpón) and cage (jaula) entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{validate_cage_code, validate_capacity, validate_shed_name};
use crate::domain::id::entity_id;
use crate::domain::storage::StorageEntity;
use crate::domain::DomainError;

entity_id!(
    /// Identifier of a shed
    ShedId,
    "shed"
);

entity_id!(
    /// Identifier of a cage
    CageId,
    "cage"
);

/// A shed groups cages physically
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shed {
    pub id: ShedId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shed {
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into().trim().to_string();
        validate_shed_name(&name)?;
        let now = Utc::now();

        Ok(Self {
            id: ShedId::generate(),
            name,
            location: None,
            description: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl StorageEntity for Shed {
    type Key = ShedId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

/// Intended use of a cage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CageKind {
    Breeding,
    #[default]
    Rearing,
    Fattening,
    Quarantine,
}

impl CageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breeding => "breeding",
            Self::Rearing => "rearing",
            Self::Fattening => "fattening",
            Self::Quarantine => "quarantine",
        }
    }
}

impl std::fmt::Display for CageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A cage holds a bounded number of animals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cage {
    pub id: CageId,
    pub shed_id: ShedId,
    pub code: String,
    pub capacity: u32,
    pub kind: CageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cage {
    pub fn new(
        shed_id: ShedId,
        code: impl Into<String>,
        capacity: u32,
        kind: CageKind,
    ) -> Result<Self, DomainError> {
        let code = code.into().trim().to_uppercase();
        validate_cage_code(&code)?;
        validate_capacity(capacity)?;
        let now = Utc::now();

        Ok(Self {
            id: CageId::generate(),
            shed_id,
            code,
            capacity,
            kind,
            notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl StorageEntity for Cage {
    type Key = CageId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

/// Current use of a cage
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CageOccupancy {
    pub capacity: u32,
    pub occupied: u32,
    pub available: u32,
    pub ratio: f64,
}

impl CageOccupancy {
    pub fn new(capacity: u32, occupied: u32) -> Self {
        let ratio = if capacity == 0 {
            1.0
        } else {
            occupied as f64 / capacity as f64
        };

        Self {
            capacity,
            occupied,
            available: capacity.saturating_sub(occupied),
            ratio,
        }
    }

    pub fn is_full(&self) -> bool {
        self.occupied >= self.capacity
    }

    /// Whether `count` more animals fit
    pub fn can_fit(&self, count: u32) -> bool {
        self.occupied + count <= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shed_creation_trims_name() {
        let shed = Shed::new("  Galpón Norte ").unwrap();
        assert_eq!(shed.name, "Galpón Norte");
        assert!(shed.location.is_none());
    }

    #[test]
    fn test_shed_rejects_empty_name() {
        assert!(Shed::new("   ").is_err());
    }

    #[test]
    fn test_cage_code_is_uppercased() {
        let cage = Cage::new(ShedId::generate(), "j-01", 10, CageKind::Breeding).unwrap();
        assert_eq!(cage.code, "J-01");
        assert_eq!(cage.kind, CageKind::Breeding);
    }

    #[test]
    fn test_cage_rejects_zero_capacity() {
        assert!(Cage::new(ShedId::generate(), "J-01", 0, CageKind::Rearing).is_err());
    }

    #[test]
    fn test_occupancy_math() {
        let occupancy = CageOccupancy::new(10, 9);
        assert_eq!(occupancy.available, 1);
        assert!((occupancy.ratio - 0.9).abs() < f64::EPSILON);
        assert!(occupancy.can_fit(1));
        assert!(!occupancy.can_fit(2));
        assert!(!occupancy.is_full());
        assert!(CageOccupancy::new(10, 10).is_full());
    }

    #[test]
    fn test_occupancy_over_capacity_has_no_availability() {
        let occupancy = CageOccupancy::new(4, 6);
        assert_eq!(occupancy.available, 0);
        assert!(occupancy.is_full());
    }
}
