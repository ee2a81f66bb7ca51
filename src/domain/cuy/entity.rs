//! Cuy entity and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{normalize_code, validate_birth_date, validate_breed, validate_weight};
use crate::domain::housing::CageId;
use crate::domain::id::entity_id;
use crate::domain::reproduction::LitterId;
use crate::domain::storage::StorageEntity;
use crate::domain::DomainError;

entity_id!(
    /// Identifier of a cuy
    CuyId,
    "cuy"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

impl std::fmt::Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Production stage (cría, recría, engorde, reproductor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Nursing,
    #[default]
    Growing,
    Fattening,
    Breeder,
}

impl Stage {
    pub fn all() -> [Stage; 4] {
        [Self::Nursing, Self::Growing, Self::Fattening, Self::Breeder]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nursing => "nursing",
            Self::Growing => "growing",
            Self::Fattening => "fattening",
            Self::Breeder => "breeder",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CuyStatus {
    #[default]
    Active,
    Sold,
    Dead,
    Culled,
}

impl CuyStatus {
    pub fn all() -> [CuyStatus; 4] {
        [Self::Active, Self::Sold, Self::Dead, Self::Culled]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Sold => "sold",
            Self::Dead => "dead",
            Self::Culled => "culled",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for CuyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    #[default]
    Born,
    Purchased,
}

/// A single animal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cuy {
    pub id: CuyId,
    /// Ear tag or painted code, unique across the farm
    pub code: String,
    pub sex: Sex,
    pub breed: String,
    pub birth_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    pub stage: Stage,
    pub status: CuyStatus,
    pub origin: Origin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cage_id: Option<CageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub litter_id: Option<LitterId>,
    /// Date of the last status change (sale, death, cull)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cuy {
    pub fn new(
        code: &str,
        sex: Sex,
        breed: impl Into<String>,
        birth_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Self, DomainError> {
        let code = normalize_code(code)?;
        let breed = breed.into().trim().to_string();
        validate_breed(&breed)?;
        validate_birth_date(birth_date, today)?;
        let now = Utc::now();

        Ok(Self {
            id: CuyId::generate(),
            code,
            sex,
            breed,
            birth_date,
            weight_kg: None,
            stage: Stage::default(),
            status: CuyStatus::Active,
            origin: Origin::default(),
            cage_id: None,
            litter_id: None,
            status_date: None,
            notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_weight(mut self, weight_kg: f64) -> Result<Self, DomainError> {
        validate_weight(weight_kg)?;
        self.weight_kg = Some(weight_kg);
        Ok(self)
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_cage(mut self, cage_id: CageId) -> Self {
        self.cage_id = Some(cage_id);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Age in whole days at `today`
    pub fn age_days(&self, today: NaiveDate) -> i64 {
        (today - self.birth_date).num_days()
    }

    /// Leave the herd; the animal stops occupying its cage
    pub fn set_status(&mut self, status: CuyStatus, date: NaiveDate) {
        self.status = status;
        self.status_date = if status.is_active() { None } else { Some(date) };
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl StorageEntity for Cuy {
    type Key = CuyId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}
