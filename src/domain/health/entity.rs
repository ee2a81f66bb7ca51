//! Health record entity

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::cuy::CuyId;
use crate::domain::id::entity_id;
use crate::domain::query::DateRange;
use crate::domain::storage::StorageEntity;
use crate::domain::DomainError;

entity_id!(
    /// Identifier of a health record
    HealthRecordId,
    "health record"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthKind {
    Vaccination,
    Deworming,
    Treatment,
    Checkup,
    Illness,
}

impl HealthKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vaccination => "vaccination",
            Self::Deworming => "deworming",
            Self::Treatment => "treatment",
            Self::Checkup => "checkup",
            Self::Illness => "illness",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    #[default]
    Open,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRecord {
    pub id: HealthRecordId,
    pub cuy_id: CuyId,
    pub kind: HealthKind,
    pub date: NaiveDate,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub veterinarian: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_date: Option<NaiveDate>,
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HealthRecord {
    pub fn new(
        cuy_id: CuyId,
        kind: HealthKind,
        date: NaiveDate,
        description: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let description = description.into().trim().to_string();

        if description.is_empty() {
            return Err(DomainError::validation("Description cannot be empty"));
        }

        let now = Utc::now();

        Ok(Self {
            id: HealthRecordId::generate(),
            cuy_id,
            kind,
            date,
            description,
            diagnosis: None,
            treatment: None,
            medication: None,
            cost: None,
            veterinarian: None,
            follow_up_date: None,
            status: HealthStatus::Open,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn set_follow_up(&mut self, follow_up: Option<NaiveDate>) -> Result<(), DomainError> {
        if let Some(follow_up) = follow_up {
            if follow_up < self.date {
                return Err(DomainError::validation(format!(
                    "Follow-up date {} is before the record date {}",
                    follow_up, self.date
                )));
            }
        }

        self.follow_up_date = follow_up;
        Ok(())
    }

    pub fn set_cost(&mut self, cost: Option<Decimal>) -> Result<(), DomainError> {
        if cost.is_some_and(|c| c.is_sign_negative()) {
            return Err(DomainError::validation("Cost cannot be negative"));
        }

        self.cost = cost;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.status == HealthStatus::Open
    }

    pub fn resolve(&mut self, date: NaiveDate) -> Result<(), DomainError> {
        if !self.is_open() {
            return Err(DomainError::validation(format!(
                "Health record '{}' is already resolved",
                self.id
            )));
        }

        self.status = HealthStatus::Resolved;
        self.resolved_at = Some(date);
        self.touch();
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl StorageEntity for HealthRecord {
    type Key = HealthRecordId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

#[derive(Debug, Clone, Default)]
pub struct HealthQuery {
    pub cuy_id: Option<CuyId>,
    pub kind: Option<HealthKind>,
    pub status: Option<HealthStatus>,
    pub range: DateRange,
}

impl HealthQuery {
    pub fn for_cuy(cuy_id: CuyId) -> Self {
        Self {
            cuy_id: Some(cuy_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, record: &HealthRecord) -> bool {
        self.cuy_id.as_ref().is_none_or(|id| *id == record.cuy_id)
            && self.kind.is_none_or(|k| k == record.kind)
            && self.status.is_none_or(|s| s == record.status)
            && self.range.contains(record.date)
    }
}
