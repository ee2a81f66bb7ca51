//! Pregnancy (preñez) entity

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::gestation::GestationPolicy;
use super::litter::LitterId;
use crate::domain::cuy::CuyId;
use crate::domain::id::entity_id;
use crate::domain::storage::StorageEntity;
use crate::domain::DomainError;

entity_id!(
    /// Identifier of a pregnancy record
    PregnancyId,
    "pregnancy"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PregnancyStatus {
    #[default]
    Active,
    Delivered,
    Failed,
}

impl PregnancyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PregnancyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pregnancy {
    pub id: PregnancyId,
    pub female_id: CuyId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub male_id: Option<CuyId>,
    pub mating_date: NaiveDate,
    pub expected_birth_date: NaiveDate,
    pub status: PregnancyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub litter_id: Option<LitterId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pregnancy {
    pub fn new(
        female_id: CuyId,
        male_id: Option<CuyId>,
        mating_date: NaiveDate,
        policy: &GestationPolicy,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: PregnancyId::generate(),
            female_id,
            male_id,
            mating_date,
            expected_birth_date: policy.expected_birth_date(mating_date),
            status: PregnancyStatus::Active,
            litter_id: None,
            failure_reason: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PregnancyStatus::Active
    }

    pub fn ensure_active(&self) -> Result<(), DomainError> {
        if !self.is_active() {
            return Err(DomainError::validation(format!(
                "Pregnancy '{}' is already {}",
                self.id, self.status
            )));
        }

        Ok(())
    }

    /// Days left until the expected birth; negative once past due
    pub fn days_until_birth(&self, today: NaiveDate) -> i64 {
        (self.expected_birth_date - today).num_days()
    }

    pub fn is_overdue(&self, today: NaiveDate, policy: &GestationPolicy) -> bool {
        self.is_active() && today > policy.latest_birth_date(self.mating_date)
    }

    pub fn reschedule(&mut self, mating_date: NaiveDate, policy: &GestationPolicy) {
        self.mating_date = mating_date;
        self.expected_birth_date = policy.expected_birth_date(mating_date);
        self.touch();
    }

    pub fn mark_delivered(&mut self, litter_id: LitterId) {
        self.status = PregnancyStatus::Delivered;
        self.litter_id = Some(litter_id);
        self.touch();
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.status = PregnancyStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl StorageEntity for Pregnancy {
    type Key = PregnancyId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pregnancy() -> Pregnancy {
        Pregnancy::new(CuyId::generate(), None, date(2024, 1, 1), &GestationPolicy::default())
    }

    #[test]
    fn test_new_pregnancy_computes_expected_date() {
        let p = pregnancy();
        assert_eq!(p.expected_birth_date, date(2024, 3, 8));
        assert!(p.is_active());
    }

    #[test]
    fn test_days_until_birth() {
        let p = pregnancy();
        assert_eq!(p.days_until_birth(date(2024, 3, 1)), 7);
        assert_eq!(p.days_until_birth(date(2024, 3, 10)), -2);
    }

    #[test]
    fn test_overdue_after_max_gestation() {
        let policy = GestationPolicy::default();
        let p = pregnancy();

        assert!(!p.is_overdue(date(2024, 3, 13), &policy));
        assert!(p.is_overdue(date(2024, 3, 14), &policy));
    }

    #[test]
    fn test_failed_pregnancy_is_not_active() {
        let mut p = pregnancy();
        p.mark_failed("Aborto");

        assert_eq!(p.status, PregnancyStatus::Failed);
        assert_eq!(p.failure_reason.as_deref(), Some("Aborto"));
        assert!(p.ensure_active().is_err());
        assert!(!p.is_overdue(date(2025, 1, 1), &GestationPolicy::default()));
    }

    #[test]
    fn test_reschedule_moves_expected_date() {
        let mut p = pregnancy();
        p.reschedule(date(2024, 1, 11), &GestationPolicy::default());
        assert_eq!(p.expected_birth_date, date(2024, 3, 18));
    }
}
