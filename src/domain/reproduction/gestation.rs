//! Gestation and weaning rules

use chrono::{Days, NaiveDate};
use serde::Deserialize;

use crate::domain::DomainError;

/// Reproductive parameters of the herd
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GestationPolicy {
    #[serde(default = "default_min_days")]
    pub gestation_min_days: u32,
    #[serde(default = "default_max_days")]
    pub gestation_max_days: u32,
    #[serde(default = "default_expected_days")]
    pub gestation_expected_days: u32,
    #[serde(default = "default_weaning_min_days")]
    pub weaning_min_days: u32,
    #[serde(default = "default_min_breeding_age_days")]
    pub min_breeding_age_days: u32,
}

fn default_min_days() -> u32 {
    59
}

fn default_max_days() -> u32 {
    72
}

fn default_expected_days() -> u32 {
    67
}

fn default_weaning_min_days() -> u32 {
    10
}

fn default_min_breeding_age_days() -> u32 {
    90
}

impl Default for GestationPolicy {
    fn default() -> Self {
        Self {
            gestation_min_days: default_min_days(),
            gestation_max_days: default_max_days(),
            gestation_expected_days: default_expected_days(),
            weaning_min_days: default_weaning_min_days(),
            min_breeding_age_days: default_min_breeding_age_days(),
        }
    }
}

impl GestationPolicy {
    /// Reject inconsistent settings at startup
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.gestation_min_days == 0 || self.gestation_min_days > self.gestation_max_days {
            return Err(DomainError::configuration(
                "gestation_min_days must be positive and not exceed gestation_max_days",
            ));
        }

        if !(self.gestation_min_days..=self.gestation_max_days)
            .contains(&self.gestation_expected_days)
        {
            return Err(DomainError::configuration(
                "gestation_expected_days must lie within the gestation window",
            ));
        }

        Ok(())
    }

    pub fn expected_birth_date(&self, mating_date: NaiveDate) -> NaiveDate {
        add_days(mating_date, self.gestation_expected_days)
    }

    /// Last day on which a birth is still considered on time
    pub fn latest_birth_date(&self, mating_date: NaiveDate) -> NaiveDate {
        add_days(mating_date, self.gestation_max_days)
    }

    /// Check that a birth date falls inside the gestation window
    pub fn validate_birth(
        &self,
        mating_date: NaiveDate,
        birth_date: NaiveDate,
    ) -> Result<u32, DomainError> {
        let days = (birth_date - mating_date).num_days();

        if days < self.gestation_min_days as i64 || days > self.gestation_max_days as i64 {
            return Err(DomainError::validation(format!(
                "Gestation of {} days is outside the allowed range of {}-{} days",
                days, self.gestation_min_days, self.gestation_max_days
            )));
        }

        Ok(days as u32)
    }

    pub fn validate_weaning(
        &self,
        birth_date: NaiveDate,
        weaning_date: NaiveDate,
    ) -> Result<(), DomainError> {
        let earliest = add_days(birth_date, self.weaning_min_days);

        if weaning_date < earliest {
            return Err(DomainError::validation(format!(
                "Weaning cannot happen before {} ({} days after birth)",
                earliest, self.weaning_min_days
            )));
        }

        Ok(())
    }
}

fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(days as u64))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_policy_is_valid() {
        let policy = GestationPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.gestation_min_days, 59);
        assert_eq!(policy.gestation_max_days, 72);
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        let policy = GestationPolicy {
            gestation_min_days: 80,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_expected_birth_date() {
        let policy = GestationPolicy::default();
        assert_eq!(policy.expected_birth_date(date(2024, 1, 1)), date(2024, 3, 8));
        assert_eq!(policy.latest_birth_date(date(2024, 1, 1)), date(2024, 3, 13));
    }

    #[test]
    fn test_gestation_window_bounds_are_inclusive() {
        let policy = GestationPolicy::default();
        let mating = date(2024, 1, 1);

        assert_eq!(policy.validate_birth(mating, date(2024, 2, 29)).unwrap(), 59);
        assert_eq!(policy.validate_birth(mating, date(2024, 3, 13)).unwrap(), 72);
        assert!(policy.validate_birth(mating, date(2024, 2, 28)).is_err());
        assert!(policy.validate_birth(mating, date(2024, 3, 14)).is_err());
    }

    #[test]
    fn test_weaning_minimum_age() {
        let policy = GestationPolicy::default();
        let birth = date(2024, 3, 1);

        assert!(policy.validate_weaning(birth, date(2024, 3, 11)).is_ok());
        assert!(policy.validate_weaning(birth, date(2024, 3, 10)).is_err());
    }
}
