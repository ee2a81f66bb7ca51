//! Litter (camada) entity

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::pregnancy::PregnancyId;
use crate::domain::cuy::CuyId;
use crate::domain::housing::CageId;
use crate::domain::id::entity_id;
use crate::domain::storage::StorageEntity;
use crate::domain::DomainError;

entity_id!(
    /// Identifier of a litter
    LitterId,
    "litter"
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Litter {
    pub id: LitterId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pregnancy_id: Option<PregnancyId>,
    pub mother_id: CuyId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub father_id: Option<CuyId>,
    pub birth_date: NaiveDate,
    pub born_alive: u32,
    pub born_dead: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weaned_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weaning_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cage_id: Option<CageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Litter {
    pub fn new(
        mother_id: CuyId,
        birth_date: NaiveDate,
        born_alive: u32,
        born_dead: u32,
        today: NaiveDate,
    ) -> Result<Self, DomainError> {
        validate_counts(born_alive, born_dead)?;

        if birth_date > today {
            return Err(DomainError::validation(format!(
                "Birth date {} is in the future",
                birth_date
            )));
        }

        let now = Utc::now();

        Ok(Self {
            id: LitterId::generate(),
            pregnancy_id: None,
            mother_id,
            father_id: None,
            birth_date,
            born_alive,
            born_dead,
            weaned_count: None,
            weaning_date: None,
            cage_id: None,
            notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Counts are validated to fit in a `u32` together
    pub fn total_born(&self) -> u32 {
        self.born_alive.saturating_add(self.born_dead)
    }

    pub fn set_counts(&mut self, born_alive: u32, born_dead: u32) -> Result<(), DomainError> {
        validate_counts(born_alive, born_dead)?;

        if let Some(weaned) = self.weaned_count {
            if weaned > born_alive {
                return Err(DomainError::validation(format!(
                    "Born alive ({}) cannot be less than the {} already weaned",
                    born_alive, weaned
                )));
            }
        }

        self.born_alive = born_alive;
        self.born_dead = born_dead;
        self.touch();
        Ok(())
    }

    pub fn wean(&mut self, weaning_date: NaiveDate, weaned_count: u32) -> Result<(), DomainError> {
        if weaned_count > self.born_alive {
            return Err(DomainError::validation(format!(
                "Cannot wean {} pups from a litter of {} born alive",
                weaned_count, self.born_alive
            )));
        }

        self.weaning_date = Some(weaning_date);
        self.weaned_count = Some(weaned_count);
        self.touch();
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn validate_counts(born_alive: u32, born_dead: u32) -> Result<(), DomainError> {
    let total = born_alive
        .checked_add(born_dead)
        .ok_or_else(|| DomainError::validation("Litter size is out of range"))?;

    if total == 0 {
        return Err(DomainError::validation(
            "A litter needs at least one pup born alive or dead",
        ));
    }

    Ok(())
}

impl StorageEntity for Litter {
    type Key = LitterId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

/// Aggregate litter figures
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LitterStatistics {
    pub litters: usize,
    pub born_alive: u64,
    pub born_dead: u64,
    pub average_litter_size: f64,
    pub mortality_ratio: f64,
}

impl LitterStatistics {
    pub fn from_litters<'a>(litters: impl IntoIterator<Item = &'a Litter>) -> Self {
        let mut stats = Self::default();

        for litter in litters {
            stats.litters += 1;
            stats.born_alive += u64::from(litter.born_alive);
            stats.born_dead += u64::from(litter.born_dead);
        }

        let total = stats.born_alive + stats.born_dead;

        if stats.litters > 0 {
            stats.average_litter_size = total as f64 / stats.litters as f64;
        }

        if total > 0 {
            stats.mortality_ratio = stats.born_dead as f64 / total as f64;
        }

        stats
    }
}
