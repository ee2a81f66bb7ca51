//! Filters for listing cuyes

use super::entity::{Cuy, CuyStatus, Sex, Stage};
use crate::domain::housing::CageId;
use crate::domain::reproduction::LitterId;

#[derive(Debug, Clone, Default)]
pub struct CuyQuery {
    pub status: Option<CuyStatus>,
    pub sex: Option<Sex>,
    pub stage: Option<Stage>,
    pub cage_id: Option<CageId>,
    pub litter_id: Option<LitterId>,
    /// Case-insensitive exact breed match
    pub breed: Option<String>,
}

impl CuyQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: CuyStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_cage(mut self, cage_id: CageId) -> Self {
        self.cage_id = Some(cage_id);
        self
    }

    pub fn matches(&self, cuy: &Cuy) -> bool {
        if self.status.is_some_and(|s| s != cuy.status) {
            return false;
        }

        if self.sex.is_some_and(|s| s != cuy.sex) {
            return false;
        }

        if self.stage.is_some_and(|s| s != cuy.stage) {
            return false;
        }

        if let Some(ref cage_id) = self.cage_id {
            if cuy.cage_id.as_ref() != Some(cage_id) {
                return false;
            }
        }

        if let Some(ref litter_id) = self.litter_id {
            if cuy.litter_id.as_ref() != Some(litter_id) {
                return false;
            }
        }

        if let Some(ref breed) = self.breed {
            if !cuy.breed.eq_ignore_ascii_case(breed.trim()) {
                return false;
            }
        }

        true
    }
}
