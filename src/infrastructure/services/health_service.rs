//! Health records: vaccinations, treatments, illnesses and follow-ups

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use super::{today, CuyService};
use crate::domain::cuy::CuyId;
use crate::domain::health::{HealthKind, HealthQuery, HealthRecord, HealthRecordId};
use crate::domain::{DomainError, Page, Pagination};
use crate::infrastructure::storage::Stores;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateHealthRecordRequest {
    pub cuy_id: String,
    pub kind: HealthKind,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub description: String,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub treatment: Option<String>,
    #[serde(default)]
    pub medication: Option<String>,
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub veterinarian: Option<String>,
    #[serde(default)]
    pub follow_up_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateHealthRecordRequest {
    #[serde(default)]
    pub kind: Option<HealthKind>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub treatment: Option<String>,
    #[serde(default)]
    pub medication: Option<String>,
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub veterinarian: Option<String>,
    #[serde(default)]
    pub follow_up_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct HealthService {
    stores: Stores,
    cuyes: Arc<CuyService>,
}

impl HealthService {
    pub fn new(stores: Stores, cuyes: Arc<CuyService>) -> Self {
        Self { stores, cuyes }
    }

    pub async fn create(
        &self,
        request: CreateHealthRecordRequest,
    ) -> Result<HealthRecord, DomainError> {
        let cuy_id = CuyId::parse(&request.cuy_id)?;
        let cuy = self.cuyes.get_referenced(&cuy_id).await?;
        let date = request.date.unwrap_or_else(today);

        if date > today() {
            return Err(DomainError::validation(format!(
                "Record date {} is in the future",
                date
            )));
        }

        let mut record = HealthRecord::new(cuy.id, request.kind, date, request.description)?;
        record.diagnosis = request.diagnosis;
        record.treatment = request.treatment;
        record.medication = request.medication;
        record.veterinarian = request.veterinarian;
        record.set_cost(request.cost)?;
        record.set_follow_up(request.follow_up_date)?;

        info!(
            id = %record.id,
            cuy = %cuy.code,
            kind = %record.kind.as_str(),
            "Creating health record"
        );
        self.stores.health_records.create(record).await
    }

    pub async fn get(&self, id: &str) -> Result<HealthRecord, DomainError> {
        let record_id = HealthRecordId::parse(id)?;
        self.stores
            .health_records
            .get(&record_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Health record '{}' not found", id)))
    }

    /// Matching records, newest first
    pub async fn list(
        &self,
        query: &HealthQuery,
        pagination: Pagination,
    ) -> Result<Page<HealthRecord>, DomainError> {
        let mut records: Vec<HealthRecord> = self
            .stores
            .health_records
            .list()
            .await?
            .into_iter()
            .filter(|r| query.matches(r))
            .collect();

        records.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(Page::from_sorted(records, pagination))
    }

    /// History of one animal; unknown animals are not found
    pub async fn history(
        &self,
        cuy_id: &str,
        pagination: Pagination,
    ) -> Result<Page<HealthRecord>, DomainError> {
        let cuy = self.cuyes.get(cuy_id).await?;
        self.list(&HealthQuery::for_cuy(cuy.id), pagination).await
    }

    pub async fn update(
        &self,
        id: &str,
        request: UpdateHealthRecordRequest,
    ) -> Result<HealthRecord, DomainError> {
        let mut record = self.get(id).await?;

        if let Some(kind) = request.kind {
            record.kind = kind;
        }

        if let Some(date) = request.date {
            if date > today() {
                return Err(DomainError::validation(format!(
                    "Record date {} is in the future",
                    date
                )));
            }
            record.date = date;
        }

        if let Some(description) = request.description {
            let description = description.trim().to_string();
            if description.is_empty() {
                return Err(DomainError::validation("Description cannot be empty"));
            }
            record.description = description;
        }

        if request.diagnosis.is_some() {
            record.diagnosis = request.diagnosis;
        }
        if request.treatment.is_some() {
            record.treatment = request.treatment;
        }
        if request.medication.is_some() {
            record.medication = request.medication;
        }
        if request.veterinarian.is_some() {
            record.veterinarian = request.veterinarian;
        }
        if request.cost.is_some() {
            record.set_cost(request.cost)?;
        }

        // re-check the stored follow-up against a changed record date too
        let follow_up = request.follow_up_date.or(record.follow_up_date);
        record.set_follow_up(follow_up)?;

        record.touch();
        info!(id = %record.id, "Updating health record");
        self.stores.health_records.update(record).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), DomainError> {
        let record = self.get(id).await?;
        info!(id = %record.id, "Deleting health record");
        self.stores.health_records.delete(&record.id).await?;
        Ok(())
    }

    pub async fn resolve(
        &self,
        id: &str,
        date: Option<NaiveDate>,
    ) -> Result<HealthRecord, DomainError> {
        let mut record = self.get(id).await?;
        let date = date.unwrap_or_else(today);

        if date < record.date {
            return Err(DomainError::validation(format!(
                "Resolution date {} is before the record date {}",
                date, record.date
            )));
        }

        record.resolve(date)?;
        info!(id = %record.id, "Health record resolved");
        self.stores.health_records.update(record).await
    }

    /// Open records whose follow-up falls on or before `today + days`, soonest first
    pub async fn pending_follow_ups(&self, days: u32) -> Result<Vec<HealthRecord>, DomainError> {
        let limit = today()
            .checked_add_days(Days::new(days as u64))
            .unwrap_or(NaiveDate::MAX);

        let mut records: Vec<HealthRecord> = self
            .stores
            .health_records
            .list()
            .await?
            .into_iter()
            .filter(|r| r.is_open() && r.follow_up_date.is_some_and(|d| d <= limit))
            .collect();

        records.sort_by_key(|r| r.follow_up_date);
        Ok(records)
    }
}
