//! Health domain: vaccinations, treatments and illnesses per animal

mod entity;

pub use entity::{HealthKind, HealthQuery, HealthRecord, HealthRecordId, HealthStatus};
