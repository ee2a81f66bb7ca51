//! Alert entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::id::entity_id;
use crate::domain::storage::StorageEntity;
use crate::domain::DomainError;

entity_id!(
    /// Identifier of an alert
    AlertId,
    "alert"
);

/// What condition raised the alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    BirthImminent,
    BirthOverdue,
    HealthFollowUp,
    CageFull,
    CageNearCapacity,
    LowFeedStock,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BirthImminent => "birth_imminent",
            Self::BirthOverdue => "birth_overdue",
            Self::HealthFollowUp => "health_follow_up",
            Self::CageFull => "cage_full",
            Self::CageNearCapacity => "cage_near_capacity",
            Self::LowFeedStock => "low_feed_stock",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    #[default]
    Active,
    Read,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Read => "read",
            Self::Resolved => "resolved",
        }
    }
}

/// The record an alert is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertReference {
    /// Entity type, e.g. `pregnancy`, `cage`
    pub entity: String,
    pub id: String,
}

impl AlertReference {
    pub fn new(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<AlertReference>,
    /// `kind:entity-id`; at most one unresolved alert per key
    pub dedup_key: String,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn new(
        kind: AlertKind,
        severity: AlertSeverity,
        title: impl Into<String>,
        message: impl Into<String>,
        reference: AlertReference,
    ) -> Self {
        let dedup_key = dedup_key(kind, &reference.id);

        Self {
            id: AlertId::generate(),
            kind,
            severity,
            title: title.into(),
            message: message.into(),
            reference: Some(reference),
            dedup_key,
            status: AlertStatus::Active,
            created_at: Utc::now(),
            read_at: None,
            resolved_at: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status == AlertStatus::Resolved
    }

    pub fn mark_read(&mut self) -> Result<(), DomainError> {
        match self.status {
            AlertStatus::Active => {
                self.status = AlertStatus::Read;
                self.read_at = Some(Utc::now());
                Ok(())
            }
            AlertStatus::Read => Ok(()),
            AlertStatus::Resolved => Err(DomainError::validation(format!(
                "Alert '{}' is already resolved",
                self.id
            ))),
        }
    }

    pub fn resolve(&mut self) {
        if !self.is_resolved() {
            self.status = AlertStatus::Resolved;
            self.resolved_at = Some(Utc::now());
        }
    }
}

pub fn dedup_key(kind: AlertKind, entity_id: &str) -> String {
    format!("{}:{}", kind.as_str(), entity_id)
}

impl StorageEntity for Alert {
    type Key = AlertId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlertQuery {
    pub status: Option<AlertStatus>,
    pub kind: Option<AlertKind>,
    pub severity: Option<AlertSeverity>,
}

impl AlertQuery {
    pub fn matches(&self, alert: &Alert) -> bool {
        self.status.is_none_or(|s| s == alert.status)
            && self.kind.is_none_or(|k| k == alert.kind)
            && self.severity.is_none_or(|s| s == alert.severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert() -> Alert {
        Alert::new(
            AlertKind::CageFull,
            AlertSeverity::Critical,
            "Jaula llena",
            "J-01 holds 10 of 10",
            AlertReference::new("cage", "abc"),
        )
    }

    #[test]
    fn test_dedup_key() {
        assert_eq!(alert().dedup_key, "cage_full:abc");
    }

    #[test]
    fn test_read_then_resolve() {
        let mut a = alert();
        a.mark_read().unwrap();
        assert_eq!(a.status, AlertStatus::Read);
        assert!(a.read_at.is_some());

        a.resolve();
        assert!(a.is_resolved());
        assert!(a.mark_read().is_err());
    }

    #[test]
    fn test_mark_read_is_idempotent() {
        let mut a = alert();
        a.mark_read().unwrap();
        let first = a.read_at;
        a.mark_read().unwrap();
        assert_eq!(a.read_at, first);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(AlertSeverity::Critical > AlertSeverity::Warning);
        assert!(AlertSeverity::Warning > AlertSeverity::Info);
    }

    #[test]
    fn test_query() {
        let a = alert();
        let query = AlertQuery {
            kind: Some(AlertKind::CageFull),
            status: Some(AlertStatus::Active),
            ..Default::default()
        };
        assert!(query.matches(&a));

        let query = AlertQuery {
            severity: Some(AlertSeverity::Info),
            ..Default::default()
        };
        assert!(!query.matches(&a));
    }
}
