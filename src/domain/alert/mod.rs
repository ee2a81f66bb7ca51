//! Alert domain: rule-produced warnings about the farm's state

mod entity;
mod rule;

pub use entity::{
    dedup_key, Alert, AlertId, AlertKind, AlertQuery, AlertReference, AlertSeverity, AlertStatus,
};
pub use rule::{AlertRule, RuleOutcome};
