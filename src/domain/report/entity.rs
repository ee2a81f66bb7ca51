//! Report metadata

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::id::entity_id;
use crate::domain::query::DateRange;
use crate::domain::storage::StorageEntity;

entity_id!(
    /// Identifier of a generated report
    ReportId,
    "report"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Inventory,
    Sales,
    Expenses,
    Health,
    Reproduction,
    Feed,
    Financial,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::Sales => "sales",
            Self::Expenses => "expenses",
            Self::Health => "health",
            Self::Reproduction => "reproduction",
            Self::Feed => "feed",
            Self::Financial => "financial",
        }
    }

    /// Human-readable title used in the rendered document
    pub fn title(&self) -> &'static str {
        match self {
            Self::Inventory => "Inventario de cuyes",
            Self::Sales => "Reporte de ventas",
            Self::Expenses => "Reporte de gastos",
            Self::Health => "Registros de salud",
            Self::Reproduction => "Reporte de reproduccion",
            Self::Feed => "Inventario de alimentos",
            Self::Financial => "Resumen financiero",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Pdf,
    Excel,
    Csv,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Excel => "excel",
            Self::Csv => "csv",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Excel => "xlsx",
            Self::Csv => "csv",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub kind: ReportKind,
    pub format: ReportFormat,
    pub title: String,
    /// Name offered to the client on download
    pub file_name: String,
    pub size_bytes: u64,
    pub row_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn new(kind: ReportKind, format: ReportFormat, range: DateRange) -> Self {
        let created_at = Utc::now();
        let file_name = format!(
            "{}-{}.{}",
            kind.as_str(),
            created_at.format("%Y%m%d-%H%M%S"),
            format.extension()
        );

        Self {
            id: ReportId::generate(),
            kind,
            format,
            title: kind.title().to_string(),
            file_name,
            size_bytes: 0,
            row_count: 0,
            from: range.from,
            to: range.to,
            created_at,
        }
    }

    /// Name of the file on disk inside the output directory
    pub fn stored_file_name(&self) -> String {
        format!("{}.{}", self.id, self.format.extension())
    }

    pub fn range(&self) -> DateRange {
        DateRange {
            from: self.from,
            to: self.to,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, retention_days: u32) -> bool {
        now - self.created_at > chrono::Duration::days(retention_days as i64)
    }
}

impl StorageEntity for Report {
    type Key = ReportId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let report = Report::new(ReportKind::Sales, ReportFormat::Excel, DateRange::unbounded());
        assert!(report.file_name.starts_with("sales-"));
        assert!(report.file_name.ends_with(".xlsx"));
        assert_eq!(report.stored_file_name(), format!("{}.xlsx", report.id));
        assert_eq!(report.title, "Reporte de ventas");
    }

    #[test]
    fn test_expiry() {
        let mut report = Report::new(ReportKind::Feed, ReportFormat::Csv, DateRange::unbounded());
        let now = Utc::now();
        assert!(!report.is_expired(now, 30));

        report.created_at = now - chrono::Duration::days(31);
        assert!(report.is_expired(now, 30));
    }
}
