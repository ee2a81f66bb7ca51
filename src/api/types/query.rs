//! Query-string parameters shared by list endpoints

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{DateRange, DomainError, Pagination};

/// `?limit=&offset=`
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

impl ListParams {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.limit, self.offset)
    }
}

/// `?from=YYYY-MM-DD&to=YYYY-MM-DD`
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RangeParams {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl RangeParams {
    pub fn range(&self) -> Result<DateRange, DomainError> {
        DateRange::new(self.from, self.to)
    }
}

/// Body returned by every delete endpoint
#[derive(Debug, Clone, Serialize)]
pub struct Deleted {
    pub deleted: bool,
    pub id: String,
}

impl Deleted {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            deleted: true,
            id: id.into(),
        }
    }
}

/// Parse an optional id filter, treating blank values as absent
pub fn parse_filter<T>(
    value: Option<&str>,
    parse: impl Fn(&str) -> Result<T, DomainError>,
) -> Result<Option<T>, DomainError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(parse)
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cuy::CuyId;

    #[test]
    fn test_range_params_validate_order() {
        let params = RangeParams {
            from: NaiveDate::from_ymd_opt(2024, 6, 1),
            to: NaiveDate::from_ymd_opt(2024, 5, 1),
        };
        assert!(params.range().is_err());
        assert_eq!(RangeParams::default().range().unwrap(), DateRange::unbounded());
    }

    #[test]
    fn test_parse_filter() {
        assert!(parse_filter(None, CuyId::parse).unwrap().is_none());
        assert!(parse_filter(Some("  "), CuyId::parse).unwrap().is_none());
        assert!(parse_filter(Some("nope"), CuyId::parse).is_err());

        let id = CuyId::generate();
        assert_eq!(parse_filter(Some(id.as_str()), CuyId::parse).unwrap(), Some(id));
    }

    #[test]
    fn test_deleted_body() {
        let json = serde_json::to_value(Deleted::new("abc")).unwrap();
        assert_eq!(json, serde_json::json!({"deleted": true, "id": "abc"}));
    }
}
