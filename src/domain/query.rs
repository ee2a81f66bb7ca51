//! Shared list/query helpers

use chrono::NaiveDate;
use serde::Serialize;

use super::DomainError;

/// Pagination parameters for list operations
#[derive(Debug, Clone, Copy, Default)]
pub struct Pagination {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Pagination {
    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Self {
        Self { limit, offset }
    }
}

/// A page of results plus the size of the whole filtered set
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> Page<T> {
    /// Apply offset/limit to an already filtered and sorted set
    pub fn from_sorted(items: Vec<T>, pagination: Pagination) -> Self {
        let total = items.len();
        let offset = pagination.offset.unwrap_or(0);
        let mut items: Vec<T> = items.into_iter().skip(offset).collect();

        if let Some(limit) = pagination.limit {
            items.truncate(limit);
        }

        Self { items, total }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

/// Inclusive calendar date range, either end optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, DomainError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(DomainError::validation(format!(
                    "Date range start {} is after its end {}",
                    from, to
                )));
            }
        }

        Ok(Self { from, to })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_page_applies_offset_and_limit() {
        let page = Page::from_sorted((1..=10).collect(), Pagination::new(Some(3), Some(2)));
        assert_eq!(page.items, vec![3, 4, 5]);
        assert_eq!(page.total, 10);
    }

    #[test]
    fn test_page_offset_past_end_is_empty() {
        let page = Page::from_sorted(vec![1, 2], Pagination::new(None, Some(5)));
        assert!(page.items.is_empty());
        assert_eq!(page.total, 2);
    }

    #[test]
    fn test_date_range_rejects_inverted_bounds() {
        assert!(DateRange::new(Some(date(2024, 5, 2)), Some(date(2024, 5, 1))).is_err());
    }

    #[test]
    fn test_date_range_contains_is_inclusive() {
        let range = DateRange::new(Some(date(2024, 5, 1)), Some(date(2024, 5, 31))).unwrap();
        assert!(range.contains(date(2024, 5, 1)));
        assert!(range.contains(date(2024, 5, 31)));
        assert!(!range.contains(date(2024, 6, 1)));
        assert!(DateRange::unbounded().contains(date(1999, 1, 1)));
    }
}
