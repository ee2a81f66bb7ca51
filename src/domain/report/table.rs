//! Format-independent tabular report content

use serde::Serialize;

/// A single cell; numbers stay numeric so spreadsheets can sum them
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn optional(value: Option<impl Into<String>>) -> Self {
        value.map(|v| Self::Text(v.into())).unwrap_or(Self::Empty)
    }

    pub fn display(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Empty => String::new(),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

impl From<rust_decimal::Decimal> for Cell {
    fn from(value: rust_decimal::Decimal) -> Self {
        use rust_decimal::prelude::ToPrimitive;
        value.to_f64().map(Self::Number).unwrap_or(Self::Empty)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{:.2}", n)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Label/value lines printed after the table
    pub summary: Vec<(String, String)>,
}

impl ReportTable {
    pub fn new(title: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            summary: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn push_summary(&mut self, label: impl Into<String>, value: impl ToString) {
        self.summary.push((label.into(), value.to_string()));
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::from(3u32).display(), "3");
        assert_eq!(Cell::from(2.5).display(), "2.50");
        assert_eq!(Cell::from(Decimal::new(1999, 2)).display(), "19.99");
        assert_eq!(Cell::optional(None::<String>).display(), "");
    }

    #[test]
    fn test_table_building() {
        let mut table = ReportTable::new("Test", &["Codigo", "Peso"]);
        table.push_row(vec!["CU-01".into(), 1.2.into()]);
        table.push_summary("Total", 1);

        assert_eq!(table.column_count(), 2);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.summary[0], ("Total".to_string(), "1".to_string()));
    }
}
