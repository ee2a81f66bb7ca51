//! Report file rendering

mod csv_writer;
mod pdf;
mod xlsx;

use crate::domain::report::{ReportFormat, ReportTable};
use crate::domain::DomainError;

/// Render a table in the requested format
pub fn render(table: &ReportTable, format: ReportFormat) -> Result<Vec<u8>, DomainError> {
    match format {
        ReportFormat::Csv => csv_writer::render(table),
        ReportFormat::Excel => xlsx::render(table),
        ReportFormat::Pdf => Ok(pdf::render(table)),
    }
}
