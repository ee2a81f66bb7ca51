use crate::domain::report::{Cell, ReportTable};
use crate::domain::DomainError;

/// Header row, data rows, then a blank line and `label,value` summary lines
pub fn render(table: &ReportTable) -> Result<Vec<u8>, DomainError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record(&table.headers).map_err(write_error)?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(Cell::display))
            .map_err(write_error)?;
    }

    let mut output = writer
        .into_inner()
        .map_err(|e| DomainError::internal(format!("Failed to flush CSV: {}", e)))?;

    if table.summary.is_empty() {
        return Ok(output);
    }

    output.push(b'\n');
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(output);

    for (label, value) in &table.summary {
        writer.write_record([label, value]).map_err(write_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| DomainError::internal(format!("Failed to flush CSV: {}", e)))
}

fn write_error(e: csv::Error) -> DomainError {
    DomainError::internal(format!("Failed to write CSV row: {}", e))
}
