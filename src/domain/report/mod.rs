//! Report domain: exported documents and their content

mod entity;
mod table;

pub use entity::{Report, ReportFormat, ReportId, ReportKind};
pub use table::{Cell, ReportTable};
