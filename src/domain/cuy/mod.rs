//! Cuy domain: the individual animals of the herd

mod entity;
mod query;
mod validation;

pub use entity::{Cuy, CuyId, CuyStatus, Origin, Sex, Stage};
pub use query::CuyQuery;
pub use validation::{normalize_code, validate_weight, MAX_WEIGHT_KG};
