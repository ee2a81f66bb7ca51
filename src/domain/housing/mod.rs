//! Housing domain: sheds and the cages they contain

mod entity;
mod validation;

pub use entity::{Cage, CageId, CageKind, CageOccupancy, Shed, ShedId};
pub use validation::{validate_cage_code, validate_capacity, validate_shed_name};
