//! Reproduction domain: pregnancies (preñez) and litters (camadas)

mod gestation;
mod litter;
mod pregnancy;

pub use gestation::GestationPolicy;
pub use litter::{Litter, LitterId, LitterStatistics};
pub use pregnancy::{Pregnancy, PregnancyId, PregnancyStatus};
