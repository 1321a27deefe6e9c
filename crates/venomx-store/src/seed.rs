//! Reference data document loaded into an empty database.

use serde::{Deserialize, Serialize};
use venomx_core::{AntivenomRecord, FacilityRecord, SpeciesRecord};

/// One stock batch as written in the seed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedStock {
    pub facility_id: i64,
    pub antivenom_id: i64,
    pub quantity: i64,
    #[serde(default)]
    pub expiration_date: Option<String>,
    #[serde(default)]
    pub batch_no: Option<String>,
}

/// An antivenom → species efficacy pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedTarget {
    pub antivenom_id: i64,
    pub snake_id: i64,
}

/// The full seed document, usually read from `SEED_DATA_PATH`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub snakes: Vec<SpeciesRecord>,
    #[serde(default)]
    pub facilities: Vec<FacilityRecord>,
    #[serde(default)]
    pub antivenoms: Vec<AntivenomRecord>,
    #[serde(default)]
    pub stock: Vec<SeedStock>,
    #[serde(default)]
    pub targets: Vec<SeedTarget>,
}
