//! Reference data records owned by the persistence layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geo::{format_duration, Coordinate};

/// Danger levels that make a species medically significant.
const MEDICALLY_SIGNIFICANT: &[&str] = &["extremely venomous", "highly venomous"];

/// A snake species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesRecord {
    pub snake_id: i64,
    pub scientific_name: String,
    #[serde(default)]
    pub common_name: Option<String>,
    #[serde(default)]
    pub fang_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub danger_level: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl SpeciesRecord {
    /// True for "Extremely Venomous" and "Highly Venomous" species.
    pub fn is_medically_significant(&self) -> bool {
        self.danger_level.as_deref().is_some_and(|level| {
            MEDICALLY_SIGNIFICANT.contains(&level.trim().to_ascii_lowercase().as_str())
        })
    }
}

/// A healthcare facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub facility_id: i64,
    pub facility_name: String,
    pub facility_type: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub city_municipality: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub facility_email: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
}

impl FacilityRecord {
    /// The facility location, if both components are present and valid.
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::new(self.latitude?, self.longitude?).ok()
    }
}

/// Antivenom product family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AntivenomType {
    Polyvalent,
    Monovalent,
}

impl AntivenomType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AntivenomType::Polyvalent => "polyvalent",
            AntivenomType::Monovalent => "monovalent",
        }
    }
}

impl fmt::Display for AntivenomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AntivenomType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "polyvalent" => Ok(AntivenomType::Polyvalent),
            "monovalent" => Ok(AntivenomType::Monovalent),
            _ => Err(ValidationError::InvalidAntivenomType(s.to_string())),
        }
    }
}

/// An antivenom product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntivenomRecord {
    pub antivenom_id: i64,
    pub product_name: String,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub antivenom_type: Option<AntivenomType>,
}

/// One facility holding available stock of one antivenom.
///
/// Batches of the same product at the same facility are already merged:
/// `quantity` is their sum and `expiration_date` the earliest date.
#[derive(Debug, Clone, PartialEq)]
pub struct StockMatch {
    pub facility: FacilityRecord,
    pub antivenom: AntivenomRecord,
    pub quantity: i64,
    pub expiration_date: Option<String>,
    /// Scientific names of the species this antivenom targets.
    pub target_species: Vec<String>,
}

/// Road route details from a routing collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub road_distance_km: f64,
    pub travel_time_minutes: f64,
    pub formatted_duration: String,
    /// True when derived from straight-line distance instead of a router.
    #[serde(default)]
    pub estimated: bool,
}

impl RouteSummary {
    /// Builds a summary from raw router output (metres, seconds).
    pub fn from_meters_seconds(distance_m: f64, duration_s: f64) -> Self {
        Self {
            road_distance_km: round_to(distance_m / 1000.0, 2),
            travel_time_minutes: round_to(duration_s / 60.0, 1),
            formatted_duration: format_duration(duration_s),
            estimated: false,
        }
    }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn species(danger: Option<&str>) -> SpeciesRecord {
        SpeciesRecord {
            snake_id: 1,
            scientific_name: "Naja philippinensis".into(),
            common_name: Some("Philippine Cobra".into()),
            fang_type: Some("Front-fanged".into()),
            description: None,
            danger_level: danger.map(String::from),
            image_url: None,
        }
    }

    #[test]
    fn test_medically_significant() {
        assert!(species(Some("Extremely Venomous")).is_medically_significant());
        assert!(species(Some("highly venomous ")).is_medically_significant());
        assert!(!species(Some("Mildly Venomous")).is_medically_significant());
        assert!(!species(None).is_medically_significant());
    }

    #[test]
    fn test_antivenom_type_parse() {
        assert_eq!("Polyvalent".parse::<AntivenomType>(), Ok(AntivenomType::Polyvalent));
        assert_eq!(" monovalent".parse::<AntivenomType>(), Ok(AntivenomType::Monovalent));
        assert!("bivalent".parse::<AntivenomType>().is_err());
    }

    #[test]
    fn test_route_summary_rounding() {
        let route = RouteSummary::from_meters_seconds(3456.0, 725.0);
        assert_eq!(route.road_distance_km, 3.46);
        assert_eq!(route.travel_time_minutes, 12.1);
        assert_eq!(route.formatted_duration, "12m 5s");
        assert!(!route.estimated);
    }

    #[test]
    fn test_facility_coordinate_requires_both_parts() {
        let mut facility = FacilityRecord {
            facility_id: 1,
            facility_name: "PGH".into(),
            facility_type: "Hospital".into(),
            region: None,
            province: None,
            city_municipality: None,
            address: None,
            latitude: Some(14.5782),
            longitude: None,
            contact_number: None,
            facility_email: None,
            is_verified: true,
        };
        assert!(facility.coordinate().is_none());
        facility.longitude = Some(120.9847);
        assert!(facility.coordinate().is_some());
    }
}
