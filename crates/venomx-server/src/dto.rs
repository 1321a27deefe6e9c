//! HTTP request and response bodies.

use serde::{Deserialize, Serialize};
use venomx_core::{
    FacilityGroup, FacilityRecord, RankedFacility, RouteSummary, SpeciesRecord, StockedAntivenom,
};
use venomx_vision::{BoundingBox, ModelInfo, OrientedBox, Prediction};

// === Snake identification ===

#[derive(Debug, Clone, Serialize)]
pub struct OrientedBoxBody {
    pub cx: f32,
    pub cy: f32,
    pub width: f32,
    pub height: f32,
    /// Rotation in degrees.
    pub angle: f32,
    pub polygon: [[f32; 2]; 4],
}

impl From<OrientedBox> for OrientedBoxBody {
    fn from(obb: OrientedBox) -> Self {
        Self {
            cx: obb.cx,
            cy: obb.cy,
            width: obb.width,
            height: obb.height,
            angle: obb.angle.to_degrees(),
            polygon: obb.corners(),
        }
    }
}

/// A top-k candidate, with database details when the label is a known species.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionBody {
    pub label: String,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl PredictionBody {
    pub fn new(prediction: Prediction, species: Option<&SpeciesRecord>) -> Self {
        Self {
            label: prediction.label,
            confidence: prediction.confidence,
            scientific_name: species.map(|s| s.scientific_name.clone()),
            image_url: species.and_then(|s| s.image_url.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SnakeIdResponse {
    pub success: bool,
    pub message: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snake_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oriented_box: Option<OrientedBoxBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub danger_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fang_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub predictions: Vec<PredictionBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    pub processing_time_seconds: f64,
}

impl SnakeIdResponse {
    pub fn empty(request_id: String) -> Self {
        Self {
            success: false,
            message: String::new(),
            request_id,
            snake_id: None,
            species: None,
            scientific_name: None,
            confidence: None,
            detection_confidence: None,
            bounding_box: None,
            oriented_box: None,
            danger_level: None,
            fang_type: None,
            description: None,
            image_url: None,
            predictions: Vec::new(),
            recommendation: None,
            processing_time_seconds: 0.0,
        }
    }
}

// === Antivenom finder ===

fn default_finder_distance() -> f64 {
    100.0
}

fn default_facilities_distance() -> f64 {
    200.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinderRequest {
    pub snake_scientific_name: Option<String>,
    pub snake_common_name: Option<String>,
    pub snake_id: Option<i64>,
    pub antivenom_type: Option<String>,
    pub user_latitude: f64,
    pub user_longitude: f64,
    #[serde(default = "default_finder_distance")]
    pub max_distance_km: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacilitiesRequest {
    pub antivenom_name: Option<String>,
    pub snake_id: Option<i64>,
    pub user_latitude: f64,
    pub user_longitude: f64,
    #[serde(default = "default_facilities_distance")]
    pub max_distance_km: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snake_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub antivenom_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub antivenom_name: Option<String>,
    pub user_latitude: f64,
    pub user_longitude: f64,
    pub max_distance_km: f64,
}

/// Facility fields shared by finder rows and grouped listings.
#[derive(Debug, Clone, Serialize)]
pub struct FacilityBody {
    pub facility_id: i64,
    pub facility_name: String,
    pub facility_type: String,
    pub region: Option<String>,
    pub province: Option<String>,
    pub city_municipality: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub contact_number: Option<String>,
    pub facility_email: Option<String>,
}

impl From<FacilityRecord> for FacilityBody {
    fn from(f: FacilityRecord) -> Self {
        Self {
            facility_id: f.facility_id,
            facility_name: f.facility_name,
            facility_type: f.facility_type,
            region: f.region,
            province: f.province,
            city_municipality: f.city_municipality,
            address: f.address,
            latitude: f.latitude,
            longitude: f.longitude,
            contact_number: f.contact_number,
            facility_email: f.facility_email,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RouteBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub road_distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_travel_time_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_duration: Option<String>,
}

impl From<Option<RouteSummary>> for RouteBody {
    fn from(route: Option<RouteSummary>) -> Self {
        match route {
            Some(r) => Self {
                road_distance_km: Some(r.road_distance_km),
                estimated_travel_time_minutes: Some(r.travel_time_minutes),
                formatted_duration: Some(r.formatted_duration),
            },
            None => Self::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FacilityMatchBody {
    #[serde(flatten)]
    pub facility: FacilityBody,
    pub antivenom_id: i64,
    pub antivenom_name: String,
    pub manufacturer: Option<String>,
    pub antivenom_type: Option<String>,
    pub quantity: i64,
    pub expiration_date: Option<String>,
    pub target_species: Vec<String>,
    pub distance_km: f64,
    #[serde(flatten)]
    pub route: RouteBody,
}

impl From<RankedFacility> for FacilityMatchBody {
    fn from(r: RankedFacility) -> Self {
        Self {
            facility: r.facility.into(),
            antivenom_id: r.antivenom.antivenom_id,
            antivenom_name: r.antivenom.product_name,
            manufacturer: r.antivenom.manufacturer,
            antivenom_type: r.antivenom.antivenom_type.map(|t| t.to_string()),
            quantity: r.quantity,
            expiration_date: r.expiration_date,
            target_species: r.target_species,
            distance_km: round_km(r.distance_km),
            route: r.route.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FinderResponse {
    pub success: bool,
    pub message: String,
    pub total_facilities: usize,
    pub facilities: Vec<FacilityMatchBody>,
    pub search_criteria: SearchCriteria,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockedAntivenomBody {
    pub antivenom_id: i64,
    pub antivenom_name: String,
    pub manufacturer: Option<String>,
    pub antivenom_type: Option<String>,
    pub quantity: i64,
    pub expiration_date: Option<String>,
    pub target_species: Vec<String>,
}

impl From<StockedAntivenom> for StockedAntivenomBody {
    fn from(s: StockedAntivenom) -> Self {
        Self {
            antivenom_id: s.antivenom.antivenom_id,
            antivenom_name: s.antivenom.product_name,
            manufacturer: s.antivenom.manufacturer,
            antivenom_type: s.antivenom.antivenom_type.map(|t| t.to_string()),
            quantity: s.quantity,
            expiration_date: s.expiration_date,
            target_species: s.target_species,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FacilityGroupBody {
    #[serde(flatten)]
    pub facility: FacilityBody,
    pub distance_km: f64,
    #[serde(flatten)]
    pub route: RouteBody,
    pub antivenoms: Vec<StockedAntivenomBody>,
}

impl From<FacilityGroup> for FacilityGroupBody {
    fn from(g: FacilityGroup) -> Self {
        Self {
            facility: g.facility.into(),
            distance_km: round_km(g.distance_km),
            route: g.route.into(),
            antivenoms: g.antivenoms.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FacilitiesResponse {
    pub success: bool,
    pub message: String,
    pub total_facilities: usize,
    pub facilities: Vec<FacilityGroupBody>,
    pub search_criteria: SearchCriteria,
}

// === Routing diagnostic ===

#[derive(Debug, Clone, Deserialize)]
pub struct RouteQuery {
    pub start_lat: f64,
    pub start_lon: f64,
    pub end_lat: f64,
    pub end_lon: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteResponse {
    pub success: bool,
    /// Router name, or `estimate` for the straight-line fallback.
    pub source: String,
    pub straight_line_distance_km: f64,
    pub route: RouteSummary,
}

// === Species ===

#[derive(Debug, Clone, Serialize)]
pub struct SpeciesListResponse {
    pub success: bool,
    pub total: usize,
    pub snakes: Vec<SpeciesRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeciesResponse {
    pub success: bool,
    pub snake: SpeciesRecord,
}

// === Service info ===

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsInfoResponse {
    pub success: bool,
    pub models: ModelInfo,
    pub default_confidence_threshold: f32,
    pub classification_min_confidence: f32,
    pub max_upload_bytes: usize,
    pub allowed_extensions: &'static [&'static str],
}

fn round_km(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}
