//! Facility ranking: distance filtering, deterministic ordering and grouping.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::domain::{AntivenomRecord, FacilityRecord, RouteSummary, StockMatch};
use crate::error::ValidationError;
use crate::geo::{haversine_km, Coordinate};

/// A user location plus the maximum search radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchArea {
    origin: Coordinate,
    max_distance_km: f64,
}

impl SearchArea {
    /// Rejects a non-positive or non-finite radius.
    pub fn new(origin: Coordinate, max_distance_km: f64) -> Result<Self, ValidationError> {
        if !max_distance_km.is_finite() || max_distance_km <= 0.0 {
            return Err(ValidationError::InvalidMaxDistance(max_distance_km));
        }
        Ok(Self { origin, max_distance_km })
    }

    pub fn origin(&self) -> Coordinate {
        self.origin
    }

    pub fn max_distance_km(&self) -> f64 {
        self.max_distance_km
    }
}

/// A facility/antivenom match annotated with its distance from the user.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFacility {
    pub facility: FacilityRecord,
    pub antivenom: AntivenomRecord,
    pub quantity: i64,
    pub expiration_date: Option<String>,
    pub target_species: Vec<String>,
    pub distance_km: f64,
    pub route: Option<RouteSummary>,
}

/// Stock of one antivenom inside a [`FacilityGroup`].
#[derive(Debug, Clone, PartialEq)]
pub struct StockedAntivenom {
    pub antivenom: AntivenomRecord,
    pub quantity: i64,
    pub expiration_date: Option<String>,
    pub target_species: Vec<String>,
}

/// A facility with every matching antivenom it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityGroup {
    pub facility: FacilityRecord,
    pub distance_km: f64,
    pub antivenoms: Vec<StockedAntivenom>,
    pub route: Option<RouteSummary>,
}

/// Something a routing collaborator can attach a road route to.
pub trait Routable {
    fn destination(&self) -> Option<Coordinate>;
    fn attach_route(&mut self, route: RouteSummary);
}

impl Routable for RankedFacility {
    fn destination(&self) -> Option<Coordinate> {
        self.facility.coordinate()
    }

    fn attach_route(&mut self, route: RouteSummary) {
        self.route = Some(route);
    }
}

impl Routable for FacilityGroup {
    fn destination(&self) -> Option<Coordinate> {
        self.facility.coordinate()
    }

    fn attach_route(&mut self, route: RouteSummary) {
        self.route = Some(route);
    }
}

/// Ranks stock matches by great-circle distance from the search origin.
///
/// Matches from unverified facilities, without usable coordinates, with no
/// stock, or beyond the search radius are dropped. Duplicate
/// (facility, antivenom) pairs are merged. The result is sorted by distance,
/// then facility id, then antivenom id.
pub fn rank_matches(matches: Vec<StockMatch>, area: &SearchArea) -> Vec<RankedFacility> {
    let mut merged: HashMap<(i64, i64), RankedFacility> = HashMap::new();

    for m in matches {
        if !m.facility.is_verified || m.quantity <= 0 {
            continue;
        }
        let Some(location) = m.facility.coordinate() else {
            continue;
        };
        let distance_km = haversine_km(area.origin, location);
        if distance_km > area.max_distance_km {
            continue;
        }

        let key = (m.facility.facility_id, m.antivenom.antivenom_id);
        match merged.get_mut(&key) {
            Some(existing) => {
                existing.quantity += m.quantity;
                existing.expiration_date =
                    earliest(existing.expiration_date.take(), m.expiration_date);
            }
            None => {
                merged.insert(
                    key,
                    RankedFacility {
                        facility: m.facility,
                        antivenom: m.antivenom,
                        quantity: m.quantity,
                        expiration_date: m.expiration_date,
                        target_species: m.target_species,
                        distance_km,
                        route: None,
                    },
                );
            }
        }
    }

    let mut ranked: Vec<RankedFacility> = merged.into_values().collect();
    ranked.sort_by(compare_ranked);
    ranked
}

/// Collapses ranked rows into one entry per facility, keeping rank order.
pub fn group_by_facility(ranked: Vec<RankedFacility>) -> Vec<FacilityGroup> {
    let mut groups: Vec<FacilityGroup> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for row in ranked {
        let stocked = StockedAntivenom {
            antivenom: row.antivenom,
            quantity: row.quantity,
            expiration_date: row.expiration_date,
            target_species: row.target_species,
        };
        match index.get(&row.facility.facility_id) {
            Some(&i) => groups[i].antivenoms.push(stocked),
            None => {
                index.insert(row.facility.facility_id, groups.len());
                groups.push(FacilityGroup {
                    facility: row.facility,
                    distance_km: row.distance_km,
                    antivenoms: vec![stocked],
                    route: row.route,
                });
            }
        }
    }

    for group in &mut groups {
        group.antivenoms.sort_by_key(|a| a.antivenom.antivenom_id);
    }
    groups
}

fn compare_ranked(a: &RankedFacility, b: &RankedFacility) -> Ordering {
    a.distance_km
        .total_cmp(&b.distance_km)
        .then(a.facility.facility_id.cmp(&b.facility.facility_id))
        .then(a.antivenom.antivenom_id.cmp(&b.antivenom.antivenom_id))
}

// ISO dates compare correctly as strings; a missing date never expires.
fn earliest(a: Option<String>, b: Option<String>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b < a { b } else { a }),
        (a, b) => a.or(b),
    }
}
