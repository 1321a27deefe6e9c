//! Core domain types and ranking logic for VenomX.
//!
//! This crate provides the types shared by every other VenomX crate:
//!
//! - [`SpeciesRecord`], [`FacilityRecord`], [`AntivenomRecord`] — reference data
//! - [`StockMatch`] — one facility holding one matching antivenom
//! - [`RankedFacility`] and [`FacilityGroup`] — request-scoped ranking output
//! - [`Coordinate`] and [`haversine_km`] — great-circle geometry
//! - [`rank_matches`] — the facility ranking engine
//!
//! # Example
//!
//! ```rust
//! use venomx_core::{Coordinate, SearchArea};
//!
//! let user = Coordinate::new(14.5995, 120.9842).unwrap();
//! let area = SearchArea::new(user, 100.0).unwrap();
//! assert_eq!(area.max_distance_km(), 100.0);
//! ```

mod domain;
mod error;
mod geo;
mod ranking;

pub use domain::{
    AntivenomRecord, AntivenomType, FacilityRecord, RouteSummary, SpeciesRecord, StockMatch,
};
pub use error::ValidationError;
pub use geo::{format_duration, haversine_km, Coordinate, EARTH_RADIUS_KM};
pub use ranking::{
    group_by_facility, rank_matches, FacilityGroup, RankedFacility, Routable, SearchArea,
    StockedAntivenom,
};
