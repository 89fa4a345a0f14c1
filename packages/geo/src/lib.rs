#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Region query construction.
//!
//! Every region analysis is requested for a fixed-size box centered on the
//! selected point. The half-extent [`REGION_HALF_EXTENT_DEG`] is shared by
//! all region and simulation queries so results for the same point are
//! always comparable.

use bio_risk_models::{BoundingBox, Coordinate};
use geo::{Contains, Point, Rect, coord};
use serde::Serialize;

/// Half-extent of a region query box in degrees, applied to both axes.
///
/// Bounds are not clipped to the valid coordinate range: a point at
/// `lat = 90` yields `max_lat = 90.025`, and one at `lng = 180` yields
/// `max_lng = 180.025`. Backends must accept boxes that cross a pole or
/// the antimeridian.
pub const REGION_HALF_EXTENT_DEG: f64 = 0.025;

/// A point plus the box the backend should analyze around it.
///
/// Serializes flat (`lat`, `lng`, `min_lat`, `max_lat`, `min_lng`,
/// `max_lng`), which is the request body shape the backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionQuery {
    /// The selected point.
    #[serde(flatten)]
    pub coord: Coordinate,
    /// The query box centered on `coord`.
    #[serde(flatten)]
    pub bounds: BoundingBox,
}

impl RegionQuery {
    /// The query box as a `geo` rectangle (x = longitude, y = latitude).
    #[must_use]
    pub fn rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.bounds.min_lng, y: self.bounds.min_lat },
            coord! { x: self.bounds.max_lng, y: self.bounds.max_lat },
        )
    }

    /// Whether `point` lies strictly inside the query box.
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        self.rect().contains(&Point::new(point.lng, point.lat))
    }
}

/// Builds the region query for a selected coordinate.
///
/// Returns `None` for non-finite or out-of-range coordinates so that
/// callers can drop stray map events without dispatching a fetch.
#[must_use]
pub fn build_region_query(coord: Coordinate) -> Option<RegionQuery> {
    if !coord.is_valid() {
        log::debug!("Ignoring invalid coordinate ({}, {})", coord.lat, coord.lng);
        return None;
    }

    let d = REGION_HALF_EXTENT_DEG;
    Some(RegionQuery {
        coord,
        bounds: BoundingBox::new(coord.lat - d, coord.lat + d, coord.lng - d, coord.lng + d),
    })
}
