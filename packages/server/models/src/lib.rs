#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the region aggregate service.
//!
//! Field names are part of the wire contract consumed by existing clients
//! (`longitude`, `latitude`, `radius`, `overlap_ratio`, `wkt_polygon`), so
//! they stay snake_case rather than following an API casing convention.

use serde::{Deserialize, Serialize};

fn default_overlap_ratio() -> f64 {
    0.8
}

/// Request body for the point-radius household and population operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointRequest {
    /// Center longitude in WGS84 degrees.
    pub longitude: f64,
    /// Center latitude in WGS84 degrees.
    pub latitude: f64,
    /// Radius in meters.
    pub radius: f64,
    /// Overlap threshold for population aggregation; accepted but unused by
    /// the household operation.
    #[serde(default = "default_overlap_ratio")]
    pub overlap_ratio: f64,
}

/// Request body for the polygon household and population operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonRequest {
    /// WKT polygon text, single closed ring, WGS84, `(longitude latitude)`
    /// vertex order.
    pub wkt_polygon: String,
    /// Overlap threshold for population aggregation; accepted but unused by
    /// the household operation.
    #[serde(default = "default_overlap_ratio")]
    pub overlap_ratio: f64,
}

/// Request body for the point-radius area operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaPointRequest {
    /// Center longitude in WGS84 degrees.
    pub longitude: f64,
    /// Center latitude in WGS84 degrees.
    pub latitude: f64,
    /// Radius in meters.
    pub radius: f64,
}

/// Request body for the polygon area operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaPolygonRequest {
    /// WKT polygon text, single closed ring, WGS84.
    pub wkt_polygon: String,
}

/// Household count response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseholdsResponse {
    /// Number of household points inside the region.
    pub households: i64,
}

/// Population sum response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationResponse {
    /// Sum of population counts over qualifying units.
    pub population: i64,
}

/// Region area response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaResponse {
    /// Area in square meters.
    pub area: f64,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable description of what went wrong.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_request_defaults_overlap_ratio() {
        let body: PointRequest = serde_json::from_str(
            r#"{"longitude": 120.1854, "latitude": 22.9921, "radius": 500}"#,
        )
        .unwrap();
        assert!((body.overlap_ratio - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn point_request_accepts_explicit_overlap_ratio() {
        let body: PointRequest = serde_json::from_str(
            r#"{"longitude": 120.0, "latitude": 22.0, "radius": 100, "overlap_ratio": 0.5}"#,
        )
        .unwrap();
        assert!((body.overlap_ratio - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn polygon_request_defaults_overlap_ratio() {
        let body: PolygonRequest =
            serde_json::from_str(r#"{"wkt_polygon": "POLYGON((0 0, 1 0, 1 1, 0 0))"}"#).unwrap();
        assert!((body.overlap_ratio - 0.8).abs() < f64::EPSILON);
        assert!(body.wkt_polygon.starts_with("POLYGON"));
    }

    #[test]
    fn responses_use_contract_field_names() {
        let households = serde_json::to_value(HouseholdsResponse { households: 3 }).unwrap();
        assert_eq!(households["households"], 3);

        let population = serde_json::to_value(PopulationResponse { population: 1200 }).unwrap();
        assert_eq!(population["population"], 1200);

        let area = serde_json::to_value(AreaResponse { area: 1234.5 }).unwrap();
        assert!((area["area"].as_f64().unwrap() - 1234.5).abs() < f64::EPSILON);
    }
}
