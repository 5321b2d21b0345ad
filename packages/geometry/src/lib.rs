#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! WKT region parsing and validation.
//!
//! Query regions arrive as WKT polygon text in WGS84 with `(longitude
//! latitude)` vertex order. [`RegionPolygon::parse`] accepts exactly one
//! closed, non-self-intersecting exterior ring and rejects everything else
//! before the text ever reaches the spatial store. The validated WKT string
//! is what gets bound into SQL parameters; the parsed [`geo::Polygon`] backs
//! GeoJSON export.

use std::str::FromStr;

use geo::Validation;
use thiserror::Error;
use wkt::Wkt;

/// Errors produced while parsing or validating region polygon text.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    /// The text is not parseable WKT.
    #[error("malformed WKT: {message}")]
    Parse {
        /// Parser diagnostic.
        message: String,
    },

    /// The WKT parsed, but to something other than a polygon.
    #[error("expected a WKT POLYGON, got a different geometry type")]
    NotAPolygon,

    /// `POLYGON EMPTY` or a polygon with no rings.
    #[error("polygon has no exterior ring")]
    EmptyPolygon,

    /// Interior rings (holes) are not part of the region contract.
    #[error("polygon must be a single ring, found {0} interior ring(s)")]
    InteriorRings(usize),

    /// A closed ring needs at least four vertices.
    #[error("ring has {0} vertices, a closed ring needs at least 4")]
    TooFewVertices(usize),

    /// First and last vertex differ.
    #[error("ring is not closed, first and last vertex must be identical")]
    UnclosedRing,

    /// A vertex coordinate was NaN or infinite.
    #[error("ring contains a non-finite vertex coordinate")]
    NonFiniteVertex,

    /// The ring is structurally invalid (typically self-intersecting).
    #[error("invalid ring: {message}")]
    InvalidRing {
        /// Validity diagnostic.
        message: String,
    },
}

/// A validated polygon query region: one closed, non-self-intersecting WKT
/// ring in WGS84.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPolygon {
    wkt: String,
    ring: geo::Polygon<f64>,
}

impl RegionPolygon {
    /// Parses and validates WKT polygon text.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] unless the text is a WKT `POLYGON` with
    /// exactly one closed ring of at least four finite vertices that does
    /// not self-intersect.
    pub fn parse(text: &str) -> Result<Self, GeometryError> {
        let trimmed = text.trim();

        let parsed = Wkt::<f64>::from_str(trimmed).map_err(|e| GeometryError::Parse {
            message: e.to_string(),
        })?;

        let wkt::Geometry::Polygon(polygon) = parsed.item else {
            return Err(GeometryError::NotAPolygon);
        };

        let Some((exterior, interiors)) = polygon.0.split_first() else {
            return Err(GeometryError::EmptyPolygon);
        };
        if !interiors.is_empty() {
            return Err(GeometryError::InteriorRings(interiors.len()));
        }

        let coords = &exterior.0;
        if coords.len() < 4 {
            return Err(GeometryError::TooFewVertices(coords.len()));
        }
        if coords.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(GeometryError::NonFiniteVertex);
        }
        if !coords_equal(&coords[0], &coords[coords.len() - 1]) {
            return Err(GeometryError::UnclosedRing);
        }

        let ring_coords: Vec<geo::Coord<f64>> = coords
            .iter()
            .map(|c| geo::Coord { x: c.x, y: c.y })
            .collect();
        let ring = geo::Polygon::new(geo::LineString::new(ring_coords), Vec::new());

        ring.check_validation()
            .map_err(|e| GeometryError::InvalidRing {
                message: e.to_string(),
            })?;

        Ok(Self {
            wkt: trimmed.to_string(),
            ring,
        })
    }

    /// The validated WKT text, suitable for binding as a SQL parameter.
    #[must_use]
    pub fn as_wkt(&self) -> &str {
        &self.wkt
    }

    /// The parsed ring.
    #[must_use]
    pub const fn polygon(&self) -> &geo::Polygon<f64> {
        &self.ring
    }

    /// Converts the ring to a GeoJSON geometry for export documents.
    #[must_use]
    pub fn to_geojson_geometry(&self) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::from(&self.ring))
    }
}

/// Closure requires the first and last vertex to be written identically,
/// not merely near each other.
#[allow(clippy::float_cmp)]
fn coords_equal(a: &wkt::types::Coord<f64>, b: &wkt::types::Coord<f64>) -> bool {
    a.x == b.x && a.y == b.y
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    const TAINAN_RING: &str =
        "POLYGON((120.1828 22.9961, 120.1811 22.9869, 120.1906 22.9926, 120.1828 22.9961))";

    #[test]
    fn parses_closed_ring() {
        let region = RegionPolygon::parse(TAINAN_RING).unwrap();
        assert_eq!(region.as_wkt(), TAINAN_RING);
        assert_eq!(region.polygon().exterior().0.len(), 4);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let region = RegionPolygon::parse(&format!("  {TAINAN_RING}\n")).unwrap();
        assert_eq!(region.as_wkt(), TAINAN_RING);
    }

    #[test]
    fn rejects_garbage_text() {
        assert!(matches!(
            RegionPolygon::parse("not a polygon"),
            Err(GeometryError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_non_polygon_geometry() {
        assert_eq!(
            RegionPolygon::parse("POINT(120.2 22.9)"),
            Err(GeometryError::NotAPolygon)
        );
    }

    #[test]
    fn rejects_unclosed_ring() {
        let open = "POLYGON((120.1828 22.9961, 120.1811 22.9869, 120.1906 22.9926, 120.19 22.99))";
        assert_eq!(RegionPolygon::parse(open), Err(GeometryError::UnclosedRing));
    }

    #[test]
    fn rejects_too_few_vertices() {
        let degenerate = "POLYGON((120.1828 22.9961, 120.1811 22.9869, 120.1828 22.9961))";
        assert_eq!(
            RegionPolygon::parse(degenerate),
            Err(GeometryError::TooFewVertices(3))
        );
    }

    #[test]
    fn rejects_interior_rings() {
        let holed = "POLYGON((0 0, 4 0, 4 4, 0 4, 0 0), (1 1, 2 1, 2 2, 1 2, 1 1))";
        assert_eq!(
            RegionPolygon::parse(holed),
            Err(GeometryError::InteriorRings(1))
        );
    }

    #[test]
    fn rejects_self_intersecting_ring() {
        let bowtie = "POLYGON((0 0, 2 2, 2 0, 0 2, 0 0))";
        assert!(matches!(
            RegionPolygon::parse(bowtie),
            Err(GeometryError::InvalidRing { .. })
        ));
    }

    #[test]
    fn area_is_invariant_under_vertex_rotation() {
        let rotated =
            "POLYGON((120.1811 22.9869, 120.1906 22.9926, 120.1828 22.9961, 120.1811 22.9869))";
        let a = RegionPolygon::parse(TAINAN_RING).unwrap();
        let b = RegionPolygon::parse(rotated).unwrap();
        let area_a = a.polygon().unsigned_area();
        let area_b = b.polygon().unsigned_area();
        assert!(area_a > 0.0);
        assert!((area_a - area_b).abs() < 1e-12);
    }

    #[test]
    fn converts_to_geojson_polygon() {
        let region = RegionPolygon::parse(TAINAN_RING).unwrap();
        let geometry = region.to_geojson_geometry();
        assert!(matches!(geometry.value, geojson::Value::Polygon(_)));
    }
}
