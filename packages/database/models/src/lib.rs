#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Validated query parameter types shared by the aggregate query layer and
//! the HTTP boundary.
//!
//! Construction is the validation: a [`PointRegion`] or [`OverlapRatio`]
//! that exists is always in range, so the query layer never re-checks its
//! inputs and the boundary rejects bad requests before any store access.

use thiserror::Error;

/// Errors produced when constructing query parameters from raw input.
#[derive(Debug, Error, PartialEq)]
pub enum RegionError {
    /// Longitude was NaN or infinite.
    #[error("longitude must be a finite WGS84 degree value, got {0}")]
    InvalidLongitude(f64),

    /// Latitude was NaN or infinite.
    #[error("latitude must be a finite WGS84 degree value, got {0}")]
    InvalidLatitude(f64),

    /// Radius was NaN, infinite, zero, or negative.
    #[error("radius must be a finite number of meters greater than zero, got {0}")]
    InvalidRadius(f64),

    /// Overlap ratio fell outside `[0, 1]`.
    #[error("overlap ratio must lie within [0, 1], got {0}")]
    InvalidOverlapRatio(f64),
}

/// A disc-shaped query region: a WGS84 center plus a radius in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRegion {
    longitude: f64,
    latitude: f64,
    radius: f64,
}

impl PointRegion {
    /// Validates and constructs a point-radius region.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError`] if either coordinate is non-finite or the
    /// radius is not a finite positive number of meters.
    pub fn new(longitude: f64, latitude: f64, radius: f64) -> Result<Self, RegionError> {
        if !longitude.is_finite() {
            return Err(RegionError::InvalidLongitude(longitude));
        }
        if !latitude.is_finite() {
            return Err(RegionError::InvalidLatitude(latitude));
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(RegionError::InvalidRadius(radius));
        }
        Ok(Self {
            longitude,
            latitude,
            radius,
        })
    }

    /// Center longitude in WGS84 degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Center latitude in WGS84 degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Radius in meters.
    #[must_use]
    pub const fn radius(&self) -> f64 {
        self.radius
    }
}

/// The inclusion threshold for population aggregation: the fraction of a
/// unit's area that must be covered by the query region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapRatio(f64);

impl OverlapRatio {
    /// The service-wide default threshold (80% coverage).
    pub const DEFAULT: Self = Self(0.8);

    /// The threshold the map-drawing client uses (50% coverage).
    pub const HALF: Self = Self(0.5);

    /// Validates and constructs an overlap ratio.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::InvalidOverlapRatio`] unless the value is a
    /// finite fraction in `[0, 1]`.
    pub fn new(value: f64) -> Result<Self, RegionError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(RegionError::InvalidOverlapRatio(value));
        }
        Ok(Self(value))
    }

    /// The threshold as a fraction in `[0, 1]`.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.0
    }
}

impl Default for OverlapRatio {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_point_region() {
        let region = PointRegion::new(120.1854, 22.9921, 500.0).unwrap();
        assert!((region.longitude() - 120.1854).abs() < f64::EPSILON);
        assert!((region.latitude() - 22.9921).abs() < f64::EPSILON);
        assert!((region.radius() - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_non_finite_longitude() {
        assert!(matches!(
            PointRegion::new(f64::NAN, 22.9921, 500.0),
            Err(RegionError::InvalidLongitude(_))
        ));
        assert!(PointRegion::new(f64::INFINITY, 22.9921, 500.0).is_err());
    }

    #[test]
    fn rejects_non_finite_latitude() {
        assert!(PointRegion::new(120.0, f64::NEG_INFINITY, 500.0).is_err());
    }

    #[test]
    fn rejects_zero_and_negative_radius() {
        assert_eq!(
            PointRegion::new(120.0, 22.0, 0.0),
            Err(RegionError::InvalidRadius(0.0))
        );
        assert_eq!(
            PointRegion::new(120.0, 22.0, -25.0),
            Err(RegionError::InvalidRadius(-25.0))
        );
        assert!(PointRegion::new(120.0, 22.0, f64::NAN).is_err());
    }

    #[test]
    fn default_overlap_ratio_is_eighty_percent() {
        assert!((OverlapRatio::default().value() - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn accepts_boundary_overlap_ratios() {
        assert!(OverlapRatio::new(0.0).is_ok());
        assert!(OverlapRatio::new(1.0).is_ok());
        assert!((OverlapRatio::HALF.value() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_out_of_range_overlap_ratio() {
        assert_eq!(
            OverlapRatio::new(1.5),
            Err(RegionError::InvalidOverlapRatio(1.5))
        );
        assert!(OverlapRatio::new(-0.1).is_err());
        assert!(OverlapRatio::new(f64::NAN).is_err());
    }
}
