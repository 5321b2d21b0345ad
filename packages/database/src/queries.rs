//! The aggregate query layer: six parametrized `PostGIS` reads.
//!
//! Region text and numeric thresholds are always bound as parameters via
//! `query_raw_params()`, never spliced into the SQL text.
//!
//! CRS policy:
//! - Household membership is geodesic: `ST_DWithin` over `geography` for
//!   the point form, `ST_Within` in raw 4326 for the polygon form
//!   (households are zero-area, so membership is binary and needs no
//!   planar area math).
//! - Population overlap fractions are computed in Web Mercator (3857):
//!   the query region and each unit boundary are transformed to 3857 and
//!   both the intersection area and the unit's full area are taken there,
//!   so the ratio compares like with like.
//! - Region area uses a geodesic buffer for the point form and a fixed
//!   projected system (UTM zone 51N, 32651) for the polygon form. The
//!   3857/32651 split between the population and area paths is
//!   load-bearing for output compatibility; do not unify it casually.

use moosicbox_json_utils::database::ToValue as _;
use region_mark_database_models::{OverlapRatio, PointRegion};
use region_mark_geometry::RegionPolygon;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

const HOUSEHOLDS_IN_RADIUS_SQL: &str = "\
    SELECT count(*) AS households
    FROM households
    WHERE ST_DWithin(
        geography(ST_SetSRID(ST_Point($1, $2), 4326)),
        geography(location),
        $3
    )";

const HOUSEHOLDS_IN_POLYGON_SQL: &str = "\
    SELECT count(*) AS households
    FROM households
    WHERE ST_Within(location, ST_GeomFromText($1, 4326))";

const POPULATION_IN_RADIUS_SQL: &str = "\
    WITH target_point AS (
        SELECT ST_SetSRID(ST_MakePoint($1, $2), 4326) AS geom
    ),
    buffered_region AS (
        SELECT ST_Buffer(ST_Transform(geom, 3857), $3) AS geom
        FROM target_point
    )
    SELECT sum(population.population_count) AS population
    FROM population
    JOIN buffered_region
        ON ST_Intersects(ST_Transform(population.boundary, 3857), buffered_region.geom)
    WHERE ST_Area(ST_Intersection(ST_Transform(population.boundary, 3857), buffered_region.geom))
        / ST_Area(ST_Transform(population.boundary, 3857)) >= $4";

const POPULATION_IN_POLYGON_SQL: &str = "\
    WITH query_region AS (
        SELECT ST_Transform(ST_GeomFromText($1, 4326), 3857) AS geom
    )
    SELECT sum(population.population_count) AS population
    FROM population
    JOIN query_region
        ON ST_Intersects(ST_Transform(population.boundary, 3857), query_region.geom)
    WHERE ST_Area(ST_Intersection(ST_Transform(population.boundary, 3857), query_region.geom))
        / ST_Area(ST_Transform(population.boundary, 3857)) >= $2";

const GEODESIC_DISC_AREA_SQL: &str = "\
    SELECT ST_Area(
        ST_Buffer(
            ST_SetSRID(ST_Point($1, $2), 4326)::geography,
            $3
        )
    ) AS area";

const PROJECTED_POLYGON_AREA_SQL: &str = "\
    SELECT ST_Area(
        ST_Transform(
            ST_GeomFromText($1, 4326),
            32651
        )
    ) AS area";

/// Counts household points within geodesic `radius` meters of the center.
///
/// Returns `None` only in the degenerate case where the statement yields no
/// row at all; a region containing no households is `Some(0)`.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn count_households_in_radius(
    db: &dyn Database,
    region: &PointRegion,
) -> Result<Option<i64>, DbError> {
    let rows = db
        .query_raw_params(
            HOUSEHOLDS_IN_RADIUS_SQL,
            &[
                DatabaseValue::Real64(region.longitude()),
                DatabaseValue::Real64(region.latitude()),
                DatabaseValue::Real64(region.radius()),
            ],
        )
        .await?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let households: i64 = row.to_value("households").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse household count: {e}"),
    })?;

    Ok(Some(households))
}

/// Counts household points inside the ring (boundary inclusive).
///
/// No overlap ratio applies here: an address point is either in the region
/// or it is not.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn count_households_in_polygon(
    db: &dyn Database,
    region: &RegionPolygon,
) -> Result<Option<i64>, DbError> {
    let rows = db
        .query_raw_params(
            HOUSEHOLDS_IN_POLYGON_SQL,
            &[DatabaseValue::String(region.as_wkt().to_string())],
        )
        .await?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let households: i64 = row.to_value("households").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse household count: {e}"),
    })?;

    Ok(Some(households))
}

/// Sums `population_count` over units whose 3857-projected overlap with the
/// buffered disc meets the overlap-ratio threshold.
///
/// A `NULL` sum (no qualifying unit) is reported as `Some(0)`.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn sum_population_in_radius(
    db: &dyn Database,
    region: &PointRegion,
    overlap_ratio: OverlapRatio,
) -> Result<Option<i64>, DbError> {
    let rows = db
        .query_raw_params(
            POPULATION_IN_RADIUS_SQL,
            &[
                DatabaseValue::Real64(region.longitude()),
                DatabaseValue::Real64(region.latitude()),
                DatabaseValue::Real64(region.radius()),
                DatabaseValue::Real64(overlap_ratio.value()),
            ],
        )
        .await?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let population: Option<i64> = row.to_value("population").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse population sum: {e}"),
    })?;

    Ok(Some(population.unwrap_or(0)))
}

/// Sums `population_count` over units whose 3857-projected overlap with the
/// ring meets the overlap-ratio threshold.
///
/// A `NULL` sum (no qualifying unit) is reported as `Some(0)`.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn sum_population_in_polygon(
    db: &dyn Database,
    region: &RegionPolygon,
    overlap_ratio: OverlapRatio,
) -> Result<Option<i64>, DbError> {
    let rows = db
        .query_raw_params(
            POPULATION_IN_POLYGON_SQL,
            &[
                DatabaseValue::String(region.as_wkt().to_string()),
                DatabaseValue::Real64(overlap_ratio.value()),
            ],
        )
        .await?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let population: Option<i64> = row.to_value("population").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse population sum: {e}"),
    })?;

    Ok(Some(population.unwrap_or(0)))
}

/// Area in square meters of the geodesic disc of `radius` meters around the
/// center.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn geodesic_disc_area(
    db: &dyn Database,
    region: &PointRegion,
) -> Result<Option<f64>, DbError> {
    let rows = db
        .query_raw_params(
            GEODESIC_DISC_AREA_SQL,
            &[
                DatabaseValue::Real64(region.longitude()),
                DatabaseValue::Real64(region.latitude()),
                DatabaseValue::Real64(region.radius()),
            ],
        )
        .await?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let area: f64 = row.to_value("area").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse disc area: {e}"),
    })?;

    Ok(Some(area))
}

/// Area in square meters of the ring under the fixed projected system
/// (UTM zone 51N).
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn projected_polygon_area(
    db: &dyn Database,
    region: &RegionPolygon,
) -> Result<Option<f64>, DbError> {
    let rows = db
        .query_raw_params(
            PROJECTED_POLYGON_AREA_SQL,
            &[DatabaseValue::String(region.as_wkt().to_string())],
        )
        .await?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let area: f64 = row.to_value("area").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse polygon area: {e}"),
    })?;

    Ok(Some(area))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn household_point_membership_is_geodesic() {
        assert!(HOUSEHOLDS_IN_RADIUS_SQL.contains("ST_DWithin"));
        assert!(HOUSEHOLDS_IN_RADIUS_SQL.contains("geography"));
    }

    #[test]
    fn household_polygon_membership_has_no_overlap_threshold() {
        assert!(HOUSEHOLDS_IN_POLYGON_SQL.contains("ST_Within"));
        assert!(!HOUSEHOLDS_IN_POLYGON_SQL.contains("ST_Area"));
    }

    #[test]
    fn population_queries_compute_overlap_in_web_mercator() {
        for sql in [POPULATION_IN_RADIUS_SQL, POPULATION_IN_POLYGON_SQL] {
            assert!(sql.contains("ST_Transform(population.boundary, 3857)"));
            assert!(sql.contains("ST_Intersection"));
        }
        // The point form buffers in the same planar system the ratio uses.
        assert!(POPULATION_IN_RADIUS_SQL.contains("ST_Buffer(ST_Transform(geom, 3857)"));
    }

    #[test]
    fn disc_area_is_geography_native() {
        assert!(GEODESIC_DISC_AREA_SQL.contains("::geography"));
        assert!(!GEODESIC_DISC_AREA_SQL.contains("3857"));
    }

    #[test]
    fn polygon_area_uses_fixed_utm_zone() {
        assert!(PROJECTED_POLYGON_AREA_SQL.contains("32651"));
    }

    #[test]
    fn region_text_is_always_bound_not_spliced() {
        for sql in [
            HOUSEHOLDS_IN_RADIUS_SQL,
            HOUSEHOLDS_IN_POLYGON_SQL,
            POPULATION_IN_RADIUS_SQL,
            POPULATION_IN_POLYGON_SQL,
            GEODESIC_DISC_AREA_SQL,
            PROJECTED_POLYGON_AREA_SQL,
        ] {
            assert!(sql.contains("$1"));
            assert!(!sql.contains("POLYGON(("));
        }
    }
}
