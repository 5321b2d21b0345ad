//! HTTP handler functions for the region aggregate API.
//!
//! Every handler follows the same shape: validate the request into typed
//! parameters (400 on failure, before any store access), run one query from
//! the aggregate layer, then map `Some(value)` to 200, `None` (no result
//! row at all) to 404, and a store failure to 500 with the underlying
//! message. A query that matches zero rows is a zero-valued 200, never an
//! error.

use actix_web::{HttpResponse, web};
use region_mark_database::queries;
use region_mark_database_models::{OverlapRatio, PointRegion};
use region_mark_geometry::RegionPolygon;
use region_mark_server_models::{
    ApiHealth, AreaPointRequest, AreaPolygonRequest, AreaResponse, HouseholdsResponse,
    PointRequest, PolygonRequest, PopulationResponse,
};

use crate::AppState;

/// `GET /`
///
/// Minimal landing page pointing at the API surface.
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().content_type("text/html; charset=utf-8").body(
        "<p>Region aggregate API. POST to /households/point, /population/point, /area/point, \
         /households/polygon, /population/polygon, or /area/polygon.</p>",
    )
}

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /households/point`
///
/// Counts household points within geodesic `radius` meters of the center.
/// The `overlap_ratio` field is validated for wire compatibility but plays
/// no part in point membership.
pub async fn households_point(
    state: web::Data<AppState>,
    body: web::Json<PointRequest>,
) -> HttpResponse {
    let region = match PointRegion::new(body.longitude, body.latitude, body.radius) {
        Ok(region) => region,
        Err(e) => return client_error(&e),
    };
    if let Err(e) = OverlapRatio::new(body.overlap_ratio) {
        return client_error(&e);
    }

    match queries::count_households_in_radius(state.db.as_ref(), &region).await {
        Ok(Some(households)) => HttpResponse::Ok().json(HouseholdsResponse { households }),
        Ok(None) => no_result_row(),
        Err(e) => server_error("households/point", &e),
    }
}

/// `POST /population/point`
///
/// Sums population over units meeting the overlap-ratio policy against the
/// buffered disc.
pub async fn population_point(
    state: web::Data<AppState>,
    body: web::Json<PointRequest>,
) -> HttpResponse {
    let region = match PointRegion::new(body.longitude, body.latitude, body.radius) {
        Ok(region) => region,
        Err(e) => return client_error(&e),
    };
    let overlap_ratio = match OverlapRatio::new(body.overlap_ratio) {
        Ok(ratio) => ratio,
        Err(e) => return client_error(&e),
    };

    match queries::sum_population_in_radius(state.db.as_ref(), &region, overlap_ratio).await {
        Ok(Some(population)) => HttpResponse::Ok().json(PopulationResponse { population }),
        Ok(None) => no_result_row(),
        Err(e) => server_error("population/point", &e),
    }
}

/// `POST /area/point`
///
/// Returns the area of the geodesic disc itself.
pub async fn area_point(
    state: web::Data<AppState>,
    body: web::Json<AreaPointRequest>,
) -> HttpResponse {
    let region = match PointRegion::new(body.longitude, body.latitude, body.radius) {
        Ok(region) => region,
        Err(e) => return client_error(&e),
    };

    match queries::geodesic_disc_area(state.db.as_ref(), &region).await {
        Ok(Some(area)) => HttpResponse::Ok().json(AreaResponse { area }),
        Ok(None) => no_result_row(),
        Err(e) => server_error("area/point", &e),
    }
}

/// `POST /households/polygon`
///
/// Counts household points inside the ring. The `overlap_ratio` field is
/// validated for wire compatibility but point-in-polygon membership is
/// binary.
pub async fn households_polygon(
    state: web::Data<AppState>,
    body: web::Json<PolygonRequest>,
) -> HttpResponse {
    let region = match RegionPolygon::parse(&body.wkt_polygon) {
        Ok(region) => region,
        Err(e) => return client_error(&e),
    };
    if let Err(e) = OverlapRatio::new(body.overlap_ratio) {
        return client_error(&e);
    }

    match queries::count_households_in_polygon(state.db.as_ref(), &region).await {
        Ok(Some(households)) => HttpResponse::Ok().json(HouseholdsResponse { households }),
        Ok(None) => no_result_row(),
        Err(e) => server_error("households/polygon", &e),
    }
}

/// `POST /population/polygon`
///
/// Sums population over units meeting the overlap-ratio policy against the
/// projected ring.
pub async fn population_polygon(
    state: web::Data<AppState>,
    body: web::Json<PolygonRequest>,
) -> HttpResponse {
    let region = match RegionPolygon::parse(&body.wkt_polygon) {
        Ok(region) => region,
        Err(e) => return client_error(&e),
    };
    let overlap_ratio = match OverlapRatio::new(body.overlap_ratio) {
        Ok(ratio) => ratio,
        Err(e) => return client_error(&e),
    };

    match queries::sum_population_in_polygon(state.db.as_ref(), &region, overlap_ratio).await {
        Ok(Some(population)) => HttpResponse::Ok().json(PopulationResponse { population }),
        Ok(None) => no_result_row(),
        Err(e) => server_error("population/polygon", &e),
    }
}

/// `POST /area/polygon`
///
/// Returns the ring's area under the fixed projected system.
pub async fn area_polygon(
    state: web::Data<AppState>,
    body: web::Json<AreaPolygonRequest>,
) -> HttpResponse {
    let region = match RegionPolygon::parse(&body.wkt_polygon) {
        Ok(region) => region,
        Err(e) => return client_error(&e),
    };

    match queries::projected_polygon_area(state.db.as_ref(), &region).await {
        Ok(Some(area)) => HttpResponse::Ok().json(AreaResponse { area }),
        Ok(None) => no_result_row(),
        Err(e) => server_error("area/polygon", &e),
    }
}

fn client_error(err: &dyn std::fmt::Display) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "error": err.to_string()
    }))
}

fn no_result_row() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "error": "Query returned no result row"
    }))
}

fn server_error(operation: &str, err: &dyn std::fmt::Display) -> HttpResponse {
    log::error!("Failed to execute {operation}: {err}");
    HttpResponse::InternalServerError().json(serde_json::json!({
        "error": err.to_string()
    }))
}
