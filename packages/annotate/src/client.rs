//! HTTP client for the region aggregate query service.
//!
//! Mirrors the calls the original map page made on draw-complete: the
//! three polygon operations, with the overlap threshold fixed at 0.5.

use region_mark_database_models::OverlapRatio;
use region_mark_geometry::RegionPolygon;
use region_mark_server_models::{
    ApiError, AreaPolygonRequest, AreaResponse, HouseholdsResponse, PolygonRequest,
    PopulationResponse,
};

use crate::session::RegionStats;

/// Errors from talking to the query service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("service returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error body, or the status line when the body was unreadable.
        message: String,
    },
}

/// Client for the six-operation aggregate API.
pub struct QueryClient {
    http: reqwest::Client,
    base_url: String,
}

impl QueryClient {
    /// Creates a client against `base_url` (e.g. `http://127.0.0.1:8000`).
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Counts households inside the ring.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request or response handling fails.
    pub async fn households_in_polygon(&self, region: &RegionPolygon) -> Result<i64, ClientError> {
        let resp = self
            .http
            .post(format!("{}/households/polygon", self.base_url))
            .json(&PolygonRequest {
                wkt_polygon: region.as_wkt().to_string(),
                overlap_ratio: OverlapRatio::DEFAULT.value(),
            })
            .send()
            .await?;
        let body: HouseholdsResponse = decode(resp).await?;
        Ok(body.households)
    }

    /// Sums population over units meeting `overlap_ratio` against the ring.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request or response handling fails.
    pub async fn population_in_polygon(
        &self,
        region: &RegionPolygon,
        overlap_ratio: OverlapRatio,
    ) -> Result<i64, ClientError> {
        let resp = self
            .http
            .post(format!("{}/population/polygon", self.base_url))
            .json(&PolygonRequest {
                wkt_polygon: region.as_wkt().to_string(),
                overlap_ratio: overlap_ratio.value(),
            })
            .send()
            .await?;
        let body: PopulationResponse = decode(resp).await?;
        Ok(body.population)
    }

    /// Fetches the ring's area in square meters.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request or response handling fails.
    pub async fn area_of_polygon(&self, region: &RegionPolygon) -> Result<f64, ClientError> {
        let resp = self
            .http
            .post(format!("{}/area/polygon", self.base_url))
            .json(&AreaPolygonRequest {
                wkt_polygon: region.as_wkt().to_string(),
            })
            .send()
            .await?;
        let body: AreaResponse = decode(resp).await?;
        Ok(body.area)
    }

    /// Fetches all three aggregates for a freshly drawn region, with the
    /// draw-tool overlap threshold of 0.5 and the area rounded to two
    /// decimals for display.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if any of the three requests fail.
    pub async fn region_stats(&self, region: &RegionPolygon) -> Result<RegionStats, ClientError> {
        let households = self.households_in_polygon(region).await?;
        let population = self
            .population_in_polygon(region, OverlapRatio::HALF)
            .await?;
        let area = (self.area_of_polygon(region).await? * 100.0).round() / 100.0;

        Ok(RegionStats {
            area,
            households,
            population,
        })
    }
}

/// Decodes a success body, or turns a non-success status into
/// [`ClientError::Api`] using the service's error payload when present.
async fn decode<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let message = match resp.json::<ApiError>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp.json::<T>().await?)
}
