#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for region aggregate queries.
//!
//! Exposes six stateless POST operations ({households, population, area} ×
//! {point, polygon}) backed by the `PostGIS` aggregate query layer. Each
//! request validates its input at this boundary, issues exactly one
//! read-only query, and returns a single scalar field.

mod handlers;
pub mod interactive;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use region_mark_database::{db, run_migrations};
use std::sync::Arc;
use switchy_database::Database;

/// Shared application state.
pub struct AppState {
    /// `PostGIS` database connection.
    pub db: Arc<dyn Database>,
}

/// Starts the region aggregate API server.
///
/// Connects to the `PostGIS` database, runs migrations, and starts the
/// Actix-Web HTTP server. This is a regular async function — the caller is
/// responsible for providing the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
///
/// # Panics
///
/// Panics if the database connection or migrations fail.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    log::info!("Connecting to database...");
    let db_conn = db::connect_from_env()
        .await
        .expect("Failed to connect to database");

    log::info!("Running migrations...");
    run_migrations(db_conn.as_ref())
        .await
        .expect("Failed to run migrations");

    let state = web::Data::new(AppState {
        db: Arc::from(db_conn),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .route("/", web::get().to(handlers::index))
            .route("/health", web::get().to(handlers::health))
            .route(
                "/households/point",
                web::post().to(handlers::households_point),
            )
            .route(
                "/population/point",
                web::post().to(handlers::population_point),
            )
            .route("/area/point", web::post().to(handlers::area_point))
            .route(
                "/households/polygon",
                web::post().to(handlers::households_polygon),
            )
            .route(
                "/population/polygon",
                web::post().to(handlers::population_polygon),
            )
            .route("/area/polygon", web::post().to(handlers::area_polygon))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
