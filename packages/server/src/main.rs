#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Binary entry point for the region aggregate API server.
//!
//! Runs headless by default; pass `--interactive` to be prompted for the
//! bind address and port first.

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if std::env::args().any(|arg| arg == "--interactive") {
        region_mark_server::interactive::run().await
    } else {
        region_mark_server::run_server().await
    }
}
