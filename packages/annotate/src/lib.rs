#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Annotation toolkit for the region aggregate service.
//!
//! Replaces the original browser map page with an explicit per-session
//! state machine: the user captures one polygon region at a time, the
//! service is asked for the three aggregates, custom fields get attached,
//! and committed rows accumulate in an append-only session table that
//! exports to CSV (spreadsheet-friendly, BOM-prefixed) or GeoJSON.

pub mod client;
pub mod export;
pub mod session;

pub use client::{ClientError, QueryClient};
pub use export::ExportError;
pub use session::{
    AnnotationRow, AnnotationSession, DrawnRegion, FieldDef, FieldKind, FieldValue, RegionStats,
    SessionError, SessionState,
};
