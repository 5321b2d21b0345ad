#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal annotation client for the region aggregate service.
//!
//! Stands in for the original browser map page: paste a WKT ring instead
//! of tracing one, and the tool fetches the three aggregates, collects
//! custom field values, accumulates rows, and exports CSV/GeoJSON files
//! named after the dataset.

use std::collections::BTreeMap;

use clap::Parser;
use dialoguer::{Input, Select};
use region_mark_annotate::{
    AnnotationSession, FieldKind, FieldValue, QueryClient, SessionError,
};
use region_mark_geometry::RegionPolygon;

#[derive(Parser)]
#[command(
    name = "region-mark-annotate",
    about = "Annotate polygon regions with aggregates and custom fields"
)]
struct Args {
    /// Base URL of the running query service.
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    service_url: String,

    /// Dataset name, used as the export file stem.
    #[arg(long)]
    dataset: Option<String>,
}

/// Top-level menu actions.
enum Action {
    MarkRegion,
    AddField,
    CommitRow,
    ListRows,
    EditRow,
    DeleteRow,
    ExportCsv,
    ExportGeoJson,
    Quit,
}

impl Action {
    const ALL: &[Self] = &[
        Self::MarkRegion,
        Self::AddField,
        Self::CommitRow,
        Self::ListRows,
        Self::EditRow,
        Self::DeleteRow,
        Self::ExportCsv,
        Self::ExportGeoJson,
        Self::Quit,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::MarkRegion => "Mark a region (paste WKT)",
            Self::AddField => "Add a custom field",
            Self::CommitRow => "Commit the current region as a row",
            Self::ListRows => "List committed rows",
            Self::EditRow => "Edit a row",
            Self::DeleteRow => "Delete a row",
            Self::ExportCsv => "Export CSV",
            Self::ExportGeoJson => "Export GeoJSON",
            Self::Quit => "Quit",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let args = Args::parse();

    let dataset = match args.dataset {
        Some(name) => name,
        None => Input::new()
            .with_prompt("Dataset name")
            .default("annotations".to_string())
            .interact_text()?,
    };

    let client = QueryClient::new(&args.service_url);
    let mut session = AnnotationSession::new();

    println!("Region Mark Annotator");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    loop {
        let idx = Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact()?;

        match Action::ALL[idx] {
            Action::MarkRegion => mark_region(&client, &mut session).await,
            Action::AddField => add_field(&mut session)?,
            Action::CommitRow => commit_row(&mut session)?,
            Action::ListRows => list_rows(&session),
            Action::EditRow => edit_row(&mut session)?,
            Action::DeleteRow => delete_row(&mut session)?,
            Action::ExportCsv => match session.export_csv() {
                Ok(bytes) => {
                    let path = format!("{dataset}.csv");
                    std::fs::write(&path, bytes)?;
                    println!("Wrote {path}");
                }
                Err(e) => println!("Note: {e}"),
            },
            Action::ExportGeoJson => match session.export_geojson() {
                Ok(doc) => {
                    let path = format!("{dataset}.geojson");
                    std::fs::write(&path, doc)?;
                    println!("Wrote {path}");
                }
                Err(e) => println!("Note: {e}"),
            },
            Action::Quit => break,
        }
        println!();
    }

    Ok(())
}

/// Prompts for a WKT ring, fetches its aggregates, and stores it as the
/// session's drawn region.
async fn mark_region(client: &QueryClient, session: &mut AnnotationSession) {
    let text: String = match Input::new().with_prompt("WKT polygon").interact_text() {
        Ok(text) => text,
        Err(_) => return,
    };

    let polygon = match RegionPolygon::parse(&text) {
        Ok(polygon) => polygon,
        Err(e) => {
            println!("Note: {e}");
            return;
        }
    };

    session.begin_region();
    match client.region_stats(&polygon).await {
        Ok(stats) => {
            println!(
                "Area: {} m² | Households: {} | Population: {}",
                stats.area, stats.households, stats.population
            );
            // begin_region just ran, so this transition cannot fail.
            let _ = session.complete_region(polygon, stats);
        }
        Err(e) => println!("Note: {e}"),
    }
}

fn add_field(session: &mut AnnotationSession) -> Result<(), Box<dyn std::error::Error>> {
    let name: String = Input::new().with_prompt("Field name").interact_text()?;

    let kinds = ["text", "number"];
    let kind_idx = Select::new()
        .with_prompt("Field type")
        .items(&kinds)
        .default(0)
        .interact()?;
    let kind: FieldKind = kinds[kind_idx].parse()?;

    match session.add_field(&name, kind) {
        Ok(()) => println!("Added field '{}'", name.trim()),
        Err(e) => println!("Note: {e}"),
    }
    Ok(())
}

/// Prompts for a value per defined field; empty answers leave the cell
/// blank.
fn prompt_values(
    session: &AnnotationSession,
) -> Result<BTreeMap<String, FieldValue>, Box<dyn std::error::Error>> {
    let mut values = BTreeMap::new();

    for field in session.fields().to_vec() {
        let raw: String = Input::new()
            .with_prompt(format!("{} ({})", field.name, field.kind))
            .allow_empty(true)
            .interact_text()?;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        match field.kind {
            FieldKind::Text => {
                values.insert(field.name.clone(), FieldValue::Text(raw.to_string()));
            }
            FieldKind::Number => match raw.parse::<f64>() {
                Ok(number) => {
                    values.insert(field.name.clone(), FieldValue::Number(number));
                }
                Err(_) => println!("Note: '{raw}' is not a number, leaving '{}' empty", field.name),
            },
        }
    }

    Ok(values)
}

fn commit_row(session: &mut AnnotationSession) -> Result<(), Box<dyn std::error::Error>> {
    if session.current_region().is_none() {
        // Same inline nudge the map page showed for an empty selection.
        println!("Note: {}", SessionError::NoRegionDrawn);
        return Ok(());
    }

    let values = prompt_values(session)?;
    match session.commit(values) {
        Ok(index) => println!("Committed row {}", index + 1),
        Err(e) => println!("Note: {e}"),
    }
    Ok(())
}

fn list_rows(session: &AnnotationSession) {
    if session.rows().is_empty() {
        println!("No rows committed yet.");
        return;
    }

    for (i, row) in session.rows().iter().enumerate() {
        let custom: Vec<String> = session
            .fields()
            .iter()
            .map(|f| {
                let value = row
                    .values
                    .get(&f.name)
                    .map(ToString::to_string)
                    .unwrap_or_default();
                format!("{}={value}", f.name)
            })
            .collect();
        println!(
            "{:>3}. area={} households={} population={} {} | {}",
            i + 1,
            row.stats.area,
            row.stats.households,
            row.stats.population,
            custom.join(" "),
            truncate(&row.region_wkt, 48),
        );
    }
}

fn edit_row(session: &mut AnnotationSession) -> Result<(), Box<dyn std::error::Error>> {
    let Some(index) = prompt_row_number(session)? else {
        return Ok(());
    };
    let values = prompt_values(session)?;
    match session.edit_row(index, values) {
        Ok(()) => println!("Updated row {}", index + 1),
        Err(e) => println!("Note: {e}"),
    }
    Ok(())
}

fn delete_row(session: &mut AnnotationSession) -> Result<(), Box<dyn std::error::Error>> {
    let Some(index) = prompt_row_number(session)? else {
        return Ok(());
    };
    match session.delete_row(index) {
        Ok(_) => println!("Deleted row {}", index + 1),
        Err(e) => println!("Note: {e}"),
    }
    Ok(())
}

/// Prompts for a 1-based row number; `None` when the table is empty.
fn prompt_row_number(
    session: &AnnotationSession,
) -> Result<Option<usize>, Box<dyn std::error::Error>> {
    if session.rows().is_empty() {
        println!("No rows committed yet.");
        return Ok(None);
    }

    let number: usize = Input::new()
        .with_prompt(format!("Row number (1-{})", session.rows().len()))
        .interact_text()?;
    Ok(number.checked_sub(1))
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        format!("{}...", &text[..max])
    }
}
