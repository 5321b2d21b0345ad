//! Exporters for the accumulated annotation table.
//!
//! CSV output is prefixed with a UTF-8 byte-order marker so spreadsheet
//! applications detect the encoding. GeoJSON output re-parses each row's
//! stored WKT back into a geometry, so a corrupted region string fails the
//! export instead of producing a document with missing shapes.

use region_mark_geometry::RegionPolygon;
use thiserror::Error;

use crate::session::{AnnotationRow, FieldDef, FieldValue};

/// UTF-8 byte-order marker, expected by spreadsheet CSV importers.
const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Errors from serializing the annotation table.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The table has no rows.
    #[error("nothing to export, commit at least one row first")]
    NothingToExport,

    /// CSV serialization failed.
    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),

    /// The CSV buffer could not be finalized.
    #[error("CSV buffer error: {message}")]
    CsvBuffer {
        /// Description of what went wrong.
        message: String,
    },

    /// A stored region string no longer parses as a valid ring.
    #[error("stored region failed to re-parse: {0}")]
    Geometry(#[from] region_mark_geometry::GeometryError),
}

/// Serializes the table as CSV: custom columns first (definition order),
/// then `polygon`, `area`, `households`, `population`.
///
/// # Errors
///
/// Returns [`ExportError`] if the table is empty or serialization fails.
pub fn rows_to_csv(fields: &[FieldDef], rows: &[AnnotationRow]) -> Result<Vec<u8>, ExportError> {
    if rows.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let mut buf = Vec::from(UTF8_BOM);
    {
        let mut writer = csv::Writer::from_writer(&mut buf);

        let mut header: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        header.extend(["polygon", "area", "households", "population"]);
        writer.write_record(&header)?;

        for row in rows {
            let mut record: Vec<String> = fields
                .iter()
                .map(|f| {
                    row.values
                        .get(&f.name)
                        .map(ToString::to_string)
                        .unwrap_or_default()
                })
                .collect();
            record.push(row.region_wkt.clone());
            record.push(row.stats.area.to_string());
            record.push(row.stats.households.to_string());
            record.push(row.stats.population.to_string());
            writer.write_record(&record)?;
        }

        writer.flush().map_err(|e| ExportError::CsvBuffer {
            message: e.to_string(),
        })?;
    }

    Ok(buf)
}

/// Serializes the table as a GeoJSON `FeatureCollection`, one feature per
/// row with the aggregates and custom values as properties.
///
/// # Errors
///
/// Returns [`ExportError`] if the table is empty or a stored region fails
/// to re-parse.
pub fn rows_to_geojson(fields: &[FieldDef], rows: &[AnnotationRow]) -> Result<String, ExportError> {
    if rows.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let mut features = Vec::with_capacity(rows.len());

    for row in rows {
        let region = RegionPolygon::parse(&row.region_wkt)?;

        let mut properties = serde_json::Map::new();
        for field in fields {
            let value = row.values.get(&field.name).map_or(
                serde_json::Value::Null,
                |v| match v {
                    FieldValue::Text(text) => serde_json::json!(text),
                    FieldValue::Number(number) => serde_json::json!(number),
                },
            );
            properties.insert(field.name.clone(), value);
        }
        properties.insert("area".to_string(), serde_json::json!(row.stats.area));
        properties.insert(
            "households".to_string(),
            serde_json::json!(row.stats.households),
        );
        properties.insert(
            "population".to_string(),
            serde_json::json!(row.stats.population),
        );

        features.push(geojson::Feature {
            bbox: None,
            geometry: Some(region.to_geojson_geometry()),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    let collection = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    Ok(geojson::GeoJson::from(collection).to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::session::{FieldKind, RegionStats};

    const RING: &str =
        "POLYGON((120.1828 22.9961, 120.1811 22.9869, 120.1906 22.9926, 120.1828 22.9961))";

    fn sample_fields() -> Vec<FieldDef> {
        vec![
            FieldDef {
                name: "name".to_string(),
                kind: FieldKind::Text,
            },
            FieldDef {
                name: "floors".to_string(),
                kind: FieldKind::Number,
            },
        ]
    }

    fn sample_rows() -> Vec<AnnotationRow> {
        let mut values = BTreeMap::new();
        values.insert("name".to_string(), FieldValue::Text("old town".to_string()));
        values.insert("floors".to_string(), FieldValue::Number(5.0));

        vec![
            AnnotationRow {
                region_wkt: RING.to_string(),
                stats: RegionStats {
                    area: 35120.55,
                    households: 42,
                    population: 1375,
                },
                values,
            },
            AnnotationRow {
                region_wkt: RING.to_string(),
                stats: RegionStats {
                    area: 100.0,
                    households: 0,
                    population: 0,
                },
                values: BTreeMap::new(),
            },
        ]
    }

    #[test]
    fn csv_starts_with_utf8_bom() {
        let bytes = rows_to_csv(&sample_fields(), &sample_rows()).unwrap();
        assert_eq!(&bytes[..3], b"\xef\xbb\xbf");
    }

    #[test]
    fn csv_orders_custom_columns_before_aggregates() {
        let bytes = rows_to_csv(&sample_fields(), &sample_rows()).unwrap();
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "name,floors,polygon,area,households,population"
        );
        let first = lines.next().unwrap();
        assert!(first.starts_with("old town,5,"));
        assert!(first.ends_with(",35120.55,42,1375"));
    }

    #[test]
    fn csv_leaves_missing_values_empty() {
        let bytes = rows_to_csv(&sample_fields(), &sample_rows()).unwrap();
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let second_row = text.lines().nth(2).unwrap();
        assert!(second_row.starts_with(",,"));
    }

    #[test]
    fn csv_rejects_empty_table() {
        assert!(matches!(
            rows_to_csv(&sample_fields(), &[]),
            Err(ExportError::NothingToExport)
        ));
    }

    #[test]
    fn geojson_contains_one_feature_per_row() {
        let doc = rows_to_geojson(&sample_fields(), &sample_rows()).unwrap();
        let parsed: geojson::GeoJson = doc.parse().unwrap();
        let geojson::GeoJson::FeatureCollection(collection) = parsed else {
            panic!("expected a feature collection");
        };
        assert_eq!(collection.features.len(), 2);

        let first = &collection.features[0];
        assert!(matches!(
            first.geometry.as_ref().unwrap().value,
            geojson::Value::Polygon(_)
        ));
        let properties = first.properties.as_ref().unwrap();
        assert_eq!(properties["name"], "old town");
        assert_eq!(properties["households"], 42);
    }

    #[test]
    fn geojson_fails_on_corrupted_region_text() {
        let mut rows = sample_rows();
        rows[0].region_wkt = "POLYGON((0 0, 1 1))".to_string();
        assert!(matches!(
            rows_to_geojson(&sample_fields(), &rows),
            Err(ExportError::Geometry(_))
        ));
    }
}
