//! Per-session annotation state machine.
//!
//! One region may be in progress at a time; starting a new drawing
//! discards the uncommitted one. Committed rows live in an append-only
//! ordered table scoped to this session — nothing is shared across
//! sessions or persisted beyond export.

use std::collections::BTreeMap;

use region_mark_geometry::RegionPolygon;
use strum_macros::{Display, EnumString};
use thiserror::Error;

use crate::export::{self, ExportError};

/// Value type of a user-defined annotation column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FieldKind {
    /// Free text.
    Text,
    /// A numeric value.
    Number,
}

/// A value supplied for a user-defined column.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Free text.
    Text(String),
    /// A numeric value.
    Number(f64),
}

impl FieldValue {
    /// The kind this value satisfies.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::Text(_) => FieldKind::Text,
            Self::Number(_) => FieldKind::Number,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

/// A user-defined annotation column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Column name.
    pub name: String,
    /// Value type.
    pub kind: FieldKind,
}

/// The three aggregates the query service computes for a drawn region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionStats {
    /// Region area in square meters.
    pub area: f64,
    /// Household points inside the region.
    pub households: i64,
    /// Population sum over qualifying units.
    pub population: i64,
}

/// The in-progress region: a validated ring plus its fetched aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnRegion {
    /// The validated ring.
    pub polygon: RegionPolygon,
    /// Aggregates fetched on draw-complete.
    pub stats: RegionStats,
}

/// One committed annotation: region text, aggregates, and custom values.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRow {
    /// The region's WKT text as validated at draw time.
    pub region_wkt: String,
    /// Aggregates captured at draw time.
    pub stats: RegionStats,
    /// Custom column values, keyed by field name. Fields with no value for
    /// this row export as empty cells.
    pub values: BTreeMap<String, FieldValue>,
}

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No region yet.
    Idle,
    /// A drawing has been started but not completed.
    Drawing,
    /// A region is drawn and its aggregates are displayed.
    RegionDrawn,
    /// At least one row has been committed.
    Annotated,
    /// The table has been exported.
    Exported,
}

/// Errors from session operations.
#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    /// Commit was attempted with no drawn region. Surfaced to the user as
    /// an inline warning, not a hard failure.
    #[error("no region has been drawn yet, mark one before committing")]
    NoRegionDrawn,

    /// `complete_region` was called without `begin_region`.
    #[error("no drawing is in progress")]
    NoDrawingInProgress,

    /// A field with this name already exists.
    #[error("field '{0}' is already defined")]
    DuplicateField(String),

    /// Field names must be non-empty.
    #[error("field name cannot be empty")]
    EmptyFieldName,

    /// A value referenced a field that was never defined.
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// A value's type does not match its field definition.
    #[error("value for field '{name}' must be {expected}")]
    FieldTypeMismatch {
        /// Field name.
        name: String,
        /// The kind the field was defined with.
        expected: FieldKind,
    },

    /// A row index pointed past the end of the table.
    #[error("row index {0} is out of range")]
    RowOutOfRange(usize),
}

/// A single user's annotation session.
#[derive(Debug)]
pub struct AnnotationSession {
    state: SessionState,
    fields: Vec<FieldDef>,
    current: Option<DrawnRegion>,
    rows: Vec<AnnotationRow>,
}

impl Default for AnnotationSession {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            fields: Vec::new(),
            current: None,
            rows: Vec::new(),
        }
    }
}

impl AnnotationSession {
    /// Creates an empty session in the idle state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of the session machine.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Defined custom columns, in definition order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Committed rows, in commit order.
    #[must_use]
    pub fn rows(&self) -> &[AnnotationRow] {
        &self.rows
    }

    /// The drawn-but-uncommitted region, if any.
    #[must_use]
    pub const fn current_region(&self) -> Option<&DrawnRegion> {
        self.current.as_ref()
    }

    /// Starts a new drawing, discarding any uncommitted region.
    pub fn begin_region(&mut self) {
        self.current = None;
        self.state = SessionState::Drawing;
    }

    /// Completes the in-progress drawing with the validated ring and the
    /// aggregates fetched from the query service.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoDrawingInProgress`] unless
    /// [`Self::begin_region`] was called first.
    pub fn complete_region(
        &mut self,
        polygon: RegionPolygon,
        stats: RegionStats,
    ) -> Result<(), SessionError> {
        if self.state() != SessionState::Drawing {
            return Err(SessionError::NoDrawingInProgress);
        }
        self.current = Some(DrawnRegion { polygon, stats });
        self.state = SessionState::RegionDrawn;
        Ok(())
    }

    /// Defines a new custom column.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the name is empty or already defined.
    pub fn add_field(&mut self, name: &str, kind: FieldKind) -> Result<(), SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyFieldName);
        }
        if self.fields.iter().any(|f| f.name == name) {
            return Err(SessionError::DuplicateField(name.to_string()));
        }
        self.fields.push(FieldDef {
            name: name.to_string(),
            kind,
        });
        Ok(())
    }

    /// Commits the drawn region plus `values` as a new row and clears the
    /// drawing, mirroring the map layer reset after a successful insert.
    ///
    /// Returns the index of the committed row.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoRegionDrawn`] when nothing is drawn, or a
    /// field error when `values` does not match the defined columns.
    pub fn commit(
        &mut self,
        values: BTreeMap<String, FieldValue>,
    ) -> Result<usize, SessionError> {
        let Some(region) = self.current.take() else {
            return Err(SessionError::NoRegionDrawn);
        };
        if let Err(e) = self.check_values(&values) {
            // Failed commits keep the drawn region so the user can retry.
            self.current = Some(region);
            return Err(e);
        }

        self.rows.push(AnnotationRow {
            region_wkt: region.polygon.as_wkt().to_string(),
            stats: region.stats,
            values,
        });
        self.state = SessionState::Annotated;
        Ok(self.rows.len() - 1)
    }

    /// Replaces the custom values of an existing row.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the index is out of range or the values
    /// do not match the defined columns.
    pub fn edit_row(
        &mut self,
        index: usize,
        values: BTreeMap<String, FieldValue>,
    ) -> Result<(), SessionError> {
        self.check_values(&values)?;
        let row = self
            .rows
            .get_mut(index)
            .ok_or(SessionError::RowOutOfRange(index))?;
        row.values = values;
        Ok(())
    }

    /// Removes a row from the table.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::RowOutOfRange`] if the index is out of range.
    pub fn delete_row(&mut self, index: usize) -> Result<AnnotationRow, SessionError> {
        if index >= self.rows.len() {
            return Err(SessionError::RowOutOfRange(index));
        }
        let row = self.rows.remove(index);
        if self.rows.is_empty() && self.state() == SessionState::Annotated {
            self.state = if self.current.is_some() {
                SessionState::RegionDrawn
            } else {
                SessionState::Idle
            };
        }
        Ok(row)
    }

    /// Serializes the table as BOM-prefixed CSV and marks the session
    /// exported.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] if the table is empty or serialization fails.
    pub fn export_csv(&mut self) -> Result<Vec<u8>, ExportError> {
        let bytes = export::rows_to_csv(&self.fields, &self.rows)?;
        self.state = SessionState::Exported;
        Ok(bytes)
    }

    /// Serializes the table as a GeoJSON feature collection (each row's
    /// stored WKT re-parsed into a geometry) and marks the session
    /// exported.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] if the table is empty, a stored region fails
    /// to re-parse, or serialization fails.
    pub fn export_geojson(&mut self) -> Result<String, ExportError> {
        let doc = export::rows_to_geojson(&self.fields, &self.rows)?;
        self.state = SessionState::Exported;
        Ok(doc)
    }

    fn check_values(&self, values: &BTreeMap<String, FieldValue>) -> Result<(), SessionError> {
        for (name, value) in values {
            let Some(def) = self.fields.iter().find(|f| &f.name == name) else {
                return Err(SessionError::UnknownField(name.clone()));
            };
            if def.kind != value.kind() {
                return Err(SessionError::FieldTypeMismatch {
                    name: name.clone(),
                    expected: def.kind,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RING: &str =
        "POLYGON((120.1828 22.9961, 120.1811 22.9869, 120.1906 22.9926, 120.1828 22.9961))";

    fn stats() -> RegionStats {
        RegionStats {
            area: 35120.55,
            households: 42,
            population: 1375,
        }
    }

    fn drawn_session() -> AnnotationSession {
        let mut session = AnnotationSession::new();
        session.begin_region();
        session
            .complete_region(RegionPolygon::parse(RING).unwrap(), stats())
            .unwrap();
        session
    }

    #[test]
    fn starts_idle() {
        let session = AnnotationSession::new();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.rows().is_empty());
    }

    #[test]
    fn draw_complete_reaches_region_drawn() {
        let session = drawn_session();
        assert_eq!(session.state(), SessionState::RegionDrawn);
        assert_eq!(session.current_region().unwrap().polygon.as_wkt(), RING);
    }

    #[test]
    fn complete_without_begin_is_rejected() {
        let mut session = AnnotationSession::new();
        assert_eq!(
            session.complete_region(RegionPolygon::parse(RING).unwrap(), stats()),
            Err(SessionError::NoDrawingInProgress)
        );
    }

    #[test]
    fn redraw_discards_uncommitted_region() {
        let mut session = drawn_session();
        session.begin_region();
        assert_eq!(session.state(), SessionState::Drawing);
        assert!(session.current_region().is_none());
    }

    #[test]
    fn commit_without_region_is_inline_warning() {
        let mut session = AnnotationSession::new();
        assert_eq!(
            session.commit(BTreeMap::new()),
            Err(SessionError::NoRegionDrawn)
        );
    }

    #[test]
    fn commit_appends_row_and_clears_drawing() {
        let mut session = drawn_session();
        let index = session.commit(BTreeMap::new()).unwrap();
        assert_eq!(index, 0);
        assert_eq!(session.state(), SessionState::Annotated);
        assert!(session.current_region().is_none());
        assert_eq!(session.rows()[0].region_wkt, RING);
        assert_eq!(session.rows()[0].stats.households, 42);
    }

    #[test]
    fn commit_validates_field_names_and_kinds() {
        let mut session = drawn_session();
        session.add_field("owner", FieldKind::Text).unwrap();

        let mut unknown = BTreeMap::new();
        unknown.insert("rent".to_string(), FieldValue::Number(12.0));
        assert_eq!(
            session.commit(unknown),
            Err(SessionError::UnknownField("rent".to_string()))
        );
        // The drawn region survives a failed commit.
        assert!(session.current_region().is_some());

        let mut mismatched = BTreeMap::new();
        mismatched.insert("owner".to_string(), FieldValue::Number(3.0));
        assert_eq!(
            session.commit(mismatched),
            Err(SessionError::FieldTypeMismatch {
                name: "owner".to_string(),
                expected: FieldKind::Text,
            })
        );

        let mut good = BTreeMap::new();
        good.insert("owner".to_string(), FieldValue::Text("city".to_string()));
        assert!(session.commit(good).is_ok());
    }

    #[test]
    fn rejects_duplicate_and_empty_fields() {
        let mut session = AnnotationSession::new();
        session.add_field("note", FieldKind::Text).unwrap();
        assert_eq!(
            session.add_field("note", FieldKind::Number),
            Err(SessionError::DuplicateField("note".to_string()))
        );
        assert_eq!(
            session.add_field("   ", FieldKind::Text),
            Err(SessionError::EmptyFieldName)
        );
    }

    #[test]
    fn edit_replaces_values() {
        let mut session = drawn_session();
        session.add_field("note", FieldKind::Text).unwrap();
        session.commit(BTreeMap::new()).unwrap();

        let mut values = BTreeMap::new();
        values.insert("note".to_string(), FieldValue::Text("park".to_string()));
        session.edit_row(0, values).unwrap();
        assert_eq!(
            session.rows()[0].values["note"],
            FieldValue::Text("park".to_string())
        );

        assert_eq!(
            session.edit_row(5, BTreeMap::new()),
            Err(SessionError::RowOutOfRange(5))
        );
    }

    #[test]
    fn delete_removes_row_and_rewinds_state() {
        let mut session = drawn_session();
        session.commit(BTreeMap::new()).unwrap();
        assert_eq!(session.state(), SessionState::Annotated);

        let removed = session.delete_row(0).unwrap();
        assert_eq!(removed.region_wkt, RING);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(
            session.delete_row(0),
            Err(SessionError::RowOutOfRange(0))
        );
    }

    #[test]
    fn export_marks_session_exported() {
        let mut session = drawn_session();
        session.commit(BTreeMap::new()).unwrap();
        session.export_csv().unwrap();
        assert_eq!(session.state(), SessionState::Exported);
    }

    #[test]
    fn field_kind_parses_from_menu_labels() {
        assert_eq!("text".parse::<FieldKind>().unwrap(), FieldKind::Text);
        assert_eq!("number".parse::<FieldKind>().unwrap(), FieldKind::Number);
        assert!("date".parse::<FieldKind>().is_err());
    }
}
