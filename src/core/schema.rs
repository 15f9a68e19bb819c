//! Physical column schema and the persisted schema library.
//!
//! Raw tunnel logs carry no trustworthy column names, so each probe file is
//! labelled with a [`ColumnMapping`] from column position to [`Field`].
//! Mappings that operators have built before are kept in a [`SchemaLibrary`]
//! (a JSON file, `knownHeaders.txt` by default) keyed by schema name.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::writers::{self, WriteError};
use crate::processors::resolver::PromptError;

/// Errors raised while building, validating, or persisting column mappings.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("mapping is missing required fields: {}", join_fields(.0))]
    MissingFields(Vec<Field>),

    #[error("field {field} is mapped to both column {first} and column {second}")]
    DuplicateField {
        field: Field,
        first: usize,
        second: usize,
    },

    #[error("column {column} is already assigned to {existing}, cannot also hold {field}")]
    DuplicateColumn {
        column: usize,
        existing: Field,
        field: Field,
    },

    #[error("column {column} for {field} is out of range (table has {width} columns)")]
    ColumnOutOfRange {
        column: usize,
        field: Field,
        width: usize,
    },

    #[error("unknown schema '{0}'")]
    UnknownSchema(String),

    #[error("failed to read schema library '{path}': {source}")]
    LibraryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema library '{path}' is not valid JSON: {source}")]
    LibraryFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to save schema library: {0}")]
    Persist(#[from] WriteError),

    #[error("prompt failed: {0}")]
    Prompt(#[from] PromptError),
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

/// One of the nine physical quantities a probe log must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Angle,
    TunnelRefTotalPressure,
    UutTotalPressure,
    TunnelRefStaticPressure,
    UutStaticPressure1,
    UutStaticPressure2,
    Date,
    Time,
    #[serde(rename = "tempF")]
    TempF,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Angle,
        Field::TunnelRefTotalPressure,
        Field::UutTotalPressure,
        Field::TunnelRefStaticPressure,
        Field::UutStaticPressure1,
        Field::UutStaticPressure2,
        Field::Date,
        Field::Time,
        Field::TempF,
    ];

    /// Stored name, as written to the schema library.
    pub fn name(self) -> &'static str {
        match self {
            Field::Angle => "angle",
            Field::TunnelRefTotalPressure => "tunnel_ref_total_pressure",
            Field::UutTotalPressure => "uut_total_pressure",
            Field::TunnelRefStaticPressure => "tunnel_ref_static_pressure",
            Field::UutStaticPressure1 => "uut_static_pressure1",
            Field::UutStaticPressure2 => "uut_static_pressure2",
            Field::Date => "date",
            Field::Time => "time",
            Field::TempF => "tempF",
        }
    }

    /// Human-readable label shown to the operator.
    pub fn label(self) -> &'static str {
        match self {
            Field::Angle => "angle",
            Field::TunnelRefTotalPressure => "tunnel reference total pressure",
            Field::UutTotalPressure => "unit under test total pressure",
            Field::TunnelRefStaticPressure => "tunnel reference static pressure",
            Field::UutStaticPressure1 => "unit under test static pressure 1",
            Field::UutStaticPressure2 => "unit under test static pressure 2",
            Field::Date => "date",
            Field::Time => "time",
            Field::TempF => "temperature in F",
        }
    }

    /// Fields in the order they are asked for during manual assignment
    /// (lexicographic by label).
    pub fn prompt_order() -> Vec<Field> {
        let mut fields = Self::ALL.to_vec();
        fields.sort_by_key(|f| f.label());
        fields
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated mapping from raw column position to [`Field`].
///
/// Every field is present exactly once. Values can only be obtained through
/// [`ColumnMapping::from_columns`] (or deserialization, which goes through it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<usize, Field>",
    into = "BTreeMap<usize, Field>"
)]
pub struct ColumnMapping {
    columns: BTreeMap<usize, Field>,
    by_field: [usize; 9],
}

impl ColumnMapping {
    /// Validate a column → field map.
    ///
    /// # Errors
    ///
    /// [`SchemaError::DuplicateField`] when a field appears under two columns,
    /// [`SchemaError::MissingFields`] when any field is absent.
    pub fn from_columns(columns: BTreeMap<usize, Field>) -> Result<Self> {
        let mut seen: [Option<usize>; 9] = [None; 9];
        for (&column, &field) in &columns {
            if let Some(first) = seen[field.index()] {
                return Err(SchemaError::DuplicateField {
                    field,
                    first,
                    second: column,
                });
            }
            seen[field.index()] = Some(column);
        }

        let missing: Vec<Field> = Field::ALL
            .iter()
            .copied()
            .filter(|f| seen[f.index()].is_none())
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError::MissingFields(missing));
        }

        let mut by_field = [0usize; 9];
        for (slot, column) in by_field.iter_mut().zip(seen.iter()) {
            *slot = column.unwrap_or_default();
        }

        Ok(Self { columns, by_field })
    }

    /// Column holding `field`.
    #[inline]
    pub fn column_of(&self, field: Field) -> usize {
        self.by_field[field.index()]
    }

    /// Check every mapped column exists in a table `width` columns wide.
    pub fn validate_width(&self, width: usize) -> Result<()> {
        match self.columns.iter().find(|(&column, _)| column >= width) {
            Some((&column, &field)) => Err(SchemaError::ColumnOutOfRange {
                column,
                field,
                width,
            }),
            None => Ok(()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Field)> + '_ {
        self.columns.iter().map(|(&c, &f)| (c, f))
    }
}

impl TryFrom<BTreeMap<usize, Field>> for ColumnMapping {
    type Error = SchemaError;

    fn try_from(columns: BTreeMap<usize, Field>) -> Result<Self> {
        Self::from_columns(columns)
    }
}

impl From<ColumnMapping> for BTreeMap<usize, Field> {
    fn from(mapping: ColumnMapping) -> Self {
        mapping.columns
    }
}

/// Incremental builder used for manual, one-field-at-a-time assignment.
#[derive(Debug, Clone)]
pub struct MappingBuilder {
    width: usize,
    columns: BTreeMap<usize, Field>,
}

impl MappingBuilder {
    /// Start a mapping for a table `width` columns wide.
    pub fn new(width: usize) -> Self {
        Self {
            width,
            columns: BTreeMap::new(),
        }
    }

    /// Record `field` at `column`.
    ///
    /// # Errors
    ///
    /// Out-of-range columns and columns already holding another field.
    pub fn assign(&mut self, column: usize, field: Field) -> Result<()> {
        if column >= self.width {
            return Err(SchemaError::ColumnOutOfRange {
                column,
                field,
                width: self.width,
            });
        }
        if let Some(&existing) = self.columns.get(&column) {
            return Err(SchemaError::DuplicateColumn {
                column,
                existing,
                field,
            });
        }
        self.columns.insert(column, field);
        Ok(())
    }

    pub fn build(self) -> Result<ColumnMapping> {
        ColumnMapping::from_columns(self.columns)
    }
}

/// Named mapping store consulted by the schema resolver.
pub trait SchemaStore {
    /// Known schema names, sorted.
    fn names(&self) -> Vec<String>;

    fn lookup(&self, name: &str) -> Option<ColumnMapping>;

    /// Store `mapping` under `name`, replacing any previous entry.
    fn save(&mut self, name: &str, mapping: &ColumnMapping) -> Result<()>;
}

/// JSON-file backed [`SchemaStore`].
#[derive(Debug, Clone, Default)]
pub struct SchemaLibrary {
    path: Option<PathBuf>,
    entries: BTreeMap<String, ColumnMapping>,
}

impl SchemaLibrary {
    /// A library that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the library at `path`; a missing file is an empty library.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = read_entries(&path)?;
        log::debug!(
            "Schema library {} holds {} mappings",
            path.display(),
            entries.len()
        );
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn entries(&self) -> &BTreeMap<String, ColumnMapping> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SchemaStore for SchemaLibrary {
    fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn lookup(&self, name: &str) -> Option<ColumnMapping> {
        self.entries.get(name).cloned()
    }

    fn save(&mut self, name: &str, mapping: &ColumnMapping) -> Result<()> {
        let Some(path) = self.path.clone() else {
            self.entries.insert(name.to_string(), mapping.clone());
            return Ok(());
        };

        // Pick up mappings saved by other runs since this library was opened.
        let mut merged = read_entries(&path)?;
        merged.extend(self.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged.insert(name.to_string(), mapping.clone());

        writers::write_schema_library(&path, &merged)?;
        log::info!("Saved schema '{}' to {}", name, path.display());
        self.entries = merged;
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, ColumnMapping>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let content = fs::read_to_string(path).map_err(|e| SchemaError::LibraryRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let raw: BTreeMap<String, BTreeMap<usize, Field>> =
        serde_json::from_str(&content).map_err(|e| SchemaError::LibraryFormat {
            path: path.to_path_buf(),
            source: e,
        })?;

    let mut entries = BTreeMap::new();
    for (name, columns) in raw {
        match ColumnMapping::from_columns(columns) {
            Ok(mapping) => {
                entries.insert(name, mapping);
            }
            Err(e) => log::warn!("Skipping schema '{}' in {}: {}", name, path.display(), e),
        }
    }
    Ok(entries)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::tempdir;

    /// The column layout used by test fixtures throughout the crate.
    pub(crate) fn fixture_mapping() -> ColumnMapping {
        let columns: BTreeMap<usize, Field> = [
            (0, Field::Angle),
            (1, Field::Date),
            (2, Field::Time),
            (3, Field::TempF),
            (4, Field::TunnelRefTotalPressure),
            (5, Field::UutTotalPressure),
            (6, Field::TunnelRefStaticPressure),
            (7, Field::UutStaticPressure1),
            (8, Field::UutStaticPressure2),
        ]
        .into_iter()
        .collect();
        ColumnMapping::from_columns(columns).unwrap()
    }

    #[test]
    fn test_prompt_order_is_sorted_by_label() {
        let labels: Vec<&str> = Field::prompt_order().iter().map(|f| f.label()).collect();
        assert_eq!(
            labels,
            vec![
                "angle",
                "date",
                "temperature in F",
                "time",
                "tunnel reference static pressure",
                "tunnel reference total pressure",
                "unit under test static pressure 1",
                "unit under test static pressure 2",
                "unit under test total pressure",
            ]
        );
    }

    #[test]
    fn test_field_names_match_serde() {
        for field in Field::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.name()));
        }
    }

    #[test]
    fn test_column_of() {
        let mapping = fixture_mapping();
        assert_eq!(mapping.column_of(Field::Angle), 0);
        assert_eq!(mapping.column_of(Field::UutStaticPressure2), 8);
        assert_eq!(mapping.column_of(Field::TempF), 3);
    }

    #[test]
    fn test_missing_fields_rejected() {
        let columns: BTreeMap<usize, Field> =
            [(0, Field::Angle), (1, Field::Date)].into_iter().collect();
        match ColumnMapping::from_columns(columns) {
            Err(SchemaError::MissingFields(missing)) => {
                assert_eq!(missing.len(), 7);
                assert!(missing.contains(&Field::UutTotalPressure));
                assert!(!missing.contains(&Field::Angle));
            }
            other => panic!("Expected MissingFields, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut columns: BTreeMap<usize, Field> = fixture_mapping().into();
        columns.insert(9, Field::Angle);
        match ColumnMapping::from_columns(columns) {
            Err(SchemaError::DuplicateField { field, first, second }) => {
                assert_eq!(field, Field::Angle);
                assert_eq!((first, second), (0, 9));
            }
            other => panic!("Expected DuplicateField, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_width() {
        let mapping = fixture_mapping();
        assert!(mapping.validate_width(9).is_ok());
        match mapping.validate_width(8) {
            Err(SchemaError::ColumnOutOfRange { column, field, width }) => {
                assert_eq!(column, 8);
                assert_eq!(field, Field::UutStaticPressure2);
                assert_eq!(width, 8);
            }
            other => panic!("Expected ColumnOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_builder_rejects_reused_column() {
        let mut builder = MappingBuilder::new(9);
        builder.assign(0, Field::Angle).unwrap();
        assert!(matches!(
            builder.assign(0, Field::Date),
            Err(SchemaError::DuplicateColumn {
                column: 0,
                existing: Field::Angle,
                field: Field::Date
            })
        ));
        assert!(matches!(
            builder.assign(9, Field::Date),
            Err(SchemaError::ColumnOutOfRange { column: 9, .. })
        ));
    }

    #[test]
    fn test_missing_library_is_empty() {
        let dir = tempdir().unwrap();
        let library = SchemaLibrary::open(dir.path().join("knownHeaders.txt")).unwrap();
        assert!(library.is_empty());
        assert!(library.lookup("anything").is_none());
    }

    #[test]
    fn test_library_reads_string_keyed_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("knownHeaders.txt");
        fs::write(
            &path,
            r#"{"rig-a": {"0": "angle", "1": "date", "2": "time", "3": "tempF",
                "4": "tunnel_ref_total_pressure", "5": "uut_total_pressure",
                "6": "tunnel_ref_static_pressure", "7": "uut_static_pressure1",
                "8": "uut_static_pressure2"},
               "broken": {"0": "angle"}}"#,
        )
        .unwrap();

        let library = SchemaLibrary::open(&path).unwrap();
        assert_eq!(library.names(), vec!["rig-a".to_string()]);
        assert_eq!(library.lookup("rig-a"), Some(fixture_mapping()));
    }

    #[test]
    fn test_library_save_rewrites_whole_file_and_merges() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("knownHeaders.txt");

        let mut first = SchemaLibrary::open(&path).unwrap();
        let mut second = SchemaLibrary::open(&path).unwrap();

        first.save("rig-a", &fixture_mapping()).unwrap();
        second.save("rig-b", &fixture_mapping()).unwrap();

        let reopened = SchemaLibrary::open(&path).unwrap();
        assert_eq!(
            reopened.names(),
            vec!["rig-a".to_string(), "rig-b".to_string()]
        );

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["rig-b"]["5"], "uut_total_pressure");
    }

    #[test]
    fn test_library_rejects_malformed_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("knownHeaders.txt");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            SchemaLibrary::open(&path),
            Err(SchemaError::LibraryFormat { .. })
        ));
    }
}
