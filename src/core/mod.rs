//! Core data types and I/O operations.

pub mod angle;
pub mod loaders;
pub mod schema;
pub mod writers;

pub use angle::{AngleParser, MarkerAngleParser, NormalizedAngle, RegexAngleParser};
pub use loaders::{load_raw_table, RawTable};
pub use schema::{ColumnMapping, Field, SchemaLibrary, SchemaStore};
pub use writers::{write_comparison_report, write_reduced_profile, WriteError};
