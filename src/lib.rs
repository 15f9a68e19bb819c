//! Wind-tunnel pressure probe repeatability testing.
//!
//! This crate provides tools for:
//! - Loading tab-delimited tunnel logs and mapping their columns to fields
//! - Averaging readings per angle of attack and removing zero drift
//! - Computing total and static pressure coefficients
//! - Comparing a unit under test against a golden probe inside an
//!   AOA-widening tolerance band, with CSV reports and PNG plots
//!
//! # Example
//!
//! ```no_run
//! use aero_repeatability::config::ToleranceConfig;
//! use aero_repeatability::core::{MarkerAngleParser, SchemaLibrary, SchemaStore};
//! use aero_repeatability::processors::{AeroRepeatability, ProbePair};
//!
//! let library = SchemaLibrary::open("knownHeaders.txt").unwrap();
//! let mapping = library.lookup("rig-a").unwrap();
//! let parser = MarkerAngleParser::default();
//! let pair = ProbePair::load("golden.txt", "unit7.txt", &mapping, &parser).unwrap();
//! let report = AeroRepeatability::new(ToleranceConfig::default(), "reports").run(&pair);
//! println!("{}", report.verdict());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod visualization;

pub use config::{AngleConfig, OutputConfig, PipelineConfig, SchemaConfig, ToleranceConfig};
pub use processors::{Channel, ReducedProfile, Verdict};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
