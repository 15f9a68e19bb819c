//! Data writers for reports, reduced profiles, and the schema library.
//!
//! Every artifact is written to a hidden sibling file first and renamed into
//! place once complete, so a crash never leaves a truncated report behind.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::schema::ColumnMapping;
use crate::processors::comparison::ComparisonResult;
use crate::processors::reduction::{Channel, ReducedProfile};

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// JSON serialization error.
    #[error("JSON write error for '{path}': {source}")]
    JsonError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to move the finished file into place.
    #[error("failed to replace '{path}': {source}")]
    Rename {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Header of a per-channel comparison report.
pub const REPORT_HEADER: [&str; 5] = [
    "AOA",
    "dcp",
    "upper_bound",
    "lower_bound",
    "pass_fail",
];

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.partial", name))
}

/// Write `path` through a staging file, renaming it into place on success.
fn write_atomically<F>(path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>, &str) -> Result<()>,
{
    ensure_parent_dirs(path)?;

    let staging = staging_path(path);
    let path_str = path.display().to_string();

    let file = File::create(&staging).map_err(|e| WriteError::CreateFile {
        path: staging.display().to_string(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);

    let written = body(&mut writer, &path_str).and_then(|()| {
        writer.flush().map_err(|e| WriteError::WriteFile {
            path: path_str.clone(),
            source: e,
        })
    });
    drop(writer);

    if let Err(e) = written {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }

    fs::rename(&staging, path).map_err(|e| {
        let _ = fs::remove_file(&staging);
        WriteError::Rename {
            path: path_str,
            source: e,
        }
    })
}

/// Write a per-channel comparison report.
///
/// Columns are `AOA, dcp, upper_bound, lower_bound, pass_fail`, one row per
/// compared angle in ascending order.
pub fn write_comparison_report(path: &Path, result: &ComparisonResult) -> Result<()> {
    write_atomically(path, |writer, path_str| {
        let mut csv_writer = csv::Writer::from_writer(writer);
        let csv_err = |e| WriteError::CsvError {
            path: path_str.to_string(),
            source: e,
        };

        csv_writer.write_record(REPORT_HEADER).map_err(csv_err)?;
        for point in &result.points {
            csv_writer
                .write_record(&[
                    point.angle.to_string(),
                    point.difference.to_string(),
                    point.upper.to_string(),
                    point.lower.to_string(),
                    point.verdict.flag().to_string(),
                ])
                .map_err(csv_err)?;
        }

        csv_writer.flush().map_err(|e| WriteError::WriteFile {
            path: path_str.to_string(),
            source: e,
        })
    })
}

/// Write a reduced profile, baseline first, one row per angle group.
///
/// Coefficient cells are left empty for the drift baseline.
pub fn write_reduced_profile(path: &Path, profile: &ReducedProfile) -> Result<()> {
    write_atomically(path, |writer, path_str| {
        let mut csv_writer = csv::Writer::from_writer(writer);
        let csv_err = |e| WriteError::CsvError {
            path: path_str.to_string(),
            source: e,
        };

        let mut header = vec![
            "angle",
            "samples",
            "tunnel_ref_total_pressure",
            "tunnel_ref_static_pressure",
            "uut_total_pressure",
            "uut_static_pressure1",
            "uut_static_pressure2",
            "impact_pressure",
        ];
        header.extend(Channel::ALL.iter().map(|c| c.column_name()));
        csv_writer.write_record(&header).map_err(csv_err)?;

        for (angle, record) in profile.iter() {
            let p = &record.pressures;
            let mut fields = vec![
                angle.to_string(),
                record.samples.to_string(),
                p.tunnel_ref_total.to_string(),
                p.tunnel_ref_static.to_string(),
                p.uut_total.to_string(),
                p.uut_static1.to_string(),
                p.uut_static2.to_string(),
                record.impact_pressure.to_string(),
            ];
            for channel in Channel::ALL {
                fields.push(
                    record
                        .coefficients
                        .map(|c| c.get(channel).to_string())
                        .unwrap_or_default(),
                );
            }
            csv_writer.write_record(&fields).map_err(csv_err)?;
        }

        csv_writer.flush().map_err(|e| WriteError::WriteFile {
            path: path_str.to_string(),
            source: e,
        })
    })
}

/// Rewrite the whole schema library file.
pub fn write_schema_library(path: &Path, entries: &BTreeMap<String, ColumnMapping>) -> Result<()> {
    write_atomically(path, |writer, path_str| {
        serde_json::to_writer_pretty(&mut *writer, entries).map_err(|e| WriteError::JsonError {
            path: path_str.to_string(),
            source: e,
        })?;
        writeln!(writer).map_err(|e| WriteError::WriteFile {
            path: path_str.to_string(),
            source: e,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::angle::MarkerAngleParser;
    use crate::core::loaders::RawTable;
    use crate::core::schema::tests::fixture_mapping;
    use crate::processors::comparison::{ComparisonPoint, ToleranceBand, Verdict};
    use crate::processors::reduction::reduce;
    use crate::processors::reduction::tests::{aoa, row};
    use std::fs;
    use tempfile::tempdir;

    fn create_test_result() -> ComparisonResult {
        let band = ToleranceBand::new(0.005);
        let points = [(-10, 0.001, Verdict::Pass), (0, -0.0075, Verdict::Fail)]
            .into_iter()
            .map(|(angle, difference, verdict)| ComparisonPoint {
                angle,
                difference,
                upper: band.upper(angle),
                lower: band.lower(angle),
                verdict,
            })
            .collect();
        ComparisonResult {
            channel: Channel::TotalPressure,
            band,
            points,
        }
    }

    #[test]
    fn test_write_comparison_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.csv");

        write_comparison_report(&path, &create_test_result()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines[0], "AOA,dcp,upper_bound,lower_bound,pass_fail");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("-10,0.001,"));
        assert!(lines[1].ends_with(",P"));
        assert_eq!(lines[2], "0,-0.0075,0.005,-0.005,F");
    }

    #[test]
    fn test_write_leaves_no_staging_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("report.csv");

        write_comparison_report(&path, &create_test_result()).unwrap();

        assert!(path.exists());
        let names: Vec<String> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["report.csv".to_string()]);
    }

    #[test]
    fn test_write_reduced_profile() {
        let table = RawTable::from_rows(vec![
            row("Drift Data", [10.0, 10.0, 10.0, 10.0, 10.0]),
            row(&aoa(0), [110.0, 110.0, 10.0, 10.0, 10.0]),
        ]);
        let parser = MarkerAngleParser::default();
        let profile = reduce(&table, &fixture_mapping(), &parser).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.csv");
        write_reduced_profile(&path, &profile).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(
            "impact_pressure,cp_total_pressure,cp_static_pressure1,cp_static_pressure2"
        ));
        assert_eq!(lines[1], "Drift Data,1,10,10,10,10,10,0,,,");
        assert_eq!(lines[2], "0,1,110,10,110,10,10,100,0,0,0");
    }

    #[test]
    fn test_write_schema_library_uses_string_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("knownHeaders.txt");
        let mut entries = BTreeMap::new();
        entries.insert("rig-a".to_string(), fixture_mapping());

        write_schema_library(&path, &entries).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["rig-a"]["0"], "angle");
        assert_eq!(json["rig-a"]["3"], "tempF");
    }
}
