//! Loader for raw tab-delimited wind-tunnel logs.
//!
//! Tunnel logs carry one header row whose names are not trusted; every
//! column is addressed by position through a resolved
//! [`ColumnMapping`](crate::core::schema::ColumnMapping).

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim};
use thiserror::Error;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("file {0} does not exist")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Rows of raw text cells addressed only by column position.
#[derive(Debug, Clone)]
pub struct RawTable {
    rows: Vec<Vec<String>>,
    /// 1-based source line of each row.
    lines: Vec<usize>,
    width: usize,
}

impl RawTable {
    /// Builds a table from in-memory rows, numbered as if they followed a
    /// header line.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        let lines = (2..rows.len() + 2).collect();
        Self::with_lines(rows, lines)
    }

    fn with_lines(rows: Vec<Vec<String>>, lines: Vec<usize>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        Self { rows, lines, width }
    }

    /// Number of data rows (header excluded).
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns in the widest row.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Source line of row `row`, for diagnostics.
    pub fn line_of(&self, row: usize) -> usize {
        self.lines.get(row).copied().unwrap_or(row + 2)
    }

    /// Renders the first `n` rows with column numbers, for operator prompts.
    pub fn preview(&self, n: usize) -> String {
        let mut out = String::new();
        let header: Vec<String> = (0..self.width).map(|i| i.to_string()).collect();
        out.push_str(&header.join("\t"));
        out.push('\n');
        for row in self.rows.iter().take(n) {
            out.push_str(&row.join("\t"));
            out.push('\n');
        }
        out
    }
}

/// Load a raw tab-delimited table, discarding the header row.
///
/// # Errors
///
/// Returns [`LoaderError::NotFound`] before touching the file when `path`
/// is not a regular file, and [`LoaderError::EmptyFile`] when there are no
/// data rows after the header.
pub fn load_raw_table<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(LoaderError::NotFound(path.to_path_buf()));
    }

    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(BufReader::new(file));

    let mut rows = Vec::new();
    let mut lines = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| LoaderError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map_or(rows.len() + 2, |p| p.line() as usize);
        rows.push(record.iter().map(str::to_string).collect());
        lines.push(line);
    }

    if rows.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    log::debug!("Loaded {} rows from {}", rows.len(), path.display());

    Ok(RawTable::with_lines(rows, lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_raw_table_discards_header() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Label\tDate\tPt").unwrap();
        writeln!(file, "Drift Data\t2019-01-01\t14.7").unwrap();
        writeln!(file, "ATP  at 5 deg AOA\t2019-01-01\t15.2").unwrap();
        file.flush().unwrap();

        let table = load_raw_table(file.path())?;
        assert_eq!(table.len(), 2);
        assert_eq!(table.width(), 3);
        assert_eq!(table.rows()[0][0], "Drift Data");
        assert_eq!(table.rows()[1][2], "15.2");
        assert_eq!((table.line_of(0), table.line_of(1)), (2, 3));

        Ok(())
    }

    #[test]
    fn test_load_raw_table_trims_cells_and_skips_blank_rows() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a\tb").unwrap();
        writeln!(file, " 1.5 \t 2.5").unwrap();
        writeln!(file, "\t").unwrap();
        writeln!(file, "3\t4\t5").unwrap();
        file.flush().unwrap();

        let table = load_raw_table(file.path())?;
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0][0], "1.5");
        assert_eq!(table.width(), 3);
        assert_eq!(table.rows()[0].get(2), None);
        // row after the blank one keeps its file line
        assert_eq!(table.line_of(1), 4);

        Ok(())
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_raw_table("/definitely/not/here.txt");
        match result {
            Err(LoaderError::NotFound(path)) => {
                assert_eq!(path, PathBuf::from("/definitely/not/here.txt"))
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_load_header_only_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Label\tPt").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            load_raw_table(file.path()),
            Err(LoaderError::EmptyFile(_))
        ));
    }

    #[test]
    fn test_preview_numbers_columns() {
        let table = RawTable::from_rows(vec![
            vec!["x".to_string(), "1".to_string()],
            vec!["y".to_string(), "2".to_string()],
        ]);
        let preview = table.preview(1);
        let lines: Vec<&str> = preview.lines().collect();
        assert_eq!(lines, vec!["0\t1", "x\t1"]);
    }
}
