//! CSV output for missing-item reports and normalised datasets.
//!
//! Files are written as UTF-8 with a byte-order mark so that spreadsheet
//! software detects the encoding of non-ASCII names.

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};

const BOM: &[u8] = "\u{feff}".as_bytes();

/// The missing-items report could not be written.
#[derive(Debug, thiserror::Error)]
#[error("failed to write report to {}", path.display())]
pub struct ReportWriteError {
    path: PathBuf,
    #[source]
    source: io::Error,
}

impl ReportWriteError {
    /// The destination that was attempted.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// The report file name for a report generated at `timestamp`.
///
/// ```
/// use chrono::{Local, TimeZone};
///
/// let timestamp = Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
/// assert_eq!(
///     labscan::storage::report::file_name(timestamp),
///     "missing_report_20250314_0926.csv"
/// );
/// ```
#[must_use]
pub fn file_name(timestamp: DateTime<Local>) -> String {
    format!("missing_report_{}.csv", timestamp.format("%Y%m%d_%H%M"))
}

/// Writes a table to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error naming `path` if any part of the write fails.
pub fn write_file<'a, I>(path: &Path, headers: &[String], rows: I) -> Result<(), ReportWriteError>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let write = || -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = BufWriter::new(File::create(path)?);
        write_table(&mut file, headers, rows)?;
        file.flush()
    };

    write().map_err(|source| ReportWriteError {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a BOM-prefixed CSV table to `writer`.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_table<'a, W, I>(mut writer: W, headers: &[String], rows: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a [String]>,
{
    writer.write_all(BOM)?;
    let mut csv = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);
    csv.write_record(headers)?;
    for row in rows {
        csv.write_record(row)?;
    }
    csv.flush()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn writes_bom_header_and_quoted_rows() {
        let headers = row(&["CAS", "Name"]);
        let rows = [row(&["105946-82-5", "4-Bromo-4'-iodo-1,1'-biphenyl"])];

        let mut out = Vec::new();
        write_table(&mut out, &headers, rows.iter().map(Vec::as_slice)).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "\u{feff}CAS,Name\n105946-82-5,\"4-Bromo-4'-iodo-1,1'-biphenyl\"\n"
        );
    }

    #[test]
    fn header_only_when_no_rows() {
        let mut out = Vec::new();
        write_table(&mut out, &row(&["CAS"]), std::iter::empty()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\u{feff}CAS\n");
    }

    #[test]
    fn file_name_embeds_minute() {
        let timestamp = Local.with_ymd_and_hms(2024, 12, 1, 23, 5, 0).unwrap();
        assert_eq!(file_name(timestamp), "missing_report_20241201_2305.csv");
    }

    #[test]
    fn write_file_creates_missing_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("reports/out.csv");
        write_file(&path, &row(&["CAS"]), std::iter::empty()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn write_failure_names_destination() {
        let tmp = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a file.
        let error = write_file(tmp.path(), &row(&["CAS"]), std::iter::empty()).unwrap_err();
        assert_eq!(error.path(), tmp.path());
    }
}
