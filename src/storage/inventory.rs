//! The in-memory inventory index.
//!
//! The [`InventoryIndex`] is built once from a CSV dataset and then answers
//! lookups for the rest of the session, remembering which records have been
//! observed so far.

use std::{
    collections::{HashMap, HashSet},
    fs,
    io::Read,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use tracing::instrument;

use crate::{
    domain::{
        InventoryRecord, ScanHistory, ScanHistoryEntry, record::UNKNOWN, similarity,
    },
    storage::{
        headers::{ColumnMap, Field},
        report::{self, ReportWriteError},
    },
};

/// Errors that prevent a dataset from being loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The dataset could not be read at all.
    #[error("failed to read inventory {}", path.display())]
    Read {
        /// The dataset path.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The header row could not be parsed.
    #[error("failed to parse the inventory header row")]
    Header(#[source] csv::Error),

    /// None of the headers names the registry number column.
    #[error("no CAS column among the inventory headers {headers:?}")]
    MissingIdentifierColumn {
        /// The headers that were found.
        headers: Vec<String>,
    },
}

/// An index over the inventory dataset, tracking which records were observed.
#[derive(Debug, Clone, Default)]
pub struct InventoryIndex {
    /// Column headers for generated reports.
    columns: Vec<String>,

    /// Every record, in dataset order.
    records: Vec<InventoryRecord>,

    /// Registry number to position in `records`. Later duplicates win.
    by_identifier: HashMap<String, usize>,

    /// Every registry number in the dataset.
    identifiers: HashSet<String>,

    observed_by_identifier: HashSet<String>,

    /// Registry numbers of records matched by name.
    observed_by_name: HashSet<String>,

    history: ScanHistory,
}

impl InventoryIndex {
    /// Loads the dataset at `path`.
    ///
    /// Short rows are padded with empty cells and long rows truncated to the
    /// header width. Rows that cannot be parsed, or that have no registry
    /// number, are skipped with a warning. A dataset with no usable rows produces an empty
    /// index; use [`is_empty`](Self::is_empty) to detect this.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or if its headers do not
    /// include a registry number column.
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let bytes = fs::read(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let index = Self::from_reader(bytes.as_slice())?;
        tracing::info!(
            records = index.total_count(),
            path = %path.display(),
            "loaded inventory"
        );
        Ok(index)
    }

    /// Loads a dataset from any CSV source.
    ///
    /// # Errors
    ///
    /// Returns an error if the header row cannot be parsed or does not include
    /// a registry number column.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let columns = ColumnMap::from_headers(reader.headers().map_err(LoadError::Header)?)?;

        let mut records = Vec::new();
        for (i, row) in reader.records().enumerate() {
            // Data rows start on line 2.
            let line = i + 2;
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!(line, error = %e, "skipping unparsable row");
                    continue;
                }
            };
            if row.len() != columns.headers().len() {
                tracing::debug!(line, cells = row.len(), "ragged row");
            }
            match parse_row(&columns, &row) {
                Some(record) => records.push(record),
                None => tracing::warn!(line, "skipping row without a CAS number"),
            }
        }

        Ok(Self::new(columns.headers().to_vec(), records))
    }

    /// Builds an index over `records` in canonical column layout.
    #[must_use]
    pub fn from_records(records: Vec<InventoryRecord>) -> Self {
        let columns = Field::ALL
            .iter()
            .map(|field| field.canonical().to_string())
            .collect();
        Self::new(columns, records)
    }

    fn new(columns: Vec<String>, records: Vec<InventoryRecord>) -> Self {
        let mut by_identifier = HashMap::with_capacity(records.len());
        let mut identifiers = HashSet::with_capacity(records.len());

        for (i, record) in records.iter().enumerate() {
            by_identifier.insert(record.identifier().to_string(), i);
            identifiers.insert(record.identifier().to_string());
        }

        Self {
            columns,
            records,
            by_identifier,
            identifiers,
            ..Self::default()
        }
    }

    /// Looks up a record by exact registry number, marking it as observed.
    ///
    /// A successful lookup is appended to the scan history unless the same
    /// record was the most recent entry. A miss has no side effects.
    pub fn lookup(&mut self, identifier: &str) -> Option<InventoryRecord> {
        self.lookup_at(identifier, Local::now())
    }

    /// As [`lookup`](Self::lookup), stamping any history entry with
    /// `timestamp`.
    pub fn lookup_at(
        &mut self,
        identifier: &str,
        timestamp: DateTime<Local>,
    ) -> Option<InventoryRecord> {
        let record = self.records.get(*self.by_identifier.get(identifier)?)?.clone();
        self.observed_by_identifier.insert(identifier.to_string());
        self.history.record(ScanHistoryEntry::new(&record, timestamp));
        Some(record)
    }

    /// Finds the record whose name best resembles a line of `text`.
    ///
    /// Each non-empty line of `text` is compared against every record name;
    /// the best score at or above `threshold` (0-100, 100 = exact) wins, ties
    /// going to the earlier record. A match marks that record as observed and
    /// is appended to the scan history.
    pub fn fuzzy_match(&mut self, text: &str, threshold: u8) -> Option<InventoryRecord> {
        let lines: Vec<String> = text
            .lines()
            .map(|line| line.trim().to_lowercase())
            .filter(|line| !line.is_empty())
            .collect();
        if lines.is_empty() {
            return None;
        }

        let mut best: Option<(u8, usize)> = None;
        for (i, record) in self.records.iter().enumerate() {
            if record.name().is_empty() {
                continue;
            }
            let name = record.name().to_lowercase();
            let score = lines
                .iter()
                .map(|line| similarity::ratio(line, &name))
                .max()
                .unwrap_or_default();
            if score >= threshold && best.is_none_or(|(top, _)| score > top) {
                best = Some((score, i));
            }
        }

        let (score, i) = best?;
        let record = self.records[i].clone();
        tracing::debug!(name = record.name(), score, "name match");
        self.observed_by_name.insert(record.identifier().to_string());
        self.history.record(ScanHistoryEntry::new(&record, Local::now()));
        Some(record)
    }

    /// Every registry number observed this session, whether matched by number
    /// or by name.
    fn observed(&self) -> HashSet<&str> {
        self.observed_by_identifier
            .union(&self.observed_by_name)
            .map(String::as_str)
            .collect()
    }

    /// The number of distinct dataset records observed so far.
    ///
    /// Observations that do not belong to the loaded dataset are not counted.
    #[must_use]
    pub fn scanned_count(&self) -> usize {
        self.observed()
            .into_iter()
            .filter(|identifier| self.identifiers.contains(*identifier))
            .count()
    }

    /// The number of records in the dataset.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every record, in dataset order.
    #[must_use]
    pub fn records(&self) -> &[InventoryRecord] {
        &self.records
    }

    /// Column headers for generated reports.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The recent scan history.
    #[must_use]
    pub const fn history(&self) -> &ScanHistory {
        &self.history
    }

    /// Records never observed this session, in dataset order.
    #[must_use]
    pub fn missing_records(&self) -> Vec<&InventoryRecord> {
        let observed = self.observed();
        self.records
            .iter()
            .filter(|record| !observed.contains(record.identifier()))
            .collect()
    }

    /// Writes the records never observed to a timestamped CSV in `dir`.
    ///
    /// Returns the path of the report. The index is not modified.
    ///
    /// # Errors
    ///
    /// Returns an error naming the attempted destination if the report cannot
    /// be written.
    pub fn generate_missing_report(&self, dir: &Path) -> Result<PathBuf, ReportWriteError> {
        self.write_missing_report(dir, Local::now())
    }

    /// As [`generate_missing_report`](Self::generate_missing_report), naming
    /// the report after `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns an error naming the attempted destination if the report cannot
    /// be written.
    #[instrument(level = "debug", skip(self))]
    pub fn write_missing_report(
        &self,
        dir: &Path,
        timestamp: DateTime<Local>,
    ) -> Result<PathBuf, ReportWriteError> {
        let path = dir.join(report::file_name(timestamp));
        let missing = self.missing_records();
        report::write_file(
            &path,
            &self.columns,
            missing.iter().map(|record| record.row()),
        )?;
        tracing::info!(missing = missing.len(), path = %path.display(), "wrote missing-items report");
        Ok(path)
    }
}

fn parse_row(columns: &ColumnMap, row: &csv::StringRecord) -> Option<InventoryRecord> {
    let cell = |field| columns.position(field).and_then(|i| row.get(i));

    let identifier = cell(Field::Identifier)?.trim().to_string();
    if identifier.is_empty() {
        return None;
    }
    let name = cell(Field::Name).unwrap_or_default().trim().to_string();
    let optional = |field| {
        cell(field)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(UNKNOWN)
            .to_string()
    };
    let location = optional(Field::Location);
    let stock = optional(Field::Stock);

    let mut fields: Vec<String> = row.iter().map(ToString::to_string).collect();
    fields.resize(columns.headers().len(), String::new());
    if let Some(cell) = columns
        .position(Field::Identifier)
        .and_then(|i| fields.get_mut(i))
    {
        cell.clone_from(&identifier);
    }
    if let Some(cell) = columns.position(Field::Name).and_then(|i| fields.get_mut(i)) {
        cell.clone_from(&name);
    }

    Some(InventoryRecord::from_row(
        identifier, name, location, stock, fields,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &str = "\u{feff}CAS,上層藥品名稱,廠牌,數量\n\
        50-00-0,Formaldehyde,ACME,1L\n\
        100-66-3, Anisole ,LANCASTER,500 G\n\
        64-17-5,Ethanol,,\n";

    fn index() -> InventoryIndex {
        InventoryIndex::from_reader(DATASET.as_bytes()).unwrap()
    }

    #[test]
    fn loads_records_in_order() {
        let index = index();
        let ids: Vec<_> = index.records().iter().map(InventoryRecord::identifier).collect();
        assert_eq!(ids, ["50-00-0", "100-66-3", "64-17-5"]);
        assert_eq!(index.total_count(), 3);
        assert_eq!(index.columns(), ["CAS", "Name", "Location", "Stock"]);
    }

    #[test]
    fn trims_name_and_defaults_missing_values() {
        let index = index();
        assert_eq!(index.records()[1].name(), "Anisole");
        assert_eq!(index.records()[1].row(), ["100-66-3", "Anisole", "LANCASTER", "500 G"]);
        assert_eq!(index.records()[2].location(), UNKNOWN);
        assert_eq!(index.records()[2].stock(), UNKNOWN);
    }

    #[test]
    fn lookup_marks_observed_and_records_history() {
        let mut index = index();
        let record = index.lookup("50-00-0").unwrap();

        assert_eq!(record.name(), "Formaldehyde");
        assert_eq!(index.scanned_count(), 1);
        assert_eq!(index.history().len(), 1);
        assert_eq!(index.history().last().unwrap().location(), "ACME");
    }

    #[test]
    fn lookup_miss_has_no_side_effects() {
        let mut index = index();
        assert!(index.lookup("7732-18-5").is_none());
        assert_eq!(index.scanned_count(), 0);
        assert!(index.history().is_empty());
    }

    #[test]
    fn repeated_lookup_succeeds_without_duplicating_history() {
        let mut index = index();
        assert!(index.lookup("50-00-0").is_some());
        assert!(index.lookup("50-00-0").is_some());
        assert_eq!(index.history().len(), 1);

        index.lookup("64-17-5");
        index.lookup("50-00-0");
        assert_eq!(index.history().len(), 3);
        assert_eq!(index.scanned_count(), 2);
    }

    #[test]
    fn scanned_count_is_monotonic_and_bounded() {
        let mut index = index();
        let mut previous = 0;
        for id in ["50-00-0", "nope", "50-00-0", "64-17-5", "100-66-3", "64-17-5"] {
            index.lookup(id);
            let count = index.scanned_count();
            assert!(count >= previous);
            assert!(count <= index.total_count());
            previous = count;
        }
        assert_eq!(previous, 3);
    }

    #[test]
    fn duplicate_identifiers_resolve_to_last_row() {
        let data = "CAS,Name\n50-00-0,First\n50-00-0,Second\n";
        let mut index = InventoryIndex::from_reader(data.as_bytes()).unwrap();

        assert_eq!(index.total_count(), 2);
        assert_eq!(index.lookup("50-00-0").unwrap().name(), "Second");
        assert_eq!(index.scanned_count(), 1);
        assert!(index.missing_records().is_empty());
    }

    #[test]
    fn skips_rows_without_identifier() {
        let data = "CAS,Name,Brand\n,Nameless,X\n  ,Blank\n64-17-5,Ethanol,Y\n";
        let index = InventoryIndex::from_reader(data.as_bytes()).unwrap();

        let ids: Vec<_> = index.records().iter().map(InventoryRecord::identifier).collect();
        assert_eq!(ids, ["64-17-5"]);
    }

    #[test]
    fn short_rows_are_padded_and_long_rows_truncated() {
        let data = "CAS,Name,Brand,Stock\n\
                    50-00-0,Formaldehyde,ACME,1L\n\
                    64-17-5,Ethanol,NOVA\n\
                    100-66-3,Anisole,LANCASTER,500 G,extra\n";
        let index = InventoryIndex::from_reader(data.as_bytes()).unwrap();

        assert_eq!(index.total_count(), 3);
        let short = &index.records()[1];
        assert_eq!(short.identifier(), "64-17-5");
        assert_eq!(short.location(), "NOVA");
        assert_eq!(short.stock(), UNKNOWN);
        assert_eq!(short.row(), ["64-17-5", "Ethanol", "NOVA", ""]);
        assert_eq!(
            index.records()[2].row(),
            ["100-66-3", "Anisole", "LANCASTER", "500 G"]
        );

        let missing: Vec<_> = index
            .missing_records()
            .into_iter()
            .map(InventoryRecord::identifier)
            .collect();
        assert_eq!(missing, ["50-00-0", "64-17-5", "100-66-3"]);
    }

    #[test]
    fn no_usable_rows_gives_an_empty_index() {
        let index = InventoryIndex::from_reader("CAS,Name\n".as_bytes()).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.scanned_count(), 0);
    }

    #[test]
    fn unrecognised_headers_fail_to_load() {
        let error = InventoryIndex::from_reader("Foo,Bar\n1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(error, LoadError::MissingIdentifierColumn { .. }));
    }

    #[test]
    fn empty_input_fails_to_load() {
        assert!(InventoryIndex::from_reader("".as_bytes()).is_err());
    }

    #[test]
    fn missing_file_fails_to_load() {
        let tmp = tempfile::tempdir().unwrap();
        let error = InventoryIndex::load(&tmp.path().join("missing.csv")).unwrap_err();
        assert!(matches!(error, LoadError::Read { .. }));
    }

    #[test]
    fn missing_records_exclude_observed() {
        let mut index = index();
        index.lookup("100-66-3");
        let missing: Vec<_> = index
            .missing_records()
            .into_iter()
            .map(InventoryRecord::identifier)
            .collect();
        assert_eq!(missing, ["50-00-0", "64-17-5"]);
    }

    #[test]
    fn fuzzy_match_observes_by_name() {
        let mut index = index();
        let record = index.fuzzy_match("some label\nANIS0LE\n", 80).unwrap();

        assert_eq!(record.identifier(), "100-66-3");
        assert_eq!(index.scanned_count(), 1);
        assert_eq!(index.history().last().unwrap().identifier(), "100-66-3");
        assert_eq!(index.missing_records().len(), 2);
    }

    #[test]
    fn fuzzy_match_credits_the_matched_row_when_names_repeat() {
        let data = "CAS,Name\n64-17-5,Ethanol\n64-17-6,Ethanol\n";
        let mut shared = InventoryIndex::from_reader(data.as_bytes()).unwrap();

        // Ties go to the earlier row, which is the one credited.
        let record = shared.fuzzy_match("ethanol", 90).unwrap();
        assert_eq!(record.identifier(), "64-17-5");
        assert_eq!(shared.scanned_count(), 1);
        let missing: Vec<_> = shared
            .missing_records()
            .into_iter()
            .map(InventoryRecord::identifier)
            .collect();
        assert_eq!(missing, ["64-17-6"]);
    }

    #[test]
    fn fuzzy_match_below_threshold_is_absent() {
        let mut index = index();
        assert!(index.fuzzy_match("benzene", 80).is_none());
        assert!(index.fuzzy_match("", 0).is_none());
        assert_eq!(index.scanned_count(), 0);
        assert!(index.history().is_empty());
    }
}
