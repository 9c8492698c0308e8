//! Resolution of dataset column headers to the fields the scanner uses.
//!
//! Inventory spreadsheets in the wild name their columns in several ways (and
//! several languages). A fixed table maps each accepted spelling to one
//! canonical field.

use csv::StringRecord;

use crate::storage::inventory::LoadError;

/// A column the scanner understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// The registry number.
    Identifier,
    /// The chemical name.
    Name,
    /// The brand or storage location.
    Location,
    /// The stock quantity.
    Stock,
}

/// Accepted header spellings. Matching ignores ASCII case and surrounding
/// whitespace.
const SYNONYMS: &[(&str, Field)] = &[
    ("CAS", Field::Identifier),
    ("CAS No", Field::Identifier),
    ("CAS No.", Field::Identifier),
    ("CAS Number", Field::Identifier),
    ("CAS RN", Field::Identifier),
    ("Name", Field::Name),
    ("上層藥品名稱", Field::Name),
    ("藥品名稱", Field::Name),
    ("Chemical", Field::Name),
    ("Chemical Name", Field::Name),
    ("Location", Field::Location),
    ("廠牌", Field::Location),
    ("Brand", Field::Location),
    ("Vendor", Field::Location),
    ("Stock", Field::Stock),
    ("數量", Field::Stock),
    ("Quantity", Field::Stock),
    ("Qty", Field::Stock),
];

impl Field {
    /// Every field, in canonical column order.
    pub const ALL: [Self; 4] = [Self::Identifier, Self::Name, Self::Location, Self::Stock];

    /// The header written for this field in generated files.
    #[must_use]
    pub const fn canonical(self) -> &'static str {
        match self {
            Self::Identifier => "CAS",
            Self::Name => "Name",
            Self::Location => "Location",
            Self::Stock => "Stock",
        }
    }

    /// Resolves a source header to a field, if it is a known spelling.
    #[must_use]
    pub fn resolve(header: &str) -> Option<Self> {
        let header = clean(header);
        SYNONYMS
            .iter()
            .find(|(spelling, _)| spelling.eq_ignore_ascii_case(header))
            .map(|(_, field)| *field)
    }
}

/// Strips whitespace and a byte-order mark from a header cell.
fn clean(header: &str) -> &str {
    header.trim().trim_start_matches('\u{feff}').trim()
}

/// The positions of recognised fields within a dataset's columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    identifier: usize,
    name: Option<usize>,
    location: Option<usize>,
    stock: Option<usize>,

    /// Column headers for generated files: canonical names for recognised
    /// columns, the cleaned source header otherwise.
    headers: Vec<String>,
}

impl ColumnMap {
    /// Builds the map from a dataset's header row.
    ///
    /// When a field appears under more than one header, the leftmost column
    /// wins.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::MissingIdentifierColumn`] if no header names the
    /// registry number.
    pub fn from_headers(record: &StringRecord) -> Result<Self, LoadError> {
        let mut positions: [Option<usize>; 4] = [None; 4];
        let mut headers = Vec::with_capacity(record.len());

        for (i, header) in record.iter().enumerate() {
            match Field::resolve(header) {
                Some(field) => {
                    let slot = &mut positions[field as usize];
                    if slot.is_none() {
                        *slot = Some(i);
                        headers.push(field.canonical().to_string());
                    } else {
                        headers.push(clean(header).to_string());
                    }
                }
                None => headers.push(clean(header).to_string()),
            }
        }

        let [identifier, name, location, stock] = positions;
        let identifier = identifier.ok_or_else(|| LoadError::MissingIdentifierColumn {
            headers: record.iter().map(|h| clean(h).to_string()).collect(),
        })?;

        Ok(Self {
            identifier,
            name,
            location,
            stock,
            headers,
        })
    }

    /// The column holding `field`, if present.
    #[must_use]
    pub const fn position(&self, field: Field) -> Option<usize> {
        match field {
            Field::Identifier => Some(self.identifier),
            Field::Name => self.name,
            Field::Location => self.location,
            Field::Stock => self.stock,
        }
    }

    /// Column headers for generated files.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// The recognised cells of `row` in canonical column order.
    ///
    /// Absent columns and cells become empty strings.
    #[must_use]
    pub fn canonical_row(&self, row: &StringRecord) -> Vec<String> {
        Field::ALL
            .iter()
            .map(|&field| {
                self.position(field)
                    .and_then(|i| row.get(i))
                    .unwrap_or_default()
                    .trim()
                    .to_string()
            })
            .collect()
    }
}
