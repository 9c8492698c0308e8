/// The value shown for optional fields missing from the dataset.
pub const UNKNOWN: &str = "N/A";

/// One row of the inventory dataset.
///
/// Records are created once when the dataset is loaded and never change. Apart
/// from the four recognised fields, a record keeps every column of its source
/// row so that reports can reproduce it exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRecord {
    identifier: String,
    name: String,
    location: String,
    stock: String,

    /// The full source row, in dataset column order.
    pub(crate) row: Vec<String>,
}

impl InventoryRecord {
    /// Creates a record from its recognised fields.
    ///
    /// Missing `location` or `stock` default to [`UNKNOWN`]. The identifier
    /// and name are trimmed.
    #[must_use]
    pub fn new(
        identifier: impl Into<String>,
        name: impl Into<String>,
        location: Option<String>,
        stock: Option<String>,
    ) -> Self {
        let identifier = identifier.into().trim().to_string();
        let name = name.into().trim().to_string();
        let row = vec![
            identifier.clone(),
            name.clone(),
            location.clone().unwrap_or_default(),
            stock.clone().unwrap_or_default(),
        ];
        Self {
            identifier,
            name,
            location: location.unwrap_or_else(|| UNKNOWN.to_string()),
            stock: stock.unwrap_or_else(|| UNKNOWN.to_string()),
            row,
        }
    }

    pub(crate) const fn from_row(
        identifier: String,
        name: String,
        location: String,
        stock: String,
        row: Vec<String>,
    ) -> Self {
        Self {
            identifier,
            name,
            location,
            stock,
            row,
        }
    }

    /// The registry number as written in the dataset (trimmed).
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The chemical name (trimmed).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The brand or storage location.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The stock quantity, as free text.
    #[must_use]
    pub fn stock(&self) -> &str {
        &self.stock
    }

    /// The source row, in dataset column order.
    #[must_use]
    pub fn row(&self) -> &[String] {
        &self.row
    }
}
