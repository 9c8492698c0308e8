//! Loading inventory datasets and writing reports.

pub mod headers;
pub mod inventory;
pub mod report;

pub use headers::{ColumnMap, Field};
pub use inventory::{InventoryIndex, LoadError};
pub use report::ReportWriteError;
