//! Chemical inventory reconciliation.
//!
//! Registry (CAS) numbers are read from bottle labels, checked against their
//! checksum, and looked up in a CSV inventory. Once scanning ends, every
//! inventory row that was never observed is written to a missing-items
//! report.

pub mod domain;
pub use domain::{CasNumber, Config, DisplayState, Extractor, InventoryRecord, ScanHistory};

/// Strategies for matching recognised text against the inventory.
pub mod matching;

/// The scanning session and its collaborators.
pub mod session;
pub use session::{Session, StopReason, Summary};

/// CSV loading and report writing.
pub mod storage;
pub use storage::{InventoryIndex, LoadError, ReportWriteError};
