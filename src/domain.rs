//! Domain models for inventory reconciliation.
//!
//! This module contains the core domain types: registry numbers and their
//! extraction from text, inventory records, the scan history, the match
//! persistence controller and configuration.

/// Chemical registry (CAS) numbers: validation and extraction from text.
pub mod cas;
pub use cas::{CasNumber, Error as CasError, Extractor};

mod config;
pub use config::{Config, Error as ConfigError, FuzzyConfig, SourceSelector};

pub mod history;
pub use history::{HISTORY_CAPACITY, ScanHistory, ScanHistoryEntry};

pub mod persistence;
pub use persistence::{DisplayState, PersistenceController};

/// Inventory records.
pub mod record;
pub use record::InventoryRecord;

/// String similarity scoring for name matching.
pub mod similarity;
