//! Strategies for turning recognised text into an inventory match.
//!
//! Exact registry-number matching is the only strategy active by default.
//! Name matching is available for datasets whose labels lack a legible
//! number, but must be switched on in the configuration.

use std::fmt;

use crate::{
    domain::{Config, Extractor, InventoryRecord},
    storage::InventoryIndex,
};

/// A way of matching recognised text against the inventory.
pub trait MatchStrategy: fmt::Debug {
    /// A short name for logs.
    fn name(&self) -> &'static str;

    /// Returns the first record matched by `text`, if any.
    ///
    /// Implementations record the observation in `index`.
    fn find(&self, text: &str, index: &mut InventoryIndex) -> Option<InventoryRecord>;
}

/// Matches checksum-valid registry numbers found in the text.
///
/// Candidates are looked up in order of appearance and the first one present
/// in the inventory wins; later candidates are not looked up.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactIdentifierMatch {
    extractor: Extractor,
}

impl ExactIdentifierMatch {
    /// Creates the strategy around `extractor`.
    #[must_use]
    pub const fn new(extractor: Extractor) -> Self {
        Self { extractor }
    }
}

impl MatchStrategy for ExactIdentifierMatch {
    fn name(&self) -> &'static str {
        "identifier"
    }

    fn find(&self, text: &str, index: &mut InventoryIndex) -> Option<InventoryRecord> {
        self.extractor
            .extract(text)
            .iter()
            .find_map(|cas| index.lookup(cas))
    }
}

/// Matches record names resembling a line of the text.
#[derive(Debug, Clone, Copy)]
pub struct FuzzyNameMatch {
    threshold: u8,
}

impl FuzzyNameMatch {
    /// Creates the strategy; `threshold` is a similarity score from 0 to 100.
    #[must_use]
    pub const fn new(threshold: u8) -> Self {
        Self { threshold }
    }
}

impl MatchStrategy for FuzzyNameMatch {
    fn name(&self) -> &'static str {
        "name"
    }

    fn find(&self, text: &str, index: &mut InventoryIndex) -> Option<InventoryRecord> {
        index.fuzzy_match(text, self.threshold)
    }
}

/// The strategies enabled by `config`, in the order they are tried.
#[must_use]
pub fn strategies(config: &Config) -> Vec<Box<dyn MatchStrategy>> {
    let mut strategies: Vec<Box<dyn MatchStrategy>> = vec![Box::new(ExactIdentifierMatch::new(
        Extractor::new(config.min_digits()),
    ))];
    if config.fuzzy.enabled {
        strategies.push(Box::new(FuzzyNameMatch::new(config.fuzzy.threshold)));
    }
    strategies
}
