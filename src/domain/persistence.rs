//! Smooths match feedback over frames where recognition transiently fails.

use std::time::{Duration, Instant};

use crate::domain::InventoryRecord;

/// The default time a confirmed match remains on screen.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(3);

/// What the operator should see for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState<'a> {
    /// Nothing to show.
    Idle,
    /// A match found in the current frame.
    Fresh(&'a InventoryRecord),
    /// The last confirmed match, still inside the persistence window.
    Persisted(&'a InventoryRecord),
}

impl<'a> DisplayState<'a> {
    /// The record to show, if any.
    #[must_use]
    pub const fn record(self) -> Option<&'a InventoryRecord> {
        match self {
            Self::Idle => None,
            Self::Fresh(record) | Self::Persisted(record) => Some(record),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shown {
    Idle,
    Fresh,
    Persisted,
}

#[derive(Debug, Clone)]
struct Confirmed {
    record: InventoryRecord,
    at: Instant,
}

/// Decides, once per frame, which record (if any) is displayed.
///
/// A match is shown as soon as it is found and then carried over unchanged
/// until either a newer match replaces it or the window elapses. Expiry is a
/// hard cutoff.
#[derive(Debug, Clone)]
pub struct PersistenceController {
    window: Duration,
    confirmed: Option<Confirmed>,
    shown: Shown,
}

impl Default for PersistenceController {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl PersistenceController {
    /// Creates a controller with the given persistence window.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            confirmed: None,
            shown: Shown::Idle,
        }
    }

    /// The persistence window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Decides what to show at `now`, given this frame's match (if any).
    pub fn decide(&mut self, current: Option<InventoryRecord>, now: Instant) -> DisplayState<'_> {
        self.shown = if let Some(record) = current {
            self.confirmed = Some(Confirmed { record, at: now });
            Shown::Fresh
        } else if self
            .confirmed
            .as_ref()
            .is_some_and(|c| now.saturating_duration_since(c.at) < self.window)
        {
            Shown::Persisted
        } else {
            Shown::Idle
        };

        self.state()
    }

    /// The outcome of the most recent [`decide`](Self::decide).
    #[must_use]
    pub fn state(&self) -> DisplayState<'_> {
        match (self.shown, &self.confirmed) {
            (Shown::Fresh, Some(c)) => DisplayState::Fresh(&c.record),
            (Shown::Persisted, Some(c)) => DisplayState::Persisted(&c.record),
            _ => DisplayState::Idle,
        }
    }
}
