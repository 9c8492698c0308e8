//! The frame-driven scanning session.
//!
//! A [`Session`] owns the inventory index and drives one strictly sequential
//! cycle per frame: acquire, recognise (on every Nth frame only), decide what
//! to display, render, and check for the operator's quit request. Frame
//! acquisition, text recognition and rendering are supplied by the caller
//! through the [`FrameSource`], [`Recognizer`] and [`Renderer`] traits.

pub mod ocr;
pub mod source;

use std::{
    io,
    num::NonZeroU32,
    time::{Duration, Instant},
};

pub use ocr::{Passthrough, RecognitionError, Recognizer, TesseractCli};
pub use source::{CaptureError, Frame, FrameDirectory, FrameSource, Transcript};
use tracing::instrument;

use crate::{
    domain::{Config, DisplayState, InventoryRecord, PersistenceController, ScanHistory},
    matching::{self, MatchStrategy},
    storage::InventoryIndex,
};

/// Everything a renderer needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    /// The zero-based frame number.
    pub frame_index: u64,
    /// The frame itself.
    pub frame: &'a Frame,
    /// The record to show, if any.
    pub state: DisplayState<'a>,
    /// The recent scan history, oldest first.
    pub history: &'a ScanHistory,
    /// Records observed so far.
    pub scanned: usize,
    /// Records in the dataset.
    pub total: usize,
    /// Frames per second, averaged over recent frames.
    pub fps: f64,
}

/// Draws the session state for the operator.
pub trait Renderer {
    /// Renders one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails. The session logs it and carries on.
    fn render(&mut self, view: &View<'_>) -> io::Result<()>;
}

/// Polled once per frame for the operator's request to stop.
pub trait OperatorInput {
    /// Whether the operator asked to end the session.
    fn quit_requested(&mut self) -> bool;
}

/// Input that never asks to stop; the session runs until the frames run out.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl OperatorInput for NoInput {
    fn quit_requested(&mut self) -> bool {
        false
    }
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The operator quit.
    Quit,
    /// The frame source ran out of frames.
    Exhausted,
    /// A frame could not be read.
    CaptureFailed(String),
}

/// What happened during [`Session::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Frames processed.
    pub frames: u64,
    /// Frames on which recognition ran.
    pub recognitions: u64,
    /// Why the session ended.
    pub reason: StopReason,
}

/// Releases the frame source when dropped, however the session loop exits.
struct Capture<'s> {
    source: &'s mut dyn FrameSource,
}

impl Drop for Capture<'_> {
    fn drop(&mut self) {
        self.source.release();
    }
}

/// Frames per second, recomputed every [`FpsCounter::SAMPLE`] frames.
#[derive(Debug)]
struct FpsCounter {
    since: Instant,
    frames: u32,
    fps: f64,
}

impl FpsCounter {
    const SAMPLE: u32 = 30;

    const fn new(now: Instant) -> Self {
        Self {
            since: now,
            frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self, now: Instant) -> f64 {
        self.frames += 1;
        if self.frames >= Self::SAMPLE {
            let elapsed = now.saturating_duration_since(self.since).as_secs_f64();
            if elapsed > 0.0 {
                self.fps = f64::from(self.frames) / elapsed;
            }
            self.since = now;
            self.frames = 0;
        }
        self.fps
    }
}

/// A scanning session over one inventory.
#[derive(Debug)]
pub struct Session {
    index: InventoryIndex,
    strategies: Vec<Box<dyn MatchStrategy>>,
    controller: PersistenceController,
    poll_interval: NonZeroU32,
    frames: u64,
}

impl Session {
    /// Creates a session over `index` configured by `config`.
    #[must_use]
    pub fn new(index: InventoryIndex, config: &Config) -> Self {
        Self::with_strategies(
            index,
            matching::strategies(config),
            config.poll_interval(),
            config.persistence(),
        )
    }

    /// Creates a session with explicit matching strategies.
    #[must_use]
    pub fn with_strategies(
        index: InventoryIndex,
        strategies: Vec<Box<dyn MatchStrategy>>,
        poll_interval: NonZeroU32,
        persistence: Duration,
    ) -> Self {
        Self {
            index,
            strategies,
            controller: PersistenceController::new(persistence),
            poll_interval,
            frames: 0,
        }
    }

    /// The inventory index.
    #[must_use]
    pub const fn index(&self) -> &InventoryIndex {
        &self.index
    }

    /// Ends the session, returning the inventory index.
    #[must_use]
    pub fn into_index(self) -> InventoryIndex {
        self.index
    }

    /// The number of frames processed so far.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// What the operator currently sees.
    #[must_use]
    pub fn display_state(&self) -> DisplayState<'_> {
        self.controller.state()
    }

    /// Whether recognition runs on the given frame.
    #[must_use]
    pub fn is_poll_frame(&self, frame_index: u64) -> bool {
        frame_index % u64::from(self.poll_interval.get()) == 0
    }

    /// Processes the next frame at `now`.
    ///
    /// Recognition only runs on poll frames; other frames carry over the last
    /// confirmed match until its persistence window expires. Returns whether
    /// recognition ran.
    pub fn step(&mut self, frame: &Frame, recognizer: &mut dyn Recognizer, now: Instant) -> bool {
        let frame_index = self.frames;
        self.frames += 1;

        let poll = self.is_poll_frame(frame_index);
        let current = if poll {
            self.recognize(frame, recognizer)
        } else {
            None
        };

        let state = self.controller.decide(current, now);
        tracing::trace!(frame_index, poll, ?state, "decided");
        poll
    }

    fn recognize(
        &mut self,
        frame: &Frame,
        recognizer: &mut dyn Recognizer,
    ) -> Option<InventoryRecord> {
        let text = match recognizer.recognize(frame) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "recognition failed");
                return None;
            }
        };

        for strategy in &self.strategies {
            if let Some(record) = strategy.find(&text, &mut self.index) {
                tracing::info!(
                    cas = record.identifier(),
                    location = record.location(),
                    strategy = strategy.name(),
                    "found"
                );
                return Some(record);
            }
        }
        None
    }

    /// Runs the session until the source is exhausted or the operator quits.
    ///
    /// The source is released exactly once before this returns.
    #[instrument(level = "debug", skip_all)]
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        recognizer: &mut dyn Recognizer,
        renderer: &mut dyn Renderer,
        input: &mut dyn OperatorInput,
    ) -> Summary {
        let capture = Capture { source };
        let mut fps = FpsCounter::new(Instant::now());
        let mut recognitions = 0;

        let reason = loop {
            let frame = match capture.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break StopReason::Exhausted,
                Err(e) => {
                    tracing::warn!(error = %e, "capture ended");
                    break StopReason::CaptureFailed(e.to_string());
                }
            };

            let now = Instant::now();
            let frame_index = self.frames;
            if self.step(&frame, recognizer, now) {
                recognitions += 1;
            }

            let view = View {
                frame_index,
                frame: &frame,
                state: self.controller.state(),
                history: self.index.history(),
                scanned: self.index.scanned_count(),
                total: self.index.total_count(),
                fps: fps.tick(now),
            };
            if let Err(e) = renderer.render(&view) {
                tracing::warn!(error = %e, "failed to render frame");
            }

            if input.quit_requested() {
                break StopReason::Quit;
            }
        };
        drop(capture);

        tracing::info!(frames = self.frames, recognitions, ?reason, "session ended");
        Summary {
            frames: self.frames,
            recognitions,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns scripted text and counts how often it is asked.
    #[derive(Debug, Default)]
    struct Scripted {
        calls: usize,
    }

    impl Recognizer for Scripted {
        fn recognize(&mut self, frame: &Frame) -> Result<String, RecognitionError> {
            self.calls += 1;
            match frame {
                Frame::Text(text) => Ok(text.clone()),
                Frame::Image(_) => Err(RecognitionError::UnsupportedFrame("image")),
            }
        }
    }

    fn session(poll_interval: u32) -> Session {
        let index = InventoryIndex::from_records(vec![InventoryRecord::new(
            "50-00-0",
            "Formaldehyde",
            Some("ACME".to_string()),
            Some("1L".to_string()),
        )]);
        let mut config = Config::default();
        config.set_poll_interval(NonZeroU32::new(poll_interval).unwrap());
        Session::new(index, &config)
    }

    #[test]
    fn recognition_runs_every_nth_frame() {
        let mut session = session(10);
        let mut recognizer = Scripted::default();
        let now = Instant::now();

        let polled: Vec<bool> = (0..25)
            .map(|_| session.step(&Frame::Text(String::new()), &mut recognizer, now))
            .collect();

        assert_eq!(recognizer.calls, 3);
        assert!(polled[0] && polled[10] && polled[20]);
        assert_eq!(polled.iter().filter(|p| **p).count(), 3);
        assert_eq!(session.frames(), 25);
    }

    #[test]
    fn in_between_frames_carry_the_last_match() {
        let mut session = session(10);
        let mut recognizer = Scripted::default();
        let t0 = Instant::now();

        session.step(&Frame::Text("lot 50-00-0 exp 2025".into()), &mut recognizer, t0);
        assert!(matches!(session.display_state(), DisplayState::Fresh(_)));

        // Text on a non-poll frame is never looked at.
        session.step(
            &Frame::Text("64-17-5".into()),
            &mut recognizer,
            t0 + Duration::from_secs(1),
        );
        let DisplayState::Persisted(record) = session.display_state() else {
            panic!("expected the match to persist");
        };
        assert_eq!(record.identifier(), "50-00-0");
        assert_eq!(recognizer.calls, 1);

        session.step(
            &Frame::Text(String::new()),
            &mut recognizer,
            t0 + Duration::from_secs(4),
        );
        assert_eq!(session.display_state(), DisplayState::Idle);
    }

    #[test]
    fn recognition_failure_is_no_match() {
        let mut session = session(1);
        let mut recognizer = Scripted::default();

        session.step(&Frame::Image("a.png".into()), &mut recognizer, Instant::now());

        assert_eq!(session.display_state(), DisplayState::Idle);
        assert_eq!(session.index().scanned_count(), 0);
    }

    #[test]
    fn formaldehyde_scenario() {
        let mut session = session(1);
        let mut recognizer = Scripted::default();

        session.step(&Frame::Text("lot 50-00-0 exp 2025".into()), &mut recognizer, Instant::now());

        let index = session.index();
        assert_eq!(index.scanned_count(), 1);
        assert_eq!(index.history().len(), 1);
        assert_eq!(index.history().last().unwrap().location(), "ACME");
    }

    #[test]
    fn fps_is_sampled() {
        let t0 = Instant::now();
        let mut fps = FpsCounter::new(t0);
        for i in 1..FpsCounter::SAMPLE {
            assert!(fps.tick(t0 + Duration::from_millis(u64::from(i) * 10)).abs() < f64::EPSILON);
        }
        let rate = fps.tick(t0 + Duration::from_secs(1));
        assert!((rate - 30.0).abs() < 1e-9);
    }
}
