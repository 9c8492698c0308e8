//! Operator-facing renderers and keyboard input.

use std::{
    io::{self, Stdout, Write},
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::Print,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use labscan::{
    DisplayState,
    session::{OperatorInput, Renderer, View},
};

use super::terminal::{Tint, terminal_width};

const BAR_WIDTH: usize = 30;

static LOGS_PAUSED: AtomicBool = AtomicBool::new(false);

/// Whether log output is currently held back for the dashboard.
#[must_use]
pub fn logs_paused() -> bool {
    LOGS_PAUSED.load(Ordering::Relaxed)
}

/// Holds back log output while alive.
#[derive(Debug)]
struct LogPause;

impl LogPause {
    fn start() -> Self {
        LOGS_PAUSED.store(true, Ordering::Relaxed);
        Self
    }
}

impl Drop for LogPause {
    fn drop(&mut self) {
        LOGS_PAUSED.store(false, Ordering::Relaxed);
    }
}
const RULE: &str = "──────────────────────────────";

/// A full-screen dashboard in the terminal's alternate screen.
///
/// The terminal is restored when the dashboard is dropped. Log lines written
/// to stderr would land on the dashboard, so logging is paused until then.
pub struct Dashboard {
    out: Stdout,
    last: Vec<String>,
    _logs: LogPause,
}

impl Dashboard {
    /// Switches the terminal to raw mode and the alternate screen.
    pub fn enter() -> io::Result<Self> {
        let mut out = io::stdout();
        terminal::enable_raw_mode()?;
        if let Err(e) = execute!(out, EnterAlternateScreen, cursor::Hide) {
            let _ = terminal::disable_raw_mode();
            return Err(e);
        }
        Ok(Self {
            out,
            last: Vec::new(),
            _logs: LogPause::start(),
        })
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        let _ = execute!(self.out, cursor::Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

impl Renderer for Dashboard {
    fn render(&mut self, view: &View<'_>) -> io::Result<()> {
        let lines = layout(view);
        // Most frames look like the previous one.
        if lines == self.last {
            return Ok(());
        }

        queue!(self.out, cursor::MoveTo(0, 0), Clear(ClearType::All))?;
        for line in &lines {
            queue!(self.out, Print(line), cursor::MoveToNextLine(1))?;
        }
        self.out.flush()?;
        self.last = lines;
        Ok(())
    }
}

/// The dashboard's lines for `view`.
fn layout(view: &View<'_>) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Scanned: {} / {}  {}",
            view.scanned,
            view.total,
            progress_bar(view.scanned, view.total, bar_width())
        ),
        RULE.muted(),
    ];

    match view.state {
        DisplayState::Idle => lines.push("Scanning...".muted()),
        DisplayState::Fresh(record) | DisplayState::Persisted(record) => {
            lines.push("MATCH FOUND!".matched());
            lines.push(format!("CAS:   {}", record.identifier()));
            lines.push(format!("Name:  {}", record.name()));
            lines.push(format!("Brand: {}", record.location()));
            lines.push(format!("Stock: {}", record.stock()));
        }
    }

    lines.push(RULE.muted());
    lines.push("History".to_string());
    if view.history.is_empty() {
        lines.push("  (none yet)".muted());
    }
    for entry in view.history.newest_first() {
        lines.push(format!(
            "  {}  {:<12} {}",
            entry.timestamp().format("%H:%M:%S"),
            entry.identifier(),
            entry.location()
        ));
    }

    lines.push(RULE.muted());
    lines.push(format!("FPS: {:.1}   press q to quit", view.fps).muted());
    lines
}

fn bar_width() -> usize {
    terminal_width().map_or(BAR_WIDTH, |width| {
        BAR_WIDTH.min(usize::from(width).saturating_sub(30).max(10))
    })
}

/// A text progress bar `width` cells wide.
fn progress_bar(done: usize, total: usize, width: usize) -> String {
    let filled = if total == 0 {
        0
    } else {
        (done.min(total) * width) / total
    };
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// Prints each newly displayed match as a tab-separated line.
#[derive(Debug)]
pub struct Plain<W> {
    out: W,
    showing: Option<String>,
}

impl<W: Write> Plain<W> {
    #[must_use]
    pub const fn new(out: W) -> Self {
        Self { out, showing: None }
    }
}

impl<W: Write> Renderer for Plain<W> {
    fn render(&mut self, view: &View<'_>) -> io::Result<()> {
        let Some(record) = view.state.record() else {
            self.showing = None;
            return Ok(());
        };
        if self.showing.as_deref() == Some(record.identifier()) {
            return Ok(());
        }

        writeln!(
            self.out,
            "{}\t{}\t{}\t{}\t{}/{}",
            record.identifier(),
            record.name(),
            record.location(),
            record.stock(),
            view.scanned,
            view.total
        )?;
        self.showing = Some(record.identifier().to_string());
        Ok(())
    }
}

/// Reads quit requests from the keyboard without blocking.
#[derive(Debug, Clone, Copy)]
pub struct Keyboard;

impl OperatorInput for Keyboard {
    fn quit_requested(&mut self) -> bool {
        loop {
            match event::poll(Duration::ZERO) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if is_quit(&key) => return true,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to read terminal event");
                        return false;
                    }
                },
                Ok(false) => return false,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to poll terminal events");
                    return false;
                }
            }
        }
    }
}

/// `q`, `Q`, Esc and Ctrl-C end the session.
fn is_quit(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Local;
    use labscan::{
        InventoryRecord, ScanHistory, domain::ScanHistoryEntry, session::Frame,
    };
    use test_case::test_case;

    use super::*;

    fn record() -> InventoryRecord {
        InventoryRecord::new(
            "50-00-0",
            "Formaldehyde",
            Some("ACME".to_string()),
            Some("1L".to_string()),
        )
    }

    fn view<'a>(
        frame: &'a Frame,
        state: DisplayState<'a>,
        history: &'a ScanHistory,
    ) -> View<'a> {
        View {
            frame_index: 0,
            frame,
            state,
            history,
            scanned: 1,
            total: 4,
            fps: 12.0,
        }
    }

    #[test_case(KeyCode::Char('q'), KeyModifiers::NONE => true)]
    #[test_case(KeyCode::Char('Q'), KeyModifiers::SHIFT => true)]
    #[test_case(KeyCode::Esc, KeyModifiers::NONE => true)]
    #[test_case(KeyCode::Char('c'), KeyModifiers::CONTROL => true)]
    #[test_case(KeyCode::Char('c'), KeyModifiers::NONE => false)]
    #[test_case(KeyCode::Enter, KeyModifiers::NONE => false)]
    fn quit_keys(code: KeyCode, modifiers: KeyModifiers) -> bool {
        is_quit(&KeyEvent::new(code, modifiers))
    }

    #[test]
    fn log_pause_lasts_while_held() {
        assert!(!logs_paused());
        let pause = LogPause::start();
        assert!(logs_paused());
        drop(pause);
        assert!(!logs_paused());
    }

    #[test_case(0, 4, 8 => "[--------]")]
    #[test_case(1, 4, 8 => "[##------]")]
    #[test_case(4, 4, 8 => "[########]")]
    #[test_case(0, 0, 4 => "[----]")]
    fn progress(done: usize, total: usize, width: usize) -> String {
        progress_bar(done, total, width)
    }

    #[test]
    fn layout_shows_match_and_history() {
        let record = record();
        let mut history = ScanHistory::default();
        history.record(ScanHistoryEntry::new(&record, Local::now()));
        let frame = Frame::Text(String::new());

        let lines = layout(&view(&frame, DisplayState::Fresh(&record), &history));
        let text = lines.join("\n");

        assert!(text.contains("Scanned: 1 / 4"));
        assert!(text.contains("MATCH FOUND!"));
        assert!(text.contains("Brand: ACME"));
        assert!(text.contains("Stock: 1L"));
        assert!(text.contains("50-00-0      ACME"));
    }

    #[test]
    fn layout_shows_scanning_when_idle() {
        let history = ScanHistory::default();
        let frame = Frame::Text(String::new());
        let text = layout(&view(&frame, DisplayState::Idle, &history)).join("\n");

        assert!(text.contains("Scanning..."));
        assert!(!text.contains("MATCH FOUND!"));
    }

    #[test]
    fn plain_prints_each_appearance_once() {
        let record = record();
        let history = ScanHistory::default();
        let frame = Frame::Text(String::new());
        let mut plain = Plain::new(Vec::new());

        for state in [
            DisplayState::Fresh(&record),
            DisplayState::Persisted(&record),
            DisplayState::Fresh(&record),
            DisplayState::Idle,
            DisplayState::Fresh(&record),
        ] {
            plain.render(&view(&frame, state, &history)).unwrap();
        }

        let out = String::from_utf8(plain.out).unwrap();
        assert_eq!(out.lines().count(), 2);
        assert_eq!(
            out.lines().next().unwrap(),
            "50-00-0\tFormaldehyde\tACME\t1L\t1/4"
        );
    }
}
