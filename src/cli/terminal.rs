//! Colours for scan results, and terminal size.

use owo_colors::{OwoColorize, colors::css};

/// How a piece of output relates to the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    /// A record was found, or nothing is missing.
    Matched,
    /// Something needs the operator's attention.
    Attention,
    /// A CAS number that cannot be valid.
    Invalid,
    /// Chrome and hints.
    Muted,
}

fn paint(text: &str, tone: Tone, enabled: bool) -> String {
    if !enabled {
        return text.to_string();
    }
    match tone {
        Tone::Matched => text.fg::<css::Green>().bold().to_string(),
        Tone::Attention => text.fg::<css::Orange>().to_string(),
        Tone::Invalid => text.fg::<css::Red>().to_string(),
        Tone::Muted => text.dimmed().to_string(),
    }
}

fn color_enabled() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// The terminal's width in columns, when stdout is a terminal.
pub fn terminal_width() -> Option<u16> {
    terminal_size::terminal_size().map(|(w, _)| w.0)
}

/// Colours text by its meaning in a scan, when stdout supports colour.
pub trait Tint {
    /// A match, or a clean result.
    fn matched(&self) -> String;
    /// Missing records and suspect rows.
    fn attention(&self) -> String;
    /// Failed validation.
    fn invalid(&self) -> String;
    /// Rules, hints and idle text.
    fn muted(&self) -> String;
}

impl<T: AsRef<str> + ?Sized> Tint for T {
    fn matched(&self) -> String {
        paint(self.as_ref(), Tone::Matched, color_enabled())
    }

    fn attention(&self) -> String {
        paint(self.as_ref(), Tone::Attention, color_enabled())
    }

    fn invalid(&self) -> String {
        paint(self.as_ref(), Tone::Invalid, color_enabled())
    }

    fn muted(&self) -> String {
        paint(self.as_ref(), Tone::Muted, color_enabled())
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(Tone::Matched)]
    #[test_case(Tone::Attention)]
    #[test_case(Tone::Invalid)]
    #[test_case(Tone::Muted)]
    fn plain_without_colour(tone: Tone) {
        assert_eq!(paint("64-17-5", tone, false), "64-17-5");
    }

    #[test_case(Tone::Matched)]
    #[test_case(Tone::Attention)]
    #[test_case(Tone::Invalid)]
    #[test_case(Tone::Muted)]
    fn escapes_keep_the_text(tone: Tone) {
        let painted = paint("64-17-5", tone, true);
        assert!(painted.starts_with('\u{1b}'));
        assert!(painted.contains("64-17-5"));
    }
}
