//! Text recognisers.

use std::{
    io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};

use crate::session::source::Frame;

/// Why a frame produced no text.
#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    /// The recogniser cannot handle this kind of frame.
    #[error("recogniser does not accept {0} frames")]
    UnsupportedFrame(&'static str),

    /// The OCR engine could not be started.
    #[error("failed to run {}", program.display())]
    Spawn {
        /// The program that was run.
        program: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The OCR engine exited unsuccessfully.
    #[error("OCR engine exited with {status}: {stderr}")]
    Failed {
        /// The exit status.
        status: ExitStatus,
        /// What the engine wrote to stderr.
        stderr: String,
    },
}

/// Turns a frame into best-effort text.
///
/// The text may be empty or noisy; callers never trust it unvalidated.
pub trait Recognizer {
    /// Recognises the text in `frame`.
    ///
    /// # Errors
    ///
    /// Returns an error if no text could be produced. Sessions treat this as
    /// a frame without a match.
    fn recognize(&mut self, frame: &Frame) -> Result<String, RecognitionError>;
}

/// Runs the `tesseract` command-line engine on image frames.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    program: PathBuf,
}

impl TesseractCli {
    /// LSTM engine, single uniform block of text.
    const ARGS: [&'static str; 4] = ["--oem", "3", "--psm", "6"];

    /// Uses the tesseract executable at `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, image: &Path) -> Result<String, RecognitionError> {
        let output = Command::new(&self.program)
            .arg(image)
            .arg("stdout")
            .args(Self::ARGS)
            .output()
            .map_err(|source| RecognitionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RecognitionError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl Recognizer for TesseractCli {
    fn recognize(&mut self, frame: &Frame) -> Result<String, RecognitionError> {
        match frame {
            Frame::Image(path) => self.run(path),
            Frame::Text(_) => Err(RecognitionError::UnsupportedFrame("text")),
        }
    }
}

/// Returns the text of frames that were recognised upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Recognizer for Passthrough {
    fn recognize(&mut self, frame: &Frame) -> Result<String, RecognitionError> {
        match frame {
            Frame::Text(text) => Ok(text.clone()),
            Frame::Image(_) => Err(RecognitionError::UnsupportedFrame("image")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_returns_text() {
        let text = Passthrough
            .recognize(&Frame::Text("CAS 50-00-0".into()))
            .unwrap();
        assert_eq!(text, "CAS 50-00-0");
    }

    #[test]
    fn passthrough_rejects_images() {
        assert!(matches!(
            Passthrough.recognize(&Frame::Image("a.png".into())),
            Err(RecognitionError::UnsupportedFrame("image"))
        ));
    }

    #[test]
    fn tesseract_rejects_text_frames() {
        assert!(matches!(
            TesseractCli::default().recognize(&Frame::Text(String::new())),
            Err(RecognitionError::UnsupportedFrame("text"))
        ));
    }

    #[test]
    fn missing_engine_is_a_spawn_error() {
        let mut tesseract = TesseractCli::new("/nonexistent/labscan-tesseract");
        assert!(matches!(
            tesseract.recognize(&Frame::Image("frame.png".into())),
            Err(RecognitionError::Spawn { .. })
        ));
    }
}
