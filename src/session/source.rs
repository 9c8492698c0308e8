//! Frame sources.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

/// Image extensions accepted by [`FrameDirectory`].
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "pbm", "pgm", "ppm"];

/// The content of one captured frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A raster image on disk.
    Image(PathBuf),
    /// Text already recognised upstream.
    Text(String),
}

/// Errors from acquiring frames.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The source could not be opened.
    #[error("failed to open frame source {}", path.display())]
    Open {
        /// The source path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// A frame could not be read.
    #[error("failed to read frame")]
    Read(#[from] io::Error),
}

/// Supplies successive frames to a session.
pub trait FrameSource {
    /// Returns the next frame, or `None` once the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be read. Sessions treat this as
    /// the end of capture.
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// Releases the underlying capture resource.
    ///
    /// Called exactly once when the session ends.
    fn release(&mut self) {}
}

/// Image files in a directory, yielded in file-name order.
///
/// The directory is listed once when opened; frames written later are not
/// picked up.
#[derive(Debug)]
pub struct FrameDirectory {
    dir: PathBuf,
    frames: std::vec::IntoIter<PathBuf>,
}

impl FrameDirectory {
    /// Lists the images in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` cannot be listed.
    pub fn open(dir: &Path) -> Result<Self, CaptureError> {
        if !dir.is_dir() {
            return Err(CaptureError::Open {
                path: dir.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "not a directory"),
            });
        }

        let mut frames = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| CaptureError::Open {
                path: dir.to_path_buf(),
                source: e.into(),
            })?;
            if entry.file_type().is_file() && is_image(entry.path()) {
                frames.push(entry.into_path());
            }
        }
        tracing::debug!(dir = %dir.display(), frames = frames.len(), "opened frame directory");

        Ok(Self {
            dir: dir.to_path_buf(),
            frames: frames.into_iter(),
        })
    }

    /// The number of frames not yet yielded.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

impl FrameSource for FrameDirectory {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        Ok(self.frames.next().map(Frame::Image))
    }

    fn release(&mut self) {
        tracing::debug!(dir = %self.dir.display(), "released frame directory");
    }
}

/// A text file holding one line of recognised text per frame.
///
/// Useful for replaying a session without a camera. Bytes that are not valid
/// UTF-8 are replaced with U+FFFD, as OCR dumps often contain stray bytes.
#[derive(Debug)]
pub struct Transcript {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    line: Vec<u8>,
}

impl Transcript {
    /// Opens the transcript at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let file = File::open(path).map_err(|source| CaptureError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: Some(BufReader::new(file)),
            line: Vec::new(),
        })
    }
}

impl FrameSource for Transcript {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        self.line.clear();
        if reader.read_until(b'\n', &mut self.line)? == 0 {
            return Ok(None);
        }
        if self.line.last() == Some(&b'\n') {
            self.line.pop();
            if self.line.last() == Some(&b'\r') {
                self.line.pop();
            }
        }
        Ok(Some(Frame::Text(String::from_utf8_lossy(&self.line).into_owned())))
    }

    fn release(&mut self) {
        // Dropping the reader closes the file.
        self.reader = None;
        tracing::debug!(path = %self.path.display(), "released transcript");
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn frame_directory_yields_images_in_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["002.png", "001.PNG", "notes.txt", "003.jpg"] {
            fs::write(tmp.path().join(name), b"").unwrap();
        }
        fs::create_dir(tmp.path().join("nested.png")).unwrap();

        let mut source = FrameDirectory::open(tmp.path()).unwrap();
        assert_eq!(source.remaining(), 3);

        let mut names = Vec::new();
        while let Some(Frame::Image(path)) = source.next_frame().unwrap() {
            names.push(path.file_name().unwrap().to_string_lossy().into_owned());
        }
        assert_eq!(names, ["001.PNG", "002.png", "003.jpg"]);
    }

    #[test]
    fn missing_frame_directory_fails_to_open() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            FrameDirectory::open(&tmp.path().join("missing")),
            Err(CaptureError::Open { .. })
        ));
    }

    #[test]
    fn transcript_yields_one_frame_per_line() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("run.txt");
        fs::write(&path, "first\n\nCAS 50-00-0\n").unwrap();

        let mut source = Transcript::open(&path).unwrap();
        assert_eq!(source.next_frame().unwrap(), Some(Frame::Text("first".into())));
        assert_eq!(source.next_frame().unwrap(), Some(Frame::Text(String::new())));
        assert_eq!(
            source.next_frame().unwrap(),
            Some(Frame::Text("CAS 50-00-0".into()))
        );
        assert_eq!(source.next_frame().unwrap(), None);
    }

    #[test]
    fn transcript_replaces_invalid_utf8() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("run.txt");
        fs::write(&path, b"ok\r\n\xff\xfe 50-00-0\nend").unwrap();

        let mut source = Transcript::open(&path).unwrap();
        assert_eq!(source.next_frame().unwrap(), Some(Frame::Text("ok".into())));
        assert_eq!(
            source.next_frame().unwrap(),
            Some(Frame::Text("\u{fffd}\u{fffd} 50-00-0".into()))
        );
        assert_eq!(source.next_frame().unwrap(), Some(Frame::Text("end".into())));
        assert_eq!(source.next_frame().unwrap(), None);
    }

    #[test]
    fn released_transcript_is_exhausted() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("run.txt");
        fs::write(&path, "a\nb\n").unwrap();

        let mut source = Transcript::open(&path).unwrap();
        source.release();
        assert_eq!(source.next_frame().unwrap(), None);
    }
}
