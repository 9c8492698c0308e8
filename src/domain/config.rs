use std::{
    fmt,
    num::NonZeroU32,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::domain::cas::DEFAULT_MIN_DIGITS;

/// Where frames come from during a scanning session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceSelector {
    /// Image files in a directory, read in file-name order.
    Frames {
        /// The directory holding the frames.
        dir: PathBuf,
    },
    /// A text file with one line of recognised text per frame.
    Transcript {
        /// The transcript file.
        path: PathBuf,
    },
}

impl fmt::Display for SourceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frames { dir } => write!(f, "frames:{}", dir.display()),
            Self::Transcript { path } => write!(f, "transcript:{}", path.display()),
        }
    }
}

impl FromStr for SourceSelector {
    type Err = Error;

    /// Parses `frames:<dir>` or `transcript:<file>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("frames", dir)) if !dir.is_empty() => Ok(Self::Frames { dir: dir.into() }),
            Some(("transcript", path)) if !path.is_empty() => Ok(Self::Transcript {
                path: path.into(),
            }),
            _ => Err(Error::Invalid(format!(
                "source must be 'frames:<dir>' or 'transcript:<file>', got '{s}'"
            ))),
        }
    }
}

/// Settings for the (inactive by default) name-based matching strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuzzyConfig {
    /// Whether name matching runs after identifier matching fails.
    #[serde(default)]
    pub enabled: bool,

    /// The minimum similarity score (0-100, 100 = exact) for a name match.
    #[serde(default = "default_threshold")]
    pub threshold: u8,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: default_threshold(),
        }
    }
}

/// Configuration for a scanning session.
///
/// Every tunable of the session lives here and is passed explicitly into the
/// session when it is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Versions", into = "Versions")]
pub struct Config {
    /// Run recognition on every Nth frame.
    ///
    /// Recognition dominates the cost of a frame; frames in between reuse the
    /// most recent decision.
    poll_interval: NonZeroU32,

    /// How long a confirmed match stays on screen without being re-detected.
    persistence: Duration,

    /// The minimum number of digits in an accepted registry number.
    min_digits: usize,

    /// The frame source, if not given on the command line.
    pub source: Option<SourceSelector>,

    /// The tesseract executable used to recognise image frames.
    pub tesseract: PathBuf,

    /// Name-based matching.
    pub fuzzy: FuzzyConfig,

    /// Where missing-item reports are written.
    ///
    /// Defaults to the directory containing the dataset.
    pub report_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            persistence: Duration::from_secs_f64(default_persistence_seconds()),
            min_digits: DEFAULT_MIN_DIGITS,
            source: None,
            tesseract: default_tesseract(),
            fuzzy: FuzzyConfig::default(),
            report_dir: None,
        }
    }
}

impl Config {
    /// The file name looked for next to a dataset.
    pub const FILE_NAME: &'static str = "labscan.toml";

    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, if the TOML content is
    /// invalid, or if a value is out of range.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads the configuration at `path` if the file exists, or the defaults
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub fn load_or_default(path: &Path) -> Result<Self, Error> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Recognition runs on every `poll_interval`th frame.
    #[must_use]
    pub const fn poll_interval(&self) -> NonZeroU32 {
        self.poll_interval
    }

    /// Sets the polling interval.
    pub const fn set_poll_interval(&mut self, value: NonZeroU32) {
        self.poll_interval = value;
    }

    /// How long a confirmed match persists.
    #[must_use]
    pub const fn persistence(&self) -> Duration {
        self.persistence
    }

    /// Sets the persistence window, in seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if `seconds` is negative or not finite.
    pub fn set_persistence_seconds(&mut self, seconds: f64) -> Result<(), Error> {
        self.persistence = persistence_from_seconds(seconds)?;
        Ok(())
    }

    /// The minimum number of digits in an accepted registry number.
    #[must_use]
    pub const fn min_digits(&self) -> usize {
        self.min_digits
    }

    /// Sets the minimum digit count.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is outside `2..=10`.
    pub fn set_min_digits(&mut self, value: usize) -> Result<(), Error> {
        self.min_digits = validate_min_digits(value)?;
        Ok(())
    }

    /// Sets the name-matching threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` exceeds 100.
    pub fn set_fuzzy_threshold(&mut self, value: u8) -> Result<(), Error> {
        self.fuzzy.threshold = validate_threshold(value)?;
        Ok(())
    }
}

/// Errors that can occur when loading, validating or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration file could not be read.
    #[error("failed to read config file {}", path.display())]
    Read {
        /// The file that was read.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The configuration file could not be written.
    #[error("failed to write config file {}", path.display())]
    Write {
        /// The file that was written.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML, or has the wrong shape.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

const fn default_poll_interval() -> NonZeroU32 {
    NonZeroU32::new(10).expect("10 is non-zero")
}

const fn default_persistence_seconds() -> f64 {
    3.0
}

const fn default_min_digits() -> usize {
    DEFAULT_MIN_DIGITS
}

const fn default_threshold() -> u8 {
    80
}

fn default_tesseract() -> PathBuf {
    PathBuf::from("tesseract")
}

fn persistence_from_seconds(seconds: f64) -> Result<Duration, Error> {
    Duration::try_from_secs_f64(seconds).map_err(|_| {
        Error::Invalid(format!(
            "persistence_seconds must be a finite, non-negative number, got {seconds}"
        ))
    })
}

fn validate_min_digits(value: usize) -> Result<usize, Error> {
    if (2..=10).contains(&value) {
        Ok(value)
    } else {
        Err(Error::Invalid(format!(
            "min_digits must be between 2 and 10, got {value}"
        )))
    }
}

fn validate_threshold(value: u8) -> Result<u8, Error> {
    if value <= 100 {
        Ok(value)
    } else {
        Err(Error::Invalid(format!(
            "fuzzy.threshold must be at most 100, got {value}"
        )))
    }
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_poll_interval_raw")]
        poll_interval: u32,

        #[serde(default = "default_persistence_seconds")]
        persistence_seconds: f64,

        #[serde(default = "default_min_digits")]
        min_digits: usize,

        #[serde(default = "default_tesseract")]
        tesseract: PathBuf,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        report_dir: Option<PathBuf>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<SourceSelector>,

        #[serde(default)]
        fuzzy: FuzzyConfig,
    },
}

const fn default_poll_interval_raw() -> u32 {
    default_poll_interval().get()
}

impl TryFrom<Versions> for Config {
    type Error = Error;

    fn try_from(versions: Versions) -> Result<Self, Self::Error> {
        match versions {
            Versions::V1 {
                poll_interval,
                persistence_seconds,
                min_digits,
                source,
                tesseract,
                fuzzy,
                report_dir,
            } => Ok(Self {
                poll_interval: NonZeroU32::new(poll_interval).ok_or_else(|| {
                    Error::Invalid("poll_interval must be at least 1".to_string())
                })?,
                persistence: persistence_from_seconds(persistence_seconds)?,
                min_digits: validate_min_digits(min_digits)?,
                source,
                tesseract,
                fuzzy: FuzzyConfig {
                    threshold: validate_threshold(fuzzy.threshold)?,
                    ..fuzzy
                },
                report_dir,
            }),
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            poll_interval: config.poll_interval.get(),
            persistence_seconds: config.persistence.as_secs_f64(),
            min_digits: config.min_digits,
            source: config.source,
            tesseract: config.tesseract,
            fuzzy: config.fuzzy,
            report_dir: config.report_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use test_case::test_case;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\npoll_interval = 5\npersistence_seconds = 1.5\nmin_digits = 6\n\
              tesseract = \"/opt/tesseract\"\n\n[source]\nkind = \"frames\"\ndir = \"frames\"\n\n\
              [fuzzy]\nenabled = true\nthreshold = 90\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.poll_interval().get(), 5);
        assert_eq!(config.persistence(), Duration::from_millis(1500));
        assert_eq!(config.min_digits(), 6);
        assert_eq!(config.tesseract, PathBuf::from("/opt/tesseract"));
        assert_eq!(
            config.source,
            Some(SourceSelector::Frames {
                dir: PathBuf::from("frames")
            })
        );
        assert!(config.fuzzy.enabled);
        assert_eq!(config.fuzzy.threshold, 90);
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        let error = Config::load(&missing).unwrap_err();
        assert!(matches!(error, Error::Read { .. }));
    }

    #[test]
    fn load_or_default_tolerates_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&tmp.path().join(Config::FILE_NAME)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test_case("poll_interval = 0"; "zero poll interval")]
    #[test_case("persistence_seconds = -1.0"; "negative persistence")]
    #[test_case("min_digits = 1"; "min digits too small")]
    #[test_case("min_digits = 11"; "min digits too large")]
    #[test_case("[fuzzy]\nthreshold = 101"; "threshold above 100")]
    fn out_of_range_values_are_rejected(body: &str) {
        let content = format!("_version = \"1\"\n{body}\n");
        assert!(toml::from_str::<Config>(&content).is_err());
    }

    #[test]
    fn empty_file_returns_default() {
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
        assert_eq!(actual.poll_interval().get(), 10);
        assert_eq!(actual.persistence(), Duration::from_secs(3));
        assert_eq!(actual.min_digits(), 5);
        assert!(!actual.fuzzy.enabled);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(Config::FILE_NAME);

        let mut config = Config::default();
        config.set_poll_interval(NonZeroU32::new(3).unwrap());
        config.set_persistence_seconds(4.5).unwrap();
        config.source = Some(SourceSelector::Transcript {
            path: PathBuf::from("run.txt"),
        });
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test_case("frames:cam0", Some(SourceSelector::Frames { dir: "cam0".into() }); "frames")]
    #[test_case("transcript:run.txt", Some(SourceSelector::Transcript { path: "run.txt".into() }); "transcript")]
    #[test_case("camera:0", None; "unknown kind")]
    #[test_case("frames:", None; "empty path")]
    fn source_selector_parses(input: &str, expected: Option<SourceSelector>) {
        assert_eq!(input.parse::<SourceSelector>().ok(), expected);
    }
}
