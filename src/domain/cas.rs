use std::{fmt, ops::Deref, str::FromStr, sync::LazyLock};

use regex::Regex;

/// The default minimum number of digits (check digit included) in a registry
/// number.
pub const DEFAULT_MIN_DIGITS: usize = 5;

/// Loose shape of a registry number as it appears in running text.
static CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{2,7}-\d{2}-\d)\b").expect("candidate pattern is a valid regex")
});

/// The same shape, anchored to the whole input.
static EXACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2,7}-\d{2}-\d$").expect("exact pattern is a valid regex"));

/// A checksum-validated chemical registry (CAS) number.
///
/// Format: `{D2..7}-{D2}-{D1}`, where the final digit is a check digit over
/// all preceding digits (see [`checksum`]).
///
/// Examples: `50-00-0` (formaldehyde), `7732-18-5` (water), `64-17-5`
/// (ethanol).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CasNumber(String);

impl CasNumber {
    /// Parses a registry number, requiring at least `min_digits` digits.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] describing why `s` is not a valid registry number.
    pub fn parse_with_min(s: &str, min_digits: usize) -> Result<Self, Error> {
        if !EXACT.is_match(s) {
            return Err(Error::Syntax(s.to_string()));
        }

        // `\d` is Unicode-aware, so the shape check alone admits non-ASCII
        // digits.
        let digits = s
            .chars()
            .filter(|c| *c != '-')
            .map(|c| {
                c.is_ascii_digit()
                    .then(|| c.to_digit(10))
                    .flatten()
                    .ok_or_else(|| Error::NotDigits(s.to_string()))
            })
            .collect::<Result<Vec<u32>, _>>()?;

        if digits.len() < min_digits {
            return Err(Error::TooShort {
                value: s.to_string(),
                digits: digits.len(),
                min: min_digits,
            });
        }

        let (found, body) = digits
            .split_last()
            .ok_or_else(|| Error::Syntax(s.to_string()))?;
        let expected = checksum(body);
        if expected != *found {
            return Err(Error::Checksum {
                value: s.to_string(),
                expected,
                found: *found,
            });
        }

        Ok(Self(s.to_string()))
    }

    /// Returns the hyphenated registry number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the check digit.
    #[must_use]
    pub fn check_digit(&self) -> u32 {
        self.0
            .chars()
            .next_back()
            .and_then(|c| c.to_digit(10))
            .unwrap_or_default()
    }
}

/// Computes the check digit for the given digits.
///
/// Digits are weighted 1, 2, 3, ... starting from the least significant
/// (rightmost) digit and walking outward; the check digit is the weighted sum
/// modulo 10.
///
/// ```
/// use labscan::domain::cas::checksum;
///
/// // 7732-18-5: 8*1 + 1*2 + 2*3 + 3*4 + 7*5 + 7*6 = 105
/// assert_eq!(checksum(&[7, 7, 3, 2, 1, 8]), 5);
/// ```
#[must_use]
pub fn checksum(digits: &[u32]) -> u32 {
    digits
        .iter()
        .rev()
        .zip(1u32..)
        .map(|(digit, weight)| digit * weight)
        .sum::<u32>()
        % 10
}

impl AsRef<str> for CasNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for CasNumber {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for CasNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CasNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with_min(s, DEFAULT_MIN_DIGITS)
    }
}

impl TryFrom<&str> for CasNumber {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value)
    }
}

/// Errors that can occur when validating a registry number.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The input is not shaped like `D(2..7)-DD-D`.
    #[error("'{0}' is not shaped like a CAS number (NNNNNNN-NN-N)")]
    Syntax(String),

    /// The input contains digit characters outside `0-9`.
    #[error("'{0}' contains non-ASCII digits")]
    NotDigits(String),

    /// The input has fewer digits than required.
    #[error("'{value}' has {digits} digits, at least {min} are required")]
    TooShort {
        /// The rejected input.
        value: String,
        /// The number of digits found.
        digits: usize,
        /// The configured minimum.
        min: usize,
    },

    /// The check digit does not match the weighted digit sum.
    #[error("'{value}' fails its checksum: expected check digit {expected}, found {found}")]
    Checksum {
        /// The rejected input.
        value: String,
        /// The check digit computed from the body.
        expected: u32,
        /// The check digit present in the input.
        found: u32,
    },
}

/// A candidate substring found in text, along with its validation outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'t> {
    /// The matched substring.
    pub text: &'t str,
    /// The byte offset of the match in the scanned text.
    pub offset: usize,
    /// The validation outcome.
    pub outcome: Result<CasNumber, Error>,
}

/// Finds checksum-valid registry numbers in free text such as OCR output.
///
/// The extractor is stateless: the same text always yields the same numbers,
/// in order of appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extractor {
    min_digits: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DIGITS)
    }
}

impl Extractor {
    /// Creates an extractor rejecting candidates with fewer than `min_digits`
    /// digits.
    #[must_use]
    pub const fn new(min_digits: usize) -> Self {
        Self { min_digits }
    }

    /// Returns the minimum digit count.
    #[must_use]
    pub const fn min_digits(&self) -> usize {
        self.min_digits
    }

    /// Returns every shape-matching substring of `text` with its validation
    /// outcome.
    pub fn candidates(self, text: &str) -> impl Iterator<Item = Candidate<'_>> {
        CANDIDATE.find_iter(text).map(move |m| Candidate {
            text: m.as_str(),
            offset: m.start(),
            outcome: CasNumber::parse_with_min(m.as_str(), self.min_digits),
        })
    }

    /// Returns the valid registry numbers in `text`, in order of appearance.
    ///
    /// Invalid candidates are discarded; this never fails.
    #[must_use]
    pub fn extract(self, text: &str) -> Vec<CasNumber> {
        self.candidates(text)
            .filter_map(|candidate| match candidate.outcome {
                Ok(cas) => Some(cas),
                Err(e) => {
                    tracing::trace!(candidate = candidate.text, error = %e, "discarding candidate");
                    None
                }
            })
            .collect()
    }
}

/// Extracts valid registry numbers from `text` using the default minimum
/// digit count.
///
/// ```
/// use labscan::domain::cas::extract;
///
/// let found = extract("lot 50-00-0 exp 2025, batch 50-00-1");
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].as_str(), "50-00-0");
/// ```
#[must_use]
pub fn extract(text: &str) -> Vec<CasNumber> {
    Extractor::default().extract(text)
}
