/// Scores how alike two strings are, from 0 (nothing shared) to 100
/// (identical).
///
/// The score is the Levenshtein distance normalised by the longer string's
/// length, computed over characters rather than bytes.
#[must_use]
pub fn ratio(a: &str, b: &str) -> u8 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 100;
    }

    let distance = strsim::levenshtein(a, b);
    let score = 100 * (longest - distance) / longest;
    u8::try_from(score).unwrap_or(100)
}
