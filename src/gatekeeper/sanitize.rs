//! Input sanitization for candidate command strings.

/// Characters stripped from every candidate before validation.
///
/// Angle brackets, quotes, and the ampersand are the classic shell/HTML
/// injection carriers. Execution never goes through a shell, so this is a
/// second layer, not the primary defense.
const DENYLIST: &[char] = &['<', '>', '"', '\'', '&'];

/// Strip denylisted characters and normalize whitespace.
///
/// Total function; never fails. Runs of whitespace collapse to a single
/// space and the result is trimmed, so an input consisting solely of
/// denylisted characters or whitespace sanitizes to the empty string
/// (which downstream validation rejects as malformed).
pub fn sanitize(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !DENYLIST.contains(c)).collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
