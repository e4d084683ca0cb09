use once_cell::sync::Lazy;
use regex::Regex;

static CONTENT_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^bytes ((\d+)-(\d+)|\*)/(\d+|\*)$").unwrap());

/// A parsed `Content-Range` response header.
///
/// Accepts `bytes <first>-<last>/<length>`, `bytes */<length>` and
/// `bytes <first>-<last>/*`; the `*` forms leave the corresponding field
/// unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// Satisfied byte range as `(first, last)`, absent for `bytes */n`.
    pub range: Option<(u64, u64)>,
    /// Complete representation length, absent for a `/*` suffix.
    pub length: Option<u64>,
}

impl ContentRange {
    /// Parse a header value, `None` when it is not a byte-range-spec.
    pub fn parse(value: &str) -> Option<ContentRange> {
        let caps = CONTENT_RANGE.captures(value)?;

        let range = match (caps.get(2), caps.get(3)) {
            (Some(first), Some(last)) => {
                Some((first.as_str().parse().ok()?, last.as_str().parse().ok()?))
            }
            _ => None,
        };

        let length = match caps.get(4)?.as_str() {
            "*" => None,
            digits => Some(digits.parse().ok()?),
        };

        Some(ContentRange { range, length })
    }

    /// Start offset usable for seeking into a partial local file, when the
    /// server declared one.
    pub fn usable_start(&self) -> Option<u64> {
        self.range.map(|(first, _)| first)
    }
}
