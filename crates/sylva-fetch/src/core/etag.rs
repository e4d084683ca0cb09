use once_cell::sync::Lazy;
use regex::Regex;

// quoted-string with backslash escapes; [ !#-~] is every printable byte
// except the double quote
static ETAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^(W/)?"((?:[ !#-~]|\\.)+)"$"#).unwrap());

/// A parsed HTTP entity tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTag {
    pub weak: bool,
    /// The tag with quoted-string escapes removed.
    pub tag: String,
}

impl EntityTag {
    /// Parse an `ETag` header value.
    ///
    /// Malformed values yield `None`: a server sending an unparseable tag is
    /// treated as sending no tag at all, never as an error.
    pub fn parse(value: &str) -> Option<EntityTag> {
        let caps = ETAG.captures(value)?;
        let raw = caps.get(2)?.as_str();

        let mut tag = String::with_capacity(raw.len());
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some(escaped) => tag.push(escaped),
                    None => tag.push(c),
                }
            } else {
                tag.push(c);
            }
        }

        Some(EntityTag {
            weak: caps.get(1).is_some(),
            tag,
        })
    }
}

/// Format a tag as a quoted-string header value.
///
/// Backslashes and quotes are escaped; `weak` prefixes `W/`.
pub fn format_entity_tag(tag: &str, weak: bool) -> String {
    let mut out = String::with_capacity(tag.len() + 4);
    if weak {
        out.push_str("W/");
    }
    out.push('"');
    for c in tag.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
