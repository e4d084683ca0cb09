//! Mapping decoded storage keys back onto fetchable URLs.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use url::Url;

use crate::SyncError;

// characters that cannot travel raw inside a URL path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Where assets live remotely.
///
/// The extractor hands out decoded storage keys; this layout re-encodes a
/// key onto the store's base URL so the transfer engine has something to
/// fetch. Re-encoding is what lets differently-escaped spellings of the
/// same object collapse into a single transfer.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    base: Url,
}

impl StoreLayout {
    pub fn new(base: impl AsRef<str>) -> Result<Self, SyncError> {
        let base = Url::parse(base.as_ref())?;
        if base.host_str().is_none() {
            return Err(SyncError::StoreUrlWithoutHost);
        }
        Ok(Self { base })
    }

    /// The store's hostname, for classifying references.
    pub fn host(&self) -> &str {
        self.base.host_str().unwrap_or_default()
    }

    /// Rebuild the fetchable URL for a decoded storage key.
    pub fn url_for(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
            .collect();
        format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            encoded.join("/")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unusable_bases() {
        assert!(StoreLayout::new("not a url").is_err());
        assert!(StoreLayout::new("unix:/var/run/store.sock").is_err());
    }

    #[test]
    fn exposes_the_host() {
        let layout = StoreLayout::new("https://media.store.test").unwrap();
        assert_eq!(layout.host(), "media.store.test");
    }

    #[test]
    fn builds_plain_urls() {
        let layout = StoreLayout::new("https://media.store.test").unwrap();
        assert_eq!(
            layout.url_for("img/hero.png"),
            "https://media.store.test/img/hero.png"
        );
    }

    #[test]
    fn re_encodes_reserved_characters() {
        let layout = StoreLayout::new("https://media.store.test").unwrap();
        assert_eq!(
            layout.url_for("img/My Shot #1.png"),
            "https://media.store.test/img/My%20Shot%20%231.png"
        );
    }

    #[test]
    fn round_trips_through_the_extractor() {
        use sylva_assets::AssetExtractor;

        let layout = StoreLayout::new("https://media.store.test").unwrap();
        let key = "img/Déjà Vu 100%.png";
        let url = layout.url_for(key);

        let manifest =
            AssetExtractor::new(layout.host()).extract(serde_json::json!(url), "assets");
        assert_eq!(manifest.keys, vec![key]);
    }
}
