//! Deterministic thumbnail URL construction.
//!
//! A photo's thumbnail location is a pure function of its library path:
//! strip the storage mount prefix, cut everything before the library anchor
//! when one is configured, percent-encode the remainder, and append the
//! gallery's size suffix.

/// Maps photo paths to thumbnail URLs.
#[derive(Debug, Clone)]
pub struct ThumbnailResolver {
    base_url: String,
    strip_prefixes: Vec<String>,
    anchor: Option<String>,
    suffix: String,
}

impl ThumbnailResolver {
    /// Resolver for the backend's own photo proxy endpoint
    /// (`{server}/api/photo/{encoded path}`).
    pub fn proxy(server_url: &str) -> Self {
        Self {
            base_url: format!("{}/api/photo", server_url.trim_end_matches('/')),
            strip_prefixes: Vec::new(),
            anchor: None,
            suffix: String::new(),
        }
    }

    /// Resolver for an external gallery that serves sized thumbnails under
    /// library-relative paths.
    pub fn gallery(base_url: &str, anchor: &str, size: u32) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            strip_prefixes: Vec::new(),
            anchor: Some(anchor.to_string()),
            suffix: format!("/thumbnail/{size}"),
        }
    }

    /// Mount prefixes to drop from the front of absolute photo paths before
    /// encoding, tried in order; only the first match is stripped.
    pub fn with_strip_prefixes(mut self, prefixes: impl IntoIterator<Item = String>) -> Self {
        self.strip_prefixes = prefixes.into_iter().collect();
        self
    }

    pub fn url(&self, photo_path: &str) -> String {
        let mut path = photo_path;
        for prefix in &self.strip_prefixes {
            if let Some(rest) = path.strip_prefix(prefix.as_str()) {
                path = rest;
                break;
            }
        }
        if let Some(anchor) = &self.anchor {
            if let Some(index) = path.find(anchor.as_str()) {
                path = &path[index..];
            }
        }
        format!("{}/{}{}", self.base_url, urlencoding::encode(path), self.suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_urls_percent_encode_the_whole_path() {
        let resolver = ThumbnailResolver::proxy("http://localhost:5000/");
        assert_eq!(
            resolver.url("Sessions/2024 spring/a b.jpg"),
            "http://localhost:5000/api/photo/Sessions%2F2024%20spring%2Fa%20b.jpg"
        );
    }

    #[test]
    fn gallery_urls_strip_the_mount_and_cut_to_the_anchor() {
        let resolver = ThumbnailResolver::gallery("https://gallery.example.net/content", "Pictures/Sessions", 480)
            .with_strip_prefixes(["/mnt/storage/".to_string(), "mnt/storage/".to_string()]);
        assert_eq!(
            resolver.url("/mnt/storage/backup/Pictures/Sessions/a.jpg"),
            "https://gallery.example.net/content/Pictures%2FSessions%2Fa.jpg/thumbnail/480"
        );
    }

    #[test]
    fn paths_without_mount_or_anchor_pass_through_encoded() {
        let resolver = ThumbnailResolver::gallery("https://gallery.example.net/content", "Pictures/Sessions", 480);
        assert_eq!(
            resolver.url("elsewhere/c.jpg"),
            "https://gallery.example.net/content/elsewhere%2Fc.jpg/thumbnail/480"
        );
    }

    #[test]
    fn only_the_first_matching_prefix_is_stripped() {
        let resolver = ThumbnailResolver::proxy("http://localhost:5000").with_strip_prefixes([
            "/mnt/a/".to_string(),
            "/mnt/".to_string(),
        ]);
        assert_eq!(
            resolver.url("/mnt/a/mnt/x.jpg"),
            "http://localhost:5000/api/photo/mnt%2Fx.jpg"
        );
    }
}
