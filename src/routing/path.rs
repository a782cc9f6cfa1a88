//! Request path tokenizing.
//!
//! # Responsibilities
//! - Split a request path into segments
//! - Percent-decode each segment independently
//!
//! # Design Decisions
//! - One leading and one trailing `/` are ignored; `""` and `"/"` have no segments
//! - Interior empty segments are kept (they never match a parameter)
//! - Decoding happens after splitting, so `%2F` stays inside its segment

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

/// A tokenized request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    raw: String,
    segments: Vec<String>,
}

impl RequestPath {
    pub fn parse(path: &str) -> Self {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        let segments = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').map(|s| decode(s).into_owned()).collect()
        };
        Self {
            raw: path.to_string(),
            segments,
        }
    }

    /// The path exactly as given to `parse`.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Decoded segments from `index` on, joined with `/`. Empty past the end.
    pub fn remainder(&self, index: usize) -> String {
        self.segments.get(index..).map(|s| s.join("/")).unwrap_or_default()
    }
}

fn decode(segment: &str) -> Cow<'_, str> {
    percent_decode_str(segment).decode_utf8_lossy()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_has_no_segments() {
        assert!(RequestPath::parse("").is_empty());
        assert!(RequestPath::parse("/").is_empty());
    }

    #[test]
    fn test_trailing_slash_ignored() {
        let path = RequestPath::parse("/products/all/");
        assert_eq!(path.segments(), &["products", "all"]);
    }

    #[test]
    fn test_interior_empty_segment_kept() {
        let path = RequestPath::parse("/a//b");
        assert_eq!(path.segments(), &["a", "", "b"]);
    }

    #[test]
    fn test_segments_are_decoded() {
        let path = RequestPath::parse("/files/a%2Fb/caf%C3%A9");
        assert_eq!(path.get(1), Some("a/b"));
        assert_eq!(path.get(2), Some("café"));
    }

    #[test]
    fn test_remainder() {
        let path = RequestPath::parse("/files/a/b");
        assert_eq!(path.remainder(1), "a/b");
        assert_eq!(path.remainder(3), "");
        assert_eq!(path.remainder(7), "");
    }
}
