//! Image placeholder codec.
//!
//! OCR output embeds every figure as `![id](data:image/…;base64,…)`. Those
//! payloads are huge in token terms and must survive translation byte for
//! byte, so before chunking each markup is swapped for a short `{IMAGE_<i>}`
//! token and swapped back after the translated document is reassembled.
//!
//! `i` is the 0-based order of appearance. Identical markups appearing twice
//! get two placeholders, both mapped to the same markup string.

use crate::pipeline::markdown::RE_IMAGE_MARKUP;
use tracing::{debug, warn};

/// Ordered mapping from placeholder index to the original image markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderMap {
    markups: Vec<String>,
}

impl PlaceholderMap {
    /// The placeholder token for index `i`.
    pub fn token(i: usize) -> String {
        format!("{{IMAGE_{i}}}")
    }

    /// Extracted markups, in placeholder order.
    pub fn markups(&self) -> &[String] {
        &self.markups
    }

    pub fn len(&self) -> usize {
        self.markups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markups.is_empty()
    }

    /// Indices whose placeholder token does not occur in `text`.
    pub fn missing_in(&self, text: &str) -> Vec<usize> {
        (0..self.markups.len())
            .filter(|&i| !text.contains(&Self::token(i)))
            .collect()
    }
}

/// Replace every image markup with a `{IMAGE_<i>}` placeholder.
///
/// Returns the rewritten Markdown and the mapping needed by [`restore`].
pub fn extract(markdown: &str) -> (String, PlaceholderMap) {
    let mut markups = Vec::new();
    let replaced = RE_IMAGE_MARKUP.replace_all(markdown, |caps: &regex::Captures<'_>| {
        let token = PlaceholderMap::token(markups.len());
        markups.push(caps[0].to_string());
        token
    });
    debug!("Extracted {} image markup(s)", markups.len());
    (replaced.into_owned(), PlaceholderMap { markups })
}

/// Put the original image markups back, first occurrence of each placeholder
/// only, in placeholder order.
///
/// A placeholder that no longer exists (the translator dropped or mangled it)
/// is skipped; its image is lost from the output.
pub fn restore(markdown: &str, map: &PlaceholderMap) -> String {
    let mut out = markdown.to_string();
    for (i, markup) in map.markups.iter().enumerate() {
        let token = PlaceholderMap::token(i);
        if out.contains(&token) {
            out = out.replacen(&token, markup, 1);
        } else {
            warn!("Image placeholder {} missing after translation; image dropped", token);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_numbers_in_order() {
        let md = "Intro ![fig1](a.png) text ![fig2](b.png) end";
        let (out, map) = extract(md);
        assert_eq!(out, "Intro {IMAGE_0} text {IMAGE_1} end");
        assert_eq!(map.markups(), ["![fig1](a.png)", "![fig2](b.png)"]);
    }

    #[test]
    fn duplicate_markups_get_distinct_placeholders() {
        let md = "![a](x)\n\n![a](x)";
        let (out, map) = extract(md);
        assert_eq!(out, "{IMAGE_0}\n\n{IMAGE_1}");
        assert_eq!(map.markups(), ["![a](x)", "![a](x)"]);
        assert_eq!(restore(&out, &map), md);
    }

    #[test]
    fn round_trip_is_identity() {
        let md = "# T\n\n![img-0.jpeg](data:image/jpeg;base64,/9j/4AAQ)\n\nBody ![x](y) and ![z](w).";
        let (out, map) = extract(md);
        assert!(!out.contains("base64"));
        assert_eq!(restore(&out, &map), md);
    }

    #[test]
    fn no_images_is_noop() {
        let (out, map) = extract("plain text");
        assert_eq!(out, "plain text");
        assert!(map.is_empty());
        assert_eq!(restore(&out, &map), "plain text");
    }

    #[test]
    fn restore_follows_moved_placeholders() {
        let (_, map) = extract("![a](1) ![b](2)");
        // A translation may reorder text around the placeholders.
        assert_eq!(restore("{IMAGE_1} then {IMAGE_0}", &map), "![b](2) then ![a](1)");
    }

    #[test]
    fn restore_tolerates_lost_placeholder() {
        let (_, map) = extract("![a](1) ![b](2)");
        let translated = "only {IMAGE_1} survived";
        assert_eq!(map.missing_in(translated), vec![0]);
        assert_eq!(restore(translated, &map), "only ![b](2) survived");
    }

    #[test]
    fn restore_replaces_first_occurrence_only() {
        let (_, map) = extract("![a](1)");
        assert_eq!(restore("{IMAGE_0} {IMAGE_0}", &map), "![a](1) {IMAGE_0}");
    }
}
