use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| {
    // \s is Unicode-aware, same class as char::is_whitespace
    Regex::new(r"\s+").expect("static whitespace pattern")
});

/// Collapse every whitespace run to a single space and trim both ends.
///
/// This is the comparison space for all matching.
pub fn normalize(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// A normalized string together with the raw byte range each of its bytes
/// was produced from.
///
/// A collapsed whitespace run is a single normalized space mapping to the
/// whole raw run. Trimmed edges map to nothing.
#[derive(Debug, Clone)]
pub struct Projection {
    normalized: String,
    // One entry per normalized byte
    sources: Vec<Range<usize>>,
}

impl Projection {
    pub fn new(raw: &str) -> Self {
        let mut normalized = String::with_capacity(raw.len());
        let mut sources = Vec::with_capacity(raw.len());
        let mut pending_space: Option<Range<usize>> = None;

        for (idx, ch) in raw.char_indices() {
            let end = idx + ch.len_utf8();
            if ch.is_whitespace() {
                // Leading whitespace is trimmed, not collapsed
                if normalized.is_empty() {
                    continue;
                }
                match pending_space.as_mut() {
                    Some(run) => run.end = end,
                    None => pending_space = Some(idx..end),
                }
                continue;
            }

            if let Some(run) = pending_space.take() {
                normalized.push(' ');
                sources.push(run);
            }
            normalized.push(ch);
            for _ in 0..ch.len_utf8() {
                sources.push(idx..end);
            }
        }

        Self {
            normalized,
            sources,
        }
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Raw byte offset where the normalized byte at `norm_idx` starts.
    ///
    /// `norm_idx == normalized().len()` maps to the raw end of the last
    /// projected character.
    pub fn raw_start(&self, norm_idx: usize) -> Option<usize> {
        if norm_idx == self.sources.len() {
            return Some(self.sources.last().map_or(0, |range| range.end));
        }
        self.sources.get(norm_idx).map(|range| range.start)
    }

    /// Raw byte offset just past the normalized range ending at `norm_end`
    /// (exclusive).
    pub fn raw_end(&self, norm_end: usize) -> Option<usize> {
        if norm_end == 0 {
            return Some(self.raw_start(0).unwrap_or(0));
        }
        self.sources.get(norm_end - 1).map(|range| range.end)
    }
}

/// The first `max_chars` characters of `text`, cut on a char boundary.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Largest char boundary in `text` that is `<= idx`.
pub fn floor_char_boundary(text: &str, idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    let mut idx = idx;
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_collapses_and_trims() {
        assert_eq!(normalize("  Medical   staff\n\trefused  "), "Medical staff refused");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n\t "), "");
        assert_eq!(normalize("a\u{a0}\u{a0}b"), "a b");
    }

    #[test]
    fn test_normalize_idempotent() {
        let samples = [
            "",
            "plain",
            "  lead",
            "trail  ",
            "a  b\n\nc\t\td",
            " \r\n mixed \u{2003} unicode\u{a0}space ",
            "ünïcödé   wörds",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
            assert!(!once.contains("  "));
            assert_eq!(once.trim(), once);
            assert!(!once.chars().any(|ch| ch.is_whitespace() && ch != ' '));
        }
    }

    #[test]
    fn test_projection_agrees_with_normalize() {
        let samples = [
            "The subject complained of chest pain.",
            "Medical   staff   refused   treatment.",
            "\n\t  leading and trailing \n",
            "tabs\tand\nnewlines\r\nmixed",
            "wide\u{3000}space and nbsp\u{a0}here",
            "ünïcödé   wörds",
        ];
        for sample in samples {
            assert_eq!(Projection::new(sample).normalized(), normalize(sample));
        }
    }

    #[test]
    fn test_projection_maps_collapsed_runs() {
        let raw = "  Medical   staff";
        let projection = Projection::new(raw);
        assert_eq!(projection.normalized(), "Medical staff");

        // 'M' sits after the trimmed leading run
        assert_eq!(projection.raw_start(0), Some(2));
        // The collapsed space covers all three raw spaces
        assert_eq!(projection.raw_start(7), Some(9));
        assert_eq!(projection.raw_end(8), Some(12));
        // 's' of "staff"
        assert_eq!(projection.raw_start(8), Some(12));
        assert_eq!(projection.raw_end(13), Some(raw.len()));
    }

    #[test]
    fn test_projection_multibyte() {
        let raw = "é  ü";
        let projection = Projection::new(raw);
        assert_eq!(projection.normalized(), "é ü");
        let u_norm = projection.normalized().find('ü').unwrap();
        assert_eq!(projection.raw_start(u_norm), Some(raw.find('ü').unwrap()));
        assert_eq!(projection.raw_end(projection.normalized().len()), Some(raw.len()));
    }

    #[test]
    fn test_char_prefix() {
        assert_eq!(char_prefix("abcdef", 3), "abc");
        assert_eq!(char_prefix("ab", 3), "ab");
        assert_eq!(char_prefix("ééé", 2), "éé");
    }

    #[test]
    fn test_floor_char_boundary() {
        let text = "aé";
        assert_eq!(floor_char_boundary(text, 2), 1);
        assert_eq!(floor_char_boundary(text, 1), 1);
        assert_eq!(floor_char_boundary(text, 10), 3);
    }

    proptest! {
        #[test]
        fn prop_normalize_idempotent(text in any::<String>()) {
            let once = normalize(&text);
            prop_assert_eq!(normalize(&once), once.clone());
            prop_assert!(!once.contains("  "));
            prop_assert_eq!(once.trim(), once.as_str());
        }

        #[test]
        fn prop_normalize_idempotent_on_whitespace_heavy_text(
            text in "[a-zé \t\n\r\u{a0}\u{2003}\u{3000}]{0,80}",
        ) {
            let once = normalize(&text);
            prop_assert_eq!(normalize(&once), once.clone());
            prop_assert!(!once.chars().any(|ch| ch.is_whitespace() && ch != ' '));
        }

        #[test]
        fn prop_projection_agrees_with_normalize(text in "[a-zé \t\n\u{a0}]{0,80}") {
            let projection = Projection::new(&text);
            let expected = normalize(&text);
            prop_assert_eq!(projection.normalized(), expected.as_str());
            // Every normalized position maps back onto a char boundary
            for idx in 0..=projection.normalized().len() {
                if let Some(raw) = projection.raw_start(idx) {
                    prop_assert!(text.is_char_boundary(raw));
                }
            }
        }
    }
}
