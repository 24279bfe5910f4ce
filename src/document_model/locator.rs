use super::normalize::{Projection, char_prefix, floor_char_boundary, normalize};
use super::tree::{DocumentTree, NodeId};
use log::{debug, trace};
use thiserror::Error;

/// Number of normalized characters kept by the prefix fallback.
pub const DEFAULT_PREFIX_LEN: usize = 50;

/// How the raw length of a match is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpanMode {
    /// Raw end re-derived from the normalized end, covering any whitespace
    /// runs inside the match.
    #[default]
    Corrected,
    /// Raw length equals the normalized key length. Falls short of the
    /// matched text when it contains collapsed whitespace.
    Legacy,
}

impl SpanMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "corrected" => Some(SpanMode::Corrected),
            "legacy" => Some(SpanMode::Legacy),
            _ => None,
        }
    }
}

/// Raw-space location of one occurrence. Offsets are bytes on char boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    pub leaf: NodeId,
    pub raw_start: usize,
    pub raw_len: usize,
}

impl MatchCandidate {
    pub fn raw_end(&self) -> usize {
        self.raw_start + self.raw_len
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    Found {
        candidates: Vec<MatchCandidate>,
        /// The normalized key that matched
        key: String,
        /// True when only the prefix key matched
        fallback: bool,
    },
    NotFound,
}

impl Located {
    pub fn is_found(&self) -> bool {
        matches!(self, Located::Found { .. })
    }

    pub fn candidates(&self) -> &[MatchCandidate] {
        match self {
            Located::Found { candidates, .. } => candidates,
            Located::NotFound => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("reference text is empty")]
    EmptyReference,
}

/// Normalized needle plus the optional prefix key tried when it misses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchKeys {
    pub needle: String,
    pub prefix: Option<String>,
}

impl SearchKeys {
    /// The needle, then the prefix key if there is one. The flag marks the
    /// prefix key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        std::iter::once((self.needle.as_str(), false))
            .chain(self.prefix.as_deref().map(|prefix| (prefix, true)))
    }
}

#[derive(Debug, Clone)]
pub struct Locator {
    pub prefix_len: usize,
    pub span_mode: SpanMode,
}

impl Default for Locator {
    fn default() -> Self {
        Self::new()
    }
}

impl Locator {
    pub fn new() -> Self {
        Self {
            prefix_len: DEFAULT_PREFIX_LEN,
            span_mode: SpanMode::default(),
        }
    }

    pub fn with_prefix_len(mut self, prefix_len: usize) -> Self {
        self.prefix_len = prefix_len.max(1);
        self
    }

    pub fn with_span_mode(mut self, span_mode: SpanMode) -> Self {
        self.span_mode = span_mode;
        self
    }

    pub fn search_keys(&self, reference: &str) -> Result<SearchKeys, LocateError> {
        let needle = normalize(reference);
        if needle.is_empty() {
            return Err(LocateError::EmptyReference);
        }

        let prefix = (needle.chars().count() > self.prefix_len)
            .then(|| char_prefix(&needle, self.prefix_len).trim_end().to_string());

        Ok(SearchKeys { needle, prefix })
    }

    /// Find every leaf holding the reference text, exact key first, prefix
    /// key only when the exact pass found nothing.
    pub fn locate<T: DocumentTree + ?Sized>(
        &self,
        tree: &T,
        reference: &str,
    ) -> Result<Located, LocateError> {
        let keys = self.search_keys(reference)?;
        let leaves = tree.leaves();

        for (key, fallback) in keys.iter() {
            let candidates: Vec<MatchCandidate> = leaves
                .iter()
                .filter_map(|leaf| {
                    let raw = tree.node(*leaf)?.text()?;
                    self.candidate_in(*leaf, raw, key)
                })
                .collect();

            if !candidates.is_empty() {
                debug!(
                    "located {} candidate(s) for {:?} (prefix fallback: {})",
                    candidates.len(),
                    key,
                    fallback
                );
                return Ok(Located::Found {
                    candidates,
                    key: key.to_string(),
                    fallback,
                });
            }
        }

        debug!("no candidate for {:?}", keys.needle);
        Ok(Located::NotFound)
    }

    /// Markers whose normalized text contains the reference text, with the
    /// same prefix fallback as `locate`.
    pub fn locate_markers<T: DocumentTree + ?Sized>(
        &self,
        tree: &T,
        reference: &str,
    ) -> Result<Vec<NodeId>, LocateError> {
        let keys = self.search_keys(reference)?;
        let markers = tree.markers();

        for (key, _) in keys.iter() {
            let matched: Vec<NodeId> = markers
                .iter()
                .copied()
                .filter(|id| {
                    tree.marker(*id)
                        .is_some_and(|marker| normalize(&marker.text).contains(key))
                })
                .collect();
            if !matched.is_empty() {
                return Ok(matched);
            }
        }

        Ok(Vec::new())
    }

    /// Translate the first normalized occurrence of `key` in `raw` back to
    /// raw coordinates.
    fn candidate_in(&self, leaf: NodeId, raw: &str, key: &str) -> Option<MatchCandidate> {
        let projection = Projection::new(raw);
        let norm_start = projection.normalized().find(key)?;
        let raw_start = projection.raw_start(norm_start)?;
        let raw_end = match self.span_mode {
            SpanMode::Corrected => projection.raw_end(norm_start + key.len())?,
            SpanMode::Legacy => floor_char_boundary(raw, raw_start + key.len()),
        };
        trace!(
            "leaf {:?}: normalized {}..{} -> raw {}..{}",
            leaf,
            norm_start,
            norm_start + key.len(),
            raw_start,
            raw_end
        );

        Some(MatchCandidate {
            leaf,
            raw_start,
            raw_len: raw_end.saturating_sub(raw_start),
        })
    }
}
