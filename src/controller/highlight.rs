use crate::config::RcConfig;
use crate::document_model::{
    DocumentTree, LocateError, Located, Locator, NodeId, PinId, PinRegistry, SearchKeys,
    TreeError, apply_highlight, normalize, origin_text, remove_highlight,
};
use log::{debug, warn};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HighlightError {
    #[error(transparent)]
    Rejected(#[from] LocateError),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Registry/tree desynchronization. Logged and contained to one marker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Inconsistency {
    #[error("pinned marker {marker:?} carries id {pin_id} unknown to the registry")]
    UnregisteredPin { marker: NodeId, pin_id: PinId },
    #[error("pin {0} is registered but no marker carries it")]
    OrphanedPin(PinId),
    #[error("marker {marker:?} could not be removed: {source}")]
    Unremovable { marker: NodeId, source: TreeError },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashOutcome {
    pub markers: Vec<NodeId>,
    pub categories: Vec<String>,
    pub fallback: bool,
}

impl FlashOutcome {
    pub fn found(&self) -> bool {
        !self.markers.is_empty()
    }
}

/// Advisory request to bring a marker into view. Has no structural effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reveal {
    pub marker: NodeId,
    pub emphasize: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevealOutcome {
    pub flash: FlashOutcome,
    pub reveal: Option<Reveal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinOutcome {
    pub marker: Option<NodeId>,
    /// An earlier pin with the same id was removed first
    pub replaced: bool,
}

impl PinOutcome {
    pub fn found(&self) -> bool {
        self.marker.is_some()
    }
}

/// Flash and pin lifecycles over one document tree.
///
/// Ephemeral markers (no pin id) form a single generation that every flash
/// replaces. Pinned markers stay until unpinned by id or text, or until
/// `remove_all(true)`.
pub struct HighlightController<T: DocumentTree> {
    tree: T,
    locator: Locator,
    pins: PinRegistry,
    default_category: String,
}

impl<T: DocumentTree> HighlightController<T> {
    pub fn new(tree: T) -> Self {
        Self::with_config(tree, &RcConfig::default())
    }

    pub fn with_config(tree: T, config: &RcConfig) -> Self {
        Self {
            tree,
            locator: config.locator(),
            pins: PinRegistry::new(),
            default_category: config.default_category.clone(),
        }
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut T {
        &mut self.tree
    }

    pub fn into_tree(self) -> T {
        self.tree
    }

    pub fn pins(&self) -> &PinRegistry {
        &self.pins
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    pub fn ephemeral_markers(&self) -> Vec<NodeId> {
        self.markers_where(|pinned| !pinned)
    }

    pub fn pinned_markers(&self) -> Vec<NodeId> {
        self.markers_where(|pinned| pinned)
    }

    /// Locate without touching the tree.
    pub fn locate(&self, text: &str) -> Result<Located, HighlightError> {
        Ok(self.locator.locate(&self.tree, text)?)
    }

    /// Replace the current ephemeral highlights with every occurrence of
    /// `text`. A miss still clears the previous generation.
    pub fn flash(
        &mut self,
        text: &str,
        category: Option<&str>,
    ) -> Result<FlashOutcome, HighlightError> {
        // Reject empty input before anything is cleared
        self.locator.search_keys(text)?;
        let category = category.unwrap_or(&self.default_category).to_string();

        self.clear_ephemeral();

        let located = self.locator.locate(&self.tree, text)?;
        let fallback = matches!(located, Located::Found { fallback: true, .. });

        let mut markers = Vec::with_capacity(located.candidates().len());
        for candidate in located.candidates() {
            match apply_highlight(&mut self.tree, candidate, &category, None) {
                Ok(marker) => markers.push(marker),
                Err(e) => {
                    self.roll_back(&markers);
                    return Err(e.into());
                }
            }
        }

        debug!("flash {:?}: {} marker(s)", text, markers.len());
        let categories = if markers.is_empty() {
            Vec::new()
        } else {
            vec![category]
        };
        Ok(FlashOutcome {
            markers,
            categories,
            fallback,
        })
    }

    /// Flash, then ask for the first new marker to be brought into view.
    pub fn highlight_and_reveal(
        &mut self,
        text: &str,
        category: Option<&str>,
        emphasize: bool,
    ) -> Result<RevealOutcome, HighlightError> {
        let flash = self.flash(text, category)?;
        let reveal = flash.markers.first().map(|marker| Reveal {
            marker: *marker,
            emphasize,
        });
        Ok(RevealOutcome { flash, reveal })
    }

    /// Pin the first occurrence of `text` under `pin_id`.
    ///
    /// Flash markers sitting in a leaf that holds `text` are cleared first,
    /// so flashed text can be pinned.
    pub fn pin(
        &mut self,
        text: &str,
        category: Option<&str>,
        pin_id: PinId,
    ) -> Result<PinOutcome, HighlightError> {
        let keys = self.locator.search_keys(text)?;
        self.release_flash_over(&keys);

        if !self.locator.locate(&self.tree, text)?.is_found() {
            debug!("pin {pin_id}: {text:?} not found");
            return Ok(PinOutcome::default());
        }
        let category = category.unwrap_or(&self.default_category).to_string();

        let replaced = self.pins.contains(&pin_id) || !self.markers_pinned_as(&pin_id).is_empty();
        if replaced {
            self.detach_pin(&pin_id);
        }

        // Removing an earlier pin may have merged leaves, so search again
        let located = self.locator.locate(&self.tree, text)?;
        let Some(first) = located.candidates().first() else {
            return Ok(PinOutcome {
                marker: None,
                replaced,
            });
        };

        let marker = apply_highlight(&mut self.tree, first, &category, Some(pin_id.clone()))?;
        self.pins.insert(pin_id, text);

        Ok(PinOutcome {
            marker: Some(marker),
            replaced,
        })
    }

    /// Remove the pinned highlight registered as `pin_id`.
    pub fn unpin(&mut self, pin_id: &PinId) -> Result<bool, HighlightError> {
        Ok(self.detach_pin(pin_id) > 0)
    }

    /// Remove every marker whose text contains `text`, pinned or not.
    pub fn remove_by_text(&mut self, text: &str) -> Result<usize, HighlightError> {
        let matched = self.locator.locate_markers(&self.tree, text)?;

        let mut removed = 0;
        for marker in matched {
            let pin_id = self
                .tree
                .marker(marker)
                .and_then(|m| m.pin_id.clone());
            if !self.remove_marker(marker) {
                continue;
            }
            removed += 1;

            if let Some(pin_id) = pin_id {
                if self.pins.remove(&pin_id).is_none() {
                    self.report(Inconsistency::UnregisteredPin { marker, pin_id });
                }
            }
        }

        debug!("removed {removed} marker(s) matching {text:?}");
        Ok(removed)
    }

    /// Remove every ephemeral marker and, when `include_pinned`, every
    /// pinned marker along with the whole registry.
    pub fn remove_all(&mut self, include_pinned: bool) -> usize {
        let mut removed = self.clear_ephemeral();

        if include_pinned {
            for marker in self.pinned_markers() {
                let pin_id = self
                    .tree
                    .marker(marker)
                    .and_then(|m| m.pin_id.clone());
                if let Some(pin_id) = pin_id {
                    if !self.pins.contains(&pin_id) {
                        self.report(Inconsistency::UnregisteredPin { marker, pin_id });
                    }
                }
                if self.remove_marker(marker) {
                    removed += 1;
                }
            }
            self.pins.clear();
        }

        removed
    }

    /// Remove the ephemeral markers cut from a leaf whose text contains one
    /// of `keys`.
    fn release_flash_over(&mut self, keys: &SearchKeys) {
        let covering: Vec<NodeId> = self
            .ephemeral_markers()
            .into_iter()
            .filter(|marker| {
                origin_text(&self.tree, *marker).is_some_and(|leaf_text| {
                    let leaf_text = normalize(&leaf_text);
                    keys.iter().any(|(key, _)| leaf_text.contains(key))
                })
            })
            .collect();

        if !covering.is_empty() {
            debug!("releasing {} flash marker(s) before pinning", covering.len());
        }
        for marker in covering {
            self.remove_marker(marker);
        }
    }

    fn clear_ephemeral(&mut self) -> usize {
        self.ephemeral_markers()
            .into_iter()
            .filter(|marker| self.remove_marker(*marker))
            .count()
    }

    /// Remove all markers carrying `pin_id` and its registry entry.
    fn detach_pin(&mut self, pin_id: &PinId) -> usize {
        let removed = self
            .markers_pinned_as(pin_id)
            .into_iter()
            .filter(|marker| self.remove_marker(*marker))
            .count();

        let registered = self.pins.remove(pin_id).is_some();
        if registered && removed == 0 {
            self.report(Inconsistency::OrphanedPin(pin_id.clone()));
        }
        if !registered {
            for marker in self.markers_pinned_as(pin_id) {
                self.report(Inconsistency::UnregisteredPin {
                    marker,
                    pin_id: pin_id.clone(),
                });
            }
        }

        removed.max(usize::from(registered))
    }

    fn remove_marker(&mut self, marker: NodeId) -> bool {
        match remove_highlight(&mut self.tree, marker) {
            Ok(_) => true,
            Err(source) => {
                self.report(Inconsistency::Unremovable { marker, source });
                false
            }
        }
    }

    fn roll_back(&mut self, markers: &[NodeId]) {
        for marker in markers.iter().rev() {
            self.remove_marker(*marker);
        }
    }

    fn markers_where(&self, keep: impl Fn(bool) -> bool) -> Vec<NodeId> {
        self.tree
            .markers()
            .into_iter()
            .filter(|id| self.tree.marker(*id).is_some_and(|m| keep(m.is_pinned())))
            .collect()
    }

    fn markers_pinned_as(&self, pin_id: &PinId) -> Vec<NodeId> {
        self.tree
            .markers()
            .into_iter()
            .filter(|id| {
                self.tree
                    .marker(*id)
                    .is_some_and(|m| m.pin_id.as_ref() == Some(pin_id))
            })
            .collect()
    }

    fn report(&self, issue: Inconsistency) {
        warn!("structural inconsistency: {issue}");
    }
}
