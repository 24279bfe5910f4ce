use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Caller-supplied identifier of a pinned highlight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinId(String);

impl PinId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PinId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Session-scoped map from pin id to the text that was searched for.
///
/// Holds no tree references; markers are found again through their `pin_id`.
#[derive(Debug, Default)]
pub struct PinRegistry {
    pins: HashMap<PinId, String>,
}

impl PinRegistry {
    pub fn new() -> Self {
        Self {
            pins: HashMap::new(),
        }
    }

    /// Record a pin, returning the text previously stored under the same id
    pub fn insert(&mut self, id: PinId, text: impl Into<String>) -> Option<String> {
        self.pins.insert(id, text.into())
    }

    pub fn get(&self, id: &PinId) -> Option<&str> {
        self.pins.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &PinId) -> bool {
        self.pins.contains_key(id)
    }

    pub fn remove(&mut self, id: &PinId) -> Option<String> {
        self.pins.remove(id)
    }

    pub fn clear(&mut self) {
        self.pins.clear();
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Pins sorted by id (for listing)
    pub fn list(&self) -> Vec<(&PinId, &str)> {
        let mut pins: Vec<(&PinId, &str)> = self
            .pins
            .iter()
            .map(|(id, text)| (id, text.as_str()))
            .collect();
        pins.sort_by(|a, b| a.0.cmp(b.0));
        pins
    }
}
