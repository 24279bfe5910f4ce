/// Document model subsystem - Text anchoring over a tree of leaves
///
/// This module contains the document tree abstraction, whitespace
/// normalization, the quote locator, in-place highlight mutation and the
/// pin registry.

pub mod annotation;
pub mod locator;
pub mod normalize;
pub mod pin_registry;
pub mod tree;

// Re-export main types for convenience
pub use annotation::{apply_highlight, origin_text, remove_highlight};
pub use locator::{
    DEFAULT_PREFIX_LEN, LocateError, Located, Locator, MatchCandidate, SearchKeys, SpanMode,
};
pub use normalize::{Projection, normalize};
pub use pin_registry::{PinId, PinRegistry};
pub use tree::{DocumentTree, Marker, Node, NodeId, NodeTree, TreeError};
