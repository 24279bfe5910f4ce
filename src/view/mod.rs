/// View subsystem - Terminal rendering of the annotated document
///
/// This module renders the document tree with its markers and works out
/// where a revealed marker sits once the text is wrapped.

pub mod renderer;

// Re-export public interface
pub use renderer::{RenderParams, View};
