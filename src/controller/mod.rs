/// Controller subsystem - Highlight lifecycles and request handling
///
/// This module contains the flash/pin lifecycle controller and the
/// request/response dispatcher that drives it.

pub mod dispatch;
pub mod highlight;

// Re-export public interface
pub use dispatch::{DispatchError, Dispatcher, Request, Response};
pub use highlight::{
    FlashOutcome, HighlightController, HighlightError, Inconsistency, PinOutcome, Reveal,
    RevealOutcome,
};
