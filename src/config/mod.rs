/// Configuration subsystem - Matching and display settings
///
/// This module handles loading and applying configuration from .anchorrc
/// files, providing the locator tuning and highlight styling used by the
/// controller and the view.

pub mod rc;

// Re-export public interface
pub use rc::{ConfigError, RcConfig, RcLoader};
