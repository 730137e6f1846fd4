//! ZenFocus Core - Shared functionality for the ZenFocus timer
//!
//! Standard data locations and the small formatting helpers every
//! front-end (TUI, plain CLI) renders with.

pub mod format;
pub mod paths;

pub use paths::Paths;
