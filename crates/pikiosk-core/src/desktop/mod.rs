//! Launcher descriptor (`.desktop`) handling.
//!
//! Descriptors are treated as opaque text except for the execution directive
//! and the placeholder token.

pub mod entry;
pub mod placeholder;

pub use entry::DesktopEntry;
pub use placeholder::{count_occurrences, resolve_placeholder, substitute, PlaceholderResolution};
