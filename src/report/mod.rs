//! Output renderers.
//!
//! - [`terminal`]: colored, tabular output with a summary box.
//!
//! JSON output is produced directly from the serialized result types.

pub mod terminal;
