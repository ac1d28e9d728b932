//! Per-page pipeline stages.
//!
//! ```text
//! page ──▶ flatten ──▶ quality ──▶ format ──▶ orient ──▶ serialize ──▶ archive
//! ```
//!
//! The engine handles flatten/quality/format/serialize itself; this module
//! holds the two stages that carry policy of our own:
//!
//! 1. [`orient`]: decide and apply the rotation a [`Layout`](crate::config::Layout) asks for
//! 2. [`archive`]: name entries and assemble the zip in memory

pub mod archive;
pub mod orient;
