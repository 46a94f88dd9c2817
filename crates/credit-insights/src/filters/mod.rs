//! Filter engine for the cleaned dataset.
//!
//! Filters are declared per column ([`FilterSpec`]), selected by the caller
//! ([`FilterSelections`]) and applied cumulatively by [`FilterEngine`]. Each
//! filter resolves its options and default bounds on the frame left by the
//! filters before it.

mod definitions;
mod engine;

pub use definitions::{DEFAULT_FILTERS, FilterKind, FilterSpec};
pub use engine::{AppliedConstraint, FilterEngine, FilterSelections, Selection};
