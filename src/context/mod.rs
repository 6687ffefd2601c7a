//! Document context preparation: ordering of tabular excerpts and bounded prompt assembly.

pub mod assembler;
pub mod ordering;
pub mod types;

pub use assembler::{DEFAULT_EXCERPT_BUDGET, TRUNCATION_MARKER, assemble_context, truncate_excerpt};
pub use ordering::{DEFAULT_TARGET_COLUMNS, apply_ordering, detect_sort_intent, sort_table};
pub use types::{DerivedOrder, Excerpt, SortDirection};
