//! Pure text processing applied to every fetched page.
//!
//! - `extract` — locate the fragment between positional markers
//! - `number` — lenient numeric normalization and canonical rendering

pub mod extract;
pub mod number;

pub use extract::extract_value;
pub use number::{canonical_number, to_number};
