//! Normalization Engine
//!
//! Maps two structurally different line encodings onto the canonical
//! record schema.
//!
//! ```text
//! raw line ──► extractor ──► classifier ──► coercer ──► CanonicalRecord
//!   (csv | json)   (13 raw)     (T | Q | B)    (typed)
//! ```
//!
//! All functions are pure and hold no shared state, so lines may be
//! normalized in any order from any number of threads.

pub mod classifier;
pub mod coercer;
pub mod extractor;
pub mod normalizer;

pub use classifier::classify;
pub use coercer::{Coercion, coerce, parse_date, parse_decimal, parse_integer, parse_timestamp};
pub use extractor::{
    BAD_LAYOUT, DISCRIMINATOR_POSITION, ExtractError, PositionalLayout, QUOTE_LAYOUT, RawFields,
    TRADE_LAYOUT, extract_fields, layout_for, try_extract_fields,
};
pub use normalizer::{Fallback, Normalization, normalize, normalize_with_diagnostics};
