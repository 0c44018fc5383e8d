//! Field Extractor
//!
//! Pulls the 13 raw column values out of a line without interpreting them.
//!
//! - **Positional CSV**: the line is split on `,` and every token trimmed.
//!   The record type is read from column 2 and selects one of three static
//!   layouts that map canonical columns to token positions.
//! - **Key-value JSON**: the line is parsed as a JSON object and each
//!   canonical column is looked up by name. The record type is the
//!   `event_type` key.
//!
//! # Positional Layouts
//!
//! | Column | Trade | Quote |
//! |--------|-------|-------|
//! | `trade_dt` | 0 | 0 |
//! | `event_type` | 2 | 2 |
//! | `symbol` | 3 | 3 |
//! | `exchange` | 6 | 6 |
//! | `event_tm` | 4 | 4 |
//! | `event_seq_nb` | 5 | 5 |
//! | `file_tm` | 1 | 1 |
//! | `price` | 7 | - |
//! | `size` | 8 | - |
//! | `bid_pr` | - | 7 |
//! | `bid_size` | - | 8 |
//! | `ask_pr` | - | 9 |
//! | `ask_size` | - | 10 |

use serde_json::Value;

use super::classifier::classify;
use crate::domain::record::{EventKind, Field, RAW_FIELD_COUNT, SourceFormat};

/// Token position of the record type in positional lines.
pub const DISCRIMINATOR_POSITION: usize = 2;

/// Mapping from canonical column (schema order) to token position.
pub type PositionalLayout = [Option<usize>; RAW_FIELD_COUNT];

/// Trade line layout.
pub const TRADE_LAYOUT: PositionalLayout = [
    Some(0),
    Some(2),
    Some(3),
    Some(6),
    Some(4),
    Some(5),
    Some(1),
    Some(7),
    Some(8),
    None,
    None,
    None,
    None,
];

/// Quote line layout.
pub const QUOTE_LAYOUT: PositionalLayout = [
    Some(0),
    Some(2),
    Some(3),
    Some(6),
    Some(4),
    Some(5),
    Some(1),
    None,
    None,
    Some(7),
    Some(8),
    Some(9),
    Some(10),
];

/// Layout for unrecognized lines: nothing is read.
pub const BAD_LAYOUT: PositionalLayout = [None; RAW_FIELD_COUNT];

/// Select the static layout for a record kind.
#[must_use]
pub const fn layout_for(kind: EventKind) -> &'static PositionalLayout {
    match kind {
        EventKind::Trade => &TRADE_LAYOUT,
        EventKind::Quote => &QUOTE_LAYOUT,
        EventKind::Bad => &BAD_LAYOUT,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Reasons a line cannot be minimally split into fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// The record type is absent (short line, missing key, or null).
    #[error("record type discriminator is missing")]
    MissingDiscriminator,

    /// The layout for the line's kind needs a token the line does not have.
    #[error("{kind} layout needs column {index} but the line has {available}")]
    ColumnOutOfRange {
        /// Kind whose layout was selected.
        kind: EventKind,
        /// Token position requested.
        index: usize,
        /// Number of tokens present.
        available: usize,
    },

    /// The line is not valid JSON.
    #[error("malformed JSON document: {0}")]
    MalformedDocument(String),

    /// The line is valid JSON but not an object.
    #[error("JSON document is not an object")]
    NotAnObject,
}

impl ExtractError {
    /// Stable label for metrics and logs.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::MissingDiscriminator => "missing_discriminator",
            Self::ColumnOutOfRange { .. } => "column_out_of_range",
            Self::MalformedDocument(_) => "malformed_document",
            Self::NotAnObject => "not_an_object",
        }
    }
}

// =============================================================================
// Raw Fields
// =============================================================================

/// Untyped column values of one line, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    discriminator: Option<String>,
    values: [Option<String>; RAW_FIELD_COUNT],
}

impl RawFields {
    /// Create raw fields from a discriminator and column values.
    #[must_use]
    pub const fn new(
        discriminator: Option<String>,
        values: [Option<String>; RAW_FIELD_COUNT],
    ) -> Self {
        Self {
            discriminator,
            values,
        }
    }

    /// The fallback: no discriminator and every column null.
    #[must_use]
    pub fn unclassified() -> Self {
        Self::default()
    }

    /// Raw record type as read from the line.
    #[must_use]
    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }

    /// Raw value of a column. `partition` is never read from input.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(field.index())?.as_deref()
    }

    /// Number of non-null columns.
    #[must_use]
    pub fn populated(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

// =============================================================================
// Extraction
// =============================================================================

/// Extract raw fields, reporting why a line could not be split.
///
/// # Errors
///
/// Returns an [`ExtractError`] when the line is structurally unusable.
pub fn try_extract_fields(line: &str, format: SourceFormat) -> Result<RawFields, ExtractError> {
    match format {
        SourceFormat::PositionalCsv => extract_positional(line),
        SourceFormat::KeyValueJson => extract_key_value(line),
    }
}

/// Extract raw fields, substituting [`RawFields::unclassified`] on failure.
#[must_use]
pub fn extract_fields(line: &str, format: SourceFormat) -> RawFields {
    try_extract_fields(line, format).unwrap_or_else(|_| RawFields::unclassified())
}

fn extract_positional(line: &str) -> Result<RawFields, ExtractError> {
    let tokens: Vec<&str> = line.split(',').map(str::trim).collect();

    let discriminator = *tokens
        .get(DISCRIMINATOR_POSITION)
        .ok_or(ExtractError::MissingDiscriminator)?;
    let kind = classify(Some(discriminator));
    let layout = layout_for(kind);

    let mut values: [Option<String>; RAW_FIELD_COUNT] = Default::default();
    for (slot, position) in values.iter_mut().zip(layout) {
        let Some(index) = *position else {
            continue;
        };
        let token = tokens.get(index).ok_or(ExtractError::ColumnOutOfRange {
            kind,
            index,
            available: tokens.len(),
        })?;
        *slot = Some((*token).to_string());
    }

    Ok(RawFields::new(Some(discriminator.to_string()), values))
}

fn extract_key_value(line: &str) -> Result<RawFields, ExtractError> {
    let document: Value =
        serde_json::from_str(line).map_err(|e| ExtractError::MalformedDocument(e.to_string()))?;
    let Value::Object(object) = document else {
        return Err(ExtractError::NotAnObject);
    };

    let discriminator = object
        .get(Field::EventType.name())
        .and_then(raw_value)
        .ok_or(ExtractError::MissingDiscriminator)?;

    let values = Field::RAW.map(|field| object.get(field.name()).and_then(raw_value));

    Ok(RawFields::new(Some(discriminator), values))
}

/// Render a JSON value as raw text. `null` is treated as absent.
fn raw_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        // Literal text, never routed through a float.
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

// =============================================================================
// Tests
// =============================================================================
