//! Type Coercer
//!
//! Converts raw column text into the canonical column types.
//!
//! Coercion is field-local: a value that does not parse as its declared type
//! becomes null and is reported as degraded, while its siblings and the
//! record kind are unaffected. Columns the record kind does not carry are
//! always null, whatever the input held.
//!
//! # Accepted Forms
//!
//! | Type | Forms |
//! |------|-------|
//! | date | `2023-01-01`, `20230101` |
//! | timestamp | `2023-01-01 09:30:00[.fff]`, `2023-01-01T09:30:00[.fff]`, RFC 3339, `20230101093000[.fff]`, bare date |
//! | integer | optional sign and digits, 64-bit range |
//! | decimal | plain or scientific notation, at most 28 fractional digits, never rounded |
//!
//! Typed values are trimmed before parsing and empty text is null.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use super::extractor::RawFields;
use crate::domain::record::{CanonicalRecord, EventKind, Field};

/// Largest scale a `Decimal` can hold.
const MAX_DECIMAL_SCALE: i64 = 28;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y%m%d%H%M%S%.f",
];

/// Outcome of coercing one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coercion {
    /// The typed record.
    pub record: CanonicalRecord,
    /// Columns whose non-empty raw value failed to parse.
    pub degraded: Vec<Field>,
}

/// Coerce raw fields into a canonical record of the given kind.
#[must_use]
pub fn coerce(raw: &RawFields, kind: EventKind) -> Coercion {
    let mut c = Coercer {
        raw,
        kind,
        degraded: Vec::new(),
    };

    let record = CanonicalRecord {
        trade_dt: c.typed(Field::TradeDt, parse_date),
        event_type: kind,
        symbol: c.text(Field::Symbol),
        exchange: c.text(Field::Exchange),
        event_tm: c.typed(Field::EventTm, parse_timestamp),
        event_seq_nb: c.typed(Field::EventSeqNb, parse_integer),
        file_tm: c.typed(Field::FileTm, parse_timestamp),
        price: c.typed(Field::Price, parse_decimal),
        size: c.typed(Field::Size, parse_integer),
        bid_pr: c.typed(Field::BidPr, parse_decimal),
        bid_size: c.typed(Field::BidSize, parse_integer),
        ask_pr: c.typed(Field::AskPr, parse_decimal),
        ask_size: c.typed(Field::AskSize, parse_integer),
    };

    Coercion {
        record,
        degraded: c.degraded,
    }
}

struct Coercer<'a> {
    raw: &'a RawFields,
    kind: EventKind,
    degraded: Vec<Field>,
}

impl Coercer<'_> {
    fn text(&self, field: Field) -> Option<String> {
        if !self.kind.carries(field) {
            return None;
        }
        self.raw.get(field).map(str::to_string)
    }

    fn typed<T>(&mut self, field: Field, parse: fn(&str) -> Option<T>) -> Option<T> {
        if !self.kind.carries(field) {
            return None;
        }
        let text = self.raw.get(field)?.trim();
        if text.is_empty() {
            return None;
        }
        let value = parse(text);
        if value.is_none() {
            self.degraded.push(field);
        }
        value
    }
}

// =============================================================================
// Parsers
// =============================================================================

/// Parse a calendar date.
#[must_use]
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Parse a timestamp. Offsets are normalized to UTC.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_utc())
        })
        .or_else(|| parse_date(text).and_then(|date| date.and_hms_opt(0, 0, 0)))
}

/// Parse a signed integer. Fractional and exponent forms are rejected.
#[must_use]
pub fn parse_integer(text: &str) -> Option<i64> {
    text.parse().ok()
}

/// Parse an exact decimal, keeping the written scale.
///
/// Accepts an optional sign, ASCII digits with at most one `.`, and an
/// optional `e`/`E` exponent. Values that cannot be held without rounding
/// are rejected rather than approximated. Trailing fractional zeros beyond
/// the maximum scale are the only digits dropped.
#[must_use]
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(at) => (&text[..at], text[at + 1..].parse::<i64>().ok()?),
        None => (text, 0),
    };
    let (negative, unsigned) = match mantissa.as_bytes().first() {
        Some(b'-') => (true, &mantissa[1..]),
        Some(b'+') => (false, &mantissa[1..]),
        _ => (false, mantissa),
    };
    let (whole, mut fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut scale = i64::try_from(fraction.len()).ok()?.checked_sub(exponent)?;
    while scale > MAX_DECIMAL_SCALE
        && let Some(rest) = fraction.strip_suffix('0')
    {
        fraction = rest;
        scale -= 1;
    }

    let mut digits: i128 = 0;
    for b in whole.bytes().chain(fraction.bytes()) {
        digits = digits.checked_mul(10)?.checked_add(i128::from(b - b'0'))?;
    }
    if digits == 0 {
        scale = scale.clamp(0, MAX_DECIMAL_SCALE);
    }
    while scale < 0 {
        digits = digits.checked_mul(10)?;
        scale += 1;
    }
    if negative {
        digits = -digits;
    }

    Decimal::try_from_i128_with_scale(digits, u32::try_from(scale).ok()?).ok()
}

// =============================================================================
// Tests
// =============================================================================
