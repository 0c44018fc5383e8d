//! Canonical Record Types
//!
//! The unified output schema that every input line is normalized into,
//! regardless of whether it arrived as a positional CSV line or a key-value
//! JSON document.
//!
//! # Schema
//!
//! | # | Column | Type | Trade | Quote | Bad |
//! |---|--------|------|-------|-------|-----|
//! | 0 | `trade_dt` | date | yes | yes | - |
//! | 1 | `event_type` | string | yes | yes | yes |
//! | 2 | `symbol` | string | yes | yes | - |
//! | 3 | `exchange` | string | yes | yes | - |
//! | 4 | `event_tm` | timestamp | yes | yes | - |
//! | 5 | `event_seq_nb` | integer | yes | yes | - |
//! | 6 | `file_tm` | timestamp | yes | yes | - |
//! | 7 | `price` | decimal | yes | - | - |
//! | 8 | `size` | integer | yes | - | - |
//! | 9 | `bid_pr` | decimal | - | yes | - |
//! | 10 | `bid_size` | integer | - | yes | - |
//! | 11 | `ask_pr` | decimal | - | yes | - |
//! | 12 | `ask_size` | integer | - | yes | - |
//! | 13 | `partition` | string | yes | yes | yes |
//!
//! Columns a kind does not carry are always null, never omitted.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of columns taken from the input line (all but `partition`).
pub const RAW_FIELD_COUNT: usize = 13;

/// Total number of canonical columns, `partition` included.
pub const FIELD_COUNT: usize = 14;

// =============================================================================
// Event Kind
// =============================================================================

/// Record kind discriminator.
///
/// Serialized as its single-letter wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// Completed transaction (`"T"`).
    #[serde(rename = "T")]
    Trade,
    /// Bid/ask quote (`"Q"`).
    #[serde(rename = "Q")]
    Quote,
    /// Line that could not be classified (`"B"`).
    #[serde(rename = "B")]
    Bad,
}

impl EventKind {
    /// Get all record kinds.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Trade, Self::Quote, Self::Bad]
    }

    /// Wire code for this kind.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Trade => "T",
            Self::Quote => "Q",
            Self::Bad => "B",
        }
    }

    /// Exact, case-sensitive lookup of a wire code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "T" => Some(Self::Trade),
            "Q" => Some(Self::Quote),
            "B" => Some(Self::Bad),
            _ => None,
        }
    }

    /// Whether records of this kind may populate `field`.
    #[must_use]
    pub const fn carries(self, field: Field) -> bool {
        match field {
            Field::EventType | Field::Partition => true,
            Field::TradeDt
            | Field::Symbol
            | Field::Exchange
            | Field::EventTm
            | Field::EventSeqNb
            | Field::FileTm => !matches!(self, Self::Bad),
            Field::Price | Field::Size => matches!(self, Self::Trade),
            Field::BidPr | Field::BidSize | Field::AskPr | Field::AskSize => {
                matches!(self, Self::Quote)
            }
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// Columns
// =============================================================================

/// Declared semantic type of a canonical column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Calendar date.
    Date,
    /// Free text, passed through unchanged.
    Text,
    /// Date and time of day without offset.
    Timestamp,
    /// Signed 64-bit integer.
    Integer,
    /// Exact base-10 decimal.
    Decimal,
}

/// Canonical columns in schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    /// Trading date.
    TradeDt,
    /// Record kind discriminator.
    EventType,
    /// Instrument identifier.
    Symbol,
    /// Venue code.
    Exchange,
    /// Event time.
    EventTm,
    /// Sequence number within `event_tm`.
    EventSeqNb,
    /// File generation time.
    FileTm,
    /// Trade price.
    Price,
    /// Trade size.
    Size,
    /// Bid price.
    BidPr,
    /// Bid size.
    BidSize,
    /// Ask price.
    AskPr,
    /// Ask size.
    AskSize,
    /// Routing key, always equal to `event_type`.
    Partition,
}

impl Field {
    /// All columns in schema order.
    pub const ALL: [Self; FIELD_COUNT] = [
        Self::TradeDt,
        Self::EventType,
        Self::Symbol,
        Self::Exchange,
        Self::EventTm,
        Self::EventSeqNb,
        Self::FileTm,
        Self::Price,
        Self::Size,
        Self::BidPr,
        Self::BidSize,
        Self::AskPr,
        Self::AskSize,
        Self::Partition,
    ];

    /// Columns read from the input line, in schema order.
    pub const RAW: [Self; RAW_FIELD_COUNT] = [
        Self::TradeDt,
        Self::EventType,
        Self::Symbol,
        Self::Exchange,
        Self::EventTm,
        Self::EventSeqNb,
        Self::FileTm,
        Self::Price,
        Self::Size,
        Self::BidPr,
        Self::BidSize,
        Self::AskPr,
        Self::AskSize,
    ];

    /// Column name, also the key looked up in key-value input.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TradeDt => "trade_dt",
            Self::EventType => "event_type",
            Self::Symbol => "symbol",
            Self::Exchange => "exchange",
            Self::EventTm => "event_tm",
            Self::EventSeqNb => "event_seq_nb",
            Self::FileTm => "file_tm",
            Self::Price => "price",
            Self::Size => "size",
            Self::BidPr => "bid_pr",
            Self::BidSize => "bid_size",
            Self::AskPr => "ask_pr",
            Self::AskSize => "ask_size",
            Self::Partition => "partition",
        }
    }

    /// Declared semantic type.
    #[must_use]
    pub const fn field_type(self) -> FieldType {
        match self {
            Self::TradeDt => FieldType::Date,
            Self::EventType | Self::Symbol | Self::Exchange | Self::Partition => FieldType::Text,
            Self::EventTm | Self::FileTm => FieldType::Timestamp,
            Self::EventSeqNb | Self::Size | Self::BidSize | Self::AskSize => FieldType::Integer,
            Self::Price | Self::BidPr | Self::AskPr => FieldType::Decimal,
        }
    }

    /// Position in schema order.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Canonical Record
// =============================================================================

/// One normalized input line.
///
/// Constructed once by the normalizer and never updated afterwards. The
/// `partition` column is not stored; it is always derived from `event_type`
/// and deserializing a row where the two disagree fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireRecord", try_from = "WireRecord")]
pub struct CanonicalRecord {
    /// Trading date.
    pub trade_dt: Option<NaiveDate>,
    /// Record kind.
    pub event_type: EventKind,
    /// Instrument identifier.
    pub symbol: Option<String>,
    /// Venue code.
    pub exchange: Option<String>,
    /// Event time.
    pub event_tm: Option<NaiveDateTime>,
    /// Sequence number within `event_tm`.
    pub event_seq_nb: Option<i64>,
    /// File generation time.
    pub file_tm: Option<NaiveDateTime>,
    /// Trade price (trades only).
    pub price: Option<Decimal>,
    /// Trade size (trades only).
    pub size: Option<i64>,
    /// Bid price (quotes only).
    pub bid_pr: Option<Decimal>,
    /// Bid size (quotes only).
    pub bid_size: Option<i64>,
    /// Ask price (quotes only).
    pub ask_pr: Option<Decimal>,
    /// Ask size (quotes only).
    pub ask_size: Option<i64>,
}

impl CanonicalRecord {
    /// Record with every column null for `kind`.
    #[must_use]
    pub const fn empty(kind: EventKind) -> Self {
        Self {
            trade_dt: None,
            event_type: kind,
            symbol: None,
            exchange: None,
            event_tm: None,
            event_seq_nb: None,
            file_tm: None,
            price: None,
            size: None,
            bid_pr: None,
            bid_size: None,
            ask_pr: None,
            ask_size: None,
        }
    }

    /// The record-level fallback: all 13 data columns null, kind `"B"`.
    #[must_use]
    pub const fn bad() -> Self {
        Self::empty(EventKind::Bad)
    }

    /// Record kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.event_type
    }

    /// Routing key column, always equal to `event_type`.
    #[must_use]
    pub const fn partition(&self) -> EventKind {
        self.event_type
    }

    /// Whether `field` holds a value.
    #[must_use]
    pub const fn is_populated(&self, field: Field) -> bool {
        match field {
            Field::EventType | Field::Partition => true,
            Field::TradeDt => self.trade_dt.is_some(),
            Field::Symbol => self.symbol.is_some(),
            Field::Exchange => self.exchange.is_some(),
            Field::EventTm => self.event_tm.is_some(),
            Field::EventSeqNb => self.event_seq_nb.is_some(),
            Field::FileTm => self.file_tm.is_some(),
            Field::Price => self.price.is_some(),
            Field::Size => self.size.is_some(),
            Field::BidPr => self.bid_pr.is_some(),
            Field::BidSize => self.bid_size.is_some(),
            Field::AskPr => self.ask_pr.is_some(),
            Field::AskSize => self.ask_size.is_some(),
        }
    }

    /// Populated columns in schema order.
    #[must_use]
    pub fn populated_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| self.is_populated(*field))
            .collect()
    }
}

/// A serialized row whose `partition` differs from its `event_type`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("partition {partition} does not match event_type {event_type}")]
pub struct PartitionMismatch {
    /// Kind named by `event_type`.
    pub event_type: EventKind,
    /// Kind named by `partition`.
    pub partition: EventKind,
}

/// Serialized row layout, all 14 columns in schema order.
#[derive(Serialize, Deserialize)]
struct WireRecord {
    trade_dt: Option<NaiveDate>,
    event_type: EventKind,
    symbol: Option<String>,
    exchange: Option<String>,
    event_tm: Option<NaiveDateTime>,
    event_seq_nb: Option<i64>,
    file_tm: Option<NaiveDateTime>,
    price: Option<Decimal>,
    size: Option<i64>,
    bid_pr: Option<Decimal>,
    bid_size: Option<i64>,
    ask_pr: Option<Decimal>,
    ask_size: Option<i64>,
    partition: EventKind,
}

impl From<CanonicalRecord> for WireRecord {
    fn from(record: CanonicalRecord) -> Self {
        Self {
            partition: record.partition(),
            trade_dt: record.trade_dt,
            event_type: record.event_type,
            symbol: record.symbol,
            exchange: record.exchange,
            event_tm: record.event_tm,
            event_seq_nb: record.event_seq_nb,
            file_tm: record.file_tm,
            price: record.price,
            size: record.size,
            bid_pr: record.bid_pr,
            bid_size: record.bid_size,
            ask_pr: record.ask_pr,
            ask_size: record.ask_size,
        }
    }
}

impl TryFrom<WireRecord> for CanonicalRecord {
    type Error = PartitionMismatch;

    fn try_from(wire: WireRecord) -> Result<Self, Self::Error> {
        if wire.partition != wire.event_type {
            return Err(PartitionMismatch {
                event_type: wire.event_type,
                partition: wire.partition,
            });
        }
        Ok(Self {
            trade_dt: wire.trade_dt,
            event_type: wire.event_type,
            symbol: wire.symbol,
            exchange: wire.exchange,
            event_tm: wire.event_tm,
            event_seq_nb: wire.event_seq_nb,
            file_tm: wire.file_tm,
            price: wire.price,
            size: wire.size,
            bid_pr: wire.bid_pr,
            bid_size: wire.bid_size,
            ask_pr: wire.ask_pr,
            ask_size: wire.ask_size,
        })
    }
}

// =============================================================================
// Source Format
// =============================================================================

/// Encoding of an input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// Comma-separated fields addressed by position.
    PositionalCsv,
    /// One JSON object per line, fields addressed by key.
    KeyValueJson,
}

impl SourceFormat {
    /// Get all source formats.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::PositionalCsv, Self::KeyValueJson]
    }

    /// Short format tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PositionalCsv => "csv",
            Self::KeyValueJson => "json",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A format tag outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported source format: {0} (expected csv or json)")]
pub struct UnsupportedFormat(pub String);

impl FromStr for SourceFormat {
    type Err = UnsupportedFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::PositionalCsv),
            "json" => Ok(Self::KeyValueJson),
            _ => Err(UnsupportedFormat(s.to_string())),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
