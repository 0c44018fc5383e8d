//! Record Normalizer
//!
//! The per-line entry point: extract, classify, coerce, stamp the partition.
//!
//! Normalization is total. A line that cannot be split into fields, or whose
//! record type is not recognized, becomes a bad record (record-level
//! fallback); a classified line with an unparseable column keeps its kind and
//! loses only that column (field-level fallback). Nothing here panics or
//! returns an error to the caller.

use std::fmt;

use super::classifier::classify;
use super::coercer::{Coercion, coerce};
use super::extractor::{ExtractError, try_extract_fields};
use crate::domain::record::{CanonicalRecord, EventKind, Field, SourceFormat};

/// Why a line was degraded to a bad record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    /// The line could not be split into fields.
    Extraction(ExtractError),
    /// Fields were read but the record type is not a trade or quote.
    Unclassified {
        /// The record type found on the line.
        discriminator: String,
    },
}

impl Fallback {
    /// Stable label for metrics and logs.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Extraction(err) => err.reason(),
            Self::Unclassified { .. } => "unclassified",
        }
    }
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extraction(err) => write!(f, "{err}"),
            Self::Unclassified { discriminator } => {
                write!(f, "unrecognized record type {discriminator:?}")
            }
        }
    }
}

/// A normalized line together with how it degraded, if at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalization {
    /// The canonical record.
    pub record: CanonicalRecord,
    /// Record-level fallback cause, when the line became a bad record.
    pub fallback: Option<Fallback>,
    /// Columns nulled by field-level fallback.
    pub degraded: Vec<Field>,
}

impl Normalization {
    /// Whether the line normalized with no fallback of either kind.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.fallback.is_none() && self.degraded.is_empty()
    }
}

/// Normalize one line into a canonical record.
#[must_use]
pub fn normalize(line: &str, format: SourceFormat) -> CanonicalRecord {
    normalize_with_diagnostics(line, format).record
}

/// Normalize one line, also reporting which fallbacks applied.
#[must_use]
pub fn normalize_with_diagnostics(line: &str, format: SourceFormat) -> Normalization {
    let raw = match try_extract_fields(line, format) {
        Ok(raw) => raw,
        Err(err) => {
            return Normalization {
                record: CanonicalRecord::bad(),
                fallback: Some(Fallback::Extraction(err)),
                degraded: Vec::new(),
            };
        }
    };

    let kind = classify(raw.discriminator());
    let fallback = (kind == EventKind::Bad).then(|| Fallback::Unclassified {
        discriminator: raw.discriminator().unwrap_or_default().to_string(),
    });

    let Coercion { record, degraded } = coerce(&raw, kind);
    debug_assert_eq!(record.kind(), kind);

    Normalization {
        record,
        fallback,
        degraded,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test]
    fn positional_trade() {
        let record = normalize(
            "20230101,,T,XNYS,093015123,1,20230101090000,150.25,100",
            SourceFormat::PositionalCsv,
        );

        assert_eq!(record.event_type, EventKind::Trade);
        assert_eq!(record.partition(), EventKind::Trade);
        assert_eq!(record.trade_dt, NaiveDate::from_ymd_opt(2023, 1, 1));
        assert_eq!(record.symbol.as_deref(), Some("XNYS"));
        assert_eq!(record.price, Some(dec!(150.25)));
        assert_eq!(record.size, Some(100));
        assert_eq!(record.bid_pr, None);
        assert_eq!(record.bid_size, None);
        assert_eq!(record.ask_pr, None);
        assert_eq!(record.ask_size, None);
    }

    #[test]
    fn positional_trade_reports_unparseable_times() {
        let result = normalize_with_diagnostics(
            "20230101,,T,XNYS,093015123,1,20230101090000,150.25,100",
            SourceFormat::PositionalCsv,
        );

        assert_eq!(result.fallback, None);
        // event_tm is a bare time of day; file_tm is empty and simply null.
        assert_eq!(result.degraded, vec![Field::EventTm]);
        assert_eq!(result.record.file_tm, None);
    }

    #[test]
    fn key_value_quote() {
        let record = normalize(
            r#"{"trade_dt":"2023-01-01","event_type":"Q","symbol":"AAPL","bid_pr":"99.5","ask_pr":"99.7"}"#,
            SourceFormat::KeyValueJson,
        );

        assert_eq!(record.event_type, EventKind::Quote);
        assert_eq!(record.partition(), EventKind::Quote);
        assert_eq!(record.symbol.as_deref(), Some("AAPL"));
        assert_eq!(record.bid_pr, Some(dec!(99.5)));
        assert_eq!(record.ask_pr, Some(dec!(99.7)));
        assert_eq!(record.price, None);
        assert_eq!(record.size, None);
    }

    #[test]
    fn json_number_price_is_exact() {
        let record = normalize(
            r#"{"event_type":"T","price":12345678901.123456789,"bid_pr":0.1}"#,
            SourceFormat::KeyValueJson,
        );

        assert_eq!(record.price, Some(dec!(12345678901.123456789)));
        assert_eq!(record.price.unwrap().to_string(), "12345678901.123456789");
    }

    #[test]
    fn out_of_range_json_price_degrades_only_the_price() {
        let result = normalize_with_diagnostics(
            r#"{"event_type":"T","symbol":"A","price":1e400,"size":5}"#,
            SourceFormat::KeyValueJson,
        );

        assert_eq!(result.fallback, None);
        assert_eq!(result.degraded, vec![Field::Price]);
        assert_eq!(result.record.kind(), EventKind::Trade);
        assert_eq!(result.record.symbol.as_deref(), Some("A"));
        assert_eq!(result.record.price, None);
        assert_eq!(result.record.size, Some(5));
    }

    #[test]
    fn unrecognized_record_type_is_bad() {
        let result = normalize_with_diagnostics("not,a,valid", SourceFormat::PositionalCsv);

        assert_eq!(result.record, CanonicalRecord::bad());
        assert_eq!(
            result.fallback,
            Some(Fallback::Unclassified {
                discriminator: "valid".to_string()
            })
        );
        assert_eq!(result.fallback.unwrap().reason(), "unclassified");
    }

    #[test]
    fn empty_document_is_bad() {
        let result = normalize_with_diagnostics("{}", SourceFormat::KeyValueJson);

        assert_eq!(result.record, CanonicalRecord::bad());
        assert_eq!(
            result.fallback,
            Some(Fallback::Extraction(ExtractError::MissingDiscriminator))
        );
    }

    #[test]
    fn unknown_json_record_type_drops_its_fields() {
        let result = normalize_with_diagnostics(
            r#"{"event_type":"X","symbol":"AAPL","price":"1.0"}"#,
            SourceFormat::KeyValueJson,
        );

        assert_eq!(result.record, CanonicalRecord::bad());
        assert_eq!(result.fallback.as_ref().map(Fallback::reason), Some("unclassified"));
    }

    #[test]
    fn trade_document_ignores_quote_keys() {
        let record = normalize(
            r#"{"event_type":"T","price":10.5,"size":3,"bid_pr":"10.4","ask_size":7}"#,
            SourceFormat::KeyValueJson,
        );

        assert_eq!(record.price, Some(dec!(10.5)));
        assert_eq!(record.size, Some(3));
        assert_eq!(record.bid_pr, None);
        assert_eq!(record.ask_size, None);
    }

    #[test]
    fn corrupt_price_keeps_kind() {
        let result = normalize_with_diagnostics(
            "2020-08-06,2020-08-06 09:30:00,T,SYMA,2020-08-06 09:40:00,1,NYSE,abc,100",
            SourceFormat::PositionalCsv,
        );

        assert!(result.fallback.is_none());
        assert_eq!(result.degraded, vec![Field::Price]);
        assert_eq!(result.record.kind(), EventKind::Trade);
        assert_eq!(result.record.size, Some(100));
    }

    #[test]
    fn clean_line_has_no_diagnostics() {
        let result = normalize_with_diagnostics(
            "2020-08-06,2020-08-06 09:30:00,Q,SYMA,2020-08-06 09:35:00,2,NYSE,75.30,100,75.35,200",
            SourceFormat::PositionalCsv,
        );

        assert!(result.is_clean());
        assert_eq!(result.record.kind(), EventKind::Quote);
    }

    #[test_case("", SourceFormat::PositionalCsv ; "empty csv")]
    #[test_case("", SourceFormat::KeyValueJson ; "empty json")]
    #[test_case(",,,,,,,,,,,,,", SourceFormat::PositionalCsv ; "only commas")]
    #[test_case("{\"event_type\": [\"T\"]}", SourceFormat::KeyValueJson ; "array discriminator")]
    #[test_case("20230101,,Q,SYM,1,2,X,1.0", SourceFormat::PositionalCsv ; "short quote")]
    fn structurally_broken_lines_are_bad(line: &str, format: SourceFormat) {
        let result = normalize_with_diagnostics(line, format);

        assert_eq!(result.record, CanonicalRecord::bad());
        assert!(result.fallback.is_some());
    }
}
