//! Record Classifier
//!
//! Maps a raw record type discriminator onto a record kind. `"T"` and `"Q"`
//! are the only codes that classify; everything else, including an absent
//! discriminator, is a bad line.

use crate::domain::record::EventKind;

/// Classify a raw discriminator. Never fails.
#[must_use]
pub fn classify(discriminator: Option<&str>) -> EventKind {
    match discriminator.and_then(EventKind::from_code) {
        Some(kind) => kind,
        None => EventKind::Bad,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Some("T"), EventKind::Trade)]
    #[test_case(Some("Q"), EventKind::Quote)]
    #[test_case(Some("B"), EventKind::Bad)]
    #[test_case(Some("t"), EventKind::Bad ; "lowercase trade")]
    #[test_case(Some(" T"), EventKind::Bad ; "untrimmed trade")]
    #[test_case(Some("TQ"), EventKind::Bad)]
    #[test_case(Some(""), EventKind::Bad ; "empty")]
    #[test_case(None, EventKind::Bad ; "absent")]
    fn classification(discriminator: Option<&str>, expected: EventKind) {
        assert_eq!(classify(discriminator), expected);
    }
}
