//! Sample and sample-kind records.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Last year whose dates still serialize as four-digit `YYYY-MM-DD` text.
///
/// Past it chrono writes `+YYYYY-MM-DD`, which breaks the text ordering the
/// tray search relies on.
pub const MAX_STORABLE_YEAR: i32 = 9999;

/// Returns whether `date` can be stored and compared as ISO text.
pub fn is_storable_date(date: NaiveDate) -> bool {
    (0..=MAX_STORABLE_YEAR).contains(&date.year())
}

/// Identifier of a stored specimen.
pub type SampleId = i64;

/// Identifier of a sample-kind reference row.
pub type SampleKindId = i64;

/// Reference category defining how long a sample stays usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleKind {
    pub id: SampleKindId,
    /// Display label (`samplekind.text`).
    pub label: String,
    /// Number of days a sample of this kind remains usable from creation.
    pub valid_days: u32,
}

impl SampleKind {
    /// Computes the expiration date of a sample of this kind created on
    /// `created_on`.
    ///
    /// Returns `None` when the result falls past year 9999.
    pub fn expiration_from(&self, created_on: NaiveDate) -> Option<NaiveDate> {
        created_on
            .checked_add_days(Days::new(u64::from(self.valid_days)))
            .filter(|date| is_storable_date(*date))
    }
}

/// A stored specimen.
///
/// `expiration_date` is fixed at creation and never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub id: SampleId,
    pub kind_id: SampleKindId,
    pub expiration_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::{is_storable_date, SampleKind};
    use chrono::NaiveDate;

    #[test]
    fn expiration_adds_valid_days() {
        let kind = SampleKind {
            id: 1,
            label: "blood".to_string(),
            valid_days: 10,
        };
        let created = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            kind.expiration_from(created),
            NaiveDate::from_ymd_opt(2024, 1, 11)
        );
    }

    #[test]
    fn expiration_with_zero_days_is_creation_date() {
        let kind = SampleKind {
            id: 2,
            label: "plasma".to_string(),
            valid_days: 0,
        };
        let created = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(kind.expiration_from(created), Some(created));
    }

    #[test]
    fn expiration_past_year_9999_is_refused() {
        let created = NaiveDate::from_ymd_opt(9999, 12, 21).unwrap();
        let last_day = SampleKind {
            id: 3,
            label: "serum".to_string(),
            valid_days: 10,
        };
        assert_eq!(
            last_day.expiration_from(created),
            NaiveDate::from_ymd_opt(9999, 12, 31)
        );

        let one_more = SampleKind {
            valid_days: 11,
            ..last_day
        };
        assert_eq!(one_more.expiration_from(created), None);

        let huge = SampleKind {
            id: 4,
            label: "tissue".to_string(),
            valid_days: 3_000_000,
        };
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(huge.expiration_from(today), None);
    }

    #[test]
    fn storable_dates_stop_at_four_digit_years() {
        assert!(is_storable_date(NaiveDate::from_ymd_opt(9999, 12, 31).unwrap()));
        assert!(!is_storable_date(NaiveDate::from_ymd_opt(10000, 1, 1).unwrap()));
        assert!(!is_storable_date(NaiveDate::from_ymd_opt(-1, 1, 1).unwrap()));
    }
}
