//! Decides which amount a recurring expense or income has in a given month.

use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{date_format, database_id::ChangeLogId, money, recurring::YearMonth};

/// An entry in the change log of a recurring record.
///
/// From `effective_date` onwards, the record's amount is `new_amount`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountChange {
    /// The ID of the change log entry.
    pub id: ChangeLogId,

    /// The amount that applies from `effective_date`.
    #[serde(serialize_with = "money::serialize")]
    pub new_amount: f64,

    /// The first day the new amount applies. Entries without a date are never applied.
    #[serde(with = "date_format::iso_date::option")]
    pub effective_date: Option<Date>,

    /// When the entry was recorded. Used to break ties between entries with the same date.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Resolve the amount of a recurring record for `month`.
///
/// `base_amount` is the amount the record was created with and `start_date` is
/// the record's date. The latest change effective on or before the last day of
/// `month` wins, ties going to the most recently created entry. Changes dated
/// before the start of the record's first month and changes without an
/// effective date are ignored. If no change applies the base amount is returned.
pub fn resolve_amount(
    base_amount: f64,
    start_date: Date,
    changes: &[AmountChange],
    month: YearMonth,
) -> f64 {
    let earliest = YearMonth::from_date(start_date).first_day();
    let latest = month.last_day();

    changes
        .iter()
        .filter_map(|change| {
            change
                .effective_date
                .filter(|date| earliest <= *date && *date <= latest)
                .map(|date| (date, change))
        })
        .max_by_key(|(date, change)| (*date, change.created_at, change.id))
        .map_or(base_amount, |(_, change)| change.new_amount)
}

/// Whether a record dated `date` appears in the listing for `month`.
///
/// One-off records appear in the month they are dated. Recurring records
/// appear in every month from the one they start in.
pub fn occurs_in(date: Date, is_recurring: bool, month: YearMonth) -> bool {
    if is_recurring {
        date <= month.last_day()
    } else {
        month.contains(date)
    }
}

/// The amount of a record for `month`, resolving change logs only for recurring records.
pub fn amount_for_month(
    base_amount: f64,
    date: Date,
    is_recurring: bool,
    changes: &[AmountChange],
    month: YearMonth,
) -> f64 {
    if is_recurring {
        resolve_amount(base_amount, date, changes, month)
    } else {
        base_amount
    }
}
