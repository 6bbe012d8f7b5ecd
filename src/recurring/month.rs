//! A calendar month and the `year`/`month` query parameters that select one.

use std::fmt::Display;

use serde::{Deserialize, Serialize, Serializer};
use time::{Date, Duration, Month};

use crate::Error;

/// A month of a specific year, e.g. September 2024.
///
/// Only months that lie entirely within the range supported by [time::Date] can be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    first_day: Date,
}

impl YearMonth {
    /// Create a month from a year and a month number in `1..=12`.
    ///
    /// # Errors
    /// Returns [Error::InvalidMonth] if the month number is out of range or the year is outside
    /// the supported calendar range.
    pub fn new(year: i32, month: u8) -> Result<Self, Error> {
        let month = Month::try_from(month).map_err(|_| Error::InvalidMonth)?;
        let first_day = Date::from_calendar_date(year, month, 1).map_err(|_| Error::InvalidMonth)?;

        Ok(Self { first_day })
    }

    /// The month that contains `date`.
    pub fn from_date(date: Date) -> Self {
        Self {
            first_day: date.saturating_sub(Duration::days(i64::from(date.day()) - 1)),
        }
    }

    /// The calendar year.
    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    /// The month of the year.
    pub fn month(&self) -> Month {
        self.first_day.month()
    }

    /// The first day of the month.
    pub fn first_day(&self) -> Date {
        self.first_day
    }

    /// The last day of the month.
    pub fn last_day(&self) -> Date {
        let length = self.month().length(self.year());

        self.first_day
            .saturating_add(Duration::days(i64::from(length) - 1))
    }

    /// Whether `date` falls within this month.
    pub fn contains(&self, date: Date) -> bool {
        self.first_day <= date && date <= self.last_day()
    }

    /// The following month.
    ///
    /// # Errors
    /// Returns [Error::InvalidMonth] past the end of the supported calendar range.
    pub fn next(&self) -> Result<Self, Error> {
        self.add_months(1)
    }

    /// The month `months` months after this one, or before it if `months` is negative.
    ///
    /// # Errors
    /// Returns [Error::InvalidMonth] if the result is outside the supported calendar range.
    pub fn add_months(&self, months: i32) -> Result<Self, Error> {
        let index = self.month_index() + i64::from(months);
        let year = i32::try_from(index.div_euclid(12)).map_err(|_| Error::InvalidMonth)?;
        let month = index.rem_euclid(12) as u8 + 1;

        Self::new(year, month)
    }

    /// The number of months from `earlier` to this month.
    ///
    /// Negative if `earlier` is actually later than this month.
    pub fn months_since(&self, earlier: YearMonth) -> i64 {
        self.month_index() - earlier.month_index()
    }

    fn month_index(&self) -> i64 {
        i64::from(self.year()) * 12 + i64::from(u8::from(self.month())) - 1
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), u8::from(self.month()))
    }
}

impl Serialize for YearMonth {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// The `year` and `month` query parameters used by listing endpoints.
///
/// Both are kept as text so that non-numeric values produce the same error as
/// out of range ones.
#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    /// The calendar year, e.g. "2024".
    pub year: Option<String>,
    /// The month number, "1" to "12".
    pub month: Option<String>,
}

impl MonthQuery {
    /// The month selected by the query, or `None` if neither parameter was given.
    ///
    /// # Errors
    /// Returns [Error::InvalidMonth] if only one parameter was given or either is not a valid number.
    pub fn year_month(&self) -> Result<Option<YearMonth>, Error> {
        match (&self.year, &self.month) {
            (None, None) => Ok(None),
            (Some(year), Some(month)) => {
                let year = year.trim().parse().map_err(|_| Error::InvalidMonth)?;
                let month = month.trim().parse().map_err(|_| Error::InvalidMonth)?;

                YearMonth::new(year, month).map(Some)
            }
            _ => Err(Error::InvalidMonth),
        }
    }
}
