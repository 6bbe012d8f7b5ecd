//! Field-level validation errors for request bodies.

use std::{collections::BTreeMap, fmt::Display};

use serde::Serialize;
use time::Date;

use crate::{date_format::parse_date, money::AmountInput};

/// The message used for required fields that were missing or null.
pub const REQUIRED: &str = "This field is required.";

/// The message used for dates that are not formatted as "YYYY-MM-DD".
pub const INVALID_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";

/// Validation errors keyed by field name.
///
/// Serializes to a JSON object such as `{"amount": "This field is required."}`.
/// Only the first error recorded for a field is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Record `message` against `field` unless the field already has an error.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_insert_with(|| message.into());
    }

    /// Whether no errors have been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The error recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Record a required-field error if `value` is `None`, passing the value through.
    pub(crate) fn required<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.add(field, REQUIRED);
        }

        value
    }

    /// Parse a required amount.
    pub(crate) fn amount(&mut self, field: &str, input: Option<&AmountInput>) -> Option<f64> {
        let input = self.required(field, input)?;

        match input.parse() {
            Ok(amount) => Some(amount),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }

    /// Parse a required "YYYY-MM-DD" date.
    pub(crate) fn date(&mut self, field: &str, input: Option<&str>) -> Option<Date> {
        let input = self.required(field, input)?;

        match parse_date(input) {
            Some(date) => Some(date),
            None => {
                self.add(field, INVALID_DATE);
                None
            }
        }
    }

    /// Check a required, non-blank text field and return it trimmed.
    pub(crate) fn text(&mut self, field: &str, input: Option<&str>, max_length: usize) -> Option<String> {
        let input = self.required(field, input)?.trim();

        if input.is_empty() {
            self.add(field, "This field may not be blank.");
            return None;
        }

        if input.chars().count() > max_length {
            self.add(
                field,
                format!("Ensure this field has no more than {max_length} characters."),
            );
            return None;
        }

        Some(input.to_owned())
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self
            .0
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect();

        write!(f, "{}", messages.join("; "))
    }
}
