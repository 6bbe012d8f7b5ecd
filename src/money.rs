//! Monetary amounts as they cross the JSON boundary.
//!
//! Amounts are kept as `f64` rounded to cents. They are written to JSON as
//! strings with two decimal places, e.g. `"200.00"`, and may be read from
//! either a JSON number or a numeric string.

use serde::{Deserialize, Serializer};

/// Round `amount` to the nearest cent.
///
/// Negative zero is normalised to zero so that it is never written as "-0.00".
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0 + 0.0
}

/// Serialize an amount as a string with exactly two decimal places.
pub fn serialize<S>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{:.2}", round_to_cents(*amount)))
}

/// An amount as submitted by a client, before it has been checked.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    /// A JSON number, e.g. `200` or `19.99`.
    Number(f64),
    /// A JSON string, e.g. `"200.00"`.
    Text(String),
}

impl AmountInput {
    /// Parse the input into a finite, non-negative amount rounded to cents.
    ///
    /// # Errors
    /// Returns a message suitable for showing to the client.
    pub fn parse(&self) -> Result<f64, &'static str> {
        let amount = match self {
            AmountInput::Number(number) => *number,
            AmountInput::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| "A valid number is required.")?,
        };

        if amount < 0.0 {
            return Err("Ensure this value is greater than or equal to 0.");
        }

        // Huge amounts overflow to infinity once scaled to cents.
        let amount = round_to_cents(amount);
        if !amount.is_finite() {
            return Err("A valid number is required.");
        }

        Ok(amount)
    }
}
