//! Credit cards: the model, request validation and database functions.

use std::collections::HashMap;

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error, UserID,
    database_id::CreditCardId,
    date_format,
    money::{self, AmountInput},
    validation::FieldErrors,
};

const MAX_BRAND_LENGTH: usize = 50;

// ============================================================================
// MODELS
// ============================================================================

/// A credit card that expenses can be charged to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditCard {
    /// The ID of the credit card.
    pub id: CreditCardId,
    /// The last four digits of the card number.
    pub last_four_digits: String,
    /// The card network or issuer, e.g. "Visa".
    pub brand: String,
    /// The date the card expires.
    #[serde(with = "date_format::iso_date")]
    pub expire_date: Date,
    /// The credit limit.
    #[serde(serialize_with = "money::serialize")]
    pub credit_limit: f64,
    /// The day of the month the statement must be paid.
    pub payment_day: u8,
    /// The day of the month the statement closes.
    ///
    /// Purchases made after this day are billed a month later.
    pub close_card_day: u8,
}

impl CreditCard {
    /// A short label such as "visa ending in 1234".
    pub fn label(&self) -> String {
        format!(
            "{} ending in {}",
            self.brand.to_lowercase(),
            self.last_four_digits
        )
    }
}

/// A validated credit card, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCreditCard {
    pub last_four_digits: String,
    pub brand: String,
    pub expire_date: Date,
    pub credit_limit: f64,
    pub payment_day: u8,
    pub close_card_day: u8,
}

/// The request body for creating or updating a credit card.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CreditCardData {
    pub last_four_digits: Option<String>,
    pub brand: Option<String>,
    pub expire_date: Option<String>,
    pub credit_limit: Option<AmountInput>,
    pub payment_day: Option<i64>,
    pub close_card_day: Option<i64>,
}

impl CreditCardData {
    /// Check every field, reporting all problems at once.
    pub fn validate(&self) -> Result<NewCreditCard, Error> {
        let mut errors = FieldErrors::default();

        let last_four_digits = errors
            .required("last_four_digits", self.last_four_digits.as_deref())
            .map(str::trim)
            .and_then(|digits| {
                if digits.len() == 4 && digits.bytes().all(|byte| byte.is_ascii_digit()) {
                    Some(digits.to_owned())
                } else {
                    errors.add("last_four_digits", "Ensure this field contains exactly 4 digits.");
                    None
                }
            });
        let brand = errors.text("brand", self.brand.as_deref(), MAX_BRAND_LENGTH);
        let expire_date = errors.date("expire_date", self.expire_date.as_deref());
        let credit_limit = errors.amount("credit_limit", self.credit_limit.as_ref());
        let payment_day = day_of_month(&mut errors, "payment_day", self.payment_day);
        let close_card_day = day_of_month(&mut errors, "close_card_day", self.close_card_day);

        if let (Some(payment_day), Some(close_card_day)) = (payment_day, close_card_day) {
            if payment_day <= close_card_day {
                errors.add("payment_day", "Payment day must be after the closing day.");
            }
        }

        match (
            last_four_digits,
            brand,
            expire_date,
            credit_limit,
            payment_day,
            close_card_day,
        ) {
            (
                Some(last_four_digits),
                Some(brand),
                Some(expire_date),
                Some(credit_limit),
                Some(payment_day),
                Some(close_card_day),
            ) if errors.is_empty() => Ok(NewCreditCard {
                last_four_digits,
                brand,
                expire_date,
                credit_limit,
                payment_day,
                close_card_day,
            }),
            _ => Err(errors.into()),
        }
    }
}

fn day_of_month(errors: &mut FieldErrors, field: &str, day: Option<i64>) -> Option<u8> {
    let day = errors.required(field, day)?;

    match u8::try_from(day) {
        Ok(day) if (1..=31).contains(&day) => Some(day),
        _ => {
            errors.add(field, "Ensure this value is between 1 and 31.");
            None
        }
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

pub fn create_credit_card_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS credit_card (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            last_four_digits TEXT NOT NULL,
            brand TEXT NOT NULL,
            expire_date TEXT NOT NULL,
            credit_limit REAL NOT NULL,
            payment_day INTEGER NOT NULL,
            close_card_day INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

fn map_credit_card_row(row: &Row) -> Result<CreditCard, rusqlite::Error> {
    Ok(CreditCard {
        id: row.get(0)?,
        last_four_digits: row.get(1)?,
        brand: row.get(2)?,
        expire_date: row.get(3)?,
        credit_limit: row.get(4)?,
        payment_day: row.get(5)?,
        close_card_day: row.get(6)?,
    })
}

pub fn create_credit_card(
    user_id: UserID,
    card: NewCreditCard,
    connection: &Connection,
) -> Result<CreditCard, Error> {
    connection.execute(
        "INSERT INTO credit_card
            (user_id, last_four_digits, brand, expire_date, credit_limit, payment_day, close_card_day)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user_id.as_i64(),
            card.last_four_digits,
            card.brand,
            card.expire_date,
            card.credit_limit,
            card.payment_day,
            card.close_card_day
        ],
    )?;

    Ok(CreditCard {
        id: connection.last_insert_rowid(),
        last_four_digits: card.last_four_digits,
        brand: card.brand,
        expire_date: card.expire_date,
        credit_limit: card.credit_limit,
        payment_day: card.payment_day,
        close_card_day: card.close_card_day,
    })
}

/// Get a credit card owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the card does not exist or belongs to another user.
pub fn get_credit_card(
    id: CreditCardId,
    user_id: UserID,
    connection: &Connection,
) -> Result<CreditCard, Error> {
    connection
        .query_row(
            "SELECT id, last_four_digits, brand, expire_date, credit_limit, payment_day, close_card_day
            FROM credit_card WHERE id = ?1 AND user_id = ?2",
            params![id, user_id.as_i64()],
            map_credit_card_row,
        )
        .map_err(Error::from)
}

pub fn get_credit_cards(user_id: UserID, connection: &Connection) -> Result<Vec<CreditCard>, Error> {
    connection
        .prepare(
            "SELECT id, last_four_digits, brand, expire_date, credit_limit, payment_day, close_card_day
            FROM credit_card WHERE user_id = ?1 ORDER BY id",
        )?
        .query_map(params![user_id.as_i64()], map_credit_card_row)?
        .map(|maybe_card| maybe_card.map_err(Error::from))
        .collect()
}

/// The user's credit cards keyed by ID.
pub fn get_credit_card_map(
    user_id: UserID,
    connection: &Connection,
) -> Result<HashMap<CreditCardId, CreditCard>, Error> {
    Ok(get_credit_cards(user_id, connection)?
        .into_iter()
        .map(|card| (card.id, card))
        .collect())
}

/// Overwrite every field of a credit card.
///
/// # Errors
/// Returns [Error::NotFound] if the card does not exist or belongs to another user.
pub fn update_credit_card(
    id: CreditCardId,
    user_id: UserID,
    card: NewCreditCard,
    connection: &Connection,
) -> Result<CreditCard, Error> {
    let rows_affected = connection.execute(
        "UPDATE credit_card SET last_four_digits = ?1, brand = ?2, expire_date = ?3,
            credit_limit = ?4, payment_day = ?5, close_card_day = ?6
            WHERE id = ?7 AND user_id = ?8",
        params![
            card.last_four_digits,
            card.brand,
            card.expire_date,
            card.credit_limit,
            card.payment_day,
            card.close_card_day,
            id,
            user_id.as_i64()
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_credit_card(id, user_id, connection)
}

/// Delete a credit card. Expenses charged to it are kept with no card.
pub fn delete_credit_card(
    id: CreditCardId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM credit_card WHERE id = ?1 AND user_id = ?2",
        params![id, user_id.as_i64()],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod validation_tests {
    use time::macros::date;

    use crate::{Error, money::AmountInput};

    use super::{CreditCardData, NewCreditCard};

    fn valid_data() -> CreditCardData {
        CreditCardData {
            last_four_digits: Some("9876".to_owned()),
            brand: Some("Amex".to_owned()),
            expire_date: Some("2026-05-31".to_owned()),
            credit_limit: Some(AmountInput::Number(7000.0)),
            payment_day: Some(28),
            close_card_day: Some(25),
        }
    }

    fn field_errors(data: CreditCardData) -> crate::FieldErrors {
        match data.validate() {
            Err(Error::InvalidFields(errors)) => errors,
            other => panic!("want field errors, got {other:?}"),
        }
    }

    #[test]
    fn valid_data_passes() {
        assert_eq!(
            valid_data().validate(),
            Ok(NewCreditCard {
                last_four_digits: "9876".to_owned(),
                brand: "Amex".to_owned(),
                expire_date: date!(2026 - 05 - 31),
                credit_limit: 7000.0,
                payment_day: 28,
                close_card_day: 25,
            })
        );
    }

    #[test]
    fn missing_fields_are_each_reported() {
        let errors = field_errors(CreditCardData {
            brand: None,
            expire_date: None,
            ..valid_data()
        });

        assert_eq!(errors.get("brand"), Some("This field is required."));
        assert_eq!(errors.get("expire_date"), Some("This field is required."));
    }

    #[test]
    fn last_four_digits_must_be_four_digits() {
        for digits in ["123", "12345", "12a4"] {
            let errors = field_errors(CreditCardData {
                last_four_digits: Some(digits.to_owned()),
                ..valid_data()
            });

            assert!(errors.get("last_four_digits").is_some(), "{digits} should be rejected");
        }
    }

    #[test]
    fn days_must_be_in_month_range() {
        let errors = field_errors(CreditCardData {
            payment_day: Some(32),
            close_card_day: Some(0),
            ..valid_data()
        });

        assert_eq!(errors.get("payment_day"), Some("Ensure this value is between 1 and 31."));
        assert_eq!(errors.get("close_card_day"), Some("Ensure this value is between 1 and 31."));
    }

    #[test]
    fn payment_day_must_follow_close_day() {
        let errors = field_errors(CreditCardData {
            payment_day: Some(15),
            close_card_day: Some(25),
            ..valid_data()
        });

        assert_eq!(
            errors.get("payment_day"),
            Some("Payment day must be after the closing day.")
        );
    }
}
