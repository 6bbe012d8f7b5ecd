//! Incomes: the model, request validation and database functions.

use rusqlite::{Connection, Row, params};
use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::{
    Error, UserID,
    category::{CategoryKind, get_category},
    database_id::{CategoryId, RecordId},
    expense::{description, invalid_pk},
    money::AmountInput,
    recurring::YearMonth,
    validation::FieldErrors,
};

// ============================================================================
// MODELS
// ============================================================================

/// An income as stored in the database.
#[derive(Debug, Clone, PartialEq)]
pub struct Income {
    pub id: RecordId,
    pub user_id: UserID,
    /// The amount the income was created with, before any change log entry applies.
    pub amount: f64,
    pub date: Date,
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub is_recurring: bool,
    pub created_at: OffsetDateTime,
}

/// A validated income, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIncome {
    pub amount: f64,
    pub date: Date,
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub is_recurring: bool,
}

/// The request body for creating or updating an income.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct IncomeData {
    pub amount: Option<AmountInput>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub category: Option<CategoryId>,
    pub is_recurring: Option<bool>,
}

impl IncomeData {
    /// Check every field, reporting all problems at once.
    pub fn validate(&self, user_id: UserID, connection: &Connection) -> Result<NewIncome, Error> {
        let mut errors = FieldErrors::default();

        let amount = errors.amount("amount", self.amount.as_ref());
        let date = errors.date("date", self.date.as_deref());
        let description = description(&mut errors, self.description.as_deref());

        if let Some(category_id) = self.category {
            match get_category(category_id, user_id, CategoryKind::Income, connection) {
                Ok(_) => {}
                Err(Error::NotFound) => errors.add("category", invalid_pk(category_id)),
                Err(error) => return Err(error),
            }
        }

        match (amount, date, description) {
            (Some(amount), Some(date), Some(description)) if errors.is_empty() => Ok(NewIncome {
                amount,
                date,
                description,
                category_id: self.category,
                is_recurring: self.is_recurring.unwrap_or(false),
            }),
            _ => Err(errors.into()),
        }
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

pub fn create_income_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS income (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category_id INTEGER,
            is_recurring INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_income_user_date ON income(user_id, date)",
        (),
    )?;

    Ok(())
}

const INCOME_COLUMNS: &str =
    "id, user_id, amount, date, description, category_id, is_recurring, created_at";

fn map_income_row(row: &Row) -> Result<Income, rusqlite::Error> {
    Ok(Income {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        amount: row.get(2)?,
        date: row.get(3)?,
        description: row.get(4)?,
        category_id: row.get(5)?,
        is_recurring: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn create_income(
    user_id: UserID,
    income: NewIncome,
    connection: &Connection,
) -> Result<Income, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO income (user_id, amount, date, description, category_id, is_recurring, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user_id.as_i64(),
            income.amount,
            income.date,
            income.description,
            income.category_id,
            income.is_recurring,
            created_at
        ],
    )?;

    Ok(Income {
        id: connection.last_insert_rowid(),
        user_id,
        amount: income.amount,
        date: income.date,
        description: income.description,
        category_id: income.category_id,
        is_recurring: income.is_recurring,
        created_at,
    })
}

/// Get an income owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the income does not exist or belongs to another user.
pub fn get_income(id: RecordId, user_id: UserID, connection: &Connection) -> Result<Income, Error> {
    connection
        .query_row(
            &format!("SELECT {INCOME_COLUMNS} FROM income WHERE id = ?1 AND user_id = ?2"),
            params![id, user_id.as_i64()],
            map_income_row,
        )
        .map_err(Error::from)
}

/// The user's incomes ordered by date, optionally limited to those that occur in `month`.
pub fn get_incomes(
    user_id: UserID,
    month: Option<YearMonth>,
    connection: &Connection,
) -> Result<Vec<Income>, Error> {
    match month {
        Some(month) => connection
            .prepare(&format!(
                "SELECT {INCOME_COLUMNS} FROM income
                WHERE user_id = ?1
                    AND ((is_recurring = 0 AND date BETWEEN ?2 AND ?3)
                        OR (is_recurring = 1 AND date <= ?3))
                ORDER BY date, id"
            ))?
            .query_map(
                params![user_id.as_i64(), month.first_day(), month.last_day()],
                map_income_row,
            )?
            .map(|maybe_income| maybe_income.map_err(Error::from))
            .collect(),
        None => connection
            .prepare(&format!(
                "SELECT {INCOME_COLUMNS} FROM income WHERE user_id = ?1 ORDER BY date, id"
            ))?
            .query_map(params![user_id.as_i64()], map_income_row)?
            .map(|maybe_income| maybe_income.map_err(Error::from))
            .collect(),
    }
}

/// Overwrite every field of an income. The change log is left untouched.
pub fn update_income(
    id: RecordId,
    user_id: UserID,
    income: NewIncome,
    connection: &Connection,
) -> Result<Income, Error> {
    let rows_affected = connection.execute(
        "UPDATE income SET amount = ?1, date = ?2, description = ?3, category_id = ?4, is_recurring = ?5
            WHERE id = ?6 AND user_id = ?7",
        params![
            income.amount,
            income.date,
            income.description,
            income.category_id,
            income.is_recurring,
            id,
            user_id.as_i64()
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_income(id, user_id, connection)
}

pub fn delete_income(id: RecordId, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM income WHERE id = ?1 AND user_id = ?2",
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
pub(crate) mod test_utils {
    use rusqlite::Connection;
    use time::Date;

    use crate::UserID;

    use super::{Income, NewIncome, create_income};

    pub fn new_income(amount: f64, date: Date) -> NewIncome {
        NewIncome {
            amount,
            date,
            description: String::new(),
            category_id: None,
            is_recurring: false,
        }
    }

    pub fn must_create_income(user_id: UserID, income: NewIncome, connection: &Connection) -> Income {
        create_income(user_id, income, connection).expect("Could not create test income")
    }
}
