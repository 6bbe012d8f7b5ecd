//! Expenses: the model, request validation and database functions.

use rusqlite::{Connection, Row, params};
use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::{
    Error, UserID,
    category::{CategoryKind, get_category},
    credit_card::get_credit_card,
    database_id::{CategoryId, CreditCardId, RecordId},
    money::AmountInput,
    recurring::YearMonth,
    validation::FieldErrors,
};

/// The longest description that may be stored, in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 255;

// ============================================================================
// MODELS
// ============================================================================

/// An expense as stored in the database.
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: RecordId,
    pub user_id: UserID,
    /// The amount the expense was created with.
    ///
    /// For recurring expenses this is the amount before any change log entry applies.
    pub amount: f64,
    /// When the expense was made. Recurring expenses repeat monthly from this date.
    pub date: Date,
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub is_recurring: bool,
    /// The number of monthly credit card statements the amount is split over.
    pub installments: u32,
    pub credit_card_id: Option<CreditCardId>,
    /// A percentage added to credit card charges, e.g. `2.5` for 2.5%.
    pub surcharge: f64,
    pub created_at: OffsetDateTime,
}

/// A validated expense, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub amount: f64,
    pub date: Date,
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub is_recurring: bool,
    pub installments: u32,
    pub credit_card_id: Option<CreditCardId>,
    pub surcharge: f64,
}

/// The request body for creating or updating an expense.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ExpenseData {
    pub amount: Option<AmountInput>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub category: Option<CategoryId>,
    pub is_recurring: Option<bool>,
    pub installments: Option<i64>,
    pub credit_card: Option<CreditCardId>,
    pub surcharge: Option<AmountInput>,
}

impl ExpenseData {
    /// Check every field, reporting all problems at once.
    ///
    /// The category must be one of the user's expense categories and the credit
    /// card must be one of the user's cards.
    pub fn validate(&self, user_id: UserID, connection: &Connection) -> Result<NewExpense, Error> {
        let mut errors = FieldErrors::default();

        let amount = errors.amount("amount", self.amount.as_ref());
        let date = errors.date("date", self.date.as_deref());
        let description = description(&mut errors, self.description.as_deref());
        let is_recurring = self.is_recurring.unwrap_or(false);

        let installments = match self.installments.unwrap_or(1) {
            installments if installments < 1 => {
                errors.add("installments", "Ensure this value is greater than or equal to 1.");
                None
            }
            installments if is_recurring && installments > 1 => {
                errors.add(
                    "installments",
                    "Recurring expenses cannot have more than 1 installment.",
                );
                None
            }
            installments => match u32::try_from(installments) {
                Ok(installments) => Some(installments),
                Err(_) => {
                    errors.add("installments", "Ensure this value is less than or equal to 4294967295.");
                    None
                }
            },
        };

        let surcharge = match &self.surcharge {
            None => Some(0.0),
            Some(input) => match input.parse() {
                Ok(surcharge) => Some(surcharge),
                Err(message) => {
                    errors.add("surcharge", message);
                    None
                }
            },
        };

        if let Some(category_id) = self.category {
            match get_category(category_id, user_id, CategoryKind::Expense, connection) {
                Ok(_) => {}
                Err(Error::NotFound) => errors.add("category", invalid_pk(category_id)),
                Err(error) => return Err(error),
            }
        }

        if let Some(credit_card_id) = self.credit_card {
            match get_credit_card(credit_card_id, user_id, connection) {
                Ok(_) => {}
                Err(Error::NotFound) => errors.add("credit_card", invalid_pk(credit_card_id)),
                Err(error) => return Err(error),
            }
        }

        match (amount, date, description, installments, surcharge) {
            (Some(amount), Some(date), Some(description), Some(installments), Some(surcharge))
                if errors.is_empty() =>
            {
                Ok(NewExpense {
                    amount,
                    date,
                    description,
                    category_id: self.category,
                    is_recurring,
                    installments,
                    credit_card_id: self.credit_card,
                    surcharge,
                })
            }
            _ => Err(errors.into()),
        }
    }
}

/// Check an optional free text description, returning it trimmed.
pub(crate) fn description(errors: &mut FieldErrors, input: Option<&str>) -> Option<String> {
    let description = input.unwrap_or_default().trim();

    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        errors.add(
            "description",
            format!("Ensure this field has no more than {MAX_DESCRIPTION_LENGTH} characters."),
        );
        return None;
    }

    Some(description.to_owned())
}

/// The message for a reference to a category or card the user does not have.
pub(crate) fn invalid_pk(id: i64) -> String {
    format!("Invalid pk \"{id}\" - object does not exist.")
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS expense (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category_id INTEGER,
            is_recurring INTEGER NOT NULL DEFAULT 0,
            installments INTEGER NOT NULL DEFAULT 1 CHECK (installments >= 1),
            credit_card_id INTEGER,
            surcharge REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL,
            FOREIGN KEY(credit_card_id) REFERENCES credit_card(id) ON UPDATE CASCADE ON DELETE SET NULL
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_expense_user_date ON expense(user_id, date)",
        (),
    )?;

    Ok(())
}

const EXPENSE_COLUMNS: &str = "id, user_id, amount, date, description, category_id, is_recurring, \
    installments, credit_card_id, surcharge, created_at";

fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    Ok(Expense {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        amount: row.get(2)?,
        date: row.get(3)?,
        description: row.get(4)?,
        category_id: row.get(5)?,
        is_recurring: row.get(6)?,
        installments: row.get(7)?,
        credit_card_id: row.get(8)?,
        surcharge: row.get(9)?,
        created_at: row.get(10)?,
    })
}

pub fn create_expense(
    user_id: UserID,
    expense: NewExpense,
    connection: &Connection,
) -> Result<Expense, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO expense (user_id, amount, date, description, category_id, is_recurring,
            installments, credit_card_id, surcharge, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            user_id.as_i64(),
            expense.amount,
            expense.date,
            expense.description,
            expense.category_id,
            expense.is_recurring,
            expense.installments,
            expense.credit_card_id,
            expense.surcharge,
            created_at
        ],
    )?;

    Ok(Expense {
        id: connection.last_insert_rowid(),
        user_id,
        amount: expense.amount,
        date: expense.date,
        description: expense.description,
        category_id: expense.category_id,
        is_recurring: expense.is_recurring,
        installments: expense.installments,
        credit_card_id: expense.credit_card_id,
        surcharge: expense.surcharge,
        created_at,
    })
}

/// Get an expense owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the expense does not exist or belongs to another user.
pub fn get_expense(id: RecordId, user_id: UserID, connection: &Connection) -> Result<Expense, Error> {
    connection
        .query_row(
            &format!("SELECT {EXPENSE_COLUMNS} FROM expense WHERE id = ?1 AND user_id = ?2"),
            params![id, user_id.as_i64()],
            map_expense_row,
        )
        .map_err(Error::from)
}

/// The user's expenses ordered by date, optionally limited to those that occur in `month`.
///
/// An expense occurs in a month if it is dated in that month, or if it is
/// recurring and dated on or before the last day of that month.
pub fn get_expenses(
    user_id: UserID,
    month: Option<YearMonth>,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    match month {
        Some(month) => connection
            .prepare(&format!(
                "SELECT {EXPENSE_COLUMNS} FROM expense
                WHERE user_id = ?1
                    AND ((is_recurring = 0 AND date BETWEEN ?2 AND ?3)
                        OR (is_recurring = 1 AND date <= ?3))
                ORDER BY date, id"
            ))?
            .query_map(
                params![user_id.as_i64(), month.first_day(), month.last_day()],
                map_expense_row,
            )?
            .map(|maybe_expense| maybe_expense.map_err(Error::from))
            .collect(),
        None => connection
            .prepare(&format!(
                "SELECT {EXPENSE_COLUMNS} FROM expense WHERE user_id = ?1 ORDER BY date, id"
            ))?
            .query_map(params![user_id.as_i64()], map_expense_row)?
            .map(|maybe_expense| maybe_expense.map_err(Error::from))
            .collect(),
    }
}

/// The user's expenses charged to any credit card.
pub fn get_credit_card_expenses(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    connection
        .prepare(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expense
            WHERE user_id = ?1 AND credit_card_id IS NOT NULL
            ORDER BY date, id"
        ))?
        .query_map(params![user_id.as_i64()], map_expense_row)?
        .map(|maybe_expense| maybe_expense.map_err(Error::from))
        .collect()
}

/// Overwrite every field of an expense. The change log is left untouched.
///
/// # Errors
/// Returns [Error::NotFound] if the expense does not exist or belongs to another user.
pub fn update_expense(
    id: RecordId,
    user_id: UserID,
    expense: NewExpense,
    connection: &Connection,
) -> Result<Expense, Error> {
    let rows_affected = connection.execute(
        "UPDATE expense SET amount = ?1, date = ?2, description = ?3, category_id = ?4,
            is_recurring = ?5, installments = ?6, credit_card_id = ?7, surcharge = ?8
            WHERE id = ?9 AND user_id = ?10",
        params![
            expense.amount,
            expense.date,
            expense.description,
            expense.category_id,
            expense.is_recurring,
            expense.installments,
            expense.credit_card_id,
            expense.surcharge,
            id,
            user_id.as_i64()
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_expense(id, user_id, connection)
}

/// Delete an expense along with its change log.
pub fn delete_expense(id: RecordId, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM expense WHERE id = ?1 AND user_id = ?2",
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

    use super::{Expense, NewExpense, create_expense};

    /// A one-off cash expense with no category.
    pub fn new_expense(amount: f64, date: Date) -> NewExpense {
        NewExpense {
            amount,
            date,
            description: String::new(),
            category_id: None,
            is_recurring: false,
            installments: 1,
            credit_card_id: None,
            surcharge: 0.0,
        }
    }

    pub fn must_create_expense(
        user_id: UserID,
        expense: NewExpense,
        connection: &Connection,
    ) -> Expense {
        create_expense(user_id, expense, connection).expect("Could not create test expense")
    }
}


#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error, UserID, db::initialize, recurring::YearMonth, user::test_utils::must_create_user,
    };

    use super::{
        NewExpense, delete_expense, get_expense, get_expenses, test_utils::must_create_expense,
        test_utils::new_expense, update_expense,
    };

    fn get_test_connection() -> (Connection, UserID, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let alice = must_create_user("alice", &connection);
        let bob = must_create_user("bob", &connection);
        (connection, alice.id, bob.id)
    }

    #[test]
    fn get_round_trips_fields() {
        let (connection, alice, _) = get_test_connection();
        let expense = must_create_expense(alice, new_expense(12.5, date!(2024 - 09 - 15)), &connection);

        assert_eq!(get_expense(expense.id, alice, &connection), Ok(expense));
    }

    #[test]
    fn month_listing_includes_earlier_recurring_expenses() {
        let (connection, alice, _) = get_test_connection();
        let in_month = must_create_expense(alice, new_expense(100.0, date!(2024 - 09 - 15)), &connection);
        let recurring = must_create_expense(
            alice,
            NewExpense {
                is_recurring: true,
                ..new_expense(200.0, date!(2024 - 08 - 01))
            },
            &connection,
        );
        must_create_expense(alice, new_expense(300.0, date!(2024 - 08 - 20)), &connection);
        must_create_expense(
            alice,
            NewExpense {
                is_recurring: true,
                ..new_expense(400.0, date!(2024 - 10 - 01))
            },
            &connection,
        );

        let expenses =
            get_expenses(alice, Some(YearMonth::new(2024, 9).unwrap()), &connection).unwrap();

        assert_eq!(expenses, vec![recurring, in_month]);
    }

    #[test]
    fn listing_without_month_returns_everything_for_user() {
        let (connection, alice, bob) = get_test_connection();
        must_create_expense(alice, new_expense(100.0, date!(2024 - 09 - 15)), &connection);
        must_create_expense(alice, new_expense(100.0, date!(2023 - 01 - 15)), &connection);
        must_create_expense(bob, new_expense(100.0, date!(2024 - 09 - 15)), &connection);

        assert_eq!(get_expenses(alice, None, &connection).unwrap().len(), 2);
    }

    #[test]
    fn update_and_delete_require_owner() {
        let (connection, alice, bob) = get_test_connection();
        let expense = must_create_expense(alice, new_expense(100.0, date!(2024 - 09 - 15)), &connection);

        assert_eq!(
            update_expense(expense.id, bob, new_expense(1.0, date!(2024 - 09 - 15)), &connection),
            Err(Error::NotFound)
        );
        assert_eq!(delete_expense(expense.id, bob, &connection), Err(Error::NotFound));

        let updated =
            update_expense(expense.id, alice, new_expense(150.0, date!(2024 - 09 - 16)), &connection)
                .unwrap();
        assert_eq!(updated.amount, 150.0);
        assert_eq!(updated.created_at, expense.created_at);
        assert_eq!(delete_expense(expense.id, alice, &connection), Ok(()));
    }
}
