//! Database schema creation and access to the shared connection.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error,
    auth::create_token_table,
    category::create_category_table,
    credit_card::create_credit_card_table,
    expense::create_expense_table,
    income::create_income_table,
    recurring::{RecordKind, create_change_log_table},
    user::create_user_table,
};

/// Enable foreign key enforcement and create the tables for all of the domain models.
///
/// Tables that already exist are left untouched, so this is safe to call on every start up.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Must be set outside of a transaction.
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_token_table(&transaction)?;
    create_category_table(&transaction)?;
    create_credit_card_table(&transaction)?;
    create_expense_table(&transaction)?;
    create_change_log_table(RecordKind::Expense, &transaction)?;
    create_income_table(&transaction)?;
    create_change_log_table(RecordKind::Income, &transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Lock the shared database connection.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if the mutex was poisoned.
pub fn lock_connection(
    db_connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}
