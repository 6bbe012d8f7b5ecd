//! Storage for the change logs of recurring expenses and incomes.

use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{
    Error, UserID,
    database_id::{ChangeLogId, RecordId},
    recurring::{AmountChange, YearMonth},
};

/// The kinds of record that can have a change log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Rows of the `expense` table.
    Expense,
    /// Rows of the `income` table.
    Income,
}

impl RecordKind {
    /// The table holding the records.
    pub fn record_table(self) -> &'static str {
        match self {
            RecordKind::Expense => "expense",
            RecordKind::Income => "income",
        }
    }

    /// The table holding the change logs for the records.
    pub fn change_log_table(self) -> &'static str {
        match self {
            RecordKind::Expense => "expense_change_log",
            RecordKind::Income => "income_change_log",
        }
    }

    /// The column in the change log table referencing the record.
    fn foreign_key(self) -> &'static str {
        match self {
            RecordKind::Expense => "expense_id",
            RecordKind::Income => "income_id",
        }
    }
}

/// Create the change log table for `kind`.
///
/// The record table must already exist.
pub fn create_change_log_table(kind: RecordKind, connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {log} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                {fk} INTEGER NOT NULL,
                new_amount REAL NOT NULL,
                effective_date TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY({fk}) REFERENCES {record}(id) ON UPDATE CASCADE ON DELETE CASCADE
            )",
            log = kind.change_log_table(),
            fk = kind.foreign_key(),
            record = kind.record_table(),
        ),
        (),
    )?;

    connection.execute(
        &format!(
            "CREATE INDEX IF NOT EXISTS idx_{log}_{fk} ON {log}({fk}, effective_date)",
            log = kind.change_log_table(),
            fk = kind.foreign_key(),
        ),
        (),
    )?;

    Ok(())
}

fn map_change_log_row(row: &Row) -> Result<AmountChange, rusqlite::Error> {
    Ok(AmountChange {
        id: row.get(0)?,
        new_amount: row.get(1)?,
        effective_date: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Check that the record `record_id` of `kind` exists and is owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the record does not exist or belongs to another user.
pub fn check_record_owner(
    kind: RecordKind,
    record_id: RecordId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    connection
        .query_row(
            &format!(
                "SELECT id FROM {} WHERE id = ?1 AND user_id = ?2",
                kind.record_table()
            ),
            params![record_id, user_id.as_i64()],
            |row| row.get::<_, RecordId>(0),
        )
        .map(|_| ())
        .map_err(Error::from)
}

/// Add a change log entry to a record.
pub fn create_change_log(
    kind: RecordKind,
    record_id: RecordId,
    new_amount: f64,
    effective_date: Date,
    connection: &Connection,
) -> Result<AmountChange, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        &format!(
            "INSERT INTO {} ({}, new_amount, effective_date, created_at) VALUES (?1, ?2, ?3, ?4)",
            kind.change_log_table(),
            kind.foreign_key()
        ),
        params![record_id, new_amount, effective_date, created_at],
    )?;

    Ok(AmountChange {
        id: connection.last_insert_rowid(),
        new_amount,
        effective_date: Some(effective_date),
        created_at,
    })
}

/// Overwrite the amount and effective date of a change log entry.
///
/// # Errors
/// Returns [Error::NotFound] if no entry with `id` exists.
pub fn update_change_log(
    kind: RecordKind,
    id: ChangeLogId,
    new_amount: f64,
    effective_date: Date,
    connection: &Connection,
) -> Result<AmountChange, Error> {
    connection
        .query_row(
            &format!(
                "UPDATE {} SET new_amount = ?1, effective_date = ?2 WHERE id = ?3
                RETURNING id, new_amount, effective_date, created_at",
                kind.change_log_table()
            ),
            params![new_amount, effective_date, id],
            map_change_log_row,
        )
        .map_err(Error::from)
}

/// Find the entry of a record that takes effect exactly on `effective_date`.
///
/// If several entries share the date, the most recently created one is returned.
pub fn get_change_log_on_date(
    kind: RecordKind,
    record_id: RecordId,
    effective_date: Date,
    connection: &Connection,
) -> Result<Option<AmountChange>, Error> {
    connection
        .query_row(
            &format!(
                "SELECT id, new_amount, effective_date, created_at FROM {} \
                WHERE {} = ?1 AND effective_date = ?2 \
                ORDER BY created_at DESC, id DESC LIMIT 1",
                kind.change_log_table(),
                kind.foreign_key()
            ),
            params![record_id, effective_date],
            map_change_log_row,
        )
        .optional()
        .map_err(Error::from)
}

/// Find the entry of a record that takes effect during `month`.
///
/// If several entries fall in the month, the one that wins during that month is returned.
pub fn get_change_log_in_month(
    kind: RecordKind,
    record_id: RecordId,
    month: YearMonth,
    connection: &Connection,
) -> Result<Option<AmountChange>, Error> {
    connection
        .query_row(
            &format!(
                "SELECT id, new_amount, effective_date, created_at FROM {} \
                WHERE {} = ?1 AND effective_date BETWEEN ?2 AND ?3 \
                ORDER BY effective_date DESC, created_at DESC, id DESC LIMIT 1",
                kind.change_log_table(),
                kind.foreign_key()
            ),
            params![record_id, month.first_day(), month.last_day()],
            map_change_log_row,
        )
        .optional()
        .map_err(Error::from)
}

/// Delete the entry `id` from the change log of `record_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the entry does not exist or belongs to another record.
pub fn delete_change_log(
    kind: RecordKind,
    record_id: RecordId,
    id: ChangeLogId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        &format!(
            "DELETE FROM {} WHERE id = ?1 AND {} = ?2",
            kind.change_log_table(),
            kind.foreign_key()
        ),
        params![id, record_id],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// The change log of a single record, ordered by effective date.
#[cfg(test)]
pub fn get_change_logs(
    kind: RecordKind,
    record_id: RecordId,
    connection: &Connection,
) -> Result<Vec<AmountChange>, Error> {
    connection
        .prepare(&format!(
            "SELECT id, new_amount, effective_date, created_at FROM {} \
            WHERE {} = ?1 ORDER BY effective_date, created_at, id",
            kind.change_log_table(),
            kind.foreign_key()
        ))?
        .query_map(params![record_id], map_change_log_row)?
        .map(|maybe_change| maybe_change.map_err(Error::from))
        .collect()
}

/// The change logs of every record of `kind` owned by `user_id`, keyed by record ID.
pub fn get_change_logs_for_user(
    kind: RecordKind,
    user_id: UserID,
    connection: &Connection,
) -> Result<HashMap<RecordId, Vec<AmountChange>>, Error> {
    let mut statement = connection.prepare(&format!(
        "SELECT log.id, log.new_amount, log.effective_date, log.created_at, log.{fk} \
        FROM {log} log INNER JOIN {record} record ON record.id = log.{fk} \
        WHERE record.user_id = ?1 \
        ORDER BY log.effective_date, log.created_at, log.id",
        log = kind.change_log_table(),
        record = kind.record_table(),
        fk = kind.foreign_key(),
    ))?;

    let rows = statement.query_map(params![user_id.as_i64()], |row| {
        Ok((row.get::<_, RecordId>(4)?, map_change_log_row(row)?))
    })?;

    let mut change_logs: HashMap<RecordId, Vec<AmountChange>> = HashMap::new();
    for row in rows {
        let (record_id, change) = row?;
        change_logs.entry(record_id).or_default().push(change);
    }

    Ok(change_logs)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error, UserID,
        db::initialize,
        recurring::{RecordKind, YearMonth},
    };

    use super::{
        check_record_owner, create_change_log, delete_change_log, get_change_log_in_month,
        get_change_log_on_date, get_change_logs, get_change_logs_for_user, update_change_log,
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
            .execute_batch(
                "INSERT INTO user (id, username, password, is_active, date_joined)
                    VALUES (1, 'alice', 'hash', 1, '2024-01-01 00:00:00Z'),
                           (2, 'bob', 'hash', 1, '2024-01-01 00:00:00Z');
                INSERT INTO expense (id, user_id, amount, date, description, is_recurring, installments, surcharge, created_at)
                    VALUES (1, 1, 100.0, '2024-01-01', 'Rent', 1, 1, 0, '2024-01-01 00:00:00Z'),
                           (2, 2, 50.0, '2024-01-01', 'Gym', 1, 1, 0, '2024-01-01 00:00:00Z');",
            )
            .unwrap();
        connection
    }

    #[test]
    fn record_owner_is_checked() {
        let connection = get_test_connection();

        assert_eq!(
            check_record_owner(RecordKind::Expense, 1, UserID::new(1), &connection),
            Ok(())
        );
        assert_eq!(
            check_record_owner(RecordKind::Expense, 2, UserID::new(1), &connection),
            Err(Error::NotFound)
        );
        assert_eq!(
            check_record_owner(RecordKind::Expense, 999, UserID::new(1), &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn create_then_find_by_date_and_month() {
        let connection = get_test_connection();
        let created =
            create_change_log(RecordKind::Expense, 1, 150.0, date!(2024 - 09 - 15), &connection)
                .unwrap();

        let on_date =
            get_change_log_on_date(RecordKind::Expense, 1, date!(2024 - 09 - 15), &connection)
                .unwrap();
        let in_month = get_change_log_in_month(
            RecordKind::Expense,
            1,
            YearMonth::new(2024, 9).unwrap(),
            &connection,
        )
        .unwrap();
        let other_month = get_change_log_in_month(
            RecordKind::Expense,
            1,
            YearMonth::new(2024, 10).unwrap(),
            &connection,
        )
        .unwrap();

        assert_eq!(on_date.as_ref(), Some(&created));
        assert_eq!(in_month, Some(created));
        assert_eq!(other_month, None);
    }

    #[test]
    fn update_replaces_amount_and_date() {
        let connection = get_test_connection();
        let created =
            create_change_log(RecordKind::Expense, 1, 150.0, date!(2024 - 09 - 01), &connection)
                .unwrap();

        let updated = update_change_log(
            RecordKind::Expense,
            created.id,
            175.0,
            date!(2024 - 09 - 10),
            &connection,
        )
        .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.new_amount, 175.0);
        assert_eq!(updated.effective_date, Some(date!(2024 - 09 - 10)));
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn update_missing_entry_is_not_found() {
        let connection = get_test_connection();

        let result = update_change_log(RecordKind::Expense, 42, 1.0, date!(2024 - 09 - 10), &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn delete_requires_matching_record() {
        let connection = get_test_connection();
        let created =
            create_change_log(RecordKind::Expense, 1, 150.0, date!(2024 - 09 - 01), &connection)
                .unwrap();

        assert_eq!(
            delete_change_log(RecordKind::Expense, 2, created.id, &connection),
            Err(Error::NotFound)
        );
        assert_eq!(
            delete_change_log(RecordKind::Expense, 1, created.id, &connection),
            Ok(())
        );
        assert_eq!(get_change_logs(RecordKind::Expense, 1, &connection), Ok(vec![]));
    }

    #[test]
    fn logs_are_grouped_by_record_for_owner_only() {
        let connection = get_test_connection();
        let first =
            create_change_log(RecordKind::Expense, 1, 150.0, date!(2024 - 09 - 01), &connection)
                .unwrap();
        let second =
            create_change_log(RecordKind::Expense, 1, 120.0, date!(2024 - 03 - 01), &connection)
                .unwrap();
        create_change_log(RecordKind::Expense, 2, 60.0, date!(2024 - 09 - 01), &connection)
            .unwrap();

        let logs = get_change_logs_for_user(RecordKind::Expense, UserID::new(1), &connection)
            .unwrap();

        assert_eq!(logs.len(), 1);
        assert_eq!(logs[&1], vec![second, first]);
    }

    #[test]
    fn deleting_record_deletes_its_logs() {
        let connection = get_test_connection();
        create_change_log(RecordKind::Expense, 1, 150.0, date!(2024 - 09 - 01), &connection)
            .unwrap();

        connection
            .execute("DELETE FROM expense WHERE id = 1", ())
            .unwrap();

        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM expense_change_log", (), |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
