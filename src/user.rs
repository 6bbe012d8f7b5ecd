//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, PasswordHash};

/// The longest username that may be registered, in characters.
pub const MAX_USERNAME_LENGTH: usize = 150;

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The name the user logs in with.
    pub username: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// Inactive users cannot log in.
    pub is_active: bool,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                date_joined TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(2)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        username: row.get(1)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        is_active: row.get(3)?,
    })
}

/// Create and insert a new active user into the database.
///
/// # Errors
///
/// Returns [Error::DuplicateUsername] if `username` is taken, or [Error::SqlError] if another
/// SQL related error occurred.
pub fn create_user(
    username: &str,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (username, password, is_active, date_joined) VALUES (?1, ?2, 1, ?3)",
        params![username, password_hash.as_str(), OffsetDateTime::now_utc()],
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        username: username.to_owned(),
        password_hash,
        is_active: true,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
#[cfg(test)]
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .query_row(
            "SELECT id, username, password, is_active FROM user WHERE id = ?1",
            params![user_id.as_i64()],
            map_user_row,
        )
        .map_err(|error| error.into())
}

/// Get the user registered with `username`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has that username.
pub fn get_user_by_username(username: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .query_row(
            "SELECT id, username, password, is_active FROM user WHERE username = ?1",
            params![username],
            map_user_row,
        )
        .map_err(|error| error.into())
}

/// Replace the password hash of `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist.
pub fn update_password(
    user_id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1 WHERE id = ?2",
        params![password_hash.as_str(), user_id.as_i64()],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    let count: i64 = connection.query_row("SELECT COUNT(id) FROM user;", [], |row| row.get(0))?;

    usize::try_from(count)
        .map_err(|_| Error::SqlError(rusqlite::Error::IntegralValueOutOfRange(0, count)))
}


#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{
        PasswordHash,
        user::{
            UserID, count_users, create_user, get_user_by_id, get_user_by_username,
            test_utils::must_deactivate_user, update_password,
        },
    };

    use super::{Error, create_user_table};

    fn get_db_connection() -> Connection {
        let conn =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        create_user_table(&conn).expect("Could not create user table");

        conn
    }

    #[test]
    fn insert_user_succeeds() {
        let db_connection = get_db_connection();
        let password_hash = PasswordHash::new_unchecked("hunter2");

        let inserted_user = create_user("alice", password_hash.clone(), &db_connection).unwrap();

        assert!(inserted_user.id.as_i64() > 0);
        assert_eq!(inserted_user.username, "alice");
        assert_eq!(inserted_user.password_hash, password_hash);
        assert!(inserted_user.is_active);
    }

    #[test]
    fn insert_duplicate_username_fails() {
        let db_connection = get_db_connection();
        create_user("alice", PasswordHash::new_unchecked("hunter2"), &db_connection).unwrap();

        let result = create_user("alice", PasswordHash::new_unchecked("hunter3"), &db_connection);

        assert_eq!(result, Err(Error::DuplicateUsername));
    }

    #[test]
    fn get_user_fails_with_non_existent_id() {
        let db_connection = get_db_connection();

        assert_eq!(
            get_user_by_id(UserID::new(42), &db_connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn get_user_by_id_and_username_agree() {
        let db_connection = get_db_connection();
        let test_user =
            create_user("alice", PasswordHash::new_unchecked("hunter2"), &db_connection).unwrap();

        let by_id = get_user_by_id(test_user.id, &db_connection).unwrap();
        let by_name = get_user_by_username("alice", &db_connection).unwrap();

        assert_eq!(by_id, test_user);
        assert_eq!(by_name, test_user);
    }

    #[test]
    fn get_user_by_unknown_username_fails() {
        let db_connection = get_db_connection();

        assert_eq!(
            get_user_by_username("nobody", &db_connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn update_password_replaces_hash() {
        let db_connection = get_db_connection();
        let user =
            create_user("alice", PasswordHash::new_unchecked("hunter2"), &db_connection).unwrap();
        let new_hash = PasswordHash::new_unchecked("hunter3");

        update_password(user.id, &new_hash, &db_connection).unwrap();

        let user = get_user_by_id(user.id, &db_connection).unwrap();
        assert_eq!(user.password_hash, new_hash);
    }

    #[test]
    fn deactivated_user_is_inactive() {
        let db_connection = get_db_connection();
        let user =
            create_user("alice", PasswordHash::new_unchecked("hunter2"), &db_connection).unwrap();

        must_deactivate_user(user.id, &db_connection);

        assert!(!get_user_by_id(user.id, &db_connection).unwrap().is_active);
    }

    #[test]
    fn returns_correct_count() {
        let db_connection = get_db_connection();

        let count = count_users(&db_connection).expect("Could not get user count");
        assert_eq!(0, count, "Want zero users before insertion, got {count}");

        create_user("alice", PasswordHash::new_unchecked("hunter2"), &db_connection).unwrap();

        let count = count_users(&db_connection).expect("Could not get user count");
        assert_eq!(1, count, "Want one user after insertion, got {count}");
    }
}
