//! Opaque bearer tokens for authenticating API requests.
//!
//! A token is 20 random bytes, hex encoded, and is given to the client once at
//! sign-up or log-in. Only its SHA-512 digest is stored in the database.

use std::fmt::Write as _;

use axum::http::{HeaderMap, header::AUTHORIZATION};
use rand::Rng;
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha512};
use time::{Duration, OffsetDateTime};

use crate::{Error, UserID};

/// How long a newly issued token is valid for.
pub const DEFAULT_TOKEN_DURATION: Duration = Duration::days(7);

/// The scheme prefix of the `Authorization` header, e.g. `Authorization: Token 9944b0...`.
pub const TOKEN_SCHEME: &str = "Token";

const TOKEN_BYTES: usize = 20;

/// A raw authentication token as sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Generate a new random token.
    pub fn generate() -> Self {
        let bytes: [u8; TOKEN_BYTES] = rand::thread_rng().r#gen();

        Self(to_hex(&bytes))
    }

    /// Read the token from an `Authorization: Token <key>` header.
    ///
    /// Returns `None` if the header is missing or uses another scheme.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, key) = value.trim().split_once(' ')?;
        let key = key.trim();

        if !scheme.eq_ignore_ascii_case(TOKEN_SCHEME) || key.is_empty() {
            return None;
        }

        Some(Self(key.to_owned()))
    }

    /// The key to hand to the client.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The hex encoded SHA-512 digest under which the token is stored.
    fn digest(&self) -> String {
        to_hex(&Sha512::digest(self.0.as_bytes()))
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut hex, byte| {
            let _ = write!(hex, "{byte:02x}");
            hex
        })
}

/// Create the table for storing token digests.
pub fn create_token_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS auth_token (
            digest TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Issue a new token for `user_id` that expires after `duration`.
pub fn issue_token(
    user_id: UserID,
    duration: Duration,
    connection: &Connection,
) -> Result<Token, Error> {
    let token = Token::generate();
    let now = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO auth_token (digest, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![token.digest(), user_id.as_i64(), now, now + duration],
    )?;

    Ok(token)
}

/// Find the user that owns `token`.
///
/// # Errors
/// Returns [Error::InvalidToken] if the token is unknown, expired at `now` or
/// belongs to an inactive user.
pub fn get_token_owner(
    token: &Token,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<UserID, Error> {
    let row: Option<(i64, OffsetDateTime, bool)> = connection
        .query_row(
            "SELECT auth_token.user_id, auth_token.expires_at, user.is_active
            FROM auth_token
            INNER JOIN user ON user.id = auth_token.user_id
            WHERE auth_token.digest = ?1",
            params![token.digest()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    match row {
        Some((user_id, expires_at, true)) if now < expires_at => Ok(UserID::new(user_id)),
        _ => Err(Error::InvalidToken),
    }
}

/// Revoke `token` so that it can no longer be used.
pub fn revoke_token(token: &Token, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM auth_token WHERE digest = ?1",
        params![token.digest()],
    )?;

    Ok(())
}

/// Delete the tokens of `user_id` that have expired by `now`.
pub fn delete_expired_tokens(
    user_id: UserID,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<usize, Error> {
    let mut statement =
        connection.prepare("SELECT digest, expires_at FROM auth_token WHERE user_id = ?1")?;
    let expired: Vec<String> = statement
        .query_map(params![user_id.as_i64()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, OffsetDateTime>(1)?))
        })?
        .filter_map(|row| match row {
            Ok((digest, expires_at)) if expires_at <= now => Some(Ok(digest)),
            Ok(_) => None,
            Err(error) => Some(Err(error)),
        })
        .collect::<Result<_, _>>()?;

    for digest in &expired {
        connection.execute("DELETE FROM auth_token WHERE digest = ?1", params![digest])?;
    }

    Ok(expired.len())
}


#[cfg(test)]
mod token_storage_tests {
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error,
        db::initialize,
        user::test_utils::{must_create_user, must_deactivate_user},
    };

    use super::{Token, delete_expired_tokens, get_token_owner, issue_token, revoke_token};

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn issued_token_identifies_user() {
        let connection = get_test_connection();
        let user = must_create_user("alice", &connection);

        let token = issue_token(user.id, Duration::days(1), &connection).unwrap();

        assert_eq!(
            get_token_owner(&token, OffsetDateTime::now_utc(), &connection),
            Ok(user.id)
        );
    }

    #[test]
    fn unknown_token_is_invalid() {
        let connection = get_test_connection();

        assert_eq!(
            get_token_owner(&Token::generate(), OffsetDateTime::now_utc(), &connection),
            Err(Error::InvalidToken)
        );
    }

    #[test]
    fn expired_token_is_invalid() {
        let connection = get_test_connection();
        let user = must_create_user("alice", &connection);
        let token = issue_token(user.id, Duration::hours(1), &connection).unwrap();

        let later = OffsetDateTime::now_utc() + Duration::hours(2);

        assert_eq!(
            get_token_owner(&token, later, &connection),
            Err(Error::InvalidToken)
        );
    }

    #[test]
    fn revoked_token_is_invalid() {
        let connection = get_test_connection();
        let user = must_create_user("alice", &connection);
        let token = issue_token(user.id, Duration::days(1), &connection).unwrap();

        revoke_token(&token, &connection).unwrap();

        assert_eq!(
            get_token_owner(&token, OffsetDateTime::now_utc(), &connection),
            Err(Error::InvalidToken)
        );
    }

    #[test]
    fn token_of_inactive_user_is_invalid() {
        let connection = get_test_connection();
        let user = must_create_user("alice", &connection);
        let token = issue_token(user.id, Duration::days(1), &connection).unwrap();

        must_deactivate_user(user.id, &connection);

        assert_eq!(
            get_token_owner(&token, OffsetDateTime::now_utc(), &connection),
            Err(Error::InvalidToken)
        );
    }

    #[test]
    fn only_expired_tokens_are_deleted() {
        let connection = get_test_connection();
        let user = must_create_user("alice", &connection);
        let short_lived = issue_token(user.id, Duration::hours(1), &connection).unwrap();
        let long_lived = issue_token(user.id, Duration::days(7), &connection).unwrap();
        let later = OffsetDateTime::now_utc() + Duration::days(1);

        let deleted = delete_expired_tokens(user.id, later, &connection).unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(
            get_token_owner(&short_lived, OffsetDateTime::now_utc(), &connection),
            Err(Error::InvalidToken)
        );
        assert_eq!(
            get_token_owner(&long_lived, OffsetDateTime::now_utc(), &connection),
            Ok(user.id)
        );
    }
}
