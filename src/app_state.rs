//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use time::Duration;

use crate::{Error, PasswordHash, auth::DEFAULT_TOKEN_DURATION, db::initialize, timezone};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The duration for which authentication tokens are valid.
    pub token_duration: Duration,

    /// The bcrypt cost used when hashing new passwords.
    pub password_hash_cost: u32,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized or if `local_timezone` is not a
    /// known timezone.
    pub fn new(db_connection: Connection, local_timezone: &str) -> Result<Self, Error> {
        if timezone::get_local_offset(local_timezone).is_none() {
            return Err(Error::InvalidTimezoneError(local_timezone.to_owned()));
        }

        initialize(&db_connection)?;

        Ok(Self {
            token_duration: DEFAULT_TOKEN_DURATION,
            password_hash_cost: PasswordHash::DEFAULT_COST,
            local_timezone: local_timezone.to_owned(),
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }

    /// Set how long newly issued authentication tokens stay valid.
    pub fn with_token_duration(mut self, token_duration: Duration) -> Self {
        self.token_duration = token_duration;
        self
    }

    /// Set the bcrypt cost for new password hashes.
    ///
    /// Tests use the minimum cost to keep them fast.
    pub fn with_password_hash_cost(mut self, cost: u32) -> Self {
        self.password_hash_cost = cost;
        self
    }
}
