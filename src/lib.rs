//! Budget Tracker is a JSON REST API for tracking personal finances.
//!
//! Users sign up, log in and then manage their own expenses, incomes, credit
//! cards and categories. Recurring expenses and incomes keep a change log of
//! amount changes, and every listing resolves the amount that applies to the
//! requested month (see [recurring::resolve_amount]).

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::{Map, Value};
use tokio::signal;

mod app_state;
mod auth;
mod category;
mod credit_card;
mod database_id;
mod date_format;
mod db;
mod endpoints;
mod expense;
mod income;
mod logging;
mod money;
mod password;
pub mod recurring;
mod routing;
mod summary;
mod timezone;
mod user;
mod validation;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use user::{User, UserID, count_users, create_user, get_user_by_username, update_password};
pub use validation::FieldErrors;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The username and password did not match an active user.
    #[error("Invalid Credentials")]
    InvalidCredentials,

    /// The request did not include an `Authorization` header with a token.
    #[error("Authentication credentials were not provided.")]
    NotAuthenticated,

    /// The token in the `Authorization` header is unknown or has expired.
    #[error("Invalid token.")]
    InvalidToken,

    /// A log-in request was made with a valid token.
    #[error("You are already logged in")]
    AlreadyLoggedIn,

    /// A sign-up request was made with a valid token.
    #[error("You are already authenticated")]
    AlreadyAuthenticated,

    /// The user provided a password that is too easy to guess.
    #[error("Password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The username is already taken by another user.
    #[error("This username is already in use.")]
    DuplicateUsername,

    /// One or more fields in the request body failed validation.
    #[error("invalid fields: {0}")]
    InvalidFields(FieldErrors),

    /// The `year` and `month` query parameters were incomplete or not a valid month.
    #[error("Invalid year or month format.")]
    InvalidMonth,

    /// An amount change was submitted without an effective date.
    #[error("Effective date is required.")]
    MissingEffectiveDate,

    /// A date was not formatted as an ISO 8601 calendar date.
    #[error("Invalid date format. Use YYYY-MM-DD.")]
    InvalidDateFormat,

    /// An amount change was submitted without the new amount.
    #[error("New amount is required.")]
    MissingNewAmount,

    /// An amount was not a number or was negative.
    #[error("{0}")]
    InvalidAmount(String),

    /// The request body was not JSON or did not have the expected shape.
    #[error("{0}")]
    InvalidJson(String),

    /// The requested resource was not found.
    ///
    /// Resources owned by another user are reported as not found as well so
    /// that clients cannot probe for other users' IDs.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with("user.username") =>
            {
                Error::DuplicateUsername
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidJson(rejection.body_text())
    }
}

impl From<FieldErrors> for Error {
    fn from(errors: FieldErrors) -> Self {
        Error::InvalidFields(errors)
    }
}

/// A JSON request body.
///
/// Works like [axum::Json], but a body that cannot be parsed is rejected with
/// `400 {"error": "<reason>"}` instead of a plain text response.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub(crate) struct JsonBody<T>(pub T);

/// Build a JSON response of the form `{"<key>": "<message>"}`.
pub(crate) fn json_message(status: StatusCode, key: &str, message: impl Into<String>) -> Response {
    let mut body = Map::new();
    body.insert(key.to_owned(), Value::String(message.into()));

    (status, Json(Value::Object(body))).into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::InvalidCredentials | Error::NotAuthenticated | Error::InvalidToken => {
                json_message(StatusCode::UNAUTHORIZED, "error", self.to_string())
            }
            Error::AlreadyLoggedIn | Error::AlreadyAuthenticated => {
                json_message(StatusCode::BAD_REQUEST, "message", self.to_string())
            }
            Error::TooWeak(_) => json_message(StatusCode::BAD_REQUEST, "password", self.to_string()),
            Error::DuplicateUsername => {
                json_message(StatusCode::CONFLICT, "username", self.to_string())
            }
            Error::InvalidFields(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            Error::InvalidMonth
            | Error::MissingEffectiveDate
            | Error::InvalidDateFormat
            | Error::MissingNewAmount
            | Error::InvalidAmount(_)
            | Error::InvalidJson(_) => {
                json_message(StatusCode::BAD_REQUEST, "error", self.to_string())
            }
            Error::NotFound => json_message(StatusCode::NOT_FOUND, "error", "Not found."),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                json_message(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "error",
                    "An unexpected error occurred, check the server logs for more details.",
                )
            }
        }
    }
}
