//! Authentication middleware that validates bearer tokens.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use crate::{
    AppState, Error, UserID,
    auth::token::{Token, get_token_owner},
    db::lock_connection,
};

/// The state needed for authentication.
#[derive(Debug, Clone)]
pub struct AuthState {
    /// The database connection for looking up users and tokens.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The duration for which newly issued tokens are valid.
    pub token_duration: Duration,
    /// The bcrypt cost used when hashing new passwords.
    pub password_hash_cost: u32,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            token_duration: state.token_duration,
            password_hash_cost: state.password_hash_cost,
        }
    }
}

/// Middleware function that checks for a valid `Authorization: Token <key>` header.
///
/// The user ID and the token are placed into the request extensions and the request is executed
/// normally if the token is valid, otherwise a 401 response is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>`
/// to receive the user ID.
pub async fn auth_guard(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = Token::from_headers(request.headers()) else {
        return Error::NotAuthenticated.into_response();
    };

    let user_id = {
        let connection = match lock_connection(&state.db_connection) {
            Ok(connection) => connection,
            Err(error) => return error.into_response(),
        };

        match get_token_owner(&token, OffsetDateTime::now_utc(), &connection) {
            Ok(user_id) => user_id,
            Err(error) => return error.into_response(),
        }
    };

    request.extensions_mut().insert(user_id);
    request.extensions_mut().insert(token);

    next.run(request).await
}

/// The user identified by the request's token, if it carries a valid one.
///
/// Used by the sign-up and log-in handlers, which are reachable without a token but must
/// refuse clients that already have one.
pub(crate) fn authenticated_user(
    headers: &HeaderMap,
    connection: &Connection,
) -> Result<Option<UserID>, Error> {
    let Some(token) = Token::from_headers(headers) else {
        return Ok(None);
    };

    match get_token_owner(&token, OffsetDateTime::now_utc(), connection) {
        Ok(user_id) => Ok(Some(user_id)),
        Err(Error::InvalidToken) => Ok(None),
        Err(error) => Err(error),
    }
}
