//! Handles log-out requests.

use axum::{Extension, extract::State, http::StatusCode};

use crate::{
    Error,
    auth::{middleware::AuthState, token::{Token, revoke_token}},
    db::lock_connection,
};

/// Revoke the token the request was authenticated with.
///
/// This route sits behind [auth_guard](crate::auth::auth_guard), which supplies the token.
pub async fn post_log_out(
    State(state): State<AuthState>,
    Extension(token): Extension<Token>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;
    revoke_token(&token, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
