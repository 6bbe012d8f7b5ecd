//! Handles sign-up requests.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::{
    Error, JsonBody, PasswordHash, ValidatedPassword,
    auth::{
        log_in::{CredentialsData, TokenResponse},
        middleware::{AuthState, authenticated_user},
        token::issue_token,
    },
    create_user,
    db::lock_connection,
    user::MAX_USERNAME_LENGTH,
    validation::FieldErrors,
};

/// Handler for sign-up requests.
///
/// Creates the user, issues a token and returns it with a 201 status.
pub async fn post_sign_up(
    State(state): State<AuthState>,
    headers: HeaderMap,
    JsonBody(data): JsonBody<CredentialsData>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;

    if authenticated_user(&headers, &connection)?.is_some() {
        return Err(Error::AlreadyAuthenticated);
    }

    let (username, password) = data.require_fields()?;

    let mut errors = FieldErrors::default();
    let Some(username) = errors.text("username", Some(username), MAX_USERNAME_LENGTH) else {
        return Err(errors.into());
    };

    let password = ValidatedPassword::new(password, &[username.as_str()])?;
    let password_hash = PasswordHash::new(password, state.password_hash_cost)?;
    let user = create_user(&username, password_hash, &connection)?;
    tracing::info!("Registered user {} with ID {}", user.username, user.id);

    let token = issue_token(user.id, state.token_duration, &connection)?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            token: token.as_str().to_owned(),
            user_id: user.id,
            username: user.username,
        }),
    )
        .into_response())
}
