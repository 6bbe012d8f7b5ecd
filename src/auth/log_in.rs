//! Handles log-in requests.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error, JsonBody, UserID,
    auth::{
        middleware::{AuthState, authenticated_user},
        token::{delete_expired_tokens, issue_token},
    },
    db::lock_connection,
    get_user_by_username,
    validation::FieldErrors,
};

/// The username and password submitted to log in or sign up.
///
/// Both fields are optional so that missing fields can be reported per field.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CredentialsData {
    /// The name the user registered with.
    pub username: Option<String>,
    /// The user's password in plain text.
    pub password: Option<String>,
}

impl CredentialsData {
    /// Check that both fields were provided.
    pub(crate) fn require_fields(&self) -> Result<(&str, &str), Error> {
        let mut errors = FieldErrors::default();
        let username = errors.required("username", self.username.as_deref());
        let password = errors.required("password", self.password.as_deref());

        match (username, password) {
            (Some(username), Some(password)) if errors.is_empty() => Ok((username, password)),
            _ => Err(errors.into()),
        }
    }
}

/// The response body for a successful log-in or sign-up.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// The key to send in the `Authorization` header of later requests.
    pub token: String,
    /// The ID of the authenticated user.
    pub user_id: UserID,
    /// The username of the authenticated user.
    pub username: String,
}

/// Handler for log-in requests.
///
/// On success a new token is issued and returned with a 200 status. Unknown
/// usernames, wrong passwords and inactive users all produce the same 401
/// response.
pub async fn post_log_in(
    State(state): State<AuthState>,
    headers: HeaderMap,
    JsonBody(data): JsonBody<CredentialsData>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;

    if authenticated_user(&headers, &connection)?.is_some() {
        return Err(Error::AlreadyLoggedIn);
    }

    let (username, password) = data.require_fields()?;

    let user = match get_user_by_username(username, &connection) {
        Ok(user) => user,
        Err(Error::NotFound) => return Err(Error::InvalidCredentials),
        Err(error) => return Err(error),
    };

    if !user.is_active || !user.password_hash.verify(password)? {
        tracing::info!("Rejected log-in attempt for {}", user.id);
        return Err(Error::InvalidCredentials);
    }

    let now = OffsetDateTime::now_utc();
    let purged = delete_expired_tokens(user.id, now, &connection)?;
    if purged > 0 {
        tracing::debug!("Deleted {purged} expired tokens for user {}", user.id);
    }

    let token = issue_token(user.id, state.token_duration, &connection)?;

    Ok((
        StatusCode::OK,
        Json(TokenResponse {
            token: token.as_str().to_owned(),
            user_id: user.id,
            username: user.username,
        }),
    )
        .into_response())
}

#[cfg(test)]
mod log_in_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, http::StatusCode, http::header::AUTHORIZATION, routing::post};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};
    use time::Duration;

    use crate::{
        PasswordHash, create_user,
        auth::middleware::AuthState,
        db::initialize,
        user::test_utils::must_deactivate_user,
    };

    use super::post_log_in;

    const PASSWORD: &str = "averystrongandsecurepassword";

    fn get_test_server() -> (TestServer, Arc<Mutex<Connection>>) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        create_user(
            "testuser",
            PasswordHash::from_raw_password(PASSWORD, 4).unwrap(),
            &connection,
        )
        .unwrap();

        let db_connection = Arc::new(Mutex::new(connection));
        let state = AuthState {
            db_connection: db_connection.clone(),
            token_duration: Duration::days(7),
            password_hash_cost: 4,
        };
        let app = Router::new()
            .route("/api/login", post(post_log_in))
            .with_state(state);

        (
            TestServer::new(app),
            db_connection,
        )
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let (server, _) = get_test_server();

        let response = server
            .post("/api/login")
            .json(&json!({"username": "testuser", "password": PASSWORD}))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["username"], "testuser");
        assert_eq!(body["user_id"], 1);
        assert_eq!(body["token"].as_str().unwrap().len(), 40);
    }

    #[tokio::test]
    async fn log_in_fails_with_wrong_password() {
        let (server, _) = get_test_server();

        let response = server
            .post("/api/login")
            .json(&json!({"username": "testuser", "password": "wrongpassword"}))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        response.assert_json(&json!({"error": "Invalid Credentials"}));
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_username() {
        let (server, _) = get_test_server();

        let response = server
            .post("/api/login")
            .json(&json!({"username": "nobody", "password": PASSWORD}))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        response.assert_json(&json!({"error": "Invalid Credentials"}));
    }

    #[tokio::test]
    async fn log_in_fails_for_inactive_user() {
        let (server, db_connection) = get_test_server();
        {
            let connection = db_connection.lock().unwrap();
            must_deactivate_user(crate::UserID::new(1), &connection);
        }

        let response = server
            .post("/api/login")
            .json(&json!({"username": "testuser", "password": PASSWORD}))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        response.assert_json(&json!({"error": "Invalid Credentials"}));
    }

    #[tokio::test]
    async fn log_in_reports_missing_fields() {
        let (server, _) = get_test_server();

        let response = server.post("/api/login").json(&json!({})).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({
            "username": "This field is required.",
            "password": "This field is required.",
        }));
    }

    #[tokio::test]
    async fn log_in_rejects_already_authenticated_client() {
        let (server, _) = get_test_server();
        let first: Value = server
            .post("/api/login")
            .json(&json!({"username": "testuser", "password": PASSWORD}))
            .await
            .json();
        let token = first["token"].as_str().unwrap();

        let response = server
            .post("/api/login")
            .add_header(AUTHORIZATION, format!("Token {token}"))
            .json(&json!({"username": "testuser", "password": PASSWORD}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({"message": "You are already logged in"}));
    }

    #[tokio::test]
    async fn each_log_in_issues_a_new_token() {
        let (server, _) = get_test_server();
        let credentials = json!({"username": "testuser", "password": PASSWORD});

        let first: Value = server.post("/api/login").json(&credentials).await.json();
        let second: Value = server.post("/api/login").json(&credentials).await.json();

        assert_ne!(first["token"], second["token"]);
    }
}
