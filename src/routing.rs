//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Extension, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};

use crate::{
    AppState,
    auth::{auth_guard, post_log_in, post_log_out, post_sign_up},
    category::{
        CategoryKind, create_category_endpoint, delete_category_endpoint, get_category_endpoint,
        list_categories_endpoint, update_category_endpoint,
    },
    credit_card::{
        create_credit_card_endpoint, delete_credit_card_endpoint, get_credit_card_endpoint,
        list_credit_cards_endpoint, update_credit_card_endpoint,
    },
    endpoints,
    expense::{
        create_expense_endpoint, delete_expense_endpoint, get_expense_endpoint,
        list_expenses_endpoint, update_expense_endpoint,
    },
    income::{
        create_income_endpoint, delete_income_endpoint, get_income_endpoint,
        list_incomes_endpoint, update_income_endpoint,
    },
    json_message,
    recurring::{
        RecordKind, create_or_update_change_log_endpoint, delete_change_log_endpoint,
        update_change_log_in_month_endpoint,
    },
    summary::get_summary_endpoint,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::SIGN_UP, post(post_sign_up))
        .route(endpoints::LOG_IN, post(post_log_in));

    let expense_routes = Router::new()
        .route(
            endpoints::EXPENSES,
            get(list_expenses_endpoint).post(create_expense_endpoint),
        )
        .route(
            endpoints::EXPENSE,
            get(get_expense_endpoint)
                .put(update_expense_endpoint)
                .delete(delete_expense_endpoint),
        )
        .route(
            endpoints::EXPENSE_UPDATE_RECURRING,
            post(create_or_update_change_log_endpoint).put(update_change_log_in_month_endpoint),
        )
        .route(
            endpoints::EXPENSE_CHANGE_LOG,
            delete(delete_change_log_endpoint),
        )
        .layer(Extension(RecordKind::Expense));

    let income_routes = Router::new()
        .route(
            endpoints::INCOMES,
            get(list_incomes_endpoint).post(create_income_endpoint),
        )
        .route(
            endpoints::INCOME,
            get(get_income_endpoint)
                .put(update_income_endpoint)
                .delete(delete_income_endpoint),
        )
        .route(
            endpoints::INCOME_UPDATE_RECURRING,
            post(create_or_update_change_log_endpoint).put(update_change_log_in_month_endpoint),
        )
        .route(
            endpoints::INCOME_CHANGE_LOG,
            delete(delete_change_log_endpoint),
        )
        .layer(Extension(RecordKind::Income));

    let expense_category_routes = Router::new()
        .route(
            endpoints::EXPENSE_CATEGORIES,
            get(list_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::EXPENSE_CATEGORY,
            get(get_category_endpoint)
                .put(update_category_endpoint)
                .delete(delete_category_endpoint),
        )
        .layer(Extension(CategoryKind::Expense));

    let income_category_routes = Router::new()
        .route(
            endpoints::INCOME_CATEGORIES,
            get(list_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::INCOME_CATEGORY,
            get(get_category_endpoint)
                .put(update_category_endpoint)
                .delete(delete_category_endpoint),
        )
        .layer(Extension(CategoryKind::Income));

    let protected_routes = Router::new()
        .route(endpoints::LOG_OUT, post(post_log_out))
        .route(
            endpoints::CREDIT_CARDS,
            get(list_credit_cards_endpoint).post(create_credit_card_endpoint),
        )
        .route(
            endpoints::CREDIT_CARD,
            get(get_credit_card_endpoint)
                .put(update_credit_card_endpoint)
                .delete(delete_credit_card_endpoint),
        )
        .route(endpoints::SUMMARY, get(get_summary_endpoint))
        .merge(expense_routes)
        .merge(income_routes)
        .merge(expense_category_routes)
        .merge(income_category_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

async fn get_404_not_found() -> Response {
    json_message(StatusCode::NOT_FOUND, "error", "Not found.").into_response()
}

#[cfg(test)]
mod router_tests {
    use axum::http::{StatusCode, header::AUTHORIZATION};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, endpoints, endpoints::format_endpoint};

    use super::build_router;

    const PASSWORD: &str = "averystrongandsecurepassword";

    fn get_test_server() -> TestServer {
        let state = AppState::new(Connection::open_in_memory().unwrap(), "Etc/UTC")
            .unwrap()
            .with_password_hash_cost(4);

        TestServer::new(build_router(state))
    }

    async fn sign_up(server: &TestServer, username: &str) -> String {
        let response = server
            .post(endpoints::SIGN_UP)
            .json(&json!({"username": username, "password": PASSWORD}))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body = response.json::<Value>();
        format!("Token {}", body["token"].as_str().unwrap())
    }

    #[tokio::test]
    async fn protected_routes_require_token() {
        let server = get_test_server();

        for path in [
            endpoints::EXPENSES,
            endpoints::INCOMES,
            endpoints::CREDIT_CARDS,
            endpoints::EXPENSE_CATEGORIES,
            endpoints::INCOME_CATEGORIES,
            endpoints::SUMMARY,
        ] {
            let response = server.get(path).await;

            response.assert_status(StatusCode::UNAUTHORIZED);
            response.assert_json(&json!({"error": "Authentication credentials were not provided."}));
        }
    }

    #[tokio::test]
    async fn unknown_route_returns_json_404() {
        let server = get_test_server();

        let response = server.get("/api/does_not_exist").await;

        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_json(&json!({"error": "Not found."}));
    }

    #[tokio::test]
    async fn expense_lifecycle_with_change_log() {
        let server = get_test_server();
        let token = sign_up(&server, "alice").await;

        let created = server
            .post(endpoints::EXPENSES)
            .add_header(AUTHORIZATION, token.clone())
            .json(&json!({
                "amount": "100.00",
                "date": "2024-08-25",
                "description": "Gym",
                "is_recurring": true
            }))
            .await;
        created.assert_status(StatusCode::CREATED);
        let expense_id = created.json::<Value>()["id"].as_i64().unwrap();

        server
            .post(&format_endpoint(endpoints::EXPENSE_UPDATE_RECURRING, &[expense_id]))
            .add_header(AUTHORIZATION, token.clone())
            .json(&json!({"new_amount": "150", "effective_date": "2024-09-01"}))
            .await
            .assert_status(StatusCode::CREATED);

        let listing = server
            .get(endpoints::EXPENSES)
            .add_query_param("year", 2024)
            .add_query_param("month", 9)
            .add_header(AUTHORIZATION, token.clone())
            .await;
        listing.assert_status_ok();
        let expenses = listing.json::<Value>();
        assert_eq!(expenses[0]["amount"], json!("150.00"));
        assert_eq!(expenses[0]["base_amount"], json!("100.00"));
        assert_eq!(expenses[0]["date"], json!("2024-08-25"));

        server
            .delete(&format_endpoint(endpoints::EXPENSE, &[expense_id]))
            .add_header(AUTHORIZATION, token)
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn invalid_month_is_bad_request() {
        let server = get_test_server();
        let token = sign_up(&server, "alice").await;

        let response = server
            .get(endpoints::EXPENSES)
            .add_query_param("year", "invalid")
            .add_query_param("month", "invalid")
            .add_header(AUTHORIZATION, token)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({"error": "Invalid year or month format."}));
    }

    #[tokio::test]
    async fn change_log_validation_errors() {
        let server = get_test_server();
        let token = sign_up(&server, "alice").await;
        let created = server
            .post(endpoints::INCOMES)
            .add_header(AUTHORIZATION, token.clone())
            .json(&json!({"amount": 5000, "date": "2024-01-01", "is_recurring": true}))
            .await;
        let income_id = created.json::<Value>()["id"].as_i64().unwrap();
        let path = format_endpoint(endpoints::INCOME_UPDATE_RECURRING, &[income_id]);

        let missing_date = server
            .post(&path)
            .add_header(AUTHORIZATION, token.clone())
            .json(&json!({"new_amount": "5500"}))
            .await;
        let bad_date = server
            .put(&path)
            .add_header(AUTHORIZATION, token)
            .json(&json!({"new_amount": "5500", "effective_date": "June"}))
            .await;

        missing_date.assert_status(StatusCode::BAD_REQUEST);
        missing_date.assert_json(&json!({"error": "Effective date is required."}));
        bad_date.assert_status(StatusCode::BAD_REQUEST);
        bad_date.assert_json(&json!({"error": "Invalid date format. Use YYYY-MM-DD."}));
    }

    #[tokio::test]
    async fn wrongly_typed_bodies_are_bad_request() {
        let server = get_test_server();
        let token = sign_up(&server, "alice").await;
        let created = server
            .post(endpoints::EXPENSES)
            .add_header(AUTHORIZATION, token.clone())
            .json(&json!({"amount": 100, "date": "2024-01-01", "is_recurring": true}))
            .await;
        let expense_id = created.json::<Value>()["id"].as_i64().unwrap();
        let path = format_endpoint(endpoints::EXPENSE_UPDATE_RECURRING, &[expense_id]);

        let responses = [
            server
                .post(&path)
                .add_header(AUTHORIZATION, token.clone())
                .json(&json!({"new_amount": true, "effective_date": "2024-09-01"}))
                .await,
            server
                .put(&path)
                .add_header(AUTHORIZATION, token.clone())
                .json(&json!({"new_amount": "150", "effective_date": 20240901}))
                .await,
            server
                .post(endpoints::EXPENSES)
                .add_header(AUTHORIZATION, token)
                .json(&json!({"amount": 100, "date": "2024-01-01", "installments": "3"}))
                .await,
        ];

        for response in responses {
            response.assert_status(StatusCode::BAD_REQUEST);
            let body = response.json::<Value>();
            assert!(
                body["error"]
                    .as_str()
                    .unwrap()
                    .starts_with("Failed to deserialize the JSON body")
            );
        }
    }

    #[tokio::test]
    async fn categories_are_separated_by_kind_and_user() {
        let server = get_test_server();
        let alice = sign_up(&server, "alice").await;
        let bob = sign_up(&server, "bob").await;

        server
            .post(endpoints::EXPENSE_CATEGORIES)
            .add_header(AUTHORIZATION, alice.clone())
            .json(&json!({"name": "Food"}))
            .await
            .assert_status(StatusCode::CREATED);

        server
            .get(endpoints::EXPENSE_CATEGORIES)
            .add_header(AUTHORIZATION, alice.clone())
            .await
            .assert_json(&json!([{"id": 1, "name": "Food"}]));
        server
            .get(endpoints::INCOME_CATEGORIES)
            .add_header(AUTHORIZATION, alice)
            .await
            .assert_json(&json!([]));
        server
            .get(endpoints::EXPENSE_CATEGORIES)
            .add_header(AUTHORIZATION, bob)
            .await
            .assert_json(&json!([]));
    }

    #[tokio::test]
    async fn log_out_revokes_token() {
        let server = get_test_server();
        let token = sign_up(&server, "alice").await;

        server
            .post(endpoints::LOG_OUT)
            .add_header(AUTHORIZATION, token.clone())
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let response = server
            .get(endpoints::SUMMARY)
            .add_header(AUTHORIZATION, token)
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        response.assert_json(&json!({"error": "Invalid token."}));
    }
}
