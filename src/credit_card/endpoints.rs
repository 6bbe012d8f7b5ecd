//! CRUD endpoints for credit cards.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;

use crate::{
    AppState, Error, JsonBody, UserID,
    credit_card::core::{
        CreditCard, CreditCardData, create_credit_card, delete_credit_card, get_credit_card,
        get_credit_cards, update_credit_card,
    },
    database_id::CreditCardId,
    db::lock_connection,
};

/// The state needed to manage credit cards.
#[derive(Debug, Clone)]
pub struct CreditCardState {
    /// The database connection for managing credit cards.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreditCardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

pub async fn list_credit_cards_endpoint(
    State(state): State<CreditCardState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<CreditCard>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_credit_cards(user_id, &connection).map(Json)
}

pub async fn create_credit_card_endpoint(
    State(state): State<CreditCardState>,
    Extension(user_id): Extension<UserID>,
    JsonBody(data): JsonBody<CreditCardData>,
) -> Result<impl IntoResponse, Error> {
    let card = data.validate()?;
    let connection = lock_connection(&state.db_connection)?;
    let card = create_credit_card(user_id, card, &connection)?;

    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn get_credit_card_endpoint(
    State(state): State<CreditCardState>,
    Extension(user_id): Extension<UserID>,
    Path(credit_card_id): Path<CreditCardId>,
) -> Result<Json<CreditCard>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_credit_card(credit_card_id, user_id, &connection).map(Json)
}

pub async fn update_credit_card_endpoint(
    State(state): State<CreditCardState>,
    Extension(user_id): Extension<UserID>,
    Path(credit_card_id): Path<CreditCardId>,
    JsonBody(data): JsonBody<CreditCardData>,
) -> Result<Json<CreditCard>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    // Unknown IDs are reported before validation errors.
    get_credit_card(credit_card_id, user_id, &connection)?;
    let card = data.validate()?;

    update_credit_card(credit_card_id, user_id, card, &connection).map(Json)
}

pub async fn delete_credit_card_endpoint(
    State(state): State<CreditCardState>,
    Extension(user_id): Extension<UserID>,
    Path(credit_card_id): Path<CreditCardId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_credit_card(credit_card_id, user_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
