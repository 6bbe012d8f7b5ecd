//! CRUD and monthly listing endpoints for incomes.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;

use crate::{
    AppState, Error, JsonBody, UserID,
    database_id::RecordId,
    db::lock_connection,
    income::{
        core::{IncomeData, create_income, delete_income, get_income, get_incomes, update_income},
        view::{IncomeLookups, IncomeView},
    },
    recurring::{MonthQuery, YearMonth},
    timezone::get_local_date,
};

/// The state needed to manage incomes.
#[derive(Debug, Clone)]
pub struct IncomeState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for IncomeState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

impl IncomeState {
    fn current_month(&self) -> Result<YearMonth, Error> {
        get_local_date(&self.local_timezone).map(YearMonth::from_date)
    }
}

/// List the user's incomes, optionally only those in the `year` and `month` of the query.
pub async fn list_incomes_endpoint(
    State(state): State<IncomeState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Vec<IncomeView>>, Error> {
    let selected_month = query.year_month()?;
    let month = match selected_month {
        Some(month) => month,
        None => state.current_month()?,
    };

    let connection = lock_connection(&state.db_connection)?;
    let lookups = IncomeLookups::load(user_id, &connection)?;
    let incomes = get_incomes(user_id, selected_month, &connection)?;

    Ok(Json(
        incomes
            .into_iter()
            .map(|income| lookups.view(income, month))
            .collect(),
    ))
}

pub async fn create_income_endpoint(
    State(state): State<IncomeState>,
    Extension(user_id): Extension<UserID>,
    JsonBody(data): JsonBody<IncomeData>,
) -> Result<impl IntoResponse, Error> {
    let month = state.current_month()?;
    let connection = lock_connection(&state.db_connection)?;
    let income = data.validate(user_id, &connection)?;
    let income = create_income(user_id, income, &connection)?;
    tracing::debug!("created income {} for user {user_id}", income.id);

    let lookups = IncomeLookups::load(user_id, &connection)?;

    Ok((StatusCode::CREATED, Json(lookups.view(income, month))))
}

pub async fn get_income_endpoint(
    State(state): State<IncomeState>,
    Extension(user_id): Extension<UserID>,
    Path(income_id): Path<RecordId>,
) -> Result<Json<IncomeView>, Error> {
    let month = state.current_month()?;
    let connection = lock_connection(&state.db_connection)?;
    let income = get_income(income_id, user_id, &connection)?;
    let lookups = IncomeLookups::load(user_id, &connection)?;

    Ok(Json(lookups.view(income, month)))
}

pub async fn update_income_endpoint(
    State(state): State<IncomeState>,
    Extension(user_id): Extension<UserID>,
    Path(income_id): Path<RecordId>,
    JsonBody(data): JsonBody<IncomeData>,
) -> Result<Json<IncomeView>, Error> {
    let month = state.current_month()?;
    let connection = lock_connection(&state.db_connection)?;
    get_income(income_id, user_id, &connection)?;
    let income = data.validate(user_id, &connection)?;
    let income = update_income(income_id, user_id, income, &connection)?;
    let lookups = IncomeLookups::load(user_id, &connection)?;

    Ok(Json(lookups.view(income, month)))
}

pub async fn delete_income_endpoint(
    State(state): State<IncomeState>,
    Extension(user_id): Extension<UserID>,
    Path(income_id): Path<RecordId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_income(income_id, user_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
