//! CRUD and monthly listing endpoints for expenses.

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
    expense::{
        core::{ExpenseData, create_expense, delete_expense, get_expense, get_expenses, update_expense},
        view::{ExpenseLookups, ExpenseView},
    },
    recurring::{MonthQuery, YearMonth},
    timezone::get_local_date,
};

/// The state needed to manage expenses.
#[derive(Debug, Clone)]
pub struct ExpenseState {
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The timezone that decides the current month.
    pub local_timezone: String,
}

impl FromRef<AppState> for ExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

impl ExpenseState {
    fn current_month(&self) -> Result<YearMonth, Error> {
        get_local_date(&self.local_timezone).map(YearMonth::from_date)
    }
}

/// List the user's expenses.
///
/// With `year` and `month` only the expenses that occur in that month are
/// listed, with amounts resolved for it. Without them every expense is listed
/// with amounts resolved for the current month.
pub async fn list_expenses_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Vec<ExpenseView>>, Error> {
    let selected_month = query.year_month()?;
    let month = match selected_month {
        Some(month) => month,
        None => state.current_month()?,
    };

    let connection = lock_connection(&state.db_connection)?;
    let lookups = ExpenseLookups::load(user_id, &connection)?;
    let expenses = get_expenses(user_id, selected_month, &connection)?;

    Ok(Json(
        expenses
            .into_iter()
            .map(|expense| lookups.view(expense, month))
            .collect(),
    ))
}

pub async fn create_expense_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserID>,
    JsonBody(data): JsonBody<ExpenseData>,
) -> Result<impl IntoResponse, Error> {
    let month = state.current_month()?;
    let connection = lock_connection(&state.db_connection)?;
    let expense = data.validate(user_id, &connection)?;
    let expense = create_expense(user_id, expense, &connection)?;
    tracing::debug!("created expense {} for user {user_id}", expense.id);

    let lookups = ExpenseLookups::load(user_id, &connection)?;

    Ok((StatusCode::CREATED, Json(lookups.view(expense, month))))
}

pub async fn get_expense_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserID>,
    Path(expense_id): Path<RecordId>,
) -> Result<Json<ExpenseView>, Error> {
    let month = state.current_month()?;
    let connection = lock_connection(&state.db_connection)?;
    let expense = get_expense(expense_id, user_id, &connection)?;
    let lookups = ExpenseLookups::load(user_id, &connection)?;

    Ok(Json(lookups.view(expense, month)))
}

pub async fn update_expense_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserID>,
    Path(expense_id): Path<RecordId>,
    JsonBody(data): JsonBody<ExpenseData>,
) -> Result<Json<ExpenseView>, Error> {
    let month = state.current_month()?;
    let connection = lock_connection(&state.db_connection)?;
    get_expense(expense_id, user_id, &connection)?;
    let expense = data.validate(user_id, &connection)?;
    let expense = update_expense(expense_id, user_id, expense, &connection)?;
    let lookups = ExpenseLookups::load(user_id, &connection)?;

    Ok(Json(lookups.view(expense, month)))
}

pub async fn delete_expense_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserID>,
    Path(expense_id): Path<RecordId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_expense(expense_id, user_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
