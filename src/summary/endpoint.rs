use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
};
use rusqlite::Connection;

use crate::{
    AppState, Error, UserID,
    db::lock_connection,
    recurring::{MonthQuery, YearMonth},
    summary::core::{MonthlySummary, get_monthly_summary},
    timezone::get_local_date,
};

/// The state needed to build monthly summaries.
#[derive(Debug, Clone)]
pub struct SummaryState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for SummaryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Get the summary for the month in the query, or the current month if there is none.
pub async fn get_summary_endpoint(
    State(state): State<SummaryState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<MonthlySummary>, Error> {
    let month = match query.year_month()? {
        Some(month) => month,
        None => YearMonth::from_date(get_local_date(&state.local_timezone)?),
    };

    let connection = lock_connection(&state.db_connection)?;

    get_monthly_summary(user_id, month, &connection).map(Json)
}
