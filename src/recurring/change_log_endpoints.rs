//! Endpoints for changing the amount of a recurring expense or income from a given date.
//!
//! The same handlers serve expenses and incomes. The router adds the
//! [RecordKind] for each group of routes as a request extension.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error, JsonBody, UserID,
    database_id::{ChangeLogId, RecordId},
    date_format::parse_date,
    db::lock_connection,
    money::AmountInput,
    recurring::{
        AmountChange, RecordKind, YearMonth,
        change_log::{
            check_record_owner, create_change_log, delete_change_log, get_change_log_in_month,
            get_change_log_on_date, update_change_log,
        },
    },
};

/// The state needed to manage change logs.
#[derive(Debug, Clone)]
pub struct ChangeLogState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ChangeLogState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for the `update_recurring` endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ChangeLogPayload {
    pub new_amount: Option<AmountInput>,
    pub effective_date: Option<String>,
}

impl ChangeLogPayload {
    /// The new amount and effective date, checking the date first.
    fn validate(&self) -> Result<(f64, Date), Error> {
        let effective_date = self
            .effective_date
            .as_deref()
            .ok_or(Error::MissingEffectiveDate)?;
        let effective_date = parse_date(effective_date.trim()).ok_or(Error::InvalidDateFormat)?;

        let new_amount = self.new_amount.as_ref().ok_or(Error::MissingNewAmount)?;
        let new_amount = new_amount
            .parse()
            .map_err(|message| Error::InvalidAmount(message.to_owned()))?;

        Ok((new_amount, effective_date))
    }
}

/// Record a new amount from `effective_date`.
///
/// An existing entry with the same effective date is overwritten and 200 is
/// returned, otherwise a new entry is created and 201 is returned.
pub async fn create_or_update_change_log_endpoint(
    State(state): State<ChangeLogState>,
    Extension(user_id): Extension<UserID>,
    Extension(kind): Extension<RecordKind>,
    Path(record_id): Path<RecordId>,
    JsonBody(payload): JsonBody<ChangeLogPayload>,
) -> Result<(StatusCode, Json<AmountChange>), Error> {
    let connection = lock_connection(&state.db_connection)?;
    check_record_owner(kind, record_id, user_id, &connection)?;
    let (new_amount, effective_date) = payload.validate()?;

    match get_change_log_on_date(kind, record_id, effective_date, &connection)? {
        Some(existing) => {
            let change = update_change_log(kind, existing.id, new_amount, effective_date, &connection)?;
            tracing::debug!("updated {kind:?} change log {} on {effective_date}", change.id);

            Ok((StatusCode::OK, Json(change)))
        }
        None => {
            let change = create_change_log(kind, record_id, new_amount, effective_date, &connection)?;
            tracing::debug!("created {kind:?} change log {} on {effective_date}", change.id);

            Ok((StatusCode::CREATED, Json(change)))
        }
    }
}

/// Replace the entry that takes effect in the same month as `effective_date`.
pub async fn update_change_log_in_month_endpoint(
    State(state): State<ChangeLogState>,
    Extension(user_id): Extension<UserID>,
    Extension(kind): Extension<RecordKind>,
    Path(record_id): Path<RecordId>,
    JsonBody(payload): JsonBody<ChangeLogPayload>,
) -> Result<Json<AmountChange>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    check_record_owner(kind, record_id, user_id, &connection)?;
    let (new_amount, effective_date) = payload.validate()?;

    let month = YearMonth::from_date(effective_date);
    let existing =
        get_change_log_in_month(kind, record_id, month, &connection)?.ok_or(Error::NotFound)?;

    update_change_log(kind, existing.id, new_amount, effective_date, &connection).map(Json)
}

pub async fn delete_change_log_endpoint(
    State(state): State<ChangeLogState>,
    Extension(user_id): Extension<UserID>,
    Extension(kind): Extension<RecordKind>,
    Path((record_id, change_log_id)): Path<(RecordId, ChangeLogId)>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;
    check_record_owner(kind, record_id, user_id, &connection)?;
    delete_change_log(kind, record_id, change_log_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
