use std::collections::HashMap;

use rusqlite::Connection;
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{
    Error, UserID,
    category::{CategoryKind, get_category_names},
    database_id::{CategoryId, RecordId},
    date_format,
    income::core::Income,
    money,
    recurring::{AmountChange, RecordKind, YearMonth, amount_for_month, get_change_logs_for_user},
};

/// An income as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomeView {
    pub id: RecordId,
    /// The amount for the month being viewed.
    #[serde(serialize_with = "money::serialize")]
    pub amount: f64,
    #[serde(serialize_with = "money::serialize")]
    pub base_amount: f64,
    #[serde(with = "date_format::iso_date")]
    pub date: Date,
    pub description: String,
    pub category: Option<CategoryId>,
    pub category_name: Option<String>,
    pub is_recurring: bool,
    pub change_logs: Vec<AmountChange>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The user's income categories and change logs.
pub struct IncomeLookups {
    category_names: HashMap<CategoryId, String>,
    change_logs: HashMap<RecordId, Vec<AmountChange>>,
}

impl IncomeLookups {
    pub fn load(user_id: UserID, connection: &Connection) -> Result<Self, Error> {
        Ok(Self {
            category_names: get_category_names(user_id, CategoryKind::Income, connection)?,
            change_logs: get_change_logs_for_user(RecordKind::Income, user_id, connection)?,
        })
    }

    pub fn category_name(&self, category_id: Option<CategoryId>) -> Option<&str> {
        category_id
            .and_then(|id| self.category_names.get(&id))
            .map(String::as_str)
    }

    /// The amount of `income` in `month`.
    pub fn amount_in(&self, income: &Income, month: YearMonth) -> f64 {
        amount_for_month(
            income.amount,
            income.date,
            income.is_recurring,
            self.change_logs(income.id),
            month,
        )
    }

    fn change_logs(&self, income_id: RecordId) -> &[AmountChange] {
        self.change_logs
            .get(&income_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn view(&self, income: Income, month: YearMonth) -> IncomeView {
        IncomeView {
            id: income.id,
            amount: self.amount_in(&income, month),
            base_amount: income.amount,
            date: income.date,
            category_name: self.category_name(income.category_id).map(str::to_owned),
            change_logs: self.change_logs(income.id).to_vec(),
            description: income.description,
            category: income.category_id,
            is_recurring: income.is_recurring,
            created_at: income.created_at,
        }
    }
}
