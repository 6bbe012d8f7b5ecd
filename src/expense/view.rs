//! The JSON representation of an expense.

use std::collections::HashMap;

use rusqlite::Connection;
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{
    Error, UserID,
    category::{CategoryKind, get_category_names},
    credit_card::{CreditCard, get_credit_card_map},
    database_id::{CategoryId, CreditCardId, RecordId},
    date_format,
    expense::core::Expense,
    money,
    recurring::{AmountChange, RecordKind, YearMonth, amount_for_month, get_change_logs_for_user},
};

/// The card details embedded in an expense.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditCardSummary {
    pub id: CreditCardId,
    pub brand: String,
    pub last_four_digits: String,
    pub close_card_day: u8,
}

impl From<&CreditCard> for CreditCardSummary {
    fn from(card: &CreditCard) -> Self {
        Self {
            id: card.id,
            brand: card.brand.clone(),
            last_four_digits: card.last_four_digits.clone(),
            close_card_day: card.close_card_day,
        }
    }
}

/// An expense as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseView {
    pub id: RecordId,
    /// The amount for the month being viewed.
    #[serde(serialize_with = "money::serialize")]
    pub amount: f64,
    /// The amount the expense was created with.
    #[serde(serialize_with = "money::serialize")]
    pub base_amount: f64,
    #[serde(with = "date_format::iso_date")]
    pub date: Date,
    pub description: String,
    pub category: Option<CategoryId>,
    pub category_name: Option<String>,
    pub is_recurring: bool,
    pub installments: u32,
    pub credit_card: Option<CreditCardSummary>,
    #[serde(serialize_with = "money::serialize")]
    pub surcharge: f64,
    pub change_logs: Vec<AmountChange>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The user's categories, cards and change logs, loaded once per request.
pub struct ExpenseLookups {
    category_names: HashMap<CategoryId, String>,
    credit_cards: HashMap<CreditCardId, CreditCard>,
    change_logs: HashMap<RecordId, Vec<AmountChange>>,
}

impl ExpenseLookups {
    pub fn load(user_id: UserID, connection: &Connection) -> Result<Self, Error> {
        Ok(Self {
            category_names: get_category_names(user_id, CategoryKind::Expense, connection)?,
            credit_cards: get_credit_card_map(user_id, connection)?,
            change_logs: get_change_logs_for_user(RecordKind::Expense, user_id, connection)?,
        })
    }

    /// The change log of an expense, ordered by effective date.
    pub fn change_logs(&self, expense_id: RecordId) -> &[AmountChange] {
        self.change_logs
            .get(&expense_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The card an expense was charged to.
    pub fn credit_card(&self, credit_card_id: Option<CreditCardId>) -> Option<&CreditCard> {
        credit_card_id.and_then(|id| self.credit_cards.get(&id))
    }

    /// The name of an expense's category.
    pub fn category_name(&self, category_id: Option<CategoryId>) -> Option<&str> {
        category_id
            .and_then(|id| self.category_names.get(&id))
            .map(String::as_str)
    }

    /// The amount of `expense` in `month`, before any surcharge or installment split.
    pub fn amount_in(&self, expense: &Expense, month: YearMonth) -> f64 {
        amount_for_month(
            expense.amount,
            expense.date,
            expense.is_recurring,
            self.change_logs(expense.id),
            month,
        )
    }

    /// Build the view of `expense` with its amount resolved for `month`.
    pub fn view(&self, expense: Expense, month: YearMonth) -> ExpenseView {
        ExpenseView {
            id: expense.id,
            amount: self.amount_in(&expense, month),
            change_logs: self.change_logs(expense.id).to_vec(),
            base_amount: expense.amount,
            date: expense.date,
            category_name: self.category_name(expense.category_id).map(str::to_owned),
            credit_card: self
                .credit_card(expense.credit_card_id)
                .map(CreditCardSummary::from),
            description: expense.description,
            category: expense.category_id,
            is_recurring: expense.is_recurring,
            installments: expense.installments,
            surcharge: expense.surcharge,
            created_at: expense.created_at,
        }
    }
}
