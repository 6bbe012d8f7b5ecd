//! Totals for a single month of incomes, cash expenses and credit card statements.

use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::Serialize;

use crate::{
    Error, UserID,
    database_id::CreditCardId,
    expense::{ExpenseLookups, get_credit_card_expenses, get_expenses},
    income::{IncomeLookups, get_incomes},
    money::{self, round_to_cents},
    recurring::YearMonth,
    summary::statement::statement_charge,
};

/// The label used for records without a category.
pub const UNDEFINED_CATEGORY: &str = "undefined category";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// The lowercased category name.
    pub label: String,
    #[serde(serialize_with = "money::serialize")]
    pub total: f64,
}

/// The amount billed to one card in the month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditCardStatement {
    pub credit_card: CreditCardId,
    /// For example "visa ending in 1234".
    pub label: String,
    #[serde(serialize_with = "money::serialize")]
    pub total: f64,
}

/// Spending and savings as a percentage of income.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Percentages {
    #[serde(serialize_with = "money::serialize")]
    pub net: f64,
    #[serde(serialize_with = "money::serialize")]
    pub cash_flow: f64,
    #[serde(serialize_with = "money::serialize")]
    pub credit_card: f64,
}

impl Percentages {
    /// `None` when there is no income to compare against.
    fn of_income(income: f64, expenses: f64, credit_card: f64, net: f64) -> Option<Self> {
        if income <= 0.0 {
            return None;
        }

        Some(Self {
            net: round_to_cents(net / income * 100.0),
            cash_flow: round_to_cents(expenses / income * 100.0),
            credit_card: round_to_cents(credit_card / income * 100.0),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub month: YearMonth,
    pub incomes_by_category: Vec<CategoryTotal>,
    /// Cash expenses only. Card purchases are counted in `credit_cards`.
    pub expenses_by_category: Vec<CategoryTotal>,
    pub credit_cards: Vec<CreditCardStatement>,
    #[serde(serialize_with = "money::serialize")]
    pub total_income: f64,
    #[serde(serialize_with = "money::serialize")]
    pub total_expenses: f64,
    #[serde(serialize_with = "money::serialize")]
    pub total_credit_card: f64,
    #[serde(serialize_with = "money::serialize")]
    pub net: f64,
    pub percentages: Option<Percentages>,
}

fn category_label(name: Option<&str>) -> String {
    name.unwrap_or(UNDEFINED_CATEGORY).to_lowercase()
}

fn to_totals(sums: BTreeMap<String, f64>) -> Vec<CategoryTotal> {
    sums.into_iter()
        .map(|(label, total)| CategoryTotal {
            label,
            total: round_to_cents(total),
        })
        .collect()
}

/// Summarise the user's finances for `month`.
pub fn get_monthly_summary(
    user_id: UserID,
    month: YearMonth,
    connection: &Connection,
) -> Result<MonthlySummary, Error> {
    let income_lookups = IncomeLookups::load(user_id, connection)?;
    let mut incomes_by_category: BTreeMap<String, f64> = BTreeMap::new();
    for income in get_incomes(user_id, Some(month), connection)? {
        *incomes_by_category
            .entry(category_label(income_lookups.category_name(income.category_id)))
            .or_default() += income_lookups.amount_in(&income, month);
    }

    let expense_lookups = ExpenseLookups::load(user_id, connection)?;
    let mut expenses_by_category: BTreeMap<String, f64> = BTreeMap::new();
    for expense in get_expenses(user_id, Some(month), connection)? {
        if expense_lookups.credit_card(expense.credit_card_id).is_some() {
            continue;
        }

        *expenses_by_category
            .entry(category_label(expense_lookups.category_name(expense.category_id)))
            .or_default() += expense_lookups.amount_in(&expense, month);
    }

    let mut statements: BTreeMap<CreditCardId, f64> = BTreeMap::new();
    for expense in get_credit_card_expenses(user_id, connection)? {
        let Some(card) = expense_lookups.credit_card(expense.credit_card_id) else {
            continue;
        };

        let charge = statement_charge(
            &expense,
            card.close_card_day,
            expense_lookups.change_logs(expense.id),
            month,
        )?;

        if charge > 0.0 {
            *statements.entry(card.id).or_default() += charge;
        }
    }

    let credit_cards: Vec<CreditCardStatement> = statements
        .into_iter()
        .filter_map(|(card_id, total)| {
            expense_lookups
                .credit_card(Some(card_id))
                .map(|card| CreditCardStatement {
                    credit_card: card_id,
                    label: card.label(),
                    total: round_to_cents(total),
                })
        })
        .collect();

    let incomes_by_category = to_totals(incomes_by_category);
    let expenses_by_category = to_totals(expenses_by_category);

    let total_income = round_to_cents(incomes_by_category.iter().map(|total| total.total).sum());
    let total_expenses = round_to_cents(expenses_by_category.iter().map(|total| total.total).sum());
    let total_credit_card = round_to_cents(credit_cards.iter().map(|card| card.total).sum());
    let net = round_to_cents(total_income - total_expenses - total_credit_card);

    Ok(MonthlySummary {
        month,
        incomes_by_category,
        expenses_by_category,
        credit_cards,
        total_income,
        total_expenses,
        total_credit_card,
        net,
        percentages: Percentages::of_income(total_income, total_expenses, total_credit_card, net),
    })
}
