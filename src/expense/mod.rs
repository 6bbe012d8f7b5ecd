//! Expenses, including recurring expenses and credit card purchases.

mod core;
mod endpoints;
mod view;

pub use core::{Expense, create_expense_table, get_credit_card_expenses, get_expenses};
pub use endpoints::{
    create_expense_endpoint, delete_expense_endpoint, get_expense_endpoint,
    list_expenses_endpoint, update_expense_endpoint,
};
pub use view::ExpenseLookups;

pub(crate) use core::{description, invalid_pk};

#[cfg(test)]
pub(crate) use core::{NewExpense, get_expense, test_utils};
