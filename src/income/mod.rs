//! Incomes, including recurring incomes such as a salary.

mod core;
mod endpoints;
mod view;

pub use core::{create_income_table, get_incomes};
pub use endpoints::{
    create_income_endpoint, delete_income_endpoint, get_income_endpoint,
    list_incomes_endpoint, update_income_endpoint,
};
pub use view::IncomeLookups;

#[cfg(test)]
pub(crate) use core::{NewIncome, get_income, test_utils};
