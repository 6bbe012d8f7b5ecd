//! The monthly summary of incomes, expenses and credit card statements.

mod core;
mod endpoint;
mod statement;

pub use endpoint::get_summary_endpoint;
