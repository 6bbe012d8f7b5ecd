//! Recurring expenses and incomes: months, change logs and amount resolution.

mod change_log;
mod change_log_endpoints;
mod month;
mod resolver;

pub(crate) use change_log::{create_change_log_table, get_change_logs_for_user};
pub use change_log::{RecordKind, create_change_log};
pub(crate) use change_log_endpoints::{
    create_or_update_change_log_endpoint, delete_change_log_endpoint,
    update_change_log_in_month_endpoint,
};
pub use month::{MonthQuery, YearMonth};
pub use resolver::{AmountChange, amount_for_month, occurs_in, resolve_amount};
