//! The API endpoint URIs.
//!
//! Parameters are written in braces, e.g., '/api/expenses/{expense_id}'.

/// The route for registering a new user.
pub const SIGN_UP: &str = "/api/signup";
/// The route for logging in a user.
pub const LOG_IN: &str = "/api/login";
/// The route for revoking the token of the current user.
pub const LOG_OUT: &str = "/api/logout";

/// The route to list and create expenses.
pub const EXPENSES: &str = "/api/expenses";
/// The route to access a single expense.
pub const EXPENSE: &str = "/api/expenses/{expense_id}";
/// The route to change the amount of an expense from a given date.
pub const EXPENSE_UPDATE_RECURRING: &str = "/api/expenses/{expense_id}/update_recurring";
/// The route to delete an entry from the change log of an expense.
pub const EXPENSE_CHANGE_LOG: &str = "/api/expenses/{expense_id}/change_logs/{change_log_id}";

/// The route to list and create incomes.
pub const INCOMES: &str = "/api/incomes";
/// The route to access a single income.
pub const INCOME: &str = "/api/incomes/{income_id}";
/// The route to change the amount of an income from a given date.
pub const INCOME_UPDATE_RECURRING: &str = "/api/incomes/{income_id}/update_recurring";
/// The route to delete an entry from the change log of an income.
pub const INCOME_CHANGE_LOG: &str = "/api/incomes/{income_id}/change_logs/{change_log_id}";

/// The route to list and create credit cards.
pub const CREDIT_CARDS: &str = "/api/credit_cards";
/// The route to access a single credit card.
pub const CREDIT_CARD: &str = "/api/credit_cards/{credit_card_id}";

/// The route to list and create expense categories.
pub const EXPENSE_CATEGORIES: &str = "/api/expense_categories";
/// The route to access a single expense category.
pub const EXPENSE_CATEGORY: &str = "/api/expense_categories/{category_id}";
/// The route to list and create income categories.
pub const INCOME_CATEGORIES: &str = "/api/income_categories";
/// The route to access a single income category.
pub const INCOME_CATEGORY: &str = "/api/income_categories/{category_id}";

/// The route for the monthly summary.
pub const SUMMARY: &str = "/api/summary";

/// Replace the parameters in `endpoint_path` with `ids`, in order.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// Parameters without a matching ID are left in place, and extra IDs are ignored.
#[cfg(test)]
pub fn format_endpoint(endpoint_path: &str, ids: &[i64]) -> String {
    let mut formatted = String::with_capacity(endpoint_path.len());
    let mut rest = endpoint_path;
    let mut ids = ids.iter();

    while let Some(param_start) = rest.find('{') {
        let Some(param_len) = rest[param_start..].find('}') else {
            break;
        };
        let Some(id) = ids.next() else {
            break;
        };

        formatted.push_str(&rest[..param_start]);
        formatted.push_str(&id.to_string());
        rest = &rest[param_start + param_len + 1..];
    }

    formatted.push_str(rest);
    formatted
}
