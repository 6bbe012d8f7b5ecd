//! Credit cards and the endpoints for managing them.

mod core;
mod endpoints;

pub use core::{CreditCard, create_credit_card_table, get_credit_card, get_credit_card_map};
pub use endpoints::{
    create_credit_card_endpoint, delete_credit_card_endpoint,
    get_credit_card_endpoint, list_credit_cards_endpoint, update_credit_card_endpoint,
};

#[cfg(test)]
pub(crate) use core::test_utils;
