//! Per-user expense and income categories.

mod core;
mod endpoints;

pub use core::{CategoryKind, create_category_table, get_category, get_category_names};
pub use endpoints::{
    create_category_endpoint, delete_category_endpoint, get_category_endpoint,
    list_categories_endpoint, update_category_endpoint,
};

#[cfg(test)]
pub use core::create_category;
