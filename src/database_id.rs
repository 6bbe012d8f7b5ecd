//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

/// The ID of an expense or an income.
pub type RecordId = DatabaseId;

/// The ID of an entry in a change log.
pub type ChangeLogId = DatabaseId;

/// The ID of an expense or income category.
pub type CategoryId = DatabaseId;

/// The ID of a credit card.
pub type CreditCardId = DatabaseId;
