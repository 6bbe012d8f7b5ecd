//! Expense and income categories owned by a user.

use std::collections::HashMap;

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};

use crate::{Error, UserID, database_id::CategoryId, validation::FieldErrors};

/// The longest category name that may be stored, in characters.
pub const MAX_CATEGORY_NAME_LENGTH: usize = 100;

const DUPLICATE_NAME: &str = "A category with this name already exists.";

/// Whether a category groups expenses or incomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    /// Categories for expenses, e.g. "Groceries".
    Expense,
    /// Categories for incomes, e.g. "Salary".
    Income,
}

impl CategoryKind {
    /// The value stored in the `kind` column.
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryKind::Expense => "expense",
            CategoryKind::Income => "income",
        }
    }
}

/// A named category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The display name of the category.
    pub name: String,
}

pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('expense', 'income')),
            name TEXT NOT NULL,
            UNIQUE(user_id, kind, name),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

/// Validate a category name, returning it trimmed.
pub fn validate_category_name(name: Option<&str>) -> Result<String, Error> {
    let mut errors = FieldErrors::default();

    errors
        .text("name", name, MAX_CATEGORY_NAME_LENGTH)
        .ok_or_else(|| errors.into())
}

fn map_duplicate_name(error: rusqlite::Error) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
            if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                && desc.contains("category.") =>
        {
            let mut errors = FieldErrors::default();
            errors.add("name", DUPLICATE_NAME);
            errors.into()
        }
        error => error.into(),
    }
}

/// Create a category named `name` for `user_id`.
///
/// # Errors
/// Returns [Error::InvalidFields] if the user already has a category of the same kind and name.
pub fn create_category(
    user_id: UserID,
    kind: CategoryKind,
    name: &str,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .execute(
            "INSERT INTO category (user_id, kind, name) VALUES (?1, ?2, ?3)",
            params![user_id.as_i64(), kind.as_str(), name],
        )
        .map_err(map_duplicate_name)?;

    Ok(Category {
        id: connection.last_insert_rowid(),
        name: name.to_owned(),
    })
}

/// Get a category of `kind` owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such category.
pub fn get_category(
    id: CategoryId,
    user_id: UserID,
    kind: CategoryKind,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .query_row(
            "SELECT id, name FROM category WHERE id = ?1 AND user_id = ?2 AND kind = ?3",
            params![id, user_id.as_i64(), kind.as_str()],
            map_category_row,
        )
        .map_err(Error::from)
}

/// Every category of `kind` owned by `user_id`, ordered by name.
pub fn get_categories(
    user_id: UserID,
    kind: CategoryKind,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, name FROM category WHERE user_id = ?1 AND kind = ?2 ORDER BY name, id",
        )?
        .query_map(params![user_id.as_i64(), kind.as_str()], map_category_row)?
        .map(|maybe_category| maybe_category.map_err(Error::from))
        .collect()
}

/// The names of the categories of `kind` owned by `user_id`, keyed by ID.
pub fn get_category_names(
    user_id: UserID,
    kind: CategoryKind,
    connection: &Connection,
) -> Result<HashMap<CategoryId, String>, Error> {
    Ok(get_categories(user_id, kind, connection)?
        .into_iter()
        .map(|category| (category.id, category.name))
        .collect())
}

/// Rename a category.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such category, or [Error::InvalidFields] if the
/// new name is taken.
pub fn update_category(
    id: CategoryId,
    user_id: UserID,
    kind: CategoryKind,
    name: &str,
    connection: &Connection,
) -> Result<Category, Error> {
    let rows_affected = connection
        .execute(
            "UPDATE category SET name = ?1 WHERE id = ?2 AND user_id = ?3 AND kind = ?4",
            params![name, id, user_id.as_i64(), kind.as_str()],
        )
        .map_err(map_duplicate_name)?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(Category {
        id,
        name: name.to_owned(),
    })
}

/// Delete a category. Records in the category are kept and become uncategorised.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such category.
pub fn delete_category(
    id: CategoryId,
    user_id: UserID,
    kind: CategoryKind,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM category WHERE id = ?1 AND user_id = ?2 AND kind = ?3",
        params![id, user_id.as_i64(), kind.as_str()],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::{Error, db::initialize, user::test_utils::must_create_user};

    use super::{
        CategoryKind, create_category, delete_category, get_categories, get_category,
        update_category, validate_category_name,
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn name_is_trimmed_and_required() {
        assert_eq!(validate_category_name(Some("  Food ")), Ok("Food".to_owned()));
        assert!(matches!(
            validate_category_name(None),
            Err(Error::InvalidFields(_))
        ));
        assert!(matches!(
            validate_category_name(Some("")),
            Err(Error::InvalidFields(_))
        ));
    }

    #[test]
    fn create_and_list_by_kind() {
        let connection = get_test_connection();
        let user = must_create_user("alice", &connection);
        let food = create_category(user.id, CategoryKind::Expense, "Food", &connection).unwrap();
        create_category(user.id, CategoryKind::Income, "Salary", &connection).unwrap();

        let expense_categories =
            get_categories(user.id, CategoryKind::Expense, &connection).unwrap();

        assert_eq!(expense_categories, vec![food]);
    }

    #[test]
    fn duplicate_name_is_a_field_error() {
        let connection = get_test_connection();
        let user = must_create_user("alice", &connection);
        create_category(user.id, CategoryKind::Expense, "Food", &connection).unwrap();

        let result = create_category(user.id, CategoryKind::Expense, "Food", &connection);

        let Err(Error::InvalidFields(errors)) = result else {
            panic!("want a field error, got {result:?}");
        };
        assert_eq!(errors.get("name"), Some("A category with this name already exists."));
    }

    #[test]
    fn same_name_allowed_for_other_kind_and_user() {
        let connection = get_test_connection();
        let alice = must_create_user("alice", &connection);
        let bob = must_create_user("bob", &connection);
        create_category(alice.id, CategoryKind::Expense, "Other", &connection).unwrap();

        assert!(create_category(alice.id, CategoryKind::Income, "Other", &connection).is_ok());
        assert!(create_category(bob.id, CategoryKind::Expense, "Other", &connection).is_ok());
    }

    #[test]
    fn other_users_categories_are_not_found() {
        let connection = get_test_connection();
        let alice = must_create_user("alice", &connection);
        let bob = must_create_user("bob", &connection);
        let food = create_category(alice.id, CategoryKind::Expense, "Food", &connection).unwrap();

        assert_eq!(
            get_category(food.id, bob.id, CategoryKind::Expense, &connection),
            Err(Error::NotFound)
        );
        assert_eq!(
            update_category(food.id, bob.id, CategoryKind::Expense, "Mine", &connection),
            Err(Error::NotFound)
        );
        assert_eq!(
            delete_category(food.id, bob.id, CategoryKind::Expense, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn wrong_kind_is_not_found() {
        let connection = get_test_connection();
        let user = must_create_user("alice", &connection);
        let food = create_category(user.id, CategoryKind::Expense, "Food", &connection).unwrap();

        assert_eq!(
            get_category(food.id, user.id, CategoryKind::Income, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn update_renames_category() {
        let connection = get_test_connection();
        let user = must_create_user("alice", &connection);
        let food = create_category(user.id, CategoryKind::Expense, "Food", &connection).unwrap();

        update_category(food.id, user.id, CategoryKind::Expense, "Groceries", &connection)
            .unwrap();

        assert_eq!(
            get_category(food.id, user.id, CategoryKind::Expense, &connection)
                .unwrap()
                .name,
            "Groceries"
        );
    }
}
