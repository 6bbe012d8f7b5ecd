//! CRUD endpoints for categories.
//!
//! The same handlers serve expense and income categories. The router adds the
//! [CategoryKind] for each group of routes as a request extension.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, JsonBody, UserID,
    category::core::{
        Category, CategoryKind, create_category, delete_category, get_categories, get_category,
        update_category, validate_category_name,
    },
    database_id::CategoryId,
    db::lock_connection,
};

/// The state needed to manage categories.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection for managing categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating or renaming a category.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryData {
    /// The new name.
    pub name: Option<String>,
}

/// List the user's categories of one kind.
pub async fn list_categories_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Extension(kind): Extension<CategoryKind>,
) -> Result<Json<Vec<Category>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_categories(user_id, kind, &connection).map(Json)
}

/// Create a category, responding with 201 and the new category.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Extension(kind): Extension<CategoryKind>,
    JsonBody(data): JsonBody<CategoryData>,
) -> Result<impl IntoResponse, Error> {
    let name = validate_category_name(data.name.as_deref())?;
    let connection = lock_connection(&state.db_connection)?;
    let category = create_category(user_id, kind, &name, &connection)?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// Get a single category.
pub async fn get_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Extension(kind): Extension<CategoryKind>,
    Path(category_id): Path<CategoryId>,
) -> Result<Json<Category>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_category(category_id, user_id, kind, &connection).map(Json)
}

/// Rename a category.
pub async fn update_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Extension(kind): Extension<CategoryKind>,
    Path(category_id): Path<CategoryId>,
    JsonBody(data): JsonBody<CategoryData>,
) -> Result<Json<Category>, Error> {
    let name = validate_category_name(data.name.as_deref())?;
    let connection = lock_connection(&state.db_connection)?;

    update_category(category_id, user_id, kind, &name, &connection).map(Json)
}

/// Delete a category, responding with 204.
pub async fn delete_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Extension(kind): Extension<CategoryKind>,
    Path(category_id): Path<CategoryId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_category(category_id, user_id, kind, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
