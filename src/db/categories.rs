//! Category queries.

use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;
use crate::{
    models::{Category, CategoryChanges, NewCategory},
    schema::categories,
};

/// Categories in display order.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn list_categories(conn: &mut DbConnection) -> QueryResult<Vec<Category>> {
    categories::table
        .order((categories::position.asc(), categories::id.asc()))
        .select(Category::as_select())
        .load(conn)
        .await
}

/// Look up a category by primary key.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn find_category(
    conn: &mut DbConnection,
    category_id: i32,
) -> QueryResult<Option<Category>> {
    categories::table
        .find(category_id)
        .select(Category::as_select())
        .first(conn)
        .await
        .optional()
}

/// Look up a category by name.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn find_category_by_name(
    conn: &mut DbConnection,
    name: &str,
) -> QueryResult<Option<Category>> {
    categories::table
        .filter(categories::name.eq(name))
        .order(categories::id.asc())
        .select(Category::as_select())
        .first(conn)
        .await
        .optional()
}

/// Insert a new category.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn create_category(
    conn: &mut DbConnection,
    cat: &NewCategory<'_>,
) -> QueryResult<Category> {
    diesel::insert_into(categories::table)
        .values(cat)
        .returning(Category::as_returning())
        .get_result(conn)
        .await
}

/// Apply a partial update to a category.
///
/// # Errors
/// Returns any error produced by the update query.
#[must_use = "handle the result"]
pub async fn update_category(
    conn: &mut DbConnection,
    category_id: i32,
    changes: &CategoryChanges,
) -> QueryResult<Option<Category>> {
    if changes.is_empty() {
        return find_category(conn, category_id).await;
    }
    diesel::update(categories::table.find(category_id))
        .set(changes)
        .returning(Category::as_returning())
        .get_result(conn)
        .await
        .optional()
}

/// Delete a category together with its channels and their posts.
///
/// # Errors
/// Returns any error produced by the delete query.
#[must_use = "handle the result"]
pub async fn delete_category(conn: &mut DbConnection, category_id: i32) -> QueryResult<usize> {
    diesel::delete(categories::table.find(category_id))
        .execute(conn)
        .await
}
