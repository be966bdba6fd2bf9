//! Channel category administration.

use serde::Deserialize;
use tracing::info;

use super::{found, non_blank, required};
use crate::{
    access::{Principal, require_admin},
    db::{self, DbConnection},
    error::{ServiceError, ServiceResult},
    models::{CategoryChanges, NewCategory},
    views::CategoryView,
};

#[derive(Deserialize, Debug, Default)]
pub struct CategoryInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub order: Option<i32>,
}

/// Categories in display order.
///
/// # Errors
/// Returns any database error.
pub async fn list_categories(conn: &mut DbConnection) -> ServiceResult<Vec<CategoryView>> {
    Ok(db::categories::list_categories(conn)
        .await?
        .iter()
        .map(CategoryView::from)
        .collect())
}

/// Create a category.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers and `Validation` for a missing
/// name.
pub async fn create_category(
    conn: &mut DbConnection,
    who: &Principal,
    input: CategoryInput,
) -> ServiceResult<CategoryView> {
    require_admin(who)?;
    let name = required("name", input.name)?;
    let category = db::categories::create_category(
        conn,
        &NewCategory {
            name: &name,
            description: input.description.as_deref().unwrap_or_default(),
            position: input.order.unwrap_or_default(),
            created_at: db::now(),
        },
    )
    .await?;
    info!(category_id = category.id, "category created");
    Ok(CategoryView::from(&category))
}

/// Apply a partial update.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers and `NotFound` for unknown ids.
pub async fn update_category(
    conn: &mut DbConnection,
    who: &Principal,
    category_id: i32,
    input: CategoryInput,
) -> ServiceResult<CategoryView> {
    require_admin(who)?;
    let changes = CategoryChanges {
        name: non_blank("name", input.name)?,
        description: input.description,
        position: input.order,
    };
    let category = db::categories::update_category(conn, category_id, &changes)
        .await?
        .ok_or_else(|| ServiceError::not_found("category"))?;
    Ok(CategoryView::from(&category))
}

/// Delete a category together with its channels and their posts.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers and `NotFound` for unknown ids.
pub async fn delete_category(
    conn: &mut DbConnection,
    who: &Principal,
    category_id: i32,
) -> ServiceResult<()> {
    require_admin(who)?;
    found(
        db::categories::delete_category(conn, category_id).await?,
        "category",
    )?;
    info!(category_id, "category deleted");
    Ok(())
}
