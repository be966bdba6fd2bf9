//! Shop item queries.

use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;
use crate::{
    models::{NewShopItem, ShopItem, ShopItemChanges},
    schema::shop_items,
};

/// Shop items newest first; `active_only` hides withdrawn items.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn list_items(conn: &mut DbConnection, active_only: bool) -> QueryResult<Vec<ShopItem>> {
    let mut query = shop_items::table
        .order((shop_items::created_at.desc(), shop_items::id.desc()))
        .select(ShopItem::as_select())
        .into_boxed();
    if active_only {
        query = query.filter(shop_items::active.eq(true));
    }
    query.load(conn).await
}

/// Look up an item by primary key.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn find_item(conn: &mut DbConnection, item_id: i32) -> QueryResult<Option<ShopItem>> {
    shop_items::table
        .find(item_id)
        .select(ShopItem::as_select())
        .first(conn)
        .await
        .optional()
}

/// Insert a new item.
///
/// # Errors
/// Returns any error produced by the insertion query.
#[must_use = "handle the result"]
pub async fn create_item(conn: &mut DbConnection, item: &NewShopItem<'_>) -> QueryResult<ShopItem> {
    diesel::insert_into(shop_items::table)
        .values(item)
        .returning(ShopItem::as_returning())
        .get_result(conn)
        .await
}

/// Apply a partial update to an item.
///
/// # Errors
/// Returns any error produced by the update query.
#[must_use = "handle the result"]
pub async fn update_item(
    conn: &mut DbConnection,
    item_id: i32,
    changes: &ShopItemChanges,
) -> QueryResult<Option<ShopItem>> {
    if changes.is_empty() {
        return find_item(conn, item_id).await;
    }
    diesel::update(shop_items::table.find(item_id))
        .set(changes)
        .returning(ShopItem::as_returning())
        .get_result(conn)
        .await
        .optional()
}

/// Delete an item.
///
/// # Errors
/// Returns any error produced by the delete query.
#[must_use = "handle the result"]
pub async fn delete_item(conn: &mut DbConnection, item_id: i32) -> QueryResult<usize> {
    diesel::delete(shop_items::table.find(item_id))
        .execute(conn)
        .await
}

/// Take one unit of finite stock.
///
/// Returns the updated item, or `None` when no finite stock remains. Items
/// with unlimited stock (`-1`) are never matched.
///
/// # Errors
/// Returns any error produced by the update query.
#[must_use = "handle the result"]
pub async fn take_one_from_stock(
    conn: &mut DbConnection,
    item_id: i32,
) -> QueryResult<Option<ShopItem>> {
    diesel::update(
        shop_items::table
            .filter(shop_items::id.eq(item_id))
            .filter(shop_items::stock.gt(0)),
    )
    .set(shop_items::stock.eq(shop_items::stock - 1))
    .returning(ShopItem::as_returning())
    .get_result(conn)
    .await
    .optional()
}
