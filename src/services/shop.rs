//! Shop catalogue and purchases paid in Miles.

use diesel_async::AsyncConnection;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    Ledger,
    miles::{Entry, post_entry},
    non_blank,
    optional_text,
    required,
};
use crate::{
    access::{Principal, require_admin},
    db::{self, DbConnection},
    error::{ServiceError, ServiceResult},
    kinds::{RelatedKind, ShopItemType, TransactionKind},
    models::{NewShopItem, ShopItem, ShopItemChanges},
    views::ShopItemView,
};

/// Stock value meaning "never runs out".
pub const UNLIMITED_STOCK: i32 = -1;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub mile_cost: Option<i32>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub discount_value: Option<i32>,
    pub stock: Option<i32>,
    pub active: Option<bool>,
}

/// Result of a successful purchase.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOutcome {
    pub item: ShopItemView,
    pub remaining_miles: i32,
}

fn mile_cost(cost: i32) -> ServiceResult<i32> {
    if cost > 0 {
        Ok(cost)
    } else {
        Err(ServiceError::Validation(
            "mileCost must be a positive integer".to_owned(),
        ))
    }
}

fn stock(stock: i32) -> ServiceResult<i32> {
    if stock >= UNLIMITED_STOCK {
        Ok(stock)
    } else {
        Err(ServiceError::Validation(
            "stock must be -1 (unlimited) or a non-negative count".to_owned(),
        ))
    }
}

fn project(items: &[ShopItem]) -> ServiceResult<Vec<ShopItemView>> {
    items.iter().map(ShopItemView::from_row).collect()
}

/// Active items, newest first.
///
/// # Errors
/// Returns any database or decoding error.
pub async fn list_items(conn: &mut DbConnection) -> ServiceResult<Vec<ShopItemView>> {
    project(&db::shop::list_items(conn, true).await?)
}

/// Every item including withdrawn ones.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers.
pub async fn list_all_items(
    conn: &mut DbConnection,
    who: &Principal,
) -> ServiceResult<Vec<ShopItemView>> {
    require_admin(who)?;
    project(&db::shop::list_items(conn, false).await?)
}

/// Add an item; stock defaults to unlimited and the discount to zero.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers and `Validation` for missing
/// fields, a non-positive cost, an unknown type or a bad stock value.
pub async fn create_item(
    conn: &mut DbConnection,
    who: &Principal,
    input: ItemInput,
) -> ServiceResult<ShopItemView> {
    require_admin(who)?;
    let name = required("name", input.name)?;
    let cost = mile_cost(input.mile_cost.ok_or_else(|| ServiceError::missing("mileCost"))?)?;
    let item_type: ShopItemType = required("type", input.item_type)?.parse()?;
    let image = optional_text(input.image_url);
    let item = db::shop::create_item(
        conn,
        &NewShopItem {
            name: &name,
            description: input.description.as_deref().unwrap_or_default(),
            image_url: image.as_deref(),
            mile_cost: cost,
            item_type: item_type.as_str(),
            discount_value: Some(input.discount_value.unwrap_or_default()),
            stock: stock(input.stock.unwrap_or(UNLIMITED_STOCK))?,
            active: input.active.unwrap_or(true),
            created_at: db::now(),
        },
    )
    .await?;
    info!(item_id = item.id, "shop item created");
    ShopItemView::from_row(&item)
}

/// Apply a partial update.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers, `NotFound` for unknown ids and
/// `Validation` for invalid values.
pub async fn update_item(
    conn: &mut DbConnection,
    who: &Principal,
    item_id: i32,
    input: ItemInput,
) -> ServiceResult<ShopItemView> {
    require_admin(who)?;
    let item_type = input
        .item_type
        .as_deref()
        .map(str::parse::<ShopItemType>)
        .transpose()?;
    let changes = ShopItemChanges {
        name: non_blank("name", input.name)?,
        description: input.description,
        image_url: input.image_url,
        mile_cost: input.mile_cost.map(mile_cost).transpose()?,
        item_type: item_type.map(|t| t.as_str().to_owned()),
        discount_value: input.discount_value,
        stock: input.stock.map(stock).transpose()?,
        active: input.active,
    };
    let item = db::shop::update_item(conn, item_id, &changes)
        .await?
        .ok_or_else(|| ServiceError::not_found("item"))?;
    ShopItemView::from_row(&item)
}

/// Remove an item from the catalogue.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers and `NotFound` for unknown ids.
pub async fn delete_item(conn: &mut DbConnection, who: &Principal, item_id: i32) -> ServiceResult<()> {
    require_admin(who)?;
    super::found(db::shop::delete_item(conn, item_id).await?, "item")?;
    info!(item_id, "shop item deleted");
    Ok(())
}

/// Buy one unit of an item with the caller's Miles.
///
/// Checks run in order: existence, active flag, stock, balance. The stock
/// decrement, the debit and the ledger entry commit together; any failure
/// leaves all three untouched.
///
/// # Errors
/// Returns `NotFound`, `Unavailable`, `OutOfStock` or `InsufficientBalance`.
pub async fn purchase(
    conn: &mut DbConnection,
    ledger: &Ledger,
    who: &Principal,
    item_id: i32,
) -> ServiceResult<PurchaseOutcome> {
    let user_id = who.user_id;
    let _gate = ledger.lock().await;
    let (item, remaining) = conn
        .transaction::<_, ServiceError, _>(|conn| {
            Box::pin(async move {
                let item = db::shop::find_item(conn, item_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("item"))?;
                if !item.active {
                    return Err(ServiceError::Unavailable);
                }
                if item.stock == 0 {
                    return Err(ServiceError::OutOfStock);
                }
                let description = format!("Purchased \"{}\"", item.name);
                let remaining = post_entry(
                    conn,
                    &Entry {
                        user_id,
                        kind: TransactionKind::Spend,
                        amount: item.mile_cost,
                        description: &description,
                        related_id: Some(item_id),
                        related_type: Some(RelatedKind::Shop),
                    },
                )
                .await?;
                if item.stock == UNLIMITED_STOCK {
                    return Ok((item, remaining));
                }
                let item = db::shop::take_one_from_stock(conn, item_id)
                    .await?
                    .ok_or(ServiceError::OutOfStock)?;
                Ok((item, remaining))
            })
        })
        .await?;
    info!(item_id, user_id, remaining, "shop purchase completed");
    Ok(PurchaseOutcome {
        item: ShopItemView::from_row(&item)?,
        remaining_miles: remaining,
    })
}
