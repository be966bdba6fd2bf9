//! Integration tests for the Miles ledger and the shop.

#![cfg(feature = "sqlite")]

use axum::http::StatusCode;
use ecg_community::db;
use rstest::rstest;
use serde_json::{Value, json};
use test_util::{AnyError, Session, TestApp};

async fn create_item(app: &TestApp, body: Value) -> Result<i64, AnyError> {
    let admin = app.admin().await?;
    let reply = app.post("/shop", &admin.token, body).await?;
    if reply.status != StatusCode::CREATED {
        return Err(format!("item creation failed: {}", reply.body).into());
    }
    reply.body["item"]["id"]
        .as_i64()
        .ok_or_else(|| "item id".into())
}

async fn top_up(app: &TestApp, who: &Session, amount: i32) -> Result<(), AnyError> {
    let reply = app
        .post("/miles/purchase", &who.token, json!({ "amount": amount, "paymentIntentId": "pi_test" }))
        .await?;
    if reply.status != StatusCode::OK {
        return Err(format!("top-up failed: {}", reply.body).into());
    }
    Ok(())
}

async fn assert_projection_matches(app: &TestApp, who: &Session) -> Result<(), AnyError> {
    let pool = app.pool();
    let mut conn = pool.get().await?;
    let report = db::ledger::reconcile(&mut conn, who.user_id)
        .await?
        .ok_or("user vanished")?;
    assert!(report.is_consistent(), "{report:?}");
    let cached = app.get("/miles/balance", &who.token).await?;
    assert_eq!(cached.body["miles"], report.projected);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn top_up_spend_and_grant_keep_the_projection() -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let alice = app.signup("alice@example.com", "Alice").await?;

    top_up(&app, &alice, 100).await?;
    let spent = app
        .post("/miles/spend", &alice.token, json!({ "amount": 30, "description": "Event fee" }))
        .await?;
    assert_eq!(spent.status, StatusCode::OK);
    assert_eq!(spent.body["miles"], 70);

    let admin = app.admin().await?;
    let granted = app
        .post("/miles/grant", &admin.token, json!({ "userId": alice.user_id, "amount": 5 }))
        .await?;
    assert_eq!(granted.body["miles"], 75);
    assert_projection_matches(&app, &alice).await?;

    let history = app.get("/miles/transactions", &alice.token).await?;
    let kinds: Vec<&str> = history.body["transactions"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|t| t["type"].as_str())
        .collect();
    assert_eq!(kinds, ["earn", "spend", "purchase"]);
    assert_eq!(
        history.body["transactions"][2]["description"],
        "Mile purchase (100 Miles)"
    );
    Ok(())
}

#[rstest]
#[tokio::test]
async fn overspending_changes_nothing() -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let alice = app.signup("alice@example.com", "Alice").await?;
    top_up(&app, &alice, 10).await?;

    let spend = app
        .post("/miles/spend", &alice.token, json!({ "amount": 11, "description": "Too much" }))
        .await?;
    assert_eq!(spend.status, StatusCode::BAD_REQUEST);
    assert_eq!(spend.error(), Some("insufficient miles"));

    let item = create_item(&app, json!({ "name": "Book", "mileCost": 20, "type": "material", "stock": 3 })).await?;
    let buy = app.post(&format!("/shop/{item}/purchase"), &alice.token, json!({})).await?;
    assert_eq!(buy.status, StatusCode::BAD_REQUEST);

    let admin = app.admin().await?;
    let all = app.get("/shop/all", &admin.token).await?;
    assert_eq!(all.body["items"][0]["stock"], 3);
    let history = app.get("/miles/transactions", &alice.token).await?;
    assert_eq!(history.body["transactions"].as_array().map(Vec::len), Some(1));
    assert_projection_matches(&app, &alice).await?;
    Ok(())
}

#[rstest]
#[tokio::test]
async fn credits_stop_at_the_balance_ceiling() -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let alice = app.signup("alice@example.com", "Alice").await?;
    top_up(&app, &alice, i32::MAX).await?;

    let overflow = app
        .post("/miles/purchase", &alice.token, json!({ "amount": 10 }))
        .await?;
    assert_eq!(overflow.status, StatusCode::BAD_REQUEST);

    let admin = app.admin().await?;
    let grant = app
        .post("/miles/grant", &admin.token, json!({ "userId": alice.user_id, "amount": 1 }))
        .await?;
    assert_eq!(grant.status, StatusCode::BAD_REQUEST);

    let balance = app.get("/miles/balance", &alice.token).await?;
    assert_eq!(balance.body["miles"], i32::MAX);
    let history = app.get("/miles/transactions", &alice.token).await?;
    assert_eq!(history.body["transactions"].as_array().map(Vec::len), Some(1));
    assert_eq!(history.body["transactions"][0]["relatedType"], "other");
    assert_projection_matches(&app, &alice).await?;
    Ok(())
}

#[rstest]
#[case(json!({ "amount": 0 }))]
#[case(json!({ "amount": -4 }))]
#[case(json!({}))]
#[tokio::test]
async fn top_up_requires_a_positive_amount(#[case] body: Value) -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let alice = app.signup("alice@example.com", "Alice").await?;
    let reply = app.post("/miles/purchase", &alice.token, body).await?;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn unlimited_stock_is_never_decremented() -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let item = create_item(&app, json!({ "name": "Sticker", "mileCost": 1, "type": "other" })).await?;
    let alice = app.signup("alice@example.com", "Alice").await?;
    top_up(&app, &alice, 3).await?;
    for remaining in [2, 1, 0] {
        let reply = app.post(&format!("/shop/{item}/purchase"), &alice.token, json!({})).await?;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["item"]["stock"], -1);
        assert_eq!(reply.body["remainingMiles"], remaining);
    }
    let history = app.get("/miles/transactions", &alice.token).await?;
    assert_eq!(
        history.body["transactions"][0]["description"],
        "Purchased \"Sticker\""
    );
    assert_projection_matches(&app, &alice).await?;
    Ok(())
}

#[rstest]
#[tokio::test]
async fn withdrawn_items_are_hidden_and_unavailable() -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let item = create_item(
        &app,
        json!({ "name": "Old", "mileCost": 1, "type": "other", "active": false }),
    )
    .await?;
    let alice = app.signup("alice@example.com", "Alice").await?;
    top_up(&app, &alice, 5).await?;

    let listing = app.get("/shop", &alice.token).await?;
    assert_eq!(listing.body["items"], json!([]));
    let buy = app.post(&format!("/shop/{item}/purchase"), &alice.token, json!({})).await?;
    assert_eq!(buy.status, StatusCode::BAD_REQUEST);
    assert_eq!(buy.error(), Some("this item is currently unavailable"));

    let missing = app.post("/shop/9999/purchase", &alice.token, json!({})).await?;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_purchases_never_overdraw() -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let item = create_item(&app, json!({ "name": "Ticket", "mileCost": 40, "type": "other" })).await?;
    let alice = app.signup("alice@example.com", "Alice").await?;
    top_up(&app, &alice, 50).await?;

    let uri = format!("/shop/{item}/purchase");
    let (a, b, c) = tokio::join!(
        app.post(&uri, &alice.token, json!({})),
        app.post(&uri, &alice.token, json!({})),
        app.post(&uri, &alice.token, json!({})),
    );
    let statuses = [a?.status, b?.status, c?.status];
    let successes = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    assert_eq!(successes, 1, "statuses: {statuses:?}");
    assert!(statuses
        .iter()
        .all(|s| *s == StatusCode::OK || *s == StatusCode::BAD_REQUEST));

    let balance = app.get("/miles/balance", &alice.token).await?;
    assert_eq!(balance.body["miles"], 10);
    assert_projection_matches(&app, &alice).await?;
    Ok(())
}
