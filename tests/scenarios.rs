//! End-to-end walkthroughs of the core community flows.

#![cfg(feature = "sqlite")]

use axum::http::StatusCode;
use rstest::rstest;
use serde_json::{Value, json};
use test_util::{AnyError, TestApp};

fn names(list: &Value) -> Vec<&str> {
    list.as_array()
        .into_iter()
        .flatten()
        .filter_map(|c| c["name"].as_str())
        .collect()
}

#[rstest]
#[tokio::test]
async fn fresh_visitor_sees_only_the_public_channel() -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let alice = app.signup("alice@example.com", "Alice").await?;
    let reply = app.get("/channels", &alice.token).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(names(&reply.body["channels"]), ["General announcements"]);
    assert_eq!(reply.body["channels"][0]["canPost"], false);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn promotion_reveals_the_member_channel() -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let alice = app.signup("alice@example.com", "Alice").await?;
    app.promote(alice.user_id, "Member").await?;

    let reply = app.get("/channels", &alice.token).await?;
    assert_eq!(
        names(&reply.body["channels"]),
        ["General announcements", "Free talk"]
    );
    let free_talk = reply.body["channels"]
        .as_array()
        .into_iter()
        .flatten()
        .find(|c| c["name"] == "Free talk")
        .ok_or("free talk listed")?;
    assert_eq!(free_talk["canPost"], true);

    let me = app.get("/auth/me", &alice.token).await?;
    assert_eq!(me.body["user"]["isVisitor"], false);
    assert_eq!(me.body["user"]["isMember"], true);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn learning_reward_is_paid_once() -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let admin = app.admin().await?;
    let article = app
        .post(
            "/learning",
            &admin.token,
            json!({
                "title": "Small talk",
                "category": "communication",
                "contentUrl": "https://example.com/small-talk",
                "milesReward": 50
            }),
        )
        .await?;
    assert_eq!(article.status, StatusCode::CREATED);
    let id = article.body["article"]["id"].as_i64().ok_or("article id")?;

    let alice = app.signup("alice@example.com", "Alice").await?;
    let first = app
        .post(&format!("/learning/{id}/complete"), &alice.token, json!({ "comprehensionRating": 4 }))
        .await?;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["milesEarned"], 50);

    let balance = app.get("/miles/balance", &alice.token).await?;
    assert_eq!(balance.body["miles"], 50);

    let second = app
        .post(&format!("/learning/{id}/complete"), &alice.token, json!({}))
        .await?;
    assert_eq!(second.status, StatusCode::CONFLICT);
    let balance = app.get("/miles/balance", &alice.token).await?;
    assert_eq!(balance.body["miles"], 50);

    let detail = app.get(&format!("/learning/{id}"), &alice.token).await?;
    assert_eq!(detail.body["article"]["isCompleted"], true);
    assert_eq!(detail.body["article"]["userRating"], 4);
    assert_eq!(detail.body["article"]["completionCount"], 1);

    let history = app.get("/miles/transactions", &alice.token).await?;
    let entries = history.body["transactions"].as_array().ok_or("entries")?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["type"], "earn");
    assert_eq!(entries[0]["description"], "Completed learning article \"Small talk\"");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn single_stock_item_sells_out() -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let admin = app.admin().await?;
    let item = app
        .post(
            "/shop",
            &admin.token,
            json!({ "name": "Coffee ticket", "mileCost": 30, "type": "discount_ticket", "stock": 1 }),
        )
        .await?;
    assert_eq!(item.status, StatusCode::CREATED);
    let id = item.body["item"]["id"].as_i64().ok_or("item id")?;

    let alice = app.signup("alice@example.com", "Alice").await?;
    let topped = app
        .post("/miles/purchase", &alice.token, json!({ "amount": 30 }))
        .await?;
    assert_eq!(topped.body["miles"], 30);

    let bought = app
        .post(&format!("/shop/{id}/purchase"), &alice.token, json!({}))
        .await?;
    assert_eq!(bought.status, StatusCode::OK);
    assert_eq!(bought.body["remainingMiles"], 0);
    assert_eq!(bought.body["item"]["stock"], 0);

    let again = app
        .post(&format!("/shop/{id}/purchase"), &alice.token, json!({}))
        .await?;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.error(), Some("this item is out of stock"));
    let balance = app.get("/miles/balance", &alice.token).await?;
    assert_eq!(balance.body["miles"], 0);

    let history = app.get("/miles/transactions", &alice.token).await?;
    let entries = history.body["transactions"].as_array().ok_or("transactions")?;
    assert_eq!(entries.len(), 2);
    let newest = entries.first().ok_or("newest entry")?;
    assert_eq!(newest["type"], "spend");
    assert_eq!(newest["amount"], 30);
    assert_eq!(newest["relatedId"], id);
    assert_eq!(newest["relatedType"], "shop");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn participation_toggles_back() -> Result<(), AnyError> {
    let app = TestApp::new().await?;
    let admin = app.admin().await?;
    let event = app
        .post(
            "/events",
            &admin.token,
            json!({
                "title": "Language exchange",
                "description": "Monthly meetup",
                "date": "2025-07-01T18:00:00Z",
                "venue": "Community hall",
                "pricing": { "visitor": 1000, "member": 500 }
            }),
        )
        .await?;
    assert_eq!(event.status, StatusCode::CREATED);
    let id = event.body["event"]["id"].as_i64().ok_or("event id")?;

    let bob = app.signup("bob@example.com", "Bob").await?;
    let joined = app
        .post(&format!("/events/{id}/participate"), &bob.token, json!({}))
        .await?;
    assert_eq!(joined.body["event"]["isParticipating"], true);
    assert_eq!(joined.body["event"]["participants"].as_array().map(Vec::len), Some(1));

    let left = app
        .post(&format!("/events/{id}/participate"), &bob.token, json!({}))
        .await?;
    assert_eq!(left.body["event"]["isParticipating"], false);
    assert_eq!(left.body["event"]["participants"].as_array().map(Vec::len), Some(0));
    Ok(())
}
