//! BDD scenarios for channel visibility and posting rights.

#![cfg(feature = "sqlite")]

use std::{
    cell::{OnceCell, RefCell},
    collections::HashMap,
};

use axum::http::StatusCode;
use rstest::fixture;
use rstest_bdd::{assert_step_err, assert_step_ok};
use rstest_bdd_macros::{given, scenarios, then, when};
use serde_json::json;
use test_util::{Reply, Session, TestApp};

#[derive(Default)]
struct CommunityWorld {
    app: OnceCell<TestApp>,
    sessions: RefCell<HashMap<String, Session>>,
    reply: RefCell<Option<Reply>>,
}

impl CommunityWorld {
    fn app(&self) -> &TestApp {
        self.app.get().unwrap_or_else(|| panic!("community not started"))
    }

    fn session(&self, name: &str) -> Session {
        self.sessions
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("no account named {name}"))
    }

    fn last_reply(&self) -> Reply {
        self.reply
            .borrow()
            .clone()
            .unwrap_or_else(|| panic!("no request sent"))
    }
}

#[fixture]
fn world() -> CommunityWorld { CommunityWorld::default() }

#[given("a freshly seeded community")]
async fn given_community(world: &CommunityWorld) {
    let app = TestApp::new()
        .await
        .unwrap_or_else(|err| panic!("failed to start community: {err}"));
    assert!(world.app.set(app).is_ok(), "community started twice");
}

#[given("a visitor named \"{name}\"")]
async fn given_visitor(world: &CommunityWorld, name: String) {
    let email = format!("{}@example.com", name.to_lowercase());
    let session = world
        .app()
        .signup(&email, &name)
        .await
        .unwrap_or_else(|err| panic!("signup failed: {err}"));
    world.sessions.borrow_mut().insert(name, session);
}

#[given("\"{name}\" is promoted to \"{role}\"")]
async fn given_promoted(world: &CommunityWorld, name: String, role: String) {
    let user_id = world.session(&name).user_id;
    let outcome = world.app().promote(user_id, &role).await.map_err(|e| e.to_string());
    assert_step_ok!(outcome);
}

#[when("\"{name}\" lists the channels")]
async fn when_lists(world: &CommunityWorld, name: String) {
    let token = world.session(&name).token;
    let reply = world
        .app()
        .get("/channels", &token)
        .await
        .unwrap_or_else(|err| panic!("request failed: {err}"));
    world.reply.replace(Some(reply));
}

#[when("\"{name}\" posts \"{content}\" in \"{channel}\"")]
async fn when_posts(world: &CommunityWorld, name: String, content: String, channel: String) {
    let token = world.session(&name).token;
    let app = world.app();
    let channel_id = app
        .channel_id(&channel)
        .await
        .unwrap_or_else(|err| panic!("unknown channel {channel}: {err}"));
    let reply = app
        .post("/posts", &token, json!({ "channel": channel_id, "content": content }))
        .await
        .unwrap_or_else(|err| panic!("request failed: {err}"));
    world.reply.replace(Some(reply));
}

#[then("the visible channels are \"{expected}\"")]
fn then_visible(world: &CommunityWorld, expected: String) {
    let reply = world.last_reply();
    let names: Vec<&str> = reply.body["channels"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|c| c["name"].as_str())
        .collect();
    let wanted: Vec<&str> = expected.split(", ").collect();
    assert_eq!(names, wanted);
}

#[then("the request is refused with status {status}")]
fn then_refused(world: &CommunityWorld, status: u16) {
    let reply = world.last_reply();
    let outcome = if reply.status.is_success() {
        Ok(())
    } else {
        Err(reply.status.as_u16())
    };
    let code = assert_step_err!(outcome);
    assert_eq!(code, status);
}

#[then("the post is accepted")]
fn then_accepted(world: &CommunityWorld) {
    assert_eq!(world.last_reply().status, StatusCode::CREATED);
}

#[then("\"{name}\" sees {count} post in \"{channel}\"")]
async fn then_sees_posts(world: &CommunityWorld, name: String, count: usize, channel: String) {
    let token = world.session(&name).token;
    let app = world.app();
    let channel_id = app
        .channel_id(&channel)
        .await
        .unwrap_or_else(|err| panic!("unknown channel {channel}: {err}"));
    let reply = app
        .get(&format!("/posts/channel/{channel_id}"), &token)
        .await
        .unwrap_or_else(|err| panic!("request failed: {err}"));
    assert_eq!(reply.body["posts"].as_array().map(Vec::len), Some(count));
}

scenarios!(
    "tests/features/channel_posting.feature",
    runtime = "tokio-current-thread",
    fixtures = [world: CommunityWorld]
);
