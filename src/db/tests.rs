#![cfg(feature = "sqlite")]

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rstest::{fixture, rstest};

use super::*;
use crate::{
    kinds::{PermissionAccess, RoleKind},
    models::{
        EventParticipant,
        LearningCompletion,
        NewCategory,
        NewChannel,
        NewEvent,
        NewLearningArticle,
        NewMileTransaction,
        NewRole,
        NewShopItem,
        NewUser,
        ProfileChanges,
        User,
    },
};

#[fixture]
async fn migrated_conn() -> DbConnection {
    let mut conn = establish_connection(":memory:")
        .await
        .expect("failed to create in-memory connection");
    apply_migrations(&mut conn, "")
        .await
        .expect("failed to apply migrations");
    conn
}

async fn insert_user(conn: &mut DbConnection, email: &str) -> User {
    let at = now();
    users::create_user(
        conn,
        &NewUser {
            email,
            password: "hash",
            username: email,
            registered_at: at,
            last_login_at: at,
        },
    )
    .await
    .expect("failed to create user")
}

async fn insert_role(conn: &mut DbConnection, name: &str, kind: RoleKind) -> i32 {
    roles::create_role(
        conn,
        &NewRole {
            name,
            description: "",
            kind: kind.as_str(),
            permissions: "[]".to_owned(),
            created_at: now(),
        },
    )
    .await
    .expect("failed to create role")
    .id
}

#[rstest]
#[tokio::test]
async fn user_round_trip_and_profile_merge(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let user = insert_user(&mut conn, "alice@example.com").await;
    assert_eq!(user.miles, 0);
    assert!(user.notify_new_posts);

    let changes = ProfileChanges {
        bio: Some("hello".to_owned()),
        ..ProfileChanges::default()
    };
    let updated = users::update_profile(&mut conn, user.id, &changes)
        .await
        .expect("update")
        .expect("user exists");
    assert_eq!(updated.bio.as_deref(), Some("hello"));
    assert_eq!(updated.username, "alice@example.com");

    let unchanged = users::update_profile(&mut conn, user.id, &ProfileChanges::default())
        .await
        .expect("empty update")
        .expect("user exists");
    assert_eq!(unchanged.bio.as_deref(), Some("hello"));
}

#[rstest]
#[tokio::test]
async fn duplicate_email_is_a_unique_violation(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    insert_user(&mut conn, "bob@example.com").await;
    let at = now();
    let err = users::create_user(
        &mut conn,
        &NewUser {
            email: "bob@example.com",
            password: "hash",
            username: "bob",
            registered_at: at,
            last_login_at: at,
        },
    )
    .await
    .expect_err("duplicate email");
    assert!(matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    ));
}

#[rstest]
#[tokio::test]
async fn grant_is_idempotent_and_role_delete_cascades(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let user = insert_user(&mut conn, "carol@example.com").await;
    let member = insert_role(&mut conn, "Member", RoleKind::Member).await;

    users::grant_role(&mut conn, user.id, member).await.expect("grant");
    users::grant_role(&mut conn, user.id, member).await.expect("regrant");
    assert_eq!(users::roles_for_user(&mut conn, user.id).await.expect("roles").len(), 1);

    roles::delete_role(&mut conn, member).await.expect("delete role");
    assert!(users::roles_for_user(&mut conn, user.id).await.expect("roles").is_empty());
}

#[rstest]
#[tokio::test]
async fn channels_sort_by_category_then_channel(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let at = now();
    let second = categories::create_category(
        &mut conn,
        &NewCategory { name: "Second", description: "", position: 2, created_at: at },
    )
    .await
    .expect("category");
    let first = categories::create_category(
        &mut conn,
        &NewCategory { name: "First", description: "", position: 1, created_at: at },
    )
    .await
    .expect("category");
    for (category_id, name, position) in [(second.id, "b", 1), (first.id, "z", 2), (first.id, "a", 1)] {
        channels::create_channel(
            &mut conn,
            &NewChannel { category_id, name, description: "", position, created_at: at },
        )
        .await
        .expect("channel");
    }
    let names: Vec<String> = channels::list_channels(&mut conn, None)
        .await
        .expect("list")
        .into_iter()
        .map(|(channel, _)| channel.name)
        .collect();
    assert_eq!(names, ["a", "z", "b"]);

    let filtered = channels::list_channels(&mut conn, Some(second.id)).await.expect("list");
    assert_eq!(filtered.len(), 1);
}

#[rstest]
#[tokio::test]
async fn permission_lists_are_replaced_per_access(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let at = now();
    let admin = insert_role(&mut conn, "Admin", RoleKind::Admin).await;
    let member = insert_role(&mut conn, "Member", RoleKind::Member).await;
    let category = categories::create_category(
        &mut conn,
        &NewCategory { name: "General", description: "", position: 1, created_at: at },
    )
    .await
    .expect("category");
    let channel = channels::create_channel(
        &mut conn,
        &NewChannel { category_id: category.id, name: "chat", description: "", position: 0, created_at: at },
    )
    .await
    .expect("channel");

    channels::replace_permissions(&mut conn, channel.id, PermissionAccess::View, &[admin, member])
        .await
        .expect("view");
    channels::replace_permissions(&mut conn, channel.id, PermissionAccess::Post, &[admin])
        .await
        .expect("post");
    channels::replace_permissions(&mut conn, channel.id, PermissionAccess::View, &[member])
        .await
        .expect("replace view");

    let perms = channels::permissions_for_channels(&mut conn, &[channel.id])
        .await
        .expect("perms");
    let mut pairs: Vec<(String, i32)> = perms
        .into_iter()
        .map(|(p, role)| (p.access, role.id))
        .collect();
    pairs.sort();
    assert_eq!(pairs, [("post".to_owned(), admin), ("view".to_owned(), member)]);
}

#[rstest]
#[tokio::test]
async fn debit_never_overdraws(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let user = insert_user(&mut conn, "dave@example.com").await;
    assert_eq!(ledger::credit(&mut conn, user.id, 30).await.expect("credit"), Some(30));
    assert_eq!(ledger::debit(&mut conn, user.id, 31).await.expect("debit"), None);
    assert_eq!(ledger::debit(&mut conn, user.id, 30).await.expect("debit"), Some(0));
    assert_eq!(ledger::balance(&mut conn, user.id).await.expect("balance"), Some(0));
}

#[rstest]
#[tokio::test]
async fn credit_never_overflows(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let user = insert_user(&mut conn, "erin@example.com").await;
    assert_eq!(
        ledger::credit(&mut conn, user.id, i32::MAX).await.expect("credit"),
        Some(i32::MAX)
    );
    assert_eq!(ledger::credit(&mut conn, user.id, 10).await.expect("credit"), None);
    assert_eq!(ledger::balance(&mut conn, user.id).await.expect("balance"), Some(i32::MAX));
}

#[rstest]
#[tokio::test]
async fn reconcile_projects_the_ledger(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let user = insert_user(&mut conn, "erin@example.com").await;
    for (kind, amount) in [("earn", 50), ("purchase", 20), ("spend", 30)] {
        ledger::append_transaction(
            &mut conn,
            &NewMileTransaction {
                user_id: user.id,
                amount,
                kind,
                description: "test",
                related_id: None,
                related_type: None,
                created_at: now(),
            },
        )
        .await
        .expect("append");
    }
    ledger::credit(&mut conn, user.id, 40).await.expect("credit");
    let report = ledger::reconcile(&mut conn, user.id)
        .await
        .expect("reconcile")
        .expect("user exists");
    assert_eq!(report.projected, 40);
    assert!(report.is_consistent());
    assert_eq!(ledger::recent_transactions(&mut conn, user.id).await.expect("history").len(), 3);
}

#[rstest]
#[tokio::test]
async fn stock_decrement_is_conditional(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let at = now();
    let mut ids = Vec::new();
    for stock in [1, -1] {
        let item = shop::create_item(
            &mut conn,
            &NewShopItem {
                name: "Item",
                description: "",
                image_url: None,
                mile_cost: 10,
                item_type: "material",
                discount_value: Some(0),
                stock,
                active: true,
                created_at: at,
            },
        )
        .await
        .expect("item");
        ids.push(item.id);
    }
    let [finite, unlimited] = ids[..] else {
        panic!("two items expected");
    };
    let taken = shop::take_one_from_stock(&mut conn, finite).await.expect("take");
    assert_eq!(taken.map(|i| i.stock), Some(0));
    assert!(shop::take_one_from_stock(&mut conn, finite).await.expect("take").is_none());
    assert!(shop::take_one_from_stock(&mut conn, unlimited).await.expect("take").is_none());
    let item = shop::find_item(&mut conn, unlimited).await.expect("find").expect("item");
    assert_eq!(item.stock, -1);
}

#[rstest]
#[tokio::test]
async fn authored_content_blocks_user_deletion(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let admin = insert_user(&mut conn, "admin@example.com").await;
    let guest = insert_user(&mut conn, "guest@example.com").await;
    let at = now();
    let event = events::create_event(
        &mut conn,
        &NewEvent {
            title: "Meetup",
            description: "",
            flyer_image_url: None,
            starts_at: at,
            venue: "Tokyo",
            visitor_price: 1000,
            member_price: 500,
            created_by: admin.id,
            created_at: at,
        },
    )
    .await
    .expect("event");
    events::add_participant(
        &mut conn,
        &EventParticipant { event_id: event.id, user_id: guest.id, registered_at: at },
    )
    .await
    .expect("participate");

    let err = users::delete_user(&mut conn, admin.id).await.expect_err("restricted");
    assert!(matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)
    ));

    users::delete_user(&mut conn, guest.id).await.expect("cascade");
    assert!(!events::is_participant(&mut conn, event.id, guest.id).await.expect("lookup"));
}

#[rstest]
#[tokio::test]
async fn completion_is_unique_per_user(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let user = insert_user(&mut conn, "frank@example.com").await;
    let at = now();
    let article = learning::create_article(
        &mut conn,
        &NewLearningArticle {
            title: "Idioms",
            subtitle: None,
            cover_image_url: None,
            category: "english",
            content_url: "https://example.com/idioms",
            miles_reward: 50,
            created_by: user.id,
            created_at: at,
        },
    )
    .await
    .expect("article");
    let completion = LearningCompletion {
        article_id: article.id,
        user_id: user.id,
        rating: 4,
        completed_at: at,
    };
    learning::create_completion(&mut conn, &completion).await.expect("complete");
    let err = learning::create_completion(&mut conn, &completion)
        .await
        .expect_err("duplicate");
    assert!(matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    ));
    let counts = learning::completion_counts(&mut conn, &[article.id]).await.expect("counts");
    assert_eq!(counts, [(article.id, 1)]);
}

#[rstest]
#[tokio::test]
async fn audit_accepts_configured_connection(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    audit_sqlite_features(&mut conn)
        .await
        .expect("sqlite feature audit failed");
}
