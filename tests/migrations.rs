//! Schema migrations apply cleanly and are idempotent.

#![cfg(feature = "sqlite")]

use diesel_async::RunQueryDsl;
use ecg_community::db::{self, establish_connection};
use rstest::rstest;

#[rstest]
#[tokio::test]
async fn sqlite_migrations_run() {
    let mut conn = establish_connection(":memory:").await.expect("connect");
    let applied = db::apply_migrations(&mut conn, ":memory:")
        .await
        .expect("migrate");
    assert!(applied > 0);
    for table in [
        "users",
        "roles",
        "user_roles",
        "categories",
        "channels",
        "posts",
        "events",
        "learning_articles",
        "mile_transactions",
        "shop_items",
    ] {
        diesel::sql_query(format!("SELECT * FROM {table}"))
            .execute(&mut conn)
            .await
            .unwrap_or_else(|err| panic!("table {table} missing: {err}"));
    }
    let again = db::apply_migrations(&mut conn, ":memory:")
        .await
        .expect("re-run");
    assert_eq!(again, 0);
}
