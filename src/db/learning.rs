//! Learning article and completion queries.

use diesel::{dsl::count_star, prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;
use crate::{
    models::{ArticleChanges, LearningArticle, LearningCompletion, NewLearningArticle},
    schema::{learning_articles, learning_completions},
};

/// Articles, newest first, optionally restricted to one category.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn list_articles(
    conn: &mut DbConnection,
    category: Option<&str>,
) -> QueryResult<Vec<LearningArticle>> {
    let mut query = learning_articles::table
        .order((
            learning_articles::created_at.desc(),
            learning_articles::id.desc(),
        ))
        .select(LearningArticle::as_select())
        .into_boxed();
    if let Some(category) = category {
        query = query.filter(learning_articles::category.eq(category));
    }
    query.load(conn).await
}

/// Look up an article by primary key.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn find_article(
    conn: &mut DbConnection,
    article_id: i32,
) -> QueryResult<Option<LearningArticle>> {
    learning_articles::table
        .find(article_id)
        .select(LearningArticle::as_select())
        .first(conn)
        .await
        .optional()
}

/// Insert a new article.
///
/// # Errors
/// Returns any error produced by the insertion query.
#[must_use = "handle the result"]
pub async fn create_article(
    conn: &mut DbConnection,
    article: &NewLearningArticle<'_>,
) -> QueryResult<LearningArticle> {
    diesel::insert_into(learning_articles::table)
        .values(article)
        .returning(LearningArticle::as_returning())
        .get_result(conn)
        .await
}

/// Apply a partial update to an article.
///
/// # Errors
/// Returns any error produced by the update query.
#[must_use = "handle the result"]
pub async fn update_article(
    conn: &mut DbConnection,
    article_id: i32,
    changes: &ArticleChanges,
) -> QueryResult<Option<LearningArticle>> {
    if changes.is_empty() {
        return find_article(conn, article_id).await;
    }
    diesel::update(learning_articles::table.find(article_id))
        .set(changes)
        .returning(LearningArticle::as_returning())
        .get_result(conn)
        .await
        .optional()
}

/// Delete an article; completions cascade, ledger entries keep their id.
///
/// # Errors
/// Returns any error produced by the delete query.
#[must_use = "handle the result"]
pub async fn delete_article(conn: &mut DbConnection, article_id: i32) -> QueryResult<usize> {
    diesel::delete(learning_articles::table.find(article_id))
        .execute(conn)
        .await
}

/// `(article id, completion count)` for every listed article with completions.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn completion_counts(
    conn: &mut DbConnection,
    article_ids: &[i32],
) -> QueryResult<Vec<(i32, i64)>> {
    if article_ids.is_empty() {
        return Ok(Vec::new());
    }
    learning_completions::table
        .filter(learning_completions::article_id.eq_any(article_ids))
        .group_by(learning_completions::article_id)
        .select((learning_completions::article_id, count_star()))
        .load(conn)
        .await
}

/// Completions recorded by `user_id` for any of the listed articles.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn completions_by_user(
    conn: &mut DbConnection,
    user_id: i32,
    article_ids: &[i32],
) -> QueryResult<Vec<LearningCompletion>> {
    if article_ids.is_empty() {
        return Ok(Vec::new());
    }
    learning_completions::table
        .filter(learning_completions::user_id.eq(user_id))
        .filter(learning_completions::article_id.eq_any(article_ids))
        .select(LearningCompletion::as_select())
        .load(conn)
        .await
}

/// Record a completion.
///
/// # Errors
/// Returns a unique violation when the user already completed the article.
#[must_use = "handle the result"]
pub async fn create_completion(
    conn: &mut DbConnection,
    completion: &LearningCompletion,
) -> QueryResult<usize> {
    diesel::insert_into(learning_completions::table)
        .values(completion)
        .execute(conn)
        .await
}
