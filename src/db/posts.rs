//! Post, like and comment queries.

use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;
use crate::{
    models::{Comment, NewComment, NewPost, Post, PostChanges, PostLike, User},
    schema::{comments, post_likes, posts, users},
};

/// Posts of a channel, newest first.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn posts_in_channel(conn: &mut DbConnection, channel_id: i32) -> QueryResult<Vec<Post>> {
    posts::table
        .filter(posts::channel_id.eq(channel_id))
        .order((posts::created_at.desc(), posts::id.desc()))
        .select(Post::as_select())
        .load(conn)
        .await
}

/// Look up a post by primary key.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn find_post(conn: &mut DbConnection, post_id: i32) -> QueryResult<Option<Post>> {
    posts::table
        .find(post_id)
        .select(Post::as_select())
        .first(conn)
        .await
        .optional()
}

/// Insert a new post.
///
/// # Errors
/// Returns a foreign key violation when the channel or author is missing.
#[must_use = "handle the result"]
pub async fn create_post(conn: &mut DbConnection, post: &NewPost<'_>) -> QueryResult<Post> {
    diesel::insert_into(posts::table)
        .values(post)
        .returning(Post::as_returning())
        .get_result(conn)
        .await
}

/// Apply an edit to a post.
///
/// # Errors
/// Returns any error produced by the update query.
#[must_use = "handle the result"]
pub async fn update_post(
    conn: &mut DbConnection,
    post_id: i32,
    changes: &PostChanges,
) -> QueryResult<Option<Post>> {
    diesel::update(posts::table.find(post_id))
        .set(changes)
        .returning(Post::as_returning())
        .get_result(conn)
        .await
        .optional()
}

/// Delete a post; likes and comments cascade.
///
/// # Errors
/// Returns any error produced by the delete query.
#[must_use = "handle the result"]
pub async fn delete_post(conn: &mut DbConnection, post_id: i32) -> QueryResult<usize> {
    diesel::delete(posts::table.find(post_id)).execute(conn).await
}

/// Likes with the liking users for the given posts, oldest first.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn likes_for_posts(
    conn: &mut DbConnection,
    post_ids: &[i32],
) -> QueryResult<Vec<(PostLike, User)>> {
    if post_ids.is_empty() {
        return Ok(Vec::new());
    }
    post_likes::table
        .inner_join(users::table)
        .filter(post_likes::post_id.eq_any(post_ids))
        .order((post_likes::created_at.asc(), post_likes::user_id.asc()))
        .select((PostLike::as_select(), User::as_select()))
        .load(conn)
        .await
}

/// Whether `user_id` currently likes the post.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn has_liked(conn: &mut DbConnection, post_id: i32, user_id: i32) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        post_likes::table
            .filter(post_likes::post_id.eq(post_id))
            .filter(post_likes::user_id.eq(user_id)),
    ))
    .get_result(conn)
    .await
}

/// Record a like.
///
/// # Errors
/// Returns any error produced by the insertion query.
#[must_use = "handle the result"]
pub async fn add_like(conn: &mut DbConnection, like: &PostLike) -> QueryResult<usize> {
    diesel::insert_into(post_likes::table)
        .values(like)
        .on_conflict_do_nothing()
        .execute(conn)
        .await
}

/// Withdraw a like.
///
/// # Errors
/// Returns any error produced by the delete query.
#[must_use = "handle the result"]
pub async fn remove_like(conn: &mut DbConnection, post_id: i32, user_id: i32) -> QueryResult<usize> {
    diesel::delete(
        post_likes::table
            .filter(post_likes::post_id.eq(post_id))
            .filter(post_likes::user_id.eq(user_id)),
    )
    .execute(conn)
    .await
}

/// Comments with their authors for the given posts, in posting order.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn comments_for_posts(
    conn: &mut DbConnection,
    post_ids: &[i32],
) -> QueryResult<Vec<(Comment, User)>> {
    if post_ids.is_empty() {
        return Ok(Vec::new());
    }
    comments::table
        .inner_join(users::table)
        .filter(comments::post_id.eq_any(post_ids))
        .order((comments::created_at.asc(), comments::id.asc()))
        .select((Comment::as_select(), User::as_select()))
        .load(conn)
        .await
}

/// Look up a comment belonging to `post_id`.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn find_comment(
    conn: &mut DbConnection,
    post_id: i32,
    comment_id: i32,
) -> QueryResult<Option<Comment>> {
    comments::table
        .filter(comments::id.eq(comment_id))
        .filter(comments::post_id.eq(post_id))
        .select(Comment::as_select())
        .first(conn)
        .await
        .optional()
}

/// Append a comment.
///
/// # Errors
/// Returns any error produced by the insertion query.
#[must_use = "handle the result"]
pub async fn create_comment(conn: &mut DbConnection, comment: &NewComment<'_>) -> QueryResult<Comment> {
    diesel::insert_into(comments::table)
        .values(comment)
        .returning(Comment::as_returning())
        .get_result(conn)
        .await
}

/// Delete a comment.
///
/// # Errors
/// Returns any error produced by the delete query.
#[must_use = "handle the result"]
pub async fn delete_comment(conn: &mut DbConnection, comment_id: i32) -> QueryResult<usize> {
    diesel::delete(comments::table.find(comment_id))
        .execute(conn)
        .await
}
