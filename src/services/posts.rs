//! Posts, likes and comments inside gated channels.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::info;

use super::{channels::access_for, referenced, required, users_by_id};
use crate::{
    access::{Principal, can_post, can_view, require_author_or_admin},
    db::{self, DbConnection},
    error::{ServiceError, ServiceResult},
    models::{NewComment, NewPost, Post, PostChanges, PostLike},
    views::{CommentView, PostView, UserSummary},
};

#[derive(Deserialize, Debug, Default)]
pub struct PostInput {
    pub channel: Option<i32>,
    pub content: Option<String>,
    pub images: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default)]
pub struct PostEdit {
    pub content: Option<String>,
    pub images: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default)]
pub struct CommentInput {
    pub content: Option<String>,
}

async fn require_view(conn: &mut DbConnection, who: &Principal, channel_id: i32) -> ServiceResult<()> {
    let access = access_for(conn, channel_id).await?;
    if can_view(who, &access) {
        Ok(())
    } else {
        Err(ServiceError::forbidden(
            "you do not have permission to view this channel",
        ))
    }
}

async fn project(conn: &mut DbConnection, posts: Vec<Post>) -> ServiceResult<Vec<PostView>> {
    let ids: Vec<i32> = posts.iter().map(|p| p.id).collect();
    let authors = users_by_id(conn, posts.iter().map(|p| p.author_id)).await?;

    let mut likes: HashMap<i32, Vec<UserSummary>> = HashMap::new();
    for (like, user) in db::posts::likes_for_posts(conn, &ids).await? {
        likes.entry(like.post_id).or_default().push(UserSummary::from(&user));
    }
    let mut comments: HashMap<i32, Vec<CommentView>> = HashMap::new();
    for (comment, author) in db::posts::comments_for_posts(conn, &ids).await? {
        comments
            .entry(comment.post_id)
            .or_default()
            .push(CommentView::build(&comment, &author));
    }

    posts
        .into_iter()
        .map(|post| -> ServiceResult<PostView> {
            Ok(PostView {
                id: post.id,
                channel_id: post.channel_id,
                author: UserSummary::from(referenced(&authors, post.author_id)?),
                images: serde_json::from_str(&post.images)?,
                likes: likes.remove(&post.id).unwrap_or_default(),
                comments: comments.remove(&post.id).unwrap_or_default(),
                created_at: post.created_at.and_utc(),
                updated_at: post.updated_at.and_utc(),
                content: post.content,
            })
        })
        .collect()
}

async fn post_view(conn: &mut DbConnection, post: Post) -> ServiceResult<PostView> {
    project(conn, vec![post])
        .await?
        .pop()
        .ok_or_else(|| ServiceError::not_found("post"))
}

async fn find_post(conn: &mut DbConnection, post_id: i32) -> ServiceResult<Post> {
    db::posts::find_post(conn, post_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("post"))
}

/// A viewable post, looked up for an interaction.
async fn visible_post(conn: &mut DbConnection, who: &Principal, post_id: i32) -> ServiceResult<Post> {
    let post = find_post(conn, post_id).await?;
    require_view(conn, who, post.channel_id).await?;
    Ok(post)
}

/// Posts of a channel, newest first.
///
/// # Errors
/// Returns `NotFound` for an unknown channel and `Forbidden` when the
/// caller may not view it.
pub async fn list_posts(
    conn: &mut DbConnection,
    who: &Principal,
    channel_id: i32,
) -> ServiceResult<Vec<PostView>> {
    require_view(conn, who, channel_id).await?;
    let posts = db::posts::posts_in_channel(conn, channel_id).await?;
    project(conn, posts).await
}

/// Publish a post.
///
/// # Errors
/// Returns `Validation` for missing fields, `NotFound` for an unknown
/// channel and `Forbidden` when the caller may not post there.
pub async fn create_post(
    conn: &mut DbConnection,
    who: &Principal,
    input: PostInput,
) -> ServiceResult<PostView> {
    let channel_id = input.channel.ok_or_else(|| ServiceError::missing("channel"))?;
    let content = required("content", input.content)?;
    let access = access_for(conn, channel_id).await?;
    if !can_post(who, &access) {
        return Err(ServiceError::forbidden(
            "you do not have permission to post in this channel",
        ));
    }
    let at = db::now();
    let post = db::posts::create_post(
        conn,
        &NewPost {
            channel_id,
            author_id: who.user_id,
            content: &content,
            images: serde_json::to_string(&input.images.unwrap_or_default())?,
            created_at: at,
            updated_at: at,
        },
    )
    .await?;
    info!(post_id = post.id, channel_id, "post created");
    post_view(conn, post).await
}

/// Edit a post's content or images.
///
/// # Errors
/// Returns `NotFound` for an unknown post and `Forbidden` unless the caller
/// wrote the post or is an admin.
pub async fn update_post(
    conn: &mut DbConnection,
    who: &Principal,
    post_id: i32,
    input: PostEdit,
) -> ServiceResult<PostView> {
    let post = find_post(conn, post_id).await?;
    require_author_or_admin(who, post.author_id, "edit this post")?;
    let changes = PostChanges {
        content: super::non_blank("content", input.content)?,
        images: input.images.map(|i| serde_json::to_string(&i)).transpose()?,
        updated_at: db::now(),
    };
    let post = db::posts::update_post(conn, post_id, &changes)
        .await?
        .ok_or_else(|| ServiceError::not_found("post"))?;
    post_view(conn, post).await
}

/// Delete a post with its likes and comments.
///
/// # Errors
/// Returns `NotFound` for an unknown post and `Forbidden` unless the caller
/// wrote the post or is an admin.
pub async fn delete_post(conn: &mut DbConnection, who: &Principal, post_id: i32) -> ServiceResult<()> {
    let post = find_post(conn, post_id).await?;
    require_author_or_admin(who, post.author_id, "delete this post")?;
    db::posts::delete_post(conn, post_id).await?;
    info!(post_id, deleted_by = who.user_id, "post deleted");
    Ok(())
}

/// Like the post, or withdraw an existing like.
///
/// # Errors
/// Returns `NotFound` for an unknown post and `Forbidden` when the caller
/// may not view its channel.
pub async fn toggle_like(conn: &mut DbConnection, who: &Principal, post_id: i32) -> ServiceResult<PostView> {
    let post = visible_post(conn, who, post_id).await?;
    if db::posts::has_liked(conn, post_id, who.user_id).await? {
        db::posts::remove_like(conn, post_id, who.user_id).await?;
    } else {
        db::posts::add_like(
            conn,
            &PostLike {
                post_id,
                user_id: who.user_id,
                created_at: db::now(),
            },
        )
        .await?;
    }
    post_view(conn, post).await
}

/// Append a comment.
///
/// # Errors
/// Returns `Validation` for empty content, `NotFound` for an unknown post
/// and `Forbidden` when the caller may not view its channel.
pub async fn add_comment(
    conn: &mut DbConnection,
    who: &Principal,
    post_id: i32,
    input: CommentInput,
) -> ServiceResult<PostView> {
    let content = required("content", input.content)?;
    let post = visible_post(conn, who, post_id).await?;
    db::posts::create_comment(
        conn,
        &NewComment {
            post_id,
            author_id: who.user_id,
            content: &content,
            created_at: db::now(),
        },
    )
    .await?;
    post_view(conn, post).await
}

/// Remove a comment.
///
/// # Errors
/// Returns `NotFound` for an unknown post or comment and `Forbidden` unless
/// the caller wrote the comment or is an admin.
pub async fn delete_comment(
    conn: &mut DbConnection,
    who: &Principal,
    post_id: i32,
    comment_id: i32,
) -> ServiceResult<PostView> {
    let post = find_post(conn, post_id).await?;
    let comment = db::posts::find_comment(conn, post_id, comment_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("comment"))?;
    require_author_or_admin(who, comment.author_id, "delete this comment")?;
    db::posts::delete_comment(conn, comment_id).await?;
    post_view(conn, post).await
}
