//! Row types mapped onto the tables in [`crate::schema`].
//!
//! Rows mirror the storage layout. List-valued columns (permissions, images,
//! learning languages) hold JSON arrays encoded as text and are decoded when
//! rows are projected into [`crate::views`].

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::schema::{
    categories,
    channel_permissions,
    channels,
    comments,
    event_participants,
    events,
    learning_articles,
    learning_completions,
    mile_transactions,
    post_likes,
    posts,
    roles,
    shop_items,
    user_roles,
    users,
};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = roles)]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub kind: String,
    pub permissions: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = roles)]
pub struct NewRole<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub kind: &'a str,
    pub permissions: String,
    pub created_at: NaiveDateTime,
}

#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = roles)]
pub struct RoleChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<String>,
}

impl RoleChanges {
    /// Whether applying the changeset would touch no column.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.permissions.is_none()
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub password: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub native_language: Option<String>,
    pub learning_languages: String,
    pub current_country: Option<String>,
    pub status_message: Option<String>,
    pub bio: Option<String>,
    pub instagram: Option<String>,
    pub miles: i32,
    pub registered_at: NaiveDateTime,
    pub last_login_at: NaiveDateTime,
    pub notify_event_reminders: bool,
    pub notify_new_posts: bool,
    pub notify_new_learning: bool,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub username: &'a str,
    pub registered_at: NaiveDateTime,
    pub last_login_at: NaiveDateTime,
}

/// Partial profile update; `None` leaves the stored value untouched.
#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = users)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub native_language: Option<String>,
    pub learning_languages: Option<String>,
    pub current_country: Option<String>,
    pub status_message: Option<String>,
    pub bio: Option<String>,
    pub instagram: Option<String>,
}

impl ProfileChanges {
    /// Whether applying the changeset would touch no column.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.avatar_url.is_none()
            && self.native_language.is_none()
            && self.learning_languages.is_none()
            && self.current_country.is_none()
            && self.status_message.is_none()
            && self.bio.is_none()
            && self.instagram.is_none()
    }
}

#[derive(AsChangeset, Debug, Clone, Copy)]
#[diesel(table_name = users)]
pub struct NotificationChanges {
    pub notify_event_reminders: bool,
    pub notify_new_posts: bool,
    pub notify_new_learning: bool,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, Copy)]
#[diesel(table_name = user_roles)]
pub struct UserRole {
    pub user_id: i32,
    pub role_id: i32,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = categories)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub position: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = categories)]
pub struct NewCategory<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub position: i32,
    pub created_at: NaiveDateTime,
}

#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = categories)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub position: Option<i32>,
}

impl CategoryChanges {
    /// Whether applying the changeset would touch no column.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.position.is_none()
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = channels)]
pub struct Channel {
    pub id: i32,
    pub category_id: i32,
    pub name: String,
    pub description: String,
    pub position: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = channels)]
pub struct NewChannel<'a> {
    pub category_id: i32,
    pub name: &'a str,
    pub description: &'a str,
    pub position: i32,
    pub created_at: NaiveDateTime,
}

#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = channels)]
pub struct ChannelChanges {
    pub category_id: Option<i32>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub position: Option<i32>,
}

impl ChannelChanges {
    /// Whether applying the changeset would touch no column.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.category_id.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.position.is_none()
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = channel_permissions)]
pub struct ChannelPermission {
    pub channel_id: i32,
    pub role_id: i32,
    pub access: String,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = posts)]
pub struct Post {
    pub id: i32,
    pub channel_id: i32,
    pub author_id: i32,
    pub content: String,
    pub images: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = posts)]
pub struct NewPost<'a> {
    pub channel_id: i32,
    pub author_id: i32,
    pub content: &'a str,
    pub images: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = posts)]
pub struct PostChanges {
    pub content: Option<String>,
    pub images: Option<String>,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = post_likes)]
pub struct PostLike {
    pub post_id: i32,
    pub user_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = comments)]
pub struct Comment {
    pub id: i32,
    pub post_id: i32,
    pub author_id: i32,
    pub content: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = comments)]
pub struct NewComment<'a> {
    pub post_id: i32,
    pub author_id: i32,
    pub content: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = events)]
pub struct Event {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub flyer_image_url: Option<String>,
    pub starts_at: NaiveDateTime,
    pub venue: String,
    pub visitor_price: i32,
    pub member_price: i32,
    pub created_by: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = events)]
pub struct NewEvent<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub flyer_image_url: Option<&'a str>,
    pub starts_at: NaiveDateTime,
    pub venue: &'a str,
    pub visitor_price: i32,
    pub member_price: i32,
    pub created_by: i32,
    pub created_at: NaiveDateTime,
}

#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = events)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub flyer_image_url: Option<String>,
    pub starts_at: Option<NaiveDateTime>,
    pub venue: Option<String>,
    pub visitor_price: Option<i32>,
    pub member_price: Option<i32>,
}

impl EventChanges {
    /// Whether applying the changeset would touch no column.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.flyer_image_url.is_none()
            && self.starts_at.is_none()
            && self.venue.is_none()
            && self.visitor_price.is_none()
            && self.member_price.is_none()
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = event_participants)]
pub struct EventParticipant {
    pub event_id: i32,
    pub user_id: i32,
    pub registered_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = learning_articles)]
pub struct LearningArticle {
    pub id: i32,
    pub title: String,
    pub subtitle: Option<String>,
    pub cover_image_url: Option<String>,
    pub category: String,
    pub content_url: String,
    pub miles_reward: i32,
    pub created_by: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = learning_articles)]
pub struct NewLearningArticle<'a> {
    pub title: &'a str,
    pub subtitle: Option<&'a str>,
    pub cover_image_url: Option<&'a str>,
    pub category: &'a str,
    pub content_url: &'a str,
    pub miles_reward: i32,
    pub created_by: i32,
    pub created_at: NaiveDateTime,
}

#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = learning_articles)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub cover_image_url: Option<String>,
    pub category: Option<String>,
    pub content_url: Option<String>,
    pub miles_reward: Option<i32>,
}

impl ArticleChanges {
    /// Whether applying the changeset would touch no column.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.subtitle.is_none()
            && self.cover_image_url.is_none()
            && self.category.is_none()
            && self.content_url.is_none()
            && self.miles_reward.is_none()
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = learning_completions)]
pub struct LearningCompletion {
    pub article_id: i32,
    pub user_id: i32,
    pub rating: i32,
    pub completed_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = shop_items)]
pub struct ShopItem {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub mile_cost: i32,
    pub item_type: String,
    pub discount_value: Option<i32>,
    pub stock: i32,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = shop_items)]
pub struct NewShopItem<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub image_url: Option<&'a str>,
    pub mile_cost: i32,
    pub item_type: &'a str,
    pub discount_value: Option<i32>,
    pub stock: i32,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = shop_items)]
pub struct ShopItemChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub mile_cost: Option<i32>,
    pub item_type: Option<String>,
    pub discount_value: Option<i32>,
    pub stock: Option<i32>,
    pub active: Option<bool>,
}

impl ShopItemChanges {
    /// Whether applying the changeset would touch no column.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.image_url.is_none()
            && self.mile_cost.is_none()
            && self.item_type.is_none()
            && self.discount_value.is_none()
            && self.stock.is_none()
            && self.active.is_none()
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = mile_transactions)]
pub struct MileTransaction {
    pub id: i32,
    pub user_id: i32,
    pub amount: i32,
    pub kind: String,
    pub description: String,
    pub related_id: Option<i32>,
    pub related_type: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = mile_transactions)]
pub struct NewMileTransaction<'a> {
    pub user_id: i32,
    pub amount: i32,
    pub kind: &'a str,
    pub description: &'a str,
    pub related_id: Option<i32>,
    pub related_type: Option<&'a str>,
    pub created_at: NaiveDateTime,
}
