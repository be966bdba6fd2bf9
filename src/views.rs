//! Typed JSON projections returned to clients.
//!
//! Every response body is built from one of these structs; row types never
//! leave the server and password hashes have no projection at all.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    access::Principal,
    error::{ServiceError, ServiceResult},
    kinds::{ArticleCategory, RelatedKind, RoleKind, ShopItemType, TransactionKind},
    models::{
        Category,
        Comment,
        Event,
        LearningArticle,
        MileTransaction,
        Role,
        ShopItem,
        User,
    },
};

fn utc(at: NaiveDateTime) -> DateTime<Utc> { at.and_utc() }

fn decode_list(raw: &str) -> ServiceResult<Vec<String>> { Ok(serde_json::from_str(raw)?) }

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoleView {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub kind: RoleKind,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl RoleView {
    /// Project a role row.
    ///
    /// # Errors
    /// Fails when stored kind or permissions no longer decode.
    pub fn from_row(role: &Role) -> ServiceResult<Self> {
        Ok(Self {
            id: role.id,
            name: role.name.clone(),
            description: role.description.clone(),
            kind: role.kind.parse().map_err(|e| ServiceError::corrupt(&e))?,
            permissions: decode_list(&role.permissions)?,
            created_at: utc(role.created_at),
        })
    }
}

/// Role reference embedded in channel and member projections.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RoleSummary {
    pub id: i32,
    pub name: String,
    pub description: String,
}

impl From<&Role> for RoleSummary {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id,
            name: role.name.clone(),
            description: role.description.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub avatar_url: Option<String>,
    pub native_language: Option<String>,
    pub learning_languages: Vec<String>,
    pub current_country: Option<String>,
    pub status_message: Option<String>,
    pub bio: Option<String>,
    pub instagram: Option<String>,
}

/// Notification preference flags; also accepted as request input.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub event_reminders: bool,
    pub new_posts: bool,
    pub new_learning: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub roles: Vec<RoleView>,
    pub profile: ProfileView,
    pub miles: i32,
    pub registered_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
    pub push_notification_settings: NotificationSettings,
    pub is_admin: bool,
    pub is_member: bool,
    pub is_visitor: bool,
}

impl UserView {
    /// Project a user together with its current role rows.
    ///
    /// # Errors
    /// Fails when a stored role or list column no longer decodes.
    pub fn build(user: &User, roles: &[Role]) -> ServiceResult<Self> {
        let roles = roles
            .iter()
            .map(RoleView::from_row)
            .collect::<ServiceResult<Vec<_>>>()?;
        let principal = Principal::new(user.id, roles.iter().map(|r| (r.id, r.kind)));
        Ok(Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            profile: ProfileView {
                avatar_url: user.avatar_url.clone(),
                native_language: user.native_language.clone(),
                learning_languages: decode_list(&user.learning_languages)?,
                current_country: user.current_country.clone(),
                status_message: user.status_message.clone(),
                bio: user.bio.clone(),
                instagram: user.instagram.clone(),
            },
            miles: user.miles,
            registered_at: utc(user.registered_at),
            last_login_at: utc(user.last_login_at),
            push_notification_settings: NotificationSettings {
                event_reminders: user.notify_event_reminders,
                new_posts: user.notify_new_posts,
                new_learning: user.notify_new_learning,
            },
            is_admin: principal.is_admin(),
            is_member: principal.is_member(),
            is_visitor: principal.is_visitor_only(),
            roles,
        })
    }
}

/// Minimal author/participant reference.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
    pub avatar_url: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Entry of the member directory.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub id: i32,
    pub username: String,
    pub avatar_url: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub roles: Vec<RoleSummary>,
}

impl MemberView {
    #[must_use]
    pub fn build(user: &User, roles: &[Role]) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            avatar_url: user.avatar_url.clone(),
            registered_at: utc(user.registered_at),
            roles: roles.iter().map(RoleSummary::from).collect(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub order: i32,
    pub created_at: DateTime<Utc>,
}

impl From<&Category> for CategoryView {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            description: category.description.clone(),
            order: category.position,
            created_at: utc(category.created_at),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelView {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub category: CategoryView,
    pub view_permissions: Vec<RoleSummary>,
    pub post_permissions: Vec<RoleSummary>,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_post: Option<bool>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: i32,
    pub user: UserSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl CommentView {
    #[must_use]
    pub fn build(comment: &Comment, author: &User) -> Self {
        Self {
            id: comment.id,
            user: UserSummary::from(author),
            content: comment.content.clone(),
            created_at: utc(comment.created_at),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: i32,
    pub channel_id: i32,
    pub author: UserSummary,
    pub content: String,
    pub images: Vec<String>,
    pub likes: Vec<UserSummary>,
    pub comments: Vec<CommentView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pricing {
    pub visitor: i32,
    pub member: i32,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub user: UserSummary,
    pub registered_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub flyer_image_url: Option<String>,
    pub date: DateTime<Utc>,
    pub venue: String,
    pub pricing: Pricing,
    pub participants: Vec<ParticipantView>,
    pub created_by: UserSummary,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_participating: Option<bool>,
}

impl EventView {
    #[must_use]
    pub fn build(event: &Event, creator: &User, participants: Vec<ParticipantView>) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            description: event.description.clone(),
            flyer_image_url: event.flyer_image_url.clone(),
            date: utc(event.starts_at),
            venue: event.venue.clone(),
            pricing: Pricing {
                visitor: event.visitor_price,
                member: event.member_price,
            },
            participants,
            created_by: UserSummary::from(creator),
            created_at: utc(event.created_at),
            is_participating: None,
        }
    }

    /// Annotate with whether `user_id` is registered.
    #[must_use]
    pub fn for_viewer(mut self, user_id: i32) -> Self {
        self.is_participating = Some(self.participants.iter().any(|p| p.user.id == user_id));
        self
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleView {
    pub id: i32,
    pub title: String,
    pub subtitle: Option<String>,
    pub cover_image_url: Option<String>,
    pub category: ArticleCategory,
    pub content_url: String,
    pub miles_reward: i32,
    pub created_by: UserSummary,
    pub created_at: DateTime<Utc>,
    pub completion_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<i32>,
}

impl ArticleView {
    /// Project an article row with its creator and completion count.
    ///
    /// # Errors
    /// Fails when the stored category no longer decodes.
    pub fn build(article: &LearningArticle, creator: &User, completions: i64) -> ServiceResult<Self> {
        Ok(Self {
            id: article.id,
            title: article.title.clone(),
            subtitle: article.subtitle.clone(),
            cover_image_url: article.cover_image_url.clone(),
            category: article
                .category
                .parse()
                .map_err(|e| ServiceError::corrupt(&e))?,
            content_url: article.content_url.clone(),
            miles_reward: article.miles_reward,
            created_by: UserSummary::from(creator),
            created_at: utc(article.created_at),
            completion_count: completions,
            is_completed: None,
            user_rating: None,
        })
    }

    /// Annotate with the viewer's completion state.
    #[must_use]
    pub const fn for_viewer(mut self, rating: Option<i32>) -> Self {
        self.is_completed = Some(rating.is_some());
        self.user_rating = rating;
        self
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShopItemView {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub mile_cost: i32,
    #[serde(rename = "type")]
    pub item_type: ShopItemType,
    pub discount_value: Option<i32>,
    pub stock: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl ShopItemView {
    /// Project a shop item row.
    ///
    /// # Errors
    /// Fails when the stored item type no longer decodes.
    pub fn from_row(item: &ShopItem) -> ServiceResult<Self> {
        Ok(Self {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            image_url: item.image_url.clone(),
            mile_cost: item.mile_cost,
            item_type: item
                .item_type
                .parse()
                .map_err(|e| ServiceError::corrupt(&e))?,
            discount_value: item.discount_value,
            stock: item.stock,
            active: item.active,
            created_at: utc(item.created_at),
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: i32,
    pub amount: i32,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub description: String,
    pub related_id: Option<i32>,
    pub related_type: Option<RelatedKind>,
    pub created_at: DateTime<Utc>,
}

impl TransactionView {
    /// Project a ledger row.
    ///
    /// # Errors
    /// Fails when a stored kind no longer decodes.
    pub fn from_row(tx: &MileTransaction) -> ServiceResult<Self> {
        let related_type = tx
            .related_type
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|e| ServiceError::corrupt(&e))?;
        Ok(Self {
            id: tx.id,
            amount: tx.amount,
            kind: tx.kind.parse().map_err(|e| ServiceError::corrupt(&e))?,
            description: tx.description.clone(),
            related_id: tx.related_id,
            related_type,
            created_at: utc(tx.created_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use rstest::{fixture, rstest};

    use super::*;

    fn ts() -> NaiveDateTime {
        DateTime::from_timestamp(1_700_000_000, 0)
            .expect("timestamp")
            .naive_utc()
    }

    fn role(id: i32, kind: RoleKind) -> Role {
        Role {
            id,
            name: format!("role-{id}"),
            description: String::new(),
            kind: kind.as_str().to_owned(),
            permissions: "[\"read\"]".to_owned(),
            created_at: ts(),
        }
    }

    #[fixture]
    fn user() -> User {
        User {
            id: 9,
            email: "alice@example.com".to_owned(),
            password: "$argon2id$secret".to_owned(),
            username: "alice".to_owned(),
            avatar_url: None,
            native_language: Some("ja".to_owned()),
            learning_languages: "[\"en\"]".to_owned(),
            current_country: None,
            status_message: None,
            bio: None,
            instagram: None,
            miles: 10,
            registered_at: ts(),
            last_login_at: ts(),
            notify_event_reminders: true,
            notify_new_posts: false,
            notify_new_learning: true,
        }
    }

    #[rstest]
    fn user_view_never_exposes_password(user: User) {
        let view = UserView::build(&user, &[role(3, RoleKind::Visitor)]).expect("view");
        let json = serde_json::to_value(&view).expect("json");
        assert!(json.get("password").is_none());
        assert_eq!(json["isVisitor"], true);
        assert_eq!(json["profile"]["learningLanguages"][0], "en");
        assert_eq!(json["pushNotificationSettings"]["newPosts"], false);
    }

    #[rstest]
    #[case(&[RoleKind::Visitor], false, false, true)]
    #[case(&[RoleKind::Visitor, RoleKind::Member], false, true, false)]
    #[case(&[RoleKind::Admin, RoleKind::Member], true, true, false)]
    #[case(&[RoleKind::Custom], false, false, false)]
    fn role_flags(
        user: User,
        #[case] kinds: &[RoleKind],
        #[case] admin: bool,
        #[case] member: bool,
        #[case] visitor: bool,
    ) {
        let roles: Vec<Role> = (1..).zip(kinds).map(|(id, kind)| role(id, *kind)).collect();
        let view = UserView::build(&user, &roles).expect("view");
        assert_eq!((view.is_admin, view.is_member, view.is_visitor), (admin, member, visitor));
    }

    #[rstest]
    fn corrupt_role_kind_is_internal() {
        let mut bad = role(1, RoleKind::Admin);
        bad.kind = "overlord".to_owned();
        assert!(matches!(RoleView::from_row(&bad), Err(ServiceError::Internal(_))));
    }

    #[rstest]
    fn shop_item_serialises_type_key() {
        let item = ShopItem {
            id: 1,
            name: "Ticket".to_owned(),
            description: String::new(),
            image_url: None,
            mile_cost: 30,
            item_type: "discount_ticket".to_owned(),
            discount_value: Some(0),
            stock: -1,
            active: true,
            created_at: ts(),
        };
        let json = serde_json::to_value(ShopItemView::from_row(&item).expect("view")).expect("json");
        assert_eq!(json["type"], "discount_ticket");
        assert_eq!(json["mileCost"], 30);
    }
}
