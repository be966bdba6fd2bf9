//! Idempotent start-up seeding.
//!
//! Creates the built-in roles, the bootstrap administrator and the default
//! categories with their channels. Every step checks for an existing record
//! by name (or email) first, so running it on every start is harmless.

use argon2::Argon2;
use tracing::{info, warn};

use crate::{
    credentials::hash_password,
    db::{self, DbConnection},
    error::{ServiceError, ServiceResult},
    kinds::{PermissionAccess, RoleKind},
    models::{NewCategory, NewChannel, NewRole, NewUser, Role},
    services::auth::normalize_email,
};

/// Built-in roles as `(name, kind)`.
pub const BUILTIN_ROLES: [(&str, RoleKind); 3] = [
    ("Admin", RoleKind::Admin),
    ("Member", RoleKind::Member),
    ("Visitor", RoleKind::Visitor),
];

/// Credentials for the account created on first start.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    pub username: String,
}

impl BootstrapAdmin {
    /// Build from optional configuration values; all three must be set.
    #[must_use]
    pub fn from_parts(
        email: Option<&str>,
        password: Option<&str>,
        username: Option<&str>,
    ) -> Option<Self> {
        Some(Self {
            email: email?.to_owned(),
            password: password?.to_owned(),
            username: username?.to_owned(),
        })
    }
}

/// What a seeding run created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub roles: usize,
    pub admin: bool,
    pub categories: usize,
    pub channels: usize,
}

struct DefaultChannel {
    name: &'static str,
    description: &'static str,
    view: &'static [RoleKind],
    post: &'static [RoleKind],
}

struct DefaultCategory {
    name: &'static str,
    description: &'static str,
    order: i32,
    channel: Option<DefaultChannel>,
}

const DEFAULT_CATEGORIES: [DefaultCategory; 3] = [
    DefaultCategory {
        name: "Announcements",
        description: "Important announcements",
        order: 1,
        channel: Some(DefaultChannel {
            name: "General announcements",
            description: "Announcements for everyone",
            view: &[RoleKind::Admin, RoleKind::Member, RoleKind::Visitor],
            post: &[RoleKind::Admin],
        }),
    },
    DefaultCategory {
        name: "Lounge",
        description: "Free conversation space",
        order: 2,
        channel: Some(DefaultChannel {
            name: "Free talk",
            description: "Casual conversation between members",
            view: &[RoleKind::Admin, RoleKind::Member],
            post: &[RoleKind::Admin, RoleKind::Member],
        }),
    },
    DefaultCategory {
        name: "Learning",
        description: "Topics about learning",
        order: 3,
        channel: None,
    },
];

async fn ensure_roles(conn: &mut DbConnection, report: &mut SeedReport) -> ServiceResult<Vec<Role>> {
    let mut roles = Vec::with_capacity(BUILTIN_ROLES.len());
    for (name, kind) in BUILTIN_ROLES {
        if let Some(role) = db::roles::find_role_by_name(conn, name).await? {
            roles.push(role);
            continue;
        }
        let description = format!("{name} role");
        let role = db::roles::create_role(
            conn,
            &NewRole {
                name,
                description: &description,
                kind: kind.as_str(),
                permissions: "[]".to_owned(),
                created_at: db::now(),
            },
        )
        .await?;
        info!(role = name, "seeded role");
        report.roles += 1;
        roles.push(role);
    }
    Ok(roles)
}

fn ids_of(roles: &[Role], kinds: &[RoleKind]) -> Vec<i32> {
    roles
        .iter()
        .filter(|role| kinds.iter().any(|k| k.as_str() == role.kind))
        .map(|role| role.id)
        .collect()
}

async fn ensure_admin(
    conn: &mut DbConnection,
    argon2: &Argon2<'_>,
    roles: &[Role],
    admin: Option<&BootstrapAdmin>,
    report: &mut SeedReport,
) -> ServiceResult<()> {
    let Some(admin) = admin else {
        warn!("no bootstrap administrator configured");
        return Ok(());
    };
    let email = normalize_email(&admin.email);
    if db::users::find_user_by_email(conn, &email).await?.is_some() {
        return Ok(());
    }
    let hashed = hash_password(argon2, &admin.password)
        .map_err(|e| ServiceError::Internal(format!("password hashing failed: {e}")))?;
    let at = db::now();
    let user = db::users::create_user(
        conn,
        &NewUser {
            email: &email,
            password: &hashed,
            username: &admin.username,
            registered_at: at,
            last_login_at: at,
        },
    )
    .await?;
    for role_id in ids_of(roles, &[RoleKind::Admin, RoleKind::Member]) {
        db::users::grant_role(conn, user.id, role_id).await?;
    }
    info!(user_id = user.id, "seeded bootstrap administrator");
    report.admin = true;
    Ok(())
}

async fn ensure_categories(
    conn: &mut DbConnection,
    roles: &[Role],
    report: &mut SeedReport,
) -> ServiceResult<()> {
    for default in &DEFAULT_CATEGORIES {
        if db::categories::find_category_by_name(conn, default.name).await?.is_some() {
            continue;
        }
        let category = db::categories::create_category(
            conn,
            &NewCategory {
                name: default.name,
                description: default.description,
                position: default.order,
                created_at: db::now(),
            },
        )
        .await?;
        report.categories += 1;
        let Some(channel) = &default.channel else {
            continue;
        };
        let created = db::channels::create_channel(
            conn,
            &NewChannel {
                category_id: category.id,
                name: channel.name,
                description: channel.description,
                position: 1,
                created_at: db::now(),
            },
        )
        .await?;
        db::channels::replace_permissions(
            conn,
            created.id,
            PermissionAccess::View,
            &ids_of(roles, channel.view),
        )
        .await?;
        db::channels::replace_permissions(
            conn,
            created.id,
            PermissionAccess::Post,
            &ids_of(roles, channel.post),
        )
        .await?;
        report.channels += 1;
    }
    Ok(())
}

/// Bring the store to its baseline state.
///
/// # Errors
/// Returns any database or hashing error.
pub async fn seed(
    conn: &mut DbConnection,
    argon2: &Argon2<'_>,
    admin: Option<&BootstrapAdmin>,
) -> ServiceResult<SeedReport> {
    let mut report = SeedReport::default();
    let roles = ensure_roles(conn, &mut report).await?;
    ensure_admin(conn, argon2, &roles, admin, &mut report).await?;
    ensure_categories(conn, &roles, &mut report).await?;
    info!(?report, "seeding finished");
    Ok(report)
}
