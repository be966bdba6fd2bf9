//! Role administration.

use serde::Deserialize;
use tracing::info;

use super::{non_blank, required};
use crate::{
    access::{Principal, require_admin},
    db::{self, DbConnection},
    error::{ServiceError, ServiceResult},
    kinds::RoleKind,
    models::{NewRole, RoleChanges},
    views::RoleView,
};

#[derive(Deserialize, Debug, Default)]
pub struct RoleInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
    pub kind: Option<String>,
}

/// All roles in creation order.
///
/// # Errors
/// Returns any database or decoding error.
pub async fn list_roles(conn: &mut DbConnection) -> ServiceResult<Vec<RoleView>> {
    db::roles::list_roles(conn)
        .await?
        .iter()
        .map(RoleView::from_row)
        .collect()
}

/// Create a role; the kind defaults to `custom`.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers, `Validation` for a missing
/// name or unknown kind and `Conflict` for a duplicate name.
pub async fn create_role(
    conn: &mut DbConnection,
    who: &Principal,
    input: RoleInput,
) -> ServiceResult<RoleView> {
    require_admin(who)?;
    let name = required("name", input.name)?;
    let kind = input
        .kind
        .as_deref()
        .map(str::parse::<RoleKind>)
        .transpose()?
        .unwrap_or(RoleKind::Custom);
    if db::roles::find_role_by_name(conn, &name).await?.is_some() {
        return Err(ServiceError::Conflict(format!("role '{name}' already exists")));
    }
    let role = db::roles::create_role(
        conn,
        &NewRole {
            name: &name,
            description: input.description.as_deref().unwrap_or_default(),
            kind: kind.as_str(),
            permissions: serde_json::to_string(&input.permissions.unwrap_or_default())?,
            created_at: db::now(),
        },
    )
    .await?;
    info!(role_id = role.id, %kind, "role created");
    RoleView::from_row(&role)
}

/// Rename or re-describe a role; its kind is fixed at creation.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers and `NotFound` for unknown ids.
pub async fn update_role(
    conn: &mut DbConnection,
    who: &Principal,
    role_id: i32,
    input: RoleInput,
) -> ServiceResult<RoleView> {
    require_admin(who)?;
    let changes = RoleChanges {
        name: non_blank("name", input.name)?,
        description: input.description,
        permissions: input
            .permissions
            .map(|p| serde_json::to_string(&p))
            .transpose()?,
    };
    let role = db::roles::update_role(conn, role_id, &changes)
        .await?
        .ok_or_else(|| ServiceError::not_found("role"))?;
    RoleView::from_row(&role)
}

/// Delete a role, dropping it from every user and channel list.
///
/// Admin and visitor roles are kept because signup and administration
/// depend on them.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers, `NotFound` for unknown ids and
/// `Conflict` for the admin and visitor roles.
pub async fn delete_role(conn: &mut DbConnection, who: &Principal, role_id: i32) -> ServiceResult<()> {
    require_admin(who)?;
    let role = db::roles::find_role(conn, role_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("role"))?;
    let kind: RoleKind = role.kind.parse().map_err(|e| ServiceError::corrupt(&e))?;
    if matches!(kind, RoleKind::Admin | RoleKind::Visitor) {
        return Err(ServiceError::Conflict(format!(
            "the {kind} role cannot be deleted"
        )));
    }
    db::roles::delete_role(conn, role_id).await?;
    info!(role_id, "role deleted");
    Ok(())
}
