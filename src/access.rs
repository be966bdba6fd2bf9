//! Role-based access decisions.
//!
//! A [`Principal`] is the authenticated caller with its current role set.
//! Channel visibility and posting rights are pure set intersections between
//! the caller's role ids and the channel's permission lists; no role kind
//! bypasses a channel's lists.

use std::collections::BTreeSet;

use bitflags::bitflags;

use crate::{
    error::{ServiceError, ServiceResult},
    kinds::RoleKind,
};

bitflags! {
    /// Set of role kinds held by a principal.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RoleKinds: u8 {
        const ADMIN = 1 << 0;
        const MEMBER = 1 << 1;
        const VISITOR = 1 << 2;
        const CUSTOM = 1 << 3;
    }
}

impl From<RoleKind> for RoleKinds {
    fn from(kind: RoleKind) -> Self {
        match kind {
            RoleKind::Admin => Self::ADMIN,
            RoleKind::Member => Self::MEMBER,
            RoleKind::Visitor => Self::VISITOR,
            RoleKind::Custom => Self::CUSTOM,
        }
    }
}

/// Authenticated caller resolved from a bearer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i32,
    role_ids: BTreeSet<i32>,
    kinds: RoleKinds,
}

impl Principal {
    /// Build a principal from `(role id, kind)` pairs.
    #[must_use]
    pub fn new(user_id: i32, roles: impl IntoIterator<Item = (i32, RoleKind)>) -> Self {
        let mut role_ids = BTreeSet::new();
        let mut kinds = RoleKinds::empty();
        for (id, kind) in roles {
            role_ids.insert(id);
            kinds |= RoleKinds::from(kind);
        }
        Self {
            user_id,
            role_ids,
            kinds,
        }
    }

    #[must_use]
    pub const fn role_ids(&self) -> &BTreeSet<i32> { &self.role_ids }

    #[must_use]
    pub const fn kinds(&self) -> RoleKinds { self.kinds }

    #[must_use]
    pub const fn is_admin(&self) -> bool { self.kinds.contains(RoleKinds::ADMIN) }

    #[must_use]
    pub const fn is_member(&self) -> bool { self.kinds.contains(RoleKinds::MEMBER) }

    /// True only when the sole role held is a visitor role.
    #[must_use]
    pub fn is_visitor_only(&self) -> bool {
        self.role_ids.len() == 1 && self.kinds == RoleKinds::VISITOR
    }
}

/// View and post role lists of a single channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelAccess {
    pub view: BTreeSet<i32>,
    pub post: BTreeSet<i32>,
}

/// Whether `who` may read the channel.
#[must_use]
pub fn can_view(who: &Principal, channel: &ChannelAccess) -> bool {
    !who.role_ids.is_disjoint(&channel.view)
}

/// Whether `who` may post into the channel.
#[must_use]
pub fn can_post(who: &Principal, channel: &ChannelAccess) -> bool {
    !who.role_ids.is_disjoint(&channel.post)
}

/// Whether `who` holds at least one role of the given kinds.
#[must_use]
pub const fn has_role(who: &Principal, kinds: RoleKinds) -> bool { who.kinds.intersects(kinds) }

/// Reject callers without an admin role.
///
/// # Errors
/// Returns [`ServiceError::Forbidden`] for non-admin callers.
pub fn require_admin(who: &Principal) -> ServiceResult<()> {
    if who.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::forbidden("administrator role required"))
    }
}

/// Reject callers that neither own the record nor hold an admin role.
///
/// # Errors
/// Returns [`ServiceError::Forbidden`] naming the attempted action.
pub fn require_author_or_admin(who: &Principal, author_id: i32, action: &str) -> ServiceResult<()> {
    if who.user_id == author_id || who.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::forbidden(format!(
            "you do not have permission to {action}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn channel(view: &[i32], post: &[i32]) -> ChannelAccess {
        ChannelAccess {
            view: view.iter().copied().collect(),
            post: post.iter().copied().collect(),
        }
    }

    #[rstest]
    fn visitor_only_requires_a_single_visitor_role() {
        let visitor = Principal::new(1, [(3, RoleKind::Visitor)]);
        assert!(visitor.is_visitor_only());
        let promoted = Principal::new(1, [(3, RoleKind::Visitor), (2, RoleKind::Member)]);
        assert!(!promoted.is_visitor_only());
        assert!(promoted.is_member());
        let nobody = Principal::new(1, []);
        assert!(!nobody.is_visitor_only());
    }

    #[rstest]
    fn empty_view_list_hides_channel_from_admins() {
        let admin = Principal::new(1, [(1, RoleKind::Admin)]);
        assert!(!can_view(&admin, &channel(&[], &[1])));
        assert!(can_post(&admin, &channel(&[], &[1])));
    }

    #[rstest]
    #[case(RoleKinds::ADMIN, false)]
    #[case(RoleKinds::MEMBER, true)]
    #[case(RoleKinds::ADMIN | RoleKinds::MEMBER, true)]
    fn has_role_intersects_kinds(#[case] wanted: RoleKinds, #[case] expected: bool) {
        let member = Principal::new(7, [(2, RoleKind::Member)]);
        assert_eq!(has_role(&member, wanted), expected);
    }

    #[rstest]
    fn admin_gate() {
        let admin = Principal::new(1, [(1, RoleKind::Admin)]);
        let member = Principal::new(2, [(2, RoleKind::Member)]);
        assert!(require_admin(&admin).is_ok());
        assert!(matches!(require_admin(&member), Err(ServiceError::Forbidden(_))));
    }

    #[rstest]
    #[case(5, true)]
    #[case(6, false)]
    fn author_gate(#[case] author: i32, #[case] allowed: bool) {
        let caller = Principal::new(5, [(2, RoleKind::Member)]);
        assert_eq!(
            require_author_or_admin(&caller, author, "edit this post").is_ok(),
            allowed
        );
    }

    proptest! {
        #[test]
        fn gate_matches_set_intersection(
            held in proptest::collection::btree_set(0i32..8, 0..4),
            view in proptest::collection::btree_set(0i32..8, 0..4),
            post in proptest::collection::btree_set(0i32..8, 0..4),
        ) {
            let who = Principal::new(1, held.iter().map(|id| (*id, RoleKind::Custom)));
            let access = ChannelAccess { view: view.clone(), post: post.clone() };
            prop_assert_eq!(can_view(&who, &access), held.intersection(&view).next().is_some());
            prop_assert_eq!(can_post(&who, &access), held.intersection(&post).next().is_some());
        }
    }
}
