//! Closed vocabularies stored as text columns.
//!
//! Each enumeration round-trips through its lowercase wire name, which is
//! also the value persisted in the database. Unknown names are rejected at
//! the boundary with [`UnknownVariant`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A text value did not name any variant of the target enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    /// Human readable name of the enumeration.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire and storage name of the variant.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $label,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

text_enum! {
    /// Behavioural class of a role, independent of its display name.
    RoleKind, "role kind" {
        /// Full administrative access.
        Admin => "admin",
        /// Paying community member.
        Member => "member",
        /// Default role granted at signup.
        Visitor => "visitor",
        /// Any role created through the roles API.
        Custom => "custom",
    }
}

text_enum! {
    /// Topic tag attached to a learning article.
    ArticleCategory, "article category" {
        English => "english",
        Communication => "communication",
        CrossCultural => "cross_cultural",
        OtherLanguages => "other_languages",
        Motivation => "motivation",
    }
}

text_enum! {
    /// What a shop item grants once purchased.
    ShopItemType, "item type" {
        DiscountTicket => "discount_ticket",
        Material => "material",
        Other => "other",
    }
}

text_enum! {
    /// Direction of a ledger entry.
    TransactionKind, "transaction type" {
        /// Miles awarded by the platform.
        Earn => "earn",
        /// Miles consumed by the user.
        Spend => "spend",
        /// Miles bought with real money.
        Purchase => "purchase",
    }
}

text_enum! {
    /// Kind of record a ledger entry points at.
    RelatedKind, "related type" {
        Learning => "learning",
        Event => "event",
        Shop => "shop",
        Other => "other",
    }
}

text_enum! {
    /// Channel access level a role is granted.
    PermissionAccess, "permission access" {
        View => "view",
        Post => "post",
    }
}

impl TransactionKind {
    /// Signed contribution of an entry of this kind to the balance.
    #[must_use]
    pub fn signed(self, amount: i32) -> i64 {
        let amount = i64::from(amount);
        match self {
            Self::Earn | Self::Purchase => amount,
            Self::Spend => -amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("admin", RoleKind::Admin)]
    #[case("member", RoleKind::Member)]
    #[case("visitor", RoleKind::Visitor)]
    #[case("custom", RoleKind::Custom)]
    fn role_kind_parses_storage_names(#[case] text: &str, #[case] expected: RoleKind) {
        assert_eq!(text.parse::<RoleKind>(), Ok(expected));
        assert_eq!(expected.as_str(), text);
    }

    #[rstest]
    fn unknown_names_are_rejected() {
        let err = "Member".parse::<RoleKind>().expect_err("case sensitive");
        assert_eq!(err.kind, "role kind");
        assert_eq!(err.to_string(), "unknown role kind 'Member'");
    }

    #[rstest]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&ShopItemType::DiscountTicket).expect("serialize");
        assert_eq!(json, "\"discount_ticket\"");
        let parsed: ArticleCategory =
            serde_json::from_str("\"cross_cultural\"").expect("deserialize");
        assert_eq!(parsed, ArticleCategory::CrossCultural);
    }

    #[rstest]
    #[case(TransactionKind::Earn, 10)]
    #[case(TransactionKind::Purchase, 10)]
    #[case(TransactionKind::Spend, -10)]
    fn signed_amounts(#[case] kind: TransactionKind, #[case] expected: i64) {
        assert_eq!(kind.signed(10), expected);
    }
}
