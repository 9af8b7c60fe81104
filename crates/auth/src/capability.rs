//! Capability evaluation against stored permission grants.
//!
//! "View" is not a stored flag: it is implied by holding any stronger
//! capability on the page.

use serde::{Deserialize, Serialize};

use edugate_core::{GroupId, PageId};

/// Abstract capability requested by a protected operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    View,
    Insert,
    Update,
    Delete,
}

impl Capability {
    /// Parse a capability name. The set is closed; unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "view" => Some(Self::View),
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored capability set for one (group, page) pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub group_id: GroupId,
    pub page_id: PageId,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl PermissionGrant {
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::View => self.create || self.update || self.delete,
            Capability::Insert => self.create,
            Capability::Update => self.update,
            Capability::Delete => self.delete,
        }
    }
}

/// Decide whether `grant` satisfies the requested capability name.
///
/// - No grant: never.
/// - Unknown capability name: never.
pub fn evaluate(grant: Option<&PermissionGrant>, requested: &str) -> bool {
    match (grant, Capability::parse(requested)) {
        (Some(grant), Some(capability)) => grant.allows(capability),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grant(create: bool, update: bool, delete: bool) -> PermissionGrant {
        PermissionGrant {
            group_id: GroupId::new(3),
            page_id: PageId::new(10),
            create,
            update,
            delete,
        }
    }

    #[test]
    fn stored_flags_map_one_to_one() {
        let g = grant(true, false, false);
        assert!(evaluate(Some(&g), "insert"));
        assert!(!evaluate(Some(&g), "update"));
        assert!(!evaluate(Some(&g), "delete"));

        let g = grant(false, false, true);
        assert!(evaluate(Some(&g), "delete"));
        assert!(!evaluate(Some(&g), "insert"));
    }

    #[test]
    fn view_requires_some_stronger_flag() {
        assert!(!evaluate(Some(&grant(false, false, false)), "view"));
        assert!(evaluate(Some(&grant(false, true, false)), "view"));
    }

    #[test]
    fn unknown_capabilities_never_grant() {
        let all = grant(true, true, true);
        assert!(!evaluate(Some(&all), "create"));
        assert!(!evaluate(Some(&all), "admin"));
        assert!(!evaluate(Some(&all), ""));
    }

    #[test]
    fn capability_names_are_case_insensitive() {
        assert_eq!(Capability::parse(" Update "), Some(Capability::Update));
        assert_eq!(Capability::parse("VIEW"), Some(Capability::View));
    }

    proptest! {
        #[test]
        fn view_is_any_of_the_stored_flags(create: bool, update: bool, delete: bool) {
            let g = grant(create, update, delete);
            prop_assert_eq!(evaluate(Some(&g), "view"), create || update || delete);
        }

        #[test]
        fn absent_grant_never_allows(requested in "[a-zA-Z]{0,12}") {
            prop_assert!(!evaluate(None, &requested));
        }
    }
}
