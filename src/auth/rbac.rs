/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * A user holds one role; a role holds a set of `(resource, action)`
 * permissions. The set is loaded from the database on every request.
 */

use super::permissions::{split_permission, Actions, Resources};
use std::collections::HashSet;

/// Role seeded with the wildcard permission
pub const ADMIN_ROLE: &str = "admin";
/// Role seeded with read access to every resource
pub const STAFF_ROLE: &str = "staff";

/// Permission set of a single principal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    grants: HashSet<(String, String)>,
}

impl PermissionSet {
    pub fn new<I, R, A>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (R, A)>,
        R: Into<String>,
        A: Into<String>,
    {
        Self {
            grants: pairs
                .into_iter()
                .map(|(r, a)| (r.into(), a.into()))
                .collect(),
        }
    }

    fn contains(&self, resource: &str, action: &str) -> bool {
        self.grants
            .contains(&(resource.to_string(), action.to_string()))
    }

    /// Wildcard first, then `resource:*`, then the exact pair.
    pub fn allows(&self, resource: &str, action: &str) -> bool {
        self.contains(Resources::ALL, Actions::ALL)
            || self.contains(resource, Actions::ALL)
            || self.contains(resource, action)
    }

    /// Checks a `resource:action` string. Malformed strings are denied.
    pub fn allows_permission(&self, permission: &str) -> bool {
        match split_permission(permission) {
            Some((resource, action)) => self.allows(resource, action),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Sorted `resource:action` strings
    pub fn to_strings(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .grants
            .iter()
            .map(|(r, a)| format!("{}:{}", r, a))
            .collect();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn read_does_not_imply_write() {
        let set = PermissionSet::new([("items", "read")]);
        assert!(set.allows("items", "read"));
        assert!(!set.allows("items", "write"));
        assert!(!set.allows("orders", "read"));
    }

    #[rstest]
    #[case("items", "write")]
    #[case("roles", "delete")]
    #[case("anything", "at_all")]
    fn wildcard_allows_everything(#[case] resource: &str, #[case] action: &str) {
        let set = PermissionSet::new([("*", "*")]);
        assert!(set.allows(resource, action));
    }

    #[test]
    fn resource_wildcard_is_scoped() {
        let set = PermissionSet::new([("inventory", "*")]);
        assert!(set.allows("inventory", "write"));
        assert!(!set.allows("items", "write"));
    }

    #[test]
    fn empty_set_denies() {
        let set = PermissionSet::default();
        assert!(set.is_empty());
        assert!(!set.allows_permission("items:read"));
    }

    #[test]
    fn malformed_permission_is_denied() {
        let set = PermissionSet::new([("*", "*")]);
        assert!(!set.allows_permission("items"));
    }

    #[test]
    fn lists_sorted_strings() {
        let set = PermissionSet::new([("orders", "read"), ("items", "write")]);
        assert_eq!(set.to_strings(), vec!["items:write", "orders:read"]);
    }
}
