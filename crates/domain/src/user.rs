//! User, group, and permission rows mirrored from the remote backend,
//! plus the pure permission-derivation rules.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A backend account mirrored into the local store.
///
/// Rows are created or updated by the sync layer on mirror refresh and by
/// the session layer on first login; the core never deletes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Remote backend identifier.
    pub id: i64,
    /// Login name, unique on the remote backend.
    pub login: String,
    /// First name.
    pub firstname: String,
    /// Last name.
    pub lastname: String,
    /// Email address as the backend reports it.
    pub email: String,
    /// Whether the account holds the backend admin flag.
    pub admin: bool,
    /// Whether the account is active on the backend.
    pub active: bool,
    /// Identifiers of the groups this user belongs to.
    #[serde(default)]
    pub groups: Vec<i64>,
    /// Permission names granted directly to the user.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Local bookkeeping timestamp, stamped on insert.
    pub created_at: DateTime<Utc>,
    /// Local bookkeeping timestamp, stamped on every mutation.
    pub updated_at: DateTime<Utc>,
    /// Last successful login through this client, if any.
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Returns the display name composed from first and last name.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
            .trim()
            .to_owned()
    }

    /// Returns the bootstrap administrator seeded into an empty store.
    #[must_use]
    pub fn bootstrap_admin(now: DateTime<Utc>) -> Self {
        Self {
            id: 1,
            login: "admin".to_owned(),
            firstname: "Administrator".to_owned(),
            lastname: "User".to_owned(),
            email: "admin@dolimirror.local".to_owned(),
            admin: true,
            active: true,
            groups: Vec::new(),
            permissions: Vec::new(),
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }
}

/// A named bundle of permissions mirrored from the remote backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Remote backend identifier.
    pub id: i64,
    /// Group name.
    pub name: String,
    /// Optional free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Permission names granted through this group.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Local bookkeeping timestamp, stamped on insert.
    pub created_at: DateTime<Utc>,
    /// Local bookkeeping timestamp, stamped on every mutation.
    pub updated_at: DateTime<Utc>,
}

/// An atomic capability, namespaced by module as `"<module>_<verb>"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    /// Permission name, e.g. `user_read`.
    pub name: String,
    /// Module the permission belongs to, e.g. `user`.
    pub module: String,
    /// Optional human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Local bookkeeping timestamp, stamped on insert.
    pub created_at: DateTime<Utc>,
}

impl Permission {
    /// Returns the module prefix of a permission name, if it has one.
    #[must_use]
    pub fn module_of(name: &str) -> Option<&str> {
        let module = name.split('_').next().unwrap_or_default();
        (!module.is_empty() && module.len() < name.len()).then_some(module)
    }

    /// Returns the default permission rows seeded into an empty store.
    #[must_use]
    pub fn defaults(now: DateTime<Utc>) -> Vec<Self> {
        const SEED: &[(&str, &str, &str)] = &[
            ("user_read", "user", "Read users"),
            ("user_write", "user", "Write users"),
            ("user_delete", "user", "Delete users"),
            ("thirdparty_read", "thirdparty", "Read third parties"),
            ("thirdparty_write", "thirdparty", "Write third parties"),
            ("thirdparty_delete", "thirdparty", "Delete third parties"),
            ("group_read", "group", "Read groups"),
            ("group_write", "group", "Write groups"),
            ("group_delete", "group", "Delete groups"),
        ];

        SEED.iter()
            .map(|(name, module, description)| Self {
                name: (*name).to_owned(),
                module: (*module).to_owned(),
                description: Some((*description).to_owned()),
                created_at: now,
            })
            .collect()
    }
}

/// Derives the effective permission names for a user.
///
/// Admin accounts hold every known permission. Other accounts hold the
/// deduplicated union of their groups' permission lists and their direct
/// permissions, in first-seen order. The result depends only on the
/// arguments, so repeated derivation on unchanged input is stable.
#[must_use]
pub fn derive_permission_names(user: &User, groups: &[Group], known: &[Permission]) -> Vec<String> {
    if user.admin {
        return known.iter().map(|permission| permission.name.clone()).collect();
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut names = Vec::new();

    let group_grants = groups
        .iter()
        .filter(|group| user.groups.contains(&group.id))
        .flat_map(|group| group.permissions.iter());

    for name in group_grants.chain(user.permissions.iter()) {
        if seen.insert(name.as_str()) {
            names.push(name.clone());
        }
    }

    names
}

/// Returns whether a module is accessible given the derived session state.
///
/// Access is granted for admins, for any module with a non-empty rights
/// entry, and for any module with at least one `<module>_*` permission
/// (which covers the `<module>_all` grant).
#[must_use]
pub fn module_access_granted(
    module: &str,
    admin: bool,
    permissions: &[String],
    rights: &crate::Rights,
) -> bool {
    if admin {
        return true;
    }

    if rights.allows(module) {
        return true;
    }

    let prefix = format!("{module}_");
    permissions.iter().any(|name| name.starts_with(&prefix))
}

/// Returns the sorted set of modules the held permissions grant access to.
#[must_use]
pub fn accessible_modules(permissions: &[String]) -> Vec<String> {
    let modules: BTreeSet<&str> = permissions
        .iter()
        .filter_map(|name| Permission::module_of(name))
        .collect();

    modules.into_iter().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::Rights;

    use super::{
        Group, Permission, User, accessible_modules, derive_permission_names,
        module_access_granted,
    };

    fn user(admin: bool, groups: Vec<i64>, permissions: Vec<&str>) -> User {
        let now = Utc::now();
        User {
            id: 7,
            login: "toto".to_owned(),
            firstname: "Toto".to_owned(),
            lastname: "Martin".to_owned(),
            email: "toto@example.com".to_owned(),
            admin,
            active: true,
            groups,
            permissions: permissions.into_iter().map(str::to_owned).collect(),
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }

    fn group(id: i64, permissions: Vec<&str>) -> Group {
        let now = Utc::now();
        Group {
            id,
            name: format!("group-{id}"),
            description: None,
            permissions: permissions.into_iter().map(str::to_owned).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn admin_holds_every_known_permission() {
        let known = Permission::defaults(Utc::now());
        let derived = derive_permission_names(&user(true, Vec::new(), Vec::new()), &[], &known);

        assert_eq!(derived.len(), known.len());
        assert!(derived.contains(&"thirdparty_delete".to_owned()));
    }

    #[test]
    fn derivation_unions_groups_and_direct_permissions() {
        let groups = [
            group(1, vec!["user_read", "thirdparty_read"]),
            group(2, vec!["user_read", "group_read"]),
        ];
        let subject = user(false, vec![1, 2], vec!["thirdparty_write", "user_read"]);

        let derived = derive_permission_names(&subject, &groups, &[]);

        assert_eq!(
            derived,
            vec!["user_read", "thirdparty_read", "group_read", "thirdparty_write"]
        );
    }

    #[test]
    fn derivation_ignores_groups_the_user_is_not_in() {
        let groups = [group(1, vec!["user_read"]), group(9, vec!["group_delete"])];
        let subject = user(false, vec![1], Vec::new());

        let derived = derive_permission_names(&subject, &groups, &[]);

        assert_eq!(derived, vec!["user_read"]);
    }

    #[test]
    fn derivation_is_idempotent_on_unchanged_input() {
        let groups = [group(1, vec!["user_read", "user_write"])];
        let subject = user(false, vec![1], vec!["group_read"]);

        let first = derive_permission_names(&subject, &groups, &[]);
        let second = derive_permission_names(&subject, &groups, &[]);

        assert_eq!(first, second);
    }

    #[test]
    fn admin_can_access_any_module() {
        let rights = Rights::default();
        assert!(module_access_granted("anything", true, &[], &rights));
    }

    #[test]
    fn module_access_follows_permission_prefix() {
        let permissions = vec!["thirdparty_read".to_owned()];
        let rights = Rights::default();

        assert!(module_access_granted("thirdparty", false, &permissions, &rights));
        assert!(!module_access_granted("user", false, &permissions, &rights));
    }

    #[test]
    fn module_access_follows_rights_entries() {
        let mut rights = Rights::default();
        rights.grant("stock", "read");

        assert!(module_access_granted("stock", false, &[], &rights));
    }

    #[test]
    fn accessible_modules_are_deduplicated_prefixes() {
        let permissions = vec![
            "user_read".to_owned(),
            "user_write".to_owned(),
            "group_read".to_owned(),
            "standalone".to_owned(),
        ];

        assert_eq!(accessible_modules(&permissions), vec!["group", "user"]);
    }

    #[test]
    fn module_of_requires_a_separator() {
        assert_eq!(Permission::module_of("user_read"), Some("user"));
        assert_eq!(Permission::module_of("standalone"), None);
    }
}
