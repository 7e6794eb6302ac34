//! # Roles & Permissions
//!
//! Three built-in roles are compiled in; custom roles live in a persistent
//! store (`ports::RoleStore`) so they survive restarts and are shared by every
//! instance pointing at the same database.
//!
//! ```text
//! permission check for role "shift-lead"
//!      │
//!      ├── builtin_role("shift-lead")?  ── admin / manager / cashier
//!      │
//!      └── RoleStore::find_role("shift-lead")
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

pub const ADMIN_ROLE: &str = "admin";
pub const MANAGER_ROLE: &str = "manager";
pub const CASHIER_ROLE: &str = "cashier";

/// Something a role may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Create carts, add/update/remove items, set customer, clear.
    ManageCart,
    /// Attach and detach discounts on a cart.
    ApplyDiscount,
    /// Create, update and deactivate discount policies.
    ManageDiscounts,
    /// Create and delete custom roles.
    ManageRoles,
}

impl Permission {
    pub const ALL: [Permission; 4] = [
        Permission::ManageCart,
        Permission::ApplyDiscount,
        Permission::ManageDiscounts,
        Permission::ManageRoles,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ManageCart => "manage_cart",
            Permission::ApplyDiscount => "apply_discount",
            Permission::ManageDiscounts => "manage_discounts",
            Permission::ManageRoles => "manage_roles",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ValidationError::invalid("permission", format!("unknown permission '{}'", s)))
    }
}

/// A named set of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub name: String,
    pub permissions: BTreeSet<Permission>,
    /// Compiled-in roles cannot be overwritten or deleted.
    pub builtin: bool,
}

impl Role {
    /// A custom (store-backed) role. The name is normalized to lowercase.
    pub fn custom(name: &str, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Role {
            name: normalize_role_name(name),
            permissions: permissions.into_iter().collect(),
            builtin: false,
        }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Fails with `PermissionDenied` unless the role grants `permission`.
    pub fn require(&self, permission: Permission) -> CoreResult<()> {
        if self.allows(permission) {
            Ok(())
        } else {
            Err(CoreError::PermissionDenied {
                role: self.name.clone(),
                permission,
            })
        }
    }
}

pub fn normalize_role_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Looks up one of the compiled-in roles.
pub fn builtin_role(name: &str) -> Option<Role> {
    let permissions: &[Permission] = match normalize_role_name(name).as_str() {
        ADMIN_ROLE => &Permission::ALL,
        MANAGER_ROLE => &[
            Permission::ManageCart,
            Permission::ApplyDiscount,
            Permission::ManageDiscounts,
        ],
        CASHIER_ROLE => &[Permission::ManageCart, Permission::ApplyDiscount],
        _ => return None,
    };

    Some(Role {
        name: normalize_role_name(name),
        permissions: permissions.iter().copied().collect(),
        builtin: true,
    })
}

pub fn builtin_roles() -> Vec<Role> {
    [ADMIN_ROLE, MANAGER_ROLE, CASHIER_ROLE]
        .into_iter()
        .filter_map(builtin_role)
        .collect()
}
