//! # Role Administration
//!
//! Built-in roles (`admin`, `manager`, `cashier`) are compiled in and
//! read-only. Custom roles live in the role store and are looked up after
//! the built-ins, so a custom role can never shadow one.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::commands::{authorize, resolve_role};
use crate::error::ApiResult;
use kassa_core::ports::RoleStore;
use kassa_core::roles::{builtin_role, builtin_roles, normalize_role_name};
use kassa_core::validation::validate_role_name;
use kassa_core::{CoreError, Permission, Role, Session};

/// Role administration. Mutations and listing require
/// [`Permission::ManageRoles`].
#[derive(Debug, Clone)]
pub struct RoleAdmin<S> {
    store: S,
}

impl<S: RoleStore> RoleAdmin<S> {
    pub fn new(store: S) -> Self {
        RoleAdmin { store }
    }

    /// Creates or replaces a custom role.
    pub async fn save_custom_role(
        &self,
        session: &Session,
        name: &str,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> ApiResult<Role> {
        authorize(&self.store, session, Permission::ManageRoles).await?;
        debug!(role = %name, "save_custom_role command");

        validate_role_name(name)?;
        if builtin_role(name).is_some() {
            return Err(CoreError::BuiltinRoleImmutable(name.trim().to_string()).into());
        }

        let role = Role::custom(name, permissions);
        self.store.save_role(&role).await?;

        info!(role = %role.name, permissions = role.permissions.len(), "Custom role saved");
        Ok(role)
    }

    pub async fn delete_custom_role(&self, session: &Session, name: &str) -> ApiResult<()> {
        authorize(&self.store, session, Permission::ManageRoles).await?;
        debug!(role = %name, "delete_custom_role command");

        if builtin_role(name).is_some() {
            return Err(CoreError::BuiltinRoleImmutable(name.trim().to_string()).into());
        }

        let name = normalize_role_name(name);
        if !self.store.delete_role(&name).await? {
            return Err(CoreError::RoleNotFound(name).into());
        }

        info!(role = %name, "Custom role deleted");
        Ok(())
    }

    /// Built-in roles followed by custom roles.
    pub async fn list_roles(&self, session: &Session) -> ApiResult<Vec<Role>> {
        authorize(&self.store, session, Permission::ManageRoles).await?;

        let mut roles = builtin_roles();
        roles.extend(self.store.list_roles().await?);
        Ok(roles)
    }

    /// Permissions granted by a role; unknown roles grant nothing.
    pub async fn permissions_for(&self, role_name: &str) -> ApiResult<BTreeSet<Permission>> {
        Ok(resolve_role(&self.store, role_name)
            .await?
            .map(|role| role.permissions)
            .unwrap_or_default())
    }
}
