//! # Commands
//!
//! The operations the checkout UI invokes. Each command authorizes the
//! caller's [`Session`] before touching any data.
//!
//! ```text
//! Session { role: "cashier" }
//!      │
//!      ▼
//! resolve_role ── built-in? ──► Role
//!      │              no
//!      ▼
//! RoleStore::find_role ───────► Role / PermissionDenied
//!      │
//!      ▼
//! Role::require(permission)
//! ```

pub mod cart;
pub mod discount;
pub mod roles;

pub use cart::{CartService, CheckoutStore};
pub use discount::DiscountAdmin;
pub use roles::RoleAdmin;

use tracing::debug;

use crate::error::ApiResult;
use kassa_core::ports::RoleStore;
use kassa_core::roles::{builtin_role, normalize_role_name};
use kassa_core::{CoreError, Permission, Role, Session};

/// Resolves a role name: built-ins first, then the role store.
pub(crate) async fn resolve_role<S: RoleStore>(store: &S, name: &str) -> ApiResult<Option<Role>> {
    if let Some(role) = builtin_role(name) {
        return Ok(Some(role));
    }
    Ok(store.find_role(&normalize_role_name(name)).await?)
}

/// Fails with `PermissionDenied` unless the session's role grants
/// `permission`. Unknown roles grant nothing.
pub(crate) async fn authorize<S: RoleStore>(
    store: &S,
    session: &Session,
    permission: Permission,
) -> ApiResult<()> {
    debug!(user_id = %session.user_id, role = %session.role, %permission, "Authorizing");

    match resolve_role(store, &session.role).await? {
        Some(role) => Ok(role.require(permission)?),
        None => Err(CoreError::PermissionDenied {
            role: session.role.clone(),
            permission,
        }
        .into()),
    }
}
