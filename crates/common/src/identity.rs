//! Caller identity supplied by the authentication collaborator.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Role attached to an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

/// The authenticated principal behind a call into the core.
///
/// The core never authenticates; it only trusts what the identity layer
/// hands it and applies ownership and role checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn customer(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Customer,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Returns true if the caller owns the resource or is an admin.
    pub fn can_access(&self, owner: UserId) -> bool {
        self.is_admin() || self.user_id == owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_and_admin_can_access() {
        let owner = UserId::new();
        assert!(Caller::customer(owner).can_access(owner));
        assert!(Caller::admin(UserId::new()).can_access(owner));
        assert!(!Caller::customer(UserId::new()).can_access(owner));
    }
}
