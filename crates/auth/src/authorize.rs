use serde::{Deserialize, Serialize};

use farmlink_core::{DomainError, DomainResult, UserId};

use crate::Role;

/// The authenticated caller, as derived from verified claims.
///
/// Construction is decoupled from transport: the API middleware builds one
/// per request, and tests build them directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }
}

/// Pure role gate. Admins pass every gate; everyone else needs the exact role.
pub fn require_role(principal: &Principal, needed: Role) -> DomainResult<()> {
    if principal.role == needed || principal.role == Role::Admin {
        Ok(())
    } else {
        Err(DomainError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal::new(UserId::new(), role)
    }

    #[test]
    fn matching_role_passes() {
        require_role(&principal(Role::Farmer), Role::Farmer).unwrap();
        require_role(&principal(Role::Buyer), Role::Buyer).unwrap();
    }

    #[test]
    fn mismatched_role_is_unauthorized() {
        let err = require_role(&principal(Role::Buyer), Role::Farmer).unwrap_err();
        assert_eq!(err, DomainError::Unauthorized);
    }

    #[test]
    fn admin_passes_every_gate() {
        require_role(&principal(Role::Admin), Role::Farmer).unwrap();
        require_role(&principal(Role::Admin), Role::Buyer).unwrap();
    }

    #[test]
    fn role_strings_round_trip() {
        for role in [Role::Farmer, Role::Buyer, Role::Admin] {
            let parsed: Role = role.as_str().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("vendor".parse::<Role>().is_err());
    }
}
