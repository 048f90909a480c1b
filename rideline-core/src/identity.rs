use serde::{Deserialize, Serialize};

/// Roles carried by bearer credentials. A credential that names no role is
/// treated as the least-privileged one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    /// Whether this role meets a required role. Admin satisfies every
    /// requirement; user satisfies only user-level requirements.
    pub fn satisfies(self, required: Role) -> bool {
        match required {
            Role::User => true,
            Role::Admin => self == Role::Admin,
        }
    }
}

/// The minimal identity attached to a request after the access gate has
/// verified its credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub subject: String,
    pub role: Role,
}

impl AuthIdentity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, thiserror::Error)]
#[error("requires role {required:?}")]
pub struct Forbidden {
    pub required: Role,
}

pub fn require_role(identity: &AuthIdentity, required: Role) -> Result<(), Forbidden> {
    if identity.role.satisfies(required) {
        Ok(())
    } else {
        Err(Forbidden { required })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_role_is_rejected_where_admin_is_required() {
        let identity = AuthIdentity {
            subject: "rider-1".to_string(),
            role: Role::User,
        };
        assert!(require_role(&identity, Role::Admin).is_err());
        assert!(require_role(&identity, Role::User).is_ok());
    }

    #[test]
    fn admin_satisfies_both_levels() {
        let identity = AuthIdentity {
            subject: "staff-1".to_string(),
            role: Role::Admin,
        };
        assert!(require_role(&identity, Role::Admin).is_ok());
        assert!(require_role(&identity, Role::User).is_ok());
    }

    #[test]
    fn missing_role_defaults_to_user() {
        #[derive(serde::Deserialize)]
        struct Claims {
            #[serde(default)]
            role: Role,
        }
        let claims: Claims = serde_json::from_str("{}").unwrap();
        assert_eq!(claims.role, Role::User);
    }
}
