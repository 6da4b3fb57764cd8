use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

/// Role
///
/// The three staff tiers a user account can hold. Stored in the `user_role`
/// Postgres enum and carried as an upper-case string inside the token claims.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    Manager,
    TeamLeader,
    FloorStaff,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Manager, Role::TeamLeader, Role::FloorStaff];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "MANAGER",
            Role::TeamLeader => "TEAMLEADER",
            Role::FloorStaff => "FLOORSTAFF",
        }
    }

    /// Whether this role may perform `operation` on the movie resource.
    pub fn allows(self, operation: Operation) -> bool {
        match (self, operation) {
            (Role::Manager, _) => true,
            (Role::TeamLeader | Role::FloorStaff, Operation::Delete) => false,
            (Role::TeamLeader | Role::FloorStaff, _) => true,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a role string is not one of the three known tiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Operation
///
/// The four verbs gated on the movie resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// is_allowed
///
/// The role matrix as a total function over the raw role string found in a
/// verified token. Anything that does not name a known role is denied.
///
/// | Role       | create | read | update | delete |
/// |------------|--------|------|--------|--------|
/// | MANAGER    | yes    | yes  | yes    | yes    |
/// | TEAMLEADER | yes    | yes  | yes    | no     |
/// | FLOORSTAFF | yes    | yes  | yes    | no     |
pub fn is_allowed(role: &str, operation: Operation) -> bool {
    role.parse::<Role>()
        .map(|role| role.allows(operation))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_matches_fixed_table() {
        let expected = [
            ("MANAGER", [true, true, true, true]),
            ("TEAMLEADER", [true, true, true, false]),
            ("FLOORSTAFF", [true, true, true, false]),
        ];

        for (role, row) in expected {
            for (operation, allowed) in Operation::ALL.into_iter().zip(row) {
                assert_eq!(
                    is_allowed(role, operation),
                    allowed,
                    "{role} / {operation}"
                );
            }
        }
    }

    #[test]
    fn test_unknown_role_is_always_denied() {
        for role in ["", "ADMIN", "manager", "Manager ", "MANAGER\0"] {
            for operation in Operation::ALL {
                assert!(!is_allowed(role, operation), "{role:?} / {operation}");
            }
        }
    }

    #[test]
    fn test_only_manager_may_delete() {
        let deleters: Vec<Role> = Role::ALL
            .into_iter()
            .filter(|role| role.allows(Operation::Delete))
            .collect();
        assert_eq!(deleters, vec![Role::Manager]);
    }

    #[test]
    fn test_role_string_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert_eq!(
            serde_json::to_string(&Role::TeamLeader).unwrap(),
            r#""TEAMLEADER""#
        );
    }
}
