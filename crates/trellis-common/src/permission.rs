//! Trellis Permission - Permission Tokens and Roles
//!
//! Documents carry their permission set as strings of the form
//! `action("role")`. This module provides the constructors and parser for
//! those tokens plus the role vocabulary consumed by the authorization gate.
//!
//! @version 0.1.0
//! @author Trellis Development Team

use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission actions understood by the gate.
pub const PERMISSION_CREATE: &str = "create";
pub const PERMISSION_READ: &str = "read";
pub const PERMISSION_UPDATE: &str = "update";
pub const PERMISSION_DELETE: &str = "delete";
/// Aggregate action covering create, update, and delete.
pub const PERMISSION_WRITE: &str = "write";

// =============================================================================
// Role
// =============================================================================

/// A role token an identity can hold and a permission can name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role(String);

impl Role {
    /// Everyone, authenticated or not.
    pub fn any() -> Self {
        Self("any".to_string())
    }

    /// Any unauthenticated identity.
    pub fn guests() -> Self {
        Self("guests".to_string())
    }

    /// Any authenticated user.
    pub fn users() -> Self {
        Self("users".to_string())
    }

    /// One specific user.
    pub fn user(id: impl Into<String>) -> Self {
        Self(format!("user:{}", id.into()))
    }

    /// All members of one team.
    pub fn team(id: impl Into<String>) -> Self {
        Self(format!("team:{}", id.into()))
    }

    /// All identities carrying a label.
    pub fn label(name: impl Into<String>) -> Self {
        Self(format!("label:{}", name.into()))
    }

    /// An arbitrary pre-formatted role token.
    pub fn custom(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.0
    }
}

// =============================================================================
// Permission
// =============================================================================

/// Constructors and parsing for `action("role")` permission strings.
pub struct Permission;

impl Permission {
    pub fn create(role: Role) -> String {
        Self::format(PERMISSION_CREATE, &role)
    }

    pub fn read(role: Role) -> String {
        Self::format(PERMISSION_READ, &role)
    }

    pub fn update(role: Role) -> String {
        Self::format(PERMISSION_UPDATE, &role)
    }

    pub fn delete(role: Role) -> String {
        Self::format(PERMISSION_DELETE, &role)
    }

    pub fn write(role: Role) -> String {
        Self::format(PERMISSION_WRITE, &role)
    }

    fn format(action: &str, role: &Role) -> String {
        format!("{}(\"{}\")", action, role)
    }

    /// Parse a permission string into its (action, role) parts.
    ///
    /// Tolerates unquoted roles and surrounding whitespace; returns `None`
    /// for strings that are not `action("role")` shaped.
    pub fn parse(permission: &str) -> Option<(String, String)> {
        let open = permission.find('(')?;
        let close = permission.rfind(')')?;
        if close <= open {
            return None;
        }

        let action = permission[..open].trim();
        if action.is_empty() {
            return None;
        }

        let role = permission[open + 1..close]
            .trim()
            .trim_matches('"')
            .trim();
        if role.is_empty() {
            return None;
        }

        Some((action.to_string(), role.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_tokens() {
        assert_eq!(Role::any().as_str(), "any");
        assert_eq!(Role::user("alice").as_str(), "user:alice");
        assert_eq!(Role::team("dev").as_str(), "team:dev");
    }

    #[test]
    fn test_permission_format() {
        assert_eq!(Permission::read(Role::any()), "read(\"any\")");
        assert_eq!(
            Permission::update(Role::user("alice")),
            "update(\"user:alice\")"
        );
    }

    #[test]
    fn test_permission_parse() {
        assert_eq!(
            Permission::parse("read(\"any\")"),
            Some(("read".to_string(), "any".to_string()))
        );
        assert_eq!(
            Permission::parse("update(user:bob)"),
            Some(("update".to_string(), "user:bob".to_string()))
        );
        assert_eq!(Permission::parse("garbage"), None);
        assert_eq!(Permission::parse("()"), None);
    }

    #[test]
    fn test_parse_round_trip() {
        let token = Permission::delete(Role::team("ops"));
        assert_eq!(
            Permission::parse(&token),
            Some(("delete".to_string(), "team:ops".to_string()))
        );
    }
}
