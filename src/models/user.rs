use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

pub type UserId = i64;

/// Marketplace role of a principal. Conversations only ever cross roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Customer,
    Vendor,
}

impl UserRole {
    /// The only role this role may exchange messages with
    pub fn opposite(self) -> Self {
        match self {
            UserRole::Customer => UserRole::Vendor,
            UserRole::Vendor => UserRole::Customer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Vendor => "vendor",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(UserRole::Customer),
            "vendor" => Ok(UserRole::Vendor),
            other => Err(format!("Unknown user role: {}", other)),
        }
    }
}

/// Raw `users` row as owned by the authentication collaborator
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: UserId,
    pub username: String,
    pub business_name: Option<String>,
    pub avatar: Option<String>,
    pub role: String,
    pub is_active: bool,
}

/// Read-only view of a user, as far as messaging is concerned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub business_name: Option<String>,
    pub avatar: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
}

impl UserProfile {
    /// Business name when the user has one, otherwise the bare username
    pub fn display_name(&self) -> &str {
        match self.business_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }

    /// Whether `self` may hold a conversation with a user of `role`
    pub fn can_converse_with(&self, role: UserRole) -> bool {
        self.is_active && self.role.opposite() == role
    }
}

impl TryFrom<UserRow> for UserProfile {
    type Error = String;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            role: row.role.parse()?,
            username: row.username,
            business_name: row.business_name,
            avatar: row.avatar,
            is_active: row.is_active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(business_name: Option<&str>) -> UserProfile {
        UserProfile {
            id: 1,
            username: "greengrocer42".to_string(),
            business_name: business_name.map(str::to_string),
            avatar: None,
            role: UserRole::Vendor,
            is_active: true,
        }
    }

    #[test]
    fn test_display_name_prefers_business_name() {
        assert_eq!(profile(Some("Green Grocer")).display_name(), "Green Grocer");
        assert_eq!(profile(None).display_name(), "greengrocer42");
        assert_eq!(profile(Some("   ")).display_name(), "greengrocer42");
    }

    #[test]
    fn test_role_parsing_and_opposite() {
        assert_eq!("Vendor".parse::<UserRole>().unwrap(), UserRole::Vendor);
        assert!("admin".parse::<UserRole>().is_err());
        assert_eq!(UserRole::Customer.opposite(), UserRole::Vendor);
        assert_eq!(UserRole::Vendor.opposite(), UserRole::Customer);
    }

    #[test]
    fn test_inactive_user_cannot_converse() {
        let mut vendor = profile(None);
        assert!(vendor.can_converse_with(UserRole::Customer));
        assert!(!vendor.can_converse_with(UserRole::Vendor));
        vendor.is_active = false;
        assert!(!vendor.can_converse_with(UserRole::Customer));
    }
}
