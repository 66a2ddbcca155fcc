use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Account role. The set is closed; see [`Role::from_stored`] for how
/// unexpected stored values are treated.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Manager,
    Staf,
    #[default]
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Manager => "Manager",
            Role::Staf => "Staf",
            Role::User => "User",
        }
    }

    /// Decodes a stored role. Anything other than Admin, Staf or User is a Manager.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "Admin" => Role::Admin,
            "Staf" => Role::Staf,
            "User" => Role::User,
            _ => Role::Manager,
        }
    }

    pub fn can_list_users(self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

/// Account record as returned to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 hash, never exposed
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Raw row; `role` is free text in the table.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: OffsetDateTime,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            email: r.email,
            password_hash: r.password_hash,
            role: Role::from_stored(&r.role),
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_stored_role_is_manager() {
        assert_eq!(Role::from_stored("Admin"), Role::Admin);
        assert_eq!(Role::from_stored("Staf"), Role::Staf);
        assert_eq!(Role::from_stored("User"), Role::User);
        assert_eq!(Role::from_stored("Manager"), Role::Manager);
        assert_eq!(Role::from_stored("Owner"), Role::Manager);
        assert_eq!(Role::from_stored("admin"), Role::Manager);
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::default(),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"User\""));
        assert!(json.contains("createdAt"));
    }
}
