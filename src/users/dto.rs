use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{
    pagination::PageRef,
    repo_types::{Role, User},
    stats::RoleCounts,
};
use crate::images::repo::ProfileRecord;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersResponse {
    pub total_users: usize,
    pub role_counts: RoleCounts,
    pub users: Vec<User>,
    pub page: i64,
    pub limit: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<PageRef>,
}

/// Partial update; absent fields are left as they are.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub message: &'static str,
    pub data: User,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub data: ProfileRecord,
}

/// Projection used by the by-month listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for MonthlyUser {
    fn from(u: User) -> Self {
        Self {
            name: u.name,
            email: u.email,
            role: u.role,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MonthlyUsersResponse {
    pub data: Vec<MonthlyUser>,
}
