use serde::Serialize;

use super::repo_types::{Role, User};

/// Number of accounts per role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCounts {
    pub total_admins: usize,
    pub total_managers: usize,
    pub total_stafs: usize,
    pub total_users: usize,
}

impl RoleCounts {
    pub fn tally<'a>(users: impl IntoIterator<Item = &'a User>) -> Self {
        users.into_iter().fold(Self::default(), |mut acc, user| {
            match user.role {
                Role::Admin => acc.total_admins += 1,
                Role::Staf => acc.total_stafs += 1,
                Role::User => acc.total_users += 1,
                Role::Manager => acc.total_managers += 1,
            }
            acc
        })
    }

    #[cfg(test)]
    pub fn sum(&self) -> usize {
        self.total_admins + self.total_managers + self.total_stafs + self.total_users
    }
}
