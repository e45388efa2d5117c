use std::{fmt, str::FromStr};

use async_trait::async_trait;
use erp_database::{
    DB, DatabaseError, ProfilesRepository,
    entities::profiles::{ProfilesBy, ProfilesDAO},
    traits::EntityRepository,
};
use serde::{Deserialize, Serialize};
use sqlx::Pool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Vendedor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Vendedor => "VENDEDOR",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoleError {
    #[error("role is not set")]
    Unset,
    #[error("unrecognized role {0:?}")]
    Unrecognized(String),
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "VENDEDOR" => Ok(Role::Vendedor),
            "" => Err(RoleError::Unset),
            other => Err(RoleError::Unrecognized(other.to_string())),
        }
    }
}

/// Profile row with its role decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub user_id: Uuid,
    pub role: Role,
    pub sales_rep_id: Option<Uuid>,
}

impl Profile {
    /// What a caller is treated as when their profile cannot be read.
    pub fn most_restrictive(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Vendedor,
            sales_rep_id: None,
        }
    }
}

impl TryFrom<ProfilesDAO> for Profile {
    type Error = RoleError;

    fn try_from(value: ProfilesDAO) -> Result<Self, Self::Error> {
        let role = value.role.as_deref().ok_or(RoleError::Unset)?.parse()?;

        Ok(Profile {
            user_id: value.user_id,
            role,
            sales_rep_id: value.sales_rep_id,
        })
    }
}

#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn profile(&self, user_id: Uuid) -> Result<Option<ProfilesDAO>, DatabaseError>;
}

pub struct SqlProfileSource {
    pool: Pool<DB>,
}

impl SqlProfileSource {
    pub fn new(pool: Pool<DB>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileSource for SqlProfileSource {
    async fn profile(&self, user_id: Uuid) -> Result<Option<ProfilesDAO>, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let profile = ProfilesRepository::try_get(&mut tx, ProfilesBy::UserId(user_id)).await?;
        tx.commit().await?;
        Ok(profile)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileResolution {
    Resolved(Profile),
    Unassigned(RoleError),
}

/// Reads and decodes the caller's profile. Read failures and missing rows
/// resolve to the most restrictive role; only a row whose role is unset or
/// unknown comes back as `Unassigned`.
pub async fn resolve_profile(source: &dyn ProfileSource, user_id: Uuid) -> ProfileResolution {
    match source.profile(user_id).await {
        Ok(Some(row)) => match Profile::try_from(row) {
            Ok(profile) => ProfileResolution::Resolved(profile),
            Err(e) => {
                tracing::warn!(%user_id, "profile has no usable role: {e}");
                ProfileResolution::Unassigned(e)
            }
        },
        Ok(None) => {
            tracing::warn!(%user_id, "no profile row, using most restrictive role");
            ProfileResolution::Resolved(Profile::most_restrictive(user_id))
        }
        Err(e) => {
            tracing::warn!(%user_id, "profile lookup failed, using most restrictive role: {e}");
            ProfileResolution::Resolved(Profile::most_restrictive(user_id))
        }
    }
}
