use database::traits::{
    DatabaseError, DeleteRepository, EntityRepository, InsertRepository, UpdateRepository,
};
use sqlx::Transaction;
use sqlx::types::Uuid;
use sqlx::types::chrono::{DateTime, Utc};

use crate::DB;

#[derive(sqlx::FromRow, Debug, PartialEq, Eq, Clone)]
pub struct SessionsDAO {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub credential_id: Uuid,
    pub active: bool,
}

impl SessionsDAO {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at > now
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CreateSessionsDAO {
    pub expires_at: DateTime<Utc>,
    pub credential_id: Uuid,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct UpdateSessionsDAO {
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SessionsBy {
    Id(Uuid),
}

#[derive(Debug, PartialEq, Eq)]
pub enum SessionsWhere {
    ActiveForCredential(Uuid),
}

#[derive(Debug)]
pub struct SessionsRepository;

#[database::async_trait::async_trait]
impl EntityRepository for SessionsRepository {
    type Db = DB;
    type Entity = SessionsDAO;
    type QueryOne = SessionsBy;
    type QueryMany = SessionsWhere;

    async fn try_get(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryOne,
    ) -> Result<Option<Self::Entity>, DatabaseError> {
        match key {
            SessionsBy::Id(id) => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, created_at, expires_at, credential_id, active FROM sessions WHERE id = $1 LIMIT 1;",
            )
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(DatabaseError::from),
        }
    }

    async fn get_all(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryMany,
    ) -> Result<Vec<Self::Entity>, DatabaseError> {
        match key {
            SessionsWhere::ActiveForCredential(credential_id) => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, created_at, expires_at, credential_id, active FROM sessions WHERE credential_id = $1 AND active = true ORDER BY created_at;",
            )
            .bind(credential_id)
            .fetch_all(&mut **tx)
            .await
            .map_err(DatabaseError::from),
        }
    }
}

#[database::async_trait::async_trait]
impl InsertRepository for SessionsRepository {
    type CreateInput = CreateSessionsDAO;

    async fn insert(
        tx: &mut Transaction<'_, Self::Db>,
        input: Self::CreateInput,
    ) -> Result<Self::Entity, DatabaseError> {
        sqlx::query_as::<_, Self::Entity>(
            "INSERT INTO sessions (id, created_at, expires_at, credential_id, active) VALUES ($1, $2, $3, $4, true) RETURNING id, created_at, expires_at, credential_id, active;",
        )
        .bind(Uuid::new_v4())
        .bind(Utc::now())
        .bind(input.expires_at)
        .bind(input.credential_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(DatabaseError::from)
    }
}

#[database::async_trait::async_trait]
impl UpdateRepository for SessionsRepository {
    type UpdateInput = UpdateSessionsDAO;

    /// Only live sessions can be extended.
    async fn update(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryOne,
        update: Self::UpdateInput,
    ) -> Result<Self::Entity, DatabaseError> {
        match key {
            SessionsBy::Id(id) => sqlx::query_as::<_, Self::Entity>(
                "UPDATE sessions SET expires_at = $2 WHERE id = $1 AND active = true RETURNING id, created_at, expires_at, credential_id, active;",
            )
            .bind(id)
            .bind(update.expires_at)
            .fetch_one(&mut **tx)
            .await
            .map_err(DatabaseError::from),
        }
    }
}

#[database::async_trait::async_trait]
impl DeleteRepository for SessionsRepository {
    async fn delete(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryOne,
    ) -> Result<Option<Self::Entity>, DatabaseError> {
        match key {
            SessionsBy::Id(id) => sqlx::query_as::<_, Self::Entity>(
                "UPDATE sessions SET active = false WHERE id = $1 AND active = true RETURNING id, created_at, expires_at, credential_id, active;",
            )
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(DatabaseError::from),
        }
    }
}
