use database::traits::{DatabaseError, DeleteRepository, EntityRepository, InsertRepository};
use sqlx::Transaction;
use sqlx::types::Uuid;
use sqlx::types::chrono::{DateTime, Utc};

use crate::DB;

/// One-time code exchanged for a session at the auth callback.
#[derive(sqlx::FromRow, Debug, PartialEq, Eq, Clone)]
pub struct AuthCodesDAO {
    pub code: String,
    pub credential_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CreateAuthCodesDAO {
    pub code: String,
    pub credential_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum AuthCodesBy {
    Code(String),
}

#[derive(Debug, PartialEq, Eq)]
pub enum AuthCodesWhere {
    UnusedForCredential(Uuid),
}

#[derive(Debug)]
pub struct AuthCodesRepository;

#[database::async_trait::async_trait]
impl EntityRepository for AuthCodesRepository {
    type Db = DB;
    type Entity = AuthCodesDAO;
    type QueryOne = AuthCodesBy;
    type QueryMany = AuthCodesWhere;

    async fn try_get(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryOne,
    ) -> Result<Option<Self::Entity>, DatabaseError> {
        match key {
            AuthCodesBy::Code(code) => sqlx::query_as::<_, Self::Entity>(
                "SELECT code, credential_id, created_at, expires_at, used FROM auth_codes WHERE code = $1 LIMIT 1;",
            )
            .bind(code)
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
            AuthCodesWhere::UnusedForCredential(credential_id) => sqlx::query_as::<_, Self::Entity>(
                "SELECT code, credential_id, created_at, expires_at, used FROM auth_codes WHERE credential_id = $1 AND used = false ORDER BY created_at;",
            )
            .bind(credential_id)
            .fetch_all(&mut **tx)
            .await
            .map_err(DatabaseError::from),
        }
    }
}

#[database::async_trait::async_trait]
impl InsertRepository for AuthCodesRepository {
    type CreateInput = CreateAuthCodesDAO;

    async fn insert(
        tx: &mut Transaction<'_, Self::Db>,
        input: Self::CreateInput,
    ) -> Result<Self::Entity, DatabaseError> {
        sqlx::query_as::<_, Self::Entity>(
            "INSERT INTO auth_codes (code, credential_id, created_at, expires_at, used) VALUES ($1, $2, $3, $4, false) RETURNING code, credential_id, created_at, expires_at, used;",
        )
        .bind(input.code)
        .bind(input.credential_id)
        .bind(Utc::now())
        .bind(input.expires_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(DatabaseError::from)
    }
}

#[database::async_trait::async_trait]
impl DeleteRepository for AuthCodesRepository {
    /// Consumes the code. Returns `None` when it was already used or never existed.
    async fn delete(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryOne,
    ) -> Result<Option<Self::Entity>, DatabaseError> {
        match key {
            AuthCodesBy::Code(code) => sqlx::query_as::<_, Self::Entity>(
                "UPDATE auth_codes SET used = true WHERE code = $1 AND used = false RETURNING code, credential_id, created_at, expires_at, used;",
            )
            .bind(code)
            .fetch_optional(&mut **tx)
            .await
            .map_err(DatabaseError::from),
        }
    }
}

#[cfg(all(test, feature = "unit"))]
mod tests {
    use super::*;
    use crate::CredentialsRepository;
    use crate::entities::credentials::CreateCredentialsDAO;
    use crate::entities::testing;
    use chrono::Duration;

    #[tokio::test]
    async fn codes_are_consumed_once() {
        let pool = testing::pool().await;
        let mut tx = pool.begin().await.unwrap();
        let credential = CredentialsRepository::insert(
            &mut tx,
            CreateCredentialsDAO {
                email: "rep@pharma.com".to_string(),
                password: "hash".to_string(),
            },
        )
        .await
        .unwrap();

        AuthCodesRepository::insert(
            &mut tx,
            CreateAuthCodesDAO {
                code: "abc".to_string(),
                credential_id: credential.id,
                expires_at: Utc::now() + Duration::minutes(15),
            },
        )
        .await
        .unwrap();

        let unused =
            AuthCodesRepository::get_all(&mut tx, AuthCodesWhere::UnusedForCredential(credential.id))
                .await
                .unwrap();
        assert_eq!(unused.len(), 1);

        let consumed = AuthCodesRepository::delete(&mut tx, AuthCodesBy::Code("abc".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert!(consumed.used);
        assert!(
            AuthCodesRepository::delete(&mut tx, AuthCodesBy::Code("abc".to_string()))
                .await
                .unwrap()
                .is_none()
        );
    }
}
