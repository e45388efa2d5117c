use database::traits::{DatabaseError, EntityRepository, InsertRepository, UpdateRepository};
use sqlx::{Transaction, types::Uuid};

use crate::DB;

#[derive(sqlx::FromRow, Debug, PartialEq, Eq, Clone)]
pub struct CredentialsDAO {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub active: bool,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CreateCredentialsDAO {
    pub email: String,
    pub password: String,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct UpdateCredentialsDAO {
    pub password: String,
    pub active: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CredentialsBy {
    Id(Uuid),
    Email(String),
}

#[derive(Debug, PartialEq, Eq)]
pub enum CredentialsWhere {
    Active(bool),
}

#[derive(Debug)]
pub struct CredentialsRepository;

#[database::async_trait::async_trait]
impl EntityRepository for CredentialsRepository {
    type Db = DB;
    type Entity = CredentialsDAO;
    type QueryOne = CredentialsBy;
    type QueryMany = CredentialsWhere;

    async fn try_get(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryOne,
    ) -> Result<Option<Self::Entity>, DatabaseError> {
        match key {
            CredentialsBy::Id(id) => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, email, password, active FROM credentials WHERE id = $1 LIMIT 1;",
            )
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(DatabaseError::from),
            CredentialsBy::Email(email) => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, email, password, active FROM credentials WHERE email = $1 LIMIT 1;",
            )
            .bind(email)
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
            CredentialsWhere::Active(active) => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, email, password, active FROM credentials WHERE active = $1 ORDER BY email;",
            )
            .bind(active)
            .fetch_all(&mut **tx)
            .await
            .map_err(DatabaseError::from),
        }
    }
}

#[database::async_trait::async_trait]
impl InsertRepository for CredentialsRepository {
    type CreateInput = CreateCredentialsDAO;

    async fn insert(
        tx: &mut Transaction<'_, Self::Db>,
        input: Self::CreateInput,
    ) -> Result<Self::Entity, DatabaseError> {
        sqlx::query_as::<_, Self::Entity>(
            "INSERT INTO credentials (id, email, password, active) VALUES ($1, $2, $3, true) RETURNING id, email, password, active;",
        )
        .bind(Uuid::new_v4())
        .bind(input.email)
        .bind(input.password)
        .fetch_one(&mut **tx)
        .await
        .map_err(DatabaseError::from)
    }
}

#[database::async_trait::async_trait]
impl UpdateRepository for CredentialsRepository {
    type UpdateInput = UpdateCredentialsDAO;

    async fn update(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryOne,
        update: Self::UpdateInput,
    ) -> Result<Self::Entity, DatabaseError> {
        match key {
            CredentialsBy::Id(id) => sqlx::query_as::<_, Self::Entity>(
                "UPDATE credentials SET password = $2, active = $3 WHERE id = $1 RETURNING id, email, password, active;",
            )
            .bind(id)
            .bind(update.password)
            .bind(update.active)
            .fetch_one(&mut **tx)
            .await
            .map_err(DatabaseError::from),
            CredentialsBy::Email(email) => sqlx::query_as::<_, Self::Entity>(
                "UPDATE credentials SET password = $2, active = $3 WHERE email = $1 RETURNING id, email, password, active;",
            )
            .bind(email)
            .bind(update.password)
            .bind(update.active)
            .fetch_one(&mut **tx)
            .await
            .map_err(DatabaseError::from),
        }
    }
}

#[cfg(all(test, feature = "unit"))]
mod tests {
    use super::*;
    use crate::entities::testing;

    #[tokio::test]
    async fn insert_then_find_by_email() {
        let pool = testing::pool().await;
        let mut tx = pool.begin().await.unwrap();

        let created = CredentialsRepository::insert(
            &mut tx,
            CreateCredentialsDAO {
                email: "rep@pharma.com".to_string(),
                password: "hash".to_string(),
            },
        )
        .await
        .unwrap();

        let found = CredentialsRepository::get(&mut tx, CredentialsBy::Email("rep@pharma.com".to_string()))
            .await
            .unwrap();

        assert_eq!(created, found);
        assert!(found.active);
        assert!(
            !CredentialsRepository::exists(&mut tx, CredentialsBy::Id(Uuid::new_v4()))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn update_replaces_password_and_state() {
        let pool = testing::pool().await;
        let mut tx = pool.begin().await.unwrap();

        let created = CredentialsRepository::insert(
            &mut tx,
            CreateCredentialsDAO {
                email: "admin@pharma.com".to_string(),
                password: "old".to_string(),
            },
        )
        .await
        .unwrap();

        let updated = CredentialsRepository::update(
            &mut tx,
            CredentialsBy::Id(created.id),
            UpdateCredentialsDAO {
                password: "new".to_string(),
                active: false,
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.password, "new");
        assert!(!updated.active);

        let inactive = CredentialsRepository::get_all(&mut tx, CredentialsWhere::Active(false))
            .await
            .unwrap();
        assert_eq!(inactive.len(), 1);
    }
}
