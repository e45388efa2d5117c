use database::traits::{DatabaseError, EntityRepository, InsertRepository};
use sqlx::{Transaction, types::Uuid};

use crate::DB;

/// Raw profile row. `role` is kept as stored; callers decode it.
#[derive(sqlx::FromRow, Debug, PartialEq, Eq, Clone)]
pub struct ProfilesDAO {
    pub user_id: Uuid,
    pub role: Option<String>,
    pub sales_rep_id: Option<Uuid>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CreateProfilesDAO {
    pub user_id: Uuid,
    pub role: Option<String>,
    pub sales_rep_id: Option<Uuid>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ProfilesBy {
    UserId(Uuid),
}

#[derive(Debug, PartialEq, Eq)]
pub enum ProfilesWhere {
    SalesRep(Uuid),
}

#[derive(Debug)]
pub struct ProfilesRepository;

#[database::async_trait::async_trait]
impl EntityRepository for ProfilesRepository {
    type Db = DB;
    type Entity = ProfilesDAO;
    type QueryOne = ProfilesBy;
    type QueryMany = ProfilesWhere;

    async fn try_get(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryOne,
    ) -> Result<Option<Self::Entity>, DatabaseError> {
        match key {
            ProfilesBy::UserId(user_id) => sqlx::query_as::<_, Self::Entity>(
                "SELECT user_id, role, sales_rep_id FROM profiles WHERE user_id = $1 LIMIT 1;",
            )
            .bind(user_id)
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
            ProfilesWhere::SalesRep(sales_rep_id) => sqlx::query_as::<_, Self::Entity>(
                "SELECT user_id, role, sales_rep_id FROM profiles WHERE sales_rep_id = $1;",
            )
            .bind(sales_rep_id)
            .fetch_all(&mut **tx)
            .await
            .map_err(DatabaseError::from),
        }
    }
}

#[database::async_trait::async_trait]
impl InsertRepository for ProfilesRepository {
    type CreateInput = CreateProfilesDAO;

    async fn insert(
        tx: &mut Transaction<'_, Self::Db>,
        input: Self::CreateInput,
    ) -> Result<Self::Entity, DatabaseError> {
        sqlx::query_as::<_, Self::Entity>(
            "INSERT INTO profiles (user_id, role, sales_rep_id) VALUES ($1, $2, $3) RETURNING user_id, role, sales_rep_id;",
        )
        .bind(input.user_id)
        .bind(input.role)
        .bind(input.sales_rep_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(DatabaseError::from)
    }
}

#[cfg(all(test, feature = "unit"))]
mod tests {
    use super::*;
    use crate::entities::credentials::CreateCredentialsDAO;
    use crate::entities::testing;
    use crate::CredentialsRepository;

    #[tokio::test]
    async fn unset_roles_round_trip_as_none() {
        let pool = testing::pool().await;
        let mut tx = pool.begin().await.unwrap();
        let credential = CredentialsRepository::insert(
            &mut tx,
            CreateCredentialsDAO {
                email: "new@pharma.com".to_string(),
                password: "hash".to_string(),
            },
        )
        .await
        .unwrap();

        ProfilesRepository::insert(
            &mut tx,
            CreateProfilesDAO {
                user_id: credential.id,
                role: None,
                sales_rep_id: None,
            },
        )
        .await
        .unwrap();

        let profile = ProfilesRepository::get(&mut tx, ProfilesBy::UserId(credential.id))
            .await
            .unwrap();
        assert_eq!(profile.role, None);
        assert!(
            ProfilesRepository::try_get(&mut tx, ProfilesBy::UserId(Uuid::new_v4()))
                .await
                .unwrap()
                .is_none()
        );
    }
}
