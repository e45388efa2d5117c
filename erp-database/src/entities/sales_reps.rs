use database::traits::{DatabaseError, EntityRepository, InsertRepository};
use sqlx::{Transaction, types::Uuid};

use crate::DB;

#[derive(sqlx::FromRow, Debug, PartialEq, Eq, Clone)]
pub struct SalesRepsDAO {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub commission_rate_bps: i32,
    pub active: bool,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CreateSalesRepsDAO {
    pub name: String,
    pub email: String,
    pub commission_rate_bps: i32,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SalesRepsBy {
    Id(Uuid),
}

#[derive(Debug, PartialEq, Eq)]
pub enum SalesRepsWhere {
    All,
    Active(bool),
}

#[derive(Debug)]
pub struct SalesRepsRepository;

#[database::async_trait::async_trait]
impl EntityRepository for SalesRepsRepository {
    type Db = DB;
    type Entity = SalesRepsDAO;
    type QueryOne = SalesRepsBy;
    type QueryMany = SalesRepsWhere;

    async fn try_get(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryOne,
    ) -> Result<Option<Self::Entity>, DatabaseError> {
        match key {
            SalesRepsBy::Id(id) => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, name, email, commission_rate_bps, active FROM sales_reps WHERE id = $1 LIMIT 1;",
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
            SalesRepsWhere::All => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, name, email, commission_rate_bps, active FROM sales_reps ORDER BY name;",
            )
            .fetch_all(&mut **tx)
            .await
            .map_err(DatabaseError::from),
            SalesRepsWhere::Active(active) => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, name, email, commission_rate_bps, active FROM sales_reps WHERE active = $1 ORDER BY name;",
            )
            .bind(active)
            .fetch_all(&mut **tx)
            .await
            .map_err(DatabaseError::from),
        }
    }
}

#[database::async_trait::async_trait]
impl InsertRepository for SalesRepsRepository {
    type CreateInput = CreateSalesRepsDAO;

    async fn insert(
        tx: &mut Transaction<'_, Self::Db>,
        input: Self::CreateInput,
    ) -> Result<Self::Entity, DatabaseError> {
        sqlx::query_as::<_, Self::Entity>(
            "INSERT INTO sales_reps (id, name, email, commission_rate_bps, active) VALUES ($1, $2, $3, $4, true) RETURNING id, name, email, commission_rate_bps, active;",
        )
        .bind(Uuid::new_v4())
        .bind(input.name)
        .bind(input.email)
        .bind(input.commission_rate_bps)
        .fetch_one(&mut **tx)
        .await
        .map_err(DatabaseError::from)
    }
}
