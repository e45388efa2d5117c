use database::traits::{DatabaseError, EntityRepository, InsertRepository};
use sqlx::{Transaction, types::Uuid};

use crate::DB;

/// Monthly sales target of a rep.
#[derive(sqlx::FromRow, Debug, PartialEq, Eq, Clone)]
pub struct GoalsDAO {
    pub id: Uuid,
    pub sales_rep_id: Uuid,
    pub year: i32,
    pub month: i32,
    pub target_cents: i64,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CreateGoalsDAO {
    pub sales_rep_id: Uuid,
    pub year: i32,
    pub month: i32,
    pub target_cents: i64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum GoalsBy {
    Id(Uuid),
    SalesRepMonth {
        sales_rep_id: Uuid,
        year: i32,
        month: i32,
    },
}

#[derive(Debug, PartialEq, Eq)]
pub enum GoalsWhere {
    Month { year: i32, month: i32 },
    SalesRep(Uuid),
}

#[derive(Debug)]
pub struct GoalsRepository;

#[database::async_trait::async_trait]
impl EntityRepository for GoalsRepository {
    type Db = DB;
    type Entity = GoalsDAO;
    type QueryOne = GoalsBy;
    type QueryMany = GoalsWhere;

    async fn try_get(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryOne,
    ) -> Result<Option<Self::Entity>, DatabaseError> {
        match key {
            GoalsBy::Id(id) => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, sales_rep_id, year, month, target_cents FROM goals WHERE id = $1 LIMIT 1;",
            )
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(DatabaseError::from),
            GoalsBy::SalesRepMonth {
                sales_rep_id,
                year,
                month,
            } => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, sales_rep_id, year, month, target_cents FROM goals WHERE sales_rep_id = $1 AND year = $2 AND month = $3 LIMIT 1;",
            )
            .bind(sales_rep_id)
            .bind(year)
            .bind(month)
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
            GoalsWhere::Month { year, month } => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, sales_rep_id, year, month, target_cents FROM goals WHERE year = $1 AND month = $2;",
            )
            .bind(year)
            .bind(month)
            .fetch_all(&mut **tx)
            .await
            .map_err(DatabaseError::from),
            GoalsWhere::SalesRep(sales_rep_id) => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, sales_rep_id, year, month, target_cents FROM goals WHERE sales_rep_id = $1 ORDER BY year DESC, month DESC;",
            )
            .bind(sales_rep_id)
            .fetch_all(&mut **tx)
            .await
            .map_err(DatabaseError::from),
        }
    }
}

#[database::async_trait::async_trait]
impl InsertRepository for GoalsRepository {
    type CreateInput = CreateGoalsDAO;

    /// Upsert: a rep has at most one goal per month.
    async fn insert(
        tx: &mut Transaction<'_, Self::Db>,
        input: Self::CreateInput,
    ) -> Result<Self::Entity, DatabaseError> {
        sqlx::query_as::<_, Self::Entity>(
            "INSERT INTO goals (id, sales_rep_id, year, month, target_cents) VALUES ($1, $2, $3, $4, $5) ON CONFLICT (sales_rep_id, year, month) DO UPDATE SET target_cents = excluded.target_cents RETURNING id, sales_rep_id, year, month, target_cents;",
        )
        .bind(Uuid::new_v4())
        .bind(input.sales_rep_id)
        .bind(input.year)
        .bind(input.month)
        .bind(input.target_cents)
        .fetch_one(&mut **tx)
        .await
        .map_err(DatabaseError::from)
    }
}
