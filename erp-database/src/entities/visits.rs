use database::traits::{DatabaseError, EntityRepository, InsertRepository};
use sqlx::Transaction;
use sqlx::types::Uuid;
use sqlx::types::chrono::{DateTime, NaiveDate, Utc};

use crate::{DB, Period};

/// A sales-rep visit to a podiatrist, optionally tied to the pharmacy the
/// podiatrist refers patients to.
#[derive(sqlx::FromRow, Debug, PartialEq, Eq, Clone)]
pub struct VisitsDAO {
    pub id: Uuid,
    pub sales_rep_id: Uuid,
    pub visited_on: NaiveDate,
    pub podiatrist: String,
    pub pharmacy: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CreateVisitsDAO {
    pub sales_rep_id: Uuid,
    pub visited_on: NaiveDate,
    pub podiatrist: String,
    pub pharmacy: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum VisitsBy {
    Id(Uuid),
}

#[derive(Debug, PartialEq, Eq)]
pub enum VisitsWhere {
    Within(Period),
    SalesRepWithin(Uuid, Period),
}

#[derive(Debug)]
pub struct VisitsRepository;

#[database::async_trait::async_trait]
impl EntityRepository for VisitsRepository {
    type Db = DB;
    type Entity = VisitsDAO;
    type QueryOne = VisitsBy;
    type QueryMany = VisitsWhere;

    async fn try_get(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryOne,
    ) -> Result<Option<Self::Entity>, DatabaseError> {
        match key {
            VisitsBy::Id(id) => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, sales_rep_id, visited_on, podiatrist, pharmacy, notes, created_at FROM visits WHERE id = $1 LIMIT 1;",
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
            VisitsWhere::Within(period) => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, sales_rep_id, visited_on, podiatrist, pharmacy, notes, created_at FROM visits WHERE visited_on >= $1 AND visited_on <= $2 ORDER BY visited_on DESC, created_at DESC;",
            )
            .bind(period.from)
            .bind(period.to)
            .fetch_all(&mut **tx)
            .await
            .map_err(DatabaseError::from),
            VisitsWhere::SalesRepWithin(sales_rep_id, period) => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, sales_rep_id, visited_on, podiatrist, pharmacy, notes, created_at FROM visits WHERE sales_rep_id = $1 AND visited_on >= $2 AND visited_on <= $3 ORDER BY visited_on DESC, created_at DESC;",
            )
            .bind(sales_rep_id)
            .bind(period.from)
            .bind(period.to)
            .fetch_all(&mut **tx)
            .await
            .map_err(DatabaseError::from),
        }
    }
}

#[database::async_trait::async_trait]
impl InsertRepository for VisitsRepository {
    type CreateInput = CreateVisitsDAO;

    async fn insert(
        tx: &mut Transaction<'_, Self::Db>,
        input: Self::CreateInput,
    ) -> Result<Self::Entity, DatabaseError> {
        sqlx::query_as::<_, Self::Entity>(
            "INSERT INTO visits (id, sales_rep_id, visited_on, podiatrist, pharmacy, notes, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id, sales_rep_id, visited_on, podiatrist, pharmacy, notes, created_at;",
        )
        .bind(Uuid::new_v4())
        .bind(input.sales_rep_id)
        .bind(input.visited_on)
        .bind(input.podiatrist)
        .bind(input.pharmacy)
        .bind(input.notes)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await
        .map_err(DatabaseError::from)
    }
}
