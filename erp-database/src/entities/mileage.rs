use database::traits::{DatabaseError, EntityRepository, InsertRepository};
use sqlx::Transaction;
use sqlx::types::Uuid;
use sqlx::types::chrono::{DateTime, NaiveDate, Utc};

use crate::{DB, Period};

#[derive(sqlx::FromRow, Debug, PartialEq, Clone)]
pub struct MileageDAO {
    pub id: Uuid,
    pub sales_rep_id: Uuid,
    pub driven_on: NaiveDate,
    pub origin: String,
    pub destination: String,
    pub distance_km: f64,
    pub rate_cents_per_km: i32,
    pub created_at: DateTime<Utc>,
}

impl MileageDAO {
    /// Reimbursement owed for the trip, in cents. Negative or non-finite
    /// distances count as zero.
    pub fn reimbursement_cents(&self) -> i64 {
        if !self.distance_km.is_finite() || self.distance_km <= 0.0 {
            return 0;
        }
        (self.distance_km * f64::from(self.rate_cents_per_km)).round() as i64
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct CreateMileageDAO {
    pub sales_rep_id: Uuid,
    pub driven_on: NaiveDate,
    pub origin: String,
    pub destination: String,
    pub distance_km: f64,
    pub rate_cents_per_km: i32,
}

#[derive(Debug, PartialEq, Eq)]
pub enum MileageBy {
    Id(Uuid),
}

#[derive(Debug, PartialEq, Eq)]
pub enum MileageWhere {
    Within(Period),
    SalesRepWithin(Uuid, Period),
}

#[derive(Debug)]
pub struct MileageRepository;

#[database::async_trait::async_trait]
impl EntityRepository for MileageRepository {
    type Db = DB;
    type Entity = MileageDAO;
    type QueryOne = MileageBy;
    type QueryMany = MileageWhere;

    async fn try_get(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryOne,
    ) -> Result<Option<Self::Entity>, DatabaseError> {
        match key {
            MileageBy::Id(id) => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, sales_rep_id, driven_on, origin, destination, distance_km, rate_cents_per_km, created_at FROM mileage_entries WHERE id = $1 LIMIT 1;",
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
            MileageWhere::Within(period) => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, sales_rep_id, driven_on, origin, destination, distance_km, rate_cents_per_km, created_at FROM mileage_entries WHERE driven_on >= $1 AND driven_on <= $2 ORDER BY driven_on DESC, created_at DESC;",
            )
            .bind(period.from)
            .bind(period.to)
            .fetch_all(&mut **tx)
            .await
            .map_err(DatabaseError::from),
            MileageWhere::SalesRepWithin(sales_rep_id, period) => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, sales_rep_id, driven_on, origin, destination, distance_km, rate_cents_per_km, created_at FROM mileage_entries WHERE sales_rep_id = $1 AND driven_on >= $2 AND driven_on <= $3 ORDER BY driven_on DESC, created_at DESC;",
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
impl InsertRepository for MileageRepository {
    type CreateInput = CreateMileageDAO;

    async fn insert(
        tx: &mut Transaction<'_, Self::Db>,
        input: Self::CreateInput,
    ) -> Result<Self::Entity, DatabaseError> {
        sqlx::query_as::<_, Self::Entity>(
            "INSERT INTO mileage_entries (id, sales_rep_id, driven_on, origin, destination, distance_km, rate_cents_per_km, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id, sales_rep_id, driven_on, origin, destination, distance_km, rate_cents_per_km, created_at;",
        )
        .bind(Uuid::new_v4())
        .bind(input.sales_rep_id)
        .bind(input.driven_on)
        .bind(input.origin)
        .bind(input.destination)
        .bind(input.distance_km)
        .bind(input.rate_cents_per_km)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await
        .map_err(DatabaseError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(distance_km: f64, rate_cents_per_km: i32) -> MileageDAO {
        MileageDAO {
            id: Uuid::new_v4(),
            sales_rep_id: Uuid::new_v4(),
            driven_on: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            origin: "Campinas".to_string(),
            destination: "Jundiaí".to_string(),
            distance_km,
            rate_cents_per_km,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn reimbursement_rounds_to_the_nearest_cent() {
        assert_eq!(entry(42.5, 95).reimbursement_cents(), 4_038);
        assert_eq!(entry(10.0, 100).reimbursement_cents(), 1_000);
    }

    #[test]
    fn bogus_distances_are_worth_nothing() {
        assert_eq!(entry(-3.0, 100).reimbursement_cents(), 0);
        assert_eq!(entry(f64::NAN, 100).reimbursement_cents(), 0);
    }
}
