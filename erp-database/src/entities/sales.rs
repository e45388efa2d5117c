use database::traits::{DatabaseError, EntityRepository, InsertRepository};
use sqlx::Transaction;
use sqlx::types::Uuid;
use sqlx::types::chrono::{DateTime, NaiveDate, Utc};

use crate::{DB, Period};

#[derive(sqlx::FromRow, Debug, PartialEq, Eq, Clone)]
pub struct SalesDAO {
    pub id: Uuid,
    pub sales_rep_id: Uuid,
    pub customer: String,
    pub sold_on: NaiveDate,
    pub amount_cents: i64,
    pub commission_rate_bps: i32,
    pub created_at: DateTime<Utc>,
}

impl SalesDAO {
    /// Commission in cents, rounded half up.
    pub fn commission_cents(&self) -> i64 {
        let raw = i128::from(self.amount_cents) * i128::from(self.commission_rate_bps);
        ((raw + 5_000) / 10_000) as i64
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CreateSalesDAO {
    pub sales_rep_id: Uuid,
    pub customer: String,
    pub sold_on: NaiveDate,
    pub amount_cents: i64,
    pub commission_rate_bps: i32,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SalesBy {
    Id(Uuid),
}

#[derive(Debug, PartialEq, Eq)]
pub enum SalesWhere {
    Within(Period),
    SalesRepWithin(Uuid, Period),
}

#[derive(Debug)]
pub struct SalesRepository;

#[database::async_trait::async_trait]
impl EntityRepository for SalesRepository {
    type Db = DB;
    type Entity = SalesDAO;
    type QueryOne = SalesBy;
    type QueryMany = SalesWhere;

    async fn try_get(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryOne,
    ) -> Result<Option<Self::Entity>, DatabaseError> {
        match key {
            SalesBy::Id(id) => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, sales_rep_id, customer, sold_on, amount_cents, commission_rate_bps, created_at FROM sales WHERE id = $1 LIMIT 1;",
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
            SalesWhere::Within(period) => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, sales_rep_id, customer, sold_on, amount_cents, commission_rate_bps, created_at FROM sales WHERE sold_on >= $1 AND sold_on <= $2 ORDER BY sold_on DESC, created_at DESC;",
            )
            .bind(period.from)
            .bind(period.to)
            .fetch_all(&mut **tx)
            .await
            .map_err(DatabaseError::from),
            SalesWhere::SalesRepWithin(sales_rep_id, period) => sqlx::query_as::<_, Self::Entity>(
                "SELECT id, sales_rep_id, customer, sold_on, amount_cents, commission_rate_bps, created_at FROM sales WHERE sales_rep_id = $1 AND sold_on >= $2 AND sold_on <= $3 ORDER BY sold_on DESC, created_at DESC;",
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
impl InsertRepository for SalesRepository {
    type CreateInput = CreateSalesDAO;

    async fn insert(
        tx: &mut Transaction<'_, Self::Db>,
        input: Self::CreateInput,
    ) -> Result<Self::Entity, DatabaseError> {
        sqlx::query_as::<_, Self::Entity>(
            "INSERT INTO sales (id, sales_rep_id, customer, sold_on, amount_cents, commission_rate_bps, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id, sales_rep_id, customer, sold_on, amount_cents, commission_rate_bps, created_at;",
        )
        .bind(Uuid::new_v4())
        .bind(input.sales_rep_id)
        .bind(input.customer)
        .bind(input.sold_on)
        .bind(input.amount_cents)
        .bind(input.commission_rate_bps)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await
        .map_err(DatabaseError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(amount_cents: i64, commission_rate_bps: i32) -> SalesDAO {
        SalesDAO {
            id: Uuid::new_v4(),
            sales_rep_id: Uuid::new_v4(),
            customer: "Drogaria Central".to_string(),
            sold_on: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            amount_cents,
            commission_rate_bps,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn commission_rounds_half_up() {
        // 5% of R$ 100,10 = R$ 5,005
        assert_eq!(sale(10_010, 500).commission_cents(), 501);
        assert_eq!(sale(10_000, 250).commission_cents(), 250);
        assert_eq!(sale(0, 1_000).commission_cents(), 0);
    }

    #[cfg(feature = "unit")]
    #[tokio::test]
    async fn listings_are_scoped_by_rep_and_period() {
        use crate::entities::testing;

        let pool = testing::pool().await;
        let mut tx = pool.begin().await.unwrap();
        let ana = testing::sales_rep(&mut tx, "Ana").await;
        let bruno = testing::sales_rep(&mut tx, "Bruno").await;

        for (rep, day) in [(ana, 3), (ana, 20), (bruno, 5)] {
            SalesRepository::insert(
                &mut tx,
                CreateSalesDAO {
                    sales_rep_id: rep,
                    customer: "Farmácia Popular".to_string(),
                    sold_on: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
                    amount_cents: 1_000,
                    commission_rate_bps: 500,
                },
            )
            .await
            .unwrap();
        }

        let may = Period::month(2024, 5).unwrap();
        let all = SalesRepository::get_all(&mut tx, SalesWhere::Within(may))
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let own = SalesRepository::get_all(&mut tx, SalesWhere::SalesRepWithin(ana, may))
            .await
            .unwrap();
        assert_eq!(own.len(), 2);
        assert!(own.iter().all(|s| s.sales_rep_id == ana));
        assert_eq!(own[0].sold_on.format("%d").to_string(), "20");

        let early = Period::new(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
        )
        .unwrap();
        let own_early = SalesRepository::get_all(&mut tx, SalesWhere::SalesRepWithin(ana, early))
            .await
            .unwrap();
        assert_eq!(own_early.len(), 1);
    }
}
