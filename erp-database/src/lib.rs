use sqlx::Pool;

pub mod entities;

pub use crate::entities::{
    Period,
    auth_codes::AuthCodesRepository,
    credentials::CredentialsRepository,
    goals::GoalsRepository,
    mileage::MileageRepository,
    profiles::ProfilesRepository,
    sales::SalesRepository,
    sales_reps::SalesRepsRepository,
    sessions::SessionsRepository,
    visits::VisitsRepository,
};

pub use database::*;
pub use database::traits::DatabaseError;

#[cfg(feature = "unit")]
pub type DB = sqlx::Sqlite;

#[cfg(not(feature = "unit"))]
pub type DB = sqlx::Postgres;

pub struct ErpDatabase;

impl ErpDatabase {
    /// Opens the pool. The in-memory SQLite backend lives inside a single
    /// connection, so it is pinned to one and migrated on connect.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Pool<DB>, DatabaseError> {
        #[cfg(feature = "unit")]
        {
            let _ = max_connections;
            let pool = sqlx::sqlite::SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(url)
                .await?;
            Self::migrate(&pool).await?;
            Ok(pool)
        }

        #[cfg(not(feature = "unit"))]
        {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(max_connections)
                .connect(url)
                .await?;
            Ok(pool)
        }
    }

    pub async fn migrate(pool: &Pool<DB>) -> Result<(), DatabaseError> {
        #[cfg(feature = "unit")]
        let migrator = sqlx::migrate!("./sqlite");

        #[cfg(not(feature = "unit"))]
        let migrator = sqlx::migrate!("./postgres");

        migrator
            .run(pool)
            .await
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }
}
