use sqlx::{Database, Error as SqlxError, Transaction};
use std::fmt::Debug;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Communication Error")]
    CommunicationError,
    #[error("Connection Failed")]
    ConnectionFailed,
    #[error("Connection Not Available")]
    ConnectionNotAvailable,
    #[error("Query Failed: {0}")]
    QueryFailed(String),
    #[error("Column Not Found: {0}")]
    ColumnNotFound(String),
    #[error("Could not decode column: {0}")]
    Decode(String),
    #[error("Protocol Not Supported")]
    ProtocolNotSupported,
    #[error("Database Inconsistency: {0}")]
    DatabaseInconsistence(String),
    #[error("Migration Failed: {0}")]
    MigrationFailed(String),
    #[error("Unknown Error: {0}")]
    Unknown(String),
}

impl From<SqlxError> for DatabaseError {
    fn from(value: SqlxError) -> Self {
        match value {
            SqlxError::RowNotFound => Self::NotFound("row not found".to_string()),
            SqlxError::ColumnNotFound(column_name) => Self::ColumnNotFound(column_name),
            SqlxError::ColumnDecode { index, source } => {
                Self::Decode(format!("{index}: {source}"))
            }
            SqlxError::Io(_) | SqlxError::Tls(_) => Self::CommunicationError,
            SqlxError::PoolTimedOut | SqlxError::PoolClosed => Self::ConnectionNotAvailable,
            SqlxError::Database(e) => Self::QueryFailed(e.to_string()),
            SqlxError::Protocol(_) => Self::ProtocolNotSupported,
            SqlxError::TypeNotFound { type_name } => {
                Self::DatabaseInconsistence(format!("TypeNotFound {type_name}"))
            }
            SqlxError::Migrate(e) => Self::MigrationFailed(e.to_string()),
            _ => Self::ConnectionFailed,
        }
    }
}

/// Read side of a table. Every entity repository implements this; the write
/// traits below are only implemented where the application mutates the table.
#[async_trait::async_trait]
pub trait EntityRepository {
    type Db: Database;
    type Entity: Send;
    type QueryOne: Debug + Send + Sync;
    type QueryMany: Send + Sync;

    async fn try_get(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryOne,
    ) -> Result<Option<Self::Entity>, DatabaseError>;

    async fn get_all(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryMany,
    ) -> Result<Vec<Self::Entity>, DatabaseError>;

    async fn get(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryOne,
    ) -> Result<Self::Entity, DatabaseError> {
        let described = format!("{key:?}");
        Self::try_get(tx, key)
            .await?
            .ok_or(DatabaseError::NotFound(described))
    }

    async fn exists(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryOne,
    ) -> Result<bool, DatabaseError> {
        Ok(Self::try_get(tx, key).await?.is_some())
    }
}

#[async_trait::async_trait]
pub trait InsertRepository: EntityRepository {
    type CreateInput: Send;

    async fn insert(
        tx: &mut Transaction<'_, Self::Db>,
        input: Self::CreateInput,
    ) -> Result<Self::Entity, DatabaseError>;
}

#[async_trait::async_trait]
pub trait UpdateRepository: EntityRepository {
    type UpdateInput: Send;

    async fn update(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryOne,
        update: Self::UpdateInput,
    ) -> Result<Self::Entity, DatabaseError>;
}

/// Rows are never removed; `delete` deactivates them.
#[async_trait::async_trait]
pub trait DeleteRepository: EntityRepository {
    async fn delete(
        tx: &mut Transaction<'_, Self::Db>,
        key: Self::QueryOne,
    ) -> Result<Option<Self::Entity>, DatabaseError>;
}
