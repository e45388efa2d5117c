use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use erp_database::{
    AuthCodesRepository, CredentialsRepository, DB, DatabaseError, SessionsRepository,
    entities::{
        auth_codes::{AuthCodesBy, CreateAuthCodesDAO},
        credentials::{CredentialsBy, UpdateCredentialsDAO},
        sessions::{CreateSessionsDAO, SessionsBy, UpdateSessionsDAO},
    },
    traits::{DeleteRepository, EntityRepository, InsertRepository, UpdateRepository},
};
use sqlx::{Pool, Transaction};
use uuid::Uuid;

use crate::common::{hash_password, is_valid_password, normalize_email, verify_password};

/// Verified caller behind a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub session_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub access_token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid or expired code")]
    InvalidCode,
    #[error("session not found")]
    SessionNotFound,
    #[error("password does not meet the minimum requirements")]
    WeakPassword,
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("{0}")]
    Internal(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(value: sqlx::Error) -> Self {
        AuthError::Database(value.into())
    }
}

/// Session issuance and verification. Everything the rest of the server
/// knows about authentication goes through this trait.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn get_user(&self, access_token: &str) -> Result<Option<Identity>, AuthError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IssuedSession, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    async fn exchange_code_for_session(&self, code: &str) -> Result<IssuedSession, AuthError>;

    async fn refresh_session(&self, access_token: &str) -> Result<IssuedSession, AuthError>;

    /// Returns the one-time code when the email belongs to an active account.
    async fn request_password_reset(&self, email: &str) -> Result<Option<String>, AuthError>;

    async fn update_password(&self, user_id: Uuid, password: &str) -> Result<(), AuthError>;
}

pub struct SqlAuthProvider {
    pool: Pool<DB>,
    session_ttl: Duration,
    code_ttl: Duration,
}

impl SqlAuthProvider {
    pub fn new(pool: Pool<DB>, session_ttl: Duration, code_ttl: Duration) -> Self {
        Self {
            pool,
            session_ttl,
            code_ttl,
        }
    }

    async fn open_session(
        &self,
        tx: &mut Transaction<'_, DB>,
        credential_id: Uuid,
    ) -> Result<IssuedSession, AuthError> {
        let session = SessionsRepository::insert(
            tx,
            CreateSessionsDAO {
                expires_at: Utc::now() + self.session_ttl,
                credential_id,
            },
        )
        .await?;

        Ok(IssuedSession {
            access_token: session.id.to_string(),
            user_id: session.credential_id,
            expires_at: session.expires_at,
        })
    }
}

fn parse_token(access_token: &str) -> Option<Uuid> {
    Uuid::parse_str(access_token.trim()).ok()
}

#[async_trait]
impl AuthProvider for SqlAuthProvider {
    async fn get_user(&self, access_token: &str) -> Result<Option<Identity>, AuthError> {
        let Some(session_id) = parse_token(access_token) else {
            return Ok(None);
        };

        let mut tx = self.pool.begin().await?;

        let Some(session) = SessionsRepository::try_get(&mut tx, SessionsBy::Id(session_id)).await?
        else {
            return Ok(None);
        };

        if !session.is_live(Utc::now()) {
            return Ok(None);
        }

        let credential =
            CredentialsRepository::try_get(&mut tx, CredentialsBy::Id(session.credential_id))
                .await?;

        tx.commit().await?;

        Ok(credential
            .filter(|credential| credential.active)
            .map(|credential| Identity {
                user_id: credential.id,
                email: credential.email,
                session_expires_at: session.expires_at,
            }))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IssuedSession, AuthError> {
        let mut tx = self.pool.begin().await?;

        let credential =
            CredentialsRepository::try_get(&mut tx, CredentialsBy::Email(normalize_email(email)))
                .await?
                .filter(|credential| credential.active)
                .ok_or(AuthError::InvalidCredentials)?;

        let matches = verify_password(password, &credential.password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self.open_session(&mut tx, credential.id).await?;
        tx.commit().await?;

        tracing::info!(user_id = %issued.user_id, "session opened");
        Ok(issued)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let Some(session_id) = parse_token(access_token) else {
            return Ok(());
        };

        let mut tx = self.pool.begin().await?;
        let closed = SessionsRepository::delete(&mut tx, SessionsBy::Id(session_id)).await?;
        tx.commit().await?;

        if let Some(session) = closed {
            tracing::info!(user_id = %session.credential_id, "session closed");
        }
        Ok(())
    }

    async fn exchange_code_for_session(&self, code: &str) -> Result<IssuedSession, AuthError> {
        let mut tx = self.pool.begin().await?;

        let consumed = AuthCodesRepository::delete(&mut tx, AuthCodesBy::Code(code.to_string()))
            .await?
            .ok_or(AuthError::InvalidCode)?;

        if consumed.expires_at <= Utc::now() {
            // Keep the code burnt even though it was rejected.
            tx.commit().await?;
            return Err(AuthError::InvalidCode);
        }

        let credential =
            CredentialsRepository::try_get(&mut tx, CredentialsBy::Id(consumed.credential_id))
                .await?
                .filter(|credential| credential.active)
                .ok_or(AuthError::InvalidCode)?;

        let issued = self.open_session(&mut tx, credential.id).await?;
        tx.commit().await?;

        Ok(issued)
    }

    async fn refresh_session(&self, access_token: &str) -> Result<IssuedSession, AuthError> {
        let session_id = parse_token(access_token).ok_or(AuthError::SessionNotFound)?;

        let mut tx = self.pool.begin().await?;
        let session = SessionsRepository::update(
            &mut tx,
            SessionsBy::Id(session_id),
            UpdateSessionsDAO {
                expires_at: Utc::now() + self.session_ttl,
            },
        )
        .await
        .map_err(|e| match e {
            DatabaseError::NotFound(_) => AuthError::SessionNotFound,
            other => AuthError::Database(other),
        })?;
        tx.commit().await?;

        Ok(IssuedSession {
            access_token: session.id.to_string(),
            user_id: session.credential_id,
            expires_at: session.expires_at,
        })
    }

    async fn request_password_reset(&self, email: &str) -> Result<Option<String>, AuthError> {
        let mut tx = self.pool.begin().await?;

        let Some(credential) =
            CredentialsRepository::try_get(&mut tx, CredentialsBy::Email(normalize_email(email)))
                .await?
                .filter(|credential| credential.active)
        else {
            return Ok(None);
        };

        let code = AuthCodesRepository::insert(
            &mut tx,
            CreateAuthCodesDAO {
                code: Uuid::new_v4().simple().to_string(),
                credential_id: credential.id,
                expires_at: Utc::now() + self.code_ttl,
            },
        )
        .await?;
        tx.commit().await?;

        Ok(Some(code.code))
    }

    async fn update_password(&self, user_id: Uuid, password: &str) -> Result<(), AuthError> {
        if !is_valid_password(password) {
            return Err(AuthError::WeakPassword);
        }

        let hash = hash_password(password).map_err(|e| AuthError::Internal(e.to_string()))?;

        let mut tx = self.pool.begin().await?;
        let credential = CredentialsRepository::get(&mut tx, CredentialsBy::Id(user_id)).await?;
        CredentialsRepository::update(
            &mut tx,
            CredentialsBy::Id(credential.id),
            UpdateCredentialsDAO {
                password: hash,
                active: credential.active,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(%user_id, "password updated");
        Ok(())
    }
}
