use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use erp_database::{DB, DatabaseError};
use serde::Serialize;
use sqlx::Pool;

use crate::{
    auth::{
        guard::{GuardState, route_guard},
        profile::{ProfileSource, SqlProfileSource},
        provider::{AuthError, AuthProvider, SqlAuthProvider},
    },
    config::Config,
    handlers::{admin, auth, portal, reports},
};

#[derive(Debug)]
pub enum ServerError {
    InternalServerError(String),
    Unauthorized,
    Forbidden(String),
    NotFound(String),
    BadRequest(String),
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound(what) => {
                tracing::debug!("Not found: {what}");
                ServerError::NotFound("Not Found".to_string())
            }
            other => {
                tracing::error!("DatabaseError: {:?}", other);
                ServerError::InternalServerError("Internal Server Error".to_string())
            }
        }
    }
}

impl From<sqlx::Error> for ServerError {
    fn from(value: sqlx::Error) -> Self {
        DatabaseError::from(value).into()
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials | AuthError::InvalidCode | AuthError::SessionNotFound => {
                ServerError::Unauthorized
            }
            AuthError::WeakPassword => {
                ServerError::BadRequest("Invalid Password Format".to_string())
            }
            AuthError::Database(e) => e.into(),
            AuthError::Internal(e) => ServerError::InternalServerError(e),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            message: String,
        }

        let (status, message) = match self {
            ServerError::InternalServerError(e) => {
                tracing::error!("Internal Server Error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ServerError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<DB>,
    pub auth: Arc<dyn AuthProvider>,
    pub profiles: Arc<dyn ProfileSource>,
    pub config: Config,
}

impl AppState {
    pub fn new(pool: Pool<DB>, config: Config) -> Self {
        let auth = Arc::new(SqlAuthProvider::new(
            pool.clone(),
            config.session_ttl,
            config.reset_code_ttl,
        ));
        let profiles = Arc::new(SqlProfileSource::new(pool.clone()));

        Self::with_providers(pool, auth, profiles, config)
    }

    pub fn with_providers(
        pool: Pool<DB>,
        auth: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileSource>,
        config: Config,
    ) -> Self {
        Self {
            pool,
            auth,
            profiles,
            config,
        }
    }

    pub fn guard_state(&self) -> GuardState {
        GuardState {
            auth: self.auth.clone(),
            profiles: self.profiles.clone(),
            refresh_window: self.config.refresh_window(),
            cookie_secure: self.config.cookie_secure,
        }
    }
}

pub struct App;

impl App {
    pub fn new(state: AppState) -> Router {
        let guard = state.guard_state();
        let app_state = Arc::new(state);

        Router::new()
            .route("/health-check", get(health_check))
            .route("/login", get(auth::login_page).post(auth::login))
            .route("/logout", post(auth::logout))
            .route("/auth/callback", get(auth::callback))
            .route("/recuperar-senha", post(auth::request_password_reset))
            .route("/dashboard", get(admin::dashboard))
            .route("/vendedores", get(admin::sales_reps))
            .route("/vendas", get(admin::sales).post(admin::create_sale))
            .route("/metas", get(admin::goals).put(admin::upsert_goal))
            .route("/quilometragem", get(admin::mileage))
            .route("/visitas", get(admin::visits))
            .route("/relatorios/vendas", get(reports::sales_report))
            .route("/relatorios/quilometragem", get(reports::mileage_report))
            .route("/conta/senha", post(auth::update_password))
            .route("/portal", get(portal::home))
            .route("/portal/vendas", get(portal::sales))
            .route("/portal/visitas", get(portal::visits).post(portal::log_visit))
            .route(
                "/portal/quilometragem",
                get(portal::mileage).post(portal::log_mileage),
            )
            .route("/portal/metas", get(portal::goals))
            .route("/portal/relatorios/vendas", get(reports::own_sales_report))
            .route("/portal/conta/senha", post(auth::update_password))
            .layer(middleware::from_fn_with_state(guard, route_guard))
            .with_state(app_state)
    }
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::{
        guard::tests::{MemoryAuth, TOKEN},
        profile::tests::FixedProfile,
    };
    use axum::{
        body::Body,
        http::{Request, header},
    };
    use chrono::Duration;
    use tower::util::ServiceExt;
    use uuid::Uuid;

    /// Pool that never connects unless a handler actually queries it.
    pub fn lazy_pool() -> Pool<DB> {
        #[cfg(feature = "unit")]
        let url = "sqlite::memory:";
        #[cfg(not(feature = "unit"))]
        let url = "postgres://localhost/erp";

        Pool::<DB>::connect_lazy(url).expect("Could not build lazy pool")
    }

    pub async fn app(auth: Arc<MemoryAuth>, profiles: FixedProfile) -> Router {
        App::new(AppState::with_providers(
            lazy_pool(),
            auth,
            Arc::new(profiles),
            Config::default(),
        ))
    }

    #[tokio::test]
    async fn health_check_is_public() {
        let app = app(Arc::new(MemoryAuth::broken()), FixedProfile::failing()).await;
        let response = app
            .oneshot(Request::get("/health-check").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    async fn get_produtos(auth: MemoryAuth, profiles: FixedProfile, cookie: bool) -> Response {
        let mut request = Request::get("/produtos");
        if cookie {
            request = request.header(header::COOKIE, format!("ssid={TOKEN}"));
        }

        app(Arc::new(auth), profiles)
            .await
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn anonymous_produtos_goes_to_login() {
        let response = get_produtos(
            MemoryAuth::default(),
            FixedProfile::role("ADMIN", None),
            false,
        )
        .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/login?next=%2Fprodutos"
        );
    }

    #[tokio::test]
    async fn sales_rep_produtos_goes_to_portal() {
        let response = get_produtos(
            MemoryAuth::with_session(Duration::hours(8)),
            FixedProfile::role("VENDEDOR", Some(Uuid::new_v4())),
            true,
        )
        .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/portal");
    }

    #[test]
    fn database_errors_hide_details() {
        assert!(matches!(
            ServerError::from(DatabaseError::QueryFailed("syntax error".to_string())),
            ServerError::InternalServerError(_)
        ));
        assert!(matches!(
            ServerError::from(DatabaseError::NotFound("SalesRepsBy::Id".to_string())),
            ServerError::NotFound(_)
        ));
        assert!(matches!(
            ServerError::from(AuthError::WeakPassword),
            ServerError::BadRequest(_)
        ));
    }
}
