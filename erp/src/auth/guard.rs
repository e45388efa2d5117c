//! Route-level access gate.
//!
//! Every request outside the public allowlist must carry a live session.
//! The caller's role then decides the area: sales reps are confined to the
//! portal subtree, administrators may go anywhere. Any failure while
//! resolving the session or the profile degrades to the most restrictive
//! outcome.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    auth::{
        profile::{ProfileResolution, ProfileSource, Role, resolve_profile},
        provider::{AuthProvider, Identity},
        session::{removal_cookie, session_cookie, session_token, set_cookie},
    },
    common::{ADMIN_HOME, LOGIN_PATH, PORTAL_HOME},
};

pub const ROLE_UNASSIGNED: &str = "role_unassigned";
pub const INVALID_CREDENTIALS: &str = "invalid_credentials";
pub const INVALID_CODE: &str = "invalid_code";

const PUBLIC_PATHS: &[&str] = &[
    LOGIN_PATH,
    "/logout",
    "/recuperar-senha",
    "/auth/callback",
    "/health-check",
    "/favicon.ico",
    "/robots.txt",
];

const PUBLIC_PREFIXES: &[&str] = &["/static/", "/assets/"];

const STATIC_EXTENSIONS: &[&str] = &[
    "css", "js", "map", "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "woff", "woff2",
];

pub fn is_public(path: &str) -> bool {
    if PUBLIC_PATHS.contains(&path) || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return true;
    }

    path.rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .is_some_and(|(stem, extension)| {
            !stem.is_empty() && STATIC_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
        })
}

pub fn is_portal(path: &str) -> bool {
    path == PORTAL_HOME
        || path
            .strip_prefix(PORTAL_HOME)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Where an unauthorized or misplaced request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    Login { next: Option<String> },
    LoginError(&'static str),
    /// Back to the login form with an error, keeping the requested page.
    LoginRetry {
        error: &'static str,
        next: String,
    },
    PortalHome,
    AdminHome,
    To(String),
}

impl Redirect {
    pub fn home(role: Role) -> Self {
        match role {
            Role::Admin => Redirect::AdminHome,
            Role::Vendedor => Redirect::PortalHome,
        }
    }

    pub fn location(&self) -> String {
        match self {
            Redirect::Login { next: None } => LOGIN_PATH.to_string(),
            Redirect::Login { next: Some(next) } => {
                format!("{LOGIN_PATH}?next={}", urlencoding::encode(next))
            }
            Redirect::LoginError(code) => format!("{LOGIN_PATH}?error={code}"),
            Redirect::LoginRetry { error, next } => {
                format!("{LOGIN_PATH}?error={error}&next={}", urlencoding::encode(next))
            }
            Redirect::PortalHome => PORTAL_HOME.to_string(),
            Redirect::AdminHome => ADMIN_HOME.to_string(),
            Redirect::To(path) => path.clone(),
        }
    }
}

impl IntoResponse for Redirect {
    fn into_response(self) -> Response {
        let location = self.location();
        match HeaderValue::from_str(&location) {
            Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
            Err(_) => (
                StatusCode::FOUND,
                [(header::LOCATION, HeaderValue::from_static(LOGIN_PATH))],
            )
                .into_response(),
        }
    }
}

/// What the guard knows about the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Anonymous,
    Unassigned,
    Granted(Role),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Allow,
    Redirect(Redirect),
}

pub fn return_path(path: &str, query: Option<&str>) -> String {
    match query {
        Some(query) if !query.is_empty() => format!("{path}?{query}"),
        _ => path.to_string(),
    }
}

pub fn decide(path: &str, query: Option<&str>, access: &Access) -> GuardOutcome {
    if is_public(path) {
        return GuardOutcome::Allow;
    }

    match access {
        Access::Anonymous => GuardOutcome::Redirect(Redirect::Login {
            next: Some(return_path(path, query)),
        }),
        Access::Unassigned => GuardOutcome::Redirect(Redirect::LoginError(ROLE_UNASSIGNED)),
        Access::Granted(Role::Vendedor) if !is_portal(path) => {
            GuardOutcome::Redirect(Redirect::PortalHome)
        }
        Access::Granted(_) => GuardOutcome::Allow,
    }
}

/// The server-verified caller, attached to every request the guard lets
/// through to a protected handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub sales_rep_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct GuardState {
    pub auth: Arc<dyn AuthProvider>,
    pub profiles: Arc<dyn ProfileSource>,
    pub refresh_window: Duration,
    pub cookie_secure: bool,
}

async fn identify(guard: &GuardState, token: Option<&str>) -> Option<Identity> {
    let token = token?;
    match guard.auth.get_user(token).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!("session resolution failed, treating as anonymous: {e}");
            None
        }
    }
}

pub async fn route_guard(
    State(guard): State<GuardState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if is_public(&path) {
        return next.run(request).await;
    }

    let query = request.uri().query().map(str::to_string);
    let token = session_token(request.headers());

    let Some(identity) = identify(&guard, token.as_deref()).await else {
        let redirect = Redirect::Login {
            next: Some(return_path(&path, query.as_deref())),
        };
        tracing::debug!(%path, "no live session, redirecting to login");
        let mut response = redirect.into_response();
        if token.is_some() {
            set_cookie(&mut response, removal_cookie(guard.cookie_secure));
        }
        return response;
    };

    let (access, profile) =
        match resolve_profile(guard.profiles.as_ref(), identity.user_id).await {
            ProfileResolution::Resolved(profile) => (Access::Granted(profile.role), Some(profile)),
            ProfileResolution::Unassigned(_) => (Access::Unassigned, None),
        };

    match (decide(&path, query.as_deref(), &access), profile) {
        (GuardOutcome::Allow, Some(profile)) => {
            request.extensions_mut().insert(CurrentUser {
                user_id: identity.user_id,
                email: identity.email.clone(),
                role: profile.role,
                sales_rep_id: profile.sales_rep_id,
            });

            let mut response = next.run(request).await;
            if let Some(token) = token {
                refresh_if_due(&guard, &identity, &token, &mut response).await;
            }
            response
        }
        (GuardOutcome::Redirect(redirect), _) => {
            tracing::debug!(%path, user_id = %identity.user_id, ?redirect, "access redirected");
            redirect.into_response()
        }
        (GuardOutcome::Allow, None) => {
            // Unassigned callers never reach a protected handler.
            Redirect::LoginError(ROLE_UNASSIGNED).into_response()
        }
    }
}

async fn refresh_if_due(guard: &GuardState, identity: &Identity, token: &str, response: &mut Response) {
    if identity.session_expires_at - Utc::now() > guard.refresh_window {
        return;
    }

    match guard.auth.refresh_session(token).await {
        Ok(session) => set_cookie(
            response,
            session_cookie(&session.access_token, session.expires_at, guard.cookie_secure),
        ),
        Err(e) => tracing::warn!(user_id = %identity.user_id, "could not refresh session: {e}"),
    }
}
