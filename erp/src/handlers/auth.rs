use std::sync::Arc;

use axum::{
    Extension, Form, Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::{
    auth::{
        dispatch::post_login,
        guard::{CurrentUser, INVALID_CODE, INVALID_CREDENTIALS, Redirect},
        profile::resolve_profile,
        provider::{AuthError, IssuedSession},
        session::{removal_cookie, session_cookie, session_token, set_cookie},
    },
    common::{is_local_path, is_valid_email, is_valid_password, normalize_email},
    handlers::dto::{
        CallbackQuery, LoginForm, LoginPageDTO, LoginPageQuery, PasswordResetDTO,
        UpdatePasswordDTO,
    },
    server::{AppState, ServerError},
};

pub async fn login_page(Query(query): Query<LoginPageQuery>) -> LoginPageDTO {
    query.into()
}

pub async fn login(State(state): State<Arc<AppState>>, Form(form): Form<LoginForm>) -> Response {
    let email = normalize_email(&form.email);

    match state.auth.sign_in_with_password(&email, &form.password).await {
        Ok(session) => establish(&state, session, form.next.as_deref()).await,
        Err(AuthError::InvalidCredentials) => {
            tracing::info!("failed login attempt");
            match form.next.filter(|next| is_local_path(next)) {
                Some(next) => Redirect::LoginRetry {
                    error: INVALID_CREDENTIALS,
                    next,
                }
                .into_response(),
                None => Redirect::LoginError(INVALID_CREDENTIALS).into_response(),
            }
        }
        Err(e) => ServerError::from(e).into_response(),
    }
}

pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(code) = query.code.filter(|code| !code.trim().is_empty()) else {
        return Redirect::LoginError(INVALID_CODE).into_response();
    };

    match state.auth.exchange_code_for_session(code.trim()).await {
        Ok(session) => establish(&state, session, query.next.as_deref()).await,
        Err(AuthError::InvalidCode) => Redirect::LoginError(INVALID_CODE).into_response(),
        Err(e) => ServerError::from(e).into_response(),
    }
}

/// Dispatches a freshly issued session. Callers without a usable role are
/// signed straight back out.
async fn establish(state: &AppState, session: IssuedSession, next: Option<&str>) -> Response {
    let resolution = resolve_profile(state.profiles.as_ref(), session.user_id).await;
    let redirect = post_login(&resolution, next);

    if matches!(redirect, Redirect::LoginError(_)) {
        if let Err(e) = state.auth.sign_out(&session.access_token).await {
            tracing::error!(user_id = %session.user_id, "could not revoke session: {e}");
        }
        return redirect.into_response();
    }

    tracing::info!(user_id = %session.user_id, location = %redirect.location(), "signed in");

    let mut response = redirect.into_response();
    set_cookie(
        &mut response,
        session_cookie(
            &session.access_token,
            session.expires_at,
            state.config.cookie_secure,
        ),
    );
    response
}

pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = state.auth.sign_out(&token).await {
            tracing::warn!("could not sign out: {e}");
        }
    }

    let mut response = Redirect::Login { next: None }.into_response();
    set_cookie(&mut response, removal_cookie(state.config.cookie_secure));
    response
}

/// Always answers 202 so the endpoint does not reveal which emails exist.
pub async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetDTO>,
) -> Result<StatusCode, ServerError> {
    let email = normalize_email(&payload.email);

    if !is_valid_email(&email)? {
        return Err(ServerError::BadRequest("Invalid Email Format".to_string()));
    }

    if let Some(code) = state.auth.request_password_reset(&email).await? {
        tracing::debug!(%code, "password reset code issued");
    }

    Ok(StatusCode::ACCEPTED)
}

pub async fn update_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<UpdatePasswordDTO>,
) -> Result<StatusCode, ServerError> {
    if !is_valid_password(&payload.password) {
        return Err(ServerError::BadRequest(
            "Invalid Password Format".to_string(),
        ));
    }

    state
        .auth
        .update_password(user.user_id, &payload.password)
        .await?;

    tracing::info!(user_id = %user.user_id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}
