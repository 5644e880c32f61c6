use axum::extract::State;
use axum::response::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use time::Duration;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::{ApiResponse, AppState};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";
pub const SESSION_COOKIE: &str = "session_id";

const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: AuthUser,
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

fn auth_cookie(name: &'static str, value: String, ttl: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(ttl)
        .build()
}

/// The session cookie is readable by the frontend (it drives the idle-logout
/// timer), so it is deliberately not HttpOnly.
fn session_cookie(secure: bool) -> Cookie<'static> {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    Cookie::build((SESSION_COOKIE, hex::encode(bytes)))
        .path("/")
        .http_only(false)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(SESSION_TTL_SECS))
        .build()
}

fn expired(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

fn issue_cookies(
    state: &AppState,
    jar: CookieJar,
    user: &AuthUser,
) -> Result<(CookieJar, String), ServiceError> {
    let secure = state.config.is_production();
    let access = state.auth.issue_access_token(user)?;
    let refresh = state.auth.issue_refresh_token(user)?;
    let jar = jar
        .add(auth_cookie(
            ACCESS_COOKIE,
            access.clone(),
            Duration::seconds(state.auth.access_ttl_secs() as i64),
            secure,
        ))
        .add(auth_cookie(
            REFRESH_COOKIE,
            refresh,
            Duration::seconds(state.auth.refresh_ttl_secs() as i64),
            secure,
        ))
        .add(session_cookie(secure));
    Ok((jar, access))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<LoginResponse>>), ServiceError> {
    request.validate()?;
    let user = state
        .services
        .users
        .authenticate(&request.email, &request.password)
        .await?;
    let (jar, access_token) = issue_cookies(&state, jar, &user)?;
    let expires_in = state.auth.access_ttl_secs();
    Ok((
        jar,
        Json(ApiResponse::success(LoginResponse {
            user,
            access_token,
            expires_in,
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    responses(
        (status = 200, description = "Tokens refreshed", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Missing or invalid refresh token")
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<LoginResponse>>), ServiceError> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ServiceError::Unauthorized("Missing refresh token".to_string()))?;

    let stale = state.auth.validate_refresh_token(&token)?;
    // Re-read roles and permissions so revocations apply from this point on.
    let user = state.services.users.auth_user_for(stale.user_id).await?;

    let (jar, access_token) = issue_cookies(&state, jar, &user)?;
    let expires_in = state.auth.access_ttl_secs();
    Ok((
        jar,
        Json(ApiResponse::success(LoginResponse {
            user,
            access_token,
            expires_in,
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses((status = 200, description = "Logged out")),
    tag = "auth"
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<ApiResponse<()>>) {
    let jar = jar
        .add(expired(ACCESS_COOKIE))
        .add(expired(REFRESH_COOKIE))
        .add(expired(SESSION_COOKIE));
    (jar, Json(ApiResponse::message("Logged out")))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses((status = 200, description = "Current user", body = ApiResponse<AuthUser>)),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me(user: AuthUser) -> Json<ApiResponse<AuthUser>> {
    Json(ApiResponse::success(user))
}
