//! Authentication and authorization.
//!
//! JWT-based auth (short-lived access tokens + stateless refresh tokens, both
//! also delivered as cookies), argon2 password hashing, and role/permission
//! middleware. Handlers receive the caller as an [`AuthUser`] extracted from
//! request extensions populated by [`auth_middleware`].

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

pub mod consts;

pub use consts as perm;

const TOKEN_ISSUER: &str = "storeops-api";
const TOKEN_AUDIENCE: &str = "storeops-clients";

/// Closed set of role codes known to the workflow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleCode {
    SuperAdmin,
    Admin,
    Recce,
    Installation,
}

/// Claim structure for both access and refresh tokens; `typ` tells them apart.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    pub typ: String,
}

/// Authenticated caller, extracted from a validated access token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub roles: Vec<RoleCode>,
    pub permissions: Vec<String>,
}

impl AuthUser {
    pub fn has_role(&self, role: RoleCode) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// SUPER_ADMIN and ADMIN see every store; everyone else only their own
    /// assignments.
    pub fn is_admin(&self) -> bool {
        self.has_role(RoleCode::SuperAdmin) || self.has_role(RoleCode::Admin)
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

/// Issues and validates tokens. Cheap to clone behind an `Arc`.
pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn access_ttl_secs(&self) -> u64 {
        self.config.access_ttl_secs
    }

    pub fn refresh_ttl_secs(&self) -> u64 {
        self.config.refresh_ttl_secs
    }

    pub fn issue_access_token(&self, user: &AuthUser) -> Result<String, AuthError> {
        self.issue_token(user, "access", self.config.access_ttl_secs)
    }

    pub fn issue_refresh_token(&self, user: &AuthUser) -> Result<String, AuthError> {
        self.issue_token(user, "refresh", self.config.refresh_ttl_secs)
    }

    fn issue_token(&self, user: &AuthUser, typ: &str, ttl_secs: u64) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.user_id.to_string(),
            name: Some(user.name.clone()),
            email: user.email.clone(),
            roles: user.roles.iter().map(|r| r.to_string()).collect(),
            permissions: user.permissions.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + ttl_secs as i64,
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
            typ: typ.to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(e.to_string()))
    }

    pub fn validate_access_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        self.validate(token, "access")
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        self.validate(token, "refresh")
    }

    fn validate(&self, token: &str, expected_typ: &str) -> Result<AuthUser, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_audience(&[TOKEN_AUDIENCE]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| AuthError::InvalidToken)?;
        let claims = data.claims;
        if claims.typ != expected_typ {
            return Err(AuthError::InvalidToken);
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let roles = claims
            .roles
            .iter()
            .filter_map(|r| r.parse::<RoleCode>().ok())
            .collect();
        Ok(AuthUser {
            user_id,
            name: claims.name.unwrap_or_default(),
            email: claims.email,
            roles,
            permissions: claims.permissions,
        })
    }
}

/// Hash a password with argon2id and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::InternalError(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::InternalError(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
    #[error("Internal auth error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "AUTH_MISSING"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "AUTH_INVALID_TOKEN"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "AUTH_INVALID_CREDENTIALS"),
            AuthError::InsufficientPermissions => (StatusCode::FORBIDDEN, "AUTH_FORBIDDEN"),
            AuthError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "AUTH_INTERNAL_ERROR")
            }
        };
        let body = Json(serde_json::json!({
            "error": { "code": code, "message": self.to_string() }
        }));
        (status, body).into_response()
    }
}

#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

fn cookie_token(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Resolve the caller from the Authorization header or, failing that, the
/// `access_token` cookie set at login.
fn extract_auth(headers: &HeaderMap, auth: &AuthService) -> Result<AuthUser, AuthError> {
    if let Some(token) = bearer_token(headers) {
        return auth.validate_access_token(&token);
    }
    if let Some(token) = cookie_token(headers, "access_token") {
        return auth.validate_access_token(&token);
    }
    Err(AuthError::MissingAuth)
}

/// Authentication middleware: validates the token and stores the [`AuthUser`]
/// in request extensions. The `Arc<AuthService>` extension is installed once
/// on the router.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    match extract_auth(request.headers(), &auth_service) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Permission middleware: SUPER_ADMIN and ADMIN hold every permission; other
/// callers need the named one in their claims.
pub async fn permission_middleware(
    State(required_permission): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or(AuthError::MissingAuth)?;

    if user.is_admin() || user.has_permission(&required_permission) {
        return Ok(next.run(request).await);
    }
    Err(AuthError::InsufficientPermissions)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(AuthConfig {
            jwt_secret: "a-test-secret-that-is-long-enough-to-sign-tokens-with-hs256-okay".into(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 604800,
        })
    }

    fn user() -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            name: "Field Tech".into(),
            email: Some("tech@example.com".into()),
            roles: vec![RoleCode::Recce],
            permissions: vec!["stores:view".into()],
        }
    }

    #[test]
    fn access_token_round_trips() {
        let svc = service();
        let user = user();
        let token = svc.issue_access_token(&user).unwrap();
        let decoded = svc.validate_access_token(&token).unwrap();
        assert_eq!(decoded.user_id, user.user_id);
        assert_eq!(decoded.roles, vec![RoleCode::Recce]);
        assert!(decoded.has_permission("stores:view"));
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let svc = service();
        let token = svc.issue_refresh_token(&user()).unwrap();
        assert!(svc.validate_access_token(&token).is_err());
        assert!(svc.validate_refresh_token(&token).is_ok());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let svc = service();
        let mut token = svc.issue_access_token(&user()).unwrap();
        token.push('x');
        assert!(svc.validate_access_token(&token).is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(verify_password("s3cret-pass", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn admin_roles_see_everything() {
        let mut u = user();
        assert!(!u.is_admin());
        u.roles.push(RoleCode::Admin);
        assert!(u.is_admin());
    }

    #[test]
    fn cookie_token_is_parsed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "session_id=abc; access_token=tok123; refresh_token=r1".parse().unwrap(),
        );
        assert_eq!(cookie_token(&headers, "access_token").as_deref(), Some("tok123"));
        assert_eq!(cookie_token(&headers, "missing"), None);
    }
}
