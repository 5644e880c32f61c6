pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod openapi;
pub mod services;
pub mod spreadsheet;
pub mod storage;
pub mod workflow;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::{Extension, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::ToSchema;

use crate::auth::{perm, AuthRouterExt, AuthService};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::services::AppServices;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub services: AppServices,
}

/// Uniform response envelope.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Extension methods kept terse at call sites.
pub type ApiResult<T> = Result<axum::Json<ApiResponse<T>>, errors::ServiceError>;

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// All `/api/v1` routes with per-resource permission gating.
pub fn api_v1_routes() -> Router<AppState> {
    let auth_public = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout));
    let auth_private = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .with_auth();

    let stores_read = Router::new()
        .route("/stores", get(handlers::stores::list_stores))
        .route("/stores/template", get(handlers::stores::store_template))
        .route("/stores/reports", get(handlers::stores::bulk_reports))
        .route(
            "/stores/tasks/:stage/export",
            get(handlers::stores::export_tasks),
        )
        .route("/stores/:id", get(handlers::stores::get_store))
        .route("/stores/:id/report", get(handlers::stores::store_report))
        .with_permission(perm::STORES_VIEW);

    let stores_create = Router::new()
        .route("/stores", post(handlers::stores::create_store))
        .route("/stores/upload", post(handlers::stores::upload_stores))
        .with_permission(perm::STORES_CREATE);

    let stores_edit = Router::new()
        .route("/stores/recce/assign", post(handlers::stores::assign_recce))
        .route(
            "/stores/recce/unassign",
            post(handlers::stores::unassign_recce),
        )
        .route(
            "/stores/recce/assign-sheet/:user_id",
            post(handlers::stores::assign_recce_sheet),
        )
        .route(
            "/stores/installation/assign",
            post(handlers::stores::assign_installation),
        )
        .route(
            "/stores/installation/unassign",
            post(handlers::stores::unassign_installation),
        )
        .route(
            "/stores/installation/assign-sheet/:user_id",
            post(handlers::stores::assign_installation_sheet),
        )
        .route("/stores/:id", put(handlers::stores::update_store))
        .route("/stores/:id/recce", post(handlers::stores::submit_recce))
        .route(
            "/stores/:id/recce/review",
            post(handlers::stores::review_recce),
        )
        .route(
            "/stores/:id/installation",
            post(handlers::stores::submit_installation),
        )
        .route(
            "/stores/:id/images/:folder",
            post(handlers::stores::upload_images),
        )
        .route(
            "/stores/:id/images/:folder/:file_name",
            delete(handlers::stores::delete_image),
        )
        .with_permission(perm::STORES_EDIT);

    let stores_delete = Router::new()
        .route("/stores/:id", delete(handlers::stores::delete_store))
        .with_permission(perm::STORES_DELETE);

    let users_read = Router::new()
        .route("/users", get(handlers::users::list_users))
        .route("/users/export", get(handlers::users::export_users))
        .route("/users/template", get(handlers::users::user_template))
        .route("/users/by-role/:code", get(handlers::users::users_by_role))
        .route("/users/:id", get(handlers::users::get_user))
        .with_permission(perm::USERS_VIEW);

    let users_create = Router::new()
        .route("/users", post(handlers::users::create_user))
        .route("/users/upload", post(handlers::users::upload_users))
        .with_permission(perm::USERS_CREATE);

    let users_edit = Router::new()
        .route("/users/:id", put(handlers::users::update_user))
        .with_permission(perm::USERS_EDIT);

    let users_delete = Router::new()
        .route("/users/:id", delete(handlers::users::delete_user))
        .with_permission(perm::USERS_DELETE);

    let roles_read = Router::new()
        .route("/roles", get(handlers::roles::list_roles))
        .route("/roles/:id", get(handlers::roles::get_role))
        .with_permission(perm::ROLES_VIEW);

    let roles_write = Router::new()
        .route("/roles", post(handlers::roles::create_role))
        .with_permission(perm::ROLES_CREATE)
        .merge(
            Router::new()
                .route("/roles/:id", put(handlers::roles::update_role))
                .with_permission(perm::ROLES_EDIT),
        )
        .merge(
            Router::new()
                .route("/roles/:id", delete(handlers::roles::delete_role))
                .with_permission(perm::ROLES_DELETE),
        );

    let clients_read = Router::new()
        .route("/clients", get(handlers::clients::list_clients))
        .route("/clients/:id", get(handlers::clients::get_client))
        .with_permission(perm::CLIENTS_VIEW);

    let clients_write = Router::new()
        .route("/clients", post(handlers::clients::create_client))
        .with_permission(perm::CLIENTS_CREATE)
        .merge(
            Router::new()
                .route("/clients/:id", put(handlers::clients::update_client))
                .with_permission(perm::CLIENTS_EDIT),
        )
        .merge(
            Router::new()
                .route("/clients/:id", delete(handlers::clients::delete_client))
                .with_permission(perm::CLIENTS_DELETE),
        );

    let elements_read = Router::new()
        .route("/elements", get(handlers::elements::list_elements))
        .route("/elements/:id", get(handlers::elements::get_element))
        .with_permission(perm::ELEMENTS_VIEW);

    let elements_write = Router::new()
        .route("/elements", post(handlers::elements::create_element))
        .with_permission(perm::ELEMENTS_CREATE)
        .merge(
            Router::new()
                .route("/elements/:id", put(handlers::elements::update_element))
                .with_permission(perm::ELEMENTS_EDIT),
        )
        .merge(
            Router::new()
                .route("/elements/:id", delete(handlers::elements::delete_element))
                .with_permission(perm::ELEMENTS_DELETE),
        );

    // Dashboard access is admin-checked in the handler; my-tasks and
    // notifications are personal and only need authentication.
    let personal = Router::new()
        .route("/analytics/dashboard", get(handlers::analytics::dashboard))
        .route("/analytics/my-tasks", get(handlers::analytics::my_tasks))
        .route(
            "/notifications",
            get(handlers::notifications::list_notifications),
        )
        .with_auth();

    auth_public
        .merge(auth_private)
        .merge(stores_read)
        .merge(stores_create)
        .merge(stores_edit)
        .merge(stores_delete)
        .merge(users_read)
        .merge(users_create)
        .merge(users_edit)
        .merge(users_delete)
        .merge(roles_read)
        .merge(roles_write)
        .merge(clients_read)
        .merge(clients_write)
        .merge(elements_read)
        .merge(elements_write)
        .merge(personal)
}

/// The full application router with middleware stack.
pub fn app_router(state: AppState) -> Router {
    let docs = openapi::swagger_ui();
    let docs_router: Router<AppState> = Router::new()
        .merge(docs)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            openapi::docs_auth_middleware,
        ));

    let mut router = Router::new()
        .route("/health", get(handlers::health::health))
        .merge(docs_router)
        .nest("/api/v1", api_v1_routes());

    // Local storage doubles as the public file host.
    if state.config.storage.storage_type.eq_ignore_ascii_case("local") {
        router = router.nest_service(
            "/uploads",
            ServeDir::new(state.config.storage.local_root.clone()),
        );
    }

    router
        .layer(Extension(state.auth.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
