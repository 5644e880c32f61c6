use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StoreOps API",
        version = "0.3.0",
        description = r#"
Back-office API for retail branding and installation work.

Stores are imported in bulk from client spreadsheets and move through a fixed
workflow: recce assignment, recce submission, admin review, installation
assignment and installation submission. Field users only see the stores
assigned to them; administrators manage users, clients, the element catalogue
and reports.

## Authentication

Log in via `POST /api/v1/auth/login`. Tokens are returned in the body and set
as cookies; either a `Bearer` Authorization header or the `access_token`
cookie authenticates subsequent requests. Access tokens are short-lived and
refreshed through `POST /api/v1/auth/refresh` using the refresh cookie.

## Bulk operations

Spreadsheet uploads and bulk assignments never abort on the first bad row:
the response reports `totalProcessed`, `successCount`, `errorCount` and a
per-row `errors` list.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Login, logout and token refresh"),
        (name = "stores", description = "Store records and workflow transitions"),
        (name = "users", description = "User account management"),
        (name = "roles", description = "Role and permission management"),
        (name = "clients", description = "Client (brand) management"),
        (name = "elements", description = "Branding element catalogue"),
        (name = "reports", description = "Report documents and spreadsheet exports"),
        (name = "analytics", description = "Dashboard counters"),
        (name = "notifications", description = "Derived work items"),
        (name = "health", description = "Health check")
    ),
    paths(
        crate::handlers::auth::login,
        crate::handlers::auth::refresh,
        crate::handlers::auth::logout,
        crate::handlers::auth::me,

        crate::handlers::stores::list_stores,
        crate::handlers::stores::create_store,
        crate::handlers::stores::get_store,
        crate::handlers::stores::update_store,
        crate::handlers::stores::delete_store,
        crate::handlers::stores::upload_stores,
        crate::handlers::stores::store_template,
        crate::handlers::stores::assign_recce,
        crate::handlers::stores::unassign_recce,
        crate::handlers::stores::assign_installation,
        crate::handlers::stores::unassign_installation,
        crate::handlers::stores::assign_recce_sheet,
        crate::handlers::stores::assign_installation_sheet,
        crate::handlers::stores::submit_recce,
        crate::handlers::stores::review_recce,
        crate::handlers::stores::submit_installation,
        crate::handlers::stores::upload_images,
        crate::handlers::stores::delete_image,
        crate::handlers::stores::store_report,
        crate::handlers::stores::bulk_reports,
        crate::handlers::stores::export_tasks,

        crate::handlers::users::list_users,
        crate::handlers::users::create_user,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::users::users_by_role,
        crate::handlers::users::upload_users,
        crate::handlers::users::export_users,
        crate::handlers::users::user_template,

        crate::handlers::roles::list_roles,
        crate::handlers::roles::create_role,
        crate::handlers::roles::get_role,
        crate::handlers::roles::update_role,
        crate::handlers::roles::delete_role,

        crate::handlers::clients::list_clients,
        crate::handlers::clients::create_client,
        crate::handlers::clients::get_client,
        crate::handlers::clients::update_client,
        crate::handlers::clients::delete_client,

        crate::handlers::elements::list_elements,
        crate::handlers::elements::create_element,
        crate::handlers::elements::get_element,
        crate::handlers::elements::update_element,
        crate::handlers::elements::delete_element,

        crate::handlers::analytics::dashboard,
        crate::handlers::analytics::my_tasks,
        crate::handlers::notifications::list_notifications,
        crate::handlers::health::health,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::errors::ErrorResponse,
            crate::services::BulkReport,
            crate::services::RowError,

            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::LoginResponse,

            crate::services::stores::CreateStoreRequest,
            crate::services::stores::UpdateStoreRequest,
            crate::services::stores::StoreListResponse,
            crate::services::stores::AssignStoresRequest,
            crate::services::stores::UnassignStoresRequest,
            crate::services::stores::SubmitRecceRequest,
            crate::services::stores::ReviewRecceRequest,
            crate::services::stores::SubmitInstallationRequest,
            crate::services::stores::UploadedImage,

            crate::services::users::CreateUserRequest,
            crate::services::users::UpdateUserRequest,
            crate::services::users::UserResponse,
            crate::services::users::UserListResponse,
            crate::services::users::CreateRoleRequest,
            crate::services::users::UpdateRoleRequest,

            crate::services::clients::CreateClientRequest,
            crate::services::clients::UpdateClientRequest,
            crate::services::clients::ClientListResponse,

            crate::services::elements::CreateElementRequest,
            crate::services::elements::UpdateElementRequest,

            crate::services::reports::StoreReport,
            crate::services::reports::ReportPhoto,
            crate::services::reports::ReportElementLine,
            crate::services::reports::BulkReportResponse,

            crate::services::analytics::DashboardResponse,
            crate::services::analytics::MyTasksResponse,
            crate::services::notifications::Notification,
            crate::handlers::health::HealthResponse,

            crate::workflow::StoreStatus,
            crate::workflow::ReviewDecision,
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

/// HTTP basic auth in front of the Swagger UI and the OpenAPI document.
pub async fn docs_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let expected = BASE64.encode(format!(
        "{}:{}",
        state.config.docs_user, state.config.docs_password
    ));
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
        .map(|credentials| credentials == expected)
        .unwrap_or(false);

    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"api-docs\"")],
            "Unauthorized",
        )
            .into_response();
    }
    next.run(request).await
}
