use axum::extract::State;
use axum::response::Json;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::analytics::{DashboardResponse, MyTasksResponse};
use crate::{ApiResponse, AppState};

#[utoipa::path(
    get,
    path = "/api/v1/analytics/dashboard",
    responses((status = 200, description = "Workflow-wide counters", body = ApiResponse<DashboardResponse>)),
    security(("bearer_auth" = [])),
    tag = "analytics"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<DashboardResponse>>, ServiceError> {
    if !user.is_admin() {
        return Err(ServiceError::Forbidden(
            "Dashboard analytics are restricted to administrators".to_string(),
        ));
    }
    let dashboard = state.services.analytics.dashboard().await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/my-tasks",
    responses((status = 200, description = "Caller's task counters", body = ApiResponse<MyTasksResponse>)),
    security(("bearer_auth" = [])),
    tag = "analytics"
)]
pub async fn my_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<MyTasksResponse>>, ServiceError> {
    let tasks = state.services.analytics.my_tasks(&user).await?;
    Ok(Json(ApiResponse::success(tasks)))
}
