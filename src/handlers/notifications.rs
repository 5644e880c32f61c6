use axum::extract::State;
use axum::response::Json;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::notifications::Notification;
use crate::{ApiResponse, AppState};

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    responses((status = 200, description = "Open work items for the caller", body = ApiResponse<Vec<Notification>>)),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<Notification>>>, ServiceError> {
    let notifications = state.services.notifications.for_user(&user).await?;
    Ok(Json(ApiResponse::success(notifications)))
}
