use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use crate::entities::role::Model as RoleModel;
use crate::errors::ServiceError;
use crate::services::users::{CreateRoleRequest, UpdateRoleRequest};
use crate::{ApiResponse, AppState};

#[utoipa::path(
    get,
    path = "/api/v1/roles",
    responses((status = 200, description = "Roles", body = ApiResponse<Vec<RoleModel>>)),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn list_roles(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<RoleModel>>>, ServiceError> {
    let roles = state.services.users.list_roles().await?;
    Ok(Json(ApiResponse::success(roles)))
}

#[utoipa::path(
    post,
    path = "/api/v1/roles",
    request_body = CreateRoleRequest,
    responses((status = 201, description = "Role created", body = ApiResponse<RoleModel>)),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn create_role(
    State(state): State<AppState>,
    Json(request): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RoleModel>>), ServiceError> {
    let role = state.services.users.create_role(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(role))))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/{id}",
    params(("id" = Uuid, Path, description = "Role id")),
    responses((status = 200, description = "Role detail", body = ApiResponse<RoleModel>)),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RoleModel>>, ServiceError> {
    let role = state.services.users.get_role(id).await?;
    Ok(Json(ApiResponse::success(role)))
}

#[utoipa::path(
    put,
    path = "/api/v1/roles/{id}",
    params(("id" = Uuid, Path, description = "Role id")),
    request_body = UpdateRoleRequest,
    responses((status = 200, description = "Role updated", body = ApiResponse<RoleModel>)),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<ApiResponse<RoleModel>>, ServiceError> {
    let role = state.services.users.update_role(id, request).await?;
    Ok(Json(ApiResponse::success(role)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/roles/{id}",
    params(("id" = Uuid, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role deleted"),
        (status = 400, description = "Role is still assigned to users")
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.users.delete_role(id).await?;
    Ok(Json(ApiResponse::message("Role deleted")))
}
