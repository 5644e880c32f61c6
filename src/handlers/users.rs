use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Json, Response};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::stores::read_multipart;
use crate::services::users::{
    CreateUserRequest, UpdateUserRequest, UserListResponse, UserQuery, UserResponse,
};
use crate::services::BulkReport;
use crate::{ApiResponse, AppState};

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserQuery),
    responses((status = 200, description = "Users", body = ApiResponse<UserListResponse>)),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<UserListResponse>>, ServiceError> {
    let list = state.services.users.list_users(query).await?;
    Ok(Json(ApiResponse::success(list)))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserResponse>),
        (status = 400, description = "Duplicate email or invalid payload")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ServiceError> {
    let user = state.services.users.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "User detail", body = ApiResponse<UserResponse>)),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserResponse>>, ServiceError> {
    let user = state.services.users.get_user(id).await?;
    Ok(Json(ApiResponse::success(user)))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses((status = 200, description = "User updated", body = ApiResponse<UserResponse>)),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ServiceError> {
    let user = state.services.users.update_user(id, request).await?;
    Ok(Json(ApiResponse::success(user)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "User deleted")),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.users.delete_user(id).await?;
    Ok(Json(ApiResponse::message("User deleted")))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/by-role/{code}",
    params(("code" = String, Path, description = "Role code, e.g. RECCE")),
    responses((status = 200, description = "Active users with the role", body = ApiResponse<Vec<UserResponse>>)),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn users_by_role(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ServiceError> {
    let users = state
        .services
        .users
        .users_by_role(&code.to_uppercase())
        .await?;
    Ok(Json(ApiResponse::success(users)))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/upload",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "All rows imported", body = ApiResponse<BulkReport>),
        (status = 200, description = "Imported with row errors", body = ApiResponse<BulkReport>)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn upload_users(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<BulkReport>>), ServiceError> {
    let payload = read_multipart(multipart).await?;
    let file = payload
        .files
        .first()
        .ok_or_else(|| ServiceError::InvalidInput("No file uploaded".to_string()))?;
    let report = state.services.users.bulk_upload_users(&file.bytes).await?;
    let status = if report.error_count == 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ApiResponse::success(report))))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/export",
    responses((status = 200, description = "User sheet", content_type = "text/csv")),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn export_users(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let bytes = state.services.users.export_users().await?;
    Ok(super::stores::csv_download_response("users.csv", bytes))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/template",
    responses((status = 200, description = "Empty upload sheet", content_type = "text/csv")),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn user_template(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let bytes = state.services.users.user_template()?;
    Ok(super::stores::csv_download_response(
        "user-upload-template.csv",
        bytes,
    ))
}
