use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use crate::entities::element::Model as ElementModel;
use crate::errors::ServiceError;
use crate::services::elements::{CreateElementRequest, UpdateElementRequest};
use crate::{ApiResponse, AppState};

#[utoipa::path(
    get,
    path = "/api/v1/elements",
    responses((status = 200, description = "Element catalogue", body = ApiResponse<Vec<ElementModel>>)),
    security(("bearer_auth" = [])),
    tag = "elements"
)]
pub async fn list_elements(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ElementModel>>>, ServiceError> {
    let elements = state.services.elements.list_elements().await?;
    Ok(Json(ApiResponse::success(elements)))
}

#[utoipa::path(
    post,
    path = "/api/v1/elements",
    request_body = CreateElementRequest,
    responses((status = 201, description = "Element created", body = ApiResponse<ElementModel>)),
    security(("bearer_auth" = [])),
    tag = "elements"
)]
pub async fn create_element(
    State(state): State<AppState>,
    Json(request): Json<CreateElementRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ElementModel>>), ServiceError> {
    let element = state.services.elements.create_element(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(element))))
}

#[utoipa::path(
    get,
    path = "/api/v1/elements/{id}",
    params(("id" = Uuid, Path, description = "Element id")),
    responses((status = 200, description = "Element detail", body = ApiResponse<ElementModel>)),
    security(("bearer_auth" = [])),
    tag = "elements"
)]
pub async fn get_element(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ElementModel>>, ServiceError> {
    let element = state.services.elements.get_element(id).await?;
    Ok(Json(ApiResponse::success(element)))
}

#[utoipa::path(
    put,
    path = "/api/v1/elements/{id}",
    params(("id" = Uuid, Path, description = "Element id")),
    request_body = UpdateElementRequest,
    responses((status = 200, description = "Element updated", body = ApiResponse<ElementModel>)),
    security(("bearer_auth" = [])),
    tag = "elements"
)]
pub async fn update_element(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateElementRequest>,
) -> Result<Json<ApiResponse<ElementModel>>, ServiceError> {
    let element = state.services.elements.update_element(id, request).await?;
    Ok(Json(ApiResponse::success(element)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/elements/{id}",
    params(("id" = Uuid, Path, description = "Element id")),
    responses((status = 200, description = "Element deleted")),
    security(("bearer_auth" = [])),
    tag = "elements"
)]
pub async fn delete_element(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.elements.delete_element(id).await?;
    Ok(Json(ApiResponse::message("Element deleted")))
}
