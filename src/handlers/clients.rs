use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use crate::entities::client::Model as ClientModel;
use crate::errors::ServiceError;
use crate::services::clients::{
    ClientListResponse, ClientQuery, CreateClientRequest, UpdateClientRequest,
};
use crate::{ApiResponse, AppState};

#[utoipa::path(
    get,
    path = "/api/v1/clients",
    params(ClientQuery),
    responses((status = 200, description = "Clients", body = ApiResponse<ClientListResponse>)),
    security(("bearer_auth" = [])),
    tag = "clients"
)]
pub async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<ClientQuery>,
) -> Result<Json<ApiResponse<ClientListResponse>>, ServiceError> {
    let list = state.services.clients.list_clients(query).await?;
    Ok(Json(ApiResponse::success(list)))
}

#[utoipa::path(
    post,
    path = "/api/v1/clients",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created", body = ApiResponse<ClientModel>),
        (status = 400, description = "Duplicate client code or invalid payload")
    ),
    security(("bearer_auth" = [])),
    tag = "clients"
)]
pub async fn create_client(
    State(state): State<AppState>,
    Json(request): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ClientModel>>), ServiceError> {
    let client = state.services.clients.create_client(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(client))))
}

#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}",
    params(("id" = Uuid, Path, description = "Client id")),
    responses((status = 200, description = "Client detail", body = ApiResponse<ClientModel>)),
    security(("bearer_auth" = [])),
    tag = "clients"
)]
pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ClientModel>>, ServiceError> {
    let client = state.services.clients.get_client(id).await?;
    Ok(Json(ApiResponse::success(client)))
}

#[utoipa::path(
    put,
    path = "/api/v1/clients/{id}",
    params(("id" = Uuid, Path, description = "Client id")),
    request_body = UpdateClientRequest,
    responses((status = 200, description = "Client updated", body = ApiResponse<ClientModel>)),
    security(("bearer_auth" = [])),
    tag = "clients"
)]
pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateClientRequest>,
) -> Result<Json<ApiResponse<ClientModel>>, ServiceError> {
    let client = state.services.clients.update_client(id, request).await?;
    Ok(Json(ApiResponse::success(client)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/clients/{id}",
    params(("id" = Uuid, Path, description = "Client id")),
    responses((status = 200, description = "Client deleted")),
    security(("bearer_auth" = [])),
    tag = "clients"
)]
pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.clients.delete_client(id).await?;
    Ok(Json(ApiResponse::message("Client deleted")))
}
