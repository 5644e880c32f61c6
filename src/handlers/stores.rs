use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::store::Model as StoreModel;
use crate::errors::ServiceError;
use crate::services::reports::{BulkReportResponse, StoreReport};
use crate::services::stores::{
    AssignStoresRequest, CreateStoreRequest, ReviewRecceRequest, StoreListResponse, StoreQuery,
    SubmitInstallationRequest, SubmitRecceRequest, UnassignStoresRequest, UpdateStoreRequest,
    UploadedFile, UploadedImage,
};
use crate::services::BulkReport;
use crate::storage::FolderType;
use crate::workflow::Stage;
use crate::{ApiResponse, AppState};

/// Collected fields of a multipart upload: files plus plain text fields.
pub struct MultipartPayload {
    pub files: Vec<UploadedFile>,
    pub fields: Vec<(String, String)>,
}

pub async fn read_multipart(mut multipart: Multipart) -> Result<MultipartPayload, ServiceError> {
    let mut files = Vec::new();
    let mut fields = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::InvalidInput(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServiceError::InvalidInput(format!("Failed to read file: {e}")))?;
                files.push(UploadedFile {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ServiceError::InvalidInput(format!("Failed to read field: {e}")))?;
                fields.push((name, value));
            }
        }
    }
    Ok(MultipartPayload { files, fields })
}

fn single_file(payload: &MultipartPayload) -> Result<&UploadedFile, ServiceError> {
    match payload.files.as_slice() {
        [file] => Ok(file),
        [] => Err(ServiceError::InvalidInput("No file uploaded".to_string())),
        _ => Err(ServiceError::InvalidInput(
            "Exactly one file is expected".to_string(),
        )),
    }
}

fn text_field<'a>(payload: &'a MultipartPayload, name: &str) -> Option<&'a str> {
    payload
        .fields
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

pub fn csv_download_response(file_name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

fn bulk_status(report: &BulkReport) -> StatusCode {
    if report.error_count == 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/stores",
    params(StoreQuery),
    responses((status = 200, description = "Stores visible to the caller", body = ApiResponse<StoreListResponse>)),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn list_stores(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<StoreQuery>,
) -> Result<Json<ApiResponse<StoreListResponse>>, ServiceError> {
    let list = state.services.stores.list_stores(&user, query).await?;
    Ok(Json(ApiResponse::success(list)))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores",
    request_body = CreateStoreRequest,
    responses(
        (status = 201, description = "Store created", body = ApiResponse<StoreModel>),
        (status = 400, description = "Duplicate dealer code or invalid payload")
    ),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn create_store(
    State(state): State<AppState>,
    Json(request): Json<CreateStoreRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StoreModel>>), ServiceError> {
    let store = state.services.stores.create_store(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(store))))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{id}",
    params(("id" = Uuid, Path, description = "Store id")),
    responses(
        (status = 200, description = "Store detail", body = ApiResponse<StoreModel>),
        (status = 404, description = "Store not found")
    ),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn get_store(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<StoreModel>>, ServiceError> {
    let store = state.services.stores.get_store(&user, id).await?;
    Ok(Json(ApiResponse::success(store)))
}

#[utoipa::path(
    put,
    path = "/api/v1/stores/{id}",
    params(("id" = Uuid, Path, description = "Store id")),
    request_body = UpdateStoreRequest,
    responses((status = 200, description = "Store updated", body = ApiResponse<StoreModel>)),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn update_store(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStoreRequest>,
) -> Result<Json<ApiResponse<StoreModel>>, ServiceError> {
    let store = state.services.stores.update_store(id, request).await?;
    Ok(Json(ApiResponse::success(store)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/stores/{id}",
    params(("id" = Uuid, Path, description = "Store id")),
    responses((status = 200, description = "Store deleted")),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn delete_store(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.stores.delete_store(id).await?;
    Ok(Json(ApiResponse::message("Store deleted")))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/upload",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "All rows imported", body = ApiResponse<BulkReport>),
        (status = 200, description = "Imported with row errors", body = ApiResponse<BulkReport>)
    ),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn upload_stores(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<BulkReport>>), ServiceError> {
    let payload = read_multipart(multipart).await?;
    let file = single_file(&payload)?;
    let client_code = text_field(&payload, "client_code").map(str::to_uppercase);
    let client_id = text_field(&payload, "client_id")
        .map(Uuid::parse_str)
        .transpose()
        .map_err(|_| ServiceError::InvalidInput("Invalid client id".to_string()))?;

    let report = state
        .services
        .imports
        .bulk_upload_stores(client_code, client_id, &file.bytes)
        .await?;
    Ok((bulk_status(&report), Json(ApiResponse::success(report))))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/template",
    responses((status = 200, description = "Empty upload sheet", content_type = "text/csv")),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn store_template(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let bytes = state.services.reports.store_template()?;
    Ok(csv_download_response("store-upload-template.csv", bytes))
}

fn require_admin(user: &AuthUser) -> Result<(), ServiceError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "This operation is restricted to administrators".to_string(),
        ))
    }
}

async fn assign(
    state: AppState,
    user: AuthUser,
    stage: Stage,
    request: AssignStoresRequest,
) -> Result<(StatusCode, Json<ApiResponse<BulkReport>>), ServiceError> {
    require_admin(&user)?;
    let report = state
        .services
        .stores
        .assign_stores(stage, request, &user)
        .await?;
    Ok((bulk_status(&report), Json(ApiResponse::success(report))))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/recce/assign",
    request_body = AssignStoresRequest,
    responses((status = 200, description = "Assignment report", body = ApiResponse<BulkReport>)),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn assign_recce(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<AssignStoresRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BulkReport>>), ServiceError> {
    assign(state, user, Stage::Recce, request).await
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/installation/assign",
    request_body = AssignStoresRequest,
    responses((status = 200, description = "Assignment report", body = ApiResponse<BulkReport>)),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn assign_installation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<AssignStoresRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BulkReport>>), ServiceError> {
    assign(state, user, Stage::Installation, request).await
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/recce/unassign",
    request_body = UnassignStoresRequest,
    responses((status = 200, description = "Unassignment report", body = ApiResponse<BulkReport>)),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn unassign_recce(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<UnassignStoresRequest>,
) -> Result<Json<ApiResponse<BulkReport>>, ServiceError> {
    require_admin(&user)?;
    let report = state
        .services
        .stores
        .unassign_stores(Stage::Recce, request)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/installation/unassign",
    request_body = UnassignStoresRequest,
    responses((status = 200, description = "Unassignment report", body = ApiResponse<BulkReport>)),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn unassign_installation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<UnassignStoresRequest>,
) -> Result<Json<ApiResponse<BulkReport>>, ServiceError> {
    require_admin(&user)?;
    let report = state
        .services
        .stores
        .unassign_stores(Stage::Installation, request)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

async fn assign_sheet(
    state: AppState,
    user: AuthUser,
    stage: Stage,
    assignee_id: Uuid,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<BulkReport>>), ServiceError> {
    require_admin(&user)?;
    let payload = read_multipart(multipart).await?;
    let file = single_file(&payload)?;
    let report = state
        .services
        .imports
        .assign_from_sheet(stage, assignee_id, &user, &file.bytes)
        .await?;
    Ok((bulk_status(&report), Json(ApiResponse::success(report))))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/recce/assign-sheet/{user_id}",
    params(("user_id" = Uuid, Path, description = "Assignee")),
    request_body(content_type = "multipart/form-data"),
    responses((status = 200, description = "Roster assignment report", body = ApiResponse<BulkReport>)),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn assign_recce_sheet(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<BulkReport>>), ServiceError> {
    assign_sheet(state, user, Stage::Recce, user_id, multipart).await
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/installation/assign-sheet/{user_id}",
    params(("user_id" = Uuid, Path, description = "Assignee")),
    request_body(content_type = "multipart/form-data"),
    responses((status = 200, description = "Roster assignment report", body = ApiResponse<BulkReport>)),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn assign_installation_sheet(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<BulkReport>>), ServiceError> {
    assign_sheet(state, user, Stage::Installation, user_id, multipart).await
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{id}/recce",
    params(("id" = Uuid, Path, description = "Store id")),
    request_body = SubmitRecceRequest,
    responses(
        (status = 200, description = "Recce submitted", body = ApiResponse<StoreModel>),
        (status = 403, description = "Recce is assigned to another user")
    ),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn submit_recce(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitRecceRequest>,
) -> Result<Json<ApiResponse<StoreModel>>, ServiceError> {
    let store = state.services.stores.submit_recce(id, &user, request).await?;
    Ok(Json(ApiResponse::success(store)))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{id}/recce/review",
    params(("id" = Uuid, Path, description = "Store id")),
    request_body = ReviewRecceRequest,
    responses(
        (status = 200, description = "Review applied", body = ApiResponse<StoreModel>),
        (status = 400, description = "No submitted recce to review")
    ),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn review_recce(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ReviewRecceRequest>,
) -> Result<Json<ApiResponse<StoreModel>>, ServiceError> {
    require_admin(&user)?;
    let store = state.services.stores.review_recce(id, request).await?;
    Ok(Json(ApiResponse::success(store)))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{id}/installation",
    params(("id" = Uuid, Path, description = "Store id")),
    request_body = SubmitInstallationRequest,
    responses(
        (status = 200, description = "Installation submitted", body = ApiResponse<StoreModel>),
        (status = 403, description = "Installation is assigned to another user")
    ),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn submit_installation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitInstallationRequest>,
) -> Result<Json<ApiResponse<StoreModel>>, ServiceError> {
    let store = state
        .services
        .stores
        .submit_installation(id, &user, request)
        .await?;
    Ok(Json(ApiResponse::success(store)))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{id}/images/{folder}",
    params(
        ("id" = Uuid, Path, description = "Store id"),
        ("folder" = String, Path, description = "initial, recce or installation")
    ),
    request_body(content_type = "multipart/form-data"),
    responses((status = 201, description = "Images stored", body = ApiResponse<Vec<UploadedImage>>)),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn upload_images(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, folder)): Path<(Uuid, String)>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Vec<UploadedImage>>>), ServiceError> {
    let folder = FolderType::parse(&folder)?;
    let payload = read_multipart(multipart).await?;
    let images = state
        .services
        .stores
        .upload_images(id, &user, folder, payload.files)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(images))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/stores/{id}/images/{folder}/{file_name}",
    params(
        ("id" = Uuid, Path, description = "Store id"),
        ("folder" = String, Path, description = "initial, recce or installation"),
        ("file_name" = String, Path, description = "Stored file name")
    ),
    responses((status = 200, description = "Image removed")),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn delete_image(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, folder, file_name)): Path<(Uuid, String, String)>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    let folder = FolderType::parse(&folder)?;
    state
        .services
        .stores
        .delete_image(id, &user, folder, &file_name)
        .await?;
    Ok(Json(ApiResponse::message("Image removed")))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{id}/report",
    params(("id" = Uuid, Path, description = "Store id")),
    responses(
        (status = 200, description = "Report document", body = ApiResponse<StoreReport>),
        (status = 400, description = "Store has no submitted recce data")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn store_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<StoreReport>>, ServiceError> {
    let report = state.services.reports.store_report(id).await?;
    Ok(Json(ApiResponse::success(report)))
}

#[derive(Debug, serde::Deserialize, utoipa::IntoParams)]
pub struct BulkReportQuery {
    /// Restrict to one workflow status.
    pub status: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/reports",
    params(BulkReportQuery),
    responses((status = 200, description = "Report documents", body = ApiResponse<BulkReportResponse>)),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn bulk_reports(
    State(state): State<AppState>,
    Query(query): Query<BulkReportQuery>,
) -> Result<Json<ApiResponse<BulkReportResponse>>, ServiceError> {
    let reports = state.services.reports.bulk_reports(query.status).await?;
    Ok(Json(ApiResponse::success(reports)))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/tasks/{stage}/export",
    params(("stage" = String, Path, description = "recce or installation")),
    responses((status = 200, description = "Task sheet", content_type = "text/csv")),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn export_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    Path(stage): Path<String>,
) -> Result<Response, ServiceError> {
    let stage = Stage::parse(&stage)?;
    let bytes = state.services.reports.export_tasks(&user, stage).await?;
    let name = match stage {
        Stage::Recce => "recce-tasks.csv",
        Stage::Installation => "installation-tasks.csv",
    };
    Ok(csv_download_response(name, bytes))
}
