use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthUser, RoleCode};
use crate::db::DbPool;
use crate::entities::{
    role,
    store::{
        self, ActiveModel as StoreActiveModel, Entity as StoreEntity, InstallationData,
        InstallationPhoto, Model as StoreModel, RecceData, ReccePhoto,
    },
    user::Entity as UserEntity,
    user_role,
};
use crate::errors::ServiceError;
use crate::services::BulkReport;
use crate::storage::{FolderType, UploadService};
use crate::workflow::{
    check_assignment, check_review, derive_store_id, rejection_note, AssignmentPolicy,
    ReviewDecision, Stage, StoreStatus,
};

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateStoreRequest {
    #[validate(length(min = 1, max = 100, message = "Dealer code is required"))]
    pub dealer_code: String,
    #[validate(length(min = 1, max = 255, message = "Store name is required"))]
    pub store_name: String,
    pub project_ref: Option<String>,
    pub vendor_code: Option<String>,
    pub client_code: Option<String>,
    pub client_id: Option<Uuid>,
    pub zone: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub board_width_ft: Option<Decimal>,
    pub board_height_ft: Option<Decimal>,
    pub board_type: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateStoreRequest {
    pub store_name: Option<String>,
    /// Admin override of the workflow status. The only way to reach COMPLETED.
    pub current_status: Option<StoreStatus>,
    pub project_ref: Option<String>,
    pub vendor_code: Option<String>,
    pub client_code: Option<String>,
    pub client_id: Option<Uuid>,
    pub zone: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub board_width_ft: Option<Decimal>,
    pub board_height_ft: Option<Decimal>,
    pub board_type: Option<String>,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct StoreQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Filter on one workflow status.
    pub status: Option<String>,
    pub city: Option<String>,
    pub client_code: Option<String>,
    /// Substring match on dealer code, store name or store id.
    pub search: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StoreListResponse {
    pub stores: Vec<StoreModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct AssignStoresRequest {
    #[validate(length(min = 1, message = "At least one store id is required"))]
    pub store_ids: Vec<Uuid>,
    pub assignee_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct UnassignStoresRequest {
    #[validate(length(min = 1, message = "At least one store id is required"))]
    pub store_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ReccePhotoInput {
    pub url: String,
    pub width: f64,
    pub height: f64,
    pub unit: Option<String>,
    #[serde(default)]
    pub elements: Vec<crate::entities::store::BrandingElementLine>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SubmitRecceRequest {
    pub notes: Option<String>,
    #[serde(default)]
    pub site_photos: Vec<String>,
    #[serde(default)]
    pub photos: Vec<ReccePhotoInput>,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct ReviewRecceRequest {
    pub decision: ReviewDecision,
    /// Required when rejecting; prepended to the recce notes.
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct InstallationPhotoInput {
    pub url: String,
    pub recce_photo_index: u32,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SubmitInstallationRequest {
    #[serde(default)]
    pub photos: Vec<InstallationPhotoInput>,
}

/// An uploaded file as pulled out of a multipart request.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UploadedImage {
    pub file_name: String,
    pub url: String,
}

/// Store CRUD and workflow transitions.
#[derive(Clone)]
pub struct StoreService {
    db: Arc<DbPool>,
    uploads: Arc<UploadService>,
}

impl StoreService {
    pub fn new(db: Arc<DbPool>, uploads: Arc<UploadService>) -> Self {
        Self { db, uploads }
    }

    /// Manual single-store creation (as opposed to the bulk sheet upload).
    #[instrument(skip(self, request), fields(dealer_code = %request.dealer_code))]
    pub async fn create_store(&self, request: CreateStoreRequest) -> Result<StoreModel, ServiceError> {
        request.validate()?;
        let db = &*self.db;

        let existing = StoreEntity::find()
            .filter(store::Column::DealerCode.eq(request.dealer_code.trim().to_uppercase()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::InvalidInput(
                "A store with this Dealer Code already exists".to_string(),
            ));
        }

        let business_id = derive_store_id(
            request.city.as_deref().unwrap_or(""),
            request.district.as_deref().unwrap_or(""),
            &request.dealer_code,
        );

        let now = Utc::now();
        let model = StoreActiveModel {
            id: Set(Uuid::new_v4()),
            dealer_code: Set(request.dealer_code.trim().to_uppercase()),
            store_id: Set(business_id),
            store_name: Set(request.store_name),
            project_ref: Set(request.project_ref),
            vendor_code: Set(request.vendor_code),
            client_code: Set(request.client_code),
            client_id: Set(request.client_id),
            zone: Set(request.zone),
            state: Set(request.state),
            district: Set(request.district),
            city: Set(request.city),
            address: Set(request.address),
            board_width_ft: Set(request.board_width_ft),
            board_height_ft: Set(request.board_height_ft),
            board_type: Set(request.board_type),
            current_status: Set(StoreStatus::ManuallyAdded.to_string()),
            recce_assigned_to: Set(None),
            recce_assigned_by: Set(None),
            recce_assigned_at: Set(None),
            installation_assigned_to: Set(None),
            installation_assigned_by: Set(None),
            installation_assigned_at: Set(None),
            recce: Set(None),
            installation: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = model.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to insert store");
            ServiceError::DatabaseError(e)
        })?;
        info!(store_id = %created.id, "Store created");
        Ok(created)
    }

    /// Lists stores visible to `user`. Admins see everything; field users see
    /// only the stores currently assigned to them.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn list_stores(
        &self,
        user: &AuthUser,
        query: StoreQuery,
    ) -> Result<StoreListResponse, ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let mut find = StoreEntity::find();
        if !user.is_admin() {
            let mut visible = Condition::any();
            if user.has_role(RoleCode::Recce) {
                visible = visible.add(store::Column::RecceAssignedTo.eq(user.user_id));
            }
            if user.has_role(RoleCode::Installation) {
                visible = visible.add(store::Column::InstallationAssignedTo.eq(user.user_id));
            }
            if visible.is_empty() {
                return Ok(StoreListResponse {
                    stores: Vec::new(),
                    total: 0,
                    page,
                    per_page,
                });
            }
            find = find.filter(visible);
        }

        if let Some(status) = &query.status {
            let status = StoreStatus::parse(status)?;
            find = find.filter(store::Column::CurrentStatus.eq(status.to_string()));
        }
        if let Some(city) = &query.city {
            find = find.filter(store::Column::City.eq(city.trim()));
        }
        if let Some(client_code) = &query.client_code {
            find = find.filter(store::Column::ClientCode.eq(client_code.trim()));
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            find = find.filter(
                Condition::any()
                    .add(store::Column::DealerCode.contains(search))
                    .add(store::Column::StoreName.contains(search))
                    .add(store::Column::StoreId.contains(search)),
            );
        }

        let paginator = find
            .order_by_desc(store::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let stores = paginator.fetch_page(page - 1).await?;

        Ok(StoreListResponse {
            stores,
            total,
            page,
            per_page,
        })
    }

    /// Fetches one store, enforcing assignment-scoped visibility.
    pub async fn get_store(&self, user: &AuthUser, id: Uuid) -> Result<StoreModel, ServiceError> {
        let store = StoreEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Store {id} not found")))?;

        if !user.is_admin()
            && store.recce_assigned_to != Some(user.user_id)
            && store.installation_assigned_to != Some(user.user_id)
        {
            return Err(ServiceError::Forbidden(
                "You do not have access to this store".to_string(),
            ));
        }
        Ok(store)
    }

    #[instrument(skip(self, request))]
    pub async fn update_store(
        &self,
        id: Uuid,
        request: UpdateStoreRequest,
    ) -> Result<StoreModel, ServiceError> {
        request.validate()?;
        let store = StoreEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Store {id} not found")))?;

        let mut active = store.into_active_model();
        if let Some(v) = request.store_name {
            active.store_name = Set(v);
        }
        if let Some(v) = request.project_ref {
            active.project_ref = Set(Some(v));
        }
        if let Some(v) = request.vendor_code {
            active.vendor_code = Set(Some(v));
        }
        if let Some(v) = request.client_code {
            active.client_code = Set(Some(v));
        }
        if let Some(v) = request.client_id {
            active.client_id = Set(Some(v));
        }
        if let Some(v) = request.zone {
            active.zone = Set(Some(v));
        }
        if let Some(v) = request.state {
            active.state = Set(Some(v));
        }
        if let Some(v) = request.district {
            active.district = Set(Some(v));
        }
        if let Some(v) = request.city {
            active.city = Set(Some(v));
        }
        if let Some(v) = request.address {
            active.address = Set(Some(v));
        }
        if let Some(v) = request.board_width_ft {
            active.board_width_ft = Set(Some(v));
        }
        if let Some(v) = request.board_height_ft {
            active.board_height_ft = Set(Some(v));
        }
        if let Some(v) = request.board_type {
            active.board_type = Set(Some(v));
        }
        if let Some(v) = request.current_status {
            active.current_status = Set(v.to_string());
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_store(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = StoreEntity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Store {id} not found")));
        }
        info!(store_id = %id, "Store deleted");
        Ok(())
    }

    /// Bulk assignment from an explicit id list. Assigns unconditionally
    /// regardless of current status; only missing stores fail.
    #[instrument(skip(self, request, assigner), fields(stage = ?stage, assigner = %assigner.user_id))]
    pub async fn assign_stores(
        &self,
        stage: Stage,
        request: AssignStoresRequest,
        assigner: &AuthUser,
    ) -> Result<BulkReport, ServiceError> {
        request.validate()?;
        let db = &*self.db;

        let assignee = UserEntity::find_by_id(request.assignee_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Assignee not found".to_string()))?;
        if !assignee.is_active {
            return Err(ServiceError::InvalidOperation(
                "Assignee account is deactivated".to_string(),
            ));
        }
        let required = match stage {
            Stage::Recce => RoleCode::Recce,
            Stage::Installation => RoleCode::Installation,
        };
        if !self.user_has_role(request.assignee_id, required).await? {
            return Err(ServiceError::InvalidOperation(format!(
                "Assignee does not have the {required} role"
            )));
        }

        let mut report = BulkReport::default();
        let now = Utc::now();
        for (index, store_id) in request.store_ids.iter().enumerate() {
            let row = index + 1;
            let store = match StoreEntity::find_by_id(*store_id).one(db).await? {
                Some(store) => store,
                None => {
                    report.record_error(
                        row,
                        Some(store_id.to_string()),
                        "Store not found".to_string(),
                    );
                    continue;
                }
            };

            let current = StoreStatus::parse(&store.current_status)?;
            let next = match check_assignment(AssignmentPolicy::Direct, stage, current) {
                Ok(next) => next,
                Err(err) => {
                    report.record_error(row, Some(store.dealer_code.clone()), err.to_string());
                    continue;
                }
            };

            let mut active = store.into_active_model();
            match stage {
                Stage::Recce => {
                    active.recce_assigned_to = Set(Some(request.assignee_id));
                    active.recce_assigned_by = Set(Some(assigner.user_id));
                    active.recce_assigned_at = Set(Some(now));
                }
                Stage::Installation => {
                    active.installation_assigned_to = Set(Some(request.assignee_id));
                    active.installation_assigned_by = Set(Some(assigner.user_id));
                    active.installation_assigned_at = Set(Some(now));
                }
            }
            active.current_status = Set(next.to_string());
            active.updated_at = Set(now);
            active.update(db).await?;
            report.record_success();
        }

        info!(
            assigned = report.success_count,
            failed = report.error_count,
            "Bulk assignment finished"
        );
        Ok(report)
    }

    /// Clears an assignment and rolls the status back to the stage's
    /// pre-assignment state.
    #[instrument(skip(self, request), fields(stage = ?stage))]
    pub async fn unassign_stores(
        &self,
        stage: Stage,
        request: UnassignStoresRequest,
    ) -> Result<BulkReport, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let mut report = BulkReport::default();
        let now = Utc::now();

        for (index, store_id) in request.store_ids.iter().enumerate() {
            let row = index + 1;
            let store = match StoreEntity::find_by_id(*store_id).one(db).await? {
                Some(store) => store,
                None => {
                    report.record_error(
                        row,
                        Some(store_id.to_string()),
                        "Store not found".to_string(),
                    );
                    continue;
                }
            };

            let mut active = store.into_active_model();
            match stage {
                Stage::Recce => {
                    active.recce_assigned_to = Set(None);
                    active.recce_assigned_by = Set(None);
                    active.recce_assigned_at = Set(None);
                }
                Stage::Installation => {
                    active.installation_assigned_to = Set(None);
                    active.installation_assigned_by = Set(None);
                    active.installation_assigned_at = Set(None);
                }
            }
            active.current_status = Set(stage.unassigned_status().to_string());
            active.updated_at = Set(now);
            active.update(db).await?;
            report.record_success();
        }
        Ok(report)
    }

    /// Recce submission by the assigned surveyor. Also the resubmission path
    /// after a rejection.
    #[instrument(skip(self, request, user), fields(store = %id, user_id = %user.user_id))]
    pub async fn submit_recce(
        &self,
        id: Uuid,
        user: &AuthUser,
        request: SubmitRecceRequest,
    ) -> Result<StoreModel, ServiceError> {
        let store = StoreEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Store {id} not found")))?;

        if !user.is_admin() && store.recce_assigned_to != Some(user.user_id) {
            return Err(ServiceError::Forbidden(
                "This store's recce is not assigned to you".to_string(),
            ));
        }
        let business_id = self.ensure_store_id(&store)?;
        let recce = RecceData {
            submitted_at: Utc::now(),
            submitted_by: user.name.clone(),
            notes: request.notes,
            site_photos: request.site_photos,
            photos: request
                .photos
                .into_iter()
                .map(|p| ReccePhoto {
                    url: p.url,
                    width: p.width,
                    height: p.height,
                    unit: p.unit.unwrap_or_else(|| "ft".to_string()),
                    elements: p.elements,
                })
                .collect(),
        };

        let mut active = store.into_active_model();
        active.store_id = Set(Some(business_id));
        active.recce = Set(Some(recce));
        active.current_status = Set(StoreStatus::RecceSubmitted.to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;
        info!(store = %id, "Recce submitted");
        Ok(updated)
    }

    /// Admin review of a submitted recce. A rejection stamps the remarks into
    /// the recce notes so the surveyor sees them on resubmission.
    #[instrument(skip(self, request), fields(store = %id))]
    pub async fn review_recce(
        &self,
        id: Uuid,
        request: ReviewRecceRequest,
    ) -> Result<StoreModel, ServiceError> {
        let store = StoreEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Store {id} not found")))?;

        let current = StoreStatus::parse(&store.current_status)?;
        let next = check_review(request.decision, current)?;

        let mut recce = store.recce.clone();
        if request.decision == ReviewDecision::Rejected {
            let remarks = request
                .remarks
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or_else(|| {
                    ServiceError::InvalidInput("Remarks are required when rejecting".to_string())
                })?;
            if let Some(data) = recce.as_mut() {
                let note = rejection_note(remarks);
                data.notes = Some(match data.notes.take() {
                    Some(existing) => format!("{note}\n{existing}"),
                    None => note,
                });
            }
        }

        let mut active = store.into_active_model();
        active.recce = Set(recce);
        active.current_status = Set(next.to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;
        info!(store = %id, decision = ?request.decision, "Recce reviewed");
        Ok(updated)
    }

    /// Installation submission by the assigned installer.
    #[instrument(skip(self, request, user), fields(store = %id, user_id = %user.user_id))]
    pub async fn submit_installation(
        &self,
        id: Uuid,
        user: &AuthUser,
        request: SubmitInstallationRequest,
    ) -> Result<StoreModel, ServiceError> {
        let store = StoreEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Store {id} not found")))?;

        if !user.is_admin() && store.installation_assigned_to != Some(user.user_id) {
            return Err(ServiceError::Forbidden(
                "This store's installation is not assigned to you".to_string(),
            ));
        }
        let business_id = self.ensure_store_id(&store)?;
        let installation = InstallationData {
            submitted_at: Utc::now(),
            submitted_by: user.name.clone(),
            photos: request
                .photos
                .into_iter()
                .map(|p| InstallationPhoto {
                    url: p.url,
                    recce_photo_index: p.recce_photo_index,
                })
                .collect(),
        };

        let mut active = store.into_active_model();
        active.store_id = Set(Some(business_id));
        active.installation = Set(Some(installation));
        active.current_status = Set(StoreStatus::InstallationSubmitted.to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;
        info!(store = %id, "Installation submitted");
        Ok(updated)
    }

    /// Uploads one or more images for a store into the given folder, storing
    /// them under the store's business id.
    #[instrument(skip(self, user, files), fields(store = %id, count = files.len()))]
    pub async fn upload_images(
        &self,
        id: Uuid,
        user: &AuthUser,
        folder: FolderType,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<UploadedImage>, ServiceError> {
        if files.is_empty() {
            return Err(ServiceError::InvalidInput("No files uploaded".to_string()));
        }
        let store = self.get_store(user, id).await?;
        let business_id = self.ensure_store_id(&store)?;
        if store.store_id.as_deref() != Some(business_id.as_str()) {
            let mut active = store.clone().into_active_model();
            active.store_id = Set(Some(business_id.clone()));
            active.updated_at = Set(Utc::now());
            active.update(&*self.db).await?;
        }
        let client_code = store.client_code.clone().unwrap_or_else(|| "GENERAL".to_string());

        let mut uploaded = Vec::with_capacity(files.len());
        for file in files {
            let stored = self
                .uploads
                .store(folder, &client_code, &business_id, &file.file_name, file.bytes)
                .await?;
            uploaded.push(UploadedImage {
                file_name: stored.file_name,
                url: stored.url,
            });
        }
        info!(store = %id, uploaded = uploaded.len(), "Images uploaded");
        Ok(uploaded)
    }

    /// Deletes a previously uploaded image. Deletion failures on the backend
    /// are logged but not surfaced; the reference is already gone client-side.
    #[instrument(skip(self, user), fields(store = %id))]
    pub async fn delete_image(
        &self,
        id: Uuid,
        user: &AuthUser,
        folder: FolderType,
        file_name: &str,
    ) -> Result<(), ServiceError> {
        let store = self.get_store(user, id).await?;
        let business_id = store.store_id.clone().ok_or_else(|| {
            ServiceError::InvalidOperation("Store has no generated Store ID yet".to_string())
        })?;
        let client_code = store.client_code.clone().unwrap_or_else(|| "GENERAL".to_string());

        if let Err(err) = self
            .uploads
            .delete(folder, &client_code, &business_id, file_name)
            .await
        {
            warn!(error = %err, file = file_name, "Image delete failed on storage backend");
        }
        Ok(())
    }

    /// Resolves the business store id, deriving it when the store has none.
    /// Callers persist the derived id together with their own update.
    fn ensure_store_id(&self, store: &StoreModel) -> Result<String, ServiceError> {
        if let Some(existing) = &store.store_id {
            return Ok(existing.clone());
        }
        let city = store.city.as_deref().unwrap_or("");
        let district = store.district.as_deref().unwrap_or("");
        derive_store_id(city, district, &store.dealer_code).ok_or_else(|| {
            ServiceError::InvalidOperation(
                "City and District are required to generate the Store ID".to_string(),
            )
        })
    }

    async fn user_has_role(&self, user_id: Uuid, code: RoleCode) -> Result<bool, ServiceError> {
        let count = user_role::Entity::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .inner_join(role::Entity)
            .filter(role::Column::Code.eq(code.to_string()))
            .count(&*self.db)
            .await?;
        Ok(count > 0)
    }
}
