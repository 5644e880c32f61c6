use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, Set,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{AuthUser, RoleCode};
use crate::db::DbPool;
use crate::entities::{
    role,
    store::{self, ActiveModel as StoreActiveModel, Entity as StoreEntity},
    user::Entity as UserEntity,
    user_role,
};
use crate::errors::ServiceError;
use crate::services::BulkReport;
use crate::spreadsheet::{read_assignment_rows, read_store_rows};
use crate::workflow::{check_assignment, derive_store_id, AssignmentPolicy, Stage, StoreStatus};

/// Spreadsheet-driven bulk operations: the initial store upload and the
/// per-user roster assignment sheets.
#[derive(Clone)]
pub struct ImportService {
    db: Arc<DbPool>,
}

impl ImportService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Imports the client-provided store sheet. Every row is attempted;
    /// duplicates (within the sheet or against the database) and rows missing
    /// a dealer code are reported individually.
    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub async fn bulk_upload_stores(
        &self,
        client_code: Option<String>,
        client_id: Option<Uuid>,
        bytes: &[u8],
    ) -> Result<BulkReport, ServiceError> {
        let rows = read_store_rows(bytes)?;
        if rows.is_empty() {
            return Err(ServiceError::InvalidInput(
                "The uploaded sheet contains no data rows".to_string(),
            ));
        }

        let db = &*self.db;
        let mut report = BulkReport::default();
        let mut seen = HashSet::new();

        for row in rows {
            let dealer_code = match row.dealer_code.as_deref().map(str::trim) {
                Some(code) if !code.is_empty() => code.to_uppercase(),
                _ => {
                    report.record_error(
                        row.row_number,
                        None,
                        "Skipped: 'Dealer Code' is missing or empty".to_string(),
                    );
                    continue;
                }
            };
            if !seen.insert(dealer_code.clone()) {
                report.record_error(
                    row.row_number,
                    Some(dealer_code),
                    "Duplicate Dealer Code in this file".to_string(),
                );
                continue;
            }
            let store_name = match row.store_name.as_deref().map(str::trim) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => {
                    report.record_error(
                        row.row_number,
                        Some(dealer_code),
                        "Skipped: 'Dealer's Name' is missing or empty".to_string(),
                    );
                    continue;
                }
            };

            let exists = StoreEntity::find()
                .filter(store::Column::DealerCode.eq(dealer_code.as_str()))
                .count(db)
                .await?;
            if exists > 0 {
                report.record_error(
                    row.row_number,
                    Some(dealer_code),
                    "A store with this Dealer Code already exists".to_string(),
                );
                continue;
            }

            // Derive the business id up front when the sheet carries enough
            // data; manual adds without city or district get it lazily on
            // first submission instead.
            let business_id = derive_store_id(
                row.city.as_deref().unwrap_or(""),
                row.district.as_deref().unwrap_or(""),
                &dealer_code,
            );

            let now = Utc::now();
            let model = StoreActiveModel {
                id: Set(Uuid::new_v4()),
                dealer_code: Set(dealer_code),
                store_id: Set(business_id),
                store_name: Set(store_name),
                project_ref: Set(row.serial_no),
                vendor_code: Set(row.vendor_code),
                client_code: Set(client_code.clone()),
                client_id: Set(client_id),
                zone: Set(None),
                state: Set(None),
                district: Set(row.district),
                city: Set(row.city),
                address: Set(row.address),
                board_width_ft: Set(row.width_ft),
                board_height_ft: Set(row.height_ft),
                board_type: Set(row.board_type),
                current_status: Set(StoreStatus::Uploaded.to_string()),
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
            model.insert(db).await?;
            report.record_success();
        }

        info!(
            imported = report.success_count,
            failed = report.error_count,
            "Store sheet import finished"
        );
        Ok(report)
    }

    /// Assigns stores to one field user from an uploaded roster sheet, keyed
    /// on the business store id. Unlike the direct id-list endpoint, each row
    /// must be in an assignable state for the stage.
    #[instrument(skip(self, assigner, bytes), fields(stage = ?stage, assignee = %assignee_id))]
    pub async fn assign_from_sheet(
        &self,
        stage: Stage,
        assignee_id: Uuid,
        assigner: &AuthUser,
        bytes: &[u8],
    ) -> Result<BulkReport, ServiceError> {
        let db = &*self.db;

        let assignee = UserEntity::find_by_id(assignee_id)
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
        let has_role = user_role::Entity::find()
            .filter(user_role::Column::UserId.eq(assignee_id))
            .inner_join(role::Entity)
            .filter(role::Column::Code.eq(required.to_string()))
            .count(db)
            .await?
            > 0;
        if !has_role {
            return Err(ServiceError::InvalidOperation(format!(
                "Assignee does not have the {required} role"
            )));
        }

        let rows = read_assignment_rows(bytes)?;
        if rows.is_empty() {
            return Err(ServiceError::InvalidInput(
                "The uploaded sheet contains no data rows".to_string(),
            ));
        }

        let mut report = BulkReport::default();
        let mut seen = HashSet::new();
        let now = Utc::now();

        for row in rows {
            let business_id = match row.store_id.as_deref().map(str::trim) {
                Some(id) if !id.is_empty() => id.to_uppercase(),
                _ => {
                    report.record_error(
                        row.row_number,
                        None,
                        "Skipped: 'Store ID' is missing or empty".to_string(),
                    );
                    continue;
                }
            };
            if !seen.insert(business_id.clone()) {
                report.record_error(
                    row.row_number,
                    Some(business_id),
                    "Duplicate Store ID in this file".to_string(),
                );
                continue;
            }

            let store = match StoreEntity::find()
                .filter(store::Column::StoreId.eq(business_id.as_str()))
                .one(db)
                .await?
            {
                Some(store) => store,
                None => {
                    report.record_error(
                        row.row_number,
                        Some(business_id),
                        "Store not found".to_string(),
                    );
                    continue;
                }
            };

            if let Some(sheet_client) = row.client_code.as_deref().map(str::trim) {
                if !sheet_client.is_empty()
                    && store.client_code.as_deref() != Some(sheet_client)
                {
                    report.record_error(
                        row.row_number,
                        Some(business_id),
                        "Client Code does not match this store".to_string(),
                    );
                    continue;
                }
            }

            let current = StoreStatus::parse(&store.current_status)?;
            let next = match check_assignment(AssignmentPolicy::Roster, stage, current) {
                Ok(next) => next,
                Err(err) => {
                    report.record_error(row.row_number, Some(business_id), err.to_string());
                    continue;
                }
            };

            let mut active = store.into_active_model();
            match stage {
                Stage::Recce => {
                    active.recce_assigned_to = Set(Some(assignee_id));
                    active.recce_assigned_by = Set(Some(assigner.user_id));
                    active.recce_assigned_at = Set(Some(now));
                }
                Stage::Installation => {
                    active.installation_assigned_to = Set(Some(assignee_id));
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
            "Roster assignment finished"
        );
        Ok(report)
    }
}
