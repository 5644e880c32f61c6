use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::{AuthUser, RoleCode};
use crate::db::DbPool;
use crate::entities::{
    client::Entity as ClientEntity,
    element::Entity as ElementEntity,
    store::{self, Entity as StoreEntity, Model as StoreModel},
};
use crate::errors::ServiceError;
use crate::spreadsheet::{write_rows, STORE_TEMPLATE_HEADERS};
use crate::workflow::{Stage, StoreStatus};

/// One costed element line inside a report photo.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ReportElementLine {
    pub element_name: String,
    pub quantity: u32,
    pub rate: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ReportPhoto {
    pub url: String,
    pub width: f64,
    pub height: f64,
    pub unit: String,
    pub elements: Vec<ReportElementLine>,
    /// Installation after-photo covering this recce photo, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installation_url: Option<String>,
}

/// The report document for one store, rendered client-side into the final
/// deliverable. Rates come from the client's contracted lines, falling back
/// to the element's standard rate.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StoreReport {
    pub store_id: Option<String>,
    pub dealer_code: String,
    pub store_name: String,
    pub client_code: Option<String>,
    pub client_name: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub address: Option<String>,
    pub board_width_ft: Option<Decimal>,
    pub board_height_ft: Option<Decimal>,
    pub board_type: Option<String>,
    pub current_status: String,
    pub recce_submitted_at: Option<DateTime<Utc>>,
    pub recce_submitted_by: Option<String>,
    pub recce_notes: Option<String>,
    pub installation_submitted_at: Option<DateTime<Utc>>,
    pub installation_submitted_by: Option<String>,
    pub site_photos: Vec<String>,
    pub photos: Vec<ReportPhoto>,
    pub total_amount: Decimal,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BulkReportResponse {
    pub reports: Vec<StoreReport>,
    pub skipped: Vec<SkippedStore>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SkippedStore {
    pub id: Uuid,
    pub reason: String,
}

/// Report documents and spreadsheet exports.
#[derive(Clone)]
pub struct ReportService {
    db: Arc<DbPool>,
}

impl ReportService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Builds the report for one store. Requires a submitted recce; the
    /// installation section is filled in when present.
    #[instrument(skip(self))]
    pub async fn store_report(&self, id: Uuid) -> Result<StoreReport, ServiceError> {
        let store = StoreEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Store {id} not found")))?;
        self.build_report(store).await
    }

    /// Builds reports for every store matching the given status, skipping
    /// stores without recce data instead of failing the batch.
    #[instrument(skip(self))]
    pub async fn bulk_reports(&self, status: Option<String>) -> Result<BulkReportResponse, ServiceError> {
        let mut find = StoreEntity::find();
        if let Some(status) = &status {
            let status = StoreStatus::parse(status)?;
            find = find.filter(store::Column::CurrentStatus.eq(status.to_string()));
        }
        let stores = find
            .order_by_asc(store::Column::DealerCode)
            .all(&*self.db)
            .await?;

        let mut reports = Vec::new();
        let mut skipped = Vec::new();
        for store in stores {
            let store_pk = store.id;
            match self.build_report(store).await {
                Ok(report) => reports.push(report),
                Err(ServiceError::InvalidOperation(reason)) => {
                    skipped.push(SkippedStore {
                        id: store_pk,
                        reason,
                    });
                }
                Err(other) => return Err(other),
            }
        }
        Ok(BulkReportResponse { reports, skipped })
    }

    async fn build_report(&self, store: StoreModel) -> Result<StoreReport, ServiceError> {
        let recce = store.recce.as_ref().ok_or_else(|| {
            ServiceError::InvalidOperation("Store has no submitted recce data".to_string())
        })?;

        let client = match store.client_id {
            Some(client_id) => ClientEntity::find_by_id(client_id).one(&*self.db).await?,
            None => None,
        };
        let elements = ElementEntity::find().all(&*self.db).await?;

        let rate_for = |element_id: Uuid| -> Decimal {
            if let Some(client) = &client {
                if let Some(line) = client.elements.0.iter().find(|l| l.element_id == element_id) {
                    return line.custom_rate;
                }
            }
            elements
                .iter()
                .find(|e| e.id == element_id)
                .map(|e| e.standard_rate)
                .unwrap_or_default()
        };

        let installation_urls: Vec<Option<String>> = {
            let photos = store
                .installation
                .as_ref()
                .map(|i| i.photos.as_slice())
                .unwrap_or_default();
            (0..recce.photos.len() as u32)
                .map(|index| {
                    photos
                        .iter()
                        .find(|p| p.recce_photo_index == index)
                        .map(|p| p.url.clone())
                })
                .collect()
        };

        let mut total = Decimal::ZERO;
        let photos = recce
            .photos
            .iter()
            .enumerate()
            .map(|(index, photo)| {
                let lines = photo
                    .elements
                    .iter()
                    .map(|line| {
                        let rate = rate_for(line.element_id);
                        let amount = rate * Decimal::from(line.quantity);
                        total += amount;
                        ReportElementLine {
                            element_name: line.element_name.clone(),
                            quantity: line.quantity,
                            rate,
                            amount,
                        }
                    })
                    .collect();
                ReportPhoto {
                    url: photo.url.clone(),
                    width: photo.width,
                    height: photo.height,
                    unit: photo.unit.clone(),
                    elements: lines,
                    installation_url: installation_urls.get(index).cloned().flatten(),
                }
            })
            .collect();

        Ok(StoreReport {
            store_id: store.store_id,
            dealer_code: store.dealer_code,
            store_name: store.store_name,
            client_code: store.client_code,
            client_name: client.map(|c| c.client_name),
            city: store.city,
            district: store.district,
            address: store.address,
            board_width_ft: store.board_width_ft,
            board_height_ft: store.board_height_ft,
            board_type: store.board_type,
            current_status: store.current_status,
            recce_submitted_at: Some(recce.submitted_at),
            recce_submitted_by: Some(recce.submitted_by.clone()),
            recce_notes: recce.notes.clone(),
            installation_submitted_at: store.installation.as_ref().map(|i| i.submitted_at),
            installation_submitted_by: store.installation.as_ref().map(|i| i.submitted_by.clone()),
            site_photos: recce.site_photos.clone(),
            photos,
            total_amount: total,
            generated_at: Utc::now(),
        })
    }

    /// CSV export of a user's open tasks for one stage. Admins get every
    /// store currently sitting in the stage's assigned status.
    #[instrument(skip(self, user), fields(user_id = %user.user_id, stage = ?stage))]
    pub async fn export_tasks(&self, user: &AuthUser, stage: Stage) -> Result<Vec<u8>, ServiceError> {
        let mut find = StoreEntity::find()
            .filter(store::Column::CurrentStatus.eq(stage.assigned_status().to_string()));

        if !user.is_admin() {
            let column = match stage {
                Stage::Recce => store::Column::RecceAssignedTo,
                Stage::Installation => store::Column::InstallationAssignedTo,
            };
            let allowed = match stage {
                Stage::Recce => user.has_role(RoleCode::Recce),
                Stage::Installation => user.has_role(RoleCode::Installation),
            };
            if !allowed {
                return Err(ServiceError::Forbidden(
                    "You do not have tasks for this stage".to_string(),
                ));
            }
            find = find.filter(Condition::all().add(column.eq(user.user_id)));
        }

        let stores = find
            .order_by_asc(store::Column::DealerCode)
            .all(&*self.db)
            .await?;

        let rows = stores
            .into_iter()
            .map(|s| {
                vec![
                    s.store_id.unwrap_or_default(),
                    s.dealer_code,
                    s.store_name,
                    s.client_code.unwrap_or_default(),
                    s.city.unwrap_or_default(),
                    s.district.unwrap_or_default(),
                    s.address.unwrap_or_default(),
                    s.current_status,
                ]
            })
            .collect::<Vec<_>>();

        write_rows(
            &[
                "Store ID",
                "Dealer Code",
                "Dealer's Name",
                "Client Code",
                "City",
                "District",
                "Dealer's Address",
                "Status",
            ],
            rows,
        )
    }

    /// Empty sheet with the headers the bulk store upload expects.
    pub fn store_template(&self) -> Result<Vec<u8>, ServiceError> {
        write_rows(&STORE_TEMPLATE_HEADERS, Vec::new())
    }
}
