pub mod analytics;
pub mod clients;
pub mod elements;
pub mod imports;
pub mod notifications;
pub mod reports;
pub mod stores;
pub mod users;

use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::storage::UploadService;

/// Outcome of a bulk operation. Partial failure is normal: every input row is
/// processed and failures are reported per row instead of aborting the batch.
#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkReport {
    pub total_processed: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<RowError>,
}

/// One failed row of a bulk operation. `reference` carries whatever identifies
/// the row to the user (dealer code, store id, email).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub reason: String,
}

impl BulkReport {
    pub fn record_success(&mut self) {
        self.total_processed += 1;
        self.success_count += 1;
    }

    pub fn record_error(&mut self, row: usize, reference: Option<String>, reason: String) {
        self.total_processed += 1;
        self.error_count += 1;
        self.errors.push(RowError {
            row,
            reference,
            reason,
        });
    }
}

/// All application services, shared through the router state.
#[derive(Clone)]
pub struct AppServices {
    pub stores: Arc<stores::StoreService>,
    pub imports: Arc<imports::ImportService>,
    pub users: Arc<users::UserService>,
    pub clients: Arc<clients::ClientService>,
    pub elements: Arc<elements::ElementService>,
    pub reports: Arc<reports::ReportService>,
    pub analytics: Arc<analytics::AnalyticsService>,
    pub notifications: Arc<notifications::NotificationService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, uploads: Arc<UploadService>) -> Self {
        let users = Arc::new(users::UserService::new(db.clone()));
        Self {
            stores: Arc::new(stores::StoreService::new(db.clone(), uploads.clone())),
            imports: Arc::new(imports::ImportService::new(db.clone())),
            clients: Arc::new(clients::ClientService::new(db.clone())),
            elements: Arc::new(elements::ElementService::new(db.clone())),
            reports: Arc::new(reports::ReportService::new(db.clone())),
            analytics: Arc::new(analytics::AnalyticsService::new(db.clone())),
            notifications: Arc::new(notifications::NotificationService::new(db)),
            users,
        }
    }
}
