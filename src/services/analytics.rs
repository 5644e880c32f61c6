use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::instrument;

use crate::auth::{AuthUser, RoleCode};
use crate::db::DbPool;
use crate::entities::{
    client::Entity as ClientEntity,
    element::Entity as ElementEntity,
    store::{self, Entity as StoreEntity},
    user::Entity as UserEntity,
};
use crate::errors::ServiceError;
use crate::workflow::{Stage, StoreStatus};

/// Admin dashboard numbers.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DashboardResponse {
    pub total_stores: u64,
    /// Store counts keyed by workflow status.
    pub stores_by_status: BTreeMap<String, u64>,
    pub pending_review: u64,
    pub total_users: u64,
    pub total_clients: u64,
    pub total_elements: u64,
}

/// Task counters for one field user.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MyTasksResponse {
    pub recce_pending: u64,
    pub recce_rejected: u64,
    pub installation_pending: u64,
    pub submitted_total: u64,
}

#[derive(Clone)]
pub struct AnalyticsService {
    db: Arc<DbPool>,
}

impl AnalyticsService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Workflow-wide counters; admin only (enforced at the route).
    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<DashboardResponse, ServiceError> {
        let db = &*self.db;

        let total_stores = StoreEntity::find().count(db).await?;
        let mut stores_by_status = BTreeMap::new();
        for status in StoreStatus::iter() {
            let count = StoreEntity::find()
                .filter(store::Column::CurrentStatus.eq(status.to_string()))
                .count(db)
                .await?;
            stores_by_status.insert(status.to_string(), count);
        }
        let pending_review = stores_by_status
            .get(&StoreStatus::RecceSubmitted.to_string())
            .copied()
            .unwrap_or(0);

        Ok(DashboardResponse {
            total_stores,
            stores_by_status,
            pending_review,
            total_users: UserEntity::find().count(db).await?,
            total_clients: ClientEntity::find().count(db).await?,
            total_elements: ElementEntity::find().count(db).await?,
        })
    }

    /// Counters scoped to the calling field user's own assignments.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn my_tasks(&self, user: &AuthUser) -> Result<MyTasksResponse, ServiceError> {
        let db = &*self.db;

        let count_mine = |stage: Stage, status: StoreStatus| {
            let column = match stage {
                Stage::Recce => store::Column::RecceAssignedTo,
                Stage::Installation => store::Column::InstallationAssignedTo,
            };
            StoreEntity::find()
                .filter(column.eq(user.user_id))
                .filter(store::Column::CurrentStatus.eq(status.to_string()))
                .count(db)
        };

        let recce_pending = if user.has_role(RoleCode::Recce) {
            count_mine(Stage::Recce, StoreStatus::RecceAssigned).await?
        } else {
            0
        };
        let recce_rejected = if user.has_role(RoleCode::Recce) {
            count_mine(Stage::Recce, StoreStatus::RecceRejected).await?
        } else {
            0
        };
        let installation_pending = if user.has_role(RoleCode::Installation) {
            count_mine(Stage::Installation, StoreStatus::InstallationAssigned).await?
        } else {
            0
        };

        let submitted_total = {
            let recce = count_mine(Stage::Recce, StoreStatus::RecceSubmitted).await?;
            let installation =
                count_mine(Stage::Installation, StoreStatus::InstallationSubmitted).await?;
            recce + installation
        };

        Ok(MyTasksResponse {
            recce_pending,
            recce_rejected,
            installation_pending,
            submitted_total,
        })
    }
}
