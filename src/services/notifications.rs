use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::entities::store::{self, Entity as StoreEntity};
use crate::errors::ServiceError;
use crate::workflow::StoreStatus;

/// A work item surfaced to a field user. Notifications are derived from the
/// user's open assignments on each request; nothing is stored.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub store_pk: Uuid,
    pub store_id: Option<String>,
    pub dealer_code: String,
    pub store_name: String,
    pub kind: NotificationKind,
    pub message: String,
    pub assigned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    RecceAssigned,
    RecceRejected,
    InstallationAssigned,
}

#[derive(Clone)]
pub struct NotificationService {
    db: Arc<DbPool>,
}

impl NotificationService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Open work items for the calling user, newest assignment first.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn for_user(&self, user: &AuthUser) -> Result<Vec<Notification>, ServiceError> {
        let stores = StoreEntity::find()
            .filter(
                Condition::any()
                    .add(store::Column::RecceAssignedTo.eq(user.user_id))
                    .add(store::Column::InstallationAssignedTo.eq(user.user_id)),
            )
            .order_by_desc(store::Column::UpdatedAt)
            .all(&*self.db)
            .await?;

        let mut notifications = Vec::new();
        for s in stores {
            let status = StoreStatus::parse(&s.current_status)?;
            let (kind, message, assigned_at) = match status {
                StoreStatus::RecceAssigned if s.recce_assigned_to == Some(user.user_id) => (
                    NotificationKind::RecceAssigned,
                    format!("Recce pending for {}", s.store_name),
                    s.recce_assigned_at,
                ),
                StoreStatus::RecceRejected if s.recce_assigned_to == Some(user.user_id) => (
                    NotificationKind::RecceRejected,
                    format!("Recce rejected for {}; please review and resubmit", s.store_name),
                    s.recce_assigned_at,
                ),
                StoreStatus::InstallationAssigned
                    if s.installation_assigned_to == Some(user.user_id) =>
                {
                    (
                        NotificationKind::InstallationAssigned,
                        format!("Installation pending for {}", s.store_name),
                        s.installation_assigned_at,
                    )
                }
                _ => continue,
            };
            notifications.push(Notification {
                store_pk: s.id,
                store_id: s.store_id,
                dealer_code: s.dealer_code,
                store_name: s.store_name,
                kind,
                message,
                assigned_at,
            });
        }
        Ok(notifications)
    }
}
