use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A dealer store moving through the recce/installation workflow.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate, ToSchema)]
#[sea_orm(table_name = "stores")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Externally supplied, unique per store.
    #[validate(length(min = 1, max = 100, message = "Dealer code is required"))]
    pub dealer_code: String,

    /// Derived business identifier (city+district prefixes + dealer code).
    /// Generated lazily on the first workflow submission when absent.
    pub store_id: Option<String>,

    pub store_name: String,
    pub project_ref: Option<String>,
    pub vendor_code: Option<String>,

    pub client_code: Option<String>,
    pub client_id: Option<Uuid>,

    pub zone: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub address: Option<String>,

    pub board_width_ft: Option<Decimal>,
    pub board_height_ft: Option<Decimal>,
    pub board_type: Option<String>,

    /// Always one of the `StoreStatus` strings.
    pub current_status: String,

    pub recce_assigned_to: Option<Uuid>,
    pub recce_assigned_by: Option<Uuid>,
    pub recce_assigned_at: Option<DateTime<Utc>>,
    pub installation_assigned_to: Option<Uuid>,
    pub installation_assigned_by: Option<Uuid>,
    pub installation_assigned_at: Option<DateTime<Utc>>,

    #[sea_orm(column_type = "Json", nullable)]
    pub recce: Option<RecceData>,
    #[sea_orm(column_type = "Json", nullable)]
    pub installation: Option<InstallationData>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Quantity of one billable branding element recorded against a recce photo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
pub struct BrandingElementLine {
    pub element_id: Uuid,
    pub element_name: String,
    pub quantity: u32,
}

/// A measured recce photo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
pub struct ReccePhoto {
    pub url: String,
    pub width: f64,
    pub height: f64,
    pub unit: String,
    #[serde(default)]
    pub elements: Vec<BrandingElementLine>,
}

/// Recce submission payload, stored as a JSON column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
pub struct RecceData {
    pub submitted_at: DateTime<Utc>,
    pub submitted_by: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub site_photos: Vec<String>,
    #[serde(default)]
    pub photos: Vec<ReccePhoto>,
}

/// An installation after-photo, correlated to the recce photo it covers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
pub struct InstallationPhoto {
    pub url: String,
    pub recce_photo_index: u32,
}

/// Installation submission payload, stored as a JSON column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
pub struct InstallationData {
    pub submitted_at: DateTime<Utc>,
    pub submitted_by: String,
    #[serde(default)]
    pub photos: Vec<InstallationPhoto>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {}
