use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::element::{
    self, ActiveModel as ElementActiveModel, Entity as ElementEntity, Model as ElementModel,
};
use crate::errors::ServiceError;

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateElementRequest {
    #[validate(length(min = 1, max = 255, message = "Element name is required"))]
    pub name: String,
    pub standard_rate: Decimal,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateElementRequest {
    pub name: Option<String>,
    pub standard_rate: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct ElementService {
    db: Arc<DbPool>,
}

impl ElementService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_element(
        &self,
        request: CreateElementRequest,
    ) -> Result<ElementModel, ServiceError> {
        request.validate()?;
        let name = request.name.trim().to_string();

        let existing = ElementEntity::find()
            .filter(element::Column::Name.eq(name.as_str()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::InvalidInput(
                "An element with this name already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let created = ElementActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            standard_rate: Set(request.standard_rate),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(element_id = %created.id, "Element created");
        Ok(created)
    }

    /// All elements, active first. The catalogue is small; no pagination.
    pub async fn list_elements(&self) -> Result<Vec<ElementModel>, ServiceError> {
        Ok(ElementEntity::find()
            .order_by_desc(element::Column::IsActive)
            .order_by_asc(element::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_element(&self, id: Uuid) -> Result<ElementModel, ServiceError> {
        ElementEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Element {id} not found")))
    }

    #[instrument(skip(self, request))]
    pub async fn update_element(
        &self,
        id: Uuid,
        request: UpdateElementRequest,
    ) -> Result<ElementModel, ServiceError> {
        let element = self.get_element(id).await?;
        let mut active = element.into_active_model();
        if let Some(v) = request.name {
            active.name = Set(v);
        }
        if let Some(v) = request.standard_rate {
            active.standard_rate = Set(v);
        }
        if let Some(v) = request.is_active {
            active.is_active = Set(v);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_element(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = ElementEntity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Element {id} not found")));
        }
        info!(element_id = %id, "Element deleted");
        Ok(())
    }
}
