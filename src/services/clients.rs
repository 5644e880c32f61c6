use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::client::{
    self, ActiveModel as ClientActiveModel, ClientElements, Entity as ClientEntity,
    Model as ClientModel,
};
use crate::errors::ServiceError;

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 100, message = "Client code is required"))]
    pub client_code: String,
    #[validate(length(min = 1, max = 255, message = "Client name is required"))]
    pub client_name: String,
    pub branch_name: Option<String>,
    pub amount: Option<Decimal>,
    pub gst_number: Option<String>,
    #[serde(default)]
    pub elements: ClientElements,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateClientRequest {
    pub client_name: Option<String>,
    pub branch_name: Option<String>,
    pub amount: Option<Decimal>,
    pub gst_number: Option<String>,
    pub elements: Option<ClientElements>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ClientQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ClientListResponse {
    pub clients: Vec<ClientModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone)]
pub struct ClientService {
    db: Arc<DbPool>,
}

impl ClientService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(client_code = %request.client_code))]
    pub async fn create_client(
        &self,
        request: CreateClientRequest,
    ) -> Result<ClientModel, ServiceError> {
        request.validate()?;
        let code = request.client_code.trim().to_uppercase();

        let existing = ClientEntity::find()
            .filter(client::Column::ClientCode.eq(code.as_str()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::InvalidInput(
                "A client with this code already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let created = ClientActiveModel {
            id: Set(Uuid::new_v4()),
            client_code: Set(code),
            client_name: Set(request.client_name),
            branch_name: Set(request.branch_name.unwrap_or_default()),
            amount: Set(request.amount.unwrap_or_default()),
            gst_number: Set(request.gst_number.unwrap_or_default()),
            elements: Set(request.elements),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(client_id = %created.id, "Client created");
        Ok(created)
    }

    pub async fn list_clients(&self, query: ClientQuery) -> Result<ClientListResponse, ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let mut find = ClientEntity::find();
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            find = find.filter(
                Condition::any()
                    .add(client::Column::ClientCode.contains(search))
                    .add(client::Column::ClientName.contains(search)),
            );
        }

        let paginator = find
            .order_by_asc(client::Column::ClientName)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let clients = paginator.fetch_page(page - 1).await?;

        Ok(ClientListResponse {
            clients,
            total,
            page,
            per_page,
        })
    }

    pub async fn get_client(&self, id: Uuid) -> Result<ClientModel, ServiceError> {
        ClientEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Client {id} not found")))
    }

    #[instrument(skip(self, request))]
    pub async fn update_client(
        &self,
        id: Uuid,
        request: UpdateClientRequest,
    ) -> Result<ClientModel, ServiceError> {
        let client = self.get_client(id).await?;
        let mut active = client.into_active_model();
        if let Some(v) = request.client_name {
            active.client_name = Set(v);
        }
        if let Some(v) = request.branch_name {
            active.branch_name = Set(v);
        }
        if let Some(v) = request.amount {
            active.amount = Set(v);
        }
        if let Some(v) = request.gst_number {
            active.gst_number = Set(v);
        }
        if let Some(v) = request.elements {
            active.elements = Set(v);
        }
        if let Some(v) = request.is_active {
            active.is_active = Set(v);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_client(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = ClientEntity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Client {id} not found")));
        }
        info!(client_id = %id, "Client deleted");
        Ok(())
    }
}
