use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{hash_password, verify_password, AuthUser, RoleCode};
use crate::db::DbPool;
use crate::entities::{
    role::{self, ActiveModel as RoleActiveModel, Entity as RoleEntity, PermissionSet},
    user::{self, ActiveModel as UserActiveModel, Entity as UserEntity, Model as UserModel},
    user_role::{self, ActiveModel as UserRoleActiveModel, Entity as UserRoleEntity},
};
use crate::errors::ServiceError;
use crate::services::BulkReport;
use crate::spreadsheet::{read_user_rows, write_rows, USER_TEMPLATE_HEADERS};

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "At least one role is required"))]
    pub role_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub role_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct UserQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Filter on one role code (RECCE, INSTALLATION, ...).
    pub role: Option<String>,
    /// Substring match on name or email.
    pub search: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RoleSummary {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub roles: Vec<RoleSummary>,
    pub login_count: i32,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 100, message = "Role code is required"))]
    pub code: String,
    #[validate(length(min = 1, max = 255, message = "Role name is required"))]
    pub name: String,
    #[serde(default)]
    pub permissions: PermissionSet,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub permissions: Option<PermissionSet>,
}

/// User accounts, roles and credential checks.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DbPool>,
}

impl UserService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Verifies credentials and records the login. Returns the caller
    /// identity used to mint tokens.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AuthUser, ServiceError> {
        let db = &*self.db;
        let user = UserEntity::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Invalid email or password".to_string()))?;

        if !user.is_active {
            return Err(ServiceError::Unauthorized(
                "This account has been deactivated".to_string(),
            ));
        }
        if !verify_password(password, &user.password_hash)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?
        {
            return Err(ServiceError::Unauthorized(
                "Invalid email or password".to_string(),
            ));
        }

        let mut active = user.clone().into_active_model();
        active.login_count = Set(user.login_count + 1);
        active.last_login = Set(Some(Utc::now()));
        active.updated_at = Set(Utc::now());
        active.update(db).await?;

        info!(user_id = %user.id, "User logged in");
        self.build_auth_user(user).await
    }

    /// Rebuilds the caller identity for a refresh-token exchange. Roles and
    /// permissions are re-read so revocations take effect at refresh time.
    pub async fn auth_user_for(&self, user_id: Uuid) -> Result<AuthUser, ServiceError> {
        let user = UserEntity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Account no longer exists".to_string()))?;
        if !user.is_active {
            return Err(ServiceError::Unauthorized(
                "This account has been deactivated".to_string(),
            ));
        }
        self.build_auth_user(user).await
    }

    async fn build_auth_user(&self, user: UserModel) -> Result<AuthUser, ServiceError> {
        let roles = self.roles_of(user.id).await?;
        let mut codes = Vec::new();
        let mut permissions = BTreeSet::new();
        for role in &roles {
            if let Ok(code) = RoleCode::from_str(&role.code) {
                codes.push(code);
            }
            for perm in role.permissions.to_strings() {
                permissions.insert(perm);
            }
        }
        Ok(AuthUser {
            user_id: user.id,
            name: user.name,
            email: Some(user.email),
            roles: codes,
            permissions: permissions.into_iter().collect(),
        })
    }

    async fn roles_of(&self, user_id: Uuid) -> Result<Vec<role::Model>, ServiceError> {
        Ok(UserRoleEntity::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .find_also_related(RoleEntity)
            .all(&*self.db)
            .await?
            .into_iter()
            .filter_map(|(_, role)| role)
            .collect())
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserResponse, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let email = request.email.trim().to_lowercase();

        let existing = UserEntity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::InvalidInput(
                "A user with this email already exists".to_string(),
            ));
        }

        let roles = RoleEntity::find()
            .filter(role::Column::Id.is_in(request.role_ids.clone()))
            .all(db)
            .await?;
        if roles.len() != request.role_ids.len() {
            return Err(ServiceError::InvalidInput(
                "One or more roles do not exist".to_string(),
            ));
        }

        let password_hash =
            hash_password(&request.password).map_err(|e| ServiceError::InternalError(e.to_string()))?;

        let txn = db.begin().await?;
        let now = Utc::now();
        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            email: Set(email),
            password_hash: Set(password_hash),
            is_active: Set(true),
            login_count: Set(0),
            last_login: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to insert user");
            ServiceError::DatabaseError(e)
        })?;

        for role in &roles {
            UserRoleActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.id),
                role_id: Set(role.id),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;

        info!(user_id = %user.id, "User created");
        Ok(self.to_response(user, roles))
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self, query: UserQuery) -> Result<UserListResponse, ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let mut find = UserEntity::find();
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            find = find.filter(
                Condition::any()
                    .add(user::Column::Name.contains(search))
                    .add(user::Column::Email.contains(search)),
            );
        }
        if let Some(code) = &query.role {
            let ids = self.user_ids_with_role(code.trim()).await?;
            find = find.filter(user::Column::Id.is_in(ids));
        }

        let paginator = find
            .order_by_desc(user::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page - 1).await?;

        let mut out = Vec::with_capacity(users.len());
        for u in users {
            let roles = self.roles_of(u.id).await?;
            out.push(self.to_response(u, roles));
        }

        Ok(UserListResponse {
            users: out,
            total,
            page,
            per_page,
        })
    }

    async fn user_ids_with_role(&self, code: &str) -> Result<Vec<Uuid>, ServiceError> {
        Ok(UserRoleEntity::find()
            .inner_join(RoleEntity)
            .filter(role::Column::Code.eq(code))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|link| link.user_id)
            .collect())
    }

    /// Active users holding one role code, for assignment pickers.
    pub async fn users_by_role(&self, code: &str) -> Result<Vec<UserResponse>, ServiceError> {
        let ids = self.user_ids_with_role(code).await?;
        let users = UserEntity::find()
            .filter(user::Column::Id.is_in(ids))
            .filter(user::Column::IsActive.eq(true))
            .order_by_asc(user::Column::Name)
            .all(&*self.db)
            .await?;
        let mut out = Vec::with_capacity(users.len());
        for u in users {
            let roles = self.roles_of(u.id).await?;
            out.push(self.to_response(u, roles));
        }
        Ok(out)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<UserResponse, ServiceError> {
        let user = UserEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {id} not found")))?;
        let roles = self.roles_of(user.id).await?;
        Ok(self.to_response(user, roles))
    }

    #[instrument(skip(self, request))]
    pub async fn update_user(
        &self,
        id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<UserResponse, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let user = UserEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {id} not found")))?;

        let txn = db.begin().await?;
        let mut active = user.into_active_model();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(password) = request.password {
            let hash =
                hash_password(&password).map_err(|e| ServiceError::InternalError(e.to_string()))?;
            active.password_hash = Set(hash);
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        if let Some(role_ids) = request.role_ids {
            let roles = RoleEntity::find()
                .filter(role::Column::Id.is_in(role_ids.clone()))
                .all(&txn)
                .await?;
            if roles.len() != role_ids.len() {
                return Err(ServiceError::InvalidInput(
                    "One or more roles do not exist".to_string(),
                ));
            }
            UserRoleEntity::delete_many()
                .filter(user_role::Column::UserId.eq(id))
                .exec(&txn)
                .await?;
            for role in roles {
                UserRoleActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(id),
                    role_id: Set(role.id),
                }
                .insert(&txn)
                .await?;
            }
        }
        txn.commit().await?;

        let roles = self.roles_of(updated.id).await?;
        Ok(self.to_response(updated, roles))
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = UserEntity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("User {id} not found")));
        }
        info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// Imports users from the bulk sheet. Role cells are comma-separated role
    /// codes resolved against existing roles.
    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub async fn bulk_upload_users(&self, bytes: &[u8]) -> Result<BulkReport, ServiceError> {
        let rows = read_user_rows(bytes)?;
        if rows.is_empty() {
            return Err(ServiceError::InvalidInput(
                "The uploaded sheet contains no data rows".to_string(),
            ));
        }

        let all_roles = RoleEntity::find().all(&*self.db).await?;
        let mut report = BulkReport::default();
        let mut seen = HashSet::new();

        for row in rows {
            let email = match row.email.as_deref().map(str::trim) {
                Some(e) if !e.is_empty() => e.to_lowercase(),
                _ => {
                    report.record_error(
                        row.row_number,
                        None,
                        "Skipped: 'Email' is missing or empty".to_string(),
                    );
                    continue;
                }
            };
            if !seen.insert(email.clone()) {
                report.record_error(
                    row.row_number,
                    Some(email),
                    "Duplicate email in this file".to_string(),
                );
                continue;
            }
            let (name, password, role_cell) = match (&row.name, &row.password, &row.roles) {
                (Some(n), Some(p), Some(r)) => (n.clone(), p.clone(), r.clone()),
                _ => {
                    report.record_error(
                        row.row_number,
                        Some(email),
                        "Skipped: Name, Password and Roles are all required".to_string(),
                    );
                    continue;
                }
            };

            let mut role_ids = Vec::new();
            let mut unknown = None;
            for code in role_cell.split(',').map(str::trim).filter(|c| !c.is_empty()) {
                match all_roles.iter().find(|r| r.code.eq_ignore_ascii_case(code)) {
                    Some(role) => role_ids.push(role.id),
                    None => {
                        unknown = Some(code.to_string());
                        break;
                    }
                }
            }
            if let Some(code) = unknown {
                report.record_error(
                    row.row_number,
                    Some(email),
                    format!("Unknown role code: {code}"),
                );
                continue;
            }
            if role_ids.is_empty() {
                report.record_error(
                    row.row_number,
                    Some(email),
                    "At least one role is required".to_string(),
                );
                continue;
            }

            let request = CreateUserRequest {
                name,
                email: email.clone(),
                password,
                role_ids,
            };
            match self.create_user(request).await {
                Ok(_) => report.record_success(),
                Err(err) => {
                    report.record_error(row.row_number, Some(email), err.response_message())
                }
            }
        }

        info!(
            imported = report.success_count,
            failed = report.error_count,
            "User sheet import finished"
        );
        Ok(report)
    }

    /// CSV export of all users with their role codes.
    pub async fn export_users(&self) -> Result<Vec<u8>, ServiceError> {
        let users = UserEntity::find()
            .order_by_asc(user::Column::Name)
            .all(&*self.db)
            .await?;
        let mut rows = Vec::with_capacity(users.len());
        for u in users {
            let roles = self
                .roles_of(u.id)
                .await?
                .into_iter()
                .map(|r| r.code)
                .collect::<Vec<_>>()
                .join(", ");
            rows.push(vec![
                u.name,
                u.email,
                roles,
                if u.is_active { "Yes" } else { "No" }.to_string(),
                u.login_count.to_string(),
                u.last_login.map(|t| t.to_rfc3339()).unwrap_or_default(),
            ]);
        }
        write_rows(
            &["Name", "Email", "Roles", "Active", "Login Count", "Last Login"],
            rows,
        )
    }

    /// Empty sheet with the headers the bulk user upload expects.
    pub fn user_template(&self) -> Result<Vec<u8>, ServiceError> {
        write_rows(&USER_TEMPLATE_HEADERS, Vec::new())
    }

    pub async fn list_roles(&self) -> Result<Vec<role::Model>, ServiceError> {
        Ok(RoleEntity::find()
            .order_by_asc(role::Column::Code)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_role(&self, id: Uuid) -> Result<role::Model, ServiceError> {
        RoleEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Role {id} not found")))
    }

    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create_role(&self, request: CreateRoleRequest) -> Result<role::Model, ServiceError> {
        request.validate()?;
        let code = request.code.trim().to_uppercase();
        let existing = RoleEntity::find()
            .filter(role::Column::Code.eq(code.as_str()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::InvalidInput(
                "A role with this code already exists".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(RoleActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            name: Set(request.name),
            permissions: Set(request.permissions),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?)
    }

    #[instrument(skip(self, request))]
    pub async fn update_role(
        &self,
        id: Uuid,
        request: UpdateRoleRequest,
    ) -> Result<role::Model, ServiceError> {
        let role = self.get_role(id).await?;
        let mut active = role.into_active_model();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(permissions) = request.permissions {
            active.permissions = Set(permissions);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_role(&self, id: Uuid) -> Result<(), ServiceError> {
        let in_use = UserRoleEntity::find()
            .filter(user_role::Column::RoleId.eq(id))
            .count(&*self.db)
            .await?;
        if in_use > 0 {
            return Err(ServiceError::InvalidOperation(
                "Role is still assigned to users".to_string(),
            ));
        }
        let result = RoleEntity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Role {id} not found")));
        }
        Ok(())
    }

    fn to_response(&self, user: UserModel, roles: Vec<role::Model>) -> UserResponse {
        UserResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            is_active: user.is_active,
            roles: roles
                .into_iter()
                .map(|r| RoleSummary {
                    id: r.id,
                    code: r.code,
                    name: r.name,
                })
                .collect(),
            login_count: user.login_count,
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}
