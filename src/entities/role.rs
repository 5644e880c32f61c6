use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// One of the closed role codes (SUPER_ADMIN, ADMIN, RECCE, INSTALLATION).
    pub code: String,
    pub name: String,

    #[sea_orm(column_type = "Json")]
    pub permissions: PermissionSet,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// CRUD permission flags for one resource.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct ResourcePermissions {
    #[serde(default)]
    pub view: bool,
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub edit: bool,
    #[serde(default)]
    pub delete: bool,
}

impl ResourcePermissions {
    pub fn all() -> Self {
        Self {
            view: true,
            create: true,
            edit: true,
            delete: true,
        }
    }

    pub fn view_only() -> Self {
        Self {
            view: true,
            ..Self::default()
        }
    }
}

/// Per-resource permission sets carried by a role, stored as a JSON column.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct PermissionSet {
    #[serde(default)]
    pub stores: ResourcePermissions,
    #[serde(default)]
    pub users: ResourcePermissions,
    #[serde(default)]
    pub roles: ResourcePermissions,
    #[serde(default)]
    pub clients: ResourcePermissions,
    #[serde(default)]
    pub elements: ResourcePermissions,
}

impl PermissionSet {
    /// Flatten into `resource:action` permission strings for JWT claims.
    pub fn to_strings(&self) -> Vec<String> {
        let mut out = Vec::new();
        let resources = [
            ("stores", self.stores),
            ("users", self.users),
            ("roles", self.roles),
            ("clients", self.clients),
            ("elements", self.elements),
        ];
        for (name, perms) in resources {
            if perms.view {
                out.push(format!("{name}:view"));
            }
            if perms.create {
                out.push(format!("{name}:create"));
            }
            if perms.edit {
                out.push(format!("{name}:edit"));
            }
            if perms.delete {
                out.push(format!("{name}:delete"));
            }
        }
        out
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_role::Entity")]
    UserRole,
}

impl Related<super::user_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserRole.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        super::user_role::Relation::User.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::user_role::Relation::Role.def().rev())
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_strings_are_flattened() {
        let perms = PermissionSet {
            stores: ResourcePermissions {
                view: true,
                edit: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let strings = perms.to_strings();
        assert_eq!(strings, vec!["stores:view", "stores:edit"]);
    }
}
