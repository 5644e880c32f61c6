//! Permission strings gating the API surface.

pub const STORES_VIEW: &str = "stores:view";
pub const STORES_CREATE: &str = "stores:create";
pub const STORES_EDIT: &str = "stores:edit";
pub const STORES_DELETE: &str = "stores:delete";

pub const USERS_VIEW: &str = "users:view";
pub const USERS_CREATE: &str = "users:create";
pub const USERS_EDIT: &str = "users:edit";
pub const USERS_DELETE: &str = "users:delete";

pub const ROLES_VIEW: &str = "roles:view";
pub const ROLES_CREATE: &str = "roles:create";
pub const ROLES_EDIT: &str = "roles:edit";
pub const ROLES_DELETE: &str = "roles:delete";

pub const CLIENTS_VIEW: &str = "clients:view";
pub const CLIENTS_CREATE: &str = "clients:create";
pub const CLIENTS_EDIT: &str = "clients:edit";
pub const CLIENTS_DELETE: &str = "clients:delete";

pub const ELEMENTS_VIEW: &str = "elements:view";
pub const ELEMENTS_CREATE: &str = "elements:create";
pub const ELEMENTS_EDIT: &str = "elements:edit";
pub const ELEMENTS_DELETE: &str = "elements:delete";
