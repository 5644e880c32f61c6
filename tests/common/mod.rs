use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use storeops_api::auth::{hash_password, AuthConfig, AuthService, AuthUser, RoleCode};
use storeops_api::config::{AppConfig, StorageConfig};
use storeops_api::db::{self, DbPool};
use storeops_api::entities::{role, user, user_role};
use storeops_api::services::AppServices;
use storeops_api::storage::UploadService;
use storeops_api::{app_router, AppState};

pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// A seeded account plus a ready-to-use bearer token.
pub struct TestAccount {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

/// Test harness: SQLite-backed application with seeded roles and users.
pub struct TestApp {
    router: Router,
    pub db: Arc<DbPool>,
    pub admin: TestAccount,
    pub recce: TestAccount,
    pub installer: TestAccount,
    _uploads_dir: tempfile::TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_path = std::env::temp_dir().join(format!("storeops_test_{}.db", Uuid::new_v4()));
        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let pool = db::establish_connection(&db_url)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");
        let db = Arc::new(pool);

        let uploads_dir = tempfile::tempdir().expect("temp uploads dir");
        let storage = StorageConfig {
            storage_type: "local".to_string(),
            ftp_host: None,
            ftp_user: None,
            ftp_password: None,
            base_public_path: "/uploads".to_string(),
            base_public_url: "http://localhost:8080/uploads".to_string(),
            local_root: uploads_dir.path().to_string_lossy().into_owned(),
        };

        let config = AppConfig {
            database_url: db_url,
            jwt_secret:
                "integration-test-signing-secret-0123456789abcdef0123456789abcdef0123456789"
                    .to_string(),
            jwt_expiration: 900,
            refresh_token_expiration: 604_800,
            host: "127.0.0.1".to_string(),
            port: 18_080,
            environment: "test".to_string(),
            log_level: "warn".to_string(),
            log_json: false,
            auto_migrate: false,
            docs_user: "docs".to_string(),
            docs_password: "docs".to_string(),
            storage: storage.clone(),
        };

        let auth = Arc::new(AuthService::new(AuthConfig {
            jwt_secret: config.jwt_secret.clone(),
            access_ttl_secs: config.jwt_expiration,
            refresh_ttl_secs: config.refresh_token_expiration,
        }));
        let uploads = Arc::new(UploadService::from_config(&storage).expect("upload service"));
        let services = AppServices::new(db.clone(), uploads);

        let state = AppState {
            db: db.clone(),
            config: Arc::new(config),
            auth: auth.clone(),
            services,
        };
        let router = app_router(state);

        let admin_role = seed_role(&db, "ADMIN", "Administrator", role::PermissionSet {
            stores: role::ResourcePermissions::all(),
            users: role::ResourcePermissions::all(),
            roles: role::ResourcePermissions::all(),
            clients: role::ResourcePermissions::all(),
            elements: role::ResourcePermissions::all(),
        })
        .await;
        let recce_role = seed_role(&db, "RECCE", "Recce Surveyor", role::PermissionSet {
            stores: role::ResourcePermissions {
                view: true,
                edit: true,
                ..Default::default()
            },
            elements: role::ResourcePermissions::view_only(),
            ..Default::default()
        })
        .await;
        let installation_role = seed_role(&db, "INSTALLATION", "Installer", role::PermissionSet {
            stores: role::ResourcePermissions {
                view: true,
                edit: true,
                ..Default::default()
            },
            ..Default::default()
        })
        .await;

        let admin = seed_user(&db, &auth, "Admin", "admin@example.com", &[&admin_role]).await;
        let recce = seed_user(&db, &auth, "Surveyor", "recce@example.com", &[&recce_role]).await;
        let installer = seed_user(
            &db,
            &auth,
            "Installer",
            "installer@example.com",
            &[&installation_role],
        )
        .await;

        Self {
            router,
            db,
            admin,
            recce,
            installer,
            _uploads_dir: uploads_dir,
        }
    }

    /// Clone of the application router for hand-built requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Send a request with an optional bearer token and optional JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };
        self.router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router error")
    }

    /// Send a multipart request with one file part plus extra text fields.
    pub async fn request_multipart(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        file_name: &str,
        file_bytes: &[u8],
        fields: &[(&str, &str)],
    ) -> axum::response::Response {
        let boundary = "storeops-test-boundary";
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\ncontent-disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{boundary}\r\ncontent-disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\ncontent-type: text/csv\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(file_bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("build multipart request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error")
    }
}

async fn seed_role(
    db: &DbPool,
    code: &str,
    name: &str,
    permissions: role::PermissionSet,
) -> role::Model {
    let now = Utc::now();
    role::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code.to_string()),
        name: Set(name.to_string()),
        permissions: Set(permissions),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed role")
}

async fn seed_user(
    db: &DbPool,
    auth: &AuthService,
    name: &str,
    email: &str,
    roles: &[&role::Model],
) -> TestAccount {
    let now = Utc::now();
    let user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(hash_password(TEST_PASSWORD).expect("hash password")),
        is_active: Set(true),
        login_count: Set(0),
        last_login: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed user");

    let mut codes = Vec::new();
    let mut permissions = Vec::new();
    for role in roles {
        user_role::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            role_id: Set(role.id),
        }
        .insert(db)
        .await
        .expect("seed user role");
        if let Ok(code) = role.code.parse::<RoleCode>() {
            codes.push(code);
        }
        permissions.extend(role.permissions.to_strings());
    }
    permissions.sort();
    permissions.dedup();

    let identity = AuthUser {
        user_id: user.id,
        name: user.name.clone(),
        email: Some(user.email.clone()),
        roles: codes,
        permissions,
    };
    let token = auth.issue_access_token(&identity).expect("issue token");

    TestAccount {
        id: user.id,
        email: user.email,
        token,
    }
}
