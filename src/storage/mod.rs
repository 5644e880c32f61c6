//! Pluggable file storage for site photos.
//!
//! Two backends: local filesystem and FTPS. Which one is used comes from the
//! injected [`StorageConfig`]; when an FTPS upload fails the file is written
//! locally instead (one fallback, no retry loop).

use std::sync::Arc;

use async_trait::async_trait;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::warn;
use utoipa::ToSchema;

use crate::config::StorageConfig;
use crate::errors::ServiceError;

mod ftps;
mod local;

pub use ftps::FtpsStorage;
pub use local::LocalStorage;

/// Which workflow folder a file belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, ToSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FolderType {
    Initial,
    Recce,
    Installation,
}

impl FolderType {
    pub fn parse(value: &str) -> Result<Self, ServiceError> {
        value
            .parse::<Self>()
            .map_err(|_| ServiceError::InvalidInput(format!("Invalid folder type: {value}")))
    }
}

/// Storage location of one file: `{folder}/{client_code}/{store_id}/{file}`.
#[derive(Debug, Clone)]
pub struct FileLocation {
    pub folder: FolderType,
    pub client_code: String,
    pub store_id: String,
    pub file_name: String,
}

impl FileLocation {
    pub fn relative_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.folder, self.client_code, self.store_id, self.file_name
        )
    }
}

/// A stored file as reported back to the client.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StoredFile {
    pub file_name: String,
    pub url: String,
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write `bytes` at `location`, returning the public URL or path.
    async fn put(&self, location: &FileLocation, bytes: Vec<u8>) -> Result<String, ServiceError>;

    async fn delete(&self, location: &FileLocation) -> Result<(), ServiceError>;

    /// Public URL for an already stored file.
    fn url_for(&self, location: &FileLocation) -> String;
}

/// Timestamp + random hex + original base name, extension preserved.
pub fn unique_file_name(original: &str) -> String {
    let (base, ext) = match original.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() => (base, format!(".{ext}")),
        _ => (original, String::new()),
    };
    let mut random = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut random);
    let sanitized: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!(
        "{}_{}_{}{}",
        chrono::Utc::now().timestamp_millis(),
        hex::encode(random),
        sanitized,
        ext
    )
}

/// Upload front-end used by the services: picks the backend from config and
/// applies the FTPS-to-local fallback.
#[derive(Clone)]
pub struct UploadService {
    primary: Arc<dyn StorageBackend>,
    fallback: Option<Arc<LocalStorage>>,
}

impl UploadService {
    pub fn from_config(config: &StorageConfig) -> Result<Self, ServiceError> {
        let local = Arc::new(LocalStorage::new(config));
        match config.storage_type.as_str() {
            "ftps" => Ok(Self {
                primary: Arc::new(FtpsStorage::new(config)?),
                fallback: Some(local),
            }),
            "local" => Ok(Self {
                primary: local,
                fallback: None,
            }),
            other => Err(ServiceError::InvalidInput(format!(
                "Unknown storage type: {other}"
            ))),
        }
    }

    /// Store an uploaded file under a freshly generated unique name.
    pub async fn store(
        &self,
        folder: FolderType,
        client_code: &str,
        store_id: &str,
        original_name: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredFile, ServiceError> {
        let location = FileLocation {
            folder,
            client_code: client_code.to_string(),
            store_id: store_id.to_string(),
            file_name: unique_file_name(original_name),
        };

        let url = match self.primary.put(&location, bytes.clone()).await {
            Ok(url) => url,
            Err(err) => match &self.fallback {
                Some(local) => {
                    warn!(error = %err, file = %location.file_name,
                        "FTPS upload failed, falling back to local storage");
                    local.put(&location, bytes).await?
                }
                None => return Err(err),
            },
        };

        Ok(StoredFile {
            file_name: location.file_name,
            url,
        })
    }

    pub async fn delete(
        &self,
        folder: FolderType,
        client_code: &str,
        store_id: &str,
        file_name: &str,
    ) -> Result<(), ServiceError> {
        let location = FileLocation {
            folder,
            client_code: client_code.to_string(),
            store_id: store_id.to_string(),
            file_name: file_name.to_string(),
        };
        self.primary.delete(&location).await
    }

    pub fn url_for(
        &self,
        folder: FolderType,
        client_code: &str,
        store_id: &str,
        file_name: &str,
    ) -> String {
        let location = FileLocation {
            folder,
            client_code: client_code.to_string(),
            store_id: store_id.to_string(),
            file_name: file_name.to_string(),
        };
        self.primary.url_for(&location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_names_keep_the_extension() {
        let name = unique_file_name("front view.jpg");
        assert!(name.ends_with(".jpg"));
        assert!(name.contains("front_view"));
    }

    #[test]
    fn unique_names_differ() {
        assert_ne!(unique_file_name("a.png"), unique_file_name("a.png"));
    }

    #[test]
    fn folder_type_parses_lowercase() {
        assert_eq!(FolderType::parse("recce").unwrap(), FolderType::Recce);
        assert!(FolderType::parse("archive").is_err());
    }

    #[test]
    fn relative_path_layout() {
        let loc = FileLocation {
            folder: FolderType::Installation,
            client_code: "ACME".into(),
            store_id: "MUMMUMDLR001".into(),
            file_name: "after1.jpg".into(),
        };
        assert_eq!(
            loc.relative_path(),
            "installation/ACME/MUMMUMDLR001/after1.jpg"
        );
    }
}
