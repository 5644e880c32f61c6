use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::{FileLocation, StorageBackend};
use crate::config::StorageConfig;
use crate::errors::ServiceError;

/// Filesystem storage rooted at `local_root` (default `uploads/`).
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: PathBuf::from(&config.local_root),
        }
    }

    fn absolute_path(&self, location: &FileLocation) -> PathBuf {
        self.root.join(location.relative_path())
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn put(&self, location: &FileLocation, bytes: Vec<u8>) -> Result<String, ServiceError> {
        let path = self.absolute_path(location);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        Ok(self.url_for(location))
    }

    async fn delete(&self, location: &FileLocation) -> Result<(), ServiceError> {
        let path = self.absolute_path(location);
        fs::remove_file(&path).await?;
        Ok(())
    }

    fn url_for(&self, location: &FileLocation) -> String {
        format!("{}/{}", self.root.display(), location.relative_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FolderType;

    fn location() -> FileLocation {
        FileLocation {
            folder: FolderType::Recce,
            client_code: "ACME".into(),
            store_id: "MUMMUMDLR001".into(),
            file_name: "front.jpg".into(),
        }
    }

    #[tokio::test]
    async fn put_then_delete_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage {
            root: dir.path().to_path_buf(),
        };
        let loc = location();

        let url = storage.put(&loc, b"jpeg bytes".to_vec()).await.unwrap();
        assert!(url.ends_with("recce/ACME/MUMMUMDLR001/front.jpg"));
        assert_eq!(
            std::fs::read(dir.path().join(loc.relative_path())).unwrap(),
            b"jpeg bytes"
        );

        storage.delete(&loc).await.unwrap();
        assert!(!dir.path().join(loc.relative_path()).exists());
    }
}
