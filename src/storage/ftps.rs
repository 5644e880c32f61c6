use std::io::Cursor;

use async_trait::async_trait;
use native_tls::TlsConnector;
use suppaftp::{NativeTlsConnector, NativeTlsFtpStream};

use super::{FileLocation, StorageBackend};
use crate::config::StorageConfig;
use crate::errors::ServiceError;

/// FTPS storage mirroring the local layout under `base_public_path`.
///
/// The FTP client is blocking; one connection is opened and closed per
/// operation inside `spawn_blocking`. Self-signed certificates are accepted,
/// matching the deployment this talks to.
pub struct FtpsStorage {
    host: String,
    user: String,
    password: String,
    base_path: String,
    base_url: String,
}

impl FtpsStorage {
    pub fn new(config: &StorageConfig) -> Result<Self, ServiceError> {
        let host = config
            .ftp_host
            .clone()
            .ok_or_else(|| ServiceError::InvalidInput("FTPS storage requires ftp_host".into()))?;
        let user = config
            .ftp_user
            .clone()
            .ok_or_else(|| ServiceError::InvalidInput("FTPS storage requires ftp_user".into()))?;
        let password = config.ftp_password.clone().ok_or_else(|| {
            ServiceError::InvalidInput("FTPS storage requires ftp_password".into())
        })?;
        Ok(Self {
            host,
            user,
            password,
            base_path: config.base_public_path.trim_end_matches('/').to_string(),
            base_url: config.base_public_url.trim_end_matches('/').to_string(),
        })
    }

    fn connect(&self) -> Result<NativeTlsFtpStream, ServiceError> {
        let addr = if self.host.contains(':') {
            self.host.clone()
        } else {
            format!("{}:21", self.host)
        };
        let stream = NativeTlsFtpStream::connect(&addr)
            .map_err(|e| ServiceError::StorageError(format!("FTP connection failed: {e}")))?;
        let tls = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| ServiceError::StorageError(format!("TLS setup failed: {e}")))?;
        let domain = self.host.split(':').next().unwrap_or(&self.host).to_string();
        let mut ftp = stream
            .into_secure(NativeTlsConnector::from(tls), &domain)
            .map_err(|e| ServiceError::StorageError(format!("FTPS handshake failed: {e}")))?;
        ftp.login(&self.user, &self.password)
            .map_err(|e| ServiceError::StorageError(format!("FTP login failed: {e}")))?;
        Ok(ftp)
    }

    fn remote_dir(&self, location: &FileLocation) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_path, location.folder, location.client_code, location.store_id
        )
    }

    fn blocking_put(&self, location: &FileLocation, bytes: &[u8]) -> Result<(), ServiceError> {
        let mut ftp = self.connect()?;
        for segment in self.remote_dir(location).split('/').filter(|s| !s.is_empty()) {
            if ftp.cwd(segment).is_err() {
                ftp.mkdir(segment)
                    .map_err(|e| ServiceError::StorageError(format!("mkdir failed: {e}")))?;
                ftp.cwd(segment)
                    .map_err(|e| ServiceError::StorageError(format!("cwd failed: {e}")))?;
            }
        }
        ftp.put_file(&location.file_name, &mut Cursor::new(bytes))
            .map_err(|e| ServiceError::StorageError(format!("FTP upload failed: {e}")))?;
        let _ = ftp.quit();
        Ok(())
    }

    fn blocking_delete(&self, location: &FileLocation) -> Result<(), ServiceError> {
        let mut ftp = self.connect()?;
        let remote = format!("{}/{}", self.remote_dir(location), location.file_name);
        ftp.rm(&remote)
            .map_err(|e| ServiceError::StorageError(format!("FTP delete failed: {e}")))?;
        let _ = ftp.quit();
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FtpsStorage {
    async fn put(&self, location: &FileLocation, bytes: Vec<u8>) -> Result<String, ServiceError> {
        let this = self.clone_parts();
        let loc = location.clone();
        tokio::task::spawn_blocking(move || this.blocking_put(&loc, &bytes))
            .await
            .map_err(|e| ServiceError::InternalError(e.to_string()))??;
        Ok(self.url_for(location))
    }

    async fn delete(&self, location: &FileLocation) -> Result<(), ServiceError> {
        let this = self.clone_parts();
        let loc = location.clone();
        tokio::task::spawn_blocking(move || this.blocking_delete(&loc))
            .await
            .map_err(|e| ServiceError::InternalError(e.to_string()))?
    }

    fn url_for(&self, location: &FileLocation) -> String {
        format!("{}/{}", self.base_url, location.relative_path())
    }
}

impl FtpsStorage {
    fn clone_parts(&self) -> Self {
        Self {
            host: self.host.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            base_path: self.base_path.clone(),
            base_url: self.base_url.clone(),
        }
    }
}
