//! Storage of uploaded MRI images on the local filesystem

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::UploadsConfig;
use crate::domain::{DomainError, StoredImage};

/// Route prefix the upload directory is served under
pub const UPLOADS_ROUTE: &str = "/uploads";

const FALLBACK_EXTENSION: &str = "bin";
const MAX_EXTENSION_LEN: usize = 8;

/// Writes uploads under unique names and builds their public URLs.
///
/// Client file names are never used as paths; they are only kept as metadata.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    public_base_url: Option<String>,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, public_base_url: Option<String>) -> Self {
        Self {
            dir: dir.into(),
            public_base_url: public_base_url
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
        }
    }

    pub fn from_config(config: &UploadsConfig) -> Self {
        Self::new(&config.dir, config.public_base_url.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the upload directory if it does not exist
    pub async fn ensure_dir(&self) -> Result<(), DomainError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to create upload directory {}: {}",
                self.dir.display(),
                e
            ))
        })
    }

    /// Filesystem path of a stored file
    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// URL a stored file is served from.
    ///
    /// Uses the configured public base URL, else `http://{host}`; without
    /// either the URL is relative to the server root.
    pub fn public_url(&self, file_name: &str, host: Option<&str>) -> String {
        let base = match (&self.public_base_url, host) {
            (Some(base), _) => base.clone(),
            (None, Some(host)) if !host.trim().is_empty() => format!("http://{}", host.trim()),
            _ => String::new(),
        };

        format!("{}{}/{}", base, UPLOADS_ROUTE, file_name)
    }

    /// Persist `bytes` under a fresh unique name
    pub async fn save(
        &self,
        bytes: &[u8],
        original_filename: Option<&str>,
        content_type: Option<&str>,
        host: Option<&str>,
    ) -> Result<StoredImage, DomainError> {
        self.ensure_dir().await?;

        let original_filename = original_filename.and_then(sanitize_filename);
        let extension = extension_for(original_filename.as_deref(), content_type);
        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        let path = self.path_of(&file_name);

        tokio::fs::write(&path, bytes).await.map_err(|e| {
            DomainError::storage(format!("Failed to write upload {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), bytes = bytes.len(), "Upload stored");

        Ok(StoredImage {
            url: self.public_url(&file_name, host),
            file_name,
            original_filename,
        })
    }

    /// Delete a stored file; failures are only logged
    pub async fn remove(&self, file_name: &str) {
        let path = self.path_of(file_name);

        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove upload");
        }
    }
}

/// Final path component of a client-supplied name, if any is left
fn sanitize_filename(name: &str) -> Option<String> {
    // Clients on Windows send backslash separated paths
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();

    (!name.is_empty() && name != "." && name != "..").then(|| name.to_string())
}

fn extension_for(original_filename: Option<&str>, content_type: Option<&str>) -> String {
    let from_name = original_filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let from_mime = || {
        content_type
            .and_then(mime_guess::get_mime_extensions_str)
            .and_then(|exts| exts.first())
            .map(|ext| ext.to_string())
    };

    from_name
        .or_else(from_mime)
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}
