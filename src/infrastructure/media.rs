// Remote media storage. Uploads and deletions fan out with at most
// `MEDIA_CONCURRENCY` requests in flight.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::{
    future::BoxFuture,
    stream::{self, StreamExt},
    FutureExt,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use crate::config::MediaConfig;
use crate::error::AppError;
use crate::models::{current_time_millis, MediaAsset};

pub const MEDIA_CONCURRENCY: usize = 3;

const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported media type: {0}")]
    Unsupported(String),
    #[error("media service rejected the request: {0}")]
    Rejected(String),
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Unsupported(kind) => {
                AppError::BadRequest(format!("Only image and video files are accepted, got {}", kind))
            }
            other => AppError::ExternalService(format!("Media upload failed: {}", other)),
        }
    }
}

/// A file received from a multipart form, held in memory until uploaded.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// `image` or `video`; anything else is refused.
    pub fn resource_type(&self) -> Result<&'static str, MediaError> {
        if self.content_type.starts_with("image/") {
            Ok("image")
        } else if self.content_type.starts_with("video/") {
            Ok("video")
        } else {
            Err(MediaError::Unsupported(self.content_type.clone()))
        }
    }

    fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
    }
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, file: UploadFile) -> Result<MediaAsset, MediaError>;
    async fn delete(&self, asset: &MediaAsset) -> Result<(), MediaError>;
}

/// Upload every file, at most three at a time, in input order. If any upload
/// fails the ones that succeeded are deleted again and the first error returned.
pub async fn upload_all(store: &dyn MediaStore, files: Vec<UploadFile>) -> Result<Vec<MediaAsset>, MediaError> {
    let results: Vec<Result<MediaAsset, MediaError>> = stream::iter(files)
        .map(|file| store.upload(file))
        .buffered(MEDIA_CONCURRENCY)
        .collect()
        .await;

    let mut uploaded = Vec::with_capacity(results.len());
    let mut first_error = None;
    for result in results {
        match result {
            Ok(asset) => uploaded.push(asset),
            Err(err) if first_error.is_none() => first_error = Some(err),
            Err(err) => warn!("Additional media upload failure: {}", err),
        }
    }

    match first_error {
        None => Ok(uploaded),
        Some(err) => {
            warn!("Media upload failed, discarding {} uploaded file(s): {}", uploaded.len(), err);
            delete_all(store, &uploaded).await;
            Err(err)
        }
    }
}

/// Best-effort bulk delete. Failures are logged and counted, never retried.
pub async fn delete_all(store: &dyn MediaStore, assets: &[MediaAsset]) -> usize {
    let deletions: Vec<BoxFuture<'_, bool>> = assets
        .iter()
        .cloned()
        .map(|asset| {
            async move {
                let result = store.delete(&asset).await;
                if let Err(err) = &result {
                    warn!(public_id = %asset.public_id, "Failed to delete remote media: {}", err);
                }
                result.is_err()
            }
            .boxed()
        })
        .collect();

    let outcomes: Vec<bool> = stream::iter(deletions)
        .buffer_unordered(MEDIA_CONCURRENCY)
        .collect()
        .await;
    outcomes.into_iter().filter(|failed| *failed).count()
}

/// Build the configured store: the cloud API when credentials exist,
/// otherwise files on local disk served under `/public`.
pub fn media_store_from_config(config: &MediaConfig) -> std::sync::Arc<dyn MediaStore> {
    match config.cloud_credentials() {
        Some((cloud_name, api_key, api_secret)) => {
            info!("Using cloud media store for {}", cloud_name);
            std::sync::Arc::new(CloudinaryStore::new(CLOUDINARY_API_BASE, cloud_name, api_key, api_secret))
        }
        None => {
            info!("Using local media store in {}", config.local_dir);
            std::sync::Arc::new(LocalMediaStore::new(&config.local_dir, "/public"))
        }
    }
}

#[derive(Debug, Deserialize)]
struct CloudinaryUpload {
    secure_url: String,
    public_id: String,
    resource_type: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryDestroy {
    result: String,
}

pub struct CloudinaryStore {
    client: reqwest::Client,
    api_base: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryStore {
    pub fn new(api_base: &str, cloud_name: &str, api_key: &str, api_secret: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            cloud_name: cloud_name.to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        }
    }

    fn endpoint(&self, resource_type: &str, action: &str) -> String {
        format!("{}/{}/{}/{}", self.api_base, self.cloud_name, resource_type, action)
    }
}

/// Request signature: sorted `key=value` pairs joined by `&`, followed by the
/// API secret, hashed with SHA-256.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    hex::encode(Sha256::digest(format!("{}{}", joined, api_secret).as_bytes()))
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    #[instrument(skip(self, file), fields(file_name = %file.file_name))]
    async fn upload(&self, file: UploadFile) -> Result<MediaAsset, MediaError> {
        let resource_type = file.resource_type()?;
        let timestamp = (current_time_millis() / 1000).to_string();
        let signature = sign_params(&[("timestamp", timestamp.as_str())], &self.api_secret);

        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let res = self
            .client
            .post(self.endpoint(resource_type, "upload"))
            .multipart(form)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(MediaError::Rejected(format!("{}: {}", status, body)));
        }

        let body = res.json::<CloudinaryUpload>().await?;
        Ok(MediaAsset {
            url: body.secure_url,
            public_id: body.public_id,
            resource_type: body.resource_type,
        })
    }

    #[instrument(skip(self), fields(public_id = %asset.public_id))]
    async fn delete(&self, asset: &MediaAsset) -> Result<(), MediaError> {
        let timestamp = (current_time_millis() / 1000).to_string();
        let signature = sign_params(
            &[("public_id", asset.public_id.as_str()), ("timestamp", timestamp.as_str())],
            &self.api_secret,
        );
        let form = [
            ("public_id", asset.public_id.as_str()),
            ("api_key", self.api_key.as_str()),
            ("timestamp", timestamp.as_str()),
            ("signature_algorithm", "sha256"),
            ("signature", signature.as_str()),
        ];

        let res = self
            .client
            .post(self.endpoint(&asset.resource_type, "destroy"))
            .form(&form)
            .send()
            .await?;
        let body = res.json::<CloudinaryDestroy>().await?;
        match body.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(MediaError::Rejected(other.to_string())),
        }
    }
}

/// Development backend writing uploads to a directory served as static files.
pub struct LocalMediaStore {
    root: PathBuf,
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    fn path_for(&self, public_id: &str) -> Result<PathBuf, MediaError> {
        if public_id.is_empty() || public_id.contains(['/', '\\']) || public_id.contains("..") {
            return Err(MediaError::Rejected(format!("invalid public id {}", public_id)));
        }
        Ok(self.root.join(public_id))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn upload(&self, file: UploadFile) -> Result<MediaAsset, MediaError> {
        let resource_type = file.resource_type()?;
        let public_id = match file.extension() {
            Some(ext) => format!("{}.{}", uuid::Uuid::new_v4(), ext.to_ascii_lowercase()),
            None => uuid::Uuid::new_v4().to_string(),
        };

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.path_for(&public_id)?, &file.bytes).await?;

        Ok(MediaAsset {
            url: format!("{}/{}", self.url_prefix, public_id),
            public_id,
            resource_type: resource_type.to_string(),
        })
    }

    async fn delete(&self, asset: &MediaAsset) -> Result<(), MediaError> {
        match tokio::fs::remove_file(self.path_for(&asset.public_id)?).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
