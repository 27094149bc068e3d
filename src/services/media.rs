//! Item media: files go to blob storage, the returned URL is recorded
//! against the item.

use crate::{
    entities::{item, media},
    errors::ServiceError,
    services::find_required,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{multipart, Client};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};
use url::Url;
use uuid::Uuid;

const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// A file received from a client, ready to upload
#[derive(Debug, Clone)]
pub struct BlobFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Where an uploaded blob ended up
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoredBlob {
    #[serde(rename = "secure_url")]
    pub url: String,
    pub public_id: String,
}

/// Object storage that accepts a file and returns its public location.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobUploader: Send + Sync {
    async fn upload(&self, file: BlobFile, folder: &str) -> Result<StoredBlob, ServiceError>;
}

/// Credentials parsed from `cloudinary://<api_key>:<api_secret>@<cloud_name>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl CloudinaryCredentials {
    pub fn from_url(raw: &str) -> Result<Self, ServiceError> {
        let invalid = || ServiceError::InternalError("malformed cloudinary url".into());
        let url = Url::parse(raw).map_err(|_| invalid())?;
        if url.scheme() != "cloudinary" {
            return Err(invalid());
        }
        let cloud_name = url.host_str().filter(|h| !h.is_empty()).ok_or_else(invalid)?;
        let api_secret = url.password().filter(|p| !p.is_empty()).ok_or_else(invalid)?;
        if url.username().is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            cloud_name: cloud_name.to_string(),
            api_key: url.username().to_string(),
            api_secret: api_secret.to_string(),
        })
    }
}

/// Signs upload parameters: sorted `key=value` pairs joined with `&`,
/// followed by the API secret, hashed with SHA-256.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Signed uploads to the Cloudinary REST API
pub struct CloudinaryUploader {
    client: Client,
    credentials: CloudinaryCredentials,
    api_base: String,
}

impl CloudinaryUploader {
    pub fn new(credentials: CloudinaryCredentials) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;
        Ok(Self::with_client(credentials, client))
    }

    pub fn from_url(raw: &str) -> Result<Self, ServiceError> {
        Self::new(CloudinaryCredentials::from_url(raw)?)
    }

    /// Build from an existing client (useful for testing)
    pub fn with_client(credentials: CloudinaryCredentials, client: Client) -> Self {
        Self {
            client,
            credentials,
            api_base: CLOUDINARY_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/{}/auto/upload",
            self.api_base.trim_end_matches('/'),
            self.credentials.cloud_name
        )
    }
}

#[async_trait]
impl BlobUploader for CloudinaryUploader {
    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
    async fn upload(&self, file: BlobFile, folder: &str) -> Result<StoredBlob, ServiceError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signed = [("folder", folder.to_string()), ("timestamp", timestamp.clone())];
        let signature = sign_params(&signed, &self.credentials.api_secret);

        let mut part = multipart::Part::bytes(file.bytes.to_vec()).file_name(file.file_name);
        if let Some(content_type) = file.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|e| ServiceError::ValidationError(format!("content type: {}", e)))?;
        }

        let form = multipart::Form::new()
            .part("file", part)
            .text("api_key", self.credentials.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder.to_string())
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("upload request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "blob upload rejected");
            return Err(ServiceError::ExternalServiceError(format!(
                "upload rejected with status {}",
                status
            )));
        }

        response
            .json::<StoredBlob>()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("upload response: {}", e)))
    }
}

#[derive(Clone)]
pub struct MediaService {
    db: Arc<DatabaseConnection>,
    uploader: Option<Arc<dyn BlobUploader>>,
    folder: String,
}

impl MediaService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        uploader: Option<Arc<dyn BlobUploader>>,
        folder: String,
    ) -> Self {
        Self {
            db,
            uploader,
            folder,
        }
    }

    /// Uploads a file for an item and records it.
    #[instrument(skip(self, file), fields(file_name = %file.file_name))]
    pub async fn upload_item_media(
        &self,
        item_id: Uuid,
        file: BlobFile,
    ) -> Result<media::Model, ServiceError> {
        find_required::<item::Entity, _>(&*self.db, item_id, "Item").await?;
        let uploader = self
            .uploader
            .as_ref()
            .ok_or_else(|| ServiceError::InternalError("media storage is not configured".into()))?;

        let media_type = media::MediaType::from_content_type(file.content_type.as_deref());
        let stored = uploader.upload(file, &self.folder).await?;

        let model = media::ActiveModel {
            id: Set(Uuid::new_v4()),
            item_id: Set(item_id),
            media_type: Set(media_type),
            url: Set(stored.url),
            public_id: Set(stored.public_id),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        info!(media_id = %model.id, item_id = %item_id, "media stored");
        Ok(model)
    }
}
