//! Remote Store - Core Traits
//!
//! Abstract interface to the content backend.
//! Implementations can use HTTP, in-memory, etc.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Attachment, ContentSchema, RemoteId, StoreError};

/// Transport-neutral multipart body of a create/update request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub fields: Vec<(String, String)>,
    pub attachments: Vec<Attachment>,
}

impl Submission {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attachment(&self, part: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|attachment| attachment.part == part)
    }
}

/// One entry of a reorder request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortEntry {
    pub id: RemoteId,
    pub sort_id: i64,
}

/// Bytes of a hosted image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    /// Content type reported by the host, if any
    pub mime: Option<String>,
}

/// Download of already hosted images, needed to re-upload them
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch_image(&self, url: &str) -> Result<FetchedImage, StoreError>;
}

/// Ordered content collections (`GET/POST {base}`, `PUT/DELETE {base}/{id}`,
/// `PATCH {base}/reorder`)
#[async_trait]
pub trait ContentStore: ImageFetcher {
    /// Raw records of a collection, decoded by the caller
    async fn list(&self, schema: &ContentSchema) -> Result<Vec<Value>, StoreError>;

    /// Create a record; the backend assigns id and sort_id
    async fn create(&self, schema: &ContentSchema, body: Submission) -> Result<(), StoreError>;

    async fn update(
        &self,
        schema: &ContentSchema,
        id: &RemoteId,
        body: Submission,
    ) -> Result<(), StoreError>;

    async fn delete(&self, schema: &ContentSchema, id: &RemoteId) -> Result<(), StoreError>;

    /// Persist a new ordering in one request
    async fn reorder(&self, schema: &ContentSchema, order: &[SortEntry]) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub id: RemoteId,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: RemoteId,
    pub label: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Contact page endpoints (`/email` and `/media`)
#[async_trait]
pub trait ContactStore: ImageFetcher {
    async fn list_emails(&self) -> Result<Vec<EmailRecord>, StoreError>;

    async fn list_media(&self) -> Result<Vec<MediaRecord>, StoreError>;

    async fn update_email(&self, id: &RemoteId, address: &str) -> Result<(), StoreError>;

    /// Replace the image stored under `label`
    async fn upload_media(&self, label: &str, image: Attachment) -> Result<(), StoreError>;
}
