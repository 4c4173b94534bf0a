//! In-Memory Store
//!
//! Process-local implementation of the store traits. Follows the backend's
//! conventions (counter ids, appended sort ids, base64 or hosted image
//! fields per schema) closely enough to drive the synchronizers offline.
//! Every call is written to a journal in `METHOD path` form, and a failure
//! can be queued for the next call of a given operation.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use super::traits::{
    ContactStore, ContentStore, EmailRecord, FetchedImage, ImageFetcher, MediaRecord, SortEntry,
    Submission,
};
use crate::domain::{Attachment, ContentSchema, FieldSpec, ImageWire, RemoteId, StoreError};

/// Store operations a failure can be queued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Create,
    Update,
    Delete,
    Reorder,
    FetchImage,
    ListEmails,
    ListMedia,
    UpdateEmail,
    UploadMedia,
}

#[derive(Default)]
struct MemoryState {
    /// Records per base path
    collections: HashMap<String, Vec<Map<String, Value>>>,
    last_id: i64,
    hosted: HashMap<String, FetchedImage>,
    emails: Vec<EmailRecord>,
    media: Vec<MediaRecord>,
    journal: Vec<String>,
    failures: HashMap<Operation, StoreError>,
}

impl MemoryState {
    fn record_call(&mut self, op: Operation, line: String) -> Result<(), StoreError> {
        self.journal.push(line);
        match self.failures.remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn allocate_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert raw records into a collection, assigning ids to those without one
    pub async fn seed(&self, schema: &ContentSchema, records: Vec<Value>) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        for record in records {
            let Value::Object(mut object) = record else {
                return Err(StoreError::Decode(format!(
                    "seed record for {} is not an object",
                    schema.name
                )));
            };
            match object.get("id").and_then(RemoteId::from_json) {
                Some(RemoteId::Int(n)) => state.last_id = state.last_id.max(n),
                Some(RemoteId::Str(_)) => {}
                None => {
                    let id = state.allocate_id();
                    object.insert("id".to_string(), Value::from(id));
                }
            }
            state
                .collections
                .entry(schema.base_path.clone())
                .or_default()
                .push(object);
        }
        Ok(())
    }

    /// Make `url` downloadable through `fetch_image`
    pub async fn host_image(&self, url: &str, bytes: Vec<u8>, mime: Option<&str>) {
        let mut state = self.state.lock().await;
        state.hosted.insert(
            url.to_string(),
            FetchedImage {
                bytes,
                mime: mime.map(str::to_string),
            },
        );
    }

    pub async fn seed_contact(&self, emails: Vec<EmailRecord>, media: Vec<MediaRecord>) {
        let mut state = self.state.lock().await;
        state.emails = emails;
        state.media = media;
    }

    /// Make the next call of `op` fail with `err`
    pub async fn fail_next(&self, op: Operation, err: StoreError) {
        self.state.lock().await.failures.insert(op, err);
    }

    /// Calls made so far, e.g. `PUT /home/3`
    pub async fn journal(&self) -> Vec<String> {
        self.state.lock().await.journal.clone()
    }

    pub async fn clear_journal(&self) {
        self.state.lock().await.journal.clear();
    }

    /// Stored records of a collection in sort order
    pub async fn records(&self, schema: &ContentSchema) -> Vec<Value> {
        let state = self.state.lock().await;
        sorted(state.collections.get(&schema.base_path))
    }

    pub async fn media(&self) -> Vec<MediaRecord> {
        self.state.lock().await.media.clone()
    }

    pub async fn emails(&self) -> Vec<EmailRecord> {
        self.state.lock().await.emails.clone()
    }
}

fn sort_key(record: &Map<String, Value>) -> i64 {
    record.get("sort_id").and_then(Value::as_i64).unwrap_or(i64::MAX)
}

fn sorted(records: Option<&Vec<Map<String, Value>>>) -> Vec<Value> {
    let mut records: Vec<Map<String, Value>> = records.cloned().unwrap_or_default();
    records.sort_by_key(sort_key);
    records.into_iter().map(Value::Object).collect()
}

fn has_id(record: &Map<String, Value>, id: &RemoteId) -> bool {
    record.get("id").and_then(RemoteId::from_json).as_ref() == Some(id)
}

fn hosted_url(scope: &str, id: &dyn std::fmt::Display, filename: &str) -> String {
    format!("memory://{}/{}/{}", scope.trim_matches('/'), id, filename)
}

/// Write a submission into a record the way the backend stores it
fn apply_submission(
    schema: &ContentSchema,
    id: &RemoteId,
    record: &mut Map<String, Value>,
    hosted: &mut HashMap<String, FetchedImage>,
    body: Submission,
) {
    for (name, value) in body.fields {
        record.insert(name, Value::String(value));
    }
    for Attachment {
        part,
        filename,
        mime,
        bytes,
    } in body.attachments
    {
        match schema.field(&part) {
            Some(FieldSpec::Image {
                wire_key,
                wire: ImageWire::Url,
                ..
            }) => {
                let url = hosted_url(&schema.base_path, id, &filename);
                hosted.insert(
                    url.clone(),
                    FetchedImage {
                        bytes,
                        mime: Some(mime),
                    },
                );
                record.insert(wire_key.clone(), Value::String(url));
            }
            Some(FieldSpec::Image { wire_key, .. }) => {
                record.insert(wire_key.clone(), Value::String(STANDARD.encode(&bytes)));
            }
            _ => {
                record.insert(part, Value::String(STANDARD.encode(&bytes)));
            }
        }
    }
}

#[async_trait]
impl ImageFetcher for MemoryStore {
    async fn fetch_image(&self, url: &str) -> Result<FetchedImage, StoreError> {
        let mut state = self.state.lock().await;
        state.record_call(Operation::FetchImage, format!("GET {}", url))?;
        state
            .hosted
            .get(url)
            .cloned()
            .ok_or_else(|| StoreError::not_found(url))
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn list(&self, schema: &ContentSchema) -> Result<Vec<Value>, StoreError> {
        let mut state = self.state.lock().await;
        state.record_call(Operation::List, format!("GET {}", schema.base_path))?;
        Ok(sorted(state.collections.get(&schema.base_path)))
    }

    async fn create(&self, schema: &ContentSchema, body: Submission) -> Result<(), StoreError> {
        let mut guard = self.state.lock().await;
        guard.record_call(Operation::Create, format!("POST {}", schema.base_path))?;

        let id = guard.allocate_id();
        let state = &mut *guard;
        let records = state.collections.entry(schema.base_path.clone()).or_default();
        let sort_id = records
            .iter()
            .filter_map(|record| record.get("sort_id").and_then(Value::as_i64))
            .max()
            .map(|max| max + 1)
            .unwrap_or_else(|| schema.sort_base.offset());

        let mut record = Map::new();
        record.insert("id".to_string(), Value::from(id));
        record.insert("sort_id".to_string(), Value::from(sort_id));
        apply_submission(schema, &RemoteId::Int(id), &mut record, &mut state.hosted, body);
        records.push(record);
        Ok(())
    }

    async fn update(
        &self,
        schema: &ContentSchema,
        id: &RemoteId,
        body: Submission,
    ) -> Result<(), StoreError> {
        let mut guard = self.state.lock().await;
        guard.record_call(Operation::Update, format!("PUT {}/{}", schema.base_path, id))?;

        let state = &mut *guard;
        let record = state
            .collections
            .get_mut(&schema.base_path)
            .and_then(|records| records.iter_mut().find(|record| has_id(record, id)))
            .ok_or_else(|| StoreError::not_found(format!("{} {}", schema.name, id)))?;
        apply_submission(schema, id, record, &mut state.hosted, body);
        Ok(())
    }

    async fn delete(&self, schema: &ContentSchema, id: &RemoteId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.record_call(Operation::Delete, format!("DELETE {}/{}", schema.base_path, id))?;

        let records = state.collections.entry(schema.base_path.clone()).or_default();
        let before = records.len();
        records.retain(|record| !has_id(record, id));
        if records.len() == before {
            return Err(StoreError::not_found(format!("{} {}", schema.name, id)));
        }
        Ok(())
    }

    async fn reorder(&self, schema: &ContentSchema, order: &[SortEntry]) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.record_call(Operation::Reorder, format!("PATCH {}/reorder", schema.base_path))?;

        let records = state.collections.entry(schema.base_path.clone()).or_default();
        if let Some(missing) = order
            .iter()
            .find(|entry| !records.iter().any(|record| has_id(record, &entry.id)))
        {
            return Err(StoreError::not_found(format!("{} {}", schema.name, missing.id)));
        }
        for entry in order {
            if let Some(record) = records.iter_mut().find(|record| has_id(record, &entry.id)) {
                record.insert("sort_id".to_string(), Value::from(entry.sort_id));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn list_emails(&self) -> Result<Vec<EmailRecord>, StoreError> {
        let mut state = self.state.lock().await;
        state.record_call(Operation::ListEmails, "GET /email".to_string())?;
        Ok(state.emails.clone())
    }

    async fn list_media(&self) -> Result<Vec<MediaRecord>, StoreError> {
        let mut state = self.state.lock().await;
        state.record_call(Operation::ListMedia, "GET /media".to_string())?;
        Ok(state.media.clone())
    }

    async fn update_email(&self, id: &RemoteId, address: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.record_call(Operation::UpdateEmail, format!("PUT /email/{}", id))?;
        let email = state
            .emails
            .iter_mut()
            .find(|email| &email.id == id)
            .ok_or_else(|| StoreError::not_found(format!("email {}", id)))?;
        email.address = address.to_string();
        Ok(())
    }

    async fn upload_media(&self, label: &str, image: Attachment) -> Result<(), StoreError> {
        let mut guard = self.state.lock().await;
        guard.record_call(Operation::UploadMedia, format!("PUT /media?q={}", label))?;

        let state = &mut *guard;
        let url = hosted_url("media", &label, &image.filename);
        state.hosted.insert(
            url.clone(),
            FetchedImage {
                bytes: image.bytes,
                mime: Some(image.mime),
            },
        );
        match state.media.iter_mut().find(|media| media.label == label) {
            Some(media) => media.image_url = Some(url),
            None => {
                let id = state.allocate_id();
                state.media.push(MediaRecord {
                    id: RemoteId::Int(id),
                    label: label.to_string(),
                    image_url: Some(url),
                });
            }
        }
        Ok(())
    }
}
