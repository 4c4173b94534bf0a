//! Contact Synchronizer
//!
//! The contact page is not an ordered collection: each email record is shown
//! with the two site-wide images stored under `/media`, and saving a contact
//! updates the address and re-uploads whichever image changed.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::attachment::encode_attachment;
use super::collection::Phase;
use crate::domain::{ImageRef, RemoteId, StoreError, SyncError, SyncResult};
use crate::remote::{ContactStore, MediaRecord};

const CONTENT: &str = "contact";

pub const BACKGROUND_LABEL: &str = "background_image";
pub const LOGO_LABEL: &str = "logo";

/// Multipart part name of a media upload
const MEDIA_PART: &str = "image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub id: RemoteId,
    pub email: String,
    pub background_image: ImageRef,
    pub logo: ImageRef,
}

impl Contact {
    fn image(&self, label: &str) -> &ImageRef {
        if label == LOGO_LABEL {
            &self.logo
        } else {
            &self.background_image
        }
    }
}

/// Raw inputs of a contact card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactForm {
    pub id: RemoteId,
    pub email: String,
    pub background_image: String,
    pub logo: String,
}

impl ContactForm {
    pub fn from_contact(contact: &Contact) -> Self {
        Self {
            id: contact.id.clone(),
            email: contact.email.clone(),
            background_image: contact.background_image.to_source(),
            logo: contact.logo.to_source(),
        }
    }

    pub fn resolve(&self) -> SyncResult<Contact> {
        Ok(Contact {
            id: self.id.clone(),
            email: self.email.trim().to_string(),
            background_image: ImageRef::parse(&self.background_image)?,
            logo: ImageRef::parse(&self.logo)?,
        })
    }
}

/// Media entry for `label`, falling back to its usual position unless that
/// entry is labelled as the other known image
fn media_for<'a>(
    media: &'a [MediaRecord],
    label: &str,
    other: &str,
    fallback: usize,
) -> Option<&'a MediaRecord> {
    media
        .iter()
        .find(|record| record.label == label)
        .or_else(|| media.get(fallback).filter(|record| record.label != other))
}

fn media_image(record: Option<&MediaRecord>) -> Result<ImageRef, StoreError> {
    let url = record.and_then(|record| record.image_url.as_deref()).unwrap_or_default();
    ImageRef::parse(url).map_err(|e| StoreError::Decode(format!("media image: {}", e)))
}

struct ContactState {
    contacts: Vec<Contact>,
    phase: Phase,
    loaded: bool,
    last_error: Option<String>,
}

pub struct ContactSync<S: ContactStore + ?Sized> {
    store: Arc<S>,
    state: Mutex<ContactState>,
    mutation: Mutex<()>,
}

impl<S: ContactStore + ?Sized> ContactSync<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            state: Mutex::new(ContactState {
                contacts: Vec::new(),
                phase: Phase::Unloaded,
                loaded: false,
                last_error: None,
            }),
            mutation: Mutex::new(()),
        }
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    pub async fn contacts(&self) -> Vec<Contact> {
        self.state.lock().await.contacts.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.last_error.clone()
    }

    pub async fn load(&self) -> SyncResult<Vec<Contact>> {
        let _guard = self.mutation.lock().await;
        self.state.lock().await.phase = Phase::Loading;

        let fetched = self.fetch().await;
        let mut state = self.state.lock().await;
        match fetched {
            Ok(contacts) => {
                state.contacts = contacts;
                state.loaded = true;
                state.last_error = None;
                state.phase = Phase::Ready;
                Ok(state.contacts.clone())
            }
            Err(err) => {
                log::warn!("{}", err);
                state.last_error = Some(err.to_string());
                state.phase = if state.loaded { Phase::Ready } else { Phase::Unloaded };
                Err(err)
            }
        }
    }

    async fn fetch(&self) -> SyncResult<Vec<Contact>> {
        let fetch_error = |source: StoreError| SyncError::Fetch {
            content: CONTENT.to_string(),
            source,
        };
        let (emails, media) = tokio::try_join!(self.store.list_emails(), self.store.list_media())
            .map_err(fetch_error)?;

        let background_image = media_image(media_for(&media, BACKGROUND_LABEL, LOGO_LABEL, 0))
            .map_err(fetch_error)?;
        let logo = media_image(media_for(&media, LOGO_LABEL, BACKGROUND_LABEL, 1))
            .map_err(fetch_error)?;
        Ok(emails
            .into_iter()
            .map(|email| Contact {
                id: email.id,
                email: email.address,
                background_image: background_image.clone(),
                logo: logo.clone(),
            })
            .collect())
    }

    /// Save the address and any changed image, then reload
    pub async fn submit(&self, form: &ContactForm) -> SyncResult<()> {
        let contact = form.resolve()?;
        let _guard = self
            .mutation
            .try_lock()
            .map_err(|_| SyncError::Busy(CONTENT.to_string()))?;
        self.state.lock().await.phase = Phase::Mutating;

        let result = self.submit_locked(contact).await;
        let mut state = self.state.lock().await;
        state.phase = if state.loaded { Phase::Ready } else { Phase::Unloaded };
        result
    }

    async fn submit_locked(&self, contact: Contact) -> SyncResult<()> {
        let current = self
            .state
            .lock()
            .await
            .contacts
            .iter()
            .find(|existing| existing.id == contact.id)
            .cloned()
            .ok_or_else(|| SyncError::UnknownItem {
                content: CONTENT.to_string(),
                id: contact.id.to_string(),
            })?;

        // Encode before sending anything so a bad image leaves the backend untouched
        let mut uploads = Vec::new();
        for label in [BACKGROUND_LABEL, LOGO_LABEL] {
            let image = contact.image(label);
            if image.is_none() || image == current.image(label) {
                continue;
            }
            if let Some(attachment) = encode_attachment(self.store.as_ref(), MEDIA_PART, image).await? {
                uploads.push((label, attachment));
            }
        }

        let submit_error = |source: StoreError| SyncError::Submit {
            content: CONTENT.to_string(),
            source,
        };
        self.store
            .update_email(&contact.id, &contact.email)
            .await
            .map_err(submit_error)?;
        for (label, attachment) in uploads {
            self.store
                .upload_media(label, attachment)
                .await
                .map_err(submit_error)?;
            log::info!("uploaded contact {}", label);
        }
        log::info!("saved contact {}", contact.id);

        match self.fetch().await {
            Ok(contacts) => {
                let mut state = self.state.lock().await;
                state.contacts = contacts;
                state.loaded = true;
                state.last_error = None;
            }
            Err(err) => {
                log::warn!("contact saved but reload failed: {}", err);
                self.state.lock().await.last_error = Some(err.to_string());
            }
        }
        Ok(())
    }
}
