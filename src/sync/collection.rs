//! Collection Synchronizer
//!
//! Keeps the ordered items of one content type in step with a remote store.
//! Every mutation is one awaited round trip followed by a reload, so the
//! local collection only ever shows what the backend confirmed. Mutations
//! are serialized per collection: a second one while the first is in flight
//! fails with `SyncError::Busy`.

use std::collections::HashMap;
use std::sync::Arc;

use drag_reorder::ReorderSession;
use tokio::sync::{Mutex, MutexGuard};

use super::attachment::encode_attachment;
use super::reorder::{reorder_payload, validate_permutation};
use crate::domain::{
    ContentSchema, Item, ItemForm, ItemId, RemoteId, StoreError, SyncError, SyncResult,
};
use crate::remote::{ContentStore, Submission};

/// Lifecycle of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unloaded,
    Loading,
    Ready,
    Mutating,
}

struct CollectionState {
    items: Vec<Item>,
    /// Items as last fetched, to skip re-uploading unchanged images
    fetched: HashMap<RemoteId, Item>,
    phase: Phase,
    loaded: bool,
    next_draft: u32,
    last_error: Option<String>,
}

impl CollectionState {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            fetched: HashMap::new(),
            phase: Phase::Unloaded,
            loaded: false,
            next_draft: 1,
            last_error: None,
        }
    }

    /// Replace the collection wholesale with a fresh fetch
    fn replace(&mut self, items: Vec<Item>) {
        self.fetched = items
            .iter()
            .filter_map(|item| item.id.remote().map(|id| (id.clone(), item.clone())))
            .collect();
        self.items = items;
        self.loaded = true;
        self.last_error = None;
    }

    fn settled_phase(&self) -> Phase {
        if self.loaded {
            Phase::Ready
        } else {
            Phase::Unloaded
        }
    }

    fn position(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }

    fn persisted_ids(&self) -> Vec<RemoteId> {
        self.items
            .iter()
            .filter_map(|item| item.id.remote().cloned())
            .collect()
    }
}

pub struct CollectionSync<S: ContentStore + ?Sized> {
    schema: ContentSchema,
    store: Arc<S>,
    state: Mutex<CollectionState>,
    mutation: Mutex<()>,
}

impl<S: ContentStore + ?Sized> CollectionSync<S> {
    pub fn new(schema: ContentSchema, store: Arc<S>) -> Self {
        Self {
            schema,
            store,
            state: Mutex::new(CollectionState::new()),
            mutation: Mutex::new(()),
        }
    }

    pub fn schema(&self) -> &ContentSchema {
        &self.schema
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    /// Snapshot of the collection in display order
    pub async fn items(&self) -> Vec<Item> {
        self.state.lock().await.items.clone()
    }

    pub async fn get(&self, id: &ItemId) -> Option<Item> {
        let state = self.state.lock().await;
        state.position(id).map(|index| state.items[index].clone())
    }

    /// Message of the last failed load, cleared by the next successful one
    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.last_error.clone()
    }

    // ========================
    // Load
    // ========================

    /// Fetch the collection and replace local state with it.
    ///
    /// On failure the previous items stay in place and the error is also
    /// kept in `last_error`.
    pub async fn load(&self) -> SyncResult<Vec<Item>> {
        let _guard = self.mutation.lock().await;
        self.state.lock().await.phase = Phase::Loading;

        let fetched = self.fetch().await;
        let mut state = self.state.lock().await;
        match fetched {
            Ok(items) => {
                log::debug!("loaded {} {} items", items.len(), self.schema.name);
                state.replace(items);
                state.phase = Phase::Ready;
                Ok(state.items.clone())
            }
            Err(err) => {
                log::warn!("{}", err);
                state.last_error = Some(err.to_string());
                state.phase = state.settled_phase();
                Err(err)
            }
        }
    }

    async fn fetch(&self) -> SyncResult<Vec<Item>> {
        let records = self
            .store
            .list(&self.schema)
            .await
            .map_err(|source| self.fetch_error(source))?;
        let mut items = records
            .iter()
            .enumerate()
            .map(|(position, record)| Item::from_record(&self.schema, position, record))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| self.fetch_error(source))?;
        items.sort_by_key(|item| item.sort_id);
        Ok(items)
    }

    /// Reload after a confirmed mutation; a failure here does not undo it
    async fn reload_after(&self, action: &str) {
        match self.fetch().await {
            Ok(items) => self.state.lock().await.replace(items),
            Err(err) => {
                log::warn!("{} {} succeeded but reload failed: {}", self.schema.name, action, err);
                self.state.lock().await.last_error = Some(err.to_string());
            }
        }
    }

    // ========================
    // Local Edits
    // ========================

    /// Append a new item with default fields; nothing is sent until it is upserted
    pub async fn add_draft(&self) -> ItemId {
        let mut state = self.state.lock().await;
        let sort_id = state
            .items
            .iter()
            .map(|item| item.sort_id)
            .max()
            .map(|max| max + 1)
            .unwrap_or_else(|| self.schema.sort_base.offset());
        let draft_no = state.next_draft;
        state.next_draft += 1;

        let item = Item::draft(&self.schema, draft_no, sort_id);
        let id = item.id.clone();
        state.items.push(item);
        id
    }

    pub async fn discard_draft(&self, id: &ItemId) -> SyncResult<()> {
        let mut state = self.state.lock().await;
        match state.position(id) {
            Some(index) if id.is_draft() => {
                state.items.remove(index);
                Ok(())
            }
            _ => Err(self.unknown_item(id)),
        }
    }

    /// Apply a form to the local copy of an item without saving it
    pub async fn edit_local(&self, form: &ItemForm) -> SyncResult<()> {
        let resolved = form.resolve(&self.schema)?;
        let mut state = self.state.lock().await;
        let index = state
            .position(&form.id)
            .ok_or_else(|| self.unknown_item(&form.id))?;
        state.items[index].fields = resolved.fields;
        Ok(())
    }

    // ========================
    // Mutations
    // ========================

    /// Resolve a form and upsert the result
    pub async fn submit(&self, form: &ItemForm) -> SyncResult<()> {
        let item = form.resolve(&self.schema)?;
        self.upsert(item).await
    }

    /// Create a draft or update a persisted item, then reload
    pub async fn upsert(&self, item: Item) -> SyncResult<()> {
        let _guard = self.begin_mutation().await?;
        let result = self.upsert_locked(item).await;
        self.finish_mutation(result).await
    }

    async fn upsert_locked(&self, item: Item) -> SyncResult<()> {
        let previous = {
            let state = self.state.lock().await;
            if state.position(&item.id).is_none() {
                return Err(self.unknown_item(&item.id));
            }
            item.id.remote().and_then(|id| state.fetched.get(id).cloned())
        };

        let body = self.submission(&item, previous.as_ref()).await?;
        let saved = match item.id.remote() {
            Some(id) => self.store.update(&self.schema, id, body).await,
            None => self.store.create(&self.schema, body).await,
        };
        if let Err(source) = saved {
            log::error!("failed to save {} item {}: {}", self.schema.name, item.id, source);
            return Err(SyncError::Submit {
                content: self.schema.name.clone(),
                source,
            });
        }
        log::info!("saved {} item {}", self.schema.name, item.id);

        if item.is_draft() {
            let mut state = self.state.lock().await;
            if let Some(index) = state.position(&item.id) {
                state.items.remove(index);
            }
        }
        self.reload_after("save").await;
        Ok(())
    }

    /// Multipart body for an item; images equal to the fetched value are left out
    async fn submission(&self, item: &Item, previous: Option<&Item>) -> SyncResult<Submission> {
        let mut body = Submission::default();
        for (name, default) in self.schema.text_fields() {
            let text = item.text(name).unwrap_or(default);
            body.fields.push((name.to_string(), text.to_string()));
        }
        for (name, _, _) in self.schema.image_fields() {
            let Some(image) = item.image(name) else {
                continue;
            };
            if previous.and_then(|prev| prev.image(name)) == Some(image) {
                continue;
            }
            if let Some(attachment) = encode_attachment(self.store.as_ref(), name, image).await? {
                body.attachments.push(attachment);
            }
        }
        Ok(body)
    }

    /// Delete an item, then reload. Drafts are only dropped locally.
    pub async fn remove(&self, id: &ItemId) -> SyncResult<()> {
        let Some(remote) = id.remote() else {
            return self.discard_draft(id).await;
        };

        let _guard = self.begin_mutation().await?;
        let result = self.remove_locked(id, remote).await;
        self.finish_mutation(result).await
    }

    async fn remove_locked(&self, id: &ItemId, remote: &RemoteId) -> SyncResult<()> {
        if self.state.lock().await.position(id).is_none() {
            return Err(self.unknown_item(id));
        }

        if let Err(source) = self.store.delete(&self.schema, remote).await {
            log::error!("failed to delete {} item {}: {}", self.schema.name, remote, source);
            return Err(SyncError::Delete {
                content: self.schema.name.clone(),
                id: remote.to_string(),
                source,
            });
        }
        log::info!("deleted {} item {}", self.schema.name, remote);

        {
            let mut state = self.state.lock().await;
            if let Some(index) = state.position(id) {
                state.items.remove(index);
            }
            state.fetched.remove(remote);
        }
        self.reload_after("delete").await;
        Ok(())
    }

    /// Persist a new order of every persisted item, then reload
    pub async fn reorder(&self, order: &[RemoteId]) -> SyncResult<()> {
        let _guard = self.begin_mutation().await?;
        let result = self.reorder_locked(order).await;
        self.finish_mutation(result).await
    }

    async fn reorder_locked(&self, order: &[RemoteId]) -> SyncResult<()> {
        let current = self.state.lock().await.persisted_ids();
        validate_permutation(&current, order)?;

        let payload = reorder_payload(order, self.schema.sort_base);
        if let Err(source) = self.store.reorder(&self.schema, &payload).await {
            log::error!("failed to reorder {}: {}", self.schema.name, source);
            return Err(SyncError::Reorder {
                content: self.schema.name.clone(),
                source,
            });
        }
        log::info!("reordered {} {} items", payload.len(), self.schema.name);

        {
            let mut state = self.state.lock().await;
            let sort_ids: HashMap<&RemoteId, i64> =
                payload.iter().map(|entry| (&entry.id, entry.sort_id)).collect();
            for item in state.items.iter_mut() {
                if let Some(sort_id) = item.id.remote().and_then(|id| sort_ids.get(id)) {
                    item.sort_id = *sort_id;
                }
            }
            state.items.sort_by_key(|item| (item.is_draft(), item.sort_id));
        }
        self.reload_after("reorder").await;
        Ok(())
    }

    /// Drag preview over the persisted items in their current order
    pub async fn reorder_session(&self) -> ReorderSession<RemoteId> {
        ReorderSession::new(self.state.lock().await.persisted_ids())
    }

    // ========================
    // Helpers
    // ========================

    async fn begin_mutation(&self) -> SyncResult<MutexGuard<'_, ()>> {
        let guard = self
            .mutation
            .try_lock()
            .map_err(|_| SyncError::Busy(self.schema.name.clone()))?;
        self.state.lock().await.phase = Phase::Mutating;
        Ok(guard)
    }

    async fn finish_mutation<T>(&self, result: SyncResult<T>) -> SyncResult<T> {
        let mut state = self.state.lock().await;
        state.phase = state.settled_phase();
        result
    }

    fn fetch_error(&self, source: StoreError) -> SyncError {
        SyncError::Fetch {
            content: self.schema.name.clone(),
            source,
        }
    }

    fn unknown_item(&self, id: &ItemId) -> SyncError {
        SyncError::UnknownItem {
            content: self.schema.name.clone(),
            id: id.to_string(),
        }
    }
}
