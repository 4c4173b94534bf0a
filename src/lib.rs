//! Site Admin Client
//!
//! Layered architecture:
//! - domain: Content schemas, items, image references and errors
//! - remote: Store traits and the in-memory store
//! - api: HTTP implementation of the store traits
//! - sync: Collection and contact synchronizers
//! - config / context: Client configuration and session credentials

pub mod api;
pub mod config;
pub mod context;
pub mod domain;
pub mod remote;
pub mod sync;

pub use api::ApiClient;
pub use config::{ClientConfig, ConfigError};
pub use context::Session;
pub use domain::{ContentSchema, Item, ItemForm, ItemId, RemoteId, SyncError, SyncResult};
pub use sync::{CollectionSync, ContactSync};
