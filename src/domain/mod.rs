//! Domain Layer
//!
//! Content schemas, items and their identities, image references and the
//! error taxonomy. No I/O happens here.

mod error;
mod form;
mod image;
mod item;
mod schema;

pub use error::{EncodingError, StoreError, SyncError, SyncResult};
pub use form::ItemForm;
pub use image::{
    decode_data_uri, encode_data_uri, guess_mime, Attachment, ImageRef, INLINE_IMAGE_MIME,
    PLACEHOLDER_IMAGE,
};
pub use item::{FieldValue, Item, ItemId, RemoteId};
pub use schema::{ContentSchema, FieldSpec, ImageWire, SortBase};
