//! Synchronization Layer
//!
//! Keeps local copies of the site's content in step with the backend.

mod attachment;
mod collection;
mod contact;
mod reorder;


pub use attachment::encode_attachment;
pub use collection::{CollectionSync, Phase};
pub use contact::{Contact, ContactForm, ContactSync, BACKGROUND_LABEL, LOGO_LABEL};
pub use reorder::{reorder_payload, validate_permutation};
