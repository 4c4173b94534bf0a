//! Remote Store Layer
//!
//! The seam between the synchronizers and the content backend.

mod memory;
mod traits;

pub use memory::{MemoryStore, Operation};
pub use traits::{
    ContactStore, ContentStore, EmailRecord, FetchedImage, ImageFetcher, MediaRecord, SortEntry,
    Submission,
};
