//! Reorder Payloads
//!
//! Dense renumbering of a collection for one batched reorder request.

use std::collections::HashSet;

use crate::domain::{RemoteId, SortBase, SyncError, SyncResult};
use crate::remote::SortEntry;

/// Map each id to its new position, numbered from `base`
pub fn reorder_payload(order: &[RemoteId], base: SortBase) -> Vec<SortEntry> {
    order
        .iter()
        .enumerate()
        .map(|(index, id)| SortEntry {
            id: id.clone(),
            sort_id: index as i64 + base.offset(),
        })
        .collect()
}

/// Check that `order` holds every id of `current` exactly once
pub fn validate_permutation(current: &[RemoteId], order: &[RemoteId]) -> SyncResult<()> {
    let mut seen = HashSet::with_capacity(order.len());
    for id in order {
        if !seen.insert(id) {
            return Err(SyncError::InvalidOrder(format!("{} appears twice", id)));
        }
        if !current.contains(id) {
            return Err(SyncError::InvalidOrder(format!("{} is not in the collection", id)));
        }
    }
    if let Some(missing) = current.iter().find(|id| !seen.contains(id)) {
        return Err(SyncError::InvalidOrder(format!("{} is missing", missing)));
    }
    Ok(())
}
