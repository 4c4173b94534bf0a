//! Drag Reorder Utilities
//!
//! Drag-and-drop reordering state for flat lists, without any DOM binding.
//! A session holds a pending permutation that is only handed out on confirm;
//! cancelling gives back the order it started from.

/// Computed drop action
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DropAction {
    /// Index the dragged entry was taken from
    pub from: usize,
    /// Index the dragged entry ended up at
    pub to: usize,
}

/// Move the entry at `from` so that it ends up at index `to`.
///
/// Pure splice: the entry is removed and reinserted, every other entry keeps
/// its relative order. `to` is clamped to the last index. Returns false when
/// `from` is out of range.
pub fn move_item<T>(list: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= list.len() {
        return false;
    }
    let entry = list.remove(from);
    let to = to.min(list.len());
    list.insert(to, entry);
    true
}

/// Pending reorder of a list of ids.
#[derive(Clone, Debug)]
pub struct ReorderSession<Id> {
    original: Vec<Id>,
    current: Vec<Id>,
    /// Index (in `current`) of the entry being dragged
    dragging: Option<usize>,
    /// Index the dragged entry would land on if dropped now
    drop_target: Option<usize>,
}

impl<Id: Clone + PartialEq> ReorderSession<Id> {
    pub fn new(ids: Vec<Id>) -> Self {
        Self {
            original: ids.clone(),
            current: ids,
            dragging: None,
            drop_target: None,
        }
    }

    /// Current preview order
    pub fn order(&self) -> &[Id] {
        &self.current
    }

    /// Order the session started from
    pub fn original(&self) -> &[Id] {
        &self.original
    }

    /// Whether the preview differs from the starting order
    pub fn is_dirty(&self) -> bool {
        self.original != self.current
    }

    pub fn dragging(&self) -> Option<&Id> {
        self.dragging.and_then(|idx| self.current.get(idx))
    }

    pub fn drop_target(&self) -> Option<usize> {
        self.drop_target
    }

    /// Start dragging `id`. Returns false if the id is not in the list.
    pub fn begin_drag(&mut self, id: &Id) -> bool {
        match self.position(id) {
            Some(idx) => {
                self.dragging = Some(idx);
                self.drop_target = None;
                true
            }
            None => false,
        }
    }

    /// Pointer is over the slot at `index`.
    pub fn hover(&mut self, index: usize) {
        if self.dragging.is_some() {
            self.drop_target = Some(index.min(self.current.len().saturating_sub(1)));
        }
    }

    /// Pointer left every slot.
    pub fn leave(&mut self) {
        self.drop_target = None;
    }

    /// Drop the dragged entry on the current target and apply the move to the preview.
    ///
    /// Returns None when nothing was being dragged or there is no target
    /// (a click rather than a drag).
    pub fn end_drag(&mut self) -> Option<DropAction> {
        let from = self.dragging.take();
        let to = self.drop_target.take();
        match (from, to) {
            (Some(from), Some(to)) => {
                move_item(&mut self.current, from, to);
                Some(DropAction { from, to })
            }
            _ => None,
        }
    }

    /// Abort the drag in progress; the preview keeps earlier drops.
    pub fn cancel_drag(&mut self) {
        self.dragging = None;
        self.drop_target = None;
    }

    /// Move `id` straight to `index` in the preview.
    pub fn move_to(&mut self, id: &Id, index: usize) -> bool {
        match self.position(id) {
            Some(from) => move_item(&mut self.current, from, index),
            None => false,
        }
    }

    /// Accept the preview.
    pub fn confirm(self) -> Vec<Id> {
        self.current
    }

    /// Discard the preview and hand back the starting order.
    pub fn cancel(self) -> Vec<Id> {
        self.original
    }

    fn position(&self, id: &Id) -> Option<usize> {
        self.current.iter().position(|candidate| candidate == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_item_to_front() {
        let mut list = vec!["1", "2", "3"];
        assert!(move_item(&mut list, 2, 0));
        assert_eq!(list, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_move_item_down_keeps_relative_order() {
        let mut list = vec!["a", "b", "c", "d", "e"];
        assert!(move_item(&mut list, 1, 3));
        assert_eq!(list, vec!["a", "c", "d", "b", "e"]);
    }

    #[test]
    fn test_move_item_clamps_target() {
        let mut list = vec![1, 2, 3];
        assert!(move_item(&mut list, 0, 99));
        assert_eq!(list, vec![2, 3, 1]);
    }

    #[test]
    fn test_move_item_out_of_range() {
        let mut list = vec![1, 2];
        assert!(!move_item(&mut list, 5, 0));
        assert_eq!(list, vec![1, 2]);
    }

    #[test]
    fn test_drag_and_drop() {
        let mut session = ReorderSession::new(vec!["1", "2", "3"]);
        assert!(session.begin_drag(&"3"));
        assert_eq!(session.dragging(), Some(&"3"));
        session.hover(0);

        let action = session.end_drag();
        assert_eq!(action, Some(DropAction { from: 2, to: 0 }));
        assert_eq!(session.order(), &["3", "1", "2"]);
        assert!(session.is_dirty());
        assert_eq!(session.confirm(), vec!["3", "1", "2"]);
    }

    #[test]
    fn test_click_without_target_is_not_a_drop() {
        let mut session = ReorderSession::new(vec![1, 2, 3]);
        session.begin_drag(&1);
        assert_eq!(session.end_drag(), None);
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_hover_ignored_when_not_dragging() {
        let mut session = ReorderSession::new(vec![1, 2, 3]);
        session.hover(1);
        assert_eq!(session.drop_target(), None);
    }

    #[test]
    fn test_cancel_restores_original() {
        let mut session = ReorderSession::new(vec![1, 2, 3]);
        session.move_to(&1, 2);
        assert_eq!(session.order(), &[2, 3, 1]);
        assert_eq!(session.cancel(), vec![1, 2, 3]);
    }

    #[test]
    fn test_begin_drag_unknown_id() {
        let mut session = ReorderSession::new(vec![1, 2, 3]);
        assert!(!session.begin_drag(&7));
        assert_eq!(session.dragging(), None);
    }
}
