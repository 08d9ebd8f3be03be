//! Index-based editing of the ordered lists in the document.
//!
//! Every list in the curriculum (groups, sections, steps, blocks, requirements, choices, ...)
//! is edited with the same four operations. Moving is an adjacent swap, never a re-sort, and
//! out-of-range indices leave the list untouched.

/// Ordered-sequence editing operations used by the form UI.
pub trait Sequence<T> {
    /// Swaps the item at `index` with its predecessor. Returns `false` when nothing moved.
    fn move_up(&mut self, index: usize) -> bool;
    /// Swaps the item at `index` with its successor. Returns `false` when nothing moved.
    fn move_down(&mut self, index: usize) -> bool;
    /// Removes and returns the item at `index`, if there is one.
    fn remove_at(&mut self, index: usize) -> Option<T>;
    /// Inserts `item` at `index`, clamped to the end of the list.
    fn insert_at(&mut self, index: usize, item: T);
}

impl<T> Sequence<T> for Vec<T> {
    fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.len() {
            return false;
        }
        self.swap(index - 1, index);
        true
    }

    fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.len() {
            return false;
        }
        self.swap(index, index + 1);
        true
    }

    fn remove_at(&mut self, index: usize) -> Option<T> {
        if index < self.len() {
            Some(self.remove(index))
        } else {
            None
        }
    }

    fn insert_at(&mut self, index: usize, item: T) {
        let index = index.min(self.len());
        self.insert(index, item);
    }
}

/// Rebuilds `items` in the order given by `ids`, as a drag-and-drop drop handler does.
/// Ids without a matching item are skipped, and items whose id is not listed are dropped.
pub fn reorder_by_ids<T, F>(items: &mut Vec<T>, ids: &[String], id_of: F)
where
    F: Fn(&T) -> &str,
{
    let mut remaining: Vec<Option<T>> = items.drain(..).map(Some).collect();
    for id in ids {
        let found = remaining
            .iter()
            .position(|slot| slot.as_ref().map_or(false, |item| id_of(item) == id));
        if let Some(item) = found.and_then(|position| remaining[position].take()) {
            items.push(item);
        }
    }
}
