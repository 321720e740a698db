//! Checkbox selection over a list of records

use std::collections::BTreeSet;

use crate::models::{Record, RecordId};

/// Ids of the checked records in a list view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    checked: BTreeSet<RecordId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip `id`; returns whether it is now checked
    pub fn toggle(&mut self, id: &RecordId) -> bool {
        if self.checked.remove(id) {
            false
        } else {
            self.checked.insert(id.clone());
            true
        }
    }

    pub fn check(&mut self, id: RecordId) {
        self.checked.insert(id);
    }

    pub fn is_checked(&self, id: &RecordId) -> bool {
        self.checked.contains(id)
    }

    pub fn select_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a RecordId>) {
        self.checked.extend(ids.into_iter().cloned());
    }

    pub fn clear(&mut self) {
        self.checked.clear();
    }

    pub fn len(&self) -> usize {
        self.checked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checked.is_empty()
    }

    /// Check everything lying between pairs of checked items.
    ///
    /// Walking `order`, each checked item toggles a fill flag; items seen while
    /// the flag is on get checked. An unpaired last check fills to the end.
    pub fn select_between<'a>(&mut self, order: impl IntoIterator<Item = &'a RecordId>) {
        let mut filling = false;
        let mut fill = Vec::new();
        for id in order {
            if self.checked.contains(id) {
                filling = !filling;
            }
            if filling {
                fill.push(id.clone());
            }
        }
        self.checked.extend(fill);
    }

    /// The checked records of `items`, in list order
    pub fn checked_in_order<'a, R: Record>(&self, items: &'a [R]) -> Vec<&'a R> {
        items
            .iter()
            .filter(|item| self.checked.contains(item.id()))
            .collect()
    }

    /// Checked ids in sorted order
    pub fn ids(&self) -> Vec<RecordId> {
        self.checked.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(names: &[&str]) -> Vec<RecordId> {
        names.iter().map(|name| RecordId::from(*name)).collect()
    }

    #[test]
    fn toggle_flips_membership() {
        let mut selection = Selection::new();
        let id = RecordId::from("v1");
        assert!(selection.toggle(&id));
        assert!(selection.is_checked(&id));
        assert!(!selection.toggle(&id));
        assert!(selection.is_empty());
    }

    #[test]
    fn select_between_fills_each_pair() {
        let order = ids(&["a", "b", "c", "d", "e", "f", "g"]);
        let mut selection = Selection::new();
        selection.check(RecordId::from("b"));
        selection.check(RecordId::from("d"));
        selection.check(RecordId::from("f"));

        selection.select_between(&order);
        assert_eq!(selection.ids(), ids(&["b", "c", "d", "f", "g"]));
    }

    #[test]
    fn select_all_then_clear() {
        let order = ids(&["a", "b"]);
        let mut selection = Selection::new();
        selection.select_all(&order);
        assert_eq!(selection.len(), 2);
        selection.clear();
        assert!(selection.is_empty());
    }
}
