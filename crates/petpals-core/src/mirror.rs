//! Observable in-memory copy of the page on screen.
//!
//! Front ends subscribe to a [`MirrorStore`] and redraw whenever a new
//! [`MirrorSnapshot`] is published. Only the owning service changes it: every
//! mutator is crate-private and is called after the store confirmed the write.

use tokio::sync::watch;

use crate::error::Result;
use crate::models::{Record, RecordId};
use crate::pagination::PageState;
use crate::store::{OrderBy, StoredDocument};

/// Everything a list view needs to render one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSnapshot<R> {
    /// Records of the current page, in list order
    pub items: Vec<R>,
    /// Running count of records matching the active filter
    pub total: usize,
    pub page: PageState,
}

impl<R> Default for MirrorSnapshot<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: PageState::default(),
        }
    }
}

/// Watch-backed cache of one page window
#[derive(Debug)]
pub struct MirrorStore<R: Record> {
    order: OrderBy,
    sender: watch::Sender<MirrorSnapshot<R>>,
}

impl<R: Record> MirrorStore<R> {
    pub fn new(order: OrderBy) -> Self {
        let (sender, _) = watch::channel(MirrorSnapshot::default());
        Self { order, sender }
    }

    /// Receive every snapshot published from now on
    pub fn subscribe(&self) -> watch::Receiver<MirrorSnapshot<R>> {
        self.sender.subscribe()
    }

    pub fn snapshot(&self) -> MirrorSnapshot<R> {
        self.sender.borrow().clone()
    }

    pub fn items(&self) -> Vec<R> {
        self.sender.borrow().items.clone()
    }

    pub fn total(&self) -> usize {
        self.sender.borrow().total
    }

    pub fn page(&self) -> PageState {
        self.sender.borrow().page
    }

    pub fn len(&self) -> usize {
        self.sender.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.borrow().items.is_empty()
    }

    /// Mirrored record with `id`, if it is on the current page
    pub fn get(&self, id: &RecordId) -> Option<R> {
        self.sender
            .borrow()
            .items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.sender.borrow().items.iter().any(|item| item.id() == id)
    }

    pub(crate) fn replace_page(&self, items: Vec<R>, page: PageState, total: Option<usize>) {
        self.sender.send_modify(|snapshot| {
            snapshot.items = items;
            snapshot.page = page;
            if let Some(total) = total {
                snapshot.total = total;
            }
        });
    }

    pub(crate) fn clear(&self, page: PageState, total: Option<usize>) {
        self.replace_page(Vec::new(), page, total);
    }

    pub(crate) fn set_page(&self, page: PageState) {
        self.sender.send_if_modified(|snapshot| {
            let changed = snapshot.page != page;
            snapshot.page = page;
            changed
        });
    }

    pub(crate) fn increment_total(&self) {
        self.sender.send_modify(|snapshot| snapshot.total += 1);
    }

    pub(crate) fn decrement_total(&self, by: usize) {
        if by == 0 {
            return;
        }
        self.sender
            .send_modify(|snapshot| snapshot.total = snapshot.total.saturating_sub(by));
    }

    /// Insert in sort order, keeping at most `capacity` items.
    ///
    /// Returns the record pushed off the end of the page, if any.
    pub(crate) fn insert(&self, record: R, capacity: usize) -> Result<Option<R>> {
        let mut items = self.items();
        items.push(record);
        let mut items = self.sorted(items)?;
        let evicted = if items.len() > capacity {
            items.pop()
        } else {
            None
        };
        self.sender.send_modify(|snapshot| snapshot.items = items);
        Ok(evicted)
    }

    /// Replace the mirrored copy of `record`; `false` when it is not on the page
    pub(crate) fn replace(&self, record: R) -> Result<bool> {
        let mut items = self.items();
        let Some(slot) = items.iter_mut().find(|item| item.id() == record.id()) else {
            return Ok(false);
        };
        *slot = record;
        let items = self.sorted(items)?;
        self.sender.send_modify(|snapshot| snapshot.items = items);
        Ok(true)
    }

    pub(crate) fn remove(&self, id: &RecordId) -> Option<R> {
        let mut removed = None;
        self.sender.send_if_modified(|snapshot| {
            let Some(index) = snapshot.items.iter().position(|item| item.id() == id) else {
                return false;
            };
            removed = Some(snapshot.items.remove(index));
            true
        });
        removed
    }

    /// Documents of the first and last mirrored records
    pub(crate) fn bounds(&self) -> Result<(Option<StoredDocument>, Option<StoredDocument>)> {
        let snapshot = self.sender.borrow();
        let first = snapshot.items.first().map(Record::to_document).transpose()?;
        let last = snapshot.items.last().map(Record::to_document).transpose()?;
        Ok((first, last))
    }

    fn sorted(&self, items: Vec<R>) -> Result<Vec<R>> {
        let mut keyed = items
            .into_iter()
            .map(|item| Ok((item.to_document()?, item)))
            .collect::<Result<Vec<_>>>()?;
        keyed.sort_by(|(a, _), (b, _)| self.order.compare(a, b));
        Ok(keyed.into_iter().map(|(_, item)| item).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Client;
    use pretty_assertions::assert_eq;

    fn client(id: &str, customer_number: &str) -> Client {
        Client::new(customer_number, "Owner", "Rex").with_id(RecordId::from(id))
    }

    fn numbers(mirror: &MirrorStore<Client>) -> Vec<String> {
        mirror
            .items()
            .into_iter()
            .map(|client| client.customer_number)
            .collect()
    }

    #[test]
    fn insert_keeps_sort_order_and_capacity() {
        let mirror = MirrorStore::new(Client::default_order());
        mirror.replace_page(
            vec![client("a", "C1"), client("c", "C3")],
            PageState::default(),
            Some(2),
        );

        let evicted = mirror.insert(client("b", "C2"), 2).unwrap();
        assert_eq!(numbers(&mirror), vec!["C1", "C2"]);
        assert_eq!(evicted.map(|client| client.customer_number), Some("C3".into()));

        assert!(mirror.insert(client("d", "C0"), 5).unwrap().is_none());
        assert_eq!(numbers(&mirror), vec!["C0", "C1", "C2"]);
    }

    #[test]
    fn replace_resorts_and_reports_missing() {
        let mirror = MirrorStore::new(Client::default_order());
        mirror.replace_page(
            vec![client("a", "C1"), client("b", "C2")],
            PageState::default(),
            None,
        );

        assert!(mirror.replace(client("a", "C9")).unwrap());
        assert_eq!(numbers(&mirror), vec!["C2", "C9"]);
        assert!(!mirror.replace(client("zzz", "C5")).unwrap());
    }

    #[test]
    fn remove_and_total_never_underflow() {
        let mirror = MirrorStore::new(Client::default_order());
        mirror.replace_page(vec![client("a", "C1")], PageState::default(), Some(1));

        assert!(mirror.remove(&RecordId::from("a")).is_some());
        assert!(mirror.remove(&RecordId::from("a")).is_none());
        mirror.decrement_total(3);
        assert_eq!(mirror.total(), 0);
        mirror.increment_total();
        assert_eq!(mirror.total(), 1);
    }

    #[tokio::test]
    async fn subscribers_see_published_snapshots() {
        let mirror = MirrorStore::new(Client::default_order());
        let mut receiver = mirror.subscribe();

        mirror.replace_page(vec![client("a", "C1")], PageState::default(), Some(7));
        receiver.changed().await.unwrap();
        let snapshot = receiver.borrow_and_update().clone();
        assert_eq!(snapshot.total, 7);
        assert_eq!(snapshot.items.len(), 1);

        // An unchanged page state is not republished.
        mirror.set_page(PageState::default());
        assert!(!receiver.has_changed().unwrap());
    }
}
