//! Store, page cursor and mirror wired together for one record type

use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::error::{Error, Result};
use crate::mirror::{MirrorSnapshot, MirrorStore};
use crate::models::{Record, RecordId};
use crate::pagination::{PageCursor, PageMove, PageOutcome, PageRequest, PageState};
use crate::store::{DocumentStore, Fields, Filter, OrderBy, Query, StoredDocument, WriteBatch};
use crate::util::is_valid_field_name;

/// Paged, mirrored access to one collection.
///
/// Writes go to the store first; the mirror only changes once the store
/// accepted them. A failed write leaves the mirror as it was.
pub struct CollectionService<R: Record, S: DocumentStore + ?Sized> {
    store: Arc<S>,
    cursor: Mutex<PageCursor>,
    mirror: MirrorStore<R>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record, S: DocumentStore + ?Sized> CollectionService<R, S> {
    /// Service using the record type's default ordering
    pub fn new(store: Arc<S>, page_size: usize) -> Result<Self> {
        Self::with_order(store, R::default_order(), page_size)
    }

    pub fn with_order(store: Arc<S>, order: OrderBy, page_size: usize) -> Result<Self> {
        let cursor = PageCursor::new(R::COLLECTION, order.clone(), page_size)?;
        Ok(Self {
            store,
            cursor: Mutex::new(cursor),
            mirror: MirrorStore::new(order),
            _record: PhantomData,
        })
    }

    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub const fn mirror(&self) -> &MirrorStore<R> {
        &self.mirror
    }

    pub fn subscribe(&self) -> watch::Receiver<MirrorSnapshot<R>> {
        self.mirror.subscribe()
    }

    pub fn snapshot(&self) -> MirrorSnapshot<R> {
        self.mirror.snapshot()
    }

    pub async fn page_state(&self) -> PageState {
        self.cursor.lock().await.state()
    }

    pub async fn is_loading(&self) -> bool {
        self.cursor.lock().await.is_loading()
    }

    /// Filter of the page currently loaded (or being loaded)
    pub async fn active_filter(&self) -> Option<Filter> {
        self.cursor.lock().await.filter().cloned()
    }

    /// Reset to the first page of records matching `filter`
    pub async fn load_first_page(&self, filter: Option<Filter>) -> Result<PageOutcome> {
        let request = self.cursor.lock().await.plan_first(filter);
        self.load(request).await
    }

    pub async fn load_next_page(&self) -> Result<PageOutcome> {
        let request = self.cursor.lock().await.plan_next();
        match request {
            Some(request) => self.load(request).await,
            None => Ok(PageOutcome::Unchanged),
        }
    }

    pub async fn load_previous_page(&self) -> Result<PageOutcome> {
        let request = self.cursor.lock().await.plan_previous();
        match request {
            Some(request) => self.load(request).await,
            None => Ok(PageOutcome::Unchanged),
        }
    }

    async fn load(&self, request: PageRequest) -> Result<PageOutcome> {
        let fetched = self.fetch(&request).await;
        let mut cursor = self.cursor.lock().await;
        let (documents, records, total) = match fetched {
            Ok(fetched) => fetched,
            Err(error) => {
                tracing::warn!("Failed to load {} page: {error}", R::COLLECTION);
                cursor.abandon(&request);
                return Err(error);
            }
        };

        let applied = cursor.apply(&request, documents);
        let page = cursor.state();
        match applied.outcome {
            PageOutcome::Loaded { len } => {
                let mut records = records;
                records.truncate(len);
                self.mirror.replace_page(records, page, total);
            }
            PageOutcome::NoData => self.mirror.clear(page, total),
            PageOutcome::Unchanged => self.mirror.set_page(page),
            PageOutcome::Superseded => {}
        }
        Ok(applied.outcome)
    }

    async fn fetch(
        &self,
        request: &PageRequest,
    ) -> Result<(Vec<StoredDocument>, Vec<R>, Option<usize>)> {
        let documents = self.store.run_query(request.query()).await?;
        let records = documents
            .iter()
            .map(R::from_document)
            .collect::<Result<Vec<_>>>()?;
        let total = if request.movement() == PageMove::First {
            Some(self.store.count(request.query()).await?)
        } else {
            None
        };
        Ok((documents, records, total))
    }

    /// Fetch a record straight from the store
    pub async fn get_by_id(&self, id: &RecordId) -> Result<Option<R>> {
        self.store
            .get(R::COLLECTION, id)
            .await?
            .map(|document| R::from_document(&document))
            .transpose()
    }

    /// Every record matching `filter`, unpaged, in list order
    pub async fn find_all(&self, filter: Option<Filter>) -> Result<Vec<R>> {
        let order = self.cursor.lock().await.order().clone();
        let query = Query::collection(R::COLLECTION)
            .filters(filter)
            .order_by(order);
        self.store
            .run_query(&query)
            .await?
            .iter()
            .map(R::from_document)
            .collect()
    }

    /// Create `record` under a freshly allocated id
    pub async fn add(&self, record: R) -> Result<R> {
        let id = self.store.allocate_id();
        let record = record.with_id(id.clone());
        let document = record.to_document()?;

        if let Err(error) = self
            .store
            .set(R::COLLECTION, &id, document.fields.clone())
            .await
        {
            tracing::warn!("Failed to add {} record: {error}", R::COLLECTION);
            return Err(error);
        }

        self.reflect_write(None, record.clone(), &document).await?;
        Ok(record)
    }

    /// Write the whole record over the stored one
    pub async fn update(&self, record: R) -> Result<()> {
        let id = require_id(record.id())?;
        let document = record.to_document()?;
        let previous = self.store.get(R::COLLECTION, &id).await?;

        if let Err(error) = self
            .store
            .update(R::COLLECTION, &id, document.fields.clone())
            .await
        {
            tracing::warn!("Failed to update {}/{id}: {error}", R::COLLECTION);
            return Err(error);
        }

        self.reflect_write(previous.as_ref(), record, &document).await
    }

    /// Change exactly the given fields of record `id`
    pub async fn update_fields(&self, id: &RecordId, fields: Fields) -> Result<()> {
        let id = require_id(id)?;
        if let Some(name) = fields.keys().find(|name| !is_valid_field_name(name)) {
            return Err(Error::InvalidInput(format!("invalid field name '{name}'")));
        }
        if fields.contains_key("id") {
            return Err(Error::InvalidInput("the id field cannot be changed".into()));
        }

        let previous = self.store.get(R::COLLECTION, &id).await?;
        if let Err(error) = self.store.update(R::COLLECTION, &id, fields.clone()).await {
            tracing::warn!("Failed to update {}/{id}: {error}", R::COLLECTION);
            return Err(error);
        }

        let Some(previous) = previous else {
            return Ok(());
        };
        let mut document = previous.clone();
        document.fields.extend(fields);
        let record = R::from_document(&document)?;
        self.reflect_write(Some(&previous), record, &document).await
    }

    /// Delete `record` from the store and the mirror
    pub async fn delete(&self, record: &R) -> Result<()> {
        let id = require_id(record.id())?;
        let document = record.to_document()?;

        let existed = match self.store.delete(R::COLLECTION, &id).await {
            Ok(existed) => existed,
            Err(error) => {
                tracing::warn!("Failed to delete {}/{id}: {error}", R::COLLECTION);
                return Err(error);
            }
        };

        let mut cursor = self.cursor.lock().await;
        if existed && matches_filter(&cursor, &document) {
            self.mirror.decrement_total(1);
        }
        if self.mirror.remove(&id).is_some() {
            self.rebind(&mut cursor)?;
        }
        Ok(())
    }

    /// Delete every record matching `filter` in one atomic batch
    pub async fn delete_where(&self, filter: Filter) -> Result<usize> {
        let query = Query::collection(R::COLLECTION).filter(filter);
        let documents = self.store.run_query(&query).await?;
        self.delete_documents(documents).await
    }

    /// Delete the records with the given ids in one atomic batch.
    ///
    /// Ids that are not stored are skipped.
    pub async fn delete_many(&self, ids: &[RecordId]) -> Result<usize> {
        let mut documents = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(document) = self.store.get(R::COLLECTION, id).await? {
                documents.push(document);
            }
        }
        self.delete_documents(documents).await
    }

    async fn delete_documents(&self, documents: Vec<StoredDocument>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let mut batch = WriteBatch::new();
        for document in &documents {
            batch.delete(R::COLLECTION, document.id.clone());
        }
        if let Err(error) = self.store.commit(batch).await {
            tracing::warn!(
                "Failed to delete {} {} records: {error}",
                documents.len(),
                R::COLLECTION
            );
            return Err(error);
        }

        let mut cursor = self.cursor.lock().await;
        let counted = documents
            .iter()
            .filter(|document| matches_filter(&cursor, document))
            .count();
        self.mirror.decrement_total(counted);

        let mut removed = false;
        for document in &documents {
            removed |= self.mirror.remove(&document.id).is_some();
        }
        if removed {
            self.rebind(&mut cursor)?;
        }
        Ok(documents.len())
    }

    /// Bring the mirror in line with a write the store accepted.
    ///
    /// `previous` is the stored document before the write, `None` for a new
    /// one. The total follows the record into or out of the active filter, and
    /// the record only stays on screen while it sorts inside the loaded span.
    async fn reflect_write(
        &self,
        previous: Option<&StoredDocument>,
        record: R,
        document: &StoredDocument,
    ) -> Result<()> {
        let mut cursor = self.cursor.lock().await;
        let counted = previous.is_some_and(|previous| matches_filter(&cursor, previous));
        let matches = matches_filter(&cursor, document);
        match (counted, matches) {
            (true, false) => self.mirror.decrement_total(1),
            (false, true) => self.mirror.increment_total(),
            _ => {}
        }

        let shown = self.mirror.contains(&document.id);
        if matches && cursor.covers(document) {
            if shown {
                self.mirror.replace(record)?;
            } else if self.mirror.insert(record, cursor.page_size())?.is_some() {
                cursor.mark_more_available();
            }
        } else if shown {
            self.mirror.remove(&document.id);
        }
        self.rebind(&mut cursor)
    }

    fn rebind(&self, cursor: &mut PageCursor) -> Result<()> {
        let (first, last) = self.mirror.bounds()?;
        let first = first.map(|document| cursor.marker_for(&document));
        let last = last.map(|document| cursor.marker_for(&document));
        cursor.rebind(first, last);
        self.mirror.set_page(cursor.state());
        Ok(())
    }
}

fn matches_filter(cursor: &PageCursor, document: &StoredDocument) -> bool {
    cursor
        .filter()
        .is_none_or(|filter| filter.matches(document))
}

fn require_id(id: &RecordId) -> Result<RecordId> {
    if id.is_empty() {
        Err(Error::InvalidInput("record has no id".into()))
    } else {
        Ok(id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Client;
    use crate::store::{MemoryStore, StoreOp};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn service_with(count: usize, page_size: usize) -> CollectionService<Client, MemoryStore> {
        let service = CollectionService::new(Arc::new(MemoryStore::new()), page_size).unwrap();
        for index in 1..=count {
            service
                .add(Client::new(format!("C{index:02}"), "Owner", format!("Pet {index}")))
                .await
                .unwrap();
        }
        service
    }

    fn numbers(service: &CollectionService<Client, MemoryStore>) -> Vec<String> {
        service
            .snapshot()
            .items
            .into_iter()
            .map(|client| client.customer_number)
            .collect()
    }

    #[tokio::test]
    async fn first_page_seeds_total_from_store_count() {
        let service = service_with(5, 2).await;
        let outcome = service.load_first_page(None).await.unwrap();

        assert_eq!(outcome, PageOutcome::Loaded { len: 2 });
        let snapshot = service.snapshot();
        assert_eq!(snapshot.total, 5);
        assert_eq!(numbers(&service), vec!["C01", "C02"]);
        assert!(snapshot.page.can_go_next);
    }

    #[tokio::test]
    async fn add_then_get_by_id_round_trips() {
        let service = service_with(0, 2).await;
        let added = service
            .add(Client::new("C10", "Jo", "Biscuit"))
            .await
            .unwrap();

        assert!(!added.id.is_empty());
        let fetched = service.get_by_id(&added.id).await.unwrap();
        assert_eq!(fetched, Some(added));
    }

    #[tokio::test]
    async fn add_into_full_window_evicts_and_enables_next() {
        let service = service_with(2, 2).await;
        service.load_first_page(None).await.unwrap();
        assert!(!service.page_state().await.can_go_next);

        service.add(Client::new("C00", "Early", "Bird")).await.unwrap();
        assert_eq!(numbers(&service), vec!["C00", "C01"]);
        assert_eq!(service.snapshot().total, 3);
        assert!(service.page_state().await.can_go_next);

        // The evicted record is reachable through the next page.
        service.load_next_page().await.unwrap();
        assert_eq!(numbers(&service), vec!["C02"]);
    }

    #[tokio::test]
    async fn add_outside_window_only_counts() {
        let service = service_with(4, 2).await;
        service.load_first_page(None).await.unwrap();

        service.add(Client::new("C99", "Late", "Comer")).await.unwrap();
        assert_eq!(numbers(&service), vec!["C01", "C02"]);
        assert_eq!(service.snapshot().total, 5);
    }

    #[tokio::test]
    async fn add_not_matching_search_is_ignored_by_mirror() {
        let service = service_with(3, 5).await;
        service
            .load_first_page(Some(Filter::prefix("petName", "Pet 1")))
            .await
            .unwrap();
        assert_eq!(service.snapshot().total, 1);

        service.add(Client::new("C50", "Other", "Rex")).await.unwrap();
        assert_eq!(service.snapshot().total, 1);
        assert_eq!(numbers(&service), vec!["C01"]);
    }

    #[tokio::test]
    async fn update_fields_changes_only_given_fields() {
        let service = service_with(1, 2).await;
        service.load_first_page(None).await.unwrap();
        let original = service.snapshot().items[0].clone();

        let fields = json!({ "health": "Allergic to chicken" })
            .as_object()
            .cloned()
            .unwrap();
        service.update_fields(&original.id, fields).await.unwrap();

        let stored = service.get_by_id(&original.id).await.unwrap().unwrap();
        assert_eq!(
            stored,
            Client {
                health: "Allergic to chicken".into(),
                ..original.clone()
            }
        );
        assert_eq!(service.snapshot().items[0], stored);
    }

    #[tokio::test]
    async fn update_resorts_window_and_rebinds_cursor() {
        let service = service_with(4, 2).await;
        service.load_first_page(None).await.unwrap();
        let mut first = service.snapshot().items[0].clone();

        first.customer_number = "C015".into();
        service.update(first).await.unwrap();
        assert_eq!(numbers(&service), vec!["C015", "C02"]);

        service.load_next_page().await.unwrap();
        assert_eq!(numbers(&service), vec!["C03", "C04"]);
    }

    #[tokio::test]
    async fn update_past_window_end_leaves_gap_records_reachable() {
        let service = service_with(4, 2).await;
        service.load_first_page(None).await.unwrap();
        let mut first = service.snapshot().items[0].clone();

        first.customer_number = "C035".into();
        service.update(first).await.unwrap();
        assert_eq!(numbers(&service), vec!["C02"]);
        assert_eq!(service.snapshot().total, 4);
        assert!(service.page_state().await.can_go_next);

        service.load_next_page().await.unwrap();
        assert_eq!(numbers(&service), vec!["C03", "C035"]);
        service.load_next_page().await.unwrap();
        assert_eq!(numbers(&service), vec!["C04"]);
    }

    #[tokio::test]
    async fn edits_move_records_in_and_out_of_the_filter() {
        let service = service_with(3, 5).await;
        service
            .load_first_page(Some(Filter::prefix("petName", "Pet 1")))
            .await
            .unwrap();
        let matching = service.snapshot().items[0].clone();
        assert_eq!(service.snapshot().total, 1);

        let renamed = json!({ "petName": "Rex" }).as_object().cloned().unwrap();
        service.update_fields(&matching.id, renamed).await.unwrap();
        assert!(numbers(&service).is_empty());
        assert_eq!(service.snapshot().total, 0);

        let outsider = service
            .find_all(Some(Filter::equal("customerNumber", "C02")))
            .await
            .unwrap()
            .remove(0);
        service
            .update(Client {
                pet_name: "Pet 12".into(),
                ..outsider
            })
            .await
            .unwrap();
        assert_eq!(numbers(&service), vec!["C02"]);
        assert_eq!(service.snapshot().total, 1);

        service
            .load_first_page(Some(Filter::prefix("petName", "Pet 1")))
            .await
            .unwrap();
        assert_eq!(numbers(&service), vec!["C02"]);
        assert_eq!(service.snapshot().total, 1);
    }

    #[tokio::test]
    async fn update_of_missing_record_fails() {
        let service = service_with(0, 2).await;
        let ghost = Client::new("C1", "Nobody", "None").with_id(RecordId::from("ghost"));
        let error = service.update(ghost).await.unwrap_err();
        assert!(matches!(error, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_removes_from_snapshot_and_reload() {
        let service = service_with(3, 5).await;
        service.load_first_page(None).await.unwrap();
        let victim = service.snapshot().items[1].clone();

        service.delete(&victim).await.unwrap();
        assert_eq!(numbers(&service), vec!["C01", "C03"]);
        assert_eq!(service.snapshot().total, 2);

        service.load_first_page(None).await.unwrap();
        assert_eq!(numbers(&service), vec!["C01", "C03"]);
        assert_eq!(service.get_by_id(&victim.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleting_twice_counts_once() {
        let service = service_with(3, 5).await;
        service.load_first_page(None).await.unwrap();
        let victim = service.snapshot().items[0].clone();

        service.delete(&victim).await.unwrap();
        service.delete(&victim).await.unwrap();
        assert_eq!(service.snapshot().total, 2);
        assert_eq!(service.store().len(Client::COLLECTION).await, 2);
        assert_eq!(numbers(&service), vec!["C02", "C03"]);
    }

    #[tokio::test]
    async fn failed_write_leaves_mirror_untouched() {
        let service = service_with(2, 5).await;
        service.load_first_page(None).await.unwrap();
        let before = service.snapshot();

        service
            .store()
            .fail_collection(Client::COLLECTION, StoreOp::Write)
            .await;
        assert!(service.add(Client::new("C00", "A", "B")).await.is_err());
        assert!(service.delete(&before.items[0]).await.is_err());
        assert_eq!(service.snapshot(), before);
    }

    #[tokio::test]
    async fn failed_load_keeps_window_and_position() {
        let service = service_with(4, 2).await;
        service.load_first_page(None).await.unwrap();
        let before = service.snapshot();

        service
            .store()
            .fail_collection(Client::COLLECTION, StoreOp::Read)
            .await;
        assert!(matches!(
            service.load_next_page().await,
            Err(Error::Unavailable(_))
        ));
        assert_eq!(service.snapshot(), before);
        assert_eq!(service.page_state().await.position, 0);
        assert!(!service.is_loading().await);

        service
            .store()
            .restore_collection(Client::COLLECTION)
            .await;
        service.load_next_page().await.unwrap();
        assert_eq!(numbers(&service), vec!["C03", "C04"]);
    }

    #[tokio::test]
    async fn failed_reset_keeps_window_and_cursor_in_step() {
        let service = service_with(4, 2).await;
        service.load_first_page(None).await.unwrap();
        service.load_next_page().await.unwrap();
        let before = service.snapshot();

        service
            .store()
            .fail_collection(Client::COLLECTION, StoreOp::Read)
            .await;
        let filter = Filter::prefix("petName", "Pet 1");
        assert!(service.load_first_page(Some(filter)).await.is_err());
        assert_eq!(service.snapshot(), before);
        assert_eq!(service.page_state().await, before.page);
        assert_eq!(service.active_filter().await, None);

        service
            .store()
            .restore_collection(Client::COLLECTION)
            .await;
        assert_eq!(
            service.load_previous_page().await.unwrap(),
            PageOutcome::Loaded { len: 2 }
        );
        assert_eq!(numbers(&service), vec!["C01", "C02"]);
    }

    #[tokio::test]
    async fn delete_many_skips_unknown_ids() {
        let service = service_with(3, 5).await;
        service.load_first_page(None).await.unwrap();
        let items = service.snapshot().items;

        let ids = vec![items[0].id.clone(), RecordId::from("missing")];
        assert_eq!(service.delete_many(&ids).await.unwrap(), 1);
        assert_eq!(numbers(&service), vec!["C02", "C03"]);
        assert_eq!(service.snapshot().total, 2);
    }
}
