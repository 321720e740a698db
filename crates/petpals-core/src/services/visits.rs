//! Visits list: per-client or all visits, newest first

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use super::{CascadeDelete, CollectionService};
use crate::error::Result;
use crate::mirror::MirrorSnapshot;
use crate::models::{RecordId, Visit};
use crate::pagination::{PageOutcome, PageState};
use crate::store::{DocumentStore, Fields, Filter};

pub struct VisitsService<S: DocumentStore + ?Sized> {
    records: CollectionService<Visit, S>,
}

impl<S: DocumentStore + ?Sized> VisitsService<S> {
    pub fn new(store: Arc<S>, page_size: usize) -> Result<Self> {
        Ok(Self {
            records: CollectionService::new(store, page_size)?,
        })
    }

    /// The underlying collection service
    pub const fn records(&self) -> &CollectionService<Visit, S> {
        &self.records
    }

    pub fn subscribe(&self) -> watch::Receiver<MirrorSnapshot<Visit>> {
        self.records.subscribe()
    }

    pub fn snapshot(&self) -> MirrorSnapshot<Visit> {
        self.records.snapshot()
    }

    pub async fn page_state(&self) -> PageState {
        self.records.page_state().await
    }

    /// First page of one client's visits
    pub async fn load_for_client(&self, client_id: &RecordId) -> Result<PageOutcome> {
        self.records
            .load_first_page(Some(client_filter(client_id)))
            .await
    }

    /// First page of every visit
    pub async fn load_all(&self) -> Result<PageOutcome> {
        self.records.load_first_page(None).await
    }

    pub async fn load_next_page(&self) -> Result<PageOutcome> {
        self.records.load_next_page().await
    }

    pub async fn load_previous_page(&self) -> Result<PageOutcome> {
        self.records.load_previous_page().await
    }

    /// Every visit of a client, unpaged, newest first
    pub async fn visits_for_client(&self, client_id: &RecordId) -> Result<Vec<Visit>> {
        self.records.find_all(Some(client_filter(client_id))).await
    }

    pub async fn get_by_id(&self, id: &RecordId) -> Result<Option<Visit>> {
        self.records.get_by_id(id).await
    }

    pub async fn add(&self, visit: Visit) -> Result<Visit> {
        self.records.add(visit).await
    }

    pub async fn update(&self, visit: Visit) -> Result<()> {
        self.records.update(visit).await
    }

    pub async fn update_fields(&self, id: &RecordId, fields: Fields) -> Result<()> {
        self.records.update_fields(id, fields).await
    }

    pub async fn delete(&self, visit: &Visit) -> Result<()> {
        self.records.delete(visit).await
    }

    /// Delete every visit of `client_id` in one atomic batch
    pub async fn delete_all_for_client(&self, client_id: &RecordId) -> Result<usize> {
        self.records.delete_where(client_filter(client_id)).await
    }

    /// Delete the checked visits in one atomic batch
    pub async fn delete_selected(&self, ids: &[RecordId]) -> Result<usize> {
        let deleted = self.records.delete_many(ids).await?;
        tracing::debug!("Deleted {deleted} selected visits");
        Ok(deleted)
    }
}

#[async_trait]
impl<S: DocumentStore + ?Sized> CascadeDelete for VisitsService<S> {
    async fn delete_dependents(&self, parent: &RecordId) -> Result<usize> {
        self.delete_all_for_client(parent).await
    }
}

fn client_filter(client_id: &RecordId) -> Filter {
    Filter::equal(Visit::CLIENT_ID_FIELD, client_id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use crate::store::{MemoryStore, StoreOp};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    async fn service() -> VisitsService<MemoryStore> {
        let service = VisitsService::new(Arc::new(MemoryStore::new()), 2).unwrap();
        for d in 1..=3 {
            service
                .add(Visit::new(RecordId::from("rex"), day(d)))
                .await
                .unwrap();
        }
        service
            .add(Visit::new(RecordId::from("tom"), day(9)))
            .await
            .unwrap();
        service
    }

    fn days(service: &VisitsService<MemoryStore>) -> Vec<u32> {
        service
            .snapshot()
            .items
            .into_iter()
            .map(|visit| visit.dt_date)
            .collect()
    }

    #[tokio::test]
    async fn client_visits_page_newest_first() {
        let service = service().await;

        service
            .load_for_client(&RecordId::from("rex"))
            .await
            .unwrap();
        assert_eq!(days(&service), vec![3, 2]);
        assert_eq!(service.snapshot().total, 3);

        service.load_next_page().await.unwrap();
        assert_eq!(days(&service), vec![1]);
        assert!(!service.page_state().await.can_go_next);

        service.load_all().await.unwrap();
        assert_eq!(days(&service), vec![9, 3]);
        assert_eq!(service.snapshot().total, 4);
    }

    #[tokio::test]
    async fn delete_all_for_client_leaves_other_clients() {
        let service = service().await;
        service.load_all().await.unwrap();

        let deleted = service
            .delete_all_for_client(&RecordId::from("rex"))
            .await
            .unwrap();
        assert_eq!(deleted, 3);
        assert_eq!(days(&service), vec![9]);
        assert_eq!(service.snapshot().total, 1);
        assert_eq!(service.records().store().len(Visit::COLLECTION).await, 1);
    }

    #[tokio::test]
    async fn failed_cascade_deletes_nothing() {
        let service = service().await;
        service
            .records()
            .store()
            .fail_collection(Visit::COLLECTION, StoreOp::Write)
            .await;

        assert!(service
            .delete_dependents(&RecordId::from("rex"))
            .await
            .is_err());
        assert_eq!(service.records().store().len(Visit::COLLECTION).await, 4);
    }

    #[tokio::test]
    async fn delete_selected_updates_window() {
        let service = service().await;
        service
            .load_for_client(&RecordId::from("rex"))
            .await
            .unwrap();
        let newest = service.snapshot().items[0].id.clone();

        assert_eq!(service.delete_selected(&[newest]).await.unwrap(), 1);
        assert_eq!(days(&service), vec![2]);
        assert_eq!(service.snapshot().total, 2);

        let all = service
            .visits_for_client(&RecordId::from("rex"))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }
}
