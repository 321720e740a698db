//! Clients list: search by pet name and deletes that take the visits along

use std::sync::Arc;

use tokio::sync::watch;

use super::{CascadeDelete, CollectionService};
use crate::config::PetPalsConfig;
use crate::error::{Error, Result};
use crate::mirror::MirrorSnapshot;
use crate::models::{Client, RecordId};
use crate::pagination::{PageOutcome, PageState};
use crate::search::{SearchState, SearchTerm};
use crate::store::{DocumentStore, Fields, Filter};
use crate::util::is_valid_field_name;

pub struct ClientsService<S: DocumentStore + ?Sized> {
    records: CollectionService<Client, S>,
    dependents: Arc<dyn CascadeDelete>,
    search: SearchState,
    search_field: String,
}

impl<S: DocumentStore + ?Sized> ClientsService<S> {
    /// `dependents` removes a client's visits before the client is deleted
    pub fn new(
        store: Arc<S>,
        dependents: Arc<dyn CascadeDelete>,
        page_size: usize,
        search_field: impl Into<String>,
    ) -> Result<Self> {
        let search_field = search_field.into();
        if !is_valid_field_name(&search_field) {
            return Err(Error::InvalidInput(format!(
                "invalid search field '{search_field}'"
            )));
        }

        Ok(Self {
            records: CollectionService::new(store, page_size)?,
            dependents,
            search: SearchState::new(),
            search_field,
        })
    }

    pub fn from_config(
        store: Arc<S>,
        dependents: Arc<dyn CascadeDelete>,
        config: &PetPalsConfig,
    ) -> Result<Self> {
        Self::new(
            store,
            dependents,
            config.clients_page_size,
            config.client_search_field.clone(),
        )
    }

    /// The underlying collection service
    pub const fn records(&self) -> &CollectionService<Client, S> {
        &self.records
    }

    pub const fn search_state(&self) -> &SearchState {
        &self.search
    }

    pub fn subscribe(&self) -> watch::Receiver<MirrorSnapshot<Client>> {
        self.records.subscribe()
    }

    pub fn snapshot(&self) -> MirrorSnapshot<Client> {
        self.records.snapshot()
    }

    pub async fn page_state(&self) -> PageState {
        self.records.page_state().await
    }

    /// Filter on the search field for the current term
    pub fn search_filter(&self) -> Option<Filter> {
        self.search.term().filter(&self.search_field)
    }

    /// Replace the search term and go back to the first matching page.
    ///
    /// If the page cannot be loaded the previous term is kept.
    pub async fn search(&self, term: &str) -> Result<PageOutcome> {
        let term = SearchTerm::new(term);
        let previous = self.search.term();
        if self.search.set_term(term.clone()) {
            tracing::debug!("Client search term changed to '{term}'");
        }

        let outcome = self.load_first_page().await;
        if outcome.is_err() {
            self.search.set_term(previous);
        }
        outcome
    }

    /// Reload the first page under the current search term
    pub async fn load_first_page(&self) -> Result<PageOutcome> {
        self.records.load_first_page(self.search_filter()).await
    }

    pub async fn load_next_page(&self) -> Result<PageOutcome> {
        self.records.load_next_page().await
    }

    pub async fn load_previous_page(&self) -> Result<PageOutcome> {
        self.records.load_previous_page().await
    }

    pub async fn get_by_id(&self, id: &RecordId) -> Result<Option<Client>> {
        self.records.get_by_id(id).await
    }

    pub async fn add(&self, client: Client) -> Result<Client> {
        self.records.add(client).await
    }

    pub async fn update(&self, client: Client) -> Result<()> {
        self.records.update(client).await
    }

    pub async fn update_fields(&self, id: &RecordId, fields: Fields) -> Result<()> {
        self.records.update_fields(id, fields).await
    }

    /// Delete the client's visits, then the client.
    ///
    /// If the visits cannot all be removed the client stays and the error is
    /// returned as [`Error::CascadeFailed`].
    pub async fn delete(&self, client: &Client) -> Result<()> {
        if client.id.is_empty() {
            return Err(Error::InvalidInput("client has no id".into()));
        }

        match self.dependents.delete_dependents(&client.id).await {
            Ok(count) => {
                tracing::info!("Deleted {count} visits of client {}", client.id);
            }
            Err(source) => {
                tracing::warn!(
                    "Keeping client {}: its visits could not be deleted: {source}",
                    client.id
                );
                return Err(Error::CascadeFailed {
                    parent: client.id.clone(),
                    source: Box::new(source),
                });
            }
        }

        self.records.delete(client).await
    }

    /// Create `count` placeholder clients
    pub async fn seed_dummy(&self, count: usize) -> Result<Vec<Client>> {
        let mut created = Vec::with_capacity(count);
        for index in 0..count {
            created.push(self.records.add(Client::dummy(index)).await?);
        }
        tracing::info!("Created {count} dummy clients");
        Ok(created)
    }

    /// Delete every placeholder client, visits included
    pub async fn purge_dummy(&self) -> Result<usize> {
        let dummies = self
            .records
            .find_all(Some(Filter::equal("petName", Client::DUMMY_PET_NAME)))
            .await?;
        for client in &dummies {
            self.delete(client).await?;
        }
        tracing::info!("Deleted {} dummy clients", dummies.len());
        Ok(dummies.len())
    }
}
