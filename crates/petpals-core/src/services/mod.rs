//! Collection services: the store, a page cursor and a mirror per record type.
//!
//! [`CollectionService`] carries the generic paging and write logic;
//! [`ClientsService`] and [`VisitsService`] add search, the client-to-visits
//! cascade and the batch operations of the list views.

mod clients;
mod collection;
mod visits;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::RecordId;

pub use clients::ClientsService;
pub use collection::CollectionService;
pub use visits::VisitsService;

/// Removes the records that depend on a parent before the parent goes away
#[async_trait]
pub trait CascadeDelete: Send + Sync {
    /// Delete every dependent of `parent`, all or nothing; returns how many
    async fn delete_dependents(&self, parent: &RecordId) -> Result<usize>;
}
