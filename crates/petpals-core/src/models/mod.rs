//! Data models for PetPals

mod client;
mod record;
mod visit;

pub use client::Client;
pub use record::{Record, RecordId};
pub use visit::Visit;
