//! petpals-core - Core library for PetPals
//!
//! This crate contains the record models, the document store boundary, the
//! cursor-based page navigation, and the local mirror used by every PetPals
//! front end.

pub mod config;
pub mod error;
pub mod export;
pub mod mirror;
pub mod models;
pub mod pagination;
pub mod search;
pub mod selection;
pub mod services;
pub mod store;
pub mod util;

pub use error::{Error, Result};
pub use models::{Client, Record, RecordId, Visit};
