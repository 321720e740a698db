//! Search term handling for the clients list.
//!
//! Searching is a prefix match on one field, done by the store. A blank term
//! means "no filter".

use std::fmt;

use tokio::sync::watch;

use crate::store::Filter;

/// A trimmed search term
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchTerm(String);

impl SearchTerm {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Prefix filter on `field`, or `None` for a blank term
    pub fn filter(&self, field: &str) -> Option<Filter> {
        if self.is_empty() {
            None
        } else {
            Some(Filter::prefix(field, self.0.clone()))
        }
    }
}

impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SearchTerm {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The current search term, observable by front ends
#[derive(Debug)]
pub struct SearchState {
    sender: watch::Sender<SearchTerm>,
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchState {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(SearchTerm::default());
        Self { sender }
    }

    /// Store `term`; returns whether it differs from the previous one
    pub fn set_term(&self, term: SearchTerm) -> bool {
        self.sender.send_if_modified(|current| {
            if *current == term {
                false
            } else {
                *current = term;
                true
            }
        })
    }

    pub fn term(&self) -> SearchTerm {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchTerm> {
        self.sender.subscribe()
    }
}
