//! Cursor-based page navigation over an ordered collection.
//!
//! The store only supports cursor-relative queries, so going back a page
//! needs the cursor to remember where every visited page started. A stack of
//! page-start markers does that: a forward load pushes the new page's first
//! marker, a backward load pops it and restarts from the entry below.
//!
//! Loading is split into `plan_*` (build the query, issue a ticket) and
//! [`PageCursor::apply`] (accept the result). Only the most recently issued
//! ticket is accepted, so a slow response can never overwrite a newer one.

use crate::error::{Error, Result};
use crate::store::{CursorMarker, Filter, OrderBy, Query, StoredDocument};

/// Direction of a page load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMove {
    First,
    Next,
    Previous,
}

/// Position and navigation flags of the current window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageState {
    /// Zero-based index of the page on screen
    pub position: usize,
    pub can_go_next: bool,
    pub can_go_previous: bool,
}

/// What a page load did to the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Window replaced with `len` records
    Loaded { len: usize },
    /// First page came back empty; the window is now empty
    NoData,
    /// Nothing to move to; the window is unchanged
    Unchanged,
    /// A newer request was issued before this one resolved; result dropped
    Superseded,
}

/// A planned page load waiting for its store round trip
#[derive(Debug, Clone)]
pub struct PageRequest {
    ticket: u64,
    movement: PageMove,
    query: Query,
}

impl PageRequest {
    pub const fn query(&self) -> &Query {
        &self.query
    }

    pub const fn movement(&self) -> PageMove {
        self.movement
    }
}

/// Result of [`PageCursor::apply`]: the outcome plus the documents now on screen
#[derive(Debug)]
pub struct Applied {
    pub outcome: PageOutcome,
    pub window: Vec<StoredDocument>,
}

impl Applied {
    const fn without_window(outcome: PageOutcome) -> Self {
        Self {
            outcome,
            window: Vec::new(),
        }
    }
}

/// Window bookkeeping replaced by a reset, put back if the reset fails
#[derive(Debug, Clone)]
struct Anchor {
    filter: Option<Filter>,
    first: Option<CursorMarker>,
    last: Option<CursorMarker>,
    history: Vec<CursorMarker>,
    position: usize,
    can_go_next: bool,
}

/// Pagination bookkeeping for one page window
#[derive(Debug, Clone)]
pub struct PageCursor {
    collection: String,
    order: OrderBy,
    page_size: usize,
    filter: Option<Filter>,
    first: Option<CursorMarker>,
    last: Option<CursorMarker>,
    history: Vec<CursorMarker>,
    position: usize,
    can_go_next: bool,
    next_ticket: u64,
    pending: Option<u64>,
    rollback: Option<Anchor>,
}

impl PageCursor {
    pub fn new(collection: impl Into<String>, order: OrderBy, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::InvalidInput("page size must be at least 1".into()));
        }

        Ok(Self {
            collection: collection.into(),
            order,
            page_size,
            filter: None,
            first: None,
            last: None,
            history: Vec::new(),
            position: 0,
            can_go_next: false,
            next_ticket: 0,
            pending: None,
            rollback: None,
        })
    }

    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    pub const fn order(&self) -> &OrderBy {
        &self.order
    }

    pub const fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub const fn state(&self) -> PageState {
        PageState {
            position: self.position,
            can_go_next: self.can_go_next,
            can_go_previous: self.position > 0,
        }
    }

    /// Whether a planned load has not been applied or abandoned yet
    pub const fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of page-start markers remembered for backward navigation
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Marker for `document` under this cursor's ordering
    pub fn marker_for(&self, document: &StoredDocument) -> CursorMarker {
        CursorMarker::at(document, &self.order)
    }

    /// Query for every record matching the active filter, without bounds
    pub fn base_query(&self) -> Query {
        Query::collection(self.collection.clone())
            .filters(self.filter.clone())
            .order_by(self.order.clone())
    }

    /// Start over from the first page under `filter`.
    ///
    /// Markers taken under the previous filter are dropped immediately; they
    /// mean nothing once the filter changes. [`PageCursor::abandon`] puts the
    /// window that was on screen back if the load fails.
    pub fn plan_first(&mut self, filter: Option<Filter>) -> PageRequest {
        let replaced = Anchor {
            filter: std::mem::replace(&mut self.filter, filter),
            first: self.first.take(),
            last: self.last.take(),
            history: std::mem::take(&mut self.history),
            position: std::mem::take(&mut self.position),
            can_go_next: std::mem::take(&mut self.can_go_next),
        };
        // An unresolved reset already holds the window still on screen.
        if self.rollback.is_none() {
            self.rollback = Some(replaced);
        }

        let query = self.base_query().limit(self.page_size + 1);
        self.issue(PageMove::First, query)
    }

    /// Plan the page after the current one, if there is one
    pub fn plan_next(&mut self) -> Option<PageRequest> {
        if !self.can_go_next {
            return None;
        }
        let last = self.last.clone()?;

        let query = self.base_query().start_after(last).limit(self.page_size + 1);
        Some(self.issue(PageMove::Next, query))
    }

    /// Plan the page before the current one, if there is one
    pub fn plan_previous(&mut self) -> Option<PageRequest> {
        if self.position == 0 {
            return None;
        }
        let first = self.first.clone()?;

        let mut query = self.base_query().end_before(first).limit(self.page_size);
        // The top entry starts the current page; the one below starts the previous page.
        // Without it, read from the start of the collection.
        let previous_start = self
            .history
            .len()
            .checked_sub(2)
            .and_then(|index| self.history.get(index));
        if let Some(start) = previous_start {
            query = query.start_at(start.clone());
        }

        Some(self.issue(PageMove::Previous, query))
    }

    fn issue(&mut self, movement: PageMove, query: Query) -> PageRequest {
        self.next_ticket += 1;
        if let Some(stale) = self.pending.replace(self.next_ticket) {
            tracing::debug!(
                "{} page request {} superseded by {}",
                self.collection,
                stale,
                self.next_ticket
            );
        }

        PageRequest {
            ticket: self.next_ticket,
            movement,
            query,
        }
    }

    /// Forget a request whose store round trip failed.
    ///
    /// A failed reset restores the filter, markers and position it replaced.
    pub fn abandon(&mut self, request: &PageRequest) {
        if self.pending != Some(request.ticket) {
            return;
        }
        self.pending = None;

        if let Some(anchor) = self.rollback.take() {
            tracing::debug!(
                "Restoring {} page {} after failed reset",
                self.collection,
                anchor.position
            );
            self.filter = anchor.filter;
            self.first = anchor.first;
            self.last = anchor.last;
            self.history = anchor.history;
            self.position = anchor.position;
            self.can_go_next = anchor.can_go_next;
        }
    }

    /// Accept the documents returned for `request`
    pub fn apply(&mut self, request: &PageRequest, mut documents: Vec<StoredDocument>) -> Applied {
        if self.pending != Some(request.ticket) {
            tracing::debug!(
                "Discarding stale {} page response (ticket {})",
                self.collection,
                request.ticket
            );
            return Applied::without_window(PageOutcome::Superseded);
        }
        self.pending = None;
        self.rollback = None;

        let has_more = documents.len() > self.page_size;
        documents.truncate(self.page_size);

        match request.movement {
            PageMove::First => {
                if documents.is_empty() {
                    tracing::debug!("No {} data available", self.collection);
                    return Applied::without_window(PageOutcome::NoData);
                }
                self.bind_window(&documents);
                self.history = self.first.iter().cloned().collect();
                self.can_go_next = has_more;
            }
            PageMove::Next => {
                if documents.is_empty() {
                    self.can_go_next = false;
                    return Applied::without_window(PageOutcome::Unchanged);
                }
                self.bind_window(&documents);
                self.position += 1;
                if let Some(first) = &self.first {
                    if self.history.last() != Some(first) {
                        self.history.push(first.clone());
                    }
                }
                self.can_go_next = has_more;
            }
            PageMove::Previous => {
                if documents.is_empty() {
                    return Applied::without_window(PageOutcome::Unchanged);
                }
                self.history.pop();
                self.position = self.position.saturating_sub(1);
                self.bind_window(&documents);
                self.replace_history_top();
                self.can_go_next = true;
            }
        }

        tracing::debug!(
            "{} page {} loaded ({} records, next: {})",
            self.collection,
            self.position,
            documents.len(),
            self.can_go_next
        );
        Applied {
            outcome: PageOutcome::Loaded {
                len: documents.len(),
            },
            window: documents,
        }
    }

    /// Whether `document` sorts between this window's start and the next page
    pub fn covers(&self, document: &StoredDocument) -> bool {
        let after_start = self.position == 0
            || self
                .first
                .as_ref()
                .is_some_and(|first| self.order.compare_to_marker(document, first).is_ge());
        let before_end = !self.can_go_next
            || self
                .last
                .as_ref()
                .is_some_and(|last| self.order.compare_to_marker(document, last).is_lt());
        after_start && before_end
    }

    /// Re-anchor the window after local edits changed its first or last record
    pub fn rebind(&mut self, first: Option<CursorMarker>, last: Option<CursorMarker>) {
        if first.is_some() {
            self.first = first;
            self.replace_history_top();
        }
        if last.is_some() {
            self.last = last;
        }
    }

    /// Note that records exist past the current window
    pub fn mark_more_available(&mut self) {
        if self.last.is_some() {
            self.can_go_next = true;
        }
    }

    fn bind_window(&mut self, documents: &[StoredDocument]) {
        self.first = documents.first().map(|document| self.marker_for(document));
        self.last = documents.last().map(|document| self.marker_for(document));
    }

    fn replace_history_top(&mut self) {
        let Some(first) = self.first.clone() else {
            return;
        };
        match self.history.last_mut() {
            Some(top) => *top = first,
            None => self.history.push(first),
        }
    }
}
