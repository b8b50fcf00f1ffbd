//! Server-paginated list state: page cursor, sequenced refetches and the
//! render model derived from the last applied response.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use shared::protocol::{PaginatedResult, PaginationState};
use thiserror::Error;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::mount_guard::MountGuard;

pub const EMPTY_LIST_MESSAGE: &str = "No entry found.";
pub const FETCH_FAILED_MESSAGE: &str = "Something wrong has happened.";

/// Network seam for one collection endpoint.
#[async_trait]
pub trait CollectionSource<T>: Send + Sync {
    async fn fetch_page(&self, state: PaginationState) -> Result<PaginatedResult<T>>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("page must be a positive integer, got {0}")]
    InvalidPage(u32),
    #[error("there is no previous page")]
    NoPreviousPage,
    #[error("there is no next page")]
    NoNextPage,
}

/// A fetch the controller wants performed. `seq` increases monotonically per
/// controller; responses are applied only when newer than the last one applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub state: PaginationState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Navigation {
    pub has_previous: bool,
    pub has_next: bool,
}

/// Previous/next availability for a response. An empty page, `pages <= 1`, or
/// a `page` outside `[1, pages]` disables the corresponding control.
pub fn derive<T>(result: &PaginatedResult<T>) -> Navigation {
    if result.docs.is_empty() {
        return Navigation::default();
    }
    Navigation {
        has_previous: result.page > 1 && result.page <= result.pages,
        has_next: result.page >= 1 && result.page < result.pages,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListView<T> {
    Idle,
    Loading,
    Loaded { result: PaginatedResult<T> },
    Empty { result: PaginatedResult<T> },
    Failed { reason: String },
}

impl<T> ListView<T> {
    pub fn result(&self) -> Option<&PaginatedResult<T>> {
        match self {
            Self::Loaded { result } | Self::Empty { result } => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spinner {
    None,
    /// Nothing has been displayed yet.
    FullPage,
    /// Stale data stays on screen while a newer request is outstanding.
    Button,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Discarded,
}

/// Everything a list card needs to draw itself.
#[derive(Debug)]
pub struct ListPresentation<'a, T> {
    pub spinner: Spinner,
    pub rows: &'a [T],
    pub empty_message: Option<&'static str>,
    pub error_message: Option<&'static str>,
    pub show_previous: bool,
    pub show_next: bool,
    /// `(page, pages)` of the displayed response.
    pub position: Option<(u32, u32)>,
}

pub struct PaginationController<T> {
    state: PaginationState,
    guard: MountGuard,
    view: ListView<T>,
    issued_seq: u64,
    applied_seq: u64,
}

impl<T> PaginationController<T> {
    pub fn new(limit: u32) -> Self {
        Self::with_state(PaginationState::new(1, limit))
    }

    /// Starts from an explicit cursor. A zero page or limit is raised to 1.
    pub fn with_state(state: PaginationState) -> Self {
        Self {
            state: PaginationState::new(state.page.max(1), state.limit.max(1)),
            guard: MountGuard::new(),
            view: ListView::Idle,
            issued_seq: 0,
            applied_seq: 0,
        }
    }

    pub fn state(&self) -> PaginationState {
        self.state
    }

    pub fn view(&self) -> &ListView<T> {
        &self.view
    }

    pub fn mounted(&self) -> bool {
        self.guard.mounted()
    }

    /// A request newer than the displayed response is still outstanding.
    pub fn is_fetching(&self) -> bool {
        self.issued_seq > self.applied_seq
    }

    /// Outstanding request with nothing on screen yet.
    pub fn is_loading(&self) -> bool {
        self.is_fetching() && self.view.result().is_none()
    }

    pub fn navigation(&self) -> Navigation {
        self.view.result().map(derive).unwrap_or_default()
    }

    /// First render commit. Issues the initial fetch; the page-change effect
    /// is suppressed because the initial fetch already covers the current page.
    pub fn mount(&mut self) -> Option<FetchTicket> {
        if self.guard.mounted() {
            return None;
        }
        let ticket = self.issue();
        self.guard.flush();
        debug!(seq = ticket.seq, page = ticket.state.page, "list mounted");
        Some(ticket)
    }

    pub fn set_page(&mut self, page: u32) -> Result<Option<FetchTicket>, PaginationError> {
        if page == 0 {
            return Err(PaginationError::InvalidPage(page));
        }
        self.state = self.state.with_page(page);
        Ok(self.page_changed())
    }

    pub fn next_page(&mut self) -> Result<Option<FetchTicket>, PaginationError> {
        let current = self.view.result().map(|result| (result.page, derive(result)));
        match current {
            Some((page, nav)) if nav.has_next => self.set_page(page + 1),
            _ => Err(PaginationError::NoNextPage),
        }
    }

    pub fn previous_page(&mut self) -> Result<Option<FetchTicket>, PaginationError> {
        let current = self.view.result().map(|result| (result.page, derive(result)));
        match current {
            Some((page, nav)) if nav.has_previous => self.set_page(page - 1),
            _ => Err(PaginationError::NoPreviousPage),
        }
    }

    /// Manual refetch of the current page, e.g. a retry after a failure.
    pub fn refetch(&mut self) -> Option<FetchTicket> {
        self.guard.mounted().then(|| self.issue())
    }

    pub fn apply(
        &mut self,
        ticket: FetchTicket,
        outcome: Result<PaginatedResult<T>>,
    ) -> ApplyOutcome {
        if ticket.seq <= self.applied_seq {
            debug!(
                seq = ticket.seq,
                applied_seq = self.applied_seq,
                page = ticket.state.page,
                "discarding superseded list response"
            );
            return ApplyOutcome::Discarded;
        }
        self.applied_seq = ticket.seq;
        self.view = match outcome {
            Ok(result) if result.docs.is_empty() => ListView::Empty { result },
            Ok(result) => {
                info!(
                    seq = ticket.seq,
                    page = result.page,
                    pages = result.pages,
                    "list page applied"
                );
                ListView::Loaded { result }
            }
            Err(err) => {
                warn!(seq = ticket.seq, page = ticket.state.page, "list fetch failed: {err:#}");
                ListView::Failed {
                    reason: format!("{err:#}"),
                }
            }
        };
        ApplyOutcome::Applied
    }

    pub fn presentation(&self) -> ListPresentation<'_, T> {
        let spinner = if self.is_loading() {
            Spinner::FullPage
        } else if self.is_fetching() {
            Spinner::Button
        } else {
            Spinner::None
        };
        let nav = self.navigation();
        let (rows, empty_message, error_message, position) = match &self.view {
            ListView::Loaded { result } => (
                result.docs.as_slice(),
                None,
                None,
                Some((result.page, result.pages)),
            ),
            ListView::Empty { result } => (
                result.docs.as_slice(),
                Some(EMPTY_LIST_MESSAGE),
                None,
                Some((result.page, result.pages)),
            ),
            ListView::Failed { .. } => (&[][..], None, Some(FETCH_FAILED_MESSAGE), None),
            ListView::Idle | ListView::Loading => (&[][..], None, None, None),
        };
        ListPresentation {
            spinner,
            rows,
            empty_message,
            error_message,
            show_previous: nav.has_previous,
            show_next: nav.has_next,
            position,
        }
    }

    fn page_changed(&mut self) -> Option<FetchTicket> {
        if !self.guard.mounted() {
            debug!(page = self.state.page, "page change before mount, initial fetch covers it");
            return None;
        }
        Some(self.issue())
    }

    fn issue(&mut self) -> FetchTicket {
        self.issued_seq += 1;
        if matches!(self.view, ListView::Idle | ListView::Failed { .. }) {
            self.view = ListView::Loading;
        }
        FetchTicket {
            seq: self.issued_seq,
            state: self.state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    Applied { seq: u64, page: u32 },
    Discarded { seq: u64, page: u32 },
    Failed { seq: u64, reason: String },
}

/// Async driver: performs each ticket's fetch on its own task and applies the
/// response back into the shared controller.
pub struct PaginatedList<T, S> {
    controller: Arc<Mutex<PaginationController<T>>>,
    source: Arc<S>,
    events: broadcast::Sender<ListEvent>,
}

impl<T, S> PaginatedList<T, S>
where
    T: Send + 'static,
    S: CollectionSource<T> + 'static,
{
    pub fn new(source: Arc<S>, limit: u32) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            controller: Arc::new(Mutex::new(PaginationController::new(limit))),
            source,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent> {
        self.events.subscribe()
    }

    pub fn controller(&self) -> Arc<Mutex<PaginationController<T>>> {
        Arc::clone(&self.controller)
    }

    pub async fn mount(&self) -> Option<JoinHandle<()>> {
        let ticket = self.controller.lock().await.mount()?;
        Some(self.dispatch(ticket))
    }

    pub async fn set_page(&self, page: u32) -> Result<Option<JoinHandle<()>>, PaginationError> {
        let ticket = self.controller.lock().await.set_page(page)?;
        Ok(ticket.map(|ticket| self.dispatch(ticket)))
    }

    pub async fn next_page(&self) -> Result<Option<JoinHandle<()>>, PaginationError> {
        let ticket = self.controller.lock().await.next_page()?;
        Ok(ticket.map(|ticket| self.dispatch(ticket)))
    }

    pub async fn previous_page(&self) -> Result<Option<JoinHandle<()>>, PaginationError> {
        let ticket = self.controller.lock().await.previous_page()?;
        Ok(ticket.map(|ticket| self.dispatch(ticket)))
    }

    pub async fn refetch(&self) -> Option<JoinHandle<()>> {
        let ticket = self.controller.lock().await.refetch()?;
        Some(self.dispatch(ticket))
    }

    /// Runs `f` against the controller while holding its lock.
    pub async fn with_view<R>(&self, f: impl FnOnce(&PaginationController<T>) -> R) -> R {
        let guard = self.controller.lock().await;
        f(&guard)
    }

    fn dispatch(&self, ticket: FetchTicket) -> JoinHandle<()> {
        let controller = Arc::clone(&self.controller);
        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = source.fetch_page(ticket.state).await;
            let failure = outcome.as_ref().err().map(|err| format!("{err:#}"));
            let applied = controller.lock().await.apply(ticket, outcome);
            let event = match (applied, failure) {
                (ApplyOutcome::Discarded, _) => ListEvent::Discarded {
                    seq: ticket.seq,
                    page: ticket.state.page,
                },
                (ApplyOutcome::Applied, Some(reason)) => ListEvent::Failed {
                    seq: ticket.seq,
                    reason,
                },
                (ApplyOutcome::Applied, None) => ListEvent::Applied {
                    seq: ticket.seq,
                    page: ticket.state.page,
                },
            };
            let _ = events.send(event);
        })
    }
}

#[cfg(test)]
#[path = "tests/pagination_tests.rs"]
mod tests;
