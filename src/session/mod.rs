use indicatif::ProgressBar;
use thiserror::Error;

use crate::fetcher::{total_pages, Artwork, FetchError, PageFetch, PAGE_SIZE};
use crate::selection::bulk::{self, BulkRequest, OperationFailed};
use crate::selection::SelectionLedger;

/// Everything the view binding can ask the table to do. One variant per
/// user-visible interaction, one transition function per variant, so the
/// whole flow is unit-testable without anything rendered.
#[derive(Clone, Debug)]
pub enum Event {
    /// The user paginated to another page.
    PageChanged(u32),
    /// The user toggled checkboxes by hand; the new set replaces the current
    /// page's ledger entry outright.
    SelectionEdited(Vec<Artwork>),
    /// The user asked for the first N rows of the collection counted from
    /// the current page onward.
    BulkSelectRequested(usize),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("page {page} failed to load: {source}")]
    PageLoad {
        page: u32,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    BulkSelect(#[from] OperationFailed),
}

/// State behind one table view: the displayed page, the selection ledger,
/// and the in-flight flag. All mutation funnels through [`TableSession::apply`].
pub struct TableSession {
    fetcher: Box<dyn PageFetch>,
    pb: ProgressBar,
    page: u32,
    rows: Vec<Artwork>,
    total: u64,
    page_size: usize,
    loading: bool,
    ledger: SelectionLedger,
    visible: Vec<Artwork>,
    last_error: Option<String>,
}

impl TableSession {
    /// Loads `start_page` and returns the session showing it. The progress
    /// bar is only touched during bulk accumulation; pass a hidden one when
    /// nothing should be drawn.
    pub async fn open(
        fetcher: Box<dyn PageFetch>,
        start_page: u32,
        pb: ProgressBar,
    ) -> Result<Self, SessionError> {
        let mut session = Self {
            fetcher,
            pb,
            page: start_page,
            rows: Vec::new(),
            total: 0,
            page_size: PAGE_SIZE,
            loading: false,
            ledger: SelectionLedger::new(),
            visible: Vec::new(),
            last_error: None,
        };
        session.load_page(start_page).await?;
        Ok(session)
    }

    pub async fn apply(&mut self, event: Event) -> Result<(), SessionError> {
        match event {
            Event::PageChanged(page) => {
                if self.loading {
                    return Ok(());
                }
                self.load_page(page).await
            }
            Event::SelectionEdited(records) => {
                self.visible = records.clone();
                self.ledger.set_page_selection(self.page, records);
                Ok(())
            }
            Event::BulkSelectRequested(requested) => {
                if self.loading {
                    return Ok(());
                }
                self.bulk_select(requested).await
            }
        }
    }

    /// Swaps the displayed page. On failure the previous page stays on
    /// screen untouched and the error is kept for the view to surface.
    async fn load_page(&mut self, page: u32) -> Result<(), SessionError> {
        self.loading = true;
        let fetched = self.fetcher.fetch_page(page).await;
        self.loading = false;

        match fetched {
            Ok(fetched) => {
                self.page = fetched.index;
                self.rows = fetched.records;
                self.total = fetched.total;
                self.page_size = fetched.page_size;
                self.visible = self.ledger.page_selection(self.page).to_vec();
                self.last_error = None;
                Ok(())
            }
            Err(source) => {
                self.last_error = Some(source.to_string());
                Err(SessionError::PageLoad { page, source })
            }
        }
    }

    /// Runs the accumulation loop, then commits the staged entries in one
    /// go. A failed run changes nothing: the ledger and the checked rows
    /// read exactly as they did before the request.
    async fn bulk_select(&mut self, requested: usize) -> Result<(), SessionError> {
        self.loading = true;
        let request = BulkRequest {
            requested,
            start_page: self.page,
            current_rows: &self.rows,
            total: self.total,
            page_size: self.page_size,
        };
        let outcome = bulk::accumulate(self.fetcher.as_ref(), request, &self.pb).await;
        self.loading = false;

        match outcome {
            Ok(outcome) => {
                for (page, records) in outcome.staged {
                    self.ledger.set_page_selection(page, records);
                }
                self.visible = outcome.visible;
                self.last_error = None;
                Ok(())
            }
            Err(failed) => {
                self.last_error = Some(failed.to_string());
                Err(failed.into())
            }
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn rows(&self) -> &[Artwork] {
        &self.rows
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn total_pages(&self) -> u32 {
        total_pages(self.total, self.page_size)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Rows shown as checked on the displayed page.
    pub fn visible_selection(&self) -> &[Artwork] {
        &self.visible
    }

    pub fn ledger(&self) -> &SelectionLedger {
        &self.ledger
    }

    pub fn selected_count(&self) -> usize {
        self.ledger.selected_count()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
