use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use indicatif::ProgressBar;

use crate::fetcher::{Artwork, FetchError, Page, PageFetch, PAGE_SIZE};
use crate::session::{Event, SessionError, TableSession};

fn artwork(id: u64) -> Artwork {
    Artwork {
        id,
        title: format!("Untitled #{id}"),
        place_of_origin: "Chicago".to_string(),
        artist_display: "Unknown artist".to_string(),
        date_start: Some(1900),
        date_end: Some(1910),
    }
}

fn ids(rows: &[Artwork]) -> Vec<u64> {
    rows.iter().map(|a| a.id).collect()
}

/// Canned collection of sequentially numbered artworks, 12 to a page, with
/// an optional page that always fails. Records which pages were requested.
struct FakeCollection {
    total: u64,
    fail_on: Option<u32>,
    fetched: Mutex<Vec<u32>>,
}

impl FakeCollection {
    fn new(total: u64) -> Arc<Self> {
        Arc::new(Self {
            total,
            fail_on: None,
            fetched: Mutex::new(Vec::new()),
        })
    }

    fn failing_on(total: u64, page: u32) -> Arc<Self> {
        Arc::new(Self {
            total,
            fail_on: Some(page),
            fetched: Mutex::new(Vec::new()),
        })
    }

    fn fetched_pages(&self) -> Vec<u32> {
        self.fetched.lock().unwrap().clone()
    }

    fn rows_for_page(&self, page: u32) -> Vec<Artwork> {
        let start = (page as u64 - 1) * PAGE_SIZE as u64 + 1;
        if start > self.total {
            return Vec::new();
        }
        let end = (start + PAGE_SIZE as u64 - 1).min(self.total);
        (start..=end).map(artwork).collect()
    }

    fn respond(&self, page: u32) -> Result<Page, FetchError> {
        self.fetched.lock().unwrap().push(page);
        if self.fail_on == Some(page) {
            return Err(FetchError::MalformedResponse {
                page,
                reason: "truncated body".to_string(),
            });
        }
        Ok(Page {
            index: page,
            records: self.rows_for_page(page),
            total: self.total,
            page_size: PAGE_SIZE,
        })
    }
}

impl PageFetch for Arc<FakeCollection> {
    fn fetch_page(&self, page: u32) -> BoxFuture<'_, Result<Page, FetchError>> {
        Box::pin(async move { self.respond(page) })
    }
}

async fn open_session(fake: &Arc<FakeCollection>, start_page: u32) -> TableSession {
    TableSession::open(Box::new(fake.clone()), start_page, ProgressBar::hidden())
        .await
        .unwrap()
}

#[tokio::test]
async fn full_page_request_needs_no_extra_fetch() {
    let fake = FakeCollection::new(30);
    let mut session = open_session(&fake, 1).await;

    session.apply(Event::BulkSelectRequested(12)).await.unwrap();

    assert_eq!(fake.fetched_pages(), vec![1]);
    assert_eq!(
        ids(session.ledger().page_selection(1)),
        (1..=12).collect::<Vec<u64>>()
    );
    assert_eq!(session.visible_selection().len(), 12);
}

#[tokio::test]
async fn overflow_request_fetches_one_more_page() {
    let fake = FakeCollection::new(30);
    let mut session = open_session(&fake, 1).await;

    session.apply(Event::BulkSelectRequested(20)).await.unwrap();

    assert_eq!(fake.fetched_pages(), vec![1, 2]);
    assert_eq!(session.ledger().page_selection(1).len(), 12);
    assert_eq!(
        ids(session.ledger().page_selection(2)),
        (13..=20).collect::<Vec<u64>>()
    );
}

#[tokio::test]
async fn whole_collection_request_stops_at_the_last_page() {
    let fake = FakeCollection::new(30);
    let mut session = open_session(&fake, 1).await;

    session.apply(Event::BulkSelectRequested(30)).await.unwrap();

    assert_eq!(fake.fetched_pages(), vec![1, 2, 3]);
    assert_eq!(session.ledger().page_selection(1).len(), 12);
    assert_eq!(session.ledger().page_selection(2).len(), 12);
    assert_eq!(
        ids(session.ledger().page_selection(3)),
        (25..=30).collect::<Vec<u64>>()
    );
}

#[tokio::test]
async fn oversized_request_selects_exactly_the_collection() {
    let fake = FakeCollection::new(30);
    let mut session = open_session(&fake, 1).await;

    session.apply(Event::BulkSelectRequested(100)).await.unwrap();

    assert_eq!(session.selected_count(), 30);
    // Pages 1-3 exist; nothing past the collection end is requested.
    assert_eq!(fake.fetched_pages(), vec![1, 2, 3]);
}

#[tokio::test]
async fn select_zero_clears_only_the_current_page() {
    let fake = FakeCollection::new(30);
    let mut session = open_session(&fake, 1).await;

    let picks = session.rows()[..2].to_vec();
    session.apply(Event::SelectionEdited(picks)).await.unwrap();
    session.apply(Event::PageChanged(2)).await.unwrap();
    let picks = session.rows()[..3].to_vec();
    session.apply(Event::SelectionEdited(picks)).await.unwrap();

    session.apply(Event::BulkSelectRequested(0)).await.unwrap();

    assert!(session.ledger().page_selection(2).is_empty());
    assert_eq!(session.ledger().page_selection(1).len(), 2);
    assert!(session.visible_selection().is_empty());
}

#[tokio::test]
async fn repeating_a_bulk_request_is_idempotent() {
    let fake = FakeCollection::new(30);
    let mut session = open_session(&fake, 1).await;

    session.apply(Event::BulkSelectRequested(20)).await.unwrap();
    let first = session.ledger().clone();
    session.apply(Event::BulkSelectRequested(20)).await.unwrap();

    assert_eq!(session.ledger(), &first);
}

#[tokio::test]
async fn manual_picks_survive_a_round_trip() {
    let fake = FakeCollection::new(48);
    let mut session = open_session(&fake, 2).await;

    let picks: Vec<Artwork> = session.rows().iter().take(3).cloned().collect();
    session
        .apply(Event::SelectionEdited(picks.clone()))
        .await
        .unwrap();

    session.apply(Event::PageChanged(3)).await.unwrap();
    assert!(session.visible_selection().is_empty());

    session.apply(Event::PageChanged(2)).await.unwrap();
    assert_eq!(session.visible_selection(), picks.as_slice());
    assert_eq!(session.ledger().page_selection(2), picks.as_slice());
}

#[tokio::test]
async fn failed_accumulation_rolls_the_ledger_back() {
    let fake = FakeCollection::failing_on(30, 2);
    let mut session = open_session(&fake, 1).await;

    let picks = session.rows()[..2].to_vec();
    session
        .apply(Event::SelectionEdited(picks.clone()))
        .await
        .unwrap();
    let before = session.ledger().clone();

    let err = session
        .apply(Event::BulkSelectRequested(20))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::BulkSelect(_)));
    assert_eq!(session.ledger(), &before);
    assert_eq!(session.visible_selection(), picks.as_slice());
    assert!(session.last_error().is_some());
}

#[tokio::test]
async fn ledger_entries_are_subsets_of_their_pages() {
    let fake = FakeCollection::new(30);
    let mut session = open_session(&fake, 1).await;

    session.apply(Event::BulkSelectRequested(20)).await.unwrap();

    for page in session.ledger().pages().collect::<Vec<_>>() {
        let page_ids = ids(&fake.rows_for_page(page));
        for row in session.ledger().page_selection(page) {
            assert!(page_ids.contains(&row.id));
        }
    }
}

#[tokio::test]
async fn failed_navigation_keeps_the_previous_page() {
    let fake = FakeCollection::failing_on(30, 2);
    let mut session = open_session(&fake, 1).await;

    let err = session.apply(Event::PageChanged(2)).await.unwrap_err();

    assert!(matches!(err, SessionError::PageLoad { page: 2, .. }));
    assert_eq!(session.page(), 1);
    assert_eq!(session.rows().len(), 12);
    assert!(session.last_error().is_some());
}

#[tokio::test]
async fn manual_edits_land_under_the_current_page_key() {
    let fake = FakeCollection::new(30);
    let mut session = open_session(&fake, 3).await;

    let picks = session.rows()[..1].to_vec();
    session
        .apply(Event::SelectionEdited(picks.clone()))
        .await
        .unwrap();

    assert_eq!(session.ledger().page_selection(3), picks.as_slice());
    assert_eq!(session.ledger().pages().collect::<Vec<_>>(), vec![3]);
}

#[tokio::test]
async fn bulk_from_a_middle_page_counts_forward_only() {
    let fake = FakeCollection::new(48);
    let mut session = open_session(&fake, 2).await;

    session.apply(Event::BulkSelectRequested(20)).await.unwrap();

    assert_eq!(
        ids(session.ledger().page_selection(2)),
        (13..=24).collect::<Vec<u64>>()
    );
    assert_eq!(
        ids(session.ledger().page_selection(3)),
        (25..=32).collect::<Vec<u64>>()
    );
    assert!(session.ledger().page_selection(1).is_empty());
}

#[tokio::test]
async fn bulk_leaves_untouched_pages_alone() {
    let fake = FakeCollection::new(48);
    let mut session = open_session(&fake, 1).await;

    let picks = session.rows()[..2].to_vec();
    session
        .apply(Event::SelectionEdited(picks.clone()))
        .await
        .unwrap();
    session.apply(Event::PageChanged(2)).await.unwrap();

    session.apply(Event::BulkSelectRequested(12)).await.unwrap();

    assert_eq!(session.ledger().page_selection(1), picks.as_slice());
    assert_eq!(session.ledger().page_selection(2).len(), 12);
}
