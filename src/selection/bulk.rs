use std::collections::BTreeMap;

use indicatif::ProgressBar;
use thiserror::Error;

use crate::fetcher::{total_pages, Artwork, FetchError, PageFetch};

/// "Select the first N rows starting from the page currently on screen."
/// Consumed by one [`accumulate`] call and discarded.
#[derive(Clone, Debug)]
pub struct BulkRequest<'a> {
    pub requested: usize,
    pub start_page: u32,
    /// Rows already loaded for `start_page`; the accumulation seed.
    pub current_rows: &'a [Artwork],
    pub total: u64,
    pub page_size: usize,
}

/// Staged result of a bulk selection. Nothing here has touched the ledger
/// yet, which is what makes the all-or-nothing failure rule cheap to keep.
#[derive(Clone, Debug)]
pub struct BulkOutcome {
    /// Page index -> rows to write, starting page included. Pages absent
    /// from this map keep whatever selection they had.
    pub staged: BTreeMap<u32, Vec<Artwork>>,
    /// The slice of the selection that lands on the starting page, i.e.
    /// what the view should show as checked.
    pub visible: Vec<Artwork>,
}

/// A fetch inside the accumulation loop failed; everything accumulated so
/// far has been discarded and the ledger is untouched.
#[derive(Debug, Error)]
#[error("bulk selection aborted while fetching page {page}: {source}")]
pub struct OperationFailed {
    pub page: u32,
    #[source]
    pub source: FetchError,
}

/// Accumulates rows page by page until `requested` rows are on hand or the
/// collection runs out, then partitions them back into per-page entries.
///
/// Fetches are strictly sequential: whether another page is needed depends
/// on the running count, and the freshest `total` seen decides whether one
/// even exists.
pub async fn accumulate(
    fetcher: &dyn PageFetch,
    request: BulkRequest<'_>,
    pb: &ProgressBar,
) -> Result<BulkOutcome, OperationFailed> {
    let BulkRequest {
        requested,
        start_page,
        current_rows,
        mut total,
        page_size,
    } = request;

    let mut accumulated: Vec<Artwork> = current_rows.to_vec();
    let mut cursor = start_page;

    pb.reset();
    while accumulated.len() < requested && cursor < total_pages(total, page_size) {
        cursor += 1;
        pb.set_message(format!("fetching page {cursor}"));
        match fetcher.fetch_page(cursor).await {
            Ok(page) => {
                total = page.total;
                accumulated.extend(page.records);
                pb.inc(1);
            }
            Err(source) => {
                pb.finish_and_clear();
                return Err(OperationFailed {
                    page: cursor,
                    source,
                });
            }
        }
    }
    pb.finish_and_clear();

    accumulated.truncate(requested.min(accumulated.len()));
    Ok(partition(
        accumulated,
        start_page,
        current_rows.len(),
        page_size,
    ))
}

/// Splits the final selection back into per-page entries: the starting page
/// takes the prefix that was on screen, every later page takes up to
/// `page_size` consecutive rows until the selection is exhausted.
fn partition(
    final_selection: Vec<Artwork>,
    start_page: u32,
    current_len: usize,
    page_size: usize,
) -> BulkOutcome {
    let head = current_len.min(final_selection.len());
    let visible: Vec<Artwork> = final_selection[..head].to_vec();

    let mut staged = BTreeMap::new();
    staged.insert(start_page, visible.clone());

    let rest = &final_selection[head..];
    if !rest.is_empty() {
        let mut page = start_page;
        for chunk in rest.chunks(page_size) {
            page += 1;
            staged.insert(page, chunk.to_vec());
        }
    }

    BulkOutcome { staged, visible }
}
