use std::num::NonZeroU32;
use std::time::Duration;

use futures::future::BoxFuture;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rows per page served by the collection API. Fixed on the server side;
/// the client never negotiates it.
pub const PAGE_SIZE: usize = 12;

pub const DEFAULT_ENDPOINT: &str = "https://api.artic.edu/api/v1/artworks";

/// One artwork row as displayed. Never mutated after the fetch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Artwork {
    pub id: u64,
    pub title: String,
    pub place_of_origin: String,
    pub artist_display: String,
    pub date_start: Option<i32>,
    pub date_end: Option<i32>,
}

/// One fetched batch of rows plus the collection's pagination metadata.
#[derive(Clone, Debug)]
pub struct Page {
    pub index: u32,
    pub records: Vec<Artwork>,
    pub total: u64,
    pub page_size: usize,
}

impl Page {
    pub fn total_pages(&self) -> u32 {
        total_pages(self.total, self.page_size)
    }
}

pub fn total_pages(total: u64, page_size: usize) -> u32 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size as u64) as u32
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for page {page} failed: {source}")]
    Network {
        page: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed response for page {page}: {reason}")]
    MalformedResponse { page: u32, reason: String },
}

/// Page-fetch capability. The session and the bulk selector only ever see
/// this trait, so tests drive them with canned pages instead of a server.
pub trait PageFetch: Send + Sync {
    fn fetch_page(&self, page: u32) -> BoxFuture<'_, Result<Page, FetchError>>;
}

#[derive(Clone, Debug)]
pub struct HttpFetcherOptions {
    pub endpoint: String,
    pub rate: u32,
    pub timeout_seconds: usize,
    pub proxy: Option<String>,
}

impl Default for HttpFetcherOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            rate: 5,
            timeout_seconds: 10,
            proxy: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetcherBuildError {
    #[error("invalid rate {value}, expected positive requests per second")]
    InvalidRate { value: u32 },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },
}

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Fetcher backed by the public collection API. One `GET {endpoint}?page=N`
/// per call; no retries and no caching, so a repeated page index re-fetches.
pub struct HttpPageFetcher {
    client: reqwest::Client,
    endpoint: String,
    limiter: DirectRateLimiter,
    page_size: usize,
}

impl HttpPageFetcher {
    pub fn new(options: HttpFetcherOptions) -> Result<Self, FetcherBuildError> {
        let rate = NonZeroU32::new(options.rate)
            .ok_or(FetcherBuildError::InvalidRate { value: options.rate })?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(concat!(
                "artdeck/",
                env!("CARGO_PKG_VERSION")
            )),
        );

        let timeout = Duration::from_secs(options.timeout_seconds.try_into().unwrap_or(10));
        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(timeout);

        if let Some(proxy) = options.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            let proxy =
                reqwest::Proxy::all(proxy).map_err(|e| FetcherBuildError::ProxySetup {
                    proxy: proxy.to_string(),
                    source: e,
                })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| FetcherBuildError::HttpClientBuild { source: e })?;

        Ok(Self {
            client,
            endpoint: options.endpoint,
            limiter: RateLimiter::direct(Quota::per_second(rate)),
            page_size: PAGE_SIZE,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl PageFetch for HttpPageFetcher {
    fn fetch_page(&self, page: u32) -> BoxFuture<'_, Result<Page, FetchError>> {
        Box::pin(async move {
            self.limiter.until_ready().await;

            let url = format!("{}?page={}", self.endpoint, page);
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| FetchError::Network { page, source: e })?
                .error_for_status()
                .map_err(|e| FetchError::Network { page, source: e })?;
            let body = resp
                .text()
                .await
                .map_err(|e| FetchError::Network { page, source: e })?;

            parse_page_body(page, &body, self.page_size)
        })
    }
}

#[derive(Deserialize)]
struct Envelope {
    data: Option<Vec<WireArtwork>>,
    pagination: Option<WirePagination>,
}

#[derive(Deserialize)]
struct WirePagination {
    total: Option<u64>,
}

// The API sends null for most display fields on sparse records.
#[derive(Deserialize)]
struct WireArtwork {
    id: u64,
    title: Option<String>,
    place_of_origin: Option<String>,
    artist_display: Option<String>,
    date_start: Option<i32>,
    date_end: Option<i32>,
}

pub(crate) fn parse_page_body(
    page: u32,
    body: &str,
    page_size: usize,
) -> Result<Page, FetchError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| FetchError::MalformedResponse {
            page,
            reason: e.to_string(),
        })?;

    let data = envelope.data.ok_or_else(|| FetchError::MalformedResponse {
        page,
        reason: "missing item list".to_string(),
    })?;
    let total = envelope
        .pagination
        .and_then(|p| p.total)
        .ok_or_else(|| FetchError::MalformedResponse {
            page,
            reason: "missing pagination total".to_string(),
        })?;

    let records = data
        .into_iter()
        .map(|w| Artwork {
            id: w.id,
            title: w.title.unwrap_or_default(),
            place_of_origin: w.place_of_origin.unwrap_or_default(),
            artist_display: w.artist_display.unwrap_or_default(),
            date_start: w.date_start,
            date_end: w.date_end,
        })
        .collect();

    Ok(Page {
        index: page,
        records,
        total,
        page_size,
    })
}
