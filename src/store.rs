/// Document content store.
///
/// The server is an opaque whole-document store: fetch returns the full
/// raw markdown, save overwrites it wholesale. `DocumentStore` is the
/// seam that keeps the model and the save coordinator testable without a
/// network; `HttpStore` is the production implementation over the wiki's
/// REST endpoints.
use std::time::Duration;

use futures_util::future::BoxFuture;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Everything that can go wrong between the model and the store. Clone,
/// because one save outcome is broadcast to every queued caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Save failed: {0}")]
    SaveFailed(String),

    /// The rendered checkboxes and the stored document have diverged:
    /// checkbox N has no Nth task line behind it.
    #[error("Checkbox {index} has no matching task line ({count} found)")]
    StructuralMismatch { index: usize, count: usize },
}

pub trait DocumentStore: Send + Sync {
    /// Current raw markdown of the document.
    fn fetch<'a>(&'a self, doc_path: &'a str) -> BoxFuture<'a, Result<String, SyncError>>;

    /// Overwrite the stored document with `content`.
    fn save<'a>(&'a self, doc_path: &'a str, content: &'a str)
        -> BoxFuture<'a, Result<(), SyncError>>;
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bytes escaped inside a document path; `/` stays literal so nested
/// pages keep their segments.
const DOC_PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// REST content store: `GET /api/source/{path}`, `POST /api/save/{path}`.
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// The upstream UI issued fetches with no deadline at all; a bounded
    /// per-request timeout replaces that. There is still no automatic
    /// retry — errors surface to the caller, who may simply try again.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn encode_path(doc_path: &str) -> String {
        utf8_percent_encode(doc_path.trim_start_matches('/'), DOC_PATH).to_string()
    }
}

impl DocumentStore for HttpStore {
    fn fetch<'a>(&'a self, doc_path: &'a str) -> BoxFuture<'a, Result<String, SyncError>> {
        Box::pin(async move {
            let url = format!("{}/api/source/{}", self.base_url, Self::encode_path(doc_path));
            let response = self
                .client
                .get(&url)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| SyncError::FetchFailed(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                log::warn!("[boardsync.store] GET {} -> {}", url, status);
                return Err(SyncError::FetchFailed(format!("{} returned {}", url, status)));
            }
            response
                .text()
                .await
                .map_err(|e| SyncError::FetchFailed(e.to_string()))
        })
    }

    fn save<'a>(
        &'a self,
        doc_path: &'a str,
        content: &'a str,
    ) -> BoxFuture<'a, Result<(), SyncError>> {
        Box::pin(async move {
            let url = format!("{}/api/save/{}", self.base_url, Self::encode_path(doc_path));
            let response = self
                .client
                .post(&url)
                .timeout(self.timeout)
                .header(reqwest::header::CONTENT_TYPE, "text/markdown")
                .body(content.to_string())
                .send()
                .await
                .map_err(|e| SyncError::SaveFailed(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                log::warn!("[boardsync.store] POST {} -> {}", url, status);
                return Err(SyncError::SaveFailed(format!("{} returned {}", url, status)));
            }
            Ok(())
        })
    }
}
