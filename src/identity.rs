/// Task identity helpers.
///
/// Persistent task ids travel inside the markdown as a trailing
/// `<!-- task-id: XXXXXXXX -->` comment on the task line. Extraction strips
/// the marker into metadata; serialization re-appends it, so ids survive
/// the fetch/edit/save round trip even though the store is plain text.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

use regex::Regex;

static TASK_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*<!--\s*task-id:\s*([A-Za-z0-9_-]+)\s*-->\s*$").unwrap());

static NEXT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Generate a process-unique handle like `task-7-18c2a91f3e0`.
pub fn generate_id(prefix: &str) -> String {
    let seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("{}-{}-{:x}", prefix, seq, ts)
}

/// Generate a new persistent task id (8 hex chars). An atomic counter is
/// combined with a nanosecond timestamp and hashed for uniform spread.
pub fn generate_task_id() -> String {
    use sha2::{Digest, Sha256};
    let seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut hasher = Sha256::new();
    hasher.update(seq.to_le_bytes());
    hasher.update(ts.to_le_bytes());
    let hash = hasher.finalize();
    hex::encode(&hash[..4])
}

/// Extract the task id from a trailing marker, if any.
pub fn extract_task_id(content: &str) -> Option<String> {
    TASK_ID_RE
        .captures(content)
        .map(|caps| caps[1].to_string())
}

/// Remove a trailing task-id marker from the content.
pub fn strip_task_id(content: &str) -> String {
    TASK_ID_RE.replace(content, "").trim_end().to_string()
}

/// True when the content already ends in a task-id marker.
pub fn has_task_id(content: &str) -> bool {
    TASK_ID_RE.is_match(content)
}
