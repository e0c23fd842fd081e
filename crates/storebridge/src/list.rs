//! Paginated key listing.
//!
//! A [`ListCursor`] walks the keys under a prefix in lexicographic order,
//! one bounded page per call. The continuation token is the last key of
//! the previous page; resumption lists strictly after it, so a cursor can
//! be rebuilt from a token alone and keys created behind the cursor's
//! position are never revisited.

use std::sync::Arc;

use crate::backend::{BackendConfig, ObjectEntry};
use crate::bridge::Bridge;
use crate::error::Result;

/// Default page size when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Cursor over the keys under one prefix.
pub struct ListCursor {
    bridge: Bridge,
    config: Arc<BackendConfig>,
    prefix: String,
    continuation: Option<String>,
    page_size: usize,
    exhausted: bool,
}

impl ListCursor {
    /// Cursor positioned before the first key under `prefix`.
    pub fn new(
        bridge: &Bridge,
        prefix: impl Into<String>,
        config: Arc<BackendConfig>,
        page_size: usize,
    ) -> Self {
        Self {
            bridge: bridge.clone(),
            config,
            prefix: prefix.into(),
            continuation: None,
            page_size: if page_size == 0 {
                DEFAULT_PAGE_SIZE
            } else {
                page_size
            },
            exhausted: false,
        }
    }

    /// Cursor resumed from a token taken off an earlier cursor, possibly
    /// in another process.
    pub fn resume(
        bridge: &Bridge,
        prefix: impl Into<String>,
        config: Arc<BackendConfig>,
        page_size: usize,
        token: impl Into<String>,
    ) -> Self {
        let mut cursor = Self::new(bridge, prefix, config, page_size);
        cursor.continuation = Some(token.into());
        cursor
    }

    /// Fetch the next page, or `None` when the listing is exhausted.
    ///
    /// The final page may be short or empty; entries within and across
    /// pages are in strict lexicographic order.
    pub async fn next_page(&mut self) -> Result<Option<Vec<ObjectEntry>>> {
        if self.exhausted {
            return Ok(None);
        }
        let page = self
            .bridge
            .list(
                &self.prefix,
                self.continuation.clone(),
                self.page_size,
                &self.config,
            )
            .await?;
        self.exhausted = page.continuation.is_none();
        self.continuation = page.continuation;
        Ok(Some(page.entries))
    }

    /// Opaque resumption token: the last key served, if any.
    pub fn token(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    /// Whether the listing has been walked to the end.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Release the cursor early. Idempotent, valid before exhaustion;
    /// further calls to [`next_page`](Self::next_page) return `None`.
    ///
    /// Listing holds no backend-side iteration state, so this only
    /// latches the cursor shut.
    pub fn finish(&mut self) {
        self.exhausted = true;
        self.continuation = None;
    }

    /// Drain the remaining pages into one vector.
    pub async fn collect_all(&mut self) -> Result<Vec<ObjectEntry>> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page);
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use bytes::Bytes;

    async fn seeded_bridge(keys: &[&str]) -> (Bridge, Arc<BackendConfig>) {
        let bridge = Bridge::start(RuntimeConfig::default()).unwrap();
        let config = Arc::new(BackendConfig::Memory);
        for key in keys {
            bridge
                .put(key, Bytes::from_static(b"x"), &config)
                .await
                .unwrap();
        }
        (bridge, config)
    }

    #[tokio::test]
    async fn test_pagination_is_complete_ordered_and_duplicate_free() {
        let keys: Vec<String> = (0..10).map(|i| format!("data/key-{:02}", i)).collect();
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let (bridge, config) = seeded_bridge(&refs).await;

        let mut cursor = ListCursor::new(&bridge, "data/", config, 3);
        let mut seen = Vec::new();
        let mut pages = 0;
        while let Some(page) = cursor.next_page().await.unwrap() {
            assert!(page.len() <= 3);
            seen.extend(page.into_iter().map(|e| e.location));
            pages += 1;
        }
        assert!(pages >= 4);
        assert_eq!(seen, keys);
        let mut sorted = seen.clone();
        sorted.sort();
        assert_eq!(seen, sorted);

        // Exhausted cursors stay exhausted.
        assert!(cursor.is_exhausted());
        assert!(cursor.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resume_from_token_lists_strictly_after() {
        let keys: Vec<String> = (0..6).map(|i| format!("data/key-{}", i)).collect();
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let (bridge, config) = seeded_bridge(&refs).await;

        let mut cursor = ListCursor::new(&bridge, "data/", config.clone(), 2);
        let first = cursor.next_page().await.unwrap().unwrap();
        assert_eq!(first.len(), 2);
        let token = cursor.token().unwrap().to_string();
        assert_eq!(token, "data/key-1");

        let mut resumed = ListCursor::resume(&bridge, "data/", config, 100, token);
        let rest = resumed.collect_all().await.unwrap();
        let rest_keys: Vec<&str> = rest.iter().map(|e| e.location.as_str()).collect();
        assert_eq!(
            rest_keys,
            ["data/key-2", "data/key-3", "data/key-4", "data/key-5"]
        );
    }

    #[tokio::test]
    async fn test_empty_prefix_yields_one_empty_page() {
        let (bridge, config) = seeded_bridge(&["other/key"]).await;
        let mut cursor = ListCursor::new(&bridge, "missing/", config, 10);
        let page = cursor.next_page().await.unwrap().unwrap();
        assert!(page.is_empty());
        assert!(cursor.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_finish_before_exhaustion_latches_cursor() {
        let keys: Vec<String> = (0..6).map(|i| format!("data/key-{}", i)).collect();
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let (bridge, config) = seeded_bridge(&refs).await;

        let mut cursor = ListCursor::new(&bridge, "data/", config, 2);
        cursor.next_page().await.unwrap().unwrap();
        cursor.finish();
        cursor.finish();
        assert!(cursor.is_exhausted());
        assert!(cursor.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exact_multiple_ends_with_empty_page() {
        // 4 keys, page size 2: the second page is full, so the cursor
        // cannot know it is done until a third, empty fetch.
        let keys: Vec<String> = (0..4).map(|i| format!("data/k{}", i)).collect();
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let (bridge, config) = seeded_bridge(&refs).await;

        let mut cursor = ListCursor::new(&bridge, "data/", config, 2);
        let mut collected = Vec::new();
        while let Some(page) = cursor.next_page().await.unwrap() {
            collected.extend(page.into_iter().map(|e| e.location));
        }
        assert_eq!(collected, keys);
    }
}
