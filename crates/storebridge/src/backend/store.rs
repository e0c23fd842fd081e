//! `ObjectClient` implementation over the `object_store` crate.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use object_store::multipart::{MultipartStore, PartId};
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

use super::client::{ClientResult, ListPage, ObjectClient, ObjectEntry, ObjectMetadata};

/// A pooled backend client: one `object_store` instance viewed through both
/// its single-shot and its index-addressed multipart interfaces.
pub struct ObjectStoreClient {
    store: Arc<dyn ObjectStore>,
    multipart: Arc<dyn MultipartStore>,
}

impl ObjectStoreClient {
    /// Wrap a concrete store. Both arguments are expected to be clones of
    /// the same underlying instance.
    pub fn new(store: Arc<dyn ObjectStore>, multipart: Arc<dyn MultipartStore>) -> Self {
        Self { store, multipart }
    }

    /// Wrap a concrete store type that implements both interfaces.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ObjectStore + MultipartStore,
    {
        Self {
            store: store.clone(),
            multipart: store,
        }
    }
}

#[async_trait]
impl ObjectClient for ObjectStoreClient {
    async fn get(&self, path: &str, range: Option<Range<usize>>) -> ClientResult<Bytes> {
        let path = Path::from(path);
        match range {
            Some(range) => {
                debug!("GET {} [{}..{})", path, range.start, range.end);
                Ok(self.store.get_range(&path, range).await?)
            }
            None => {
                debug!("GET {}", path);
                let result = self.store.get(&path).await?;
                Ok(result.bytes().await?)
            }
        }
    }

    async fn head(&self, path: &str) -> ClientResult<ObjectMetadata> {
        let path = Path::from(path);
        debug!("HEAD {}", path);
        let meta = self.store.head(&path).await?;
        Ok(ObjectMetadata {
            size: meta.size as u64,
            e_tag: meta.e_tag.clone(),
        })
    }

    async fn put(&self, path: &str, data: Bytes) -> ClientResult<()> {
        let path = Path::from(path);
        debug!("PUT {} ({} bytes)", path, data.len());
        self.store.put(&path, PutPayload::from_bytes(data)).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> ClientResult<()> {
        let path = Path::from(path);
        debug!("DELETE {}", path);
        self.store.delete(&path).await?;
        Ok(())
    }

    async fn list_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        max_entries: usize,
    ) -> ClientResult<ListPage> {
        let prefix_path = (!prefix.is_empty()).then(|| Path::from(prefix));
        debug!("LIST {} after {:?}", prefix, start_after);

        let mut stream = match start_after {
            Some(offset) => self
                .store
                .list_with_offset(prefix_path.as_ref(), &Path::from(offset)),
            None => self.store.list(prefix_path.as_ref()),
        };

        let mut entries = Vec::new();
        let mut exhausted = true;
        while let Some(result) = stream.next().await {
            let meta = result?;
            entries.push(ObjectEntry {
                location: meta.location.to_string(),
                size: meta.size as u64,
            });
            if entries.len() == max_entries {
                exhausted = false;
                break;
            }
        }
        // Normalizes within the page; cross-page completeness relies on
        // the trait's provider-ordering requirement.
        entries.sort_by(|a, b| a.location.cmp(&b.location));

        let continuation = if exhausted {
            None
        } else {
            entries.last().map(|entry| entry.location.clone())
        };
        Ok(ListPage {
            entries,
            continuation,
        })
    }

    async fn multipart_start(&self, path: &str) -> ClientResult<String> {
        let path = Path::from(path);
        debug!("MULTIPART CREATE {}", path);
        Ok(self.multipart.create_multipart(&path).await?)
    }

    async fn multipart_put_part(
        &self,
        path: &str,
        upload_id: &str,
        index: usize,
        data: Bytes,
    ) -> ClientResult<String> {
        let path = Path::from(path);
        debug!(
            "MULTIPART PART {} #{} ({} bytes)",
            path,
            index,
            data.len()
        );
        let part = self
            .multipart
            .put_part(
                &path,
                &upload_id.to_string(),
                index,
                PutPayload::from_bytes(data),
            )
            .await?;
        Ok(part.content_id)
    }

    async fn multipart_complete(
        &self,
        path: &str,
        upload_id: &str,
        parts: Vec<String>,
    ) -> ClientResult<()> {
        let path = Path::from(path);
        debug!("MULTIPART COMPLETE {} ({} parts)", path, parts.len());
        let parts = parts
            .into_iter()
            .map(|content_id| PartId { content_id })
            .collect();
        self.multipart
            .complete_multipart(&path, &upload_id.to_string(), parts)
            .await?;
        Ok(())
    }

    async fn multipart_abort(&self, path: &str, upload_id: &str) -> ClientResult<()> {
        let path = Path::from(path);
        debug!("MULTIPART ABORT {}", path);
        self.multipart
            .abort_multipart(&path, &upload_id.to_string())
            .await?;
        Ok(())
    }
}
