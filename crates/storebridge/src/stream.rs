//! Chunked stream cursors over bridge operations.
//!
//! [`ObjectWriter`] accepts pushes of arbitrary size, staging bytes (after
//! optional compression) until the multipart threshold trips; below the
//! threshold the whole object goes up as a single put on close. The
//! threshold observes staged bytes, so a well-compressed stream can stay
//! on the single-shot path regardless of its logical size.
//!
//! [`ObjectReader`] mirrors this on the way down: objects at or above the
//! chunked-get threshold are fetched as ranged chunks, smaller ones in one
//! request. Decompression is streaming, so a frame may span fetched chunks.
//!
//! Multipart sub-operations (start, parts, complete) share one wall-clock
//! retry budget, fixed when the upload starts.

use bytes::Bytes;
use std::io::Write;
use std::mem;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::warn;
use zstd::stream::write::{Decoder, Encoder};

use crate::backend::BackendConfig;
use crate::bridge::{Bridge, Operation, Outcome, Ticket};
use crate::config::CompressionType;
use crate::error::{Error, Result};

/// Staging buffer for outgoing bytes, compressing when configured.
enum Stager {
    Plain(Vec<u8>),
    Zstd(Encoder<'static, Vec<u8>>),
}

impl Stager {
    fn new(compression: CompressionType) -> Result<Self> {
        match compression {
            CompressionType::None => Ok(Stager::Plain(Vec::new())),
            CompressionType::Zstd => {
                let encoder = Encoder::new(Vec::new(), 0)
                    .map_err(|e| Error::Compression(e.to_string()))?;
                Ok(Stager::Zstd(encoder))
            }
        }
    }

    fn push(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Stager::Plain(buf) => {
                buf.extend_from_slice(data);
                Ok(())
            }
            // Flushing per push keeps the staged length an honest measure
            // for the threshold check.
            Stager::Zstd(encoder) => encoder
                .write_all(data)
                .and_then(|_| encoder.flush())
                .map_err(|e| Error::Compression(e.to_string())),
        }
    }

    fn staged(&mut self) -> &mut Vec<u8> {
        match self {
            Stager::Plain(buf) => buf,
            Stager::Zstd(encoder) => encoder.get_mut(),
        }
    }

    /// Terminate the stream (writing the compression epilogue if any) and
    /// hand back whatever is still staged.
    fn finish(self) -> Result<Vec<u8>> {
        match self {
            Stager::Plain(buf) => Ok(buf),
            Stager::Zstd(encoder) => encoder
                .finish()
                .map_err(|e| Error::Compression(e.to_string())),
        }
    }
}

enum WriterState {
    Open(Stager),
    Closed,
    Failed,
}

struct UploadState {
    upload_id: String,
    parts: Vec<String>,
    deadline: Instant,
}

/// Incremental writer for one object.
///
/// Push with [`write`](Self::write), then [`close`](Self::close) exactly
/// once to make the object visible; an unclosed writer leaves nothing
/// behind on the single-shot path and an uncommitted upload on the
/// multipart path. Close is idempotent after success.
pub struct ObjectWriter {
    bridge: Bridge,
    path: String,
    config: Arc<BackendConfig>,
    part_size: usize,
    state: WriterState,
    upload: Option<UploadState>,
    bytes_written: u64,
}

impl ObjectWriter {
    pub fn new(
        bridge: &Bridge,
        path: impl Into<String>,
        config: Arc<BackendConfig>,
        compression: CompressionType,
    ) -> Result<Self> {
        Ok(Self {
            bridge: bridge.clone(),
            path: path.into(),
            config,
            part_size: bridge.config().multipart_put_threshold,
            state: WriterState::Open(Stager::new(compression)?),
            upload: None,
            bytes_written: 0,
        })
    }

    /// Append `data` to the stream. Always accepts the full slice; parts
    /// are uploaded as the staging buffer crosses the threshold.
    pub async fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.stager_mut()?.push(data)?;
        self.bytes_written += data.len() as u64;
        self.flush_ready().await?;
        Ok(data.len())
    }

    /// Logical (pre-compression) bytes accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Finalize the object and return the logical byte count.
    ///
    /// A second close after success is a no-op returning the same count.
    /// After a failed close or an [`abort`](Self::abort) the writer is
    /// dead and every call errors.
    pub async fn close(&mut self) -> Result<u64> {
        let stager = match mem::replace(&mut self.state, WriterState::Failed) {
            WriterState::Open(stager) => stager,
            WriterState::Closed => {
                self.state = WriterState::Closed;
                return Ok(self.bytes_written);
            }
            WriterState::Failed => return Err(Error::ClosedStream),
        };

        match self.finalize(stager).await {
            Ok(()) => {
                self.state = WriterState::Closed;
                Ok(self.bytes_written)
            }
            Err(err) => {
                self.abort_upload().await;
                Err(err)
            }
        }
    }

    /// Cancel the stream, abandoning any in-progress multipart upload.
    pub async fn abort(&mut self) {
        self.state = WriterState::Failed;
        self.abort_upload().await;
    }

    async fn finalize(&mut self, stager: Stager) -> Result<()> {
        let residue = stager.finish()?;
        match self.upload.take() {
            None => {
                // The threshold never tripped; the whole object fits one put.
                let ticket = Ticket::put(self.path.clone(), Bytes::from(residue), self.config.clone());
                match self.bridge.execute(ticket).await? {
                    Outcome::Put { .. } => Ok(()),
                    _ => unreachable!("worker wrote a mismatched outcome for a put"),
                }
            }
            Some(upload) => {
                self.upload = Some(upload);
                if !residue.is_empty() {
                    self.upload_part(Bytes::from(residue)).await?;
                }
                let Some(upload) = self.upload.take() else {
                    return Err(Error::ClosedStream);
                };
                let ticket = Ticket::new(
                    Operation::MultipartComplete {
                        path: self.path.clone(),
                        upload_id: upload.upload_id,
                        parts: upload.parts,
                    },
                    self.config.clone(),
                )
                .with_deadline(upload.deadline);
                match self.bridge.execute(ticket).await? {
                    Outcome::MultipartCompleted => Ok(()),
                    _ => unreachable!("worker wrote a mismatched outcome for a multipart commit"),
                }
            }
        }
    }

    async fn flush_ready(&mut self) -> Result<()> {
        let part_size = self.part_size;
        loop {
            let chunk = {
                let staged = self.stager_mut()?.staged();
                if staged.len() < part_size {
                    return Ok(());
                }
                let rest = staged.split_off(part_size);
                mem::replace(staged, rest)
            };
            self.upload_part(Bytes::from(chunk)).await?;
        }
    }

    async fn upload_part(&mut self, data: Bytes) -> Result<()> {
        let (upload_id, index, deadline) = self.ensure_upload().await?;
        let ticket = Ticket::new(
            Operation::MultipartPart {
                path: self.path.clone(),
                upload_id,
                index,
                data,
            },
            self.config.clone(),
        )
        .with_deadline(deadline);
        match self.bridge.execute(ticket).await? {
            Outcome::PartUploaded { part_ref } => {
                if let Some(upload) = self.upload.as_mut() {
                    upload.parts.push(part_ref);
                }
                Ok(())
            }
            _ => unreachable!("worker wrote a mismatched outcome for a part upload"),
        }
    }

    async fn ensure_upload(&mut self) -> Result<(String, usize, Instant)> {
        if let Some(upload) = &self.upload {
            return Ok((upload.upload_id.clone(), upload.parts.len(), upload.deadline));
        }

        // All sub-operations of this upload share one retry budget.
        let deadline = Instant::now() + self.bridge.config().retry_timeout();
        let ticket = Ticket::new(
            Operation::MultipartStart {
                path: self.path.clone(),
            },
            self.config.clone(),
        )
        .with_deadline(deadline);
        let upload_id = match self.bridge.execute(ticket).await? {
            Outcome::MultipartStarted { upload_id } => upload_id,
            _ => unreachable!("worker wrote a mismatched outcome for a multipart start"),
        };
        self.upload = Some(UploadState {
            upload_id: upload_id.clone(),
            parts: Vec::new(),
            deadline,
        });
        Ok((upload_id, 0, deadline))
    }

    async fn abort_upload(&mut self) {
        let Some(upload) = self.upload.take() else {
            return;
        };
        let ticket = Ticket::new(
            Operation::MultipartAbort {
                path: self.path.clone(),
                upload_id: upload.upload_id,
            },
            self.config.clone(),
        )
        .with_deadline(upload.deadline);
        // Best effort; an orphaned upload is the backend's garbage to
        // collect.
        if let Err(err) = self.bridge.execute(ticket).await {
            warn!("Failed to abort multipart upload of {}: {}", self.path, err);
        }
    }

    fn stager_mut(&mut self) -> Result<&mut Stager> {
        match &mut self.state {
            WriterState::Open(stager) => Ok(stager),
            _ => Err(Error::ClosedStream),
        }
    }
}

/// Incremental reader for one object.
///
/// Opened against the object's current size; fetches are ranged chunks
/// when the object is at or above the chunked-get threshold, a single get
/// otherwise.
pub struct ObjectReader {
    bridge: Bridge,
    path: String,
    config: Arc<BackendConfig>,
    object_size: u64,
    position: u64,
    part_size: usize,
    chunked: bool,
    staged: Vec<u8>,
    staged_offset: usize,
    decoder: Option<Decoder<'static, Vec<u8>>>,
    closed: bool,
}

impl ObjectReader {
    /// Stat the object and position a cursor at its first byte.
    pub async fn open(
        bridge: &Bridge,
        path: impl Into<String>,
        config: Arc<BackendConfig>,
        compression: CompressionType,
    ) -> Result<Self> {
        let path = path.into();
        let ticket = Ticket::head(path.clone(), config.clone());
        let object_size = match bridge.execute(ticket).await? {
            Outcome::Head { size } => size,
            _ => unreachable!("worker wrote a mismatched outcome for a head"),
        };

        let runtime = bridge.config();
        let decoder = match compression {
            CompressionType::None => None,
            CompressionType::Zstd => Some(
                Decoder::new(Vec::new()).map_err(|e| Error::Compression(e.to_string()))?,
            ),
        };
        Ok(Self {
            bridge: bridge.clone(),
            path,
            config,
            object_size,
            position: 0,
            part_size: runtime.multipart_get_part_size,
            chunked: object_size >= runtime.multipart_get_threshold as u64,
            staged: Vec::new(),
            staged_offset: 0,
            decoder,
            closed: false,
        })
    }

    /// Stored (compressed) size of the object.
    pub fn object_size(&self) -> u64 {
        self.object_size
    }

    /// Fill `buf` with up to `buf.len()` decoded bytes. Returns 0 only at
    /// end of object.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.closed {
            return Err(Error::ClosedStream);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            let ready = self.staged.len() - self.staged_offset;
            if ready > 0 {
                let n = ready.min(buf.len());
                buf[..n].copy_from_slice(&self.staged[self.staged_offset..self.staged_offset + n]);
                self.staged_offset += n;
                if self.staged_offset == self.staged.len() {
                    self.staged.clear();
                    self.staged_offset = 0;
                }
                return Ok(n);
            }

            if self.position >= self.object_size {
                return Ok(0);
            }
            self.fetch_next().await?;
        }
    }

    /// Fill `buf` completely or fail with a short-read error naming how
    /// many bytes were available.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..]).await?;
            if n == 0 {
                return Err(Error::ShortRead {
                    requested: buf.len(),
                    available: filled,
                });
            }
            filled += n;
        }
        Ok(())
    }

    /// Drain the remainder of the object into `out`, returning the byte
    /// count appended.
    pub async fn read_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let mut chunk = [0u8; 8192];
        let mut total = 0;
        loop {
            let n = self.read(&mut chunk).await?;
            if n == 0 {
                return Ok(total);
            }
            out.extend_from_slice(&chunk[..n]);
            total += n;
        }
    }

    /// Release the cursor. Idempotent; reads after close error.
    pub fn close(&mut self) {
        self.closed = true;
        self.staged = Vec::new();
        self.staged_offset = 0;
        self.decoder = None;
    }

    async fn fetch_next(&mut self) -> Result<()> {
        let ticket = if self.chunked {
            let start = self.position as usize;
            let end = (self.position + self.part_size as u64).min(self.object_size) as usize;
            Ticket::get_range(self.path.clone(), start..end, self.config.clone())
        } else {
            Ticket::get(
                self.path.clone(),
                self.object_size as usize,
                self.config.clone(),
            )
        };
        let data = match self.bridge.execute(ticket).await? {
            Outcome::Get { data } => data,
            _ => unreachable!("worker wrote a mismatched outcome for a get"),
        };
        self.position += data.len() as u64;

        match &mut self.decoder {
            None => {
                self.staged = data.to_vec();
                self.staged_offset = 0;
            }
            Some(decoder) => {
                decoder
                    .write_all(&data)
                    .and_then(|_| decoder.flush())
                    .map_err(|e| Error::Compression(e.to_string()))?;
                self.staged = mem::take(decoder.get_mut());
                self.staged_offset = 0;
            }
        }
        Ok(())
    }
}
