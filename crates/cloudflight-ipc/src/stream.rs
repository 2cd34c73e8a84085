//! Line-delimited event streams over async byte pipes.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, warn};

use crate::error::{IpcError, IpcResult};
use crate::events::WireEvent;

/// Longest line accepted by [`EventReader`].
const MAX_LINE_LEN: usize = 64 * 1024;

/// Writes one JSON event per line.
pub struct EventWriter<W> {
    inner: FramedWrite<W, LinesCodec>,
}

impl<W: AsyncWrite + Unpin> EventWriter<W> {
    /// Wrap a byte sink.
    pub fn new(writer: W) -> Self {
        Self { inner: FramedWrite::new(writer, LinesCodec::new()) }
    }

    /// Serialize and flush one event.
    ///
    /// # Errors
    /// Returns an error if the event cannot be written.
    pub async fn send(&mut self, event: impl Into<WireEvent>) -> IpcResult<()> {
        let line = serde_json::to_string(&event.into())?;
        self.inner.send(line).await?;
        Ok(())
    }

    /// Give back the underlying sink.
    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

/// Reads JSON events, one per line, skipping lines that do not parse.
pub struct EventReader<R> {
    inner: FramedRead<R, LinesCodec>,
}

impl<R: AsyncRead + Unpin> EventReader<R> {
    /// Wrap a byte source.
    pub fn new(reader: R) -> Self {
        Self { inner: FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LEN)) }
    }

    /// Read the next event, or `None` at end of stream.
    ///
    /// # Errors
    /// Returns an error if the underlying stream fails.
    pub async fn next(&mut self) -> IpcResult<Option<WireEvent>> {
        while let Some(line) = self.inner.next().await {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => warn!(error = %e, "Skipping malformed event line"),
            }
        }
        debug!("Event stream ended");
        Ok(None)
    }

    /// Read the next event, treating end of stream as an error.
    ///
    /// # Errors
    /// Returns [`IpcError::Closed`] at end of stream.
    pub async fn expect_next(&mut self) -> IpcResult<WireEvent> {
        self.next().await?.ok_or(IpcError::Closed)
    }
}
