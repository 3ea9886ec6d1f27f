//! Byte source and sink over any tokio byte stream.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{
    AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf,
    WriteHalf,
};

use crate::{ByteSink, ByteSource, LinkId, TransportError};

/// Counter for generating unique link IDs.
static NEXT_LINK_ID: AtomicU64 = AtomicU64::new(1);

fn next_link_id() -> LinkId {
    LinkId::new(NEXT_LINK_ID.fetch_add(1, Ordering::Relaxed))
}

/// Splits a bidirectional stream into a [`StreamSource`] and a
/// [`StreamSink`] sharing one [`LinkId`].
///
/// Works for anything tokio can read and write: a serial port from an
/// async serial crate, a `TcpStream` to a serial bridge, or
/// `tokio::io::duplex` in tests.
pub fn split<S>(stream: S) -> (StreamSource<ReadHalf<S>>, StreamSink<WriteHalf<S>>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let id = next_link_id();
    let (reader, writer) = tokio::io::split(stream);
    tracing::debug!(%id, "link opened");
    (
        StreamSource::with_id(id, reader),
        StreamSink::with_id(id, writer),
    )
}

/// A [`ByteSource`] reading from a buffered tokio reader.
pub struct StreamSource<R> {
    id: LinkId,
    reader: BufReader<R>,
}

impl<R> StreamSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Wraps a reader with a fresh link ID.
    pub fn new(reader: R) -> Self {
        Self::with_id(next_link_id(), reader)
    }

    fn with_id(id: LinkId, reader: R) -> Self {
        Self {
            id,
            reader: BufReader::new(reader),
        }
    }
}

impl<R> ByteSource for StreamSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        match self.reader.read_u8().await {
            Ok(byte) => Ok(Some(byte)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                tracing::debug!(id = %self.id, "link reached end of stream");
                Ok(None)
            }
            Err(e) => Err(TransportError::ReadFailed(e)),
        }
    }

    fn id(&self) -> LinkId {
        self.id
    }
}

/// A [`ByteSink`] writing to a tokio writer. Every write is flushed.
pub struct StreamSink<W> {
    id: LinkId,
    writer: W,
}

impl<W> StreamSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps a writer with a fresh link ID.
    pub fn new(writer: W) -> Self {
        Self::with_id(next_link_id(), writer)
    }

    fn with_id(id: LinkId, writer: W) -> Self {
        Self { id, writer }
    }
}

impl<W> ByteSink for StreamSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn write_bytes(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.writer
            .write_all(data)
            .await
            .map_err(TransportError::WriteFailed)?;
        self.writer.flush().await.map_err(TransportError::WriteFailed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.writer
            .shutdown()
            .await
            .map_err(TransportError::WriteFailed)
    }

    fn id(&self) -> LinkId {
        self.id
    }
}
