//! Frame level stream I/O
//!
//! A frame has no terminator or checksum: the reader trusts the header's
//! length field and reads exactly that many payload bytes.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use vtxrust_core::{Command, Frame, FrameHeader, HEADER_SIZE};

use crate::{error::*, Transport};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Write one frame: header, then payload, then flush
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    trace!(action = %Command::describe(frame.action()), "Sending {}", frame);

    let data = frame.encode();
    writer.write_all(&data).await?;
    writer.flush().await?;

    Ok(())
}

/// Read exactly one frame
///
/// The header is accumulated across short reads. The payload is read until
/// the declared length is satisfied; if the stream ends or fails first the
/// bytes received so far are returned inside [`Error::IncompletePayload`].
pub async fn read_frame<R>(reader: &mut R, max_payload: Option<usize>) -> Result<Frame>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut raw = [0u8; HEADER_SIZE];
    let mut filled = 0;
    let mut reads = 0;

    while filled < HEADER_SIZE {
        let n = match reader.read(&mut raw[filled..]).await {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        };

        if n == 0 {
            if filled > 0 {
                // correct port?
                warn!(expected = HEADER_SIZE, received = filled, "Stream closed inside frame header");
            }
            return Err(Error::ConnectionClosed);
        }

        filled += n;
        reads += 1;
    }

    if reads > 1 {
        debug!(reads, "Frame header arrived in pieces");
    }

    let header = FrameHeader::decode(&raw)?;
    let expected = header.payload_len();

    if let Some(max) = max_payload {
        if expected as usize > max {
            return Err(Error::PayloadTooLarge {
                size: expected as usize,
                max,
            });
        }
    }

    let expected_len = expected as usize;
    let mut payload = BytesMut::with_capacity(expected_len.min(READ_CHUNK_SIZE));
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    while payload.len() < expected_len {
        let want = (expected_len - payload.len()).min(READ_CHUNK_SIZE);
        let source = match reader.read(&mut chunk[..want]).await {
            Ok(0) => io::Error::new(io::ErrorKind::UnexpectedEof, "stream closed inside payload"),
            Ok(n) => {
                payload.extend_from_slice(&chunk[..n]);
                continue;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => e,
        };

        let partial = Frame::from_parts(header, payload)?;
        warn!(
            action = %Command::describe(partial.action()),
            expected,
            received = partial.payload_len(),
            "Payload cut short: {}",
            source
        );
        return Err(Error::IncompletePayload {
            partial: Box::new(partial),
            expected,
            source,
        });
    }

    let frame = Frame::from_parts(header, payload)?;
    trace!(action = %Command::describe(frame.action()), "Received {}", frame);

    Ok(frame)
}

/// Write half shared between the caller and the keep-alive task
///
/// Each frame is written while holding the lock, so frames from different
/// senders never interleave on the wire.
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for FrameWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W> FrameWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    /// Write one whole frame
    pub async fn send(&self, frame: &Frame) -> Result<()> {
        let mut writer = self.inner.lock().await;
        write_frame(&mut *writer, frame).await
    }

    /// Shut down the write direction
    pub async fn shutdown(&self) -> Result<()> {
        let mut writer = self.inner.lock().await;
        writer.shutdown().await?;
        Ok(())
    }
}

/// Frame transport over any byte stream
///
/// Used for in-memory streams and for streams dialed outside of
/// [`Connection`](crate::Connection).
pub struct FrameStream<S> {
    stream: S,
    max_payload: Option<usize>,
}

impl<S> FrameStream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            max_payload: None,
        }
    }

    /// Reject frames declaring more payload than this
    pub fn with_max_payload(mut self, max: usize) -> Self {
        self.max_payload = Some(max);
        self
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[async_trait]
impl<S> Transport for FrameStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, frame: &Frame) -> Result<()> {
        write_frame(&mut self.stream, frame).await
    }

    async fn recv(&mut self) -> Result<Frame> {
        read_frame(&mut self.stream, self.max_payload).await
    }
}
