//! Request/response correlation
//!
//! The device answers a request with a frame carrying the same opcode. The
//! keep-alive task shares the stream, so its KEEP_ALIVE replies can show up
//! before the real answer; those are skipped. Any other opcode means the
//! two sides disagree about what was asked.

use bytes::Bytes;
use tracing::trace;

use vtxrust_core::{Command, Frame, Payload};
use vtxrust_transport::Transport;

use crate::error::{Error, Result};

/// Build a frame for `command` and send it, without waiting for a reply
pub async fn request<'a, T>(
    transport: &mut T,
    command: impl Into<u32>,
    payload: impl Into<Payload<'a>>,
) -> Result<()>
where
    T: Transport + ?Sized,
{
    let frame = Frame::with_payload(command, payload)?;
    transport.send(&frame).await?;
    Ok(())
}

/// Wait for the reply to `expected` and return its payload
///
/// # Errors
///
/// - [`Error::ProtocolDesync`] if a frame with another opcode (other than
///   KEEP_ALIVE) arrives first
/// - any receive error, unchanged
pub async fn response<T>(transport: &mut T, expected: impl Into<u32>) -> Result<Bytes>
where
    T: Transport + ?Sized,
{
    response_frame(transport, expected)
        .await
        .map(Frame::into_payload)
}

/// Like [`response`] but returns the whole frame, reserved fields included
pub async fn response_frame<T>(transport: &mut T, expected: impl Into<u32>) -> Result<Frame>
where
    T: Transport + ?Sized,
{
    let expected = expected.into();
    let keepalive = u32::from(Command::KeepAlive);
    let mut skipped = 0usize;

    loop {
        let frame = transport.recv().await?;
        let action = frame.action();

        if action == expected {
            trace!(skipped, "Got reply {}", Command::describe(action));
            return Ok(frame);
        }

        if action != keepalive {
            return Err(Error::ProtocolDesync {
                expected,
                received: action,
            });
        }

        skipped += 1;
    }
}
