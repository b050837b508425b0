//! TCP connection to one of the device's service ports
//!
//! A connection owns the read half of the stream and shares the write half
//! with a keep-alive task that sends an empty KEEP_ALIVE frame on a fixed
//! interval. Replies to those pings arrive on the same stream and are left
//! for the reader to skip. Reads and writes have no deadline; the stream
//! stays open until teardown.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpSocket, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use vtxrust_core::constants::{DEFAULT_CONNECT_TIMEOUT, DEVICE_ADDR, KEEPALIVE_INTERVAL_MS};
use vtxrust_core::{Command, Frame};

use crate::io::{read_frame, FrameWriter};
use crate::local_addr::LocalAddr;
use crate::{error::*, Transport};

/// Settings used when dialing the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialOptions {
    pub device_addr: Ipv4Addr,
    pub local_addr: LocalAddr,
    pub connect_timeout: Option<Duration>,
    pub keepalive_interval: Duration,
    pub max_payload_size: Option<usize>,
}

impl Default for DialOptions {
    fn default() -> Self {
        Self {
            device_addr: DEVICE_ADDR,
            local_addr: LocalAddr::Auto,
            connect_timeout: Some(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT)),
            keepalive_interval: Duration::from_millis(KEEPALIVE_INTERVAL_MS),
            max_payload_size: None,
        }
    }
}

/// One-shot teardown for a [`Connection`]
///
/// Stops the keep-alive task, closes the stream, and wakes any pending
/// receive with [`Error::ConnectionClosed`].
#[derive(Debug)]
pub struct Teardown {
    token: CancellationToken,
}

impl Teardown {
    pub fn teardown(self) {
        self.token.cancel();
    }
}

/// Established connection with its keep-alive task
pub struct Connection {
    remote: SocketAddr,
    local: SocketAddr,
    reader: OwnedReadHalf,
    writer: FrameWriter<OwnedWriteHalf>,
    shutdown: CancellationToken,
    keepalive: Option<JoinHandle<()>>,
    max_payload_size: Option<usize>,
}

impl Connection {
    /// Connect to `port` on the device and start the keep-alive task
    ///
    /// # Errors
    ///
    /// [`Error::Unreachable`] when the device can't be reached, which in
    /// practice means the host is not on the drone's wifi.
    /// [`Error::ZeroKeepAliveInterval`] before dialing if the interval is zero.
    pub async fn dial(options: &DialOptions, port: u16) -> Result<Self> {
        if options.keepalive_interval.is_zero() {
            return Err(Error::ZeroKeepAliveInterval);
        }

        let remote = SocketAddr::from((options.device_addr, port));
        let local_ip = options.local_addr.resolve(options.device_addr);

        debug!("Connecting to {} from {}...", remote, local_ip);

        let socket = bind_local(local_ip).map_err(|source| Error::Unreachable {
            addr: remote,
            source,
        })?;

        let connect = socket.connect(remote);
        let stream = match options.connect_timeout {
            Some(limit) => timeout(limit, connect)
                .await
                .map_err(|_| Error::ConnectTimeout(remote))?,
            None => connect.await,
        }
        .map_err(|source| Error::Unreachable {
            addr: remote,
            source,
        })?;

        // Disable Nagle's algorithm, frames are small
        stream.set_nodelay(true)?;

        let conn = Self::from_stream(stream, options.keepalive_interval, options.max_payload_size)?;

        debug!("Connected to {} from {}", conn.remote, conn.local);

        Ok(conn)
    }

    /// Wrap an already connected stream and start the keep-alive task
    pub fn from_stream(
        stream: TcpStream,
        keepalive_interval: Duration,
        max_payload_size: Option<usize>,
    ) -> Result<Self> {
        if keepalive_interval.is_zero() {
            return Err(Error::ZeroKeepAliveInterval);
        }

        let remote = stream.peer_addr()?;
        let local = stream.local_addr()?;

        let (reader, writer) = stream.into_split();
        let writer = FrameWriter::new(writer);
        let shutdown = CancellationToken::new();

        let keepalive = spawn_keepalive(
            writer.clone(),
            keepalive_interval,
            shutdown.clone(),
            remote,
        );

        Ok(Self {
            remote,
            local,
            reader,
            writer,
            shutdown,
            keepalive: Some(keepalive),
            max_payload_size,
        })
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// Check if teardown has been requested
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Handle for tearing this connection down from another task
    pub fn teardown_handle(&self) -> Teardown {
        Teardown {
            token: self.shutdown.clone(),
        }
    }

    /// Tear down and wait for the keep-alive task to close the stream
    ///
    /// Fails with [`Error::KeepAlive`] if the keep-alive task died before
    /// teardown.
    pub async fn close(mut self) -> Result<()> {
        debug!("Closing connection to {}...", self.remote);

        self.shutdown.cancel();

        if let Some(task) = self.keepalive.take() {
            task.await
                .inspect_err(|e| warn!("Keep-alive task for {} failed: {}", self.remote, e))?;
        }

        debug!("Closed connection to {}", self.remote);
        Ok(())
    }
}

#[async_trait]
impl Transport for Connection {
    async fn send(&mut self, frame: &Frame) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        self.writer.send(frame).await
    }

    async fn recv(&mut self) -> Result<Frame> {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(Error::ConnectionClosed),
            result = read_frame(&mut self.reader, self.max_payload_size) => result,
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.keepalive.is_some() && !self.is_closed() {
            debug!("Connection to {} dropped without close", self.remote);
        }
        self.shutdown.cancel();
    }
}

fn bind_local(ip: Ipv4Addr) -> std::io::Result<TcpSocket> {
    let socket = TcpSocket::new_v4()?;
    match socket.bind(SocketAddr::from((ip, 0))) {
        Ok(()) => Ok(socket),
        Err(e) if !ip.is_unspecified() => {
            warn!("Can't bind {}, letting the OS pick: {}", ip, e);
            let socket = TcpSocket::new_v4()?;
            socket.bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))?;
            Ok(socket)
        }
        Err(e) => Err(e),
    }
}

fn spawn_keepalive(
    writer: FrameWriter<OwnedWriteHalf>,
    every: Duration,
    shutdown: CancellationToken,
    remote: SocketAddr,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let ping = Frame::new(Command::KeepAlive);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    trace!("Keep-alive to {}", remote);

                    // A peer that stopped reading must not block teardown
                    let sent = tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        sent = writer.send(&ping) => sent,
                    };
                    if let Err(e) = sent {
                        warn!("Keep-alive to {} failed: {}", remote, e);
                        shutdown.cancelled().await;
                        break;
                    }
                }
            }
        }

        drop(ticker);
        if let Err(e) = writer.shutdown().await {
            trace!("Shutdown of {} failed: {}", remote, e);
        }
        debug!("Keep-alive to {} stopped", remote);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::FrameStream;
    use pretty_assertions::assert_eq;
    use tokio::net::TcpListener;

    fn loopback(interval: Duration) -> DialOptions {
        DialOptions {
            device_addr: Ipv4Addr::LOCALHOST,
            keepalive_interval: interval,
            ..DialOptions::default()
        }
    }

    async fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[test]
    fn test_default_options() {
        let options = DialOptions::default();
        assert_eq!(options.device_addr, Ipv4Addr::new(192, 168, 0, 1));
        assert_eq!(options.keepalive_interval, Duration::from_secs(2));
        assert_eq!(options.local_addr, LocalAddr::Auto);
        assert_eq!(options.max_payload_size, None);
    }

    #[tokio::test]
    async fn test_dial_unreachable() {
        let (listener, port) = listener().await;
        drop(listener);

        let result = Connection::dial(&loopback(Duration::from_secs(2)), port).await;
        match result {
            Err(e @ Error::Unreachable { .. }) => {
                assert!(e.is_recoverable());
                assert!(e.to_string().contains("wifi"));
            }
            Err(e) => panic!("Expected Unreachable, got {}", e),
            Ok(_) => panic!("Expected Unreachable, got a connection"),
        }
    }

    #[tokio::test]
    async fn test_keepalive_pings_then_close() {
        let (listener, port) = listener().await;
        let conn = Connection::dial(&loopback(Duration::from_millis(20)), port)
            .await
            .unwrap();
        assert_eq!(conn.remote_addr().port(), port);

        let (server, _) = listener.accept().await.unwrap();
        let mut server = FrameStream::new(server);

        for _ in 0..3 {
            let ping = timeout(Duration::from_secs(5), server.recv())
                .await
                .unwrap()
                .unwrap();
            assert!(ping.is(Command::KeepAlive));
            assert_eq!(ping.payload_len(), 0);
        }

        conn.close().await.unwrap();

        // Drain pings still in flight, then the stream must end
        loop {
            match timeout(Duration::from_secs(5), server.recv()).await.unwrap() {
                Ok(frame) => assert!(frame.is(Command::KeepAlive)),
                Err(e) => {
                    assert!(matches!(e, Error::ConnectionClosed));
                    break;
                }
            }
        }
    }

    #[tokio::test]
    async fn test_teardown_unblocks_recv() {
        let (listener, port) = listener().await;
        let mut conn = Connection::dial(&loopback(Duration::from_secs(60)), port)
            .await
            .unwrap();
        let (_server, _) = listener.accept().await.unwrap();

        let teardown = conn.teardown_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            teardown.teardown();
        });

        let result = timeout(Duration::from_secs(5), conn.recv()).await.unwrap();
        assert!(matches!(result, Err(Error::ConnectionClosed)));
        assert!(conn.is_closed());
        assert!(matches!(
            conn.send(&Frame::new(Command::ListVideos)).await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_keepalive_never_splits_frames() {
        let (listener, port) = listener().await;
        let mut conn = Connection::dial(&loopback(Duration::from_millis(1)), port)
            .await
            .unwrap();
        let (server, _) = listener.accept().await.unwrap();

        let reader = tokio::spawn(async move {
            let mut server = FrameStream::new(server);
            let mut big = 0;
            while let Ok(frame) = server.recv().await {
                if frame.is(Command::DeleteVideo) {
                    assert_eq!(frame.payload(), &[0x77u8; 64 * 1024][..]);
                    big += 1;
                } else {
                    assert!(frame.is(Command::KeepAlive));
                }
            }
            big
        });

        let payload = vec![0x77u8; 64 * 1024];
        for _ in 0..20 {
            let frame = Frame::with_payload(Command::DeleteVideo, &payload).unwrap();
            conn.send(&frame).await.unwrap();
        }
        conn.close().await.unwrap();

        assert_eq!(reader.await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_zero_keepalive_rejected() {
        let (listener, port) = listener().await;

        let result = Connection::dial(&loopback(Duration::ZERO), port).await;
        assert!(matches!(result, Err(Error::ZeroKeepAliveInterval)));

        let stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await.unwrap();
        let (_server, _) = listener.accept().await.unwrap();
        let result = Connection::from_stream(stream, Duration::ZERO, None);
        assert!(matches!(result, Err(Error::ZeroKeepAliveInterval)));
    }

    #[tokio::test]
    async fn test_close_with_stalled_peer() {
        let (listener, port) = listener().await;
        let mut conn = Connection::dial(&loopback(Duration::from_millis(1)), port)
            .await
            .unwrap();

        // Peer accepts but never reads
        let (_server, _) = listener.accept().await.unwrap();

        let big = Frame::with_payload(Command::DeleteVideo, &vec![0u8; 32 * 1024 * 1024]).unwrap();
        let _ = timeout(Duration::from_millis(500), conn.send(&big)).await;

        // Give the keep-alive task time to block on the full socket
        tokio::time::sleep(Duration::from_millis(50)).await;

        timeout(Duration::from_secs(5), conn.close())
            .await
            .expect("close hung on a stalled peer")
            .unwrap();
    }

    #[tokio::test]
    async fn test_recv_reply() {
        let (listener, port) = listener().await;
        let mut conn = Connection::dial(&loopback(Duration::from_secs(60)), port)
            .await
            .unwrap();
        let (server, _) = listener.accept().await.unwrap();
        let mut server = FrameStream::new(server);

        conn.send(&Frame::new(Command::TakePhoto)).await.unwrap();
        let request = server.recv().await.unwrap();
        assert!(request.is(Command::TakePhoto));

        server
            .send(&Frame::with_payload(Command::TakePhoto, &[1u32]).unwrap())
            .await
            .unwrap();
        let reply = conn.recv().await.unwrap();
        assert_eq!(reply.payload_words().unwrap(), vec![1]);

        conn.close().await.unwrap();
    }
}
