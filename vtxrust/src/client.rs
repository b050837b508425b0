//! High-level device interface

use bytes::Bytes;
use tracing::{debug, info, warn};

use vtxrust_core::constants::switch;
use vtxrust_core::{route, Command, Frame, Payload, Port};
use vtxrust_transport::{Connection, Teardown, Transport};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::exchange;

/// On/off argument for toggling commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    Off,
    On,
}

impl From<Switch> for u32 {
    fn from(s: Switch) -> u32 {
        match s {
            Switch::Off => switch::OFF,
            Switch::On => switch::ON,
        }
    }
}

impl From<bool> for Switch {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

/// Drone camera client
///
/// Every call dials the port its command belongs to, performs one
/// request/response exchange and tears the connection down again.
///
/// # Examples
///
/// ```no_run
/// use vtxrust::{Client, ClientConfig};
///
/// #[tokio::main]
/// async fn main() -> vtxrust::Result<()> {
///     let client = Client::new(ClientConfig::default());
///
///     let listing = client.list_videos().await?;
///     println!("{} bytes of listing", listing.len());
///
///     client.take_photo().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Client {
    config: ClientConfig,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Dial a service port for a multi-step exchange
    pub async fn open(&self, port: Port) -> Result<Session> {
        let number = self.config.port_number(port);
        let conn = Connection::dial(&self.config.dial_options(), number)
            .await
            .inspect_err(|e| warn!("Can't open {} port: {}", port, e))?;
        Ok(Session::new(conn))
    }

    /// Send `command`, wait for its reply and hand the reply payload to
    /// `handler`
    ///
    /// The connection is torn down afterwards whether or not the exchange
    /// succeeded. If the device can't be reached the handler is not called.
    pub async fn action<'a, F, R>(
        &self,
        command: impl Into<u32>,
        payload: impl Into<Payload<'a>>,
        handler: F,
    ) -> Result<R>
    where
        F: FnOnce(Bytes) -> R,
    {
        let request = Frame::with_payload(command, payload)?;
        let port = route(request.action());

        debug!("{} via {} port", Command::describe(request.action()), port);

        let mut session = self.open(port).await?;
        let reply = session.call(&request).await;
        let closed = session.close().await;

        let payload = reply?;
        closed?;

        Ok(handler(payload))
    }

    /// [`action`](Self::action) returning the raw reply payload
    pub async fn execute<'a>(
        &self,
        command: impl Into<u32>,
        payload: impl Into<Payload<'a>>,
    ) -> Result<Bytes> {
        self.action(command, payload, |reply| reply).await
    }

    /// Take a photo onto the SD card
    pub async fn take_photo(&self) -> Result<Bytes> {
        info!("Taking photo");
        self.execute(Command::TakePhoto, Payload::Empty).await
    }

    /// Start or stop recording video onto the SD card
    pub async fn set_recording(&self, state: impl Into<Switch>) -> Result<Bytes> {
        let state = state.into();
        info!("Recording {:?}", state);
        self.execute(Command::CaptureVideo, &[u32::from(state)]).await
    }

    /// Raw listing of the videos on the SD card
    pub async fn list_videos(&self) -> Result<Bytes> {
        self.execute(Command::ListVideos, Payload::Empty).await
    }

    /// Ask the device about one video file
    pub async fn check_video(&self, name: &str) -> Result<Bytes> {
        self.execute(Command::CheckVideo, name).await
    }

    /// Delete a video from the SD card
    pub async fn delete_video(&self, name: &str) -> Result<Bytes> {
        info!("Deleting {}", name);
        self.execute(Command::DeleteVideo, name).await
    }

    /// Set the device clock; the payload layout is device specific
    pub async fn set_clock<'a>(&self, payload: impl Into<Payload<'a>>) -> Result<Bytes> {
        self.execute(Command::SetClock, payload).await
    }
}

/// Dialed connection for exchanges that span several frames
///
/// A download, for example, is answered with DOWNLOAD_VIDEO and then
/// followed by VIDEO_FILE frames on the same stream.
pub struct Session<T = Connection> {
    transport: T,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Send a request without waiting for the reply
    pub async fn request<'a>(
        &mut self,
        command: impl Into<u32>,
        payload: impl Into<Payload<'a>>,
    ) -> Result<()> {
        exchange::request(&mut self.transport, command, payload).await
    }

    /// Wait for the reply to `expected`, skipping keep-alive replies
    pub async fn response(&mut self, expected: impl Into<u32>) -> Result<Bytes> {
        exchange::response(&mut self.transport, expected).await
    }

    /// Wait for the next `expected` frame, keeping its header
    pub async fn response_frame(&mut self, expected: impl Into<u32>) -> Result<Frame> {
        exchange::response_frame(&mut self.transport, expected).await
    }

    /// Send a prepared frame and wait for the reply carrying its opcode
    pub async fn call(&mut self, request: &Frame) -> Result<Bytes> {
        self.transport.send(request).await?;
        self.response(request.action()).await
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}

impl Session<Connection> {
    /// Handle for tearing the session down from another task
    pub fn teardown_handle(&self) -> Teardown {
        self.transport.teardown_handle()
    }

    /// Stop the keep-alive task and close the stream
    pub async fn close(self) -> Result<()> {
        self.transport.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use vtxrust_transport::FrameStream;

    struct FakeDevice {
        control: TcpListener,
        stream: TcpListener,
    }

    impl FakeDevice {
        async fn start() -> Self {
            Self {
                control: TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap(),
                stream: TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap(),
            }
        }

        fn client(&self) -> Client {
            let config = ClientConfig::default()
                .with_device_addr(Ipv4Addr::LOCALHOST)
                .with_ports(
                    self.control.local_addr().unwrap().port(),
                    self.stream.local_addr().unwrap().port(),
                )
                .with_keepalive_interval(Duration::from_secs(60));
            Client::new(config)
        }

        /// Answer one request on `port` with a keep-alive reply followed by `reply`
        fn serve_once(self, port: Port, reply: Frame) -> JoinHandle<Frame> {
            let listener = match port {
                Port::Control => self.control,
                Port::Stream => self.stream,
            };
            tokio::spawn(async move {
                let (socket, _) = listener.accept().await.unwrap();
                let mut device = FrameStream::new(socket);
                let request = device.recv().await.unwrap();
                device.send(&Frame::new(Command::KeepAlive)).await.unwrap();
                device.send(&reply).await.unwrap();

                // Client closes after the reply
                while device.recv().await.is_ok() {}
                request
            })
        }
    }

    #[test]
    fn test_switch() {
        assert_eq!(u32::from(Switch::On), 1);
        assert_eq!(u32::from(Switch::Off), 0);
        assert_eq!(Switch::from(true), Switch::On);
    }

    #[tokio::test]
    async fn test_action_invokes_handler() {
        let device = FakeDevice::start().await;
        let client = device.client();
        let reply = Frame::with_payload(Command::ListVideos, &[0x01u8, 0x02, 0x03]).unwrap();
        let server = device.serve_once(Port::Control, reply);

        let len = client
            .action(Command::ListVideos, Payload::Empty, |payload| {
                assert_eq!(payload.as_ref(), &[0x01, 0x02, 0x03]);
                payload.len()
            })
            .await
            .unwrap();
        assert_eq!(len, 3);

        let request = server.await.unwrap();
        assert!(request.is(Command::ListVideos));
        assert_eq!(request.payload_len(), 0);
    }

    #[tokio::test]
    async fn test_stream_commands_use_stream_port() {
        let device = FakeDevice::start().await;
        let client = device.client();
        let reply = Frame::with_payload(Command::PlayVideo, "ok").unwrap();
        let server = device.serve_once(Port::Stream, reply);

        let payload = client.execute(Command::PlayVideo, "a.avi").await.unwrap();
        assert_eq!(payload.as_ref(), b"ok");

        let request = server.await.unwrap();
        assert_eq!(request.payload(), b"a.avi");
    }

    #[tokio::test]
    async fn test_set_recording_payload() {
        let device = FakeDevice::start().await;
        let client = device.client();
        let server = device.serve_once(Port::Control, Frame::new(Command::CaptureVideo));

        client.set_recording(true).await.unwrap();

        let request = server.await.unwrap();
        assert_eq!(request.payload_words().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_desync_closes_and_reports() {
        let device = FakeDevice::start().await;
        let client = device.client();
        let server = device.serve_once(Port::Control, Frame::new(Command::DeleteVideo));

        let called = AtomicBool::new(false);
        let result = client
            .action(Command::TakePhoto, Payload::Empty, |_| {
                called.store(true, Ordering::SeqCst)
            })
            .await;

        assert!(matches!(
            result,
            Err(Error::ProtocolDesync {
                expected: 0x0013,
                received: 0x0014
            })
        ));
        assert!(!called.load(Ordering::SeqCst));

        // Connection was closed, so the fake device's read loop ends
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_skips_handler() {
        let device = FakeDevice::start().await;
        let client = device.client();
        drop(device);

        let called = AtomicBool::new(false);
        let result = client
            .action(Command::ListVideos, Payload::Empty, |_| {
                called.store(true, Ordering::SeqCst)
            })
            .await;

        match result {
            Err(e) => assert!(e.is_unreachable(), "unexpected error {}", e),
            Ok(_) => panic!("Expected an error"),
        }
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_zero_keepalive_is_rejected() {
        let device = FakeDevice::start().await;
        let config = device
            .client()
            .config()
            .clone()
            .with_keepalive_interval(Duration::ZERO);
        let client = Client::new(config);

        let result = client.open(Port::Control).await;
        assert!(matches!(
            result,
            Err(Error::Transport(
                vtxrust_transport::Error::ZeroKeepAliveInterval
            ))
        ));
    }

    #[tokio::test]
    async fn test_session_over_in_memory_stream() {
        let (host, device) = tokio::io::duplex(4096);
        let mut session = Session::new(FrameStream::new(host));
        let mut device = FrameStream::new(device);

        session
            .transport_mut()
            .send(&Frame::new(Command::CheckVideo))
            .await
            .unwrap();
        assert!(device.recv().await.unwrap().is(Command::CheckVideo));

        device
            .send(&Frame::with_payload(Command::CheckVideo, "ok").unwrap())
            .await
            .unwrap();
        let reply = session.response(Command::CheckVideo).await.unwrap();
        assert_eq!(reply.as_ref(), b"ok");

        let mut transport = session.into_inner();
        drop(device);
        assert!(matches!(
            transport.recv().await,
            Err(vtxrust_transport::Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_session_multi_frame_download() {
        let device = FakeDevice::start().await;
        let client = device.client();
        let listener = device.stream;

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut device = FrameStream::new(socket);
            let request = device.recv().await.unwrap();
            assert!(request.is(Command::DownloadVideo));
            device.send(&Frame::new(Command::DownloadVideo)).await.unwrap();
            device.send(&Frame::new(Command::KeepAlive)).await.unwrap();
            device
                .send(&Frame::with_payload(Command::VideoFile, &[0xEEu8; 32]).unwrap())
                .await
                .unwrap();
        });

        let mut session = client.open(Command::DownloadVideo.port()).await.unwrap();
        session
            .request(Command::DownloadVideo, "clip.avi")
            .await
            .unwrap();
        session.response(Command::DownloadVideo).await.unwrap();
        let chunk = session.response_frame(Command::VideoFile).await.unwrap();
        assert_eq!(chunk.payload_len(), 32);

        session.close().await.unwrap();
        server.await.unwrap();
    }
}
