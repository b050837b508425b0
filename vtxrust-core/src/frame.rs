//! lewei_cmd frame structure and encoding/decoding

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    command::Command,
    constants::{ACTION_FIELD, FIELD_COUNT, HEADER_SIZE, LENGTH_FIELD, TAG, TAG_SIZE},
    error::{Error, Result},
    words,
};

/// Payload shapes a frame accepts
///
/// The protocol has no type tags, so the shape only decides how the bytes
/// are laid out: text as-is, bytes as-is, words as little-endian `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Payload<'a> {
    #[default]
    Empty,
    Text(&'a str),
    Bytes(&'a [u8]),
    Words(&'a [u32]),
}

impl Payload<'_> {
    /// Number of bytes this payload contributes on the wire
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Text(s) => s.len(),
            Self::Bytes(b) => b.len(),
            Self::Words(w) => w.len() * 4,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.byte_len() == 0
    }

    fn write_to(&self, buf: &mut BytesMut) {
        match self {
            Self::Empty => {}
            Self::Text(s) => buf.put_slice(s.as_bytes()),
            Self::Bytes(b) => buf.put_slice(b),
            Self::Words(w) => {
                for word in w.iter() {
                    buf.put_u32_le(*word);
                }
            }
        }
    }
}

impl<'a> From<&'a str> for Payload<'a> {
    fn from(s: &'a str) -> Self {
        Self::Text(s)
    }
}

impl<'a> From<&'a String> for Payload<'a> {
    fn from(s: &'a String) -> Self {
        Self::Text(s.as_str())
    }
}

impl<'a> From<&'a [u8]> for Payload<'a> {
    fn from(b: &'a [u8]) -> Self {
        Self::Bytes(b)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Payload<'a> {
    fn from(b: &'a [u8; N]) -> Self {
        Self::Bytes(b)
    }
}

impl<'a> From<&'a Vec<u8>> for Payload<'a> {
    fn from(b: &'a Vec<u8>) -> Self {
        Self::Bytes(b.as_slice())
    }
}

impl<'a> From<&'a Bytes> for Payload<'a> {
    fn from(b: &'a Bytes) -> Self {
        Self::Bytes(b.as_ref())
    }
}

impl<'a> From<&'a [u32]> for Payload<'a> {
    fn from(w: &'a [u32]) -> Self {
        Self::Words(w)
    }
}

impl<'a, const N: usize> From<&'a [u32; N]> for Payload<'a> {
    fn from(w: &'a [u32; N]) -> Self {
        Self::Words(w)
    }
}

impl<'a> From<&'a Vec<u32>> for Payload<'a> {
    fn from(w: &'a Vec<u32>) -> Self {
        Self::Words(w.as_slice())
    }
}

impl<'a, P: Into<Payload<'a>>> From<Option<P>> for Payload<'a> {
    fn from(p: Option<P>) -> Self {
        p.map(Into::into).unwrap_or_default()
    }
}

/// The 9 little-endian header fields following the tag
///
/// # Header Structure
///
/// ```text
/// ┌──────────────┬────────┬────────┬────────┬────────┬─────┬────────┐
/// │ "lewei_cmd\0"│ f0     │ f1     │ f2     │ f3     │ ... │ f8     │
/// │   10 bytes   │ action │ rsvd   │ rsvd   │ length │     │ rsvd   │
/// │              │ LE u32 │ LE u32 │ LE u32 │ LE u32 │     │ LE u32 │
/// └──────────────┴────────┴────────┴────────┴────────┴─────┴────────┘
/// ```
///
/// Reserved fields carry no known meaning and are passed through verbatim.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct FrameHeader {
    fields: [u32; FIELD_COUNT],
}

impl FrameHeader {
    /// Header with every field zeroed except the action
    pub fn new(action: u32) -> Self {
        let mut fields = [0u32; FIELD_COUNT];
        fields[ACTION_FIELD] = action;
        Self { fields }
    }

    /// Header from raw field values
    pub fn from_fields(fields: [u32; FIELD_COUNT]) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[u32; FIELD_COUNT] {
        &self.fields
    }

    /// Read a field by index
    pub fn field(&self, index: usize) -> Result<u32> {
        self.fields
            .get(index)
            .copied()
            .ok_or(Error::FieldOutOfRange(index))
    }

    /// Write a field by index
    pub fn set_field(&mut self, index: usize, value: u32) -> Result<()> {
        let slot = self
            .fields
            .get_mut(index)
            .ok_or(Error::FieldOutOfRange(index))?;
        *slot = value;
        Ok(())
    }

    pub fn action(&self) -> u32 {
        self.fields[ACTION_FIELD]
    }

    /// Payload length declared by this header
    pub fn payload_len(&self) -> u32 {
        self.fields[LENGTH_FIELD]
    }

    /// Encode tag and fields
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        let mut buf = &mut out[..];
        buf.put_slice(TAG);
        for field in self.fields {
            buf.put_u32_le(field);
        }
        out
    }

    /// Decode tag and fields
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTag`] when the buffer does not start with
    /// `"lewei_cmd\0"`.
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Result<Self> {
        let mut buf = &bytes[..];

        let mut tag = [0u8; TAG_SIZE];
        buf.copy_to_slice(&mut tag);
        if &tag != TAG {
            return Err(Error::InvalidTag { found: tag });
        }

        let mut fields = [0u32; FIELD_COUNT];
        for field in fields.iter_mut() {
            *field = buf.get_u32_le();
        }

        Ok(Self { fields })
    }
}

impl fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameHeader")
            .field("action", &Command::describe(self.action()))
            .field("payload_len", &self.payload_len())
            .field("fields", &format_args!("{:08X?}", self.fields))
            .finish()
    }
}

/// Diagnostic rendering: tag followed by each field as wire-order hex
///
/// ```text
/// lewei_cmd\0 08000000 00000000 00000000 03000000 00000000 ...
/// ```
impl fmt::Display for FrameHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&TAG[..TAG_SIZE - 1]))?;
        f.write_str("\\0")?;
        for field in self.fields {
            write!(f, " {}", hex::encode(field.to_le_bytes()))?;
        }
        Ok(())
    }
}

/// lewei_cmd protocol frame
///
/// A fixed 46 byte header followed by `payload_len` bytes of payload. The
/// length field is kept equal to the number of payload bytes on every
/// append; it cannot be written directly.
///
/// # Examples
///
/// ```
/// use vtxrust_core::{Command, Frame};
///
/// let mut frame = Frame::new(Command::CaptureVideo);
/// frame.append(&[1u32]).unwrap();
/// assert_eq!(frame.payload_len(), 4);
///
/// let encoded = frame.encode();
/// let decoded = Frame::decode(encoded).unwrap();
/// assert_eq!(decoded, frame);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    header: FrameHeader,
    payload: BytesMut,
}

impl Frame {
    /// Frame header size in bytes
    pub const HEADER_SIZE: usize = HEADER_SIZE;

    /// Largest payload the length field can describe
    pub const MAX_PAYLOAD_SIZE: usize = u32::MAX as usize;

    /// Create a frame with empty payload
    pub fn new(action: impl Into<u32>) -> Self {
        Self {
            header: FrameHeader::new(action.into()),
            payload: BytesMut::new(),
        }
    }

    /// Create a frame and append one payload
    pub fn with_payload<'a>(action: impl Into<u32>, payload: impl Into<Payload<'a>>) -> Result<Self> {
        let mut frame = Self::new(action);
        frame.append(payload)?;
        Ok(frame)
    }

    /// Rebuild a frame from a received header and the payload bytes read
    ///
    /// The length field is set to the bytes actually present, which differs
    /// from the header's declared length when the payload was cut short.
    pub fn from_parts(mut header: FrameHeader, payload: impl Into<BytesMut>) -> Result<Self> {
        let payload = payload.into();
        let len = u32::try_from(payload.len()).map_err(|_| Error::PayloadTooLarge {
            size: payload.len(),
            max: Self::MAX_PAYLOAD_SIZE,
        })?;
        header.fields[LENGTH_FIELD] = len;
        Ok(Self { header, payload })
    }

    /// Append payload data, growing the length field by its byte count
    ///
    /// Empty payloads are a no-op.
    pub fn append<'a>(&mut self, payload: impl Into<Payload<'a>>) -> Result<()> {
        let payload = payload.into();
        let add = payload.byte_len();
        if add == 0 {
            return Ok(());
        }

        let total = self.payload.len() + add;
        let len = u32::try_from(total).map_err(|_| Error::PayloadTooLarge {
            size: total,
            max: Self::MAX_PAYLOAD_SIZE,
        })?;

        self.payload.reserve(add);
        payload.write_to(&mut self.payload);
        self.header.fields[LENGTH_FIELD] = len;
        Ok(())
    }

    /// Read a header field by index
    pub fn field(&self, index: usize) -> Result<u32> {
        self.header.field(index)
    }

    /// Write a header field by index
    ///
    /// # Errors
    ///
    /// Field 3 tracks the payload and is rejected with
    /// [`Error::LengthFieldReadOnly`].
    pub fn set_field(&mut self, index: usize, value: u32) -> Result<()> {
        if index == LENGTH_FIELD {
            return Err(Error::LengthFieldReadOnly);
        }
        self.header.set_field(index, value)
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    /// Opcode (header field 0)
    pub fn action(&self) -> u32 {
        self.header.action()
    }

    /// Opcode as a known command
    pub fn command(&self) -> Result<Command> {
        Command::try_from(self.action())
    }

    /// Check the opcode against a command
    pub fn is(&self, command: Command) -> bool {
        self.action() == u32::from(command)
    }

    /// Payload length (header field 3)
    pub fn payload_len(&self) -> u32 {
        self.header.payload_len()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload.freeze()
    }

    /// Payload decoded as little-endian 32-bit words
    pub fn payload_words(&self) -> Result<Vec<u32>> {
        words::decode_words(&self.payload)
    }

    /// Get total frame size
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Encode header followed by payload
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        buf.put_slice(&self.header.encode());
        buf.put_slice(&self.payload);
        buf
    }

    /// Decode one complete frame
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Buffer is shorter than the header
    /// - Tag is not `"lewei_cmd\0"`
    /// - Remaining bytes differ from the declared payload length
    pub fn decode(mut buf: BytesMut) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::FrameTooShort {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(&buf[..HEADER_SIZE]);
        let header = FrameHeader::decode(&raw)?;
        buf.advance(HEADER_SIZE);

        if buf.len() != header.payload_len() as usize {
            return Err(Error::LengthMismatch {
                declared: header.payload_len(),
                actual: buf.len(),
            });
        }

        Ok(Self {
            header,
            payload: buf,
        })
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("action", &Command::describe(self.action()))
            .field("fields", &format_args!("{:08X?}", self.header.fields))
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.header, f)
    }
}
