//! Incremental framing for the peer wire stream.
//!
//! The stream interleaves two layers. Message frames carry an encoded
//! message body behind a one-byte marker and a decimal length line; after
//! a message whose marker declares payload, the stream switches to a run
//! of payload chunks terminated by a zero-length chunk:
//!
//! ```text
//! message frame := marker msg-len LF [sig-len LF signature] body LF
//! payload chunk := chunk-len LF data
//! ```
//!
//! The marker selects the frame shape: `m` plain, `s` signed, `!` payload
//! follows, `$` signed with payload. Lengths are ASCII decimal and count
//! the body or chunk data only, never the terminator.
//!
//! Scanners in this module follow the usual incremental decoder contract:
//! `Ok(None)` means the buffer does not yet hold a complete frame and the
//! caller should retry once more bytes arrive. Errors are never reported
//! for incomplete input, with one deliberate exception: a length field
//! exceeding its limit is rejected as soon as the length line is read,
//! before the body arrives.

use bytes::BytesMut;

pub mod error;

pub use error::FramingError;

use crate::config::ProtocolConfig;

/// Marker byte of a plain message frame.
pub const MARKER_PLAIN: u8 = b'm';
/// Marker byte of a signed message frame.
pub const MARKER_SIGNED: u8 = b's';
/// Marker byte of a message frame followed by payload chunks.
pub const MARKER_PAYLOAD: u8 = b'!';
/// Marker byte of a signed message frame followed by payload chunks.
pub const MARKER_SIGNED_PAYLOAD: u8 = b'$';

/// Widest decimal rendering of a `usize` length field.
const DECIMAL_WIDTH_MAX: usize = 20;

/// Frame shape selected by the marker byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// Plain message.
    Plain,
    /// Message followed by a detached signature.
    Signed,
    /// Message followed by payload chunks.
    Payload,
    /// Signed message followed by payload chunks.
    SignedPayload,
}

impl FrameKind {
    /// Classify a marker byte, returning `None` for unrecognised bytes.
    #[must_use]
    pub const fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            MARKER_PLAIN => Some(Self::Plain),
            MARKER_SIGNED => Some(Self::Signed),
            MARKER_PAYLOAD => Some(Self::Payload),
            MARKER_SIGNED_PAYLOAD => Some(Self::SignedPayload),
            _ => None,
        }
    }

    /// Select the frame kind for an outbound message.
    #[must_use]
    pub const fn from_flags(signed: bool, payload: bool) -> Self {
        match (signed, payload) {
            (false, false) => Self::Plain,
            (true, false) => Self::Signed,
            (false, true) => Self::Payload,
            (true, true) => Self::SignedPayload,
        }
    }

    /// The marker byte written at the start of the frame.
    #[must_use]
    pub const fn marker(self) -> u8 {
        match self {
            Self::Plain => MARKER_PLAIN,
            Self::Signed => MARKER_SIGNED,
            Self::Payload => MARKER_PAYLOAD,
            Self::SignedPayload => MARKER_SIGNED_PAYLOAD,
        }
    }

    /// Whether frames of this kind carry a detached signature.
    #[must_use]
    pub const fn has_signature(self) -> bool {
        matches!(self, Self::Signed | Self::SignedPayload)
    }

    /// Whether payload chunks follow frames of this kind.
    #[must_use]
    pub const fn has_payload(self) -> bool {
        matches!(self, Self::Payload | Self::SignedPayload)
    }
}

/// A complete message frame located in the input buffer.
///
/// Borrows from the scanned buffer; the caller copies what it needs and
/// then erases exactly [`end`](Self::end) bytes from the front.
#[derive(Debug, PartialEq, Eq)]
pub struct MessageFrame<'a> {
    /// Frame shape from the marker byte.
    pub kind: FrameKind,
    /// Encoded message body.
    pub encoded: &'a [u8],
    /// Detached signature, present on signed frames.
    pub signature: Option<&'a [u8]>,
    /// Offset one past the frame terminator.
    pub end: usize,
}

/// Header of a payload chunk located in the input buffer.
///
/// The header is complete as soon as its length line is; the chunk data
/// may still be in flight. A zero-length chunk ends the payload run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Bytes occupied by the length line, newline included.
    pub size_plus_newline_sz: usize,
    /// Bytes of chunk data following the length line.
    pub data_sz: usize,
}

impl ChunkHeader {
    /// Total bytes the chunk occupies on the wire.
    #[must_use]
    pub const fn total_size(&self) -> usize { self.size_plus_newline_sz + self.data_sz }

    /// Whether this chunk is the end-of-payload sentinel.
    #[must_use]
    pub const fn is_end(&self) -> bool { self.data_sz == 0 }
}

/// Locate the newline terminating a length line starting at `start`.
///
/// Returns `Ok(None)` while the line is incomplete and the budget still
/// has room, and [`FramingError::PreambleOverflow`] once `budget` bytes
/// have been seen without a newline.
fn scan_length_line(
    buff: &[u8],
    start: usize,
    budget: usize,
) -> Result<Option<usize>, FramingError> {
    let window_end = buff.len().min(start.saturating_add(budget));
    if let Some(at) = buff[start..window_end].iter().position(|&b| b == b'\n') {
        return Ok(Some(start + at));
    }
    if window_end - start >= budget {
        return Err(FramingError::PreambleOverflow { max: budget });
    }
    Ok(None)
}

/// Parse an ASCII decimal length field.
///
/// Returns `None` for an empty field or any non-digit byte. Values wider
/// than `usize` saturate and then fail the caller's limit check.
fn parse_decimal(digits: &[u8]) -> Option<usize> {
    if digits.is_empty() {
        return None;
    }
    let mut value = 0_usize;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value
            .saturating_mul(10)
            .saturating_add(usize::from(b - b'0'));
    }
    Some(value)
}

/// Scan `buff` for a complete message frame.
///
/// Returns `Ok(None)` when the buffer holds only a prefix of a frame.
/// On success the returned [`MessageFrame`] borrows the body and
/// signature from `buff` and reports in [`MessageFrame::end`] how many
/// bytes the frame occupies.
///
/// # Errors
///
/// Returns a [`FramingError`] when the buffer contents violate the frame
/// grammar or a length field exceeds the limits in `limits`. Oversized
/// message lengths are rejected as soon as the length line is complete.
pub fn find_message<'a>(
    buff: &'a [u8],
    limits: &ProtocolConfig,
) -> Result<Option<MessageFrame<'a>>, FramingError> {
    if buff.is_empty() {
        return Ok(None);
    }
    let marker = buff[0];
    let Some(kind) = FrameKind::from_marker(marker) else {
        return Err(FramingError::UnknownMarker { marker });
    };

    let Some(len_lf) = scan_length_line(buff, 0, limits.max_preamble)? else {
        return Ok(None);
    };
    let msg_len = parse_decimal(&buff[1..len_lf]).ok_or(FramingError::InvalidLength)?;
    if msg_len > limits.max_message {
        return Err(FramingError::OversizedMessage {
            size: msg_len,
            max: limits.max_message,
        });
    }

    let mut cursor = len_lf + 1;
    let mut signature_span = None;
    if kind.has_signature() {
        let Some(sig_lf) = scan_length_line(buff, cursor, limits.max_preamble)? else {
            return Ok(None);
        };
        let sig_len = parse_decimal(&buff[cursor..sig_lf]).ok_or(FramingError::InvalidLength)?;
        if sig_len == 0 {
            return Err(FramingError::EmptySignature);
        }
        if sig_len > limits.max_signature {
            return Err(FramingError::OversizedSignature {
                size: sig_len,
                max: limits.max_signature,
            });
        }
        signature_span = Some((sig_lf + 1, sig_len));
        cursor = sig_lf + 1 + sig_len;
        if buff.len() < cursor {
            return Ok(None);
        }
    }

    let body_start = cursor;
    let end = body_start + msg_len + 1;
    if buff.len() < end {
        return Ok(None);
    }
    if buff[end - 1] != b'\n' {
        return Err(FramingError::MissingTerminator);
    }

    Ok(Some(MessageFrame {
        kind,
        encoded: &buff[body_start..body_start + msg_len],
        signature: signature_span.map(|(start, len)| &buff[start..start + len]),
        end,
    }))
}

/// Scan `buff` for the header of the next payload chunk.
///
/// Only the length line is parsed; the caller waits until
/// [`ChunkHeader::total_size`] bytes are buffered before consuming the
/// chunk.
///
/// # Errors
///
/// Returns a [`FramingError`] for a malformed length line or a chunk
/// length exceeding `limits.max_payload_chunk`.
pub fn find_payload(
    buff: &[u8],
    limits: &ProtocolConfig,
) -> Result<Option<ChunkHeader>, FramingError> {
    if buff.is_empty() {
        return Ok(None);
    }
    let Some(lf) = scan_length_line(buff, 0, limits.max_preamble)? else {
        return Ok(None);
    };
    let data_sz = parse_decimal(&buff[..lf]).ok_or(FramingError::InvalidLength)?;
    if data_sz > limits.max_payload_chunk {
        return Err(FramingError::OversizedChunk {
            size: data_sz,
            max: limits.max_payload_chunk,
        });
    }
    Ok(Some(ChunkHeader {
        size_plus_newline_sz: lf + 1,
        data_sz,
    }))
}

/// Append the decimal rendering of `value` to `dst`.
fn put_decimal(dst: &mut BytesMut, value: usize) {
    let mut digits = [0_u8; DECIMAL_WIDTH_MAX];
    let mut at = digits.len();
    let mut rest = value;
    loop {
        at -= 1;
        digits[at] = b'0' + u8::try_from(rest % 10).expect("remainder < 10");
        rest /= 10;
        if rest == 0 {
            break;
        }
    }
    dst.extend_from_slice(&digits[at..]);
}

/// Append a message frame wrapping `encoded` to `dst`.
///
/// The marker is derived from the presence of `signature` and the
/// `payload_follows` flag, so the emitted frame always matches its
/// contents. Length validation happens in the send path; this encoder
/// writes whatever it is given.
pub fn encode_message_frame(
    encoded: &[u8],
    signature: Option<&[u8]>,
    payload_follows: bool,
    dst: &mut BytesMut,
) {
    let kind = FrameKind::from_flags(signature.is_some(), payload_follows);
    let sig_overhead = signature.map_or(0, |sig| DECIMAL_WIDTH_MAX + 1 + sig.len());
    dst.reserve(1 + DECIMAL_WIDTH_MAX + 1 + sig_overhead + encoded.len() + 1);

    dst.extend_from_slice(&[kind.marker()]);
    put_decimal(dst, encoded.len());
    dst.extend_from_slice(b"\n");
    if let Some(sig) = signature {
        put_decimal(dst, sig.len());
        dst.extend_from_slice(b"\n");
        dst.extend_from_slice(sig);
    }
    dst.extend_from_slice(encoded);
    dst.extend_from_slice(b"\n");
}

/// Append a payload chunk wrapping `data` to `dst`.
///
/// An empty `data` slice emits the zero-length end-of-payload sentinel.
pub fn encode_payload_chunk(data: &[u8], dst: &mut BytesMut) {
    dst.reserve(DECIMAL_WIDTH_MAX + 1 + data.len());
    put_decimal(dst, data.len());
    dst.extend_from_slice(b"\n");
    dst.extend_from_slice(data);
}
