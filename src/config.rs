//! Protocol limit configuration.
//!
//! [`ProtocolConfig`] bundles the size limits applied while scanning the
//! input stream and validating outbound frames. Each connection carries its
//! own copy, so two connections may run with different limits.

/// Default budget for a length line (marker, decimal digits and newline).
pub const DEFAULT_MAX_PREAMBLE: usize = 32;

/// Default maximum signature size in bytes (4 KiB).
pub const DEFAULT_MAX_SIGNATURE: usize = 4 * 1024;

/// Default maximum encoded message size in bytes (16 MiB).
pub const DEFAULT_MAX_MESSAGE: usize = 16 * 1024 * 1024;

/// Default maximum payload chunk size in bytes (256 KiB).
pub const DEFAULT_MAX_PAYLOAD_CHUNK: usize = 256 * 1024;

/// Default initial capacity of the input buffer (64 KiB).
pub const DEFAULT_INITIAL_BUFFER_CAPACITY: usize = 64 * 1024;

/// Minimum accepted length-line budget.
///
/// A budget below this value could never fit a marker, one digit and the
/// terminating newline, so configured values are clamped up to it.
pub const MIN_PREAMBLE_LIMIT: usize = 4;

/// Maximum accepted length-line budget.
pub const MAX_PREAMBLE_LIMIT: usize = 1024;

/// Minimum accepted message and payload chunk size limit.
///
/// Limits are clamped to at least this value so that protocol handshake
/// messages always fit.
pub const MIN_BODY_LIMIT: usize = 64;

/// Maximum accepted message and payload chunk size limit (16 MiB).
///
/// Limits are clamped to at most this value to prevent unbounded memory
/// allocation from a hostile length field.
pub const MAX_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Maximum accepted signature size limit (1 MiB).
pub const MAX_SIGNATURE_LIMIT: usize = 1024 * 1024;

/// Size limits applied to the wire stream.
///
/// The limits bound how much memory a peer can force this side to buffer:
/// a length field exceeding its limit is reported as soon as the length
/// line is read, before any body bytes arrive.
///
/// # Examples
///
/// ```
/// use syncwire::config::ProtocolConfig;
///
/// let config = ProtocolConfig {
///     max_message: 1024,
///     ..ProtocolConfig::default()
/// }
/// .clamped();
/// assert_eq!(config.max_message, 1024);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Budget for a length line: marker (messages only), decimal digits and
    /// the terminating newline.
    pub max_preamble: usize,
    /// Maximum signature size accepted on signed frames.
    pub max_signature: usize,
    /// Maximum encoded message size accepted or produced.
    pub max_message: usize,
    /// Maximum payload chunk size accepted or produced.
    pub max_payload_chunk: usize,
    /// Initial capacity reserved for the input buffer.
    pub initial_buffer_capacity: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_preamble: DEFAULT_MAX_PREAMBLE,
            max_signature: DEFAULT_MAX_SIGNATURE,
            max_message: DEFAULT_MAX_MESSAGE,
            max_payload_chunk: DEFAULT_MAX_PAYLOAD_CHUNK,
            initial_buffer_capacity: DEFAULT_INITIAL_BUFFER_CAPACITY,
        }
    }
}

impl ProtocolConfig {
    /// Return a copy with every limit clamped into its supported range.
    ///
    /// `max_preamble` is clamped into
    /// [`MIN_PREAMBLE_LIMIT`]..=[`MAX_PREAMBLE_LIMIT`], `max_message` and
    /// `max_payload_chunk` into [`MIN_BODY_LIMIT`]..=[`MAX_BODY_LIMIT`], and
    /// `max_signature` to at most [`MAX_SIGNATURE_LIMIT`]. A zero
    /// `max_signature` is valid and rejects all signed frames.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            max_preamble: self.max_preamble.clamp(MIN_PREAMBLE_LIMIT, MAX_PREAMBLE_LIMIT),
            max_signature: self.max_signature.min(MAX_SIGNATURE_LIMIT),
            max_message: self.max_message.clamp(MIN_BODY_LIMIT, MAX_BODY_LIMIT),
            max_payload_chunk: self.max_payload_chunk.clamp(MIN_BODY_LIMIT, MAX_BODY_LIMIT),
            initial_buffer_capacity: self.initial_buffer_capacity,
        }
    }
}
