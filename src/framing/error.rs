//! Error types for the framing layer.
//!
//! Scanning the input stream can fail in two ways with different reporting
//! but identical recovery: the stream is unusable afterwards and must be
//! torn down.
//!
//! - **Garbage**: the byte stream violates the frame grammar (unknown
//!   marker, malformed length field, missing terminator, oversized or
//!   empty signature). Nothing after the violation can be trusted.
//! - **Too big**: the grammar is intact but a well-formed length field
//!   exceeds the configured limit. This is reported as soon as the length
//!   line is read, before any body bytes arrive, so a hostile peer cannot
//!   force a large allocation.
//!
//! [`FramingError::is_oversize`] distinguishes the two classes.

use thiserror::Error;

/// Errors raised while scanning for message frames and payload chunks.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// First byte of a frame is not a recognised marker.
    #[error("unknown frame marker: {marker:#04x}")]
    UnknownMarker {
        /// The offending byte.
        marker: u8,
    },

    /// Length field is empty or contains a non-digit byte.
    #[error("malformed length field")]
    InvalidLength,

    /// No newline terminated a length line within the preamble budget.
    #[error("length line exceeds preamble budget of {max} bytes")]
    PreambleOverflow {
        /// Configured preamble budget.
        max: usize,
    },

    /// Signed frame declared a zero-length signature.
    #[error("signed frame with empty signature")]
    EmptySignature,

    /// Signature length exceeds the configured maximum.
    #[error("signature exceeds max length: {size} > {max}")]
    OversizedSignature {
        /// Declared signature size.
        size: usize,
        /// Maximum allowed signature size.
        max: usize,
    },

    /// Message length exceeds the configured maximum.
    #[error("message exceeds max length: {size} > {max}")]
    OversizedMessage {
        /// Declared message size.
        size: usize,
        /// Maximum allowed message size.
        max: usize,
    },

    /// Payload chunk length exceeds the configured maximum.
    #[error("payload chunk exceeds max length: {size} > {max}")]
    OversizedChunk {
        /// Declared chunk size.
        size: usize,
        /// Maximum allowed chunk size.
        max: usize,
    },

    /// Byte following the message body is not the frame terminator.
    #[error("missing frame terminator after message body")]
    MissingTerminator,
}

impl FramingError {
    /// Returns true for limit violations on a structurally valid frame.
    ///
    /// Oversized messages and chunks keep the grammar intact; everything
    /// else, including an oversized signature, is treated as garbage
    /// because the surrounding frame structure can no longer be trusted.
    ///
    /// # Examples
    ///
    /// ```
    /// use syncwire::framing::FramingError;
    ///
    /// let err = FramingError::OversizedMessage { size: 2000, max: 1024 };
    /// assert!(err.is_oversize());
    ///
    /// let err = FramingError::UnknownMarker { marker: b'x' };
    /// assert!(!err.is_oversize());
    /// ```
    #[must_use]
    pub fn is_oversize(&self) -> bool {
        matches!(
            self,
            Self::OversizedMessage { .. } | Self::OversizedChunk { .. }
        )
    }

    /// Returns the error category as a string for logging and metrics.
    ///
    /// # Returns
    ///
    /// `"too-big"` for oversize errors, `"garbage"` otherwise.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        if self.is_oversize() { "too-big" } else { "garbage" }
    }
}
