//! Ordered outbound buffer queue with a single write in flight.
//!
//! [`OutputQueue`] owns the send half of a connection: it encodes
//! messages and payload chunks into framed buffers, queues them in send
//! order, and hands exactly one buffer at a time to the installed write
//! function. The front buffer stays queued until the embedding reports
//! completion, so a retry after a partial write still has the bytes.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use thiserror::Error;

use crate::{
    coder::MessageCoder,
    config::ProtocolConfig,
    framing::{encode_message_frame, encode_payload_chunk},
};

/// Callback used to hand an outbound buffer to the transport.
///
/// The slice stays valid for the duration of the call only; transports
/// that write asynchronously must copy or retain the queued buffer via
/// the queue itself.
pub type WriteFn = Box<dyn FnMut(&[u8]) + Send>;

/// Errors raised when validating an outbound message or chunk.
#[derive(Debug, Error)]
pub enum SendError<E> {
    /// The message could not be encoded.
    #[error("message encoding failed: {0}")]
    Encode(#[source] E),

    /// The encoded message exceeds the configured maximum.
    #[error("outbound message exceeds max length: {size} > {max}")]
    MessageTooLarge {
        /// Encoded message size.
        size: usize,
        /// Maximum allowed message size.
        max: usize,
    },

    /// The signature exceeds the configured maximum.
    #[error("outbound signature exceeds max length: {size} > {max}")]
    SignatureTooLarge {
        /// Signature size.
        size: usize,
        /// Maximum allowed signature size.
        max: usize,
    },

    /// An empty signature was supplied for a signed frame.
    #[error("cannot send an empty signature")]
    EmptySignature,

    /// The payload chunk exceeds the configured maximum.
    #[error("outbound payload chunk exceeds max length: {size} > {max}")]
    ChunkTooLarge {
        /// Chunk size.
        size: usize,
        /// Maximum allowed chunk size.
        max: usize,
    },
}

/// Ordered queue of framed outbound buffers.
///
/// Buffers are written strictly in queue order with at most one write in
/// flight. New buffers may be appended at any time, including from
/// protocol callbacks while a write is outstanding.
pub struct OutputQueue<C> {
    coder: C,
    limits: ProtocolConfig,
    queue: VecDeque<Bytes>,
    write_in_progress: bool,
    write_fn: Option<WriteFn>,
}

impl<C: MessageCoder> OutputQueue<C> {
    /// Create a queue encoding messages with `coder` under `limits`.
    #[must_use]
    pub fn new(coder: C, limits: ProtocolConfig) -> Self {
        Self {
            coder,
            limits,
            queue: VecDeque::new(),
            write_in_progress: false,
            write_fn: None,
        }
    }

    /// The coder used for outbound message bodies.
    #[must_use]
    pub fn coder(&self) -> &C { &self.coder }

    /// Install the function that hands buffers to the transport.
    ///
    /// Until a write function is installed, queued buffers accumulate and
    /// a pump attempt logs an error.
    pub fn set_write_fn<F>(&mut self, write: F)
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        self.write_fn = Some(Box::new(write));
    }

    /// Number of buffers queued, the in-flight buffer included.
    #[must_use]
    pub fn len(&self) -> usize { self.queue.len() }

    /// Whether no buffers are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.queue.is_empty() }

    /// Whether a buffer has been handed to the write function and not yet
    /// acknowledged.
    #[must_use]
    pub fn write_in_progress(&self) -> bool { self.write_in_progress }

    /// Encode `message` and queue it as a plain frame.
    ///
    /// # Errors
    ///
    /// Returns a [`SendError`] if encoding fails or the encoded message
    /// exceeds the configured maximum.
    pub fn send_message(&mut self, message: &C::Message) -> Result<(), SendError<C::Error>> {
        self.send_message_with(message, false, None)
    }

    /// Encode `message` and queue it with explicit framing flags.
    ///
    /// With `payload_follows` set, the frame announces a payload run and
    /// the caller is expected to follow with
    /// [`send_payload_chunk`](Self::send_payload_chunk) calls and a final
    /// [`send_payload_end`](Self::send_payload_end). A `signature` is
    /// framed verbatim ahead of the body.
    ///
    /// # Errors
    ///
    /// Returns a [`SendError`] if encoding fails or the message or
    /// signature exceeds its configured maximum.
    pub fn send_message_with(
        &mut self,
        message: &C::Message,
        payload_follows: bool,
        signature: Option<&[u8]>,
    ) -> Result<(), SendError<C::Error>> {
        if let Some(sig) = signature {
            if sig.is_empty() {
                return Err(SendError::EmptySignature);
            }
            if sig.len() > self.limits.max_signature {
                return Err(SendError::SignatureTooLarge {
                    size: sig.len(),
                    max: self.limits.max_signature,
                });
            }
        }

        let encoded = self.coder.encode(message).map_err(SendError::Encode)?;
        if encoded.len() > self.limits.max_message {
            return Err(SendError::MessageTooLarge {
                size: encoded.len(),
                max: self.limits.max_message,
            });
        }

        let mut buff = BytesMut::new();
        encode_message_frame(&encoded, signature, payload_follows, &mut buff);
        self.enqueue(buff.freeze());
        Ok(())
    }

    /// Queue one payload chunk.
    ///
    /// An empty `chunk` queues the end-of-payload sentinel, equivalent to
    /// [`send_payload_end`](Self::send_payload_end).
    ///
    /// # Errors
    ///
    /// Returns [`SendError::ChunkTooLarge`] if `chunk` exceeds the
    /// configured maximum.
    pub fn send_payload_chunk(&mut self, chunk: &[u8]) -> Result<(), SendError<C::Error>> {
        if chunk.len() > self.limits.max_payload_chunk {
            return Err(SendError::ChunkTooLarge {
                size: chunk.len(),
                max: self.limits.max_payload_chunk,
            });
        }
        let mut buff = BytesMut::new();
        encode_payload_chunk(chunk, &mut buff);
        self.enqueue(buff.freeze());
        Ok(())
    }

    /// Queue the zero-length chunk ending the current payload run.
    pub fn send_payload_end(&mut self) {
        let mut buff = BytesMut::new();
        encode_payload_chunk(&[], &mut buff);
        self.enqueue(buff.freeze());
    }

    fn enqueue(&mut self, buff: Bytes) {
        self.queue.push_back(buff);
        crate::metrics::inc_frames(crate::metrics::Direction::Outbound);
        self.write_next_buff();
    }

    /// Hand the front buffer to the write function.
    ///
    /// Does nothing while a write is in flight or the queue is empty, so
    /// it is safe to call opportunistically. The buffer is not dequeued;
    /// [`finish_write`](Self::finish_write) removes it on completion.
    pub fn write_next_buff(&mut self) {
        if self.write_in_progress {
            return;
        }
        let Some(front) = self.queue.front() else {
            return;
        };
        let Some(write) = self.write_fn.as_mut() else {
            tracing::error!(queued = self.queue.len(), "write requested with no write function installed");
            return;
        };
        self.write_in_progress = true;
        write(front);
    }

    /// Acknowledge completion of the in-flight write and dequeue it.
    ///
    /// Returns `false`, without touching the queue, when no write was in
    /// flight.
    pub fn finish_write(&mut self) -> bool {
        if !self.write_in_progress {
            tracing::warn!("write completion signalled with no write in flight");
            return false;
        }
        self.write_in_progress = false;
        self.queue.pop_front();
        true
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
