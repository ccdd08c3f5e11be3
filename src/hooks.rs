//! Protocol callbacks invoked by the dispatch loop.
//!
//! [`ProtocolHandler`] is the seam between the wire layer and a concrete
//! protocol: implementations receive decoded messages and payload chunks
//! and reply through the [`OutputQueue`] passed to every callback. The
//! queue is the only part of the connection a callback may touch, which
//! keeps re-entry into the read path impossible.

use bytes::Bytes;

use crate::{coder::MessageCoder, framing::FramingError, protocol::OutputQueue};

/// Protocol logic driven by [`ProtocolState`](crate::protocol::ProtocolState).
///
/// The three mandatory callbacks carry the protocol's data path. The
/// remaining callbacks have conservative defaults: garbage and decode
/// failures are logged and otherwise ignored, and an empty output queue
/// stays empty.
///
/// Callbacks run synchronously on the thread feeding input. A callback
/// may enqueue any number of replies on `out`; writes stay ordered and
/// strictly serialised regardless of which callback produced them.
pub trait ProtocolHandler<C: MessageCoder> {
    /// Called for every decoded message, with its detached signature when
    /// the frame carried one.
    ///
    /// The signature is reported verbatim and unverified.
    fn handle_message(
        &mut self,
        out: &mut OutputQueue<C>,
        message: C::Message,
        signature: Option<Bytes>,
    );

    /// Called for every payload chunk following a payload-flagged message.
    fn handle_payload(&mut self, out: &mut OutputQueue<C>, data: Bytes);

    /// Called when the zero-length chunk ends a payload run.
    fn handle_payload_end(&mut self, out: &mut OutputQueue<C>);

    /// Called when a finished write leaves the output queue empty.
    ///
    /// Protocols streaming large transfers refill the queue here, keeping
    /// at most a bounded number of buffers in flight.
    fn handle_empty_output_buff(&mut self, out: &mut OutputQueue<C>) {
        let _ = out;
    }

    /// Called when message framing is violated.
    ///
    /// `buff` holds the input buffer from the violation onwards. The
    /// stream is already corrupt when this runs; the connection should be
    /// closed.
    fn handle_msg_garbage(
        &mut self,
        out: &mut OutputQueue<C>,
        error: &FramingError,
        buff: &[u8],
    ) {
        let _ = out;
        tracing::warn!(%error, buffered = buff.len(), "message framing violated");
    }

    /// Called when payload chunk framing is violated.
    ///
    /// Same contract as [`handle_msg_garbage`](Self::handle_msg_garbage).
    fn handle_pl_garbage(&mut self, out: &mut OutputQueue<C>, error: &FramingError, buff: &[u8]) {
        let _ = out;
        tracing::warn!(%error, buffered = buff.len(), "payload framing violated");
    }

    /// Called when a well-framed body fails to decode.
    ///
    /// Unlike garbage, a decode failure is not fatal: the frame was
    /// consumed and the stream position is still trusted, so dispatch
    /// continues with the next frame.
    fn handle_decode_error(&mut self, out: &mut OutputQueue<C>, error: C::Error) {
        let _ = out;
        tracing::warn!(%error, "message body failed to decode");
    }
}
