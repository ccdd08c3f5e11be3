//! Connection protocol state: input accumulation, dispatch and output.
//!
//! [`ProtocolState`] is the per-connection core. The embedding feeds it
//! raw reads via [`input`](ProtocolState::input) and write completions
//! via [`on_write_finished`](ProtocolState::on_write_finished); the state
//! machine scans the accumulated buffer, decodes complete frames and
//! dispatches them to the owned [`ProtocolHandler`]. It performs no I/O
//! and never blocks, so it runs under any event loop.
//!
//! The read side alternates between two modes: message frames, and payload
//! chunks after a message whose marker declared payload. A framing
//! violation moves the stream into the terminal corrupt mode, where all
//! further input is discarded.

use bytes::{Buf, Bytes, BytesMut};

use crate::{
    coder::MessageCoder,
    config::ProtocolConfig,
    framing::{ChunkHeader, find_message, find_payload},
    hooks::ProtocolHandler,
};

pub mod output;

pub use output::{OutputQueue, SendError, WriteFn};

/// What the read side expects next from the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadMode {
    /// Expecting a message frame.
    Message,
    /// Expecting payload chunks; the last dispatched message declared
    /// payload and its run has not ended yet.
    Payload,
    /// Framing was violated; all further input is discarded.
    Corrupt,
}

/// Per-connection protocol state machine.
///
/// Owns the input buffer, the read mode, the protocol handler and the
/// [`OutputQueue`]. All callbacks receive the output queue, so replies
/// can be produced from any of them without re-entering the read path.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use syncwire::{
///     coder::{BincodeCoder, MessageCoder},
///     hooks::ProtocolHandler,
///     protocol::{OutputQueue, ProtocolState},
/// };
///
/// #[derive(Debug, PartialEq, bincode::Encode, bincode::Decode)]
/// struct Hello {
///     name: String,
/// }
///
/// #[derive(Default)]
/// struct Recorder {
///     seen: Vec<Hello>,
/// }
///
/// impl ProtocolHandler<BincodeCoder<Hello>> for Recorder {
///     fn handle_message(
///         &mut self,
///         _out: &mut OutputQueue<BincodeCoder<Hello>>,
///         message: Hello,
///         _signature: Option<Bytes>,
///     ) {
///         self.seen.push(message);
///     }
///
///     fn handle_payload(&mut self, _out: &mut OutputQueue<BincodeCoder<Hello>>, _data: Bytes) {}
///
///     fn handle_payload_end(&mut self, _out: &mut OutputQueue<BincodeCoder<Hello>>) {}
/// }
///
/// let coder = BincodeCoder::<Hello>::default();
/// let body = coder
///     .encode(&Hello { name: "peer".into() })
///     .expect("encode should succeed");
/// let mut wire = format!("m{}\n", body.len()).into_bytes();
/// wire.extend_from_slice(&body);
/// wire.push(b'\n');
///
/// let mut state = ProtocolState::new(coder, Recorder::default());
/// state.input(&wire);
/// assert_eq!(state.handler().seen.len(), 1);
/// ```
pub struct ProtocolState<C: MessageCoder, H: ProtocolHandler<C>> {
    limits: ProtocolConfig,
    input: BytesMut,
    mode: ReadMode,
    pending_chunk: Option<ChunkHeader>,
    handler: H,
    outbox: OutputQueue<C>,
}

impl<C: MessageCoder, H: ProtocolHandler<C>> ProtocolState<C, H> {
    /// Create a state machine with the default [`ProtocolConfig`].
    #[must_use]
    pub fn new(coder: C, handler: H) -> Self {
        Self::with_config(coder, handler, ProtocolConfig::default())
    }

    /// Create a state machine with explicit limits.
    ///
    /// The limits are clamped into their supported ranges; see
    /// [`ProtocolConfig::clamped`].
    #[must_use]
    pub fn with_config(coder: C, handler: H, config: ProtocolConfig) -> Self {
        let limits = config.clamped();
        Self {
            limits,
            input: BytesMut::with_capacity(limits.initial_buffer_capacity),
            mode: ReadMode::Message,
            pending_chunk: None,
            handler,
            outbox: OutputQueue::new(coder, limits),
        }
    }

    /// What the read side expects next.
    #[must_use]
    pub fn read_mode(&self) -> ReadMode { self.mode }

    /// Bytes accumulated but not yet consumed by dispatch.
    #[must_use]
    pub fn input_buffered(&self) -> usize { self.input.len() }

    /// The protocol handler driven by this state machine.
    #[must_use]
    pub fn handler(&self) -> &H { &self.handler }

    /// Mutable access to the protocol handler.
    pub fn handler_mut(&mut self) -> &mut H { &mut self.handler }

    /// The outbound queue for this connection.
    #[must_use]
    pub fn output(&self) -> &OutputQueue<C> { &self.outbox }

    /// Mutable access to the outbound queue.
    ///
    /// Lets the embedding send outside a callback, for example to open a
    /// conversation.
    pub fn output_mut(&mut self) -> &mut OutputQueue<C> { &mut self.outbox }

    /// Install the function that hands outbound buffers to the transport.
    pub fn set_write_fn<F>(&mut self, write: F)
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        self.outbox.set_write_fn(write);
    }

    /// Feed bytes read from the transport.
    ///
    /// Complete frames are dispatched to the handler before the call
    /// returns; a trailing partial frame is retained for the next call.
    /// Dispatch is independent of how the stream is sliced into `input`
    /// calls. On a corrupt stream the bytes are discarded.
    pub fn input(&mut self, data: &[u8]) {
        if self.mode == ReadMode::Corrupt {
            tracing::trace!(bytes = data.len(), "discarding input on corrupt stream");
            return;
        }
        self.input.extend_from_slice(data);
        self.drain_input();
    }

    /// Encode `message` and queue it as a plain frame.
    ///
    /// # Errors
    ///
    /// Returns a [`SendError`] if encoding fails or the encoded message
    /// exceeds the configured maximum.
    pub fn send_message(&mut self, message: &C::Message) -> Result<(), SendError<C::Error>> {
        self.outbox.send_message(message)
    }

    /// Encode `message` and queue it with explicit framing flags.
    ///
    /// See [`OutputQueue::send_message_with`].
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
        self.outbox.send_message_with(message, payload_follows, signature)
    }

    /// Queue one payload chunk.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::ChunkTooLarge`] if `chunk` exceeds the
    /// configured maximum.
    pub fn send_payload_chunk(&mut self, chunk: &[u8]) -> Result<(), SendError<C::Error>> {
        self.outbox.send_payload_chunk(chunk)
    }

    /// Queue the zero-length chunk ending the current payload run.
    pub fn send_payload_end(&mut self) { self.outbox.send_payload_end(); }

    /// Hand the front buffer to the write function if idle.
    ///
    /// See [`OutputQueue::write_next_buff`].
    pub fn write_next_buff(&mut self) { self.outbox.write_next_buff(); }

    /// Report that the in-flight write completed.
    ///
    /// Dequeues the written buffer, asks the handler to refill via
    /// [`ProtocolHandler::handle_empty_output_buff`] when the queue ran
    /// dry, and starts the next write if any buffer is queued.
    pub fn on_write_finished(&mut self) {
        if !self.outbox.finish_write() {
            return;
        }
        if self.outbox.is_empty() {
            self.handler.handle_empty_output_buff(&mut self.outbox);
        }
        self.outbox.write_next_buff();
    }

    fn drain_input(&mut self) {
        loop {
            let advanced = match self.mode {
                ReadMode::Message => self.next_message(),
                ReadMode::Payload => self.next_chunk(),
                ReadMode::Corrupt => false,
            };
            if !advanced {
                break;
            }
        }
    }

    /// Dispatch one message frame. Returns false when the buffer holds no
    /// complete frame or the stream corrupted.
    fn next_message(&mut self) -> bool {
        let frame = match find_message(&self.input, &self.limits) {
            Ok(Some(frame)) => frame,
            Ok(None) => return false,
            Err(error) => {
                self.corrupt_message_stream(&error);
                return false;
            }
        };

        let signature = frame.signature.map(Bytes::copy_from_slice);
        let enters_payload = frame.kind.has_payload();
        let end = frame.end;
        tracing::trace!(kind = ?frame.kind, frame_len = end, "message frame complete");

        // The body is decoded before the frame is erased; the handler only
        // ever sees owned data.
        let decoded = self.outbox.coder().decode(frame.encoded);
        self.input.advance(end);
        if enters_payload {
            self.mode = ReadMode::Payload;
        }

        match decoded {
            Ok(message) => {
                crate::metrics::inc_frames(crate::metrics::Direction::Inbound);
                self.handler.handle_message(&mut self.outbox, message, signature);
            }
            Err(error) => {
                crate::metrics::inc_decode_failures();
                self.handler.handle_decode_error(&mut self.outbox, error);
            }
        }
        true
    }

    /// Dispatch one payload chunk. Returns false when the buffered data is
    /// incomplete or the stream corrupted.
    fn next_chunk(&mut self) -> bool {
        let header = match self.pending_chunk {
            Some(header) => header,
            None => match find_payload(&self.input, &self.limits) {
                Ok(Some(header)) => {
                    self.pending_chunk = Some(header);
                    header
                }
                Ok(None) => return false,
                Err(error) => {
                    self.corrupt_payload_stream(&error);
                    return false;
                }
            },
        };

        if header.is_end() {
            self.input.advance(header.size_plus_newline_sz);
            self.pending_chunk = None;
            self.mode = ReadMode::Message;
            self.handler.handle_payload_end(&mut self.outbox);
            return true;
        }

        if self.input.len() < header.total_size() {
            // Header stays pending until the chunk data arrives.
            return false;
        }

        let mut chunk = self.input.split_to(header.total_size());
        chunk.advance(header.size_plus_newline_sz);
        self.pending_chunk = None;
        crate::metrics::inc_frames(crate::metrics::Direction::Inbound);
        self.handler.handle_payload(&mut self.outbox, chunk.freeze());
        true
    }

    fn corrupt_message_stream(&mut self, error: &crate::framing::FramingError) {
        tracing::error!(
            %error,
            class = error.error_type(),
            buffered = self.input.len(),
            "message framing violated, stream is corrupt"
        );
        crate::metrics::inc_corrupt(error.error_type());
        self.mode = ReadMode::Corrupt;
        self.handler
            .handle_msg_garbage(&mut self.outbox, error, &self.input);
    }

    fn corrupt_payload_stream(&mut self, error: &crate::framing::FramingError) {
        tracing::error!(
            %error,
            class = error.error_type(),
            buffered = self.input.len(),
            "payload framing violated, stream is corrupt"
        );
        crate::metrics::inc_corrupt(error.error_type());
        self.mode = ReadMode::Corrupt;
        self.handler
            .handle_pl_garbage(&mut self.outbox, error, &self.input);
    }
}
