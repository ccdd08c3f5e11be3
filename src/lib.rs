#![doc(html_root_url = "https://docs.rs/syncwire/latest")]
//! Public API for the `syncwire` library.
//!
//! This crate provides the wire layer of a peer-to-peer file
//! synchronisation protocol: incremental message framing, payload
//! chunking, an opaque message coding boundary, and a per-connection
//! state machine dispatching decoded frames to protocol callbacks.
//! The core is callback-driven and performs no I/O; the [`driver`]
//! module supplies a Tokio transport adapter.

pub mod callback;
pub mod coder;
pub mod config;
pub mod driver;
pub mod framing;
pub mod hooks;
pub mod metrics;
pub mod protocol;

pub use callback::{Callback, CallbackError, CallbackTable, Slot};
pub use coder::{BincodeCoder, CodeError, MessageCoder, RawCoder};
#[cfg(feature = "coder-serde")]
pub use coder::SerdeBincodeCoder;
pub use config::ProtocolConfig;
pub use driver::{DriverError, drive_connection};
pub use framing::{ChunkHeader, FrameKind, FramingError, MessageFrame};
pub use hooks::ProtocolHandler;
pub use metrics::{CONNECTIONS_ACTIVE, DECODE_FAILURES, Direction, FRAMES_DISPATCHED, STREAMS_CORRUPTED};
pub use protocol::{OutputQueue, ProtocolState, ReadMode, SendError, WriteFn};
