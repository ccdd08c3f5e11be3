//! Tokio adapter driving a [`ProtocolState`] over a TCP stream.
//!
//! The dispatch core is callback-driven and performs no I/O of its own;
//! [`drive_connection`] supplies the missing transport half. It feeds
//! socket reads into [`ProtocolState::input`], performs the queued
//! writes one at a time, and acknowledges each completed write so the
//! next buffer starts. Lifecycle events are reported through a
//! [`CallbackTable`] owned by the embedding.

use std::io;

use bytes::{Bytes, BytesMut};
use log::{debug, warn};
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;

use crate::{
    callback::{CallbackError, CallbackTable},
    coder::MessageCoder,
    hooks::ProtocolHandler,
    protocol::{ProtocolState, ReadMode},
};

const READ_CHUNK: usize = 8 * 1024;

/// Errors terminating a driven connection.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The transport failed while reading or writing.
    #[error("transport I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The peer violated framing and the stream was abandoned.
    #[error("stream corrupted by peer, connection closed")]
    CorruptStream,
}

/// Drive `state` over `stream` until the peer disconnects, the stream
/// corrupts, or `shutdown` fires.
///
/// Reads are fed to the state machine as they arrive; buffers queued by
/// the state machine are written in order with exactly one write
/// outstanding. On shutdown or a corrupt stream, buffers already queued
/// (a goodbye message from a garbage hook included) are flushed before
/// the connection closes. The state is borrowed, so the embedding keeps
/// access to the handler after the connection ends.
///
/// Vacant callback slots are skipped; only misregistered callbacks are
/// logged.
///
/// # Errors
///
/// Returns [`DriverError::Io`] if the transport fails and
/// [`DriverError::CorruptStream`] if the peer violates framing.
pub async fn drive_connection<C, H>(
    stream: TcpStream,
    state: &mut ProtocolState<C, H>,
    callbacks: &mut CallbackTable,
    shutdown: &CancellationToken,
) -> Result<(), DriverError>
where
    C: MessageCoder,
    H: ProtocolHandler<C>,
{
    let peer_addr = match stream.peer_addr() {
        Ok(addr) => Some(addr),
        Err(error) => {
            warn!("failed to retrieve peer address: error={error}");
            None
        }
    };
    let (mut read_half, mut write_half) = stream.into_split();

    crate::metrics::inc_connections();
    if let Some(peer) = peer_addr {
        notify(callbacks.connected(peer));
    }

    let (queued_tx, mut queued_rx) = mpsc::unbounded_channel::<Bytes>();
    state.set_write_fn(move |buff| {
        // The queue front stays alive until completion; the channel
        // carries its copy to the writer below.
        let _ = queued_tx.send(Bytes::copy_from_slice(buff));
    });
    state.write_next_buff();

    let mut scratch = BytesMut::with_capacity(READ_CHUNK);
    let result = loop {
        tokio::select! {
            biased;

            () = shutdown.cancelled() => {
                debug!("shutdown requested: peer={peer_addr:?}");
                break Ok(());
            }
            queued = queued_rx.recv() => {
                let Some(buff) = queued else { break Ok(()) };
                if let Err(error) = write_half.write_all(&buff).await {
                    notify(callbacks.transport_error(&error));
                    break Err(DriverError::Io(error));
                }
                state.on_write_finished();
            }
            read = read_half.read_buf(&mut scratch) => {
                match read {
                    Ok(0) => {
                        debug!("peer closed the connection: peer={peer_addr:?}");
                        break Ok(());
                    }
                    Ok(_) => {
                        state.input(&scratch);
                        scratch.clear();
                        if state.read_mode() == ReadMode::Corrupt {
                            break Err(DriverError::CorruptStream);
                        }
                    }
                    Err(error) => {
                        notify(callbacks.transport_error(&error));
                        break Err(DriverError::Io(error));
                    }
                }
            }
        }
    };

    let flush = !matches!(result, Err(DriverError::Io(_)));
    if flush {
        while let Ok(buff) = queued_rx.try_recv() {
            if let Err(error) = write_half.write_all(&buff).await {
                warn!("final flush failed: error={error}, peer={peer_addr:?}");
                break;
            }
            state.on_write_finished();
        }
    }

    if let Some(peer) = peer_addr {
        notify(callbacks.disconnected(peer));
    }
    crate::metrics::dec_connections();
    result
}

fn notify(result: Result<(), CallbackError>) {
    if let Err(error @ CallbackError::SignatureMismatch { .. }) = result {
        warn!("lifecycle callback rejected: error={error}");
    }
}
