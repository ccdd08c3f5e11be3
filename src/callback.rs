//! Type-erased callback slots for the transport edge.
//!
//! Event loops hand out untyped callback hooks; [`CallbackTable`] bridges
//! them to typed closures. A table holds one owned callable per
//! [`Slot`], and every invocation validates that the stored callable
//! carries the signature the slot expects. Registration under the wrong
//! slot is therefore caught at the first invocation, not silently run
//! with reinterpreted arguments.
//!
//! The table is plumbing for the embedding around a connection; the
//! dispatch core never touches it.

use std::{io, net::SocketAddr};

use thiserror::Error;

/// Identifies one callback slot in a [`CallbackTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    /// A peer connection was established.
    Connected,
    /// A peer connection closed.
    Disconnected,
    /// The transport reported a failure.
    TransportError,
}

impl Slot {
    /// Number of slots in a table.
    pub const COUNT: usize = 3;

    const fn index(self) -> usize {
        match self {
            Slot::Connected => 0,
            Slot::Disconnected => 1,
            Slot::TransportError => 2,
        }
    }
}

/// An owned callable tagged with the slot signature it satisfies.
pub enum Callback {
    /// Runs when a peer connection is established.
    Connected(Box<dyn FnMut(SocketAddr) + Send>),
    /// Runs when a peer connection closes.
    Disconnected(Box<dyn FnMut(SocketAddr) + Send>),
    /// Runs when the transport reports a failure.
    TransportError(Box<dyn FnMut(&io::Error) + Send>),
}

impl Callback {
    /// The slot this callable's signature belongs to.
    #[must_use]
    pub fn slot(&self) -> Slot {
        match self {
            Callback::Connected(_) => Slot::Connected,
            Callback::Disconnected(_) => Slot::Disconnected,
            Callback::TransportError(_) => Slot::TransportError,
        }
    }
}

/// Errors raised when invoking a callback slot.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallbackError {
    /// No callback is registered in the slot.
    #[error("no callback registered for slot {slot:?}")]
    Vacant {
        /// Slot that was invoked.
        slot: Slot,
    },

    /// The registered callback does not carry the slot's signature.
    #[error("callback registered for slot {slot:?} has the wrong signature")]
    SignatureMismatch {
        /// Slot that was invoked.
        slot: Slot,
    },
}

/// Fixed-size table of tagged callbacks keyed by [`Slot`].
pub struct CallbackTable {
    slots: [Option<Callback>; Slot::COUNT],
}

impl CallbackTable {
    /// Create a table with every slot vacant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Store `callback` under `slot`, replacing any previous occupant.
    ///
    /// The tag is not required to match the slot here; a mismatch is
    /// logged and then rejected when the slot is invoked.
    pub fn register(&mut self, slot: Slot, callback: Callback) {
        if callback.slot() != slot {
            tracing::warn!(
                ?slot,
                registered = ?callback.slot(),
                "callback signature does not match its slot"
            );
        }
        self.slots[slot.index()] = Some(callback);
    }

    /// Remove the callback stored under `slot`.
    ///
    /// Returns whether the slot was occupied.
    pub fn deregister(&mut self, slot: Slot) -> bool { self.slots[slot.index()].take().is_some() }

    /// Whether `slot` holds a callback.
    #[must_use]
    pub fn is_registered(&self, slot: Slot) -> bool { self.slots[slot.index()].is_some() }

    /// Invoke the [`Slot::Connected`] callback with the peer address.
    ///
    /// # Errors
    ///
    /// Returns a [`CallbackError`] if the slot is vacant or holds a
    /// callable with a different signature.
    pub fn connected(&mut self, peer: SocketAddr) -> Result<(), CallbackError> {
        match self.slots[Slot::Connected.index()].as_mut() {
            Some(Callback::Connected(run)) => {
                run(peer);
                Ok(())
            }
            Some(_) => Err(CallbackError::SignatureMismatch {
                slot: Slot::Connected,
            }),
            None => Err(CallbackError::Vacant {
                slot: Slot::Connected,
            }),
        }
    }

    /// Invoke the [`Slot::Disconnected`] callback with the peer address.
    ///
    /// # Errors
    ///
    /// Returns a [`CallbackError`] if the slot is vacant or holds a
    /// callable with a different signature.
    pub fn disconnected(&mut self, peer: SocketAddr) -> Result<(), CallbackError> {
        match self.slots[Slot::Disconnected.index()].as_mut() {
            Some(Callback::Disconnected(run)) => {
                run(peer);
                Ok(())
            }
            Some(_) => Err(CallbackError::SignatureMismatch {
                slot: Slot::Disconnected,
            }),
            None => Err(CallbackError::Vacant {
                slot: Slot::Disconnected,
            }),
        }
    }

    /// Invoke the [`Slot::TransportError`] callback with the failure.
    ///
    /// # Errors
    ///
    /// Returns a [`CallbackError`] if the slot is vacant or holds a
    /// callable with a different signature.
    pub fn transport_error(&mut self, error: &io::Error) -> Result<(), CallbackError> {
        match self.slots[Slot::TransportError.index()].as_mut() {
            Some(Callback::TransportError(run)) => {
                run(error);
                Ok(())
            }
            Some(_) => Err(CallbackError::SignatureMismatch {
                slot: Slot::TransportError,
            }),
            None => Err(CallbackError::Vacant {
                slot: Slot::TransportError,
            }),
        }
    }
}

impl Default for CallbackTable {
    fn default() -> Self { Self::new() }
}
