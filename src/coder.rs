//! Opaque message coding boundary.
//!
//! The framing layer treats message bodies as opaque bytes; a
//! [`MessageCoder`] turns them into typed messages and back. The default
//! [`BincodeCoder`] uses `bincode` with its standard configuration. With
//! the `coder-serde` feature enabled, [`SerdeBincodeCoder`] bridges Serde
//! types through the same format.
//!
//! Signature bytes never pass through the coder: they frame the encoded
//! body and are handed to the protocol verbatim for verification.

use std::marker::PhantomData;

use bincode::{
    Decode,
    Encode,
    config,
    decode_from_slice,
    encode_to_vec,
    error::{DecodeError, EncodeError},
};
use thiserror::Error;

/// Errors raised when coding message bodies.
#[derive(Debug, Error)]
pub enum CodeError {
    /// The message could not be encoded.
    #[error("encode failed: {0}")]
    Encode(#[from] EncodeError),

    /// The body could not be decoded.
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// The body decoded but left unconsumed bytes.
    ///
    /// A frame carries exactly one message, so trailing bytes mean the
    /// peer encoded something this side does not understand.
    #[error("message body left {trailing} undecoded bytes")]
    TrailingBytes {
        /// Number of bytes left after decoding.
        trailing: usize,
    },
}

/// Converts between typed messages and their encoded wire bodies.
///
/// Implementations are pure transformations with no framing knowledge:
/// the bytes handed to [`decode`](Self::decode) are exactly one message
/// body with marker, length lines, signature and terminator already
/// stripped.
pub trait MessageCoder: Send {
    /// Message type produced by decoding.
    type Message;

    /// Error type returned by `encode` and `decode`.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Encode `message` into its wire body.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be encoded.
    fn encode(&self, message: &Self::Message) -> Result<Vec<u8>, Self::Error>;

    /// Decode one message from `body`.
    ///
    /// The entire slice must be consumed; partial decodes are errors.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` does not hold exactly one message.
    fn decode(&self, body: &[u8]) -> Result<Self::Message, Self::Error>;
}

/// Coder using `bincode` with its standard configuration.
///
/// Any type deriving [`Encode`] and [`Decode`] can serve as the message
/// type.
///
/// # Examples
///
/// ```
/// use bincode::{Decode, Encode};
/// use syncwire::coder::{BincodeCoder, MessageCoder};
///
/// #[derive(Debug, PartialEq, Encode, Decode)]
/// struct Ping {
///     token: u32,
/// }
///
/// let coder = BincodeCoder::<Ping>::default();
/// let body = coder.encode(&Ping { token: 7 }).expect("encode should succeed");
/// let message = coder.decode(&body).expect("decode should succeed");
/// assert_eq!(message, Ping { token: 7 });
/// ```
pub struct BincodeCoder<M> {
    _marker: PhantomData<fn() -> M>,
}

impl<M> Default for BincodeCoder<M> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<M> Clone for BincodeCoder<M> {
    fn clone(&self) -> Self { Self::default() }
}

impl<M> std::fmt::Debug for BincodeCoder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BincodeCoder")
    }
}

impl<M> MessageCoder for BincodeCoder<M>
where
    M: Encode + Decode<()> + Send,
{
    type Message = M;
    type Error = CodeError;

    fn encode(&self, message: &M) -> Result<Vec<u8>, CodeError> {
        Ok(encode_to_vec(message, config::standard())?)
    }

    fn decode(&self, body: &[u8]) -> Result<M, CodeError> {
        let (message, consumed) = decode_from_slice(body, config::standard())?;
        let trailing = body.len() - consumed;
        if trailing != 0 {
            return Err(CodeError::TrailingBytes { trailing });
        }
        Ok(message)
    }
}

/// Coder passing encoded bodies through untouched.
///
/// Useful for protocols that perform their own message encoding and want
/// the dispatch layer to hand over raw bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawCoder;

impl MessageCoder for RawCoder {
    type Message = Vec<u8>;
    type Error = std::convert::Infallible;

    fn encode(&self, message: &Vec<u8>) -> Result<Vec<u8>, Self::Error> { Ok(message.clone()) }

    fn decode(&self, body: &[u8]) -> Result<Vec<u8>, Self::Error> { Ok(body.to_vec()) }
}

/// Coder bridging Serde types through bincode's standard configuration.
#[cfg(feature = "coder-serde")]
pub struct SerdeBincodeCoder<M> {
    _marker: PhantomData<fn() -> M>,
}

#[cfg(feature = "coder-serde")]
impl<M> Default for SerdeBincodeCoder<M> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

#[cfg(feature = "coder-serde")]
impl<M> MessageCoder for SerdeBincodeCoder<M>
where
    M: serde::Serialize + serde::de::DeserializeOwned + Send,
{
    type Message = M;
    type Error = CodeError;

    fn encode(&self, message: &M) -> Result<Vec<u8>, CodeError> {
        Ok(bincode::serde::encode_to_vec(message, config::standard())?)
    }

    fn decode(&self, body: &[u8]) -> Result<M, CodeError> {
        let (message, consumed) = bincode::serde::decode_from_slice(body, config::standard())?;
        let trailing = body.len() - consumed;
        if trailing != 0 {
            return Err(CodeError::TrailingBytes { trailing });
        }
        Ok(message)
    }
}
