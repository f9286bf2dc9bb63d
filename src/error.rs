use core::fmt;

use crate::io::err::{ReadError, WriteError};
use crate::store::StoreError;
use crate::alias::AliasError;
use crate::pid::PidError;

/// Top level error surfaced to users of [`crate::client::MqttClient`].
///
/// Mirrors the error taxonomy's split between synchronous action
/// failures (packet-size, no-free-id, protocol) and asynchronous ones
/// delivered through the error event (transport, decode, keep-alive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MqttError {
    /// Underlying stream I/O failed.
    Transport,
    /// A malformed header, varint, or property was decoded.
    Decode(DecodeError),
    /// A protocol invariant was violated (unmapped alias, duplicate
    /// unique property, qos=3, packet_id=0, ...).
    Protocol(&'static str),
    /// Encoded packet would exceed the configured or broker-announced
    /// maximum packet size.
    PacketTooLarge,
    /// The broker's CONNACK receive-maximum would be exceeded by
    /// another unacknowledged QoS>=1 publish.
    ReceiveMaximumExceeded,
    /// No free packet identifier is available.
    NoFreeId,
    /// No PINGRESP arrived within the configured deadline.
    KeepAliveTimeout,
    /// CONNACK carried a non-success reason/return code.
    ConnectRefused,
    /// The broker closed the connection.
    BrokerClosed,
    /// The in-flight store rejected an operation.
    Store(StoreError),
    /// A topic-alias table operation failed.
    Alias(AliasError),
    /// The packet-id allocator rejected an operation.
    Pid(PidError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    MalformedRemainingLength,
    ReservedFlag,
    UnknownProperty,
    DuplicateNonRepeatableProperty,
    InvalidUtf8,
    BufferTooSmall,
    UnexpectedEof,
}

impl fmt::Display for MqttError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MqttError::Transport => write!(f, "transport error"),
            MqttError::Decode(e) => write!(f, "decode error: {e:?}"),
            MqttError::Protocol(why) => write!(f, "protocol error: {why}"),
            MqttError::PacketTooLarge => write!(f, "packet exceeds maximum packet size"),
            MqttError::ReceiveMaximumExceeded => write!(f, "broker receive-maximum would be exceeded"),
            MqttError::NoFreeId => write!(f, "no free packet identifier"),
            MqttError::KeepAliveTimeout => write!(f, "keep-alive timeout"),
            MqttError::ConnectRefused => write!(f, "connect refused"),
            MqttError::BrokerClosed => write!(f, "broker closed the connection"),
            MqttError::Store(e) => write!(f, "store error: {e:?}"),
            MqttError::Alias(e) => write!(f, "alias error: {e:?}"),
            MqttError::Pid(e) => write!(f, "packet id error: {e:?}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MqttError {}

impl<E> From<ReadError<E>> for MqttError {
    fn from(e: ReadError<E>) -> Self {
        match e {
            ReadError::Network(_) => MqttError::Transport,
            ReadError::Eof => MqttError::BrokerClosed,
            ReadError::Malformed => MqttError::Decode(DecodeError::MalformedRemainingLength),
        }
    }
}

impl<E> From<WriteError<E>> for MqttError {
    fn from(e: WriteError<E>) -> Self {
        match e {
            WriteError::Network(_) => MqttError::Transport,
            WriteError::BufferTooSmall => MqttError::Decode(DecodeError::BufferTooSmall),
        }
    }
}

impl From<StoreError> for MqttError {
    fn from(e: StoreError) -> Self {
        MqttError::Store(e)
    }
}

impl From<AliasError> for MqttError {
    fn from(e: AliasError) -> Self {
        MqttError::Alias(e)
    }
}

impl From<PidError> for MqttError {
    fn from(e: PidError) -> Self {
        MqttError::Pid(e)
    }
}
