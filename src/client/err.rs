use crate::error::MqttError;

/// Outcome of a user-facing client action (`publish`, `subscribe`,
/// ...): either the action was accepted (and its completion will show
/// up later as an `Event`), or it failed synchronously -- a full
/// in-flight store, an exhausted packet-id table, or a disconnected
/// transport never reach the wire at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientError {
    NotConnected,
    InFlightFull,
    NoFreeId,
    EncodeBufferTooSmall,
    Mqtt(MqttError),
}

impl From<MqttError> for ClientError {
    fn from(e: MqttError) -> Self {
        ClientError::Mqtt(e)
    }
}

impl From<crate::pid::PidError> for ClientError {
    fn from(e: crate::pid::PidError) -> Self {
        match e {
            crate::pid::PidError::NoFreeId => ClientError::NoFreeId,
            _ => ClientError::Mqtt(MqttError::Pid(e)),
        }
    }
}

impl From<crate::store::StoreError> for ClientError {
    fn from(e: crate::store::StoreError) -> Self {
        match e {
            crate::store::StoreError::Full => ClientError::InFlightFull,
            crate::store::StoreError::Duplicate => ClientError::Mqtt(MqttError::Store(e)),
        }
    }
}

impl From<crate::io::err::BufferError> for ClientError {
    fn from(_: crate::io::err::BufferError) -> Self {
        ClientError::EncodeBufferTooSmall
    }
}

impl From<crate::alias::AliasError> for ClientError {
    fn from(e: crate::alias::AliasError) -> Self {
        ClientError::Mqtt(MqttError::Alias(e))
    }
}
