use embedded_io_async::{Read, Write};

/// Capability set the connection driver needs from a byte stream.
/// Implemented for plain TCP, TLS-wrapped, and WS-wrapped streams
/// alike -- the driver is generic over this trait and dispatches to
/// the concrete transport once per connection, never per packet.
pub trait Transport: Read + Write {}

impl<T: Read + Write> Transport for T {}

/// Tracks whether the underlying stream is usable, has faulted with a
/// reason, or has been torn down. Distinct from the protocol state
/// machine (C2): this is purely "can I still call read/write on this
/// socket."
pub enum NetState<N> {
    Ok(N),
    Faulted(N, crate::types::reason_code::ReasonCode),
    Terminated,
}

impl<N> Default for NetState<N> {
    fn default() -> Self {
        NetState::Terminated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetStateError {
    Terminated,
    Faulted,
}

impl<N> NetState<N> {
    pub fn is_ok(&self) -> bool {
        matches!(self, NetState::Ok(_))
    }

    pub fn replace(&mut self, net: N) -> Self {
        core::mem::replace(self, NetState::Ok(net))
    }

    pub fn get(&mut self) -> Result<&mut N, NetStateError> {
        match self {
            NetState::Ok(n) => Ok(n),
            NetState::Faulted(_, _) => Err(NetStateError::Faulted),
            NetState::Terminated => Err(NetStateError::Terminated),
        }
    }

    pub fn fail(&mut self, reason: crate::types::reason_code::ReasonCode) {
        if let NetState::Ok(n) = core::mem::take(self) {
            *self = NetState::Faulted(n, reason);
        }
    }

    pub fn terminate(&mut self) -> Self {
        core::mem::take(self)
    }
}
