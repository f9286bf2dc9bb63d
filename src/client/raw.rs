use crate::header::HeaderState;
use crate::io::err::ReadError;
use crate::io::net::{NetState, NetStateError, Transport};
use crate::packet::Packet;
use crate::types::ProtocolVersion;

/// Adapts the engine's decoded-packet boundary onto a real byte
/// stream: a cancel-safe single-in-flight read loop built on
/// [`HeaderState`], and a body buffer sized by `MAX_PACKET`. Modeled
/// on the source's `client/raw` module -- `NetState` fault tracking,
/// one read future alive at a time, writes going straight to the
/// transport.
pub struct RawConnection<T: Transport, const MAX_PACKET: usize> {
    net: NetState<T>,
    header: HeaderState,
    body: [u8; MAX_PACKET],
    version: ProtocolVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawError<E> {
    Net(NetStateError),
    Read(ReadError<E>),
    PacketTooLarge,
}

impl<E> From<NetStateError> for RawError<E> {
    fn from(e: NetStateError) -> Self {
        RawError::Net(e)
    }
}

impl<E> From<ReadError<E>> for RawError<E> {
    fn from(e: ReadError<E>) -> Self {
        RawError::Read(e)
    }
}

impl<T: Transport, const MAX_PACKET: usize> RawConnection<T, MAX_PACKET> {
    pub fn new(transport: T, version: ProtocolVersion) -> Self {
        let mut net = NetState::default();
        let _ = net.replace(transport);
        RawConnection {
            net,
            header: HeaderState::new(),
            body: [0u8; MAX_PACKET],
            version,
        }
    }

    /// Reads and decodes exactly one control packet. Cancel-safe up to
    /// (not including) the point the body has been fully read: if this
    /// future is dropped mid fixed-header, [`HeaderState`] resumes
    /// cleanly on the next call; a cancellation mid-body currently
    /// restarts that packet's body read from scratch on redial, since
    /// the body buffer itself holds no partial-read cursor.
    pub async fn read_packet<const MAX_PROPS: usize, const MAX_FILTERS: usize>(
        &mut self,
    ) -> Result<Packet<'_, MAX_PROPS, MAX_FILTERS>, RawError<T::Error>> {
        let version = self.version;
        let header = loop {
            let transport = self.net.get()?;
            match self.header.update(transport).await {
                Ok(Some(h)) => break h,
                Ok(None) => continue,
                Err(e) => {
                    self.net.fail(crate::types::reason_code::ReasonCode::UnspecifiedError);
                    return Err(e.into());
                }
            }
        };

        let len = header.remaining_length as usize;
        if len > self.body.len() {
            self.net
                .fail(crate::types::reason_code::ReasonCode::PacketTooLarge);
            return Err(RawError::PacketTooLarge);
        }

        {
            let transport = self.net.get()?;
            let mut filled = 0;
            while filled < len {
                let n = transport
                    .read(&mut self.body[filled..len])
                    .await
                    .map_err(ReadError::Network)
                    .map_err(|e| {
                        RawError::Read(e)
                    })?;
                if n == 0 {
                    self.net
                        .fail(crate::types::reason_code::ReasonCode::UnspecifiedError);
                    return Err(RawError::Read(ReadError::Eof));
                }
                filled += n;
            }
        }

        Packet::decode(header, &self.body[..len], version)
            .map_err(|_| RawError::Read(ReadError::Malformed))
    }

    pub async fn write_all(&mut self, bytes: &[u8]) -> Result<(), RawError<T::Error>> {
        let transport = self.net.get()?;
        let mut written = 0;
        while written < bytes.len() {
            let n = transport
                .write(&bytes[written..])
                .await
                .map_err(ReadError::Network)
                .map_err(RawError::Read)?;
            if n == 0 {
                return Err(RawError::Read(ReadError::Eof));
            }
            written += n;
        }
        Ok(())
    }

    pub fn is_ok(&self) -> bool {
        self.net.is_ok()
    }

    /// Tears the connection down without sending DISCONNECT (abrupt
    /// close path); a graceful close writes DISCONNECT first via
    /// `write_all` and only then calls this.
    pub fn terminate(&mut self) {
        let _ = self.net.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io_adapters::tokio_1::FromTokio;

    #[tokio::test]
    async fn reads_pingreq_roundtrip() {
        let (client, mut server) = tokio::io::duplex(64);
        let client = FromTokio::new(client);
        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            server.write_all(&[0xC0, 0x00]).await.unwrap();
        });
        let mut conn: RawConnection<_, 32> = RawConnection::new(client, ProtocolVersion::V5);
        let packet: Packet<'_, 4, 4> = conn.read_packet().await.unwrap();
        assert_eq!(packet.packet_type(), crate::packet::PacketType::Pingreq);
    }

    #[tokio::test]
    async fn write_all_round_trips_bytes() {
        let (client, mut server) = tokio::io::duplex(64);
        let client = FromTokio::new(client);
        let mut conn: RawConnection<_, 32> = RawConnection::new(client, ProtocolVersion::V5);
        conn.write_all(&[0xC0, 0x00]).await.unwrap();
        let mut buf = [0u8; 2];
        use tokio::io::AsyncReadExt;
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0xC0, 0x00]);
    }
}
