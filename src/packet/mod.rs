pub mod ack;
pub mod auth;
pub mod connack;
pub mod connect;
pub mod disconnect;
pub mod packet_type;
pub mod ping;
pub mod publish;
pub mod subscribe;
pub mod unsubscribe;

pub use packet_type::PacketType;

use core::num::NonZeroU16;

use crate::header::FixedHeader;
use crate::io::err::BufferError;
use crate::io::read::BuffReader;
use crate::types::ProtocolVersion;

use ack::SimpleAck;
use auth::AuthPacket;
use connack::ConnackPacket;
use connect::ConnectPacket;
use disconnect::DisconnectPacket;
use ping::{PingreqPacket, PingrespPacket};
use publish::PublishPacket;
use subscribe::{SubackPacket, SubscribePacket};
use unsubscribe::{UnsubackPacket, UnsubscribePacket};

/// Every control packet kind the engine understands, decoded against
/// a specific capacity configuration. `MAX_PROPS` bounds any single
/// packet's property list; `MAX_FILTERS` bounds subscribe/suback/
/// unsubscribe/unsuback entry counts.
#[derive(Debug, Clone)]
pub enum Packet<'a, const MAX_PROPS: usize, const MAX_FILTERS: usize> {
    Connect(ConnectPacket<'a, MAX_PROPS>),
    Connack(ConnackPacket<'a, MAX_PROPS>),
    Publish(PublishPacket<'a, MAX_PROPS>),
    Puback(SimpleAck<'a, MAX_PROPS>),
    Pubrec(SimpleAck<'a, MAX_PROPS>),
    Pubrel(SimpleAck<'a, MAX_PROPS>),
    Pubcomp(SimpleAck<'a, MAX_PROPS>),
    Subscribe(SubscribePacket<'a, MAX_FILTERS, MAX_PROPS>),
    Suback(SubackPacket<'a, MAX_FILTERS, MAX_PROPS>),
    Unsubscribe(UnsubscribePacket<'a, MAX_FILTERS, MAX_PROPS>),
    Unsuback(UnsubackPacket<'a, MAX_FILTERS, MAX_PROPS>),
    Pingreq(PingreqPacket),
    Pingresp(PingrespPacket),
    Disconnect(DisconnectPacket<'a, MAX_PROPS>),
    Auth(AuthPacket<'a, MAX_PROPS>),
}

impl<'a, const MAX_PROPS: usize, const MAX_FILTERS: usize> Packet<'a, MAX_PROPS, MAX_FILTERS> {
    /// Decodes the variable header + payload given an already-read
    /// fixed header and the exact-length body slice.
    pub fn decode(
        header: FixedHeader,
        body: &'a [u8],
        version: ProtocolVersion,
    ) -> Result<Self, BufferError> {
        let mut r = BuffReader::new(body);
        Ok(match header.kind {
            PacketType::Connect => Packet::Connect(ConnectPacket::decode(&mut r)?),
            PacketType::Connack => Packet::Connack(ConnackPacket::decode(&mut r, version)?),
            PacketType::Publish => {
                Packet::Publish(PublishPacket::decode(&mut r, header.flags, version)?)
            }
            PacketType::Puback => Packet::Puback(SimpleAck::decode(&mut r, version)?),
            PacketType::Pubrec => Packet::Pubrec(SimpleAck::decode(&mut r, version)?),
            PacketType::Pubrel => Packet::Pubrel(SimpleAck::decode(&mut r, version)?),
            PacketType::Pubcomp => Packet::Pubcomp(SimpleAck::decode(&mut r, version)?),
            PacketType::Subscribe => Packet::Subscribe(SubscribePacket::decode(&mut r, version)?),
            PacketType::Suback => Packet::Suback(SubackPacket::decode(&mut r, version)?),
            PacketType::Unsubscribe => {
                Packet::Unsubscribe(UnsubscribePacket::decode(&mut r, version)?)
            }
            PacketType::Unsuback => Packet::Unsuback(UnsubackPacket::decode(&mut r, version)?),
            PacketType::Pingreq => Packet::Pingreq(PingreqPacket),
            PacketType::Pingresp => Packet::Pingresp(PingrespPacket),
            PacketType::Disconnect => Packet::Disconnect(DisconnectPacket::decode(&mut r, version)?),
            PacketType::Auth => Packet::Auth(AuthPacket::decode(&mut r)?),
        })
    }

    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Connect(_) => PacketType::Connect,
            Packet::Connack(_) => PacketType::Connack,
            Packet::Publish(_) => PacketType::Publish,
            Packet::Puback(_) => PacketType::Puback,
            Packet::Pubrec(_) => PacketType::Pubrec,
            Packet::Pubrel(_) => PacketType::Pubrel,
            Packet::Pubcomp(_) => PacketType::Pubcomp,
            Packet::Subscribe(_) => PacketType::Subscribe,
            Packet::Suback(_) => PacketType::Suback,
            Packet::Unsubscribe(_) => PacketType::Unsubscribe,
            Packet::Unsuback(_) => PacketType::Unsuback,
            Packet::Pingreq(_) => PacketType::Pingreq,
            Packet::Pingresp(_) => PacketType::Pingresp,
            Packet::Disconnect(_) => PacketType::Disconnect,
            Packet::Auth(_) => PacketType::Auth,
        }
    }
}

/// The kind of reply a stored C3 entry is waiting for; together with
/// the packet id this is the primary key the in-flight store indexes
/// by (invariant I1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedReply {
    Puback,
    Pubrec,
    Pubcomp,
    Suback,
    Unsuback,
}

impl ExpectedReply {
    pub fn matches(self, packet_type: PacketType) -> bool {
        matches!(
            (self, packet_type),
            (ExpectedReply::Puback, PacketType::Puback)
                | (ExpectedReply::Pubrec, PacketType::Pubrec)
                | (ExpectedReply::Pubcomp, PacketType::Pubcomp)
                | (ExpectedReply::Suback, PacketType::Suback)
                | (ExpectedReply::Unsuback, PacketType::Unsuback)
        )
    }
}

pub fn packet_id_of<const P: usize, const F: usize>(packet: &Packet<'_, P, F>) -> Option<NonZeroU16> {
    match packet {
        Packet::Publish(p) => p.packet_id,
        Packet::Puback(a) | Packet::Pubrec(a) | Packet::Pubrel(a) | Packet::Pubcomp(a) => {
            Some(a.packet_id)
        }
        Packet::Subscribe(s) => Some(s.packet_id),
        Packet::Suback(s) => Some(s.packet_id),
        Packet::Unsubscribe(u) => Some(u.packet_id),
        Packet::Unsuback(u) => Some(u.packet_id),
        _ => None,
    }
}
