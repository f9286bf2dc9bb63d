use core::num::NonZeroU16;

use crate::packet::ack::SimpleAck;
use crate::packet::connack::ConnackPacket;
use crate::packet::publish::PublishPacket;
use crate::packet::subscribe::SubackPacket;
use crate::packet::unsubscribe::UnsubackPacket;
use crate::packet::ExpectedReply;
use crate::session::Session;
use crate::types::qos::QoS;
use crate::types::reason_code::ReasonCode;

/// Connection lifecycle per §4.2: Idle -> Connecting -> Connected ->
/// Disconnecting -> Closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Idle,
    Connecting,
    Connected,
    Disconnecting,
    Closed,
}

/// Tracks inbound QoS 2 publishes that have been delivered but not
/// yet PUBCOMP'd, so a duplicate PUBREL (or a duplicate inbound
/// PUBLISH before the first PUBREC is acknowledged) never triggers a
/// second user delivery -- invariant I3 / testable property 7.
pub struct Qos2ReceiveGuard<const N: usize> {
    pending: heapless::Vec<NonZeroU16, N>,
}

impl<const N: usize> Default for Qos2ReceiveGuard<N> {
    fn default() -> Self {
        Qos2ReceiveGuard {
            pending: heapless::Vec::new(),
        }
    }
}

impl<const N: usize> Qos2ReceiveGuard<N> {
    /// Returns true the first time `id` is seen (caller should
    /// deliver to the user and emit PUBREC); false on any
    /// retransmission (caller re-emits PUBREC only, no redelivery).
    pub fn first_publish(&mut self, id: NonZeroU16) -> bool {
        if self.pending.contains(&id) {
            return false;
        }
        let _ = self.pending.push(id);
        true
    }

    /// Called on PUBREL: the handshake for `id` is complete, so a
    /// later PUBLISH with the same id is a fresh delivery again.
    pub fn complete(&mut self, id: NonZeroU16) {
        if let Some(idx) = self.pending.iter().position(|x| *x == id) {
            self.pending.swap_remove(idx);
        }
    }
}

pub struct Engine<
    const CLIENT_ID_LEN: usize,
    const IN_FLIGHT: usize,
    const MAX_ENTRY_LEN: usize,
    const MAX_ALIASES: usize,
    const MAX_TOPIC_LEN: usize,
    const QOS2_GUARD: usize,
> {
    pub state: ConnState,
    pub session: Session<CLIENT_ID_LEN, IN_FLIGHT, MAX_ENTRY_LEN, MAX_ALIASES, MAX_TOPIC_LEN>,
    pub auto_pub_response: bool,
    qos2_guard: Qos2ReceiveGuard<QOS2_GUARD>,
}

impl<
        const CLIENT_ID_LEN: usize,
        const IN_FLIGHT: usize,
        const MAX_ENTRY_LEN: usize,
        const MAX_ALIASES: usize,
        const MAX_TOPIC_LEN: usize,
        const QOS2_GUARD: usize,
    > Engine<CLIENT_ID_LEN, IN_FLIGHT, MAX_ENTRY_LEN, MAX_ALIASES, MAX_TOPIC_LEN, QOS2_GUARD>
{
    pub fn new(client_id: &str, clean_start: bool, auto_pub_response: bool) -> Self {
        Engine {
            state: ConnState::Idle,
            session: Session::new(client_id, clean_start),
            auto_pub_response,
            qos2_guard: Qos2ReceiveGuard::default(),
        }
    }

    pub fn begin_connecting(&mut self) {
        self.state = ConnState::Connecting;
    }

    /// §4.2 CONNACK handling: clear or resend depending on
    /// session-present and the prior CONNECT's clean_start. Returns
    /// whether the connect succeeded, the session-present flag, and
    /// the reason code -- the caller (which owns the `Event` type's
    /// buffer-size parameters) turns this into the user-facing event.
    pub fn on_connack<const P: usize>(&mut self, connack: &ConnackPacket<'_, P>) -> ConnackOutcome {
        if !connack.reason_code.is_success() {
            self.state = ConnState::Closed;
            return ConnackOutcome {
                accepted: false,
                session_present: connack.session_present,
                reason_code: connack.reason_code,
            };
        }
        self.state = ConnState::Connected;
        if !connack.session_present || self.session.clean_start {
            self.session.reset();
        }
        // Resend (invariant I4) is driven by the caller iterating
        // `self.session.store.for_each_in_order` after this call,
        // since re-sending means re-writing bytes to the transport --
        // an I/O action C7 performs, not a pure state transition.
        ConnackOutcome {
            accepted: true,
            session_present: connack.session_present,
            reason_code: connack.reason_code,
        }
    }

    /// §4.2 inbound PUBLISH. Returns the packet's fields plus, for
    /// QoS>=1, the ack the caller must write (acks are fire-and-forget
    /// from the store's point of view, only the *outbound* QoS>=1
    /// publishes are tracked in C3).
    pub fn on_publish_inbound<'a, const P: usize>(
        &mut self,
        publish: &PublishPacket<'a, P>,
    ) -> (PublishInfo<'a>, Option<PublishAck>) {
        let info = PublishInfo {
            topic: publish.topic.as_str(),
            payload: publish.payload,
            qos: publish.qos,
            dup: publish.dup,
            retain: publish.retain,
            packet_id: publish.packet_id,
        };
        let ack = match (publish.qos, publish.packet_id) {
            (QoS::AtMostOnce, _) => None,
            (QoS::AtLeastOnce, Some(id)) => Some(PublishAck::Puback(id)),
            (QoS::ExactlyOnce, Some(id)) => {
                let first = self.qos2_guard.first_publish(id);
                Some(PublishAck::Pubrec(id, first))
            }
            _ => None,
        };
        (info, ack)
    }

    /// §4.2 inbound PUBREL: always emit PUBCOMP; clear the dedup
    /// guard so a later fresh PUBLISH with the same id is accepted.
    pub fn on_pubrel_inbound(&mut self, id: NonZeroU16) {
        self.qos2_guard.complete(id);
    }

    pub fn on_puback<const P: usize>(&mut self, ack: &SimpleAck<'_, P>) -> bool {
        let existed = self.session.store.remove(ack.packet_id, ExpectedReply::Puback);
        if existed {
            let _ = self.session.pids.release(ack.packet_id);
        }
        existed
    }

    /// §4.2 inbound PUBREC: remove the (id, pubrec) entry, caller
    /// must then write PUBREL and insert a new (id, pubcomp) entry
    /// carrying those bytes (I4) -- the caller does the I/O + store
    /// insert, this just reports what happened to the old entry.
    pub fn on_pubrec<const P: usize>(&mut self, ack: &SimpleAck<'_, P>) -> bool {
        self.session.store.remove(ack.packet_id, ExpectedReply::Pubrec)
    }

    pub fn on_pubcomp<const P: usize>(&mut self, ack: &SimpleAck<'_, P>) -> bool {
        let existed = self.session.store.remove(ack.packet_id, ExpectedReply::Pubcomp);
        if existed {
            let _ = self.session.pids.release(ack.packet_id);
        }
        existed
    }

    pub fn on_suback<const P: usize, const F: usize>(&mut self, suback: &SubackPacket<'_, F, P>) -> bool {
        let existed = self.session.store.remove(suback.packet_id, ExpectedReply::Suback);
        if existed {
            let _ = self.session.pids.release(suback.packet_id);
        }
        existed
    }

    pub fn on_unsuback<const P: usize, const F: usize>(
        &mut self,
        unsuback: &UnsubackPacket<'_, F, P>,
    ) -> bool {
        let existed = self
            .session
            .store
            .remove(unsuback.packet_id, ExpectedReply::Unsuback);
        if existed {
            let _ = self.session.pids.release(unsuback.packet_id);
        }
        existed
    }

    pub fn on_disconnect_inbound(&mut self) {
        self.state = ConnState::Closed;
    }

    pub fn begin_disconnecting(&mut self) {
        self.state = ConnState::Disconnecting;
    }

    pub fn close(&mut self) {
        self.state = ConnState::Closed;
    }
}

/// Outcome of processing an inbound CONNACK.
#[derive(Debug, Clone, Copy)]
pub struct ConnackOutcome {
    pub accepted: bool,
    pub session_present: bool,
    pub reason_code: ReasonCode,
}

/// An inbound publish's fields, borrowed from the connection driver's
/// read buffer for just long enough for the caller to copy them into
/// an owned `Event`.
#[derive(Debug, Clone, Copy)]
pub struct PublishInfo<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub qos: QoS,
    pub dup: bool,
    pub retain: bool,
    pub packet_id: Option<NonZeroU16>,
}

/// What the caller must write back in response to an inbound publish.
#[derive(Debug, Clone, Copy)]
pub enum PublishAck {
    Puback(NonZeroU16),
    /// `bool` is whether this is the first PUBREC for this id (a
    /// retransmitted PUBLISH before PUBREL still gets a PUBREC, but
    /// does not re-trigger delivery).
    Pubrec(NonZeroU16, bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qos2_guard_delivers_once() {
        let mut guard: Qos2ReceiveGuard<4> = Qos2ReceiveGuard::default();
        let id = NonZeroU16::new(5).unwrap();
        assert!(guard.first_publish(id));
        assert!(!guard.first_publish(id));
        guard.complete(id);
        assert!(guard.first_publish(id));
    }

    #[test]
    fn connack_success_transitions_to_connected() {
        let mut engine: Engine<32, 4, 32, 4, 32, 4> = Engine::new("client1", true, true);
        engine.begin_connecting();
        let connack: ConnackPacket<4> = ConnackPacket {
            session_present: false,
            reason_code: ReasonCode::Success,
            properties: heapless::Vec::new(),
        };
        let _ = engine.on_connack(&connack);
        assert_eq!(engine.state, ConnState::Connected);
    }

    #[test]
    fn connack_failure_closes() {
        let mut engine: Engine<32, 4, 32, 4, 32, 4> = Engine::new("client1", true, true);
        engine.begin_connecting();
        let connack: ConnackPacket<4> = ConnackPacket {
            session_present: false,
            reason_code: ReasonCode::NotAuthorized,
            properties: heapless::Vec::new(),
        };
        let _ = engine.on_connack(&connack);
        assert_eq!(engine.state, ConnState::Closed);
    }
}
