use core::num::NonZeroU16;

use crate::types::reason_code::ReasonCode;

/// Every user-visible occurrence the engine produces, handed to a
/// user-provided handler or returned from a polled `next_event`.
/// Using one enum instead of per-event setter callbacks is the
/// design notes' explicit redesign of the source's pervasive
/// callback-handler pattern.
///
/// `Publish` owns its topic/payload (copied out of the connection
/// driver's single reusable read buffer) rather than borrowing from
/// it: the driver overwrites that buffer on the very next read, and
/// delivering acks for the same inbound publish needs to write to the
/// transport before the event is returned to the caller, which would
/// otherwise conflict with a live borrow of the read buffer.
#[derive(Debug, Clone)]
pub enum Event<const TOPIC_LEN: usize = 128, const PAYLOAD_LEN: usize = 512> {
    Connack {
        session_present: bool,
        reason_code: ReasonCode,
    },
    Publish {
        topic: heapless::String<TOPIC_LEN>,
        payload: heapless::Vec<u8, PAYLOAD_LEN>,
        qos: crate::types::qos::QoS,
        dup: bool,
        retain: bool,
        packet_id: Option<NonZeroU16>,
    },
    Puback {
        packet_id: NonZeroU16,
        reason_code: ReasonCode,
    },
    Pubrec {
        packet_id: NonZeroU16,
        reason_code: ReasonCode,
    },
    Pubrel {
        packet_id: NonZeroU16,
    },
    Pubcomp {
        packet_id: NonZeroU16,
        reason_code: ReasonCode,
    },
    Suback {
        packet_id: NonZeroU16,
    },
    Unsuback {
        packet_id: NonZeroU16,
    },
    Pingresp,
    Disconnect {
        reason_code: ReasonCode,
    },
    Close,
    Error(crate::error::MqttError),
    /// Fired after the engine writes the ack for an inbound QoS>=1
    /// publish, always after the corresponding Publish event's
    /// handler has returned (SPEC_FULL.md's resolved Open Question).
    PubResSent {
        packet_id: NonZeroU16,
    },
}

impl<const TOPIC_LEN: usize, const PAYLOAD_LEN: usize> Event<TOPIC_LEN, PAYLOAD_LEN> {
    pub(crate) fn publish_from(
        topic: &str,
        payload: &[u8],
        qos: crate::types::qos::QoS,
        dup: bool,
        retain: bool,
        packet_id: Option<NonZeroU16>,
    ) -> Result<Self, crate::error::MqttError> {
        let mut t = heapless::String::new();
        t.push_str(topic)
            .map_err(|_| crate::error::MqttError::PacketTooLarge)?;
        let mut p = heapless::Vec::new();
        p.extend_from_slice(payload)
            .map_err(|_| crate::error::MqttError::PacketTooLarge)?;
        Ok(Event::Publish {
            topic: t,
            payload: p,
            qos,
            dup,
            retain,
            packet_id,
        })
    }
}
