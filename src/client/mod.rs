pub mod config;
pub mod engine;
pub mod err;
pub mod event;
pub mod raw;

use core::num::NonZeroU16;

pub use config::ClientConfig;
pub use err::ClientError;
pub use event::Event;

use crate::error::MqttError;
use crate::io::net::Transport;
use crate::io::write::BuffWriter;
use crate::packet::ack::SimpleAck;
use crate::packet::connect::ConnectPacket;
use crate::packet::ping::PingreqPacket;
use crate::packet::subscribe::{SubscribeEntry, SubscribePacket};
use crate::packet::unsubscribe::UnsubscribePacket;
use crate::packet::{ExpectedReply, Packet, PacketType};
use crate::property::Property;
use crate::session::Session;
use crate::types::int::VarByteInt;
use crate::types::qos::QoS;
use crate::types::string::MqttString;
use crate::types::topic::{TopicFilter, TopicName};
use crate::types::ProtocolVersion;

use engine::{ConnState, Engine, PublishAck};
use raw::{RawConnection, RawError};

const TOPIC_LEN: usize = 128;
const PAYLOAD_LEN: usize = 1024;

/// Default broker receive-maximum/maximum-packet-size assumed until
/// CONNACK says otherwise, per the v5 property table's "absent means
/// unlimited / 65535" defaults.
const DEFAULT_RECEIVE_MAXIMUM: u16 = 65_535;
const DEFAULT_MAX_PACKET_SIZE: u32 = u32::MAX;

fn raw_to_mqtt<E>(e: RawError<E>) -> MqttError {
    match e {
        RawError::Net(_) => MqttError::Transport,
        RawError::PacketTooLarge => MqttError::PacketTooLarge,
        RawError::Read(r) => r.into(),
    }
}

/// Ties the wire codec (C1), protocol state machine (C2), connection
/// driver (C7), and session/store/alias state together behind the
/// single surface a caller drives: connect once, then repeatedly
/// either hand inbound bytes to [`MqttClient::next_event`] or call an
/// action method (`publish`, `subscribe`, ...).
pub struct MqttClient<
    T: Transport,
    const MAX_PACKET: usize,
    const MAX_PROPS: usize,
    const MAX_FILTERS: usize,
    const CLIENT_ID_LEN: usize,
    const IN_FLIGHT: usize,
    const MAX_ENTRY_LEN: usize,
    const MAX_ALIASES: usize,
    const MAX_TOPIC_LEN: usize,
    const QOS2_GUARD: usize,
> {
    raw: RawConnection<T, MAX_PACKET>,
    engine: Engine<CLIENT_ID_LEN, IN_FLIGHT, MAX_ENTRY_LEN, MAX_ALIASES, MAX_TOPIC_LEN, QOS2_GUARD>,
    version: ProtocolVersion,
    auto_pub_response: bool,
    /// Broker's CONNACK-announced cap on concurrent unacknowledged
    /// outbound QoS>=1 publishes (C3 flow control, SPEC_FULL.md §3
    /// "Receive-maximum flow control"); `publish` enforces it
    /// synchronously against `session.store.qos_publish_count()`.
    broker_receive_maximum: u16,
    /// Broker's CONNACK-announced cap on the size of a packet this
    /// client may send it; `publish` enforces it synchronously
    /// (testable property 4 / S10).
    broker_max_packet_size: u32,
    encode_buf: [u8; MAX_PACKET],
    #[cfg(feature = "tokio")]
    timers: crate::timers::TimerSet,
    #[cfg(feature = "tokio")]
    pingresp_timeout_ms: u32,
    #[cfg(feature = "tokio")]
    awaiting_pingresp: bool,
}

impl<
        T: Transport,
        const MAX_PACKET: usize,
        const MAX_PROPS: usize,
        const MAX_FILTERS: usize,
        const CLIENT_ID_LEN: usize,
        const IN_FLIGHT: usize,
        const MAX_ENTRY_LEN: usize,
        const MAX_ALIASES: usize,
        const MAX_TOPIC_LEN: usize,
        const QOS2_GUARD: usize,
    >
    MqttClient<
        T,
        MAX_PACKET,
        MAX_PROPS,
        MAX_FILTERS,
        CLIENT_ID_LEN,
        IN_FLIGHT,
        MAX_ENTRY_LEN,
        MAX_ALIASES,
        MAX_TOPIC_LEN,
        QOS2_GUARD,
    >
{
    /// Performs the CONNECT/CONNACK handshake and returns a ready
    /// client plus the Connack event (session-present / reason code).
    pub async fn connect<'cfg>(
        transport: T,
        config: &ClientConfig<'cfg, CLIENT_ID_LEN>,
    ) -> Result<(Self, Event<TOPIC_LEN, PAYLOAD_LEN>), ClientError> {
        let engine: Engine<
            CLIENT_ID_LEN,
            IN_FLIGHT,
            MAX_ENTRY_LEN,
            MAX_ALIASES,
            MAX_TOPIC_LEN,
            QOS2_GUARD,
        > = Engine::new(config.client_id.as_str(), config.clean_start, config.auto_pub_response);
        Self::handshake(transport, config, engine).await
    }

    /// Resumes a session retained across a prior disconnect (see
    /// [`MqttClient::into_session`]) instead of building a fresh one.
    /// Performs the same CONNECT/CONNACK handshake as
    /// [`MqttClient::connect`]; if the broker's CONNACK reports
    /// session-present (and the handshake didn't request clean_start,
    /// which would make session-present moot), every entry still held
    /// in the resumed session's in-flight store is resent in
    /// chronological order with `dup=1` before this returns (invariant
    /// I4, testable property 5, scenario S5).
    pub async fn reconnect<'cfg>(
        transport: T,
        config: &ClientConfig<'cfg, CLIENT_ID_LEN>,
        session: Session<CLIENT_ID_LEN, IN_FLIGHT, MAX_ENTRY_LEN, MAX_ALIASES, MAX_TOPIC_LEN>,
    ) -> Result<(Self, Event<TOPIC_LEN, PAYLOAD_LEN>), ClientError> {
        let mut engine: Engine<
            CLIENT_ID_LEN,
            IN_FLIGHT,
            MAX_ENTRY_LEN,
            MAX_ALIASES,
            MAX_TOPIC_LEN,
            QOS2_GUARD,
        > = Engine::new(config.client_id.as_str(), config.clean_start, config.auto_pub_response);
        engine.session = session;
        // `on_connack` decides whether to keep or drop the resumed
        // session by reading `session.clean_start` -- that field must
        // track *this* handshake's CONNECT flag, not whatever the
        // session's previous connection used it for.
        engine.session.clean_start = config.clean_start;
        Self::handshake(transport, config, engine).await
    }

    /// Hands back this (disconnected) client's session so a caller can
    /// pass it to [`MqttClient::reconnect`] later. Consumes the client
    /// since a `RawConnection` can't be detached from its transport.
    pub fn into_session(
        self,
    ) -> Session<CLIENT_ID_LEN, IN_FLIGHT, MAX_ENTRY_LEN, MAX_ALIASES, MAX_TOPIC_LEN> {
        self.engine.session
    }

    async fn handshake<'cfg>(
        transport: T,
        config: &ClientConfig<'cfg, CLIENT_ID_LEN>,
        mut engine: Engine<
            CLIENT_ID_LEN,
            IN_FLIGHT,
            MAX_ENTRY_LEN,
            MAX_ALIASES,
            MAX_TOPIC_LEN,
            QOS2_GUARD,
        >,
    ) -> Result<(Self, Event<TOPIC_LEN, PAYLOAD_LEN>), ClientError> {
        let mut raw: RawConnection<T, MAX_PACKET> = RawConnection::new(transport, config.version);
        engine.begin_connecting();
        engine.session.expiry_interval = config.session_expiry_interval;

        let mut body_buf = [0u8; MAX_PACKET];
        let client_id = MqttString::new(config.client_id.as_str()).map_err(ClientError::from)?;
        let mut connect: ConnectPacket<MAX_PROPS> =
            ConnectPacket::new(config.version, client_id, config.keep_alive_sec);
        connect.clean_start = config.clean_start;
        if let (Some(u), Some(p)) = (config.username, config.password) {
            connect.username = Some(MqttString::new(u).map_err(ClientError::from)?);
            connect.password = Some(p);
        }
        connect.will = config.will.clone();
        if config.version == ProtocolVersion::V5 {
            if config.topic_alias_maximum > 0 {
                connect
                    .properties
                    .push(Property::TopicAliasMaximum(config.topic_alias_maximum))
                    .map_err(|_| ClientError::EncodeBufferTooSmall)?;
            }
            if config.session_expiry_interval > 0 {
                connect
                    .properties
                    .push(Property::SessionExpiryInterval(config.session_expiry_interval))
                    .map_err(|_| ClientError::EncodeBufferTooSmall)?;
            }
            if config.receive_maximum != DEFAULT_RECEIVE_MAXIMUM {
                connect
                    .properties
                    .push(Property::ReceiveMaximum(config.receive_maximum))
                    .map_err(|_| ClientError::EncodeBufferTooSmall)?;
            }
            // Unlike receive_maximum/session_expiry_interval, this field
            // has no "unset" value distinct from its default -- it's
            // always this client's real receive limit, so it's always
            // worth declaring.
            connect
                .properties
                .push(Property::MaximumPacketSize(config.max_packet_size_recv))
                .map_err(|_| ClientError::EncodeBufferTooSmall)?;
        }

        let len = {
            let mut w = BuffWriter::new(&mut body_buf);
            connect.encode(&mut w).map_err(ClientError::from)?;
            w.position()
        };
        write_fixed(&mut raw, PacketType::Connect, 0, &body_buf[..len])
            .await
            .map_err(raw_to_mqtt)?;

        let (outcome, broker_alias_max, broker_receive_maximum, broker_max_packet_size) = loop {
            let packet: Packet<'_, MAX_PROPS, MAX_FILTERS> =
                raw.read_packet().await.map_err(raw_to_mqtt)?;
            if let Packet::Connack(connack) = packet {
                let alias_max = connack
                    .properties
                    .iter()
                    .find_map(|p| match p {
                        Property::TopicAliasMaximum(n) => Some(*n),
                        _ => None,
                    })
                    .unwrap_or(0);
                let receive_maximum = connack
                    .properties
                    .iter()
                    .find_map(|p| match p {
                        Property::ReceiveMaximum(n) => Some(*n),
                        _ => None,
                    })
                    .unwrap_or(DEFAULT_RECEIVE_MAXIMUM);
                let max_packet_size = connack
                    .properties
                    .iter()
                    .find_map(|p| match p {
                        Property::MaximumPacketSize(n) => Some(*n),
                        _ => None,
                    })
                    .unwrap_or(DEFAULT_MAX_PACKET_SIZE);
                break (
                    engine.on_connack(&connack),
                    alias_max,
                    receive_maximum,
                    max_packet_size,
                );
            }
        };
        if !outcome.accepted {
            return Err(ClientError::Mqtt(MqttError::ConnectRefused));
        }
        let resend_needed = outcome.session_present && !engine.session.clean_start;

        // Broker-announced topic-alias-maximum bounds what this client
        // may assign on outbound publishes; this client's own advertised
        // maximum (just sent in CONNECT above) bounds the receive table
        // the broker maps inbound publishes into.
        engine.session.send_aliases.set_max_alias(broker_alias_max);
        engine.session.send_aliases.set_auto_map(config.auto_map_topic_alias);
        engine.session.send_aliases.set_auto_replace(config.auto_replace_topic_alias);
        engine.session.receive_aliases.set_max_alias(config.topic_alias_maximum);

        #[cfg(feature = "tokio")]
        let mut timers = crate::timers::TimerSet::new();
        #[cfg(feature = "tokio")]
        if config.ping_interval_ms > 0 {
            timers.arm_keep_alive(core::time::Duration::from_millis(config.ping_interval_ms as u64));
        }

        let mut client = MqttClient {
            raw,
            engine,
            version: config.version,
            auto_pub_response: config.auto_pub_response,
            broker_receive_maximum,
            broker_max_packet_size,
            encode_buf: [0u8; MAX_PACKET],
            #[cfg(feature = "tokio")]
            timers,
            #[cfg(feature = "tokio")]
            pingresp_timeout_ms: config.pingresp_timeout_ms,
            #[cfg(feature = "tokio")]
            awaiting_pingresp: false,
        };
        if resend_needed {
            client.resend_in_flight().await?;
        }
        let event = Event::Connack {
            session_present: outcome.session_present,
            reason_code: outcome.reason_code,
        };
        Ok((client, event))
    }

    /// Resends every entry still tracked in the in-flight store (I4),
    /// oldest-insertion-first per [`crate::store::InFlightStore::for_each_in_order`].
    /// Each entry's original fixed-header flags (retain/QoS for
    /// PUBLISH, the fixed flags for everything else) are reused as-is,
    /// with the dup bit forced on for resent PUBLISH entries. Called
    /// once from [`MqttClient::handshake`] after a `reconnect` whose
    /// CONNACK reported session-present.
    async fn resend_in_flight(&mut self) -> Result<(), ClientError> {
        let mut entries: heapless::Vec<(ExpectedReply, u8, heapless::Vec<u8, MAX_ENTRY_LEN>), IN_FLIGHT> =
            heapless::Vec::new();
        self.engine.session.store.for_each_in_order(|e| {
            let _ = entries.push((e.expected_reply, e.flags, e.bytes.clone()));
        });
        for (reply, flags, bytes) in entries {
            let kind = match reply {
                ExpectedReply::Puback | ExpectedReply::Pubrec => PacketType::Publish,
                ExpectedReply::Pubcomp => PacketType::Pubrel,
                ExpectedReply::Suback => PacketType::Subscribe,
                ExpectedReply::Unsuback => PacketType::Unsubscribe,
            };
            let flags = if kind == PacketType::Publish { flags | 0b1000 } else { flags };
            write_fixed(&mut self.raw, kind, flags, &bytes)
                .await
                .map_err(raw_to_mqtt)?;
        }
        Ok(())
    }

    /// Reads and dispatches exactly one inbound packet, returning the
    /// user event (and, for inbound QoS>=1 publishes whose ack this
    /// client auto-sends, writing that ack before returning). This is
    /// the polled delivery mode; [`MqttClient::run`] wraps it for
    /// callers that prefer a handler closure instead.
    pub async fn next_event(&mut self) -> Result<Event<TOPIC_LEN, PAYLOAD_LEN>, ClientError> {
        enum PendingAck {
            None,
            Publish(PublishAck),
            Pubrel(NonZeroU16),
            Pubcomp(NonZeroU16),
        }

        let (event, pending_ack) = {
            let packet: Packet<'_, MAX_PROPS, MAX_FILTERS> =
                self.raw.read_packet().await.map_err(raw_to_mqtt)?;
            match packet {
                Packet::Publish(p) => {
                    let topic_alias = p.properties.iter().find_map(|prop| match prop {
                        Property::TopicAlias(a) => Some(*a),
                        _ => None,
                    });
                    let (info, ack) = self.engine.on_publish_inbound(&p);
                    // Topic-alias resolution (C5): an empty wire topic
                    // plus an alias property means "same topic as the
                    // last publish that registered this alias"; a
                    // non-empty topic alongside an alias (re-)registers
                    // it. Resolve before `Event::publish_from` copies
                    // the topic into the event's owned buffer, so the
                    // event always carries the real topic regardless of
                    // which form the broker sent.
                    let mut resolved: heapless::String<MAX_TOPIC_LEN> = heapless::String::new();
                    let topic_str: &str = match topic_alias {
                        Some(alias) if info.topic.is_empty() => {
                            let t = self
                                .engine
                                .session
                                .receive_aliases
                                .resolve(alias)
                                .map_err(ClientError::from)?;
                            resolved
                                .push_str(t)
                                .map_err(|_| ClientError::EncodeBufferTooSmall)?;
                            resolved.as_str()
                        }
                        Some(alias) => {
                            self.engine
                                .session
                                .receive_aliases
                                .register(alias, info.topic)
                                .map_err(ClientError::from)?;
                            info.topic
                        }
                        None => info.topic,
                    };
                    let event = Event::publish_from(
                        topic_str,
                        info.payload,
                        info.qos,
                        info.dup,
                        info.retain,
                        info.packet_id,
                    )?;
                    (event, ack.map(PendingAck::Publish).unwrap_or(PendingAck::None))
                }
                Packet::Puback(a) => {
                    self.engine.on_puback(&a);
                    (
                        Event::Puback { packet_id: a.packet_id, reason_code: a.reason_code },
                        PendingAck::None,
                    )
                }
                Packet::Pubrec(a) => {
                    let had_entry = self.engine.on_pubrec(&a);
                    (
                        Event::Pubrec { packet_id: a.packet_id, reason_code: a.reason_code },
                        if had_entry { PendingAck::Pubrel(a.packet_id) } else { PendingAck::None },
                    )
                }
                Packet::Pubrel(a) => {
                    self.engine.on_pubrel_inbound(a.packet_id);
                    (
                        Event::Pubrel { packet_id: a.packet_id },
                        PendingAck::Pubcomp(a.packet_id),
                    )
                }
                Packet::Pubcomp(a) => {
                    self.engine.on_pubcomp(&a);
                    (
                        Event::Pubcomp { packet_id: a.packet_id, reason_code: a.reason_code },
                        PendingAck::None,
                    )
                }
                Packet::Suback(s) => {
                    self.engine.on_suback(&s);
                    (Event::Suback { packet_id: s.packet_id }, PendingAck::None)
                }
                Packet::Unsuback(u) => {
                    self.engine.on_unsuback(&u);
                    (Event::Unsuback { packet_id: u.packet_id }, PendingAck::None)
                }
                Packet::Pingresp(_) => {
                    #[cfg(feature = "tokio")]
                    {
                        self.timers.disarm_ping_deadline();
                        self.awaiting_pingresp = false;
                    }
                    (Event::Pingresp, PendingAck::None)
                }
                Packet::Disconnect(d) => {
                    self.engine.on_disconnect_inbound();
                    (Event::Disconnect { reason_code: d.reason_code }, PendingAck::None)
                }
                _ => (Event::Close, PendingAck::None),
            }
        };

        if self.auto_pub_response {
            match pending_ack {
                PendingAck::None => {}
                PendingAck::Publish(ack) => self.send_publish_ack(ack).await?,
                PendingAck::Pubrel(id) => self.send_pubrel_tracked(id).await?,
                PendingAck::Pubcomp(id) => self.send_simple_ack(PacketType::Pubcomp, id).await?,
            }
        }

        Ok(event)
    }

    /// Callback delivery mode: drives [`MqttClient::next_event`] in a
    /// loop, calling `handler` with each event in turn (awaited before
    /// the next packet is read, so a QoS>=1 publish's ack is never
    /// written ahead of the handler seeing the matching `Publish`
    /// event). Returns on the first transport/protocol error, or once
    /// an `Event::Close` has been delivered to the handler.
    pub async fn run<F>(&mut self, mut handler: F) -> Result<(), ClientError>
    where
        F: FnMut(Event<TOPIC_LEN, PAYLOAD_LEN>),
    {
        loop {
            let event = self.next_event().await?;
            let is_close = matches!(event, Event::Close);
            handler(event);
            if is_close {
                return Ok(());
            }
        }
    }

    async fn send_publish_ack(&mut self, ack: PublishAck) -> Result<(), ClientError> {
        match ack {
            PublishAck::Puback(id) => self.send_simple_ack(PacketType::Puback, id).await,
            PublishAck::Pubrec(id, _first) => self.send_simple_ack(PacketType::Pubrec, id).await,
        }
    }

    async fn send_simple_ack(&mut self, kind: PacketType, id: NonZeroU16) -> Result<(), ClientError> {
        let ack: SimpleAck<MAX_PROPS> = SimpleAck::new(id);
        let flags = if kind == PacketType::Pubrel { 0b0010 } else { 0 };
        let len = {
            let mut w = BuffWriter::new(&mut self.encode_buf);
            ack.encode(&mut w, self.version).map_err(ClientError::from)?;
            w.position()
        };
        let mut body: heapless::Vec<u8, MAX_PACKET> = heapless::Vec::new();
        body
            .extend_from_slice(&self.encode_buf[..len])
            .map_err(|_| ClientError::EncodeBufferTooSmall)?;
        write_fixed(&mut self.raw, kind, flags, &body)
            .await
            .map_err(raw_to_mqtt)?;
        Ok(())
    }

    /// Publishes at the requested QoS. Returns the allocated packet id
    /// for QoS>=1 (None for QoS 0, which is fire-and-forget).
    pub async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<Option<NonZeroU16>, ClientError> {
        if self.engine.state != ConnState::Connected {
            return Err(ClientError::NotConnected);
        }
        if qos.requires_packet_id()
            && self.engine.session.store.qos_publish_count() >= self.broker_receive_maximum as usize
        {
            return Err(ClientError::Mqtt(MqttError::ReceiveMaximumExceeded));
        }
        let packet_id = if qos.requires_packet_id() {
            Some(self.engine.session.pids.acquire().map_err(ClientError::from)?)
        } else {
            None
        };
        // Topic-alias substitution (C5): once `topic` has a mapped
        // alias and auto-replace is on, subsequent publishes carry the
        // empty topic name plus the alias property instead of the full
        // string; otherwise an auto-mapped alias still goes out
        // alongside the full topic so the broker can learn it.
        let mut alias_props: heapless::Vec<Property<'_>, MAX_PROPS> = heapless::Vec::new();
        let mut wire_topic = topic;
        if self.version == ProtocolVersion::V5 {
            if let Some(alias) = self.engine.session.send_aliases.replacement_alias(topic) {
                wire_topic = "";
                alias_props
                    .push(Property::TopicAlias(alias))
                    .map_err(|_| ClientError::EncodeBufferTooSmall)?;
            } else if let Ok(alias) = self.engine.session.send_aliases.auto_map_topic(topic) {
                alias_props
                    .push(Property::TopicAlias(alias))
                    .map_err(|_| ClientError::EncodeBufferTooSmall)?;
            }
        }
        let topic_name = if wire_topic.is_empty() {
            TopicName::empty()
        } else {
            TopicName::new(wire_topic).map_err(ClientError::from)?
        };
        let publish: crate::packet::publish::PublishPacket<MAX_PROPS> =
            crate::packet::publish::PublishPacket {
                topic: topic_name,
                packet_id,
                qos,
                dup: false,
                retain,
                payload,
                properties: alias_props,
            };
        let flags = publish.flags();
        let len = {
            let mut w = BuffWriter::new(&mut self.encode_buf);
            publish.encode(&mut w, self.version).map_err(ClientError::from)?;
            w.position()
        };

        // Testable property 4 / S10: reject synchronously, before the
        // packet ever reaches the wire, rather than letting the broker
        // close the connection over it.
        let vbi_len = VarByteInt::new(len as u32)
            .ok_or(ClientError::EncodeBufferTooSmall)?
            .encoded_len();
        if 1 + vbi_len + len > self.broker_max_packet_size as usize {
            if let Some(id) = packet_id {
                self.engine.session.pids.release(id).ok();
            }
            return Err(ClientError::Mqtt(MqttError::PacketTooLarge));
        }

        if let Some(id) = packet_id {
            let expected = if qos == QoS::AtLeastOnce {
                ExpectedReply::Puback
            } else {
                ExpectedReply::Pubrec
            };
            self.engine
                .session
                .store
                .insert(id, expected, &self.encode_buf[..len], flags, 0)
                .map_err(ClientError::from)?;
        }

        write_fixed(&mut self.raw, PacketType::Publish, flags, &self.encode_buf[..len])
            .await
            .map_err(raw_to_mqtt)?;
        Ok(packet_id)
    }

    /// Answers an inbound PUBREC with PUBREL when `auto_pub_response`
    /// is disabled and the caller drives the QoS2 handshake manually.
    /// By the time the caller sees the matching `Event::Pubrec`, the
    /// (id, pubrec) store entry is already gone (`next_event` removes
    /// it unconditionally); this inserts the replacement (id, pubcomp)
    /// entry carrying the PUBREL bytes (I4) before writing them.
    pub async fn send_pubrel(&mut self, packet_id: NonZeroU16) -> Result<(), ClientError> {
        self.send_pubrel_tracked(packet_id).await
    }

    /// §4.2 PUBREC->PUBREL: encodes PUBREL, stores its bytes under
    /// `(id, ExpectedReply::Pubcomp)` so a later reconnect can resend
    /// them with dup (I4), then writes the frame. Shared by the
    /// automatic ack path (`auto_pub_response=true`) and the public
    /// `send_pubrel` method the caller uses when it's false.
    async fn send_pubrel_tracked(&mut self, packet_id: NonZeroU16) -> Result<(), ClientError> {
        let pubrel: SimpleAck<MAX_PROPS> = SimpleAck::new(packet_id);
        let len = {
            let mut w = BuffWriter::new(&mut self.encode_buf);
            pubrel.encode(&mut w, self.version).map_err(ClientError::from)?;
            w.position()
        };
        self.engine
            .session
            .store
            .insert(packet_id, ExpectedReply::Pubcomp, &self.encode_buf[..len], 0b0010, 0)
            .map_err(ClientError::from)?;
        write_fixed(&mut self.raw, PacketType::Pubrel, 0b0010, &self.encode_buf[..len])
            .await
            .map_err(raw_to_mqtt)?;
        Ok(())
    }

    pub async fn subscribe(
        &mut self,
        filters: &[(&str, QoS)],
    ) -> Result<NonZeroU16, ClientError> {
        if self.engine.state != ConnState::Connected {
            return Err(ClientError::NotConnected);
        }
        let id = self.engine.session.pids.acquire().map_err(ClientError::from)?;
        let mut entries: heapless::Vec<SubscribeEntry, MAX_FILTERS> = heapless::Vec::new();
        for (filter_str, qos) in filters {
            let filter = TopicFilter::new(filter_str).map_err(ClientError::from)?;
            entries
                .push(SubscribeEntry::new(filter, *qos))
                .map_err(|_| ClientError::EncodeBufferTooSmall)?;
        }
        let packet: SubscribePacket<MAX_FILTERS, MAX_PROPS> = SubscribePacket {
            packet_id: id,
            entries,
            properties: heapless::Vec::new(),
        };
        let len = {
            let mut w = BuffWriter::new(&mut self.encode_buf);
            packet.encode(&mut w, self.version).map_err(ClientError::from)?;
            w.position()
        };
        self.engine
            .session
            .store
            .insert(id, ExpectedReply::Suback, &self.encode_buf[..len], 0b0010, 0)
            .map_err(ClientError::from)?;
        write_fixed(&mut self.raw, PacketType::Subscribe, 0b0010, &self.encode_buf[..len])
            .await
            .map_err(raw_to_mqtt)?;
        Ok(id)
    }

    pub async fn unsubscribe(&mut self, filters: &[&str]) -> Result<NonZeroU16, ClientError> {
        if self.engine.state != ConnState::Connected {
            return Err(ClientError::NotConnected);
        }
        let id = self.engine.session.pids.acquire().map_err(ClientError::from)?;
        let mut entries: heapless::Vec<TopicFilter, MAX_FILTERS> = heapless::Vec::new();
        for filter_str in filters {
            let filter = TopicFilter::new(filter_str).map_err(ClientError::from)?;
            entries.push(filter).map_err(|_| ClientError::EncodeBufferTooSmall)?;
        }
        let packet: UnsubscribePacket<MAX_FILTERS, MAX_PROPS> = UnsubscribePacket {
            packet_id: id,
            filters: entries,
            properties: heapless::Vec::new(),
        };
        let len = {
            let mut w = BuffWriter::new(&mut self.encode_buf);
            packet.encode(&mut w, self.version).map_err(ClientError::from)?;
            w.position()
        };
        self.engine
            .session
            .store
            .insert(id, ExpectedReply::Unsuback, &self.encode_buf[..len], 0b0010, 0)
            .map_err(ClientError::from)?;
        write_fixed(&mut self.raw, PacketType::Unsubscribe, 0b0010, &self.encode_buf[..len])
            .await
            .map_err(raw_to_mqtt)?;
        Ok(id)
    }

    /// Drives the keep-alive ticker and ping-response deadline. The
    /// engine and connection driver stay timer-agnostic (C2/C7 are
    /// pure state machine / byte-pump, respectively); a caller that
    /// wants keep-alive races this against [`MqttClient::next_event`]
    /// in its own `tokio::select!`, e.g.:
    /// `tokio::select! { ev = client.next_event() => ..., r = client.tick() => r? }`.
    /// Resolves once: sends a PINGREQ on a keep-alive tick (re-arming
    /// the pingresp deadline), or returns
    /// `ClientError::Mqtt(MqttError::KeepAliveTimeout)` if PINGRESP
    /// doesn't arrive before that deadline -- the caller is expected
    /// to tear the connection down on that error (see
    /// [`MqttClient::force_disconnect`]).
    #[cfg(feature = "tokio")]
    pub async fn tick(&mut self) -> Result<(), ClientError> {
        match self.timers.tick(self.awaiting_pingresp).await {
            crate::timers::TimerEvent::PingDeadlineElapsed => {
                Err(ClientError::Mqtt(MqttError::KeepAliveTimeout))
            }
            crate::timers::TimerEvent::KeepAliveTick => {
                self.ping().await?;
                self.timers.arm_ping_deadline(core::time::Duration::from_millis(
                    self.pingresp_timeout_ms as u64,
                ));
                self.awaiting_pingresp = true;
                Ok(())
            }
            crate::timers::TimerEvent::DisconnectDeadlineElapsed => unreachable!(
                "TimerSet::tick only races keep-alive and ping-deadline branches"
            ),
        }
    }

    pub async fn ping(&mut self) -> Result<(), ClientError> {
        let _ = PingreqPacket;
        write_fixed(&mut self.raw, PacketType::Pingreq, 0, &[])
            .await
            .map_err(raw_to_mqtt)?;
        Ok(())
    }

    /// Graceful shutdown: writes DISCONNECT, then tears the transport
    /// down without waiting for a reply (none is defined).
    pub async fn disconnect(&mut self) -> Result<(), ClientError> {
        self.engine.begin_disconnecting();
        let disconnect: crate::packet::disconnect::DisconnectPacket<MAX_PROPS> =
            crate::packet::disconnect::DisconnectPacket::new(
                crate::types::reason_code::ReasonCode::NormalDisconnection,
            );
        let len = {
            let mut w = BuffWriter::new(&mut self.encode_buf);
            disconnect.encode(&mut w, self.version).map_err(ClientError::from)?;
            w.position()
        };
        write_fixed(&mut self.raw, PacketType::Disconnect, 0, &self.encode_buf[..len])
            .await
            .map_err(raw_to_mqtt)?;
        self.engine.close();
        self.raw.terminate();
        Ok(())
    }

    /// Abrupt close: no DISCONNECT is sent. Used on unrecoverable
    /// transport faults.
    pub fn force_disconnect(&mut self) {
        self.engine.close();
        self.raw.terminate();
    }

    pub fn is_connected(&self) -> bool {
        self.engine.state == ConnState::Connected
    }
}

async fn write_fixed<T: Transport, const MAX_PACKET: usize>(
    raw: &mut RawConnection<T, MAX_PACKET>,
    kind: PacketType,
    flags: u8,
    body: &[u8],
) -> Result<(), RawError<T::Error>> {
    let first = (kind.high_nibble() << 4) | flags;
    let mut vbi_buf = [0u8; 4];
    let vbi = crate::types::int::VarByteInt::new(body.len() as u32).expect("body within varint range");
    let vbi_len = vbi.encode(&mut vbi_buf).expect("fixed-size header buffer");
    raw.write_all(&[first]).await?;
    raw.write_all(&vbi_buf[..vbi_len]).await?;
    raw.write_all(body).await?;
    Ok(())
}
