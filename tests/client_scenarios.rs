//! End-to-end scenarios driving `MqttClient` over an in-memory duplex
//! pipe standing in for a broker connection. The "broker" side is a
//! spawned task that reads raw bytes off the pipe and writes
//! hand-built response frames back -- it never runs any engine code
//! itself, so these tests only exercise the client's half of the
//! protocol.

use core::num::NonZeroU16;

use embedded_io_adapters::tokio_1::FromTokio;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use mqtt_engine::packet::ack::SimpleAck;
use mqtt_engine::packet::connack::ConnackPacket;
use mqtt_engine::packet::publish::PublishPacket;
use mqtt_engine::packet::subscribe::SubackPacket;
use mqtt_engine::packet::PacketType;
use mqtt_engine::property::Property;
use mqtt_engine::types::topic::TopicName;
use mqtt_engine::types::{ProtocolVersion, QoS, ReasonCode, VarByteInt};
use mqtt_engine::{ClientConfig, Event, MqttClient};

type TestClient = MqttClient<FromTokio<DuplexStream>, 512, 8, 8, 32, 4, 256, 4, 64, 4>;

fn frame(kind: PacketType, flags: u8, body: &[u8]) -> Vec<u8> {
    let mut out = vec![(kind.high_nibble() << 4) | flags];
    let vbi = VarByteInt::new(body.len() as u32).unwrap();
    let mut tmp = [0u8; 4];
    let n = vbi.encode(&mut tmp).unwrap();
    out.extend_from_slice(&tmp[..n]);
    out.extend_from_slice(body);
    out
}

fn connack_bytes(reason_code: ReasonCode, session_present: bool) -> Vec<u8> {
    connack_bytes_with_properties(reason_code, session_present, heapless::Vec::new())
}

fn connack_bytes_with_properties(
    reason_code: ReasonCode,
    session_present: bool,
    properties: heapless::Vec<Property<'_>, 8>,
) -> Vec<u8> {
    let connack: ConnackPacket<8> = ConnackPacket { session_present, reason_code, properties };
    let mut buf = [0u8; 32];
    let mut w = mqtt_engine::io::write::BuffWriter::new(&mut buf);
    connack.encode(&mut w, ProtocolVersion::V5).unwrap();
    let len = w.position();
    frame(PacketType::Connack, 0, &buf[..len])
}

async fn connect_over_duplex() -> (TestClient, DuplexStream) {
    let (client_io, mut broker_io) = tokio::io::duplex(4096);
    let broker = tokio::spawn(async move {
        // Drain the CONNECT packet (don't bother parsing it -- these
        // tests only assert on the client's reaction to the broker's
        // bytes, not the broker's reaction to the client's).
        let mut discard = [0u8; 256];
        let _ = broker_io.read(&mut discard).await.unwrap();
        broker_io
            .write_all(&connack_bytes(ReasonCode::Success, false))
            .await
            .unwrap();
        broker_io
    });
    let config: ClientConfig<32> = ClientConfig::new(ProtocolVersion::V5, "test-client");
    let transport = FromTokio::new(client_io);
    let (client, event): (TestClient, Event<128, 1024>) =
        MqttClient::connect(transport, &config).await.unwrap();
    match event {
        Event::Connack { session_present, reason_code } => {
            assert!(!session_present);
            assert_eq!(reason_code, ReasonCode::Success);
        }
        other => panic!("expected Connack event, got {other:?}"),
    }
    let broker_io = broker.await.unwrap();
    (client, broker_io)
}

#[tokio::test]
async fn connect_handshake_succeeds_and_reports_session_state() {
    let (client, _broker_io) = connect_over_duplex().await;
    assert!(client.is_connected());
}

#[tokio::test]
async fn connect_refused_surfaces_as_error() {
    let (client_io, mut broker_io) = tokio::io::duplex(4096);
    let broker = tokio::spawn(async move {
        let mut discard = [0u8; 256];
        let _ = broker_io.read(&mut discard).await.unwrap();
        broker_io
            .write_all(&connack_bytes(ReasonCode::NotAuthorized, false))
            .await
            .unwrap();
    });
    let config: ClientConfig<32> = ClientConfig::new(ProtocolVersion::V5, "test-client");
    let transport = FromTokio::new(client_io);
    let result: Result<(TestClient, Event<128, 1024>), _> =
        MqttClient::connect(transport, &config).await;
    assert!(result.is_err());
    broker.await.unwrap();
}

#[tokio::test]
async fn outbound_qos1_publish_completes_on_puback() {
    let (mut client, mut broker_io) = connect_over_duplex().await;

    let packet_id = client
        .publish("sensors/temp", b"21.5", QoS::AtLeastOnce, false)
        .await
        .unwrap()
        .expect("QoS 1 publish allocates a packet id");

    // Drain the PUBLISH bytes the client just wrote, then reply.
    let mut discard = [0u8; 256];
    let _ = broker_io.read(&mut discard).await.unwrap();

    let ack: SimpleAck<8> = SimpleAck::new(packet_id);
    let mut buf = [0u8; 8];
    let mut w = mqtt_engine::io::write::BuffWriter::new(&mut buf);
    ack.encode(&mut w, ProtocolVersion::V5).unwrap();
    let len = w.position();
    broker_io
        .write_all(&frame(PacketType::Puback, 0, &buf[..len]))
        .await
        .unwrap();

    match client.next_event().await.unwrap() {
        Event::Puback { packet_id: id, reason_code } => {
            assert_eq!(id, packet_id);
            assert_eq!(reason_code, ReasonCode::Success);
        }
        other => panic!("expected Puback event, got {other:?}"),
    }
}

#[tokio::test]
async fn inbound_qos2_publish_drives_full_handshake_with_auto_ack() {
    let (mut client, mut broker_io) = connect_over_duplex().await;

    let topic = TopicName::new("alerts/fire").unwrap();
    let packet_id = NonZeroU16::new(7).unwrap();
    let publish: PublishPacket<8> = PublishPacket {
        topic,
        packet_id: Some(packet_id),
        qos: QoS::ExactlyOnce,
        dup: false,
        retain: false,
        payload: b"evacuate",
        properties: heapless::Vec::new(),
    };
    let flags = publish.flags();
    let mut buf = [0u8; 64];
    let mut w = mqtt_engine::io::write::BuffWriter::new(&mut buf);
    publish.encode(&mut w, ProtocolVersion::V5).unwrap();
    let len = w.position();
    broker_io
        .write_all(&frame(PacketType::Publish, flags, &buf[..len]))
        .await
        .unwrap();

    match client.next_event().await.unwrap() {
        Event::Publish { topic, payload, qos, packet_id: id, .. } => {
            assert_eq!(topic.as_str(), "alerts/fire");
            assert_eq!(payload.as_slice(), b"evacuate");
            assert_eq!(qos, QoS::ExactlyOnce);
            assert_eq!(id, Some(packet_id));
        }
        other => panic!("expected Publish event, got {other:?}"),
    }

    // auto_pub_response defaults to true, so a PUBREC should already
    // be on the wire without any further client action.
    let mut discard = [0u8; 64];
    let n = broker_io.read(&mut discard).await.unwrap();
    assert_eq!(discard[0] >> 4, PacketType::Pubrec.high_nibble());
    assert!(n > 0);

    let pubrel: SimpleAck<8> = SimpleAck::new(packet_id);
    let mut rel_buf = [0u8; 8];
    let mut rel_w = mqtt_engine::io::write::BuffWriter::new(&mut rel_buf);
    pubrel.encode(&mut rel_w, ProtocolVersion::V5).unwrap();
    let rel_len = rel_w.position();
    broker_io
        .write_all(&frame(PacketType::Pubrel, 0b0010, &rel_buf[..rel_len]))
        .await
        .unwrap();

    match client.next_event().await.unwrap() {
        Event::Pubrel { packet_id: id } => assert_eq!(id, packet_id),
        other => panic!("expected Pubrel event, got {other:?}"),
    }

    let mut discard2 = [0u8; 64];
    let n2 = broker_io.read(&mut discard2).await.unwrap();
    assert_eq!(discard2[0] >> 4, PacketType::Pubcomp.high_nibble());
    assert!(n2 > 0);
}

#[tokio::test]
async fn subscribe_completes_on_matching_suback() {
    let (mut client, mut broker_io) = connect_over_duplex().await;

    let packet_id = client
        .subscribe(&[("sensors/+/temp", QoS::AtLeastOnce)])
        .await
        .unwrap();

    let mut discard = [0u8; 256];
    let _ = broker_io.read(&mut discard).await.unwrap();

    let mut reason_codes = heapless::Vec::new();
    reason_codes.push(ReasonCode::GrantedQoS1).unwrap();
    let suback: SubackPacket<8, 8> = SubackPacket {
        packet_id,
        reason_codes,
        properties: heapless::Vec::new(),
    };
    let mut buf = [0u8; 32];
    let mut w = mqtt_engine::io::write::BuffWriter::new(&mut buf);
    suback.encode(&mut w, ProtocolVersion::V5).unwrap();
    let len = w.position();
    broker_io
        .write_all(&frame(PacketType::Suback, 0, &buf[..len]))
        .await
        .unwrap();

    match client.next_event().await.unwrap() {
        Event::Suback { packet_id: id } => assert_eq!(id, packet_id),
        other => panic!("expected Suback event, got {other:?}"),
    }
}

#[tokio::test]
async fn outbound_publish_auto_maps_then_replaces_topic_alias() {
    let (client_io, mut broker_io) = tokio::io::duplex(4096);
    let broker = tokio::spawn(async move {
        let mut discard = [0u8; 256];
        let _ = broker_io.read(&mut discard).await.unwrap();
        let mut props = heapless::Vec::new();
        props.push(Property::TopicAliasMaximum(2)).unwrap();
        broker_io
            .write_all(&connack_bytes_with_properties(ReasonCode::Success, false, props))
            .await
            .unwrap();
        broker_io
    });
    let config: ClientConfig<32> = ClientConfig::new(ProtocolVersion::V5, "test-client")
        .with_topic_alias(2, true, true);
    let transport = FromTokio::new(client_io);
    let (mut client, _event): (TestClient, Event<128, 1024>) =
        MqttClient::connect(transport, &config).await.unwrap();
    let mut broker_io = broker.await.unwrap();

    // First publish on this topic: goes out with the full topic name
    // plus a freshly auto-mapped alias, per st_topic_alias.cpp's
    // "register on first use" pattern.
    client
        .publish("sensors/temp", b"21.5", QoS::AtMostOnce, false)
        .await
        .unwrap();
    let mut buf = [0u8; 256];
    let n = buf.len().min(broker_io.read(&mut buf).await.unwrap());
    {
        let first = decode_publish(&buf[..n]);
        assert_eq!(first.topic.as_str(), "sensors/temp");
        assert_eq!(
            first.properties.iter().find_map(|p| match p {
                Property::TopicAlias(a) => Some(*a),
                _ => None,
            }),
            Some(1)
        );
    }

    // Second publish on the same topic: auto-replace is on, so the
    // topic collapses to empty-string-plus-alias.
    client
        .publish("sensors/temp", b"21.6", QoS::AtMostOnce, false)
        .await
        .unwrap();
    let n2 = buf.len().min(broker_io.read(&mut buf).await.unwrap());
    let second = decode_publish(&buf[..n2]);
    assert_eq!(second.topic.as_str(), "");
    assert_eq!(
        second.properties.iter().find_map(|p| match p {
            Property::TopicAlias(a) => Some(*a),
            _ => None,
        }),
        Some(1)
    );
}

fn decode_publish(raw: &[u8]) -> PublishPacket<'_, 8> {
    // raw = fixed header byte + remaining-length varint + body
    let (_, rl_len) = VarByteInt::decode(&raw[1..]).unwrap();
    let body = &raw[1 + rl_len..];
    let mut r = mqtt_engine::io::read::BuffReader::new(body);
    PublishPacket::decode(&mut r, raw[0] & 0x0f, ProtocolVersion::V5).unwrap()
}

#[tokio::test]
async fn reconnect_resends_offline_publish_and_completes_on_puback() {
    // First connection: a QoS1 publish goes out but the link drops
    // before PUBACK arrives -- the "offline publish" half of S5.
    let (client_io, mut broker_io) = tokio::io::duplex(4096);
    let broker = tokio::spawn(async move {
        let mut discard = [0u8; 256];
        let _ = broker_io.read(&mut discard).await.unwrap();
        broker_io
            .write_all(&connack_bytes(ReasonCode::Success, false))
            .await
            .unwrap();
        let _ = broker_io.read(&mut discard).await.unwrap();
        broker_io
    });
    let config: ClientConfig<32> =
        ClientConfig::new(ProtocolVersion::V5, "test-client").with_clean_start(false);
    let transport = FromTokio::new(client_io);
    let (mut client, _event): (TestClient, Event<128, 1024>) =
        MqttClient::connect(transport, &config).await.unwrap();

    let packet_id = client
        .publish("sensors/offline", b"queued", QoS::AtLeastOnce, false)
        .await
        .unwrap()
        .expect("QoS 1 publish allocates a packet id");

    broker.await.unwrap();
    client.force_disconnect();
    let session = client.into_session();

    // Reconnect: the broker resumes the session (session_present=true),
    // so the still-unacknowledged publish above must be resent with
    // dup=1 before `reconnect` returns, per invariant I4.
    let (client_io2, mut broker_io2) = tokio::io::duplex(4096);
    let broker2 = tokio::spawn(async move {
        let mut discard = [0u8; 256];
        let _ = broker_io2.read(&mut discard).await.unwrap();
        broker_io2
            .write_all(&connack_bytes(ReasonCode::Success, true))
            .await
            .unwrap();

        let mut buf = [0u8; 256];
        let n = broker_io2.read(&mut buf).await.unwrap();
        assert_eq!(buf[0] >> 4, PacketType::Publish.high_nibble());
        assert_ne!(buf[0] & 0b1000, 0, "resent publish must carry dup=1");
        let resent_id = decode_publish(&buf[..n]).packet_id.unwrap();

        let ack: SimpleAck<8> = SimpleAck::new(resent_id);
        let mut ack_buf = [0u8; 8];
        let mut w = mqtt_engine::io::write::BuffWriter::new(&mut ack_buf);
        ack.encode(&mut w, ProtocolVersion::V5).unwrap();
        let len = w.position();
        broker_io2
            .write_all(&frame(PacketType::Puback, 0, &ack_buf[..len]))
            .await
            .unwrap();
        resent_id
    });
    let transport2 = FromTokio::new(client_io2);
    let (mut client2, event2): (TestClient, Event<128, 1024>) =
        MqttClient::reconnect(transport2, &config, session).await.unwrap();
    match event2 {
        Event::Connack { session_present, .. } => assert!(session_present),
        other => panic!("expected Connack event, got {other:?}"),
    }
    let resent_id = broker2.await.unwrap();
    assert_eq!(resent_id, packet_id);

    match client2.next_event().await.unwrap() {
        Event::Puback { packet_id: id, .. } => assert_eq!(id, packet_id),
        other => panic!("expected Puback event, got {other:?}"),
    }
}

#[tokio::test]
async fn graceful_disconnect_writes_disconnect_frame() {
    let (mut client, mut broker_io) = connect_over_duplex().await;
    client.disconnect().await.unwrap();
    assert!(!client.is_connected());

    let mut buf = [0u8; 16];
    let n = broker_io.read(&mut buf).await.unwrap();
    assert!(n > 0);
    assert_eq!(buf[0] >> 4, PacketType::Disconnect.high_nibble());
}
