use heapless::String;

use crate::types::will::Will;
use crate::types::ProtocolVersion;

/// Every user-configurable knob from the external-interfaces surface:
/// identity, session policy, credentials, will, keep-alive timing,
/// auto-response/auto-alias toggles, and the broker-facing maximum
/// packet size this client will accept.
pub struct ClientConfig<'a, const CLIENT_ID_LEN: usize> {
    pub version: ProtocolVersion,
    pub client_id: String<CLIENT_ID_LEN>,
    pub clean_start: bool,
    pub username: Option<&'a str>,
    pub password: Option<&'a [u8]>,
    pub will: Option<Will<'a>>,
    pub keep_alive_sec: u16,
    pub ping_interval_ms: u32,
    pub pingresp_timeout_ms: u32,
    pub auto_pub_response: bool,
    pub auto_map_topic_alias: bool,
    pub auto_replace_topic_alias: bool,
    pub topic_alias_maximum: u16,
    pub receive_maximum: u16,
    pub max_packet_size_recv: u32,
    pub session_expiry_interval: u32,
}

impl<'a, const CLIENT_ID_LEN: usize> ClientConfig<'a, CLIENT_ID_LEN> {
    pub fn new(version: ProtocolVersion, client_id: &str) -> Self {
        let mut id = String::new();
        let _ = id.push_str(client_id);
        let keep_alive_sec = 60;
        ClientConfig {
            version,
            client_id: id,
            clean_start: true,
            username: None,
            password: None,
            will: None,
            keep_alive_sec,
            ping_interval_ms: keep_alive_sec as u32 * 1000 / 2,
            pingresp_timeout_ms: 5_000,
            auto_pub_response: true,
            auto_map_topic_alias: false,
            auto_replace_topic_alias: false,
            topic_alias_maximum: 0,
            receive_maximum: 65_535,
            max_packet_size_recv: 268_435_455,
            session_expiry_interval: 0,
        }
    }

    pub fn with_clean_start(mut self, clean_start: bool) -> Self {
        self.clean_start = clean_start;
        self
    }

    pub fn with_credentials(mut self, username: &'a str, password: &'a [u8]) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    pub fn with_will(mut self, will: Will<'a>) -> Self {
        self.will = Some(will);
        self
    }

    /// Mirrors the source's `set_keep_alive_sec_ping_ms`: keep-alive
    /// seconds plus an explicit ping interval. A ping interval of 0
    /// disarms the ticker (see SPEC_FULL.md's Open Question
    /// resolution).
    pub fn with_keep_alive(mut self, keep_alive_sec: u16, ping_interval_ms: u32) -> Self {
        self.keep_alive_sec = keep_alive_sec;
        self.ping_interval_ms = ping_interval_ms;
        self
    }

    pub fn with_auto_pub_response(mut self, enabled: bool) -> Self {
        self.auto_pub_response = enabled;
        self
    }

    pub fn with_topic_alias(mut self, maximum: u16, auto_map: bool, auto_replace: bool) -> Self {
        self.topic_alias_maximum = maximum;
        self.auto_map_topic_alias = auto_map;
        self.auto_replace_topic_alias = auto_replace;
        self
    }

    pub fn with_session_expiry_interval(mut self, secs: u32) -> Self {
        self.session_expiry_interval = secs;
        self
    }

    pub fn with_receive_maximum(mut self, max: u16) -> Self {
        self.receive_maximum = max;
        self
    }

    pub fn with_max_packet_size_recv(mut self, max: u32) -> Self {
        self.max_packet_size_recv = max;
        self
    }
}
