use heapless::String;

use crate::alias::AliasTable;
use crate::pid::PacketIdAllocator;
use crate::store::InFlightStore;

/// Per-client state retained across reconnections: identity, the
/// clean-start/session-expiry policy, the in-flight store, both
/// alias tables, and the packet-id allocator. Created on successful
/// CONNACK; cleared immediately if the prior CONNECT's clean_start
/// was true or the broker reports session-present=false; otherwise
/// retained in memory for `expiry_interval` seconds after disconnect
/// (0 is the "ended immediately on disconnect" sentinel per v5
/// semantics, not "never expire" -- see SPEC_FULL.md S9).
pub struct Session<
    const CLIENT_ID_LEN: usize,
    const IN_FLIGHT: usize,
    const MAX_ENTRY_LEN: usize,
    const MAX_ALIASES: usize,
    const MAX_TOPIC_LEN: usize,
> {
    pub client_id: String<CLIENT_ID_LEN>,
    pub clean_start: bool,
    pub expiry_interval: u32,
    pub store: InFlightStore<IN_FLIGHT, MAX_ENTRY_LEN>,
    pub send_aliases: AliasTable<MAX_ALIASES, MAX_TOPIC_LEN>,
    pub receive_aliases: AliasTable<MAX_ALIASES, MAX_TOPIC_LEN>,
    pub pids: PacketIdAllocator<IN_FLIGHT>,
}

impl<
        const CLIENT_ID_LEN: usize,
        const IN_FLIGHT: usize,
        const MAX_ENTRY_LEN: usize,
        const MAX_ALIASES: usize,
        const MAX_TOPIC_LEN: usize,
    > Session<CLIENT_ID_LEN, IN_FLIGHT, MAX_ENTRY_LEN, MAX_ALIASES, MAX_TOPIC_LEN>
{
    pub fn new(client_id: &str, clean_start: bool) -> Self {
        let mut id = String::new();
        let _ = id.push_str(client_id);
        Session {
            client_id: id,
            clean_start,
            expiry_interval: 0,
            store: InFlightStore::new(),
            send_aliases: AliasTable::new(0),
            receive_aliases: AliasTable::new(0),
            pids: PacketIdAllocator::new(),
        }
    }

    /// Called when CONNACK reports session-present=false, or the
    /// prior CONNECT requested clean_start -- drops every bit of
    /// retained state per the data model's Session lifecycle.
    pub fn reset(&mut self) {
        self.store.clear();
        self.send_aliases.clear();
        self.receive_aliases.clear();
        self.pids = PacketIdAllocator::new();
    }

    /// Whether this session should be treated as gone after
    /// `elapsed_secs` of disconnection, per `expiry_interval` (v5
    /// SessionExpiryInterval semantics: 0 means the session ends
    /// immediately on disconnect, not "never expires"). A caller
    /// holding onto a `Session` across a disconnect -- in order to
    /// hand it to `MqttClient::reconnect` -- checks this before
    /// bothering to resume it; the broker's own CONNACK
    /// session-present flag remains the authoritative answer either
    /// way, since clock drift between client and broker is possible.
    pub fn expired(&self, elapsed_secs: u32) -> bool {
        self.expiry_interval == 0 || elapsed_secs >= self.expiry_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_expiry_interval_expires_immediately() {
        let mut session: Session<32, 4, 32, 4, 32> = Session::new("c", false);
        session.expiry_interval = 0;
        assert!(session.expired(0));
    }

    #[test]
    fn nonzero_expiry_interval_survives_until_elapsed() {
        let mut session: Session<32, 4, 32, 4, 32> = Session::new("c", false);
        session.expiry_interval = 30;
        assert!(!session.expired(29));
        assert!(session.expired(30));
    }
}
