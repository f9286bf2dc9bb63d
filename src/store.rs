use core::num::NonZeroU16;

use crate::packet::ExpectedReply;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    Duplicate,
    Full,
}

/// A stored entry as described by the data model: the serialized
/// bytes are kept (not just state) so a reconnect can resend them
/// verbatim with dup=1 set (invariant I4). `seq` is the store's own
/// monotonic insertion counter, independent of slot position -- see
/// `InFlightStore::for_each_in_order`.
pub struct StoredEntry<const MAX_LEN: usize> {
    pub packet_id: NonZeroU16,
    pub expected_reply: ExpectedReply,
    pub bytes: heapless::Vec<u8, MAX_LEN>,
    /// The fixed-header flags byte this entry was originally sent
    /// with (retain/QoS bits for PUBLISH, the packet type's fixed
    /// flags otherwise) -- kept so a reconnect resend can reproduce it
    /// rather than reconstructing only QoS and dup from
    /// `expected_reply`.
    pub flags: u8,
    pub first_send_ts: u64,
    seq: u64,
}

/// Three-view in-flight store: one `Vec<Option<StoredEntry>>` backs
/// all lookups, addressed by stable slot index. A by-id/by-reply-kind
/// lookup is a linear scan over live slots (acceptable at the
/// embedded scale this table is sized for, matching the session
/// module's own linear-scan style). Slot position is NOT insertion
/// order once a tombstoned slot (left by `remove`) gets reused by a
/// later `insert` -- each entry instead carries a monotonic `seq`
/// assigned at insertion, and `for_each_in_order` sorts live entries
/// by that before visiting them, so reconnect resend (I4) always
/// walks entries oldest-first regardless of which slot they landed in.
pub struct InFlightStore<const CAPACITY: usize, const MAX_LEN: usize> {
    slots: heapless::Vec<Option<StoredEntry<MAX_LEN>>, CAPACITY>,
    next_seq: u64,
}

impl<const CAPACITY: usize, const MAX_LEN: usize> Default for InFlightStore<CAPACITY, MAX_LEN> {
    fn default() -> Self {
        InFlightStore {
            slots: heapless::Vec::new(),
            next_seq: 0,
        }
    }
}

impl<const CAPACITY: usize, const MAX_LEN: usize> InFlightStore<CAPACITY, MAX_LEN> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count of live entries awaiting a QoS>=1 publish ack (PUBACK or
    /// PUBREC), as opposed to SUBACK/UNSUBACK -- what the broker's
    /// CONNACK receive-maximum bounds.
    pub fn qos_publish_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| {
                s.as_ref().is_some_and(|e| {
                    matches!(e.expected_reply, ExpectedReply::Puback | ExpectedReply::Pubrec)
                })
            })
            .count()
    }

    fn find_slot(&self, id: NonZeroU16, reply: ExpectedReply) -> Option<usize> {
        self.slots.iter().position(|s| {
            s.as_ref()
                .is_some_and(|e| e.packet_id == id && e.expected_reply == reply)
        })
    }

    pub fn contains_id(&self, id: NonZeroU16) -> bool {
        self.slots
            .iter()
            .any(|s| s.as_ref().is_some_and(|e| e.packet_id == id))
    }

    pub fn insert(
        &mut self,
        packet_id: NonZeroU16,
        expected_reply: ExpectedReply,
        bytes: &[u8],
        flags: u8,
        now: u64,
    ) -> Result<(), StoreError> {
        if self.find_slot(packet_id, expected_reply).is_some() {
            return Err(StoreError::Duplicate);
        }
        let mut buf = heapless::Vec::new();
        buf.extend_from_slice(bytes).map_err(|_| StoreError::Full)?;
        let seq = self.next_seq;
        self.next_seq += 1;
        let entry = StoredEntry {
            packet_id,
            expected_reply,
            bytes: buf,
            flags,
            first_send_ts: now,
            seq,
        };
        // Reuse a tombstoned slot before growing; `seq` (not slot
        // position) is what for_each_in_order sorts by, so reusing an
        // earlier slot here doesn't reorder anything.
        if let Some(slot) = self.slots.iter_mut().find(|s| s.is_none()) {
            *slot = Some(entry);
            return Ok(());
        }
        self.slots.push(Some(entry)).map_err(|_| StoreError::Full)
    }

    /// Idempotent; returns whether an entry existed.
    pub fn remove(&mut self, id: NonZeroU16, reply: ExpectedReply) -> bool {
        match self.find_slot(id, reply) {
            Some(idx) => {
                self.slots[idx] = None;
                true
            }
            None => false,
        }
    }

    /// Visits live entries oldest-insertion-first, per the entries'
    /// own `seq` rather than their backing slot position (a tombstone
    /// reused by a later `insert` would otherwise put that later entry
    /// ahead of an older, still-live one).
    pub fn for_each_in_order<F: FnMut(&StoredEntry<MAX_LEN>)>(&self, mut f: F) {
        let mut order: heapless::Vec<usize, CAPACITY> = heapless::Vec::new();
        for (idx, slot) in self.slots.iter().enumerate() {
            if slot.is_some() {
                let _ = order.push(idx);
            }
        }
        order.sort_unstable_by_key(|&idx| self.slots[idx].as_ref().map(|e| e.seq).unwrap_or(u64::MAX));
        for idx in order {
            if let Some(entry) = &self.slots[idx] {
                f(entry);
            }
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u16) -> NonZeroU16 {
        NonZeroU16::new(n).unwrap()
    }

    #[test]
    fn rejects_duplicate_id_and_reply_kind() {
        let mut store: InFlightStore<4, 16> = InFlightStore::new();
        store.insert(id(1), ExpectedReply::Puback, b"a", 0, 0).unwrap();
        assert_eq!(
            store.insert(id(1), ExpectedReply::Puback, b"a", 0, 0),
            Err(StoreError::Duplicate)
        );
    }

    #[test]
    fn remove_is_idempotent() {
        let mut store: InFlightStore<4, 16> = InFlightStore::new();
        store.insert(id(1), ExpectedReply::Puback, b"a", 0, 0).unwrap();
        assert!(store.remove(id(1), ExpectedReply::Puback));
        assert!(!store.remove(id(1), ExpectedReply::Puback));
    }

    #[test]
    fn insertion_order_preserved_across_tombstones() {
        // id(2) vacates the second slot, which id(4) then reuses --
        // but id(4) was inserted chronologically after id(3), so it
        // must still iterate after id(3), not ahead of it.
        let mut store: InFlightStore<4, 16> = InFlightStore::new();
        store.insert(id(1), ExpectedReply::Puback, b"1", 0, 0).unwrap();
        store.insert(id(2), ExpectedReply::Puback, b"2", 0, 0).unwrap();
        store.insert(id(3), ExpectedReply::Puback, b"3", 0, 0).unwrap();
        store.remove(id(2), ExpectedReply::Puback);
        store.insert(id(4), ExpectedReply::Puback, b"4", 0, 0).unwrap();

        let mut order = heapless::Vec::<u16, 8>::new();
        store.for_each_in_order(|e| {
            let _ = order.push(e.packet_id.get());
        });
        assert_eq!(order.as_slice(), &[1, 3, 4]);
    }

    #[test]
    fn qos_publish_count_excludes_sub_unsub() {
        let mut store: InFlightStore<4, 16> = InFlightStore::new();
        store.insert(id(1), ExpectedReply::Puback, b"1", 0, 0).unwrap();
        store.insert(id(2), ExpectedReply::Suback, b"2", 0, 0).unwrap();
        store.insert(id(3), ExpectedReply::Pubrec, b"3", 0, 0).unwrap();
        assert_eq!(store.qos_publish_count(), 2);
    }

    #[test]
    fn clear_empties_the_store() {
        let mut store: InFlightStore<4, 16> = InFlightStore::new();
        store.insert(id(1), ExpectedReply::Puback, b"a", 0, 0).unwrap();
        store.clear();
        assert!(store.is_empty());
    }
}
