use heapless::String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasError {
    ReservedAlias,
    AliasOutOfRange,
    UnmappedAlias,
    TableFull,
}

#[derive(Clone)]
struct Mapping<const MAX_TOPIC_LEN: usize> {
    alias: u16,
    topic: String<MAX_TOPIC_LEN>,
    last_used: u64,
}

/// One direction (send or receive) of the topic-alias table. Alias 0
/// is reserved; valid aliases are `1..=max_alias` (the broker's
/// announced topic-alias-maximum for the send table, this client's
/// own advertised maximum for the receive table). `auto_map` enables
/// LRU eviction when the table is full and a new topic needs an
/// alias; `auto_replace` rewrites subsequent publishes on an
/// already-mapped topic to empty-topic + alias.
pub struct AliasTable<const CAPACITY: usize, const MAX_TOPIC_LEN: usize> {
    max_alias: u16,
    auto_map: bool,
    auto_replace: bool,
    mappings: heapless::Vec<Mapping<MAX_TOPIC_LEN>, CAPACITY>,
    clock: u64,
}

impl<const CAPACITY: usize, const MAX_TOPIC_LEN: usize> AliasTable<CAPACITY, MAX_TOPIC_LEN> {
    pub fn new(max_alias: u16) -> Self {
        AliasTable {
            max_alias,
            auto_map: false,
            auto_replace: false,
            mappings: heapless::Vec::new(),
            clock: 0,
        }
    }

    pub fn with_auto_map(mut self, enabled: bool) -> Self {
        self.auto_map = enabled;
        self
    }

    pub fn with_auto_replace(mut self, enabled: bool) -> Self {
        self.auto_replace = enabled;
        self
    }

    pub fn set_max_alias(&mut self, max_alias: u16) {
        self.max_alias = max_alias;
    }

    pub fn set_auto_map(&mut self, enabled: bool) {
        self.auto_map = enabled;
    }

    pub fn set_auto_replace(&mut self, enabled: bool) {
        self.auto_replace = enabled;
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn find_by_alias(&self, alias: u16) -> Option<usize> {
        self.mappings.iter().position(|m| m.alias == alias)
    }

    fn find_by_topic(&self, topic: &str) -> Option<usize> {
        self.mappings.iter().position(|m| m.topic.as_str() == topic)
    }

    /// Registers or overwrites alias -> topic. Rejects alias 0 and
    /// alias > max_alias (invariant I5 / testable property 6).
    pub fn register(&mut self, alias: u16, topic: &str) -> Result<(), AliasError> {
        if alias == 0 {
            return Err(AliasError::ReservedAlias);
        }
        if alias > self.max_alias {
            return Err(AliasError::AliasOutOfRange);
        }
        let now = self.tick();
        let mut new_topic: String<MAX_TOPIC_LEN> = String::new();
        new_topic.push_str(topic).map_err(|_| AliasError::TableFull)?;
        if let Some(idx) = self.find_by_alias(alias) {
            self.mappings[idx].topic = new_topic;
            self.mappings[idx].last_used = now;
            return Ok(());
        }
        let entry = Mapping {
            alias,
            topic: new_topic,
            last_used: now,
        };
        if self.mappings.push(entry).is_err() {
            return Err(AliasError::TableFull);
        }
        Ok(())
    }

    /// Resolves an alias to its mapped topic; error if unmapped
    /// (testable scenario S7).
    pub fn resolve(&mut self, alias: u16) -> Result<&str, AliasError> {
        let now = self.tick();
        let idx = self.find_by_alias(alias).ok_or(AliasError::UnmappedAlias)?;
        self.mappings[idx].last_used = now;
        Ok(self.mappings[idx].topic.as_str())
    }

    /// Assigns the next free alias for `topic`, evicting the least-
    /// recently-used mapping when the table is full (S8). Only
    /// applies when `auto_map` is enabled.
    pub fn auto_map_topic(&mut self, topic: &str) -> Result<u16, AliasError> {
        if !self.auto_map {
            return Err(AliasError::UnmappedAlias);
        }
        if let Some(idx) = self.find_by_topic(topic) {
            let now = self.tick();
            self.mappings[idx].last_used = now;
            return Ok(self.mappings[idx].alias);
        }
        let next_free = (1..=self.max_alias).find(|a| self.find_by_alias(*a).is_none());
        if let Some(alias) = next_free {
            self.register(alias, topic)?;
            return Ok(alias);
        }
        // Table full: evict least-recently-used mapping.
        let lru_idx = self
            .mappings
            .iter()
            .enumerate()
            .min_by_key(|(_, m)| m.last_used)
            .map(|(i, _)| i)
            .ok_or(AliasError::TableFull)?;
        let alias = self.mappings[lru_idx].alias;
        self.register(alias, topic)?;
        Ok(alias)
    }

    /// If `auto_replace` is enabled and `topic` already has a mapped
    /// alias, returns that alias so the caller can send empty-topic +
    /// alias instead of the full topic string.
    pub fn replacement_alias(&mut self, topic: &str) -> Option<u16> {
        if !self.auto_replace {
            return None;
        }
        let idx = self.find_by_topic(topic)?;
        let now = self.tick();
        self.mappings[idx].last_used = now;
        Some(self.mappings[idx].alias)
    }

    pub fn clear(&mut self) {
        self.mappings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_alias_zero_and_out_of_range() {
        let mut t: AliasTable<4, 32> = AliasTable::new(2);
        assert_eq!(t.register(0, "a"), Err(AliasError::ReservedAlias));
        assert_eq!(t.register(3, "a"), Err(AliasError::AliasOutOfRange));
    }

    #[test]
    fn unmapped_alias_errors() {
        let mut t: AliasTable<4, 32> = AliasTable::new(2);
        assert_eq!(t.resolve(1), Err(AliasError::UnmappedAlias));
    }

    #[test]
    fn register_then_resolve() {
        let mut t: AliasTable<4, 32> = AliasTable::new(2);
        t.register(1, "topic1").unwrap();
        assert_eq!(t.resolve(1).unwrap(), "topic1");
    }

    #[test]
    fn auto_map_evicts_lru_when_full() {
        let mut t: AliasTable<2, 32> = AliasTable::new(2).with_auto_map(true);
        let a1 = t.auto_map_topic("t1").unwrap();
        let _a2 = t.auto_map_topic("t2").unwrap();
        // touch t2 so t1 becomes LRU
        t.resolve(_a2).unwrap();
        let a3 = t.auto_map_topic("t3").unwrap();
        assert_eq!(a3, a1);
        assert_eq!(t.resolve(a3).unwrap(), "t3");
    }
}
