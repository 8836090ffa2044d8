/// In-memory view of one block page: parallel occupied/readable bitmaps
/// plus the entry slots they describe.
///
/// A slot moves `empty -> live -> tombstone`; the occupied bit survives a
/// remove so probe sequences keep walking past deleted entries. Decoded
/// from a pinned page and written back through
/// `serialization::serialize_block`.
pub struct HashBlockPage<K, V> {
    occupied: Vec<bool>,
    readable: Vec<bool>,
    entries: Vec<Option<(K, V)>>,
}

impl<K, V> HashBlockPage<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            occupied: vec![false; capacity],
            readable: vec![false; capacity],
            entries: (0..capacity).map(|_| None).collect(),
        }
    }

    /// Number of slots in this block
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn key_at(&self, slot: usize) -> Option<&K> {
        self.entries[slot].as_ref().map(|(key, _)| key)
    }

    pub fn value_at(&self, slot: usize) -> Option<&V> {
        self.entries[slot].as_ref().map(|(_, value)| value)
    }

    /// Whether the slot has ever held an entry (tombstones included)
    pub fn is_occupied(&self, slot: usize) -> bool {
        self.occupied[slot]
    }

    /// Whether the slot currently holds a live entry
    pub fn is_readable(&self, slot: usize) -> bool {
        self.readable[slot]
    }

    /// Claim a slot for a new entry. The caller picks the slot; claiming a
    /// slot that was ever written fails.
    pub fn insert(&mut self, slot: usize, key: K, value: V) -> bool {
        if self.occupied[slot] {
            return false;
        }
        self.occupied[slot] = true;
        self.readable[slot] = true;
        self.entries[slot] = Some((key, value));
        true
    }

    /// Clear the live bit. The occupied bit must stay set so later probes
    /// do not stop short at this slot.
    pub fn remove(&mut self, slot: usize) {
        self.readable[slot] = false;
    }

    pub(crate) fn entry(&self, slot: usize) -> Option<&(K, V)> {
        self.entries[slot].as_ref()
    }

    pub(crate) fn restore_slot(
        &mut self,
        slot: usize,
        occupied: bool,
        readable: bool,
        entry: Option<(K, V)>,
    ) {
        self.occupied[slot] = occupied;
        self.readable[slot] = readable;
        self.entries[slot] = entry;
    }
}
