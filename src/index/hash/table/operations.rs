use std::cmp::Ordering;
use serde::{Serialize, Deserialize};

use crate::common::types::Page;
use crate::index::hash::block::HashBlockPage;
use crate::index::hash::error::HashTableError;
use crate::index::hash::serialization::{deserialize_block, serialize_block};
use crate::transaction::Transaction;
use super::base::{LinearProbeHashTable, TableMeta};

/// Result of one insert attempt against a fixed table generation
pub(crate) enum InsertOutcome {
    Inserted,
    Duplicate,
    TableFull(usize),
}

/// What a single block contributed to an insert probe
enum InsertStep {
    Inserted,
    Duplicate,
    Continue,
    Cycle,
}

/// What a single block contributed to a remove probe
enum RemoveStep {
    Removed,
    Missing,
    Continue,
}

impl<K, V> LinearProbeHashTable<K, V>
where
    K: Clone + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static,
    V: Clone + PartialEq + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static,
{
    /// Insert a key-value pair.
    ///
    /// Fails only when the identical pair is already live somewhere on the
    /// probe path; the same key may map to any number of distinct values.
    /// A full probe cycle doubles the table and retries.
    pub fn insert(
        &self,
        _transaction: Option<&Transaction>,
        key: &K,
        value: &V,
    ) -> Result<bool, HashTableError> {
        loop {
            let outcome = {
                let meta = self.meta.read();
                self.try_insert(&meta, key, value)?
            };

            match outcome {
                InsertOutcome::Inserted => return Ok(true),
                InsertOutcome::Duplicate => return Ok(false),
                InsertOutcome::TableFull(current_size) => self.resize(current_size)?,
            }
        }
    }

    /// Remove the entry matching both key and value.
    ///
    /// The slot becomes a tombstone: dead for lookups, still occupied for
    /// probe continuity.
    pub fn remove(
        &self,
        _transaction: Option<&Transaction>,
        key: &K,
        value: &V,
    ) -> Result<bool, HashTableError> {
        let meta = self.meta.read();
        let header = self.load_header(meta.header_page_id)?;
        let num_blocks = header.num_blocks();
        let (start_block, start_slot) = self.bucket_of(&meta, key);

        let mut block_index = start_block;
        let mut slot_index = start_slot;

        loop {
            let page_id = header
                .block_page_id(block_index)
                .ok_or(HashTableError::BlockIndexOutOfRange(block_index))?;
            let page = self.buffer_pool.fetch_page(page_id)?;

            let step = {
                let mut page_guard = page.write();
                self.remove_in_block(
                    &mut page_guard,
                    key,
                    value,
                    &mut slot_index,
                    block_index,
                    start_block,
                    start_slot,
                )
            };

            match step {
                Ok(RemoveStep::Removed) => {
                    self.buffer_pool.unpin_page(page_id, true)?;
                    return Ok(true);
                }
                Ok(RemoveStep::Missing) => {
                    self.buffer_pool.unpin_page(page_id, false)?;
                    return Ok(false);
                }
                Ok(RemoveStep::Continue) => {
                    self.buffer_pool.unpin_page(page_id, false)?;
                    slot_index = 0;
                    block_index = (block_index + 1) % num_blocks;
                    if block_index == start_block && slot_index == start_slot {
                        return Ok(false);
                    }
                }
                Err(e) => {
                    let _ = self.buffer_pool.unpin_page(page_id, false);
                    return Err(e);
                }
            }
        }
    }

    /// One insert pass over the table generation described by `meta`.
    /// Resize re-runs this against the new generation during migration.
    pub(crate) fn try_insert(
        &self,
        meta: &TableMeta,
        key: &K,
        value: &V,
    ) -> Result<InsertOutcome, HashTableError> {
        let header = self.load_header(meta.header_page_id)?;
        let num_blocks = header.num_blocks();
        let (start_block, start_slot) = self.bucket_of(meta, key);

        let mut block_index = start_block;
        let mut slot_index = start_slot;

        loop {
            let page_id = header
                .block_page_id(block_index)
                .ok_or(HashTableError::BlockIndexOutOfRange(block_index))?;
            let page = self.buffer_pool.fetch_page(page_id)?;

            let step = {
                let mut page_guard = page.write();
                self.insert_in_block(
                    &mut page_guard,
                    key,
                    value,
                    &mut slot_index,
                    block_index,
                    start_block,
                    start_slot,
                )
            };

            match step {
                Ok(InsertStep::Inserted) => {
                    self.buffer_pool.unpin_page(page_id, true)?;
                    return Ok(InsertOutcome::Inserted);
                }
                Ok(InsertStep::Duplicate) => {
                    self.buffer_pool.unpin_page(page_id, false)?;
                    return Ok(InsertOutcome::Duplicate);
                }
                Ok(InsertStep::Cycle) => {
                    self.buffer_pool.unpin_page(page_id, false)?;
                    return Ok(InsertOutcome::TableFull(meta.num_buckets));
                }
                Ok(InsertStep::Continue) => {
                    self.buffer_pool.unpin_page(page_id, false)?;
                    slot_index = 0;
                    block_index = (block_index + 1) % num_blocks;
                    if block_index == start_block && slot_index == start_slot {
                        return Ok(InsertOutcome::TableFull(meta.num_buckets));
                    }
                }
                Err(e) => {
                    let _ = self.buffer_pool.unpin_page(page_id, false);
                    return Err(e);
                }
            }
        }
    }

    /// Probe the slots of one block under its page lock, inserting at the
    /// first never-written slot
    fn insert_in_block(
        &self,
        page: &mut Page,
        key: &K,
        value: &V,
        slot_index: &mut usize,
        block_index: usize,
        start_block: usize,
        start_slot: usize,
    ) -> Result<InsertStep, HashTableError> {
        let mut block = deserialize_block::<K, V>(page, self.slots_per_block)?;

        while *slot_index < self.slots_per_block {
            if !block.is_occupied(*slot_index) {
                block.insert(*slot_index, key.clone(), value.clone());
                serialize_block(&block, page)?;
                return Ok(InsertStep::Inserted);
            }

            if block.is_readable(*slot_index) && self.entry_matches(&block, *slot_index, key, value)
            {
                return Ok(InsertStep::Duplicate);
            }

            *slot_index += 1;
            if block_index == start_block && *slot_index == start_slot {
                return Ok(InsertStep::Cycle);
            }
        }

        Ok(InsertStep::Continue)
    }

    /// Probe the slots of one block under its page lock, tombstoning the
    /// first live entry matching key and value
    fn remove_in_block(
        &self,
        page: &mut Page,
        key: &K,
        value: &V,
        slot_index: &mut usize,
        block_index: usize,
        start_block: usize,
        start_slot: usize,
    ) -> Result<RemoveStep, HashTableError> {
        let mut block = deserialize_block::<K, V>(page, self.slots_per_block)?;

        while *slot_index < self.slots_per_block {
            if !block.is_occupied(*slot_index) {
                return Ok(RemoveStep::Missing);
            }

            if block.is_readable(*slot_index) && self.entry_matches(&block, *slot_index, key, value)
            {
                block.remove(*slot_index);
                serialize_block(&block, page)?;
                return Ok(RemoveStep::Removed);
            }

            *slot_index += 1;
            if block_index == start_block && *slot_index == start_slot {
                return Ok(RemoveStep::Missing);
            }
        }

        Ok(RemoveStep::Continue)
    }

    fn entry_matches(&self, block: &HashBlockPage<K, V>, slot: usize, key: &K, value: &V) -> bool {
        match (block.key_at(slot), block.value_at(slot)) {
            (Some(k), Some(v)) => self.key_ops.compare(k, key) == Ordering::Equal && v == value,
            _ => false,
        }
    }
}
