use log::debug;
use serde::{Serialize, Deserialize};

use crate::index::hash::error::HashTableError;
use crate::index::hash::header::HashHeaderPage;
use crate::index::hash::serialization::serialize_header;
use super::base::{LinearProbeHashTable, TableMeta};
use super::operations::InsertOutcome;

impl<K, V> LinearProbeHashTable<K, V>
where
    K: Clone + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static,
    V: Clone + PartialEq + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static,
{
    /// Double the table from `current_size` buckets.
    ///
    /// Takes the write side of the table latch, so no reader or per-slot
    /// mutator runs while the generations are swapped. Every live entry is
    /// rehashed into freshly provisioned block pages; tombstones are left
    /// behind with the old generation.
    pub(crate) fn resize(&self, current_size: usize) -> Result<(), HashTableError> {
        let mut meta = self.meta.write();
        if meta.num_buckets != current_size {
            // Another writer already grew the table past this size
            return Ok(());
        }

        let old_header = self.load_header(meta.header_page_id)?;

        // Collect the live entries before touching any new pages
        let mut live_entries: Vec<(K, V)> = Vec::new();
        for block_index in 0..old_header.num_blocks() {
            let block = self.load_block(&old_header, block_index)?;
            for slot in 0..block.capacity() {
                if block.is_readable(slot) {
                    if let Some((key, value)) = block.entry(slot) {
                        live_entries.push((key.clone(), value.clone()));
                    }
                }
            }
        }

        // Build the doubled generation: new header, new empty blocks
        let new_size = current_size * 2;
        let num_blocks = new_size / self.slots_per_block;

        let (header_page, header_page_id) = self.buffer_pool.new_page()?;
        let mut new_header = HashHeaderPage::new(header_page_id);
        new_header.set_size(new_size);

        for _ in 0..num_blocks {
            match Self::provision_block_page(&self.buffer_pool, self.slots_per_block) {
                Ok(block_page_id) => new_header.add_block_page_id(block_page_id),
                Err(e) => {
                    let _ = self.buffer_pool.unpin_page(header_page_id, false);
                    return Err(e);
                }
            }
        }

        let written = {
            let mut page_guard = header_page.write();
            serialize_header(&new_header, &mut page_guard)
        };
        match written {
            Ok(()) => self.buffer_pool.unpin_page(header_page_id, true)?,
            Err(e) => {
                let _ = self.buffer_pool.unpin_page(header_page_id, false);
                return Err(e);
            }
        }

        // Rehash against the doubled bucket count
        let new_meta = TableMeta {
            header_page_id,
            num_buckets: new_size,
        };
        for (key, value) in &live_entries {
            match self.try_insert(&new_meta, key, value)? {
                InsertOutcome::Inserted => {}
                _ => {
                    return Err(HashTableError::InvariantViolation(
                        "rehash failed to place a live entry".to_string(),
                    ))
                }
            }
        }

        // Retire the old generation only once the new one is complete
        for block_index in 0..old_header.num_blocks() {
            if let Some(page_id) = old_header.block_page_id(block_index) {
                self.buffer_pool.delete_page(page_id)?;
            }
        }
        self.buffer_pool.delete_page(meta.header_page_id)?;

        debug!(
            "hash table resized from {} to {} buckets",
            current_size, new_size
        );
        *meta = new_meta;
        Ok(())
    }
}
