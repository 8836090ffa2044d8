use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;
use parking_lot::RwLock;
use serde::{Serialize, Deserialize};

use crate::common::types::PageId;
use crate::index::hash::block::HashBlockPage;
use crate::index::hash::error::HashTableError;
use crate::index::hash::header::HashHeaderPage;
use crate::index::hash::serialization::{
    calculate_block_capacity, deserialize_block, deserialize_header, serialize_block,
    serialize_header,
};
use crate::storage::buffer::BufferPoolManager;
use crate::transaction::Transaction;

/// Key capability handed to the table at construction: a total order for
/// key matching plus the hash used for bucket addressing.
pub trait KeyOps<K>: Send + Sync {
    fn compare(&self, a: &K, b: &K) -> Ordering;
    fn hash_key(&self, key: &K) -> u64;
}

/// Capability for keys that already order and hash themselves
pub struct DefaultKeyOps;

impl<K: Ord + Hash> KeyOps<K> for DefaultKeyOps {
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }

    fn hash_key(&self, key: &K) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }
}

/// Table metadata guarded by the table latch. Resize installs a whole new
/// value, so readers always see a header/bucket-count pair that belongs
/// together.
pub(crate) struct TableMeta {
    pub header_page_id: PageId,
    pub num_buckets: usize,
}

/// Disk-backed hash table with linear probing, built on the buffer pool.
///
/// Every page access pins through the buffer pool and unpins before the
/// operation returns. The table latch (`meta`) serializes resize against
/// all other operations; per-block consistency comes from the page locks
/// held across each read-modify-write.
pub struct LinearProbeHashTable<K, V> {
    pub(crate) buffer_pool: Arc<BufferPoolManager>,
    pub(crate) key_ops: Box<dyn KeyOps<K>>,
    pub(crate) meta: RwLock<TableMeta>,
    pub(crate) slots_per_block: usize,
    pub(crate) _phantom: PhantomData<V>,
}

impl<K, V> LinearProbeHashTable<K, V>
where
    K: Clone + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static,
    V: Clone + PartialEq + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static,
{
    /// Create a table sized for at least `num_buckets` buckets, using the
    /// key's own ordering and hash
    pub fn new(
        buffer_pool: Arc<BufferPoolManager>,
        num_buckets: usize,
    ) -> Result<Self, HashTableError>
    where
        K: Ord + Hash,
    {
        Self::with_key_ops(buffer_pool, num_buckets, Box::new(DefaultKeyOps))
    }

    /// Create a table with an explicit comparator/hash capability.
    ///
    /// The bucket count is rounded up to a whole number of block pages.
    pub fn with_key_ops(
        buffer_pool: Arc<BufferPoolManager>,
        num_buckets: usize,
        key_ops: Box<dyn KeyOps<K>>,
    ) -> Result<Self, HashTableError> {
        let slots_per_block = calculate_block_capacity::<K, V>();
        let num_blocks = ((num_buckets + slots_per_block - 1) / slots_per_block).max(1);
        let total_buckets = num_blocks * slots_per_block;

        let (header_page, header_page_id) = buffer_pool.new_page()?;
        let mut header = HashHeaderPage::new(header_page_id);
        header.set_size(total_buckets);

        for _ in 0..num_blocks {
            match Self::provision_block_page(&buffer_pool, slots_per_block) {
                Ok(block_page_id) => header.add_block_page_id(block_page_id),
                Err(e) => {
                    let _ = buffer_pool.unpin_page(header_page_id, false);
                    return Err(e);
                }
            }
        }

        let written = {
            let mut page_guard = header_page.write();
            serialize_header(&header, &mut page_guard)
        };
        match written {
            Ok(()) => buffer_pool.unpin_page(header_page_id, true)?,
            Err(e) => {
                let _ = buffer_pool.unpin_page(header_page_id, false);
                return Err(e);
            }
        }

        Ok(Self {
            buffer_pool,
            key_ops,
            meta: RwLock::new(TableMeta {
                header_page_id,
                num_buckets: total_buckets,
            }),
            slots_per_block,
            _phantom: PhantomData,
        })
    }

    /// Collect every value stored under the given key.
    ///
    /// Walks the probe sequence from the key's home slot until it reaches a
    /// never-written slot or comes back around to where it started.
    pub fn get_value(
        &self,
        _transaction: Option<&Transaction>,
        key: &K,
    ) -> Result<Vec<V>, HashTableError> {
        let meta = self.meta.read();
        let header = self.load_header(meta.header_page_id)?;
        let num_blocks = header.num_blocks();
        let (start_block, start_slot) = self.bucket_of(&meta, key);

        let mut results = Vec::new();
        let mut block_index = start_block;
        let mut slot_index = start_slot;

        'probe: loop {
            let block = self.load_block(&header, block_index)?;

            while slot_index < self.slots_per_block {
                if !block.is_occupied(slot_index) {
                    break 'probe;
                }
                if block.is_readable(slot_index) {
                    if let (Some(k), Some(v)) = (block.key_at(slot_index), block.value_at(slot_index)) {
                        if self.key_ops.compare(k, key) == Ordering::Equal {
                            results.push(v.clone());
                        }
                    }
                }

                slot_index += 1;
                if block_index == start_block && slot_index == start_slot {
                    break 'probe;
                }
            }

            slot_index = 0;
            block_index = (block_index + 1) % num_blocks;
            if block_index == start_block && slot_index == start_slot {
                break 'probe;
            }
        }

        Ok(results)
    }

    /// Logical bucket count, read back from the header page
    pub fn get_size(&self) -> Result<usize, HashTableError> {
        let meta = self.meta.read();
        let header = self.load_header(meta.header_page_id)?;
        Ok(header.size())
    }

    /// Slots per block page for this key/value instantiation
    pub fn slots_per_block(&self) -> usize {
        self.slots_per_block
    }

    /// Map a key to its home (block, slot) position
    pub(crate) fn bucket_of(&self, meta: &TableMeta, key: &K) -> (usize, usize) {
        let hash = self.key_ops.hash_key(key);
        let bucket = (hash % meta.num_buckets as u64) as usize;
        (bucket / self.slots_per_block, bucket % self.slots_per_block)
    }

    /// Pin the header page, decode it, and unpin
    pub(crate) fn load_header(&self, header_page_id: PageId) -> Result<HashHeaderPage, HashTableError> {
        let page = self.buffer_pool.fetch_page(header_page_id)?;
        let header = {
            let page_guard = page.read();
            deserialize_header(&page_guard)
        };
        match header {
            Ok(header) => {
                self.buffer_pool.unpin_page(header_page_id, false)?;
                Ok(header)
            }
            Err(e) => {
                let _ = self.buffer_pool.unpin_page(header_page_id, false);
                Err(e)
            }
        }
    }

    /// Pin a block page, decode it, and unpin
    pub(crate) fn load_block(
        &self,
        header: &HashHeaderPage,
        block_index: usize,
    ) -> Result<HashBlockPage<K, V>, HashTableError> {
        let page_id = header
            .block_page_id(block_index)
            .ok_or(HashTableError::BlockIndexOutOfRange(block_index))?;
        let page = self.buffer_pool.fetch_page(page_id)?;
        let block = {
            let page_guard = page.read();
            deserialize_block::<K, V>(&page_guard, self.slots_per_block)
        };
        match block {
            Ok(block) => {
                self.buffer_pool.unpin_page(page_id, false)?;
                Ok(block)
            }
            Err(e) => {
                let _ = self.buffer_pool.unpin_page(page_id, false);
                Err(e)
            }
        }
    }

    /// Allocate one empty block page and write its initial image
    pub(crate) fn provision_block_page(
        buffer_pool: &BufferPoolManager,
        slots_per_block: usize,
    ) -> Result<PageId, HashTableError> {
        let (page, page_id) = buffer_pool.new_page()?;
        let block: HashBlockPage<K, V> = HashBlockPage::new(slots_per_block);

        let written = {
            let mut page_guard = page.write();
            serialize_block(&block, &mut page_guard)
        };
        match written {
            Ok(()) => {
                buffer_pool.unpin_page(page_id, true)?;
                Ok(page_id)
            }
            Err(e) => {
                let _ = buffer_pool.unpin_page(page_id, false);
                Err(e)
            }
        }
    }
}
