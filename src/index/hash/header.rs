use crate::common::types::{Lsn, PageId};

/// Directory of the hash table: the logical bucket count and the block
/// pages that hold them, in bucket order.
///
/// The typed view is decoded from a pinned header page and written back
/// through `serialization::serialize_header`. The LSN slot is reserved for
/// write-ahead logging and stays at zero for now.
pub struct HashHeaderPage {
    lsn: Lsn,
    page_id: PageId,
    size: usize,
    block_page_ids: Vec<PageId>,
}

impl HashHeaderPage {
    pub fn new(page_id: PageId) -> Self {
        Self {
            lsn: 0,
            page_id,
            size: 0,
            block_page_ids: Vec::new(),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn lsn(&self) -> Lsn {
        self.lsn
    }

    pub fn set_lsn(&mut self, lsn: Lsn) {
        self.lsn = lsn;
    }

    /// Total logical buckets across all block pages
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    pub fn add_block_page_id(&mut self, page_id: PageId) {
        self.block_page_ids.push(page_id);
    }

    pub fn block_page_id(&self, index: usize) -> Option<PageId> {
        self.block_page_ids.get(index).copied()
    }

    pub fn num_blocks(&self) -> usize {
        self.block_page_ids.len()
    }

    pub(crate) fn from_parts(
        lsn: Lsn,
        page_id: PageId,
        size: usize,
        block_page_ids: Vec<PageId>,
    ) -> Self {
        Self {
            lsn,
            page_id,
            size,
            block_page_ids,
        }
    }
}
