use std::sync::Arc;
use parking_lot::RwLock;

/// Page size in bytes (8KB)
pub const PAGE_SIZE: usize = 8192;

/// Page ID type
pub type PageId = u32;

/// Sentinel page ID; never handed out by the disk manager
pub const INVALID_PAGE_ID: PageId = 0;

/// Transaction ID type
pub type TxnId = u32;

/// Buffer pool frame ID type
pub type FrameId = usize;

/// LSN (Log Sequence Number) type
pub type Lsn = u64;

/// Page structure
#[derive(Debug, Clone)]
pub struct Page {
    pub data: [u8; PAGE_SIZE],
    pub page_id: PageId,
    pub lsn: Lsn,
}

impl Page {
    pub fn new(page_id: PageId) -> Self {
        Self {
            data: [0; PAGE_SIZE],
            page_id,
            lsn: 0,
        }
    }

    /// Zero the payload and drop the page identity
    pub fn reset(&mut self) {
        self.data.fill(0);
        self.page_id = INVALID_PAGE_ID;
        self.lsn = 0;
    }
}

/// Smart pointer to a page
pub type PagePtr = Arc<RwLock<Page>>;

/// Buffer pool frame structure
#[derive(Debug)]
pub struct Frame {
    pub page: PagePtr,
    pub frame_id: FrameId,
    pub is_dirty: bool,
    pub pin_count: u32,
}

impl Frame {
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            page: Arc::new(RwLock::new(Page::new(INVALID_PAGE_ID))),
            frame_id,
            is_dirty: false,
            pin_count: 0,
        }
    }

    /// Return the frame to its empty state
    pub fn reset(&mut self) {
        self.page.write().reset();
        self.is_dirty = false;
        self.pin_count = 0;
    }
}
