use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use log::{debug, warn};
use parking_lot::Mutex;

use crate::common::types::{Frame, FrameId, Page, PageId, PagePtr, INVALID_PAGE_ID};
use crate::storage::disk::DiskManager;
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::replacer::ClockReplacer;
use crate::transaction::wal::LogManager;

/// Bookkeeping guarded by the pool latch.
///
/// Every frame is in exactly one of three places: the free list, the
/// replacer (pin count zero), or neither (pin count above zero). The page
/// table covers exactly the frames holding a valid page.
struct PoolState {
    frames: Vec<Frame>,
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
}

/// Fixed-size page cache between callers and the disk manager.
///
/// One latch guards the page table, free list, and frame metadata for the
/// whole of every operation, disk I/O included. Callers receive the page
/// behind an `Arc` and must balance each fetch or new-page with an unpin;
/// a frame is only reusable once its pin count returns to zero.
pub struct BufferPoolManager {
    pool_size: usize,
    state: Mutex<PoolState>,
    replacer: ClockReplacer,
    disk_manager: Arc<DiskManager>,
    log_manager: Option<Arc<LogManager>>,
}

impl BufferPoolManager {
    pub fn new(pool_size: usize, db_path: impl AsRef<Path>) -> Result<Self, BufferPoolError> {
        let disk_manager = Arc::new(DiskManager::new(db_path)?);
        Ok(Self::with_disk_manager(pool_size, disk_manager, None))
    }

    pub fn with_disk_manager(
        pool_size: usize,
        disk_manager: Arc<DiskManager>,
        log_manager: Option<Arc<LogManager>>,
    ) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);

        for frame_id in 0..pool_size {
            frames.push(Frame::new(frame_id));
            free_list.push_back(frame_id);
        }

        Self {
            pool_size,
            state: Mutex::new(PoolState {
                frames,
                page_table: HashMap::new(),
                free_list,
            }),
            replacer: ClockReplacer::new(pool_size),
            disk_manager,
            log_manager,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Log manager wired in for write-ahead logging; unused until the
    /// recovery layer lands
    pub fn log_manager(&self) -> Option<&Arc<LogManager>> {
        self.log_manager.as_ref()
    }

    /// Fetch a page from the buffer pool or disk
    pub fn fetch_page(&self, page_id: PageId) -> Result<PagePtr, BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidPageId(page_id));
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;

        // Already resident: pin and hand out the existing frame
        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &mut state.frames[frame_id];
            frame.pin_count += 1;
            self.replacer.pin(frame_id);
            return Ok(frame.page.clone());
        }

        let (frame_id, from_free_list) = self.acquire_frame(state)?;

        if let Err(e) = self.write_back_if_dirty(state, frame_id) {
            self.release_frame(state, frame_id, from_free_list);
            return Err(e);
        }

        // Read into a scratch page first so a failed read leaves the frame
        // holding its previous content
        let mut new_page = Page::new(page_id);
        if let Err(e) = self.disk_manager.read_page(page_id, &mut new_page) {
            self.release_frame(state, frame_id, from_free_list);
            return Err(e.into());
        }

        self.rekey_frame(state, frame_id, page_id, new_page);

        let frame = &mut state.frames[frame_id];
        frame.pin_count = 1;
        frame.is_dirty = false;
        Ok(frame.page.clone())
    }

    /// Create a new page
    pub fn new_page(&self) -> Result<(PagePtr, PageId), BufferPoolError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let (frame_id, from_free_list) = self.acquire_frame(state)?;

        if let Err(e) = self.write_back_if_dirty(state, frame_id) {
            self.release_frame(state, frame_id, from_free_list);
            return Err(e);
        }

        // Only ask the disk manager for an ID once a frame is secured, so a
        // fully pinned pool does not leak page allocations
        let page_id = match self.disk_manager.allocate_page() {
            Ok(page_id) => page_id,
            Err(e) => {
                self.release_frame(state, frame_id, from_free_list);
                return Err(e.into());
            }
        };

        self.rekey_frame(state, frame_id, page_id, Page::new(page_id));

        let frame = &mut state.frames[frame_id];
        frame.pin_count = 1;
        frame.is_dirty = true;
        Ok((frame.page.clone(), page_id))
    }

    /// Unpin a page, potentially marking it as dirty
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<(), BufferPoolError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let frame_id = match state.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return Err(BufferPoolError::PageNotFound(page_id)),
        };

        let frame = &mut state.frames[frame_id];
        if frame.pin_count == 0 {
            // Double unpin is a caller bug
            warn!("unpin of page {} with zero pin count", page_id);
            return Err(BufferPoolError::PageNotPinned(page_id));
        }

        frame.pin_count -= 1;
        if is_dirty {
            frame.is_dirty = true;
        }
        if frame.pin_count == 0 {
            self.replacer.unpin(frame_id);
        }

        Ok(())
    }

    /// Flush a specific page to disk. Pin state is left untouched.
    pub fn flush_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidPageId(page_id));
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;

        let frame_id = match state.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return Err(BufferPoolError::PageNotFound(page_id)),
        };

        let frame = &mut state.frames[frame_id];
        self.disk_manager.write_page(&frame.page.read())?;
        frame.is_dirty = false;

        Ok(())
    }

    /// Flush every resident dirty page to disk
    pub fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let resident: Vec<FrameId> = state.page_table.values().copied().collect();
        for frame_id in resident {
            let frame = &mut state.frames[frame_id];
            if frame.is_dirty {
                self.disk_manager.write_page(&frame.page.read())?;
                frame.is_dirty = false;
            }
        }

        Ok(())
    }

    /// Delete a page from the buffer pool and disk
    pub fn delete_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidPageId(page_id));
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;

        let frame_id = match state.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => {
                // Not resident; only the disk allocation needs to go
                self.disk_manager.deallocate_page(page_id);
                return Ok(());
            }
        };

        if state.frames[frame_id].pin_count > 0 {
            warn!("delete of page {} rejected: still pinned", page_id);
            return Err(BufferPoolError::PagePinned(page_id));
        }

        state.page_table.remove(&page_id);
        self.replacer.pin(frame_id);
        state.frames[frame_id].reset();
        state.free_list.push_back(frame_id);
        self.disk_manager.deallocate_page(page_id);

        Ok(())
    }

    /// Secure a frame for a new resident page, preferring the free list
    fn acquire_frame(&self, state: &mut PoolState) -> Result<(FrameId, bool), BufferPoolError> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok((frame_id, true));
        }

        if let Some(frame_id) = self.replacer.victim() {
            debug!(
                "evicting page {} from frame {}",
                state.frames[frame_id].page.read().page_id,
                frame_id
            );
            return Ok((frame_id, false));
        }

        warn!("buffer pool exhausted: every frame is pinned");
        Err(BufferPoolError::BufferPoolFull)
    }

    /// Undo `acquire_frame` after a failed operation
    fn release_frame(&self, state: &mut PoolState, frame_id: FrameId, to_free_list: bool) {
        if to_free_list {
            state.free_list.push_front(frame_id);
        } else {
            self.replacer.unpin(frame_id);
        }
    }

    fn write_back_if_dirty(
        &self,
        state: &mut PoolState,
        frame_id: FrameId,
    ) -> Result<(), BufferPoolError> {
        let frame = &mut state.frames[frame_id];
        if frame.is_dirty {
            self.disk_manager.write_page(&frame.page.read())?;
            frame.is_dirty = false;
        }
        Ok(())
    }

    /// Drop the frame's old page-table entry and install the new content.
    /// The dirty write-back must already have happened.
    fn rekey_frame(&self, state: &mut PoolState, frame_id: FrameId, page_id: PageId, content: Page) {
        let old_page_id = state.frames[frame_id].page.read().page_id;
        if old_page_id != INVALID_PAGE_ID {
            state.page_table.remove(&old_page_id);
        }
        *state.frames[frame_id].page.write() = content;
        state.page_table.insert(page_id, frame_id);
    }
}
