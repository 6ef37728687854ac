//! Buffer pool manager.

use crate::frame::{BufferFrame, FrameId};
use crate::replacer::ClockReplacer;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use sysinfo::System;
use tracing::trace;
use zyron_common::page::{PAGE_SIZE, PageId};
use zyron_common::{Result, StorageConfig, ZyronError};

/// Information about a dirty page that was evicted from the buffer pool.
/// Caller must write this to disk to prevent data loss.
#[derive(Debug)]
pub struct EvictedPage {
    pub page_id: PageId,
    pub data: Box<[u8; PAGE_SIZE]>,
}

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool.
    pub num_frames: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self { num_frames: 1024 }
    }
}

impl BufferPoolConfig {
    /// Sizes the pool from the storage configuration.
    ///
    /// A `buffer_pool_pages` of 0 sizes it from system memory. Fails with
    /// `ConfigError` if the configured page size is not `PAGE_SIZE`.
    pub fn from_storage(config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        if config.buffer_pool_pages == 0 {
            return Ok(Self::auto_sized());
        }
        Ok(Self {
            num_frames: config.buffer_pool_pages,
        })
    }

    /// Sizes the pool to 25% of available system RAM, with a minimum of 1,000
    /// frames.
    pub fn auto_sized() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();

        Self {
            num_frames: BufferPool::frames_for_memory(sys.available_memory() as usize),
        }
    }
}

/// Buffer pool manager.
///
/// Manages a fixed-size pool of page frames with:
/// - Page ID to frame ID mapping
/// - Free frame list for new pages
/// - Clock replacement for eviction
/// - Pin counting for concurrent access
///
/// The pool is shared between indexes through `Arc<BufferPool>`; every method
/// takes `&self`.
pub struct BufferPool {
    config: BufferPoolConfig,
    frames: Vec<BufferFrame>,
    page_table: RwLock<HashMap<PageId, FrameId>>,
    free_list: Mutex<Vec<FrameId>>,
    replacer: ClockReplacer,
}

impl BufferPool {
    /// Creates a new buffer pool.
    pub fn new(config: BufferPoolConfig) -> Self {
        let num_frames = config.num_frames;

        let frames: Vec<_> = (0..num_frames)
            .map(|i| BufferFrame::new(FrameId(i as u32)))
            .collect();

        // Reversed so that pop() hands out frame 0 first
        let free_list: Vec<_> = (0..num_frames).rev().map(|i| FrameId(i as u32)).collect();

        Self {
            config,
            frames,
            page_table: RwLock::new(HashMap::with_capacity(num_frames)),
            free_list: Mutex::new(free_list),
            replacer: ClockReplacer::new(num_frames),
        }
    }

    /// Frames covering a quarter of `available_bytes`, at least 1,000.
    pub fn frames_for_memory(available_bytes: usize) -> usize {
        (available_bytes / 4 / PAGE_SIZE).max(1_000)
    }

    /// Returns the number of frames in the pool.
    pub fn num_frames(&self) -> usize {
        self.config.num_frames
    }

    /// Returns the number of free frames.
    pub fn free_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Returns the number of pages currently in the pool.
    pub fn page_count(&self) -> usize {
        self.page_table.read().len()
    }

    /// Checks if a page is in the buffer pool.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_table.read().contains_key(&page_id)
    }

    /// Fetches a page from the buffer pool.
    ///
    /// If the page is not in the pool, returns None.
    /// The page is pinned before being returned.
    pub fn fetch_page(&self, page_id: PageId) -> Option<&BufferFrame> {
        let frame_id = *self.page_table.read().get(&page_id)?;
        let frame = &self.frames[frame_id.0 as usize];
        frame.pin();
        self.replacer.record_access(frame_id);
        Some(frame)
    }

    /// Allocates a frame for a new page.
    ///
    /// Tries to get a free frame first, then evicts if necessary.
    /// Returns the frame ID and any evicted dirty page that must be flushed.
    fn allocate_frame(
        &self,
        page_table: &mut HashMap<PageId, FrameId>,
    ) -> Result<(FrameId, Option<EvictedPage>)> {
        if let Some(frame_id) = self.free_list.lock().pop() {
            return Ok((frame_id, None));
        }

        let victim_id = self
            .replacer
            .evict(|fid| self.frames[fid.0 as usize].pin_count() == 0)
            .ok_or(ZyronError::BufferPoolFull)?;
        let frame = &self.frames[victim_id.0 as usize];

        let mut evicted = None;
        if let Some(old_page_id) = frame.page_id() {
            if frame.is_dirty() {
                let mut data = Box::new([0u8; PAGE_SIZE]);
                data.copy_from_slice(&**frame.read_data());
                evicted = Some(EvictedPage {
                    page_id: old_page_id,
                    data,
                });
            }
            page_table.remove(&old_page_id);
            trace!(page = %old_page_id, frame = %victim_id, dirty = evicted.is_some(), "evicted page");
        }

        Ok((victim_id, evicted))
    }

    /// Inserts a new page into the buffer pool.
    ///
    /// If the page already exists, returns the existing frame.
    /// The page is pinned before being returned.
    ///
    /// Returns (frame, evicted) where evicted contains any dirty page that was
    /// evicted to make room. Caller must write evicted pages to disk.
    pub fn new_page(&self, page_id: PageId) -> Result<(&BufferFrame, Option<EvictedPage>)> {
        let mut page_table = self.page_table.write();

        if let Some(&frame_id) = page_table.get(&page_id) {
            let frame = &self.frames[frame_id.0 as usize];
            frame.pin();
            self.replacer.record_access(frame_id);
            return Ok((frame, None));
        }

        let (frame_id, evicted) = self.allocate_frame(&mut page_table)?;

        let frame = &self.frames[frame_id.0 as usize];
        frame.reset();
        frame.set_page_id(Some(page_id));
        frame.pin();
        self.replacer.record_access(frame_id);
        page_table.insert(page_id, frame_id);

        Ok((frame, evicted))
    }

    /// Unpins a page in the buffer pool, marking it dirty if requested.
    ///
    /// Once the pin count reaches zero the frame becomes an eviction candidate.
    /// Returns false if the page is not in the pool.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let Some(&frame_id) = self.page_table.read().get(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.0 as usize];
        if is_dirty {
            frame.set_dirty(true);
        }
        frame.unpin();
        true
    }

    /// Hands every dirty page to `flush_fn` and marks it clean.
    ///
    /// Returns the number of pages flushed.
    pub fn flush_all<F>(&self, mut flush_fn: F) -> Result<usize>
    where
        F: FnMut(PageId, &[u8]) -> Result<()>,
    {
        let resident: Vec<_> = self
            .page_table
            .read()
            .iter()
            .map(|(&page_id, &frame_id)| (page_id, frame_id))
            .collect();

        let mut flushed = 0;
        for (page_id, frame_id) in resident {
            let frame = &self.frames[frame_id.0 as usize];
            if frame.is_dirty() {
                flush_fn(page_id, &**frame.read_data())?;
                frame.set_dirty(false);
                flushed += 1;
            }
        }
        Ok(flushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_pool(num_frames: usize) -> BufferPool {
        BufferPool::new(BufferPoolConfig { num_frames })
    }

    #[test]
    fn test_buffer_pool_new() {
        let pool = create_test_pool(10);

        assert_eq!(pool.num_frames(), 10);
        assert_eq!(pool.free_count(), 10);
        assert_eq!(pool.page_count(), 0);
    }

    #[test]
    fn test_buffer_pool_config_from_storage() {
        let storage = StorageConfig {
            buffer_pool_pages: 64,
            ..Default::default()
        };
        assert_eq!(BufferPoolConfig::from_storage(&storage).unwrap().num_frames, 64);

        let storage = StorageConfig {
            page_size: 4096,
            ..Default::default()
        };
        assert!(matches!(
            BufferPoolConfig::from_storage(&storage),
            Err(ZyronError::ConfigError(_))
        ));
    }

    #[test]
    fn test_buffer_pool_config_auto_sized() {
        let storage = StorageConfig {
            buffer_pool_pages: 0,
            ..Default::default()
        };
        let config = BufferPoolConfig::from_storage(&storage).unwrap();
        assert!(config.num_frames >= 1_000);
        assert!(BufferPoolConfig::auto_sized().num_frames >= 1_000);
    }

    #[test]
    fn test_frames_for_memory() {
        // 1 GiB available: 256 MiB of 16 KiB pages
        assert_eq!(BufferPool::frames_for_memory(1 << 30), 16_384);
        assert_eq!(BufferPool::frames_for_memory(0), 1_000);
        assert_eq!(BufferPool::frames_for_memory(1 << 20), 1_000);
    }

    #[test]
    fn test_buffer_pool_new_page() {
        let pool = create_test_pool(10);
        let page_id = PageId::new(0, 1);

        let (frame, evicted) = pool.new_page(page_id).unwrap();

        assert!(evicted.is_none());
        assert_eq!(frame.page_id(), Some(page_id));
        assert!(frame.is_pinned());
        assert_eq!(pool.free_count(), 9);
        assert_eq!(pool.page_count(), 1);
        assert!(pool.contains(page_id));
    }

    #[test]
    fn test_buffer_pool_duplicate_new_page() {
        let pool = create_test_pool(4);
        let page_id = PageId::new(2, 7);

        let (first, _) = pool.new_page(page_id).unwrap();
        let (second, _) = pool.new_page(page_id).unwrap();

        assert_eq!(first.frame_id(), second.frame_id());
        assert_eq!(second.pin_count(), 2);
        assert_eq!(pool.page_count(), 1);
    }

    #[test]
    fn test_buffer_pool_fetch_and_unpin() {
        let pool = create_test_pool(10);
        let page_id = PageId::new(0, 1);

        assert!(pool.fetch_page(page_id).is_none());

        pool.new_page(page_id).unwrap();
        assert!(pool.unpin_page(page_id, false));

        let frame = pool.fetch_page(page_id).unwrap();
        assert!(frame.is_pinned());

        pool.unpin_page(page_id, false);
        assert!(!frame.is_pinned());
        assert!(!pool.unpin_page(PageId::new(9, 9), false));
    }

    #[test]
    fn test_buffer_pool_dirty_tracking() {
        let pool = create_test_pool(10);
        let page_id = PageId::new(0, 1);

        pool.new_page(page_id).unwrap();
        pool.unpin_page(page_id, true);

        let frame = pool.fetch_page(page_id).unwrap();
        assert!(frame.is_dirty());
    }

    #[test]
    fn test_buffer_pool_eviction_clean() {
        let pool = create_test_pool(3);

        for i in 0..3 {
            let page_id = PageId::new(0, i);
            pool.new_page(page_id).unwrap();
            pool.unpin_page(page_id, false);
        }
        assert_eq!(pool.free_count(), 0);

        let new_page_id = PageId::new(0, 99);
        let (_, evicted) = pool.new_page(new_page_id).unwrap();

        assert!(evicted.is_none());
        assert_eq!(pool.page_count(), 3);
        assert!(pool.contains(new_page_id));
    }

    #[test]
    fn test_buffer_pool_eviction_dirty() {
        let pool = create_test_pool(1);
        let page_id1 = PageId::new(0, 1);

        let (frame, _) = pool.new_page(page_id1).unwrap();
        frame.write_data()[0] = 0xAB;
        pool.unpin_page(page_id1, true);

        let page_id2 = PageId::new(0, 2);
        let (frame, evicted) = pool.new_page(page_id2).unwrap();

        let evicted = evicted.expect("dirty page should be returned on eviction");
        assert_eq!(evicted.page_id, page_id1);
        assert_eq!(evicted.data[0], 0xAB);
        assert!(!pool.contains(page_id1));
        // Reused frame starts zeroed
        assert_eq!(frame.read_data()[0], 0);
    }

    #[test]
    fn test_buffer_pool_full_all_pinned() {
        let pool = create_test_pool(2);

        pool.new_page(PageId::new(0, 1)).unwrap();
        pool.new_page(PageId::new(0, 2)).unwrap();

        let result = pool.new_page(PageId::new(0, 3));
        assert!(matches!(result, Err(ZyronError::BufferPoolFull)));
    }

    #[test]
    fn test_buffer_pool_flush_all() {
        let pool = create_test_pool(4);
        for i in 0..3 {
            let page_id = PageId::new(1, i);
            let (frame, _) = pool.new_page(page_id).unwrap();
            frame.write_data()[0] = i as u8 + 1;
            pool.unpin_page(page_id, i != 1);
        }

        let mut seen = Vec::new();
        let flushed = pool
            .flush_all(|page_id, data| {
                seen.push((page_id.page_num, data[0]));
                Ok(())
            })
            .unwrap();

        seen.sort();
        assert_eq!(flushed, 2);
        assert_eq!(seen, vec![(0, 1), (2, 3)]);

        // Everything is clean afterwards
        assert_eq!(pool.flush_all(|_, _| Ok(())).unwrap(), 0);
    }

    #[test]
    fn test_buffer_pool_flush_all_propagates_error() {
        let pool = create_test_pool(2);
        let page_id = PageId::new(0, 0);
        pool.new_page(page_id).unwrap();
        pool.unpin_page(page_id, true);

        let result = pool.flush_all(|_, _| Err(ZyronError::Internal("disk gone".to_string())));
        assert!(result.is_err());
        assert!(pool.fetch_page(page_id).unwrap().is_dirty());
    }
}
