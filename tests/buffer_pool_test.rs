use anyhow::Result;

use probedb::storage::buffer::BufferPoolError;

mod common;
use common::create_test_buffer_pool;

#[test]
fn test_new_page() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(10)?;

    // Create a new page
    let (page, page_id) = buffer_pool.new_page()?;

    // Check that page_id is valid (should be greater than 0)
    assert!(page_id > 0);

    // Check that page can be accessed
    {
        let page_guard = page.read();
        assert_eq!(page_guard.page_id, page_id);
    }

    // Unpin the page
    buffer_pool.unpin_page(page_id, false)?;

    Ok(())
}

#[test]
fn test_fetch_page() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(10)?;

    // Create a new page
    let (_, page_id) = buffer_pool.new_page()?;

    // Unpin the page
    buffer_pool.unpin_page(page_id, false)?;

    // Fetch the page
    let fetched_page = buffer_pool.fetch_page(page_id)?;

    // Check that the page ID matches
    {
        let page_guard = fetched_page.read();
        assert_eq!(page_guard.page_id, page_id);
    }

    // Unpin the fetched page
    buffer_pool.unpin_page(page_id, false)?;

    Ok(())
}

#[test]
fn test_fetch_invalid_page_id_fails() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(10)?;

    let result = buffer_pool.fetch_page(0);
    assert!(matches!(result, Err(BufferPoolError::InvalidPageId(0))));

    Ok(())
}

#[test]
fn test_page_modification() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(10)?;

    // Create a new page
    let (page, page_id) = buffer_pool.new_page()?;

    // Modify the page
    {
        let mut page_guard = page.write();
        let test_data = b"Test Data";
        page_guard.data[100..100 + test_data.len()].copy_from_slice(test_data);
    }

    // Unpin the page with dirty flag
    buffer_pool.unpin_page(page_id, true)?;

    // Fetch the page again
    let fetched_page = buffer_pool.fetch_page(page_id)?;

    // Check that modifications persisted
    {
        let page_guard = fetched_page.read();
        let test_data = b"Test Data";
        let page_slice = &page_guard.data[100..100 + test_data.len()];
        assert_eq!(page_slice, test_data);
    }

    // Unpin the fetched page
    buffer_pool.unpin_page(page_id, false)?;

    Ok(())
}

#[test]
fn test_pool_churn_writes_back_evicted_pages() -> Result<()> {
    // Pool of four frames, four resident pages
    let (buffer_pool, _temp_file) = create_test_buffer_pool(4)?;

    let mut page_ids = Vec::new();
    for i in 0..4u8 {
        let (page, page_id) = buffer_pool.new_page()?;
        {
            let mut page_guard = page.write();
            page_guard.data[0] = i + 1;
        }
        buffer_pool.unpin_page(page_id, true)?;
        page_ids.push(page_id);
    }

    // First page is resident, so fetching it does no I/O and pins it
    let first_page = buffer_pool.fetch_page(page_ids[0])?;
    assert_eq!(first_page.read().data[0], 1);

    // A fifth page must evict one of the other three, writing it back
    let (_, fifth_id) = buffer_pool.new_page()?;
    buffer_pool.unpin_page(fifth_id, false)?;
    buffer_pool.unpin_page(page_ids[0], false)?;

    // Every earlier page still reads back with its original content
    for (i, &page_id) in page_ids.iter().enumerate() {
        let page = buffer_pool.fetch_page(page_id)?;
        assert_eq!(page.read().data[0], i as u8 + 1);
        buffer_pool.unpin_page(page_id, false)?;
    }

    Ok(())
}

#[test]
fn test_pinned_pool_exhaustion() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(2)?;

    // Fill the pool without unpinning
    let (_page1, page_id1) = buffer_pool.new_page()?;
    let (_page2, _page_id2) = buffer_pool.new_page()?;

    // No frame is free and none is evictable
    let result = buffer_pool.new_page();
    assert!(matches!(result, Err(BufferPoolError::BufferPoolFull)));

    // Fetching an absent page also needs a frame and fails the same way
    let result = buffer_pool.fetch_page(page_id1 + 100);
    assert!(matches!(result, Err(BufferPoolError::BufferPoolFull)));

    Ok(())
}

#[test]
fn test_double_unpin_fails() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(10)?;

    let (_, page_id) = buffer_pool.new_page()?;

    buffer_pool.unpin_page(page_id, false)?;
    let result = buffer_pool.unpin_page(page_id, false);
    assert!(matches!(result, Err(BufferPoolError::PageNotPinned(_))));

    Ok(())
}

#[test]
fn test_unpin_dirty_flag_is_sticky() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(4)?;

    // Dirty the page, then unpin with the dirty flag
    let (page, page_id) = buffer_pool.new_page()?;
    {
        let mut page_guard = page.write();
        page_guard.data[0] = 0xAB;
    }
    buffer_pool.unpin_page(page_id, true)?;

    // Re-pin and unpin clean; the earlier dirty marking must survive
    buffer_pool.fetch_page(page_id)?;
    buffer_pool.unpin_page(page_id, false)?;

    // Churn the pool so the page is evicted and written back
    for _ in 0..4 {
        let (_, churn_id) = buffer_pool.new_page()?;
        buffer_pool.unpin_page(churn_id, false)?;
    }

    let fetched_page = buffer_pool.fetch_page(page_id)?;
    assert_eq!(fetched_page.read().data[0], 0xAB);
    buffer_pool.unpin_page(page_id, false)?;

    Ok(())
}

#[test]
fn test_flush_page() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(10)?;

    // Create a new page
    let (page, page_id) = buffer_pool.new_page()?;

    // Modify the page
    {
        let mut page_guard = page.write();
        let test_data = b"Test Data For Flushing";
        page_guard.data[100..100 + test_data.len()].copy_from_slice(test_data);
    }

    // Unpin the page with dirty flag
    buffer_pool.unpin_page(page_id, true)?;

    // Flush the page
    buffer_pool.flush_page(page_id)?;

    // Fetch the page again
    let fetched_page = buffer_pool.fetch_page(page_id)?;

    // Check that modifications persisted after flush
    {
        let page_guard = fetched_page.read();
        let test_data = b"Test Data For Flushing";
        let page_slice = &page_guard.data[100..100 + test_data.len()];
        assert_eq!(page_slice, test_data);
    }

    buffer_pool.unpin_page(page_id, false)?;

    Ok(())
}

#[test]
fn test_flush_missing_page_fails() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(10)?;

    let result = buffer_pool.flush_page(42);
    assert!(matches!(result, Err(BufferPoolError::PageNotFound(42))));

    Ok(())
}

#[test]
fn test_flush_all_pages() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(10)?;

    // Create several pages and modify them
    let mut page_ids = Vec::new();
    for i in 0..5 {
        let (page, page_id) = buffer_pool.new_page()?;

        // Modify the page
        {
            let mut page_guard = page.write();
            let test_data = format!("Test Data {}", i).into_bytes();
            page_guard.data[100..100 + test_data.len()].copy_from_slice(&test_data);
        }

        buffer_pool.unpin_page(page_id, true)?; // Mark as dirty
        page_ids.push(page_id);
    }

    // Flush all pages
    buffer_pool.flush_all_pages()?;

    // Fetch each page and verify data
    for (i, &page_id) in page_ids.iter().enumerate() {
        let fetched_page = buffer_pool.fetch_page(page_id)?;

        {
            let page_guard = fetched_page.read();
            let expected_data = format!("Test Data {}", i).into_bytes();
            let page_slice = &page_guard.data[100..100 + expected_data.len()];
            assert_eq!(page_slice, expected_data.as_slice());
        }

        buffer_pool.unpin_page(page_id, false)?;
    }

    Ok(())
}

#[test]
fn test_delete_page() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(10)?;

    // Create a new page
    let (_, page_id) = buffer_pool.new_page()?;

    // Unpin the page
    buffer_pool.unpin_page(page_id, false)?;

    // Delete the page
    buffer_pool.delete_page(page_id)?;

    // The freed frame and page ID are available again
    let (new_page, new_page_id) = buffer_pool.new_page()?;

    // Check that new page works properly
    {
        let page_guard = new_page.read();
        assert_eq!(page_guard.page_id, new_page_id);
    }

    buffer_pool.unpin_page(new_page_id, false)?;

    Ok(())
}

#[test]
fn test_delete_pinned_page_fails() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(10)?;

    let (_, page_id) = buffer_pool.new_page()?;

    let result = buffer_pool.delete_page(page_id);
    assert!(matches!(result, Err(BufferPoolError::PagePinned(_))));

    // Still usable after the failed delete
    buffer_pool.unpin_page(page_id, false)?;
    buffer_pool.delete_page(page_id)?;

    Ok(())
}

#[test]
fn test_concurrent_fetch_and_unpin() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(8)?;

    // Sixteen pages, each tagged with its index
    let mut page_ids = Vec::new();
    for i in 0..16u8 {
        let (page, page_id) = buffer_pool.new_page()?;
        {
            let mut page_guard = page.write();
            page_guard.data[0] = i;
        }
        buffer_pool.unpin_page(page_id, true)?;
        page_ids.push(page_id);
    }

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let buffer_pool = buffer_pool.clone();
            let page_ids = page_ids.clone();
            scope.spawn(move || {
                for (i, &page_id) in page_ids.iter().enumerate() {
                    let page = buffer_pool.fetch_page(page_id).unwrap();
                    assert_eq!(page.read().data[0], i as u8);
                    buffer_pool.unpin_page(page_id, false).unwrap();
                }
            });
        }
    });

    // Every pin was matched by an unpin, so the whole pool is reclaimable
    for _ in 0..8 {
        let (_, churn_id) = buffer_pool.new_page()?;
        buffer_pool.unpin_page(churn_id, false)?;
    }

    Ok(())
}
