#[cfg(test)]
mod tests {
    use crate::common::types::Page;
    use crate::index::hash::block::HashBlockPage;
    use crate::index::hash::header::HashHeaderPage;
    use crate::index::hash::serialization::{
        calculate_block_capacity, deserialize_block, deserialize_header, serialize_block,
        serialize_header,
    };

    #[test]
    fn test_calculate_block_capacity() {
        let capacity = calculate_block_capacity::<i32, i32>();
        assert!(capacity > 1);

        // Wider entries fit fewer slots per page
        let wide_capacity = calculate_block_capacity::<[u64; 8], i32>();
        assert!(wide_capacity < capacity);
        assert!(wide_capacity >= 1);
    }

    #[test]
    fn test_block_slot_state_machine() {
        let mut block: HashBlockPage<i32, i32> = HashBlockPage::new(8);

        // Empty slot
        assert!(!block.is_occupied(3));
        assert!(!block.is_readable(3));
        assert!(block.key_at(3).is_none());

        // Live slot
        assert!(block.insert(3, 42, 7));
        assert!(block.is_occupied(3));
        assert!(block.is_readable(3));
        assert_eq!(block.key_at(3), Some(&42));
        assert_eq!(block.value_at(3), Some(&7));

        // A written slot cannot be claimed again
        assert!(!block.insert(3, 99, 1));
        assert_eq!(block.key_at(3), Some(&42));

        // Tombstone keeps the occupied bit
        block.remove(3);
        assert!(block.is_occupied(3));
        assert!(!block.is_readable(3));
    }

    #[test]
    fn test_block_round_trip() {
        let capacity = 16;
        let mut block: HashBlockPage<i32, i32> = HashBlockPage::new(capacity);
        block.insert(0, 1, 100);
        block.insert(5, 2, 200);
        block.insert(15, 3, 300);
        block.remove(5);

        let mut page = Page::new(1);
        serialize_block(&block, &mut page).unwrap();
        let decoded: HashBlockPage<i32, i32> = deserialize_block(&page, capacity).unwrap();

        assert_eq!(decoded.capacity(), capacity);
        assert!(decoded.is_readable(0));
        assert_eq!(decoded.key_at(0), Some(&1));
        assert_eq!(decoded.value_at(0), Some(&100));

        // The tombstone survives the round trip
        assert!(decoded.is_occupied(5));
        assert!(!decoded.is_readable(5));

        assert!(decoded.is_readable(15));
        assert_eq!(decoded.value_at(15), Some(&300));

        assert!(!decoded.is_occupied(1));
    }

    #[test]
    fn test_fresh_page_decodes_as_empty_block() {
        let page = Page::new(1);
        let block: HashBlockPage<i32, i32> = deserialize_block(&page, 32).unwrap();
        assert_eq!(block.capacity(), 32);
        for slot in 0..block.capacity() {
            assert!(!block.is_occupied(slot));
        }
    }

    #[test]
    fn test_header_round_trip() {
        let mut header = HashHeaderPage::new(7);
        header.set_size(2048);
        header.add_block_page_id(11);
        header.add_block_page_id(12);
        header.add_block_page_id(13);

        let mut page = Page::new(7);
        serialize_header(&header, &mut page).unwrap();
        let decoded = deserialize_header(&page).unwrap();

        assert_eq!(decoded.page_id(), 7);
        assert_eq!(decoded.size(), 2048);
        assert_eq!(decoded.num_blocks(), 3);
        assert_eq!(decoded.block_page_id(0), Some(11));
        assert_eq!(decoded.block_page_id(2), Some(13));
        assert_eq!(decoded.block_page_id(3), None);
    }

    #[test]
    fn test_string_entries_round_trip() {
        let capacity = 4;
        let mut block: HashBlockPage<String, u32> = HashBlockPage::new(capacity);
        block.insert(1, "alpha".to_string(), 1);
        block.insert(2, "beta".to_string(), 2);

        let mut page = Page::new(1);
        serialize_block(&block, &mut page).unwrap();
        let decoded: HashBlockPage<String, u32> = deserialize_block(&page, capacity).unwrap();

        assert_eq!(decoded.key_at(1).map(String::as_str), Some("alpha"));
        assert_eq!(decoded.key_at(2).map(String::as_str), Some("beta"));
        assert_eq!(decoded.value_at(2), Some(&2));
    }
}
