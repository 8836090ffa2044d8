use std::mem;
use byteorder::{ByteOrder, LittleEndian};
use serde::{Serialize, Deserialize};

use crate::common::types::{Page, PAGE_SIZE};
use crate::index::hash::block::HashBlockPage;
use crate::index::hash::error::HashTableError;
use crate::index::hash::header::HashHeaderPage;

// Header page layout:
// - lsn: u64 (8 bytes)
// - page_id: u32 (4 bytes)
// - size: u64 (8 bytes)
// - block_count: u16 (2 bytes)
// followed by block_count page IDs (4 bytes each)
pub(crate) const HEADER_PAGE_PREFIX: usize = 22;

// Block page layout:
// - slot_count: u16 (2 bytes)
// - occupied flags, one byte per slot
// - readable flags, one byte per slot
// followed by one length-prefixed entry per slot (2-byte length,
// zero for a slot that has never been written)
pub(crate) const BLOCK_PAGE_PREFIX: usize = 2;
const ENTRY_LEN_SIZE: usize = 2;
const SLOT_FLAG_SIZE: usize = 2;

/// Number of slots a block page can hold for the given key/value types.
///
/// Estimated from the in-memory sizes the same way the on-disk encoding
/// lays slots out; variable-length encodings that blow past the estimate
/// surface as `BlockOverflow` at serialization time.
pub fn calculate_block_capacity<K, V>() -> usize {
    let entry_size = mem::size_of::<K>() + mem::size_of::<V>();
    let per_slot = entry_size + ENTRY_LEN_SIZE + SLOT_FLAG_SIZE;

    ((PAGE_SIZE - BLOCK_PAGE_PREFIX) / per_slot).max(1)
}

/// Serialize the header view into a page
pub fn serialize_header(header: &HashHeaderPage, page: &mut Page) -> Result<(), HashTableError> {
    let block_count = header.num_blocks();
    if HEADER_PAGE_PREFIX + block_count * 4 > PAGE_SIZE {
        return Err(HashTableError::HeaderOverflow);
    }

    page.data.fill(0);
    LittleEndian::write_u64(&mut page.data[0..8], header.lsn());
    LittleEndian::write_u32(&mut page.data[8..12], header.page_id());
    LittleEndian::write_u64(&mut page.data[12..20], header.size() as u64);
    LittleEndian::write_u16(&mut page.data[20..22], block_count as u16);

    let mut offset = HEADER_PAGE_PREFIX;
    for index in 0..block_count {
        // num_blocks bounds the index, so the ID is always present
        let block_page_id = header.block_page_id(index).unwrap_or_default();
        LittleEndian::write_u32(&mut page.data[offset..offset + 4], block_page_id);
        offset += 4;
    }

    Ok(())
}

/// Deserialize the header view from a page
pub fn deserialize_header(page: &Page) -> Result<HashHeaderPage, HashTableError> {
    let lsn = LittleEndian::read_u64(&page.data[0..8]);
    let page_id = LittleEndian::read_u32(&page.data[8..12]);
    let size = LittleEndian::read_u64(&page.data[12..20]) as usize;
    let block_count = LittleEndian::read_u16(&page.data[20..22]) as usize;

    if HEADER_PAGE_PREFIX + block_count * 4 > PAGE_SIZE {
        return Err(HashTableError::DeserializationError(
            "block directory exceeds page".to_string(),
        ));
    }

    let mut block_page_ids = Vec::with_capacity(block_count);
    let mut offset = HEADER_PAGE_PREFIX;
    for _ in 0..block_count {
        block_page_ids.push(LittleEndian::read_u32(&page.data[offset..offset + 4]));
        offset += 4;
    }

    Ok(HashHeaderPage::from_parts(lsn, page_id, size, block_page_ids))
}

/// Serialize a block view into a page
pub fn serialize_block<K, V>(
    block: &HashBlockPage<K, V>,
    page: &mut Page,
) -> Result<(), HashTableError>
where
    K: Serialize,
    V: Serialize,
{
    let slot_count = block.capacity();

    page.data.fill(0);
    LittleEndian::write_u16(&mut page.data[0..2], slot_count as u16);

    let occupied_base = BLOCK_PAGE_PREFIX;
    let readable_base = occupied_base + slot_count;
    let mut offset = readable_base + slot_count;

    if offset > PAGE_SIZE {
        return Err(HashTableError::BlockOverflow);
    }

    for slot in 0..slot_count {
        page.data[occupied_base + slot] = block.is_occupied(slot) as u8;
        page.data[readable_base + slot] = block.is_readable(slot) as u8;
    }

    for slot in 0..slot_count {
        match block.entry(slot) {
            Some(entry) => {
                let entry_bytes = bincode::serialize(entry).map_err(|_| {
                    HashTableError::SerializationError("Failed to serialize entry".to_string())
                })?;

                if offset + ENTRY_LEN_SIZE + entry_bytes.len() > PAGE_SIZE {
                    return Err(HashTableError::BlockOverflow);
                }

                LittleEndian::write_u16(
                    &mut page.data[offset..offset + ENTRY_LEN_SIZE],
                    entry_bytes.len() as u16,
                );
                offset += ENTRY_LEN_SIZE;

                page.data[offset..offset + entry_bytes.len()].copy_from_slice(&entry_bytes);
                offset += entry_bytes.len();
            }
            None => {
                if offset + ENTRY_LEN_SIZE > PAGE_SIZE {
                    return Err(HashTableError::BlockOverflow);
                }
                LittleEndian::write_u16(&mut page.data[offset..offset + ENTRY_LEN_SIZE], 0);
                offset += ENTRY_LEN_SIZE;
            }
        }
    }

    Ok(())
}

/// Deserialize a block view from a page.
///
/// A freshly allocated page decodes as an empty block of `capacity` slots;
/// its zeroed slot count distinguishes it from a serialized block.
pub fn deserialize_block<K, V>(
    page: &Page,
    capacity: usize,
) -> Result<HashBlockPage<K, V>, HashTableError>
where
    K: for<'de> Deserialize<'de>,
    V: for<'de> Deserialize<'de>,
{
    let slot_count = LittleEndian::read_u16(&page.data[0..2]) as usize;
    if slot_count == 0 {
        return Ok(HashBlockPage::new(capacity));
    }

    let occupied_base = BLOCK_PAGE_PREFIX;
    let readable_base = occupied_base + slot_count;
    let mut offset = readable_base + slot_count;

    if offset > PAGE_SIZE {
        return Err(HashTableError::DeserializationError(
            "slot bitmaps exceed page".to_string(),
        ));
    }

    let mut block = HashBlockPage::new(slot_count);
    for slot in 0..slot_count {
        let occupied = page.data[occupied_base + slot] == 1;
        let readable = page.data[readable_base + slot] == 1;

        if offset + ENTRY_LEN_SIZE > PAGE_SIZE {
            return Err(HashTableError::DeserializationError(
                "entry length prefix exceeds page".to_string(),
            ));
        }
        let entry_len = LittleEndian::read_u16(&page.data[offset..offset + ENTRY_LEN_SIZE]) as usize;
        offset += ENTRY_LEN_SIZE;

        let entry = if entry_len > 0 {
            if offset + entry_len > PAGE_SIZE {
                return Err(HashTableError::DeserializationError(
                    "entry exceeds page".to_string(),
                ));
            }
            let entry = bincode::deserialize(&page.data[offset..offset + entry_len])
                .map_err(|_| {
                    HashTableError::DeserializationError(
                        "Failed to deserialize entry".to_string(),
                    )
                })?;
            offset += entry_len;
            Some(entry)
        } else {
            None
        };

        block.restore_slot(slot, occupied, readable, entry);
    }

    Ok(block)
}
