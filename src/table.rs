//! FAT12 allocation table synthesis.
//!
//! Entries are never stored. Each one is derived from the registry and the
//! current flash image length whenever a table block is read, so the live
//! image chain always matches the size its directory entry reports.

use crate::{
    consts::{BLOCK_SIZE, FAT12_END_OF_CHAIN, FAT12_FREE, FIRST_DATA_CLUSTER},
    registry::Registry,
};

/// Value of allocation entry `cluster`.
pub fn entry<const N: usize>(registry: &Registry<N>, image_len: u32, cluster: u32) -> u16 {
    let config = registry.config();
    match cluster {
        0 => 0xF00 | config.geometry.media as u16,
        1 => FAT12_END_OF_CHAIN,
        cluster => registry
            .iter()
            .find_map(|(_, file)| {
                let start = file.first_cluster() as u32;
                let end = start + file.chain_len(config, image_len);
                if cluster < start || cluster >= end {
                    None
                } else if cluster + 1 == end {
                    Some(FAT12_END_OF_CHAIN)
                } else {
                    Some((cluster + 1) as u16)
                }
            })
            .unwrap_or(FAT12_FREE),
    }
}

/// Two 12 bit entries share three bytes.
fn pack(even: u16, odd: u16) -> [u8; 3] {
    [
        even as u8,
        ((even >> 8) & 0x0F) as u8 | ((odd & 0x0F) << 4) as u8,
        (odd >> 4) as u8,
    ]
}

/// Write block `index` of one table copy into `block`.
pub fn encode_block<const N: usize>(registry: &Registry<N>, image_len: u32, index: u32, block: &mut [u8]) {
    debug_assert!(block.len() == BLOCK_SIZE);
    let start = index as usize * BLOCK_SIZE;
    let end = start + BLOCK_SIZE;

    for pair in start / 3..=(end - 1) / 3 {
        let even = 2 * pair as u32;
        let bytes = pack(
            entry(registry, image_len, even),
            entry(registry, image_len, even + 1),
        );
        for (k, byte) in bytes.iter().enumerate() {
            let offset = 3 * pair + k;
            if (start..end).contains(&offset) {
                block[offset - start] = *byte;
            }
        }
    }
}

/// Follow the chain starting at `first` through the synthesized entries and
/// count its clusters. A chain that does not terminate within the volume's
/// cluster count yields `None`.
pub fn walk_chain<const N: usize>(registry: &Registry<N>, image_len: u32, first: u16) -> Option<u32> {
    if first == 0 {
        return Some(0);
    }
    let limit = registry.layout().clusters;
    let mut cluster = first as u32;
    let mut length = 1;
    loop {
        match entry(registry, image_len, cluster) {
            FAT12_END_OF_CHAIN => return Some(length),
            next if (next as u32) < FIRST_DATA_CLUSTER as u32 || length >= limit => return None,
            next => {
                cluster = next as u32;
                length += 1;
            }
        }
    }
}
