//! Root directory synthesis.

use core::mem::size_of;

use static_assertions::const_assert_eq;
use zerocopy::{
    byteorder::little_endian::{U16, U32},
    FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout,
};

use crate::{
    consts::{BLOCK_SIZE, DIR_ENTRIES_PER_BLOCK, DIR_ENTRY_SIZE, SHORT_NAME_LEN},
    registry::{Attributes, Registry, VirtualFile},
};

/// One 32 byte short name directory entry.
///
/// Timestamps are never set; a read-only volume has nothing to date.
#[derive(Clone, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct DirEntry {
    pub name: [u8; SHORT_NAME_LEN],
    pub attributes: u8,
    pub nt_reserved: u8,
    pub create_time_tenths: u8,
    pub create_time: U16,
    pub create_date: U16,
    pub access_date: U16,
    pub cluster_high: U16,
    pub write_time: U16,
    pub write_date: U16,
    pub cluster_low: U16,
    pub size: U32,
}

const_assert_eq!(size_of::<DirEntry>(), DIR_ENTRY_SIZE);

impl DirEntry {
    pub fn label(label: &[u8; SHORT_NAME_LEN]) -> Self {
        let mut entry = Self::new_zeroed();
        entry.name = *label;
        entry.attributes = Attributes::VOLUME_ID.bits();
        entry
    }

    pub fn file(file: &VirtualFile, start_cluster: u16, size: u32) -> Self {
        let mut entry = Self::new_zeroed();
        entry.name = *file.name().as_bytes();
        entry.attributes = file.attributes().bits();
        entry.cluster_low = U16::new(start_cluster);
        entry.size = U32::new(size);
        entry
    }
}

/// Write root directory block `index` into `block`.
///
/// Slot 0 holds the volume label when one is configured; registered files
/// follow in order. Unused slots are zero, which also marks the end of the
/// directory for the host.
pub fn encode_block<const N: usize>(registry: &Registry<N>, image_len: u32, index: u32, block: &mut [u8]) {
    debug_assert!(block.len() == BLOCK_SIZE);
    let config = registry.config();
    let label = config.volume_label();
    let first_file_slot = label.is_some() as usize;
    block.fill(0);

    let first_slot = index as usize * DIR_ENTRIES_PER_BLOCK;
    for (i, entry) in block.chunks_exact_mut(DIR_ENTRY_SIZE).enumerate() {
        let slot = first_slot + i;
        if slot == 0 {
            if let Some(label) = &label {
                entry.copy_from_slice(DirEntry::label(label).as_bytes());
                continue;
            }
        }
        let Some(ordinal) = slot.checked_sub(first_file_slot) else {
            continue;
        };
        let Some((_, file)) = registry.iter().nth(ordinal) else {
            // everything after the last file is zero
            break;
        };
        let dir_entry = DirEntry::file(
            file,
            file.start_cluster(config, image_len),
            file.size(config, image_len),
        );
        entry.copy_from_slice(dir_entry.as_bytes());
    }
}
