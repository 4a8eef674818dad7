//! Boot sector synthesis.

use core::mem::size_of;

use static_assertions::const_assert_eq;
use zerocopy::{
    byteorder::little_endian::{U16, U32},
    FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout,
};

use crate::{
    config::Config,
    consts::{BLOCK_SIZE, BOOT_SIGNATURE, FS_TYPE_FAT12, SHORT_NAME_LEN},
    registry::Layout,
};

const JUMP: [u8; 3] = [0xEB, 0x3C, 0x90];
const DRIVE_NUMBER: u8 = 0x80;
const EXTENDED_BOOT_SIGNATURE: u8 = 0x29;
const NO_NAME: &[u8; SHORT_NAME_LEN] = b"NO NAME    ";

/// Boot sector of a FAT12/16 volume: BIOS parameter block, extended boot
/// record, boot code area and signature.
#[derive(Clone, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct BootSector {
    pub jump: [u8; 3],
    pub oem_name: [u8; 8],
    pub bytes_per_sector: U16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: U16,
    pub fat_count: u8,
    pub root_entries: U16,
    /// Total sectors, 0 if they only fit `total_sectors_32`.
    pub total_sectors_16: U16,
    pub media: u8,
    pub sectors_per_fat: U16,
    pub sectors_per_track: U16,
    pub heads: U16,
    pub hidden_sectors: U32,
    pub total_sectors_32: U32,
    pub drive_number: u8,
    pub reserved: u8,
    pub boot_signature: u8,
    pub volume_serial: U32,
    pub volume_label: [u8; SHORT_NAME_LEN],
    pub fs_type: [u8; 8],
    pub boot_code: [u8; 448],
    pub signature: [u8; 2],
}

const_assert_eq!(size_of::<BootSector>(), BLOCK_SIZE);

impl BootSector {
    pub fn new(config: &Config, layout: &Layout) -> Self {
        let geometry = &config.geometry;
        let mut sector = Self::new_zeroed();

        sector.jump = JUMP;
        sector.oem_name = [b' '; 8];
        for (to, from) in sector.oem_name.iter_mut().zip(config.oem_name.bytes()) {
            *to = from;
        }

        sector.bytes_per_sector = U16::new(BLOCK_SIZE as u16);
        sector.sectors_per_cluster = geometry.sectors_per_cluster;
        sector.reserved_sectors = U16::new(geometry.reserved_sectors);
        sector.fat_count = geometry.fat_count;
        sector.root_entries = U16::new(geometry.root_entries);
        match u16::try_from(layout.total_blocks) {
            Ok(total) => sector.total_sectors_16 = U16::new(total),
            Err(_) => sector.total_sectors_32 = U32::new(layout.total_blocks),
        }
        sector.media = geometry.media;
        sector.sectors_per_fat = U16::new(layout.fat_blocks as u16);
        sector.sectors_per_track = U16::new(1);
        sector.heads = U16::new(1);

        sector.drive_number = DRIVE_NUMBER;
        sector.boot_signature = EXTENDED_BOOT_SIGNATURE;
        sector.volume_serial = U32::new(config.volume_serial);
        sector.volume_label = config.volume_label().unwrap_or(*NO_NAME);
        sector.fs_type = *FS_TYPE_FAT12;
        sector.signature = BOOT_SIGNATURE;
        sector
    }
}

/// Write the boot sector for `layout` into `block`.
pub fn encode(config: &Config, layout: &Layout, block: &mut [u8]) {
    debug_assert!(block.len() == BLOCK_SIZE);
    block.copy_from_slice(BootSector::new(config, layout).as_bytes());
}
