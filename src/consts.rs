/// Size of one block on the wire, in bytes. Sectors, UF2 frames and
/// directory blocks all share it.
pub const BLOCK_SIZE: usize = 512;

pub const UF2_MAGIC_START0: u32 = 0x0A32_4655;
pub const UF2_MAGIC_START1: u32 = 0x9E5D_5157;
pub const UF2_MAGIC_END: u32 = 0x0AB1_6F30;

/// Largest payload a single UF2 frame can carry.
pub const UF2_PAYLOAD_MAX: usize = 476;

/// Bytes of one 8.3 short name, without the dot.
pub const SHORT_NAME_LEN: usize = 11;
/// Bytes of one root directory entry.
pub const DIR_ENTRY_SIZE: usize = 32;
pub const DIR_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;

/// First cluster index usable for file data.
pub const FIRST_DATA_CLUSTER: u16 = 2;
/// FAT12 stops at 4084 clusters, anything above is read as FAT16.
pub const FAT12_MAX_CLUSTERS: u32 = 4084;
pub const FAT12_END_OF_CHAIN: u16 = 0xFFF;
pub const FAT12_FREE: u16 = 0x000;

pub const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];
pub const FS_TYPE_FAT12: &[u8; 8] = b"FAT12   ";

/// Number of frame indices `Progress` can remember.
pub const MAX_TRACKED_FRAMES: usize = 4096;
