//! Volume and flash configuration.

use crate::{
    consts::{BLOCK_SIZE, DIR_ENTRIES_PER_BLOCK, SHORT_NAME_LEN, UF2_PAYLOAD_MAX},
    io::{Error, Result},
};

/// Region of program memory that UF2 writes may touch, and that the live
/// image file exposes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlashWindow {
    pub start: u32,
    pub len: u32,
}

impl FlashWindow {
    pub const fn new(start: u32, len: u32) -> Self {
        Self { start, len }
    }

    /// One past the last writable address.
    pub const fn end(&self) -> u64 {
        self.start as u64 + self.len as u64
    }

    /// Whether `[addr, addr + len)` lies entirely inside the window.
    pub const fn contains(&self, addr: u32, len: u32) -> bool {
        let addr = addr as u64;
        addr >= self.start as u64 && addr + len as u64 <= self.end()
    }
}

/// Shape of the synthesized FAT12 volume.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Geometry {
    /// Blocks per cluster, a power of two.
    pub sectors_per_cluster: u8,
    /// Blocks before the first allocation table, the boot sector included.
    pub reserved_sectors: u16,
    /// Copies of the allocation table.
    pub fat_count: u8,
    /// Root directory slots, a multiple of 16.
    pub root_entries: u16,
    /// Media descriptor, also stored in allocation entry 0.
    pub media: u8,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            sectors_per_cluster: 1,
            reserved_sectors: 1,
            fat_count: 2,
            root_entries: 64,
            media: 0xF8,
        }
    }
}

impl Geometry {
    pub const fn cluster_bytes(&self) -> u32 {
        self.sectors_per_cluster as u32 * BLOCK_SIZE as u32
    }

    pub const fn dir_blocks(&self) -> u32 {
        (self.root_entries as u32 + DIR_ENTRIES_PER_BLOCK as u32 - 1) / DIR_ENTRIES_PER_BLOCK as u32
    }

    /// Clusters needed to hold `bytes`, rounded up.
    pub const fn clusters_for(&self, bytes: u32) -> u32 {
        let cluster = self.cluster_bytes();
        (bytes / cluster) + (bytes % cluster != 0) as u32
    }
}

/// Everything the volume needs to know besides the file table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// Volume label, at most 11 ASCII characters. `None` omits the label.
    pub volume_label: Option<&'static str>,
    /// OEM name stored in the boot sector, at most 8 ASCII characters.
    pub oem_name: &'static str,
    pub volume_serial: u32,
    pub flash: FlashWindow,
    /// Flash bytes carried per UF2 frame when reading the live image.
    pub chunk_size: u32,
    /// Board family stamped on outgoing frames and required on incoming ones.
    pub family_id: Option<u32>,
    pub geometry: Geometry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            volume_label: Some("UF2BOOT"),
            oem_name: "UF2 UF2",
            volume_serial: 0x0042_0042,
            flash: FlashWindow::new(0, 256 * 1024),
            chunk_size: 256,
            family_id: None,
            geometry: Geometry::default(),
        }
    }
}

impl Config {
    pub const fn with_volume_label(mut self, label: Option<&'static str>) -> Self {
        self.volume_label = label;
        self
    }

    pub const fn with_flash(mut self, start: u32, len: u32) -> Self {
        self.flash = FlashWindow::new(start, len);
        self
    }

    pub const fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub const fn with_family_id(mut self, family_id: Option<u32>) -> Self {
        self.family_id = family_id;
        self
    }

    pub const fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Label as stored on disk: space padded to 11 bytes.
    pub fn volume_label(&self) -> Option<[u8; SHORT_NAME_LEN]> {
        self.volume_label.map(|label| {
            let mut padded = [b' '; SHORT_NAME_LEN];
            for (to, from) in padded.iter_mut().zip(label.bytes()) {
                *to = from.to_ascii_uppercase();
            }
            padded
        })
    }

    pub const fn flash_window_size(&self) -> u32 {
        self.flash.len
    }

    /// Number of UF2 frames needed to carry `bytes` of flash.
    pub const fn frames_for(&self, bytes: u32) -> u32 {
        (bytes / self.chunk_size) + (bytes % self.chunk_size != 0) as u32
    }

    /// Root directory slots left for files once the label took its own.
    pub const fn file_slots(&self) -> usize {
        let slots = self.geometry.root_entries as usize;
        if self.volume_label.is_some() {
            slots.saturating_sub(1)
        } else {
            slots
        }
    }

    pub fn validate(&self) -> Result<()> {
        let geometry = &self.geometry;
        let ok = self.chunk_size.is_power_of_two()
            && self.chunk_size as usize <= UF2_PAYLOAD_MAX
            && self.flash.len > 0
            && self.flash.end() <= u32::MAX as u64 + 1
            && geometry.sectors_per_cluster.is_power_of_two()
            && geometry.reserved_sectors >= 1
            && geometry.fat_count >= 1
            && geometry.root_entries > 0
            && geometry.root_entries as usize % DIR_ENTRIES_PER_BLOCK == 0
            && self.oem_name.len() <= 8
            && self.oem_name.is_ascii()
            && self
                .volume_label
                .map_or(true, |label| label.len() <= SHORT_NAME_LEN && label.is_ascii());
        if ok {
            Ok(())
        } else {
            Err(Error::Invalid)
        }
    }
}
