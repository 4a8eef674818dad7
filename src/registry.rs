//! The table of virtual files and the volume layout derived from it.

use bitflags::bitflags;
use heapless::Vec;

use crate::{
    config::Config,
    consts::{BLOCK_SIZE, FAT12_MAX_CLUSTERS, FIRST_DATA_CLUSTER},
    io::{Error, Result},
    name::ShortName,
};

bitflags! {
    /// Directory entry attribute byte.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Attributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN = 0x02;
        const SYSTEM = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE = 0x20;
    }
}

bitflags! {
    /// Per-file bookkeeping flags.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct FileFlags: u8 {
        /// Reported size follows the flash contents instead of the registered size.
        const DYNAMIC_SIZE = 0x01;
    }
}

/// What a file reads back as.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Content {
    /// Fixed bytes, zero padded to the registered size.
    Static(&'static [u8]),
    /// The flash window, encoded as UF2 frames.
    LiveImage,
}

/// Index of a file in its registry, in registration order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileId(pub(crate) u16);

impl FileId {
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

pub const INFO_FILE_ID: u16 = 0;
pub const INDEX_FILE_ID: u16 = 1;
pub const CURRENT_FILE_ID: u16 = 2;

pub const DEFAULT_INFO_TXT: &str = "UF2 Bootloader v1.0\r\n\
Model: Generic UF2 board\r\n\
Board-ID: Generic-UF2\r\n";

pub const DEFAULT_INDEX_HTM: &str = "<!doctype html>\n\
<html><body><script>\n\
location.replace(\"https://microsoft.github.io/uf2/\");\n\
</script></body></html>\n";

/// One registered file. Immutable once added.
#[derive(Clone, Debug)]
pub struct VirtualFile {
    id: u16,
    name: ShortName,
    size: u32,
    start_cluster: u16,
    attributes: Attributes,
    flags: FileFlags,
    content: Content,
}

impl VirtualFile {
    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn name(&self) -> &ShortName {
        &self.name
    }

    /// Registered size. For the live image this is the largest size it can
    /// ever report, which is what its clusters are reserved for.
    pub fn reserved_size(&self) -> u32 {
        self.size
    }

    /// First cluster reserved for this file, regardless of its current size.
    pub fn first_cluster(&self) -> u16 {
        self.start_cluster
    }

    pub fn attributes(&self) -> Attributes {
        self.attributes
    }

    pub fn flags(&self) -> FileFlags {
        self.flags
    }

    pub fn content(&self) -> Content {
        self.content
    }

    pub fn is_live_image(&self) -> bool {
        self.content == Content::LiveImage
    }

    /// Size as reported right now, given the current flash image length.
    pub fn size(&self, config: &Config, image_len: u32) -> u32 {
        if self.flags.contains(FileFlags::DYNAMIC_SIZE) {
            let flash_len = image_len.min(config.flash.len);
            config.frames_for(flash_len) * BLOCK_SIZE as u32
        } else {
            self.size
        }
    }

    pub fn reserved_clusters(&self, config: &Config) -> u32 {
        config.geometry.clusters_for(self.size)
    }

    /// Length of the allocation chain for the size reported right now.
    pub fn chain_len(&self, config: &Config, image_len: u32) -> u32 {
        config.geometry.clusters_for(self.size(config, image_len))
    }

    /// Start cluster as written to the directory: 0 for an empty file.
    pub fn start_cluster(&self, config: &Config, image_len: u32) -> u16 {
        if self.chain_len(config, image_len) == 0 {
            0
        } else {
            self.start_cluster
        }
    }
}

/// Snapshot of one file as the host currently sees it.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileInfo {
    pub id: u16,
    pub name: ShortName,
    pub size: u32,
    pub start_cluster: u16,
    pub clusters: u32,
    pub live: bool,
}

/// Block ranges of the synthesized volume.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Layout {
    pub fat_start: u32,
    /// Blocks of one allocation table copy.
    pub fat_blocks: u32,
    pub fat_count: u32,
    pub dir_start: u32,
    pub dir_blocks: u32,
    pub data_start: u32,
    /// Data clusters reserved by all files.
    pub clusters: u32,
    pub sectors_per_cluster: u32,
    pub total_blocks: u32,
}

impl Layout {
    fn new(config: &Config, clusters: u32) -> Self {
        let geometry = &config.geometry;
        // two reserved entries, 12 bits each
        let fat_bytes = ((clusters + FIRST_DATA_CLUSTER as u32) * 3 + 1) / 2;
        let fat_blocks = (fat_bytes + BLOCK_SIZE as u32 - 1) / BLOCK_SIZE as u32;
        let fat_start = geometry.reserved_sectors as u32;
        let fat_count = geometry.fat_count as u32;
        let dir_start = fat_start + fat_blocks * fat_count;
        let dir_blocks = geometry.dir_blocks();
        let data_start = dir_start + dir_blocks;
        let sectors_per_cluster = geometry.sectors_per_cluster as u32;
        Self {
            fat_start,
            fat_blocks,
            fat_count,
            dir_start,
            dir_blocks,
            data_start,
            clusters,
            sectors_per_cluster,
            total_blocks: data_start + clusters * sectors_per_cluster,
        }
    }

    /// First block of `cluster`.
    pub fn cluster_block(&self, cluster: u16) -> u32 {
        self.data_start + (cluster as u32 - FIRST_DATA_CLUSTER as u32) * self.sectors_per_cluster
    }
}

/// Fixed capacity, append-only table of virtual files.
///
/// Populate it before the device enumerates; after that it is only read.
pub struct Registry<const N: usize> {
    config: Config,
    files: Vec<VirtualFile, N>,
    next_cluster: u32,
}

impl<const N: usize> Registry<N> {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            files: Vec::new(),
            next_cluster: FIRST_DATA_CLUSTER as u32,
        })
    }

    /// Registry holding `INFO_UF2.TXT`, `INDEX.HTM` and `CURRENT.UF2`.
    pub fn with_default_files(config: Config) -> Result<Self> {
        let mut registry = Self::new(config)?;
        registry.add_static(INFO_FILE_ID, "INFO_UF2.TXT", DEFAULT_INFO_TXT.as_bytes())?;
        registry.add_static(INDEX_FILE_ID, "INDEX.HTM", DEFAULT_INDEX_HTM.as_bytes())?;
        registry.add_live_image(CURRENT_FILE_ID, "CURRENT.UF2")?;
        Ok(registry)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Append a file, reserving `ceil(size / cluster bytes)` clusters right
    /// after the previous file's.
    pub fn add_file(&mut self, id: u16, name: &str, size: u32, content: Content) -> Result<FileId> {
        let name = ShortName::new(name)?;

        if self.files.len() >= self.config.file_slots().min(N) {
            return Err(Error::DirectoryFull);
        }
        if self.files.iter().any(|file| file.id == id) {
            return Err(Error::DuplicateId);
        }
        if self.files.iter().any(|file| file.name == name) {
            return Err(Error::DuplicateName);
        }
        if content == Content::LiveImage && self.live_image().is_some() {
            return Err(Error::MultipleLiveImages);
        }

        let clusters = self.config.geometry.clusters_for(size);
        let next_cluster = self.next_cluster + clusters;
        if next_cluster - FIRST_DATA_CLUSTER as u32 > FAT12_MAX_CLUSTERS {
            return Err(Error::ClustersExhausted);
        }

        let (attributes, flags) = match content {
            Content::Static(_) => (Attributes::READ_ONLY, FileFlags::empty()),
            Content::LiveImage => (Attributes::ARCHIVE, FileFlags::DYNAMIC_SIZE),
        };
        let file = VirtualFile {
            id,
            name,
            size,
            start_cluster: self.next_cluster as u16,
            attributes,
            flags,
            content,
        };
        let file_id = FileId(self.files.len() as u16);
        self.files.push(file).map_err(|_| Error::DirectoryFull)?;
        self.next_cluster = next_cluster;

        info!(
            "registered {} id={} size={} clusters={}",
            file_id.0,
            id,
            size,
            clusters
        );
        Ok(file_id)
    }

    pub fn add_static(&mut self, id: u16, name: &str, content: &'static [u8]) -> Result<FileId> {
        self.add_file(id, name, content.len() as u32, Content::Static(content))
    }

    /// Register the file exposing the flash window, sized for a full window.
    pub fn add_live_image(&mut self, id: u16, name: &str) -> Result<FileId> {
        let max_size = self.config.frames_for(self.config.flash.len) * BLOCK_SIZE as u32;
        self.add_file(id, name, max_size, Content::LiveImage)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, file_id: FileId) -> Option<&VirtualFile> {
        self.files.get(file_id.index())
    }

    /// Look a file up by the id it was registered with.
    pub fn find(&self, id: u16) -> Option<FileId> {
        self.files
            .iter()
            .position(|file| file.id == id)
            .map(|index| FileId(index as u16))
    }

    pub fn iter(&self) -> impl Iterator<Item = (FileId, &VirtualFile)> + '_ {
        self.files
            .iter()
            .enumerate()
            .map(|(index, file)| (FileId(index as u16), file))
    }

    pub fn live_image(&self) -> Option<(FileId, &VirtualFile)> {
        self.iter().find(|(_, file)| file.is_live_image())
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.config, self.next_cluster - FIRST_DATA_CLUSTER as u32)
    }

    /// Total blocks of the volume: reserved, tables, directory and all
    /// reserved data clusters.
    pub fn capacity(&self) -> u32 {
        self.layout().total_blocks
    }

    /// File owning the data block `lba`, with the block's index inside it.
    pub fn locate(&self, lba: u32) -> Option<(FileId, &VirtualFile, u32)> {
        let layout = self.layout();
        self.iter().find_map(|(file_id, file)| {
            let blocks = file.reserved_clusters(&self.config) * layout.sectors_per_cluster;
            if blocks == 0 {
                return None;
            }
            let start = layout.cluster_block(file.start_cluster);
            (lba >= start && lba < start + blocks).then(|| (file_id, file, lba - start))
        })
    }

    pub fn file_info(&self, file_id: FileId, image_len: u32) -> Option<FileInfo> {
        let file = self.get(file_id)?;
        Some(FileInfo {
            id: file.id,
            name: file.name,
            size: file.size(&self.config, image_len),
            start_cluster: file.start_cluster(&self.config, image_len),
            clusters: file.chain_len(&self.config, image_len),
            live: file.is_live_image(),
        })
    }
}
