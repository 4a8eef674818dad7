//! The block device presented to the host.
//!
//! Nothing here is backed by storage except the live image: every block is
//! synthesized from the registry when it is read. Writes are scanned for UF2
//! frames, and valid ones are programmed into flash.

use crate::{
    boot,
    consts::BLOCK_SIZE,
    dir,
    driver::{BlockDevice, Flash},
    io::{Error, Result},
    progress::Progress,
    registry::{Content, FileId, FileInfo, Registry},
    table,
    uf2::Codec,
};

/// Where a block address falls on the volume.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Region {
    Boot,
    /// Reserved sectors after the boot sector, always zero.
    Reserved,
    /// Block `index` of allocation table copy `copy`.
    Table { copy: u32, index: u32 },
    Directory { index: u32 },
    /// File data, `index` blocks into the data region.
    Data { index: u32 },
    OutOfRange,
}

pub struct Volume<F: Flash, const N: usize> {
    registry: Registry<N>,
    codec: Codec,
    flash: F,
    progress: Progress,
}

impl<F: Flash, const N: usize> Volume<F, N> {
    pub fn new(registry: Registry<N>, flash: F) -> Self {
        let codec = Codec::new(registry.config());
        debug!(
            "volume: {} blocks, {} files",
            registry.capacity(),
            registry.len()
        );
        Self {
            registry,
            codec,
            flash,
            progress: Progress::new(),
        }
    }

    pub fn registry(&self) -> &Registry<N> {
        &self.registry
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn flash(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn into_flash(self) -> F {
        self.flash
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn capacity(&self) -> u32 {
        self.registry.capacity()
    }

    /// Flash bytes the live image currently exposes.
    pub fn image_len(&self) -> u32 {
        self.codec.image_len(&self.flash)
    }

    pub fn volume_label(&self) -> Option<[u8; 11]> {
        self.registry.config().volume_label()
    }

    pub fn flash_window_size(&self) -> u32 {
        self.registry.config().flash_window_size()
    }

    /// Current view of a file, with the live image sized from flash.
    pub fn file_info(&self, file_id: FileId) -> Option<FileInfo> {
        self.registry.file_info(file_id, self.image_len())
    }

    pub fn region(&self, lba: u32) -> Region {
        let layout = self.registry.layout();
        if lba == 0 {
            Region::Boot
        } else if lba < layout.fat_start {
            Region::Reserved
        } else if lba < layout.dir_start {
            let offset = lba - layout.fat_start;
            Region::Table {
                copy: offset / layout.fat_blocks,
                index: offset % layout.fat_blocks,
            }
        } else if lba < layout.data_start {
            Region::Directory {
                index: lba - layout.dir_start,
            }
        } else if lba < layout.total_blocks {
            Region::Data {
                index: lba - layout.data_start,
            }
        } else {
            Region::OutOfRange
        }
    }

    /// Synthesize block `lba`. Always produces a full block; anything without
    /// content reads as zeros.
    pub fn read_block(&mut self, lba: u32, block: &mut [u8]) {
        debug_assert!(block.len() == BLOCK_SIZE);
        let image_len = self.image_len();
        trace!("read block {}", lba);

        match self.region(lba) {
            Region::Boot => boot::encode(self.registry.config(), &self.registry.layout(), block),
            Region::Table { index, .. } => table::encode_block(&self.registry, image_len, index, block),
            Region::Directory { index } => dir::encode_block(&self.registry, image_len, index, block),
            Region::Data { .. } => self.read_data_block(lba, image_len, block),
            Region::Reserved => block.fill(0),
            Region::OutOfRange => {
                warn!("read past end of volume: block {}", lba);
                block.fill(0);
            }
        }
    }

    fn read_data_block(&mut self, lba: u32, image_len: u32, block: &mut [u8]) {
        let config = self.registry.config();
        let Some((_, file, block_in_file)) = self.registry.locate(lba) else {
            block.fill(0);
            return;
        };
        let offset = block_in_file as usize * BLOCK_SIZE;
        let size = file.size(config, image_len) as usize;
        if offset >= size {
            block.fill(0);
            return;
        }

        match file.content() {
            Content::Static(bytes) => {
                block.fill(0);
                let end = size.min(bytes.len());
                if offset < end {
                    let chunk = &bytes[offset..end.min(offset + BLOCK_SIZE)];
                    block[..chunk.len()].copy_from_slice(chunk);
                }
            }
            Content::LiveImage => {
                if let Err(error) = self.codec.encode(&mut self.flash, block_in_file, block) {
                    error!("flash read failed for frame {}: {:?}", block_in_file, error);
                    block.fill(0);
                }
            }
        }
    }

    /// Consume one written block.
    ///
    /// A valid frame is programmed into flash. A rejected frame has no effect
    /// and reports why, see [`Error::is_frame_drop`]. [`Error::Io`] means the
    /// flash writer failed partway.
    pub fn write_block(&mut self, lba: u32, block: &[u8]) -> Result<()> {
        let flash = &mut self.flash;
        let frame = self
            .codec
            .decode_with(block, |addr, data| flash.write(addr, data))?;

        trace!(
            "frame {}/{} -> {:#x} ({} bytes)",
            frame.block_no,
            frame.num_blocks,
            frame.target_addr,
            frame.payload.len()
        );
        if self.progress.record(frame.block_no, frame.num_blocks) {
            info!("upload complete: {} frames (last at block {})", frame.num_blocks, lba);
        }
        Ok(())
    }

    fn log_write_error(&self, lba: u32, block: &[u8], error: Error) {
        if !error.is_frame_drop() {
            error!("flash write failed for block {}: {:?}", lba, error);
            return;
        }
        match error {
            Error::OutOfWindow => {
                let addr = u32::from_le_bytes([block[12], block[13], block[14], block[15]]);
                warn!("frame at block {} targets {:#x}, outside the flash window", lba, addr);
            }
            Error::BadMagic => match self.region(lba) {
                Region::Data { .. } => debug!("block {} is not a UF2 frame", lba),
                // hosts rewrite tables and directory entries; nothing to keep
                _ => trace!("metadata write to block {} ignored", lba),
            },
            error => debug!("frame at block {} dropped: {:?}", lba, error),
        }
    }
}

impl<F: Flash, const N: usize> BlockDevice for Volume<F, N> {
    fn capacity(&self) -> u32 {
        Volume::capacity(self)
    }

    fn read_blocks(&mut self, lba: u32, buf: &mut [u8]) -> Result<()> {
        if buf.len() % BLOCK_SIZE != 0 {
            return Err(Error::Invalid);
        }
        for (i, block) in buf.chunks_exact_mut(BLOCK_SIZE).enumerate() {
            match lba.checked_add(i as u32) {
                Some(lba) => self.read_block(lba, block),
                None => {
                    warn!("read past end of volume: block {} + {}", lba, i);
                    block.fill(0);
                }
            }
        }
        Ok(())
    }

    fn write_blocks(&mut self, lba: u32, buf: &[u8]) -> Result<()> {
        if buf.len() % BLOCK_SIZE != 0 {
            return Err(Error::Invalid);
        }
        for (i, block) in buf.chunks_exact(BLOCK_SIZE).enumerate() {
            let Some(lba) = lba.checked_add(i as u32) else {
                warn!("write past end of volume: block {} + {}", lba, i);
                continue;
            };
            if let Err(error) = self.write_block(lba, block) {
                self.log_write_error(lba, block, error);
            }
        }
        Ok(())
    }
}
