//! UF2 frame encoding and decoding.
//!
//! A frame is one 512 byte block, little endian throughout:
//! two start magics, flags, target address, payload size, block number,
//! block count, file size or family id, 476 payload bytes, end magic.
//! Every frame names the absolute address its payload belongs at, so frames
//! can be applied in any order and any number of times.

use core::mem::size_of;

use bitflags::bitflags;
use static_assertions::const_assert_eq;
use zerocopy::{byteorder::little_endian::U32, FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    config::{Config, FlashWindow},
    consts::{BLOCK_SIZE, UF2_MAGIC_END, UF2_MAGIC_START0, UF2_MAGIC_START1, UF2_PAYLOAD_MAX},
    driver::Flash,
    io::{Error, Result},
};

bitflags! {
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Uf2Flags: u32 {
        /// Block carries comments or data that must not reach main flash.
        const NOT_MAIN_FLASH = 0x0000_0001;
        const FILE_CONTAINER = 0x0000_1000;
        /// The file size field holds a board family id.
        const FAMILY_ID_PRESENT = 0x0000_2000;
        const MD5_PRESENT = 0x0000_4000;
        const EXTENSION_TAGS = 0x0000_8000;
    }
}

/// Wire layout of one frame.
#[derive(Clone, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct Uf2Block {
    pub magic_start0: U32,
    pub magic_start1: U32,
    pub flags: U32,
    pub target_addr: U32,
    pub payload_size: U32,
    pub block_no: U32,
    pub num_blocks: U32,
    /// File size, or family id when `FAMILY_ID_PRESENT` is set.
    pub file_size: U32,
    pub data: [u8; UF2_PAYLOAD_MAX],
    pub magic_end: U32,
}

const_assert_eq!(size_of::<Uf2Block>(), BLOCK_SIZE);

impl Uf2Block {
    /// A well formed frame carrying `payload` (at most 476 bytes) to `target_addr`.
    pub fn new(target_addr: u32, payload: &[u8], block_no: u32, num_blocks: u32, family_id: Option<u32>) -> Self {
        debug_assert!(payload.len() <= UF2_PAYLOAD_MAX);
        let mut data = [0u8; UF2_PAYLOAD_MAX];
        data[..payload.len()].copy_from_slice(payload);
        let (flags, file_size) = match family_id {
            Some(family_id) => (Uf2Flags::FAMILY_ID_PRESENT, family_id),
            None => (Uf2Flags::empty(), 0),
        };
        Self {
            magic_start0: U32::new(UF2_MAGIC_START0),
            magic_start1: U32::new(UF2_MAGIC_START1),
            flags: U32::new(flags.bits()),
            target_addr: U32::new(target_addr),
            payload_size: U32::new(payload.len() as u32),
            block_no: U32::new(block_no),
            num_blocks: U32::new(num_blocks),
            file_size: U32::new(file_size),
            data,
            magic_end: U32::new(UF2_MAGIC_END),
        }
    }

    pub fn flags(&self) -> Uf2Flags {
        Uf2Flags::from_bits_retain(self.flags.get())
    }

    pub fn has_valid_magic(&self) -> bool {
        self.magic_start0.get() == UF2_MAGIC_START0
            && self.magic_start1.get() == UF2_MAGIC_START1
            && self.magic_end.get() == UF2_MAGIC_END
    }

    /// Family id, if the frame declares one.
    pub fn family_id(&self) -> Option<u32> {
        self.flags()
            .contains(Uf2Flags::FAMILY_ID_PRESENT)
            .then(|| self.file_size.get())
    }
}

/// A validated inbound frame, borrowing its payload from the block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Frame<'b> {
    pub flags: Uf2Flags,
    pub target_addr: u32,
    pub payload: &'b [u8],
    pub block_no: u32,
    pub num_blocks: u32,
    pub family_id: Option<u32>,
}

/// Turns flash contents into frames and frames back into flash writes.
#[derive(Clone, Copy, Debug)]
pub struct Codec {
    window: FlashWindow,
    chunk_size: u32,
    family_id: Option<u32>,
}

impl Codec {
    pub fn new(config: &Config) -> Self {
        Self {
            window: config.flash,
            chunk_size: config.chunk_size,
            family_id: config.family_id,
        }
    }

    pub fn window(&self) -> FlashWindow {
        self.window
    }

    /// Flash bytes currently exposed, never more than the window.
    pub fn image_len<F: Flash + ?Sized>(&self, flash: &F) -> u32 {
        flash.image_len().min(self.window.len)
    }

    /// Frames needed to carry `image_len` bytes.
    pub fn num_frames(&self, image_len: u32) -> u32 {
        image_len / self.chunk_size + (image_len % self.chunk_size != 0) as u32
    }

    /// Encode frame `index` of the current image into `block`.
    ///
    /// Bytes past the end of the image are zero.
    pub fn encode<F: Flash + ?Sized>(&self, flash: &mut F, index: u32, block: &mut [u8]) -> Result<()> {
        if block.len() != BLOCK_SIZE {
            return Err(Error::Invalid);
        }
        let image_len = self.image_len(flash);
        let offset = index.saturating_mul(self.chunk_size);
        let target_addr = self.window.start.wrapping_add(offset);
        let available = image_len.saturating_sub(offset).min(self.chunk_size) as usize;

        let mut frame = Uf2Block::new(
            target_addr,
            &[],
            index,
            self.num_frames(image_len),
            self.family_id,
        );
        frame.payload_size = U32::new(self.chunk_size);
        if self.family_id.is_none() {
            frame.file_size = U32::new(image_len);
        }
        if available > 0 {
            flash.read(target_addr, &mut frame.data[..available])?;
        }

        block.copy_from_slice(frame.as_bytes());
        Ok(())
    }

    /// Validate `block` as a frame this device accepts.
    pub fn decode<'b>(&self, block: &'b [u8]) -> Result<Frame<'b>> {
        let raw = Uf2Block::ref_from_bytes(block).map_err(|_| Error::Invalid)?;
        if !raw.has_valid_magic() {
            return Err(Error::BadMagic);
        }
        let payload_size = raw.payload_size.get();
        if payload_size as usize > UF2_PAYLOAD_MAX {
            return Err(Error::PayloadTooLarge);
        }
        let flags = raw.flags();
        if flags.contains(Uf2Flags::NOT_MAIN_FLASH) {
            return Err(Error::NotMainFlash);
        }
        let family_id = raw.family_id();
        if let (Some(expected), Some(found)) = (self.family_id, family_id) {
            if expected != found {
                return Err(Error::FamilyMismatch);
            }
        }
        let target_addr = raw.target_addr.get();
        if !self.window.contains(target_addr, payload_size) {
            return Err(Error::OutOfWindow);
        }

        Ok(Frame {
            flags,
            target_addr,
            payload: &raw.data[..payload_size as usize],
            block_no: raw.block_no.get(),
            num_blocks: raw.num_blocks.get(),
            family_id,
        })
    }

    /// Decode `block` and hand its payload to `write`.
    ///
    /// `write` is only called for frames that passed every check, so a
    /// rejected frame never touches flash.
    pub fn decode_with<'b, W>(&self, block: &'b [u8], mut write: W) -> Result<Frame<'b>>
    where
        W: FnMut(u32, &[u8]) -> Result<usize>,
    {
        let frame = self.decode(block)?;
        if !frame.payload.is_empty() {
            write(frame.target_addr, frame.payload)?;
        }
        Ok(frame)
    }
}
