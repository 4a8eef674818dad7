//! The `Flash` and `BlockDevice` traits.

use crate::io::Result;

/// Users of this library provide access to program memory by implementing this trait.
///
/// Addresses are absolute, exactly as they appear in UF2 frames.
/// The `write` method is assumed to be committed to flash before it returns;
/// any page erase the hardware needs is the implementor's business.
/// It may block for as long as programming takes.
pub trait Flash {
    /// Number of bytes of firmware currently present, counted from the start
    /// of the flash window. Queried on every directory, table and image read.
    fn image_len(&self) -> u32;

    /// Read `buf.len()` bytes starting at `addr`.
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<usize>;

    /// Program `data` starting at `addr`.
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<usize>;
}

impl<F: Flash + ?Sized> Flash for &mut F {
    fn image_len(&self) -> u32 {
        (**self).image_len()
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<usize> {
        (**self).read(addr, buf)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<usize> {
        (**self).write(addr, data)
    }
}

/// Block level interface a USB mass storage transport drives.
///
/// Buffers are always a whole number of 512 byte blocks. Implementations
/// answer every in-range read with data and treat undecodable writes as
/// no-ops, so only malformed buffers produce an error.
pub trait BlockDevice {
    /// Total number of blocks on the volume.
    fn capacity(&self) -> u32;

    /// Fill `buf` with `buf.len() / 512` consecutive blocks starting at `lba`.
    fn read_blocks(&mut self, lba: u32, buf: &mut [u8]) -> Result<()>;

    /// Consume `buf.len() / 512` consecutive blocks starting at `lba`.
    fn write_blocks(&mut self, lba: u32, buf: &[u8]) -> Result<()>;
}
