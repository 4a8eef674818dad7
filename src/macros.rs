/// A configurable implementation of the `Flash` trait in memory.
///
/// The backend tracks the highest programmed address as its image length,
/// the way a bootloader would track the extent of the application.
#[macro_export]
macro_rules! ram_flash {
    (

    name=$Name:ident,
    backend=$Backend:ident,
    erase_value=$erase_value:expr,
    base=$base:expr,
    size=$size:expr,

) => {
        pub struct $Backend {
            pub buf: [u8; $size],
            pub image_len: u32,
            pub writes: usize,
        }

        impl Default for $Backend {
            fn default() -> Self {
                $Backend {
                    buf: [$erase_value; $size],
                    image_len: 0,
                    writes: 0,
                }
            }
        }

        pub struct $Name<'backend> {
            backend: &'backend mut $Backend,
        }

        impl<'backend> $Name<'backend> {
            pub const BASE: u32 = $base;
            pub fn new(backend: &'backend mut $Backend) -> Self {
                $Name { backend }
            }

            fn range(addr: u32, len: usize) -> $crate::io::Result<core::ops::Range<usize>> {
                let start = addr.checked_sub(Self::BASE).ok_or($crate::io::Error::Io)? as usize;
                let end = start + len;
                if end > $size {
                    return Err($crate::io::Error::Io);
                }
                Ok(start..end)
            }
        }

        impl<'backend> $crate::driver::Flash for $Name<'backend> {
            fn image_len(&self) -> u32 {
                self.backend.image_len
            }

            fn read(&mut self, addr: u32, buf: &mut [u8]) -> $crate::io::Result<usize> {
                let range = Self::range(addr, buf.len())?;
                buf.copy_from_slice(&self.backend.buf[range]);
                Ok(buf.len())
            }

            fn write(&mut self, addr: u32, data: &[u8]) -> $crate::io::Result<usize> {
                let range = Self::range(addr, data.len())?;
                let end = range.end as u32;
                self.backend.buf[range].copy_from_slice(data);
                self.backend.image_len = self.backend.image_len.max(end);
                self.backend.writes += 1;
                Ok(data.len())
            }
        }
    };
    ($Name:ident, $Backend:ident, $bytes:expr) => {
        $crate::ram_flash!(
            name = $Name,
            backend = $Backend,
            erase_value = 0xff,
            base = 0,
            size = $bytes,
        );
    };
}
