//! In-memory debug log.
//!
//! `LogStore` keeps the most recent output of a device that has no console:
//! text is appended until the buffer fills up, then the older half is
//! discarded. It accepts both `core::fmt` and `ufmt` formatting, so
//! `write!` and `uwrite!` work on it directly.

use core::{convert::Infallible, fmt, str};

const LINE_TOO_LONG: &[u8] = b"DMESG line too long!\n";

/// Callback that receives the log contents on [`LogStore::flush`].
pub type FlushFn = fn(&[u8]);

pub struct LogStore<const N: usize> {
    ptr: usize,
    buffer: [u8; N],
    flush: Option<FlushFn>,
}

impl<const N: usize> Default for LogStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LogStore<N> {
    pub const fn new() -> Self {
        Self {
            ptr: 0,
            buffer: [0; N],
            flush: None,
        }
    }

    pub fn set_flush_fn(&mut self, flush: FlushFn) {
        self.flush = Some(flush);
    }

    /// Hand the current contents to the flush callback, if any.
    pub fn flush(&self) {
        if let Some(flush) = self.flush {
            flush(self.as_bytes());
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.ptr]
    }

    /// Contents as text, unless trimming split a multi-byte character.
    pub fn as_str(&self) -> Option<&str> {
        str::from_utf8(self.as_bytes()).ok()
    }

    pub fn len(&self) -> usize {
        self.ptr
    }

    pub fn is_empty(&self) -> bool {
        self.ptr == 0
    }

    pub fn clear(&mut self) {
        self.ptr = 0;
    }

    /// Append raw bytes, discarding the older half of the log if needed.
    pub fn append(&mut self, mut msg: &[u8]) {
        debug_assert!(N >= 256, "log buffer too small");
        let trim = N / 2;
        if self.ptr + msg.len() >= N {
            if msg.len() + 1 >= trim {
                self.ptr = 0;
                msg = LINE_TOO_LONG;
            } else {
                let keep_from = trim.min(self.ptr);
                self.buffer.copy_within(keep_from..self.ptr, 0);
                self.ptr -= keep_from;
            }
        }
        let len = msg.len().min(N - self.ptr);
        self.buffer[self.ptr..self.ptr + len].copy_from_slice(&msg[..len]);
        self.ptr += len;
    }
}

impl<const N: usize> fmt::Write for LogStore<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s.as_bytes());
        Ok(())
    }
}

impl<const N: usize> ufmt::uWrite for LogStore<N> {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
        self.append(s.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write as _;

    #[test]
    fn formats_with_both_flavours() {
        let mut log = LogStore::<256>::new();
        write!(log, "USB: error #{} at {:#x}\n", 3, 0x20u32).unwrap();
        ufmt::uwrite!(log, "frames={}\n", 16u32).unwrap();
        assert_eq!(log.as_str(), Some("USB: error #3 at 0x20\nframes=16\n"));
    }

    #[test]
    fn drops_older_half_when_full() {
        let mut log = LogStore::<256>::new();
        for _ in 0..25 {
            log.append(b"0123456789");
        }
        assert_eq!(log.len(), 250);
        log.append(b"abcdefghij");
        // 250 - 128 kept, then the new line
        assert_eq!(log.len(), 132);
        assert!(log.as_bytes().ends_with(b"abcdefghij"));
    }

    #[test]
    fn overlong_line_resets() {
        let mut log = LogStore::<256>::new();
        log.append(b"boot\n");
        log.append(&[b'x'; 300]);
        assert_eq!(log.as_bytes(), LINE_TOO_LONG);
    }

    #[test]
    fn flush_sees_contents() {
        fn check(contents: &[u8]) {
            assert_eq!(contents, b"hello");
        }
        let mut log = LogStore::<256>::new();
        log.append(b"hello");
        log.set_flush_fn(check);
        log.flush();
    }
}
