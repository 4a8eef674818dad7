//! Bookkeeping of which frames of an upload have arrived.
//!
//! Purely informational: flashing never waits on it, and frames are applied
//! whether or not they were seen before.

use crate::consts::MAX_TRACKED_FRAMES;

const WORDS: usize = MAX_TRACKED_FRAMES / 32;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Progress {
    seen: [u32; WORDS],
    expected: u32,
    received: u32,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    pub const fn new() -> Self {
        Self {
            seen: [0; WORDS],
            expected: 0,
            received: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Note that frame `block_no` of an upload of `num_blocks` frames arrived.
    ///
    /// A different `num_blocks` than before starts a new upload. Returns
    /// `true` exactly once, for the frame that completes the upload.
    pub fn record(&mut self, block_no: u32, num_blocks: u32) -> bool {
        if num_blocks != self.expected {
            self.reset();
            self.expected = num_blocks;
        }
        if block_no >= num_blocks || block_no as usize >= MAX_TRACKED_FRAMES {
            return false;
        }

        let word = block_no as usize / 32;
        let bit = 1 << (block_no % 32);
        if self.seen[word] & bit != 0 {
            return false;
        }
        self.seen[word] |= bit;
        self.received += 1;
        self.is_complete()
    }

    pub fn received(&self) -> u32 {
        self.received
    }

    pub fn expected(&self) -> u32 {
        self.expected
    }

    /// Every announced frame was seen at least once. Uploads larger than
    /// `MAX_TRACKED_FRAMES` never complete.
    pub fn is_complete(&self) -> bool {
        self.expected > 0 && self.received == self.expected
    }
}
