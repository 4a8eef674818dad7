//! 8.3 short names

use core::{fmt, str};

use crate::{
    consts::SHORT_NAME_LEN,
    io::{Error, Result},
};

/// A file name in directory entry form: 8 bytes of base name and 3 bytes of
/// extension, both space padded, upper case, no dot.
// Invariants:
// 1. every byte is an allowed short name character or a padding space
// 2. the first byte is not a space
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShortName([u8; SHORT_NAME_LEN]);

const BASE_LEN: usize = 8;
const EXT_LEN: usize = 3;

fn is_allowed(byte: u8) -> bool {
    byte.is_ascii_uppercase()
        || byte.is_ascii_digit()
        || b"!#$%&'()-@^_`{}~".contains(&byte)
}

impl ShortName {
    /// Convert a name like `"info_uf2.txt"` into `b"INFO_UF2TXT"`.
    ///
    /// ```
    /// # use uf2fs::name::ShortName;
    /// let name = ShortName::new("index.htm").unwrap();
    /// assert_eq!(name.as_bytes(), b"INDEX   HTM");
    /// assert!(ShortName::new("toolongname.txt").is_err());
    /// ```
    pub fn new(name: &str) -> Result<Self> {
        let (base, ext) = match name.split_once('.') {
            Some((base, ext)) => (base, ext),
            None => (name, ""),
        };
        if base.is_empty() || base.len() > BASE_LEN || ext.len() > EXT_LEN {
            return Err(Error::InvalidName);
        }

        let mut raw = [b' '; SHORT_NAME_LEN];
        let (base_raw, ext_raw) = raw.split_at_mut(BASE_LEN);
        let fields = base
            .bytes()
            .zip(base_raw.iter_mut())
            .chain(ext.bytes().zip(ext_raw.iter_mut()));
        for (from, to) in fields {
            let upper = from.to_ascii_uppercase();
            if !is_allowed(upper) {
                return Err(Error::InvalidName);
            }
            *to = upper;
        }
        Ok(Self(raw))
    }

    pub const fn as_bytes(&self) -> &[u8; SHORT_NAME_LEN] {
        &self.0
    }

    pub fn base(&self) -> &str {
        trim(&self.0[..BASE_LEN])
    }

    pub fn extension(&self) -> &str {
        trim(&self.0[BASE_LEN..])
    }
}

fn trim(field: &[u8]) -> &str {
    let len = field.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    // ASCII by construction
    str::from_utf8(&field[..len]).unwrap_or("")
}

impl fmt::Display for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base())?;
        if !self.extension().is_empty() {
            f.write_str(".")?;
            f.write_str(self.extension())?;
        }
        Ok(())
    }
}

impl fmt::Debug for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShortName({})", self)
    }
}

impl TryFrom<&str> for ShortName {
    type Error = Error;

    fn try_from(name: &str) -> Result<Self> {
        Self::new(name)
    }
}
