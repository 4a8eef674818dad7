//! Error type shared by registration, synthesis and the UF2 codec.

use ufmt::derive::uDebug;

pub type Result<T> = core::result::Result<T, Error>;

/// Definition of errors that might be returned by volume functionality.
#[derive(Clone, Copy, Debug, Eq, PartialEq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Input / output error reported by the flash backend.
    Io,
    /// A buffer handed in by the transport was not block shaped.
    Invalid,
    /// Start or end magic of a UF2 frame did not match.
    BadMagic,
    /// Payload size field exceeds 476 bytes.
    PayloadTooLarge,
    /// Frame is flagged as not targeting main flash.
    NotMainFlash,
    /// Frame targets a different board family.
    FamilyMismatch,
    /// Frame targets memory outside the writable flash window.
    OutOfWindow,
    /// Root directory has no slot left.
    DirectoryFull,
    /// Allocation would exceed the FAT12 cluster range.
    ClustersExhausted,
    /// Name cannot be expressed as an 8.3 short name.
    InvalidName,
    /// A file with this id is already registered.
    DuplicateId,
    /// A file with this name is already registered.
    DuplicateName,
    /// Only one live image file may be registered.
    MultipleLiveImages,
}

impl Error {
    /// Errors that make the write path silently skip a frame.
    pub fn is_frame_drop(&self) -> bool {
        matches!(
            self,
            Error::BadMagic
                | Error::PayloadTooLarge
                | Error::NotMainFlash
                | Error::FamilyMismatch
                | Error::OutOfWindow
        )
    }

    /// Errors raised while populating the registry. These are fatal at boot.
    pub fn is_registration(&self) -> bool {
        matches!(
            self,
            Error::DirectoryFull
                | Error::ClustersExhausted
                | Error::InvalidName
                | Error::DuplicateId
                | Error::DuplicateName
                | Error::MultipleLiveImages
        )
    }
}
