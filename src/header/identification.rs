//! Implementation of the `e_ident` field of the ELF header. This field is
//! located at the beginning of an ELF object file and specifies how the rest
//! of the file is to be decoded.

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

use crate::base::{read_u8, write_u8};
use crate::error::Error;

/// The magic number every ELF file begins with: `0x7F`, `'E'`, `'L'`, `'F'`.
pub const ELF_MAGIC: [u8; 4] = [0x7f, 0x45, 0x4c, 0x46];

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
#[non_exhaustive]
/// The file's class/capacity, i.e. whether it is 32-bit or 64-bit.
///
/// A file's data encoding and class specify how to interpret the basic
/// objects in a file. Class `ELFCLASS32` files use objects that occupy 1, 2,
/// and 4 bytes. Class `ELFCLASS64` files use objects that occupy 1, 2, 4, and
/// 8 bytes.
pub enum ElfClass {
    /// Invalid class
    None = 0,
    /// 32-bit
    Elf32 = 1,
    /// 64-bit
    Elf64 = 2,
}

impl ElfClass {
    pub(crate) fn from_byte(value: u8) -> Result<Self, Error> {
        Self::from_u8(value).ok_or(Error::UnsupportedClass { value })
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
#[non_exhaustive]
/// The file's data encoding, i.e. whether it is little-endian or
/// big-endian. Only `ELFDATA2LSB` is supported by this crate; big-endian
/// input is rejected at parse time rather than partially decoded.
pub enum ElfDataEncoding {
    /// Invalid/unspecified
    None = 0,
    /// Little-endian (`ELFDATA2LSB`)
    LittleEndian = 1,
    /// Big-endian (`ELFDATA2MSB`) — unsupported, rejected at parse time
    BigEndian = 2,
}

impl ElfDataEncoding {
    pub(crate) fn from_byte(value: u8) -> Result<Self, Error> {
        Self::from_u8(value).ok_or(Error::UnsupportedData { value })
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[non_exhaustive]
/// The version of the ELF specification this file claims to follow.
pub enum ElfIdentifierVersion {
    /// Invalid version
    None = 0,
    /// The only version ELF has ever had
    Current = 1,
}

impl ElfIdentifierVersion {
    pub(crate) fn from_byte(value: u8) -> Result<Self, Error> {
        Self::from_u8(value).ok_or(Error::UnsupportedVersion {
            value: value as u32,
        })
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[non_exhaustive]
/// The OS/ABI this file targets. Only the System V and Linux extensions are
/// accepted; anything else is rejected rather than guessed at.
pub enum ElfOSABI {
    /// Unix System V ABI, or unspecified
    NoneSystemV = 0,
    /// Object uses GNU/Linux ELF extensions
    GnuLinux = 3,
}

impl ElfOSABI {
    pub(crate) fn from_byte(value: u8) -> Result<Self, Error> {
        Self::from_u8(value).ok_or(Error::UnsupportedABI { value })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The 16-byte `e_ident` field of the ELF header.
///
/// Unlike the rest of the header, `e_ident` is decoded the same way
/// regardless of class or data encoding — it's what tells the parser which
/// class and encoding to use for everything that follows.
pub struct ElfIdentifier {
    /// The file's class. See [`ElfClass`].
    pub class: ElfClass,
    /// The file's data encoding. See [`ElfDataEncoding`].
    pub data_encoding: ElfDataEncoding,
    /// The file's identifier version. See [`ElfIdentifierVersion`].
    pub version: ElfIdentifierVersion,
    /// The file's OS/ABI. See [`ElfOSABI`].
    pub os_abi: ElfOSABI,
    /// The ABI version. Only 0 is accepted by this crate.
    pub abi_version: u8,
    /// The 7 reserved padding bytes, preserved verbatim for round-tripping.
    pub pad: [u8; 7],
}

impl ElfIdentifier {
    /// Size in bytes of `e_ident` (`EI_NIDENT`).
    pub const SIZE: usize = 16;

    pub(crate) fn decode(data: &[u8]) -> Result<Self, Error> {
        if data.len() < Self::SIZE {
            return Err(Error::TooShort {
                needed: Self::SIZE,
                have: data.len(),
                offset: 0,
            });
        }
        if data[0..4] != ELF_MAGIC {
            return Err(Error::BadMagic);
        }
        let class = ElfClass::from_byte(read_u8(data, 4)?)?;
        let data_encoding = ElfDataEncoding::from_byte(read_u8(data, 5)?)?;
        if data_encoding != ElfDataEncoding::LittleEndian {
            return Err(Error::UnsupportedData {
                value: data_encoding as u8,
            });
        }
        let version = ElfIdentifierVersion::from_byte(read_u8(data, 6)?)?;
        let os_abi = ElfOSABI::from_byte(read_u8(data, 7)?)?;
        let abi_version = read_u8(data, 8)?;
        if abi_version != 0 {
            return Err(Error::UnsupportedABI { value: abi_version });
        }
        let mut pad = [0u8; 7];
        pad.copy_from_slice(&data[9..16]);

        Ok(Self {
            class,
            data_encoding,
            version,
            os_abi,
            abi_version,
            pad,
        })
    }

    pub(crate) fn encode(&self, out: &mut [u8]) {
        out[0..4].copy_from_slice(&ELF_MAGIC);
        write_u8(out, 4, self.class as u8);
        write_u8(out, 5, self.data_encoding as u8);
        write_u8(out, 6, self.version as u8);
        write_u8(out, 7, self.os_abi as u8);
        write_u8(out, 8, self.abi_version);
        out[9..16].copy_from_slice(&self.pad);
    }
}
