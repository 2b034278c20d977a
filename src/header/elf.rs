//! Implementation of the ELF header. This header is located at the
//! beginning of an ELF object file and is the only header type in the ELF
//! specification which must be located at a specific offset (0) in the file.

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

use crate::base::{read_u16, read_u32, read_word, write_u16, write_u32, write_word, Bits};
use crate::error::Error;

use super::identification::{ElfIdentifier, ElfIdentifierVersion};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[non_exhaustive]
/// The ELF object type. Only `ET_EXEC` and `ET_DYN` are accepted by this
/// crate's parser; other values (relocatable objects, core dumps) are
/// rejected rather than partially modeled.
pub enum ElfType {
    /// No file type
    None = 0,
    /// Relocatable file type
    Relocatable = 1,
    /// Executable file type
    Executable = 2,
    /// Shared object file type
    Dynamic = 3,
    /// Core file
    Core = 4,
}

impl ElfType {
    pub(crate) fn from_raw(value: u16) -> Result<Self, Error> {
        Self::from_u16(value).ok_or(Error::UnsupportedType { value })
    }
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
/// The machine architecture this file targets. This crate only supports the
/// two x86 machine values; anything else is rejected at parse time.
pub enum ElfMachine {
    /// Intel 80386 (32-bit x86)
    I386 = 3,
    /// AMD x86-64
    X86_64 = 62,
}

impl ElfMachine {
    pub(crate) fn expected_for(bits: Bits) -> Self {
        match bits {
            Bits::Elf32 => ElfMachine::I386,
            Bits::Elf64 => ElfMachine::X86_64,
        }
    }

    pub(crate) fn from_raw(value: u16, bits: Bits) -> Result<Self, Error> {
        let expected = Self::expected_for(bits);
        if value != expected as u16 {
            return Err(Error::UnsupportedMachine { value });
        }
        Ok(expected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The ELF file header (`Elf32_Ehdr` / `Elf64_Ehdr`).
///
/// Address- and offset-sized fields (`e_entry`, `e_phoff`, `e_shoff`) are
/// stored widened to `u64` regardless of class, matching this crate's
/// convention of a single Rust width per field with a class-aware codec.
pub struct ElfHeader {
    /// The 16-byte identification field. See [`ElfIdentifier`].
    pub ident: ElfIdentifier,
    /// The object file type.
    pub e_type: ElfType,
    /// The target machine architecture.
    pub e_machine: ElfMachine,
    /// The object file version. Always `EV_CURRENT` (1) for accepted files.
    pub e_version: u32,
    /// Virtual address of the entry point, or 0 if none.
    pub e_entry: u64,
    /// File offset of the program header table, or 0 if none.
    pub e_phoff: u64,
    /// File offset of the section header table, or 0 if none.
    pub e_shoff: u64,
    /// Processor-specific flags.
    pub e_flags: u32,
    /// Size of this header in bytes.
    pub e_ehsize: u16,
    /// Size of one program header table entry.
    pub e_phentsize: u16,
    /// Number of program header table entries.
    pub e_phnum: u16,
    /// Size of one section header table entry.
    pub e_shentsize: u16,
    /// Number of section header table entries.
    pub e_shnum: u16,
    /// Section header table index of the section name string table, or
    /// `SHN_UNDEF` if there is none.
    pub e_shstrndx: u16,
}

/// `SHN_UNDEF`: no associated section.
pub const SHN_UNDEF: u16 = 0;

impl ElfHeader {
    pub(crate) fn decode(data: &[u8], bits: Bits) -> Result<Self, Error> {
        let ident = ElfIdentifier::decode(data)?;
        if ident.version != ElfIdentifierVersion::Current {
            return Err(Error::UnsupportedVersion {
                value: ident.version as u32,
            });
        }

        let size = bits.header_size();
        if data.len() < size {
            return Err(Error::TooShort {
                needed: size,
                have: data.len(),
                offset: 0,
            });
        }

        let e_type = ElfType::from_raw(read_u16(data, 16)?)?;
        let e_machine = ElfMachine::from_raw(read_u16(data, 18)?, bits)?;
        let e_version = read_u32(data, 20)?;
        if e_version != ElfIdentifierVersion::Current as u32 {
            return Err(Error::UnsupportedVersion { value: e_version });
        }

        let word = bits.word_size();
        let mut off = 24;
        let e_entry = read_word(data, off, bits)?;
        off += word;
        let e_phoff = read_word(data, off, bits)?;
        off += word;
        let e_shoff = read_word(data, off, bits)?;
        off += word;
        let e_flags = read_u32(data, off)?;
        off += 4;
        let e_ehsize = read_u16(data, off)?;
        off += 2;
        let e_phentsize = read_u16(data, off)?;
        off += 2;
        let e_phnum = read_u16(data, off)?;
        off += 2;
        let e_shentsize = read_u16(data, off)?;
        off += 2;
        let e_shnum = read_u16(data, off)?;
        off += 2;
        let e_shstrndx = read_u16(data, off)?;

        if !matches!(e_type, ElfType::Executable | ElfType::Dynamic) {
            return Err(Error::UnsupportedType {
                value: e_type as u16,
            });
        }

        Ok(Self {
            ident,
            e_type,
            e_machine,
            e_version,
            e_entry,
            e_phoff,
            e_shoff,
            e_flags,
            e_ehsize,
            e_phentsize,
            e_phnum,
            e_shentsize,
            e_shnum,
            e_shstrndx,
        })
    }

    pub(crate) fn encode(&self, out: &mut [u8], bits: Bits) {
        self.ident.encode(out);
        write_u16(out, 16, self.e_type as u16);
        write_u16(out, 18, self.e_machine as u16);
        write_u32(out, 20, self.e_version);

        let word = bits.word_size();
        let mut off = 24;
        write_word(out, off, self.e_entry, bits);
        off += word;
        write_word(out, off, self.e_phoff, bits);
        off += word;
        write_word(out, off, self.e_shoff, bits);
        off += word;
        write_u32(out, off, self.e_flags);
        off += 4;
        write_u16(out, off, self.e_ehsize);
        off += 2;
        write_u16(out, off, self.e_phentsize);
        off += 2;
        write_u16(out, off, self.e_phnum);
        off += 2;
        write_u16(out, off, self.e_shentsize);
        off += 2;
        write_u16(out, off, self.e_shnum);
        off += 2;
        write_u16(out, off, self.e_shstrndx);
    }
}
