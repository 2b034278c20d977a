//! Implementation of the ELF section header.

use bitflags::bitflags;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

use crate::base::{read_u32, read_word, write_u32, write_word, Bits};
use crate::error::Error;

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[non_exhaustive]
/// The type of an ELF section (`sh_type`).
pub enum SectionType {
    /// Marks the section header as inactive; it has no associated section.
    Null = 0,
    /// Holds information defined by the program.
    ProgBits = 1,
    /// A complete symbol table.
    SymTab = 2,
    /// A string table.
    StrTab = 3,
    /// Relocation entries with explicit addends.
    Rela = 4,
    /// A symbol hash table.
    Hash = 5,
    /// Information for dynamic linking.
    Dynamic = 6,
    /// Marks the file in some way (notes).
    Note = 7,
    /// Occupies no space in the file, otherwise resembles `SHT_PROGBITS`.
    NoBits = 8,
    /// Relocation entries without explicit addends.
    Rel = 9,
    /// Reserved.
    ShLib = 10,
    /// A minimal symbol table for dynamic linking.
    DynSym = 11,
    /// An array of pointers to initialization functions.
    InitArray = 14,
    /// An array of pointers to termination functions.
    FiniArray = 15,
    /// An array of pointers to pre-initialization functions.
    PreInitArray = 16,
    /// A section group.
    Group = 17,
    /// Extended section indices for a symbol table.
    SymTabShndx = 18,
}

impl SectionType {
    /// Convert from the raw `sh_type` value, falling back to `Null` for
    /// reserved/OS/processor-specific ranges this crate does not interpret
    /// (it never needs to act on them, only round-trip them).
    pub(crate) fn from_raw(value: u32) -> Self {
        Self::from_u32(value).unwrap_or(SectionType::Null)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Section header flags (`sh_flags`).
    pub struct SectionFlags: u64 {
        /// Section contains writable data.
        const WRITE = 0x1;
        /// Section occupies memory during execution.
        const ALLOC = 0x2;
        /// Section contains executable machine instructions.
        const EXECINSTR = 0x4;
        /// Section may be merged to eliminate duplication.
        const MERGE = 0x10;
        /// Section contains null-terminated strings.
        const STRINGS = 0x20;
        /// `sh_info` holds a section header table index.
        const INFO_LINK = 0x40;
        /// Preserve section ordering when linking.
        const LINK_ORDER = 0x80;
        /// Requires OS-specific handling to avoid incorrect behavior.
        const OS_NONCONFORMING = 0x100;
        /// Section is a member of a group.
        const GROUP = 0x200;
        /// Section holds thread-local storage.
        const TLS = 0x400;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single ELF section: its header fields plus the name resolved from the
/// section header string table.
pub struct Section {
    /// Index into the section header string table.
    pub sh_name: u32,
    /// The section's type.
    pub sh_type: SectionType,
    /// The raw, unparsed `sh_type` value (preserves OS/processor-specific
    /// types this crate's [`SectionType`] enum does not name).
    pub sh_type_raw: u32,
    /// Section attribute flags.
    pub sh_flags: SectionFlags,
    /// Virtual address of the section's first byte in memory, or 0.
    pub sh_addr: u64,
    /// Byte offset of the section in the file.
    pub sh_offset: u64,
    /// Size of the section in bytes.
    pub sh_size: u64,
    /// Section header table index link, meaning depends on `sh_type`.
    pub sh_link: u32,
    /// Extra information, meaning depends on `sh_type`.
    pub sh_info: u32,
    /// Required alignment of the section.
    pub sh_addralign: u64,
    /// Size of each entry, for sections holding a fixed-size entry table.
    pub sh_entsize: u64,
    /// The section's name, resolved from the section header string table.
    pub name: String,
}

impl Section {
    pub(crate) fn decode_header(data: &[u8], offset: usize, bits: Bits) -> Result<Self, Error> {
        let word = bits.word_size();
        let mut off = offset;

        let sh_name = read_u32(data, off)?;
        off += 4;
        let sh_type_raw = read_u32(data, off)?;
        off += 4;
        let sh_flags = read_word(data, off, bits)?;
        off += word;
        let sh_addr = read_word(data, off, bits)?;
        off += word;
        let sh_offset = read_word(data, off, bits)?;
        off += word;
        let sh_size = read_word(data, off, bits)?;
        off += word;
        let sh_link = read_u32(data, off)?;
        off += 4;
        let sh_info = read_u32(data, off)?;
        off += 4;
        let sh_addralign = read_word(data, off, bits)?;
        off += word;
        let sh_entsize = read_word(data, off, bits)?;

        Ok(Self {
            sh_name,
            sh_type: SectionType::from_raw(sh_type_raw),
            sh_type_raw,
            sh_flags: SectionFlags::from_bits_truncate(sh_flags),
            sh_addr,
            sh_offset,
            sh_size,
            sh_link,
            sh_info,
            sh_addralign,
            sh_entsize,
            name: String::new(),
        })
    }

    pub(crate) fn encode(&self, out: &mut [u8], offset: usize, bits: Bits) {
        let word = bits.word_size();
        let mut off = offset;

        write_u32(out, off, self.sh_name);
        off += 4;
        write_u32(out, off, self.sh_type_raw);
        off += 4;
        write_word(out, off, self.sh_flags.bits(), bits);
        off += word;
        write_word(out, off, self.sh_addr, bits);
        off += word;
        write_word(out, off, self.sh_offset, bits);
        off += word;
        write_word(out, off, self.sh_size, bits);
        off += word;
        write_u32(out, off, self.sh_link);
        off += 4;
        write_u32(out, off, self.sh_info);
        off += 4;
        write_word(out, off, self.sh_addralign, bits);
        off += word;
        write_word(out, off, self.sh_entsize, bits);
    }

    /// Resolve a section name by scanning forward from `sh_name` within the
    /// string table bytes to the next NUL; an unterminated run yields the
    /// empty string rather than an error.
    pub(crate) fn resolve_name(string_table: &[u8], sh_name: u32) -> String {
        let start = sh_name as usize;
        let Some(tail) = string_table.get(start..) else {
            return String::new();
        };
        let end = tail.iter().position(|&b| b == 0);
        match end {
            Some(end) => String::from_utf8_lossy(&tail[..end]).into_owned(),
            None => String::new(),
        }
    }
}
