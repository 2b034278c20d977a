//! Implementation of the `PT_DYNAMIC` segment's entry table: the directory
//! the dynamic linker walks to find the symbol table, string table, and
//! relocation tables.

use crate::base::{read_i64, read_word, write_i64, write_word, Bits};
use crate::error::Error;

#[repr(i64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
/// Well-known dynamic entry tags (`d_tag`). Tags this crate does not
/// recognize are preserved via [`DynamicEntry::tag_raw`] rather than
/// rejected.
pub enum DynTag {
    /// Marks the end of the dynamic array.
    Null = 0,
    /// The string table address.
    StrTab = 5,
    /// The symbol table address.
    SymTab = 6,
    /// The address of relocations with explicit addends.
    Rela = 7,
    /// Total size, in bytes, of the `DT_RELA` relocation table.
    RelaSz = 8,
    /// Size, in bytes, of a `DT_RELA` relocation entry.
    RelaEnt = 9,
    /// Size, in bytes, of the string table.
    StrSz = 10,
    /// Size, in bytes, of a symbol table entry.
    SymEnt = 11,
    /// Address of relocations without explicit addends.
    Rel = 17,
    /// Total size, in bytes, of the `DT_REL` relocation table.
    RelSz = 18,
    /// Size, in bytes, of a `DT_REL` relocation entry.
    RelEnt = 19,
    /// Type of relocation entry used for the procedure linkage table,
    /// either `DT_REL` or `DT_RELA`.
    PltRel = 20,
    /// Address of relocations associated with the procedure linkage table.
    JmpRel = 23,
    /// Total size, in bytes, of the relocations associated with the
    /// procedure linkage table.
    PltRelSz = 2,
}

impl DynTag {
    pub(crate) fn from_raw(value: i64) -> Option<Self> {
        Some(match value {
            0 => DynTag::Null,
            5 => DynTag::StrTab,
            6 => DynTag::SymTab,
            7 => DynTag::Rela,
            8 => DynTag::RelaSz,
            9 => DynTag::RelaEnt,
            10 => DynTag::StrSz,
            11 => DynTag::SymEnt,
            17 => DynTag::Rel,
            18 => DynTag::RelSz,
            19 => DynTag::RelEnt,
            20 => DynTag::PltRel,
            23 => DynTag::JmpRel,
            2 => DynTag::PltRelSz,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A single `(d_tag, d_un)` entry in the dynamic segment.
pub struct DynamicEntry {
    /// The entry's tag, decoded where recognized.
    pub tag: Option<DynTag>,
    /// The raw `d_tag` value (preserves unrecognized/processor-specific
    /// tags for round-tripping).
    pub tag_raw: i64,
    /// The entry's value (`d_val`/`d_ptr` union).
    pub value: u64,
}

impl DynamicEntry {
    pub(crate) fn decode(data: &[u8], offset: usize, bits: Bits) -> Result<Self, Error> {
        let word = bits.word_size();
        let tag_raw = match bits {
            Bits::Elf32 => read_word(data, offset, bits)? as i32 as i64,
            Bits::Elf64 => read_i64(data, offset)?,
        };
        let value = read_word(data, offset + word, bits)?;
        Ok(Self {
            tag: DynTag::from_raw(tag_raw),
            tag_raw,
            value,
        })
    }

    pub(crate) fn encode(&self, out: &mut [u8], offset: usize, bits: Bits) {
        let word = bits.word_size();
        match bits {
            Bits::Elf32 => write_word(out, offset, self.tag_raw as u32 as u64, bits),
            Bits::Elf64 => write_i64(out, offset, self.tag_raw),
        }
        write_word(out, offset + word, self.value, bits);
    }

    pub(crate) fn is_null(&self) -> bool {
        self.tag == Some(DynTag::Null)
    }
}
