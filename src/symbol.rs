//! Implementation of the dynamic symbol table (`.dynsym`).
//!
//! Symbols are stored in a flat arena (`Elf.dynamic_symbols`) and referenced
//! elsewhere by index ([`SymbolRef`]) rather than by value, so that
//! relocations parsed from different tables can alias the same symbol
//! object — see [`crate::relocation`] for the interning rule this exists to
//! support.

use crate::base::{read_u16, read_u32, read_u8, read_word, write_u16, write_u32, write_u8, write_word, Bits};
use crate::error::Error;

/// An index into `Elf.dynamic_symbols`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolRef(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single entry in the dynamic symbol table (`Elf32_Sym` / `Elf64_Sym`).
///
/// Note the field order difference: 64-bit places `st_value`/`st_size`
/// after `st_shndx`, 32-bit places them before `st_info`/`st_other`.
pub struct DynamicSymbol {
    /// Index into the dynamic string table.
    pub st_name: u32,
    /// Symbol value (usually a virtual address).
    pub st_value: u64,
    /// Symbol size, in bytes, if known.
    pub st_size: u64,
    /// Symbol type and binding, packed into one byte.
    pub st_info: u8,
    /// Symbol visibility.
    pub st_other: u8,
    /// Section header table index the symbol is defined in relation to.
    pub st_shndx: u16,
    /// The symbol's name, resolved from the dynamic string table.
    pub name: String,
}

impl DynamicSymbol {
    /// `st_info` split into `(bind, type)`, matching the `ELF32_ST_BIND`/
    /// `ELF32_ST_TYPE` macros (identical for both classes).
    pub fn bind_and_type(&self) -> (u8, u8) {
        (self.st_info >> 4, self.st_info & 0xf)
    }

    /// The `(name, value, size, info, other, shndx)` identity tuple used to
    /// decide whether two parsed symbols are "the same symbol" for
    /// interning purposes.
    pub(crate) fn identity(&self) -> (u32, u64, u64, u8, u8, u16) {
        (
            self.st_name,
            self.st_value,
            self.st_size,
            self.st_info,
            self.st_other,
            self.st_shndx,
        )
    }

    pub(crate) fn decode(
        data: &[u8],
        offset: usize,
        bits: Bits,
        string_table: &[u8],
    ) -> Result<Self, Error> {
        let (st_name, st_value, st_size, st_info, st_other, st_shndx) = match bits {
            Bits::Elf32 => {
                let st_name = read_u32(data, offset)?;
                let st_value = read_word(data, offset + 4, bits)?;
                let st_size = read_word(data, offset + 8, bits)?;
                let st_info = read_u8(data, offset + 12)?;
                let st_other = read_u8(data, offset + 13)?;
                let st_shndx = read_u16(data, offset + 14)?;
                (st_name, st_value, st_size, st_info, st_other, st_shndx)
            }
            Bits::Elf64 => {
                let st_name = read_u32(data, offset)?;
                let st_info = read_u8(data, offset + 4)?;
                let st_other = read_u8(data, offset + 5)?;
                let st_shndx = read_u16(data, offset + 6)?;
                let st_value = read_word(data, offset + 8, bits)?;
                let st_size = read_word(data, offset + 16, bits)?;
                (st_name, st_value, st_size, st_info, st_other, st_shndx)
            }
        };

        let name = crate::header::section::Section::resolve_name(string_table, st_name);

        Ok(Self {
            st_name,
            st_value,
            st_size,
            st_info,
            st_other,
            st_shndx,
            name,
        })
    }

    pub(crate) fn encode(&self, out: &mut [u8], offset: usize, bits: Bits) {
        match bits {
            Bits::Elf32 => {
                write_u32(out, offset, self.st_name);
                write_word(out, offset + 4, self.st_value, bits);
                write_word(out, offset + 8, self.st_size, bits);
                write_u8(out, offset + 12, self.st_info);
                write_u8(out, offset + 13, self.st_other);
                write_u16(out, offset + 14, self.st_shndx);
            }
            Bits::Elf64 => {
                write_u32(out, offset, self.st_name);
                write_u8(out, offset + 4, self.st_info);
                write_u8(out, offset + 5, self.st_other);
                write_u16(out, offset + 6, self.st_shndx);
                write_word(out, offset + 8, self.st_value, bits);
                write_word(out, offset + 16, self.st_size, bits);
            }
        }
    }
}
