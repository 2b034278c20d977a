//! Implementation of relocation entries (`Elf32_Rel`/`Rela`,
//! `Elf64_Rel`/`Rela`).
//!
//! This crate only parses and rewrites relocation entries; it never
//! resolves/applies them (see the Non-goals in the crate's top-level
//! documentation).

use crate::base::{read_i32, read_i64, read_word, write_i32, write_i64, write_word, Bits};
use crate::error::Error;
use crate::symbol::SymbolRef;

/// Split `r_info` into `(r_sym, r_type)`, per class.
pub(crate) fn split_r_info(r_info: u64, bits: Bits) -> (u64, u32) {
    match bits {
        Bits::Elf32 => ((r_info >> 8) & 0x00ff_ffff, (r_info & 0xff) as u32),
        Bits::Elf64 => (r_info >> 32, (r_info & 0xffff_ffff) as u32),
    }
}

/// Join `(r_sym, r_type)` back into `r_info`, per class. The inverse of
/// [`split_r_info`], exercised by the r_info round-trip property.
pub(crate) fn join_r_info(r_sym: u64, r_type: u32, bits: Bits) -> u64 {
    match bits {
        Bits::Elf32 => ((r_sym & 0x00ff_ffff) << 8) | (r_type as u64 & 0xff),
        Bits::Elf64 => (r_sym << 32) | (r_type as u64 & 0xffff_ffff),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The two on-disk relocation entry shapes.
pub enum RelocationKind {
    /// `Elf32_Rel` / `Elf64_Rel`: no explicit addend.
    Rel,
    /// `Elf32_Rela` / `Elf64_Rela`: carries an explicit signed addend.
    Rela,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single relocation entry, resolved to the dynamic symbol it references.
pub struct RelocationEntry {
    /// The entry's on-disk shape.
    pub kind: RelocationKind,
    /// The location to be relocated (a virtual address).
    pub r_offset: u64,
    /// The raw `r_info` field.
    pub r_info: u64,
    /// The addend, only meaningful for [`RelocationKind::Rela`].
    pub r_addend: i64,
    /// A non-owning reference to the symbol this relocation resolves to;
    /// aliases an existing [`crate::symbol::DynamicSymbol`] in the arena
    /// when one with an identical `(name, value, size, info, other,
    /// shndx)` tuple was already parsed.
    pub symbol: SymbolRef,
}

impl RelocationEntry {
    /// `(r_sym, r_type)` decoded from `r_info`.
    pub fn sym_and_type(&self, bits: Bits) -> (u64, u32) {
        split_r_info(self.r_info, bits)
    }

    pub(crate) fn decode(
        data: &[u8],
        offset: usize,
        bits: Bits,
        kind: RelocationKind,
        symbol: SymbolRef,
    ) -> Result<Self, Error> {
        let word = bits.word_size();
        let r_offset = read_word(data, offset, bits)?;
        let r_info = read_word(data, offset + word, bits)?;
        let r_addend = match kind {
            RelocationKind::Rel => 0,
            RelocationKind::Rela => match bits {
                Bits::Elf32 => read_i32(data, offset + 2 * word)? as i64,
                Bits::Elf64 => read_i64(data, offset + 2 * word)?,
            },
        };

        Ok(Self {
            kind,
            r_offset,
            r_info,
            r_addend,
            symbol,
        })
    }

    pub(crate) fn encode(&self, out: &mut [u8], offset: usize, bits: Bits) {
        let word = bits.word_size();
        write_word(out, offset, self.r_offset, bits);
        write_word(out, offset + word, self.r_info, bits);
        if let RelocationKind::Rela = self.kind {
            match bits {
                Bits::Elf32 => write_i32(out, offset + 2 * word, self.r_addend as i32),
                Bits::Elf64 => write_i64(out, offset + 2 * word, self.r_addend),
            }
        }
    }
}
