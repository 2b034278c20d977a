//! Implementation of the ELF program header (segment).
//!
//! Note the field order difference between classes: 64-bit places
//! `p_flags` immediately after `p_type`, while 32-bit places it after
//! `p_memsz`. This is the one structural field-order irregularity in the
//! whole format and the codec below encodes/decodes each class's layout
//! explicitly rather than trying to share one field order.

use bitflags::bitflags;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

use crate::base::{read_u32, read_word, write_u32, write_word, Bits};
use crate::error::Error;

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[non_exhaustive]
/// The type of a segment (`p_type`).
pub enum SegmentType {
    /// Unused entry.
    Null = 0,
    /// A loadable segment.
    Load = 1,
    /// Dynamic linking information.
    Dynamic = 2,
    /// Path to an interpreter.
    Interp = 3,
    /// Auxiliary information (notes).
    Note = 4,
    /// Reserved, unspecified semantics.
    ShLib = 5,
    /// The program header table itself.
    Phdr = 6,
    /// Thread-local storage template.
    Tls = 7,
    /// GNU extension: indicates stack executability.
    GnuStack = 0x6474e551,
    /// GNU extension: read-only after relocation.
    GnuRelro = 0x6474e552,
    /// GNU extension: `.eh_frame_hdr` segment.
    GnuEhFrame = 0x6474e550,
}

impl SegmentType {
    pub(crate) fn from_raw(value: u32) -> Self {
        Self::from_u32(value).unwrap_or(SegmentType::Null)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Segment permission flags (`p_flags`).
    pub struct SegmentFlags: u32 {
        /// Execute permission.
        const PF_X = 0x1;
        /// Write permission.
        const PF_W = 0x2;
        /// Read permission.
        const PF_R = 0x4;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single segment: its program header fields plus the containment
/// relations derived once at parse time.
pub struct Segment {
    /// The segment's type.
    pub p_type: SegmentType,
    /// The raw, unparsed `p_type` value.
    pub p_type_raw: u32,
    /// Permission flags.
    pub p_flags: SegmentFlags,
    /// Byte offset of the segment in the file.
    pub p_offset: u64,
    /// Virtual address of the segment's first byte in memory.
    pub p_vaddr: u64,
    /// Physical address, where relevant (System V ignores this).
    pub p_paddr: u64,
    /// Size of the segment in the file, in bytes.
    pub p_filesz: u64,
    /// Size of the segment in memory, in bytes.
    pub p_memsz: u64,
    /// Required alignment. A value of 0 or 1 means no alignment is required.
    pub p_align: u64,
    /// Indices into `Elf.sections` of sections whose address range lies
    /// entirely within this segment's virtual memory range.
    pub sections_within: Vec<usize>,
    /// Indices into `Elf.segments` of other segments whose file range lies
    /// entirely within this segment's file range (excluding `PT_GNU_STACK`
    /// on either side, and excluding self).
    pub segments_within: Vec<usize>,
}

impl Segment {
    pub(crate) fn decode(data: &[u8], offset: usize, bits: Bits) -> Result<Self, Error> {
        let (p_type_raw, p_flags, p_offset, p_vaddr, p_paddr, p_filesz, p_memsz, p_align) =
            match bits {
                Bits::Elf32 => {
                    let p_type = read_u32(data, offset)?;
                    let p_offset = read_word(data, offset + 4, bits)?;
                    let p_vaddr = read_word(data, offset + 8, bits)?;
                    let p_paddr = read_word(data, offset + 12, bits)?;
                    let p_filesz = read_word(data, offset + 16, bits)?;
                    let p_memsz = read_word(data, offset + 20, bits)?;
                    let p_flags = read_u32(data, offset + 24)?;
                    let p_align = read_word(data, offset + 28, bits)?;
                    (
                        p_type, p_flags, p_offset, p_vaddr, p_paddr, p_filesz, p_memsz, p_align,
                    )
                }
                Bits::Elf64 => {
                    let p_type = read_u32(data, offset)?;
                    let p_flags = read_u32(data, offset + 4)?;
                    let p_offset = read_word(data, offset + 8, bits)?;
                    let p_vaddr = read_word(data, offset + 16, bits)?;
                    let p_paddr = read_word(data, offset + 24, bits)?;
                    let p_filesz = read_word(data, offset + 32, bits)?;
                    let p_memsz = read_word(data, offset + 40, bits)?;
                    let p_align = read_word(data, offset + 48, bits)?;
                    (
                        p_type, p_flags, p_offset, p_vaddr, p_paddr, p_filesz, p_memsz, p_align,
                    )
                }
            };

        Ok(Self {
            p_type: SegmentType::from_raw(p_type_raw),
            p_type_raw,
            p_flags: SegmentFlags::from_bits_truncate(p_flags),
            p_offset,
            p_vaddr,
            p_paddr,
            p_filesz,
            p_memsz,
            p_align,
            sections_within: Vec::new(),
            segments_within: Vec::new(),
        })
    }

    pub(crate) fn encode(&self, out: &mut [u8], offset: usize, bits: Bits) {
        match bits {
            Bits::Elf32 => {
                write_u32(out, offset, self.p_type_raw);
                write_word(out, offset + 4, self.p_offset, bits);
                write_word(out, offset + 8, self.p_vaddr, bits);
                write_word(out, offset + 12, self.p_paddr, bits);
                write_word(out, offset + 16, self.p_filesz, bits);
                write_word(out, offset + 20, self.p_memsz, bits);
                write_u32(out, offset + 24, self.p_flags.bits());
                write_word(out, offset + 28, self.p_align, bits);
            }
            Bits::Elf64 => {
                write_u32(out, offset, self.p_type_raw);
                write_u32(out, offset + 4, self.p_flags.bits());
                write_word(out, offset + 8, self.p_offset, bits);
                write_word(out, offset + 16, self.p_vaddr, bits);
                write_word(out, offset + 24, self.p_paddr, bits);
                write_word(out, offset + 32, self.p_filesz, bits);
                write_word(out, offset + 40, self.p_memsz, bits);
                write_word(out, offset + 48, self.p_align, bits);
            }
        }
    }

    /// True if `[vaddr, vaddr + size)` lies entirely within this segment's
    /// virtual memory range.
    pub(crate) fn contains_section_range(&self, vaddr: u64, size: u64) -> bool {
        vaddr >= self.p_vaddr && vaddr + size <= self.p_vaddr + self.p_memsz
    }

    /// True if `[offset, offset + size)` lies entirely within this
    /// segment's file range.
    pub(crate) fn contains_file_range(&self, offset: u64, size: u64) -> bool {
        offset >= self.p_offset && offset + size <= self.p_offset + self.p_filesz
    }
}
