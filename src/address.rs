//! Address/offset translation and GOT (Global Offset Table) helpers.
//!
//! Translation walks the segment table rather than the section table: the
//! section table is link-time metadata and is not guaranteed to exist (see
//! [`crate::editor::remove_section_header_table`]), while every loaded byte
//! of the file is covered by exactly one segment's file/virtual ranges.

use crate::base::write_word;
use crate::error::Error;
use crate::header::program::Segment;
use crate::relocation::RelocationEntry;
use crate::Elf;

/// Find the unique segment whose virtual memory range covers `vaddr`.
pub(crate) fn find_segment_for_vaddr(segments: &[Segment], vaddr: u64) -> Option<&Segment> {
    segments
        .iter()
        .find(|s| vaddr >= s.p_vaddr && vaddr < s.p_vaddr + s.p_memsz)
}

/// Find the unique segment whose file range covers `offset`.
pub(crate) fn find_segment_for_offset(segments: &[Segment], offset: u64) -> Option<&Segment> {
    segments
        .iter()
        .find(|s| offset >= s.p_offset && offset < s.p_offset + s.p_filesz)
}

/// Convert a virtual memory address to a file offset, or `None` if no
/// segment covers it.
pub(crate) fn virtual_to_file_offset(segments: &[Segment], vaddr: u64) -> Option<u64> {
    let segment = find_segment_for_vaddr(segments, vaddr)?;
    let rel_offset = vaddr - segment.p_vaddr;
    if segment.p_filesz != segment.p_memsz && rel_offset >= segment.p_filesz {
        return None;
    }
    Some(segment.p_offset + rel_offset)
}

/// Convert a file offset to a virtual memory address, or `None` if no
/// segment covers it.
pub(crate) fn file_offset_to_virtual(segments: &[Segment], offset: u64) -> Option<u64> {
    let segment = find_segment_for_offset(segments, offset)?;
    let rel_offset = offset - segment.p_offset;
    if segment.p_filesz != segment.p_memsz && rel_offset >= segment.p_memsz {
        return None;
    }
    Some(segment.p_vaddr + rel_offset)
}

/// Like [`virtual_to_file_offset`], but a hard error for internal callers
/// (parsing a `DT_*` address, writing a GOT entry) for which "unmapped"
/// is always a fatal condition rather than a queryable absence.
pub(crate) fn require_file_offset(segments: &[Segment], vaddr: u64) -> Result<u64, Error> {
    virtual_to_file_offset(segments, vaddr).ok_or(Error::AddressUnmapped(vaddr))
}

impl Elf {
    /// Convert a virtual memory address to a file offset.
    ///
    /// Returns `None` when no segment covers the address (the "not found"
    /// case called out in the error design — this is deliberately not an
    /// `Err`).
    pub fn virtual_memory_addr_to_file_offset(&self, vaddr: u64) -> Result<Option<u64>, Error> {
        if !self.file_parsed {
            return Err(Error::NotParsed);
        }
        Ok(virtual_to_file_offset(&self.segments, vaddr))
    }

    /// Convert a file offset to a virtual memory address.
    ///
    /// Returns `None` when no segment covers the offset.
    pub fn file_offset_to_virtual_memory_addr(&self, offset: u64) -> Result<Option<u64>, Error> {
        if !self.file_parsed {
            return Err(Error::NotParsed);
        }
        Ok(file_offset_to_virtual(&self.segments, offset))
    }

    /// Find the first jump relocation (`DT_JMPREL`) entry whose symbol has
    /// the given name.
    pub fn get_jmp_rel_entry_by_name(&self, name: &str) -> Result<&RelocationEntry, Error> {
        if !self.file_parsed {
            return Err(Error::NotParsed);
        }
        self.jump_relocation_entries
            .iter()
            .find(|entry| self.dynamic_symbols[entry.symbol.0].name == name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Overwrite a GOT entry's target address, found by the name of the
    /// imported symbol the PLT/GOT entry resolves.
    pub fn modify_got_entry_addr(&mut self, name: &str, addr: u64) -> Result<(), Error> {
        let entry_offset = {
            let entry = self.get_jmp_rel_entry_by_name(name)?;
            require_file_offset(&self.segments, entry.r_offset)?
        };
        let width = self.bits.word_size();
        let mut encoded = vec![0u8; width];
        write_word(&mut encoded, 0, addr, self.bits);
        self.write_data_to_file_offset(entry_offset, &encoded, false)
    }

    /// Read the current value (target address) of a GOT entry, found by
    /// the name of the imported symbol it resolves.
    pub fn get_value_of_got_entry(&self, name: &str) -> Result<u64, Error> {
        let entry_offset = {
            let entry = self.get_jmp_rel_entry_by_name(name)?;
            require_file_offset(&self.segments, entry.r_offset)?
        };
        let width = self.bits.word_size();
        crate::base::read_word(&self.data, entry_offset as usize, self.bits)
            .map_err(|_| Error::MalformedRecord {
                offset: entry_offset as usize,
                len: width,
            })
    }

    /// The virtual memory address of a GOT entry, found by the name of the
    /// imported symbol it resolves.
    pub fn get_mem_addr_of_got_entry(&self, name: &str) -> Result<u64, Error> {
        Ok(self.get_jmp_rel_entry_by_name(name)?.r_offset)
    }
}
