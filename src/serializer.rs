//! Projects the parsed model back into bytes. `generate` is the single place
//! that does this; the editor mutates the model, never these bytes directly
//! (aside from the documented exceptions in `editor.rs`).

use std::collections::HashSet;

use crate::address;
use crate::base;
use crate::dynamic::DynTag;
use crate::error::Error;
use crate::header::elf::SHN_UNDEF;
use crate::header::program::SegmentType;
use crate::relocation::RelocationKind;
use crate::Elf;

pub(crate) fn generate(elf: &Elf) -> Result<Vec<u8>, Error> {
    let bits = elf.bits;
    let mut buf = elf.data.clone();

    // 1. Section header table.
    if !elf.sections.is_empty() {
        let entsize = bits.section_header_size();
        let end = elf.header.e_shoff as usize + elf.sections.len() * entsize;
        base::ensure_len(&mut buf, end);
        for (i, section) in elf.sections.iter().enumerate() {
            section.encode(&mut buf, elf.header.e_shoff as usize + i * entsize, bits);
        }
    }

    // 2. Section names.
    if elf.header.e_shstrndx != SHN_UNDEF {
        let strtab_section = elf
            .sections
            .get(elf.header.e_shstrndx as usize)
            .ok_or_else(|| Error::MalformedDynamic {
                reason: "e_shstrndx out of range during serialize".into(),
            })?;
        for section in &elf.sections {
            let pos = strtab_section.sh_offset as usize + section.sh_name as usize;
            let end = pos + section.name.len() + 1;
            base::ensure_len(&mut buf, end);
            buf[pos..pos + section.name.len()].copy_from_slice(section.name.as_bytes());
            buf[pos + section.name.len()] = 0;
        }
    }

    // 3. ELF header.
    let header_size = bits.header_size();
    base::ensure_len(&mut buf, header_size);
    elf.header.encode(&mut buf, bits);

    // 4. Program headers.
    if !elf.segments.is_empty() {
        let entsize = bits.program_header_size();
        let end = elf.header.e_phoff as usize + elf.segments.len() * entsize;
        base::ensure_len(&mut buf, end);
        for (i, segment) in elf.segments.iter().enumerate() {
            segment.encode(&mut buf, elf.header.e_phoff as usize + i * entsize, bits);
        }
    }

    // 5. Dynamic entries.
    let dynamic_segment = elf
        .segments
        .iter()
        .find(|s| s.p_type == SegmentType::Dynamic)
        .ok_or_else(|| Error::MalformedDynamic {
            reason: "PT_DYNAMIC missing during serialize".into(),
        })?;
    let dyn_entsize = bits.dynamic_entry_size();
    let dyn_start = dynamic_segment.p_offset as usize;
    let dyn_end = dyn_start + dynamic_segment.p_filesz as usize;
    base::ensure_len(&mut buf, dyn_end);
    for (i, entry) in elf.dynamic_entries.iter().enumerate() {
        entry.encode(&mut buf, dyn_start + i * dyn_entsize, bits);
    }
    let dyn_written = dyn_start + elf.dynamic_entries.len() * dyn_entsize;
    if dyn_written < dyn_end {
        for byte in &mut buf[dyn_written..dyn_end] {
            *byte = 0;
        }
    }

    // 6. Dynamic symbols (the official DT_SYMTAB-sized set only; interned
    // extras discovered only via relocation scanning are step 8's job).
    let symtab_vaddr = dynamic_value(elf, DynTag::SymTab)?;
    let symtab_offset = address::require_file_offset(&elf.segments, symtab_vaddr)?;
    let syment = bits.symbol_entry_size();
    let official_symbols = &elf.dynamic_symbols[..elf.dynsym_count];
    let sym_end = symtab_offset as usize + official_symbols.len() * syment;
    base::ensure_len(&mut buf, sym_end);
    for (i, symbol) in official_symbols.iter().enumerate() {
        symbol.encode(&mut buf, symtab_offset as usize + i * syment, bits);
    }

    // 7. Relocation tables.
    if !elf.relocation_entries.is_empty() {
        let kind = elf.relocation_entries[0].kind;
        let (tag, entsize) = match kind {
            RelocationKind::Rel => (DynTag::Rel, bits.rel_entry_size()),
            RelocationKind::Rela => (DynTag::Rela, bits.rela_entry_size()),
        };
        let vaddr = dynamic_value(elf, tag)?;
        let offset = address::require_file_offset(&elf.segments, vaddr)?;
        write_relocation_table(&mut buf, &elf.relocation_entries, offset, entsize, bits);
    }
    if !elf.jump_relocation_entries.is_empty() {
        let kind = elf.jump_relocation_entries[0].kind;
        let entsize = match kind {
            RelocationKind::Rel => bits.rel_entry_size(),
            RelocationKind::Rela => bits.rela_entry_size(),
        };
        let vaddr = dynamic_value(elf, DynTag::JmpRel)?;
        let offset = address::require_file_offset(&elf.segments, vaddr)?;
        write_relocation_table(&mut buf, &elf.jump_relocation_entries, offset, entsize, bits);
    }

    // 8. Relocation symbols that fell outside the official DT_SYMTAB span.
    let mut extra_written: HashSet<u64> = HashSet::new();
    for entry in elf
        .relocation_entries
        .iter()
        .chain(elf.jump_relocation_entries.iter())
    {
        if entry.symbol.0 < elf.dynsym_count {
            continue;
        }
        let (r_sym, _r_type) = entry.sym_and_type(bits);
        if !extra_written.insert(r_sym) {
            continue;
        }
        let symbol = &elf.dynamic_symbols[entry.symbol.0];
        let pos = symtab_offset as usize + r_sym as usize * syment;
        base::ensure_len(&mut buf, pos + syment);
        symbol.encode(&mut buf, pos, bits);
    }

    Ok(buf)
}

fn dynamic_value(elf: &Elf, tag: DynTag) -> Result<u64, Error> {
    elf.dynamic_entries
        .iter()
        .find(|e| e.tag == Some(tag))
        .map(|e| e.value)
        .ok_or_else(|| Error::MalformedDynamic {
            reason: format!("{:?} missing during serialize", tag),
        })
}

fn write_relocation_table(
    buf: &mut Vec<u8>,
    entries: &[crate::relocation::RelocationEntry],
    offset: u64,
    entsize: usize,
    bits: base::Bits,
) {
    let end = offset as usize + entries.len() * entsize;
    base::ensure_len(buf, end);
    for (i, entry) in entries.iter().enumerate() {
        entry.encode(buf, offset as usize + i * entsize, bits);
    }
}
