//! The decode pipeline: raw bytes in, a populated [`Elf`] out.
//!
//! Each numbered step below corresponds to a step in the parser driver's
//! decode order: header, section headers, program headers and containment,
//! the dynamic segment, the dynamic symbol table, then relocations.

use std::collections::{HashMap, HashSet};

use crate::address;
use crate::base::{self, Bits};
use crate::dynamic::{DynTag, DynamicEntry};
use crate::error::Error;
use crate::header::elf::{ElfHeader, SHN_UNDEF};
use crate::header::identification::ElfClass;
use crate::header::program::{Segment, SegmentType};
use crate::header::section::Section;
use crate::relocation::{RelocationEntry, RelocationKind};
use crate::symbol::{DynamicSymbol, SymbolRef};
use crate::{DynSymPolicy, Elf, ParseConfig};

/// Tags whose duplication is fatal, per the relocation-table bookkeeping the
/// dynamic linker relies on being unambiguous.
const SENSITIVE_TAGS: [DynTag; 5] = [
    DynTag::JmpRel,
    DynTag::Rel,
    DynTag::Rela,
    DynTag::RelEnt,
    DynTag::RelaEnt,
];

pub(crate) fn parse(full_data: Vec<u8>, config: ParseConfig) -> Result<Elf, Error> {
    let start = config.start_offset as usize;
    let data = if start == 0 {
        full_data
    } else {
        full_data.get(start..).ok_or(Error::TooShort {
            needed: start,
            have: full_data.len(),
            offset: 0,
        })?.to_vec()
    };

    // Step 1: magic + class.
    if data.len() < 16 {
        return Err(Error::TooShort {
            needed: 16,
            have: data.len(),
            offset: 0,
        });
    }
    let class = ElfClass::from_byte(data[4])?;
    let bits = match class {
        ElfClass::Elf32 => Bits::Elf32,
        ElfClass::Elf64 => Bits::Elf64,
        ElfClass::None => return Err(Error::UnsupportedClass { value: 0 }),
    };
    if data.len() < bits.header_size() {
        return Err(Error::TooShort {
            needed: bits.header_size(),
            have: data.len(),
            offset: 0,
        });
    }

    // Step 2: full header.
    let header = ElfHeader::decode(&data, bits)?;

    if config.only_header {
        return Ok(Elf {
            data,
            bits,
            file_parsed: false,
            header,
            sections: Vec::new(),
            segments: Vec::new(),
            dynamic_entries: Vec::new(),
            dynamic_symbols: Vec::new(),
            dynsym_count: 0,
            relocation_entries: Vec::new(),
            jump_relocation_entries: Vec::new(),
            config,
        });
    }

    // Step 4: section headers.
    if header.e_shnum > 0 && header.e_shentsize as usize != bits.section_header_size() {
        return Err(Error::UnsupportedLayout {
            context: "e_shentsize",
            expected: bits.section_header_size(),
            found: header.e_shentsize as usize,
        });
    }
    let mut sections = Vec::with_capacity(header.e_shnum as usize);
    for i in 0..header.e_shnum as usize {
        let offset = header.e_shoff as usize + i * bits.section_header_size();
        sections.push(Section::decode_header(&data, offset, bits)?);
    }

    // Step 5: section names.
    if !sections.is_empty() && header.e_shstrndx != SHN_UNDEF {
        let strtab_section = sections.get(header.e_shstrndx as usize).ok_or_else(|| {
            Error::MalformedDynamic {
                reason: "e_shstrndx out of range".into(),
            }
        })?;
        let strtab = base::slice_at(
            &data,
            strtab_section.sh_offset as usize,
            strtab_section.sh_size as usize,
        )?;
        for section in &mut sections {
            section.name = Section::resolve_name(strtab, section.sh_name);
        }
    }

    // Step 6: program headers + containment.
    if header.e_phnum > 0 && header.e_phentsize as usize != bits.program_header_size() {
        return Err(Error::UnsupportedLayout {
            context: "e_phentsize",
            expected: bits.program_header_size(),
            found: header.e_phentsize as usize,
        });
    }
    let mut segments = Vec::with_capacity(header.e_phnum as usize);
    for i in 0..header.e_phnum as usize {
        let offset = header.e_phoff as usize + i * bits.program_header_size();
        segments.push(Segment::decode(&data, offset, bits)?);
    }
    compute_containment(&mut segments, &sections);

    // Step 7: locate PT_DYNAMIC, walk to DT_NULL.
    let dynamic_segment_index = {
        let mut found = None;
        for (i, seg) in segments.iter().enumerate() {
            if seg.p_type == SegmentType::Dynamic {
                if found.is_some() {
                    return Err(Error::MalformedDynamic {
                        reason: "more than one PT_DYNAMIC segment".into(),
                    });
                }
                found = Some(i);
            }
        }
        found.ok_or_else(|| Error::MalformedDynamic {
            reason: "PT_DYNAMIC segment missing".into(),
        })?
    };
    let dynamic_entries = decode_dynamic_entries(&data, &segments[dynamic_segment_index], bits)?;

    // Step 8: mandatory/optional dynamic tags.
    let values: HashMap<i64, u64> = dynamic_entries
        .iter()
        .map(|entry| (entry.tag_raw, entry.value))
        .collect();
    let mandatory = |tag: DynTag| -> Result<u64, Error> {
        values.get(&(tag as i64)).copied().ok_or_else(|| Error::MalformedDynamic {
            reason: format!("missing mandatory dynamic tag {:?}", tag),
        })
    };
    let strtab_vaddr = mandatory(DynTag::StrTab)?;
    let strsz = mandatory(DynTag::StrSz)?;
    let symtab_vaddr = mandatory(DynTag::SymTab)?;
    let syment = mandatory(DynTag::SymEnt)?;
    if syment != bits.symbol_entry_size() as u64 {
        return Err(Error::UnsupportedLayout {
            context: "DT_SYMENT",
            expected: bits.symbol_entry_size(),
            found: syment as usize,
        });
    }

    let rel = values.get(&(DynTag::Rel as i64)).copied();
    let relsz = values.get(&(DynTag::RelSz as i64)).copied();
    let relent = values.get(&(DynTag::RelEnt as i64)).copied();
    let rela = values.get(&(DynTag::Rela as i64)).copied();
    let relasz = values.get(&(DynTag::RelaSz as i64)).copied();
    let relaent = values.get(&(DynTag::RelaEnt as i64)).copied();
    if rel.is_some() && rela.is_some() {
        return Err(Error::InconsistentRelocation {
            reason: "DT_REL and DT_RELA both present".into(),
        });
    }
    let jmprel = values.get(&(DynTag::JmpRel as i64)).copied();
    let pltrel = values.get(&(DynTag::PltRel as i64)).copied();
    let pltrelsz = values.get(&(DynTag::PltRelSz as i64)).copied();
    if jmprel.is_some() && !(pltrel.is_some() && pltrelsz.is_some()) {
        return Err(Error::InconsistentRelocation {
            reason: "DT_JMPREL present without its DT_PLTREL/DT_PLTRELSZ companions".into(),
        });
    }

    let strtab_offset = address::require_file_offset(&segments, strtab_vaddr)?;
    let symtab_offset = address::require_file_offset(&segments, symtab_vaddr)?;
    let strtab = base::slice_at(&data, strtab_offset as usize, strsz as usize)?;

    // Step 9: dynamic symbol table sizing.
    let dynsym_sections: Vec<usize> = sections
        .iter()
        .enumerate()
        .filter(|(_, s)| s.name == ".dynsym")
        .map(|(i, _)| i)
        .collect();
    let estimated_size = strtab_vaddr.saturating_sub(symtab_vaddr);
    let dynsym_size = match dynsym_sections.as_slice() {
        [single] => {
            let section = &sections[*single];
            if section.sh_offset != symtab_offset {
                estimated_size
            } else if section.sh_size == estimated_size {
                estimated_size
            } else {
                match config.force_dyn_sym_parsing {
                    DynSymPolicy::Auto => {
                        tracing::warn!(
                            "`.dynsym` size disagrees with the DT_STRTAB/DT_SYMTAB estimate; \
                             skipping dynamic symbol parsing"
                        );
                        0
                    }
                    DynSymPolicy::ForceDynsym => section.sh_size,
                    DynSymPolicy::ForceEstimate => estimated_size,
                }
            }
        }
        _ => estimated_size,
    };

    let syment_usize = syment as usize;
    let mut dynamic_symbols = Vec::new();
    if dynsym_size > 0 {
        let count = dynsym_size as usize / syment_usize;
        for i in 0..count {
            let offset = symtab_offset as usize + i * syment_usize;
            dynamic_symbols.push(DynamicSymbol::decode(&data, offset, bits, strtab)?);
        }
    }
    let dynsym_count = dynamic_symbols.len();

    // Step 10: relocations.
    let mut relocation_entries = Vec::new();
    if let (Some(rel), Some(relsz), Some(_relent)) = (rel, relsz, relent) {
        let rel_offset = address::require_file_offset(&segments, rel)?;
        relocation_entries = decode_relocation_table(
            &data,
            rel_offset,
            relsz,
            bits.rel_entry_size(),
            bits,
            RelocationKind::Rel,
            symtab_offset,
            syment_usize,
            strtab,
            &mut dynamic_symbols,
        )?;
    }
    if let (Some(rela), Some(relasz), Some(_relaent)) = (rela, relasz, relaent) {
        let rela_offset = address::require_file_offset(&segments, rela)?;
        relocation_entries = decode_relocation_table(
            &data,
            rela_offset,
            relasz,
            bits.rela_entry_size(),
            bits,
            RelocationKind::Rela,
            symtab_offset,
            syment_usize,
            strtab,
            &mut dynamic_symbols,
        )?;
    }

    let mut jump_relocation_entries = Vec::new();
    if let (Some(jmprel), Some(pltrel), Some(pltrelsz)) = (jmprel, pltrel, pltrelsz) {
        let kind = if pltrel as i64 == DynTag::Rel as i64 {
            RelocationKind::Rel
        } else if pltrel as i64 == DynTag::Rela as i64 {
            RelocationKind::Rela
        } else {
            return Err(Error::InconsistentRelocation {
                reason: format!("DT_PLTREL has unexpected value {pltrel:#x}"),
            });
        };
        let entsize = match kind {
            RelocationKind::Rel => bits.rel_entry_size(),
            RelocationKind::Rela => bits.rela_entry_size(),
        };
        let jmprel_offset = address::require_file_offset(&segments, jmprel)?;
        jump_relocation_entries = decode_relocation_table(
            &data,
            jmprel_offset,
            pltrelsz,
            entsize,
            bits,
            kind,
            symtab_offset,
            syment_usize,
            strtab,
            &mut dynamic_symbols,
        )?;
    }

    Ok(Elf {
        data,
        bits,
        file_parsed: true,
        header,
        sections,
        segments,
        dynamic_entries,
        dynamic_symbols,
        dynsym_count,
        relocation_entries,
        jump_relocation_entries,
        config,
    })
}

fn compute_containment(segments: &mut [Segment], sections: &[Section]) {
    for segment in segments.iter_mut() {
        segment.sections_within = sections
            .iter()
            .enumerate()
            .filter(|(_, s)| segment.contains_section_range(s.sh_addr, s.sh_size))
            .map(|(i, _)| i)
            .collect();
    }

    let ranges: Vec<(u64, u64, SegmentType)> = segments
        .iter()
        .map(|s| (s.p_offset, s.p_filesz, s.p_type))
        .collect();
    for i in 0..segments.len() {
        if ranges[i].2 == SegmentType::GnuStack {
            continue;
        }
        let mut within = Vec::new();
        for j in 0..segments.len() {
            if i == j || ranges[j].2 == SegmentType::GnuStack {
                continue;
            }
            let (outer_offset, outer_size, _) = ranges[i];
            let (inner_offset, inner_size, _) = ranges[j];
            if inner_offset >= outer_offset && inner_offset + inner_size <= outer_offset + outer_size {
                within.push(j);
            }
        }
        segments[i].segments_within = within;
    }
}

fn decode_dynamic_entries(
    data: &[u8],
    segment: &Segment,
    bits: Bits,
) -> Result<Vec<DynamicEntry>, Error> {
    let entsize = bits.dynamic_entry_size();
    let mut entries = Vec::new();
    let mut seen_sensitive: HashSet<i64> = HashSet::new();
    let mut offset = segment.p_offset as usize;
    loop {
        let entry = DynamicEntry::decode(data, offset, bits)?;
        if SENSITIVE_TAGS.iter().any(|tag| *tag as i64 == entry.tag_raw) && !seen_sensitive.insert(entry.tag_raw) {
            return Err(Error::DuplicateDynamic { tag: entry.tag_raw });
        }
        let is_null = entry.is_null();
        entries.push(entry);
        offset += entsize;
        if is_null {
            break;
        }
        if offset as u64 >= segment.p_offset + segment.p_filesz {
            return Err(Error::MalformedDynamic {
                reason: "PT_DYNAMIC has no DT_NULL terminator".into(),
            });
        }
    }
    Ok(entries)
}

#[allow(clippy::too_many_arguments)]
fn parse_and_intern_symbol(
    dynamic_symbols: &mut Vec<DynamicSymbol>,
    data: &[u8],
    symtab_offset: u64,
    syment: usize,
    sym_index: u64,
    bits: Bits,
    strtab: &[u8],
) -> Result<SymbolRef, Error> {
    let offset = symtab_offset as usize + sym_index as usize * syment;
    let parsed = DynamicSymbol::decode(data, offset, bits, strtab)?;
    let identity = parsed.identity();
    if let Some(pos) = dynamic_symbols.iter().position(|s| s.identity() == identity) {
        return Ok(SymbolRef(pos));
    }
    dynamic_symbols.push(parsed);
    Ok(SymbolRef(dynamic_symbols.len() - 1))
}

#[allow(clippy::too_many_arguments)]
fn decode_relocation_table(
    data: &[u8],
    offset: u64,
    size: u64,
    entsize: usize,
    bits: Bits,
    kind: RelocationKind,
    symtab_offset: u64,
    syment: usize,
    strtab: &[u8],
    dynamic_symbols: &mut Vec<DynamicSymbol>,
) -> Result<Vec<RelocationEntry>, Error> {
    let count = size as usize / entsize;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let entry_offset = offset as usize + i * entsize;
        let word = bits.word_size();
        let r_info = base::read_word(data, entry_offset + word, bits)?;
        let (r_sym, _r_type) = crate::relocation::split_r_info(r_info, bits);
        let symbol = parse_and_intern_symbol(
            dynamic_symbols,
            data,
            symtab_offset,
            syment,
            r_sym,
            bits,
            strtab,
        )?;
        out.push(RelocationEntry::decode(data, entry_offset, bits, kind, symbol)?);
    }
    Ok(out)
}
