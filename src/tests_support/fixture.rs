//! Hand-built little-endian 64-bit ET_DYN byte buffers, small enough to
//! reason about field-by-field. Each fixture maps virtual addresses
//! directly onto file offsets (`p_vaddr == p_offset` within a segment, or
//! a constant base), which keeps the address-translation arithmetic in
//! the assertions trivial without weakening what's being exercised.

use crate::base::Bits;
use crate::dynamic::{DynTag, DynamicEntry};
use crate::header::elf::{ElfHeader, ElfMachine, ElfType};
use crate::header::identification::{
    ElfClass, ElfDataEncoding, ElfIdentifier, ElfIdentifierVersion, ElfOSABI,
};
use crate::header::program::{Segment, SegmentFlags, SegmentType};
use crate::relocation::{join_r_info, RelocationEntry, RelocationKind};
use crate::symbol::DynamicSymbol;

const BITS: Bits = Bits::Elf64;

fn header(e_phnum: u16) -> ElfHeader {
    ElfHeader {
        ident: ElfIdentifier {
            class: ElfClass::Elf64,
            data_encoding: ElfDataEncoding::LittleEndian,
            version: ElfIdentifierVersion::Current,
            os_abi: ElfOSABI::NoneSystemV,
            abi_version: 0,
            pad: [0; 7],
        },
        e_type: ElfType::Dynamic,
        e_machine: ElfMachine::X86_64,
        e_version: 1,
        e_entry: 0,
        e_phoff: 64,
        e_shoff: 0,
        e_flags: 0,
        e_ehsize: BITS.header_size() as u16,
        e_phentsize: BITS.program_header_size() as u16,
        e_phnum,
        e_shentsize: 0,
        e_shnum: 0,
        e_shstrndx: 0,
    }
}

fn null_dynamic_entry() -> DynamicEntry {
    DynamicEntry {
        tag: Some(DynTag::Null),
        tag_raw: 0,
        value: 0,
    }
}

fn tagged(tag: DynTag, value: u64) -> DynamicEntry {
    DynamicEntry {
        tag: Some(tag),
        tag_raw: tag as i64,
        value,
    }
}

fn load_segment(p_vaddr: u64, p_offset: u64, size: u64, flags: SegmentFlags) -> Segment {
    Segment {
        p_type: SegmentType::Load,
        p_type_raw: SegmentType::Load as u32,
        p_flags: flags,
        p_offset,
        p_vaddr,
        p_paddr: p_vaddr,
        p_filesz: size,
        p_memsz: size,
        p_align: 0x1000,
        sections_within: Vec::new(),
        segments_within: Vec::new(),
    }
}

fn dynamic_segment(offset: u64, size: u64) -> Segment {
    Segment {
        p_type: SegmentType::Dynamic,
        p_type_raw: SegmentType::Dynamic as u32,
        p_flags: SegmentFlags::PF_R | SegmentFlags::PF_W,
        p_offset: offset,
        p_vaddr: offset,
        p_paddr: offset,
        p_filesz: size,
        p_memsz: size,
        p_align: 8,
        sections_within: Vec::new(),
        segments_within: Vec::new(),
    }
}

/// A minimal 64-bit `ET_DYN` with one `PT_LOAD`, one `PT_DYNAMIC`, a
/// one-symbol `.dynsym`/`.dynstr` (no relocations, no section header
/// table). Used to exercise the base parse/round-trip path.
pub(crate) fn minimal_dynamic_elf() -> Vec<u8> {
    // Layout: header(64) | phdrs(2*56=112) | dynamic(5*16=80) | dynsym(1*24) | dynstr(8)
    let dyn_offset = 176u64;
    let dyn_entries = [
        tagged(DynTag::StrTab, 280),
        tagged(DynTag::StrSz, 8),
        tagged(DynTag::SymTab, 256),
        tagged(DynTag::SymEnt, 24),
        null_dynamic_entry(),
    ];
    let dyn_size = (dyn_entries.len() * BITS.dynamic_entry_size()) as u64;
    assert_eq!(dyn_offset + dyn_size, 256);

    let symbol = DynamicSymbol {
        st_name: 1,
        st_value: 0,
        st_size: 0,
        st_info: 0x12,
        st_other: 0,
        st_shndx: 0,
        name: "printf".into(),
    };

    let total_len = 288usize;
    let mut buf = vec![0u8; total_len];

    let load = load_segment(0, 0, total_len as u64, SegmentFlags::PF_R | SegmentFlags::PF_W);
    let dynamic = dynamic_segment(dyn_offset, dyn_size);
    header(2).encode(&mut buf, BITS);
    load.encode(&mut buf, 64, BITS);
    dynamic.encode(&mut buf, 64 + BITS.program_header_size(), BITS);
    for (i, entry) in dyn_entries.iter().enumerate() {
        entry.encode(&mut buf, dyn_offset as usize + i * BITS.dynamic_entry_size(), BITS);
    }
    symbol.encode(&mut buf, 256, BITS);
    buf[280..288].copy_from_slice(b"\0printf\0");

    buf
}

/// A `PT_DYNAMIC`-anchored ET_DYN with a `DT_JMPREL` table resolving one
/// imported symbol through a GOT slot. Used to exercise the GOT helpers.
pub(crate) fn elf_with_plt_import(symbol_name: &str, got_initial: u64) -> Vec<u8> {
    let dyn_offset = 176u64;
    let symtab_offset = 304u64;
    let strtab_size = (symbol_name.len() + 2) as u64; // leading NUL + name + NUL
    let strtab_offset = symtab_offset + 2 * BITS.symbol_entry_size() as u64;
    let jmprel_offset = strtab_offset + strtab_size;
    let got_offset = jmprel_offset + BITS.rela_entry_size() as u64;

    let dyn_entries = [
        tagged(DynTag::StrTab, strtab_offset),
        tagged(DynTag::StrSz, strtab_size),
        tagged(DynTag::SymTab, symtab_offset),
        tagged(DynTag::SymEnt, 24),
        tagged(DynTag::JmpRel, jmprel_offset),
        tagged(DynTag::PltRel, DynTag::Rela as i64 as u64),
        tagged(DynTag::PltRelSz, BITS.rela_entry_size() as u64),
        null_dynamic_entry(),
    ];
    let dyn_size = (dyn_entries.len() * BITS.dynamic_entry_size()) as u64;
    assert_eq!(dyn_offset + dyn_size, symtab_offset);

    let null_symbol = DynamicSymbol {
        st_name: 0,
        st_value: 0,
        st_size: 0,
        st_info: 0,
        st_other: 0,
        st_shndx: 0,
        name: String::new(),
    };
    let import_symbol = DynamicSymbol {
        st_name: 1,
        st_value: 0,
        st_size: 0,
        st_info: 0x12,
        st_other: 0,
        st_shndx: 0,
        name: symbol_name.into(),
    };

    let total_len = (got_offset + 8) as usize;
    let mut buf = vec![0u8; total_len];

    let load = load_segment(0, 0, total_len as u64, SegmentFlags::PF_R | SegmentFlags::PF_W);
    let dynamic = dynamic_segment(dyn_offset, dyn_size);
    header(2).encode(&mut buf, BITS);
    load.encode(&mut buf, 64, BITS);
    dynamic.encode(&mut buf, 64 + BITS.program_header_size(), BITS);
    for (i, entry) in dyn_entries.iter().enumerate() {
        entry.encode(&mut buf, dyn_offset as usize + i * BITS.dynamic_entry_size(), BITS);
    }
    null_symbol.encode(&mut buf, symtab_offset as usize, BITS);
    import_symbol.encode(&mut buf, symtab_offset as usize + BITS.symbol_entry_size(), BITS);
    let mut strtab_bytes = vec![0u8];
    strtab_bytes.extend_from_slice(symbol_name.as_bytes());
    strtab_bytes.push(0);
    buf[strtab_offset as usize..strtab_offset as usize + strtab_bytes.len()]
        .copy_from_slice(&strtab_bytes);

    let reloc = RelocationEntry {
        kind: RelocationKind::Rela,
        r_offset: got_offset,
        r_info: join_r_info(1, 7, BITS),
        r_addend: 0,
        symbol: crate::symbol::SymbolRef(1),
    };
    reloc.encode(&mut buf, jmprel_offset as usize, BITS);
    buf[got_offset as usize..got_offset as usize + 8].copy_from_slice(&got_initial.to_le_bytes());

    buf
}

/// Two `PT_LOAD` segments separated by a `0x1000`-byte virtual-address gap,
/// the second with `PF_X` set, for exercising
/// `append_data_to_executable_segment` (scenario S5).
pub(crate) fn two_load_segments_elf() -> Vec<u8> {
    // Layout: header(64) | phdrs(3*56=168, ends at 232) | dynamic(5*16=80,
    // ends at 312) | dynsym(1*24, ends at 336) | dynstr(8, ends at 344).
    let dyn_offset = 232u64;
    let dyn_entries = [
        tagged(DynTag::StrTab, 336),
        tagged(DynTag::StrSz, 8),
        tagged(DynTag::SymTab, 312),
        tagged(DynTag::SymEnt, 24),
        null_dynamic_entry(),
    ];
    let dyn_size = (dyn_entries.len() * BITS.dynamic_entry_size()) as u64;
    assert_eq!(dyn_offset + dyn_size, 312);

    let symbol = DynamicSymbol {
        st_name: 1,
        st_value: 0,
        st_size: 0,
        st_info: 0x12,
        st_other: 0,
        st_shndx: 0,
        name: "printf".into(),
    };

    let total_len = 344usize;
    let mut buf = vec![0u8; total_len];

    let first_load = load_segment(
        0,
        0,
        total_len as u64,
        SegmentFlags::PF_R | SegmentFlags::PF_X,
    );
    let dynamic = dynamic_segment(dyn_offset, dyn_size);
    let gap_segment = Segment {
        p_type: SegmentType::Load,
        p_type_raw: SegmentType::Load as u32,
        p_flags: SegmentFlags::PF_R | SegmentFlags::PF_X,
        p_offset: 0,
        p_vaddr: total_len as u64 + 0x1000,
        p_paddr: total_len as u64 + 0x1000,
        p_filesz: 0x10,
        p_memsz: 0x10,
        p_align: 0x1000,
        sections_within: Vec::new(),
        segments_within: Vec::new(),
    };

    header(3).encode(&mut buf, BITS);
    first_load.encode(&mut buf, 64, BITS);
    dynamic.encode(&mut buf, 64 + BITS.program_header_size(), BITS);
    gap_segment.encode(&mut buf, 64 + 2 * BITS.program_header_size(), BITS);
    for (i, entry) in dyn_entries.iter().enumerate() {
        entry.encode(&mut buf, dyn_offset as usize + i * BITS.dynamic_entry_size(), BITS);
    }
    symbol.encode(&mut buf, 312, BITS);
    buf[336..344].copy_from_slice(b"\0printf\0");

    buf
}
