fn put(buf: &mut Vec<u8>, offset: usize, bytes: &[u8]) {
    let end = offset + bytes.len();
    if buf.len() < end {
        buf.resize(end, 0);
    }
    buf[offset..end].copy_from_slice(bytes);
}

fn put_u16(buf: &mut Vec<u8>, offset: usize, v: u16) {
    put(buf, offset, &v.to_le_bytes());
}
fn put_u32(buf: &mut Vec<u8>, offset: usize, v: u32) {
    put(buf, offset, &v.to_le_bytes());
}
fn put_u64(buf: &mut Vec<u8>, offset: usize, v: u64) {
    put(buf, offset, &v.to_le_bytes());
}
fn put_i64(buf: &mut Vec<u8>, offset: usize, v: i64) {
    put(buf, offset, &v.to_le_bytes());
}

const ELFCLASS64: u8 = 2;
const ELFCLASS32: u8 = 1;
const ELFDATA2LSB: u8 = 1;
const EV_CURRENT: u8 = 1;
const ET_DYN: u16 = 3;
const EM_X86_64: u16 = 62;
const PT_LOAD: u32 = 1;
const PT_DYNAMIC: u32 = 2;
const PF_X: u32 = 1;
const PF_W: u32 = 2;
const PF_R: u32 = 4;

/// Writes a 64-bit ELF header (`e_ident` plus the fixed fields). `buf` must
/// already be at least 64 bytes, or is grown to fit.
fn elf64_header(buf: &mut Vec<u8>, e_type: u16, e_machine: u16, e_phoff: u64, e_phnum: u16) {
    put(buf, 0, &[0x7f, b'E', b'L', b'F']);
    buf[4] = ELFCLASS64;
    buf[5] = ELFDATA2LSB;
    buf[6] = EV_CURRENT;
    buf[7] = 0; // ELFOSABI_NONE
    put_u16(buf, 16, e_type);
    put_u16(buf, 18, e_machine);
    put_u32(buf, 20, EV_CURRENT as u32);
    put_u64(buf, 24, 0); // e_entry
    put_u64(buf, 32, e_phoff);
    put_u64(buf, 40, 0); // e_shoff
    put_u32(buf, 48, 0); // e_flags
    put_u16(buf, 52, 64); // e_ehsize
    put_u16(buf, 54, 56); // e_phentsize
    put_u16(buf, 56, e_phnum);
    put_u16(buf, 58, 0); // e_shentsize
    put_u16(buf, 60, 0); // e_shnum
    put_u16(buf, 62, 0); // e_shstrndx
}

#[allow(clippy::too_many_arguments)]
fn program_header64(
    buf: &mut Vec<u8>,
    offset: usize,
    p_type: u32,
    p_flags: u32,
    p_offset: u64,
    p_vaddr: u64,
    p_filesz: u64,
    p_memsz: u64,
    p_align: u64,
) {
    put_u32(buf, offset, p_type);
    put_u32(buf, offset + 4, p_flags);
    put_u64(buf, offset + 8, p_offset);
    put_u64(buf, offset + 16, p_vaddr);
    put_u64(buf, offset + 24, p_vaddr); // p_paddr
    put_u64(buf, offset + 32, p_filesz);
    put_u64(buf, offset + 40, p_memsz);
    put_u64(buf, offset + 48, p_align);
}

fn dynamic_entry64(buf: &mut Vec<u8>, offset: usize, tag: i64, value: u64) {
    put_i64(buf, offset, tag);
    put_u64(buf, offset + 8, value);
}

fn symbol64(buf: &mut Vec<u8>, offset: usize, st_name: u32, st_info: u8, st_shndx: u16) {
    put_u32(buf, offset, st_name);
    buf[offset + 4] = st_info;
    buf[offset + 5] = 0; // st_other
    put_u16(buf, offset + 6, st_shndx);
    put_u64(buf, offset + 8, 0); // st_value
    put_u64(buf, offset + 16, 0); // st_size
}

/// S1: a buffer the size of a full 64-bit header, with a valid
/// class/data/version/OS-ABI byte but a wrong magic number, so the failure
/// is specifically the magic check and not an earlier length or
/// class-byte rejection.
pub fn bad_magic_bytes() -> Vec<u8> {
    let mut buf = minimal_64_header_bytes();
    buf[0..4].copy_from_slice(b"BAD!");
    buf
}

/// S2: a minimal valid 64-bit `ET_DYN` header with no program/section
/// headers (enough to exercise `only_header` parsing).
pub fn minimal_64_header_bytes() -> Vec<u8> {
    let mut buf = vec![0u8; 64];
    elf64_header(&mut buf, ET_DYN, EM_X86_64, 0, 0);
    buf
}

/// S3: a 32-bit class byte paired with a 64-bit machine value.
pub fn class_machine_mismatch_bytes() -> Vec<u8> {
    let mut buf = minimal_64_header_bytes();
    buf[4] = ELFCLASS32;
    buf
}

/// A complete, round-trippable 64-bit `ET_DYN`: one `PT_LOAD` covering the
/// whole file, one `PT_DYNAMIC`, a one-symbol `.dynsym`/`.dynstr`, no
/// relocations, no section header table.
pub fn full_dynamic_elf() -> Vec<u8> {
    // header(64) | phdrs(2*56=112, ends at 176) | dynamic(5*16=80, ends at
    // 256) | dynsym(1*24, ends at 280) | dynstr(8, ends at 288)
    let dyn_offset = 176usize;
    let symtab_offset = 256u64;
    let strtab_offset = 280u64;
    let total_len = 288usize;

    let mut buf = vec![0u8; total_len];
    elf64_header(&mut buf, ET_DYN, EM_X86_64, 64, 2);
    program_header64(&mut buf, 64, PT_LOAD, PF_R | PF_W, 0, 0, total_len as u64, total_len as u64, 0x1000);
    program_header64(&mut buf, 64 + 56, PT_DYNAMIC, PF_R | PF_W, dyn_offset as u64, dyn_offset as u64, 80, 80, 8);

    dynamic_entry64(&mut buf, dyn_offset, 5, strtab_offset); // DT_STRTAB
    dynamic_entry64(&mut buf, dyn_offset + 16, 10, 8); // DT_STRSZ
    dynamic_entry64(&mut buf, dyn_offset + 32, 6, symtab_offset); // DT_SYMTAB
    dynamic_entry64(&mut buf, dyn_offset + 48, 11, 24); // DT_SYMENT
    dynamic_entry64(&mut buf, dyn_offset + 64, 0, 0); // DT_NULL

    symbol64(&mut buf, symtab_offset as usize, 1, 0x12, 0);
    put(&mut buf, strtab_offset as usize, b"\0printf\0");

    buf
}

/// S4: like [`full_dynamic_elf`], but with two `DT_REL` entries before
/// `DT_NULL`.
pub fn duplicate_dt_rel_bytes() -> Vec<u8> {
    // header(64) | phdrs(2*56=112, ends at 176) | dynamic(6*16=96, ends at
    // 272) | dynsym(1*24, ends at 296) | dynstr(8, ends at 304)
    let dyn_offset = 176usize;
    let symtab_offset = 272u64;
    let strtab_offset = 296u64;
    let total_len = 304usize;

    let mut buf = vec![0u8; total_len];
    elf64_header(&mut buf, ET_DYN, EM_X86_64, 64, 2);
    program_header64(&mut buf, 64, PT_LOAD, PF_R | PF_W, 0, 0, total_len as u64, total_len as u64, 0x1000);
    program_header64(&mut buf, 64 + 56, PT_DYNAMIC, PF_R | PF_W, dyn_offset as u64, dyn_offset as u64, 96, 96, 8);

    dynamic_entry64(&mut buf, dyn_offset, 5, strtab_offset); // DT_STRTAB
    dynamic_entry64(&mut buf, dyn_offset + 16, 10, 8); // DT_STRSZ
    dynamic_entry64(&mut buf, dyn_offset + 32, 6, symtab_offset); // DT_SYMTAB
    dynamic_entry64(&mut buf, dyn_offset + 48, 11, 24); // DT_SYMENT
    dynamic_entry64(&mut buf, dyn_offset + 64, 17, 0x1000); // DT_REL #1
    dynamic_entry64(&mut buf, dyn_offset + 80, 17, 0x1000); // DT_REL #2 (duplicate)

    symbol64(&mut buf, symtab_offset as usize, 1, 0x12, 0);
    put(&mut buf, strtab_offset as usize, b"\0printf\0");

    buf
}

/// S5: a `PT_LOAD|PF_X` segment followed, with a `0x1000`-byte virtual
/// address gap, by a second `PT_LOAD` segment.
pub fn two_load_segments_elf() -> Vec<u8> {
    // header(64) | phdrs(3*56=168, ends at 232) | dynamic(5*16=80, ends at
    // 312) | dynsym(1*24, ends at 336) | dynstr(8, ends at 344)
    let dyn_offset = 232usize;
    let symtab_offset = 312u64;
    let strtab_offset = 336u64;
    let total_len = 344usize;

    let mut buf = vec![0u8; total_len];
    elf64_header(&mut buf, ET_DYN, EM_X86_64, 64, 3);
    program_header64(&mut buf, 64, PT_LOAD, PF_R | PF_X, 0, 0, total_len as u64, total_len as u64, 0x1000);
    program_header64(&mut buf, 64 + 56, PT_DYNAMIC, PF_R | PF_W, dyn_offset as u64, dyn_offset as u64, 80, 80, 8);
    program_header64(
        &mut buf,
        64 + 2 * 56,
        PT_LOAD,
        PF_R | PF_X,
        0,
        total_len as u64 + 0x1000,
        0x10,
        0x10,
        0x1000,
    );

    dynamic_entry64(&mut buf, dyn_offset, 5, strtab_offset);
    dynamic_entry64(&mut buf, dyn_offset + 16, 10, 8);
    dynamic_entry64(&mut buf, dyn_offset + 32, 6, symtab_offset);
    dynamic_entry64(&mut buf, dyn_offset + 48, 11, 24);
    dynamic_entry64(&mut buf, dyn_offset + 64, 0, 0);

    symbol64(&mut buf, symtab_offset as usize, 1, 0x12, 0);
    put(&mut buf, strtab_offset as usize, b"\0printf\0");

    buf
}

/// S6: an ET_DYN resolving one imported symbol through `DT_JMPREL`/GOT.
pub fn plt_import_elf(symbol_name: &str, got_initial: u64) -> Vec<u8> {
    let dyn_offset = 176usize;
    let symtab_offset = 304u64;
    let strtab_size = (symbol_name.len() + 2) as u64;
    let strtab_offset = symtab_offset + 48; // two 24-byte symbol entries
    let jmprel_offset = strtab_offset + strtab_size;
    let got_offset = jmprel_offset + 24; // one Rela entry

    let total_len = (got_offset + 8) as usize;
    let mut buf = vec![0u8; total_len];
    elf64_header(&mut buf, ET_DYN, EM_X86_64, 64, 2);
    program_header64(&mut buf, 64, PT_LOAD, PF_R | PF_W, 0, 0, total_len as u64, total_len as u64, 0x1000);
    program_header64(&mut buf, 64 + 56, PT_DYNAMIC, PF_R | PF_W, dyn_offset as u64, dyn_offset as u64, 128, 128, 8);

    dynamic_entry64(&mut buf, dyn_offset, 5, strtab_offset); // DT_STRTAB
    dynamic_entry64(&mut buf, dyn_offset + 16, 10, strtab_size); // DT_STRSZ
    dynamic_entry64(&mut buf, dyn_offset + 32, 6, symtab_offset); // DT_SYMTAB
    dynamic_entry64(&mut buf, dyn_offset + 48, 11, 24); // DT_SYMENT
    dynamic_entry64(&mut buf, dyn_offset + 64, 23, jmprel_offset); // DT_JMPREL
    dynamic_entry64(&mut buf, dyn_offset + 80, 20, 7); // DT_PLTREL = DT_RELA
    dynamic_entry64(&mut buf, dyn_offset + 96, 2, 24); // DT_PLTRELSZ
    dynamic_entry64(&mut buf, dyn_offset + 112, 0, 0); // DT_NULL

    symbol64(&mut buf, symtab_offset as usize, 0, 0, 0); // STN_UNDEF
    symbol64(&mut buf, symtab_offset as usize + 24, 1, 0x12, 0); // imported symbol
    let mut strtab_bytes = vec![0u8];
    strtab_bytes.extend_from_slice(symbol_name.as_bytes());
    strtab_bytes.push(0);
    put(&mut buf, strtab_offset as usize, &strtab_bytes);

    // Rela entry: r_offset=got_offset, r_info=(sym=1,type=7 R_X86_64_JUMP_SLOT), r_addend=0
    put_u64(&mut buf, jmprel_offset as usize, got_offset);
    put_u64(&mut buf, jmprel_offset as usize + 8, (1u64 << 32) | 7);
    put_i64(&mut buf, jmprel_offset as usize + 16, 0);

    put_u64(&mut buf, got_offset as usize, got_initial);

    buf
}
