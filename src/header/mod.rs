//! Structures for the ELF header, section headers, and program headers.

pub mod elf;
pub mod identification;
pub mod program;
pub mod section;
