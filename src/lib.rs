//! A library for reading, inspecting, editing, and re-emitting ELF
//! binaries for 32-bit x86 and 64-bit x86-64, little-endian, System V /
//! Linux, `ET_EXEC` and `ET_DYN` object types.
//!
//! The core model is [`Elf`]: a parsed, mutable in-memory view of the
//! file plus a set of structural editing primitives (append bytes to a
//! loadable segment, add/remove sections, redirect GOT entries). Parsing
//! is round-trip-checked by default: [`Elf::parse`] re-serializes
//! immediately and compares against the input via MD5, failing with
//! [`Error::RoundTripMismatch`] on disagreement unless [`ParseConfig::force`]
//! is set.

pub mod address;
pub mod base;
pub mod dynamic;
mod editor;
pub mod error;
pub mod header;
mod parser;
pub mod relocation;
mod serializer;
pub mod symbol;


pub use base::Bits;
pub use dynamic::{DynTag, DynamicEntry};
pub use editor::AppendOptions;
pub use error::{Error, Result};
pub use header::elf::{ElfHeader, ElfMachine, ElfType};
pub use header::identification::{ElfClass, ElfDataEncoding, ElfIdentifier, ElfIdentifierVersion, ElfOSABI};
pub use header::program::{Segment, SegmentFlags, SegmentType};
pub use header::section::{Section, SectionFlags, SectionType};
pub use relocation::{RelocationEntry, RelocationKind};
pub use symbol::{DynamicSymbol, SymbolRef};

use std::path::Path;

use typed_builder::TypedBuilder;

/// Policy for resolving a disagreement between the `.dynsym` section's
/// recorded size and the `DT_STRTAB`/`DT_SYMTAB` offset-difference estimate.
///
/// Encoded as a tagged choice rather than a bare integer per the design
/// note this generalizes; `TryFrom<u8>` is provided for callers carrying
/// the original `{0, 1, 2}` convention forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DynSymPolicy {
    /// Disagreement skips symbol parsing with a logged warning, leaving the
    /// dynamic symbol table empty.
    #[default]
    Auto,
    /// Disagreement always trusts the `.dynsym` section's size.
    ForceDynsym,
    /// Disagreement always trusts the offset-difference estimate.
    ForceEstimate,
}

impl TryFrom<u8> for DynSymPolicy {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(DynSymPolicy::Auto),
            1 => Ok(DynSymPolicy::ForceDynsym),
            2 => Ok(DynSymPolicy::ForceEstimate),
            other => Err(Error::InvalidConfig(other)),
        }
    }
}

/// Per-parse configuration.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ParseConfig {
    /// Disable the parse/serialize round-trip equality check.
    #[builder(default)]
    pub force: bool,
    /// Byte offset into the input buffer where the ELF begins, for ELF
    /// objects embedded in a larger container.
    #[builder(default)]
    pub start_offset: u64,
    /// Policy applied when `.dynsym`'s recorded size disagrees with the
    /// `DT_STRTAB`/`DT_SYMTAB` estimate.
    #[builder(default)]
    pub force_dyn_sym_parsing: DynSymPolicy,
    /// Parse only the ELF header, skipping everything else (a fast
    /// validity probe).
    #[builder(default)]
    pub only_header: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig::builder().build()
    }
}

/// A parsed ELF file: the byte buffer plus the structured model derived
/// from it.
#[derive(Debug)]
pub struct Elf {
    pub(crate) data: Vec<u8>,
    /// Whether the file's fields are 32-bit or 64-bit wide.
    pub bits: Bits,
    /// True once a complete (non-`only_header`) parse has populated every
    /// field below. Editor and accessor methods require this.
    pub file_parsed: bool,
    /// The ELF file header.
    pub header: ElfHeader,
    /// The section header table, in file order.
    pub sections: Vec<Section>,
    /// The program header table (segments), in file order.
    pub segments: Vec<Segment>,
    /// The `PT_DYNAMIC` segment's entries, in file order, DT_NULL-terminated.
    pub dynamic_entries: Vec<DynamicEntry>,
    /// The dynamic symbol arena: the official `.dynsym`-sized prefix
    /// (`dynsym_count` entries) followed by any symbols interned only
    /// while parsing relocations that referenced an index beyond it.
    pub dynamic_symbols: Vec<DynamicSymbol>,
    pub(crate) dynsym_count: usize,
    /// `DT_REL` or `DT_RELA` entries (mutually exclusive; at most one is
    /// non-empty).
    pub relocation_entries: Vec<RelocationEntry>,
    /// `DT_JMPREL` entries.
    pub jump_relocation_entries: Vec<RelocationEntry>,
    pub(crate) config: ParseConfig,
}

impl Elf {
    /// Parse `data` according to `config`.
    ///
    /// Unless `config.force` is set, this immediately re-serializes the
    /// parsed model and compares it against `data` via MD5, failing with
    /// [`Error::RoundTripMismatch`] on any difference.
    pub fn parse(data: Vec<u8>, config: ParseConfig) -> Result<Self> {
        let force = config.force;
        let only_header = config.only_header;
        let elf = parser::parse(data, config)?;

        if !force && !only_header {
            let original = elf.data.clone();
            let regenerated = serializer::generate(&elf)?;
            if md5::compute(&regenerated).0 != md5::compute(&original).0 {
                return Err(Error::RoundTripMismatch);
            }
        }

        Ok(elf)
    }

    /// Read `path` fully into memory and parse it.
    pub fn open<P: AsRef<Path>>(path: P, config: ParseConfig) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::parse(data, config)
    }

    /// Project the current model back into bytes.
    pub fn generate(&self) -> Result<Vec<u8>> {
        serializer::generate(self)
    }

    /// [`Self::generate`], written to `path`.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.generate()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
