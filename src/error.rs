//! Error type for errors during ELF object handling

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
/// Error type for errors during ELF object handling
pub enum Error {
    #[error("input is too short: need at least {needed} bytes at offset {offset}, have {have}")]
    /// Input truncated before a required structure
    TooShort {
        /// Number of bytes required at `offset`
        needed: usize,
        /// Number of bytes actually available at `offset`
        have: usize,
        /// Offset at which the read was attempted
        offset: usize,
    },
    #[error("first four bytes are not the ELF magic number (0x7F 'E' 'L' 'F')")]
    /// First four bytes are not `7F 45 4C 46`
    BadMagic,
    #[error("unsupported ELF class {value}")]
    /// A field outside the supported enumeration for `EI_CLASS`
    UnsupportedClass {
        /// The raw `e_ident[EI_CLASS]` byte
        value: u8,
    },
    #[error("unsupported data encoding {value} (only ELFDATA2LSB is supported)")]
    /// A field outside the supported enumeration for `EI_DATA`
    UnsupportedData {
        /// The raw `e_ident[EI_DATA]` byte
        value: u8,
    },
    #[error("unsupported identifier version {value}")]
    /// A field outside the supported enumeration for `EI_VERSION`/`e_version`
    UnsupportedVersion {
        /// The raw version byte/word
        value: u32,
    },
    #[error("unsupported OS ABI {value}")]
    /// A field outside the supported enumeration for `EI_OSABI`
    UnsupportedABI {
        /// The raw `e_ident[EI_OSABI]` byte
        value: u8,
    },
    #[error("unsupported object type {value} (only ET_EXEC and ET_DYN are supported)")]
    /// `e_type` outside `{ET_EXEC, ET_DYN}`
    UnsupportedType {
        /// The raw `e_type` value
        value: u16,
    },
    #[error("unsupported machine {value} for this class")]
    /// `e_machine` does not match the class (`EM_386`/`EM_X86_64`)
    UnsupportedMachine {
        /// The raw `e_machine` value
        value: u16,
    },
    #[error("malformed dynamic segment: {reason}")]
    /// Missing `PT_DYNAMIC`, missing `DT_NULL`, or missing a mandatory dynamic tag
    MalformedDynamic {
        /// Human-readable reason
        reason: String,
    },
    #[error("duplicate dynamic entry for tag {tag:#x}")]
    /// Disallowed duplicate of `DT_JMPREL`/`DT_REL`/`DT_RELA`/`DT_RELENT`/`DT_RELAENT`
    DuplicateDynamic {
        /// The raw dynamic tag that was duplicated
        tag: i64,
    },
    #[error("inconsistent relocation configuration: {reason}")]
    /// `DT_JMPREL` present without its companions, or `DT_REL`/`DT_RELA` coexisting
    InconsistentRelocation {
        /// Human-readable reason
        reason: String,
    },
    #[error("parsed ELF does not round-trip to the original bytes")]
    /// Parser/serializer disagreement on a construction where `force == false`
    RoundTripMismatch,
    #[error("operation requires a fully parsed ELF file")]
    /// Editor/accessor invoked before `file_parsed` is true
    NotParsed,
    #[error("not enough room to append {requested} bytes (available: {available})")]
    /// Append size exceeds the available free-space gap
    NoRoom {
        /// Bytes requested to append
        requested: usize,
        /// Bytes actually available
        available: u64,
    },
    #[error("write at offset {offset} of {len} bytes crosses a segment boundary")]
    /// Byte-write crosses a segment boundary without `force`
    OutOfSegment {
        /// Offset the write started at
        offset: usize,
        /// Length of the attempted write
        len: usize,
    },
    #[error("address {0:#x} is not mapped by any segment")]
    /// Address translation cannot resolve; distinct from "not found"
    AddressUnmapped(u64),
    #[error("{0} was not found")]
    /// Named jump relocation or section missing
    NotFound(String),
    #[error("invalid value for forceDynSymParsing: {0}")]
    /// `forceDynSymParsing` not in `{0,1,2}`
    InvalidConfig(u8),
    #[error("record of size {len} at offset {offset} is out of bounds")]
    /// A requested slice for a fixed-layout record is out of bounds
    MalformedRecord {
        /// Offset the record was expected at
        offset: usize,
        /// Size of the record in bytes
        len: usize,
    },
    #[error("entry size {found} at {context} disagrees with the fixed platform size {expected}")]
    /// The entry size recorded in the header disagrees with the fixed platform size
    UnsupportedLayout {
        /// Where the mismatch was found (e.g. `"e_shentsize"`)
        context: &'static str,
        /// The expected, fixed platform size
        expected: usize,
        /// The size actually recorded in the file
        found: usize,
    },
    #[error("I/O error: {kind:?}")]
    /// Reading the input file or writing the output file failed
    Io {
        /// The underlying I/O error kind
        kind: std::io::ErrorKind,
    },
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io { kind: err.kind() }
    }
}

/// Result type alias used throughout this crate
pub type Result<T> = std::result::Result<T, Error>;
