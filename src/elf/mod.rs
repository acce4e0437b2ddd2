//! ELF (Executable and Linkable Format) data structures.
//!
//! This module holds the on-disk records of both file classes as defined in
//! the System V ABI, the enumerations decoded from them, and width-tagged
//! wrappers that let callers read a field without matching on the class.

mod defs;
mod ehdr;
mod ident;
mod phdrs;
mod shdrs;
mod strtab;
mod symbol;

pub use defs::{
    Elf32Ehdr, Elf32Phdr, Elf32Shdr, Elf32Sym, Elf64Ehdr, Elf64Phdr, Elf64Shdr, Elf64Sym, Record,
};
pub use ehdr::ElfHeader;
pub use ident::{
    DataEncoding, EI_ABIVERSION, EI_CLASS, EI_DATA, EI_NIDENT, EI_OSABI, EI_PAD, EI_VERSION,
    ELF_MAGIC, ElfClass, Ident, OsAbi,
};
pub use phdrs::{ProgramHeader, SegmentFlags, SegmentType};
pub use shdrs::{SectionFlags, SectionHeader, SectionType};
pub use strtab::ElfStringTable;
pub use symbol::{Symbol, SymbolEntry, SymbolTable};
