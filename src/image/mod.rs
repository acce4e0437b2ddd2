//! The validated, read-only result of a parse.

mod builder;

pub(crate) use builder::ImageBuilder;

use crate::{
    ElfParser, Result, SectionTable,
    elf::{
        DataEncoding, ElfClass, ElfHeader, Ident, OsAbi, ProgramHeader, SectionHeader,
        SymbolTable,
    },
};
use alloc::{collections::BTreeMap, string::String, vec::Vec};
use hashbrown::HashMap;

/// A fully validated ELF file.
///
/// An `ElfImage` only exists if every structural check passed, so its tables
/// can be used without further bounds checking against the input. Sections are
/// kept in their original order: index `n` here is section `n` of the file.
#[derive(Debug, Clone, PartialEq)]
pub struct ElfImage {
    pub(crate) name: String,
    pub(crate) file_size: u64,
    pub(crate) ident: Ident,
    pub(crate) data_encoding: DataEncoding,
    pub(crate) os_abi: OsAbi,
    pub(crate) header: ElfHeader,
    pub(crate) phdrs: Vec<ProgramHeader>,
    pub(crate) shdrs: Vec<SectionHeader>,
    pub(crate) section_names: BTreeMap<usize, String>,
    pub(crate) section_index: HashMap<String, usize>,
    pub(crate) symtab: SymbolTable,
    pub(crate) dynsym: SymbolTable,
}

impl ElfImage {
    /// Parses the file at `path` with the default parser configuration.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use elf_probe::ElfImage;
    ///
    /// let image = ElfImage::from_path("/bin/ls").unwrap();
    /// println!("{} sections", image.section_headers().len());
    /// ```
    pub fn from_path(path: impl AsRef<str>) -> Result<Self> {
        ElfParser::new().parse(path.as_ref())
    }

    /// Name of the input (a path, or `<memory>`).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size of the input in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    #[inline]
    pub fn ident(&self) -> &Ident {
        &self.ident
    }

    #[inline]
    pub fn class(&self) -> ElfClass {
        self.header.class()
    }

    #[inline]
    pub fn data_encoding(&self) -> DataEncoding {
        self.data_encoding
    }

    /// The OS/ABI, or [`OsAbi::None`] if the file named an unknown one.
    #[inline]
    pub fn os_abi(&self) -> OsAbi {
        self.os_abi
    }

    #[inline]
    pub fn abi_version(&self) -> u8 {
        self.ident.abi_version()
    }

    #[inline]
    pub fn header(&self) -> &ElfHeader {
        &self.header
    }

    /// Program headers in file order.
    #[inline]
    pub fn program_headers(&self) -> &[ProgramHeader] {
        &self.phdrs
    }

    /// Section headers indexed by their section number.
    #[inline]
    pub fn section_headers(&self) -> &[SectionHeader] {
        &self.shdrs
    }

    /// Resolved section names keyed by section number.
    #[inline]
    pub fn section_names(&self) -> &BTreeMap<usize, String> {
        &self.section_names
    }

    pub fn section_name(&self, index: usize) -> Option<&str> {
        self.section_names.get(&index).map(String::as_str)
    }

    pub fn section(&self, index: usize) -> Option<&SectionHeader> {
        self.shdrs.get(index)
    }

    /// Section number of the first section called `name`.
    pub fn section_index(&self, name: &str) -> Option<usize> {
        self.section_index.get(name).copied()
    }

    pub fn section_by_name(&self, name: &str) -> Option<&SectionHeader> {
        self.section_index(name).and_then(|index| self.shdrs.get(index))
    }

    /// Follows `sh_link` to the section it names.
    ///
    /// Returns `None` when the link is zero or does not name a section.
    pub fn linked_section(&self, shdr: &SectionHeader) -> Option<(usize, &SectionHeader)> {
        let index = usize::try_from(shdr.link()).ok().filter(|&index| index != 0)?;
        self.shdrs.get(index).map(|linked| (index, linked))
    }

    /// Symbols from `.symtab`. Empty for stripped files.
    #[inline]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symtab
    }

    /// Symbols from `.dynsym`.
    #[inline]
    pub fn dynamic_symbols(&self) -> &SymbolTable {
        &self.dynsym
    }

    /// A [`Display`](core::fmt::Display)able table of the section headers.
    pub fn section_table(&self) -> SectionTable<'_> {
        SectionTable::new(self)
    }
}
