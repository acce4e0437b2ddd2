//! Symbol table entries and resolved symbol tables.

use super::{
    defs::{Elf32Sym, Elf64Sym},
    ehdr::field,
};
use alloc::{string::String, vec::Vec};
use elf::abi;

/// A symbol table entry of either class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolEntry {
    Elf32(Elf32Sym),
    Elf64(Elf64Sym),
}

impl SymbolEntry {
    /// Offset of the name in the paired string table.
    #[inline]
    pub fn name_offset(&self) -> u32 {
        field!(self, st_name)
    }

    #[inline]
    pub fn value(&self) -> u64 {
        field!(self, st_value)
    }

    #[inline]
    pub fn size(&self) -> u64 {
        field!(self, st_size)
    }

    /// Raw type-and-binding byte.
    #[inline]
    pub fn info(&self) -> u8 {
        field!(self, st_info)
    }

    /// Raw visibility byte.
    #[inline]
    pub fn other(&self) -> u8 {
        field!(self, st_other)
    }

    /// Index of the defining section, or a reserved `SHN_*` value.
    #[inline]
    pub fn shndx(&self) -> u16 {
        field!(self, st_shndx)
    }

    /// `STB_*` binding (high nibble of `st_info`).
    #[inline]
    pub fn binding(&self) -> u8 {
        self.info() >> 4
    }

    /// `STT_*` type (low nibble of `st_info`).
    #[inline]
    pub fn symbol_type(&self) -> u8 {
        self.info() & 0xf
    }

    /// `STV_*` visibility (low two bits of `st_other`).
    #[inline]
    pub fn visibility(&self) -> u8 {
        self.other() & 0x3
    }

    #[inline]
    pub fn is_undefined(&self) -> bool {
        self.shndx() == abi::SHN_UNDEF
    }
}

impl From<Elf32Sym> for SymbolEntry {
    fn from(value: Elf32Sym) -> Self {
        Self::Elf32(value)
    }
}

impl From<Elf64Sym> for SymbolEntry {
    fn from(value: Elf64Sym) -> Self {
        Self::Elf64(value)
    }
}

/// A symbol with its resolved name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    index: usize,
    name: String,
    entry: SymbolEntry,
}

impl Symbol {
    pub(crate) fn new(index: usize, name: String, entry: SymbolEntry) -> Self {
        Self { index, name, entry }
    }

    /// Position of the entry in its symbol table.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn entry(&self) -> &SymbolEntry {
        &self.entry
    }
}

/// An ordered symbol table (`.symtab` or `.dynsym`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub(crate) fn new(symbols: Vec<Symbol>) -> Self {
        Self { symbols }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Symbol> {
        self.symbols.iter()
    }

    pub fn as_slice(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Returns the symbol at `index` in table order.
    pub fn get(&self, index: usize) -> Option<&Symbol> {
        self.symbols.get(index)
    }

    /// Returns the first symbol called `name`.
    pub fn find(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|symbol| symbol.name == name)
    }
}

impl<'a> IntoIterator for &'a SymbolTable {
    type Item = &'a Symbol;
    type IntoIter = core::slice::Iter<'a, Symbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.symbols.iter()
    }
}
