//! ELF header access
//!
//! This module wraps the class-specific file headers in a single type so the
//! rest of the crate can ask for a field without caring which layout the file
//! uses.

use super::{
    defs::{Elf32Ehdr, Elf64Ehdr},
    ident::{ElfClass, Ident},
};

/// Width-dispatching access to a class-specific record's field.
macro_rules! field {
    ($value:expr, $field:ident) => {
        match $value {
            Self::Elf32(inner) => inner.$field.into(),
            Self::Elf64(inner) => inner.$field.into(),
        }
    };
}
pub(crate) use field;

/// The file header of either class.
///
/// Offsets and addresses are widened to `u64` by the accessors; the raw record
/// stays available through the variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElfHeader {
    Elf32(Elf32Ehdr),
    Elf64(Elf64Ehdr),
}

impl ElfHeader {
    /// Returns the width class of this header.
    #[inline]
    pub fn class(&self) -> ElfClass {
        match self {
            Self::Elf32(_) => ElfClass::Elf32,
            Self::Elf64(_) => ElfClass::Elf64,
        }
    }

    /// Returns the identification block carried in the header.
    #[inline]
    pub fn ident(&self) -> Ident {
        match self {
            Self::Elf32(ehdr) => Ident::new(ehdr.e_ident),
            Self::Elf64(ehdr) => Ident::new(ehdr.e_ident),
        }
    }

    /// Object file type (`ET_*`).
    #[inline]
    pub fn e_type(&self) -> u16 {
        field!(self, e_type)
    }

    /// Target machine (`EM_*`).
    #[inline]
    pub fn e_machine(&self) -> u16 {
        field!(self, e_machine)
    }

    /// Object file version. Must agree with `EI_VERSION`.
    #[inline]
    pub fn e_version(&self) -> u32 {
        field!(self, e_version)
    }

    /// Virtual address of the entry point, or zero.
    #[inline]
    pub fn e_entry(&self) -> u64 {
        field!(self, e_entry)
    }

    /// Returns the file offset of the program header table.
    #[inline]
    pub fn e_phoff(&self) -> u64 {
        field!(self, e_phoff)
    }

    /// Returns the file offset of the section header table.
    #[inline]
    pub fn e_shoff(&self) -> u64 {
        field!(self, e_shoff)
    }

    #[inline]
    pub fn e_flags(&self) -> u32 {
        field!(self, e_flags)
    }

    #[inline]
    pub fn e_ehsize(&self) -> u16 {
        field!(self, e_ehsize)
    }

    /// Returns the size the file declares for each program header entry.
    #[inline]
    pub fn e_phentsize(&self) -> u16 {
        field!(self, e_phentsize)
    }

    /// Returns the number of program headers.
    #[inline]
    pub fn e_phnum(&self) -> usize {
        let phnum: u16 = field!(self, e_phnum);
        phnum as usize
    }

    /// Returns the size the file declares for each section header entry.
    #[inline]
    pub fn e_shentsize(&self) -> u16 {
        field!(self, e_shentsize)
    }

    /// Returns the number of section headers.
    #[inline]
    pub fn e_shnum(&self) -> usize {
        let shnum: u16 = field!(self, e_shnum);
        shnum as usize
    }

    /// Index of the section holding section names.
    #[inline]
    pub fn e_shstrndx(&self) -> usize {
        let shstrndx: u16 = field!(self, e_shstrndx);
        shstrndx as usize
    }
}

impl From<Elf32Ehdr> for ElfHeader {
    fn from(value: Elf32Ehdr) -> Self {
        Self::Elf32(value)
    }
}

impl From<Elf64Ehdr> for ElfHeader {
    fn from(value: Elf64Ehdr) -> Self {
        Self::Elf64(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_widen_elf32_fields() {
        let header = ElfHeader::from(Elf32Ehdr {
            e_entry: 0x8048000,
            e_phoff: 52,
            e_shoff: 0x1000,
            e_phnum: 3,
            e_shnum: 9,
            e_shstrndx: 8,
            e_version: 1,
            ..Default::default()
        });
        assert_eq!(header.class(), ElfClass::Elf32);
        assert_eq!(header.e_entry(), 0x8048000u64);
        assert_eq!(header.e_phoff(), 52);
        assert_eq!(header.e_shoff(), 0x1000);
        assert_eq!(header.e_phnum(), 3);
        assert_eq!(header.e_shnum(), 9);
        assert_eq!(header.e_shstrndx(), 8);
        assert_eq!(header.e_version(), 1);
    }
}
