//! Section headers.

use super::{
    defs::{Elf32Shdr, Elf64Shdr},
    ehdr::field,
};
use bitflags::bitflags;
use core::fmt;
use elf::abi;

const SHT_LOOS: u32 = 0x6000_0000;
const SHT_HIOS: u32 = 0x6fff_ffff;
const SHT_LOPROC: u32 = 0x7000_0000;
const SHT_HIPROC: u32 = 0x7fff_ffff;
const SHT_LOUSER: u32 = 0x8000_0000;
const SHT_HIUSER: u32 = 0xffff_ffff;

/// Section kind (`sh_type`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SectionType {
    Null,
    ProgBits,
    SymTab,
    StrTab,
    Rela,
    Hash,
    Dynamic,
    Note,
    /// Occupies no file space (`.bss`).
    NoBits,
    Rel,
    Shlib,
    DynSym,
    InitArray,
    FiniArray,
    PreInitArray,
    Group,
    SymTabShndx,
    /// In `SHT_LOOS..=SHT_HIOS`, e.g. `SHT_GNU_HASH`.
    OsSpecific(u32),
    ProcessorSpecific(u32),
    User(u32),
    Unknown(u32),
}

impl From<u32> for SectionType {
    fn from(value: u32) -> Self {
        match value {
            abi::SHT_NULL => Self::Null,
            abi::SHT_PROGBITS => Self::ProgBits,
            abi::SHT_SYMTAB => Self::SymTab,
            abi::SHT_STRTAB => Self::StrTab,
            abi::SHT_RELA => Self::Rela,
            abi::SHT_HASH => Self::Hash,
            abi::SHT_DYNAMIC => Self::Dynamic,
            abi::SHT_NOTE => Self::Note,
            abi::SHT_NOBITS => Self::NoBits,
            abi::SHT_REL => Self::Rel,
            abi::SHT_SHLIB => Self::Shlib,
            abi::SHT_DYNSYM => Self::DynSym,
            abi::SHT_INIT_ARRAY => Self::InitArray,
            abi::SHT_FINI_ARRAY => Self::FiniArray,
            abi::SHT_PREINIT_ARRAY => Self::PreInitArray,
            abi::SHT_GROUP => Self::Group,
            abi::SHT_SYMTAB_SHNDX => Self::SymTabShndx,
            SHT_LOOS..=SHT_HIOS => Self::OsSpecific(value),
            SHT_LOPROC..=SHT_HIPROC => Self::ProcessorSpecific(value),
            SHT_LOUSER..=SHT_HIUSER => Self::User(value),
            _ => Self::Unknown(value),
        }
    }
}

impl SectionType {
    /// The raw `sh_type` value.
    pub fn raw(self) -> u32 {
        match self {
            Self::Null => abi::SHT_NULL,
            Self::ProgBits => abi::SHT_PROGBITS,
            Self::SymTab => abi::SHT_SYMTAB,
            Self::StrTab => abi::SHT_STRTAB,
            Self::Rela => abi::SHT_RELA,
            Self::Hash => abi::SHT_HASH,
            Self::Dynamic => abi::SHT_DYNAMIC,
            Self::Note => abi::SHT_NOTE,
            Self::NoBits => abi::SHT_NOBITS,
            Self::Rel => abi::SHT_REL,
            Self::Shlib => abi::SHT_SHLIB,
            Self::DynSym => abi::SHT_DYNSYM,
            Self::InitArray => abi::SHT_INIT_ARRAY,
            Self::FiniArray => abi::SHT_FINI_ARRAY,
            Self::PreInitArray => abi::SHT_PREINIT_ARRAY,
            Self::Group => abi::SHT_GROUP,
            Self::SymTabShndx => abi::SHT_SYMTAB_SHNDX,
            Self::OsSpecific(raw)
            | Self::ProcessorSpecific(raw)
            | Self::User(raw)
            | Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "NULL",
            Self::ProgBits => "PROGBITS",
            Self::SymTab => "SYMTAB",
            Self::StrTab => "STRTAB",
            Self::Rela => "RELA",
            Self::Hash => "HASH",
            Self::Dynamic => "DYNAMIC",
            Self::Note => "NOTE",
            Self::NoBits => "NOBITS",
            Self::Rel => "REL",
            Self::Shlib => "SHLIB",
            Self::DynSym => "DYNSYM",
            Self::InitArray => "INIT_ARRAY",
            Self::FiniArray => "FINI_ARRAY",
            Self::PreInitArray => "PREINIT_ARRAY",
            Self::Group => "GROUP",
            Self::SymTabShndx => "SYMTAB_SHNDX",
            Self::OsSpecific(raw) => return write!(f, "LOOS+0x{:x}", raw - SHT_LOOS),
            Self::ProcessorSpecific(raw) => return write!(f, "LOPROC+0x{:x}", raw - SHT_LOPROC),
            Self::User(raw) => return write!(f, "LOUSER+0x{:x}", raw - SHT_LOUSER),
            Self::Unknown(raw) => return write!(f, "0x{raw:x}"),
        };
        f.write_str(name)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    /// Section attribute flags (`sh_flags`), widened to 64 bits for both classes.
    pub struct SectionFlags: u64 {
        const WRITE = abi::SHF_WRITE as u64;
        const ALLOC = abi::SHF_ALLOC as u64;
        const EXECINSTR = abi::SHF_EXECINSTR as u64;
        const MERGE = abi::SHF_MERGE as u64;
        const STRINGS = abi::SHF_STRINGS as u64;
        /// `sh_info` holds a section index.
        const INFO_LINK = abi::SHF_INFO_LINK as u64;
        const LINK_ORDER = abi::SHF_LINK_ORDER as u64;
        const OS_NONCONFORMING = abi::SHF_OS_NONCONFORMING as u64;
        const GROUP = abi::SHF_GROUP as u64;
        const TLS = abi::SHF_TLS as u64;
        const COMPRESSED = abi::SHF_COMPRESSED as u64;
        const MASKOS = 0x0ff0_0000;
        const MASKPROC = 0xf000_0000;
        /// Solaris: special ordering requirement.
        const ORDERED = 0x0400_0000;
        /// Solaris: excluded unless referenced or allocated.
        const EXCLUDE = 0x0800_0000;
    }
}

impl fmt::Display for SectionFlags {
    /// readelf-style key letters.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const KEYS: [(SectionFlags, char); 11] = [
            (SectionFlags::WRITE, 'W'),
            (SectionFlags::ALLOC, 'A'),
            (SectionFlags::EXECINSTR, 'X'),
            (SectionFlags::MERGE, 'M'),
            (SectionFlags::STRINGS, 'S'),
            (SectionFlags::INFO_LINK, 'I'),
            (SectionFlags::LINK_ORDER, 'L'),
            (SectionFlags::OS_NONCONFORMING, 'O'),
            (SectionFlags::GROUP, 'G'),
            (SectionFlags::TLS, 'T'),
            (SectionFlags::COMPRESSED, 'C'),
        ];
        for (flag, key) in KEYS {
            if self.contains(flag) {
                write!(f, "{key}")?;
            }
        }
        if self.contains(Self::EXCLUDE) {
            f.write_str("E")?;
        }
        if self.intersects(Self::MASKOS.difference(Self::ORDERED | Self::EXCLUDE)) {
            f.write_str("o")?;
        }
        if self.intersects(Self::MASKPROC) {
            f.write_str("p")?;
        }
        Ok(())
    }
}

/// A section header of either class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectionHeader {
    Elf32(Elf32Shdr),
    Elf64(Elf64Shdr),
}

impl SectionHeader {
    /// Offset of the section's name in the section-name string table.
    #[inline]
    pub fn name_offset(&self) -> u32 {
        field!(self, sh_name)
    }

    #[inline]
    pub fn section_type(&self) -> SectionType {
        let raw: u32 = field!(self, sh_type);
        SectionType::from(raw)
    }

    #[inline]
    pub fn flags(&self) -> SectionFlags {
        SectionFlags::from_bits_retain(field!(self, sh_flags))
    }

    #[inline]
    pub fn addr(&self) -> u64 {
        field!(self, sh_addr)
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        field!(self, sh_offset)
    }

    #[inline]
    pub fn size(&self) -> u64 {
        field!(self, sh_size)
    }

    /// Index of an associated section; meaning depends on the type.
    #[inline]
    pub fn link(&self) -> u32 {
        field!(self, sh_link)
    }

    #[inline]
    pub fn info(&self) -> u32 {
        field!(self, sh_info)
    }

    #[inline]
    pub fn addralign(&self) -> u64 {
        field!(self, sh_addralign)
    }

    /// Size of one entry for table-like sections, zero otherwise.
    #[inline]
    pub fn entsize(&self) -> u64 {
        field!(self, sh_entsize)
    }

    /// Number of bytes the section occupies in the file.
    ///
    /// `SHT_NOBITS` sections declare a size but occupy nothing.
    #[inline]
    pub fn file_size(&self) -> u64 {
        match self.section_type() {
            SectionType::NoBits => 0,
            _ => self.size(),
        }
    }

    /// End of the section's file range. Saturates instead of wrapping.
    #[inline]
    pub fn file_end(&self) -> u64 {
        self.offset().saturating_add(self.file_size())
    }
}

impl From<Elf32Shdr> for SectionHeader {
    fn from(value: Elf32Shdr) -> Self {
        Self::Elf32(value)
    }
}

impl From<Elf64Shdr> for SectionHeader {
    fn from(value: Elf64Shdr) -> Self {
        Self::Elf64(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn section_types_cover_reserved_ranges() {
        assert_eq!(SectionType::from(abi::SHT_DYNSYM), SectionType::DynSym);
        // SHT_GNU_HASH
        assert_eq!(
            SectionType::from(0x6fff_fff6),
            SectionType::OsSpecific(0x6fff_fff6)
        );
        assert_eq!(
            SectionType::from(0x8000_0001),
            SectionType::User(0x8000_0001)
        );
        assert_eq!(SectionType::from(40), SectionType::Unknown(40));
        assert_eq!(SectionType::from(40).to_string(), "0x28");
        assert_eq!(SectionType::NoBits.to_string(), "NOBITS");
    }

    #[test]
    fn nobits_sections_occupy_no_file_bytes() {
        let bss = SectionHeader::from(Elf64Shdr {
            sh_type: abi::SHT_NOBITS,
            sh_offset: 0x2000,
            sh_size: 0x400,
            ..Default::default()
        });
        assert_eq!(bss.size(), 0x400);
        assert_eq!(bss.file_size(), 0);
        assert_eq!(bss.file_end(), 0x2000);

        let huge = SectionHeader::from(Elf64Shdr {
            sh_type: abi::SHT_PROGBITS,
            sh_offset: 0x10,
            sh_size: u64::MAX,
            ..Default::default()
        });
        assert_eq!(huge.file_end(), u64::MAX);
    }

    #[test]
    fn flags_render_as_key_letters() {
        let shdr = SectionHeader::from(Elf32Shdr {
            sh_flags: (abi::SHF_ALLOC | abi::SHF_EXECINSTR) as u32,
            ..Default::default()
        });
        assert_eq!(shdr.flags().to_string(), "AX");
        let flags = SectionFlags::WRITE | SectionFlags::ALLOC | SectionFlags::TLS;
        assert_eq!(flags.to_string(), "WAT");
        assert_eq!(SectionFlags::from_bits_retain(0x1000_0000).to_string(), "p");
    }
}
