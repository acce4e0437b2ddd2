//! Program headers (segments).

use super::{
    defs::{Elf32Phdr, Elf64Phdr},
    ehdr::field,
};
use bitflags::bitflags;
use core::fmt;
use elf::abi;

const PT_LOOS: u32 = 0x6000_0000;
const PT_HIOS: u32 = 0x6fff_ffff;
const PT_LOPROC: u32 = 0x7000_0000;
const PT_HIPROC: u32 = 0x7fff_ffff;

/// Segment kind (`p_type`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SegmentType {
    /// Unused entry.
    Null,
    /// Loadable segment.
    Load,
    /// Dynamic linking information.
    Dynamic,
    /// Path of the program interpreter.
    Interp,
    /// Auxiliary information.
    Note,
    /// Reserved.
    Shlib,
    /// The program header table itself.
    Phdr,
    /// Thread-local storage template.
    Tls,
    /// In `PT_LOOS..=PT_HIOS`, e.g. `PT_GNU_STACK`.
    OsSpecific(u32),
    /// In `PT_LOPROC..=PT_HIPROC`.
    ProcessorSpecific(u32),
    Unknown(u32),
}

impl From<u32> for SegmentType {
    fn from(value: u32) -> Self {
        match value {
            abi::PT_NULL => Self::Null,
            abi::PT_LOAD => Self::Load,
            abi::PT_DYNAMIC => Self::Dynamic,
            abi::PT_INTERP => Self::Interp,
            abi::PT_NOTE => Self::Note,
            abi::PT_SHLIB => Self::Shlib,
            abi::PT_PHDR => Self::Phdr,
            abi::PT_TLS => Self::Tls,
            PT_LOOS..=PT_HIOS => Self::OsSpecific(value),
            PT_LOPROC..=PT_HIPROC => Self::ProcessorSpecific(value),
            _ => Self::Unknown(value),
        }
    }
}

impl SegmentType {
    /// The raw `p_type` value.
    pub fn raw(self) -> u32 {
        match self {
            Self::Null => abi::PT_NULL,
            Self::Load => abi::PT_LOAD,
            Self::Dynamic => abi::PT_DYNAMIC,
            Self::Interp => abi::PT_INTERP,
            Self::Note => abi::PT_NOTE,
            Self::Shlib => abi::PT_SHLIB,
            Self::Phdr => abi::PT_PHDR,
            Self::Tls => abi::PT_TLS,
            Self::OsSpecific(raw) | Self::ProcessorSpecific(raw) | Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Load => f.write_str("LOAD"),
            Self::Dynamic => f.write_str("DYNAMIC"),
            Self::Interp => f.write_str("INTERP"),
            Self::Note => f.write_str("NOTE"),
            Self::Shlib => f.write_str("SHLIB"),
            Self::Phdr => f.write_str("PHDR"),
            Self::Tls => f.write_str("TLS"),
            Self::OsSpecific(raw) => write!(f, "LOOS+0x{:x}", raw - PT_LOOS),
            Self::ProcessorSpecific(raw) => write!(f, "LOPROC+0x{:x}", raw - PT_LOPROC),
            Self::Unknown(raw) => write!(f, "0x{raw:x}"),
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    /// Segment permission flags (`p_flags`).
    ///
    /// Bits outside the named flags are retained as read from the file.
    pub struct SegmentFlags: u32 {
        /// Execute.
        const EXECUTE = abi::PF_X as u32;
        /// Write.
        const WRITE = abi::PF_W as u32;
        /// Read.
        const READ = abi::PF_R as u32;
        /// OS-specific bits.
        const MASKOS = 0x0ff0_0000;
        /// Processor-specific bits.
        const MASKPROC = 0xf000_0000;
    }
}

impl fmt::Display for SegmentFlags {
    /// `RWE`-style permissions, `-` for missing bits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bit = |flag, c| if self.contains(flag) { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            bit(Self::READ, 'R'),
            bit(Self::WRITE, 'W'),
            bit(Self::EXECUTE, 'E')
        )
    }
}

/// A program header of either class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramHeader {
    Elf32(Elf32Phdr),
    Elf64(Elf64Phdr),
}

impl ProgramHeader {
    #[inline]
    pub fn segment_type(&self) -> SegmentType {
        let raw: u32 = field!(self, p_type);
        SegmentType::from(raw)
    }

    #[inline]
    pub fn flags(&self) -> SegmentFlags {
        SegmentFlags::from_bits_retain(field!(self, p_flags))
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        field!(self, p_offset)
    }

    #[inline]
    pub fn vaddr(&self) -> u64 {
        field!(self, p_vaddr)
    }

    #[inline]
    pub fn paddr(&self) -> u64 {
        field!(self, p_paddr)
    }

    #[inline]
    pub fn filesz(&self) -> u64 {
        field!(self, p_filesz)
    }

    #[inline]
    pub fn memsz(&self) -> u64 {
        field!(self, p_memsz)
    }

    #[inline]
    pub fn align(&self) -> u64 {
        field!(self, p_align)
    }
}

impl From<Elf32Phdr> for ProgramHeader {
    fn from(value: Elf32Phdr) -> Self {
        Self::Elf32(value)
    }
}

impl From<Elf64Phdr> for ProgramHeader {
    fn from(value: Elf64Phdr) -> Self {
        Self::Elf64(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn segment_types_cover_reserved_ranges() {
        assert_eq!(SegmentType::from(1), SegmentType::Load);
        assert_eq!(SegmentType::from(7), SegmentType::Tls);
        // PT_GNU_STACK
        assert_eq!(
            SegmentType::from(0x6474_e551),
            SegmentType::OsSpecific(0x6474_e551)
        );
        assert_eq!(
            SegmentType::from(0x7000_0001),
            SegmentType::ProcessorSpecific(0x7000_0001)
        );
        assert_eq!(SegmentType::from(42), SegmentType::Unknown(42));
        assert_eq!(SegmentType::from(0x6474_e551).raw(), 0x6474_e551);
    }

    #[test]
    fn flags_render_like_readelf() {
        let phdr = ProgramHeader::from(Elf64Phdr {
            p_type: abi::PT_LOAD,
            p_flags: (abi::PF_R | abi::PF_X) as u32,
            ..Default::default()
        });
        assert_eq!(phdr.segment_type(), SegmentType::Load);
        assert_eq!(phdr.flags().to_string(), "R-E");
        assert_eq!(SegmentFlags::all().to_string(), "RWE");
    }

    #[test]
    fn unknown_flag_bits_are_kept() {
        let flags = SegmentFlags::from_bits_retain(0x8 | abi::PF_R as u32);
        assert!(flags.contains(SegmentFlags::READ));
        assert_eq!(flags.bits(), 0xc);
    }
}
