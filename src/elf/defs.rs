//! Raw on-disk records for both ELF classes.
//!
//! Field names, widths and order follow the System V gABI exactly. Each record
//! implements [`Record`], which decodes it from a byte slice honouring the
//! file's data encoding.

use super::ident::EI_NIDENT;
use crate::{Result, parse_error};
use alloc::format;
use elf::endian::{AnyEndian, EndianParse};

/// A record with a fixed on-disk size.
pub trait Record: Sized {
    /// Size of one record in the file, in bytes.
    const SIZE: usize;

    /// Decodes one record from the first [`Self::SIZE`] bytes of `data`.
    fn parse(data: &[u8], endian: AnyEndian) -> Result<Self>;
}

#[inline]
fn check_len(data: &[u8], size: usize, what: &str) -> Result<()> {
    if data.len() < size {
        return Err(parse_error(format!(
            "{what} needs {size} bytes, got {}",
            data.len()
        )));
    }
    Ok(())
}

#[inline]
fn parse_ident(data: &[u8]) -> [u8; EI_NIDENT] {
    let mut ident = [0u8; EI_NIDENT];
    ident.copy_from_slice(&data[..EI_NIDENT]);
    ident
}

/// ELF32 file header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Elf32Ehdr {
    pub e_ident: [u8; EI_NIDENT],
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_entry: u32,
    pub e_phoff: u32,
    pub e_shoff: u32,
    pub e_flags: u32,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

impl Record for Elf32Ehdr {
    const SIZE: usize = 52;

    fn parse(data: &[u8], endian: AnyEndian) -> Result<Self> {
        check_len(data, Self::SIZE, "ELF32 header")?;
        let mut offset = EI_NIDENT;
        Ok(Self {
            e_ident: parse_ident(data),
            e_type: endian.parse_u16_at(&mut offset, data)?,
            e_machine: endian.parse_u16_at(&mut offset, data)?,
            e_version: endian.parse_u32_at(&mut offset, data)?,
            e_entry: endian.parse_u32_at(&mut offset, data)?,
            e_phoff: endian.parse_u32_at(&mut offset, data)?,
            e_shoff: endian.parse_u32_at(&mut offset, data)?,
            e_flags: endian.parse_u32_at(&mut offset, data)?,
            e_ehsize: endian.parse_u16_at(&mut offset, data)?,
            e_phentsize: endian.parse_u16_at(&mut offset, data)?,
            e_phnum: endian.parse_u16_at(&mut offset, data)?,
            e_shentsize: endian.parse_u16_at(&mut offset, data)?,
            e_shnum: endian.parse_u16_at(&mut offset, data)?,
            e_shstrndx: endian.parse_u16_at(&mut offset, data)?,
        })
    }
}

/// ELF64 file header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Elf64Ehdr {
    pub e_ident: [u8; EI_NIDENT],
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_entry: u64,
    pub e_phoff: u64,
    pub e_shoff: u64,
    pub e_flags: u32,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

impl Record for Elf64Ehdr {
    const SIZE: usize = 64;

    fn parse(data: &[u8], endian: AnyEndian) -> Result<Self> {
        check_len(data, Self::SIZE, "ELF64 header")?;
        let mut offset = EI_NIDENT;
        Ok(Self {
            e_ident: parse_ident(data),
            e_type: endian.parse_u16_at(&mut offset, data)?,
            e_machine: endian.parse_u16_at(&mut offset, data)?,
            e_version: endian.parse_u32_at(&mut offset, data)?,
            e_entry: endian.parse_u64_at(&mut offset, data)?,
            e_phoff: endian.parse_u64_at(&mut offset, data)?,
            e_shoff: endian.parse_u64_at(&mut offset, data)?,
            e_flags: endian.parse_u32_at(&mut offset, data)?,
            e_ehsize: endian.parse_u16_at(&mut offset, data)?,
            e_phentsize: endian.parse_u16_at(&mut offset, data)?,
            e_phnum: endian.parse_u16_at(&mut offset, data)?,
            e_shentsize: endian.parse_u16_at(&mut offset, data)?,
            e_shnum: endian.parse_u16_at(&mut offset, data)?,
            e_shstrndx: endian.parse_u16_at(&mut offset, data)?,
        })
    }
}

/// ELF32 program header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Elf32Phdr {
    pub p_type: u32,
    pub p_offset: u32,
    pub p_vaddr: u32,
    pub p_paddr: u32,
    pub p_filesz: u32,
    pub p_memsz: u32,
    pub p_flags: u32,
    pub p_align: u32,
}

impl Record for Elf32Phdr {
    const SIZE: usize = 32;

    fn parse(data: &[u8], endian: AnyEndian) -> Result<Self> {
        check_len(data, Self::SIZE, "ELF32 program header")?;
        let mut offset = 0;
        Ok(Self {
            p_type: endian.parse_u32_at(&mut offset, data)?,
            p_offset: endian.parse_u32_at(&mut offset, data)?,
            p_vaddr: endian.parse_u32_at(&mut offset, data)?,
            p_paddr: endian.parse_u32_at(&mut offset, data)?,
            p_filesz: endian.parse_u32_at(&mut offset, data)?,
            p_memsz: endian.parse_u32_at(&mut offset, data)?,
            p_flags: endian.parse_u32_at(&mut offset, data)?,
            p_align: endian.parse_u32_at(&mut offset, data)?,
        })
    }
}

/// ELF64 program header.
///
/// `p_flags` sits directly after `p_type` in this class, unlike ELF32.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Elf64Phdr {
    pub p_type: u32,
    pub p_flags: u32,
    pub p_offset: u64,
    pub p_vaddr: u64,
    pub p_paddr: u64,
    pub p_filesz: u64,
    pub p_memsz: u64,
    pub p_align: u64,
}

impl Record for Elf64Phdr {
    const SIZE: usize = 56;

    fn parse(data: &[u8], endian: AnyEndian) -> Result<Self> {
        check_len(data, Self::SIZE, "ELF64 program header")?;
        let mut offset = 0;
        Ok(Self {
            p_type: endian.parse_u32_at(&mut offset, data)?,
            p_flags: endian.parse_u32_at(&mut offset, data)?,
            p_offset: endian.parse_u64_at(&mut offset, data)?,
            p_vaddr: endian.parse_u64_at(&mut offset, data)?,
            p_paddr: endian.parse_u64_at(&mut offset, data)?,
            p_filesz: endian.parse_u64_at(&mut offset, data)?,
            p_memsz: endian.parse_u64_at(&mut offset, data)?,
            p_align: endian.parse_u64_at(&mut offset, data)?,
        })
    }
}

/// ELF32 section header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Elf32Shdr {
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u32,
    pub sh_addr: u32,
    pub sh_offset: u32,
    pub sh_size: u32,
    pub sh_link: u32,
    pub sh_info: u32,
    pub sh_addralign: u32,
    pub sh_entsize: u32,
}

impl Record for Elf32Shdr {
    const SIZE: usize = 40;

    fn parse(data: &[u8], endian: AnyEndian) -> Result<Self> {
        check_len(data, Self::SIZE, "ELF32 section header")?;
        let mut offset = 0;
        Ok(Self {
            sh_name: endian.parse_u32_at(&mut offset, data)?,
            sh_type: endian.parse_u32_at(&mut offset, data)?,
            sh_flags: endian.parse_u32_at(&mut offset, data)?,
            sh_addr: endian.parse_u32_at(&mut offset, data)?,
            sh_offset: endian.parse_u32_at(&mut offset, data)?,
            sh_size: endian.parse_u32_at(&mut offset, data)?,
            sh_link: endian.parse_u32_at(&mut offset, data)?,
            sh_info: endian.parse_u32_at(&mut offset, data)?,
            sh_addralign: endian.parse_u32_at(&mut offset, data)?,
            sh_entsize: endian.parse_u32_at(&mut offset, data)?,
        })
    }
}

/// ELF64 section header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Elf64Shdr {
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u64,
    pub sh_addr: u64,
    pub sh_offset: u64,
    pub sh_size: u64,
    pub sh_link: u32,
    pub sh_info: u32,
    pub sh_addralign: u64,
    pub sh_entsize: u64,
}

impl Record for Elf64Shdr {
    const SIZE: usize = 64;

    fn parse(data: &[u8], endian: AnyEndian) -> Result<Self> {
        check_len(data, Self::SIZE, "ELF64 section header")?;
        let mut offset = 0;
        Ok(Self {
            sh_name: endian.parse_u32_at(&mut offset, data)?,
            sh_type: endian.parse_u32_at(&mut offset, data)?,
            sh_flags: endian.parse_u64_at(&mut offset, data)?,
            sh_addr: endian.parse_u64_at(&mut offset, data)?,
            sh_offset: endian.parse_u64_at(&mut offset, data)?,
            sh_size: endian.parse_u64_at(&mut offset, data)?,
            sh_link: endian.parse_u32_at(&mut offset, data)?,
            sh_info: endian.parse_u32_at(&mut offset, data)?,
            sh_addralign: endian.parse_u64_at(&mut offset, data)?,
            sh_entsize: endian.parse_u64_at(&mut offset, data)?,
        })
    }
}

/// ELF32 symbol table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Elf32Sym {
    pub st_name: u32,
    pub st_value: u32,
    pub st_size: u32,
    pub st_info: u8,
    pub st_other: u8,
    pub st_shndx: u16,
}

impl Record for Elf32Sym {
    const SIZE: usize = 16;

    fn parse(data: &[u8], endian: AnyEndian) -> Result<Self> {
        check_len(data, Self::SIZE, "ELF32 symbol")?;
        let mut offset = 0;
        Ok(Self {
            st_name: endian.parse_u32_at(&mut offset, data)?,
            st_value: endian.parse_u32_at(&mut offset, data)?,
            st_size: endian.parse_u32_at(&mut offset, data)?,
            st_info: endian.parse_u8_at(&mut offset, data)?,
            st_other: endian.parse_u8_at(&mut offset, data)?,
            st_shndx: endian.parse_u16_at(&mut offset, data)?,
        })
    }
}

/// ELF64 symbol table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Elf64Sym {
    pub st_name: u32,
    pub st_info: u8,
    pub st_other: u8,
    pub st_shndx: u16,
    pub st_value: u64,
    pub st_size: u64,
}

impl Record for Elf64Sym {
    const SIZE: usize = 24;

    fn parse(data: &[u8], endian: AnyEndian) -> Result<Self> {
        check_len(data, Self::SIZE, "ELF64 symbol")?;
        let mut offset = 0;
        Ok(Self {
            st_name: endian.parse_u32_at(&mut offset, data)?,
            st_info: endian.parse_u8_at(&mut offset, data)?,
            st_other: endian.parse_u8_at(&mut offset, data)?,
            st_shndx: endian.parse_u16_at(&mut offset, data)?,
            st_value: endian.parse_u64_at(&mut offset, data)?,
            st_size: endian.parse_u64_at(&mut offset, data)?,
        })
    }
}
