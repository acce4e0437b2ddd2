//! The 16-byte identification block (`e_ident`) and its enumerations.

use elf::abi;

/// Length of the identification block.
pub const EI_NIDENT: usize = abi::EI_NIDENT;
/// `\x7fELF`.
pub const ELF_MAGIC: [u8; 4] = abi::ELFMAGIC;
/// Byte offset of the class field.
pub const EI_CLASS: usize = abi::EI_CLASS;
/// Byte offset of the data encoding field.
pub const EI_DATA: usize = abi::EI_DATA;
/// Byte offset of the file version field.
pub const EI_VERSION: usize = abi::EI_VERSION;
/// Byte offset of the OS/ABI field.
pub const EI_OSABI: usize = abi::EI_OSABI;
/// Byte offset of the ABI version field.
pub const EI_ABIVERSION: usize = abi::EI_ABIVERSION;
/// First padding byte; padding runs to the end of the block.
pub const EI_PAD: usize = EI_ABIVERSION + 1;

/// A raw identification block, as read from the start of the file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ident([u8; EI_NIDENT]);

impl Ident {
    #[inline]
    pub fn new(bytes: [u8; EI_NIDENT]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub fn bytes(&self) -> &[u8; EI_NIDENT] {
        &self.0
    }

    #[inline]
    pub fn magic(&self) -> [u8; 4] {
        [self.0[0], self.0[1], self.0[2], self.0[3]]
    }

    #[inline]
    pub fn class(&self) -> u8 {
        self.0[EI_CLASS]
    }

    #[inline]
    pub fn data(&self) -> u8 {
        self.0[EI_DATA]
    }

    #[inline]
    pub fn version(&self) -> u8 {
        self.0[EI_VERSION]
    }

    #[inline]
    pub fn os_abi(&self) -> u8 {
        self.0[EI_OSABI]
    }

    #[inline]
    pub fn abi_version(&self) -> u8 {
        self.0[EI_ABIVERSION]
    }

    #[inline]
    pub fn padding(&self) -> &[u8] {
        &self.0[EI_PAD..]
    }
}

/// Width class of every address and offset field in the file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElfClass {
    Elf32,
    Elf64,
}

impl ElfClass {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            abi::ELFCLASS32 => Some(Self::Elf32),
            abi::ELFCLASS64 => Some(Self::Elf64),
            _ => None,
        }
    }

    /// Size in bytes of an address for this class.
    #[inline]
    pub fn word_size(self) -> usize {
        match self {
            Self::Elf32 => 4,
            Self::Elf64 => 8,
        }
    }
}

/// Byte order of multi-byte fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataEncoding {
    LittleEndian,
    BigEndian,
}

impl DataEncoding {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            abi::ELFDATA2LSB => Some(Self::LittleEndian),
            abi::ELFDATA2MSB => Some(Self::BigEndian),
            _ => None,
        }
    }
}

/// Operating system / ABI extensions named by `EI_OSABI`.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum OsAbi {
    /// No extensions or unspecified. Also stands in for unrecognised codes.
    #[default]
    None = 0,
    HpUx = 1,
    NetBsd = 2,
    Linux = 3,
    Solaris = 6,
    Aix = 7,
    Irix = 8,
    FreeBsd = 9,
    Tru64 = 10,
    Modesto = 11,
    OpenBsd = 12,
    OpenVms = 13,
    Nsk = 14,
    Aros = 15,
    FenixOs = 16,
    CloudAbi = 17,
    OpenVos = 18,
    ArmAeabi = 64,
    Arm = 97,
    Standalone = 255,
}

impl OsAbi {
    pub fn from_u8(value: u8) -> Option<Self> {
        let abi = match value {
            0 => Self::None,
            1 => Self::HpUx,
            2 => Self::NetBsd,
            3 => Self::Linux,
            6 => Self::Solaris,
            7 => Self::Aix,
            8 => Self::Irix,
            9 => Self::FreeBsd,
            10 => Self::Tru64,
            11 => Self::Modesto,
            12 => Self::OpenBsd,
            13 => Self::OpenVms,
            14 => Self::Nsk,
            15 => Self::Aros,
            16 => Self::FenixOs,
            17 => Self::CloudAbi,
            18 => Self::OpenVos,
            64 => Self::ArmAeabi,
            97 => Self::Arm,
            255 => Self::Standalone,
            _ => return None,
        };
        Some(abi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_fields_come_from_fixed_offsets() {
        let mut raw = [0u8; EI_NIDENT];
        raw[..4].copy_from_slice(&ELF_MAGIC);
        raw[EI_CLASS] = 2;
        raw[EI_DATA] = 1;
        raw[EI_VERSION] = 1;
        raw[EI_OSABI] = 3;
        raw[EI_ABIVERSION] = 7;
        raw[15] = 0xaa;
        let ident = Ident::new(raw);

        assert_eq!(ident.magic(), *b"\x7fELF");
        assert_eq!(ElfClass::from_u8(ident.class()), Some(ElfClass::Elf64));
        assert_eq!(
            DataEncoding::from_u8(ident.data()),
            Some(DataEncoding::LittleEndian)
        );
        assert_eq!(OsAbi::from_u8(ident.os_abi()), Some(OsAbi::Linux));
        assert_eq!(ident.abi_version(), 7);
        assert_eq!(ident.padding().len(), 7);
        assert_eq!(ident.padding()[6], 0xaa);
    }

    #[test]
    fn os_abi_round_trips_known_codes() {
        for code in 0..=u8::MAX {
            if let Some(abi) = OsAbi::from_u8(code) {
                assert_eq!(abi as u8, code);
            }
        }
        assert_eq!(OsAbi::from_u8(4), None);
        assert_eq!(OsAbi::from_u8(200), None);
    }

    #[test]
    fn unknown_class_and_encoding_are_rejected() {
        assert_eq!(ElfClass::from_u8(0), None);
        assert_eq!(ElfClass::from_u8(3), None);
        assert_eq!(DataEncoding::from_u8(0), None);
        assert_eq!(DataEncoding::from_u8(3), None);
    }
}
