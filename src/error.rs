//! Error types produced while reading and validating ELF input.

use alloc::{borrow::Cow, string::String};
use core::fmt::{self, Display, Write};

/// A fatal structural defect in the input.
///
/// Every variant aborts the parse. Advisory findings never become an `Error`;
/// they are reported through [`Diagnostics`](crate::Diagnostics) instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The input could not be opened or read.
    Io { msg: Cow<'static, str> },

    /// A fixed-size read ran past the end of the input.
    Truncated {
        what: &'static str,
        offset: u64,
        len: u64,
    },

    /// The first four bytes are not `\x7fELF`.
    InvalidMagic { expected: [u8; 4], found: [u8; 4] },

    /// `EI_CLASS` is neither `ELFCLASS32` nor `ELFCLASS64`.
    InvalidClass { class: u8 },

    /// `EI_DATA` is neither `ELFDATA2LSB` nor `ELFDATA2MSB`.
    InvalidDataEncoding { encoding: u8 },

    /// `EI_VERSION` disagrees with the header's `e_version`.
    VersionMismatch { ident: u8, header: u32 },

    /// `e_shstrndx` does not name an entry of the section header table.
    InvalidStringTableIndex { index: usize, count: usize },

    /// A string table section is empty or lies outside the input.
    InvalidStringTable {
        section: Cow<'static, str>,
        msg: Cow<'static, str>,
    },

    /// An offset or an offset/size pair points outside the input.
    OutOfBounds { msg: Cow<'static, str> },

    /// Two sections claim overlapping byte ranges of the file.
    SectionOverlap {
        index: usize,
        offset: u64,
        previous: usize,
        previous_end: u64,
    },

    /// A name offset does not lead to a NUL-terminated string inside its table.
    InvalidNameOffset { offset: u64, table_size: u64 },

    /// A symbol table section has an unusable size or position.
    InvalidSymbolTable {
        section: &'static str,
        msg: Cow<'static, str>,
    },

    /// A section required by the parser configuration is absent.
    MissingSection { name: &'static str },

    /// A record could not be decoded.
    Parse { msg: Cow<'static, str> },
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io { msg } => write!(f, "I/O error: {msg}"),
            Error::Truncated { what, offset, len } => write!(
                f,
                "truncated {what}: {len} bytes at offset 0x{offset:x} exceed the input"
            ),
            Error::InvalidMagic { expected, found } => write!(
                f,
                "invalid ELF magic, expected: '{}', got: '{}'",
                escape_bytes(expected),
                escape_bytes(found)
            ),
            Error::InvalidClass { class } => write!(f, "invalid ELF class: {class}"),
            Error::InvalidDataEncoding { encoding } => {
                write!(f, "invalid ELF data encoding: {encoding}")
            }
            Error::VersionMismatch { ident, header } => write!(
                f,
                "ELF file version mismatch: identification says {ident}, header says {header}"
            ),
            Error::InvalidStringTableIndex { index, count } => write!(
                f,
                "invalid section header string table index {index} ({count} section headers)"
            ),
            Error::InvalidStringTable { section, msg } => {
                write!(f, "invalid string table {section}: {msg}")
            }
            Error::OutOfBounds { msg } => write!(f, "out of bounds: {msg}"),
            Error::SectionOverlap {
                index,
                offset,
                previous,
                previous_end,
            } => write!(
                f,
                "section {index} at offset 0x{offset:x} overlaps section {previous} ending at 0x{previous_end:x}"
            ),
            Error::InvalidNameOffset { offset, table_size } => write!(
                f,
                "invalid name offset 0x{offset:x} into a string table of 0x{table_size:x} bytes"
            ),
            Error::InvalidSymbolTable { section, msg } => {
                write!(f, "invalid symbol table {section}: {msg}")
            }
            Error::MissingSection { name } => write!(f, "missing required section {name}"),
            Error::Parse { msg } => write!(f, "parse error: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<elf::ParseError> for Error {
    #[cold]
    fn from(value: elf::ParseError) -> Self {
        Error::Parse {
            msg: alloc::format!("{value}").into(),
        }
    }
}

/// Renders bytes for humans: printable ASCII as itself, everything else as `\xHH`.
///
/// ```
/// assert_eq!(elf_probe::escape_bytes(&[0x7f, b'E', b'L', b'F']), "\\x7FELF");
/// ```
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 4);
    for &byte in bytes {
        if (0x20..=0x7e).contains(&byte) {
            out.push(byte as char);
        } else {
            // Writing into a String cannot fail.
            let _ = write!(out, "\\x{byte:02X}");
        }
    }
    out
}

#[cold]
#[inline(never)]
pub(crate) fn io_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Io { msg: msg.into() }
}

#[cold]
#[inline(never)]
pub(crate) fn truncated_error(what: &'static str, offset: u64, len: u64) -> Error {
    Error::Truncated { what, offset, len }
}

#[cold]
#[inline(never)]
pub(crate) fn bounds_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::OutOfBounds { msg: msg.into() }
}

#[cold]
#[inline(never)]
pub(crate) fn strtab_error(
    section: impl Into<Cow<'static, str>>,
    msg: impl Into<Cow<'static, str>>,
) -> Error {
    Error::InvalidStringTable {
        section: section.into(),
        msg: msg.into(),
    }
}

#[cold]
#[inline(never)]
pub(crate) fn symtab_error(section: &'static str, msg: impl Into<Cow<'static, str>>) -> Error {
    Error::InvalidSymbolTable {
        section,
        msg: msg.into(),
    }
}

#[cold]
#[inline(never)]
pub(crate) fn parse_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Parse { msg: msg.into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn escapes_non_printable_bytes() {
        assert_eq!(escape_bytes(b"\x7fELF"), "\\x7FELF");
        assert_eq!(escape_bytes(&[0x00, 0xff, b' ', b'~']), "\\x00\\xFF ~");
        assert_eq!(escape_bytes(&[]), "");
    }

    #[test]
    fn magic_error_mentions_both_sequences() {
        let err = Error::InvalidMagic {
            expected: *b"\x7fELF",
            found: *b"MZ\x90\x00",
        };
        let msg = err.to_string();
        assert!(msg.contains("'\\x7FELF'"), "{msg}");
        assert!(msg.contains("'MZ\\x90\\x00'"), "{msg}");
    }
}
