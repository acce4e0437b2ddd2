use super::{ElfReader, IntoElfReader};
use crate::{Result, io_error, os::RawFile};
use alloc::{format, string::String, vec::Vec};

/// Copies `buf.len()` bytes of `bytes` starting at `offset` into `buf`.
fn read_slice(bytes: &[u8], buf: &mut [u8], offset: u64) -> Result<()> {
    let range = usize::try_from(offset)
        .ok()
        .and_then(|start| Some(start..start.checked_add(buf.len())?))
        .filter(|range| range.end <= bytes.len())
        .ok_or_else(|| {
            io_error(format!(
                "read of {} bytes at offset 0x{:x} is out of range",
                buf.len(),
                offset
            ))
        })?;
    buf.copy_from_slice(&bytes[range]);
    Ok(())
}

/// An ELF source backed by an in-memory byte slice.
///
/// Useful for images that are embedded in the binary, received over a
/// network, or built on the fly by tests.
#[derive(Debug, Clone, Copy)]
pub struct ElfBinary<'bytes> {
    name: &'bytes str,
    bytes: &'bytes [u8],
}

impl<'bytes> ElfBinary<'bytes> {
    /// Creates a named in-memory source.
    ///
    /// # Examples
    /// ```rust
    /// use elf_probe::input::{ElfBinary, ElfReader};
    ///
    /// let data = [0u8; 4];
    /// let binary = ElfBinary::new("liba.so", &data);
    /// assert_eq!(binary.file_name(), "liba.so");
    /// assert_eq!(binary.len(), 4);
    /// ```
    pub fn new(name: &'bytes str, bytes: &'bytes [u8]) -> Self {
        Self { name, bytes }
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &'bytes [u8] {
        self.bytes
    }
}

impl ElfReader for ElfBinary<'_> {
    fn file_name(&self) -> &str {
        self.name
    }

    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        read_slice(self.bytes, buf, offset)
    }
}

/// An ELF source backed by a file on the filesystem.
///
/// The file is opened read-only and closed when this value is dropped.
pub struct ElfFile {
    inner: RawFile,
}

impl ElfFile {
    /// Opens the file at `path` and records its size.
    pub fn from_path(path: impl AsRef<str>) -> Result<Self> {
        let path = path.as_ref();
        #[cfg(feature = "log")]
        log::debug!("Opening ELF file: {}", path);

        let inner = RawFile::from_path(path)?;
        Ok(ElfFile { inner })
    }
}

impl core::fmt::Debug for ElfFile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ElfFile")
            .field("name", &self.inner.file_name())
            .field("len", &self.inner.len())
            .finish()
    }
}

impl ElfReader for ElfFile {
    fn file_name(&self) -> &str {
        self.inner.file_name()
    }

    fn len(&self) -> u64 {
        self.inner.len()
    }

    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        self.inner.read(buf, offset)
    }
}

// Lets callers hand a byte slice straight to the parser.
impl ElfReader for &[u8] {
    fn file_name(&self) -> &str {
        "<memory>"
    }

    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        read_slice(self, buf, offset)
    }
}

// File paths
impl<'a> IntoElfReader<'a> for &str {
    type Reader = ElfFile;

    fn into_reader(self) -> Result<Self::Reader> {
        ElfFile::from_path(self)
    }
}

impl<'a> IntoElfReader<'a> for String {
    type Reader = ElfFile;

    fn into_reader(self) -> Result<Self::Reader> {
        ElfFile::from_path(&self)
    }
}

impl<'a> IntoElfReader<'a> for &String {
    type Reader = ElfFile;

    fn into_reader(self) -> Result<Self::Reader> {
        ElfFile::from_path(self)
    }
}

// In-memory images
impl<'a> IntoElfReader<'a> for &'a [u8] {
    type Reader = ElfBinary<'a>;

    fn into_reader(self) -> Result<Self::Reader> {
        Ok(ElfBinary::new("<memory>", self))
    }
}

impl<'a, const N: usize> IntoElfReader<'a> for &'a [u8; N] {
    type Reader = ElfBinary<'a>;

    fn into_reader(self) -> Result<Self::Reader> {
        Ok(ElfBinary::new("<memory>", self.as_slice()))
    }
}

impl<'a> IntoElfReader<'a> for &'a Vec<u8> {
    type Reader = ElfBinary<'a>;

    fn into_reader(self) -> Result<Self::Reader> {
        Ok(ElfBinary::new("<memory>", self.as_slice()))
    }
}

// Already constructed readers pass through.
impl<'a> IntoElfReader<'a> for ElfFile {
    type Reader = ElfFile;

    fn into_reader(self) -> Result<Self::Reader> {
        Ok(self)
    }
}

impl<'a, 'b> IntoElfReader<'a> for ElfBinary<'b>
where
    'b: 'a,
{
    type Reader = ElfBinary<'b>;

    fn into_reader(self) -> Result<Self::Reader> {
        Ok(self)
    }
}
