use crate::Result;

/// A random-access source of ELF bytes.
///
/// Readers know their total length up front so every offset taken from the
/// file can be checked before any byte is fetched.
pub trait ElfReader {
    /// Returns a name for the input, used in diagnostics.
    fn file_name(&self) -> &str;

    /// Returns the total number of bytes available.
    fn len(&self) -> u64;

    /// Fills `buf` with the bytes starting at `offset`.
    ///
    /// Fails if the requested range is not entirely inside the input.
    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<()>;
}

impl<R: ElfReader + ?Sized> ElfReader for &mut R {
    fn file_name(&self) -> &str {
        (**self).file_name()
    }

    fn len(&self) -> u64 {
        (**self).len()
    }

    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        (**self).read(buf, offset)
    }
}

/// Conversion of paths, buffers and readers into an [`ElfReader`].
pub trait IntoElfReader<'a> {
    type Reader: ElfReader + 'a;

    fn into_reader(self) -> Result<Self::Reader>;
}
