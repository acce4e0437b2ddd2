use crate::{Error, Result};
use alloc::{borrow::Cow, string::String, vec::Vec};

/// An owned string table blob (`.shstrtab`, `.strtab`, `.dynstr`).
///
/// Names are looked up by byte offset and must end with a NUL that lies inside
/// the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElfStringTable {
    data: Vec<u8>,
}

impl ElfStringTable {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the bytes of the name at `offset`, without the terminating NUL.
    ///
    /// An offset at or past the end of the table, or a name that runs off the
    /// end without a terminator, is an [`Error::InvalidNameOffset`].
    pub fn get_bytes(&self, offset: u64) -> Result<&[u8]> {
        let invalid = || Error::InvalidNameOffset {
            offset,
            table_size: self.data.len() as u64,
        };
        let start = usize::try_from(offset)
            .ok()
            .filter(|start| *start < self.data.len())
            .ok_or_else(invalid)?;
        let tail = &self.data[start..];
        let len = tail.iter().position(|&b| b == 0).ok_or_else(invalid)?;
        Ok(&tail[..len])
    }

    /// Like [`get_bytes`](Self::get_bytes), decoding the name as UTF-8 with
    /// replacement characters for invalid sequences.
    pub fn get(&self, offset: u64) -> Result<Cow<'_, str>> {
        self.get_bytes(offset).map(String::from_utf8_lossy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn table() -> ElfStringTable {
        ElfStringTable::new(b"\0.text\0.data\0".to_vec())
    }

    #[test]
    fn resolves_names_by_offset() {
        let strtab = table();
        assert_eq!(strtab.get(0).unwrap(), "");
        assert_eq!(strtab.get(1).unwrap(), ".text");
        assert_eq!(strtab.get(7).unwrap(), ".data");
        // Suffix sharing, as linkers do for `.rela.text` / `.text`.
        assert_eq!(strtab.get(2).unwrap(), "text");
    }

    #[test]
    fn offset_at_table_end_is_rejected() {
        let strtab = table();
        let size = strtab.len() as u64;
        assert_eq!(
            strtab.get(size),
            Err(Error::InvalidNameOffset {
                offset: size,
                table_size: size
            })
        );
        assert!(strtab.get(u64::MAX).is_err());
    }

    #[test]
    fn unterminated_name_is_rejected() {
        let strtab = ElfStringTable::new(b"\0abc".to_vec());
        assert!(strtab.get(1).is_err());
        assert_eq!(strtab.get(0).unwrap(), "");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let strtab = ElfStringTable::new(vec![0xff, b'a', 0]);
        assert_eq!(strtab.get(0).unwrap(), "\u{fffd}a");
    }
}
