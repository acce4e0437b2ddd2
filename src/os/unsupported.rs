use crate::{Result, io_error};
use alloc::format;

/// Placeholder for targets without a file backend. Opening always fails;
/// in-memory input still works.
pub(crate) struct RawFile {
    never: core::convert::Infallible,
}

impl RawFile {
    pub(crate) fn from_path(path: &str) -> Result<Self> {
        Err(io_error(format!(
            "failed to open {path}: file input is not supported on this target"
        )))
    }

    pub(crate) fn file_name(&self) -> &str {
        match self.never {}
    }

    pub(crate) fn len(&self) -> u64 {
        match self.never {}
    }

    pub(crate) fn read(&mut self, _buf: &mut [u8], _offset: u64) -> Result<()> {
        match self.never {}
    }
}
