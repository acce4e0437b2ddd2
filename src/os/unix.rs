use crate::{Result, io_error};
use alloc::{
    ffi::CString,
    format,
    string::{String, ToString},
};
use libc::{O_CLOEXEC, O_RDONLY, SEEK_SET};

/// A read-only file descriptor, closed on drop.
pub(crate) struct RawFile {
    name: String,
    fd: i32,
    len: u64,
}

impl Drop for RawFile {
    fn drop(&mut self) {
        unsafe { libc::close(self.fd) };
    }
}

impl RawFile {
    pub(crate) fn from_path(path: &str) -> Result<Self> {
        let name = CString::new(path)
            .map_err(|_| io_error(format!("failed to open {path}: path contains a NUL byte")))?;
        let fd = unsafe { libc::open(name.as_ptr(), O_RDONLY | O_CLOEXEC) };
        if fd == -1 {
            return Err(io_error(format!("failed to open {path}")));
        }
        // From here on the descriptor is closed by Drop on every path.
        let mut file = Self {
            name: path.to_string(),
            fd,
            len: 0,
        };
        file.len = file_size(fd).map_err(|msg| io_error(format!("failed to open {path}: {msg}")))?;
        Ok(file)
    }

    #[inline]
    pub(crate) fn file_name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    pub(crate) fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        lseek(self.fd, offset)?;
        read_exact(self.fd, buf)
    }
}

fn file_size(fd: i32) -> core::result::Result<u64, &'static str> {
    let mut stat = unsafe { core::mem::zeroed::<libc::stat>() };
    if unsafe { libc::fstat(fd, &mut stat) } != 0 {
        return Err("fstat failed");
    }
    if (stat.st_mode & libc::S_IFMT) != libc::S_IFREG {
        return Err("not a regular file");
    }
    u64::try_from(stat.st_size).map_err(|_| "negative file size")
}

fn lseek(fd: i32, offset: u64) -> Result<()> {
    let target = libc::off_t::try_from(offset)
        .map_err(|_| io_error(format!("offset 0x{offset:x} is not seekable")))?;
    let off = unsafe { libc::lseek(fd, target, SEEK_SET) };
    if off == -1 || off != target {
        return Err(io_error("lseek failed"));
    }
    Ok(())
}

fn read_exact(fd: i32, mut bytes: &mut [u8]) -> Result<()> {
    while !bytes.is_empty() {
        let ptr = bytes.as_mut_ptr() as *mut libc::c_void;
        let result = unsafe { libc::read(fd, ptr, bytes.len()) };

        if result < 0 {
            return Err(io_error("read error"));
        } else if result == 0 {
            // Unexpected end of file.
            return Err(io_error("failed to fill buffer"));
        }
        bytes = &mut bytes[result as usize..];
    }
    Ok(())
}
