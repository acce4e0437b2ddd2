//! Operating system abstractions.
//!
//! Only file access is needed: a read-only handle that knows its size and can
//! read at an absolute offset.

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub(crate) use unix::RawFile;
    } else {
        mod unsupported;
        pub(crate) use unsupported::RawFile;
    }
}
