//! ELF input abstraction and data sources.
//!
//! The parser reads through the [`ElfReader`] trait so it behaves the same
//! whether the bytes live in a file or in a buffer already in memory.

pub use backend::{ElfBinary, ElfFile};
pub use traits::{ElfReader, IntoElfReader};

mod backend;
mod traits;
