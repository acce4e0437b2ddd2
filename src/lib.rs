//! # elf_probe
//!
//! **elf_probe** is a validating reader for ELF (Executable and Linkable Format)
//! files of both the 32-bit and 64-bit classes. It decodes the identification
//! block, the file header, the program header table, the section header table,
//! the section-name string table and the static and dynamic symbol tables.
//!
//! ELF input is untrusted: every offset, count and size read from the file is
//! checked against the real length of the input before it is used. Parsing is
//! all-or-nothing. A parse either yields a fully validated [`ElfImage`] or an
//! [`Error`] describing the first structural defect found.
//!
//! ## Core Features
//!
//! * **Both classes**: ELF32 and ELF64 layouts behind width-tagged enums.
//! * **Both byte orders**: fields are decoded according to the `EI_DATA` byte.
//! * **Injected diagnostics**: advisory findings (unknown OS/ABI, non-zero
//!   padding, aliased sections, stripped binaries) flow into a [`Diagnostics`]
//!   sink chosen by the caller instead of a global logger.
//! * **`no_std` friendly**: only `alloc` is required; file input uses `libc`
//!   on unix.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use elf_probe::{ElfParser, Result};
//!
//! fn main() -> Result<()> {
//!     let image = ElfParser::new().parse("/bin/true")?;
//!
//!     println!("class: {:?}, entry: 0x{:x}", image.class(), image.header().e_entry());
//!     for symbol in image.dynamic_symbols().iter() {
//!         println!("{:>4} {}", symbol.index(), symbol.name());
//!     }
//!     Ok(())
//! }
//! ```
#![no_std]
#![warn(
    clippy::unnecessary_wraps,
    clippy::unnecessary_lazy_evaluations,
    clippy::collapsible_if,
    clippy::cast_lossless,
    clippy::explicit_iter_loop,
    clippy::manual_assert,
    clippy::needless_question_mark,
    clippy::needless_return,
    clippy::needless_update,
    clippy::redundant_clone,
    clippy::redundant_else,
    clippy::redundant_static_lifetimes
)]
#![allow(clippy::len_without_is_empty, clippy::unnecessary_cast)]
extern crate alloc;

pub mod diagnostics;
mod display;
pub mod elf;
mod error;
pub mod image;
pub mod input;
mod os;
mod parser;

pub(crate) use error::*;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use display::SectionTable;
pub use error::{Error, escape_bytes};
pub use image::ElfImage;
pub use parser::ElfParser;

/// A type alias for `Result`s returned by `elf_probe` functions.
///
/// This is a convenience alias that eliminates the need to repeatedly specify
/// the `Error` type in function signatures.
pub type Result<T> = core::result::Result<T, Error>;
