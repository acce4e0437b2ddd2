use crate::{ElfImage, elf::ElfClass};
use alloc::string::ToString;
use core::fmt;

/// A readelf-like listing of an image's section headers.
///
/// Addresses, offsets and sizes are printed in hexadecimal, padded to the
/// width of the file's class. Flags use the readelf key letters.
///
/// ```rust,no_run
/// let image = elf_probe::ElfImage::from_path("/bin/true").unwrap();
/// println!("{}", image.section_table());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct SectionTable<'a> {
    image: &'a ElfImage,
}

impl<'a> SectionTable<'a> {
    pub fn new(image: &'a ElfImage) -> Self {
        Self { image }
    }
}

impl fmt::Display for SectionTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = match self.image.class() {
            ElfClass::Elf32 => 8,
            ElfClass::Elf64 => 16,
        };
        writeln!(
            f,
            "[Nr] {:<18} {:<14} {:<width$} {:<8} {:<width$} {:<width$} {:<5} {:>4} {:>4} {:>5}",
            "Name", "Type", "Address", "Offset", "Size", "EntSize", "Flags", "Link", "Info", "Align",
        )?;
        for (index, shdr) in self.image.section_headers().iter().enumerate() {
            let name = self.image.section_name(index).unwrap_or("");
            writeln!(
                f,
                "[{index:>2}] {name:<18} {:<14} {:0width$x} {:08x} {:0width$x} {:0width$x} {:<5} {:>4} {:>4} {:>5}",
                shdr.section_type().to_string(),
                shdr.addr(),
                shdr.offset(),
                shdr.size(),
                shdr.entsize(),
                shdr.flags().to_string(),
                shdr.link(),
                shdr.info(),
                shdr.addralign(),
            )?;
        }
        Ok(())
    }
}
