//! The read-then-validate pipeline behind [`ElfParser::parse`](crate::ElfParser::parse).
//!
//! Every offset, count and size taken from the file is checked against the
//! input length before anything is allocated or read. The first defect aborts
//! the parse; advisory findings go to the diagnostics sink and parsing
//! continues.

use super::ElfImage;
use crate::{
    Diagnostic, Diagnostics, Error, Result, Severity, bounds_error, escape_bytes,
    elf::{
        DataEncoding, ELF_MAGIC, EI_NIDENT, Elf32Ehdr, Elf32Phdr, Elf32Shdr, Elf32Sym, Elf64Ehdr,
        Elf64Phdr, Elf64Shdr, Elf64Sym, ElfClass, ElfHeader, ElfStringTable, Ident, OsAbi,
        ProgramHeader, Record, SectionHeader, Symbol, SymbolEntry, SymbolTable,
    },
    input::ElfReader,
    strtab_error, symtab_error, truncated_error,
};
use alloc::{
    borrow::Cow,
    collections::BTreeMap,
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};
use core::{fmt, panic::Location};
use elf::endian::AnyEndian;
use hashbrown::HashMap;

const SHSTRTAB: &str = ".shstrtab";
const SYMTAB: &str = ".symtab";
const STRTAB: &str = ".strtab";
const DYNSYM: &str = ".dynsym";
const DYNSTR: &str = ".dynstr";

/// One parse in progress. Consumed by [`build`](Self::build).
pub(crate) struct ImageBuilder<'d, R: ElfReader, D: Diagnostics + ?Sized> {
    reader: R,
    diagnostics: &'d mut D,
    file_size: u64,
    endian: AnyEndian,
    class: ElfClass,
    require_dynamic_symbols: bool,
}

/// Section headers together with their resolved names.
struct Sections {
    headers: Vec<SectionHeader>,
    names: BTreeMap<usize, String>,
    index: HashMap<String, usize>,
}

impl Sections {
    fn find(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

impl<'d, R: ElfReader, D: Diagnostics + ?Sized> ImageBuilder<'d, R, D> {
    pub(crate) fn new(reader: R, diagnostics: &'d mut D, require_dynamic_symbols: bool) -> Self {
        let file_size = reader.len();
        Self {
            reader,
            diagnostics,
            file_size,
            endian: AnyEndian::Little,
            class: ElfClass::Elf64,
            require_dynamic_symbols,
        }
    }

    #[track_caller]
    fn report(&mut self, severity: Severity, message: fmt::Arguments<'_>) {
        self.diagnostics
            .record(&Diagnostic::new(severity, message, Location::caller()));
    }

    #[track_caller]
    fn debug(&mut self, message: fmt::Arguments<'_>) {
        self.report(Severity::Debug, message);
    }

    #[track_caller]
    fn info(&mut self, message: fmt::Arguments<'_>) {
        self.report(Severity::Info, message);
    }

    #[track_caller]
    fn warn(&mut self, message: fmt::Arguments<'_>) {
        self.report(Severity::Warning, message);
    }

    /// Reports a failed stage at error severity and hands the result back.
    #[track_caller]
    fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            let name = self.reader.file_name().to_string();
            self.report(Severity::Error, format_args!("{name}: {err}"));
        }
        result
    }

    /// Runs the whole pipeline.
    pub(crate) fn build(mut self) -> Result<ElfImage> {
        let name = self.reader.file_name().to_string();
        let file_size = self.file_size;
        self.debug(format_args!("parsing {name} ({file_size} bytes)"));

        let ident = self.read_ident();
        let ident = self.check(ident)?;
        let header = self.read_header(&ident);
        let header = self.check(header)?;
        let data_encoding = self.check_ident(&ident, &header);
        let data_encoding = self.check(data_encoding)?;
        let os_abi = self.check_ident_advisories(&ident);

        let phdrs = self.read_program_headers(&header);
        let phdrs = self.check(phdrs)?;
        let shdrs = self.read_section_headers(&header);
        let shdrs = self.check(shdrs)?;

        let (sections, dynsym, symtab) = if shdrs.is_empty() {
            self.debug(format_args!(
                "no section header table, skipping section names and symbol tables"
            ));
            let sections = Sections {
                headers: shdrs,
                names: BTreeMap::new(),
                index: HashMap::new(),
            };
            (sections, SymbolTable::default(), SymbolTable::default())
        } else {
            let sections = self.name_sections(&header, shdrs);
            let sections = self.check(sections)?;
            let dynsym = self.read_dynamic_symbols(&sections);
            let dynsym = self.check(dynsym)?;
            let symtab = self.read_static_symbols(&sections);
            let symtab = self.check(symtab)?;
            (sections, dynsym, symtab)
        };

        self.debug(format_args!(
            "parsed {name}: {} program headers, {} sections, {} symbols, {} dynamic symbols",
            phdrs.len(),
            sections.headers.len(),
            symtab.len(),
            dynsym.len()
        ));

        Ok(ElfImage {
            name,
            file_size,
            ident,
            data_encoding,
            os_abi,
            header,
            phdrs,
            shdrs: sections.headers,
            section_names: sections.names,
            section_index: sections.index,
            symtab,
            dynsym,
        })
    }

    /// Fills `buf` from `offset`, refusing ranges that leave the input.
    fn read_exact_at(&mut self, what: &'static str, offset: u64, buf: &mut [u8]) -> Result<()> {
        let len = buf.len() as u64;
        match offset.checked_add(len) {
            Some(end) if end <= self.file_size => self.reader.read(buf, offset),
            _ => Err(truncated_error(what, offset, len)),
        }
    }

    fn read_bytes(&mut self, what: &'static str, offset: u64, len: u64) -> Result<Vec<u8>> {
        // Checked before allocating so a forged size cannot exhaust memory.
        let fits = offset
            .checked_add(len)
            .is_some_and(|end| end <= self.file_size);
        let size = usize::try_from(len).ok().filter(|_| fits);
        let Some(size) = size else {
            return Err(truncated_error(what, offset, len));
        };
        let mut buf = vec![0u8; size];
        self.read_exact_at(what, offset, &mut buf)?;
        Ok(buf)
    }

    fn read_record<T: Record>(&mut self, what: &'static str, offset: u64) -> Result<T> {
        let bytes = self.read_bytes(what, offset, T::SIZE as u64)?;
        T::parse(&bytes, self.endian)
    }

    /// Reads `count` consecutive records. The stride is always the record
    /// size of the class; a different `entsize` in the file is only reported.
    fn read_table<T: Record>(
        &mut self,
        what: &'static str,
        offset: u64,
        count: usize,
        entsize: u64,
    ) -> Result<Vec<T>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        if entsize != T::SIZE as u64 {
            self.warn(format_args!(
                "{what} entry size is {entsize}, expected {}; using {}",
                T::SIZE,
                T::SIZE
            ));
        }
        let len = (T::SIZE as u64)
            .checked_mul(count as u64)
            .ok_or_else(|| truncated_error(what, offset, u64::MAX))?;
        let bytes = self.read_bytes(what, offset, len)?;
        let endian = self.endian;
        bytes
            .chunks_exact(T::SIZE)
            .map(|chunk| T::parse(chunk, endian))
            .collect()
    }

    fn read_ident(&mut self) -> Result<Ident> {
        let mut raw = [0u8; EI_NIDENT];
        self.read_exact_at("identification", 0, &mut raw)?;
        let ident = Ident::new(raw);

        let found = ident.magic();
        if found != ELF_MAGIC {
            return Err(Error::InvalidMagic {
                expected: ELF_MAGIC,
                found,
            });
        }
        self.class = ElfClass::from_u8(ident.class()).ok_or(Error::InvalidClass {
            class: ident.class(),
        })?;
        // An invalid encoding is rejected once the header is in; until then
        // little-endian is as good a guess as any.
        self.endian = match DataEncoding::from_u8(ident.data()) {
            Some(DataEncoding::BigEndian) => AnyEndian::Big,
            _ => AnyEndian::Little,
        };
        Ok(ident)
    }

    fn read_header(&mut self, ident: &Ident) -> Result<ElfHeader> {
        let class = self.class;
        let header = match class {
            ElfClass::Elf32 => ElfHeader::from(self.read_record::<Elf32Ehdr>("header", 0)?),
            ElfClass::Elf64 => ElfHeader::from(self.read_record::<Elf64Ehdr>("header", 0)?),
        };
        self.debug(format_args!(
            "{class:?} header: type {}, machine {}, version {}, ident version {}",
            header.e_type(),
            header.e_machine(),
            header.e_version(),
            ident.version()
        ));
        Ok(header)
    }

    /// Fatal identification checks that need the header.
    fn check_ident(&self, ident: &Ident, header: &ElfHeader) -> Result<DataEncoding> {
        let data_encoding =
            DataEncoding::from_u8(ident.data()).ok_or(Error::InvalidDataEncoding {
                encoding: ident.data(),
            })?;
        if u32::from(ident.version()) != header.e_version() {
            return Err(Error::VersionMismatch {
                ident: ident.version(),
                header: header.e_version(),
            });
        }
        Ok(data_encoding)
    }

    fn check_ident_advisories(&mut self, ident: &Ident) -> OsAbi {
        let os_abi = match OsAbi::from_u8(ident.os_abi()) {
            Some(os_abi) => os_abi,
            None => {
                self.warn(format_args!(
                    "unknown OS/ABI 0x{:02x}, treating it as NONE",
                    ident.os_abi()
                ));
                OsAbi::None
            }
        };
        // The ABI version is interpreted per OS/ABI; nothing to check generically.
        self.debug(format_args!("ABI version {}", ident.abi_version()));
        if ident.padding().iter().any(|&byte| byte != 0) {
            self.warn(format_args!(
                "non-zero identification padding: '{}'",
                escape_bytes(ident.padding())
            ));
        }
        // No reserved identification fields are defined beyond the padding.
        os_abi
    }

    fn read_program_headers(&mut self, header: &ElfHeader) -> Result<Vec<ProgramHeader>> {
        let (offset, count, entsize) = (
            header.e_phoff(),
            header.e_phnum(),
            u64::from(header.e_phentsize()),
        );
        let phdrs = match self.class {
            ElfClass::Elf32 => self
                .read_table::<Elf32Phdr>("program header", offset, count, entsize)?
                .into_iter()
                .map(ProgramHeader::from)
                .collect(),
            ElfClass::Elf64 => self
                .read_table::<Elf64Phdr>("program header", offset, count, entsize)?
                .into_iter()
                .map(ProgramHeader::from)
                .collect(),
        };
        Ok(phdrs)
    }

    fn read_section_headers(&mut self, header: &ElfHeader) -> Result<Vec<SectionHeader>> {
        let (offset, count, entsize) = (
            header.e_shoff(),
            header.e_shnum(),
            u64::from(header.e_shentsize()),
        );
        let shdrs = match self.class {
            ElfClass::Elf32 => self
                .read_table::<Elf32Shdr>("section header", offset, count, entsize)?
                .into_iter()
                .map(SectionHeader::from)
                .collect(),
            ElfClass::Elf64 => self
                .read_table::<Elf64Shdr>("section header", offset, count, entsize)?
                .into_iter()
                .map(SectionHeader::from)
                .collect(),
        };
        Ok(shdrs)
    }

    /// Reads the string table held by `shdr`.
    fn read_string_table(
        &mut self,
        section: impl Into<Cow<'static, str>>,
        shdr: &SectionHeader,
    ) -> Result<ElfStringTable> {
        let section = section.into();
        let (offset, size) = (shdr.offset(), shdr.size());
        if size == 0 {
            return Err(strtab_error(section, "size is zero"));
        }
        if offset == 0 {
            return Err(strtab_error(section, "offset is zero"));
        }
        if !offset
            .checked_add(size)
            .is_some_and(|end| end <= self.file_size)
        {
            return Err(strtab_error(
                section,
                format!(
                    "0x{size:x} bytes at offset 0x{offset:x} exceed the file size 0x{:x}",
                    self.file_size
                ),
            ));
        }
        let data = self.read_bytes("string table", offset, size)?;
        Ok(ElfStringTable::new(data))
    }

    /// Reads the section-name string table, validates the layout of every
    /// section and resolves its name.
    fn name_sections(&mut self, header: &ElfHeader, headers: Vec<SectionHeader>) -> Result<Sections> {
        let shstrndx = header.e_shstrndx();
        let Some(shstrtab_hdr) = headers.get(shstrndx).copied() else {
            return Err(Error::InvalidStringTableIndex {
                index: shstrndx,
                count: headers.len(),
            });
        };
        let shstrtab = self.read_string_table(SHSTRTAB, &shstrtab_hdr)?;

        // Stable, so sections sharing an offset keep their table order.
        let mut by_offset: Vec<usize> = (0..headers.len()).collect();
        by_offset.sort_by_key(|&index| headers[index].offset());

        let mut names = BTreeMap::new();
        // The last section holding file bytes.
        let mut preceding: Option<usize> = None;
        for index in by_offset {
            let shdr = &headers[index];
            let offset = shdr.offset();
            if offset > self.file_size || shdr.file_end() > self.file_size {
                return Err(bounds_error(format!(
                    "section {index}: 0x{:x} bytes at offset 0x{offset:x} exceed the file size 0x{:x}",
                    shdr.file_size(),
                    self.file_size
                )));
            }

            // Sections without file bytes cannot collide with anything.
            if shdr.file_size() != 0 {
                if let Some(previous) = preceding {
                    let prev = &headers[previous];
                    if offset == prev.offset() {
                        self.warn(format_args!(
                            "sections {previous} and {index} share file offset 0x{offset:x}"
                        ));
                    } else if offset < prev.file_end() {
                        return Err(Error::SectionOverlap {
                            index,
                            offset,
                            previous,
                            previous_end: prev.file_end(),
                        });
                    }
                }
                preceding = Some(index);
            }

            let name = shstrtab.get(u64::from(shdr.name_offset()))?.into_owned();
            names.insert(index, name);
        }

        let mut index = HashMap::with_capacity(names.len());
        for (&section, name) in &names {
            index.entry(name.clone()).or_insert(section);
        }
        Ok(Sections {
            headers,
            names,
            index,
        })
    }

    /// Decodes the symbols of `symtab`, naming them from `strtab`.
    fn read_symbols(
        &mut self,
        sections: &Sections,
        (symtab_name, symtab): (&'static str, usize),
        (strtab_name, strtab): (&'static str, usize),
    ) -> Result<SymbolTable> {
        let shdr = sections.headers[symtab];
        let record_size = match self.class {
            ElfClass::Elf32 => Elf32Sym::SIZE,
            ElfClass::Elf64 => Elf64Sym::SIZE,
        } as u64;
        let (offset, size) = (shdr.offset(), shdr.size());
        if size == 0 {
            return Err(symtab_error(symtab_name, "size is zero"));
        }
        if !offset
            .checked_add(size)
            .is_some_and(|end| end <= self.file_size)
        {
            return Err(symtab_error(
                symtab_name,
                format!(
                    "0x{size:x} bytes at offset 0x{offset:x} exceed the file size 0x{:x}",
                    self.file_size
                ),
            ));
        }
        if size % record_size != 0 {
            return Err(symtab_error(
                symtab_name,
                format!("size 0x{size:x} is not a multiple of the {record_size}-byte entry"),
            ));
        }
        let strings = self.read_string_table(strtab_name, &sections.headers[strtab])?;

        let count = usize::try_from(size / record_size)
            .map_err(|_| symtab_error(symtab_name, "too many entries"))?;
        let entsize = shdr.entsize();
        let entries: Vec<SymbolEntry> = match self.class {
            ElfClass::Elf32 => self
                .read_table::<Elf32Sym>(symtab_name, offset, count, entsize)?
                .into_iter()
                .map(SymbolEntry::from)
                .collect(),
            ElfClass::Elf64 => self
                .read_table::<Elf64Sym>(symtab_name, offset, count, entsize)?
                .into_iter()
                .map(SymbolEntry::from)
                .collect(),
        };

        let symbols = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let name = strings.get(u64::from(entry.name_offset()))?.into_owned();
                Ok(Symbol::new(index, name, entry))
            })
            .collect::<Result<Vec<_>>>()?;
        self.debug(format_args!("{symtab_name}: {} symbols", symbols.len()));
        Ok(SymbolTable::new(symbols))
    }

    fn read_dynamic_symbols(&mut self, sections: &Sections) -> Result<SymbolTable> {
        match (sections.find(DYNSYM), sections.find(DYNSTR)) {
            (Some(dynsym), Some(dynstr)) => {
                self.read_symbols(sections, (DYNSYM, dynsym), (DYNSTR, dynstr))
            }
            (dynsym, _) if self.require_dynamic_symbols => Err(Error::MissingSection {
                name: if dynsym.is_none() { DYNSYM } else { DYNSTR },
            }),
            (None, None) => {
                self.info(format_args!("no dynamic symbol table"));
                Ok(SymbolTable::default())
            }
            (dynsym, _) => {
                let (present, missing) = if dynsym.is_some() {
                    (DYNSYM, DYNSTR)
                } else {
                    (DYNSTR, DYNSYM)
                };
                self.warn(format_args!(
                    "{present} present without {missing}, skipping dynamic symbols"
                ));
                Ok(SymbolTable::default())
            }
        }
    }

    fn read_static_symbols(&mut self, sections: &Sections) -> Result<SymbolTable> {
        match (sections.find(SYMTAB), sections.find(STRTAB)) {
            (Some(symtab), Some(strtab)) => {
                self.read_symbols(sections, (SYMTAB, symtab), (STRTAB, strtab))
            }
            (None, None) => {
                self.info(format_args!(
                    "no {SYMTAB} or {STRTAB}, the binary is likely stripped"
                ));
                Ok(SymbolTable::default())
            }
            (symtab, _) => {
                let (present, missing) = if symtab.is_some() {
                    (SYMTAB, STRTAB)
                } else {
                    (STRTAB, SYMTAB)
                };
                self.warn(format_args!(
                    "{present} present without {missing}, skipping static symbols"
                ));
                Ok(SymbolTable::default())
            }
        }
    }
}
