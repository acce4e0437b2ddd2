//! Builds small, well-formed ELF images in memory for tests.
//!
//! The writer lays out a file header, optional program headers, caller-supplied
//! sections, optional dynamic and static symbol tables with their string
//! tables, a `.shstrtab` and the section header table. Both classes and both
//! byte orders are supported. Images can be corrupted afterwards through
//! [`ElfOutput::patch`] and friends.

use elf::abi;

/// File class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Class {
    Elf32,
    Elf64,
}

/// Byte order of multi-byte fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// Global settings of a generated image.
#[derive(Clone, Debug)]
pub struct ElfWriterConfig {
    pub class: Class,
    pub endian: Endian,
    pub e_type: u16,
    pub machine: u16,
    pub entry: u64,
    /// Emit a section header table (and `.shstrtab`).
    pub section_table: bool,
    /// Overrides the computed `e_shstrndx`.
    pub shstrndx: Option<u16>,
}

impl Default for ElfWriterConfig {
    fn default() -> Self {
        Self {
            class: Class::Elf64,
            endian: Endian::Little,
            e_type: abi::ET_DYN,
            machine: abi::EM_X86_64,
            entry: 0,
            section_table: true,
            shstrndx: None,
        }
    }
}

impl ElfWriterConfig {
    pub fn with_class(mut self, class: Class) -> Self {
        self.class = class;
        if class == Class::Elf32 {
            self.machine = abi::EM_386;
        }
        self
    }

    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn with_entry(mut self, entry: u64) -> Self {
        self.entry = entry;
        self
    }

    pub fn with_machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    /// Produces an image without section headers.
    pub fn without_section_table(mut self) -> Self {
        self.section_table = false;
        self
    }

    pub fn with_shstrndx(mut self, shstrndx: u16) -> Self {
        self.shstrndx = Some(shstrndx);
        self
    }
}

/// A section to place in the image.
#[derive(Clone, Debug)]
pub struct SectionDesc {
    name: String,
    sh_type: u32,
    flags: u64,
    addr: u64,
    data: Vec<u8>,
    size: Option<u64>,
    offset: Option<u64>,
    link: u32,
    info: u32,
    addralign: u64,
    entsize: u64,
}

impl SectionDesc {
    pub fn new(name: &str, sh_type: u32, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.to_string(),
            sh_type,
            flags: 0,
            addr: 0,
            data: data.into(),
            size: None,
            offset: None,
            link: 0,
            info: 0,
            addralign: 1,
            entsize: 0,
        }
    }

    pub fn progbits(name: &str, data: impl Into<Vec<u8>>) -> Self {
        Self::new(name, abi::SHT_PROGBITS, data)
    }

    /// A section that takes `size` bytes in memory and none in the file.
    pub fn nobits(name: &str, size: u64) -> Self {
        Self::new(name, abi::SHT_NOBITS, Vec::new()).with_size(size)
    }

    /// Places the section at a fixed file offset instead of packing it.
    pub fn at(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Declares `sh_size` independently of the data written.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_flags(mut self, flags: u64) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_addr(mut self, addr: u64) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_link(mut self, link: u32) -> Self {
        self.link = link;
        self
    }

    pub fn with_info(mut self, info: u32) -> Self {
        self.info = info;
        self
    }

    pub fn with_align(mut self, align: u64) -> Self {
        self.addralign = align;
        self
    }

    pub fn with_entsize(mut self, entsize: u64) -> Self {
        self.entsize = entsize;
        self
    }

    fn declared_size(&self) -> u64 {
        self.size.unwrap_or(self.data.len() as u64)
    }

    fn occupies_file(&self) -> bool {
        self.sh_type != abi::SHT_NOBITS
    }
}

/// A symbol to emit in `.dynsym` or `.symtab`.
#[derive(Clone, Debug)]
pub struct SymbolDesc {
    pub name: String,
    pub value: u64,
    pub size: u64,
    pub info: u8,
    pub other: u8,
    pub shndx: u16,
}

impl SymbolDesc {
    fn defined(name: &str, bind: u8, kind: u8, value: u64, size: u64) -> Self {
        Self {
            name: name.to_string(),
            value,
            size,
            info: (bind << 4) | kind,
            other: 0,
            shndx: abi::SHN_ABS,
        }
    }

    pub fn global_func(name: &str, value: u64, size: u64) -> Self {
        Self::defined(name, abi::STB_GLOBAL, abi::STT_FUNC, value, size)
    }

    pub fn global_object(name: &str, value: u64, size: u64) -> Self {
        Self::defined(name, abi::STB_GLOBAL, abi::STT_OBJECT, value, size)
    }

    pub fn local_func(name: &str, value: u64, size: u64) -> Self {
        Self::defined(name, abi::STB_LOCAL, abi::STT_FUNC, value, size)
    }

    pub fn undefined_func(name: &str) -> Self {
        Self {
            shndx: abi::SHN_UNDEF,
            ..Self::defined(name, abi::STB_GLOBAL, abi::STT_FUNC, 0, 0)
        }
    }

    /// Ties the symbol to section `shndx`.
    pub fn in_section(mut self, shndx: u16) -> Self {
        self.shndx = shndx;
        self
    }

    pub fn with_other(mut self, other: u8) -> Self {
        self.other = other;
        self
    }
}

/// A program header to emit.
#[derive(Clone, Debug)]
pub struct SegmentDesc {
    pub p_type: u32,
    pub flags: u32,
    pub offset: u64,
    pub vaddr: u64,
    pub filesz: u64,
    pub memsz: u64,
    pub align: u64,
}

impl SegmentDesc {
    pub fn load(flags: u32, offset: u64, vaddr: u64, size: u64) -> Self {
        Self {
            p_type: abi::PT_LOAD,
            flags,
            offset,
            vaddr,
            filesz: size,
            memsz: size,
            align: 0x1000,
        }
    }

    pub fn new(p_type: u32, flags: u32) -> Self {
        Self {
            p_type,
            flags,
            offset: 0,
            vaddr: 0,
            filesz: 0,
            memsz: 0,
            align: 1,
        }
    }
}

/// A generated image.
#[derive(Clone, Debug)]
pub struct ElfOutput {
    pub data: Vec<u8>,
    /// Size of `.shstrtab`, zero without a section table.
    pub shstrtab_size: u64,
    /// Section names in section-index order, including the null section.
    pub section_names: Vec<String>,
    class: Class,
    endian: Endian,
    shoff: u64,
}

impl ElfOutput {
    /// Overwrites bytes at `offset`.
    pub fn patch(&mut self, offset: usize, bytes: &[u8]) -> &mut Self {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    /// Cuts the image down to `len` bytes.
    pub fn truncate(&mut self, len: usize) -> &mut Self {
        self.data.truncate(len);
        self
    }

    /// Section index of `name`.
    pub fn section_index(&self, name: &str) -> Option<usize> {
        self.section_names.iter().position(|n| n == name)
    }

    /// File offset of the header of section `index`.
    pub fn section_header_offset(&self, index: usize) -> usize {
        self.shoff as usize + index * Layout::new(self.class).shentsize
    }

    /// Rewrites `sh_name` of section `index`.
    pub fn set_section_name_offset(&mut self, index: usize, name_offset: u32) -> &mut Self {
        let at = self.section_header_offset(index);
        let bytes = Bytes::new(self.endian).u32(name_offset).finish();
        self.patch(at, &bytes)
    }

    /// Rewrites `sh_offset` and `sh_size` of section `index`.
    pub fn set_section_range(&mut self, index: usize, offset: u64, size: u64) -> &mut Self {
        let at = self.section_header_offset(index);
        let (offset_at, size_at, bytes) = match self.class {
            Class::Elf32 => (
                at + 16,
                at + 20,
                [
                    Bytes::new(self.endian).u32(offset as u32).finish(),
                    Bytes::new(self.endian).u32(size as u32).finish(),
                ],
            ),
            Class::Elf64 => (
                at + 24,
                at + 32,
                [
                    Bytes::new(self.endian).u64(offset).finish(),
                    Bytes::new(self.endian).u64(size).finish(),
                ],
            ),
        };
        self.patch(offset_at, &bytes[0]);
        self.patch(size_at, &bytes[1])
    }
}

/// Record sizes of a class.
struct Layout {
    is64: bool,
    ehsize: usize,
    phentsize: usize,
    shentsize: usize,
    symsize: usize,
}

impl Layout {
    fn new(class: Class) -> Self {
        match class {
            Class::Elf32 => Self {
                is64: false,
                ehsize: 52,
                phentsize: 32,
                shentsize: 40,
                symsize: 16,
            },
            Class::Elf64 => Self {
                is64: true,
                ehsize: 64,
                phentsize: 56,
                shentsize: 64,
                symsize: 24,
            },
        }
    }
}

/// Endian-aware byte sink.
struct Bytes {
    big: bool,
    buf: Vec<u8>,
}

impl Bytes {
    fn new(endian: Endian) -> Self {
        Self {
            big: endian == Endian::Big,
            buf: Vec::new(),
        }
    }

    fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    fn u8(self, value: u8) -> Self {
        self.raw(&[value])
    }

    fn u16(self, value: u16) -> Self {
        let bytes = if self.big {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.raw(&bytes)
    }

    fn u32(self, value: u32) -> Self {
        let bytes = if self.big {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.raw(&bytes)
    }

    fn u64(self, value: u64) -> Self {
        let bytes = if self.big {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.raw(&bytes)
    }

    /// An address-sized field.
    fn word(self, is64: bool, value: u64) -> Self {
        if is64 {
            self.u64(value)
        } else {
            self.u32(value as u32)
        }
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// A NUL-separated string table under construction.
struct StringTable {
    data: Vec<u8>,
}

impl StringTable {
    fn new() -> Self {
        Self { data: vec![0] }
    }

    fn add(&mut self, name: &str) -> u32 {
        if name.is_empty() {
            return 0;
        }
        let offset = self.data.len() as u32;
        self.data.extend_from_slice(name.as_bytes());
        self.data.push(0);
        offset
    }
}

/// Assembles an image from sections, segments and symbols.
///
/// ```
/// use gen_elf::{ElfWriter, ElfWriterConfig, SectionDesc, SymbolDesc};
///
/// let output = ElfWriter::new(ElfWriterConfig::default())
///     .section(SectionDesc::progbits(".text", vec![0x90; 16]))
///     .dynamic_symbols(&[SymbolDesc::global_func("foo", 0x1000, 16)])
///     .write();
/// assert_eq!(&output.data[..4], b"\x7fELF");
/// ```
#[derive(Clone, Debug, Default)]
pub struct ElfWriter {
    config: ElfWriterConfig,
    sections: Vec<SectionDesc>,
    segments: Vec<SegmentDesc>,
    dynamic: Option<Vec<SymbolDesc>>,
    statics: Option<Vec<SymbolDesc>>,
}

impl ElfWriter {
    pub fn new(config: ElfWriterConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Appends a section. The first one gets index 1.
    pub fn section(mut self, section: SectionDesc) -> Self {
        self.sections.push(section);
        self
    }

    pub fn segment(mut self, segment: SegmentDesc) -> Self {
        self.segments.push(segment);
        self
    }

    /// Emits `.dynsym` and `.dynstr` after the user sections.
    pub fn dynamic_symbols(mut self, symbols: &[SymbolDesc]) -> Self {
        self.dynamic = Some(symbols.to_vec());
        self
    }

    /// Emits `.symtab` and `.strtab` after the dynamic tables.
    pub fn static_symbols(mut self, symbols: &[SymbolDesc]) -> Self {
        self.statics = Some(symbols.to_vec());
        self
    }

    fn symbol_sections(
        &self,
        layout: &Layout,
        symbols: &[SymbolDesc],
        (symtab_name, symtab_type, flags): (&str, u32, u64),
        strtab_name: &str,
        first_index: u32,
    ) -> [SectionDesc; 2] {
        let mut strings = StringTable::new();
        // Index 0 is the reserved null symbol.
        let mut records = vec![0u8; layout.symsize];
        for symbol in symbols {
            let name = strings.add(&symbol.name);
            let bytes = Bytes::new(self.config.endian).u32(name);
            let bytes = if layout.is64 {
                bytes
                    .u8(symbol.info)
                    .u8(symbol.other)
                    .u16(symbol.shndx)
                    .u64(symbol.value)
                    .u64(symbol.size)
            } else {
                bytes
                    .u32(symbol.value as u32)
                    .u32(symbol.size as u32)
                    .u8(symbol.info)
                    .u8(symbol.other)
                    .u16(symbol.shndx)
            };
            records.extend_from_slice(&bytes.finish());
        }
        let align = if layout.is64 { 8 } else { 4 };
        let first_global = symbols
            .iter()
            .position(|symbol| symbol.info >> 4 != abi::STB_LOCAL)
            .map_or(symbols.len() + 1, |index| index + 1);
        [
            SectionDesc::new(symtab_name, symtab_type, records)
                .with_flags(flags)
                .with_link(first_index + 1)
                .with_info(first_global as u32)
                .with_entsize(layout.symsize as u64)
                .with_align(align),
            SectionDesc::new(strtab_name, abi::SHT_STRTAB, strings.data).with_flags(flags),
        ]
    }

    /// Lays out and serialises the image.
    pub fn write(self) -> ElfOutput {
        let layout = Layout::new(self.config.class);
        let alloc = abi::SHF_ALLOC as u64;

        let mut sections = self.sections.clone();
        if let Some(symbols) = &self.dynamic {
            let first = sections.len() as u32 + 1;
            sections.extend(self.symbol_sections(
                &layout,
                symbols,
                (".dynsym", abi::SHT_DYNSYM, alloc),
                ".dynstr",
                first,
            ));
        }
        if let Some(symbols) = &self.statics {
            let first = sections.len() as u32 + 1;
            sections.extend(self.symbol_sections(
                &layout,
                symbols,
                (".symtab", abi::SHT_SYMTAB, 0),
                ".strtab",
                first,
            ));
        }

        let mut section_names = vec![String::new()];
        let mut shstrtab_size = 0;
        let mut shstrndx = 0;
        let mut name_offsets = Vec::new();
        if self.config.section_table {
            let mut names = StringTable::new();
            for section in &sections {
                name_offsets.push(names.add(&section.name));
            }
            name_offsets.push(names.add(".shstrtab"));
            shstrtab_size = names.data.len() as u64;
            shstrndx = sections.len() as u16 + 1;
            sections.push(SectionDesc::new(".shstrtab", abi::SHT_STRTAB, names.data));
            section_names.extend(sections.iter().map(|section| section.name.clone()));
        }

        // Fixed-offset sections first; everything else is packed after them.
        let headers_end = (layout.ehsize + self.segments.len() * layout.phentsize) as u64;
        let fixed_end = sections
            .iter()
            .filter_map(|section| Some(section.offset? + section.data.len() as u64))
            .max()
            .unwrap_or(0);
        let mut cursor = headers_end.max(fixed_end);
        let mut offsets = Vec::with_capacity(sections.len());
        for section in &sections {
            let offset = match section.offset {
                Some(offset) => offset,
                None => {
                    let align = section.addralign.max(1);
                    cursor = cursor.div_ceil(align) * align;
                    let offset = cursor;
                    if section.occupies_file() {
                        cursor += section.data.len() as u64;
                    }
                    offset
                }
            };
            offsets.push(offset);
        }

        let body_end = cursor.max(fixed_end);
        let shoff = if self.config.section_table {
            body_end.div_ceil(8) * 8
        } else {
            0
        };
        let shnum = if self.config.section_table {
            sections.len() + 1
        } else {
            0
        };
        let total = shoff as usize + shnum * layout.shentsize;
        let mut data = vec![0u8; total.max(body_end as usize)];

        for (section, &offset) in sections.iter().zip(&offsets) {
            let start = offset as usize;
            data[start..start + section.data.len()].copy_from_slice(&section.data);
        }

        let header = self.header(&layout, shoff, shnum as u16, shstrndx);
        data[..header.len()].copy_from_slice(&header);

        let mut at = layout.ehsize;
        for segment in &self.segments {
            let bytes = self.program_header(&layout, segment);
            data[at..at + bytes.len()].copy_from_slice(&bytes);
            at += bytes.len();
        }

        if self.config.section_table {
            // Section 0 stays all zeroes.
            let mut at = shoff as usize + layout.shentsize;
            for ((section, &offset), &name) in sections.iter().zip(&offsets).zip(&name_offsets) {
                let bytes = self.section_header(&layout, section, name, offset);
                data[at..at + bytes.len()].copy_from_slice(&bytes);
                at += bytes.len();
            }
        }

        ElfOutput {
            data,
            shstrtab_size,
            section_names,
            class: self.config.class,
            endian: self.config.endian,
            shoff,
        }
    }

    fn header(&self, layout: &Layout, shoff: u64, shnum: u16, shstrndx: u16) -> Vec<u8> {
        let config = &self.config;
        let mut ident = [0u8; abi::EI_NIDENT];
        ident[..4].copy_from_slice(&abi::ELFMAGIC);
        ident[abi::EI_CLASS] = match config.class {
            Class::Elf32 => abi::ELFCLASS32,
            Class::Elf64 => abi::ELFCLASS64,
        };
        ident[abi::EI_DATA] = match config.endian {
            Endian::Little => abi::ELFDATA2LSB,
            Endian::Big => abi::ELFDATA2MSB,
        };
        ident[abi::EI_VERSION] = abi::EV_CURRENT;

        let phoff = if self.segments.is_empty() {
            0
        } else {
            layout.ehsize as u64
        };
        let shstrndx = if config.section_table {
            config.shstrndx.unwrap_or(shstrndx)
        } else {
            0
        };
        Bytes::new(config.endian)
            .raw(&ident)
            .u16(config.e_type)
            .u16(config.machine)
            .u32(u32::from(abi::EV_CURRENT))
            .word(layout.is64, config.entry)
            .word(layout.is64, phoff)
            .word(layout.is64, shoff)
            .u32(0)
            .u16(layout.ehsize as u16)
            .u16(layout.phentsize as u16)
            .u16(self.segments.len() as u16)
            .u16(layout.shentsize as u16)
            .u16(shnum)
            .u16(shstrndx)
            .finish()
    }

    fn program_header(&self, layout: &Layout, segment: &SegmentDesc) -> Vec<u8> {
        let bytes = Bytes::new(self.config.endian).u32(segment.p_type);
        if layout.is64 {
            bytes
                .u32(segment.flags)
                .u64(segment.offset)
                .u64(segment.vaddr)
                .u64(segment.vaddr)
                .u64(segment.filesz)
                .u64(segment.memsz)
                .u64(segment.align)
                .finish()
        } else {
            bytes
                .u32(segment.offset as u32)
                .u32(segment.vaddr as u32)
                .u32(segment.vaddr as u32)
                .u32(segment.filesz as u32)
                .u32(segment.memsz as u32)
                .u32(segment.flags)
                .u32(segment.align as u32)
                .finish()
        }
    }

    fn section_header(
        &self,
        layout: &Layout,
        section: &SectionDesc,
        name: u32,
        offset: u64,
    ) -> Vec<u8> {
        let is64 = layout.is64;
        Bytes::new(self.config.endian)
            .u32(name)
            .u32(section.sh_type)
            .word(is64, section.flags)
            .word(is64, section.addr)
            .word(is64, offset)
            .word(is64, section.declared_size())
            .u32(section.link)
            .u32(section.info)
            .word(is64, section.addralign)
            .word(is64, section.entsize)
            .finish()
    }
}
