use elf_probe::{
    ElfImage, ElfParser, Error, Severity,
    diagnostics::RecordedDiagnostics,
    elf::{DataEncoding, ElfClass, OsAbi, SectionType, SegmentType},
};
use gen_elf::{
    Class, ElfOutput, ElfWriter, ElfWriterConfig, Endian, SectionDesc, SegmentDesc, SymbolDesc,
};

fn parser() -> ElfParser<RecordedDiagnostics> {
    ElfParser::new().with_diagnostics(RecordedDiagnostics::new())
}

fn relaxed() -> ElfParser<RecordedDiagnostics> {
    parser().require_dynamic_symbols(false)
}

/// A small shared object with code, data and both symbol tables.
fn shared_object(config: ElfWriterConfig) -> ElfOutput {
    ElfWriter::new(config)
        .segment(SegmentDesc::load(
            (elf::abi::PF_R | elf::abi::PF_X) as u32,
            0,
            0,
            0x200,
        ))
        .section(
            SectionDesc::progbits(".text", vec![0x90; 0x20])
                .with_flags((elf::abi::SHF_ALLOC | elf::abi::SHF_EXECINSTR) as u64)
                .with_addr(0x1000)
                .with_align(16),
        )
        .section(SectionDesc::progbits(".data", vec![1, 2, 3, 4]).with_align(4))
        .section(SectionDesc::nobits(".bss", 0x100))
        .dynamic_symbols(&[
            SymbolDesc::global_func("foo", 0x1000, 0x10).in_section(1),
            SymbolDesc::undefined_func("puts"),
        ])
        .static_symbols(&[
            SymbolDesc::local_func("helper", 0x1010, 0x10).in_section(1),
            SymbolDesc::global_func("foo", 0x1000, 0x10).in_section(1),
        ])
        .write()
}

fn minimal(class: Class) -> ElfOutput {
    ElfWriter::new(
        ElfWriterConfig::default()
            .with_class(class)
            .without_section_table(),
    )
    .write()
}

#[test]
fn minimal_images_parse_with_empty_tables() {
    for class in [Class::Elf32, Class::Elf64] {
        let output = minimal(class);
        let image = parser().parse(&output.data).unwrap();
        assert!(image.program_headers().is_empty());
        assert!(image.section_headers().is_empty());
        assert!(image.section_names().is_empty());
        assert!(image.symbols().is_empty());
        assert!(image.dynamic_symbols().is_empty());
        assert_eq!(image.file_size(), output.data.len() as u64);
        let expected = match class {
            Class::Elf32 => ElfClass::Elf32,
            Class::Elf64 => ElfClass::Elf64,
        };
        assert_eq!(image.class(), expected);
        assert_eq!(image.data_encoding(), DataEncoding::LittleEndian);
        assert_eq!(image.os_abi(), OsAbi::None);
    }
}

#[test]
fn full_image_exposes_every_table() {
    let output = shared_object(ElfWriterConfig::default().with_entry(0x1000));
    let mut parser = parser();
    let image = parser.parse(&output.data).unwrap();

    assert_eq!(image.header().e_entry(), 0x1000);
    assert_eq!(image.name(), "<memory>");

    let phdrs = image.program_headers();
    assert_eq!(phdrs.len(), 1);
    assert_eq!(phdrs[0].segment_type(), SegmentType::Load);
    assert_eq!(phdrs[0].flags().to_string(), "R-E");
    assert_eq!(phdrs[0].filesz(), 0x200);

    let text = image.section_by_name(".text").unwrap();
    assert_eq!(text.section_type(), SectionType::ProgBits);
    assert_eq!(text.addr(), 0x1000);
    assert_eq!(text.size(), 0x20);
    assert_eq!(text.flags().to_string(), "AX");
    let bss = image.section_by_name(".bss").unwrap();
    assert_eq!(bss.section_type(), SectionType::NoBits);
    assert_eq!(bss.file_size(), 0);

    let dynsym = image.dynamic_symbols();
    assert_eq!(dynsym.len(), 3);
    assert_eq!(dynsym.get(0).unwrap().name(), "");
    let foo = dynsym.find("foo").unwrap();
    assert_eq!(foo.index(), 1);
    assert_eq!(foo.entry().value(), 0x1000);
    assert_eq!(foo.entry().size(), 0x10);
    assert_eq!(foo.entry().binding(), elf::abi::STB_GLOBAL);
    assert_eq!(foo.entry().symbol_type(), elf::abi::STT_FUNC);
    assert_eq!(foo.entry().shndx(), 1);
    assert!(dynsym.find("puts").unwrap().entry().is_undefined());

    let symtab = image.symbols();
    assert_eq!(
        symtab.iter().map(|symbol| symbol.name()).collect::<Vec<_>>(),
        ["", "helper", "foo"]
    );
    assert_eq!(
        symtab.find("helper").unwrap().entry().binding(),
        elf::abi::STB_LOCAL
    );

    let dynsym_hdr = image.section_by_name(".dynsym").unwrap();
    let (link, dynstr) = image.linked_section(dynsym_hdr).unwrap();
    assert_eq!(image.section_name(link), Some(".dynstr"));
    assert_eq!(dynstr.section_type(), SectionType::StrTab);

    let diagnostics = parser.diagnostics();
    assert_eq!(diagnostics.count(Severity::Warning), 0);
    assert_eq!(diagnostics.count(Severity::Error), 0);
}

#[test]
fn wrong_magic_is_rejected_with_escaped_bytes() {
    let mut output = minimal(Class::Elf64);
    output.patch(0, b"MZ\x90\x00");
    let mut parser = parser();
    let err = parser.parse(&output.data).unwrap_err();
    assert_eq!(
        err,
        Error::InvalidMagic {
            expected: *b"\x7fELF",
            found: *b"MZ\x90\x00",
        }
    );
    let msg = err.to_string();
    assert!(msg.contains("\\x7FELF"), "{msg}");
    assert!(msg.contains("MZ\\x90\\x00"), "{msg}");
    assert!(parser.diagnostics().contains(Severity::Error, "invalid ELF magic"));
}

#[test]
fn unknown_class_is_rejected() {
    let mut output = minimal(Class::Elf64);
    output.patch(4, &[3]);
    assert_eq!(
        parser().parse(&output.data).unwrap_err(),
        Error::InvalidClass { class: 3 }
    );
}

#[test]
fn unknown_data_encoding_is_rejected() {
    let mut output = minimal(Class::Elf32);
    output.patch(5, &[0]);
    assert_eq!(
        parser().parse(&output.data).unwrap_err(),
        Error::InvalidDataEncoding { encoding: 0 }
    );
}

#[test]
fn ident_version_must_match_header_version() {
    let mut output = minimal(Class::Elf64);
    output.patch(6, &[2]);
    assert_eq!(
        parser().parse(&output.data).unwrap_err(),
        Error::VersionMismatch {
            ident: 2,
            header: 1
        }
    );
}

#[test]
fn short_inputs_are_truncated_errors() {
    let output = minimal(Class::Elf64);
    assert_eq!(
        parser().parse(&output.data[..10]).unwrap_err(),
        Error::Truncated {
            what: "identification",
            offset: 0,
            len: 16
        }
    );
    assert_eq!(
        parser().parse(&output.data[..40]).unwrap_err(),
        Error::Truncated {
            what: "header",
            offset: 0,
            len: 64
        }
    );

    let mut output = shared_object(ElfWriterConfig::default());
    let len = output.data.len();
    output.truncate(len - 1);
    assert!(matches!(
        parser().parse(&output.data).unwrap_err(),
        Error::Truncated {
            what: "section header",
            ..
        }
    ));
}

#[test]
fn truncated_program_header_table_is_rejected() {
    let mut output = ElfWriter::new(ElfWriterConfig::default().without_section_table())
        .segment(SegmentDesc::load(elf::abi::PF_R as u32, 0, 0, 0x40))
        .write();
    output.truncate(100);
    assert_eq!(
        parser().parse(&output.data).unwrap_err(),
        Error::Truncated {
            what: "program header",
            offset: 64,
            len: 56
        }
    );
}

#[test]
fn section_names_follow_section_indices() {
    let mut writer = ElfWriter::default();
    for n in 0..6 {
        writer = writer.section(SectionDesc::progbits(&format!(".s{n}"), vec![n as u8; 8]));
    }
    let output = writer.write();
    let image = relaxed().parse(&output.data).unwrap();

    assert_eq!(image.section_headers().len(), output.section_names.len());
    assert_eq!(image.section_names().len(), output.section_names.len());
    for (index, name) in output.section_names.iter().enumerate() {
        assert_eq!(image.section_name(index), Some(name.as_str()));
    }
    assert_eq!(image.section_index(".shstrtab"), Some(7));
}

#[test]
fn parsing_is_repeatable() {
    let output = shared_object(ElfWriterConfig::default());
    let first = relaxed().parse(&output.data).unwrap();
    let second = relaxed().parse(&output.data).unwrap();
    assert_eq!(first, second);
}

#[test]
fn name_offset_at_table_end_is_rejected() {
    let mut output = ElfWriter::default()
        .section(SectionDesc::progbits(".text", vec![0xc3]))
        .write();
    let size = output.shstrtab_size;
    output.set_section_name_offset(1, size as u32);
    assert_eq!(
        relaxed().parse(&output.data).unwrap_err(),
        Error::InvalidNameOffset {
            offset: size,
            table_size: size
        }
    );
}

#[test]
fn overlapping_sections_are_rejected() {
    let output = ElfWriter::default()
        .section(SectionDesc::progbits(".a", vec![0; 0x50]).at(0x100))
        .section(SectionDesc::progbits(".b", vec![0; 0x10]).at(0x120))
        .write();
    assert_eq!(
        relaxed().parse(&output.data).unwrap_err(),
        Error::SectionOverlap {
            index: 2,
            offset: 0x120,
            previous: 1,
            previous_end: 0x150
        }
    );
}

#[test]
fn adjacent_sections_are_accepted() {
    let output = ElfWriter::default()
        .section(SectionDesc::progbits(".a", vec![0; 0x50]).at(0x100))
        .section(SectionDesc::progbits(".b", vec![0; 0x10]).at(0x150))
        .write();
    let image = relaxed().parse(&output.data).unwrap();
    assert_eq!(image.section_by_name(".b").unwrap().offset(), 0x150);
}

#[test]
fn shared_offsets_only_warn() {
    let output = ElfWriter::default()
        .section(SectionDesc::progbits(".a", vec![0; 0x10]).at(0x100))
        .section(SectionDesc::progbits(".b", vec![0; 0x10]).at(0x100))
        .write();
    let mut parser = relaxed();
    parser.parse(&output.data).unwrap();
    assert!(
        parser
            .diagnostics()
            .contains(Severity::Warning, "share file offset 0x100")
    );
}

#[test]
fn overlap_is_checked_against_the_preceding_section_only() {
    // .c starts inside .a but after the end of .b, its immediate predecessor.
    let output = ElfWriter::default()
        .section(SectionDesc::progbits(".a", vec![0; 0x100]).at(0x100))
        .section(SectionDesc::progbits(".b", vec![0; 0x10]).at(0x100))
        .section(SectionDesc::progbits(".c", vec![0; 0x10]).at(0x150))
        .write();
    let mut parser = relaxed();
    let image = parser.parse(&output.data).unwrap();
    assert_eq!(image.section_by_name(".c").unwrap().offset(), 0x150);
    assert!(
        parser
            .diagnostics()
            .contains(Severity::Warning, "sections 1 and 2 share file offset 0x100")
    );
}

#[test]
fn empty_sections_take_no_part_in_overlap_checks() {
    let output = ElfWriter::default()
        .section(SectionDesc::progbits(".a", vec![0; 0x50]).at(0x100))
        .section(SectionDesc::progbits(".empty", Vec::<u8>::new()).at(0x120))
        .section(SectionDesc::progbits(".b", vec![0; 0x10]).at(0x150))
        .write();
    relaxed().parse(&output.data).unwrap();

    // An empty section in between does not hide an overlap with .a.
    let output = ElfWriter::default()
        .section(SectionDesc::progbits(".a", vec![0; 0x50]).at(0x100))
        .section(SectionDesc::progbits(".empty", Vec::<u8>::new()).at(0x120))
        .section(SectionDesc::progbits(".b", vec![0; 0x10]).at(0x130))
        .write();
    assert_eq!(
        relaxed().parse(&output.data).unwrap_err(),
        Error::SectionOverlap {
            index: 3,
            offset: 0x130,
            previous: 1,
            previous_end: 0x150
        }
    );
}

#[test]
fn section_past_end_of_file_is_out_of_bounds() {
    let mut output = ElfWriter::default()
        .section(SectionDesc::progbits(".text", vec![0xc3]))
        .write();
    output.set_section_range(1, 0x10_0000, 1);
    assert!(matches!(
        relaxed().parse(&output.data).unwrap_err(),
        Error::OutOfBounds { .. }
    ));
}

#[test]
fn bad_string_table_index_is_rejected() {
    let output = ElfWriter::new(ElfWriterConfig::default().with_shstrndx(99))
        .section(SectionDesc::progbits(".text", vec![0xc3]))
        .write();
    assert_eq!(
        relaxed().parse(&output.data).unwrap_err(),
        Error::InvalidStringTableIndex {
            index: 99,
            count: 3
        }
    );

    // Section 0 has no bytes to hold names.
    let output = ElfWriter::new(ElfWriterConfig::default().with_shstrndx(0))
        .section(SectionDesc::progbits(".text", vec![0xc3]))
        .write();
    assert!(matches!(
        relaxed().parse(&output.data).unwrap_err(),
        Error::InvalidStringTable { .. }
    ));
}

#[test]
fn missing_dynamic_symbols_are_fatal_by_default() {
    let output = ElfWriter::default()
        .section(SectionDesc::progbits(".text", vec![0xc3]))
        .write();
    let mut parser = parser();
    assert_eq!(
        parser.parse(&output.data).unwrap_err(),
        Error::MissingSection { name: ".dynsym" }
    );
    assert_eq!(parser.diagnostics().count(Severity::Error), 1);

    let image = relaxed().parse(&output.data).unwrap();
    assert!(image.dynamic_symbols().is_empty());
}

#[test]
fn dynamic_symbol_table_size_must_be_whole_entries() {
    let output = shared_object(ElfWriterConfig::default());
    let image = relaxed().parse(&output.data).unwrap();
    let index = image.section_index(".dynsym").unwrap();
    let offset = image.section_headers()[index].offset();

    let mut broken = output.clone();
    broken.set_section_range(index, offset, 25);
    assert!(matches!(
        parser().parse(&broken.data).unwrap_err(),
        Error::InvalidSymbolTable {
            section: ".dynsym",
            ..
        }
    ));

    let mut broken = output;
    broken.set_section_range(index, offset, 0);
    assert!(matches!(
        parser().parse(&broken.data).unwrap_err(),
        Error::InvalidSymbolTable { .. }
    ));
}

#[test]
fn dynamic_symbols_without_strings_are_fatal_by_default() {
    let output = ElfWriter::default()
        .section(SectionDesc::new(
            ".dynsym",
            elf::abi::SHT_DYNSYM,
            vec![0u8; 24],
        ))
        .write();
    assert_eq!(
        parser().parse(&output.data).unwrap_err(),
        Error::MissingSection { name: ".dynstr" }
    );

    let mut parser = relaxed();
    let image = parser.parse(&output.data).unwrap();
    assert!(image.dynamic_symbols().is_empty());
    assert!(
        parser
            .diagnostics()
            .contains(Severity::Warning, ".dynsym present without .dynstr")
    );
}

#[test]
fn unusable_dynamic_string_table_is_rejected() {
    let output = ElfWriter::default()
        .dynamic_symbols(&[SymbolDesc::global_func("foo", 0x1000, 4)])
        .write();
    let index = output.section_index(".dynstr").unwrap();
    let image = parser().parse(&output.data).unwrap();
    let offset = image.section_headers()[index].offset();
    let size = image.section_headers()[index].size();

    let mut broken = output.clone();
    broken.set_section_range(index, offset, 0);
    assert!(matches!(
        parser().parse(&broken.data).unwrap_err(),
        Error::InvalidStringTable { section, .. } if section == ".dynstr"
    ));

    let mut broken = output;
    broken.set_section_range(index, 0, size);
    assert!(matches!(
        parser().parse(&broken.data).unwrap_err(),
        Error::InvalidStringTable { section, .. } if section == ".dynstr"
    ));
}

#[test]
fn symbol_name_offset_at_string_table_end_is_rejected() {
    let mut output = ElfWriter::default()
        .dynamic_symbols(&[SymbolDesc::global_func("foo", 0x1000, 4)])
        .write();
    let image = parser().parse(&output.data).unwrap();
    let dynsym = image.section_by_name(".dynsym").unwrap().offset();
    let dynstr_size = image.section_by_name(".dynstr").unwrap().size();

    // st_name of symbol 1 is the first word of its 24-byte record.
    output.patch(dynsym as usize + 24, &(dynstr_size as u32).to_le_bytes());
    assert_eq!(
        parser().parse(&output.data).unwrap_err(),
        Error::InvalidNameOffset {
            offset: dynstr_size,
            table_size: dynstr_size
        }
    );
}

#[test]
fn half_present_static_table_is_skipped_with_a_warning() {
    let output = ElfWriter::default()
        .section(SectionDesc::new(
            ".symtab",
            elf::abi::SHT_SYMTAB,
            vec![0u8; 48],
        ))
        .dynamic_symbols(&[SymbolDesc::global_func("foo", 0x1000, 4)])
        .write();
    let mut parser = parser();
    let image = parser.parse(&output.data).unwrap();
    assert!(image.symbols().is_empty());
    assert_eq!(image.dynamic_symbols().len(), 2);
    assert!(
        parser
            .diagnostics()
            .contains(Severity::Warning, ".symtab present without .strtab")
    );
}

#[test]
fn string_table_without_static_symbols_is_skipped_with_a_warning() {
    let output = ElfWriter::default()
        .section(SectionDesc::new(
            ".strtab",
            elf::abi::SHT_STRTAB,
            b"\0helper\0".to_vec(),
        ))
        .dynamic_symbols(&[SymbolDesc::global_func("foo", 0x1000, 4)])
        .write();
    let mut parser = parser();
    let image = parser.parse(&output.data).unwrap();
    assert!(image.symbols().is_empty());
    assert!(
        parser
            .diagnostics()
            .contains(Severity::Warning, ".strtab present without .symtab")
    );
}

#[test]
fn stripped_binaries_are_reported() {
    let output = ElfWriter::default()
        .dynamic_symbols(&[SymbolDesc::global_func("foo", 0x1000, 4)])
        .write();
    let mut parser = parser();
    parser.parse(&output.data).unwrap();
    assert!(
        parser
            .diagnostics()
            .contains(Severity::Info, "likely stripped")
    );
    assert_eq!(parser.diagnostics().count(Severity::Warning), 0);
}

#[test]
fn identification_advisories_do_not_abort() {
    let mut output = minimal(Class::Elf64);
    output.patch(7, &[0x42]).patch(9, &[1]);
    let mut parser = parser();
    let image = parser.parse(&output.data).unwrap();
    assert_eq!(image.os_abi(), OsAbi::None);
    let diagnostics = parser.diagnostics();
    assert!(diagnostics.contains(Severity::Warning, "unknown OS/ABI 0x42"));
    assert!(diagnostics.contains(Severity::Warning, "padding"));

    let mut output = minimal(Class::Elf32);
    output.patch(7, &[3]).patch(8, &[2]);
    let image = parser.parse(&output.data).unwrap();
    assert_eq!(image.os_abi(), OsAbi::Linux);
    assert_eq!(image.abi_version(), 2);
}

#[test]
fn big_endian_images_decode() {
    let config = ElfWriterConfig::default()
        .with_class(Class::Elf32)
        .with_endian(Endian::Big)
        .with_machine(elf::abi::EM_PPC)
        .with_entry(0x1000_0000);
    let output = shared_object(config);
    let image = relaxed().parse(&output.data).unwrap();
    assert_eq!(image.data_encoding(), DataEncoding::BigEndian);
    assert_eq!(image.class(), ElfClass::Elf32);
    assert_eq!(image.header().e_machine(), elf::abi::EM_PPC);
    assert_eq!(image.header().e_entry(), 0x1000_0000);
    assert_eq!(
        image.dynamic_symbols().find("foo").unwrap().entry().value(),
        0x1000
    );
    assert_eq!(image.section_by_name(".text").unwrap().size(), 0x20);
}

#[test]
fn section_table_lists_every_section() {
    let output = shared_object(ElfWriterConfig::default());
    let image = relaxed().parse(&output.data).unwrap();
    let table = image.section_table().to_string();
    let lines: Vec<_> = table.lines().collect();
    assert_eq!(lines.len(), image.section_headers().len() + 1);
    assert!(lines[0].starts_with("[Nr] Name"));
    assert!(table.contains(".text"));
    assert!(table.contains("PROGBITS"));
    assert!(table.contains("NOBITS"));
    assert!(table.contains("DYNSYM"));
}

#[cfg(unix)]
#[test]
fn files_are_read_from_disk() {
    let output = shared_object(ElfWriterConfig::default());
    let path = std::env::temp_dir().join(format!("elf_probe_parsing_{}.so", std::process::id()));
    std::fs::write(&path, &output.data).unwrap();

    let from_file = ElfImage::from_path(path.to_str().unwrap());
    let from_memory = parser().parse(&output.data);
    std::fs::remove_file(&path).unwrap();

    let from_file = from_file.unwrap();
    assert_eq!(from_file.name(), path.to_str().unwrap());
    assert_eq!(from_file.section_headers(), from_memory.unwrap().section_headers());
}

#[test]
fn missing_files_are_io_errors() {
    let mut parser = parser();
    let err = parser.parse("/nonexistent/elf_probe/input").unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    let events = parser.diagnostics().events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].severity, Severity::Error);
    assert!(events[0].file.ends_with("parsing.rs"), "{}", events[0].file);
}
