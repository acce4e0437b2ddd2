use elf_probe::{ElfParser, Result};

fn main() -> Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        unsafe { std::env::set_var("RUST_LOG", "info") };
    }
    env_logger::init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "/bin/true".to_string());
    let image = ElfParser::new().require_dynamic_symbols(false).parse(path.as_str())?;

    let header = image.header();
    println!("{}: {:?} {:?}", image.name(), image.class(), image.data_encoding());
    println!(
        "OS/ABI {:?} (ABI version {}), type {}, machine {}, entry 0x{:x}",
        image.os_abi(),
        image.abi_version(),
        header.e_type(),
        header.e_machine(),
        header.e_entry()
    );

    println!("\nProgram headers:");
    for phdr in image.program_headers() {
        println!(
            "  {:<14} {} offset 0x{:08x} vaddr 0x{:016x} filesz 0x{:x} memsz 0x{:x}",
            phdr.segment_type().to_string(),
            phdr.flags(),
            phdr.offset(),
            phdr.vaddr(),
            phdr.filesz(),
            phdr.memsz()
        );
    }

    println!("\nSection headers:\n{}", image.section_table());

    println!(
        "{} symbols, {} dynamic symbols",
        image.symbols().len(),
        image.dynamic_symbols().len()
    );
    for symbol in image.dynamic_symbols().iter().skip(1) {
        let entry = symbol.entry();
        let place = if entry.is_undefined() { "UND" } else { "DEF" };
        println!("  {:>4} {place} 0x{:016x} {}", symbol.index(), entry.value(), symbol.name());
    }
    Ok(())
}
