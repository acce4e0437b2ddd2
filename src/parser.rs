use crate::{
    Diagnostic, Diagnostics, ElfImage, Result, Severity,
    diagnostics::DefaultDiagnostics,
    image::ImageBuilder,
    input::IntoElfReader,
};
use core::panic::Location;

/// Reads and validates ELF files.
///
/// A parser holds the configuration and the diagnostics sink shared by every
/// [`parse`](Self::parse) call made through it. Parsers are cheap; use one per
/// thread, or one per file if the findings of each file must stay separate.
///
/// # Examples
/// ```rust
/// use elf_probe::{ElfParser, Severity, diagnostics::RecordedDiagnostics};
///
/// let mut parser = ElfParser::new()
///     .with_diagnostics(RecordedDiagnostics::new())
///     .require_dynamic_symbols(false);
///
/// assert!(parser.parse(&[0u8; 8][..]).is_err());
/// assert_eq!(parser.diagnostics().count(Severity::Error), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ElfParser<D = DefaultDiagnostics> {
    diagnostics: D,
    require_dynamic_symbols: bool,
}

impl ElfParser {
    /// Creates a parser reporting through [`DefaultDiagnostics`].
    ///
    /// `.dynsym` and `.dynstr` are required by default; see
    /// [`require_dynamic_symbols`](Self::require_dynamic_symbols).
    pub fn new() -> Self {
        Self {
            diagnostics: DefaultDiagnostics::default(),
            require_dynamic_symbols: true,
        }
    }
}

impl Default for ElfParser {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Diagnostics> ElfParser<D> {
    /// Replaces the diagnostics sink, keeping the rest of the configuration.
    pub fn with_diagnostics<N: Diagnostics>(self, diagnostics: N) -> ElfParser<N> {
        ElfParser {
            diagnostics,
            require_dynamic_symbols: self.require_dynamic_symbols,
        }
    }

    /// Whether a file with a section table but no `.dynsym`/`.dynstr` pair is
    /// rejected with [`Error::MissingSection`](crate::Error::MissingSection).
    ///
    /// Turn this off to accept relocatable objects and static executables.
    pub fn require_dynamic_symbols(mut self, require: bool) -> Self {
        self.require_dynamic_symbols = require;
        self
    }

    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut D {
        &mut self.diagnostics
    }

    pub fn into_diagnostics(self) -> D {
        self.diagnostics
    }

    /// Parses and validates one ELF input.
    ///
    /// `input` may be a path (`&str`, `String`), a byte buffer (`&[u8]`,
    /// `&Vec<u8>`) or an already constructed reader. The input is released
    /// before this returns, whatever the outcome.
    ///
    /// A failure to open the input is reported at the caller's location.
    #[track_caller]
    pub fn parse<'a, I>(&mut self, input: I) -> Result<ElfImage>
    where
        I: IntoElfReader<'a>,
    {
        let location = Location::caller();
        let reader = input.into_reader().inspect_err(|err| {
            self.diagnostics.record(&Diagnostic::new(
                Severity::Error,
                format_args!("{err}"),
                location,
            ));
        })?;
        ImageBuilder::new(reader, &mut self.diagnostics, self.require_dynamic_symbols).build()
    }
}
