//! Diagnostics sinks.
//!
//! The parser never owns a logger. Every advisory finding and every fatal
//! error is handed to a caller-supplied [`Diagnostics`] implementation, so
//! independent parses never share state and each one can be observed in
//! isolation.

use alloc::{string::String, vec::Vec};
use core::{fmt, panic::Location};

/// How serious a reported event is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    /// Reported right before the matching [`Error`](crate::Error) is returned.
    Error,
}

/// One event reported by the parser.
#[derive(Clone, Copy, Debug)]
pub struct Diagnostic<'a> {
    severity: Severity,
    message: fmt::Arguments<'a>,
    location: &'static Location<'static>,
}

impl<'a> Diagnostic<'a> {
    pub(crate) fn new(
        severity: Severity,
        message: fmt::Arguments<'a>,
        location: &'static Location<'static>,
    ) -> Self {
        Self {
            severity,
            message,
            location,
        }
    }

    #[inline]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The formatted message. Format it or call `to_string` to keep it.
    #[inline]
    pub fn message(&self) -> fmt::Arguments<'a> {
        self.message
    }

    /// The place in the parser that raised the event.
    #[inline]
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

/// A receiver for parser events.
///
/// # Examples
/// ```rust
/// use elf_probe::{Diagnostic, Diagnostics, Severity};
///
/// #[derive(Default)]
/// struct CountWarnings(usize);
///
/// impl Diagnostics for CountWarnings {
///     fn record(&mut self, diag: &Diagnostic<'_>) {
///         if diag.severity() == Severity::Warning {
///             self.0 += 1;
///         }
///     }
/// }
/// ```
pub trait Diagnostics {
    fn record(&mut self, diag: &Diagnostic<'_>);
}

/// Discards everything.
impl Diagnostics for () {
    #[inline]
    fn record(&mut self, _diag: &Diagnostic<'_>) {}
}

impl<D: Diagnostics + ?Sized> Diagnostics for &mut D {
    #[inline]
    fn record(&mut self, diag: &Diagnostic<'_>) {
        (**self).record(diag)
    }
}

/// Forwards events to the [`log`] facade under the `elf_probe` target.
#[cfg(feature = "log")]
#[derive(Clone, Copy, Debug, Default)]
pub struct LogDiagnostics;

#[cfg(feature = "log")]
impl Diagnostics for LogDiagnostics {
    fn record(&mut self, diag: &Diagnostic<'_>) {
        let level = match diag.severity() {
            Severity::Debug => log::Level::Debug,
            Severity::Info => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Error => log::Level::Error,
        };
        let location = diag.location();
        log::log!(
            target: "elf_probe",
            level,
            "[{}:{}] {}",
            location.file(),
            location.line(),
            diag.message()
        );
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "log")] {
        /// The sink used by [`ElfParser::new`](crate::ElfParser::new).
        pub type DefaultDiagnostics = LogDiagnostics;
    } else {
        /// The sink used by [`ElfParser::new`](crate::ElfParser::new).
        pub type DefaultDiagnostics = ();
    }
}

/// An owned copy of a [`Diagnostic`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    pub severity: Severity,
    pub message: String,
    pub file: &'static str,
    pub line: u32,
}

/// Keeps every event in memory, in the order it was reported.
#[derive(Clone, Debug, Default)]
pub struct RecordedDiagnostics {
    events: Vec<RecordedEvent>,
}

impl RecordedDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Number of events at exactly `severity`.
    pub fn count(&self, severity: Severity) -> usize {
        self.events
            .iter()
            .filter(|event| event.severity == severity)
            .count()
    }

    /// Whether an event at `severity` mentions `needle`.
    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.events
            .iter()
            .any(|event| event.severity == severity && event.message.contains(needle))
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Diagnostics for RecordedDiagnostics {
    fn record(&mut self, diag: &Diagnostic<'_>) {
        self.events.push(RecordedEvent {
            severity: diag.severity(),
            message: alloc::fmt::format(diag.message()),
            file: diag.location().file(),
            line: diag.location().line(),
        });
    }
}
