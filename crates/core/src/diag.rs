use std::fmt;

use ariadne::{Cache, Color, Config, IndexType, Label, Report, ReportKind, Source};

use crate::span::{SourceFile, SourceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One entry of the ordered assembler log.
///
/// `line` is the 1-indexed line being processed when the entry was logged.
/// Entries raised while replaying a forward reference carry the line of the
/// original reference, not the line of the `.label` that triggered replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub line: usize,
    pub message: String,
}

impl Diagnostic {
    fn new(severity: Severity, line: usize, message: impl Into<String>) -> Self {
        Self {
            severity,
            line,
            message: message.into(),
        }
    }

    pub fn error(line: usize, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, line, message)
    }

    pub fn warning(line: usize, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, line, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

#[derive(Debug)]
struct SourceFileCache<'a> {
    file: &'a SourceFile,
    source: Source<&'a str>,
}

impl<'a> SourceFileCache<'a> {
    fn new(file: &'a SourceFile) -> Self {
        Self {
            file,
            source: Source::from(file.text.as_str()),
        }
    }
}

impl<'a> Cache<SourceId> for SourceFileCache<'a> {
    type Storage = &'a str;

    fn fetch(&mut self, id: &SourceId) -> Result<&Source<Self::Storage>, impl fmt::Debug> {
        if *id == self.file.id {
            Ok(&self.source)
        } else {
            Err(format!("missing source for id {:?}", id))
        }
    }

    fn display<'b>(&self, id: &'b SourceId) -> Option<impl fmt::Display + 'b> {
        (*id == self.file.id).then(|| self.file.name.clone())
    }
}

fn report_kind(severity: Severity) -> ReportKind<'static> {
    match severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
    }
}

fn primary_color(severity: Severity) -> Color {
    match severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    pub pretty: bool,
    pub color: bool,
}

impl RenderOptions {
    pub const fn plain() -> Self {
        Self {
            pretty: false,
            color: false,
        }
    }

    pub const fn pretty(color: bool) -> Self {
        Self {
            pretty: true,
            color,
        }
    }
}

pub fn render_diagnostic(
    file: &SourceFile,
    diagnostic: &Diagnostic,
    options: RenderOptions,
) -> String {
    if !options.pretty {
        return diagnostic.to_string();
    }
    // Diagnostics logged after the last line (end-of-text checks) have no
    // source to point at.
    let Some(range) = file.line_range(diagnostic.line).filter(|range| !range.is_empty()) else {
        return diagnostic.to_string();
    };

    let span = (file.id, range);
    let report = Report::build(report_kind(diagnostic.severity), span.clone())
        .with_config(
            Config::default()
                .with_index_type(IndexType::Byte)
                .with_color(options.color),
        )
        .with_message(diagnostic.message.clone())
        .with_label(
            Label::new(span)
                .with_color(primary_color(diagnostic.severity))
                .with_message(format!("line {}", diagnostic.line)),
        );

    let mut output = Vec::new();
    let mut cache = SourceFileCache::new(file);
    if report.finish().write(&mut cache, &mut output).is_ok() {
        return String::from_utf8_lossy(&output).into_owned();
    }
    diagnostic.to_string()
}

pub fn render_diagnostics(
    file: &SourceFile,
    diagnostics: &[Diagnostic],
    options: RenderOptions,
) -> String {
    diagnostics
        .iter()
        .map(|diag| render_diagnostic(file, diag, options))
        .collect::<Vec<_>>()
        .join("\n")
}
