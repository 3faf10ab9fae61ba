use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::assembler::Assembler;
use crate::diag::{Diagnostic, RenderOptions, render_diagnostics};
use crate::span::SourceFile;

#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub segment: Vec<u8>,
    /// Warnings only; any error fails the compile.
    pub diagnostics: Vec<Diagnostic>,
    pub line_map: BTreeMap<u16, usize>,
    pub source: SourceFile,
}

impl CompileOutput {
    pub fn rendered_diagnostics(&self, options: RenderOptions) -> String {
        render_diagnostics(&self.source, &self.diagnostics, options)
    }
}

#[derive(Debug, Error)]
#[error("compilation failed")]
pub struct CompileError {
    pub diagnostics: Vec<Diagnostic>,
    pub rendered: String,
}

pub fn compile_source(source_name: &str, source_text: &str) -> Result<CompileOutput, CompileError> {
    compile_source_with_options(source_name, source_text, RenderOptions::plain())
}

/// Assembles `source_text` line by line, stopping at the first failing
/// line. Lines are split on `\n` only and numbered from 1.
pub fn compile_source_with_options(
    source_name: &str,
    source_text: &str,
    options: RenderOptions,
) -> Result<CompileOutput, CompileError> {
    let source = SourceFile::new(source_name, source_text);
    let mut assembler = Assembler::new();

    let mut fed = Ok(());
    for line in 1..=source.line_count() {
        fed = assembler.assemble_line(source.line_text(line).unwrap_or(""), line);
        if fed.is_err() {
            break;
        }
    }
    let assembled = fed.and_then(|()| assembler.finish());
    let diagnostics = assembler.into_diagnostics();

    match assembled {
        Ok(assembled) => {
            debug!(
                source = source_name,
                words = assembled.line_map.len(),
                warnings = diagnostics.len(),
                "compile succeeded"
            );
            Ok(CompileOutput {
                segment: assembled.segment,
                diagnostics,
                line_map: assembled.line_map,
                source,
            })
        }
        Err(_) => {
            debug!(
                source = source_name,
                diagnostics = diagnostics.len(),
                "compile failed"
            );
            Err(fail_with_rendered(&source, diagnostics, options))
        }
    }
}

fn fail_with_rendered(
    source: &SourceFile,
    diagnostics: Vec<Diagnostic>,
    options: RenderOptions,
) -> CompileError {
    let rendered = render_diagnostics(source, &diagnostics, options);
    CompileError {
        diagnostics,
        rendered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Severity;

    #[test]
    fn compiles_to_full_segment() {
        let output = compile_source("ok.asm", "lw r2, 0x1234\nret\n").expect("compiles");
        assert_eq!(output.segment.len(), tvmasm_isa::SEGMENT_BYTES);
        assert_eq!(&output.segment[..6], &[0x32, 0x34, 0x42, 0x12, 0x10, 0x2A]);
        assert!(output.segment[6..].iter().all(|byte| *byte == 0));
        assert!(output.diagnostics.is_empty());
        assert_eq!(output.line_map.get(&2), Some(&2));
    }

    #[test]
    fn warnings_survive_success() {
        let output = compile_source("warn.asm", "lb r1 300").expect("compiles");
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].severity, Severity::Warning);
        assert!(
            output
                .rendered_diagnostics(RenderOptions::plain())
                .starts_with("line 1: Command 'lb' inverts")
        );
    }

    #[test]
    fn failure_keeps_the_whole_log() {
        let error = compile_source("bad.asm", "lbeq r1 r2 20\nbogus\nret").unwrap_err();
        assert_eq!(error.diagnostics.len(), 2);
        assert_eq!(error.diagnostics[0].severity, Severity::Warning);
        assert_eq!(error.diagnostics[1].line, 2);
        assert_eq!(error.rendered.lines().count(), 2);
        assert!(error.rendered.ends_with("line 2: Command 'bogus' not found."));
    }

    #[test]
    fn carriage_returns_are_trimmed_with_the_line() {
        let output = compile_source("crlf.asm", "nop\r\nret\r\n").expect("compiles");
        assert_eq!(&output.segment[..4], &[0x5F, 0x00, 0x10, 0x2A]);
    }

    #[test]
    fn pretty_failure_renders_source() {
        let error = compile_source_with_options(
            "bad.asm",
            "nop\nadd r1 x2",
            RenderOptions::pretty(false),
        )
        .unwrap_err();
        assert!(error.rendered.contains("add r1 x2"));
        assert!(error.rendered.contains("bad.asm"));
    }
}
