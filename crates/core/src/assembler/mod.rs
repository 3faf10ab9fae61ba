//! Line-by-line assembler state.
//!
//! A fresh [`Assembler`] is fed one source line at a time through
//! [`Assembler::assemble_line`]; the first failing line ends the compile.
//! [`Assembler::finish`] runs the end-of-text checks and serializes the
//! segment.

mod commands;
mod directives;
mod forward;
mod instructions;
mod pseudo;
mod segment;


use std::collections::BTreeMap;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};
use tvmasm_isa::EncodeError;

use crate::diag::Diagnostic;
use crate::parser::{self, ArgKind, Operand};

pub use commands::{SUGGESTION_CUTOFF, SUGGESTION_LIMIT, close_matches, command_names};
pub use segment::{Segment, WriteConflict, sha256_hex};

use forward::{ForwardRef, Origin};

/// Band, in words, inside the short-form limits where a long form is
/// reported as wasteful.
pub const LONG_BRANCH_SLACK: i64 = 10;

/// Upper bound for words a single forward reference may reserve.
pub const MAX_FORWARD_WORDS: u16 = 4096;

/// Marker that a failure has already been logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reported;

pub type AsmResult<T = ()> = Result<T, Reported>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelInfo {
    pub offset: u16,
    pub line: usize,
    pub used: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ExpectedHash {
    line: usize,
    hex: String,
}

#[derive(Debug, Clone)]
pub struct Assembled {
    pub segment: Vec<u8>,
    pub line_map: BTreeMap<u16, usize>,
}

#[derive(Debug)]
pub struct Assembler {
    segment: Segment,
    pointer: u16,
    line: usize,
    labels: FxHashMap<String, LabelInfo>,
    forward_refs: IndexMap<String, Vec<ForwardRef>>,
    diagnostics: Vec<Diagnostic>,
    expected_hash: Option<ExpectedHash>,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self {
            segment: Segment::new(),
            pointer: 0,
            line: 0,
            labels: FxHashMap::default(),
            forward_refs: IndexMap::new(),
            diagnostics: Vec::new(),
            expected_hash: None,
        }
    }

    pub fn pointer(&self) -> u16 {
        self.pointer
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn label(&self, name: &str) -> Option<LabelInfo> {
        self.labels.get(name).copied()
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) -> Reported {
        let diagnostic = Diagnostic::error(self.line, message);
        debug!(line = diagnostic.line, message = %diagnostic.message, "error");
        self.diagnostics.push(diagnostic);
        Reported
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let diagnostic = Diagnostic::warning(self.line, message);
        debug!(line = diagnostic.line, message = %diagnostic.message, "warning");
        self.diagnostics.push(diagnostic);
    }

    /// Moves the cursor forward, wrapping past the last address.
    pub(crate) fn advance(&mut self, by_words: u16) {
        let (next, wrapped) = self.pointer.overflowing_add(by_words);
        self.pointer = next;
        if wrapped {
            self.warn(format!(
                "segment pointer overflow, now at 0x{next:04X} (non-fatal)"
            ));
        }
    }

    pub(crate) fn push_word(&mut self, word: u16) -> AsmResult {
        trace!(address = self.pointer, word, "push");
        if let Err(conflict) = self.segment.write(self.pointer, word, self.line) {
            return Err(self.error(conflict.to_string()));
        }
        self.advance(1);
        Ok(())
    }

    pub(crate) fn push_words(&mut self, words: &[u16]) -> AsmResult {
        words.iter().try_for_each(|word| self.push_word(*word))
    }

    pub(crate) fn register(&mut self, text: &str, context: &str) -> AsmResult<u8> {
        parser::parse_register(text, context).map_err(|message| self.error(message))
    }

    pub(crate) fn immediate(&mut self, text: &str, context: &str) -> AsmResult<i64> {
        parser::parse_immediate(text, context).map_err(|message| self.error(message))
    }

    pub(crate) fn label_name(&mut self, text: &str, context: &str) -> AsmResult<String> {
        parser::parse_label(text, context).map_err(|message| self.error(message))
    }

    /// Logs every sub-attempt message when no kind matched.
    pub(crate) fn operand(
        &mut self,
        kinds: &[ArgKind],
        text: &str,
        context: &str,
    ) -> AsmResult<Operand> {
        parser::parse_one_of(kinds, text, context).map_err(|messages| {
            for message in messages {
                self.error(message);
            }
            Reported
        })
    }

    /// Prefixes an encoder rejection with the command that caused it.
    pub(crate) fn encoded<T>(
        &mut self,
        command: &str,
        result: Result<T, EncodeError>,
    ) -> AsmResult<T> {
        result.map_err(|err| self.error(format!("Command '{command}' {err}")))
    }

    /// Runs the end-of-text checks and serializes the segment.
    ///
    /// Unresolved references and unused labels are both reported before
    /// failing; the hash assertion is only checked when neither occurred.
    pub fn finish(&mut self) -> AsmResult<Assembled> {
        let mut failed = false;

        if !self.forward_refs.is_empty() {
            let references = self
                .forward_refs
                .iter()
                .flat_map(|(label, refs)| {
                    refs.iter().map(move |reference| {
                        format!(
                            "line {} at offset {} references label {label}",
                            reference.origin.line, reference.origin.pointer
                        )
                    })
                })
                .collect::<Vec<_>>()
                .join(", ");
            self.error(format!(
                "Found end of asm text, but some forward references are unresolved: {references}"
            ));

            let unresolved: Vec<String> = self.forward_refs.keys().cloned().collect();
            let mut defined: Vec<&str> = self.labels.keys().map(String::as_str).collect();
            defined.sort_unstable();
            let hints: Vec<String> = unresolved
                .iter()
                .map(|label| {
                    let close = close_matches(label, defined.iter().copied());
                    let candidates = if close.is_empty() { defined.clone() } else { close };
                    format!(
                        "Label {label} is never defined. Did you mean any of these defined labels? {candidates:?}"
                    )
                })
                .collect();
            for hint in hints {
                self.error(hint);
            }
            failed = true;
        }

        let mut unused: Vec<(&String, &LabelInfo)> =
            self.labels.iter().filter(|(_, info)| !info.used).collect();
        if !unused.is_empty() {
            unused.sort_unstable_by(|a, b| a.0.cmp(b.0));
            let listing = unused
                .iter()
                .map(|(name, info)| {
                    format!("'{name}' (line {}, offset {})", info.line, info.offset)
                })
                .collect::<Vec<_>>()
                .join(", ");
            self.error(format!(
                "Unused label(s), try using them in dead code, or commenting them out: {listing}"
            ));
            failed = true;
        }

        if failed {
            return Err(Reported);
        }

        let bytes = self.segment.to_bytes();
        if let Some(expected) = self.expected_hash.clone() {
            let actual = sha256_hex(&bytes);
            if actual != expected.hex {
                return Err(self.error(format!(
                    "Compilation successful, but encountered hash mismatch: line {} expects hash {}, but created hash {actual} instead.",
                    expected.line, expected.hex
                )));
            }
        }

        debug!(
            words = self.segment.line_map().len(),
            labels = self.labels.len(),
            "segment assembled"
        );
        Ok(Assembled {
            segment: bytes,
            line_map: self.segment.line_map().clone(),
        })
    }

    fn origin(&self) -> Origin {
        Origin {
            line: self.line,
            pointer: self.pointer,
        }
    }
}
