//! Deferred encodings for labels that are not defined yet.
//!
//! A reference reserves its promised word count at the current position and
//! is replayed verbatim once `.label` defines its target, with the cursor
//! temporarily moved back to where the reference was made.

use tracing::debug;

use super::{AsmResult, Assembler, LabelInfo, MAX_FORWARD_WORDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Origin {
    pub line: usize,
    pub pointer: u16,
}

/// The encoding to finish once the label's address is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Continuation {
    Branch {
        command: String,
        register: u8,
    },
    Jump {
        command: String,
        extra: i64,
        allow_short: bool,
    },
    LoadAddress {
        command: String,
        register: u8,
        long: bool,
    },
    JumpHigh {
        command: String,
        register: u8,
    },
}

impl Continuation {
    pub fn words(&self) -> u16 {
        match self {
            Continuation::LoadAddress { long: true, .. } => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ForwardRef {
    pub origin: Origin,
    pub continuation: Continuation,
}

/// Outcome of replaying a pending reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReferenceState {
    Applied,
    Failed,
}

impl Assembler {
    /// Encodes right away when `label` is known, otherwise reserves the
    /// continuation's words and queues it.
    pub(crate) fn forward(&mut self, label: String, continuation: Continuation) -> AsmResult {
        let by_words = continuation.words();
        assert!(
            by_words < MAX_FORWARD_WORDS,
            "forward reference to {label} reserves {by_words} words"
        );

        if let Some(info) = self.labels.get_mut(&label) {
            info.used = true;
            return self.apply(&label, &continuation);
        }

        debug!(
            label = %label,
            line = self.line,
            pointer = self.pointer,
            words = by_words,
            "deferring forward reference"
        );
        let reference = ForwardRef {
            origin: self.origin(),
            continuation,
        };
        self.forward_refs.entry(label).or_default().push(reference);
        self.advance(by_words);
        Ok(())
    }

    pub(crate) fn replay(&mut self, label: &str, reference: ForwardRef) -> ReferenceState {
        let origin = reference.origin;
        let state = self.with_origin(origin, |asm| {
            match asm.apply(label, &reference.continuation) {
                Ok(()) => ReferenceState::Applied,
                Err(_) => ReferenceState::Failed,
            }
        });
        debug!(
            label,
            line = origin.line,
            pointer = origin.pointer,
            ?state,
            "replayed forward reference"
        );
        state
    }

    /// Runs `run` with the cursor set to `origin`, restoring the current
    /// cursor afterwards. Nests, since a replay may queue references to other
    /// labels.
    pub(crate) fn with_origin<T>(&mut self, origin: Origin, run: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.line, origin.line);
        let saved_pointer = std::mem::replace(&mut self.pointer, origin.pointer);
        let result = run(self);
        self.line = saved;
        self.pointer = saved_pointer;
        result
    }

    fn apply(&mut self, label: &str, continuation: &Continuation) -> AsmResult {
        let start = self.pointer;
        let info = self.defined(label);
        match continuation {
            Continuation::Branch { command, register } => {
                self.branch_to_label(command, *register, label, info)?
            }
            Continuation::Jump {
                command,
                extra,
                allow_short,
            } => self.jump_to_label(command, label, info, *extra, *allow_short)?,
            Continuation::LoadAddress {
                command,
                register,
                long,
            } => self.load_label_address(command, *register, *long, label, info)?,
            Continuation::JumpHigh { command, register } => {
                self.jump_high_to_label(command, *register, label, info)?
            }
        }

        let written = self.pointer.wrapping_sub(start);
        assert_eq!(
            written,
            continuation.words(),
            "{continuation:?} for {label} at 0x{start:04X} advanced by {written} words"
        );
        Ok(())
    }

    fn defined(&self, label: &str) -> LabelInfo {
        match self.labels.get(label) {
            Some(info) => *info,
            None => panic!("forward reference to {label} applied before its definition"),
        }
    }
}
