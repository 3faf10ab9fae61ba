use tracing::debug;

use super::forward::ReferenceState;
use super::{AsmResult, Assembler, ExpectedHash, LabelInfo};
use crate::parser::{ArgKind, Operand};

impl Assembler {
    pub(super) fn directive_offset(&mut self, command: &str, args: &str) -> AsmResult {
        let args = args.trim();
        if args.is_empty() || args.contains(' ') {
            return Err(self.error(format!(
                "Directive '{command}' takes exactly one argument (the new absolute offset), found '{args}' instead"
            )));
        }
        let context = format!("argument of {command}");
        let Ok(target) = self.operand(&[ArgKind::Immediate, ArgKind::Label], args, &context) else {
            return Err(self.error(format!(
                "Directive '{command}' takes either an immediate value or a label, found '{args}' instead"
            )));
        };
        match target {
            Operand::Immediate(offset) => {
                if offset < 0 {
                    return Err(self.error(format!(
                        "Immediate argument to '{command}' must be positive, found '{args}' instead"
                    )));
                }
                self.pointer = offset as u16;
            }
            Operand::Label(label) => {
                let Some(info) = self.labels.get_mut(&label) else {
                    self.error(format!(
                        "Label argument to '{command}' must be an already-declared label, found unknown label '{label}' instead"
                    ));
                    let mut defined: Vec<&str> = self.labels.keys().map(String::as_str).collect();
                    defined.sort_unstable();
                    let message = format!("The already-defined labels are: {defined:?}");
                    return Err(self.error(message));
                };
                info.used = true;
                self.pointer = info.offset;
            }
            Operand::Register(_) => unreachable!("registers are not offsets"),
        }
        debug!(pointer = self.pointer, "relocated cursor");
        Ok(())
    }

    pub(super) fn directive_word(&mut self, command: &str, args: &str) -> AsmResult {
        let args = args.trim();
        if args.is_empty() || args.contains(' ') {
            return Err(self.error(format!(
                "Directive '{command}' takes exactly one argument (the literal word), found '{args}' instead"
            )));
        }
        let value = self.immediate(args, &format!("argument of {command}"))?;
        self.push_word((value & 0xFFFF) as u16)
    }

    /// Defines a label at the cursor and replays every reference waiting on
    /// it. All replays run even when one fails.
    pub(super) fn directive_label(&mut self, command: &str, args: &str) -> AsmResult {
        let args = args.trim();
        if args.is_empty() {
            return Err(self.error(format!(
                "Directive '{command}' takes exactly one argument (the literal label name), found nothing instead"
            )));
        }
        let parts: Vec<&str> = args.splitn(2, ' ').collect();
        if parts.len() > 1 {
            return Err(self.error(format!(
                "Directive '{command}' takes exactly one argument (the literal label name), found {parts:?} instead"
            )));
        }
        let name = self.label_name(args, &format!("argument of {command}"))?;
        if let Some(previous) = self.labels.get(&name) {
            let message = format!(
                "Label '{name}' previously defined in line {} (old offset 0x{:04X}, new offset 0x{:04X})",
                previous.line, previous.offset, self.pointer
            );
            return Err(self.error(message));
        }

        let pending = self.forward_refs.shift_remove(&name);
        self.labels.insert(
            name.clone(),
            LabelInfo {
                offset: self.pointer,
                line: self.line,
                used: pending.is_some(),
            },
        );
        debug!(
            label = %name,
            offset = self.pointer,
            pending = pending.as_ref().map_or(0, Vec::len),
            "defined label"
        );

        let mut any_failed = false;
        for reference in pending.into_iter().flatten() {
            if self.replay(&name, reference) == ReferenceState::Failed {
                any_failed = true;
            }
        }
        if any_failed {
            return Err(self.error(format!("When label {name} was defined.")));
        }
        Ok(())
    }

    pub(super) fn directive_assert_hash(&mut self, command: &str, args: &str) -> AsmResult {
        let hex = args.trim();
        if hex.len() != 64 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(self.error(format!(
                "Argument to {command} must be a single 64-char hexstring of the expected SHA256, found instead '{hex}'."
            )));
        }
        if let Some(expected) = &self.expected_hash {
            let message = format!("Expected hash already stated in line {}.", expected.line);
            return Err(self.error(message));
        }
        self.expected_hash = Some(ExpectedHash {
            line: self.line,
            hex: hex.to_ascii_uppercase(),
        });
        Ok(())
    }
}
