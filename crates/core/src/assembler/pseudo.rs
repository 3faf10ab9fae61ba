//! Mnemonics that lower to sequences of primitive words.

use tvmasm_isa::{
    Condition, SHORT_LOAD_RANGE, encode_compare, encode_load_high_byte, encode_load_low,
    mod_s16,
};

use super::forward::Continuation;
use super::{AsmResult, Assembler, LONG_BRANCH_SLACK, LabelInfo};
use crate::parser::{ArgKind, Operand, split_args};

impl Assembler {
    /// `eqz rX` and friends compare a register with itself.
    pub(super) fn compare_zero(
        &mut self,
        command: &str,
        args: &str,
        condition: Condition,
    ) -> AsmResult {
        if args.is_empty() || args.contains(' ') {
            return Err(self.error(format!(
                "Command '{command}' expects exactly one register argument, got '{args}' instead."
            )));
        }
        let register = self.register(args, &format!("first argument to {command}"))?;
        self.push_word(encode_compare(condition, register, register))
    }

    pub(super) fn refuse(&mut self, command: &str, advice: &str) -> AsmResult {
        Err(self.error(format!(
            "Refusing hypothetical '{command}' pseudo-instruction, because there is no unsigned \
             integer less than zero. {advice}"
        )))
    }

    /// Parses `REG REG` for the combined compare forms. Both registers are
    /// checked before failing so that both problems get reported.
    fn two_registers(&mut self, command: &str, lhs: &str, rhs: &str) -> AsmResult<(u8, u8)> {
        let lhs = self.register(lhs, &format!("first argument to {command}"));
        let rhs = self.register(rhs, &format!("second argument to {command}"));
        Ok((lhs?, rhs?))
    }

    /// `bCC lhs rhs TARGET`: compare into `rhs`, then branch on it.
    pub(super) fn branch_compare(
        &mut self,
        command: &str,
        args: &str,
        condition: Condition,
    ) -> AsmResult {
        let parts = split_args(args, ' ', Some(2));
        if parts.len() != 3 {
            return Err(self.error(format!(
                "Command '{command}' expects exactly three space-separated arguments (reg reg imm_or_lab), got {parts:?} instead."
            )));
        }
        let (lhs, rhs) = self.two_registers(command, parts[0], parts[1])?;
        self.push_word(encode_compare(condition, lhs, rhs))?;
        self.branch_to_operand(command, rhs, parts[2], &format!("third argument to {command}"))
    }

    pub(super) fn branch_zero(
        &mut self,
        command: &str,
        args: &str,
        condition: Condition,
    ) -> AsmResult {
        let parts = split_args(args, ' ', Some(1));
        if parts.len() != 2 {
            return Err(self.error(format!(
                "Command '{command}' expects exactly two space-separated arguments (reg imm_or_lab), got {parts:?} instead."
            )));
        }
        let register = self.register(parts[0], &format!("first argument to {command}"))?;
        self.push_word(encode_compare(condition, register, register))?;
        let context = format!("second argument to {command}");
        self.branch_to_operand(command, register, parts[1], &context)
    }

    /// Emits `b inverted +2; j TARGET`: skip the jump unless the original
    /// condition holds.
    fn long_jump_to_operand(
        &mut self,
        command: &str,
        inverted: u8,
        raw: &str,
        context: &str,
    ) -> AsmResult {
        let target = self.operand(&[ArgKind::Immediate, ArgKind::Label], raw, context)?;
        self.emit_branch(command, inverted, 2)?;
        match target {
            Operand::Immediate(offset) => self.emit_jump(command, offset, false),
            Operand::Label(label) => self.forward(
                label,
                Continuation::Jump {
                    command: command.to_string(),
                    extra: 0,
                    allow_short: false,
                },
            ),
            Operand::Register(_) => unreachable!("registers are not branch targets"),
        }
    }

    /// Plain `lb REG TARGET` has to invert the register itself first.
    pub(super) fn long_branch(&mut self, command: &str, args: &str) -> AsmResult {
        let parts = split_args(args, ' ', Some(1));
        self.warn(format!(
            "Command '{command}' inverts the condition register, and ends up needing three \
             instructions. Consider using a combined longbranch-compare instead (e.g. lbles)."
        ));
        if parts.len() != 2 {
            return Err(self.error(format!(
                "Command '{command}' expects exactly two space-separated arguments (reg imm_or_lab), got {parts:?} instead."
            )));
        }
        let register = self.register(parts[0], &format!("first argument to {command}"))?;
        self.push_word(encode_compare(Condition::Eq, register, register))?;
        let context = format!("second argument to {command}");
        self.long_jump_to_operand(command, register, parts[1], &context)
    }

    pub(super) fn long_branch_compare(
        &mut self,
        command: &str,
        args: &str,
        condition: Condition,
    ) -> AsmResult {
        let parts = split_args(args, ' ', Some(2));
        if parts.len() != 3 {
            return Err(self.error(format!(
                "Command '{command}' expects exactly three space-separated arguments (reg reg imm_or_lab), got {parts:?} instead."
            )));
        }
        let (lhs, rhs) = self.two_registers(command, parts[0], parts[1])?;
        self.push_word(encode_compare(condition.inverted(), lhs, rhs))?;
        self.long_jump_to_operand(command, rhs, parts[2], &format!("third argument to {command}"))
    }

    /// `lbeqz` passes `None`: the register already holds the inverted truth.
    pub(super) fn long_branch_zero(
        &mut self,
        command: &str,
        args: &str,
        condition: Option<Condition>,
    ) -> AsmResult {
        let parts = split_args(args, ' ', Some(1));
        if parts.len() != 2 {
            return Err(self.error(format!(
                "Command '{command}' expects exactly two space-separated arguments (reg imm_or_lab), got {parts:?} instead."
            )));
        }
        let register = self.register(parts[0], &format!("first argument to {command}"))?;
        if let Some(condition) = condition {
            self.push_word(encode_compare(condition.inverted(), register, register))?;
        }
        let context = format!("second argument to {command}");
        self.long_jump_to_operand(command, register, parts[1], &context)
    }

    /// `la REG, LABEL` (one word) or `lla REG, LABEL` (two words).
    pub(super) fn load_address(&mut self, command: &str, args: &str, long: bool) -> AsmResult {
        let parts = split_args(args, ',', None);
        if parts.len() != 2 {
            return Err(self.error(format!(
                "Command '{command}' expects exactly two comma-separated arguments (reg, label), got {parts:?} instead."
            )));
        }
        let register = self.register(parts[0], &format!("first argument to {command}"))?;
        let label = self.label_name(parts[1], &format!("second argument to {command}"))?;
        self.forward(
            label,
            Continuation::LoadAddress {
                command: command.to_string(),
                register,
                long,
            },
        )
    }

    pub(super) fn load_label_address(
        &mut self,
        command: &str,
        register: u8,
        long: bool,
        label: &str,
        info: LabelInfo,
    ) -> AsmResult {
        let address = i64::from(info.offset);
        let signed = mod_s16(address);
        if long {
            if -128 + LONG_BRANCH_SLACK < signed && signed < 127 - LONG_BRANCH_SLACK {
                self.warn(format!(
                    "Pseudo-instruction '{command}' always needs two instructions, but label \
                     {label}=0x{address:04X} fits into one. Try using 'la' instead."
                ));
            }
            return self.push_words(&[
                encode_load_low(register, address),
                encode_load_high_byte(register, (address >> 8) as u8),
            ]);
        }
        if !SHORT_LOAD_RANGE.contains(&signed) {
            return Err(self.error(format!(
                "Command '{command}' can only load addresses in [-128, 127] (read as signed \
                 16-bit), but label {label} is at 0x{address:04X}. Try using 'lla' instead."
            )));
        }
        self.push_word(encode_load_low(register, address))
    }
}
