use tvmasm_isa::{
    BinaryOp, Condition, MemoryOp, Special, UnaryOp, encode_binary, encode_branch, encode_compare,
    encode_jump, encode_jump_high, encode_jump_register, encode_load_high, encode_load_immediate,
    encode_memory, encode_unary, mod_s16,
};

use super::forward::Continuation;
use super::{AsmResult, Assembler, LONG_BRANCH_SLACK, LabelInfo};
use crate::parser::{ArgKind, Operand, split_args};

impl Assembler {
    pub(super) fn niladic(&mut self, command: &str, args: &str, op: Special) -> AsmResult {
        if !args.is_empty() {
            return Err(self.error(format!(
                "Command '{command}' does not take any arguments (expected end of line, found '{args}' instead)"
            )));
        }
        self.push_word(op.code())
    }

    pub(super) fn store(&mut self, command: &str, args: &str) -> AsmResult {
        let parts = split_args(args, ',', None);
        if parts.len() != 2 {
            return Err(self.error(format!(
                "Command '{command}' expects exactly two comma-separated arguments, got {parts:?} instead."
            )));
        }
        let address = self.register(parts[0], &format!("first argument to {command}"))?;
        let value = self.register(parts[1], &format!("second argument to {command}"))?;
        self.push_word(encode_memory(MemoryOp::Store, address, value))
    }

    /// `lw VAL, ADDR` reads memory; `lw VAL, IMM` loads a constant.
    pub(super) fn load_word(&mut self, command: &str, args: &str) -> AsmResult {
        let parts = split_args(args, ',', None);
        if parts.len() != 2 {
            return Err(self.error(format!(
                "Command '{command}' expects exactly two arguments, got {parts:?} instead."
            )));
        }
        let value = self.register(parts[0], &format!("first argument to {command}"))?;
        let source = self.operand(
            &[ArgKind::Register, ArgKind::Immediate],
            parts[1],
            &format!("second argument to {command}"),
        )?;
        match source {
            Operand::Register(address) => {
                self.push_word(encode_memory(MemoryOp::LoadData, address, value))
            }
            Operand::Immediate(immediate) => {
                let words = self.encoded(command, encode_load_immediate(value, immediate))?;
                self.push_words(&words)
            }
            Operand::Label(_) => unreachable!("labels are not accepted by {command}"),
        }
    }

    pub(super) fn load_instruction(&mut self, command: &str, args: &str) -> AsmResult {
        let parts = split_args(args, ',', None);
        if parts.len() != 2 {
            return Err(self.error(format!(
                "Command '{command}' expects exactly two arguments, got {parts:?} instead."
            )));
        }
        let value = self.register(parts[0], &format!("first argument to {command}"))?;
        let address = self.register(parts[1], &format!("second argument to {command}"))?;
        self.push_word(encode_memory(MemoryOp::LoadInstruction, address, value))
    }

    pub(super) fn load_high(&mut self, command: &str, args: &str) -> AsmResult {
        let parts = split_args(args, ',', None);
        if parts.len() != 2 {
            return Err(self.error(format!(
                "Command '{command}' expects exactly two arguments, got {parts:?} instead."
            )));
        }
        let register = self.register(parts[0], &format!("first argument to {command}"))?;
        let immediate = self.immediate(parts[1], &format!("second argument to {command}"))?;
        let word = self.encoded(command, encode_load_high(register, immediate))?;
        self.push_word(word)
    }

    /// Returns `(destination, source)`; a single register means in-place.
    fn unary_registers(&mut self, command: &str, args: &str) -> AsmResult<(u8, u8)> {
        let parts = split_args(args, ',', None);
        if parts == [""] {
            return Err(self.error(format!(
                "Command '{command}' expects either one or two register arguments, got none instead."
            )));
        }
        if parts.len() > 2 {
            return Err(self.error(format!(
                "Command '{command}' expects either one or two register arguments, got {parts:?} instead."
            )));
        }
        let mut registers = Vec::with_capacity(2);
        for (index, part) in parts.iter().enumerate() {
            let context = format!("argument #{} (1-indexed) to {command}", index + 1);
            registers.push(self.register(part, &context)?);
        }
        let destination = registers[0];
        let source = registers.get(1).copied().unwrap_or(destination);
        Ok((destination, source))
    }

    pub(super) fn unary(&mut self, command: &str, args: &str, op: UnaryOp) -> AsmResult {
        let (destination, source) = self.unary_registers(command, args)?;
        self.push_word(encode_unary(op, destination, source))
    }

    pub(super) fn mov(&mut self, command: &str, args: &str) -> AsmResult {
        let (destination, source) = self.unary_registers(command, args)?;
        if destination == source {
            return Err(self.error(format!(
                "Refusing noop-mov: This does nothing, and is likely an error. \
                 Use '.word 5F{source:X}{destination:X}' or 'nop' instead."
            )));
        }
        self.push_word(encode_unary(UnaryOp::Mov, destination, source))
    }

    /// Binary and compare operands are space-separated, unlike memory ops.
    fn binary_registers(
        &mut self,
        command: &str,
        args: &str,
        allow_duplicate: bool,
    ) -> AsmResult<(u8, u8)> {
        let parts = split_args(args, ' ', Some(1));
        if parts.len() != 2 {
            return Err(self.error(format!(
                "Command '{command}' expects exactly two space-separated register arguments, got {parts:?} instead."
            )));
        }
        let lhs = self.register(parts[0], &format!("argument #1 (1-indexed) to {command}"))?;
        let rhs = self.register(parts[1], &format!("argument #2 (1-indexed) to {command}"))?;
        if !allow_duplicate && lhs == rhs {
            return Err(self.error(format!(
                "Command '{command}' requires two different registers to be used, got {parts:?} instead."
            )));
        }
        Ok((lhs, rhs))
    }

    pub(super) fn binary(&mut self, command: &str, args: &str, op: BinaryOp) -> AsmResult {
        let (lhs, rhs) = self.binary_registers(command, args, true)?;
        self.push_word(encode_binary(op, lhs, rhs))
    }

    pub(super) fn compare(&mut self, command: &str, args: &str, condition: Condition) -> AsmResult {
        let (lhs, rhs) = self.binary_registers(command, args, false)?;
        self.push_word(encode_compare(condition, lhs, rhs))
    }

    pub(super) fn branch(&mut self, command: &str, args: &str) -> AsmResult {
        let parts = split_args(args, ' ', Some(1));
        if parts.len() != 2 {
            return Err(self.error(format!(
                "Command '{command}' expects a register and a target separated by a space, got {parts:?} instead."
            )));
        }
        let register = self.register(parts[0], &format!("first argument to {command}"))?;
        let context = format!("second argument to {command}");
        self.branch_to_operand(command, register, parts[1], &context)
    }

    /// Short branch on `register` to an immediate offset or a label.
    pub(super) fn branch_to_operand(
        &mut self,
        command: &str,
        register: u8,
        raw: &str,
        context: &str,
    ) -> AsmResult {
        match self.operand(&[ArgKind::Immediate, ArgKind::Label], raw, context)? {
            Operand::Immediate(offset) => self.emit_branch(command, register, offset),
            Operand::Label(label) => self.forward(
                label,
                Continuation::Branch {
                    command: command.to_string(),
                    register,
                },
            ),
            Operand::Register(_) => unreachable!("registers are not branch targets"),
        }
    }

    pub(super) fn emit_branch(&mut self, command: &str, register: u8, offset: i64) -> AsmResult {
        let word = self.encoded(command, encode_branch(register, offset))?;
        self.push_word(word)
    }

    pub(super) fn branch_to_label(
        &mut self,
        command: &str,
        register: u8,
        label: &str,
        info: LabelInfo,
    ) -> AsmResult {
        let offset = mod_s16(i64::from(info.offset) - i64::from(self.pointer));
        let context = format!(
            "{command} (to label {label}=0x{:04X}, defined in line {})",
            info.offset, info.line
        );
        self.emit_branch(&context, register, offset)
    }

    /// Long forms pass `allow_short = false` to get the slack warning.
    pub(super) fn emit_jump(&mut self, command: &str, offset: i64, allow_short: bool) -> AsmResult {
        let word = self.encoded(command, encode_jump(offset))?;
        if !allow_short && -128 + LONG_BRANCH_SLACK < offset && offset < 129 - LONG_BRANCH_SLACK {
            self.warn(format!(
                "Pseudo-instruction '{command}' supports jumps in the range [-2048, 2049], but was \
                 used for just a short offset of {offset}. Try using the non-long version, which \
                 uses fewer instructions."
            ));
        }
        self.push_word(word)
    }

    pub(super) fn jump_to_label(
        &mut self,
        command: &str,
        label: &str,
        info: LabelInfo,
        extra: i64,
        allow_short: bool,
    ) -> AsmResult {
        let destination = i64::from(info.offset) + extra;
        let delta = mod_s16(destination - i64::from(self.pointer));
        let context = format!("{command} (to {label} {extra:+} = by {delta:+})");
        self.emit_jump(&context, delta, allow_short)
    }

    fn jump_register(&mut self, command: &str, register: u8, offset: i64) -> AsmResult {
        let word = self.encoded(command, encode_jump_register(register, offset))?;
        self.push_word(word)
    }

    /// `j REG|IMM|LABEL` or `j REG|LABEL IMM`.
    pub(super) fn jump(&mut self, command: &str, args: &str) -> AsmResult {
        let args = args.trim();
        match args.split_once(' ') {
            None => self.jump_one_arg(command, args),
            Some((target, offset)) => self.jump_two_args(command, target, offset),
        }
    }

    fn jump_one_arg(&mut self, command: &str, arg: &str) -> AsmResult {
        if arg.is_empty() {
            return Err(self.error(format!(
                "Command '{command}' expects either one or two arguments, got none instead."
            )));
        }
        let kinds = [ArgKind::Register, ArgKind::Immediate, ArgKind::Label];
        let context = format!("first argument of one-arg-{command}");
        let Ok(target) = self.operand(&kinds, arg, &context) else {
            return Err(self.error(format!(
                "Command '{command}' with a single argument expects either immediate, register, \
                 or label, got '{arg}' instead. Note that offsets have to use a space, like 'r4 +5'."
            )));
        };
        match target {
            Operand::Register(register) => self.jump_register(command, register, 0),
            Operand::Immediate(offset) => self.emit_jump(command, offset, true),
            Operand::Label(label) => self.forward(
                label,
                Continuation::Jump {
                    command: command.to_string(),
                    extra: 0,
                    allow_short: true,
                },
            ),
        }
    }

    fn jump_two_args(&mut self, command: &str, target: &str, offset: &str) -> AsmResult {
        let kinds = [ArgKind::Register, ArgKind::Label];
        let context = format!("first argument to two-arg-{command}");
        let Ok(target_operand) = self.operand(&kinds, target, &context) else {
            return Err(self.error(format!(
                "Command '{command}' with two arguments expects either register or label for \
                 first argument, got '{target}' instead. Note that offsets have to use a space, \
                 like 'r4 +5'."
            )));
        };
        let offset = self.immediate(offset, &format!("second argument to two-arg-{command}"))?;
        match target_operand {
            Operand::Register(register) => self.jump_register(command, register, offset),
            Operand::Label(label) => self.forward(
                label,
                Continuation::Jump {
                    command: command.to_string(),
                    extra: offset,
                    allow_short: true,
                },
            ),
            Operand::Immediate(_) => unreachable!("immediates are not jump bases"),
        }
    }

    /// `jhi REG IMM|LABEL` sets the high byte of the jump target.
    pub(super) fn jump_high(&mut self, command: &str, args: &str) -> AsmResult {
        let parts = split_args(args, ' ', Some(1));
        if parts.len() != 2 {
            return Err(self.error(format!(
                "Command '{command}' expects a register and a page address separated by a space, got {parts:?} instead."
            )));
        }
        let register = self.register(parts[0], &format!("first argument to {command}"))?;
        let context = format!("second argument to {command}");
        match self.operand(&[ArgKind::Immediate, ArgKind::Label], parts[1], &context)? {
            Operand::Immediate(target) => {
                let word = self.encoded(command, encode_jump_high(register, target))?;
                self.push_word(word)
            }
            Operand::Label(label) => self.forward(
                label,
                Continuation::JumpHigh {
                    command: command.to_string(),
                    register,
                },
            ),
            Operand::Register(_) => unreachable!("registers are not page addresses"),
        }
    }

    pub(super) fn jump_high_to_label(
        &mut self,
        command: &str,
        register: u8,
        label: &str,
        info: LabelInfo,
    ) -> AsmResult {
        let context = format!("{command} (to label {label}=0x{:04X})", info.offset);
        let word = self.encoded(&context, encode_jump_high(register, i64::from(info.offset)))?;
        self.push_word(word)
    }
}
