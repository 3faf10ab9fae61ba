use std::ops::RangeInclusive;

use thiserror::Error;

pub const SEGMENT_WORDS: usize = 1 << 16;
pub const SEGMENT_BYTES: usize = SEGMENT_WORDS * 2;

/// Largest value any single-word operand may name, in either reading.
pub const WORD_RANGE: RangeInclusive<i64> = -0x8000..=0xFFFF;

pub const BRANCH_RANGE: RangeInclusive<i64> = -128..=129;
pub const JUMP_RANGE: RangeInclusive<i64> = -2048..=2049;
pub const REGISTER_JUMP_RANGE: RangeInclusive<i64> = -128..=127;
pub const SHORT_LOAD_RANGE: RangeInclusive<i64> = -0x80..=0x7F;

/// Relative offsets at or above this value are negative numbers written as
/// unsigned words, which is almost certainly not what the author meant.
pub const AMBIGUOUS_OFFSET: i64 = 0xFF80;

/// Wraps `value` into the signed 16-bit range `[-0x8000, 0x7FFF]`.
pub fn mod_s16(value: i64) -> i64 {
    (value + 0x8000).rem_euclid(0x1_0000) - 0x8000
}

macro_rules! opcode_enum {
    ($name:ident { $($variant:ident => ($mnemonic:literal, $code:literal)),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $($name::$variant => $mnemonic),+
                }
            }

            pub const fn code(self) -> u16 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn from_code(code: u16) -> Option<Self> {
                Self::ALL.iter().copied().find(|op| op.code() == code)
            }
        }
    };
}

opcode_enum!(Special {
    Ret => ("ret", 0x102A),
    Cpuid => ("cpuid", 0x102B),
    Debug => ("debug", 0x102C),
    Time => ("time", 0x102D),
    Yield => ("yield", 0x102E),
    Nop => ("nop", 0x5F00),
    Ill => ("ill", 0xFFFF),
});

opcode_enum!(MemoryOp {
    Store => ("sw", 0x2000),
    LoadData => ("lw", 0x2100),
    LoadInstruction => ("lwi", 0x2200),
});

opcode_enum!(UnaryOp {
    Decr => ("decr", 0x5800),
    Incr => ("incr", 0x5900),
    Not => ("not", 0x5A00),
    Popcnt => ("popcnt", 0x5B00),
    Clz => ("clz", 0x5C00),
    Ctz => ("ctz", 0x5D00),
    Rnd => ("rnd", 0x5E00),
    Mov => ("mov", 0x5F00),
});

opcode_enum!(BinaryOp {
    Add => ("add", 0x6000),
    Sub => ("sub", 0x6100),
    Mul => ("mul", 0x6200),
    Mulh => ("mulh", 0x6300),
    Divu => ("divu", 0x6400),
    Divs => ("divs", 0x6500),
    Modu => ("modu", 0x6600),
    Mods => ("mods", 0x6700),
    And => ("and", 0x6800),
    Or => ("or", 0x6900),
    Xor => ("xor", 0x6A00),
    Sl => ("sl", 0x6B00),
    Srl => ("srl", 0x6C00),
    Sra => ("sra", 0x6D00),
});

// Compare words are 0x8000 | L E G S << 8. LEGS=000_ and LEGS=111_ are
// constants and have no mnemonic; signed equality is meaningless.
opcode_enum!(Condition {
    Gt => ("gt", 0x8200),
    Gts => ("gts", 0x8300),
    Eq => ("eq", 0x8400),
    Ge => ("ge", 0x8600),
    Ges => ("ges", 0x8700),
    Lt => ("lt", 0x8800),
    Lts => ("lts", 0x8900),
    Ne => ("ne", 0x8A00),
    Le => ("le", 0x8C00),
    Les => ("les", 0x8D00),
});

impl Condition {
    /// Flips L, E and G while keeping the signedness bit.
    pub fn inverted(self) -> Condition {
        Condition::from_code(self.code() ^ 0x0E00)
            .expect("every condition has an inverse with the same signedness")
    }
}

const LOAD_LOW: u16 = 0x3000;
const LOAD_HIGH: u16 = 0x4000;
const BRANCH: u16 = 0x9000;
const JUMP: u16 = 0xA000;
const JUMP_REGISTER: u16 = 0xB000;
const JUMP_HIGH: u16 = 0xC000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("immediate value {value} is out of bounds [-0x8000, 0xFFFF]")]
    ImmediateOutOfRange { value: i64 },
    #[error("cannot use the ambiguous offset 0x{offset:04X}. Try a value in [-128, 129] instead.")]
    AmbiguousBranchOffset { offset: i64 },
    #[error(
        "can only branch by offsets in [-128, 129], but not by {offset}. Try using 'j' instead, which supports larger jumps, or an 'lb*' pseudo-instruction."
    )]
    BranchOutOfRange { offset: i64 },
    #[error("cannot encode an infinite loop (offset 0). Try using 'j reg' instead.")]
    BranchInfiniteLoop,
    #[error("cannot encode the nop-branch (offset 1). Try using 'nop' instead.")]
    BranchNop,
    #[error("cannot use the ambiguous offset 0x{offset:04X}. Note that this value is relative.")]
    AmbiguousJumpOffset { offset: i64 },
    #[error(
        "can only jump by offsets in [-2048, 2049], but not by {offset}. Try manually loading the address into a register first."
    )]
    JumpOutOfRange { offset: i64 },
    #[error("cannot encode an infinite loop (offset 0). Try jumping to a register instead.")]
    JumpInfiniteLoop,
    #[error("cannot encode the nop-jump (offset 1). Try using 'nop' instead.")]
    JumpNop,
    #[error(
        "cannot use the ambiguous offset 0x{offset:04X}. Note that this value is relative and signed."
    )]
    AmbiguousRegisterOffset { offset: i64 },
    #[error(
        "can only jump by offsets in [-128, 127] from a register, but not by {offset}. Try manually loading the final address into a register first."
    )]
    RegisterJumpOutOfRange { offset: i64 },
    #[error(
        "cannot load the high byte of negative word {value}. Specify the byte as a positive number instead."
    )]
    NegativeHighByte { value: i64 },
    #[error(
        "cannot load the high byte of the two-byte word 0x{value:04X}. Specify the byte either as 0xAB00 or as 0xAB instead."
    )]
    AmbiguousHighByte { value: i64 },
    #[error("can only jump to multiples of 256 in [0, 0xFF00], but not to {value}")]
    MisalignedJumpHigh { value: i64 },
}

pub fn encode_memory(op: MemoryOp, address: u8, value: u8) -> u16 {
    op.code() | (u16::from(address & 0xF) << 4) | u16::from(value & 0xF)
}

pub fn encode_load_low(register: u8, value: i64) -> u16 {
    LOAD_LOW | (u16::from(register & 0xF) << 8) | (value & 0xFF) as u16
}

pub fn encode_load_high_byte(register: u8, high_byte: u8) -> u16 {
    LOAD_HIGH | (u16::from(register & 0xF) << 8) | u16::from(high_byte)
}

/// `lw REG, IMM`: one word when the sign-extended low byte already equals the
/// value, otherwise the low byte followed by the high byte.
pub fn encode_load_immediate(register: u8, value: i64) -> Result<Vec<u16>, EncodeError> {
    if !WORD_RANGE.contains(&value) {
        return Err(EncodeError::ImmediateOutOfRange { value });
    }
    if SHORT_LOAD_RANGE.contains(&value) || (0xFF80..=0xFFFF).contains(&value) {
        return Ok(vec![encode_load_low(register, value)]);
    }
    let high_byte = ((value & 0xFF00) >> 8) as u8;
    Ok(vec![
        encode_load_low(register, value),
        encode_load_high_byte(register, high_byte),
    ])
}

/// `lhi REG, IMM` accepts either the byte itself or the byte already shifted
/// into the high half.
pub fn encode_load_high(register: u8, value: i64) -> Result<u16, EncodeError> {
    if value < 0 {
        return Err(EncodeError::NegativeHighByte { value });
    }
    let byte = if value > 0xFF {
        if value & 0xFF != 0 || value > 0xFFFF {
            return Err(EncodeError::AmbiguousHighByte { value });
        }
        value >> 8
    } else {
        value
    };
    Ok(encode_load_high_byte(register, byte as u8))
}

/// The written-to register sits in the low nibble.
pub fn encode_unary(op: UnaryOp, destination: u8, source: u8) -> u16 {
    op.code() | (u16::from(source & 0xF) << 4) | u16::from(destination & 0xF)
}

pub fn encode_binary(op: BinaryOp, lhs: u8, rhs: u8) -> u16 {
    op.code() | (u16::from(lhs & 0xF) << 4) | u16::from(rhs & 0xF)
}

pub fn encode_compare(condition: Condition, lhs: u8, rhs: u8) -> u16 {
    condition.code() | (u16::from(lhs & 0xF) << 4) | u16::from(rhs & 0xF)
}

/// Packs a relative offset as sign bit plus magnitude, where `+2` and `-1`
/// are the smallest encodable steps.
fn sign_magnitude(offset: i64, sign_bit: u16) -> u16 {
    if offset < 0 {
        sign_bit | (-offset - 1) as u16
    } else {
        (offset - 2) as u16
    }
}

pub fn encode_branch(register: u8, offset: i64) -> Result<u16, EncodeError> {
    if offset >= AMBIGUOUS_OFFSET {
        return Err(EncodeError::AmbiguousBranchOffset { offset });
    }
    if !BRANCH_RANGE.contains(&offset) {
        return Err(EncodeError::BranchOutOfRange { offset });
    }
    match offset {
        0 => Err(EncodeError::BranchInfiniteLoop),
        1 => Err(EncodeError::BranchNop),
        _ => Ok(BRANCH | (u16::from(register & 0xF) << 8) | sign_magnitude(offset, 0x80)),
    }
}

pub fn encode_jump(offset: i64) -> Result<u16, EncodeError> {
    if offset >= AMBIGUOUS_OFFSET {
        return Err(EncodeError::AmbiguousJumpOffset { offset });
    }
    if !JUMP_RANGE.contains(&offset) {
        return Err(EncodeError::JumpOutOfRange { offset });
    }
    match offset {
        0 => Err(EncodeError::JumpInfiniteLoop),
        1 => Err(EncodeError::JumpNop),
        _ => Ok(JUMP | sign_magnitude(offset, 0x0800)),
    }
}

pub fn encode_jump_register(register: u8, offset: i64) -> Result<u16, EncodeError> {
    if offset >= AMBIGUOUS_OFFSET {
        return Err(EncodeError::AmbiguousRegisterOffset { offset });
    }
    if !REGISTER_JUMP_RANGE.contains(&offset) {
        return Err(EncodeError::RegisterJumpOutOfRange { offset });
    }
    Ok(JUMP_REGISTER | (u16::from(register & 0xF) << 8) | (offset & 0xFF) as u16)
}

pub fn encode_jump_high(register: u8, target: i64) -> Result<u16, EncodeError> {
    if !(0..=0xFF00).contains(&target) || target & 0xFF != 0 {
        return Err(EncodeError::MisalignedJumpHigh { value: target });
    }
    Ok(JUMP_HIGH | (u16::from(register & 0xF) << 8) | (target >> 8) as u16)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Special(Special),
    Memory { op: MemoryOp, address: u8, value: u8 },
    LoadLow { register: u8, byte: u8 },
    LoadHigh { register: u8, byte: u8 },
    Unary { op: UnaryOp, destination: u8, source: u8 },
    Binary { op: BinaryOp, lhs: u8, rhs: u8 },
    Compare { condition: Condition, lhs: u8, rhs: u8 },
    Branch { register: u8, offset: i64 },
    Jump { offset: i64 },
    JumpRegister { register: u8, offset: i8 },
    JumpHigh { register: u8, byte: u8 },
    Data(u16),
}

pub fn decode_word(word: u16) -> Instruction {
    if let Some(special) = Special::from_code(word) {
        return Instruction::Special(special);
    }

    let high = word & 0xFF00;
    let nibble = ((word & 0x0F00) >> 8) as u8;
    let left = ((word & 0x00F0) >> 4) as u8;
    let right = (word & 0x000F) as u8;
    let byte = (word & 0x00FF) as u8;

    if let Some(op) = MemoryOp::from_code(high) {
        return Instruction::Memory {
            op,
            address: left,
            value: right,
        };
    }
    if let Some(op) = UnaryOp::from_code(high) {
        return Instruction::Unary {
            op,
            destination: right,
            source: left,
        };
    }
    if let Some(op) = BinaryOp::from_code(high) {
        return Instruction::Binary {
            op,
            lhs: left,
            rhs: right,
        };
    }
    if let Some(condition) = Condition::from_code(high) {
        return Instruction::Compare {
            condition,
            lhs: left,
            rhs: right,
        };
    }

    match word & 0xF000 {
        LOAD_LOW => Instruction::LoadLow {
            register: nibble,
            byte,
        },
        LOAD_HIGH => Instruction::LoadHigh {
            register: nibble,
            byte,
        },
        BRANCH => Instruction::Branch {
            register: nibble,
            offset: decode_sign_magnitude(i64::from(byte), 0x80),
        },
        JUMP => Instruction::Jump {
            offset: decode_sign_magnitude(i64::from(word & 0x0FFF), 0x800),
        },
        JUMP_REGISTER => Instruction::JumpRegister {
            register: nibble,
            offset: byte as i8,
        },
        JUMP_HIGH => Instruction::JumpHigh {
            register: nibble,
            byte,
        },
        _ => Instruction::Data(word),
    }
}

fn decode_sign_magnitude(raw: i64, sign_bit: i64) -> i64 {
    if raw & sign_bit != 0 {
        -(raw & (sign_bit - 1)) - 1
    } else {
        raw + 2
    }
}

/// Renders one decoded word; relative targets are resolved against `address`.
pub fn format_instruction(instruction: &Instruction, address: u16) -> String {
    let target = |offset: i64| (i64::from(address) + offset).rem_euclid(0x1_0000);
    match *instruction {
        Instruction::Special(special) => special.mnemonic().to_string(),
        Instruction::Memory { op, address, value } => match op {
            MemoryOp::Store => format!("sw r{address}, r{value}"),
            MemoryOp::LoadData | MemoryOp::LoadInstruction => {
                format!("{} r{value}, r{address}", op.mnemonic())
            }
        },
        Instruction::LoadLow { register, byte } => {
            let value = i16::from(byte as i8) as u16;
            format!("lw r{register}, 0x{value:04X}")
        }
        Instruction::LoadHigh { register, byte } => format!("lhi r{register}, 0x{byte:02X}00"),
        Instruction::Unary {
            op,
            destination,
            source,
        } => format!("{} r{destination}, r{source}", op.mnemonic()),
        Instruction::Binary { op, lhs, rhs } => format!("{} r{lhs} r{rhs}", op.mnemonic()),
        Instruction::Compare {
            condition,
            lhs,
            rhs,
        } => format!("{} r{lhs} r{rhs}", condition.mnemonic()),
        Instruction::Branch { register, offset } => {
            format!("b r{register} {offset:+} (0x{:04X})", target(offset))
        }
        Instruction::Jump { offset } => format!("j {offset:+} (0x{:04X})", target(offset)),
        Instruction::JumpRegister { register, offset } => format!("j r{register} {offset:+}"),
        Instruction::JumpHigh { register, byte } => format!("jhi r{register} 0x{byte:02X}00"),
        Instruction::Data(word) => format!(".word 0x{word:04X}"),
    }
}
