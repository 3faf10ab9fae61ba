use tvmasm_isa::WORD_RANGE;

use super::numbers::{Integer, parse_integer};
use super::registers::parse_register;

pub const LABEL_FORBIDDEN_CHARS: &str = "$%&()='\"[]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Register,
    Immediate,
    Label,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Register(u8),
    Immediate(i64),
    Label(String),
}

/// Accepts any value readable as either a signed or an unsigned 16-bit word.
pub fn parse_immediate(text: &str, context: &str) -> Result<i64, String> {
    let value = match parse_integer(text, true) {
        Some(Integer::Value(value)) => value,
        Some(Integer::TooLarge) => {
            return Err(format!(
                "Immediate value {} in {context} is out of bounds [-0x8000, 0xFFFF]",
                text.trim()
            ));
        }
        None => {
            return Err(format!(
                "Cannot parse immediate for {context}: Expected integer number, instead got \
                 '{text}'. Try something like '42', '0xABCD', or '-0x123' instead."
            ));
        }
    };
    match i64::try_from(value) {
        Ok(word) if WORD_RANGE.contains(&word) => Ok(word),
        _ => {
            let sign = if value < 0 { '-' } else { '+' };
            Err(format!(
                "Immediate value {value} (hex: {sign}{:04X}) in {context} is out of bounds \
                 [-0x8000, 0xFFFF]",
                value.unsigned_abs()
            ))
        }
    }
}

/// Structural check only; whether the label exists is decided later.
pub fn parse_label(text: &str, context: &str) -> Result<String, String> {
    if !text.starts_with('_') || text.chars().count() < 2 {
        return Err(format!(
            "Label name for {context} must start with a '_' and contain at least two \
             characters, found name '{text}' instead"
        ));
    }
    if text.chars().any(|ch| LABEL_FORBIDDEN_CHARS.contains(ch)) {
        return Err(format!(
            "Label name for {context} must not contain any special characters \
             ({LABEL_FORBIDDEN_CHARS}), found name '{text}' instead"
        ));
    }
    Ok(text.to_string())
}

/// Tries `kinds` in register, immediate, label order. On success every
/// sub-attempt message is dropped; on failure all of them are returned in
/// attempt order.
pub fn parse_one_of(kinds: &[ArgKind], text: &str, context: &str) -> Result<Operand, Vec<String>> {
    let mut errors = Vec::new();
    if kinds.contains(&ArgKind::Register) {
        match parse_register(text, context) {
            Ok(register) => return Ok(Operand::Register(register)),
            Err(message) => errors.push(message),
        }
    }
    if kinds.contains(&ArgKind::Immediate) {
        match parse_immediate(text, context) {
            Ok(value) => return Ok(Operand::Immediate(value)),
            Err(message) => errors.push(message),
        }
    }
    if kinds.contains(&ArgKind::Label) {
        match parse_label(text, context) {
            Ok(name) => return Ok(Operand::Label(name)),
            Err(message) => errors.push(message),
        }
    }
    assert!(!errors.is_empty(), "operand parse needs at least one kind");
    Err(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediates_cover_both_word_readings() {
        assert_eq!(parse_immediate("-0x8000", "test"), Ok(-0x8000));
        assert_eq!(parse_immediate("0xFFFF", "test"), Ok(0xFFFF));
        assert_eq!(parse_immediate("+5", "test"), Ok(5));
    }

    #[test]
    fn out_of_bounds_immediates_show_signed_hex() {
        let low = parse_immediate("-0x8001", "second argument to lw").unwrap_err();
        assert_eq!(
            low,
            "Immediate value -32769 (hex: -8001) in second argument to lw is out of bounds [-0x8000, 0xFFFF]"
        );
        let high = parse_immediate("65536", "argument of .word").unwrap_err();
        assert!(high.contains("(hex: +10000)"));
    }

    #[test]
    fn huge_immediates_are_reported_as_written() {
        let wide = parse_immediate("99999999999999999999999", "argument of .word").unwrap_err();
        assert_eq!(
            wide,
            "Immediate value 99999999999999999999999 (hex: +152D02C7E14AF67FFFFF) in argument \
             of .word is out of bounds [-0x8000, 0xFFFF]"
        );

        let nines = format!("-{}", "9".repeat(50));
        let huge = parse_immediate(&nines, "second argument to lw").unwrap_err();
        assert_eq!(
            huge,
            format!(
                "Immediate value {nines} in second argument to lw is out of bounds \
                 [-0x8000, 0xFFFF]"
            )
        );
    }

    #[test]
    fn label_rules() {
        assert_eq!(parse_label("_a", "test"), Ok("_a".to_string()));
        assert_eq!(parse_label("_some_label", "test"), Ok("_some_label".to_string()));
        assert!(parse_label("_", "test").is_err());
        assert!(parse_label("a_", "test").is_err());
        assert!(parse_label("", "test").is_err());
        for forbidden in LABEL_FORBIDDEN_CHARS.chars() {
            let name = format!("_x{forbidden}");
            let message = parse_label(&name, "test").unwrap_err();
            assert!(message.contains("special characters"), "{name}: {message}");
        }
    }

    #[test]
    fn first_matching_kind_wins() {
        let all = [ArgKind::Register, ArgKind::Immediate, ArgKind::Label];
        assert_eq!(parse_one_of(&all, "r3", "test"), Ok(Operand::Register(3)));
        assert_eq!(parse_one_of(&all, "-4", "test"), Ok(Operand::Immediate(-4)));
        assert_eq!(
            parse_one_of(&all, "_loop", "test"),
            Ok(Operand::Label("_loop".to_string()))
        );
    }

    #[test]
    fn failure_keeps_every_attempt_in_order() {
        let all = [ArgKind::Register, ArgKind::Immediate, ArgKind::Label];
        let errors = parse_one_of(&all, "?", "ctx").unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("Cannot parse register for ctx"));
        assert!(errors[1].starts_with("Cannot parse immediate for ctx"));
        assert!(errors[2].starts_with("Label name for ctx"));

        let errors = parse_one_of(&[ArgKind::Immediate, ArgKind::Label], "r1", "ctx").unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
