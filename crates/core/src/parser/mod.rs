//! Line splitting and operand parsing.
//!
//! Every parser reports failure as a ready-to-log message naming the
//! operand's context; the assembler decides whether to keep it.

mod numbers;
mod operands;
mod registers;

pub use operands::{
    ArgKind, LABEL_FORBIDDEN_CHARS, Operand, parse_immediate, parse_label, parse_one_of,
};
pub use registers::parse_register;

/// Drops everything from the first `#` and surrounding whitespace.
pub fn strip_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(code, _)| code).trim()
}

/// Splits a stripped line into its mnemonic and the raw, untrimmed remainder.
pub fn split_command(line: &str) -> (&str, &str) {
    line.split_once(' ').unwrap_or((line, ""))
}

/// Splits `args` on `separator` at most `max_splits` times (unbounded for
/// `None`) and trims every piece. An empty input yields one empty piece.
pub fn split_args(args: &str, separator: char, max_splits: Option<usize>) -> Vec<&str> {
    match max_splits {
        Some(max_splits) => args.splitn(max_splits + 1, separator).map(str::trim).collect(),
        None => args.split(separator).map(str::trim).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_anywhere() {
        assert_eq!(strip_comment("  lw r1, 5 # load"), "lw r1, 5");
        assert_eq!(strip_comment("# only a comment"), "");
        assert_eq!(strip_comment("ret#no space"), "ret");
        assert_eq!(strip_comment("   "), "");
    }

    #[test]
    fn keeps_remainder_raw() {
        assert_eq!(split_command("add r1    r2"), ("add", "r1    r2"));
        assert_eq!(split_command("ret"), ("ret", ""));
        assert_eq!(split_command("ret "), ("ret", ""));
    }

    #[test]
    fn splits_like_bounded_separators() {
        assert_eq!(split_args("", ',', None), vec![""]);
        assert_eq!(split_args("r1, r2 ,r3", ',', None), vec!["r1", "r2", "r3"]);
        assert_eq!(split_args("r1   r2", ' ', Some(1)), vec!["r1", "r2"]);
        assert_eq!(split_args("r1 r2 _far away", ' ', Some(2)), vec!["r1", "r2", "_far away"]);
        assert_eq!(split_args("r1", ' ', Some(1)), vec!["r1"]);
    }
}
