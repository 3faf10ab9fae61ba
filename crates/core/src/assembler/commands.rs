use std::sync::LazyLock;

use rustc_hash::FxHashMap;
use tracing::trace;
use tvmasm_isa::{BinaryOp, Condition, Special, UnaryOp};

use super::{AsmResult, Assembler};
use crate::parser::{split_command, strip_comment};

pub const SUGGESTION_LIMIT: usize = 3;
pub const SUGGESTION_CUTOFF: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handler {
    Niladic(Special),
    Store,
    LoadWord,
    LoadInstruction,
    LoadHigh,
    Unary(UnaryOp),
    Move,
    Binary(BinaryOp),
    Compare(Condition),
    CompareZero(Condition),
    Refuse(&'static str),
    Branch,
    BranchCompare(Condition),
    BranchZero(Condition),
    LongBranch,
    LongBranchCompare(Condition),
    LongBranchZero(Option<Condition>),
    Jump,
    JumpHigh,
    LoadAddress { long: bool },
    Offset,
    Word,
    Label,
    AssertHash,
}

#[derive(Debug, Clone, Copy)]
struct Command {
    name: &'static str,
    handler: Handler,
    hidden: bool,
}

macro_rules! cmd {
    ($name:literal, $handler:expr, hidden) => {
        Command {
            name: $name,
            handler: $handler,
            hidden: true,
        }
    };
    ($name:literal, $handler:expr) => {
        Command {
            name: $name,
            handler: $handler,
            hidden: false,
        }
    };
}

const COMMAND_TABLE: &[Command] = &[
    cmd!("ret", Handler::Niladic(Special::Ret)),
    cmd!("ill", Handler::Niladic(Special::Ill)),
    cmd!("cpuid", Handler::Niladic(Special::Cpuid)),
    cmd!("debug", Handler::Niladic(Special::Debug)),
    cmd!("time", Handler::Niladic(Special::Time)),
    cmd!("yield", Handler::Niladic(Special::Yield)),
    cmd!("nop", Handler::Niladic(Special::Nop)),
    cmd!("sw", Handler::Store),
    cmd!("lw", Handler::LoadWord),
    cmd!("lwi", Handler::LoadInstruction),
    cmd!("lhi", Handler::LoadHigh),
    cmd!("decr", Handler::Unary(UnaryOp::Decr)),
    cmd!("incr", Handler::Unary(UnaryOp::Incr)),
    cmd!("not", Handler::Unary(UnaryOp::Not)),
    cmd!("popcnt", Handler::Unary(UnaryOp::Popcnt)),
    cmd!("clz", Handler::Unary(UnaryOp::Clz)),
    cmd!("ctz", Handler::Unary(UnaryOp::Ctz)),
    cmd!("rnd", Handler::Unary(UnaryOp::Rnd)),
    cmd!("mov", Handler::Move),
    cmd!("add", Handler::Binary(BinaryOp::Add)),
    cmd!("sub", Handler::Binary(BinaryOp::Sub)),
    cmd!("mul", Handler::Binary(BinaryOp::Mul)),
    cmd!("mulh", Handler::Binary(BinaryOp::Mulh)),
    cmd!("divu", Handler::Binary(BinaryOp::Divu)),
    cmd!("divs", Handler::Binary(BinaryOp::Divs)),
    cmd!("modu", Handler::Binary(BinaryOp::Modu)),
    cmd!("mods", Handler::Binary(BinaryOp::Mods)),
    cmd!("and", Handler::Binary(BinaryOp::And)),
    cmd!("or", Handler::Binary(BinaryOp::Or)),
    cmd!("xor", Handler::Binary(BinaryOp::Xor)),
    cmd!("sl", Handler::Binary(BinaryOp::Sl)),
    cmd!("srl", Handler::Binary(BinaryOp::Srl)),
    cmd!("sra", Handler::Binary(BinaryOp::Sra)),
    cmd!("gt", Handler::Compare(Condition::Gt)),
    cmd!("eq", Handler::Compare(Condition::Eq)),
    cmd!("ge", Handler::Compare(Condition::Ge)),
    cmd!("lt", Handler::Compare(Condition::Lt)),
    cmd!("ne", Handler::Compare(Condition::Ne)),
    cmd!("le", Handler::Compare(Condition::Le)),
    cmd!("gts", Handler::Compare(Condition::Gts)),
    cmd!("ges", Handler::Compare(Condition::Ges)),
    cmd!("lts", Handler::Compare(Condition::Lts)),
    cmd!("les", Handler::Compare(Condition::Les)),
    cmd!(
        "gtz",
        Handler::Refuse(
            "Consider 'gtsz' for signed comparison, or 'nez' to check for inequality with zero."
        ),
        hidden
    ),
    cmd!(
        "lez",
        Handler::Refuse(
            "Consider 'lesz' for signed comparison, or 'eqz' to check for equality with zero."
        ),
        hidden
    ),
    cmd!("eqz", Handler::CompareZero(Condition::Eq)),
    cmd!("nez", Handler::CompareZero(Condition::Ne)),
    cmd!("gtsz", Handler::CompareZero(Condition::Gts)),
    cmd!("gesz", Handler::CompareZero(Condition::Ges)),
    cmd!("ltsz", Handler::CompareZero(Condition::Lts)),
    cmd!("lesz", Handler::CompareZero(Condition::Les)),
    cmd!("b", Handler::Branch),
    cmd!("bgt", Handler::BranchCompare(Condition::Gt)),
    cmd!("beq", Handler::BranchCompare(Condition::Eq)),
    cmd!("bge", Handler::BranchCompare(Condition::Ge)),
    cmd!("blt", Handler::BranchCompare(Condition::Lt)),
    cmd!("bne", Handler::BranchCompare(Condition::Ne)),
    cmd!("ble", Handler::BranchCompare(Condition::Le)),
    cmd!("bgts", Handler::BranchCompare(Condition::Gts)),
    cmd!("bges", Handler::BranchCompare(Condition::Ges)),
    cmd!("blts", Handler::BranchCompare(Condition::Lts)),
    cmd!("bles", Handler::BranchCompare(Condition::Les)),
    cmd!("beqz", Handler::BranchZero(Condition::Eq)),
    // The register already holds the truth value.
    cmd!("bnez", Handler::Branch),
    cmd!("bgtsz", Handler::BranchZero(Condition::Gts)),
    cmd!("bgesz", Handler::BranchZero(Condition::Ges)),
    cmd!("bltsz", Handler::BranchZero(Condition::Lts)),
    cmd!("blesz", Handler::BranchZero(Condition::Les)),
    cmd!("lb", Handler::LongBranch),
    cmd!("lbeq", Handler::LongBranchCompare(Condition::Eq)),
    cmd!("lbne", Handler::LongBranchCompare(Condition::Ne)),
    cmd!("lblt", Handler::LongBranchCompare(Condition::Lt)),
    cmd!("lble", Handler::LongBranchCompare(Condition::Le)),
    cmd!("lbgt", Handler::LongBranchCompare(Condition::Gt)),
    cmd!("lbge", Handler::LongBranchCompare(Condition::Ge)),
    cmd!("lblts", Handler::LongBranchCompare(Condition::Lts)),
    cmd!("lbles", Handler::LongBranchCompare(Condition::Les)),
    cmd!("lbgts", Handler::LongBranchCompare(Condition::Gts)),
    cmd!("lbges", Handler::LongBranchCompare(Condition::Ges)),
    cmd!("lbeqz", Handler::LongBranchZero(None)),
    cmd!("lbnez", Handler::LongBranchZero(Some(Condition::Ne))),
    cmd!("lbltsz", Handler::LongBranchZero(Some(Condition::Lts))),
    cmd!("lblesz", Handler::LongBranchZero(Some(Condition::Les))),
    cmd!("lbgtsz", Handler::LongBranchZero(Some(Condition::Gts))),
    cmd!("lbgesz", Handler::LongBranchZero(Some(Condition::Ges))),
    cmd!("j", Handler::Jump),
    cmd!("jhi", Handler::JumpHigh),
    cmd!("la", Handler::LoadAddress { long: false }),
    cmd!("lla", Handler::LoadAddress { long: true }),
    cmd!(".offset", Handler::Offset),
    cmd!(".word", Handler::Word),
    cmd!(".label", Handler::Label),
    cmd!(".assert_hash", Handler::AssertHash),
];

static COMMANDS: LazyLock<FxHashMap<&'static str, Command>> = LazyLock::new(|| {
    let mut commands = FxHashMap::default();
    for command in COMMAND_TABLE {
        let previous = commands.insert(command.name, *command);
        assert!(previous.is_none(), "duplicate mnemonic {}", command.name);
    }
    commands
});

/// Every mnemonic offered as a suggestion, sorted.
pub fn command_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = COMMAND_TABLE
        .iter()
        .filter(|command| !command.hidden)
        .map(|command| command.name)
        .collect();
    names.sort_unstable();
    names
}

/// Up to [`SUGGESTION_LIMIT`] candidates at least [`SUGGESTION_CUTOFF`]
/// similar to `word`, best first.
pub fn close_matches<'a>(
    word: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Vec<&'a str> {
    let mut scored: Vec<(f64, &'a str)> = candidates
        .into_iter()
        .map(|candidate| (strsim::normalized_levenshtein(word, candidate), candidate))
        .filter(|(score, _)| *score >= SUGGESTION_CUTOFF)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(SUGGESTION_LIMIT)
        .map(|(_, candidate)| candidate)
        .collect()
}

impl Assembler {
    /// Assembles one source line. `Err` means the compile must stop; the
    /// reason is already in the log.
    pub fn assemble_line(&mut self, line: &str, line_number: usize) -> AsmResult {
        self.line = line_number;
        let code = strip_comment(line);
        if code.is_empty() {
            return Ok(());
        }
        let (mnemonic, args) = split_command(code);
        trace!(line = line_number, mnemonic, args, "dispatch");

        let Some(command) = COMMANDS.get(mnemonic) else {
            let suggestions = close_matches(mnemonic, command_names());
            let message = match suggestions.len() {
                0 => format!("Command '{mnemonic}' not found."),
                1 => format!("Command '{mnemonic}' not found. Close match: {}", suggestions[0]),
                _ => format!(
                    "Command '{mnemonic}' not found. Close matches: {}",
                    suggestions.join(", ")
                ),
            };
            return Err(self.error(message));
        };

        match command.handler {
            Handler::Niladic(op) => self.niladic(mnemonic, args, op),
            Handler::Store => self.store(mnemonic, args),
            Handler::LoadWord => self.load_word(mnemonic, args),
            Handler::LoadInstruction => self.load_instruction(mnemonic, args),
            Handler::LoadHigh => self.load_high(mnemonic, args),
            Handler::Unary(op) => self.unary(mnemonic, args, op),
            Handler::Move => self.mov(mnemonic, args),
            Handler::Binary(op) => self.binary(mnemonic, args, op),
            Handler::Compare(condition) => self.compare(mnemonic, args, condition),
            Handler::CompareZero(condition) => self.compare_zero(mnemonic, args, condition),
            Handler::Refuse(advice) => self.refuse(mnemonic, advice),
            Handler::Branch => self.branch(mnemonic, args),
            Handler::BranchCompare(condition) => self.branch_compare(mnemonic, args, condition),
            Handler::BranchZero(condition) => self.branch_zero(mnemonic, args, condition),
            Handler::LongBranch => self.long_branch(mnemonic, args),
            Handler::LongBranchCompare(condition) => {
                self.long_branch_compare(mnemonic, args, condition)
            }
            Handler::LongBranchZero(condition) => self.long_branch_zero(mnemonic, args, condition),
            Handler::Jump => self.jump(mnemonic, args),
            Handler::JumpHigh => self.jump_high(mnemonic, args),
            Handler::LoadAddress { long } => self.load_address(mnemonic, args, long),
            Handler::Offset => self.directive_offset(mnemonic, args),
            Handler::Word => self.directive_word(mnemonic, args),
            Handler::Label => self.directive_label(mnemonic, args),
            Handler::AssertHash => self.directive_assert_hash(mnemonic, args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_no_duplicates() {
        assert_eq!(COMMANDS.len(), COMMAND_TABLE.len());
    }

    #[test]
    fn refused_mnemonics_are_never_suggested() {
        let names = command_names();
        assert!(!names.contains(&"gtz"));
        assert!(!names.contains(&"lez"));
        assert!(names.contains(&"gtsz"));
        assert!(names.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn close_matches_rank_by_similarity() {
        assert_eq!(close_matches("ad", command_names()).first(), Some(&"add"));
        assert!(close_matches("garbage", command_names()).is_empty());
        assert!(close_matches("lbeqzz", command_names()).len() <= SUGGESTION_LIMIT);
    }
}
