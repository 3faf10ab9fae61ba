use std::fmt::Write as _;

use tvmasm_isa::{decode_word, format_instruction};

use crate::driver::CompileOutput;

/// One row per written word, ascending by address:
/// `ADDR  WORD  disassembly ; line N: source`.
pub fn render_listing(output: &CompileOutput) -> String {
    let mut listing = String::new();
    for (&address, &line) in &output.line_map {
        let index = usize::from(address) * 2;
        let word = u16::from_be_bytes([output.segment[index], output.segment[index + 1]]);
        let disassembly = format_instruction(&decode_word(word), address);
        let source = output.source.line_text(line).unwrap_or("").trim();
        let _ = writeln!(
            listing,
            "{address:04X}  {word:04X}  {disassembly:<28} ; line {line}: {source}"
        );
    }
    listing
}
