pub mod assembler;
pub mod diag;
pub mod driver;
pub mod listing;
pub mod parser;
pub mod span;

pub use assembler::{Assembled, Assembler, sha256_hex};
pub use diag::{Diagnostic, RenderOptions, Severity};
pub use driver::{CompileError, CompileOutput, compile_source, compile_source_with_options};
pub use listing::render_listing;
