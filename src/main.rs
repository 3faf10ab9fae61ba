use std::path::PathBuf;
use std::{env, io, io::IsTerminal};

use anyhow::Context;
use clap::Parser;
use tracing::Level;
use tvmasm_core::{RenderOptions, compile_source_with_options, render_listing};

#[derive(Debug, Parser)]
#[command(
    name = "tvmasm",
    version,
    about = "Assembler for the tinyvm 16-bit word machine",
    long_about = None,
    after_help = "Examples:\n  tvmasm bot.asm bot.segment\n  tvmasm bot.asm bot.segment --listing bot.lst --pretty"
)]
struct Cli {
    /// Assembly source file.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output path for the 131072-byte segment image.
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Also write an address/word/disassembly listing to this file.
    #[arg(long, value_name = "FILE")]
    listing: Option<PathBuf>,

    /// Render diagnostics against their source lines.
    #[arg(long)]
    pretty: bool,

    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[arg(long, default_value_t = Level::WARN)]
    log_level: Level,
}

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run(cli) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("cannot read '{}'", cli.input.display()))?;
    let options = if cli.pretty {
        RenderOptions::pretty(stderr_supports_color())
    } else {
        RenderOptions::plain()
    };

    let output = compile_source_with_options(&cli.input.display().to_string(), &source, options)
        .map_err(|error| anyhow::anyhow!(error.rendered))?;
    if !output.diagnostics.is_empty() {
        eprintln!("{}", output.rendered_diagnostics(options));
    }

    std::fs::write(&cli.output, &output.segment)
        .with_context(|| format!("cannot write '{}'", cli.output.display()))?;
    tracing::debug!(path = %cli.output.display(), "wrote segment");

    if let Some(listing_path) = &cli.listing {
        std::fs::write(listing_path, render_listing(&output))
            .with_context(|| format!("cannot write '{}'", listing_path.display()))?;
        tracing::debug!(path = %listing_path.display(), "wrote listing");
    }
    Ok(())
}

fn stderr_supports_color() -> bool {
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }

    if let Some(force) = env::var_os("CLICOLOR_FORCE") {
        return force != "0";
    }

    if let Some(choice) = env::var_os("CLICOLOR") {
        if choice == "0" {
            return false;
        }
    }

    io::stderr().is_terminal()
}
