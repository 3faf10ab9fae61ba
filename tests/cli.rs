use assert_cmd::Command;
use predicates::str::contains;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_root(tag: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should move forward")
        .as_nanos();
    let root = std::env::temp_dir().join(format!("tvmasm-cli-{tag}-{unique}"));
    std::fs::create_dir_all(&root).expect("failed to create temp root");
    root
}

#[test]
fn help_flag_prints_usage() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tvmasm"));
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(contains("Assembler for the tinyvm 16-bit word machine"))
        .stdout(contains("Usage: tvmasm"))
        .stdout(contains("--listing"));
}

#[test]
fn missing_arguments_fail() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tvmasm"));
    cmd.assert().failure().stderr(contains("INPUT"));
}

#[test]
fn assembles_into_full_segment() {
    let root = temp_root("ok");
    let output = root.join("bot.segment");

    let input = root.join("ok.asm");
    std::fs::write(&input, "lw r2, 0x1234\nret\n").expect("failed to write input");
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tvmasm"));
    cmd.arg(&input).arg(&output).assert().success().stderr("");

    let bytes = std::fs::read(&output).expect("segment should exist");
    assert_eq!(bytes.len(), 131_072);
    assert_eq!(&bytes[..6], &[0x32, 0x34, 0x42, 0x12, 0x10, 0x2A]);
}

#[test]
fn failed_compile_reports_and_skips_output() {
    let root = temp_root("fail");
    let input = root.join("bad.asm");
    std::fs::write(&input, "nop\nfoo r1\nret\n").expect("failed to write input");
    let output = root.join("bad.segment");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tvmasm"));
    cmd.arg(&input)
        .arg(&output)
        .assert()
        .code(1)
        .stderr(contains("line 2: Command 'foo' not found."));
    assert!(!output.exists());
}

#[test]
fn warnings_are_printed_on_success() {
    let root = temp_root("warn");
    let input = root.join("warn.asm");
    std::fs::write(&input, "lbeq r1 r2 +50\n").expect("failed to write input");
    let output = root.join("warn.segment");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tvmasm"));
    cmd.arg(&input)
        .arg(&output)
        .assert()
        .success()
        .stderr(contains("line 1: Pseudo-instruction 'lbeq'"));
    assert!(output.exists());
}

#[test]
fn listing_flag_writes_listing() {
    let root = temp_root("listing");
    let input = root.join("prog.asm");
    std::fs::write(&input, "b r1 _end\nnop\n.label _end\nret\n").expect("failed to write input");
    let output = root.join("prog.segment");
    let listing = root.join("prog.lst");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tvmasm"));
    cmd.arg(&input)
        .arg(&output)
        .arg("--listing")
        .arg(&listing)
        .assert()
        .success();

    let text = std::fs::read_to_string(&listing).expect("listing should exist");
    assert_eq!(text.lines().count(), 3);
    assert!(text.starts_with("0000  9100  b r1 +2 (0x0002)"));
    assert!(text.contains("0002  102A  ret"));
}

#[test]
fn pretty_flag_shows_source_line() {
    let root = temp_root("pretty");
    let input = root.join("pretty.asm");
    std::fs::write(&input, "nop\nadd r1 x2\n").expect("failed to write input");
    let output = root.join("pretty.segment");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tvmasm"));
    cmd.env("NO_COLOR", "1")
        .arg(&input)
        .arg(&output)
        .arg("--pretty")
        .assert()
        .failure()
        .stderr(contains("add r1 x2"))
        .stderr(contains("Cannot parse register"));
}

#[test]
fn unreadable_input_fails() {
    let root = temp_root("missing");
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tvmasm"));
    cmd.arg(root.join("absent.asm"))
        .arg(root.join("out.segment"))
        .assert()
        .failure()
        .stderr(contains("cannot read"));
}
