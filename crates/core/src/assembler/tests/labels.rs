use super::*;
use similar_asserts::assert_eq;

#[test]
fn backward_branch_to_label() {
    assert_eq!(
        words("lw r2,0x10\n.label _some_label\nlw r3,0x33\nb r4 _some_label"),
        "3210 3333 9480"
    );
}

#[test]
fn forward_branch_to_label() {
    assert_eq!(
        words("b r6 _some_label\nlw r2,0x22\n.label _some_label\nlw r3,0x33"),
        "9600 3222 3333"
    );
}

#[test]
fn forward_reference_matches_immediate_form() {
    assert_eq!(
        words("b r6 _skip\nnop\n.label _skip\nnop"),
        words("b r6 2\nnop\nnop")
    );
    assert_eq!(
        words("j _far\n.offset 0x400\n.label _far\nret"),
        words("j 0x400\n.offset 0x400\nret")
    );
}

#[test]
fn jumps_to_labels_in_both_directions() {
    assert_eq!(words(".label _loop\nnop\nj _loop"), "5F00 A800");
    assert_eq!(words("j _target\n.offset 0x10\n.label _target\nret"), "A00E 102A");
}

#[test]
fn jump_to_label_with_extra_offset() {
    assert_eq!(
        words("j _end +1\nnop\nnop\n.label _end\nret\nret"),
        "A002 5F00 5F00 102A 102A"
    );
}

#[test]
fn combined_branch_to_forward_label() {
    assert_eq!(
        words("beq r1 r2 _done\nnop\n.label _done\nret"),
        "8412 9200 5F00 102A"
    );
}

#[test]
fn long_branch_to_forward_label() {
    assert_eq!(
        words("lbne r1 r2 _far\n.offset 0x300\n.label _far\nret"),
        "8412 9200 A2FC 102A"
    );
}

#[test]
fn load_address_of_forward_label() {
    assert_eq!(
        words("la r1, _data\nret\n.label _data\n.word 0x1234"),
        "3102 102A 1234"
    );
}

#[test]
fn long_load_address_of_far_label() {
    let outcome = run(".offset 0x1234\n.label _far\n.word 7\n.offset 0\nlla r2, _far");
    let assembled = outcome.assembled.expect("assembles");
    assert_eq!(dump(&assembled), "3234 4212 0007");
    assert!(outcome.diagnostics.is_empty(), "{:#?}", outcome.diagnostics);
}

#[test]
fn long_load_address_warns_when_short_form_fits() {
    let outcome = run(".label _near\nlla r3, _near");
    let assembled = outcome.assembled.expect("assembles");
    assert_eq!(dump(&assembled), "3300 4300");
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].severity, crate::diag::Severity::Warning);
    assert!(outcome.diagnostics[0].message.contains("Try using 'la' instead"));
}

#[test]
fn long_load_address_of_forward_label() {
    let outcome = run("lla r2, _far\n.offset 0x1234\n.label _far\nret");
    let assembled = outcome.assembled.expect("assembles");
    assert_eq!(dump(&assembled), "3234 4212 102A");
    assert_eq!(assembled.line_map.get(&0), Some(&1));
    assert_eq!(assembled.line_map.get(&1), Some(&1));
    assert!(outcome.diagnostics.is_empty(), "{:#?}", outcome.diagnostics);
}

#[test]
fn long_load_address_replay_wraps_the_segment() {
    let outcome = run(".offset 0xFFFF\nlla r2, _far\n.offset 0x1234\n.label _far\nret");
    let assembled = outcome.assembled.expect("assembles");
    assert_eq!(dump(&assembled), "4212 102A 3234");
    assert_eq!(outcome.diagnostics.len(), 2, "{:#?}", outcome.diagnostics);
    for diagnostic in &outcome.diagnostics {
        assert_eq!(diagnostic.severity, crate::diag::Severity::Warning);
        assert_eq!(diagnostic.line, 2);
        assert!(diagnostic.message.contains("segment pointer overflow"), "{diagnostic}");
    }
}

#[test]
fn long_branch_to_near_forward_label_warns() {
    let outcome = run("lbne r1 r2 _near\nret\n.label _near\nret");
    let assembled = outcome.assembled.expect("assembles");
    assert_eq!(dump(&assembled), "8412 9200 A000 102A 102A");
    assert_eq!(outcome.diagnostics.len(), 1, "{:#?}", outcome.diagnostics);
    let warning = &outcome.diagnostics[0];
    assert_eq!(warning.severity, crate::diag::Severity::Warning);
    assert_eq!(warning.line, 1);
    assert!(warning.message.contains("short offset of 2"), "{warning}");
}

#[test]
fn short_load_address_rejects_far_labels() {
    assert_fails_with(
        ".offset 0x200\n.label _x\n.word 1\n.offset 0\nla r1, _x",
        "Try using 'lla' instead",
    );
}

#[test]
fn jump_high_to_forward_label() {
    assert_eq!(
        words("jhi r2 _page\n.offset 0x300\n.label _page\nret"),
        "C203 102A"
    );
}

#[test]
fn jump_high_rejects_unaligned_label() {
    assert_fails_with(
        ".offset 0x301\n.label _odd\nret\n.offset 0\njhi r2 _odd",
        "can only jump to multiples of 256",
    );
}

#[test]
fn offset_to_label_moves_cursor_back() {
    assert_eq!(
        messages(".label _start\n.word 1\n.offset _start\n.word 2"),
        vec!["line 4: Attempted to overwrite word 0x0001 at 0x0000 with 0x0002.".to_string()]
    );
}

#[test]
fn offset_to_unknown_label_lists_defined_labels() {
    assert_eq!(
        messages(".label _b\nnop\n.label _a\nnop\n.offset _c"),
        vec![
            "line 5: Label argument to '.offset' must be an already-declared label, found unknown label '_c' instead".to_string(),
            "line 5: The already-defined labels are: [\"_a\", \"_b\"]".to_string(),
        ]
    );
}

#[test]
fn failed_replay_reports_at_reference_line_then_definition() {
    assert_eq!(
        messages("b r1 _far\n.offset 0x100\n.label _far\nret"),
        vec![
            "line 1: Command 'b (to label _far=0x0100, defined in line 3)' can only branch by offsets in [-128, 129], but not by 256. Try using 'j' instead, which supports larger jumps, or an 'lb*' pseudo-instruction.".to_string(),
            "line 3: When label _far was defined.".to_string(),
        ]
    );
}

#[test]
fn replay_continues_after_a_failed_reference() {
    let (asm, result) = feed("b r1 _x\n.offset 0x200\nb r2 _x\nnop\n.label _x\nret");
    assert_eq!(result, Err(Reported));
    assert_eq!(asm.segment.get(0), None);
    assert_eq!(asm.segment.get(0x200), Some(0x9200));
    let lines: Vec<usize> = asm.diagnostics().iter().map(|diag| diag.line).collect();
    assert_eq!(lines, vec![1, 5]);
    // The failing line stops everything after it.
    assert_eq!(asm.segment.get(0x203), None);
}

#[test]
fn replay_restores_cursor_and_line() {
    let (asm, result) = feed("b r1 _x\nnop\n.label _x\nret");
    assert_eq!(result, Ok(()));
    assert_eq!(asm.pointer(), 3);
    assert_eq!(asm.line, 4);
    assert_eq!(asm.label("_x").map(|info| info.used), Some(true));
}

#[test]
fn origin_swaps_nest() {
    let mut asm = Assembler::new();
    asm.line = 7;
    asm.pointer = 0x40;
    asm.with_origin(Origin { line: 1, pointer: 0x10 }, |asm| {
        asm.with_origin(Origin { line: 2, pointer: 0x20 }, |asm| {
            assert_eq!((asm.line, asm.pointer), (2, 0x20));
        });
        assert_eq!((asm.line, asm.pointer), (1, 0x10));
    });
    assert_eq!((asm.line, asm.pointer), (7, 0x40));
}

#[test]
fn branch_to_label_cannot_loop_or_nop() {
    assert_fails_with(".label _self\nb r1 _self", "cannot encode an infinite loop");
    assert_eq!(
        messages("b r1 _next\n.label _next"),
        vec![
            "line 1: Command 'b (to label _next=0x0001, defined in line 2)' cannot encode the nop-branch (offset 1). Try using 'nop' instead.".to_string(),
            "line 2: When label _next was defined.".to_string(),
        ]
    );
}

#[test]
fn duplicate_label_names_previous_definition() {
    assert_eq!(
        messages(".label _a\nnop\n.label _a"),
        vec![
            "line 3: Label '_a' previously defined in line 1 (old offset 0x0000, new offset 0x0001)"
                .to_string()
        ]
    );
}

#[test]
fn unresolved_and_unused_labels_are_both_reported() {
    assert_eq!(
        messages("b r1 _wrong_label\n.label _right_label\nret"),
        vec![
            "line 3: Found end of asm text, but some forward references are unresolved: line 1 at offset 0 references label _wrong_label".to_string(),
            "line 3: Label _wrong_label is never defined. Did you mean any of these defined labels? [\"_right_label\"]".to_string(),
            "line 3: Unused label(s), try using them in dead code, or commenting them out: '_right_label' (line 2, offset 1)".to_string(),
        ]
    );
}

#[test]
fn unused_labels_are_sorted() {
    assert_eq!(
        messages(".label _zeta\nnop\n.label _alpha"),
        vec![
            "line 3: Unused label(s), try using them in dead code, or commenting them out: \
             '_alpha' (line 3, offset 1), '_zeta' (line 1, offset 0)"
                .to_string()
        ]
    );
}

#[test]
fn unresolved_suggestions_prefer_close_names() {
    let messages = messages("j _lop\n.label _loop\n.label _other\nnop\nj _loop\nj _other");
    assert!(
        messages[1].ends_with("[\"_loop\"]"),
        "{messages:#?}"
    );
}
