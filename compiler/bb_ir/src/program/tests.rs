use super::*;
use crate::SymbolId;
use pretty_assertions::assert_eq;

fn load(source: &str) -> Result<(Program, SymbolTable), BytecodeError> {
    let symbols = SymbolTable::new();
    let program = Program::parse(source, "test.bbvm", &symbols)?;
    Ok((program, symbols))
}

#[test]
fn test_tokenize_keeps_quoted_spaces() {
    assert_eq!(
        tokenize("BUILTIN msg \"hello big world\""),
        vec!["BUILTIN", "msg", "\"hello big world\""]
    );
    assert_eq!(tokenize("add  x   a b"), vec!["add", "x", "a", "b"]);
}

#[test]
fn test_parse_literals() {
    assert_eq!(Literal::parse("I42"), Some(Literal::Int(42)));
    assert_eq!(Literal::parse("I-7"), Some(Literal::Int(-7)));
    assert_eq!(Literal::parse("F2.5"), Some(Literal::Float(2.5)));
    assert_eq!(Literal::parse("Btrue"), Some(Literal::Bool(true)));
    assert_eq!(Literal::parse("Bfalse"), Some(Literal::Bool(false)));
    assert_eq!(Literal::parse("\"hi there\""), Some(Literal::Str(Arc::from("hi there"))));
    assert_eq!(Literal::parse("Xoops"), None);
    assert_eq!(Literal::parse("Inot"), None);
}

#[test]
fn test_parse_program_with_annotation_and_lines() {
    let (program, symbols) = load("% x = 1\nBUILTIN x I1\n\nprint # x\n").unwrap();
    assert_eq!(program.len(), 2);

    let first = program.command(0);
    assert_eq!(first.op, OpCode::Builtin);
    assert_eq!(first.literal, Some(Literal::Int(1)));
    assert_eq!(first.origin.line, 2);
    assert_eq!(first.origin.annotation.as_deref(), Some("x = 1"));
    assert_eq!(first.describe(&symbols), "x = 1");

    let second = program.command(1);
    assert_eq!(second.origin.line, 4);
    assert_eq!(second.dest(), SymbolId::NONE);
    assert_eq!(second.describe(&symbols), "print # x");
}

#[test]
fn test_unknown_operation_is_rejected() {
    let err = load("frobnicate x y").unwrap_err();
    assert_eq!(
        err,
        BytecodeError::UnknownOperation {
            name: "frobnicate".to_string(),
            line: 1
        }
    );
}

#[test]
fn test_bad_literal_prefix_is_rejected() {
    let err = load("BUILTIN x Q1").unwrap_err();
    assert!(matches!(err, BytecodeError::BadLiteral { line: 1, .. }));
}

#[test]
fn test_missing_operands_are_rejected() {
    let err = load("add x a").unwrap_err();
    assert!(matches!(err, BytecodeError::MissingOperand { op: "add", .. }));
}

#[test]
fn test_blocks_are_paired() {
    let source = "BEGIN f\nBEGIN g\nEND\nreturn # x\nprint # x\nEND\nBUILTIN x I1";
    let (program, _) = load(source).unwrap();
    let outer = program.block(0).unwrap();
    assert_eq!(outer.start, 1);
    assert_eq!(outer.end, 5);
    // Everything after the top-level return is skipped.
    assert_eq!(outer.optimized_end, 4);

    let inner = program.block(1).unwrap();
    assert_eq!((inner.start, inner.end, inner.optimized_end), (2, 2, 2));

    assert_eq!(program.root().end, 7);
    assert_eq!(program.blocks().len(), 2);
}

#[test]
fn test_unmatched_end_is_rejected() {
    let err = load("BEGIN f\nEND\nEND").unwrap_err();
    assert_eq!(err, BytecodeError::UnmatchedEnd { line: 3 });
}

#[test]
fn test_unmatched_begin_is_rejected() {
    let err = load("BUILTIN x I1\nBEGIN f\nprint # x").unwrap_err();
    assert_eq!(err, BytecodeError::UnmatchedBegin { line: 2 });
}
