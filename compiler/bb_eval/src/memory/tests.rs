use super::*;
use crate::errors::runtime;
use crate::EvalErrorKind;
use bb_ir::SymbolTable;
use pretty_assertions::assert_eq;

fn scope() -> (SharedSymbols, Arc<Memory>) {
    let symbols = SymbolTable::shared();
    let memory = Memory::root(Arc::clone(&symbols));
    (symbols, memory)
}

#[test]
fn test_set_then_get() {
    let (symbols, memory) = scope();
    let x = symbols.intern("x");
    memory.set(x, DataPtr::from_int(5)).unwrap();
    assert_eq!(memory.get(x).unwrap().as_int(), Some(5));
}

#[test]
fn test_missing_symbol_is_an_error() {
    let (symbols, memory) = scope();
    let x = symbols.intern("x");
    let error = memory.get(x).unwrap_err();
    assert_eq!(error.kind, EvalErrorKind::MissingValue { name: "x".into() });
    assert!(memory.get_or_null(x, true).unwrap().is_none());
}

#[test]
fn test_lookup_walks_parents() {
    let (symbols, root) = scope();
    let x = symbols.intern("x");
    root.set(x, DataPtr::from_int(1)).unwrap();
    let child = Memory::child(&root);
    let grandchild = Memory::child(&child);
    assert_eq!(grandchild.get(x).unwrap().as_int(), Some(1));
    assert!(grandchild.get_or_null_shallow(x).unwrap().is_none());
}

#[test]
fn test_hidden_mutables_block_ancestor_reads() {
    let (symbols, root) = scope();
    let mutable = symbols.intern("mutable");
    let constant = symbols.intern("constant");
    root.set(mutable, DataPtr::from_int(1)).unwrap();
    root.set(constant, DataPtr::from_int(2)).unwrap();
    root.set_final(constant);

    let child = Memory::child(&root);
    child.set_allow_mutables(false);
    let error = child.get(mutable).unwrap_err();
    assert!(matches!(error.kind, EvalErrorKind::MutableNotVisible { .. }));
    assert_eq!(child.get(constant).unwrap().as_int(), Some(2));
}

#[test]
fn test_local_mutables_stay_visible() {
    let (symbols, root) = scope();
    let x = symbols.intern("x");
    let child = Memory::child(&root);
    child.set_allow_mutables(false);
    child.set(x, DataPtr::from_int(3)).unwrap();
    assert_eq!(child.get(x).unwrap().as_int(), Some(3));
}

#[test]
fn test_final_cannot_be_overwritten() {
    let (symbols, memory) = scope();
    let x = symbols.intern("x");
    memory.set(x, DataPtr::from_int(1)).unwrap();
    memory.set_final(x);
    let error = memory.set(x, DataPtr::from_int(2)).unwrap_err();
    assert_eq!(error.kind, EvalErrorKind::FinalViolation { name: "x".into() });
    assert_eq!(memory.get(x).unwrap().as_int(), Some(1));
}

#[test]
fn test_ancestor_final_cannot_be_shadowed() {
    let (symbols, root) = scope();
    let x = symbols.intern("x");
    root.set(x, DataPtr::from_int(1)).unwrap();
    root.set_final(x);
    let child = Memory::child(&root);
    assert!(child.set(x, DataPtr::from_int(2)).is_err());
}

#[test]
fn test_this_and_args_may_shadow_ancestors() {
    let (_, root) = scope();
    root.set(SymbolId::ARGS, DataPtr::from_int(1)).unwrap();
    root.set_final(SymbolId::ARGS);
    let child = Memory::child(&root);
    child.set(SymbolId::ARGS, DataPtr::from_int(2)).unwrap();
    assert_eq!(child.get(SymbolId::ARGS).unwrap().as_int(), Some(2));
}

#[test]
fn test_pull_copies_bindings() {
    let (symbols, target) = scope();
    let source = Memory::root(Arc::clone(&symbols));
    let a = symbols.intern("a");
    let b = symbols.intern("b");
    source.set(a, DataPtr::from_int(1)).unwrap();
    source.set(b, DataPtr::from_int(2)).unwrap();
    target.pull(&source).unwrap();
    assert_eq!(target.get(a).unwrap().as_int(), Some(1));
    assert_eq!(target.get(b).unwrap().as_int(), Some(2));
}

#[test]
fn test_replace_missing_keeps_existing() {
    let (symbols, target) = scope();
    let source = Memory::root(Arc::clone(&symbols));
    let a = symbols.intern("a");
    let b = symbols.intern("b");
    target.set(a, DataPtr::from_int(10)).unwrap();
    source.set(a, DataPtr::from_int(1)).unwrap();
    source.set(b, DataPtr::from_int(2)).unwrap();
    target.replace_missing(&source).unwrap();
    assert_eq!(target.get(a).unwrap().as_int(), Some(10));
    assert_eq!(target.get(b).unwrap().as_int(), Some(2));
}

#[test]
fn test_future_slot_resolves_on_read() {
    let (symbols, memory) = scope();
    let x = symbols.intern("x");
    let future = FutureData::spawn(|| Ok(DataPtr::from_int(42))).unwrap();
    memory.attach(Arc::clone(&future));
    let future: Arc<dyn Data> = future;
    memory.set(x, DataPtr::from_obj(future)).unwrap();

    assert_eq!(memory.get(x).unwrap().as_int(), Some(42));
    let stored = memory.bindings();
    assert_eq!(stored[0].1.as_int(), Some(42));
}

#[test]
fn test_join_attached_reports_first_failure() {
    let (_, memory) = scope();
    memory.attach(FutureData::ready(Ok(DataPtr::from_int(1))));
    memory.attach(FutureData::ready(Err(runtime("first"))));
    memory.attach(FutureData::ready(Err(runtime("second"))));
    let error = memory.join_attached().unwrap_err();
    assert_eq!(error.message(), "first");
    assert_eq!(memory.attached_count(), 0);
}

#[test]
fn test_release_reports_unconsumed_errors() {
    let (symbols, memory) = scope();
    let e = symbols.intern("e");
    memory.set(e, ErrorData::value(runtime("lost"))).unwrap();
    let error = memory.release(&DataPtr::missing()).unwrap_err();
    assert_eq!(
        error.kind,
        EvalErrorKind::UnhandledError {
            message: "lost".into()
        }
    );
}

#[test]
fn test_release_ignores_consumed_and_kept_errors() {
    let (symbols, memory) = scope();
    let handled = symbols.intern("handled");
    let kept = symbols.intern("kept");
    let consumed = ErrorData::consumed_value(runtime("seen"));
    let returned = ErrorData::value(runtime("returned"));
    memory.set(handled, consumed).unwrap();
    memory.set(kept, returned.clone()).unwrap();
    memory.release(&returned).unwrap();
    assert!(memory.bindings().is_empty());
}

#[test]
fn test_detach_cuts_parent_and_hides_mutables() {
    let (symbols, root) = scope();
    let x = symbols.intern("x");
    root.set(x, DataPtr::from_int(1)).unwrap();
    let child = Memory::child(&root);
    child.detach().unwrap();
    assert!(child.parent().is_none());
    assert!(!child.allows_mutables());
    assert!(child.get_or_null(x, true).unwrap().is_none());
}

#[test]
fn test_deferred_blocks_are_taken_in_order() {
    let (_, memory) = scope();
    memory.defer(DataPtr::from_int(1));
    memory.defer(DataPtr::from_int(2));
    let taken: Vec<Option<i64>> = memory.take_deferred().iter().map(DataPtr::as_int).collect();
    assert_eq!(taken, vec![Some(1), Some(2)]);
    assert!(memory.take_deferred().is_empty());
}
