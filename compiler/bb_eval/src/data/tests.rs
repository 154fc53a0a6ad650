use super::*;
use crate::errors::runtime;
use crate::memory::Memory;
use crate::{silent_console, Vm};
use pretty_assertions::assert_eq;

fn with_cx<R>(f: impl FnOnce(&Cx<'_>) -> R) -> R {
    let vm = Vm::builder().console(silent_console()).build();
    let memory = Memory::root(vm.symbols().clone());
    f(&Cx::new(&vm, &memory))
}

fn text_of(cx: &Cx<'_>, value: &DataPtr) -> String {
    crate::dispatch::text(cx, value).unwrap()
}

fn ints(values: &[i64]) -> DataPtr {
    DataPtr::new(ListData::new(values.iter().copied().map(DataPtr::from_int)))
}

#[test]
fn test_list_text_and_len() {
    with_cx(|cx| {
        let list = ints(&[1, 2, 3]);
        assert_eq!(text_of(cx, &list), "[1, 2, 3]");
        let len = crate::dispatch::unary(cx, OpCode::Len, &list).unwrap();
        assert_eq!(len.as_int(), Some(3));
    });
}

#[test]
fn test_list_next_drains_front_then_signals_end() {
    with_cx(|cx| {
        let list = ints(&[4, 5]);
        let first = crate::dispatch::unary(cx, OpCode::Next, &list).unwrap();
        let second = crate::dispatch::unary(cx, OpCode::Next, &list).unwrap();
        let end = crate::dispatch::unary(cx, OpCode::Next, &list).unwrap();
        assert_eq!(first.as_int(), Some(4));
        assert_eq!(second.as_int(), Some(5));
        assert!(end.is_error());
    });
}

#[test]
fn test_list_pop_takes_back() {
    with_cx(|cx| {
        let list = ints(&[1, 2, 3]);
        let popped = crate::dispatch::unary(cx, OpCode::Pop, &list).unwrap();
        assert_eq!(popped.as_int(), Some(3));
        assert_eq!(text_of(cx, &list), "[1, 2]");
    });
}

#[test]
fn test_list_put_grows_with_gaps() {
    with_cx(|cx| {
        let list = ints(&[1]);
        crate::dispatch::put(cx, &list, &DataPtr::from_int(2), &DataPtr::from_int(9)).unwrap();
        assert_eq!(text_of(cx, &list), "[1,  , 9]");
    });
}

#[test]
fn test_list_at_out_of_range() {
    with_cx(|cx| {
        let list = ints(&[1]);
        let error = crate::dispatch::at(cx, &list, &DataPtr::from_int(3)).unwrap_err();
        assert_eq!(error.message(), "Index 3 out of range [0,1)");
    });
}

#[test]
fn test_list_reductions() {
    with_cx(|cx| {
        let list = ints(&[3, 9, 2]);
        let sum = crate::dispatch::unary(cx, OpCode::Sum, &list).unwrap();
        let max = crate::dispatch::unary(cx, OpCode::Max, &list).unwrap();
        let min = crate::dispatch::unary(cx, OpCode::Min, &list).unwrap();
        assert_eq!(sum.as_int(), Some(14));
        assert_eq!(max.as_int(), Some(9));
        assert_eq!(min.as_int(), Some(2));
    });
}

#[test]
fn test_list_copy_is_independent() {
    with_cx(|cx| {
        let list = ints(&[1]);
        let copy = crate::dispatch::unary(cx, OpCode::ToCopy, &list).unwrap();
        crate::dispatch::push(cx, &copy, &DataPtr::from_int(2)).unwrap();
        assert_eq!(text_of(cx, &list), "[1]");
        assert_eq!(text_of(cx, &copy), "[1, 2]");
    });
}

#[test]
fn test_map_insertion_order_and_lookup() {
    with_cx(|cx| {
        let map = DataPtr::new(MapData::default());
        let key = string_value("b");
        crate::dispatch::put(cx, &map, &key, &DataPtr::from_int(2)).unwrap();
        crate::dispatch::put(cx, &map, &DataPtr::from_int(1), &DataPtr::from_int(1)).unwrap();
        crate::dispatch::put(cx, &map, &string_value("b"), &DataPtr::from_int(3)).unwrap();
        assert_eq!(text_of(cx, &map), "{b: 3, 1: 1}");
        let found = crate::dispatch::at(cx, &map, &key).unwrap();
        assert_eq!(found.as_int(), Some(3));
        let missing = crate::dispatch::at(cx, &map, &DataPtr::from_int(7)).unwrap_err();
        assert_eq!(missing.message(), "Map has no key: 7");
    });
}

#[test]
fn test_map_rejects_unhashable_keys() {
    with_cx(|cx| {
        let map = DataPtr::new(MapData::default());
        let error = crate::dispatch::put(cx, &map, &ints(&[]), &DataPtr::from_int(1)).unwrap_err();
        assert!(error.message().contains("key"));
    });
}

#[test]
fn test_vector_elementwise_and_dot() {
    with_cx(|cx| {
        let a = DataPtr::new(VectorData::new(vec![1.0, 2.0]));
        let b = DataPtr::new(VectorData::new(vec![3.0, 4.0]));
        let sum = crate::dispatch::binary(cx, OpCode::Add, &a, &b).unwrap();
        assert_eq!(sum.downcast::<VectorData>().unwrap().to_vec(), vec![4.0, 6.0]);
        let dot = crate::dispatch::binary(cx, OpCode::MMul, &a, &b).unwrap();
        assert_eq!(dot.as_float(), Some(11.0));
    });
}

#[test]
fn test_vector_scalar_respects_side() {
    with_cx(|cx| {
        let v = DataPtr::new(VectorData::new(vec![2.0, 4.0]));
        let left = crate::dispatch::binary(cx, OpCode::Sub, &v, &DataPtr::from_int(1)).unwrap();
        let right = crate::dispatch::binary(cx, OpCode::Sub, &DataPtr::from_int(10), &v).unwrap();
        assert_eq!(left.downcast::<VectorData>().unwrap().to_vec(), vec![1.0, 3.0]);
        assert_eq!(right.downcast::<VectorData>().unwrap().to_vec(), vec![8.0, 6.0]);
    });
}

#[test]
fn test_vector_size_mismatch() {
    with_cx(|cx| {
        let a = DataPtr::new(VectorData::new(vec![1.0]));
        let b = DataPtr::new(VectorData::new(vec![1.0, 2.0]));
        assert!(crate::dispatch::binary(cx, OpCode::Add, &a, &b).is_err());
    });
}

#[test]
fn test_string_concat_either_side() {
    with_cx(|cx| {
        let s = string_value("n=");
        let joined = crate::dispatch::binary(cx, OpCode::Add, &s, &DataPtr::from_int(4)).unwrap();
        assert_eq!(text_of(cx, &joined), "n=4");
        let mirrored = crate::dispatch::binary(cx, OpCode::Add, &DataPtr::from_int(4), &s).unwrap();
        assert_eq!(text_of(cx, &mirrored), "4n=");
    });
}

#[test]
fn test_string_conversions() {
    with_cx(|cx| {
        let n = crate::dispatch::unary(cx, OpCode::ToInt, &string_value(" 12 ")).unwrap();
        assert_eq!(n.as_int(), Some(12));
        assert!(crate::dispatch::unary(cx, OpCode::ToInt, &string_value("x")).is_err());
        let c = crate::dispatch::at(cx, &string_value("abc"), &DataPtr::from_int(1)).unwrap();
        assert_eq!(text_of(cx, &c), "b");
    });
}

#[test]
fn test_int_range_iterates_and_ends() {
    with_cx(|cx| {
        let range = DataPtr::new(IntRange::new(0, 5, 2).unwrap());
        let mut seen = Vec::new();
        loop {
            let value = crate::dispatch::unary(cx, OpCode::Next, &range).unwrap();
            if value.is_error() {
                break;
            }
            seen.push(value.as_int().unwrap());
        }
        assert_eq!(seen, vec![0, 2, 4]);
    });
}

#[test]
fn test_int_range_negative_step() {
    with_cx(|cx| {
        let range = DataPtr::new(IntRange::new(3, 0, -1).unwrap());
        let list = crate::dispatch::unary(cx, OpCode::ToList, &range).unwrap();
        assert_eq!(text_of(cx, &list), "[3, 2, 1]");
    });
}

#[test]
fn test_int_range_with_extreme_bounds() {
    with_cx(|cx| {
        let range = DataPtr::new(IntRange::new(i64::MIN, i64::MAX, i64::MAX).unwrap());
        let len = crate::dispatch::unary(cx, OpCode::Len, &range).unwrap();
        assert_eq!(len.as_int(), Some(3));
        let list = crate::dispatch::unary(cx, OpCode::ToList, &range).unwrap();
        assert_eq!(
            text_of(cx, &list),
            "[-9223372036854775808, -1, 9223372036854775806]"
        );
    });
}

#[test]
fn test_int_range_too_long_to_measure() {
    with_cx(|cx| {
        let range = DataPtr::new(IntRange::new(-5, i64::MAX, 1).unwrap());
        let error = crate::dispatch::unary(cx, OpCode::Len, &range).unwrap_err();
        assert_eq!(
            error.kind,
            crate::EvalErrorKind::IntegerOverflow {
                operation: "range length"
            }
        );
        let last = crate::dispatch::at(cx, &range, &DataPtr::from_int(i64::MAX - 1)).unwrap();
        assert_eq!(last.as_int(), Some(i64::MAX - 6));
    });
}

#[test]
fn test_zero_step_range_is_rejected() {
    assert!(IntRange::new(0, 1, 0).is_err());
    assert!(FloatRange::new(0.0, 1.0, 0.0).is_err());
}

#[test]
fn test_access_iter_over_list() {
    with_cx(|cx| {
        let list = ints(&[7, 8]);
        let iter = crate::dispatch::unary(cx, OpCode::ToIter, &list).unwrap();
        let a = crate::dispatch::unary(cx, OpCode::Next, &iter).unwrap();
        let b = crate::dispatch::unary(cx, OpCode::Next, &iter).unwrap();
        let end = crate::dispatch::unary(cx, OpCode::Next, &iter).unwrap();
        assert_eq!((a.as_int(), b.as_int()), (Some(7), Some(8)));
        assert!(end.is_error());
        assert_eq!(text_of(cx, &list), "[7, 8]");
    });
}

#[test]
fn test_error_text_consumes() {
    with_cx(|cx| {
        let error = ErrorData::value(runtime("bad"));
        assert!(!error.error().unwrap().is_consumed());
        assert_eq!(text_of(cx, &error), "bad");
        assert!(error.error().unwrap().is_consumed());
    });
}

#[test]
fn test_future_text_resolves() {
    with_cx(|cx| {
        let future: Obj = FutureData::ready(Ok(DataPtr::from_int(5)));
        let value = DataPtr::from_obj(future);
        assert_eq!(text_of(cx, &value), "5");
    });
}

#[test]
fn test_future_resolve_is_cached() {
    let future = FutureData::spawn(|| Ok(DataPtr::from_int(1))).unwrap();
    assert_eq!(future.resolve().unwrap().as_int(), Some(1));
    assert!(future.is_resolved());
    assert_eq!(future.resolve().unwrap().as_int(), Some(1));
}

#[test]
fn test_list_element_shared_then_unshared() {
    with_cx(|cx| {
        let list = DataPtr::new(ListData::default());
        let element = string_value("payload");
        let watch = std::sync::Arc::downgrade(&element.downcast_arc::<StringData>().unwrap());

        // Shared: the binding and the list both own it.
        crate::dispatch::push(cx, &list, &element).unwrap();
        assert_eq!(element.owners(), 2);
        let popped = crate::dispatch::unary(cx, OpCode::Pop, &list).unwrap();
        assert!(popped.is_same(&element));
        drop(popped);
        assert_eq!(element.owners(), 1);

        // Unshared: only the list keeps it alive.
        crate::dispatch::push(cx, &list, &element).unwrap();
        drop(element);
        assert!(watch.upgrade().is_some());
        drop(list);
        assert!(watch.upgrade().is_none());
    });
}
