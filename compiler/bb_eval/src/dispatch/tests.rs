use super::*;
use crate::data::{ErrorData, ListData, StringData};
use crate::errors::runtime;
use crate::memory::Memory;
use crate::{silent_console, EvalErrorKind, Vm};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn with_cx<R>(f: impl FnOnce(&Cx<'_>) -> R) -> R {
    let vm = Vm::builder().console(silent_console()).build();
    let memory = Memory::root(vm.symbols().clone());
    f(&Cx::new(&vm, &memory))
}

/// A literal moved to the heap; answers binary operations with the same
/// formulas as the fast path.
#[derive(Debug)]
struct Boxed(DataPtr);

impl Data for Boxed {
    fn type_name(&self) -> &'static str {
        "boxed"
    }

    fn binary(&self, _cx: &Cx<'_>, op: OpCode, _this: &DataPtr, other: &DataPtr, side: Side) -> OpResult {
        let other = other.downcast::<Boxed>().map_or_else(|| other.clone(), |b| b.0.clone());
        let (left, right) = match side {
            Side::Left => (self.0.clone(), other),
            Side::Right => (other, self.0.clone()),
        };
        match literal::binary(op, &left, &right) {
            Some(result) => Ok(result?),
            None => Err(OpFailure::Unimplemented),
        }
    }
}

fn boxed(value: DataPtr) -> DataPtr {
    DataPtr::new(Boxed(value))
}

/// Comparable summary of an outcome.
fn summary(result: EvalResult) -> Result<(String, String), String> {
    result
        .map(|value| (value.type_name().to_string(), value.literal_text().unwrap_or_default()))
        .map_err(|error| error.message())
}

#[test]
fn test_int_arithmetic() {
    with_cx(|cx| {
        let a = DataPtr::from_int(7);
        let b = DataPtr::from_int(2);
        assert_eq!(binary(cx, OpCode::Add, &a, &b).unwrap().as_int(), Some(9));
        assert_eq!(binary(cx, OpCode::Sub, &a, &b).unwrap().as_int(), Some(5));
        assert_eq!(binary(cx, OpCode::Mul, &a, &b).unwrap().as_int(), Some(14));
        assert_eq!(binary(cx, OpCode::Div, &a, &b).unwrap().as_float(), Some(3.5));
        assert_eq!(binary(cx, OpCode::Mod, &a, &b).unwrap().as_int(), Some(1));
        assert_eq!(binary(cx, OpCode::Pow, &a, &b).unwrap().as_int(), Some(49));
        assert_eq!(binary(cx, OpCode::Lt, &a, &b).unwrap().as_bool(), Some(false));
    });
}

#[test]
fn test_int_overflow_is_an_error() {
    with_cx(|cx| {
        let error = binary(cx, OpCode::Add, &DataPtr::from_int(i64::MAX), &DataPtr::from_int(1)).unwrap_err();
        assert_eq!(
            error.kind,
            EvalErrorKind::IntegerOverflow {
                operation: "addition"
            }
        );
    });
}

#[test]
fn test_modulo_by_zero() {
    with_cx(|cx| {
        let error = binary(cx, OpCode::Mod, &DataPtr::from_int(1), &DataPtr::from_int(0)).unwrap_err();
        assert_eq!(error.kind, EvalErrorKind::ModuloByZero);
    });
}

#[test]
fn test_negative_power_is_float() {
    with_cx(|cx| {
        let value = binary(cx, OpCode::Pow, &DataPtr::from_int(2), &DataPtr::from_int(-1)).unwrap();
        assert_eq!(value.as_float(), Some(0.5));
    });
}

#[test]
fn test_mixed_promotes_to_float() {
    with_cx(|cx| {
        let value = binary(cx, OpCode::Add, &DataPtr::from_int(1), &DataPtr::from_float(0.5)).unwrap();
        assert_eq!(value.as_float(), Some(1.5));
    });
}

#[test]
fn test_bool_logic() {
    with_cx(|cx| {
        let t = DataPtr::from_bool(true);
        let f = DataPtr::from_bool(false);
        assert_eq!(binary(cx, OpCode::And, &t, &f).unwrap().as_bool(), Some(false));
        assert_eq!(binary(cx, OpCode::Or, &t, &f).unwrap().as_bool(), Some(true));
        assert_eq!(unary(cx, OpCode::Not, &f).unwrap().as_bool(), Some(true));
    });
}

#[test]
fn test_unsupported_literals_fail_with_types() {
    with_cx(|cx| {
        let error = binary(cx, OpCode::Add, &DataPtr::from_bool(true), &DataPtr::from_int(1)).unwrap_err();
        assert_eq!(
            error.message(),
            "No valid builtin implementation for this method: add(bool, int)"
        );
    });
}

#[test]
fn test_right_operand_is_asked_second() {
    with_cx(|cx| {
        let value = binary(cx, OpCode::Sub, &DataPtr::from_int(10), &boxed(DataPtr::from_int(3))).unwrap();
        assert_eq!(value.as_int(), Some(7));
    });
}

#[test]
fn test_left_error_wins_and_is_consumed() {
    with_cx(|cx| {
        let left = ErrorData::value(runtime("left"));
        let right = ErrorData::value(runtime("right"));
        let error = binary(cx, OpCode::Add, &left, &right).unwrap_err();
        assert_eq!(error.message(), "left");
        assert!(left.error().unwrap().is_consumed());
        assert!(!right.error().unwrap().is_consumed());
    });
}

#[test]
fn test_error_operand_propagates_from_unary() {
    with_cx(|cx| {
        let value = ErrorData::value(runtime("inner"));
        let error = unary(cx, OpCode::Len, &value).unwrap_err();
        assert_eq!(error.message(), "inner");
    });
}

#[test]
fn test_str_falls_back_to_text() {
    with_cx(|cx| {
        let list = DataPtr::new(ListData::new([DataPtr::from_int(1)]));
        let text = unary(cx, OpCode::ToStr, &list).unwrap();
        assert_eq!(text.downcast::<StringData>().unwrap().as_str(), "[1]");
        let literal = unary(cx, OpCode::ToStr, &DataPtr::from_float(2.5)).unwrap();
        assert_eq!(literal.downcast::<StringData>().unwrap().as_str(), "2.5");
    });
}

#[test]
fn test_conversions() {
    with_cx(|cx| {
        assert_eq!(unary(cx, OpCode::ToInt, &DataPtr::from_float(2.9)).unwrap().as_int(), Some(2));
        assert_eq!(unary(cx, OpCode::ToFloat, &DataPtr::from_bool(true)).unwrap().as_float(), Some(1.0));
        assert_eq!(unary(cx, OpCode::ToBool, &DataPtr::from_int(0)).unwrap().as_bool(), Some(false));
    });
}

#[test]
fn test_at_only_asks_receiver() {
    with_cx(|cx| {
        let error = at(cx, &DataPtr::from_int(1), &DataPtr::new(ListData::default())).unwrap_err();
        assert_eq!(
            error.message(),
            "No valid builtin implementation for this method: at(int, list)"
        );
    });
}

#[test]
fn test_text_of_missing() {
    with_cx(|cx| {
        assert_eq!(text(cx, &DataPtr::missing()).unwrap(), "missing");
    });
}

fn literal_strategy() -> impl Strategy<Value = DataPtr> {
    prop_oneof![
        (-1000i64..1000).prop_map(DataPtr::from_int),
        (-1000.0f64..1000.0).prop_map(DataPtr::from_float),
        any::<bool>().prop_map(DataPtr::from_bool),
    ]
}

fn op_strategy() -> impl Strategy<Value = OpCode> {
    prop::sample::select(vec![
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::Div,
        OpCode::Mod,
        OpCode::Pow,
        OpCode::Lt,
        OpCode::Le,
        OpCode::Gt,
        OpCode::Ge,
        OpCode::Eq,
        OpCode::Neq,
        OpCode::And,
        OpCode::Or,
    ])
}

proptest! {
    #[test]
    fn fast_path_matches_receiver_dispatch(op in op_strategy(), a in literal_strategy(), b in literal_strategy()) {
        with_cx(|cx| {
            let fast = summary(binary(cx, op, &a, &b));
            let left = summary(binary(cx, op, &boxed(a.clone()), &b));
            let right = summary(binary(cx, op, &a, &boxed(b.clone())));
            match &fast {
                Ok(_) => {
                    prop_assert_eq!(&fast, &left);
                    prop_assert_eq!(&fast, &right);
                }
                Err(message) if message.starts_with("No valid builtin") => {
                    prop_assert!(left.is_err());
                    prop_assert!(right.is_err());
                }
                Err(_) => {
                    prop_assert_eq!(&fast, &left);
                    prop_assert_eq!(&fast, &right);
                }
            }
            Ok(())
        })?;
    }
}
