use super::*;
use crate::data::{ListData, StringData};
use crate::errors::runtime;
use bb_ir::Literal;
use pretty_assertions::assert_eq;

#[test]
fn test_literals_are_not_missing() {
    for value in [
        DataPtr::from_int(0),
        DataPtr::from_float(0.0),
        DataPtr::from_bool(false),
    ] {
        assert!(value.is_literal());
        assert!(!value.is_missing());
        assert_eq!(value.owners(), 0);
    }
}

#[test]
fn test_missing_is_a_null_pointer() {
    let value = DataPtr::missing();
    assert!(value.is_missing());
    assert!(!value.is_literal());
    assert!(value.obj().is_none());
    assert_eq!(value.type_name(), "missing");
    assert!(DataPtr::default().is_missing());
}

#[test]
fn test_accessors_match_tag() {
    let int = DataPtr::from_int(7);
    assert_eq!(int.as_int(), Some(7));
    assert_eq!(int.as_float(), None);
    assert_eq!(int.as_number(), Some(7.0));

    let float = DataPtr::from_float(2.5);
    assert_eq!(float.as_float(), Some(2.5));
    assert_eq!(float.as_int(), None);

    let flag = DataPtr::from_bool(true);
    assert_eq!(flag.as_bool(), Some(true));
    assert_eq!(flag.as_number(), None);
}

#[test]
fn test_owner_count_follows_clones() {
    let value = DataPtr::new(ListData::default());
    assert_eq!(value.owners(), 1);
    let second = value.clone();
    assert_eq!(value.owners(), 2);
    drop(second);
    assert_eq!(value.owners(), 1);
}

#[test]
fn test_is_same_compares_identity_for_objects() {
    let a = DataPtr::new(StringData::new("x"));
    let b = DataPtr::new(StringData::new("x"));
    assert!(a.is_same(&a.clone()));
    assert!(!a.is_same(&b));
    assert!(DataPtr::from_int(3).is_same(&DataPtr::from_int(3)));
    assert!(!DataPtr::from_int(1).is_same(&DataPtr::from_bool(true)));
}

#[test]
fn test_error_flag_tracks_pointee() {
    let error = ErrorData::value(runtime("boom"));
    assert!(error.is_error());
    assert!(error.error().is_some());

    let mut plain = DataPtr::new(ListData::default());
    plain.set_flag(ValueFlags::ERROR, true);
    assert!(!plain.is_error());
}

#[test]
fn test_property_bits_are_independent() {
    let mut value = DataPtr::from_int(1);
    value.set_flag(ValueFlags::A, true);
    assert_eq!(value.flags(), ValueFlags::A);
    value.set_flag(ValueFlags::B, true);
    value.set_flag(ValueFlags::A, false);
    assert_eq!(value.flags(), ValueFlags::B);
    assert_eq!(value.as_int(), Some(1));
}

#[test]
fn test_downcast_and_downcast_arc() {
    let value = DataPtr::new(StringData::new("hello"));
    assert_eq!(value.downcast::<StringData>().unwrap().as_str(), "hello");
    assert!(value.downcast::<ListData>().is_none());
    let shared = value.downcast_arc::<StringData>().unwrap();
    assert_eq!(value.owners(), 2);
    assert_eq!(shared.len(), 5);
}

#[test]
fn test_from_literal() {
    assert_eq!(DataPtr::from_literal(&Literal::Int(4)).as_int(), Some(4));
    assert_eq!(DataPtr::from_literal(&Literal::Bool(false)).as_bool(), Some(false));
    let text = DataPtr::from_literal(&Literal::Str("hi there".into()));
    assert_eq!(text.downcast::<StringData>().unwrap().as_str(), "hi there");
}

#[test]
fn test_literal_text() {
    assert_eq!(DataPtr::from_int(-3).literal_text().as_deref(), Some("-3"));
    assert_eq!(DataPtr::from_float(1.5).literal_text().as_deref(), Some("1.5"));
    assert_eq!(DataPtr::from_bool(true).literal_text().as_deref(), Some("true"));
    assert_eq!(DataPtr::new(ListData::default()).literal_text(), None);
}

/// Handle whose identity is its key, not its allocation.
#[derive(Debug)]
struct Handle(u32);

impl Data for Handle {
    fn type_name(&self) -> &'static str {
        "handle"
    }

    fn is_same(&self, _this: &DataPtr, other: &DataPtr) -> bool {
        other.downcast::<Handle>().is_some_and(|h| h.0 == self.0)
    }
}

#[test]
fn test_is_same_defers_to_the_pointee() {
    let a = DataPtr::new(Handle(1));
    let b = DataPtr::new(Handle(1));
    let c = DataPtr::new(Handle(2));
    assert!(a.is_same(&b));
    assert!(!a.is_same(&c));
    assert!(!a.is_same(&DataPtr::new(ListData::default())));
    assert!(!a.is_same(&DataPtr::missing()));
}
