//! 연산자 프로토콜 테스트
//!
//! 테스트 전용 클래스를 레지스트리에 등록하여 폴백 체인을 검증합니다.

use std::rc::Rc;

use pretty_assertions::assert_eq;

use super::*;
use crate::runtime_io::BufferIo;
use crate::vm::builtins::{
    CLASS_DIV_BY_ZERO_EXC, CLASS_FLOAT, CLASS_INT, CLASS_OBJECT, CLASS_STR, CLASS_TYPE_EXC,
};
use crate::vm::type_def::{Class, Member, MemberKind, SeqMethods};
use crate::vm::utils::{make_instance, make_string};
use crate::vm::value::Field;

// ========== 테스트 클래스 ==========

fn long_field(v: &Value, index: usize) -> i64 {
    let fields = v.as_object().and_then(|o| o.fields()).unwrap();
    match fields.borrow()[index] {
        Field::Long(n) => n,
        ref other => panic!("unexpected field {:?}", other),
    }
}

fn set_long_field(v: &Value, index: usize, n: i64) {
    let fields = v.as_object().and_then(|o| o.fields()).unwrap();
    fields.borrow_mut()[index] = Field::Long(n);
}

fn num_add(_: &ClassRegistry, this: &Value, other: &Value) -> Value {
    let Value::Int(n) = other else {
        return Value::Unsupported;
    };
    let class = this.class_id().unwrap();
    make_instance(class, vec![Field::Long(long_field(this, 0) + n)])
}

fn num_iadd(_: &ClassRegistry, this: &Value, other: &Value) -> Value {
    let Value::Int(n) = other else {
        return Value::Unsupported;
    };
    set_long_field(this, 0, long_field(this, 0) + n);
    this.clone()
}

fn always_unsupported(_: &ClassRegistry, _: &Value, _: &Value) -> Value {
    Value::Unsupported
}

fn right_add(_: &ClassRegistry, _: &Value, other: &Value) -> Value {
    match other {
        Value::Int(n) => Value::Int(1000 + n),
        _ => Value::Unsupported,
    }
}

fn float_cmp_result(_: &ClassRegistry, _: &Value, _: &Value) -> Value {
    Value::Float(0.5)
}

fn keep_init(_: &ClassRegistry, this: &Value, _: &[Value]) -> Value {
    this.clone()
}

fn counter_members() -> Vec<Member> {
    vec![Member::new("n", MemberKind::Long, 0)]
}

fn num_init(_: &ClassRegistry, this: &Value, args: &[Value]) -> Value {
    if let Some(Value::Int(n)) = args.first() {
        set_long_field(this, 0, *n);
    }
    this.clone()
}

struct Fixture {
    reg: ClassRegistry,
    /// add만 있음
    plain: ClassId,
    /// iadd + add
    acc: ClassId,
    /// 반사 add만 있음
    right: ClassId,
    /// 정방향 add가 항상 Unsupported
    shy: ClassId,
    /// cmp가 Float를 반환
    bad_cmp: ClassId,
    range: ClassId,
}

fn range_iter(reg: &ClassRegistry, this: &Value) -> Value {
    let iter_class = reg.find("RangeIter").unwrap();
    make_instance(
        iter_class,
        vec![Field::Long(0), Field::Long(long_field(this, 0))],
    )
}

fn range_iternext(_: &ClassRegistry, this: &Value) -> Value {
    let cur = long_field(this, 0);
    if cur >= long_field(this, 1) {
        return Value::IterStop;
    }
    set_long_field(this, 0, cur + 1);
    Value::Int(cur)
}

fn fixture() -> Fixture {
    let mut reg = ClassRegistry::new();
    let plain = reg
        .register(
            Class::new("Num")
                .with_layout(Layout::Fields)
                .with_members(counter_members())
                .with_init(num_init)
                .with_binary(BinaryOp::Add, num_add),
        )
        .unwrap();
    let acc = reg
        .register(
            Class::new("Acc")
                .with_layout(Layout::Fields)
                .with_members(counter_members())
                .with_init(num_init)
                .with_binary(BinaryOp::Add, num_add)
                .with_inplace(BinaryOp::Add, num_iadd),
        )
        .unwrap();
    let right = reg
        .register(
            Class::new("Right")
                .with_init(keep_init)
                .with_reflected(BinaryOp::Add, right_add),
        )
        .unwrap();
    let shy = reg
        .register(
            Class::new("Shy")
                .with_init(keep_init)
                .with_binary(BinaryOp::Add, always_unsupported),
        )
        .unwrap();
    let bad_cmp = reg
        .register(
            Class::new("BadCmp")
                .with_init(keep_init)
                .with_cmp(float_cmp_result),
        )
        .unwrap();
    let range = reg
        .register(
            Class::new("Range")
                .with_layout(Layout::Fields)
                .with_members(counter_members())
                .with_init(num_init)
                .with_seq(SeqMethods {
                    iter: Some(range_iter),
                    ..SeqMethods::default()
                }),
        )
        .unwrap();
    reg.register(
        Class::new("RangeIter")
            .with_layout(Layout::Fields)
            .with_members(vec![
                Member::new("cur", MemberKind::Long, 0),
                Member::new("stop", MemberKind::Long, 1),
            ])
            .with_seq(SeqMethods {
                iternext: Some(range_iternext),
                ..SeqMethods::default()
            }),
    )
    .unwrap();

    Fixture {
        reg,
        plain,
        acc,
        right,
        shy,
        bad_cmp,
        range,
    }
}

fn message(v: &Value) -> String {
    exception_message(v).map(|m| m.to_string()).unwrap_or_default()
}

// ========== 이항 연산 ==========

#[test]
fn test_binary_numeric() {
    let reg = ClassRegistry::new();
    assert_eq!(binary(&reg, BinaryOp::Add, &Value::Int(3), &Value::Int(4)), Value::Int(7));
    assert_eq!(
        binary(&reg, BinaryOp::Mul, &Value::Int(3), &Value::Float(0.5)),
        Value::Float(1.5)
    );
    // Int % Float → Float의 반사 mod
    assert_eq!(
        binary(&reg, BinaryOp::Mod, &Value::Int(7), &Value::Float(2.0)),
        Value::Float(1.0)
    );
}

#[test]
fn test_binary_without_slots_names_both_classes() {
    let f = fixture();
    let a = instantiate(&f.reg, CLASS_OBJECT, &[]);
    let b = make_string("x");
    let r = binary(&f.reg, BinaryOp::Add, &a, &b);
    assert!(r.is_active_exception());
    assert_eq!(r.class_id(), Some(CLASS_TYPE_EXC));
    assert_eq!(message(&r), "unsupported operand types for +: 'Object' and 'Str'");
}

#[test]
fn test_reflected_fallback_when_left_lacks_slot() {
    let f = fixture();
    let left = instantiate(&f.reg, CLASS_OBJECT, &[]);
    let right = instantiate(&f.reg, f.right, &[]);
    // Object에는 add가 없으므로 Right.radd(right, left) 호출 → Object는 Int가 아님
    let r = binary(&f.reg, BinaryOp::Add, &left, &right);
    assert_eq!(r.class_id(), Some(CLASS_TYPE_EXC));

    // Int.add(5, right)는 Unsupported → Right.radd(right, 5)
    let r = binary(&f.reg, BinaryOp::Add, &Value::Int(5), &right);
    assert_eq!(r, Value::Int(1005));
}

#[test]
fn test_reflected_fallback_when_forward_is_unsupported() {
    let f = fixture();
    let shy = instantiate(&f.reg, f.shy, &[]);
    let right = instantiate(&f.reg, f.right, &[]);
    let r = binary(&f.reg, BinaryOp::Add, &shy, &right);
    // radd(right, shy): shy는 Int가 아니므로 Unsupported → TypeException
    assert_eq!(message(&r), "unsupported operand types for +: 'Shy' and 'Right'");
}

#[test]
fn test_string_repeat_uses_reflected_slot() {
    let reg = ClassRegistry::new();
    let s = make_string("ab");
    let r = binary(&reg, BinaryOp::Mul, &Value::Int(3), &s);
    assert_eq!(r.as_str(), Some("ababab"));
    let r = binary(&reg, BinaryOp::Add, &s, &make_string("cd"));
    assert_eq!(r.as_str(), Some("abcd"));
}

#[test]
fn test_division_by_zero_becomes_exception() {
    let reg = ClassRegistry::new();
    for (op, a, b) in [
        (BinaryOp::Div, Value::Int(5), Value::Int(0)),
        (BinaryOp::Mod, Value::Int(5), Value::Int(0)),
        (BinaryOp::Div, Value::Float(1.0), Value::Int(0)),
        (BinaryOp::Mod, Value::Int(5), Value::Float(0.0)),
    ] {
        let r = binary(&reg, op, &a, &b);
        assert!(r.is_active_exception(), "{:?} {:?} {:?}", op, a, b);
        assert_eq!(r.class_id(), Some(CLASS_DIV_BY_ZERO_EXC));
        assert_eq!(message(&r), "division or modulo by zero");
    }
}

// ========== in-place ==========

#[test]
fn test_inplace_fallback_releases_left_and_returns_new_value() {
    let f = fixture();
    let a = instantiate(&f.reg, f.plain, &[Value::Int(1)]);
    let original = a.as_object().unwrap().clone();
    assert_eq!(Rc::strong_count(&original), 2);

    let r = inplace(&f.reg, BinaryOp::Add, a, &Value::Int(2));

    assert_eq!(Rc::strong_count(&original), 1);
    assert!(!Rc::ptr_eq(&original, r.as_object().unwrap()));
    assert_eq!(long_field(&r, 0), 3);
}

#[test]
fn test_inplace_slot_mutates_left_operand() {
    let f = fixture();
    let a = instantiate(&f.reg, f.acc, &[Value::Int(10)]);
    let original = a.as_object().unwrap().clone();

    let r = inplace(&f.reg, BinaryOp::Add, a, &Value::Int(5));

    assert!(Rc::ptr_eq(&original, r.as_object().unwrap()));
    assert_eq!(long_field(&r, 0), 15);
}

#[test]
fn test_inplace_error_uses_compound_token() {
    let f = fixture();
    let a = instantiate(&f.reg, f.acc, &[]);
    let r = inplace(&f.reg, BinaryOp::Add, a, &make_string("x"));
    assert_eq!(message(&r), "unsupported operand types for +=: 'Acc' and 'Str'");
}

#[test]
fn test_inplace_on_primitives() {
    let reg = ClassRegistry::new();
    let r = inplace(&reg, BinaryOp::Sub, Value::Int(10), &Value::Int(4));
    assert_eq!(r, Value::Int(6));
}

// ========== 단항 / 논리 ==========

#[test]
fn test_unary() {
    let reg = ClassRegistry::new();
    assert_eq!(unary(&reg, UnaryOp::Minus, &Value::Int(3)), Value::Int(-3));
    assert_eq!(unary(&reg, UnaryOp::Abs, &Value::Float(-2.5)), Value::Float(2.5));
    let r = unary(&reg, UnaryOp::BitNot, &Value::Float(1.0));
    assert_eq!(message(&r), "unsupported operand type for ~: 'Float'");
}

#[test]
fn test_logical_ops_never_fail() {
    let f = fixture();
    let obj = instantiate(&f.reg, f.shy, &[]);
    assert!(truthy(&f.reg, &obj));
    assert!(!truthy(&f.reg, &Value::Int(0)));
    assert!(!truthy(&f.reg, &make_string("")));
    assert_eq!(logical_and(&f.reg, &obj, &Value::Int(0)), Value::Int(0));
    assert_eq!(logical_or(&f.reg, &Value::Float(0.0), &obj), Value::Int(1));
    assert_eq!(logical_not(&f.reg, &obj), Value::Int(0));
}

// ========== 비교 ==========

#[test]
fn test_eq_without_slot_defaults_to_not_equal() {
    let reg = ClassRegistry::new();
    assert_eq!(eq(&reg, &Value::Int(2), &Value::Float(2.0)), Value::Int(1));
    assert_eq!(eq(&reg, &make_string("a"), &make_string("a")), Value::Int(1));
    assert_eq!(eq(&reg, &make_string("a"), &Value::Int(1)), Value::Int(0));
    assert_eq!(neq(&reg, &Value::Int(1), &Value::Int(2)), Value::Int(1));
}

#[test]
fn test_compare() {
    let f = fixture();
    assert_eq!(compare(&f.reg, CmpOp::Lt, &Value::Int(1), &Value::Int(2)), Value::Int(1));
    assert_eq!(
        compare(&f.reg, CmpOp::Ge, &Value::Float(1.5), &Value::Int(2)),
        Value::Int(0)
    );
    assert_eq!(
        compare(&f.reg, CmpOp::Le, &make_string("abc"), &make_string("abd")),
        Value::Int(1)
    );

    let r = compare(&f.reg, CmpOp::Lt, &make_string("a"), &Value::Int(1));
    assert_eq!(message(&r), "unsupported operand types for <: 'Str' and 'Int'");

    let bad = instantiate(&f.reg, f.bad_cmp, &[]);
    let Value::Error(e) = compare(&f.reg, CmpOp::Gt, &bad, &Value::Int(0)) else {
        panic!("expected error value");
    };
    assert_eq!(e.message, "comparison of type 'BadCmp' did not return an int");
}

// ========== 시퀀스 / 반복 ==========

#[test]
fn test_indexing() {
    let reg = ClassRegistry::new();
    let s = make_string("héllo");
    assert_eq!(get(&reg, &s, &Value::Int(1)).as_str(), Some("é"));
    assert_eq!(get(&reg, &s, &Value::Int(-1)).as_str(), Some("o"));
    let r = get(&reg, &s, &Value::Int(9));
    assert_eq!(message(&r), "index 9 out of bounds for length 5");

    let r = get(&reg, &Value::Int(3), &Value::Int(0));
    assert_eq!(message(&r), "type 'Int' does not support indexing");
    let r = set(&reg, &s, &Value::Int(0), &Value::Int(0));
    assert_eq!(message(&r), "type 'Str' does not support indexing");
}

#[test]
fn test_len() {
    let reg = ClassRegistry::new();
    assert_eq!(len(&reg, &make_string("abc")), Value::Int(3));
    assert_eq!(message(&len(&reg, &Value::Int(1))), "object of type 'Int' has no len()");
}

#[test]
fn test_contains_uses_slot() {
    let reg = ClassRegistry::new();
    let hay = make_string("haystack");
    assert_eq!(contains(&reg, &make_string("st"), &hay), Value::Int(1));
    assert_eq!(contains(&reg, &make_string("zz"), &hay), Value::Int(0));
}

#[test]
fn test_contains_falls_back_to_iteration() {
    let f = fixture();
    let range = instantiate(&f.reg, f.range, &[Value::Int(5)]);
    assert_eq!(contains(&f.reg, &Value::Int(3), &range), Value::Int(1));
    assert_eq!(contains(&f.reg, &Value::Float(4.0), &range), Value::Int(1));
    assert_eq!(contains(&f.reg, &Value::Int(5), &range), Value::Int(0));

    let r = contains(&f.reg, &Value::Int(1), &Value::Int(5));
    assert_eq!(message(&r), "object of type 'Int' is not iterable");
}

#[test]
fn test_iter_protocol() {
    let f = fixture();
    let range = instantiate(&f.reg, f.range, &[Value::Int(2)]);
    let it = iter(&f.reg, &range);
    assert_eq!(iternext(&f.reg, &it), Value::Int(0));
    assert_eq!(iternext(&f.reg, &it), Value::Int(1));
    assert!(iternext(&f.reg, &it).is_iter_stop());

    let r = iternext(&f.reg, &range);
    assert_eq!(message(&r), "object of type 'Range' is not an iterator");
}

// ========== 호출 / 적용 ==========

#[test]
fn test_call_not_callable() {
    let reg = ClassRegistry::new();
    let r = call(&reg, &Value::Int(1), &[]);
    assert_eq!(message(&r), "object of type 'Int' is not callable");
}

#[test]
fn test_apply_requires_slot_and_callable() {
    let reg = ClassRegistry::new();
    let s = make_string("x");
    let r = apply(&reg, &s, &Value::Int(1));
    assert_eq!(
        message(&r),
        "object of type 'Str' does not support function application"
    );
    let r = iapply(&reg, s, &Value::Int(1));
    assert_eq!(message(&r), "object of type 'Int' is not callable");
}

// ========== 생성 / 변환 / 출력 ==========

#[test]
fn test_instantiate_primitive_class_fails() {
    let reg = ClassRegistry::new();
    let r = instantiate(&reg, CLASS_INT, &[]);
    assert_eq!(message(&r), "class 'Int' cannot be instantiated");
    let s = instantiate(&reg, CLASS_STR, &[Value::Float(1.5)]);
    assert_eq!(s.as_str(), Some("1.500000"));
}

#[test]
fn test_conversions() {
    let reg = ClassRegistry::new();
    assert_eq!(to_int(&reg, &Value::Float(3.9)), Value::Int(3));
    assert_eq!(to_float(&reg, &Value::Int(2)), Value::Float(2.0));
    assert_eq!(to_float(&reg, &Value::Int(2)).class_id(), Some(CLASS_FLOAT));
    let r = to_int(&reg, &make_string("3"));
    assert_eq!(message(&r), "unsupported operand type for Int(): 'Str'");
}

#[test]
fn test_print_formats() {
    let reg = ClassRegistry::new();
    let mut io = BufferIo::new();
    print(&reg, &Value::Int(7), &mut io).unwrap();
    print(&reg, &Value::Float(2.5), &mut io).unwrap();
    print(&reg, &make_string("hi"), &mut io).unwrap();
    assert!(print(&reg, &Value::Unsupported, &mut io).is_err());
    assert_eq!(io.take_output(), "7\n2.500000\nhi\n");
}

#[test]
fn test_hash() {
    let reg = ClassRegistry::new();
    assert_eq!(hash(&reg, &Value::Int(42)), Value::Int(42));
    assert_eq!(
        hash(&reg, &make_string("ab")),
        hash(&reg, &make_string("ab"))
    );
}
