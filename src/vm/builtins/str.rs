//! `Str` 클래스: 불변 문자열
//!
//! 연결(`+`), 반복(`*`, Int 쪽에서 오면 반사 슬롯), 인덱싱, 부분 문자열 포함 검사,
//! 그리고 `upper` / `lower` 메서드를 제공합니다.

use std::cmp::Ordering;

use super::exception::{exc_make, index_exc_out_of_bounds};
use super::{CLASS_EXCEPTION, CLASS_STR};
use crate::vm::ops;
use crate::vm::registry::ClassRegistry;
use crate::vm::strdict::str_hash;
use crate::vm::type_def::{BinaryOp, Class, Layout, SeqMethods};
use crate::vm::utils::make_string_of;
use crate::vm::value::Value;

pub fn class() -> Class {
    Class::new("Str")
        .with_layout(Layout::Str)
        .with_init(str_init)
        .with_eq(str_eq)
        .with_cmp(str_cmp)
        .with_hash(str_hash_slot)
        .with_str(str_str)
        .with_nonzero(str_nonzero)
        .with_binary(BinaryOp::Add, str_cat)
        .with_binary(BinaryOp::Mul, str_repeat)
        .with_reflected(BinaryOp::Mul, str_repeat)
        .with_seq(SeqMethods {
            len: Some(str_len),
            get: Some(str_get),
            contains: Some(str_contains),
            ..SeqMethods::default()
        })
        .with_method("upper", str_upper)
        .with_method("lower", str_lower)
}

fn text(v: &Value) -> &str {
    v.as_str().unwrap_or("")
}

fn is_str(reg: &ClassRegistry, v: &Value) -> bool {
    reg.is_a(v, CLASS_STR)
}

/// `Str()` → 빈 문자열, `Str(x)` → x의 문자열 표현
fn str_init(reg: &ClassRegistry, this: &Value, args: &[Value]) -> Value {
    let class = this.class_id().unwrap_or(CLASS_STR);
    match args {
        [] => make_string_of(class, ""),
        [arg] => make_string_of(class, ops::to_str(reg, arg)),
        _ => ops::call_arity_error("Str", 1, args.len()),
    }
}

fn str_eq(reg: &ClassRegistry, this: &Value, other: &Value) -> bool {
    is_str(reg, other) && text(this) == text(other)
}

fn str_cmp(reg: &ClassRegistry, this: &Value, other: &Value) -> Value {
    if !is_str(reg, other) {
        return Value::Unsupported;
    }
    let ord: Ordering = text(this).cmp(text(other));
    Value::Int(ord as i64)
}

fn str_hash_slot(_: &ClassRegistry, this: &Value) -> i64 {
    str_hash(text(this)) as i64
}

fn str_str(_: &ClassRegistry, this: &Value) -> String {
    text(this).to_string()
}

fn str_nonzero(_: &ClassRegistry, this: &Value) -> bool {
    !text(this).is_empty()
}

fn str_cat(reg: &ClassRegistry, this: &Value, other: &Value) -> Value {
    if !is_str(reg, other) {
        return Value::Unsupported;
    }
    make_string_of(CLASS_STR, format!("{}{}", text(this), text(other)))
}

/// `s * n` 과 `n * s` (반사) 모두 이 함수로
/// 반복 결과 문자열의 최대 바이트 길이
const MAX_REPEAT_LEN: usize = 1 << 30;

fn str_repeat(_: &ClassRegistry, this: &Value, other: &Value) -> Value {
    let Value::Int(n) = other else {
        return Value::Unsupported;
    };
    let s = text(this);
    let count = usize::try_from((*n).max(0)).unwrap_or(usize::MAX);
    match s.len().checked_mul(count) {
        Some(total) if total <= MAX_REPEAT_LEN => make_string_of(CLASS_STR, s.repeat(count)),
        _ => exc_make(
            CLASS_EXCEPTION,
            true,
            format!("repeated string is too long ({} x {})", s.len(), n),
        ),
    }
}

fn str_len(_: &ClassRegistry, this: &Value) -> usize {
    text(this).chars().count()
}

/// 문자 단위 인덱싱 (음수 인덱스는 뒤에서부터)
fn str_get(reg: &ClassRegistry, this: &Value, idx: &Value) -> Value {
    let Value::Int(i) = idx else {
        return ops::type_error(format!(
            "Str indices must be Int, not {}",
            reg.class_name_of(idx)
        ));
    };
    let s = text(this);
    let len = s.chars().count();
    let pos = if *i < 0 { *i + len as i64 } else { *i };
    if pos < 0 || pos >= len as i64 {
        return index_exc_out_of_bounds(*i, len);
    }
    match s.chars().nth(pos as usize) {
        Some(c) => make_string_of(CLASS_STR, c.to_string()),
        None => index_exc_out_of_bounds(*i, len),
    }
}

fn str_contains(reg: &ClassRegistry, this: &Value, element: &Value) -> bool {
    is_str(reg, element) && text(this).contains(text(element))
}

fn str_upper(_: &ClassRegistry, this: &Value, _: &[Value]) -> Value {
    make_string_of(CLASS_STR, text(this).to_uppercase())
}

fn str_lower(_: &ClassRegistry, this: &Value, _: &[Value]) -> Value {
    make_string_of(CLASS_STR, text(this).to_lowercase())
}
