//! `Int` 클래스 슬롯
//!
//! 정수 연산은 wrapping 의미론(2의 보수 오버플로)을 따르며, Float 피연산자가 섞이면
//! Float로 승격합니다. 비트 연산과 `%`는 Int끼리만 지원합니다 (`Int % Float`은
//! Float의 반사 슬롯으로 폴백).

use std::cmp::Ordering;

use crate::vm::registry::ClassRegistry;
use crate::vm::type_def::{BinaryOp, Class, UnaryOp};
use crate::vm::value::Value;

pub fn class() -> Class {
    Class::new("Int")
        .with_eq(int_eq)
        .with_hash(int_hash)
        .with_cmp(int_cmp)
        .with_str(int_str)
        .with_nonzero(int_nonzero)
        .with_conversions(int_to_int, int_to_float)
        .with_unary(UnaryOp::Plus, int_plus)
        .with_unary(UnaryOp::Minus, int_minus)
        .with_unary(UnaryOp::Abs, int_abs)
        .with_unary(UnaryOp::BitNot, int_not)
        .with_binary(BinaryOp::Add, int_add)
        .with_binary(BinaryOp::Sub, int_sub)
        .with_binary(BinaryOp::Mul, int_mul)
        .with_binary(BinaryOp::Div, int_div)
        .with_binary(BinaryOp::Mod, int_mod)
        .with_binary(BinaryOp::Pow, int_pow)
        .with_binary(BinaryOp::BitAnd, int_and)
        .with_binary(BinaryOp::BitOr, int_or)
        .with_binary(BinaryOp::Xor, int_xor)
        .with_binary(BinaryOp::ShiftL, int_shiftl)
        .with_binary(BinaryOp::ShiftR, int_shiftr)
}

fn int_of(v: &Value) -> i64 {
    match v {
        Value::Int(i) => *i,
        _ => 0,
    }
}

/// 부분 순서 → cmp 슬롯 결과 (-1/0/1). NaN은 비교 불가
pub(crate) fn ordering_value(ord: Option<Ordering>) -> Value {
    match ord {
        Some(o) => Value::Int(o as i64),
        None => Value::Unsupported,
    }
}

// ========== 산술 (fast path와 공유) ==========

/// Int 이항 산술. Int/Float 이외의 피연산자는 `Unsupported`.
pub(crate) fn arith(op: BinaryOp, x: i64, other: &Value) -> Value {
    match other {
        Value::Int(y) => int_arith(op, x, *y),
        Value::Float(y) => match op {
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Pow => super::float::float_arith(op, x as f64, *y),
            _ => Value::Unsupported,
        },
        _ => Value::Unsupported,
    }
}

pub(crate) fn int_arith(op: BinaryOp, x: i64, y: i64) -> Value {
    let r = match op {
        BinaryOp::Add => x.wrapping_add(y),
        BinaryOp::Sub => x.wrapping_sub(y),
        BinaryOp::Mul => x.wrapping_mul(y),
        BinaryOp::Div | BinaryOp::Mod if y == 0 => return Value::DivByZero,
        BinaryOp::Div => x.wrapping_div(y),
        BinaryOp::Mod => x.wrapping_rem(y),
        BinaryOp::Pow => int_pow_raw(x, y),
        BinaryOp::BitAnd => x & y,
        BinaryOp::BitOr => x | y,
        BinaryOp::Xor => x ^ y,
        BinaryOp::ShiftL => x.wrapping_shl(y as u32),
        BinaryOp::ShiftR => x.wrapping_shr(y as u32),
    };
    Value::Int(r)
}

fn int_pow_raw(x: i64, y: i64) -> i64 {
    match u32::try_from(y) {
        Ok(exp) => x.wrapping_pow(exp),
        Err(_) => (x as f64).powf(y as f64) as i64,
    }
}

// ========== 슬롯 ==========

fn int_eq(_: &ClassRegistry, this: &Value, other: &Value) -> bool {
    let x = int_of(this);
    match other {
        Value::Int(y) => x == *y,
        Value::Float(y) => x as f64 == *y,
        _ => false,
    }
}

fn int_hash(_: &ClassRegistry, this: &Value) -> i64 {
    int_of(this)
}

fn int_cmp(_: &ClassRegistry, this: &Value, other: &Value) -> Value {
    let x = int_of(this);
    match other {
        Value::Int(y) => Value::Int(x.cmp(y) as i64),
        Value::Float(y) => ordering_value((x as f64).partial_cmp(y)),
        _ => Value::Unsupported,
    }
}

fn int_str(_: &ClassRegistry, this: &Value) -> String {
    int_of(this).to_string()
}

fn int_nonzero(_: &ClassRegistry, this: &Value) -> bool {
    int_of(this) != 0
}

fn int_to_int(_: &ClassRegistry, this: &Value) -> Value {
    Value::Int(int_of(this))
}

fn int_to_float(_: &ClassRegistry, this: &Value) -> Value {
    Value::Float(int_of(this) as f64)
}

fn int_plus(_: &ClassRegistry, this: &Value) -> Value {
    Value::Int(int_of(this))
}

fn int_minus(_: &ClassRegistry, this: &Value) -> Value {
    Value::Int(int_of(this).wrapping_neg())
}

fn int_abs(_: &ClassRegistry, this: &Value) -> Value {
    Value::Int(int_of(this).wrapping_abs())
}

fn int_not(_: &ClassRegistry, this: &Value) -> Value {
    Value::Int(!int_of(this))
}

macro_rules! int_binop {
    ($name:ident, $op:expr) => {
        fn $name(_: &ClassRegistry, this: &Value, other: &Value) -> Value {
            arith($op, int_of(this), other)
        }
    };
}

int_binop!(int_add, BinaryOp::Add);
int_binop!(int_sub, BinaryOp::Sub);
int_binop!(int_mul, BinaryOp::Mul);
int_binop!(int_div, BinaryOp::Div);
int_binop!(int_mod, BinaryOp::Mod);
int_binop!(int_pow, BinaryOp::Pow);
int_binop!(int_and, BinaryOp::BitAnd);
int_binop!(int_or, BinaryOp::BitOr);
int_binop!(int_xor, BinaryOp::Xor);
int_binop!(int_shiftl, BinaryOp::ShiftL);
int_binop!(int_shiftr, BinaryOp::ShiftR);
