//! `Float` 클래스 슬롯

use crate::vm::registry::ClassRegistry;
use crate::vm::type_def::{BinaryOp, Class, UnaryOp};
use crate::vm::utils::{as_number, format_float};
use crate::vm::value::Value;

use super::int::ordering_value;

pub fn class() -> Class {
    Class::new("Float")
        .with_eq(float_eq)
        .with_hash(float_hash)
        .with_cmp(float_cmp)
        .with_str(float_str)
        .with_nonzero(float_nonzero)
        .with_conversions(float_to_int, float_to_float)
        .with_unary(UnaryOp::Plus, float_plus)
        .with_unary(UnaryOp::Minus, float_minus)
        .with_unary(UnaryOp::Abs, float_abs)
        .with_binary(BinaryOp::Add, float_add)
        .with_binary(BinaryOp::Sub, float_sub)
        .with_binary(BinaryOp::Mul, float_mul)
        .with_binary(BinaryOp::Div, float_div)
        .with_binary(BinaryOp::Mod, float_mod)
        .with_binary(BinaryOp::Pow, float_pow)
        .with_reflected(BinaryOp::Mod, float_rmod)
}

fn float_of(v: &Value) -> f64 {
    as_number(v).unwrap_or(0.0)
}

/// Float 이항 산술. 0으로 나누기는 `DivByZero` sentinel.
pub(crate) fn float_arith(op: BinaryOp, x: f64, y: f64) -> Value {
    let r = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div | BinaryOp::Mod if y == 0.0 => return Value::DivByZero,
        BinaryOp::Div => x / y,
        BinaryOp::Mod => x % y,
        BinaryOp::Pow => x.powf(y),
        _ => return Value::Unsupported,
    };
    Value::Float(r)
}

fn float_eq(_: &ClassRegistry, this: &Value, other: &Value) -> bool {
    as_number(other).is_some_and(|y| float_of(this) == y)
}

fn float_hash(_: &ClassRegistry, this: &Value) -> i64 {
    let f = float_of(this);
    // 정수 값은 같은 Int와 같은 해시
    if f.fract() == 0.0 && f.is_finite() && f.abs() < i64::MAX as f64 {
        f as i64
    } else {
        f.to_bits() as i64
    }
}

fn float_cmp(_: &ClassRegistry, this: &Value, other: &Value) -> Value {
    match as_number(other) {
        Some(y) => ordering_value(float_of(this).partial_cmp(&y)),
        None => Value::Unsupported,
    }
}

fn float_str(_: &ClassRegistry, this: &Value) -> String {
    format_float(float_of(this))
}

fn float_nonzero(_: &ClassRegistry, this: &Value) -> bool {
    float_of(this) != 0.0
}

fn float_to_int(_: &ClassRegistry, this: &Value) -> Value {
    Value::Int(float_of(this) as i64)
}

fn float_to_float(_: &ClassRegistry, this: &Value) -> Value {
    Value::Float(float_of(this))
}

fn float_plus(_: &ClassRegistry, this: &Value) -> Value {
    Value::Float(float_of(this))
}

fn float_minus(_: &ClassRegistry, this: &Value) -> Value {
    Value::Float(-float_of(this))
}

fn float_abs(_: &ClassRegistry, this: &Value) -> Value {
    Value::Float(float_of(this).abs())
}

macro_rules! float_binop {
    ($name:ident, $op:expr) => {
        fn $name(_: &ClassRegistry, this: &Value, other: &Value) -> Value {
            match as_number(other) {
                Some(y) => float_arith($op, float_of(this), y),
                None => Value::Unsupported,
            }
        }
    };
}

float_binop!(float_add, BinaryOp::Add);
float_binop!(float_sub, BinaryOp::Sub);
float_binop!(float_mul, BinaryOp::Mul);
float_binop!(float_div, BinaryOp::Div);
float_binop!(float_mod, BinaryOp::Mod);
float_binop!(float_pow, BinaryOp::Pow);

/// `other % this` (Int % Float 폴백)
fn float_rmod(_: &ClassRegistry, this: &Value, other: &Value) -> Value {
    match as_number(other) {
        Some(x) => float_arith(BinaryOp::Mod, x, float_of(this)),
        None => Value::Unsupported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_arith() {
        assert_eq!(float_arith(BinaryOp::Div, 1.0, 4.0), Value::Float(0.25));
        assert_eq!(float_arith(BinaryOp::Mod, 7.5, 2.0), Value::Float(1.5));
        assert!(float_arith(BinaryOp::Div, 1.0, 0.0).is_div_by_zero());
        assert!(float_arith(BinaryOp::BitAnd, 1.0, 1.0).is_unsupported());
    }

    #[test]
    fn test_float_hash_matches_int_for_integral_values() {
        let reg = ClassRegistry::new();
        assert_eq!(float_hash(&reg, &Value::Float(3.0)), 3);
    }
}
