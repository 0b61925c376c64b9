//! 연산자 프로토콜
//!
//! 언어 수준의 모든 연산자를 해석된 슬롯으로 구현합니다. 이항 연산의 해석 순서:
//!
//! 1. 왼쪽 피연산자 클래스의 정방향 슬롯 `op(a, b)`
//! 2. 없거나 `Unsupported`이면 오른쪽 클래스의 반사 슬롯 `rop(b, a)`
//! 3. 그것도 실패하면 두 클래스 이름과 연산자 토큰을 담은 TypeException
//! 4. 결과가 `DivByZero`이면 DivisionByZeroException
//!
//! 복합 대입(`op=`)은 1번 앞에 in-place 슬롯을 한 단계 더 둡니다.
//!
//! 모든 함수는 실패를 Value로 돌려줍니다 (활성 예외 또는 `Value::Error`).
//! 피연산자는 sentinel이 아니어야 합니다.

use std::cell::RefCell;
use std::rc::Rc;

use super::builtins::CLASS_TYPE_EXC;
use super::builtins::exception::{
    self, call_exc_args, div_by_zero_exc, exc_make, type_exc_cannot_apply, type_exc_cannot_index,
    type_exc_cannot_instantiate, type_exc_no_len, type_exc_not_callable, type_exc_not_iterable,
    type_exc_not_iterator, type_exc_unsupported_1, type_exc_unsupported_2,
};
use super::error::Error;
use super::registry::ClassRegistry;
use super::type_def::{BinaryOp, ClassId, CmpOp, Layout, Slot, UnaryOp};
use super::utils::format_float;
use super::value::{ExceptionData, Object, ObjectData, Value};
use crate::runtime_io::RuntimeIo;

/// 피연산자의 클래스. sentinel이 들어오면 내부 에러 Value를 반환하고 빠져나감
macro_rules! class_of {
    ($v:expr) => {
        match $v.class_id() {
            Some(class) => class,
            None => return Value::from_error(Error::internal("operand has no class")),
        }
    };
}

pub fn type_error(msg: impl AsRef<str>) -> Value {
    exc_make(CLASS_TYPE_EXC, true, msg)
}

pub fn call_arity_error(func: &str, expected: usize, got: usize) -> Value {
    call_exc_args(func, expected, got)
}

// ========== 생성 ==========

/// 클래스 레이아웃대로 인스턴스를 할당하고 생성자(init 슬롯)를 호출
pub fn instantiate(reg: &ClassRegistry, class: ClassId, args: &[Value]) -> Value {
    let Some(c) = reg.get(class) else {
        return Value::from_error(Error::internal("instantiate on unregistered class"));
    };
    let Some(init) = c.init else {
        return type_exc_cannot_instantiate(&c.name);
    };

    let data = match c.layout {
        Layout::Plain => ObjectData::Plain,
        Layout::Fields => ObjectData::Fields(RefCell::new(c.zeroed_fields())),
        Layout::Exception => ObjectData::Exception(ExceptionData::default()),
        Layout::Str => ObjectData::Str(Rc::from("")),
        Layout::Method | Layout::Code => return type_exc_cannot_instantiate(&c.name),
    };

    let instance = Object::new(class, data).into_value();
    init(reg, &instance, args)
}

// ========== 일반 연산 ==========

pub fn hash(reg: &ClassRegistry, v: &Value) -> Value {
    let class = class_of!(v);
    match reg.resolve_hash(class) {
        Some(f) => Value::Int(f(reg, v)),
        None => type_exc_unsupported_1("hash", reg.name(class)),
    }
}

/// 문자열 표현. 루트 클래스가 기본 구현을 제공하므로 항상 성공
pub fn to_str(reg: &ClassRegistry, v: &Value) -> String {
    let Some(class) = v.class_id() else {
        return "<sentinel>".to_string();
    };
    match reg.resolve_str(class) {
        Some(f) => f(reg, v),
        None => format!("<{}>", reg.name(class)),
    }
}

/// `print` 명령: 값 하나를 한 줄로 출력
pub fn print(reg: &ClassRegistry, v: &Value, io: &mut dyn RuntimeIo) -> Result<(), Error> {
    match v {
        Value::Int(i) => io.write_line(&i.to_string()),
        Value::Float(f) => io.write_line(&format_float(*f)),
        Value::Object(o) => {
            if v.is_active_exception() {
                io.write_line(&to_str(reg, v));
            } else if let Some(p) = reg.resolve_print(o.class) {
                p(reg, v, io);
            } else {
                io.write_line(&to_str(reg, v));
            }
        }
        _ => return Err(Error::internal("print on a sentinel value")),
    }
    Ok(())
}

// ========== 이항 / 단항 ==========

/// 정방향 → 반사 순서로 시도한 원시 결과 (`Unsupported`일 수 있음)
fn binary_raw(reg: &ClassRegistry, op: BinaryOp, a: &Value, b: &Value) -> Value {
    let ca = class_of!(a);
    let cb = class_of!(b);

    let mut result = Value::Unsupported;
    if let Some(f) = reg.resolve_binary(ca, Slot::Binary(op)) {
        result = f(reg, a, b);
    }
    if result.is_unsupported()
        && let Some(r) = reg.resolve_binary(cb, Slot::Reflected(op))
    {
        result = r(reg, b, a);
    }
    result
}

/// sentinel 결과를 예외로 확정
fn finish(reg: &ClassRegistry, token: &str, a: &Value, b: &Value, result: Value) -> Value {
    match result {
        Value::Unsupported => {
            type_exc_unsupported_2(token, reg.class_name_of(a), reg.class_name_of(b))
        }
        Value::DivByZero => div_by_zero_exc(),
        other => other,
    }
}

pub fn binary(reg: &ClassRegistry, op: BinaryOp, a: &Value, b: &Value) -> Value {
    let result = binary_raw(reg, op, a, b);
    finish(reg, op.token(), a, b, result)
}

/// 복합 대입 `a op= b`
///
/// in-place 슬롯 → 정방향 → 반사의 세 단계만 시도합니다. in-place 슬롯이 처리하면
/// 변경된 왼쪽 값이 그대로 반환되고, 폴백 경로에서는 새 값이 반환되며 원래의 왼쪽
/// 값은 여기서 release 됩니다 (호출자는 저장된 참조를 반환값으로 덮어씀).
pub fn inplace(reg: &ClassRegistry, op: BinaryOp, a: Value, b: &Value) -> Value {
    let ca = class_of!(a);
    let token = op.inplace_token();

    if let Some(f) = reg.resolve_binary(ca, Slot::Inplace(op)) {
        let result = f(reg, &a, b);
        if !result.is_unsupported() {
            return finish(reg, token, &a, b, result);
        }
    }

    let result = binary_raw(reg, op, &a, b);
    let result = finish(reg, token, &a, b, result);
    drop(a);
    result
}

pub fn unary(reg: &ClassRegistry, op: UnaryOp, v: &Value) -> Value {
    let class = class_of!(v);
    let result = match reg.resolve_unary(class, Slot::Unary(op)) {
        Some(f) => f(reg, v),
        None => Value::Unsupported,
    };
    match result {
        Value::Unsupported => type_exc_unsupported_1(op.token(), reg.name(class)),
        other => other,
    }
}

// ========== 논리 ==========

/// truthiness. 루트 클래스가 기본값(참)을 제공하므로 실패하지 않음
pub fn truthy(reg: &ClassRegistry, v: &Value) -> bool {
    let Some(class) = v.class_id() else {
        return false;
    };
    reg.resolve_truth(class).is_none_or(|f| f(reg, v))
}

pub fn logical_and(reg: &ClassRegistry, a: &Value, b: &Value) -> Value {
    Value::bool(truthy(reg, a) && truthy(reg, b))
}

pub fn logical_or(reg: &ClassRegistry, a: &Value, b: &Value) -> Value {
    Value::bool(truthy(reg, a) || truthy(reg, b))
}

pub fn logical_not(reg: &ClassRegistry, v: &Value) -> Value {
    Value::bool(!truthy(reg, v))
}

// ========== 비교 ==========

/// `==`: 왼쪽 클래스의 eq 슬롯만 사용. 없으면 "같지 않음"
pub fn eq(reg: &ClassRegistry, a: &Value, b: &Value) -> Value {
    let class = class_of!(a);
    match reg.resolve_eq(class, Slot::Eq) {
        Some(f) => Value::bool(f(reg, a, b)),
        None => Value::bool(false),
    }
}

pub fn neq(reg: &ClassRegistry, a: &Value, b: &Value) -> Value {
    match eq(reg, a, b) {
        Value::Int(n) => Value::bool(n == 0),
        other => other,
    }
}

/// 순서 비교. cmp 슬롯은 Int(음수/0/양수)를 반환해야 함
pub fn compare(reg: &ClassRegistry, op: CmpOp, a: &Value, b: &Value) -> Value {
    let ca = class_of!(a);
    let Some(cmp) = reg.resolve_binary(ca, Slot::Cmp) else {
        return type_exc_unsupported_2(op.token(), reg.name(ca), reg.class_name_of(b));
    };

    match cmp(reg, a, b) {
        Value::Int(n) => Value::bool(op.test(n)),
        Value::Unsupported => {
            type_exc_unsupported_2(op.token(), reg.name(ca), reg.class_name_of(b))
        }
        failure if failure.is_failure() => failure,
        _ => Value::from_error(Error::invalid_cmp(reg.name(ca))),
    }
}

// ========== 시퀀스 ==========

pub fn get(reg: &ClassRegistry, v: &Value, idx: &Value) -> Value {
    let class = class_of!(v);
    match reg.resolve_binary(class, Slot::Get) {
        Some(f) => f(reg, v, idx),
        None => type_exc_cannot_index(reg.name(class)),
    }
}

pub fn set(reg: &ClassRegistry, v: &Value, idx: &Value, e: &Value) -> Value {
    let class = class_of!(v);
    match reg.resolve_set(class) {
        Some(f) => f(reg, v, idx, e),
        None => type_exc_cannot_index(reg.name(class)),
    }
}

pub fn len(reg: &ClassRegistry, v: &Value) -> Value {
    let class = class_of!(v);
    match reg.resolve_len(class) {
        Some(f) => Value::Int(f(reg, v) as i64),
        None => type_exc_no_len(reg.name(class)),
    }
}

fn is_callable(reg: &ClassRegistry, f: &Value) -> bool {
    f.class_id()
        .is_some_and(|class| reg.resolve_call(class).is_some())
}

/// 수신자에 함수를 적용한 새 값
pub fn apply(reg: &ClassRegistry, v: &Value, f: &Value) -> Value {
    let class = class_of!(v);
    let Some(apply) = reg.resolve_binary(class, Slot::Apply) else {
        return type_exc_cannot_apply(reg.name(class));
    };
    if !is_callable(reg, f) {
        return type_exc_not_callable(reg.class_name_of(f));
    }
    apply(reg, v, f)
}

/// 수신자를 제자리에서 변환. iapply가 없으면 apply로 폴백하고 원래 값을 release
pub fn iapply(reg: &ClassRegistry, v: Value, f: &Value) -> Value {
    let class = class_of!(v);
    if !is_callable(reg, f) {
        return type_exc_not_callable(reg.class_name_of(f));
    }

    if let Some(iapply) = reg.resolve_binary(class, Slot::IApply) {
        return iapply(reg, &v, f);
    }

    let Some(apply) = reg.resolve_binary(class, Slot::Apply) else {
        return type_exc_cannot_apply(reg.name(class));
    };
    let result = apply(reg, &v, f);
    drop(v);
    result
}

// ========== 호출 ==========

pub fn call(reg: &ClassRegistry, f: &Value, args: &[Value]) -> Value {
    let class = class_of!(f);
    match reg.resolve_call(class) {
        Some(call) => call(reg, f, args),
        None => type_exc_not_callable(reg.name(class)),
    }
}

// ========== 반복 ==========

pub fn iter(reg: &ClassRegistry, v: &Value) -> Value {
    let class = class_of!(v);
    match reg.resolve_unary(class, Slot::Iter) {
        Some(f) => f(reg, v),
        None => type_exc_not_iterable(reg.name(class)),
    }
}

/// 다음 원소, `IterStop`, 또는 예외
pub fn iternext(reg: &ClassRegistry, v: &Value) -> Value {
    let class = class_of!(v);
    match reg.resolve_unary(class, Slot::IterNext) {
        Some(f) => f(reg, v),
        None => type_exc_not_iterator(reg.name(class)),
    }
}

/// `element in collection`
///
/// contains 슬롯이 없으면 반복자를 돌며 eq로 비교합니다.
pub fn contains(reg: &ClassRegistry, element: &Value, collection: &Value) -> Value {
    let class = class_of!(collection);
    if let Some(f) = reg.resolve_eq(class, Slot::Contains) {
        return Value::bool(f(reg, collection, element));
    }

    let Some(iter_fn) = reg.resolve_unary(class, Slot::Iter) else {
        return type_exc_not_iterable(reg.name(class));
    };
    let it = iter_fn(reg, collection);
    if it.is_failure() {
        return it;
    }

    let iter_class = class_of!(it);
    let Some(next_fn) = reg.resolve_unary(iter_class, Slot::IterNext) else {
        return type_exc_not_iterator(reg.name(iter_class));
    };

    loop {
        let next = next_fn(reg, &it);
        if next.is_iter_stop() {
            return Value::bool(false);
        }
        if next.is_failure() {
            return next;
        }

        match eq(reg, &next, element) {
            Value::Int(0) => {}
            Value::Int(_) => return Value::bool(true),
            other => return other,
        }
    }
}

// ========== 변환 ==========

pub fn to_int(reg: &ClassRegistry, v: &Value) -> Value {
    let class = class_of!(v);
    match reg.resolve_unary(class, Slot::ToInt) {
        Some(f) => f(reg, v),
        None => type_exc_unsupported_1("Int()", reg.name(class)),
    }
}

pub fn to_float(reg: &ClassRegistry, v: &Value) -> Value {
    let class = class_of!(v);
    match reg.resolve_unary(class, Slot::ToFloat) {
        Some(f) => f(reg, v),
        None => type_exc_unsupported_1("Float()", reg.name(class)),
    }
}

/// 예외 메시지 조회 (테스트/진단용 단축)
pub fn exception_message(v: &Value) -> Option<Rc<str>> {
    exception::message_of(v)
}

#[cfg(test)]
mod tests;
