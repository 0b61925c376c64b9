//! 루트 클래스 `Object`
//!
//! 모든 super 체인의 끝. 여기 정의된 슬롯이 전 클래스의 기본값이 됩니다.
//! (identity 비교, 주소 해시, `<Class at 0x..>` 문자열, 항상 참인 truthiness)

use std::rc::Rc;

use crate::vm::registry::ClassRegistry;
use crate::vm::type_def::Class;
use crate::vm::value::Value;

pub fn class() -> Class {
    Class::new("Object")
        .with_init(obj_init)
        .with_eq(obj_eq)
        .with_hash(obj_hash)
        .with_str(obj_str)
        .with_nonzero(obj_nonzero)
}

fn obj_init(_: &ClassRegistry, this: &Value, _: &[Value]) -> Value {
    this.clone()
}

fn obj_eq(_: &ClassRegistry, this: &Value, other: &Value) -> bool {
    match (this, other) {
        (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

fn address(v: &Value) -> usize {
    match v {
        Value::Object(o) => Rc::as_ptr(o) as usize,
        _ => 0,
    }
}

fn obj_hash(_: &ClassRegistry, this: &Value) -> i64 {
    address(this) as i64
}

fn obj_str(reg: &ClassRegistry, this: &Value) -> String {
    format!("<{} at {:#x}>", reg.class_name_of(this), address(this))
}

fn obj_nonzero(_: &ClassRegistry, _: &Value) -> bool {
    true
}
