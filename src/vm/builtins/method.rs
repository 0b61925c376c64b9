//! `Method` 클래스: 바인더가 묶인 메서드
//!
//! 메서드 객체는 바인더를 retain하므로, 메서드가 살아 있는 동안 바인더도 살아 있습니다.

use crate::vm::error::Error;
use crate::vm::registry::ClassRegistry;
use crate::vm::type_def::{Class, Layout};
use crate::vm::value::{ObjectData, Value};

pub fn class() -> Class {
    Class::new("Method")
        .with_layout(Layout::Method)
        .with_call(meth_invoke)
        .with_str(meth_str)
}

fn meth_invoke(reg: &ClassRegistry, this: &Value, args: &[Value]) -> Value {
    match this.as_object().map(|o| &o.data) {
        Some(ObjectData::Method(m)) => (m.func)(reg, &Value::Object(m.binder.clone()), args),
        _ => Value::from_error(Error::internal("method call on non-method object")),
    }
}

fn meth_str(reg: &ClassRegistry, this: &Value) -> String {
    match this.as_object().map(|o| &o.data) {
        Some(ObjectData::Method(m)) => format!(
            "<method {} of {} object>",
            m.name,
            reg.name(m.binder.class)
        ),
        _ => "<method>".to_string(),
    }
}
