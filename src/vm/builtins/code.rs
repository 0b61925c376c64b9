//! `Code` 클래스: 코드 객체를 감싸는 값
//!
//! 호출은 인터프리터가 새 프레임을 만들어 처리하므로 call 슬롯이 없습니다.

use crate::vm::registry::ClassRegistry;
use crate::vm::type_def::{Class, Layout};
use crate::vm::value::{ObjectData, Value};

pub fn class() -> Class {
    Class::new("Code").with_layout(Layout::Code).with_str(code_str)
}

fn code_str(_: &ClassRegistry, this: &Value) -> String {
    match this.as_object().map(|o| &o.data) {
        Some(ObjectData::Code(code)) => format!("<code {}>", code.name),
        _ => "<code>".to_string(),
    }
}
