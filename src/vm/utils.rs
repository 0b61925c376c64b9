//! VM 유틸리티 함수
//!
//! Value 생성, 출력 형식, 숫자 추출 등 builtin 클래스와 인터프리터가 공통으로 사용하는
//! 헬퍼 함수들을 제공합니다.

use std::cell::RefCell;
use std::rc::Rc;

use super::builtins::{CLASS_CODE, CLASS_METHOD, CLASS_STR};
use super::bytecode::CodeObject;
use super::type_def::{ClassId, MethodFn};
use super::value::{BoundMethod, Field, ObjRef, Object, ObjectData, Value};

// ========== Object 생성 헬퍼 함수들 (make_*) ==========

/// Str 객체 생성
pub fn make_string(s: impl Into<Rc<str>>) -> Value {
    make_string_of(CLASS_STR, s)
}

/// 지정한 클래스(Str 레이아웃)의 문자열 객체 생성
pub fn make_string_of(class: ClassId, s: impl Into<Rc<str>>) -> Value {
    Object::new(class, ObjectData::Str(s.into())).into_value()
}

/// 바인더를 retain하는 메서드 객체 생성
pub fn make_method(binder: ObjRef, name: impl Into<Rc<str>>, func: MethodFn) -> Value {
    Object::new(
        CLASS_METHOD,
        ObjectData::Method(BoundMethod {
            binder,
            name: name.into(),
            func,
        }),
    )
    .into_value()
}

pub fn make_code(code: Rc<CodeObject>) -> Value {
    Object::new(CLASS_CODE, ObjectData::Code(code)).into_value()
}

/// 타입 지정 필드를 가진 인스턴스 생성
pub fn make_instance(class: ClassId, fields: Vec<Field>) -> Value {
    Object::new(class, ObjectData::Fields(RefCell::new(fields))).into_value()
}

// ========== 출력 형식 ==========

/// `%f`와 같은 소수점 6자리 표기
pub fn format_float(f: f64) -> String {
    format!("{:.6}", f)
}

// ========== 숫자 추출 ==========

/// Int/Float 피연산자를 f64로. 숫자가 아니면 `None`
pub fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

/// 메시지를 UTF-8 경계를 지키며 최대 `max` 바이트로 자름
pub fn clamp_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float_six_decimals() {
        assert_eq!(format_float(3.5), "3.500000");
        assert_eq!(format_float(-0.25), "-0.250000");
    }

    #[test]
    fn test_clamp_respects_char_boundary() {
        assert_eq!(clamp_str("hello", 10), "hello");
        assert_eq!(clamp_str("hello", 3), "hel");
        // '한'은 3바이트
        assert_eq!(clamp_str("한글", 4), "한");
    }

    #[test]
    fn test_make_string() {
        let v = make_string("abc");
        assert_eq!(v.as_str(), Some("abc"));
        assert_eq!(v.class_id(), Some(CLASS_STR));
    }
}
