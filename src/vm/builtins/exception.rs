//! Exception 클래스 계층 + 공통 예외 생성자
//!
//! 예외는 일반 Value(객체)입니다. `active` 플래그가 켜진 예외는 "현재 던져지는 중"이며
//! 인터프리터가 프레임을 되감습니다. 변수에 담긴 예외 인스턴스는 비활성 상태입니다.

use std::rc::Rc;

use super::{
    CLASS_ATTR_EXC, CLASS_DIV_BY_ZERO_EXC, CLASS_EXCEPTION, CLASS_INDEX_EXC, CLASS_NAME_EXC,
    CLASS_STR, CLASS_TYPE_EXC,
};
use crate::vm::error::{Error, ErrorKind};
use crate::vm::registry::ClassRegistry;
use crate::vm::type_def::{Class, ClassId, Layout};
use crate::vm::utils::clamp_str;
use crate::vm::value::{ExceptionData, Object, ObjectData, Value};

/// 메시지 버퍼 크기 (종단 문자 포함)
const EXC_MSG_BUF_SIZE: usize = 200;

// ========== 클래스 ==========

pub fn base_class() -> Class {
    Class::new("Exception")
        .with_layout(Layout::Exception)
        .with_init(exc_init)
        .with_str(exc_str)
}

/// builtin 예외 하위 클래스 (생성자만 다시 지정; init은 상속되지 않음)
pub fn subclass(name: &str) -> Class {
    Class::new(name).extends(CLASS_EXCEPTION).with_init(exc_init)
}

/// `Exception(msg?)` 생성자: 최대 1개의 Str 인자
pub fn exc_init(reg: &ClassRegistry, this: &Value, args: &[Value]) -> Value {
    if args.len() > 1 {
        return Value::from_error(Error::new(
            ErrorKind::Type,
            format!(
                "Exception constructor takes at most 1 argument (got {})",
                args.len()
            ),
        ));
    }

    let Some(exc) = this.as_exception() else {
        return Value::from_error(Error::internal("exception init on non-exception object"));
    };

    match args.first() {
        None => *exc.msg.borrow_mut() = None,
        Some(arg) => {
            if !reg.is_a(arg, CLASS_STR) {
                return Value::from_error(Error::new(
                    ErrorKind::Type,
                    format!(
                        "Exception constructor takes a Str argument, not a {}",
                        reg.class_name_of(arg)
                    ),
                ));
            }
            *exc.msg.borrow_mut() = arg.as_str().map(Rc::from);
        }
    }

    this.clone()
}

/// 메시지 또는 (메시지가 없으면) 클래스 이름
fn exc_str(reg: &ClassRegistry, this: &Value) -> String {
    match this.as_exception().and_then(|e| e.message()) {
        Some(msg) => msg.to_string(),
        None => reg.class_name_of(this).to_string(),
    }
}

// ========== 생성 ==========

/// 예외 인스턴스 생성. 메시지는 199바이트로 잘립니다.
pub fn exc_make(class: ClassId, active: bool, msg: impl AsRef<str>) -> Value {
    let msg = clamp_str(msg.as_ref(), EXC_MSG_BUF_SIZE - 1);
    Object::new(
        class,
        ObjectData::Exception(ExceptionData::new(Some(Rc::from(msg)), active)),
    )
    .into_value()
}

fn type_exc(msg: String) -> Value {
    exc_make(CLASS_TYPE_EXC, true, msg)
}

fn attr_exc(msg: String) -> Value {
    exc_make(CLASS_ATTR_EXC, true, msg)
}

pub fn type_exc_unsupported_1(op: &str, c1: &str) -> Value {
    type_exc(format!("unsupported operand type for {}: '{}'", op, c1))
}

pub fn type_exc_unsupported_2(op: &str, c1: &str, c2: &str) -> Value {
    type_exc(format!(
        "unsupported operand types for {}: '{}' and '{}'",
        op, c1, c2
    ))
}

pub fn type_exc_cannot_index(c1: &str) -> Value {
    type_exc(format!("type '{}' does not support indexing", c1))
}

pub fn type_exc_cannot_instantiate(c1: &str) -> Value {
    type_exc(format!("class '{}' cannot be instantiated", c1))
}

pub fn type_exc_not_callable(c1: &str) -> Value {
    type_exc(format!("object of type '{}' is not callable", c1))
}

pub fn type_exc_not_iterable(c1: &str) -> Value {
    type_exc(format!("object of type '{}' is not iterable", c1))
}

pub fn type_exc_not_iterator(c1: &str) -> Value {
    type_exc(format!("object of type '{}' is not an iterator", c1))
}

pub fn type_exc_cannot_apply(c1: &str) -> Value {
    type_exc(format!(
        "object of type '{}' does not support function application",
        c1
    ))
}

pub fn type_exc_no_len(c1: &str) -> Value {
    type_exc(format!("object of type '{}' has no len()", c1))
}

pub fn call_exc_args(func: &str, expected: usize, got: usize) -> Value {
    type_exc(format!(
        "function {}(): expected {} arguments, got {}",
        func, expected, got
    ))
}

pub fn index_exc_out_of_bounds(index: i64, len: usize) -> Value {
    exc_make(
        CLASS_INDEX_EXC,
        true,
        format!("index {} out of bounds for length {}", index, len),
    )
}

pub fn attr_exc_not_found(class: &str, attr: &str) -> Value {
    attr_exc(format!(
        "object of type '{}' has no attribute '{}'",
        class, attr
    ))
}

pub fn attr_exc_readonly(class: &str, attr: &str) -> Value {
    attr_exc(format!(
        "attribute '{}' of type '{}' object is read-only",
        attr, class
    ))
}

pub fn attr_exc_mismatch(class: &str, attr: &str, assign_class: &str) -> Value {
    attr_exc(format!(
        "cannot assign '{}' to attribute '{}' of '{}' object",
        assign_class, attr, class
    ))
}

pub fn attr_exc_unset(class: &str, attr: &str) -> Value {
    attr_exc(format!("attribute '{}' of '{}' object is unset", attr, class))
}

pub fn div_by_zero_exc() -> Value {
    exc_make(CLASS_DIV_BY_ZERO_EXC, true, Error::div_by_zero().message)
}

pub fn name_exc_unbound(var: &str) -> Value {
    exc_make(CLASS_NAME_EXC, true, Error::unbound(var).message)
}

/// 에러 레코드를 대응하는 활성 예외로 변환.
/// 치명적 종류(Fatal/Function)는 예외가 될 수 없으므로 `None`.
pub fn from_error(err: &Error) -> Option<Value> {
    let class = match err.kind {
        ErrorKind::Fatal | ErrorKind::Function => return None,
        ErrorKind::Type => CLASS_TYPE_EXC,
        ErrorKind::Name => CLASS_NAME_EXC,
        ErrorKind::Attribute => CLASS_ATTR_EXC,
        ErrorKind::Index => CLASS_INDEX_EXC,
        ErrorKind::DivByZero => CLASS_DIV_BY_ZERO_EXC,
    };
    Some(exc_make(class, true, &err.message))
}

// ========== throw / catch ==========

/// 예외 인스턴스를 활성화하여 던짐. 예외가 아니면 에러 Value.
pub fn raise(reg: &ClassRegistry, v: &Value) -> Value {
    match v.as_exception() {
        Some(exc) if reg.is_a(v, CLASS_EXCEPTION) => {
            exc.active.set(true);
            v.clone()
        }
        _ => Value::from_error(Error::invalid_throw(reg.class_name_of(v))),
    }
}

/// catch 대상 클래스 검사 (catch 설정 시점에 수행)
pub fn check_catchable(reg: &ClassRegistry, class: ClassId) -> Result<(), Error> {
    if reg.is_exception_class(class) {
        Ok(())
    } else {
        Err(Error::invalid_catch(reg.name(class)))
    }
}

/// 던져진 예외가 `class`로 잡히는지 (super 체인 검사)
pub fn exception_matches(reg: &ClassRegistry, exc: &Value, class: ClassId) -> bool {
    reg.is_a(exc, class)
}

/// 잡힌 예외를 일반 값으로 되돌림
pub fn deactivate(exc: &Value) {
    if let Some(e) = exc.as_exception() {
        e.active.set(false);
    }
}

pub fn message_of(exc: &Value) -> Option<Rc<str>> {
    exc.as_exception().and_then(|e| e.message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::builtins::CLASS_INT;
    use crate::vm::ops;
    use crate::vm::utils::make_string;

    #[test]
    fn test_message_is_clamped() {
        let long = "x".repeat(500);
        let exc = exc_make(CLASS_TYPE_EXC, false, &long);
        assert_eq!(message_of(&exc).unwrap().len(), 199);
    }

    #[test]
    fn test_init_accepts_single_str() {
        let reg = ClassRegistry::new();
        let exc = ops::instantiate(&reg, CLASS_INDEX_EXC, &[make_string("boom")]);
        assert_eq!(message_of(&exc).as_deref(), Some("boom"));
        assert!(!exc.is_active_exception());

        let bare = ops::instantiate(&reg, CLASS_EXCEPTION, &[]);
        assert!(message_of(&bare).is_none());
        assert_eq!(ops::to_str(&reg, &bare), "Exception");
    }

    #[test]
    fn test_init_rejects_bad_arguments() {
        let reg = ClassRegistry::new();
        let too_many = ops::instantiate(
            &reg,
            CLASS_EXCEPTION,
            &[make_string("a"), make_string("b")],
        );
        let Value::Error(e) = too_many else {
            panic!("expected error value, got {:?}", too_many);
        };
        assert_eq!(
            e.message,
            "Exception constructor takes at most 1 argument (got 2)"
        );

        let not_str = ops::instantiate(&reg, CLASS_EXCEPTION, &[Value::Int(3)]);
        let Value::Error(e) = not_str else {
            panic!("expected error value");
        };
        assert_eq!(e.message, "Exception constructor takes a Str argument, not a Int");
    }

    #[test]
    fn test_raise_and_catch() {
        let reg = ClassRegistry::new();
        let exc = ops::instantiate(&reg, CLASS_TYPE_EXC, &[]);
        let thrown = raise(&reg, &exc);
        assert!(thrown.is_active_exception());
        assert!(exception_matches(&reg, &thrown, CLASS_EXCEPTION));
        assert!(exception_matches(&reg, &thrown, CLASS_TYPE_EXC));
        assert!(!exception_matches(&reg, &thrown, CLASS_INDEX_EXC));

        deactivate(&thrown);
        assert!(!exc.is_active_exception());
    }

    #[test]
    fn test_raise_non_exception_is_error() {
        let reg = ClassRegistry::new();
        let Value::Error(e) = raise(&reg, &Value::Int(1)) else {
            panic!("expected error value");
        };
        assert_eq!(e.kind, ErrorKind::Type);
        assert!(e.message.contains("not Int"));
    }

    #[test]
    fn test_check_catchable() {
        let reg = ClassRegistry::new();
        assert!(check_catchable(&reg, CLASS_ATTR_EXC).is_ok());
        let err = check_catchable(&reg, CLASS_INT).unwrap_err();
        assert_eq!(err.message, "cannot catch instances of class Int");
    }

    #[test]
    fn test_from_error_maps_kinds() {
        let reg = ClassRegistry::new();
        let exc = from_error(&Error::div_by_zero()).unwrap();
        assert_eq!(exc.class_id(), Some(CLASS_DIV_BY_ZERO_EXC));
        assert!(exc.is_active_exception());
        assert_eq!(reg.class_name_of(&exc), "DivisionByZeroException");
        assert!(from_error(&Error::verification()).is_none());
    }
}
