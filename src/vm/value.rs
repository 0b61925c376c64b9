//! # 설계 원칙
//!
//! 1. **Value는 범용 피연산자**: int / float / 객체 참조, 그리고 값으로 저장되지 않는
//!    sentinel(에러, 지원하지 않는 연산, 0으로 나누기, 반복 종료)
//! 2. **참조 카운팅**: 객체 수명은 `Rc`의 strong count가 유일한 기준입니다.
//!    retain = clone, release = drop. 순환 참조는 회수되지 않습니다.
//! 3. **타입 지정 필드**: 네이티브 멤버는 오프셋 대신 `Field` 저장소를 사용합니다.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::bytecode::CodeObject;
use super::error::Error;
use super::type_def::{ClassId, MethodFn};
use crate::vm::builtins::{CLASS_FLOAT, CLASS_INT};

pub type ObjRef = Rc<Object>;

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Object(ObjRef),

    // ===== sentinel: 반환값으로만 존재 =====
    /// 에러 레코드를 운반 (상위 계층이 확인 후 변환해야 함)
    Error(Box<Error>),
    /// 슬롯이 이 피연산자 조합을 지원하지 않음 → 반사 연산자로 폴백
    Unsupported,
    /// 0으로 나누기 → 예외로 변환됨
    DivByZero,
    /// iternext 종료 표시
    IterStop,
}

impl PartialEq for Value {
    /// 구조적 비교: 숫자는 값, 객체는 identity
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) => *a as f64 == *b,
            (Value::Float(a), Value::Int(b)) => *a == *b as f64,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Unsupported, Value::Unsupported) => true,
            (Value::DivByZero, Value::DivByZero) => true,
            (Value::IterStop, Value::IterStop) => true,
            _ => false,
        }
    }
}

impl Value {
    pub fn from_error(e: Error) -> Self {
        Value::Error(Box::new(e))
    }

    pub fn bool(b: bool) -> Self {
        Value::Int(b as i64)
    }

    /// 값의 클래스. sentinel에는 클래스가 없습니다.
    pub fn class_id(&self) -> Option<ClassId> {
        match self {
            Value::Int(_) => Some(CLASS_INT),
            Value::Float(_) => Some(CLASS_FLOAT),
            Value::Object(o) => Some(o.class),
            _ => None,
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(
            self,
            Value::Error(_) | Value::Unsupported | Value::DivByZero | Value::IterStop
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Value::Unsupported)
    }

    pub fn is_div_by_zero(&self) -> bool {
        matches!(self, Value::DivByZero)
    }

    pub fn is_iter_stop(&self) -> bool {
        matches!(self, Value::IterStop)
    }

    pub fn as_object(&self) -> Option<&ObjRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Object(o) => match &o.data {
                ObjectData::Str(s) => Some(s),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_exception(&self) -> Option<&ExceptionData> {
        match self {
            Value::Object(o) => match &o.data {
                ObjectData::Exception(e) => Some(e),
                _ => None,
            },
            _ => None,
        }
    }

    /// 현재 던져지는 중인 예외인지 (변수에 담긴 예외 인스턴스와 구분)
    pub fn is_active_exception(&self) -> bool {
        self.as_exception().is_some_and(|e| e.active.get())
    }

    pub fn as_code(&self) -> Option<&Rc<CodeObject>> {
        match self.as_object().map(|o| &o.data) {
            Some(ObjectData::Code(code)) => Some(code),
            _ => None,
        }
    }

    /// 제어 흐름 결과로서 "실패"를 의미하는지 (에러 레코드 또는 활성 예외)
    pub fn is_failure(&self) -> bool {
        self.is_error() || self.is_active_exception()
    }
}

/// 힙 객체 헤더 + 데이터
///
/// 참조 카운트는 `Rc`가 관리합니다. 소유한 다른 객체(바인더, 멤버 필드 등)는
/// 이 객체가 해제될 때 함께 release 됩니다.
#[derive(Debug)]
pub struct Object {
    /// 클래스 레지스트리 인덱스
    pub class: ClassId,

    pub data: ObjectData,
}

impl Object {
    pub fn new(class: ClassId, data: ObjectData) -> Self {
        Self { class, data }
    }

    pub fn into_value(self) -> Value {
        Value::Object(Rc::new(self))
    }

    pub fn fields(&self) -> Option<&RefCell<Vec<Field>>> {
        match &self.data {
            ObjectData::Fields(f) => Some(f),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ObjectData {
    /// 추가 필드 없음 (루트 Object 인스턴스 등)
    Plain,

    /// 불변 문자열
    Str(Rc<str>),

    Exception(ExceptionData),

    /// 바인더가 묶인 메서드
    Method(BoundMethod),

    Code(Rc<CodeObject>),

    /// 멤버 테이블이 가리키는 타입 지정 필드들
    Fields(RefCell<Vec<Field>>),
}

#[derive(Debug, Default)]
pub struct ExceptionData {
    pub msg: RefCell<Option<Rc<str>>>,
    pub active: Cell<bool>,
}

impl ExceptionData {
    pub fn new(msg: Option<Rc<str>>, active: bool) -> Self {
        Self {
            msg: RefCell::new(msg),
            active: Cell::new(active),
        }
    }

    pub fn message(&self) -> Option<Rc<str>> {
        self.msg.borrow().clone()
    }
}

#[derive(Debug)]
pub struct BoundMethod {
    /// 메서드가 생존하는 동안 바인더를 retain
    pub binder: ObjRef,
    pub name: Rc<str>,
    pub func: MethodFn,
}

/// 네이티브 멤버 필드 값
#[derive(Debug, Clone)]
pub enum Field {
    Char(u8),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    UByte(u8),
    UShort(u16),
    UInt(u32),
    ULong(u64),
    Size(usize),
    Bool(bool),
    Float(f32),
    Double(f64),
    Str(Option<Rc<str>>),
    Object(Option<ObjRef>),
}
