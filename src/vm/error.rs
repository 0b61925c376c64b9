//! 컴파일 타임/내부 에러 레코드
//!
//! 런타임 예외(`Exception` 객체)와는 별개의 채널입니다.
//!
//! - **Fatal/Function**: 잘못된 바이트코드, 내부 불변식 위반, 중복 파라미터.
//!   `Result`로만 전파되며 절대 Value로 잡히지 않습니다.
//! - **그 외 종류**: `Value::Error`로 감싸져 올라오면 인터프리터가
//!   대응하는 예외 클래스로 변환합니다.

use strum::{Display, EnumIter};
use thiserror::Error;

/// 에러 종류 (닫힌 분류 체계)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ErrorKind {
    Fatal,
    Type,
    Name,
    Attribute,
    Index,
    DivByZero,
    Function,
}

impl ErrorKind {
    /// stderr 출력 시 메시지 앞에 붙는 헤더
    pub fn header(self) -> &'static str {
        match self {
            Self::Fatal => "Fatal Error: ",
            Self::Type => "Type Error: ",
            Self::Name => "Name Error: ",
            Self::Attribute => "Attribute Error: ",
            Self::Index => "Index Error: ",
            Self::DivByZero => "Division By Zero Error: ",
            Self::Function => "Function Error: ",
        }
    }

    /// 실행을 즉시 중단해야 하는 종류인지 여부
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Fatal | Self::Function)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{message}", kind.header())]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, message)
    }

    /// 내부 불변식 위반 (예: sentinel 값의 클래스를 묻는 경우)
    pub fn internal(what: &str) -> Self {
        Self::fatal(format!("internal error: {}", what))
    }

    pub fn verification() -> Self {
        Self::fatal("verification error")
    }

    pub fn unexpected_byte(ctx: &str, byte: u8) -> Self {
        Self::fatal(format!("unexpected byte in {}: {:02x}", ctx, byte))
    }

    pub fn unexpected_end(ctx: &str) -> Self {
        Self::fatal(format!("unexpected end of bytecode in {}", ctx))
    }

    pub fn invalid_file_signature(module: &str) -> Self {
        Self::fatal(format!(
            "invalid file signature encountered when loading module '{}'",
            module
        ))
    }

    pub fn unbound(var: &str) -> Self {
        Self::new(
            ErrorKind::Name,
            format!("cannot reference unbound variable '{}'", var),
        )
    }

    pub fn invalid_cmp(class_name: &str) -> Self {
        Self::new(
            ErrorKind::Type,
            format!("comparison of type '{}' did not return an int", class_name),
        )
    }

    pub fn invalid_catch(class_name: &str) -> Self {
        Self::new(
            ErrorKind::Type,
            format!("cannot catch instances of class {}", class_name),
        )
    }

    pub fn invalid_throw(class_name: &str) -> Self {
        Self::new(
            ErrorKind::Type,
            format!(
                "can only throw instances of a subclass of Exception, not {}",
                class_name
            ),
        )
    }

    pub fn div_by_zero() -> Self {
        Self::new(ErrorKind::DivByZero, "division or modulo by zero")
    }

    pub fn duplicate_params(func: &str, param: &str) -> Self {
        Self::new(
            ErrorKind::Function,
            format!("function {} has duplicate parameter name '{}'", func, param),
        )
    }
}
