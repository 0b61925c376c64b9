//! Builtin 클래스 모듈
//!
//! 각 파일은 클래스 하나의 슬롯 구현과 `class()` 디스크립터 생성자를 담습니다.
//! 등록 순서가 곧 클래스 id이므로 아래 상수와 `register_builtins`의 순서는 일치해야 합니다.

pub mod code;
pub mod exception;
pub mod float;
pub mod int;
pub mod method;
pub mod object;
pub mod str;


use super::error::Error;
use super::registry::ClassRegistry;
use super::type_def::{Class, ClassId};

// ========== Builtin 클래스 ID ==========
pub const CLASS_OBJECT: ClassId = 0;
pub const CLASS_INT: ClassId = 1;
pub const CLASS_FLOAT: ClassId = 2;
pub const CLASS_STR: ClassId = 3;
pub const CLASS_METHOD: ClassId = 4;
pub const CLASS_CODE: ClassId = 5;
pub const CLASS_EXCEPTION: ClassId = 6;
pub const CLASS_INDEX_EXC: ClassId = 7;
pub const CLASS_TYPE_EXC: ClassId = 8;
pub const CLASS_ATTR_EXC: ClassId = 9;
pub const CLASS_NAME_EXC: ClassId = 10;
pub const CLASS_DIV_BY_ZERO_EXC: ClassId = 11;

/// 사용자 정의 클래스 시작 ID
pub const CLASS_USER_START: ClassId = 12;

fn builtin_classes() -> Vec<(ClassId, Class)> {
    vec![
        (CLASS_OBJECT, object::class()),
        (CLASS_INT, int::class()),
        (CLASS_FLOAT, float::class()),
        (CLASS_STR, str::class()),
        (CLASS_METHOD, method::class()),
        (CLASS_CODE, code::class()),
        (CLASS_EXCEPTION, exception::base_class()),
        (CLASS_INDEX_EXC, exception::subclass("IndexException")),
        (CLASS_TYPE_EXC, exception::subclass("TypeException")),
        (CLASS_ATTR_EXC, exception::subclass("AttributeException")),
        (CLASS_NAME_EXC, exception::subclass("NameException")),
        (CLASS_DIV_BY_ZERO_EXC, exception::subclass("DivisionByZeroException")),
    ]
}

/// 빈 레지스트리에 builtin 클래스를 고정된 id 순서로 등록
pub(crate) fn register_builtins(reg: &mut ClassRegistry) -> Result<(), Error> {
    for (expected, class) in builtin_classes() {
        let id = reg.register(class)?;
        if id != expected {
            return Err(Error::internal("builtin class registered out of order"));
        }
    }
    Ok(())
}
