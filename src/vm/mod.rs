pub mod assembler; // 모듈 파일 작성기
pub mod attr;
pub mod builtins; // builtin 클래스 통합 모듈
pub mod bytecode;
pub mod disasm; // 디스어셈블러
pub mod error;
pub mod loader;
pub mod machine; // machine/ 디렉토리
pub mod ops; // 연산자 프로토콜
pub mod registry;
pub mod strdict;
pub mod type_def;
pub mod utils;
pub mod value;

pub use assembler::{CodeBuilder, Const};
pub use bytecode::{CodeObject, Instruction, Opcode};
pub use error::{Error, ErrorKind};
pub use loader::load_module;
pub use machine::{Frame, Vm, VmConfig, VmError, VmResult};
pub use registry::ClassRegistry;
pub use type_def::{BinaryOp, Class, ClassId, CmpOp, Member, MemberFlags, MemberKind, UnaryOp};
pub use value::{Object, ObjectData, Value};
