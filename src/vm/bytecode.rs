//! 바이트코드 정의
//!
//! - **Opcode**: 한 바이트 명령 코드 (0x30부터)
//! - **Instruction**: 피연산자까지 디코딩된 명령
//! - **CodeObject**: 불변 컴파일 단위 (이름, 바이트코드, 인자 수, 이름/속성/상수 테이블)
//!
//! 다중 바이트 정수는 모두 little-endian 입니다.

use std::fmt;
use std::rc::Rc;

use strum::{Display, EnumIter, FromRepr};

use super::error::Error;
use super::value::Value;

// ========== 모듈 파일 마커 ==========

pub const MAGIC: [u8; 4] = [0x1B, 0x4B, 0x45, 0x53];

/// 심볼 테이블 (names / attrs)
pub const ST_ENTRY_BEGIN: u8 = 0x10;
pub const ST_ENTRY_END: u8 = 0x11;

/// 상수 테이블
pub const CT_ENTRY_BEGIN: u8 = 0x20;
pub const CT_ENTRY_INT: u8 = 0x21;
pub const CT_ENTRY_FLOAT: u8 = 0x22;
pub const CT_ENTRY_STRING: u8 = 0x23;
pub const CT_ENTRY_CODEOBJ: u8 = 0x24;
pub const CT_ENTRY_END: u8 = 0x25;

/// 모듈 최상위 세그먼트의 이름
pub const MODULE_NAME: &str = "<module>";

// ========== Opcode ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, FromRepr)]
#[repr(u8)]
pub enum Opcode {
    #[strum(serialize = "NOP")]
    Nop = 0x30,
    #[strum(serialize = "ILOAD")]
    ILoad,
    #[strum(serialize = "FLOAD")]
    FLoad,
    #[strum(serialize = "LOAD_CONST")]
    LoadConst,
    #[strum(serialize = "ADD")]
    Add,
    #[strum(serialize = "SUB")]
    Sub,
    #[strum(serialize = "MUL")]
    Mul,
    #[strum(serialize = "DIV")]
    Div,
    #[strum(serialize = "MOD")]
    Mod,
    #[strum(serialize = "POW")]
    Pow,
    #[strum(serialize = "UPLUS")]
    UPlus,
    #[strum(serialize = "UMIN")]
    UMinus,
    #[strum(serialize = "STORE")]
    Store,
    #[strum(serialize = "LOAD")]
    Load,
    #[strum(serialize = "PRINT")]
    Print,
    #[strum(serialize = "JMP")]
    Jmp,
    #[strum(serialize = "JMP_BACK")]
    JmpBack,
    #[strum(serialize = "JMP_IF_TRUE")]
    JmpIfTrue,
    #[strum(serialize = "JMP_IF_FALSE")]
    JmpIfFalse,
    #[strum(serialize = "JMP_BACK_IF_TRUE")]
    JmpBackIfTrue,
    #[strum(serialize = "JMP_BACK_IF_FALSE")]
    JmpBackIfFalse,
    #[strum(serialize = "CALL")]
    Call,
    #[strum(serialize = "RETURN")]
    Return,
}

impl Opcode {
    /// 명령 바이트 뒤에 오는 즉치값의 바이트 수
    pub fn operand_width(self) -> usize {
        match self {
            Self::ILoad | Self::Store | Self::Load => 4,
            Self::FLoad => 8,
            Self::LoadConst
            | Self::Jmp
            | Self::JmpBack
            | Self::JmpIfTrue
            | Self::JmpIfFalse
            | Self::JmpBackIfTrue
            | Self::JmpBackIfFalse
            | Self::Call => 1,
            _ => 0,
        }
    }
}

// ========== Instruction ==========

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instruction {
    Nop,

    // constants
    ILoad(i32),
    FLoad(f64),
    LoadConst(u8),

    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    UPlus,
    UMinus,

    // locals
    Store(u32),
    Load(u32),

    Print,

    // control flow: 오프셋은 피연산자 바로 다음 위치 기준
    Jmp(u8),
    JmpBack(u8),
    JmpIfTrue(u8),
    JmpIfFalse(u8),
    JmpBackIfTrue(u8),
    JmpBackIfFalse(u8),

    // call/return
    Call(u8 /* argc */),
    Return,
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Nop => Opcode::Nop,
            Self::ILoad(_) => Opcode::ILoad,
            Self::FLoad(_) => Opcode::FLoad,
            Self::LoadConst(_) => Opcode::LoadConst,
            Self::Add => Opcode::Add,
            Self::Sub => Opcode::Sub,
            Self::Mul => Opcode::Mul,
            Self::Div => Opcode::Div,
            Self::Mod => Opcode::Mod,
            Self::Pow => Opcode::Pow,
            Self::UPlus => Opcode::UPlus,
            Self::UMinus => Opcode::UMinus,
            Self::Store(_) => Opcode::Store,
            Self::Load(_) => Opcode::Load,
            Self::Print => Opcode::Print,
            Self::Jmp(_) => Opcode::Jmp,
            Self::JmpBack(_) => Opcode::JmpBack,
            Self::JmpIfTrue(_) => Opcode::JmpIfTrue,
            Self::JmpIfFalse(_) => Opcode::JmpIfFalse,
            Self::JmpBackIfTrue(_) => Opcode::JmpBackIfTrue,
            Self::JmpBackIfFalse(_) => Opcode::JmpBackIfFalse,
            Self::Call(_) => Opcode::Call,
            Self::Return => Opcode::Return,
        }
    }

    /// 인코딩된 길이 (명령 바이트 포함)
    pub fn size(&self) -> usize {
        1 + self.opcode().operand_width()
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.opcode() as u8);
        match *self {
            Self::ILoad(n) => out.extend_from_slice(&n.to_le_bytes()),
            Self::FLoad(f) => out.extend_from_slice(&f.to_le_bytes()),
            Self::Store(i) | Self::Load(i) => out.extend_from_slice(&i.to_le_bytes()),
            Self::LoadConst(b)
            | Self::Jmp(b)
            | Self::JmpBack(b)
            | Self::JmpIfTrue(b)
            | Self::JmpIfFalse(b)
            | Self::JmpBackIfTrue(b)
            | Self::JmpBackIfFalse(b)
            | Self::Call(b) => out.push(b),
            _ => {}
        }
    }

    /// `pos`의 명령 하나를 디코딩. 다음 명령 위치를 함께 반환
    pub fn decode(code: &[u8], pos: usize) -> Result<(Instruction, usize), Error> {
        const CTX: &str = "eval_frame";

        let byte = *code.get(pos).ok_or_else(|| Error::unexpected_end(CTX))?;
        let op = Opcode::from_repr(byte).ok_or_else(|| Error::unexpected_byte(CTX, byte))?;

        let start = pos + 1;
        let end = start + op.operand_width();
        let operand = code.get(start..end).ok_or_else(|| Error::unexpected_end(CTX))?;

        let u8_arg = || operand[0];
        let u32_arg = || u32::from_le_bytes([operand[0], operand[1], operand[2], operand[3]]);

        let ins = match op {
            Opcode::Nop => Self::Nop,
            Opcode::ILoad => Self::ILoad(u32_arg() as i32),
            Opcode::FLoad => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(operand);
                Self::FLoad(f64::from_le_bytes(bytes))
            }
            Opcode::LoadConst => Self::LoadConst(u8_arg()),
            Opcode::Add => Self::Add,
            Opcode::Sub => Self::Sub,
            Opcode::Mul => Self::Mul,
            Opcode::Div => Self::Div,
            Opcode::Mod => Self::Mod,
            Opcode::Pow => Self::Pow,
            Opcode::UPlus => Self::UPlus,
            Opcode::UMinus => Self::UMinus,
            Opcode::Store => Self::Store(u32_arg()),
            Opcode::Load => Self::Load(u32_arg()),
            Opcode::Print => Self::Print,
            Opcode::Jmp => Self::Jmp(u8_arg()),
            Opcode::JmpBack => Self::JmpBack(u8_arg()),
            Opcode::JmpIfTrue => Self::JmpIfTrue(u8_arg()),
            Opcode::JmpIfFalse => Self::JmpIfFalse(u8_arg()),
            Opcode::JmpBackIfTrue => Self::JmpBackIfTrue(u8_arg()),
            Opcode::JmpBackIfFalse => Self::JmpBackIfFalse(u8_arg()),
            Opcode::Call => Self::Call(u8_arg()),
            Opcode::Return => Self::Return,
        };
        Ok((ins, end))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.opcode();
        match *self {
            Self::ILoad(n) => write!(f, "{} {}", op, n),
            Self::FLoad(x) => write!(f, "{} {}", op, x),
            Self::Store(i) | Self::Load(i) => write!(f, "{} {}", op, i),
            Self::LoadConst(b)
            | Self::Jmp(b)
            | Self::JmpBack(b)
            | Self::JmpIfTrue(b)
            | Self::JmpIfFalse(b)
            | Self::JmpBackIfTrue(b)
            | Self::JmpBackIfFalse(b)
            | Self::Call(b) => write!(f, "{} {}", op, b),
            _ => write!(f, "{}", op),
        }
    }
}

// ========== CodeObject ==========

#[derive(Debug)]
pub struct CodeObject {
    pub name: String,

    /// 인자 수. 인자는 locals의 앞쪽 슬롯에 순서대로 배치됨
    pub argcount: usize,

    /// 지역 변수 이름 (인덱스 = locals 슬롯)
    pub names: Vec<Rc<str>>,

    /// 참조하는 속성 이름
    pub attrs: Vec<Rc<str>>,

    /// Int / Float / Str / Code 상수
    pub consts: Vec<Value>,

    pub bytecode: Vec<u8>,
}

impl CodeObject {
    pub fn num_locals(&self) -> usize {
        self.names.len()
    }

    /// 전체 바이트코드를 명령 단위로 디코딩 (디스어셈블/검사용)
    pub fn instructions(&self) -> Result<Vec<(usize, Instruction)>, Error> {
        let mut out = Vec::new();
        let mut pos = 0;
        while pos < self.bytecode.len() {
            let (ins, next) = Instruction::decode(&self.bytecode, pos)?;
            out.push((pos, ins));
            pos = next;
        }
        Ok(out)
    }
}
