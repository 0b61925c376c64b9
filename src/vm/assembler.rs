//! 모듈 파일 작성기
//!
//! 로더가 읽는 형식 그대로 CodeObject 세그먼트를 조립합니다. 컴파일러 없이
//! 테스트와 도구에서 모듈을 만들 때 사용합니다.
//!
//! ```ignore
//! let mut m = CodeBuilder::module();
//! m.emit(Instruction::ILoad(3));
//! m.emit(Instruction::ILoad(4));
//! m.emit(Instruction::Add);
//! m.emit(Instruction::Print);
//! let bytes = m.finish();
//! ```

use super::bytecode::{
    CT_ENTRY_BEGIN, CT_ENTRY_CODEOBJ, CT_ENTRY_END, CT_ENTRY_FLOAT, CT_ENTRY_INT, CT_ENTRY_STRING,
    Instruction, MAGIC, MODULE_NAME, ST_ENTRY_BEGIN, ST_ENTRY_END,
};
use super::error::Error;

/// 상수 테이블 항목
#[derive(Debug, Clone)]
pub enum Const {
    Int(i64),
    Float(f64),
    Str(String),
    Code(CodeBuilder),
}

#[derive(Debug, Clone)]
pub struct CodeBuilder {
    name: String,
    argcount: u8,
    names: Vec<String>,
    attrs: Vec<String>,
    consts: Vec<Const>,
    code: Vec<u8>,
}

impl CodeBuilder {
    /// 인자 이름은 `name()`으로 먼저 등록해야 앞쪽 슬롯에 놓입니다
    pub fn new(name: impl Into<String>, argcount: u8) -> Self {
        Self {
            name: name.into(),
            argcount,
            names: Vec::new(),
            attrs: Vec::new(),
            consts: Vec::new(),
            code: Vec::new(),
        }
    }

    pub fn module() -> Self {
        Self::new(MODULE_NAME, 0)
    }

    // ========== 테이블 ==========

    /// 지역 변수 슬롯 (같은 이름은 같은 슬롯)
    pub fn name(&mut self, name: &str) -> u32 {
        match self.names.iter().position(|n| n == name) {
            Some(i) => i as u32,
            None => self.push_name_unchecked(name),
        }
    }

    /// 중복 검사 없이 이름 추가
    pub fn push_name_unchecked(&mut self, name: &str) -> u32 {
        self.names.push(name.to_string());
        (self.names.len() - 1) as u32
    }

    pub fn attr(&mut self, name: &str) -> u16 {
        match self.attrs.iter().position(|n| n == name) {
            Some(i) => i as u16,
            None => {
                self.attrs.push(name.to_string());
                (self.attrs.len() - 1) as u16
            }
        }
    }

    pub fn constant(&mut self, c: Const) -> u8 {
        self.consts.push(c);
        (self.consts.len() - 1) as u8
    }

    // ========== 코드 ==========

    /// 현재 코드 위치
    pub fn here(&self) -> usize {
        self.code.len()
    }

    pub fn emit(&mut self, ins: Instruction) -> usize {
        let at = self.here();
        ins.encode(&mut self.code);
        at
    }

    /// 오프셋 0으로 전방 점프를 쓰고 나중에 `patch_forward`로 채움
    pub fn emit_forward(&mut self, make: fn(u8) -> Instruction) -> usize {
        self.emit(make(0))
    }

    /// `at`에 쓴 전방 점프가 현재 위치를 가리키도록 수정
    pub fn patch_forward(&mut self, at: usize) -> Result<(), Error> {
        let after = at + 2;
        let offset = u8::try_from(self.here() - after)
            .map_err(|_| Error::fatal(format!("jump at {} out of range", at)))?;
        self.code[at + 1] = offset;
        Ok(())
    }

    /// `target`으로 돌아가는 후방 점프
    pub fn emit_backward(&mut self, make: fn(u8) -> Instruction, target: usize) -> Result<usize, Error> {
        let after = self.here() + 2;
        let offset = after
            .checked_sub(target)
            .and_then(|d| u8::try_from(d).ok())
            .ok_or_else(|| Error::fatal(format!("jump to {} out of range", target)))?;
        Ok(self.emit(make(offset)))
    }

    // ========== 직렬화 ==========

    fn write_segment(&self, out: &mut Vec<u8>) {
        out.push(self.argcount);
        write_symtab(out, &self.names);
        write_symtab(out, &self.attrs);

        out.push(CT_ENTRY_BEGIN);
        out.extend_from_slice(&(self.consts.len() as u16).to_le_bytes());
        for c in &self.consts {
            match c {
                Const::Int(i) => {
                    out.push(CT_ENTRY_INT);
                    out.extend_from_slice(&i.to_le_bytes());
                }
                Const::Float(f) => {
                    out.push(CT_ENTRY_FLOAT);
                    out.extend_from_slice(&f.to_le_bytes());
                }
                Const::Str(s) => {
                    out.push(CT_ENTRY_STRING);
                    write_str(out, s);
                }
                Const::Code(code) => {
                    out.push(CT_ENTRY_CODEOBJ);
                    write_str(out, &code.name);
                    code.write_segment(out);
                }
            }
        }
        out.push(CT_ENTRY_END);

        out.extend_from_slice(&(self.code.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.code);
    }

    /// 매직 헤더를 포함한 완성된 모듈 바이트
    pub fn finish(self) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        self.write_segment(&mut out);
        out
    }
}

fn write_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u16).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn write_symtab(out: &mut Vec<u8>, symbols: &[String]) {
    out.push(ST_ENTRY_BEGIN);
    out.extend_from_slice(&(symbols.len() as u16).to_le_bytes());
    for s in symbols {
        write_str(out, s);
    }
    out.push(ST_ENTRY_END);
}
