//! 컴파일된 모듈 파일 로더
//!
//! ```text
//! module   := MAGIC segment
//! segment  := argcount:u8 symtab(names) symtab(attrs) consttab code_len:u32 code
//! symtab   := 0x10 count:u16 { len:u16 utf8 }* 0x11
//! consttab := 0x20 count:u16 entry* 0x25
//! entry    := 0x21 i64 | 0x22 f64 | 0x23 len:u16 utf8 | 0x24 len:u16 name segment
//! ```
//!
//! 잘못된 바이트나 잘린 입력은 모두 치명적 에러입니다. 바이트코드 자체는
//! 실행 시점에 디코딩되므로 여기서는 길이만 확인합니다.

use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, info};

use super::bytecode::{
    CT_ENTRY_BEGIN, CT_ENTRY_CODEOBJ, CT_ENTRY_END, CT_ENTRY_FLOAT, CT_ENTRY_INT, CT_ENTRY_STRING,
    CodeObject, MAGIC, MODULE_NAME, ST_ENTRY_BEGIN, ST_ENTRY_END,
};
use super::error::Error;
use super::utils::{make_code, make_string};
use super::value::Value;

/// 코드 객체 상수의 최대 중첩 깊이
pub const MAX_CODE_NESTING: usize = 64;

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    ctx: &'static str,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            ctx: "load_module",
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let end = self.pos + n;
        let bytes = self
            .buf
            .get(self.pos..end)
            .ok_or_else(|| Error::unexpected_end(self.ctx))?;
        self.pos = end;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, Error> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, Error> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_array8(&mut self) -> Result<[u8; 8], Error> {
        let mut out = [0u8; 8];
        out.copy_from_slice(self.take(8)?);
        Ok(out)
    }

    fn read_i64(&mut self) -> Result<i64, Error> {
        Ok(i64::from_le_bytes(self.read_array8()?))
    }

    fn read_f64(&mut self) -> Result<f64, Error> {
        Ok(f64::from_le_bytes(self.read_array8()?))
    }

    /// `len:u16` + UTF-8 바이트
    fn read_str(&mut self) -> Result<String, Error> {
        let len = self.read_u16()? as usize;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| Error::unexpected_byte(self.ctx, bytes[e.valid_up_to()]))
    }

    fn expect(&mut self, marker: u8) -> Result<(), Error> {
        let byte = self.read_u8()?;
        if byte == marker {
            Ok(())
        } else {
            Err(Error::unexpected_byte(self.ctx, byte))
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }
}

/// 모듈 바이트 전체를 읽어 최상위 CodeObject를 만든다
pub fn load_module(bytes: &[u8]) -> Result<Rc<CodeObject>, Error> {
    if bytes.len() < MAGIC.len() || bytes[..MAGIC.len()] != MAGIC {
        return Err(Error::invalid_file_signature(MODULE_NAME));
    }

    let mut r = Reader::new(&bytes[MAGIC.len()..]);
    let module = read_segment(&mut r, MODULE_NAME.to_string(), 0)?;
    if !r.is_at_end() {
        let byte = r.read_u8()?;
        return Err(Error::unexpected_byte(r.ctx, byte));
    }

    info!(
        consts = module.consts.len(),
        names = module.names.len(),
        code_len = module.bytecode.len(),
        "module loaded"
    );
    Ok(Rc::new(module))
}

fn read_segment(r: &mut Reader<'_>, name: String, depth: usize) -> Result<CodeObject, Error> {
    if depth > MAX_CODE_NESTING {
        return Err(Error::fatal("code object nesting too deep"));
    }
    let argcount = r.read_u8()? as usize;
    let names = read_symtab(r)?;
    let attrs = read_symtab(r)?;
    let consts = read_consttab(r, depth)?;
    let code_len = r.read_u32()? as usize;
    let bytecode = r.take(code_len)?.to_vec();

    if argcount > names.len() {
        return Err(Error::verification());
    }
    let mut seen = HashSet::new();
    for param in &names[..argcount] {
        if !seen.insert(param.as_ref()) {
            return Err(Error::duplicate_params(&name, param));
        }
    }

    debug!(%name, argcount, "segment read");
    Ok(CodeObject {
        name,
        argcount,
        names,
        attrs,
        consts,
        bytecode,
    })
}

fn read_symtab(r: &mut Reader<'_>) -> Result<Vec<Rc<str>>, Error> {
    r.expect(ST_ENTRY_BEGIN)?;
    let count = r.read_u16()?;
    let mut symbols = Vec::with_capacity(count as usize);
    for _ in 0..count {
        symbols.push(Rc::from(r.read_str()?));
    }
    r.expect(ST_ENTRY_END)?;
    Ok(symbols)
}

fn read_consttab(r: &mut Reader<'_>, depth: usize) -> Result<Vec<Value>, Error> {
    r.expect(CT_ENTRY_BEGIN)?;
    let count = r.read_u16()?;
    let mut consts = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let value = match r.read_u8()? {
            CT_ENTRY_INT => Value::Int(r.read_i64()?),
            CT_ENTRY_FLOAT => Value::Float(r.read_f64()?),
            CT_ENTRY_STRING => make_string(r.read_str()?),
            CT_ENTRY_CODEOBJ => {
                let name = r.read_str()?;
                make_code(Rc::new(read_segment(r, name, depth + 1)?))
            }
            other => return Err(Error::unexpected_byte(r.ctx, other)),
        };
        consts.push(value);
    }
    r.expect(CT_ENTRY_END)?;
    Ok(consts)
}
