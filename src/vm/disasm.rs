use super::bytecode::{CodeObject, Instruction as I};
use super::error::Error;
use super::utils::format_float;
use super::value::Value;
use std::fmt::{self, Write};

pub fn disassemble_module_to_string(module: &CodeObject) -> Result<String, Error> {
    // 디코딩 실패를 먼저 확인 (출력 도중에 중단되지 않도록)
    check_decodable(module)?;
    let mut output = String::new();
    let _ = disassemble_code(module, 0, &mut output);
    Ok(output)
}

fn check_decodable(code: &CodeObject) -> Result<(), Error> {
    code.instructions()?;
    for c in &code.consts {
        if let Some(nested) = c.as_code() {
            check_decodable(nested)?;
        }
    }
    Ok(())
}

pub fn disassemble_code(code: &CodeObject, depth: usize, w: &mut impl Write) -> fmt::Result {
    let pad = "  ".repeat(depth);
    writeln!(
        w,
        "{}=== Code {} (argcount={}, locals={}) ===",
        pad,
        code.name,
        code.argcount,
        code.num_locals()
    )?;

    writeln!(w, "{}Names ({}):", pad, code.names.len())?;
    for (i, name) in code.names.iter().enumerate() {
        writeln!(w, "{}  {}: \"{}\"", pad, i, name)?;
    }

    if !code.attrs.is_empty() {
        writeln!(w, "{}Attrs ({}):", pad, code.attrs.len())?;
        for (i, attr) in code.attrs.iter().enumerate() {
            writeln!(w, "{}  {}: \"{}\"", pad, i, attr)?;
        }
    }

    writeln!(w, "{}Constants ({}):", pad, code.consts.len())?;
    for (i, c) in code.consts.iter().enumerate() {
        write!(w, "{}  {}: ", pad, i)?;
        write_const(c, w)?;
        writeln!(w)?;
    }

    writeln!(w, "{}Instructions:", pad)?;
    // 검사는 호출자가 끝냈으므로 여기서는 실패하지 않음
    let instructions = code.instructions().unwrap_or_default();
    for (pos, ins) in &instructions {
        write!(w, "{}  {:4}: ", pad, pos)?;
        disassemble_instruction(code, *pos, ins, w)?;
        writeln!(w)?;
    }

    for c in &code.consts {
        if let Some(nested) = c.as_code() {
            writeln!(w)?;
            disassemble_code(nested, depth + 1, w)?;
        }
    }

    Ok(())
}

fn write_const(c: &Value, w: &mut impl Write) -> fmt::Result {
    match c {
        Value::Int(i) => write!(w, "Int {}", i),
        Value::Float(f) => write!(w, "Float {}", format_float(*f)),
        _ => {
            if let Some(s) = c.as_str() {
                write!(w, "Str {:?}", s)
            } else if let Some(code) = c.as_code() {
                write!(w, "<code {}>", code.name)
            } else {
                write!(w, "{:?}", c)
            }
        }
    }
}

fn disassemble_instruction(code: &CodeObject, pos: usize, ins: &I, w: &mut impl Write) -> fmt::Result {
    let after = pos + ins.size();
    match ins {
        I::LoadConst(idx) => {
            write!(w, "{} (", ins)?;
            match code.consts.get(*idx as usize) {
                Some(c) => write_const(c, w)?,
                None => write!(w, "?")?,
            }
            write!(w, ")")
        }

        I::Load(idx) | I::Store(idx) => {
            let name = code.names.get(*idx as usize).map_or("?", |n| n.as_ref());
            write!(w, "{} (\"{}\")", ins, name)
        }

        I::Jmp(o) | I::JmpIfTrue(o) | I::JmpIfFalse(o) => {
            write!(w, "{} (-> {})", ins, after + *o as usize)
        }
        I::JmpBack(o) | I::JmpBackIfTrue(o) | I::JmpBackIfFalse(o) => {
            match after.checked_sub(*o as usize) {
                Some(target) => write!(w, "{} (-> {})", ins, target),
                None => write!(w, "{} (-> ?)", ins),
            }
        }

        I::Call(argc) => write!(w, "{} (argc={})", ins, argc),

        _ => write!(w, "{}", ins),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::assembler::{CodeBuilder, Const};
    use crate::vm::loader::load_module;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_disassemble_nested() {
        let mut f = CodeBuilder::new("inc", 1);
        let n = f.name("n");
        f.emit(I::Load(n));
        f.emit(I::ILoad(1));
        f.emit(I::Add);
        f.emit(I::Return);

        let mut m = CodeBuilder::module();
        let c = m.constant(Const::Code(f));
        let s = m.constant(Const::Str("hi".into()));
        m.emit(I::LoadConst(c));
        m.emit(I::LoadConst(s));
        m.emit(I::Call(1));
        m.emit(I::Print);

        let module = load_module(&m.finish()).unwrap();
        let text = disassemble_module_to_string(&module).unwrap();
        let expected = "\
=== Code <module> (argcount=0, locals=0) ===
Names (0):
Constants (2):
  0: <code inc>
  1: Str \"hi\"
Instructions:
     0: LOAD_CONST 0 (<code inc>)
     2: LOAD_CONST 1 (Str \"hi\")
     4: CALL 1 (argc=1)
     6: PRINT

  === Code inc (argcount=1, locals=1) ===
  Names (1):
    0: \"n\"
  Constants (0):
  Instructions:
       0: LOAD 0 (\"n\")
       5: ILOAD 1
      10: ADD
      11: RETURN
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_jump_targets() {
        let mut m = CodeBuilder::module();
        let top = m.here();
        m.emit(I::ILoad(0));
        m.emit_backward(I::JmpBackIfFalse, top).unwrap();
        let module = load_module(&m.finish()).unwrap();
        let text = disassemble_module_to_string(&module).unwrap();
        assert!(text.contains("5: JMP_BACK_IF_FALSE 7 (-> 0)"));
    }

    #[test]
    fn test_undecodable_code_is_error() {
        let mut bytes = CodeBuilder::module().finish();
        // code_len = 1, 코드 = 0xff
        let len_at = bytes.len() - 4;
        bytes[len_at] = 1;
        bytes.push(0xff);
        let module = load_module(&bytes).unwrap();
        assert!(disassemble_module_to_string(&module).is_err());
    }
}
