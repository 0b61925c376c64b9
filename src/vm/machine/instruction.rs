use super::{Vm, VmResult};
use crate::runtime_io::RuntimeIo;
use crate::vm::builtins::exception::{self, div_by_zero_exc, name_exc_unbound};
use crate::vm::builtins::float::float_arith;
use crate::vm::builtins::int::int_arith;
use crate::vm::bytecode::Instruction as I;
use crate::vm::error::Error;
use crate::vm::ops;
use crate::vm::type_def::{BinaryOp, UnaryOp};
use crate::vm::value::Value;

/// 명령어 실행 결과
#[derive(Debug, Clone)]
pub enum ExecutionFlow {
    /// 다음 명령어 계속 실행
    Continue,
    /// 현재 프레임 종료
    Return(Option<Value>),
    /// 활성 예외가 현재 프레임을 빠져나감
    Raise(Value),
}

impl Vm {
    /// 단일 명령어 실행 (디스패처)
    pub(super) fn execute_instruction(
        &mut self,
        ins: I,
        io: &mut dyn RuntimeIo,
    ) -> VmResult<ExecutionFlow> {
        match ins {
            I::Nop => Ok(ExecutionFlow::Continue),

            // ===== 상수 =====
            I::ILoad(i) => self.handle_const(Value::Int(i as i64)),
            I::FLoad(f) => self.handle_const(Value::Float(f)),
            I::LoadConst(i) => self.handle_load_const(i),

            // ===== 산술 연산 =====
            I::Add => self.handle_binary(BinaryOp::Add),
            I::Sub => self.handle_binary(BinaryOp::Sub),
            I::Mul => self.handle_binary(BinaryOp::Mul),
            I::Div => self.handle_binary(BinaryOp::Div),
            I::Mod => self.handle_binary(BinaryOp::Mod),
            I::Pow => self.handle_binary(BinaryOp::Pow),
            I::UPlus => self.handle_unary(UnaryOp::Plus),
            I::UMinus => self.handle_unary(UnaryOp::Minus),

            // ===== 로컬 변수 =====
            I::Store(ix) => self.handle_store(ix),
            I::Load(ix) => self.handle_load(ix),

            I::Print => self.handle_print(io),

            // ===== 제어 흐름 =====
            I::Jmp(off) => self.handle_jump(off as isize),
            I::JmpBack(off) => self.handle_jump(-(off as isize)),
            I::JmpIfTrue(off) => self.handle_jump_if(true, off as isize),
            I::JmpIfFalse(off) => self.handle_jump_if(false, off as isize),
            I::JmpBackIfTrue(off) => self.handle_jump_if(true, -(off as isize)),
            I::JmpBackIfFalse(off) => self.handle_jump_if(false, -(off as isize)),
            I::Call(argc) => self.handle_call(argc as usize),
            I::Return => self.handle_return(),
        }
    }

    /// 연산 결과를 스택에 올리거나 예외/에러로 전환
    ///
    /// - `Value::Error`: 잡을 수 있는 종류는 활성 예외로, 치명적 종류는 `Err`
    /// - 활성 예외: 프레임 되감기
    /// - 남은 sentinel: 내부 에러
    fn push_result(&mut self, v: Value) -> VmResult<ExecutionFlow> {
        match v {
            Value::Error(e) => match exception::from_error(&e) {
                Some(exc) => Ok(ExecutionFlow::Raise(exc)),
                None => Err((*e).into()),
            },
            Value::Unsupported | Value::DivByZero | Value::IterStop => {
                Err(Error::internal("sentinel value escaped an operation").into())
            }
            v if v.is_active_exception() => Ok(ExecutionFlow::Raise(v)),
            v => {
                self.push(v)?;
                Ok(ExecutionFlow::Continue)
            }
        }
    }

    // ==================== 상수 핸들러 ====================

    fn handle_const(&mut self, v: Value) -> VmResult<ExecutionFlow> {
        self.push(v)?;
        Ok(ExecutionFlow::Continue)
    }

    fn handle_load_const(&mut self, i: u8) -> VmResult<ExecutionFlow> {
        let v = self
            .frame()?
            .code
            .consts
            .get(i as usize)
            .cloned()
            .ok_or_else(|| Error::fatal(format!("invalid constant index {}", i)))?;
        self.push(v)?;
        Ok(ExecutionFlow::Continue)
    }

    // ==================== 산술 핸들러 ====================

    /// Int/Float 조합은 디스패치 없이 바로 계산하고, 객체가 섞이면 연산자 프로토콜로
    fn handle_binary(&mut self, op: BinaryOp) -> VmResult<ExecutionFlow> {
        let b = self.pop()?;
        let a = self.pop()?;

        let fast = match (&a, &b) {
            (Value::Int(x), Value::Int(y)) => Some(int_arith(op, *x, *y)),
            (Value::Int(x), Value::Float(y)) => Some(float_arith(op, *x as f64, *y)),
            (Value::Float(x), Value::Int(y)) => Some(float_arith(op, *x, *y as f64)),
            (Value::Float(x), Value::Float(y)) => Some(float_arith(op, *x, *y)),
            _ => None,
        };

        let result = match fast {
            Some(Value::DivByZero) => div_by_zero_exc(),
            Some(v) => v,
            None => ops::binary(&self.classes, op, &a, &b),
        };
        self.push_result(result)
    }

    fn handle_unary(&mut self, op: UnaryOp) -> VmResult<ExecutionFlow> {
        let v = self.pop()?;
        let result = match (op, v) {
            (UnaryOp::Plus, v @ (Value::Int(_) | Value::Float(_))) => v,
            (UnaryOp::Minus, Value::Int(i)) => Value::Int(i.wrapping_neg()),
            (UnaryOp::Minus, Value::Float(f)) => Value::Float(-f),
            (op, v) => ops::unary(&self.classes, op, &v),
        };
        self.push_result(result)
    }

    // ==================== 변수 핸들러 ====================

    fn handle_store(&mut self, ix: u32) -> VmResult<ExecutionFlow> {
        let v = self.pop()?;
        self.set_local(ix, v)?;
        Ok(ExecutionFlow::Continue)
    }

    fn handle_load(&mut self, ix: u32) -> VmResult<ExecutionFlow> {
        match self.get_local(ix)? {
            Some(v) => self.handle_const(v),
            None => {
                let frame = self.frame()?;
                let name = frame
                    .code
                    .names
                    .get(ix as usize)
                    .map_or_else(|| format!("#{}", ix), |n| n.to_string());
                Ok(ExecutionFlow::Raise(name_exc_unbound(&name)))
            }
        }
    }

    fn handle_print(&mut self, io: &mut dyn RuntimeIo) -> VmResult<ExecutionFlow> {
        let v = self.pop()?;
        ops::print(&self.classes, &v, io)?;
        Ok(ExecutionFlow::Continue)
    }

    // ==================== 제어 흐름 핸들러 ====================

    /// 오프셋은 피연산자 바로 다음 위치 기준 (pos는 이미 그 위치)
    fn handle_jump(&mut self, off: isize) -> VmResult<ExecutionFlow> {
        let frame = self.frame_mut()?;
        let target = frame
            .pos
            .checked_add_signed(off)
            .filter(|t| *t <= frame.code.bytecode.len())
            .ok_or_else(|| Error::fatal(format!("jump target out of range at {}", frame.pos)))?;
        frame.pos = target;
        Ok(ExecutionFlow::Continue)
    }

    fn handle_jump_if(&mut self, when: bool, off: isize) -> VmResult<ExecutionFlow> {
        let cond = self.pop()?;
        if cond.is_sentinel() {
            return Err(Error::internal("jump condition is a sentinel").into());
        }
        if ops::truthy(&self.classes, &cond) == when {
            self.handle_jump(off)
        } else {
            Ok(ExecutionFlow::Continue)
        }
    }

    /// 인자 `argc`개, 그 아래의 호출 대상을 꺼냄.
    /// 코드 객체는 새 프레임으로, 그 외는 call 슬롯으로
    fn handle_call(&mut self, argc: usize) -> VmResult<ExecutionFlow> {
        let args = self.pop_n(argc)?;
        let callee = self.pop()?;

        if let Some(code) = callee.as_code() {
            if code.argcount != argc {
                let exc = ops::call_arity_error(&code.name, code.argcount, argc);
                return self.push_result(exc);
            }
            self.enter_code(code.clone(), args)?;
            return Ok(ExecutionFlow::Continue);
        }

        let result = ops::call(&self.classes, &callee, &args);
        self.push_result(result)
    }

    fn handle_return(&mut self) -> VmResult<ExecutionFlow> {
        let ret = self.frame_mut()?.stack.pop();
        Ok(ExecutionFlow::Return(ret))
    }
}
