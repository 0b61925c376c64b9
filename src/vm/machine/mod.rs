// machine 모듈 - VM 실행 엔진
//
// 프레임 스택 위에서 바이트코드를 한 명령씩 디코딩하여 실행합니다.
// 각 프레임은 자신의 locals 배열과 피연산자 스택을 가집니다.

use std::rc::Rc;

use thiserror::Error;
use tracing::debug;

use crate::runtime_io::RuntimeIo;
use crate::vm::builtins::exception::message_of;
use crate::vm::bytecode::{CodeObject, Instruction};
use crate::vm::error::Error;
use crate::vm::registry::ClassRegistry;
use crate::vm::value::Value;

// 서브모듈
mod instruction;


use instruction::ExecutionFlow;

// ========== 타입 정의 ==========

/// 실행 결과 에러
#[derive(Debug, Error)]
pub enum VmError {
    /// 잘못된 바이트코드, 내부 불변식 위반 등 (잡을 수 없음)
    #[error(transparent)]
    Fatal(#[from] Error),

    /// 모듈 프레임 밖으로 빠져나온 예외
    #[error("Uncaught {class}: {message}")]
    Uncaught { class: String, message: String },
}

pub type VmResult<T> = Result<T, VmError>;

/// 스택/프레임 한도
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// 프레임 생성 시 피연산자 스택의 초기 용량
    pub stack_capacity: usize,
    /// 프레임당 피연산자 스택 최대 깊이
    pub max_stack: usize,
    pub max_frames: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_capacity: 16,
            max_stack: 1024,
            max_frames: 256,
        }
    }
}

#[derive(Debug)]
pub struct Frame {
    pub code: Rc<CodeObject>,
    /// `None` = 한 번도 쓰지 않은 슬롯 (unbound)
    pub locals: Vec<Option<Value>>,
    pub stack: Vec<Value>,
    pub pos: usize,
}

pub struct Vm {
    pub classes: ClassRegistry,
    pub frames: Vec<Frame>,
    pub config: VmConfig,
}

// ========== VM 구현 ==========

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            classes: ClassRegistry::new(),
            frames: Vec::with_capacity(32),
            config,
        }
    }

    pub fn run(&mut self, module: Rc<CodeObject>) -> VmResult<Option<Value>> {
        let mut stdio = crate::runtime_io::StdIo;
        self.run_with_io(module, &mut stdio)
    }

    /// 모듈 프레임을 만들고 끝까지 실행. 모듈의 반환값(스택 최상단)을 돌려줌
    pub fn run_with_io(
        &mut self,
        module: Rc<CodeObject>,
        io: &mut dyn RuntimeIo,
    ) -> VmResult<Option<Value>> {
        self.frames.clear();
        self.enter_code(module, Vec::new())?;

        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Ok(None);
            };

            let flow = if frame.pos >= frame.code.bytecode.len() {
                // 코드 끝에 도달하면 암묵적 RETURN
                ExecutionFlow::Return(frame.stack.pop())
            } else {
                let (ins, next) = Instruction::decode(&frame.code.bytecode, frame.pos)?;
                frame.pos = next;
                self.execute_instruction(ins, io)?
            };

            match flow {
                ExecutionFlow::Continue => {}
                ExecutionFlow::Return(ret) => {
                    self.leave_frame();
                    if self.frames.is_empty() {
                        return Ok(ret);
                    }
                    if let Some(v) = ret {
                        self.push(v)?;
                    }
                }
                ExecutionFlow::Raise(exc) => return Err(self.unwind(exc)),
            }
        }
    }

    // ========== 스택 연산 ==========

    fn frame(&self) -> VmResult<&Frame> {
        self.frames
            .last()
            .ok_or_else(|| Error::internal("no active frame").into())
    }

    fn frame_mut(&mut self) -> VmResult<&mut Frame> {
        self.frames
            .last_mut()
            .ok_or_else(|| Error::internal("no active frame").into())
    }

    fn push(&mut self, v: Value) -> VmResult<()> {
        let max_stack = self.config.max_stack;
        let frame = self.frame_mut()?;
        if frame.stack.len() >= max_stack {
            return Err(Error::fatal("stack overflow").into());
        }
        frame.stack.push(v);
        Ok(())
    }

    fn pop(&mut self) -> VmResult<Value> {
        self.frame_mut()?
            .stack
            .pop()
            .ok_or_else(|| Error::fatal("stack underflow").into())
    }

    /// 위에서부터 `n`개를 원래 순서대로 꺼냄
    fn pop_n(&mut self, n: usize) -> VmResult<Vec<Value>> {
        let frame = self.frame_mut()?;
        if frame.stack.len() < n {
            return Err(Error::fatal("stack underflow").into());
        }
        let at = frame.stack.len() - n;
        Ok(frame.stack.split_off(at))
    }

    // ========== 프레임 관리 ==========

    /// 새 프레임 진입. 인자는 locals의 앞쪽 슬롯에 놓임
    fn enter_code(&mut self, code: Rc<CodeObject>, args: Vec<Value>) -> VmResult<()> {
        if self.frames.len() >= self.config.max_frames {
            return Err(Error::fatal("maximum call depth exceeded").into());
        }

        let mut locals: Vec<Option<Value>> = vec![None; code.num_locals().max(args.len())];
        for (slot, arg) in locals.iter_mut().zip(args) {
            *slot = Some(arg);
        }

        debug!(code = %code.name, depth = self.frames.len(), "frame push");
        self.frames.push(Frame {
            code,
            locals,
            stack: Vec::with_capacity(self.config.stack_capacity),
            pos: 0,
        });
        Ok(())
    }

    fn leave_frame(&mut self) {
        if let Some(frame) = self.frames.pop() {
            debug!(code = %frame.code.name, depth = self.frames.len(), "frame pop");
        }
    }

    /// 활성 예외가 모든 프레임을 빠져나감
    fn unwind(&mut self, exc: Value) -> VmError {
        let class = self.classes.class_name_of(&exc).to_string();
        let message = message_of(&exc).map_or_else(|| class.clone(), |m| m.to_string());
        debug!(%class, %message, "exception raised");

        while let Some(frame) = self.frames.pop() {
            debug!(code = %frame.code.name, "frame unwound");
        }
        VmError::Uncaught { class, message }
    }

    fn get_local(&self, ix: u32) -> VmResult<Option<Value>> {
        let f = self.frame()?;
        let slot = f
            .locals
            .get(ix as usize)
            .ok_or_else(|| Error::fatal(format!("invalid local index {}", ix)))?;
        Ok(slot.clone())
    }

    fn set_local(&mut self, ix: u32, v: Value) -> VmResult<()> {
        let f = self.frame_mut()?;
        let slot = f
            .locals
            .get_mut(ix as usize)
            .ok_or_else(|| Error::fatal(format!("invalid local index {}", ix)))?;
        *slot = Some(v);
        Ok(())
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
