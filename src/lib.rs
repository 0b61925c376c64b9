pub mod runtime_io;
pub mod vm;

use std::io::Read;
use std::sync::Once;

use runtime_io::RuntimeIo;
use vm::{Error, Value, Vm, VmConfig, VmError};

static TRACING_INIT: Once = Once::new();

/// `RUST_LOG`이 설정된 경우에만 tracing 구독자를 한 번 등록
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

/// 컴파일된 모듈 스트림 전체를 읽어 실행
pub fn execute(reader: impl Read, io: &mut dyn RuntimeIo) -> Result<Option<Value>, VmError> {
    execute_with_config(reader, io, VmConfig::default())
}

pub fn execute_with_config(
    mut reader: impl Read,
    io: &mut dyn RuntimeIo,
    config: VmConfig,
) -> Result<Option<Value>, VmError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| Error::fatal(format!("failed to read module: {}", e)))?;

    let module = vm::load_module(&bytes)?;
    let mut machine = Vm::with_config(config);
    machine.run_with_io(module, io)
}

/// 모듈을 읽어 디스어셈블 결과 문자열로
pub fn disassemble(mut reader: impl Read) -> Result<String, Error> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| Error::fatal(format!("failed to read module: {}", e)))?;
    let module = vm::load_module(&bytes)?;
    vm::disasm::disassemble_module_to_string(&module)
}
