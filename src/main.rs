use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use kestrel as lib;
use lib::runtime_io::StdIo;
use lib::vm::VmConfig;

#[derive(Debug, Parser)]
#[command(name = "kes", version, about = "Kestrel bytecode runtime")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 컴파일된 모듈 실행
    Exec {
        file: PathBuf,

        /// 실행 시간을 stderr에 출력
        #[arg(long)]
        time: bool,

        #[arg(long, default_value_t = VmConfig::default().max_frames)]
        max_frames: usize,

        #[arg(long, default_value_t = VmConfig::default().max_stack)]
        max_stack: usize,
    },

    /// 모듈의 테이블과 명령어 출력
    Disasm { file: PathBuf },
}

fn open(path: &PathBuf) -> Result<File, ExitCode> {
    File::open(path).map_err(|e| {
        eprintln!("Error: Could not read file '{}': {}", path.display(), e);
        ExitCode::FAILURE
    })
}

fn main() -> ExitCode {
    lib::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Exec {
            file,
            time,
            max_frames,
            max_stack,
        } => {
            let reader = match open(&file) {
                Ok(f) => f,
                Err(code) => return code,
            };
            let config = VmConfig {
                max_frames,
                max_stack,
                ..VmConfig::default()
            };

            let start = instant::Instant::now();
            let result = lib::execute_with_config(reader, &mut StdIo, config);
            if time {
                eprintln!("elapsed: {:.3?}", start.elapsed());
            }

            match result {
                Ok(_) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("{}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Command::Disasm { file } => {
            let reader = match open(&file) {
                Ok(f) => f,
                Err(code) => return code,
            };
            match lib::disassemble(reader) {
                Ok(text) => {
                    print!("{}", text);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}
