/// `PRINT` 출력 대상. VM은 표준 출력에 직접 쓰지 않습니다.
pub trait RuntimeIo {
    fn write_line(&mut self, s: &str);
}

/// 프로세스 stdout으로 출력 (CLI)
pub struct StdIo;

impl RuntimeIo for StdIo {
    fn write_line(&mut self, s: &str) {
        println!("{}", s);
    }
}

/// 출력을 문자열에 모아 두는 I/O (테스트, 임베딩)
#[derive(Default)]
pub struct BufferIo {
    output: String,
}

impl BufferIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_output(self) -> String {
        self.output
    }
}

impl RuntimeIo for BufferIo {
    fn write_line(&mut self, s: &str) {
        self.output.push_str(s);
        self.output.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_io_collects_lines() {
        let mut io = BufferIo::new();
        io.write_line("a");
        io.write_line("");
        io.write_line("b");
        assert_eq!(io.take_output(), "a\n\nb\n");
    }
}
