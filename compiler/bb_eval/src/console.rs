//! Console used by `print` and `read`.
//!
//! Output can go to stdout, into a buffer (tests), or nowhere. Each
//! `print` writes its whole line under one lock, so lines from concurrent
//! tasks never interleave.

use crate::errors::runtime;
use crate::EvalError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::Arc;

/// Captures output and serves scripted input.
#[derive(Debug, Default)]
pub struct BufferConsole {
    output: Mutex<String>,
    input: Mutex<VecDeque<String>>,
}

impl BufferConsole {
    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        BufferConsole {
            output: Mutex::new(String::new()),
            input: Mutex::new(lines.into_iter().map(Into::into).collect()),
        }
    }
}

#[derive(Debug)]
pub enum Console {
    Stdout,
    Buffer(BufferConsole),
    /// Discards output; reads fail.
    Silent,
}

pub type SharedConsole = Arc<Console>;

impl Console {
    pub fn println(&self, line: &str) {
        match self {
            Console::Stdout => {
                let mut out = std::io::stdout().lock();
                // A closed stdout is not the program's failure.
                let _ = writeln!(out, "{line}");
            }
            Console::Buffer(buffer) => {
                let mut output = buffer.output.lock();
                output.push_str(line);
                output.push('\n');
            }
            Console::Silent => {}
        }
    }

    pub fn print(&self, text: &str) {
        match self {
            Console::Stdout => {
                let mut out = std::io::stdout().lock();
                let _ = write!(out, "{text}");
                let _ = out.flush();
            }
            Console::Buffer(buffer) => buffer.output.lock().push_str(text),
            Console::Silent => {}
        }
    }

    /// Next input line without its terminator.
    pub fn read_line(&self) -> Result<String, EvalError> {
        match self {
            Console::Stdout => {
                let mut line = String::new();
                std::io::stdin()
                    .lock()
                    .read_line(&mut line)
                    .map_err(|e| runtime(format!("Failed to read input: {e}")))?;
                Ok(line.trim_end_matches(['\n', '\r']).to_string())
            }
            Console::Buffer(buffer) => buffer
                .input
                .lock()
                .pop_front()
                .ok_or_else(|| runtime("No more input")),
            Console::Silent => Err(runtime("Input is not available")),
        }
    }

    /// Captured output; empty for consoles that do not capture.
    pub fn output(&self) -> String {
        match self {
            Console::Buffer(buffer) => buffer.output.lock().clone(),
            Console::Stdout | Console::Silent => String::new(),
        }
    }

    pub fn clear(&self) {
        if let Console::Buffer(buffer) = self {
            buffer.output.lock().clear();
        }
    }
}

pub fn stdout_console() -> SharedConsole {
    Arc::new(Console::Stdout)
}

pub fn buffer_console() -> SharedConsole {
    Arc::new(Console::Buffer(BufferConsole::default()))
}

pub fn scripted_console<I, S>(input: I) -> SharedConsole
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Arc::new(Console::Buffer(BufferConsole::with_input(input)))
}

pub fn silent_console() -> SharedConsole {
    Arc::new(Console::Silent)
}
