use std::io::{self, BufRead, IsTerminal, StdinLock, Write};
use std::os::fd::AsFd;

use crate::command::Pipeline;
use crate::config::{Cli, Limits};
use crate::editor::LineEditor;
use crate::error::{ParseError, ShellError};
use crate::history::History;
use crate::pipes::run_pipeline;
use crate::prompt::Prompt;

enum Input {
    /// Interactive terminal: raw-mode editor with a prompt.
    Editor {
        editor: LineEditor,
        history: History,
        prompt: Prompt,
    },
    /// Anything else: plain buffered lines, no prompt.
    Stream(StdinLock<'static>),
}

impl Input {
    /// Lines are raw bytes: a terminal gives UTF-8, a stream may not.
    fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        match self {
            Input::Editor {
                editor,
                history,
                prompt,
            } => {
                let line = editor.read_line(&prompt.render(), history)?;
                if let Some(line) = &line {
                    history.add(line);
                }
                Ok(line.map(String::into_bytes))
            }
            Input::Stream(stdin) => {
                let mut line = Vec::new();
                if stdin.read_until(b'\n', &mut line)? == 0 {
                    return Ok(None);
                }
                if line.ends_with(b"\n") {
                    line.pop();
                    if line.ends_with(b"\r") {
                        line.pop();
                    }
                }
                Ok(Some(line))
            }
        }
    }
}

/// What to do with one line of input.
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Exit,
    Blank,
    Run(&'a [u8]),
}

/// Characters for UTF-8 lines, bytes for anything else.
fn line_len(line: &[u8]) -> usize {
    match std::str::from_utf8(line) {
        Ok(text) => text.chars().count(),
        Err(_) => line.len(),
    }
}

fn classify<'a>(line: &'a [u8], limits: &Limits) -> Result<Line<'a>, ParseError> {
    if line_len(line) > limits.max_line_len {
        return Err(ParseError::LineTooLong);
    }
    if line == b"exit" {
        return Ok(Line::Exit);
    }
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(Line::Blank);
    }
    Ok(Line::Run(line))
}

pub struct Shell {
    input: Input,
    limits: Limits,
}

impl Shell {
    pub fn new(cli: &Cli) -> Self {
        let stdin = io::stdin();
        let input = if stdin.is_terminal() && !cli.no_editor {
            Input::Editor {
                editor: LineEditor::new(),
                history: History::new(),
                prompt: Prompt::new(cli.prompt.clone()),
            }
        } else {
            Input::Stream(stdin.lock())
        };

        Self {
            input,
            limits: Limits::default(),
        }
    }

    /// Read and run lines until `exit` or end of input.
    ///
    /// Bad lines are reported and skipped. Only a failure to read input or
    /// to set up a pipeline in this process ends the session with an error.
    pub fn run(&mut self) -> Result<(), ShellError> {
        while let Some(line) = self.input.read_line()? {
            match classify(&line, &self.limits) {
                Ok(Line::Exit) => break,
                Ok(Line::Blank) => continue,
                Ok(Line::Run(line)) => self.execute(line)?,
                Err(e) => eprintln!("pipesh: {}", e),
            }
        }

        tracing::debug!("session finished");
        Ok(())
    }

    fn execute(&self, line: &[u8]) -> Result<(), ShellError> {
        let pipeline = match Pipeline::parse(line, &self.limits) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                eprintln!("pipesh: {}", e);
                return Ok(());
            }
        };

        // children must not inherit unflushed output
        io::stdout().flush()?;

        let stdin = io::stdin();
        let stdout = io::stdout();
        run_pipeline(&pipeline, stdin.as_fd(), stdout.as_fd())?;
        Ok(())
    }
}
