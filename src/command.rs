use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;

use crate::config::Limits;
use crate::error::ParseError;
use crate::tokenizer::{self, Token};

/// One segment of a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stage {
    /// `None` for a pass-through stage, which copies stdin to stdout.
    pub program: Option<OsString>,
    /// Argument vector, program name first. Raw bytes, not necessarily UTF-8.
    pub args: Vec<OsString>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl Stage {
    /// Build a stage from its tokens.
    ///
    /// The first word is the program, later words are its arguments and
    /// each `<`/`>` takes the following word as a path. A repeated
    /// redirection replaces the earlier one.
    pub fn build<'a, I>(tokens: I, limits: &Limits) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = Token<'a>>,
    {
        let mut stage = Stage::default();
        let mut tokens = tokens.into_iter();

        while let Some(token) = tokens.next() {
            match token {
                Token::RedirectIn => stage.input = Some(redirect_target(tokens.next())?),
                Token::RedirectOut => stage.output = Some(redirect_target(tokens.next())?),
                Token::Word(word) => stage.push_word(word, limits)?,
            }
        }

        Ok(stage)
    }

    fn push_word(&mut self, word: &OsStr, limits: &Limits) -> Result<(), ParseError> {
        match &self.program {
            None => {
                self.program = Some(word.to_os_string());
                self.args.push(word.to_os_string());
            }
            Some(program) => {
                if self.args.len() >= limits.max_args {
                    return Err(ParseError::TooManyArguments {
                        program: program.to_string_lossy().into_owned(),
                    });
                }
                self.args.push(word.to_os_string());
            }
        }
        Ok(())
    }

    pub fn is_pass_through(&self) -> bool {
        self.program.is_none()
    }
}

fn redirect_target(next: Option<Token<'_>>) -> Result<PathBuf, ParseError> {
    match next {
        Some(Token::Word(path)) => Ok(PathBuf::from(path)),
        _ => Err(ParseError::Syntax),
    }
}

impl fmt::Display for Stage {
    /// Canonical form: `prog a b < in > out`. Non-UTF-8 bytes are shown
    /// lossily.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        if let Some(input) = &self.input {
            parts.push(format!("< {}", input.display()));
        }
        if let Some(output) = &self.output {
            parts.push(format!("> {}", output.display()));
        }
        write!(f, "{}", parts.join(" "))
    }
}

/// The stages built from one input line, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Parse a whole line. Any error rejects the line as a unit, so nothing
    /// is launched for a line with one bad stage.
    pub fn parse(line: &[u8], limits: &Limits) -> Result<Self, ParseError> {
        let segments = tokenizer::split_stages(line, limits)?;

        let mut stages: Vec<Stage> = Vec::with_capacity(segments.len());
        for segment in segments {
            // a pass-through stage can only be the last one
            if stages.last().is_some_and(Stage::is_pass_through) {
                return Err(ParseError::InvalidPipe);
            }
            stages.push(Stage::build(tokenizer::tokenize(segment), limits)?);
        }

        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", stage)?;
        }
        Ok(())
    }
}
