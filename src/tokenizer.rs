use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

use crate::config::Limits;
use crate::error::ParseError;

/// Tokens borrow raw bytes from the line: arguments and paths reach
/// `execvp` and `open` exactly as typed, UTF-8 or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Word(&'a OsStr),
    RedirectIn,
    RedirectOut,
}

impl<'a> Token<'a> {
    fn classify(raw: &'a [u8]) -> Self {
        match raw {
            b"<" => Token::RedirectIn,
            b">" => Token::RedirectOut,
            _ => Token::Word(OsStr::from_bytes(raw)),
        }
    }
}

/// Split a line into stage substrings on `|`.
/// e.g. "ls -l | grep rs | wc -l" -> ["ls -l ", " grep rs ", " wc -l"]
///
/// Empty segments are kept so that `a | | b`, `| a` and `a |` are caught as
/// blank stages rather than silently merged away.
pub fn split_stages<'a>(line: &'a [u8], limits: &Limits) -> Result<Vec<&'a [u8]>, ParseError> {
    if line.contains(&0) {
        return Err(ParseError::Syntax);
    }

    let mut stages = Vec::new();
    for (i, segment) in line.split(|&b| b == b'|').enumerate() {
        if i >= limits.max_stages {
            return Err(ParseError::TooManyCommands);
        }
        if segment.iter().all(u8::is_ascii_whitespace) {
            return Err(ParseError::InvalidPipe);
        }
        stages.push(segment);
    }

    Ok(stages)
}

/// Split one stage into tokens on ASCII whitespace.
/// Operators are only recognized as whole tokens: `a>b` is a single word.
pub fn tokenize(stage: &[u8]) -> Vec<Token<'_>> {
    stage
        .split(u8::is_ascii_whitespace)
        .filter(|raw| !raw.is_empty())
        .map(Token::classify)
        .collect()
}
