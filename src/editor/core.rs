use std::io::{self, Write};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    style::Print,
    terminal::{self, ClearType},
};

use super::raw_mode::RawModeGuard;
use crate::history::History;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Submit,
    Cancel,
    EndOfInput,
    Insert(char),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    HistoryBack,
    HistoryForward,
    KillToEnd,
    KillToStart,
}

fn action_for(key: KeyEvent) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let action = match key.code {
        KeyCode::Enter => Action::Submit,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Delete => Action::Delete,
        KeyCode::Left => Action::Left,
        KeyCode::Right => Action::Right,
        KeyCode::Home => Action::Home,
        KeyCode::End => Action::End,
        KeyCode::Up => Action::HistoryBack,
        KeyCode::Down => Action::HistoryForward,
        KeyCode::Char('c') if ctrl => Action::Cancel,
        KeyCode::Char('d') if ctrl => Action::EndOfInput,
        KeyCode::Char('a') if ctrl => Action::Home,
        KeyCode::Char('e') if ctrl => Action::End,
        KeyCode::Char('k') if ctrl => Action::KillToEnd,
        KeyCode::Char('u') if ctrl => Action::KillToStart,
        KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => Action::Insert(c),
        _ => return None,
    };
    Some(action)
}

/// Raw-mode line editor for interactive sessions.
pub struct LineEditor {
    buffer: String,
    // in chars, not bytes
    cursor_pos: usize,
}

impl LineEditor {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            cursor_pos: 0,
        }
    }

    /// Read one line. `Ok(None)` means end of input (Ctrl-D on an empty line).
    /// A cancelled line (Ctrl-C) comes back empty.
    pub fn read_line(&mut self, prompt: &str, history: &mut History) -> io::Result<Option<String>> {
        self.buffer.clear();
        self.cursor_pos = 0;
        history.reset();

        let mut stdout = io::stdout();
        let _guard = RawModeGuard::enter()?;

        execute!(stdout, Print(prompt))?;
        stdout.flush()?;

        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let Some(action) = action_for(key) else {
                continue;
            };

            match action {
                Action::Submit => {
                    execute!(stdout, Print("\r\n"))?;
                    return Ok(Some(self.buffer.clone()));
                }
                Action::Cancel => {
                    execute!(stdout, Print("^C\r\n"))?;
                    return Ok(Some(String::new()));
                }
                Action::EndOfInput => {
                    if self.buffer.is_empty() {
                        execute!(stdout, Print("exit\r\n"))?;
                        return Ok(None);
                    }
                }
                Action::HistoryBack => {
                    if let Some(entry) = history.previous() {
                        self.replace(entry);
                    }
                }
                Action::HistoryForward => match history.next() {
                    Some(entry) => self.replace(entry),
                    None => self.replace(""),
                },
                edit => self.edit(edit),
            }
            self.redraw(prompt)?;
        }
    }

    fn replace(&mut self, line: &str) {
        self.buffer = line.to_string();
        self.cursor_pos = self.buffer.chars().count();
    }

    fn edit(&mut self, action: Action) {
        let len = self.buffer.chars().count();
        match action {
            Action::Insert(c) => {
                let at = self.byte_index_at_char_pos(self.cursor_pos);
                self.buffer.insert(at, c);
                self.cursor_pos += 1;
            }
            Action::Backspace if self.cursor_pos > 0 => {
                self.cursor_pos -= 1;
                let at = self.byte_index_at_char_pos(self.cursor_pos);
                self.buffer.remove(at);
            }
            Action::Delete if self.cursor_pos < len => {
                let at = self.byte_index_at_char_pos(self.cursor_pos);
                self.buffer.remove(at);
            }
            Action::Left => self.cursor_pos = self.cursor_pos.saturating_sub(1),
            Action::Right => self.cursor_pos = (self.cursor_pos + 1).min(len),
            Action::Home => self.cursor_pos = 0,
            Action::End => self.cursor_pos = len,
            Action::KillToEnd => {
                let at = self.byte_index_at_char_pos(self.cursor_pos);
                self.buffer.truncate(at);
            }
            Action::KillToStart => {
                let at = self.byte_index_at_char_pos(self.cursor_pos);
                self.buffer.drain(..at);
                self.cursor_pos = 0;
            }
            _ => {}
        }
    }

    fn redraw(&self, prompt: &str) -> io::Result<()> {
        let mut stdout = io::stdout();

        execute!(
            stdout,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::UntilNewLine),
            Print(prompt),
            Print(&self.buffer),
        )?;

        // colored prompts carry escape codes that take no columns
        let column = visual_length(prompt) + self.cursor_pos;
        execute!(stdout, cursor::MoveToColumn(column as u16))?;
        stdout.flush()
    }

    fn byte_index_at_char_pos(&self, char_pos: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.buffer.len())
    }
}

/// Length of `s` in chars with ANSI color sequences removed.
fn visual_length(s: &str) -> usize {
    let mut in_escape = false;
    let mut length = 0;

    for c in s.chars() {
        if c == '\x1b' {
            in_escape = true;
        } else if in_escape {
            if c == 'm' {
                in_escape = false;
            }
        } else {
            length += 1;
        }
    }
    length
}
