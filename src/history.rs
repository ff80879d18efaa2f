/// Lines entered during this session, oldest first. Nothing is written to
/// disk; a new shell starts with an empty history.
pub struct History {
    commands: Vec<String>,
    position: usize,
}

impl History {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            position: 0,
        }
    }

    pub fn add(&mut self, command: &str) {
        if command.trim().is_empty() {
            return;
        }

        // Don't add duplicate of last command
        if self.commands.last().map(String::as_str) != Some(command) {
            self.commands.push(command.to_string());
        }

        self.position = self.commands.len();
    }

    /// Move the cursor back to just past the newest entry.
    pub fn reset(&mut self) {
        self.position = self.commands.len();
    }

    pub fn previous(&mut self) -> Option<&str> {
        if self.position > 0 {
            self.position -= 1;
            self.commands.get(self.position).map(String::as_str)
        } else {
            None
        }
    }

    pub fn next(&mut self) -> Option<&str> {
        if self.position + 1 < self.commands.len() {
            self.position += 1;
            Some(&self.commands[self.position])
        } else {
            self.position = self.commands.len();
            None
        }
    }
}
