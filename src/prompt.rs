use colored::Colorize;

pub struct Prompt {
    text: String,
}

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The prompt as printed by the line editor.
    pub fn render(&self) -> String {
        self.text.green().bold().to_string()
    }
}
