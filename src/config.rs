use clap::Parser;

/// Minimal pipeline shell: `prog args < in > out | prog args ...`
#[derive(Parser, Debug)]
#[command(name = "pipesh", version, about)]
pub struct Cli {
    /// Prompt shown before each line when reading from a terminal
    #[arg(long, default_value = ":-) ")]
    pub prompt: String,

    /// Read plain lines from stdin even when it is a terminal
    #[arg(long)]
    pub no_editor: bool,

    /// Log filter, e.g. `debug` or `pipesh=trace` (overrides PIPESH_LOG)
    #[arg(long, value_name = "FILTER")]
    pub log: Option<String>,
}

/// Hard limits on what a single line may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Characters per line, not counting the line terminator.
    pub max_line_len: usize,
    /// Stages per pipeline.
    pub max_stages: usize,
    /// Argument vector length per stage, program name included.
    pub max_args: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_line_len: 1024,
            max_stages: 20,
            max_args: 11,
        }
    }
}
