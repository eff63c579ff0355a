use std::io::{self, BufRead, Write};

/// Blocking request for a line of user input.
///
/// `None` means the user cancelled; callers treat it as a no-op.
pub trait Prompt {
    fn prompt(&mut self, message: &str) -> Option<String>;
}

impl<F> Prompt for F
where
    F: FnMut(&str) -> Option<String>,
{
    fn prompt(&mut self, message: &str) -> Option<String> {
        self(message)
    }
}

/// Prompts on a writer and reads one line from a reader.
///
/// Only end of input counts as cancel. The entered line is returned without
/// its line terminator but otherwise as typed, blank or not.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl LinePrompt<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        LinePrompt::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        LinePrompt { input, output }
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn prompt(&mut self, message: &str) -> Option<String> {
        write!(self.output, "{}: ", message).ok()?;
        self.output.flush().ok()?;

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(
                line.trim_end_matches(|c| c == '\n' || c == '\r')
                    .to_owned(),
            ),
        }
    }
}
