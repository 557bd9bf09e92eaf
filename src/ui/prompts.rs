//! ui::prompts
//!
//! Interactive prompts and confirmations.
//!
//! # Design
//!
//! Prompts are only shown in interactive mode. In non-interactive mode,
//! operations requiring user input must either have defaults or fail
//! with a clear error message.

use std::io::{self, BufRead, Write};

use thiserror::Error;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt cancelled by user")]
    Cancelled,

    #[error("not in interactive mode")]
    NotInteractive,

    #[error("IO error: {0}")]
    IoError(String),
}

/// Prompt for confirmation (yes/no) on the terminal.
///
/// Returns `Ok(true)` if the user confirms, `Ok(false)` if they decline.
/// Returns `Err(PromptError::NotInteractive)` if not in interactive mode.
pub fn confirm(message: &str, default: bool, interactive: bool) -> Result<bool, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }
    let stdin = io::stdin();
    confirm_with(message, default, &mut stdin.lock(), &mut io::stderr())
}

/// Confirmation over arbitrary streams.
///
/// An empty answer takes `default`; end of input cancels.
pub fn confirm_with<R: BufRead, W: Write>(
    message: &str,
    default: bool,
    input: &mut R,
    output: &mut W,
) -> Result<bool, PromptError> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    loop {
        write!(output, "{} {} ", message, hint).map_err(|e| PromptError::IoError(e.to_string()))?;
        output
            .flush()
            .map_err(|e| PromptError::IoError(e.to_string()))?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .map_err(|e| PromptError::IoError(e.to_string()))?;
        if read == 0 {
            return Err(PromptError::Cancelled);
        }

        match line.trim().to_ascii_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => {
                writeln!(output, "Please answer y or n.")
                    .map_err(|e| PromptError::IoError(e.to_string()))?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ask(answers: &str, default: bool) -> Result<bool, PromptError> {
        let mut input = Cursor::new(answers.as_bytes().to_vec());
        let mut output = Vec::new();
        confirm_with("Delete run?", default, &mut input, &mut output)
    }

    #[test]
    fn non_interactive_refuses() {
        assert!(matches!(
            confirm("Delete?", true, false),
            Err(PromptError::NotInteractive)
        ));
    }

    #[test]
    fn answers() {
        assert!(ask("y\n", false).unwrap());
        assert!(!ask("NO\n", true).unwrap());
        assert!(ask("\n", true).unwrap());
        assert!(!ask("\n", false).unwrap());
    }

    #[test]
    fn reprompts_on_garbage() {
        let mut input = Cursor::new(b"maybe\nyes\n".to_vec());
        let mut output = Vec::new();
        assert!(confirm_with("Go?", false, &mut input, &mut output).unwrap());
        let shown = String::from_utf8(output).unwrap();
        assert_eq!(shown.matches("Go? [y/N]").count(), 2);
        assert!(shown.contains("Please answer y or n."));
    }

    #[test]
    fn eof_cancels() {
        assert!(matches!(ask("", true), Err(PromptError::Cancelled)));
    }
}
