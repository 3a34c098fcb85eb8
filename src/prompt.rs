//! Operator prompts.
//!
//! The installer blocks on the operator twice at most: the proxy questions at
//! the start of an install, and the confirmation before an uninstall. Neither
//! has a timeout.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::warn;

use crate::error::{InstallerError, Result};

pub trait Prompt {
    /// Ask a question and return the answer with surrounding whitespace removed.
    fn ask(&mut self, question: &str) -> Result<String>;

    /// Ask for a secret without echoing it.
    fn ask_secret(&mut self, question: &str) -> Result<String>;
}

/// Accepts exactly `y`/`Y` and `n`/`N`.
pub fn parse_confirmation(answer: &str) -> Option<bool> {
    match answer.trim() {
        "y" | "Y" => Some(true),
        "n" | "N" => Some(false),
        _ => None,
    }
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    fn print_question(question: &str) -> Result<()> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", question)?;
        stdout.flush()?;
        Ok(())
    }

    fn read_secret_raw() -> Result<String> {
        let mut secret = String::new();
        loop {
            let Event::Key(KeyEvent {
                code,
                modifiers,
                kind,
                ..
            }) = event::read()?
            else {
                continue;
            };
            if kind != KeyEventKind::Press {
                continue;
            }
            match code {
                KeyCode::Enter => return Ok(secret),
                KeyCode::Backspace => {
                    secret.pop();
                }
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                    return Err(InstallerError::prompt("interrupted"));
                }
                KeyCode::Char(c) => secret.push(c),
                _ => {}
            }
        }
    }
}

impl Prompt for TerminalPrompt {
    fn ask(&mut self, question: &str) -> Result<String> {
        Self::print_question(question)?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    fn ask_secret(&mut self, question: &str) -> Result<String> {
        Self::print_question(question)?;
        enable_raw_mode()
            .map_err(|e| InstallerError::prompt(format!("failed to disable echo: {}", e)))?;
        let secret = Self::read_secret_raw();
        // Always restore the terminal, even if reading failed
        restore_terminal(disable_raw_mode);
        println!();
        secret
    }
}

/// Leave raw mode. A terminal left without echo is reported, not fatal.
fn restore_terminal(restore: impl FnOnce() -> io::Result<()>) -> bool {
    match restore() {
        Ok(()) => true,
        Err(e) => {
            warn!("failed to restore terminal echo: {}", e);
            false
        }
    }
}

/// Answers prompts from a fixed queue; used for unattended runs and tests.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Questions asked so far, in order.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    fn next_answer(&mut self, question: &str) -> Result<String> {
        self.asked.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| InstallerError::prompt(format!("no answer for: {}", question)))
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, question: &str) -> Result<String> {
        Ok(self.next_answer(question)?.trim().to_string())
    }

    fn ask_secret(&mut self, question: &str) -> Result<String> {
        self.next_answer(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_confirmation_accepts_only_y_and_n() {
        assert_eq!(parse_confirmation("y"), Some(true));
        assert_eq!(parse_confirmation("Y"), Some(true));
        assert_eq!(parse_confirmation("n"), Some(false));
        assert_eq!(parse_confirmation(" N "), Some(false));
        assert_eq!(parse_confirmation("yes"), None);
        assert_eq!(parse_confirmation(""), None);
    }

    #[test]
    fn test_scripted_prompt_records_questions() {
        let mut prompt = ScriptedPrompt::new(["y", " secret "]);
        assert_eq!(prompt.ask("Proxy? ").unwrap(), "y");
        // Secrets are returned verbatim
        assert_eq!(prompt.ask_secret("Password :").unwrap(), " secret ");
        assert_eq!(prompt.asked(), ["Proxy? ", "Password :"]);
    }

    #[test]
    fn test_scripted_prompt_runs_dry() {
        let mut prompt = ScriptedPrompt::new(Vec::<String>::new());
        assert!(matches!(prompt.ask("?"), Err(InstallerError::Prompt(_))));
    }

    #[test]
    fn test_restore_failure_is_reported_not_raised() {
        assert!(restore_terminal(|| Ok(())));
        assert!(!restore_terminal(|| Err(io::Error::other("not a tty"))));
    }
}
