//! Line-oriented prompts on stdin/stderr.
//!
//! Prompts go to stderr so that stdout carries only command output.

use std::io::{BufRead, IsTerminal, StdinLock, Stderr, Write};

use crate::error::{CliError, Result};

pub struct Prompter<R, W> {
    input: R,
    output: W,
    /// Secrets are read from the terminal with echo off.
    terminal: bool,
}

impl Prompter<StdinLock<'static>, Stderr> {
    pub fn stdio() -> Self {
        let stdin = std::io::stdin();
        let terminal = stdin.is_terminal();
        Self {
            input: stdin.lock(),
            output: std::io::stderr(),
            terminal,
        }
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            terminal: false,
        }
    }

    /// Print a message followed by a newline.
    pub fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{message}")?;
        Ok(())
    }

    /// Read one line, without its line ending. EOF is `CliError::InputClosed`.
    pub fn ask(&mut self, label: &str) -> Result<String> {
        write!(self.output, "{label}: ")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(CliError::InputClosed);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Read a secret. On a terminal the answer is not echoed; piped input is
    /// read like any other line.
    pub fn ask_secret(&mut self, label: &str) -> Result<String> {
        if !self.terminal {
            return self.ask(label);
        }
        self.output.flush()?;
        let secret = rpassword::prompt_password(format!("{label}: ")).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                CliError::InputClosed
            } else {
                CliError::Io(e)
            }
        })?;
        Ok(secret)
    }

    /// Ask until a non-blank answer is given.
    pub fn ask_required(&mut self, label: &str) -> Result<String> {
        loop {
            let answer = self.ask(label)?;
            if !answer.trim().is_empty() {
                return Ok(answer.trim().to_string());
            }
        }
    }

    /// Yes/no question; anything but `y` or `yes` is a no.
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.ask(&format!("{question} [y/N]"))?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    pub fn into_output(self) -> W {
        self.output
    }
}
