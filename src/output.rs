//! User-facing output.
//!
//! Informational messages go to stdout and are suppressed in JSON mode, where
//! stdout carries only structured data. Errors always go to stderr.

use std::fmt::Display;

use anyhow::Result;
use console::style;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Output { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Prints `data` as pretty JSON on stdout, regardless of mode.
    pub fn emit_json<T: Serialize + ?Sized>(&self, data: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(data)?);
        Ok(())
    }

    pub fn info(&self, msg: impl Display) {
        if !self.json {
            println!("{}", msg);
        }
    }

    pub fn success(&self, msg: impl Display) {
        if !self.json {
            println!("{}", style(msg).green());
        }
    }

    pub fn warning(&self, msg: impl Display) {
        if !self.json {
            println!("{}", style(msg).yellow());
        }
    }

    pub fn cyan(&self, msg: impl Display) {
        if !self.json {
            println!("{}", style(msg).cyan());
        }
    }

    pub fn error(&self, msg: impl Display) {
        eprintln!("{}", style(msg).red());
    }
}
