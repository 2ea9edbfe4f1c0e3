//! Rustyline helper: completion, hints and highlighting.

use crate::command::COMMANDS;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::borrow::Cow::{self, Borrowed, Owned};

const COMPANY_PREFIX: &str = "/company ";

#[derive(Clone)]
pub struct CliHelper {
    commands: Vec<String>,
    companies: Vec<String>,
}

impl CliHelper {
    pub fn new(companies: &[String]) -> Self {
        Self {
            commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
            companies: companies.to_vec(),
        }
    }

    fn candidates(&self, line: &str) -> (usize, Vec<&String>) {
        if let Some(partial) = line.strip_prefix(COMPANY_PREFIX) {
            let matches = self
                .companies
                .iter()
                .filter(|company| company.to_lowercase().starts_with(&partial.to_lowercase()))
                .collect();
            return (COMPANY_PREFIX.len(), matches);
        }
        if line.starts_with('/') && !line.contains(' ') {
            let matches = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .collect();
            return (0, matches);
        }
        (0, Vec::new())
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, matches) = self.candidates(&line[..pos]);
        let pairs = matches
            .into_iter()
            .map(|candidate| Pair {
                display: candidate.clone(),
                replacement: candidate.clone(),
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let (start, matches) = self.candidates(line);
        let typed = line.len() - start;
        matches
            .into_iter()
            .find(|candidate| candidate.len() > typed)
            .and_then(|candidate| candidate.get(typed..))
            .map(str::to_string)
    }
}

impl Validator for CliHelper {}
