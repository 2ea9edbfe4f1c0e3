//! Parsing of REPL input lines.

pub const COMMANDS: &[&str] = &["/company", "/companies", "/history", "/refresh", "/session"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Text to send to the assistant, exactly as typed.
    Message(String),
    SelectCompany(String),
    ListCompanies,
    History,
    Refresh,
    ShowSession,
    Quit,
    Unknown(String),
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Command::Empty;
        }
        if trimmed == "quit" || trimmed == "exit" {
            return Command::Quit;
        }
        if !trimmed.starts_with('/') {
            return Command::Message(line.to_string());
        }

        let (name, argument) = match trimmed.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (trimmed, ""),
        };
        match name {
            "/company" if !argument.is_empty() => Command::SelectCompany(argument.to_string()),
            "/company" | "/companies" => Command::ListCompanies,
            "/history" => Command::History,
            "/refresh" => Command::Refresh,
            "/session" => Command::ShowSession,
            other => Command::Unknown(other.to_string()),
        }
    }
}
