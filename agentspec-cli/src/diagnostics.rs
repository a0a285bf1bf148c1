//! Diagnostic rendering (§6): `file:line:col: severity: message` plus an
//! optional `hint:` line. `ParseError`/`ValidationError`'s own `Display`
//! impls only render the position and message (they're shared with
//! `AgentSpecError`'s aggregate formatting, which has no notion of
//! severity), so the CLI adds the severity/hint layer itself rather than
//! growing those library types a CLI-only concern.

use std::fmt;

pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

pub struct Diagnostic {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub severity: Severity,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn error(file: &str, line: usize, column: usize, message: &str, hint: &Option<String>) -> Self {
        Self { file: file.to_string(), line, column, severity: Severity::Error, message: message.to_string(), hint: hint.clone() }
    }

    /// Renders with ANSI color when `color` is true, plain text otherwise.
    pub fn render(&self, color: bool) -> String {
        let head = format!("{}:{}:{}: {}: {}", self.file, self.line, self.column, self.severity, self.message);
        let head = if color { color_for(&self.severity, &head) } else { head };
        match &self.hint {
            Some(hint) => format!("{head}\n  hint: {hint}"),
            None => head,
        }
    }
}

fn color_for(severity: &Severity, text: &str) -> String {
    let code = match severity {
        Severity::Error => "31",
        Severity::Warning => "33",
    };
    format!("\x1b[{code}m{text}\x1b[0m")
}

impl From<&agentspec_core::ParseError> for Diagnostic {
    fn from(e: &agentspec_core::ParseError) -> Self {
        Diagnostic::error(&e.file, e.line, e.column, &e.message, &e.hint)
    }
}

impl From<&agentspec_core::ValidationError> for Diagnostic {
    fn from(e: &agentspec_core::ValidationError) -> Self {
        Diagnostic::error(&e.file, e.line, e.column, &e.message, &e.hint)
    }
}

pub fn print_all(diagnostics: &[Diagnostic], color: bool) {
    for d in diagnostics {
        eprintln!("{}", d.render(color));
    }
}
