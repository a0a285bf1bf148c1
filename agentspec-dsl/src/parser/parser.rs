//! Hand-written, error-recovering recursive-descent parser for `.ias` source.
//!
//! Parsing never aborts on the first problem: on an unexpected token inside a
//! block the parser advances to the next line boundary and keeps going, so a
//! single pass can report more than one diagnostic. The parser's output is
//! always a best-effort `File` plus whatever `ParseError`s accumulated along
//! the way — never a bare `Result` that throws away partial structure.

use agentspec_core::{Kind, ParseError};

use super::ast::*;
use crate::lexer::{Lexer, Span, Token, TokenKind};

pub struct Parser {
    file: String,
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
    seen: std::collections::HashSet<(Kind, String)>,
}

/// Parse one source file. Never panics; always returns a `File` (possibly
/// structurally incomplete) alongside every diagnostic collected.
pub fn parse(file: &str, source: &str) -> (File, Vec<ParseError>) {
    let tokens = Lexer::new(source).tokenize();
    let mut parser = Parser {
        file: file.to_string(),
        tokens,
        pos: 0,
        errors: Vec::new(),
        seen: std::collections::HashSet::new(),
    };
    let ast = parser.parse_file();
    (ast, parser.errors)
}

impl Parser {
    fn parse_file(&mut self) -> File {
        self.skip_newlines();
        let package = self.parse_package_header();
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.at_eof() {
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
            self.skip_newlines();
        }
        File { package, statements }
    }

    fn parse_package_header(&mut self) -> PackageHeader {
        let start = self.peek().span;
        if !self.expect(TokenKind::Package, "expected `package` header") {
            return PackageHeader {
                name: String::new(),
                version: String::new(),
                lang: String::new(),
                span: start,
            };
        }
        let name = self.expect_string("expected package name string");
        self.expect(TokenKind::Version, "expected `version` after package name");
        let version = self.expect_string("expected version string");
        self.expect(TokenKind::Lang, "expected `lang` after version");
        let lang = self.expect_string("expected lang string");
        PackageHeader {
            name,
            version,
            lang,
            span: start,
        }
    }

    /// Parses one `kind "name" { body }` block. On a completely unrecognized
    /// lead token, records an error and skips to the next newline so the
    /// next statement still gets a chance.
    fn parse_statement(&mut self) -> Option<Statement> {
        let span = self.peek().span;
        let kind = match &self.peek().kind {
            TokenKind::Prompt => Kind::Prompt,
            TokenKind::Skill => Kind::Skill,
            TokenKind::Agent => Kind::Agent,
            TokenKind::Type => Kind::Type,
            TokenKind::Pipeline => Kind::Pipeline,
            TokenKind::Server => Kind::Server,
            TokenKind::Client => Kind::Client,
            TokenKind::Secret => Kind::Secret,
            TokenKind::Environment => Kind::Environment,
            TokenKind::Policy => Kind::Policy,
            TokenKind::Deploy => Kind::Deploy,
            TokenKind::Plugin => Kind::Plugin,
            TokenKind::Import => Kind::Import,
            TokenKind::Eof => return None,
            other => {
                self.error(span, format!("unexpected token {other:?} at top level"), None);
                self.advance();
                self.recover_to_newline();
                return None;
            }
        };
        self.advance();

        let name = self.expect_string("expected resource name string");
        let attrs = if self.check(&TokenKind::LBrace) {
            self.parse_block()
        } else {
            Vec::new()
        };

        if !self.seen.insert((kind, name.clone())) {
            self.error(span, format!("duplicate {kind} \"{name}\""), None);
        }

        Some(Statement {
            kind,
            name,
            attrs,
            span,
        })
    }

    /// Parses a `{ ... }` block into its attribute lines. Assumes the
    /// current token is `{`.
    fn parse_block(&mut self) -> Vec<AttrLine> {
        self.advance(); // consume `{`
        self.skip_newlines();
        let mut attrs = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            if let Some(line) = self.parse_attr_line() {
                attrs.push(line);
            }
            self.skip_newlines();
        }
        self.expect(TokenKind::RBrace, "expected `}` to close block");
        attrs
    }

    fn parse_attr_line(&mut self) -> Option<AttrLine> {
        let span = self.peek().span;
        let key = match &self.peek().kind {
            TokenKind::Identifier(s) => s.clone(),
            // Keywords are also legal attribute keys (e.g. a `type` field
            // inside a skill's I/O schema uses the same word as the
            // top-level `type` declaration).
            other if self.keyword_text(other).is_some() => self.keyword_text(other).unwrap(),
            other => {
                self.error(span, format!("unexpected token {other:?}, expected an attribute key"), None);
                self.advance();
                self.recover_to_newline();
                return None;
            }
        };
        self.advance();
        let value = self.parse_value()?;
        Some(AttrLine { key, value, span })
    }

    fn parse_value(&mut self) -> Option<Value> {
        let span = self.peek().span;
        match self.peek().kind.clone() {
            TokenKind::String(s) => {
                self.advance();
                Some(Value::String(s))
            }
            TokenKind::Number(n) => {
                self.advance();
                Some(Value::Number(n))
            }
            TokenKind::Duration(d) => {
                self.advance();
                Some(Value::Duration(d))
            }
            TokenKind::True => {
                self.advance();
                Some(Value::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Some(Value::Bool(false))
            }
            TokenKind::LBracket => Some(self.parse_list()),
            TokenKind::LBrace => Some(Value::Block(self.parse_block())),
            // A bare identifier value (e.g. `strategy react`) is treated as a string.
            TokenKind::Identifier(s) => {
                self.advance();
                Some(Value::String(s))
            }
            other if self.keyword_text(&other).is_some() => {
                self.advance();
                Some(Value::String(self.keyword_text(&other).unwrap()))
            }
            other => {
                self.error(span, format!("unexpected token {other:?}, expected a value"), None);
                self.advance();
                self.recover_to_newline();
                None
            }
        }
    }

    fn parse_list(&mut self) -> Value {
        self.advance(); // consume `[`
        self.skip_newlines();
        let mut items = Vec::new();
        while !self.check(&TokenKind::RBracket) && !self.at_eof() {
            if let Some(v) = self.parse_value() {
                items.push(v);
            }
            self.skip_newlines();
            if self.check(&TokenKind::Comma) {
                self.advance();
                self.skip_newlines();
            }
        }
        self.expect(TokenKind::RBracket, "expected `]` to close list");
        Value::List(items)
    }

    /// Maps a keyword token back to the literal text that produced it, so
    /// keywords can double as attribute keys/string values without the
    /// lexer needing a separate "soft keyword" concept.
    fn keyword_text(&self, kind: &TokenKind) -> Option<String> {
        let s = match kind {
            TokenKind::Package => "package",
            TokenKind::Prompt => "prompt",
            TokenKind::Skill => "skill",
            TokenKind::Agent => "agent",
            TokenKind::Type => "type",
            TokenKind::Pipeline => "pipeline",
            TokenKind::Server => "server",
            TokenKind::Client => "client",
            TokenKind::Secret => "secret",
            TokenKind::Environment => "environment",
            TokenKind::Policy => "policy",
            TokenKind::Deploy => "deploy",
            TokenKind::Plugin => "plugin",
            TokenKind::Import => "import",
            TokenKind::Version => "version",
            TokenKind::Lang => "lang",
            _ => return None,
        };
        Some(s.to_string())
    }

    // -- token stream plumbing -----------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn advance(&mut self) -> &Token {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[self.pos - 1]
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> bool {
        if self.check(&kind) {
            self.advance();
            true
        } else {
            let span = self.peek().span;
            self.error(span, message.to_string(), None);
            false
        }
    }

    fn expect_string(&mut self, message: &str) -> String {
        if let TokenKind::String(s) = self.peek().kind.clone() {
            self.advance();
            s
        } else {
            let span = self.peek().span;
            self.error(span, message.to_string(), None);
            String::new()
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    /// Error recovery: advance past tokens until the next newline or EOF so
    /// a malformed line doesn't cascade into every subsequent statement.
    fn recover_to_newline(&mut self) {
        while !self.check(&TokenKind::Newline) && !self.at_eof() {
            self.advance();
        }
    }

    fn error(&mut self, span: Span, message: String, hint: Option<String>) {
        self.errors.push(ParseError {
            file: self.file.clone(),
            line: span.line,
            column: span.column,
            message,
            hint,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_package() {
        let src = r#"
package "hello" version "0.1.0" lang "2.0"

agent "greeter" {
    model "gpt-4"
    max_turns 5
}
"#;
        let (file, errors) = parse("hello.ias", src);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(file.package.name, "hello");
        assert_eq!(file.statements.len(), 1);
        assert_eq!(file.statements[0].kind, Kind::Agent);
        assert_eq!(file.statements[0].name, "greeter");
    }

    #[test]
    fn duplicate_kind_name_is_an_error_but_parsing_continues() {
        let src = r#"
package "p" version "0.1.0" lang "2.0"

agent "a" { }
agent "a" { }
"#;
        let (file, errors) = parse("p.ias", src);
        assert_eq!(file.statements.len(), 2);
        assert!(errors.iter().any(|e| e.message.contains("duplicate")));
    }

    #[test]
    fn unknown_top_level_token_recovers_and_continues() {
        let src = r#"
package "p" version "0.1.0" lang "2.0"

bogus "x" { }
agent "a" { }
"#;
        let (file, errors) = parse("p.ias", src);
        assert_eq!(file.statements.len(), 1);
        assert_eq!(file.statements[0].name, "a");
        assert!(!errors.is_empty());
    }

    #[test]
    fn nested_block_values_parse() {
        let src = r#"
package "p" version "0.1.0" lang "2.0"

skill "fetch" {
    http {
        method "GET"
        url "https://example.com"
    }
}
"#;
        let (file, errors) = parse("p.ias", src);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        let http = file.statements[0].get("http").unwrap();
        match http {
            Value::Block(attrs) => {
                assert_eq!(attrs.iter().find(|a| a.key == "method").unwrap().value, Value::String("GET".into()));
            }
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn list_values_parse() {
        let src = r#"
package "p" version "0.1.0" lang "2.0"

agent "a" {
    skills ["greet", "farewell"]
}
"#;
        let (file, errors) = parse("p.ias", src);
        assert!(errors.is_empty());
        assert_eq!(
            file.statements[0].get("skills").unwrap(),
            &Value::List(vec![Value::String("greet".into()), Value::String("farewell".into())])
        );
    }
}
