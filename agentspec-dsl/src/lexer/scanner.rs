//! Lexer implementation for `.ias` source files.

use super::token::*;
use std::iter::Peekable;
use std::str::CharIndices;

/// Lexer for the AgentSpec DSL.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
            pos: 0,
        }
    }

    /// Tokenize the entire source into a vector of tokens.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        tokens
    }

    /// Get the next token from the source.
    fn next_token(&mut self) -> Token {
        self.skip_non_newline_whitespace_and_comments();

        let start_pos = self.pos;
        let start_line = self.line;
        let start_col = self.column;

        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some(c) => match c {
                '\n' => {
                    self.advance();
                    self.line += 1;
                    self.column = 1;
                    TokenKind::Newline
                }
                '{' => {
                    self.advance();
                    TokenKind::LBrace
                }
                '}' => {
                    self.advance();
                    TokenKind::RBrace
                }
                '(' => {
                    self.advance();
                    TokenKind::LParen
                }
                ')' => {
                    self.advance();
                    TokenKind::RParen
                }
                '[' => {
                    self.advance();
                    TokenKind::LBracket
                }
                ']' => {
                    self.advance();
                    TokenKind::RBracket
                }
                ',' => {
                    self.advance();
                    TokenKind::Comma
                }
                '.' => {
                    self.advance();
                    TokenKind::Dot
                }

                '-' => {
                    self.advance();
                    if self.peek_char().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                        self.scan_number_from_pos(start_pos)
                    } else {
                        TokenKind::Error("unexpected character: -".to_string())
                    }
                }

                '"' => self.scan_string(),

                c if c.is_ascii_digit() => self.scan_number_or_duration(),

                c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(),

                c => {
                    self.advance();
                    TokenKind::Error(format!("unexpected character: {c}"))
                }
            },
        };

        Token {
            kind,
            span: Span {
                start: start_pos,
                end: self.pos,
                line: start_line,
                column: start_col,
            },
        }
    }

    /// Scan an identifier or keyword.
    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let ident = &self.source[start..self.pos];

        match ident {
            "package" => TokenKind::Package,
            "prompt" => TokenKind::Prompt,
            "skill" => TokenKind::Skill,
            "agent" => TokenKind::Agent,
            "type" => TokenKind::Type,
            "pipeline" => TokenKind::Pipeline,
            "server" => TokenKind::Server,
            "client" => TokenKind::Client,
            "secret" => TokenKind::Secret,
            "environment" => TokenKind::Environment,
            "policy" => TokenKind::Policy,
            "deploy" => TokenKind::Deploy,
            "plugin" => TokenKind::Plugin,
            "import" => TokenKind::Import,
            "version" => TokenKind::Version,
            "lang" => TokenKind::Lang,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => TokenKind::Identifier(ident.to_string()),
        }
    }

    /// Scan a string literal with escape sequences.
    fn scan_string(&mut self) -> TokenKind {
        self.advance(); // consume opening quote
        let mut value = String::new();

        loop {
            match self.peek_char() {
                None => return TokenKind::Error("unterminated string".to_string()),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.peek_char() {
                        Some('n') => {
                            self.advance();
                            value.push('\n');
                        }
                        Some('t') => {
                            self.advance();
                            value.push('\t');
                        }
                        Some('\\') => {
                            self.advance();
                            value.push('\\');
                        }
                        Some('"') => {
                            self.advance();
                            value.push('"');
                        }
                        Some('r') => {
                            self.advance();
                            value.push('\r');
                        }
                        _ => value.push('\\'),
                    }
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }

        TokenKind::String(value)
    }

    /// Scan a number or duration literal (e.g. `30s`, `5m`, `2h`).
    fn scan_number_or_duration(&mut self) -> TokenKind {
        let start = self.pos;
        self.scan_digits_and_dot();
        self.finish_number_or_duration(start)
    }

    /// Scan a number starting from a given position (for negative numbers).
    fn scan_number_from_pos(&mut self, start: usize) -> TokenKind {
        self.scan_digits_and_dot();
        self.finish_number_or_duration(start)
    }

    fn scan_digits_and_dot(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() || c == '.' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn finish_number_or_duration(&mut self, start: usize) -> TokenKind {
        if let Some(c) = self.peek_char() {
            if matches!(c, 's' | 'm' | 'h' | 'd' | 'w') {
                self.advance();
                let text = &self.source[start..self.pos];
                return TokenKind::Duration(text.to_string());
            }
        }

        let text = &self.source[start..self.pos];
        match text.parse::<f64>() {
            Ok(n) => TokenKind::Number(n),
            Err(_) => TokenKind::Error(format!("invalid number: {text}")),
        }
    }

    /// Skip spaces, tabs, carriage returns, and comments — but not newlines,
    /// which are their own significant token.
    fn skip_non_newline_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('/') => {
                    let next = self.peek_next_char();
                    if next == Some('/') {
                        while let Some(c) = self.peek_char() {
                            if c == '\n' {
                                break;
                            }
                            self.advance();
                        }
                    } else if next == Some('*') {
                        self.advance(); // /
                        self.advance(); // *
                        loop {
                            match self.peek_char() {
                                None => break,
                                Some('*') if self.peek_next_char() == Some('/') => {
                                    self.advance();
                                    self.advance();
                                    break;
                                }
                                Some('\n') => {
                                    self.advance();
                                    self.line += 1;
                                    self.column = 1;
                                }
                                _ => {
                                    self.advance();
                                }
                            }
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.source[self.pos..].char_indices();
        iter.next();
        iter.next().map(|(_, c)| c)
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((i, c)) = self.chars.next() {
            self.pos = i + c.len_utf8();
            self.column += 1;
            Some(c)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenizes_package_header() {
        let toks = kinds(r#"package "hello" version "0.1.0" lang "2.0""#);
        assert_eq!(
            toks,
            vec![
                TokenKind::Package,
                TokenKind::String("hello".into()),
                TokenKind::Version,
                TokenKind::String("0.1.0".into()),
                TokenKind::Lang,
                TokenKind::String("2.0".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn newlines_are_significant() {
        let toks = kinds("a\nb");
        assert_eq!(
            toks,
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Newline,
                TokenKind::Identifier("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn scans_duration_suffix() {
        assert_eq!(kinds("30s")[0], TokenKind::Duration("30s".into()));
        assert_eq!(kinds("5m")[0], TokenKind::Duration("5m".into()));
    }

    #[test]
    fn unterminated_string_is_an_error_token() {
        assert_eq!(kinds("\"abc")[0], TokenKind::Error("unterminated string".into()));
    }

    #[test]
    fn comments_are_skipped_but_newlines_survive_them() {
        let toks = kinds("a // comment\nb");
        assert_eq!(
            toks,
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Newline,
                TokenKind::Identifier("b".into()),
                TokenKind::Eof,
            ]
        );
    }
}
