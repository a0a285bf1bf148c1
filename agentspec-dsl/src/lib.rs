//! AgentSpec DSL — lexer, parser, validator, and IR lowering for `.ias`
//! source files.
//!
//! ```text
//! source
//!   -> Lexer (tokenize, significant newlines)
//!   -> Parser (error-recovering recursive descent -> File)
//!   -> validate (structural + semantic passes -> Vec<ValidationError>)
//!   -> lower (File -> IrDocument: Resource[] + policy/deploy/binding views)
//!   -> pretty_printer (canonical, idempotent formatting)
//! ```

pub mod lexer;
pub mod lower;
pub mod parser;
pub mod pretty_printer;
pub mod validator;

pub use lexer::*;
pub use lower::{lower, IrDocument};
pub use parser::*;
pub use pretty_printer::format_file;
pub use validator::validate;
