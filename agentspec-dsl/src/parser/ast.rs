//! Abstract syntax tree for `.ias` source files.

use agentspec_core::Kind;
use serde::{Deserialize, Serialize};

use crate::lexer::Span;

/// The root AST node for one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub package: PackageHeader,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageHeader {
    pub name: String,
    pub version: String,
    pub lang: String,
    pub span: Span,
}

/// One top-level `kind "name" { ... }` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: Kind,
    pub name: String,
    pub attrs: Vec<AttrLine>,
    pub span: Span,
}

impl Statement {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.iter().find(|a| a.key == key).map(|a| &a.value)
    }
}

/// One `key value` line inside a block body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrLine {
    pub key: String,
    pub value: Value,
    pub span: Span,
}

/// An attribute value as written in source, before lowering to
/// `agentspec_core::AttrValue`. The only difference from the IR-level shape
/// is `Duration`, kept as its literal text until lowering decides how to
/// encode it (currently: verbatim string, so `"30s"` in source and
/// `"30s"` in the hashed attribute map are the same bytes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Number(f64),
    Bool(bool),
    Duration(String),
    List(Vec<Value>),
    Block(Vec<AttrLine>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}
