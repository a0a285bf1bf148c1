//! Canonical formatter for `.ias` source. Normalizes whitespace, attribute
//! ordering, and string quoting so `fmt(fmt(x)) == fmt(x)` for any input that
//! parses cleanly — the property the `fmt --check` CLI command and any IDE
//! integration both rely on.

use std::fmt::Write;

use crate::parser::{AttrLine, File, Statement, Value};

const INDENT: &str = "    ";

/// Render a parsed file back to canonical source text.
pub fn format_file(file: &File) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "package \"{}\" version \"{}\" lang \"{}\"\n\n",
        escape(&file.package.name),
        escape(&file.package.version),
        escape(&file.package.lang)
    );

    for (i, stmt) in file.statements.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        format_statement(&mut out, stmt, 0);
    }

    out
}

fn format_statement(out: &mut String, stmt: &Statement, depth: usize) {
    let pad = INDENT.repeat(depth);
    let _ = write!(out, "{pad}{} \"{}\" {{\n", stmt.kind, escape(&stmt.name));
    let mut attrs = stmt.attrs.clone();
    attrs.sort_by(|a, b| a.key.cmp(&b.key));
    for attr in &attrs {
        format_attr_line(out, attr, depth + 1);
    }
    let _ = writeln!(out, "{pad}}}");
}

fn format_attr_line(out: &mut String, attr: &AttrLine, depth: usize) {
    let pad = INDENT.repeat(depth);
    let _ = write!(out, "{pad}{} ", attr.key);
    format_value(out, &attr.value, depth);
    out.push('\n');
}

fn format_value(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::String(s) => {
            let _ = write!(out, "\"{}\"", escape(s));
        }
        Value::Number(n) => {
            let _ = write!(out, "{}", format_number(*n));
        }
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Duration(d) => {
            let _ = write!(out, "{d}");
        }
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                format_value(out, item, depth);
            }
            out.push(']');
        }
        Value::Block(attrs) => {
            out.push_str("{\n");
            let mut sorted = attrs.clone();
            sorted.sort_by(|a, b| a.key.cmp(&b.key));
            for attr in &sorted {
                format_attr_line(out, attr, depth + 1);
            }
            let pad = INDENT.repeat(depth);
            let _ = write!(out, "{pad}}}");
        }
    }
}

/// Integers print without a trailing `.0`; everything else uses the shortest
/// round-trippable decimal representation `f64::to_string` already gives.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn roundtrip(src: &str) -> (String, String) {
        let (ast, errors) = parse("p.ias", src);
        assert!(errors.is_empty(), "{errors:?}");
        let once = format_file(&ast);
        let (ast2, errors2) = parse("p.ias", &once);
        assert!(errors2.is_empty(), "{errors2:?}: {once}");
        let twice = format_file(&ast2);
        (once, twice)
    }

    #[test]
    fn formatting_is_idempotent() {
        let (once, twice) = roundtrip(
            r#"
package "hello" version "0.1.0" lang "2.0"
agent "greeter" {
    max_turns 5
    model "gpt-4"
}
"#,
        );
        assert_eq!(once, twice);
    }

    #[test]
    fn attributes_are_sorted_alphabetically() {
        let (once, _) = roundtrip(
            r#"
package "p" version "0.1.0" lang "2.0"
agent "a" {
    model "gpt-4"
    max_turns 5
}
"#,
        );
        let model_pos = once.find("model").unwrap();
        let max_turns_pos = once.find("max_turns").unwrap();
        assert!(max_turns_pos < model_pos);
    }

    #[test]
    fn integers_print_without_trailing_decimal() {
        let (once, _) = roundtrip(
            r#"
package "p" version "0.1.0" lang "2.0"
agent "a" {
    model "x"
    max_turns 5
}
"#,
        );
        assert!(once.contains("max_turns 5\n"));
        assert!(!once.contains("5.0"));
    }
}
