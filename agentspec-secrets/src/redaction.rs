//! Log redaction (§4.12): once a secret value is resolved, it is registered
//! here and scrubbed out of any subsequently rendered log field, even one
//! that never went through the `Secret` wrapper (a stray `{e}` in an error
//! message, for instance). `Secret`'s own `Debug`/`Display` impls are the
//! first line of defense; this is the defense-in-depth filter for everything
//! that isn't wrapped.
//!
//! Plugs into `tracing_subscriber` as a `FormatFields` implementation, the
//! extension point the teacher's own telemetry setup composes layers through
//! (`caliber-api/src/telemetry/tracer.rs`'s `registry().with(...)` chain).

use std::collections::HashSet;
use std::sync::RwLock;

use tracing_subscriber::field::RecordFields;
use tracing_subscriber::fmt::format::{DefaultFields, Writer};
use tracing_subscriber::fmt::FormatFields;

const REDACTED: &str = "***REDACTED***";

/// Every secret value resolved so far. `register`/`redact` each take their
/// own lock and a reader only ever observes a set some write fully
/// committed — no torn reads under concurrent registration.
#[derive(Default)]
pub struct RedactionRegistry {
    values: RwLock<HashSet<String>>,
}

impl RedactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, value: &str) {
        if value.is_empty() {
            return;
        }
        self.values.write().expect("redaction registry lock poisoned").insert(value.to_string());
    }

    pub fn redact(&self, input: &str) -> String {
        let values = self.values.read().expect("redaction registry lock poisoned");
        if values.is_empty() {
            return input.to_string();
        }
        let mut output = input.to_string();
        for value in values.iter() {
            output = output.replace(value.as_str(), REDACTED);
        }
        output
    }
}

/// A `FormatFields` that renders with the default formatter, then redacts
/// the rendered text against a shared `RedactionRegistry` before it reaches
/// the writer.
pub struct RedactingFieldFormatter {
    registry: std::sync::Arc<RedactionRegistry>,
    inner: DefaultFields,
}

impl RedactingFieldFormatter {
    pub fn new(registry: std::sync::Arc<RedactionRegistry>) -> Self {
        Self { registry, inner: DefaultFields::new() }
    }
}

impl<'writer> FormatFields<'writer> for RedactingFieldFormatter {
    fn format_fields<R: RecordFields>(&self, mut writer: Writer<'writer>, fields: R) -> std::fmt::Result {
        let mut buffer = String::new();
        self.inner.format_fields(Writer::new(&mut buffer), fields)?;
        writer.write_str(&self.registry.redact(&buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_value_is_scrubbed_from_arbitrary_text() {
        let registry = RedactionRegistry::new();
        registry.register("sk-live-abc123");
        let rendered = registry.redact("auth failed for token sk-live-abc123 on retry");
        assert_eq!(rendered, "auth failed for token ***REDACTED*** on retry");
    }

    #[test]
    fn empty_registry_is_a_no_op() {
        let registry = RedactionRegistry::new();
        assert_eq!(registry.redact("nothing registered yet"), "nothing registered yet");
    }
}
