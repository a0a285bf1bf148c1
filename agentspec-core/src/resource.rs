//! The resource graph: `Kind`, `Resource`, `Package`, and canonical attribute
//! hashing. `Resource` is deliberately tagged data (a kind plus an attribute
//! map) rather than a type per resource kind, so validators, adapters, and
//! plugins can all dispatch on `kind` without the engine knowing about new
//! kinds ahead of time.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The declared kind of a top-level block in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Prompt,
    Skill,
    Agent,
    Type,
    Pipeline,
    Server,
    Client,
    Secret,
    Environment,
    Policy,
    Deploy,
    Plugin,
    Import,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Prompt => "prompt",
            Kind::Skill => "skill",
            Kind::Agent => "agent",
            Kind::Type => "type",
            Kind::Pipeline => "pipeline",
            Kind::Server => "server",
            Kind::Client => "client",
            Kind::Secret => "secret",
            Kind::Environment => "environment",
            Kind::Policy => "policy",
            Kind::Deploy => "deploy",
            Kind::Plugin => "plugin",
            Kind::Import => "import",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An attribute value: scalar, list, or nested mapping. Mirrors the shape
/// attribute lines can take in source (`key value`, where value can itself
/// be a block).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    String(String),
    Number(f64),
    Bool(bool),
    List(Vec<AttrValue>),
    Map(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, AttrValue>> {
        match self {
            AttrValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Canonical JSON serialization: `BTreeMap` already sorts keys, and
    /// `serde_json` preserves list order, so `to_string` on this value is
    /// stable for any two `AttrValue`s that compare equal.
    fn canonical_json(&self) -> serde_json::Value {
        match self {
            AttrValue::String(s) => serde_json::Value::String(s.clone()),
            AttrValue::Number(n) => serde_json::json!(n),
            AttrValue::Bool(b) => serde_json::Value::Bool(*b),
            AttrValue::List(items) => {
                serde_json::Value::Array(items.iter().map(AttrValue::canonical_json).collect())
            }
            AttrValue::Map(m) => {
                let mut obj = serde_json::Map::new();
                for (k, v) in m {
                    obj.insert(k.clone(), v.canonical_json());
                }
                serde_json::Value::Object(obj)
            }
        }
    }
}

/// Attributes are an ordered mapping from key to value. `BTreeMap` gives us
/// sorted-key iteration for free, which is exactly the canonicalization
/// lowering needs — no separate sort step, no risk of a hand-rolled sort
/// drifting from what serialization actually does.
pub type Attributes = BTreeMap<String, AttrValue>;

/// The uniform IR unit. Every declaration in a package lowers to exactly one
/// `Resource`; `Kind` plus `Attributes` is the entire payload, everything
/// else is derived or bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: Kind,
    pub name: String,
    /// `"<package>/<kind>/<name>"`, globally unique within a compiled package set.
    pub fqn: String,
    pub attributes: Attributes,
    /// FQNs of other resources this one depends on.
    pub references: Vec<String>,
    /// Hex-encoded SHA-256 over the canonical JSON serialization of `attributes`.
    pub hash: String,
    pub metadata: ResourceMetadata,
}

/// Non-hashed bookkeeping: comments, source position, anything that must
/// never perturb the content hash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub source_file: Option<String>,
    pub source_line: Option<usize>,
    pub doc_comment: Option<String>,
}

impl Resource {
    pub fn new(
        package: &str,
        kind: Kind,
        name: impl Into<String>,
        attributes: Attributes,
        references: Vec<String>,
        metadata: ResourceMetadata,
    ) -> Self {
        let name = name.into();
        let fqn = format!("{package}/{}/{name}", kind.as_str());
        let hash = hash_attributes(&attributes);
        Self {
            kind,
            name,
            fqn,
            attributes,
            references,
            hash,
            metadata,
        }
    }

    /// Recomputes `hash` from `attributes`. Used after a plugin transform
    /// mutates attributes in place.
    pub fn rehash(&mut self) {
        self.hash = hash_attributes(&self.attributes);
    }
}

/// SHA-256 over the canonical (sorted-key, no-whitespace) JSON serialization
/// of an attribute map. Pure function of `attrs` — metadata never enters it.
pub fn hash_attributes(attrs: &Attributes) -> String {
    let mut obj = serde_json::Map::new();
    for (k, v) in attrs {
        obj.insert(k.clone(), v.canonical_json());
    }
    let canonical = serde_json::Value::Object(obj);
    // `serde_json::to_vec` on a `Map` built from a `BTreeMap` iterates in key
    // order and emits no insignificant whitespace — exactly the canonical
    // form the determinism contract requires.
    let bytes = serde_json::to_vec(&canonical).expect("canonical JSON serialization is infallible for attribute values");
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hex::encode(hasher.finalize())
}

/// Top-level container identified by `(name, version, lang_version)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub lang_version: String,
    pub resources: Vec<Resource>,
}

impl Package {
    /// Resources sorted by `(Kind, Name)`, the order the determinism
    /// contract requires for canonical IR documents and plan output.
    pub fn sorted_resources(&self) -> Vec<&Resource> {
        let mut sorted: Vec<&Resource> = self.resources.iter().collect();
        sorted.sort_by(|a, b| (a.kind, &a.name).cmp(&(b.kind, &b.name)));
        sorted
    }

    pub fn find(&self, fqn: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.fqn == fqn)
    }

    pub fn of_kind(&self, kind: Kind) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, AttrValue)]) -> Attributes {
        pairs.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn hash_is_stable_under_insertion_order() {
        let a = attrs(&[
            ("model", AttrValue::String("gpt-4".into())),
            ("max_turns", AttrValue::Number(10.0)),
        ]);
        // BTreeMap from a reversed iterator still produces the same sorted map.
        let b: Attributes = a.iter().rev().map(|(k, v)| (k.clone(), v.clone())).collect();
        assert_eq!(hash_attributes(&a), hash_attributes(&b));
    }

    #[test]
    fn hash_changes_with_value() {
        let a = attrs(&[("temperature", AttrValue::Number(0.5))]);
        let b = attrs(&[("temperature", AttrValue::Number(0.9))]);
        assert_ne!(hash_attributes(&a), hash_attributes(&b));
    }

    #[test]
    fn fqn_is_package_kind_name() {
        let r = Resource::new(
            "hello",
            Kind::Agent,
            "greeter",
            Attributes::new(),
            vec![],
            ResourceMetadata::default(),
        );
        assert_eq!(r.fqn, "hello/agent/greeter");
    }

    #[test]
    fn sorted_resources_orders_by_kind_then_name() {
        let pkg = Package {
            name: "hello".into(),
            version: "0.1.0".into(),
            lang_version: "2.0".into(),
            resources: vec![
                Resource::new("hello", Kind::Skill, "zzz", Attributes::new(), vec![], ResourceMetadata::default()),
                Resource::new("hello", Kind::Agent, "aaa", Attributes::new(), vec![], ResourceMetadata::default()),
                Resource::new("hello", Kind::Agent, "bbb", Attributes::new(), vec![], ResourceMetadata::default()),
            ],
        };
        let sorted: Vec<_> = pkg.sorted_resources().into_iter().map(|r| r.fqn.clone()).collect();
        assert_eq!(
            sorted,
            vec!["hello/agent/aaa", "hello/agent/bbb", "hello/skill/zzz"]
        );
    }
}
