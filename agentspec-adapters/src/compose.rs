//! Docker Compose adapter: renders a compose file from the desired
//! resource set and shells out to `docker compose` rather than building
//! a YAML dialect of its own on top of the Docker engine adapter.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use agentspec_core::{Action, ActionKind, AdapterError, AgentSpecResult, ApplyResult, Resource};

use crate::adapter::{find_resource, Adapter, LogOptions};

#[derive(Debug, Serialize)]
struct ComposeFile {
    services: BTreeMap<String, ComposeService>,
}

#[derive(Debug, Serialize)]
struct ComposeService {
    image: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ports: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    environment: BTreeMap<String, String>,
}

pub struct ComposeAdapter {
    project_dir: PathBuf,
}

impl ComposeAdapter {
    pub fn new() -> Self {
        Self { project_dir: std::env::temp_dir().join("agentspec-compose") }
    }

    fn compose_path(&self) -> PathBuf {
        self.project_dir.join("docker-compose.yml")
    }

    fn render(resources: &[Resource]) -> ComposeFile {
        let mut services = BTreeMap::new();
        for resource in resources {
            let image = resource.attributes.get("image").and_then(|v| v.as_str()).unwrap_or("").to_string();
            let ports = resource
                .attributes
                .get("ports")
                .and_then(|v| v.as_list())
                .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default();
            let environment = resource
                .attributes
                .get("env")
                .and_then(|v| v.as_map())
                .map(|m| {
                    m.iter()
                        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                        .collect()
                })
                .unwrap_or_default();
            services.insert(resource.name.clone(), ComposeService { image, ports, environment });
        }
        ComposeFile { services }
    }

    fn write_compose_file(&self, resources: &[Resource]) -> Result<(), String> {
        std::fs::create_dir_all(&self.project_dir).map_err(|e| e.to_string())?;
        let compose = Self::render(resources);
        let yaml = serde_yaml::to_string(&compose).map_err(|e| e.to_string())?;
        std::fs::write(self.compose_path(), yaml).map_err(|e| e.to_string())
    }

    fn run(&self, args: &[&str]) -> Result<String, String> {
        let output = Command::new("docker")
            .arg("compose")
            .arg("-f")
            .arg(self.compose_path())
            .args(args)
            .output()
            .map_err(|e| e.to_string())?;
        if !output.status.success() {
            return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for ComposeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for ComposeAdapter {
    fn name(&self) -> &'static str {
        "docker-compose"
    }

    fn validate(&self, resources: &[Resource]) -> AgentSpecResult<()> {
        for r in resources {
            if r.attributes.get("image").and_then(|v| v.as_str()).is_none() {
                return Err(AdapterError::ValidationFailed {
                    adapter: self.name().to_string(),
                    fqn: r.fqn.clone(),
                    reason: "missing required attribute \"image\"".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn apply(&self, actions: &[Action], resources: &[Resource]) -> Vec<ApplyResult> {
        if actions.iter().all(|a| a.kind == ActionKind::Noop) {
            return Vec::new();
        }
        if let Err(e) = self.write_compose_file(resources) {
            return actions
                .iter()
                .filter(|a| a.kind != ActionKind::Noop)
                .map(|a| ApplyResult { fqn: a.fqn.clone(), kind: a.kind.clone(), success: false, error: Some(e.clone()), artifact: None })
                .collect();
        }

        let mut results = Vec::with_capacity(actions.len());
        for action in actions {
            if action.kind == ActionKind::Noop {
                continue;
            }
            let outcome = match action.kind {
                ActionKind::Create | ActionKind::Update => {
                    if find_resource(resources, &action.fqn).is_none() {
                        Err("resource not found in desired set".to_string())
                    } else {
                        self.run(&["up", "-d"]).map(|_| ())
                    }
                }
                ActionKind::Delete => self.run(&["down"]).map(|_| ()),
                ActionKind::Noop => unreachable!("filtered above"),
            };
            results.push(match outcome {
                Ok(()) => ApplyResult { fqn: action.fqn.clone(), kind: action.kind.clone(), success: true, error: None, artifact: None },
                Err(e) => ApplyResult { fqn: action.fqn.clone(), kind: action.kind.clone(), success: false, error: Some(e), artifact: None },
            });
        }
        results
    }

    fn export(&self, resources: &[Resource], out_dir: &Path) -> AgentSpecResult<()> {
        std::fs::create_dir_all(out_dir).map_err(|e| AdapterError::ApplyFailed {
            adapter: self.name().to_string(),
            fqn: String::new(),
            reason: e.to_string(),
        })?;
        let compose = Self::render(resources);
        let yaml = serde_yaml::to_string(&compose).map_err(|e| AdapterError::ApplyFailed {
            adapter: self.name().to_string(),
            fqn: String::new(),
            reason: e.to_string(),
        })?;
        std::fs::write(out_dir.join("docker-compose.yml"), yaml).map_err(|e| AdapterError::ApplyFailed {
            adapter: self.name().to_string(),
            fqn: String::new(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn status(&self, _resources: &[Resource]) -> AgentSpecResult<String> {
        self.run(&["ps"]).map_err(|e| AdapterError::ApplyFailed { adapter: self.name().to_string(), fqn: String::new(), reason: e }.into())
    }

    fn logs(&self, _resources: &[Resource], writer: &mut dyn Write, options: &LogOptions) -> AgentSpecResult<()> {
        let mut args = vec!["logs"];
        let tail_str;
        if let Some(n) = options.tail {
            tail_str = n.to_string();
            args.push("--tail");
            args.push(&tail_str);
        }
        if let Ok(output) = self.run(&args) {
            let _ = writeln!(writer, "{output}");
        }
        Ok(())
    }

    fn destroy(&self, _resources: &[Resource]) -> AgentSpecResult<()> {
        let _ = self.run(&["down"]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentspec_core::{Attributes, AttrValue, Kind, ResourceMetadata};

    #[test]
    fn renders_one_service_per_resource() {
        let mut attrs = Attributes::new();
        attrs.insert("image".to_string(), AttrValue::String("redis:7".to_string()));
        let resource = Resource {
            kind: Kind::Server,
            name: "cache".to_string(),
            fqn: "p/server/cache".to_string(),
            attributes: attrs,
            references: vec![],
            hash: "h".to_string(),
            metadata: ResourceMetadata::default(),
        };
        let compose = ComposeAdapter::render(&[resource]);
        assert_eq!(compose.services.get("cache").unwrap().image, "redis:7");
    }

    #[test]
    fn missing_image_fails_validation() {
        let adapter = ComposeAdapter::new();
        let resource = Resource {
            kind: Kind::Server,
            name: "cache".to_string(),
            fqn: "p/server/cache".to_string(),
            attributes: Attributes::new(),
            references: vec![],
            hash: "h".to_string(),
            metadata: ResourceMetadata::default(),
        };
        assert!(adapter.validate(&[resource]).is_err());
    }
}
