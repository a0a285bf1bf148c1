//! Docker adapter: shells out to the `docker` CLI rather than linking a
//! Docker Engine API client crate — no pack example talks to the Docker
//! daemon over its HTTP API, and `docker` is assumed present on any host
//! that wants this adapter.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use agentspec_core::{Action, ActionKind, AdapterError, AgentSpecResult, ApplyResult, Resource};

use crate::adapter::{find_resource, Adapter, LogOptions};

pub struct DockerAdapter {
    binary: String,
}

impl DockerAdapter {
    pub fn new() -> Self {
        Self { binary: "docker".to_string() }
    }

    fn container_name(resource: &Resource) -> String {
        resource
            .attributes
            .get("container_name")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| resource.name.replace('/', "-"))
    }

    fn run(&self, args: &[&str]) -> Result<String, String> {
        let output = Command::new(&self.binary).args(args).output().map_err(|e| e.to_string())?;
        if !output.status.success() {
            return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn build_or_pull(&self, resource: &Resource) -> Result<String, String> {
        if let Some(context) = resource.attributes.get("build_context").and_then(|v| v.as_str()) {
            let tag = Self::image_tag(resource);
            self.run(&["build", "-t", &tag, context])?;
            Ok(tag)
        } else {
            let image = resource
                .attributes
                .get("image")
                .and_then(|v| v.as_str())
                .ok_or_else(|| "missing required attribute \"image\"".to_string())?
                .to_string();
            self.run(&["pull", &image])?;
            Ok(image)
        }
    }

    fn image_tag(resource: &Resource) -> String {
        resource
            .attributes
            .get("image")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("agentspec/{}:latest", resource.name))
    }

    fn start(&self, resource: &Resource) -> Result<(), String> {
        let image = self.build_or_pull(resource)?;
        let name = Self::container_name(resource);
        let mut args = vec!["run".to_string(), "-d".to_string(), "--name".to_string(), name];

        if let Some(ports) = resource.attributes.get("ports").and_then(|v| v.as_list()) {
            for p in ports {
                if let Some(mapping) = p.as_str() {
                    args.push("-p".to_string());
                    args.push(mapping.to_string());
                }
            }
        }
        if let Some(env) = resource.attributes.get("env").and_then(|v| v.as_map()) {
            for (k, v) in env {
                if let Some(val) = v.as_str() {
                    args.push("-e".to_string());
                    args.push(format!("{k}={val}"));
                }
            }
        }
        args.push(image);
        if let Some(command) = resource.attributes.get("command").and_then(|v| v.as_str()) {
            for part in command.split_whitespace() {
                args.push(part.to_string());
            }
        }

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&arg_refs).map(|_| ())
    }

    fn stop_and_remove(&self, resource: &Resource) -> Result<(), String> {
        let name = Self::container_name(resource);
        let _ = self.run(&["stop", &name]);
        let _ = self.run(&["rm", "-f", &name]);
        Ok(())
    }
}

impl Default for DockerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for DockerAdapter {
    fn name(&self) -> &'static str {
        "docker"
    }

    fn validate(&self, resources: &[Resource]) -> AgentSpecResult<()> {
        for r in resources {
            let has_image = r.attributes.get("image").and_then(|v| v.as_str()).is_some();
            let has_build = r.attributes.get("build_context").and_then(|v| v.as_str()).is_some();
            if !has_image && !has_build {
                return Err(AdapterError::ValidationFailed {
                    adapter: self.name().to_string(),
                    fqn: r.fqn.clone(),
                    reason: "requires either \"image\" or \"build_context\"".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn apply(&self, actions: &[Action], resources: &[Resource]) -> Vec<ApplyResult> {
        let mut results = Vec::with_capacity(actions.len());
        for action in actions {
            if action.kind == ActionKind::Noop {
                continue;
            }
            let outcome = match action.kind {
                ActionKind::Create => find_resource(resources, &action.fqn)
                    .ok_or_else(|| "resource not found in desired set".to_string())
                    .and_then(|r| self.start(r)),
                ActionKind::Update => find_resource(resources, &action.fqn)
                    .ok_or_else(|| "resource not found in desired set".to_string())
                    .and_then(|r| {
                        self.stop_and_remove(r)?;
                        self.start(r)
                    }),
                ActionKind::Delete => find_resource(resources, &action.fqn)
                    .map(|r| self.stop_and_remove(r))
                    .unwrap_or(Ok(())),
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
        for resource in resources {
            let image = Self::image_tag(resource);
            let path = out_dir.join(format!("{}.run.sh", resource.name));
            std::fs::write(&path, format!("#!/bin/sh\ndocker run -d --name {} {image}\n", Self::container_name(resource)))
                .map_err(|e| AdapterError::ApplyFailed { adapter: self.name().to_string(), fqn: resource.fqn.clone(), reason: e.to_string() })?;
        }
        Ok(())
    }

    fn status(&self, resources: &[Resource]) -> AgentSpecResult<String> {
        let mut lines = Vec::new();
        for resource in resources {
            let name = Self::container_name(resource);
            let state = self
                .run(&["inspect", "--format", "{{.State.Status}}", &name])
                .unwrap_or_else(|_| "not found".to_string());
            lines.push(format!("{}: {state}", resource.fqn));
        }
        Ok(lines.join("\n"))
    }

    fn logs(&self, resources: &[Resource], writer: &mut dyn Write, options: &LogOptions) -> AgentSpecResult<()> {
        for resource in resources {
            let name = Self::container_name(resource);
            let mut args = vec!["logs".to_string()];
            if let Some(n) = options.tail {
                args.push("--tail".to_string());
                args.push(n.to_string());
            }
            args.push(name);
            let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
            if let Ok(output) = self.run(&arg_refs) {
                let _ = writeln!(writer, "{output}");
            }
        }
        Ok(())
    }

    fn destroy(&self, resources: &[Resource]) -> AgentSpecResult<()> {
        for resource in resources {
            let _ = self.stop_and_remove(resource);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentspec_core::{Attributes, AttrValue, Kind, ResourceMetadata};

    #[test]
    fn missing_image_and_build_context_fails_validation() {
        let adapter = DockerAdapter::new();
        let resource = Resource {
            kind: Kind::Server,
            name: "web".to_string(),
            fqn: "p/server/web".to_string(),
            attributes: Attributes::new(),
            references: vec![],
            hash: "h".to_string(),
            metadata: ResourceMetadata::default(),
        };
        assert!(adapter.validate(&[resource]).is_err());
    }

    #[test]
    fn image_tag_prefers_explicit_image_attribute() {
        let mut attrs = Attributes::new();
        attrs.insert("image".to_string(), AttrValue::String("nginx:1.25".to_string()));
        let resource = Resource {
            kind: Kind::Server,
            name: "web".to_string(),
            fqn: "p/server/web".to_string(),
            attributes: attrs,
            references: vec![],
            hash: "h".to_string(),
            metadata: ResourceMetadata::default(),
        };
        assert_eq!(DockerAdapter::image_tag(&resource), "nginx:1.25");
    }
}
