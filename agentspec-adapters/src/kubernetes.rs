//! Kubernetes adapter: synthesizes Deployment/Service/ConfigMap manifests
//! and applies them via a shelled-out `kubectl apply -f -`. No pack example
//! links `k8s-openapi`/`kube`, and pulling in a full typed client for three
//! manifest kinds would be a heavier dependency than the problem needs.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use serde_json::{json, Value};

use agentspec_core::{Action, ActionKind, AdapterError, AgentSpecResult, ApplyResult, Resource};

use crate::adapter::{find_resource, Adapter, LogOptions};

pub struct KubernetesAdapter {
    namespace: String,
}

impl KubernetesAdapter {
    pub fn new() -> Self {
        Self { namespace: "default".to_string() }
    }

    fn app_name(resource: &Resource) -> String {
        resource.name.replace('/', "-")
    }

    fn manifests(&self, resource: &Resource) -> Vec<Value> {
        let name = Self::app_name(resource);
        let image = resource.attributes.get("image").and_then(|v| v.as_str()).unwrap_or("");
        let replicas = resource.attributes.get("replicas").and_then(|v| v.as_f64()).unwrap_or(1.0) as i64;

        let mut manifests = vec![json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": name, "namespace": self.namespace, "labels": { "app": name } },
            "spec": {
                "replicas": replicas,
                "selector": { "matchLabels": { "app": name } },
                "template": {
                    "metadata": { "labels": { "app": name } },
                    "spec": { "containers": [{ "name": name, "image": image }] }
                }
            }
        })];

        if let Some(ports) = resource.attributes.get("ports").and_then(|v| v.as_list()) {
            let port_specs: Vec<Value> = ports
                .iter()
                .filter_map(|p| p.as_str())
                .filter_map(|mapping| mapping.split(':').next_back())
                .filter_map(|port| port.parse::<i64>().ok())
                .map(|port| json!({ "port": port, "targetPort": port }))
                .collect();
            if !port_specs.is_empty() {
                manifests.push(json!({
                    "apiVersion": "v1",
                    "kind": "Service",
                    "metadata": { "name": name, "namespace": self.namespace },
                    "spec": { "selector": { "app": name }, "ports": port_specs }
                }));
            }
        }

        if let Some(env) = resource.attributes.get("env").and_then(|v| v.as_map()) {
            let data: BTreeMap<String, String> =
                env.iter().filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string()))).collect();
            if !data.is_empty() {
                manifests.push(json!({
                    "apiVersion": "v1",
                    "kind": "ConfigMap",
                    "metadata": { "name": format!("{name}-config"), "namespace": self.namespace },
                    "data": data
                }));
            }
        }

        manifests
    }

    fn apply_manifests(&self, manifests: &[Value]) -> Result<(), String> {
        let yaml_docs: Result<Vec<String>, String> =
            manifests.iter().map(|m| serde_yaml::to_string(m).map_err(|e| e.to_string())).collect();
        let combined = yaml_docs?.join("---\n");

        let mut child = Command::new("kubectl")
            .args(["apply", "-f", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| e.to_string())?;
        child.stdin.take().unwrap().write_all(combined.as_bytes()).map_err(|e| e.to_string())?;
        let output = child.wait_with_output().map_err(|e| e.to_string())?;
        if !output.status.success() {
            return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
        }
        Ok(())
    }

    fn delete_manifests(&self, resource: &Resource) -> Result<(), String> {
        let name = Self::app_name(resource);
        let _ = Command::new("kubectl").args(["delete", "deployment", &name, "-n", &self.namespace]).output();
        let _ = Command::new("kubectl").args(["delete", "service", &name, "-n", &self.namespace]).output();
        let _ = Command::new("kubectl")
            .args(["delete", "configmap", &format!("{name}-config"), "-n", &self.namespace])
            .output();
        Ok(())
    }
}

impl Default for KubernetesAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for KubernetesAdapter {
    fn name(&self) -> &'static str {
        "kubernetes"
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
        let mut results = Vec::with_capacity(actions.len());
        for action in actions {
            if action.kind == ActionKind::Noop {
                continue;
            }
            let outcome = match action.kind {
                ActionKind::Create | ActionKind::Update => find_resource(resources, &action.fqn)
                    .ok_or_else(|| "resource not found in desired set".to_string())
                    .and_then(|r| self.apply_manifests(&self.manifests(r))),
                ActionKind::Delete => find_resource(resources, &action.fqn)
                    .map(|r| self.delete_manifests(r))
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
            let manifests = self.manifests(resource);
            let yaml_docs: Vec<String> = manifests
                .iter()
                .map(|m| serde_yaml::to_string(m).unwrap_or_default())
                .collect();
            let path = out_dir.join(format!("{}.yaml", resource.name));
            std::fs::write(&path, yaml_docs.join("---\n")).map_err(|e| AdapterError::ApplyFailed {
                adapter: self.name().to_string(),
                fqn: resource.fqn.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    fn status(&self, resources: &[Resource]) -> AgentSpecResult<String> {
        let mut lines = Vec::new();
        for resource in resources {
            let name = Self::app_name(resource);
            let output = Command::new("kubectl")
                .args(["get", "deployment", &name, "-n", &self.namespace, "-o", "jsonpath={.status.readyReplicas}/{.spec.replicas}"])
                .output();
            let state = match output {
                Ok(o) if o.status.success() => String::from_utf8_lossy(&o.stdout).trim().to_string(),
                _ => "not found".to_string(),
            };
            lines.push(format!("{}: {state}", resource.fqn));
        }
        Ok(lines.join("\n"))
    }

    fn logs(&self, resources: &[Resource], writer: &mut dyn Write, options: &LogOptions) -> AgentSpecResult<()> {
        for resource in resources {
            let name = Self::app_name(resource);
            let mut args = vec!["logs".to_string(), format!("deployment/{name}"), "-n".to_string(), self.namespace.clone()];
            if let Some(n) = options.tail {
                args.push("--tail".to_string());
                args.push(n.to_string());
            }
            if let Ok(output) = Command::new("kubectl").args(&args).output() {
                let _ = writeln!(writer, "{}", String::from_utf8_lossy(&output.stdout));
            }
        }
        Ok(())
    }

    fn destroy(&self, resources: &[Resource]) -> AgentSpecResult<()> {
        for resource in resources {
            let _ = self.delete_manifests(resource);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentspec_core::{Attributes, AttrValue, Kind, ResourceMetadata};

    fn resource_with_image(image: &str) -> Resource {
        let mut attrs = Attributes::new();
        attrs.insert("image".to_string(), AttrValue::String(image.to_string()));
        Resource {
            kind: Kind::Server,
            name: "api".to_string(),
            fqn: "p/server/api".to_string(),
            attributes: attrs,
            references: vec![],
            hash: "h".to_string(),
            metadata: ResourceMetadata::default(),
        }
    }

    #[test]
    fn synthesizes_a_deployment_manifest() {
        let adapter = KubernetesAdapter::new();
        let resource = resource_with_image("ghcr.io/example/api:latest");
        let manifests = adapter.manifests(&resource);
        assert_eq!(manifests[0]["kind"], "Deployment");
        assert_eq!(manifests[0]["spec"]["replicas"], 1);
    }

    #[test]
    fn ports_attribute_adds_a_service_manifest() {
        let adapter = KubernetesAdapter::new();
        let mut resource = resource_with_image("ghcr.io/example/api:latest");
        resource
            .attributes
            .insert("ports".to_string(), AttrValue::List(vec![AttrValue::String("8080:8080".to_string())]));
        let manifests = adapter.manifests(&resource);
        assert!(manifests.iter().any(|m| m["kind"] == "Service"));
    }
}
