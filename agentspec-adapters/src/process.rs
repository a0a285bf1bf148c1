//! Process adapter: spawns and supervises OS processes directly, no
//! container runtime involved. The simplest of the four built-ins and the
//! one every other adapter's `apply`/`export` shape was modeled after.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use agentspec_core::{Action, ActionKind, AdapterError, AgentSpecResult, ApplyResult, Resource};

use crate::adapter::{find_resource, Adapter, LogOptions};

struct Managed {
    child: Child,
    stdout_path: std::path::PathBuf,
    stderr_path: std::path::PathBuf,
}

pub struct ProcessAdapter {
    children: Mutex<HashMap<String, Managed>>,
    grace_period: Duration,
    log_dir: std::path::PathBuf,
}

impl ProcessAdapter {
    pub fn new() -> Self {
        Self {
            children: Mutex::new(HashMap::new()),
            grace_period: Duration::from_secs(5),
            log_dir: std::env::temp_dir().join("agentspec-process-logs"),
        }
    }

    fn spawn(&self, fqn: &str, resource: &Resource) -> Result<Managed, String> {
        let command = resource
            .attributes
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "missing required attribute \"command\"".to_string())?;
        let args: Vec<String> = resource
            .attributes
            .get("args")
            .and_then(|v| v.as_list())
            .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        std::fs::create_dir_all(&self.log_dir).map_err(|e| e.to_string())?;
        let safe_name = fqn.replace('/', "_");
        let stdout_path = self.log_dir.join(format!("{safe_name}.stdout.log"));
        let stderr_path = self.log_dir.join(format!("{safe_name}.stderr.log"));
        let stdout_file = File::create(&stdout_path).map_err(|e| e.to_string())?;
        let stderr_file = File::create(&stderr_path).map_err(|e| e.to_string())?;

        let mut cmd = Command::new(command);
        cmd.args(&args).stdout(Stdio::from(stdout_file)).stderr(Stdio::from(stderr_file));
        if let Some(env) = resource.attributes.get("env").and_then(|v| v.as_map()) {
            for (k, v) in env {
                if let Some(val) = v.as_str() {
                    cmd.env(k, val);
                }
            }
        }

        let child = cmd.spawn().map_err(|e| e.to_string())?;
        Ok(Managed { child, stdout_path, stderr_path })
    }

    /// Stop a tracked process: request termination, poll `try_wait` up to
    /// the grace period, then force-kill if it's still running.
    fn stop(&self, managed: &mut Managed) {
        let _ = managed.child.kill();
        let deadline = Instant::now() + self.grace_period;
        while Instant::now() < deadline {
            if matches!(managed.child.try_wait(), Ok(Some(_))) {
                return;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        let _ = managed.child.kill();
        let _ = managed.child.wait();
    }
}

impl Default for ProcessAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for ProcessAdapter {
    fn name(&self) -> &'static str {
        "process"
    }

    fn validate(&self, resources: &[Resource]) -> AgentSpecResult<()> {
        for r in resources {
            if r.attributes.get("command").and_then(|v| v.as_str()).is_none() {
                return Err(AdapterError::ValidationFailed {
                    adapter: self.name().to_string(),
                    fqn: r.fqn.clone(),
                    reason: "missing required attribute \"command\"".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn apply(&self, actions: &[Action], resources: &[Resource]) -> Vec<ApplyResult> {
        let mut children = self.children.lock().expect("process adapter lock poisoned");
        let mut results = Vec::with_capacity(actions.len());

        for action in actions {
            if action.kind == ActionKind::Noop {
                continue;
            }
            let result = match action.kind {
                ActionKind::Create => match find_resource(resources, &action.fqn) {
                    Some(resource) => match self.spawn(&action.fqn, resource) {
                        Ok(managed) => {
                            children.insert(action.fqn.clone(), managed);
                            ApplyResult { fqn: action.fqn.clone(), kind: action.kind.clone(), success: true, error: None, artifact: None }
                        }
                        Err(e) => ApplyResult { fqn: action.fqn.clone(), kind: action.kind.clone(), success: false, error: Some(e), artifact: None },
                    },
                    None => ApplyResult {
                        fqn: action.fqn.clone(),
                        kind: action.kind.clone(),
                        success: false,
                        error: Some("resource not found in desired set".to_string()),
                        artifact: None,
                    },
                },
                ActionKind::Update => match find_resource(resources, &action.fqn) {
                    Some(resource) => {
                        if let Some(mut existing) = children.remove(&action.fqn) {
                            self.stop(&mut existing);
                        }
                        match self.spawn(&action.fqn, resource) {
                            Ok(managed) => {
                                children.insert(action.fqn.clone(), managed);
                                ApplyResult { fqn: action.fqn.clone(), kind: action.kind.clone(), success: true, error: None, artifact: None }
                            }
                            Err(e) => ApplyResult { fqn: action.fqn.clone(), kind: action.kind.clone(), success: false, error: Some(e), artifact: None },
                        }
                    }
                    None => ApplyResult {
                        fqn: action.fqn.clone(),
                        kind: action.kind.clone(),
                        success: false,
                        error: Some("resource not found in desired set".to_string()),
                        artifact: None,
                    },
                },
                ActionKind::Delete => {
                    if let Some(mut existing) = children.remove(&action.fqn) {
                        self.stop(&mut existing);
                    }
                    ApplyResult { fqn: action.fqn.clone(), kind: action.kind.clone(), success: true, error: None, artifact: None }
                }
                ActionKind::Noop => unreachable!("filtered above"),
            };
            results.push(result);
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
            let command = resource.attributes.get("command").and_then(|v| v.as_str()).unwrap_or("");
            let args: Vec<&str> = resource
                .attributes
                .get("args")
                .and_then(|v| v.as_list())
                .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
                .unwrap_or_default();
            let script = format!("#!/bin/sh\nexec {command} {}\n", args.join(" "));
            let path = out_dir.join(format!("{}.sh", resource.name));
            std::fs::write(&path, script).map_err(|e| AdapterError::ApplyFailed {
                adapter: self.name().to_string(),
                fqn: resource.fqn.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    fn status(&self, resources: &[Resource]) -> AgentSpecResult<String> {
        let mut children = self.children.lock().expect("process adapter lock poisoned");
        let mut lines = Vec::new();
        for resource in resources {
            let state = match children.get_mut(&resource.fqn) {
                Some(managed) => match managed.child.try_wait() {
                    Ok(None) => "running",
                    Ok(Some(_)) => "exited",
                    Err(_) => "unknown",
                },
                None => "not tracked",
            };
            lines.push(format!("{}: {state}", resource.fqn));
        }
        Ok(lines.join("\n"))
    }

    fn logs(&self, resources: &[Resource], writer: &mut dyn Write, options: &LogOptions) -> AgentSpecResult<()> {
        let children = self.children.lock().expect("process adapter lock poisoned");
        for resource in resources {
            if let Some(managed) = children.get(&resource.fqn) {
                write_tail(&managed.stdout_path, writer, options.tail)?;
                write_tail(&managed.stderr_path, writer, options.tail)?;
            }
        }
        Ok(())
    }

    fn destroy(&self, resources: &[Resource]) -> AgentSpecResult<()> {
        let mut children = self.children.lock().expect("process adapter lock poisoned");
        for resource in resources {
            if let Some(mut managed) = children.remove(&resource.fqn) {
                self.stop(&mut managed);
            }
        }
        Ok(())
    }
}

fn write_tail(path: &Path, writer: &mut dyn Write, tail: Option<usize>) -> AgentSpecResult<()> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return Ok(()),
    };
    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(|e| AdapterError::ApplyFailed {
        adapter: "process".to_string(),
        fqn: String::new(),
        reason: e.to_string(),
    })?;
    let _ = file.seek(SeekFrom::Start(0));
    let text = match tail {
        Some(n) => contents.lines().rev().take(n).collect::<Vec<_>>().into_iter().rev().collect::<Vec<_>>().join("\n"),
        None => contents,
    };
    let _ = writeln!(writer, "{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentspec_core::{Attributes, AttrValue, Kind, ResourceMetadata};

    fn resource(fqn: &str, command: &str) -> Resource {
        let mut attrs = Attributes::new();
        attrs.insert("command".to_string(), AttrValue::String(command.to_string()));
        Resource {
            kind: Kind::Server,
            name: fqn.to_string(),
            fqn: fqn.to_string(),
            attributes: attrs,
            references: vec![],
            hash: "h".to_string(),
            metadata: ResourceMetadata::default(),
        }
    }

    #[test]
    fn create_then_destroy_a_process() {
        let adapter = ProcessAdapter::new();
        let resources = vec![resource("p/server/sleeper", "sleep")];
        let mut attrs = resources[0].attributes.clone();
        attrs.insert("args".to_string(), AttrValue::List(vec![AttrValue::String("1".to_string())]));
        let mut r = resources[0].clone();
        r.attributes = attrs;
        let resources = vec![r];

        let actions = vec![Action {
            fqn: "p/server/sleeper".to_string(),
            kind: ActionKind::Create,
            reason: agentspec_core::ActionReason::New,
        }];
        let results = adapter.apply(&actions, &resources);
        assert!(results[0].success);
        adapter.destroy(&resources).unwrap();
    }

    #[test]
    fn missing_command_fails_validation() {
        let adapter = ProcessAdapter::new();
        let mut r = resource("p/server/bad", "echo");
        r.attributes.remove("command");
        assert!(adapter.validate(&[r]).is_err());
    }
}
