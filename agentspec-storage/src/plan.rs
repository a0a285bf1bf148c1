//! Plan engine (C4): diffs desired resources against recorded state entries
//! and produces a deterministic, FQN-sorted `Plan`.

use std::collections::HashMap;

use agentspec_core::{Action, ActionKind, ActionReason, Kind, Plan, Resource, StateEntry, Status};

/// Diff `desired` (freshly lowered from source) against `current` (loaded
/// from the state backend) and produce a sorted `Plan`. Pure function: no
/// I/O, no clock, so the same inputs always produce the same plan.
pub fn diff(desired: &[Resource], current: &[StateEntry]) -> Plan {
    let current_by_fqn: HashMap<&str, &StateEntry> = current.iter().map(|e| (e.fqn.as_str(), e)).collect();
    let desired_fqns: std::collections::HashSet<&str> = desired.iter().map(|r| r.fqn.as_str()).collect();

    let mut actions = Vec::with_capacity(desired.len());

    for d in desired {
        match current_by_fqn.get(d.fqn.as_str()) {
            None => actions.push(Action {
                fqn: d.fqn.clone(),
                kind: ActionKind::Create,
                reason: ActionReason::New,
            }),
            Some(entry) if entry.hash != d.hash => actions.push(Action {
                fqn: d.fqn.clone(),
                kind: ActionKind::Update,
                reason: ActionReason::HashChanged,
            }),
            Some(entry) if entry.status == Status::Failed => actions.push(Action {
                fqn: d.fqn.clone(),
                kind: ActionKind::Update,
                reason: ActionReason::RetryPreviouslyFailed,
            }),
            Some(_) => actions.push(Action {
                fqn: d.fqn.clone(),
                kind: ActionKind::Noop,
                reason: ActionReason::Unchanged,
            }),
        }
    }

    for entry in current {
        if !desired_fqns.contains(entry.fqn.as_str()) {
            actions.push(Action {
                fqn: entry.fqn.clone(),
                kind: ActionKind::Delete,
                reason: ActionReason::RemovedFromSource,
            });
        }
    }

    actions.sort_by(|a, b| a.fqn.cmp(&b.fqn));
    Plan { actions }
}

/// Deploy-target resolution: named target wins, else the sole `Deploy`
/// wildcard marked `default`, else the sole declared target. Ambiguity and
/// absence are both reported to the caller rather than silently guessed.
pub fn resolve_deploy_target<'a>(
    deploy_targets: &'a [&'a Resource],
    requested: Option<&str>,
) -> Result<&'a Resource, agentspec_core::PlanError> {
    if let Some(name) = requested {
        return deploy_targets
            .iter()
            .find(|r| r.name == name)
            .copied()
            .ok_or_else(|| agentspec_core::PlanError::NoTargetResolved {
                reason: format!("no deploy target named \"{name}\""),
            });
    }

    let defaults: Vec<&Resource> = deploy_targets
        .iter()
        .filter(|r| r.attributes.get("default").and_then(|v| v.as_bool()).unwrap_or(false))
        .copied()
        .collect();
    if defaults.len() == 1 {
        return Ok(defaults[0]);
    }
    if defaults.len() > 1 {
        return Err(agentspec_core::PlanError::AmbiguousTarget {
            candidates: defaults.iter().map(|r| r.name.clone()).collect(),
        });
    }

    match deploy_targets.len() {
        1 => Ok(deploy_targets[0]),
        0 => Err(agentspec_core::PlanError::NoTargetResolved {
            reason: "no deploy target declared".to_string(),
        }),
        _ => Err(agentspec_core::PlanError::AmbiguousTarget {
            candidates: deploy_targets.iter().map(|r| r.name.clone()).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentspec_core::{Attributes, ResourceMetadata};
    use chrono::Utc;

    fn resource(fqn: &str, hash: &str) -> Resource {
        Resource {
            kind: Kind::Agent,
            name: fqn.rsplit('/').next().unwrap().to_string(),
            fqn: fqn.to_string(),
            attributes: Attributes::new(),
            references: vec![],
            hash: hash.to_string(),
            metadata: ResourceMetadata::default(),
        }
    }

    fn entry(fqn: &str, hash: &str, status: Status) -> StateEntry {
        StateEntry {
            fqn: fqn.to_string(),
            hash: hash.to_string(),
            status,
            last_applied: Utc::now(),
            adapter: "process".to_string(),
            error: None,
        }
    }

    #[test]
    fn new_resource_is_a_create() {
        let plan = diff(&[resource("p/agent/a", "h1")], &[]);
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions[0].kind, ActionKind::Create);
    }

    #[test]
    fn changed_hash_is_an_update() {
        let plan = diff(
            &[resource("p/agent/a", "h2")],
            &[entry("p/agent/a", "h1", Status::Applied)],
        );
        assert_eq!(plan.actions[0].kind, ActionKind::Update);
        assert_eq!(plan.actions[0].reason, ActionReason::HashChanged);
    }

    #[test]
    fn failed_status_retries_even_with_same_hash() {
        let plan = diff(
            &[resource("p/agent/a", "h1")],
            &[entry("p/agent/a", "h1", Status::Failed)],
        );
        assert_eq!(plan.actions[0].kind, ActionKind::Update);
        assert_eq!(plan.actions[0].reason, ActionReason::RetryPreviouslyFailed);
    }

    #[test]
    fn unchanged_is_a_noop() {
        let plan = diff(
            &[resource("p/agent/a", "h1")],
            &[entry("p/agent/a", "h1", Status::Applied)],
        );
        assert_eq!(plan.actions[0].kind, ActionKind::Noop);
    }

    #[test]
    fn removed_from_source_is_a_delete() {
        let plan = diff(&[], &[entry("p/agent/a", "h1", Status::Applied)]);
        assert_eq!(plan.actions[0].kind, ActionKind::Delete);
    }

    #[test]
    fn actions_are_sorted_by_fqn() {
        let plan = diff(&[resource("p/agent/b", "h"), resource("p/agent/a", "h")], &[]);
        let fqns: Vec<_> = plan.actions.iter().map(|a| a.fqn.as_str()).collect();
        assert_eq!(fqns, vec!["p/agent/a", "p/agent/b"]);
    }
}
