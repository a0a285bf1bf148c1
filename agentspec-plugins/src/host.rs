//! The guest module loader and the alloc/call/read memory-exchange
//! protocol (§4.7). One `Store`/`Instance` per dispatch: concurrent
//! dispatches against the same compiled `Module` never share linear
//! memory.

use std::path::Path;

use wasmtime::{Engine, Instance, Linker, Memory, Module, Store, TypedFunc};
use wasmtime_wasi::pipe::MemoryOutputPipe;
use wasmtime_wasi::preview1::{self, WasiP1Ctx};
use wasmtime_wasi::WasiCtxBuilder;

use agentspec_core::PluginError;

use crate::manifest::PluginManifest;

const MAX_CAPTURED_OUTPUT_BYTES: usize = 64 * 1024;

pub struct LoadedPlugin {
    pub name: String,
    pub manifest: PluginManifest,
    pub path: std::path::PathBuf,
    engine: Engine,
    module: Module,
}

struct GuestCall {
    store: Store<WasiP1Ctx>,
    instance: Instance,
    memory: Memory,
    stdout: MemoryOutputPipe,
    stderr: MemoryOutputPipe,
}

impl LoadedPlugin {
    /// Compiles the module and calls its `manifest()` export exactly once
    /// to validate shape before the plugin is registered.
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        let engine = Engine::default();
        let module = Module::from_file(&engine, path).map_err(|e| PluginError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut call = instantiate(&engine, &module, path)?;
        let manifest_fn: TypedFunc<(), (i32, i32)> =
            call.instance.get_typed_func(&mut call.store, "manifest").map_err(|e| PluginError::LoadFailed {
                path: path.display().to_string(),
                reason: format!("missing required export \"manifest\": {e}"),
            })?;
        let (ptr, len) = manifest_fn.call(&mut call.store, ()).map_err(|e| PluginError::LoadFailed {
            path: path.display().to_string(),
            reason: format!("manifest() trapped: {e}"),
        })?;
        let bytes = read_memory(&call.memory, &call.store, ptr, len).map_err(|e| PluginError::LoadFailed {
            path: path.display().to_string(),
            reason: e,
        })?;
        let manifest: PluginManifest = serde_json::from_slice(&bytes).map_err(|e| PluginError::LoadFailed {
            path: path.display().to_string(),
            reason: format!("manifest() returned invalid JSON: {e}"),
        })?;

        Ok(Self { name: manifest.name.clone(), manifest, path: path.to_path_buf(), engine, module })
    }

    /// Builds a `LoadedPlugin` around an empty module, for tests that only
    /// exercise manifest-driven logic (conflict detection, capability
    /// lookup) and never dispatch into the guest.
    #[cfg(test)]
    pub(crate) fn for_test(manifest: PluginManifest) -> Self {
        let engine = Engine::default();
        let module = Module::new(&engine, "(module)").expect("empty module always compiles");
        Self { name: manifest.name.clone(), manifest, path: std::path::PathBuf::new(), engine, module }
    }

    /// Dispatch a single capability export (`validate_<name>`,
    /// `transform_<name>`, `hook_<name>`, or a stage-named fallback) with
    /// `input` as its JSON payload. Returns the decoded JSON output plus
    /// the captured stderr, so the caller can surface it on failure
    /// without ever relaying it to the host's own streams.
    pub fn dispatch(&self, export_name: &str, input: &serde_json::Value) -> Result<(serde_json::Value, String), PluginError> {
        let capability_failed = |message: String, stderr: String| PluginError::CapabilityFailed {
            plugin: self.name.clone(),
            capability: export_name.to_string(),
            message,
            stderr,
        };

        let mut call = instantiate(&self.engine, &self.module, &self.path)
            .map_err(|e| capability_failed(format!("{e}"), String::new()))?;

        let alloc: TypedFunc<i32, i32> = call
            .instance
            .get_typed_func(&mut call.store, "alloc")
            .map_err(|e| capability_failed(format!("missing required export \"alloc\": {e}"), String::new()))?;
        let capability_fn: TypedFunc<(i32, i32), (i32, i32)> =
            call.instance.get_typed_func(&mut call.store, export_name).map_err(|e| {
                capability_failed(format!("missing capability export \"{export_name}\": {e}"), String::new())
            })?;

        let payload = serde_json::to_vec(input).map_err(|e| capability_failed(e.to_string(), String::new()))?;
        let ptr = alloc
            .call(&mut call.store, payload.len() as i32)
            .map_err(|e| capability_failed(format!("alloc trapped: {e}"), stderr_of(&call)))?;
        call.memory
            .write(&mut call.store, ptr as usize, &payload)
            .map_err(|e| capability_failed(format!("failed writing guest memory: {e}"), stderr_of(&call)))?;

        let (out_ptr, out_len) = capability_fn
            .call(&mut call.store, (ptr, payload.len() as i32))
            .map_err(|e| capability_failed(format!("{export_name} trapped: {e}"), stderr_of(&call)))?;

        let stderr = stderr_of(&call);
        let bytes = read_memory(&call.memory, &call.store, out_ptr, out_len).map_err(|e| capability_failed(e, stderr.clone()))?;
        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| capability_failed(format!("invalid JSON output: {e}"), stderr.clone()))?;

        Ok((value, stderr))
    }
}

fn stderr_of(call: &GuestCall) -> String {
    String::from_utf8_lossy(&call.stderr.contents()).into_owned()
}

fn read_memory(memory: &Memory, store: &Store<WasiP1Ctx>, ptr: i32, len: i32) -> Result<Vec<u8>, String> {
    let data = memory.data(store);
    let start = ptr as usize;
    let end = start.checked_add(len as usize).ok_or_else(|| "guest returned an out-of-range pointer".to_string())?;
    data.get(start..end).map(<[u8]>::to_vec).ok_or_else(|| "guest returned an out-of-range pointer".to_string())
}

fn instantiate(engine: &Engine, module: &Module, path: &Path) -> Result<GuestCall, PluginError> {
    let stdout = MemoryOutputPipe::new(MAX_CAPTURED_OUTPUT_BYTES);
    let stderr = MemoryOutputPipe::new(MAX_CAPTURED_OUTPUT_BYTES);
    let wasi = WasiCtxBuilder::new().stdout(stdout.clone()).stderr(stderr.clone()).build_p1();

    let mut store = Store::new(engine, wasi);
    let mut linker: Linker<WasiP1Ctx> = Linker::new(engine);
    preview1::add_to_linker_sync(&mut linker, |ctx| ctx).map_err(|e| PluginError::LoadFailed {
        path: path.display().to_string(),
        reason: format!("failed wiring WASI imports: {e}"),
    })?;

    let instance = linker.instantiate(&mut store, module).map_err(|e| PluginError::LoadFailed {
        path: path.display().to_string(),
        reason: format!("failed instantiating module: {e}"),
    })?;
    let memory = instance.get_memory(&mut store, "memory").ok_or_else(|| PluginError::LoadFailed {
        path: path.display().to_string(),
        reason: "module has no exported linear memory named \"memory\"".to_string(),
    })?;

    Ok(GuestCall { store, instance, memory, stdout, stderr })
}
