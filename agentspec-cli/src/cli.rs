//! Command-line surface (§4.17, §6). Grounded on the teacher's own
//! `clap`-derive entry points (every teacher binary parses a `Parser` struct
//! with a `#[command(subcommand)]` enum and global flags marked `global =
//! true` so they apply under any subcommand) and on the wider pack's CLI
//! examples for subcommand/flag layout.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "agentspec")]
#[command(version, about = "AgentSpec deployment toolchain", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the persisted state file. Defaults to `.agentspec.state.json`
    /// in the current directory; the legacy `.agentz.state.json` name is
    /// renamed on first access with a warning.
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,

    /// Emit debug-level logs in addition to info.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Disable ANSI colors in diagnostic output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Correlation ID to attach to emitted lifecycle events. A fresh one is
    /// generated when omitted.
    #[arg(long, global = true)]
    pub correlation_id: Option<String>,

    /// Policy enforcement mode for `plan`/`apply`.
    #[arg(long, global = true, value_enum, default_value_t = PolicyModeArg::Enforce)]
    pub policy: PolicyModeArg,

    /// How long `apply`/`plan` wait on a contended state lock, in seconds.
    #[arg(long, global = true, default_value_t = 10)]
    pub lock_timeout: u64,

    /// Skip runtime server bearer-key authentication (`run`/`dev` only).
    #[arg(long, global = true)]
    pub no_auth: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyModeArg {
    Enforce,
    Warn,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse and validate source files; exits 1 if any diagnostic was raised.
    Validate {
        /// `.ias` source files to validate.
        files: Vec<PathBuf>,
    },

    /// Canonically reformat source files in place.
    Fmt {
        files: Vec<PathBuf>,
        /// Report whether any file would change, without writing; exits 1 on a diff.
        #[arg(long)]
        check: bool,
    },

    /// Compute and print the plan of actions against the current state.
    Plan {
        files: Vec<PathBuf>,
        /// Named deploy target; the sole default/declared target is used otherwise.
        #[arg(long)]
        target: Option<String>,
    },

    /// Apply the computed plan through the resolved deploy target's adapter.
    Apply {
        files: Vec<PathBuf>,
        #[arg(long)]
        target: Option<String>,
    },

    /// Compile a package and start the runtime HTTP server in the foreground.
    Run {
        files: Vec<PathBuf>,
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },

    /// Like `run`, but restarts the server when a source file changes.
    Dev {
        files: Vec<PathBuf>,
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },

    /// Print each tracked resource's recorded status.
    Status {
        #[arg(long)]
        target: Option<String>,
    },

    /// Stream or dump adapter logs for the resolved deploy target.
    Logs {
        #[arg(long)]
        target: Option<String>,
        #[arg(long)]
        follow: bool,
        #[arg(long)]
        tail: Option<usize>,
    },

    /// Tear down every tracked resource through its adapter and clear state.
    Destroy {
        #[arg(long)]
        target: Option<String>,
        /// Skip the confirmation prompt.
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Emit platform-specific artifacts without deploying.
    Export {
        files: Vec<PathBuf>,
        #[arg(long)]
        target: Option<String>,
        #[arg(long, default_value = "./export")]
        out_dir: PathBuf,
    },

    /// Show the plan between two source trees without touching state.
    Diff {
        before: PathBuf,
        after: PathBuf,
    },

    /// Rewrite source files or rename a legacy state file forward.
    Migrate {
        files: Vec<PathBuf>,
        /// Rewrite `.ias` source written against language v1 into v2 syntax.
        #[arg(long)]
        to_v2: bool,
    },

    /// Scaffold a new package in the current (or given) directory.
    Init {
        #[arg(default_value = ".")]
        dir: PathBuf,
        #[arg(long, default_value = "my-package")]
        name: String,
    },

    /// Compile source files to a JSON `Package`, the form `run` consumes.
    Compile {
        files: Vec<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Generate a client SDK from a compiled package. Not implemented.
    Sdk,
    /// Run scenario-based evaluations against a deployed agent. Not implemented.
    Eval,
    /// Package a source tree for distribution. Not implemented.
    Package,
    /// Publish a packaged bundle to a registry. Not implemented.
    Publish,
    /// Install a published package as an import dependency. Not implemented.
    Install,
}
