//! CLI argument parsing via `clap`.

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "prelint",
    version,
    about = "Pre-build cache and lint checks for CI",
    long_about = "prelint — run exactly one pre-build check: probe caches, run the pinned linter, or verify that generated files and dependency manifests match what is committed.\n\nConfiguration precedence: CLI > environment > prelint.toml > defaults.",
    after_help = "Examples:\n  prelint probe --output json\n  prelint lint\n  prelint check-generated --timeout 300\n  prelint check-deps -v",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[arg(long, global = true, help = "Repository root (default: current dir)")]
    pub repo_root: Option<String>,
    #[arg(long, global = true, help = "Output mode: human|json (default: human)")]
    pub output: Option<String>,
    #[arg(
        long,
        global = true,
        value_name = "SECS",
        help = "Deadline for each driven tool in seconds; 0 disables (default: 600)"
    )]
    pub timeout: Option<u64>,
    #[arg(short, long, global = true, action = ArgAction::Count, help = "Increase log verbosity (-v info, -vv debug, -vvv trace)")]
    pub verbose: u8,
    #[arg(short, long, global = true, action = ArgAction::SetTrue, help = "Only log errors")]
    pub quiet: bool,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// The checks. Each run executes exactly one.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current prelint version.")]
    Version,
    /// Probe declared caches for their marker files
    #[command(
        about = "Probe build caches (read-only)",
        long_about = "Resolve each declared cache root and report whether its marker file exists. Never writes; unresolvable roots are reported as not found.",
        after_help = "Examples:\n  prelint probe\n  prelint probe --require --output json"
    )]
    Probe {
        #[arg(long, action = ArgAction::SetTrue, help = "Exit non-zero when any marker is missing")]
        require: bool,
    },
    /// Run the pinned linter
    #[command(
        about = "Run the pinned linter",
        long_about = "Locate the linter in the local tool cache for this OS/arch (falling back to PATH) and run it with the arguments pinned in prelint.toml. The linter's exit status becomes prelint's.",
        after_help = "Examples:\n  prelint lint\n  prelint lint --print-path"
    )]
    Lint {
        #[arg(long, action = ArgAction::SetTrue, help = "Print the resolved linter path and exit")]
        print_path: bool,
    },
    /// Verify generated files are up to date
    #[command(
        about = "Fail if regeneration changes tracked files",
        long_about = "Run [generate].command, then compare tracked files under [generate].paths against their state before generation."
    )]
    CheckGenerated,
    /// Verify dependency manifests are tidy
    #[command(
        about = "Fail if the tidy step changes manifests",
        long_about = "Run [deps].command, then compare the tracked [deps].manifests against their state before the run."
    )]
    CheckDeps,
}
