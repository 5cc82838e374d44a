//! Prelint CLI binary entry point.
//! Resolves configuration, runs exactly one check, and exits with its code.

use clap::Parser;
use prelint::cli::{Cli, Commands};
use prelint::error::{CheckError, Result};
use prelint::runner::RunnerIdentity;
use prelint::{config, deps, drift, generated, lint, logging, output, probe, utils};
use prelint::process::Stdout;
use tracing::debug;

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(()) => 0,
        Err(e) => {
            debug!(error = ?e, code = e.exit_code(), "check failed");
            eprintln!("{} {}", utils::error_prefix(), e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Version = cli.cmd {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let eff = match config::resolve_effective(
        cli.repo_root.as_deref(),
        cli.output.as_deref(),
        cli.timeout,
    ) {
        Ok(eff) => eff,
        Err(e) => {
            logging::init(logging::level_for(cli.verbose, cli.quiet, None));
            return Err(e);
        }
    };
    logging::init(logging::level_for(
        cli.verbose,
        cli.quiet,
        eff.log_level.as_deref(),
    ));
    // Friendly note if no prelint config was found
    if eff.config_file.is_none() && eff.output != "json" && !cli.quiet {
        eprintln!(
            "{} No prelint.toml found in {}; using defaults.",
            utils::note_prefix(),
            eff.repo_root.display()
        );
    }
    let runner = RunnerIdentity::detect();
    runner.log();

    match cli.cmd {
        Commands::Version => Ok(()),
        Commands::Probe { require } => {
            let results = probe::run_probe(&eff.repo_root, &eff.caches, eff.preview_bytes);
            output::print_probe(&results, &runner, &eff.output);
            let missing: Vec<String> = results
                .iter()
                .filter(|r| !r.found)
                .map(|r| r.tool.clone())
                .collect();
            if require && !missing.is_empty() {
                return Err(CheckError::MissingMarkers { missing });
            }
            Ok(())
        }
        Commands::Lint { print_path } => {
            if print_path {
                let (path, _) = lint::resolve_linter(&eff.lint_binary, &eff.lint_cache_dir)?;
                println!("{}", path.display());
                return Ok(());
            }
            let inv = lint::run_lint(
                &eff.repo_root,
                &eff.lint_binary,
                &eff.lint_cache_dir,
                &eff.lint_args,
                eff.timeout,
                Stdout::for_output(&eff.output),
            )?;
            output::print_lint(&inv, &eff.repo_root, &eff.output);
            lint::outcome(&inv)
        }
        Commands::CheckGenerated => {
            let report = generated::run_check(&eff)?;
            output::print_drift(generated::CHECK, &report, &eff.output);
            drift::enforce(generated::CHECK, generated::REMEDY, &report)
        }
        Commands::CheckDeps => {
            let report = deps::run_check(&eff)?;
            output::print_drift(deps::CHECK, &report, &eff.output);
            drift::enforce(deps::CHECK, deps::REMEDY, &report)
        }
    }
}
