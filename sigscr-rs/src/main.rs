use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use sigscr::cli::Cli;
use sigscr::config::{self, Config};
use sigscr::diag::DiagnosticKind;
use sigscr::loader::ScriptRegistry;
use sigscr::script::catalog::{ExternalVar, Namespace};
use sigscr::script::Listing;
use sigscr::signal::{update_signal, Update};

#[derive(Debug, Error)]
enum AppError {
    #[error("cannot read config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} script file(s) could not be read")]
    Unreadable(usize),
    #[error("unknown signal type `{0}`")]
    UnknownType(String),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sigscr: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, AppError> {
    let Some(path) = cli.config.clone().or_else(config::find_config) else {
        tracing::debug!("no signal configuration file found");
        return Ok(Config::new());
    };
    let (cfg, errors) = Config::load_file(&path).map_err(|source| AppError::Config { path: path.clone(), source })?;
    for err in &errors {
        eprintln!("{}: {err}", path.display());
    }
    tracing::debug!(path = %path.display(), types = cfg.signal_types.len(), files = cfg.script_files.len(), "config loaded");
    Ok(cfg)
}

fn run(cli: &Cli) -> Result<(), AppError> {
    let mut cfg = load_config(cli)?;
    cfg.signal_types.extend(cli.signal_types.iter().cloned());
    cfg.script_files.extend(cli.files.iter().cloned());
    if let Some(dir) = &cli.route_dir {
        cfg.route_dir = Some(dir.clone());
    }

    let catalog = cfg.catalog();
    if catalog.is_empty() && !cfg.script_files.is_empty() {
        tracing::warn!("no signal types configured; every script will be rejected");
    }

    let route_dir: &Path = cfg.route_dir();
    let (registry, diags) = ScriptRegistry::load(route_dir, &cfg.script_files, &catalog);

    for d in &diags {
        eprintln!("{d}");
    }
    println!(
        "{} script(s) compiled for {} signal type(s), {} diagnostic(s)",
        registry.len(),
        catalog.len(),
        diags.len()
    );

    if cli.dump {
        for script in registry.iter() {
            print!("{}", Listing(script));
        }
    }

    let unreadable = diags.iter().filter(|d| d.kind == DiagnosticKind::Io).count();
    if unreadable > 0 {
        return Err(AppError::Unreadable(unreadable));
    }

    if let Some(signal_type) = &cli.eval {
        let Some(name) = catalog.resolve(signal_type) else {
            return Err(AppError::UnknownType(signal_type.clone()));
        };
        let mut sig = cli.bindings.signal();
        let how = match update_signal(&registry, name, &mut sig) {
            Update::Script(_) => "script",
            Update::Fallback => "fallback",
        };
        let aspect = Namespace::Aspect
            .member_name(sig.state)
            .map(|m| format!("{}{m}", Namespace::Aspect.prefix()))
            .unwrap_or_else(|| sig.state.to_string());
        println!("{name} ({how}):");
        println!("  {} = {aspect}", ExternalVar::State.name());
        println!("  {} = {}", ExternalVar::DrawState.name(), sig.draw_state);
    }

    Ok(())
}
