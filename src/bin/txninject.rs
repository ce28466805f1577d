//! CLI entry point. Gathers spec.md §6's five inputs and hands them to the
//! core; no interactive prompts, no package-manager invocation, both are
//! named out of scope (spec.md §1) and left to whatever wraps this binary.

use std::path::PathBuf;

use clap::Parser;

use txninject::{InstrumentConfig, PackageSelector};

/// Automatic telemetry-transaction instrumentation injector.
#[derive(Debug, Parser)]
#[command(name = "txninject", version, about)]
struct Cli {
    /// Directory containing the target source tree.
    #[arg(long, default_value = ".")]
    application_root_path: PathBuf,

    /// `.` for the crate root, `...` (or `./...`) to recurse through every
    /// `mod` reachable from the entry points, or a concrete relative path
    /// to one file.
    #[arg(long, default_value = ".")]
    package_selector: String,

    /// Free-form application name passed to `ConfigAppName`; empty omits it.
    #[arg(long, default_value = "")]
    app_name: String,

    /// Identifier used for the application handle in emitted code.
    #[arg(long, default_value = "NewRelicAgent")]
    agent_variable_name: String,

    /// Destination path for the unified-diff file.
    #[arg(long, default_value = "txninject.patch")]
    diff_output_path: PathBuf,

    /// Print the diff and module list as JSON to stdout instead of the
    /// human-readable log lines (for editor/CI integrations).
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let package_selector: PackageSelector = cli
        .package_selector
        .parse()
        .expect("PackageSelector::from_str is infallible");

    let mut config = InstrumentConfig::new(cli.application_root_path, cli.diff_output_path);
    config.package_selector = package_selector;
    config.app_name = cli.app_name;
    config.agent_variable_name = cli.agent_variable_name;

    let json = cli.json;
    let result = txninject::run(&config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.diff.is_empty() {
        tracing::info!("no instrumentation sites found; nothing to do");
    } else {
        tracing::info!(path = %config.diff_output_path.display(), "wrote instrumentation diff");
    }
    if !result.modules_to_add.is_empty() {
        tracing::info!(modules = ?result.modules_to_add, "external crates required");
    }

    Ok(())
}
