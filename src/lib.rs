//! Automatic telemetry-transaction instrumentation injector.
//!
//! Given a Rust binary crate's source tree, [`run`] walks its call graph
//! from `main` and from every recognized HTTP-handler entry point,
//! threading a telemetry transaction through the functions that need one,
//! and rewrites recognized `axum`/`reqwest` usage to carry that transaction
//! across process and network boundaries. Nothing is mutated on disk: the
//! result is a unified diff plus the set of external crates the caller
//! still needs to add to `Cargo.toml`. See `SPEC_FULL.md` for the full
//! module-by-module specification this crate implements.

pub mod callgraph;
pub mod config;
pub mod diff;
pub mod edit;
pub mod error;
pub mod http;
pub mod loader;
pub mod oracle;
pub mod state;
pub mod tracing_engine;

mod driver;

pub use config::{InstrumentConfig, PackageSelector};
pub use error::{InstrumentError, Result};

/// What the core hands back per spec.md §6: a unified-diff text stream
/// (one entry per modified file, empty if nothing needed instrumenting)
/// and the set of external module/crate paths the package-manager
/// collaborator still needs to fetch (the telemetry library, chiefly).
///
/// `Serialize` lets the CLI offer a `--json` summary alongside the diff
/// file itself, for callers (editor integrations, CI checks) that want the
/// module list without scraping diff headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct InstrumentResult {
    pub diff: String,
    pub modules_to_add: Vec<String>,
}

/// Runs the full C1-through-C6 pipeline against `config` and returns the
/// resulting diff and module list. Never touches the target source tree;
/// the only filesystem write is the diff file at `config.diff_output_path`,
/// and even that failure is non-fatal (spec.md §7 `sink-failure`).
pub fn run(config: &InstrumentConfig) -> Result<InstrumentResult> {
    driver::run(config)
}
