//! C6's orchestration loop (spec.md §4.6), adapted to this crate's single
//! flat loaded package: there is no `set_current_package` switch to drive
//! (see `state.rs`'s module comment), so the loop collapses to one load,
//! `instrument_main` once, then the fixed per-function rewriter order over
//! every remaining top-level declaration.

use std::fs;

use crate::callgraph::CallGraph;
use crate::config::InstrumentConfig;
use crate::diff;
use crate::error::{InstrumentError, Result};
use crate::loader;
use crate::tracing_engine::Engine;
use crate::InstrumentResult;

pub fn run(config: &InstrumentConfig) -> Result<InstrumentResult> {
    let pkg = loader::load(&config.application_root_path, &config.package_selector)?;
    let graph = CallGraph::build(&pkg);
    graph.verify_entrypoint()?;

    let mut engine = Engine::new(
        &pkg,
        &graph,
        config.agent_variable_name.clone(),
        config.app_name.clone(),
    );
    engine.instrument_main();

    // Snapshot names before looping: instrumenting one function mutates
    // state consulted by the next (e.g. `requires_txn`), but the set of
    // known names itself never changes mid-pass.
    let names: Vec<String> = graph.names_in_source_order().map(str::to_string).collect();
    for name in names {
        let loc = graph
            .location_of(&name)
            .expect("name was just read from this same graph");

        // spec.md §4.6: apply in order on every top-level function.
        // `instrument_main` itself already ran once above; it is a no-op
        // here for any non-`main` name, same as `instrument_handle_function`
        // is a no-op for `main` itself.
        engine.instrument_handle_function(loc);
        engine.instrument_http_client(loc);
        engine.cannot_instrument_http_method(loc);
    }

    let (state, edits) = engine.into_parts();
    let modules_to_add: Vec<String> = state.imports().map(str::to_string).collect();
    let rendered = diff::render_diff(&pkg, edits, &config.application_root_path);

    write_diff(config, &rendered);

    Ok(InstrumentResult { diff: rendered, modules_to_add })
}

/// Per spec.md §7, `sink-failure` is logged, not fatal: rewriting (and the
/// returned diff/module list) is unaffected by the sink collaborator's
/// success or failure.
fn write_diff(config: &InstrumentConfig, rendered: &str) {
    if let Err(source) = fs::write(&config.diff_output_path, rendered) {
        let err = InstrumentError::SinkFailure { path: config.diff_output_path.clone(), source };
        tracing::warn!(%err, "failed to write diff output; rewriting continues");
    }
}
