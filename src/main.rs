/// Ignis Blueprint: visual scripting graph engine
///
/// Command-line runner. Loads a serialized graph, adopts it into a store backed
/// by the built-in node library, and runs every Event node's first exec output.
/// Results are printed to stdout as JSON.

use anyhow::{anyhow, Context, Result};
use ignis_blueprint::{
    config::{init_tracing, Config},
    graph::{Graph, GraphStore},
    registry::NodeRegistry,
    runtime::{analysis, Interpreter},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Application entry point
///
/// Usage: `ignis-blueprint <graph.json>`
#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::default();
    init_tracing(&config.logging);

    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow!("usage: ignis-blueprint <graph.json>"))?;

    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
    let graph: Graph =
        serde_json::from_str(&raw).with_context(|| format!("parsing graph from {}", path))?;

    let (registry, print_log) = NodeRegistry::with_builtins().context("registering built-in nodes")?;
    let store = Arc::new(GraphStore::new(Arc::new(registry), &config.engine));
    let graph_id = store.import_graph(graph).context("importing graph")?;

    if let Some(snapshot) = store.get_graph(&graph_id) {
        for cycle in analysis::exec_cycles(&snapshot) {
            tracing::warn!("🔁 Exec loop through {:?}; runs will stop at the step bound", cycle);
        }
        for cycle in analysis::data_cycles(&snapshot) {
            tracing::warn!("🔁 Data cycle through {:?}", cycle);
        }
    }

    let interpreter = Interpreter::new(store, &config.engine);
    let cancel = CancellationToken::new();

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("🛑 Interrupt received, cancelling");
            ctrl_c.cancel();
        }
    });

    let results = interpreter.execute_entry_points(&graph_id, cancel).await;
    let failed = results.iter().filter(|r| !r.success).count();

    let report = serde_json::json!({
        "graphId": graph_id,
        "results": results,
        "printed": print_log.lines(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if failed > 0 {
        return Err(anyhow!("{} of {} entry point(s) failed", failed, results.len()));
    }
    Ok(())
}
