//! `meshcored` — runs a single mesh node.
//!
//! No concrete radio driver is implemented; this
//! binary attaches the node to an in-memory [`LoopbackFabric`] so it can be
//! exercised end-to-end on a workstation. A real deployment swaps
//! `LoopbackDriver` for a driver over the actual radio hardware.

use clap::Parser;
use meshcore::{ChannelSink, LoopbackFabric, MeshConfig, MeshNode, NodeId, SledKeyStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "meshcored", version, about = "Mesh routing and crypto core node")]
struct Args {
    /// This node's stable textual identifier (<=31 ASCII bytes)
    #[arg(short = 'i', long)]
    node_id: String,

    /// Data directory for persisted identity keys
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("meshcore=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    let node_id = match NodeId::new(args.node_id.clone()) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("invalid --node-id {:?}: {e}", args.node_id);
            std::process::exit(1);
        }
    };

    info!("════════════════════════════════════════════════════════════");
    info!("  meshcored starting — node id {node_id}");
    info!("════════════════════════════════════════════════════════════");

    let store = match SledKeyStore::open(&args.data_dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("failed to open identity store at {}: {e}", args.data_dir.display());
            std::process::exit(1);
        }
    };

    let config = MeshConfig::new(node_id.clone(), &args.data_dir);

    let fabric = LoopbackFabric::new();
    let (driver, rx_frames) = fabric.join().await;
    let (sink, mut deliveries) = ChannelSink::new(32);

    let node = match MeshNode::new(config, &store, driver, sink) {
        Ok(node) => Arc::new(node),
        Err(e) => {
            eprintln!("failed to construct node: {e}");
            std::process::exit(1);
        }
    };

    info!("node running (no peers configured — attach more nodes to the same fabric to mesh)");

    let mut tasks = node.clone().spawn_tasks(rx_frames);

    tokio::spawn(async move {
        while let Some(payload) = deliveries.recv().await {
            info!(bytes = payload.len(), "locally delivered payload");
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
        _ = tasks.join_next() => {
            info!("a core task exited unexpectedly");
        }
    }

    tasks.abort_all();
}
