//! Identity keypair generation tool for out-of-band node provisioning.
//!
//! Generates a node's long-term X25519 and Ed25519 key pairs and persists
//! them into a `SledKeyStore` at the given data directory, exactly as a
//! node's first boot would — useful for pre-provisioning nodes or
//! inspecting the public keys to hand out for a trusted first beacon.
//!
//! Usage:
//!   cargo run --bin keygen -- --data-dir ./data/node-a

use clap::Parser;
use meshcore::identity::{keys_load_or_create, SledKeyStore};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "keygen", version, about = "Mesh node identity key generator")]
struct Args {
    /// Data directory to hold the node's identity store
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    println!("════════════════════════════════════════════════════════════");
    println!("  Mesh node identity keypair generator");
    println!("════════════════════════════════════════════════════════════");
    println!();
    println!("Data directory: {}", args.data_dir.display());
    println!();

    let store = match SledKeyStore::open(&args.data_dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("failed to open identity store: {e}");
            std::process::exit(1);
        }
    };

    let identity = match keys_load_or_create(&store) {
        Ok(identity) => identity,
        Err(e) => {
            eprintln!("failed to load or create identity: {e}");
            std::process::exit(1);
        }
    };

    println!("x_pub (X25519, for ECDH):     {}", hex::encode(identity.x_pub.as_bytes()));
    println!("e_pub (Ed25519, for HELLO):   {}", hex::encode(identity.e_pub.as_bytes()));
    println!();
    println!("Hand these public keys out to peers that should trust this");
    println!("node's first HELLO beacon on sight (trust-on-first-use).");
}
