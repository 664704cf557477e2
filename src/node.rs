//! `MeshNode`: the per-node orchestrator owning every piece of mutable
//! state (neighbor table, replay cache, reassembly pool, DTN queue) as
//! fields rather than process-wide statics, and the three long-lived tasks
//! that drive them.

use crate::config::{MeshConfig, NodeId};
use crate::dispatcher::{self, FrameKind};
use crate::dtn::DtnQueue;
use crate::frag::{self, ReassemblyPool};
use crate::hello;
use crate::identity::{keys_load_or_create, Identity, KeyStore};
use crate::link::LinkDriver;
use crate::neighbor::NeighborTable;
use crate::onion::{self, Peeled};
use crate::replay::ReplayCache;
use crate::routing;
use crate::sink::LocalSink;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// A running mesh node. Generic over its link driver and local sink so
/// tests can wire up in-memory doubles (`LoopbackDriver`, `ChannelSink`)
/// while a real deployment plugs in a radio and a Wi-Fi soft-AP client.
pub struct MeshNode<D: LinkDriver, S: LocalSink> {
    pub config: MeshConfig,
    identity: Arc<Identity>,
    driver: D,
    sink: S,
    neighbors: RwLock<NeighborTable>,
    replay: Mutex<ReplayCache>,
    reassembly: Mutex<ReassemblyPool>,
    dtn: Mutex<DtnQueue>,
    packet_id_ctr: AtomicU8,
}

impl<D: LinkDriver + 'static, S: LocalSink + 'static> MeshNode<D, S> {
    pub fn new(
        config: MeshConfig,
        store: &dyn KeyStore,
        driver: D,
        sink: S,
    ) -> Result<Self, crate::error::MeshError> {
        let identity = keys_load_or_create(store)?;
        Ok(Self {
            neighbors: RwLock::new(NeighborTable::new(config.max_neighbors)),
            replay: Mutex::new(ReplayCache::new(config.replay_cache_size)),
            reassembly: Mutex::new(ReassemblyPool::new(
                config.reassembly_slots,
                config.reassembly_timeout,
            )),
            dtn: Mutex::new(DtnQueue::new(config.dtn_max_items)),
            identity: Arc::new(identity),
            driver,
            sink,
            config,
            packet_id_ctr: AtomicU8::new(0),
        })
    }

    pub fn node_id(&self) -> &NodeId {
        &self.config.node_id
    }

    /// Queue an application payload for delivery to `dest_id`. Returns
    /// `false` if the DTN queue is already at capacity.
    pub async fn enqueue(&self, dest_id: NodeId, payload: Vec<u8>) -> bool {
        self.dtn.lock().await.enqueue(dest_id, payload)
    }

    /// Send a complete (already discriminator-tagged) datagram by
    /// fragmenting it over the link. Aborts on the first frame that fails
    /// to send — partial sends are intentional and unrecovered.
    async fn send_datagram(&self, datagram: &[u8]) -> Result<(), crate::error::MeshError> {
        let packet_id = self.packet_id_ctr.fetch_add(1, Ordering::Relaxed);
        let frames = frag::fragment(packet_id, datagram)
            .ok_or(crate::error::MeshError::TooLarge(datagram.len()))?;
        for frame in frames {
            if !self.driver.send_frame(frame).await {
                warn!(packet_id, "fragment send failed, aborting datagram");
                return Err(crate::error::MeshError::SendFailed);
            }
        }
        Ok(())
    }

    /// Build and originate a beacon at full TTL.
    async fn broadcast_hello(&self) {
        let envelope = hello::build(&self.identity, &self.config.node_id, self.config.hello_ttl);
        let framed = dispatcher::frame(FrameKind::Hello, &envelope);
        debug!(node = %self.config.node_id, "broadcasting HELLO");
        let _ = self.send_datagram(&framed).await;
    }

    /// Handle one inbound HELLO payload (post-discriminator-byte).
    async fn handle_hello(&self, payload: &[u8]) {
        let parsed = match hello::parse_and_verify(payload, &self.config.node_id) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "dropping malformed or self-originated HELLO");
                return;
            }
        };

        let id = match NodeId::new(parsed.data.id.clone()) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "HELLO advertised an invalid node id");
                return;
            }
        };

        {
            let mut neighbors = self.neighbors.write().await;
            neighbors.upsert(id, parsed.x_pub, parsed.e_pub);
        }

        if let Some(rebroadcast_bytes) = hello::rebroadcast(&parsed, &self.identity) {
            let framed = dispatcher::frame(FrameKind::Hello, &rebroadcast_bytes);
            let _ = self.send_datagram(&framed).await;
        }
    }

    /// Handle one inbound onion payload (post-discriminator-byte). Gated on
    /// the replay cache first: a byte-identical onion datagram delivered
    /// twice is dropped here before any AEAD work is spent on it. HELLO
    /// beacons are not run through this check — see `handle_datagram`.
    async fn handle_onion(&self, payload: &[u8]) {
        {
            let mut replay = self.replay.lock().await;
            if replay.check_and_insert(payload) {
                warn!("replayed onion datagram dropped before any cryptographic work");
                return;
            }
        }

        match onion::peel(payload, &self.identity, &self.config.node_id) {
            Some(Peeled::Local(inner)) => {
                if !self.sink.deliver(&inner).await {
                    warn!("local sink rejected delivery");
                }
            }
            Some(Peeled::Forward { next, payload }) => {
                let framed = dispatcher::frame(FrameKind::Onion, &payload);
                if self.send_datagram(&framed).await.is_err() {
                    warn!(%next, "failed to forward onion layer");
                }
            }
            None => {
                // onion::peel already logged the specific reason
            }
        }
    }

    /// Process one fully reassembled inbound datagram: classify, then
    /// dispatch to HELLO or onion handling. The replay cache is consulted
    /// only on the onion path (in `handle_onion`) — periodic HELLO beacons
    /// from the same neighbor are byte-identical (deterministic signature
    /// over unchanged fields) and would otherwise be dropped as replays
    /// after the first one, never refreshing `last_seen`.
    async fn handle_datagram(&self, datagram: Vec<u8>) {
        match dispatcher::classify(&datagram) {
            Some((FrameKind::Hello, payload)) => self.handle_hello(payload).await,
            Some((FrameKind::Onion, payload)) => self.handle_onion(payload).await,
            None => {}
        }
    }

    /// Drain one tick of the DTN queue: inspect the head, route it, and
    /// send regardless of outcome (fire-and-forget).
    async fn drain_dtn_tick(&self) {
        let dest_id = match self.dtn.lock().await.front() {
            Some(item) => item.dest_id.clone(),
            None => return,
        };

        let route = {
            let neighbors = self.neighbors.read().await;
            routing::route_to(&dest_id, &neighbors)
        };

        let Some(route) = route else {
            debug!(%dest_id, "no route yet, leaving dtn item queued");
            return;
        };

        let item = match self.dtn.lock().await.pop_front() {
            Some(item) => item,
            None => return,
        };

        let built = {
            let neighbors = self.neighbors.read().await;
            onion::build(&route, &item.payload, &neighbors, self.config.onion_max_bytes)
        };

        match built {
            Ok(datagram) => {
                let framed = dispatcher::frame(FrameKind::Onion, &datagram);
                if self.send_datagram(&framed).await.is_err() {
                    warn!(%dest_id, "dtn send failed, item discarded (fire-and-forget)");
                } else {
                    info!(%dest_id, "dtn item sent");
                }
            }
            Err(e) => {
                warn!(%dest_id, error = %e, "dtn onion build failed, item discarded");
            }
        }
    }

    /// Spawn the RX, HELLO, and DTN tasks on `rx_frames` (the driver's
    /// inbound frame channel) and return their handles so the caller can
    /// await or abort them.
    pub fn spawn_tasks(
        self: Arc<Self>,
        mut rx_frames: mpsc::Receiver<crate::frag::LinkFrame>,
    ) -> JoinSet<()> {
        let mut tasks = JoinSet::new();

        let node = self.clone();
        tasks.spawn(async move {
            info!(node = %node.config.node_id, "RX task started");
            while let Some(frame) = rx_frames.recv().await {
                let reassembled = {
                    let mut pool = node.reassembly.lock().await;
                    pool.receive(&frame)
                };
                if let Some(datagram) = reassembled {
                    node.handle_datagram(datagram).await;
                }
            }
            info!(node = %node.config.node_id, "RX task exiting (frame channel closed)");
        });

        let node = self.clone();
        tasks.spawn(async move {
            info!(node = %node.config.node_id, "HELLO task started");
            let mut ticker = tokio::time::interval(node.config.hello_interval);
            loop {
                ticker.tick().await;
                node.broadcast_hello().await;
            }
        });

        let node = self.clone();
        tasks.spawn(async move {
            info!(node = %node.config.node_id, "DTN task started");
            let mut ticker = tokio::time::interval(node.config.dtn_drain_interval);
            loop {
                ticker.tick().await;
                node.drain_dtn_tick().await;
            }
        });

        tasks
    }

    /// Number of entries currently in the neighbor table. Mostly useful
    /// for tests and diagnostics.
    pub async fn neighbor_count(&self) -> usize {
        self.neighbors.read().await.len()
    }
}
