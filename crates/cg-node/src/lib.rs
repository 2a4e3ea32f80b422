//! # Cipher-Gateway Node
//!
//! Wires one contract deployment and its gateway into a single process.
//!
//! ## Wiring
//!
//! ```text
//! requesters ──submit/refund──→ LifecycleEngine ──events──→ InMemoryEventLog
//!                                   ↑                         │ (mirror)
//!                                   │                         ↓
//!                   callback/report │                  InMemoryEventBus
//!                                   │                         │ Submissions
//!                                   └──── GatewayWorker ←─────┘
//!                                              │
//!                                              ↓
//!                                   ComputeOverCiphertext
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load [`NodeConfig`] from the environment
//! 2. Install telemetry
//! 3. Build the engine over the in-memory adapters
//! 4. Spawn the gateway worker
//! 5. Run until Ctrl+C, then stop the worker and log its totals

#![warn(missing_docs)]

pub mod config;

pub use config::{parse_address, NodeConfig, NodeConfigError};

use cg_01_request_lifecycle::{
    BusEventSink, InMemoryEventLog, InMemoryLedger, InMemoryRequestStore, LedgerPorts,
    LifecycleEngine, LifecycleError, SystemClock,
};
use cg_02_compute_gateway::{ComputeOverCiphertext, GatewayWorker, WorkerStats};
use shared_bus::{EventFilter, EventTopic, InMemoryEventBus};
use shared_types::short_addr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Engine as deployed by the node: wall clock, events mirrored to the bus.
pub type NodeEngine = LifecycleEngine<
    InMemoryRequestStore,
    SystemClock,
    InMemoryLedger,
    BusEventSink<InMemoryEventLog>,
>;

/// A running contract deployment with its gateway worker.
pub struct GatewayNode {
    engine: Arc<NodeEngine>,
    ledger: Arc<InMemoryLedger>,
    log: Arc<InMemoryEventLog>,
    bus: Arc<InMemoryEventBus>,
    shutdown_tx: watch::Sender<bool>,
    worker: Option<JoinHandle<WorkerStats>>,
}

impl GatewayNode {
    /// Build the deployment and spawn the worker for `config.gateway`.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start(
        config: NodeConfig,
        program: Arc<dyn ComputeOverCiphertext>,
    ) -> Result<Self, LifecycleError> {
        let ledger = Arc::new(InMemoryLedger::new(config.contract));
        let log = Arc::new(InMemoryEventLog::new());
        let bus = Arc::new(InMemoryEventBus::new());

        let engine = Arc::new(LifecycleEngine::new(
            config.owner,
            config.gateway,
            config.lifecycle,
            LedgerPorts {
                store: InMemoryRequestStore::new(),
                clock: Arc::new(SystemClock),
                ledger: ledger.clone(),
                events: Arc::new(BusEventSink::new(log.clone(), bus.clone())),
            },
        )?);

        let worker = GatewayWorker::new(
            config.gateway,
            engine.clone(),
            program,
            bus.subscribe(EventFilter::topics(vec![EventTopic::Submissions])),
            config.worker,
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(worker.run(shutdown_rx));

        info!(
            contract = %short_addr(&config.contract),
            gateway = %short_addr(&config.gateway),
            "Gateway node started"
        );

        Ok(Self {
            engine,
            ledger,
            log,
            bus,
            shutdown_tx,
            worker: Some(handle),
        })
    }

    /// The deployed engine.
    pub fn engine(&self) -> &Arc<NodeEngine> {
        &self.engine
    }

    /// Native-value balances.
    pub fn ledger(&self) -> &Arc<InMemoryLedger> {
        &self.ledger
    }

    /// Committed event log.
    pub fn log(&self) -> &Arc<InMemoryEventLog> {
        &self.log
    }

    /// Bus the log is mirrored to.
    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    /// Stop the worker and return what it processed.
    pub async fn shutdown(mut self) -> WorkerStats {
        info!("Shutting down gateway node");
        let _ = self.shutdown_tx.send(true);

        let stats = match self.worker.take() {
            Some(handle) => match handle.await {
                Ok(stats) => stats,
                Err(e) => {
                    warn!(error = %e, "Gateway worker task ended abnormally");
                    WorkerStats::default()
                }
            },
            None => WorkerStats::default(),
        };

        info!(
            processed = stats.processed,
            completed = stats.completed,
            failed = stats.failed,
            timed_out = stats.timed_out,
            rejected = stats.rejected,
            "Gateway node stopped"
        );
        stats
    }
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
