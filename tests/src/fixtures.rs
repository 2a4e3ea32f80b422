//! # Test Fixtures
//!
//! A fully wired contract over the in-memory adapters, with every engine
//! event also published on a shared bus.

use cg_01_request_lifecycle::{
    invariant_conservation, invariant_contract_solvent, BusEventSink, CallContext,
    GatewayAdminApi, GatewayRequestApi, InMemoryEngine, InMemoryEventLog, InMemoryLedger,
    InMemoryRequestStore, LedgerPorts, LifecycleConfig, LifecycleEngine, LifecycleError,
    ManualClock, RequestStatus, ValueTransfer,
};
use shared_bus::InMemoryEventBus;
use shared_types::{units, Address, Ciphertext, RequestId, Timestamp, U256};
use std::sync::Arc;

/// Contract account.
pub const CONTRACT: Address = [0xCCu8; 20];
/// Contract owner.
pub const OWNER: Address = [0x01u8; 20];
/// Initial gateway identity.
pub const GATEWAY: Address = [0x02u8; 20];
/// First requester.
pub const ALICE: Address = [0xA1u8; 20];
/// Second requester.
pub const BOB: Address = [0xB0u8; 20];
/// Ledger time at construction.
pub const T0: Timestamp = 1_700_000_000;

/// Engine whose events go to an in-memory log and the bus.
pub type BusEngine = InMemoryEngine<BusEventSink<InMemoryEventLog>>;

/// A deployed contract plus handles on every adapter.
pub struct TestContract {
    /// The engine.
    pub engine: Arc<BusEngine>,
    /// Ledger clock.
    pub clock: Arc<ManualClock>,
    /// Balances.
    pub ledger: Arc<InMemoryLedger>,
    /// Authoritative event log.
    pub log: Arc<InMemoryEventLog>,
    /// Bus the log is mirrored to.
    pub bus: Arc<InMemoryEventBus>,
}

impl Default for TestContract {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContract {
    /// Contract with the default configuration; Alice and Bob hold 10 units.
    pub fn new() -> Self {
        Self::with_config(LifecycleConfig::default())
    }

    /// Contract with `config`; Alice and Bob hold 10 units.
    pub fn with_config(config: LifecycleConfig) -> Self {
        let clock = Arc::new(ManualClock::new(T0));
        let ledger = Arc::new(InMemoryLedger::new(CONTRACT));
        let log = Arc::new(InMemoryEventLog::new());
        let bus = Arc::new(InMemoryEventBus::new());

        ledger.credit(ALICE, units(10));
        ledger.credit(BOB, units(10));

        let engine = LifecycleEngine::new(
            OWNER,
            GATEWAY,
            config,
            LedgerPorts {
                store: InMemoryRequestStore::new(),
                clock: clock.clone(),
                ledger: ledger.clone(),
                events: Arc::new(BusEventSink::new(log.clone(), bus.clone())),
            },
        )
        .unwrap_or_else(|e| panic!("fixture config rejected: {e}"));

        Self {
            engine: Arc::new(engine),
            clock,
            ledger,
            log,
            bus,
        }
    }

    /// `who` submits `payload` with `value` escrowed.
    pub fn submit(
        &self,
        who: Address,
        value: U256,
        payload: &[u8],
        timeout: Option<u64>,
    ) -> Result<RequestId, LifecycleError> {
        self.engine.submit(
            CallContext::new(who).with_value(value),
            Ciphertext::from(payload),
            None,
            timeout,
        )
    }

    /// Gateway delivers `result`.
    pub fn callback(&self, id: RequestId, result: &[u8]) -> Result<(), LifecycleError> {
        self.engine
            .callback(CallContext::new(GATEWAY), id, Ciphertext::from(result))
    }

    /// `who` claims a refund.
    pub fn refund(&self, who: Address, id: RequestId) -> Result<U256, LifecycleError> {
        self.engine.request_refund(CallContext::new(who), id)
    }

    /// Current status; panics on an unknown id.
    pub fn status(&self, id: RequestId) -> RequestStatus {
        match self.engine.get_request_status(id) {
            Ok(view) => view.status,
            Err(e) => panic!("request {id}: {e}"),
        }
    }

    /// Sum of every balance the fixture knows about.
    pub fn total_supply(&self, accounts: &[Address]) -> U256 {
        accounts
            .iter()
            .chain(std::iter::once(&CONTRACT))
            .fold(U256::zero(), |acc, a| acc + self.ledger.balance_of(a))
    }

    /// Escrow conservation and contract solvency.
    pub fn assert_conserved(&self) {
        let totals = self.engine.escrow_totals();
        assert!(invariant_conservation(&totals), "conservation: {totals:?}");
        assert!(
            invariant_contract_solvent(&totals, self.ledger.contract_balance()),
            "solvency: {totals:?} vs balance {}",
            self.ledger.contract_balance()
        );
        assert_eq!(
            self.ledger.contract_balance(),
            totals.contract_liability(),
            "contract holds exactly escrow + retained fees"
        );
    }
}
