//! # Lifecycle Engine
//!
//! The request state machine wired to the outbound ledger ports.
//!
//! ## Transactions
//!
//! Every public call runs under one re-entrant executor lock, so calls are
//! totally ordered and each one either commits fully or fails with no
//! effect. A value transfer may run recipient code that calls back into the
//! engine on the same thread; that nested call re-acquires the lock and sees
//! the already-staged state.
//!
//! ## Checks-Effects-Interactions
//!
//! Refunds and fee withdrawals stage the state change first, then move
//! value inside a payout frame. Nested calls made by the recipient commit
//! into the frame rather than the event log, so the outer call is their
//! unit of work: if the payment fails, the store savepoint, the totals and
//! the frame's events are all rolled back together.

use crate::adapters::{InMemoryEventLog, InMemoryLedger, InMemoryRequestStore};
use crate::domain::{
    invariant_conservation, AccessPolicy, CallContext, EscrowTotals, LifecycleConfig,
    LifecycleError, NewRequest, Operation, Request, RequestStatus, RequestStatusView,
};
use crate::ports::inbound::{GatewayAdminApi, GatewayRequestApi};
use crate::ports::outbound::{EventSink, LedgerClock, ManualClock, RequestStore, ValueTransfer};
use gateway_telemetry::metrics;
use parking_lot::ReentrantMutex;
use shared_types::{
    short_addr, Address, Ciphertext, LedgerEvent, RequestId, Timestamp, U256, ZERO_ADDRESS,
};
use std::cell::RefCell;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// The outbound ports an engine is built from.
pub struct LedgerPorts<S, C, V, E> {
    /// Request records.
    pub store: S,
    /// Block clock.
    pub clock: Arc<C>,
    /// Value transfer.
    pub ledger: Arc<V>,
    /// Event log.
    pub events: Arc<E>,
}

/// Engine over the in-memory adapters.
pub type InMemoryEngine<E = InMemoryEventLog> =
    LifecycleEngine<InMemoryRequestStore, ManualClock, InMemoryLedger, E>;

/// Mutable contract state, guarded by the executor lock.
struct EngineState<S> {
    store: S,
    access: AccessPolicy,
    default_timeout: u64,
    totals: EscrowTotals,
    /// Events of nested calls, one frame per payout in flight.
    frames: Vec<Vec<LedgerEvent>>,
}

/// Non-store state captured when a payout frame opens.
struct Checkpoint {
    access: AccessPolicy,
    default_timeout: u64,
    totals: EscrowTotals,
}

type Committed<R> = Result<(R, Vec<LedgerEvent>), LifecycleError>;

/// The Lifecycle Engine.
pub struct LifecycleEngine<S, C, V, E> {
    config: LifecycleConfig,
    state: ReentrantMutex<RefCell<EngineState<S>>>,
    clock: Arc<C>,
    ledger: Arc<V>,
    events: Arc<E>,
}

impl<S, C, V, E> LifecycleEngine<S, C, V, E>
where
    S: RequestStore,
    C: LedgerClock,
    V: ValueTransfer,
    E: EventSink,
{
    /// Create an engine owned by `owner` with `gateway` as the trusted
    /// gateway identity.
    pub fn new(
        owner: Address,
        gateway: Address,
        config: LifecycleConfig,
        ports: LedgerPorts<S, C, V, E>,
    ) -> Result<Self, LifecycleError> {
        config
            .validate()
            .map_err(|e| LifecycleError::InvalidInput(e.to_string()))?;
        let access = AccessPolicy::new(owner, gateway)?;

        info!(
            owner = %short_addr(&owner),
            gateway = %short_addr(&gateway),
            default_timeout = config.default_timeout_secs,
            "[cg-01] Lifecycle engine created"
        );

        Ok(Self {
            state: ReentrantMutex::new(RefCell::new(EngineState {
                store: ports.store,
                access,
                default_timeout: config.default_timeout_secs,
                totals: EscrowTotals::default(),
                frames: Vec::new(),
            })),
            config,
            clock: ports.clock,
            ledger: ports.ledger,
            events: ports.events,
        })
    }

    /// Engine configuration.
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// The event log the engine appends to.
    pub fn event_sink(&self) -> &Arc<E> {
        &self.events
    }

    // =========================================================================
    // TRANSACTION EXECUTOR
    // =========================================================================

    /// Run one atomic call and commit its events on success.
    fn transact<R>(
        &self,
        operation: Operation,
        ctx: &CallContext,
        body: impl FnOnce(&RefCell<EngineState<S>>, Timestamp) -> Committed<R>,
    ) -> Result<R, LifecycleError> {
        let guard = self.state.lock();
        let now = self.clock.now();

        let outcome = if operation.is_payable() || ctx.value.is_zero() {
            body(&*guard, now)
        } else {
            Err(LifecycleError::invalid_input(format!(
                "{operation} does not accept value"
            )))
        };

        match outcome {
            Ok((value, events)) => {
                self.commit(&*guard, now, events);
                Ok(value)
            }
            Err(err) => {
                Self::reject(operation, ctx, &err);
                Err(err)
            }
        }
    }

    fn commit(&self, state: &RefCell<EngineState<S>>, now: Timestamp, events: Vec<LedgerEvent>) {
        let totals = {
            let mut st = state.borrow_mut();
            debug_assert!(invariant_conservation(&st.totals));
            if let Some(frame) = st.frames.last_mut() {
                // Nested inside a payout: lands with the outer call.
                frame.extend(events);
                return;
            }
            st.totals
        };
        metrics::ESCROW_HELD.set(gauge_value(totals.escrow_held));

        for event in &events {
            observe_committed(event);
        }
        self.events.append(now, events);
    }

    fn reject(operation: Operation, ctx: &CallContext, err: &LifecycleError) {
        let kind = err.kind();
        metrics::REJECTIONS.with_label_values(&[kind.as_str()]).inc();
        match err {
            LifecycleError::TransferFailed(_) | LifecycleError::Store(_) => warn!(
                operation = %operation,
                caller = %short_addr(&ctx.caller),
                kind = kind.as_str(),
                "[cg-01] Call rolled back: {}", err
            ),
            _ => debug!(
                operation = %operation,
                caller = %short_addr(&ctx.caller),
                kind = kind.as_str(),
                "[cg-01] Call rejected: {}", err
            ),
        }
    }

    /// Read-only access under the executor lock.
    fn read<R>(&self, f: impl FnOnce(&EngineState<S>) -> R) -> R {
        let guard = self.state.lock();
        let state = guard.borrow();
        f(&state)
    }

    // =========================================================================
    // VALUE MOVEMENT
    // =========================================================================

    fn pull(&self, from: &Address, amount: U256) -> Result<(), LifecycleError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.ledger
            .receive(from, amount)
            .map_err(|e| LifecycleError::TransferFailed(e.to_string()))
    }

    fn pay(&self, to: &Address, amount: U256) -> Result<(), LifecycleError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.ledger
            .send(to, amount)
            .map_err(|e| LifecycleError::TransferFailed(e.to_string()))
    }

    /// Apply `stage`, then pay `to` with no borrow held.
    ///
    /// Returns the events of calls the recipient made while being paid. On
    /// failure everything since the frame opened is undone, nested calls
    /// included.
    fn payout(
        &self,
        state: &RefCell<EngineState<S>>,
        to: &Address,
        amount: U256,
        stage: impl FnOnce(&mut EngineState<S>) -> Result<(), LifecycleError>,
    ) -> Result<Vec<LedgerEvent>, LifecycleError> {
        let checkpoint = state.borrow_mut().open_frame();
        let staged = stage(&mut *state.borrow_mut());
        let paid = staged.and_then(|()| self.pay(to, amount));

        let mut st = state.borrow_mut();
        match paid {
            Ok(()) => Ok(st.close_frame()),
            Err(err) => {
                st.abort_frame(checkpoint);
                Err(err)
            }
        }
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    fn validate_submission(
        &self,
        ctx: &CallContext,
        payload: &Ciphertext,
        gas_budget: Option<u64>,
        duration: u64,
    ) -> Result<(), LifecycleError> {
        if payload.is_empty() {
            return Err(LifecycleError::invalid_input("payload is empty"));
        }
        if payload.len() > self.config.max_payload_bytes {
            return Err(LifecycleError::invalid_input(format!(
                "payload of {} bytes exceeds limit of {}",
                payload.len(),
                self.config.max_payload_bytes
            )));
        }
        if gas_budget == Some(0) {
            return Err(LifecycleError::invalid_input("declared gas budget is zero"));
        }
        self.config
            .check_timeout(duration)
            .map_err(LifecycleError::InvalidInput)?;
        if ctx.value < self.config.min_escrow {
            return Err(LifecycleError::invalid_input(format!(
                "escrow {} below minimum {}",
                ctx.value, self.config.min_escrow
            )));
        }
        Ok(())
    }

    // =========================================================================
    // REFUND PATH
    // =========================================================================

    /// Stage `Refunded`, pay the requester, roll back if the payment fails.
    fn refund(
        &self,
        state: &RefCell<EngineState<S>>,
        now: Timestamp,
        request: Request,
        operation: Operation,
        forced: bool,
    ) -> Committed<U256> {
        if !request.is_refundable(now) {
            return Err(request.invalid_state(operation));
        }
        let id = request.id;
        let requester = request.requester;
        let amount = request.escrowed_value;

        let mut events = self.payout(state, &requester, amount, |st| {
            st.store.set_status(id, RequestStatus::Refunded, operation, now)?;
            st.totals.record_refund(amount);
            Ok(())
        })?;

        info!(
            request_id = id,
            requester = %short_addr(&requester),
            %amount,
            forced,
            "[cg-01] Request {} refunded", id
        );

        events.push(LedgerEvent::RefundProcessed {
            id,
            requester,
            amount,
            forced,
        });
        Ok((amount, events))
    }
}

impl<S: RequestStore> EngineState<S> {
    /// Load a request the gateway is about to move to `next`.
    fn open_request(
        &self,
        ctx: &CallContext,
        id: RequestId,
        next: RequestStatus,
        operation: Operation,
    ) -> Result<Request, LifecycleError> {
        self.access.ensure_gateway(&ctx.caller)?;
        let request = self.store.get(id)?;
        if !request.status.can_transition_to(next) {
            return Err(request.invalid_state(operation));
        }
        Ok(request)
    }

    /// Apply a multi-step store mutation, undoing every step if one fails.
    fn stage<R>(
        &mut self,
        apply: impl FnOnce(&mut S) -> Result<R, LifecycleError>,
    ) -> Result<R, LifecycleError> {
        self.store.begin_savepoint();
        match apply(&mut self.store) {
            Ok(value) => {
                self.store.release_savepoint();
                Ok(value)
            }
            Err(err) => {
                self.rollback_store();
                Err(err)
            }
        }
    }

    fn open_frame(&mut self) -> Checkpoint {
        self.store.begin_savepoint();
        self.frames.push(Vec::new());
        Checkpoint {
            access: self.access,
            default_timeout: self.default_timeout,
            totals: self.totals,
        }
    }

    fn close_frame(&mut self) -> Vec<LedgerEvent> {
        self.store.release_savepoint();
        self.frames.pop().unwrap_or_default()
    }

    fn abort_frame(&mut self, checkpoint: Checkpoint) {
        if let Some(discarded) = self.frames.pop() {
            if !discarded.is_empty() {
                debug!(
                    discarded = discarded.len(),
                    "[cg-01] Discarding events of nested calls"
                );
            }
        }
        self.rollback_store();
        self.access = checkpoint.access;
        self.default_timeout = checkpoint.default_timeout;
        self.totals = checkpoint.totals;
    }

    /// Roll back the latest savepoint. A failure here is logged so the
    /// caller can still report the error that caused the rollback.
    fn rollback_store(&mut self) {
        if let Err(err) = self.store.rollback_savepoint() {
            error!("[cg-01] Request store rollback failed: {}", err);
        }
    }
}

// =============================================================================
// CLIENT & GATEWAY API
// =============================================================================

impl<S, C, V, E> GatewayRequestApi for LifecycleEngine<S, C, V, E>
where
    S: RequestStore,
    C: LedgerClock,
    V: ValueTransfer,
    E: EventSink,
{
    #[instrument(name = "submit", skip_all, fields(caller = %short_addr(&ctx.caller)))]
    fn submit(
        &self,
        ctx: CallContext,
        payload: Ciphertext,
        gas_budget: Option<u64>,
        timeout: Option<u64>,
    ) -> Result<RequestId, LifecycleError> {
        self.transact(Operation::Submit, &ctx, |state, now| {
            let duration = timeout.unwrap_or_else(|| state.borrow().default_timeout);
            self.validate_submission(&ctx, &payload, gas_budget, duration)?;

            let params = NewRequest {
                requester: ctx.caller,
                payload: payload.clone(),
                escrowed_value: ctx.value,
                submit_time: now,
                timeout_duration: duration,
                gas_budget,
            };
            let timeout_time = params.timeout_time()?;

            // A failed receive frees the id again. `receive` runs no
            // recipient code, so the borrow can stay held across it.
            let id = {
                let mut st = state.borrow_mut();
                let id = st.stage(|store| {
                    let id = store.create(params)?;
                    self.pull(&ctx.caller, ctx.value)?;
                    Ok(id)
                })?;
                st.totals.record_submit(ctx.value);
                id
            };

            info!(
                request_id = id,
                requester = %short_addr(&ctx.caller),
                escrow = %ctx.value,
                payload_len = payload.len(),
                timeout_time,
                "[cg-01] Request {} submitted", id
            );

            Ok((
                id,
                vec![LedgerEvent::RequestSubmitted {
                    id,
                    requester: ctx.caller,
                    escrowed_value: ctx.value,
                    timeout_time,
                    gas_budget,
                    payload,
                }],
            ))
        })
    }

    #[instrument(name = "acknowledge", skip_all, fields(request_id = id))]
    fn acknowledge(&self, ctx: CallContext, id: RequestId) -> Result<(), LifecycleError> {
        self.transact(Operation::Acknowledge, &ctx, |state, now| {
            let mut st = state.borrow_mut();
            st.open_request(&ctx, id, RequestStatus::Processing, Operation::Acknowledge)?;
            st.store
                .set_status(id, RequestStatus::Processing, Operation::Acknowledge, now)?;

            debug!(request_id = id, "[cg-01] Request {} acknowledged", id);
            Ok(((), vec![LedgerEvent::RequestAcknowledged { id }]))
        })
    }

    #[instrument(name = "callback", skip_all, fields(request_id = id, result_len = result.len()))]
    fn callback(
        &self,
        ctx: CallContext,
        id: RequestId,
        result: Ciphertext,
    ) -> Result<(), LifecycleError> {
        self.transact(Operation::Callback, &ctx, |state, now| {
            let mut guard = state.borrow_mut();
            let st = &mut *guard;

            st.access.ensure_gateway(&ctx.caller)?;
            let request = st.store.get(id)?;
            if result.is_empty() {
                return Err(LifecycleError::invalid_input("result is empty"));
            }
            if result.len() > self.config.max_payload_bytes {
                return Err(LifecycleError::invalid_input(format!(
                    "result of {} bytes exceeds limit of {}",
                    result.len(),
                    self.config.max_payload_bytes
                )));
            }
            if !request.status.can_transition_to(RequestStatus::Completed) {
                return Err(request.invalid_state(Operation::Callback));
            }

            let stored = result.clone();
            st.stage(|store| {
                store.set_result(id, stored)?;
                store.set_status(id, RequestStatus::Completed, Operation::Callback, now)
            })?;
            st.totals.record_completion(request.escrowed_value);

            info!(
                request_id = id,
                fee = %request.escrowed_value,
                "[cg-01] Request {} completed", id
            );
            Ok(((), vec![LedgerEvent::RequestCompleted { id, result }]))
        })
    }

    #[instrument(name = "report_failure", skip_all, fields(request_id = id))]
    fn report_failure(
        &self,
        ctx: CallContext,
        id: RequestId,
        reason: String,
    ) -> Result<(), LifecycleError> {
        self.transact(Operation::ReportFailure, &ctx, |state, now| {
            let mut st = state.borrow_mut();

            st.access.ensure_gateway(&ctx.caller)?;
            let request = st.store.get(id)?;
            if reason.is_empty() {
                return Err(LifecycleError::invalid_input("failure reason is empty"));
            }
            if reason.len() > self.config.max_reason_bytes {
                return Err(LifecycleError::invalid_input(format!(
                    "failure reason of {} bytes exceeds limit of {}",
                    reason.len(),
                    self.config.max_reason_bytes
                )));
            }
            if !request.status.can_transition_to(RequestStatus::Failed) {
                return Err(request.invalid_state(Operation::ReportFailure));
            }

            let stored = reason.clone();
            st.stage(|store| {
                store.set_failure_reason(id, stored)?;
                store.set_status(id, RequestStatus::Failed, Operation::ReportFailure, now)
            })?;

            warn!(request_id = id, reason = %reason, "[cg-01] Request {} failed", id);
            Ok(((), vec![LedgerEvent::RequestFailed { id, reason }]))
        })
    }

    #[instrument(name = "request_refund", skip_all, fields(request_id = id))]
    fn request_refund(&self, ctx: CallContext, id: RequestId) -> Result<U256, LifecycleError> {
        self.transact(Operation::RequestRefund, &ctx, |state, now| {
            let request = state.borrow().store.get(id)?;
            AccessPolicy::ensure_requester(&request.requester, &ctx.caller)?;
            self.refund(state, now, request, Operation::RequestRefund, false)
        })
    }

    fn is_timed_out(&self, id: RequestId) -> Result<bool, LifecycleError> {
        let now = self.clock.now();
        self.read(|st| st.store.get(id).map(|r| r.is_timed_out(now)))
    }

    fn get_request_status(&self, id: RequestId) -> Result<RequestStatusView, LifecycleError> {
        self.read(|st| st.store.get(id).map(|r| r.status_view()))
    }

    fn get_request_history(&self, id: RequestId) -> Result<Request, LifecycleError> {
        self.read(|st| st.store.get(id))
    }

    fn gateway(&self) -> Address {
        self.read(|st| st.access.gateway())
    }
}

// =============================================================================
// OWNER API
// =============================================================================

impl<S, C, V, E> GatewayAdminApi for LifecycleEngine<S, C, V, E>
where
    S: RequestStore,
    C: LedgerClock,
    V: ValueTransfer,
    E: EventSink,
{
    #[instrument(name = "set_gateway_address", skip_all)]
    fn set_gateway_address(
        &self,
        ctx: CallContext,
        new_gateway: Address,
    ) -> Result<(), LifecycleError> {
        self.transact(Operation::SetGatewayAddress, &ctx, |state, _now| {
            let previous = state
                .borrow_mut()
                .access
                .rotate_gateway(&ctx.caller, new_gateway)?;

            info!(
                previous = %short_addr(&previous),
                new_gateway = %short_addr(&new_gateway),
                "[cg-01] Gateway rotated"
            );
            Ok((
                (),
                vec![LedgerEvent::GatewayAddressUpdated {
                    previous,
                    new_gateway,
                }],
            ))
        })
    }

    #[instrument(name = "set_default_timeout", skip_all, fields(duration = duration))]
    fn set_default_timeout(&self, ctx: CallContext, duration: u64) -> Result<(), LifecycleError> {
        self.transact(Operation::SetDefaultTimeout, &ctx, |state, _now| {
            let mut st = state.borrow_mut();
            st.access.ensure_owner(&ctx.caller)?;
            self.config
                .check_timeout(duration)
                .map_err(LifecycleError::InvalidInput)?;
            let previous = std::mem::replace(&mut st.default_timeout, duration);

            info!(previous, duration, "[cg-01] Default timeout updated");
            Ok((
                (),
                vec![LedgerEvent::TimeoutUpdated {
                    previous,
                    new_duration: duration,
                }],
            ))
        })
    }

    #[instrument(name = "transfer_ownership", skip_all)]
    fn transfer_ownership(
        &self,
        ctx: CallContext,
        new_owner: Address,
    ) -> Result<(), LifecycleError> {
        self.transact(Operation::TransferOwnership, &ctx, |state, _now| {
            let previous = state
                .borrow_mut()
                .access
                .transfer_ownership(&ctx.caller, new_owner)?;

            info!(
                previous = %short_addr(&previous),
                new_owner = %short_addr(&new_owner),
                "[cg-01] Ownership transferred"
            );
            Ok((
                (),
                vec![LedgerEvent::OwnershipTransferred {
                    previous,
                    new_owner,
                }],
            ))
        })
    }

    #[instrument(name = "withdraw_fees", skip_all)]
    fn withdraw_fees(&self, ctx: CallContext, to: Address) -> Result<U256, LifecycleError> {
        self.transact(Operation::WithdrawFees, &ctx, |state, _now| {
            let amount = {
                let st = state.borrow();
                st.access.ensure_owner(&ctx.caller)?;
                if to == ZERO_ADDRESS {
                    return Err(LifecycleError::invalid_input(
                        "fee recipient cannot be the zero address",
                    ));
                }
                let amount = st.totals.retained_fees;
                if amount.is_zero() {
                    return Err(LifecycleError::FeePoolEmpty);
                }
                amount
            };

            let mut events = self.payout(state, &to, amount, |st| {
                st.totals.record_withdrawal(amount);
                Ok(())
            })?;

            info!(to = %short_addr(&to), %amount, "[cg-01] Retained fees withdrawn");
            events.push(LedgerEvent::FeesWithdrawn { to, amount });
            Ok((amount, events))
        })
    }

    #[instrument(name = "admin_force_refund", skip_all, fields(request_id = id))]
    fn admin_force_refund(&self, ctx: CallContext, id: RequestId) -> Result<U256, LifecycleError> {
        self.transact(Operation::AdminForceRefund, &ctx, |state, now| {
            let request = {
                let st = state.borrow();
                if !self.config.allow_admin_force_refund {
                    return Err(LifecycleError::Unauthorized {
                        caller: ctx.caller,
                        role: crate::domain::Role::Owner,
                    });
                }
                st.access.ensure_owner(&ctx.caller)?;
                st.store.get(id)?
            };
            self.refund(state, now, request, Operation::AdminForceRefund, true)
        })
    }

    fn owner(&self) -> Address {
        self.read(|st| st.access.owner())
    }

    fn default_timeout(&self) -> u64 {
        self.read(|st| st.default_timeout)
    }

    fn retained_fees(&self) -> U256 {
        self.read(|st| st.totals.retained_fees)
    }

    fn escrow_held(&self) -> U256 {
        self.read(|st| st.totals.escrow_held)
    }

    fn next_request_id(&self) -> RequestId {
        self.read(|st| st.store.next_id())
    }

    fn escrow_totals(&self) -> EscrowTotals {
        self.read(|st| st.totals)
    }
}

// =============================================================================
// METRICS
// =============================================================================

fn observe_committed(event: &LedgerEvent) {
    match event {
        LedgerEvent::RequestSubmitted { .. } => metrics::REQUESTS_SUBMITTED.inc(),
        LedgerEvent::RequestCompleted { .. } => metrics::REQUESTS_COMPLETED.inc(),
        LedgerEvent::RequestFailed { .. } => metrics::REQUESTS_FAILED.inc(),
        LedgerEvent::RefundProcessed { forced, .. } => {
            let trigger = if *forced { "forced" } else { "requester" };
            metrics::REFUNDS.with_label_values(&[trigger]).inc();
        }
        _ => {}
    }
}

/// Saturate a wei amount into the `i64` a Prometheus gauge holds.
fn gauge_value(amount: U256) -> i64 {
    if amount > U256::from(i64::MAX as u64) {
        i64::MAX
    } else {
        amount.low_u64() as i64
    }
}
