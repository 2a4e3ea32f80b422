//! # Gateway Worker
//!
//! Consumes `RequestSubmitted` events and answers each one on the ledger.
//!
//! ```text
//! bus ──RequestSubmitted──► acknowledge ──► compute (time-limited)
//!                                               │
//!                          ┌────────────────────┼──────────────────┐
//!                          ▼                    ▼                  ▼
//!                       callback         report_failure     report_failure
//!                      (result)          (adapter error)      (timeout)
//! ```
//!
//! The ledger is the arbiter: a request refunded while its job runs makes
//! the late `callback` fail, and the worker records the job as rejected.

use crate::domain::{
    ComputeError, ComputeOutput, ComputeRequest, GatewayError, GatewayWorkerConfig, Outcome,
    WorkerStats,
};
use crate::ports::ComputeOverCiphertext;
use cg_01_request_lifecycle::{CallContext, GatewayRequestApi, LifecycleError};
use gateway_telemetry::{metrics, HistogramTimer};
use shared_bus::Subscription;
use shared_types::{short_addr, Address, LoggedEvent, RequestId};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Off-band gateway client driving the ledger's gateway entry points.
pub struct GatewayWorker {
    identity: Address,
    ledger: Arc<dyn GatewayRequestApi>,
    program: Arc<dyn ComputeOverCiphertext>,
    subscription: Subscription,
    config: GatewayWorkerConfig,
    stats: WorkerStats,
}

enum Wake {
    Entry(LoggedEvent),
    BusClosed,
    Shutdown,
}

impl GatewayWorker {
    /// Create a worker that calls the ledger as `identity`.
    ///
    /// `subscription` should be filtered to `EventTopic::Submissions`;
    /// other events are ignored.
    pub fn new(
        identity: Address,
        ledger: Arc<dyn GatewayRequestApi>,
        program: Arc<dyn ComputeOverCiphertext>,
        subscription: Subscription,
        config: GatewayWorkerConfig,
    ) -> Self {
        Self {
            identity,
            ledger,
            program,
            subscription,
            config,
            stats: WorkerStats::default(),
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> WorkerStats {
        self.stats
    }

    /// Process submissions until the bus closes or `shutdown` flips to
    /// `true` (or its sender is dropped).
    #[instrument(name = "gateway_worker", skip_all)]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> WorkerStats {
        info!(
            gateway = %short_addr(&self.identity),
            program = self.program.name(),
            "[cg-02] Gateway worker started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let wake = tokio::select! {
                changed = shutdown.changed() => match changed {
                    Ok(()) if !*shutdown.borrow() => continue,
                    _ => Wake::Shutdown,
                },
                next = self.subscription.recv_ledger() => match next {
                    Some(logged) => Wake::Entry(logged),
                    None => Wake::BusClosed,
                },
            };

            match wake {
                Wake::Entry(logged) => {
                    if let Some(job) = ComputeRequest::from_event(&logged.event) {
                        let outcome = self.process(job).await;
                        self.stats.record(outcome);
                    }
                }
                Wake::BusClosed => {
                    info!("[cg-02] Event bus closed, exiting");
                    break;
                }
                Wake::Shutdown => break,
            }
        }

        info!(
            processed = self.stats.processed,
            completed = self.stats.completed,
            failed = self.stats.failed,
            timed_out = self.stats.timed_out,
            rejected = self.stats.rejected,
            lagged = self.subscription.lagged(),
            "[cg-02] Gateway worker stopped"
        );
        self.stats
    }

    /// Answer one submission on the ledger.
    #[instrument(
        name = "process",
        skip_all,
        fields(request_id = job.request_id, correlation_id = %Uuid::new_v4())
    )]
    pub async fn process(&self, job: ComputeRequest) -> Outcome {
        let outcome = self.resolve(job).await;
        metrics::GATEWAY_OUTCOMES
            .with_label_values(&[outcome.as_str()])
            .inc();
        outcome
    }

    async fn resolve(&self, job: ComputeRequest) -> Outcome {
        let id = job.request_id;

        if self.config.acknowledge_before_compute {
            if let Err(err) = self.ledger.acknowledge(self.ctx(), id) {
                return self.rejected(id, "acknowledge", err);
            }
        }

        debug!(
            request_id = id,
            payload_len = job.payload.len(),
            gas_budget = ?job.gas_budget,
            "[cg-02] Computing request {}", id
        );

        let computed = {
            let _timer = HistogramTimer::new(&metrics::COMPUTE_DURATION);
            tokio::time::timeout(self.config.compute_timeout(), self.program.compute(job)).await
        };

        match computed {
            Ok(Ok(output)) if output.result.is_empty() => self.report(
                id,
                GatewayError::Compute(ComputeError::EmptyResult),
                Outcome::Failed,
            ),
            Ok(Ok(output)) => self.deliver(id, output),
            Ok(Err(err)) => self.report(id, GatewayError::Compute(err), Outcome::Failed),
            Err(_) => self.report(
                id,
                GatewayError::ComputeTimeout {
                    id,
                    timeout_ms: self.config.compute_timeout_ms,
                },
                Outcome::TimedOut,
            ),
        }
    }

    fn deliver(&self, id: RequestId, output: ComputeOutput) -> Outcome {
        let digest = output.result_digest();
        let gas_used = output.gas_used;
        match self.ledger.callback(self.ctx(), id, output.result) {
            Ok(()) => {
                info!(
                    request_id = id,
                    gas_used,
                    result_digest = %short_digest(&digest),
                    "[cg-02] Result delivered for request {}", id
                );
                Outcome::Completed
            }
            Err(err) => self.rejected(id, "callback", err),
        }
    }

    fn report(&self, id: RequestId, cause: GatewayError, outcome: Outcome) -> Outcome {
        let reason = self.config.truncate_reason(cause.to_string());
        match self.ledger.report_failure(self.ctx(), id, reason) {
            Ok(()) => {
                warn!(request_id = id, "[cg-02] Reported failure: {}", cause);
                outcome
            }
            Err(err) => self.rejected(id, "report_failure", err),
        }
    }

    fn rejected(&self, id: RequestId, call: &'static str, err: LifecycleError) -> Outcome {
        match err {
            LifecycleError::InvalidState { .. } | LifecycleError::NotFound(_) => debug!(
                request_id = id,
                call,
                "[cg-02] Ledger declined {}: {}", call, err
            ),
            _ => warn!(
                request_id = id,
                call,
                "[cg-02] Ledger rejected {}: {}", call, err
            ),
        }
        Outcome::Rejected
    }

    fn ctx(&self) -> CallContext {
        CallContext::new(self.identity)
    }
}

fn short_digest(digest: &[u8]) -> String {
    hex::encode(&digest[..digest.len().min(4)])
}
