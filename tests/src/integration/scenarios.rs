//! # Lifecycle Scenarios
//!
//! End-to-end walkthroughs of submit, callback, failure and refund against
//! a fully wired contract.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use cg_01_request_lifecycle::{
        invariant_resolution_recorded, invariant_result_matches_status, CallContext, ErrorKind,
        GatewayAdminApi, GatewayRequestApi, LifecycleConfig, LifecycleError, RequestStatus,
        RequestStatusView, Role, TransferError, ValueTransfer,
    };
    use shared_bus::{EventFilter, EventTopic};
    use shared_types::{units, Address, Ciphertext, LedgerEvent, U256};
    use std::sync::Arc;

    // =============================================================================
    // BASIC SCENARIOS
    // =============================================================================

    #[test]
    fn test_submit_returns_first_id_and_pending_status() {
        let c = TestContract::new();
        let id = c.submit(ALICE, units(1), b"x", Some(3600)).unwrap();

        assert_eq!(id, 0);
        assert_eq!(
            c.engine.get_request_status(0).unwrap(),
            RequestStatusView {
                status: RequestStatus::Pending,
                submit_time: T0,
                timeout_time: T0 + 3600,
            }
        );
        c.assert_conserved();
    }

    #[test]
    fn test_callback_before_timeout_blocks_refund() {
        let c = TestContract::new();
        let id = c.submit(ALICE, units(1), b"x", Some(3600)).unwrap();

        c.callback(id, b"ok").unwrap();
        assert_eq!(c.status(id), RequestStatus::Completed);

        c.clock.advance(10_000);
        assert_eq!(
            c.refund(ALICE, id).unwrap_err().kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(c.ledger.balance_of(&ALICE), units(9));
        c.assert_conserved();
    }

    #[test]
    fn test_timeout_refund_returns_escrow() {
        let c = TestContract::new();
        let id = c.submit(ALICE, units(1), b"x", Some(3600)).unwrap();
        let contract_before = c.ledger.contract_balance();

        c.clock.set(T0 + 3600);
        assert_eq!(c.refund(ALICE, id).unwrap(), units(1));

        assert_eq!(c.status(id), RequestStatus::Refunded);
        assert_eq!(c.ledger.balance_of(&ALICE), units(10));
        assert_eq!(contract_before - c.ledger.contract_balance(), units(1));
        c.assert_conserved();
    }

    #[test]
    fn test_refund_by_stranger_is_unauthorized() {
        let c = TestContract::new();
        let id = c.submit(ALICE, units(1), b"x", Some(3600)).unwrap();
        c.clock.advance(3600);

        assert_eq!(
            c.refund(BOB, id),
            Err(LifecycleError::Unauthorized {
                caller: BOB,
                role: Role::Requester,
            })
        );
        assert_eq!(c.status(id), RequestStatus::Pending);
    }

    #[test]
    fn test_empty_payload_allocates_nothing() {
        let c = TestContract::new();
        let err = c.submit(ALICE, units(1), b"", Some(3600)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(c.engine.next_request_id(), 0);
        assert!(c.ledger.contract_balance().is_zero());
        assert_eq!(c.ledger.balance_of(&ALICE), units(10));
        assert!(c.log.is_empty());
    }

    // =============================================================================
    // FULL LIFECYCLE
    // =============================================================================

    #[test]
    fn test_event_log_records_full_lifecycle() {
        let c = TestContract::new();
        let gw = CallContext::new(GATEWAY);

        let done = c.submit(ALICE, units(2), b"a", Some(60)).unwrap();
        let failed = c.submit(BOB, units(1), b"b", Some(60)).unwrap();
        c.engine.acknowledge(gw, done).unwrap();
        c.callback(done, b"r").unwrap();
        c.engine
            .report_failure(gw, failed, "bad ciphertext".into())
            .unwrap();
        c.refund(BOB, failed).unwrap();

        let names: Vec<&str> = c.log.events().iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec![
                "RequestSubmitted",
                "RequestSubmitted",
                "RequestAcknowledged",
                "RequestCompleted",
                "RequestFailed",
                "RefundProcessed",
            ]
        );
        let seqs: Vec<u64> = c.log.entries().iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, (0..6).collect::<Vec<_>>());

        for id in [done, failed] {
            let record = c.engine.get_request_history(id).unwrap();
            assert!(invariant_result_matches_status(&record));
            assert!(invariant_resolution_recorded(&record));
        }
        assert_eq!(c.engine.retained_fees(), units(2));
        assert!(c.engine.escrow_held().is_zero());
        c.assert_conserved();
    }

    #[test]
    fn test_bus_mirrors_committed_events_only() {
        let c = TestContract::new();
        let mut sub = c.bus.subscribe(EventFilter::all());

        let id = c.submit(ALICE, units(1), b"x", None).unwrap();
        // Rejected calls publish nothing.
        let _ = c.submit(ALICE, units(1), b"", None);
        let _ = c
            .engine
            .callback(CallContext::new(BOB), id, Ciphertext::from(b"forged"));
        c.callback(id, b"ok").unwrap();

        let mut seen = Vec::new();
        while let Ok(Some(event)) = sub.try_recv() {
            if let Some(logged) = event.as_ledger() {
                seen.push(logged.clone());
            }
        }
        assert_eq!(seen, c.log.entries());
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_submission_topic_carries_payload() {
        let c = TestContract::new();
        let mut sub = c
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Submissions]));

        let id = c.submit(ALICE, units(1), b"ciphertext", Some(120)).unwrap();
        c.callback(id, b"ok").unwrap();

        let event = sub.try_recv().unwrap().unwrap();
        match &event.as_ledger().unwrap().event {
            LedgerEvent::RequestSubmitted {
                id: got,
                payload,
                timeout_time,
                ..
            } => {
                assert_eq!(*got, id);
                assert_eq!(payload, &Ciphertext::from(b"ciphertext"));
                assert_eq!(*timeout_time, T0 + 120);
            }
            other => panic!("unexpected {other:?}"),
        }
        // The completion is on another topic.
        assert!(sub.try_recv().unwrap().is_none());
    }

    // =============================================================================
    // TIMEOUT GATE & GATEWAY ROTATION
    // =============================================================================

    #[test]
    fn test_timeout_gate_boundary() {
        let c = TestContract::new();
        let id = c.submit(ALICE, units(1), b"x", Some(100)).unwrap();

        c.clock.set(T0 + 99);
        assert!(!c.engine.is_timed_out(id).unwrap());
        assert!(c.refund(ALICE, id).is_err());

        c.clock.set(T0 + 100);
        assert!(c.engine.is_timed_out(id).unwrap());
        assert!(c.refund(ALICE, id).is_ok());
    }

    #[test]
    fn test_processing_request_refundable_after_timeout() {
        let c = TestContract::new();
        let id = c.submit(ALICE, units(1), b"x", Some(100)).unwrap();
        c.engine.acknowledge(CallContext::new(GATEWAY), id).unwrap();

        c.clock.advance(100);
        c.refund(ALICE, id).unwrap();
        assert_eq!(
            c.callback(id, b"too late").unwrap_err().kind(),
            ErrorKind::InvalidState
        );
    }

    #[test]
    fn test_rotated_gateway_cannot_complete() {
        let c = TestContract::new();
        let id = c.submit(ALICE, units(1), b"x", None).unwrap();
        let successor = [0x03u8; 20];

        c.engine
            .set_gateway_address(CallContext::new(OWNER), successor)
            .unwrap();

        assert!(matches!(
            c.callback(id, b"ok"),
            Err(LifecycleError::Unauthorized {
                role: Role::Gateway,
                ..
            })
        ));
        assert!(matches!(
            c.engine
                .report_failure(CallContext::new(GATEWAY), id, "stale".into()),
            Err(LifecycleError::Unauthorized { .. })
        ));
        c.engine
            .callback(CallContext::new(successor), id, Ciphertext::from(b"ok"))
            .unwrap();
    }

    #[test]
    fn test_gateway_cannot_refund_or_administer() {
        let c = TestContract::new();
        let gw = CallContext::new(GATEWAY);
        let id = c.submit(ALICE, units(1), b"x", Some(1)).unwrap();
        c.clock.advance(5);

        assert!(c.engine.request_refund(gw, id).is_err());
        assert!(c.engine.set_gateway_address(gw, BOB).is_err());
        assert!(c.engine.transfer_ownership(gw, GATEWAY).is_err());
        assert!(c.engine.withdraw_fees(gw, GATEWAY).is_err());
    }

    // =============================================================================
    // FEES & OWNER POWERS
    // =============================================================================

    #[test]
    fn test_owner_withdraws_only_retained_fees() {
        let c = TestContract::new();
        let treasury = [0x7Eu8; 20];
        let owner = CallContext::new(OWNER);

        let a = c.submit(ALICE, units(3), b"a", None).unwrap();
        let _open = c.submit(BOB, units(4), b"b", None).unwrap();
        c.callback(a, b"ok").unwrap();

        assert_eq!(c.engine.withdraw_fees(owner, treasury).unwrap(), units(3));
        assert_eq!(c.ledger.balance_of(&treasury), units(3));
        assert_eq!(c.ledger.contract_balance(), units(4));
        assert_eq!(
            c.engine.withdraw_fees(owner, treasury),
            Err(LifecycleError::FeePoolEmpty)
        );
        c.assert_conserved();
    }

    #[test]
    fn test_force_refund_requires_opt_in_and_pays_requester() {
        let disabled = TestContract::new();
        let id = disabled.submit(ALICE, units(1), b"x", Some(10)).unwrap();
        disabled.clock.advance(10);
        assert!(disabled
            .engine
            .admin_force_refund(CallContext::new(OWNER), id)
            .is_err());

        let enabled = TestContract::with_config(LifecycleConfig {
            allow_admin_force_refund: true,
            ..LifecycleConfig::default()
        });
        let id = enabled.submit(ALICE, units(1), b"x", Some(10)).unwrap();
        enabled.clock.advance(10);
        assert_eq!(
            enabled
                .engine
                .admin_force_refund(CallContext::new(OWNER), id)
                .unwrap(),
            units(1)
        );
        assert_eq!(enabled.ledger.balance_of(&ALICE), units(10));
        assert!(enabled.ledger.balance_of(&OWNER).is_zero());
        enabled.assert_conserved();
    }

    // =============================================================================
    // ROLLBACK & REENTRANCY
    // =============================================================================

    #[test]
    fn test_failed_refund_transfer_is_retryable() {
        let c = TestContract::new();
        let id = c.submit(ALICE, units(1), b"x", Some(10)).unwrap();
        c.clock.advance(10);
        let events = c.log.len();

        c.ledger.reject_transfers_to(ALICE);
        assert_eq!(
            c.refund(ALICE, id).unwrap_err().kind(),
            ErrorKind::TransferFailed
        );
        assert_eq!(c.status(id), RequestStatus::Pending);
        assert_eq!(c.log.len(), events);
        c.assert_conserved();

        c.ledger.accept_transfers_to(&ALICE);
        c.refund(ALICE, id).unwrap();
        assert_eq!(c.status(id), RequestStatus::Refunded);
        c.assert_conserved();
    }

    #[test]
    fn test_reentrant_refund_pays_once() {
        let c = TestContract::new();
        let id = c.submit(ALICE, units(1), b"x", Some(10)).unwrap();
        c.clock.advance(10);

        let engine = Arc::downgrade(&c.engine);
        let attempts = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let record = attempts.clone();
        c.ledger.set_recipient_hook(
            ALICE,
            Arc::new(move |_: &Address, _: U256| {
                if let Some(engine) = engine.upgrade() {
                    record
                        .lock()
                        .push(engine.request_refund(CallContext::new(ALICE), id));
                }
                Ok(())
            }),
        );

        assert_eq!(c.refund(ALICE, id).unwrap(), units(1));

        let attempts = attempts.lock();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].as_ref().unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(c.ledger.balance_of(&ALICE), units(10));
        assert_eq!(
            c.log
                .events_for(id)
                .iter()
                .filter(|e| e.name() == "RefundProcessed")
                .count(),
            1
        );
        c.assert_conserved();
    }

    #[test]
    fn test_reentrant_submit_commits_with_refund() {
        let c = TestContract::new();
        let id = c.submit(ALICE, units(1), b"x", Some(10)).unwrap();
        c.clock.advance(10);

        // Alice re-submits from inside her refund.
        let engine = Arc::downgrade(&c.engine);
        c.ledger.set_recipient_hook(
            ALICE,
            Arc::new(move |_: &Address, _: U256| {
                if let Some(engine) = engine.upgrade() {
                    engine
                        .submit(
                            CallContext::new(ALICE).with_value(units(1)),
                            Ciphertext::from(b"again"),
                            None,
                            None,
                        )
                        .map_err(|e| TransferError::Rejected(e.to_string()))?;
                }
                Ok(())
            }),
        );

        c.refund(ALICE, id).unwrap();
        c.ledger.clear_recipient_hook(&ALICE);

        assert_eq!(c.engine.next_request_id(), 2);
        assert_eq!(c.status(1), RequestStatus::Pending);
        assert_eq!(c.ledger.balance_of(&ALICE), units(9));
        c.assert_conserved();
    }

    #[test]
    fn test_reverting_recipient_rolls_back_nested_submit() {
        let c = TestContract::new();
        let id = c.submit(ALICE, units(1), b"x", Some(10)).unwrap();
        c.clock.advance(10);
        let events = c.log.len();

        // The nested submit succeeds, then the payment reverts.
        let engine = Arc::downgrade(&c.engine);
        c.ledger.set_recipient_hook(
            ALICE,
            Arc::new(move |_: &Address, _: U256| {
                if let Some(engine) = engine.upgrade() {
                    let _ = engine.submit(
                        CallContext::new(ALICE).with_value(units(1)),
                        Ciphertext::from(b"again"),
                        None,
                        None,
                    );
                }
                Err(TransferError::Rejected("revert".into()))
            }),
        );

        assert!(c.refund(ALICE, id).is_err());
        assert_eq!(c.status(id), RequestStatus::Pending);
        assert_eq!(c.engine.next_request_id(), 1);
        assert_eq!(
            c.engine.get_request_history(1).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(c.log.len(), events);
        c.assert_conserved();
    }

    #[test]
    fn test_spent_refund_cannot_be_paid_twice() {
        let c = TestContract::new();
        let supply = c.total_supply(&[ALICE, BOB]);
        let id = c.submit(ALICE, units(1), b"x", Some(10)).unwrap();
        c.clock.advance(10);

        // Alice spends her whole balance, refund included, then reverts.
        let engine = Arc::downgrade(&c.engine);
        c.ledger.set_recipient_hook(
            ALICE,
            Arc::new(move |_: &Address, _: U256| {
                if let Some(engine) = engine.upgrade() {
                    engine
                        .submit(
                            CallContext::new(ALICE).with_value(units(10)),
                            Ciphertext::from(b"spend"),
                            None,
                            None,
                        )
                        .map_err(|e| TransferError::Rejected(e.to_string()))?;
                }
                Err(TransferError::Rejected("revert".into()))
            }),
        );

        assert_eq!(
            c.refund(ALICE, id).unwrap_err().kind(),
            ErrorKind::TransferFailed
        );
        assert_eq!(c.ledger.balance_of(&ALICE), units(9));
        assert_eq!(c.engine.next_request_id(), 1);
        c.assert_conserved();

        c.ledger.clear_recipient_hook(&ALICE);
        assert_eq!(c.refund(ALICE, id).unwrap(), units(1));
        assert_eq!(
            c.refund(ALICE, id).unwrap_err().kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(c.ledger.balance_of(&ALICE), units(10));
        assert!(c.ledger.contract_balance().is_zero());
        assert_eq!(c.total_supply(&[ALICE, BOB]), supply);
        c.assert_conserved();
    }
}
