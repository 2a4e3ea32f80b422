//! # Property Tests
//!
//! Random call sequences against one contract. After every call the escrow
//! books balance and no value is created or destroyed; at the end no
//! request was paid out twice.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use cg_01_request_lifecycle::{
        CallContext, ErrorKind, GatewayAdminApi, GatewayRequestApi, RequestStatus,
    };
    use proptest::prelude::*;
    use shared_types::{units, Address, LedgerEvent, RequestId};

    const TREASURY: Address = [0x7Eu8; 20];
    const USERS: [Address; 2] = [ALICE, BOB];

    #[derive(Debug, Clone)]
    enum Op {
        Submit { who: usize, value: u64, timeout: u64 },
        Acknowledge(usize),
        Callback(usize),
        ReportFailure(usize),
        Refund { who: usize, idx: usize },
        Advance(u64),
        Withdraw,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0..2usize, 0..4u64, 1..200u64)
                .prop_map(|(who, value, timeout)| Op::Submit { who, value, timeout }),
            1 => (0..16usize).prop_map(Op::Acknowledge),
            2 => (0..16usize).prop_map(Op::Callback),
            1 => (0..16usize).prop_map(Op::ReportFailure),
            3 => (0..2usize, 0..16usize).prop_map(|(who, idx)| Op::Refund { who, idx }),
            2 => (1..150u64).prop_map(Op::Advance),
            1 => Just(Op::Withdraw),
        ]
    }

    fn pick(c: &TestContract, idx: usize) -> Option<RequestId> {
        let next = c.engine.next_request_id();
        (next > 0).then(|| idx as u64 % next)
    }

    fn apply(c: &TestContract, op: &Op) {
        let gw = CallContext::new(GATEWAY);
        match *op {
            Op::Submit { who, value, timeout } => {
                let _ = c.submit(USERS[who], units(value), b"payload", Some(timeout));
            }
            Op::Acknowledge(idx) => {
                if let Some(id) = pick(c, idx) {
                    let _ = c.engine.acknowledge(gw, id);
                }
            }
            Op::Callback(idx) => {
                if let Some(id) = pick(c, idx) {
                    let before = c.status(id);
                    let outcome = c.callback(id, b"result");
                    // A request completes at most once and only from an open state.
                    assert_eq!(outcome.is_ok(), before.is_open(), "callback on {before}");
                }
            }
            Op::ReportFailure(idx) => {
                if let Some(id) = pick(c, idx) {
                    let _ = c.engine.report_failure(gw, id, "failed".into());
                }
            }
            Op::Refund { who, idx } => {
                if let Some(id) = pick(c, idx) {
                    let record = c.engine.get_request_history(id).unwrap();
                    let timed_out = c.engine.is_timed_out(id).unwrap();
                    let caller = USERS[who];

                    match c.refund(caller, id) {
                        Ok(amount) => {
                            assert_eq!(caller, record.requester);
                            assert_eq!(amount, record.escrowed_value);
                            assert!(
                                record.status == RequestStatus::Failed
                                    || (record.status.is_open() && timed_out),
                                "refund of {} request before timeout",
                                record.status
                            );
                        }
                        Err(err) if caller != record.requester => {
                            assert_eq!(err.kind(), ErrorKind::Unauthorized);
                        }
                        Err(err) => {
                            assert_eq!(err.kind(), ErrorKind::InvalidState);
                        }
                    }
                }
            }
            Op::Advance(secs) => c.clock.advance(secs),
            Op::Withdraw => {
                let _ = c.engine.withdraw_fees(CallContext::new(OWNER), TREASURY);
            }
        }
    }

    fn assert_single_payout(c: &TestContract) {
        for id in 0..c.engine.next_request_id() {
            let events = c.log.events_for(id);
            let completions = events
                .iter()
                .filter(|e| matches!(e, LedgerEvent::RequestCompleted { .. }))
                .count();
            let refunds = events
                .iter()
                .filter(|e| matches!(e, LedgerEvent::RefundProcessed { .. }))
                .count();

            assert!(completions + refunds <= 1, "request {id} resolved twice");
            let status = c.status(id);
            assert_eq!(completions == 1, status == RequestStatus::Completed);
            assert_eq!(refunds == 1, status == RequestStatus::Refunded);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_random_sequences_conserve_value(ops in prop::collection::vec(op(), 1..60)) {
            let c = TestContract::new();
            let accounts = [ALICE, BOB, TREASURY];
            let supply = c.total_supply(&accounts);

            for op in &ops {
                apply(&c, op);
                c.assert_conserved();
                prop_assert_eq!(c.total_supply(&accounts), supply);
            }
            assert_single_payout(&c);
        }

        #[test]
        fn prop_ids_are_dense_and_increasing(count in 1usize..30) {
            let c = TestContract::new();
            for expected in 0..count as u64 {
                let id = c.submit(ALICE, 0u64.into(), b"p", None).unwrap();
                prop_assert_eq!(id, expected);
            }
            prop_assert_eq!(c.engine.next_request_id(), count as u64);
        }

        #[test]
        fn prop_refund_gate_matches_deadline(timeout in 1u64..10_000, elapsed in 0u64..20_000) {
            let c = TestContract::new();
            let id = c.submit(ALICE, units(1), b"p", Some(timeout)).unwrap();
            c.clock.advance(elapsed);

            let refunded = c.refund(ALICE, id).is_ok();
            prop_assert_eq!(refunded, elapsed >= timeout);
            prop_assert_eq!(c.engine.is_timed_out(id).unwrap(), elapsed >= timeout);
        }
    }
}
