//! # Concurrency Tests
//!
//! Many OS threads hitting one engine. The executor lock must impose a
//! total order: ids stay dense, event sequences gap-free, and a request
//! racing between callback and refund resolves exactly once.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use cg_01_request_lifecycle::{CallContext, ErrorKind, GatewayAdminApi, GatewayRequestApi};
    use shared_types::{units, Ciphertext, LedgerEvent};
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_concurrent_submits_get_unique_dense_ids() {
        let c = TestContract::new();
        let threads = 8;
        let per_thread = 25;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let engine = c.engine.clone();
                let barrier = barrier.clone();
                let who = if i % 2 == 0 { ALICE } else { BOB };
                thread::spawn(move || {
                    barrier.wait();
                    (0..per_thread)
                        .map(|_| {
                            engine
                                .submit(
                                    CallContext::new(who).with_value(1u64.into()),
                                    Ciphertext::from(b"p"),
                                    None,
                                    None,
                                )
                                .unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = (threads * per_thread) as u64;

        assert_eq!(ids, (0..total).collect::<HashSet<_>>());
        let seqs: Vec<u64> = c.log.entries().iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, (0..total).collect::<Vec<_>>());

        // Log order matches id order: ids are assigned under the same lock.
        let logged_ids: Vec<u64> = c
            .log
            .events()
            .iter()
            .filter_map(LedgerEvent::request_id)
            .collect();
        assert_eq!(logged_ids, (0..total).collect::<Vec<_>>());
        c.assert_conserved();
    }

    #[test]
    fn test_callback_refund_race_moves_funds_once() {
        for _ in 0..20 {
            let c = TestContract::new();
            let id = c.submit(ALICE, units(1), b"p", Some(10)).unwrap();
            c.clock.advance(10);

            let barrier = Arc::new(Barrier::new(4));
            let mut handles = Vec::new();
            for n in 0..4 {
                let engine = c.engine.clone();
                let barrier = barrier.clone();
                handles.push(thread::spawn(move || {
                    barrier.wait();
                    if n % 2 == 0 {
                        engine
                            .callback(CallContext::new(GATEWAY), id, Ciphertext::from(b"r"))
                            .map(|_| "callback")
                    } else {
                        engine
                            .request_refund(CallContext::new(ALICE), id)
                            .map(|_| "refund")
                    }
                }));
            }

            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
            assert_eq!(winners.len(), 1, "{results:?}");
            for loser in results.iter().filter_map(|r| r.as_ref().err()) {
                assert_eq!(loser.kind(), ErrorKind::InvalidState);
            }

            match *winners[0] {
                "callback" => {
                    assert_eq!(c.ledger.balance_of(&ALICE), units(9));
                    assert_eq!(c.engine.retained_fees(), units(1));
                }
                _ => {
                    assert_eq!(c.ledger.balance_of(&ALICE), units(10));
                    assert!(c.engine.retained_fees().is_zero());
                }
            }
            c.assert_conserved();
        }
    }

    #[test]
    fn test_parallel_refunds_of_distinct_requests() {
        let c = TestContract::new();
        let ids: Vec<u64> = (0..10)
            .map(|_| c.submit(ALICE, units(1), b"p", Some(5)).unwrap())
            .collect();
        c.clock.advance(5);

        let handles: Vec<_> = ids
            .iter()
            .map(|&id| {
                let engine = c.engine.clone();
                thread::spawn(move || engine.request_refund(CallContext::new(ALICE), id))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), units(1));
        }

        assert_eq!(c.ledger.balance_of(&ALICE), units(10));
        assert!(c.engine.escrow_held().is_zero());
        c.assert_conserved();
    }
}
