//! SERIAL Tests
//!
//! The baseline: admission order is execution order is write order.

use crate::common::*;
use lockstep::{Expect, Put};
use parking_lot::Mutex;
use std::sync::Arc;

#[test]
fn executes_in_admission_order() {
    let processor = engine(CcMode::Serial, 16);
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut submitted = Vec::new();
    for i in 0..50 {
        let key = i % 4;
        let id = processor
            .submit(Transaction::new([key], [key], Recorder::new(Arc::clone(&log))))
            .unwrap();
        submitted.push(id);
    }
    collect(&processor, 50);

    assert_eq!(*log.lock(), submitted);
}

#[test]
fn last_admitted_write_wins() {
    let processor = engine(CcMode::Serial, 16);
    for value in 1..=20 {
        processor
            .submit(Transaction::new([], [7], Put::new([(7, value)])))
            .unwrap();
    }
    let done = collect(&processor, 20);

    assert_eq!(processor.read_committed(7), Some(20));
    let ids: Vec<TxnId> = done.iter().map(Transaction::id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted, "results come back in admission order");
}

#[test]
fn each_transaction_sees_its_predecessor() {
    let processor = engine(CcMode::Serial, 16);
    processor
        .submit(Transaction::new([], [2], Put::new([(2, 5)])))
        .unwrap();
    processor
        .submit(Transaction::new([2], [], Expect::new([(2, 5)])))
        .unwrap();
    processor
        .submit(Transaction::new([2], [], Expect::new([(2, 0)])))
        .unwrap();

    let statuses: Vec<TxnStatus> = collect(&processor, 3).iter().map(Transaction::status).collect();
    assert_eq!(
        statuses,
        vec![TxnStatus::Committed, TxnStatus::Committed, TxnStatus::Aborted]
    );
}
