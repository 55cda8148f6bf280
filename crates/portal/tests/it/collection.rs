//! Property tests for the merged wave collection.

use alloy_primitives::{address, Address};
use proptest::prelude::*;
use std::collections::HashSet;
use waveportal::{WaveCollection, WaveRecord};

const ALICE: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
const BOB: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");

/// One mutation of the collection, as the reconciler would perform it.
#[derive(Clone, Debug)]
enum Op {
    /// A single record arriving live or via a receipt.
    Insert(WaveRecord),
    /// A bulk refetch returning a batch in ledger order.
    Merge(Vec<WaveRecord>),
}

/// Records drawn from a small pool so duplicates are common.
fn record() -> impl Strategy<Value = WaveRecord> {
    (
        prop::sample::select(vec![ALICE, BOB]),
        1_000..1_004u64,
        prop::sample::select(vec!["gm", "wave", ""]),
    )
        .prop_map(|(waver, timestamp, message)| WaveRecord::new(waver, timestamp, message))
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        record().prop_map(Op::Insert),
        prop::collection::vec(record(), 0..6).prop_map(Op::Merge),
    ]
}

proptest! {
    /// No mutation sequence may move or drop an existing entry, duplicate a
    /// key, or lose an offered record.
    #[test]
    fn collection_is_append_only_and_duplicate_free(
        ops in prop::collection::vec(op(), 1..12),
    ) {
        let mut waves = WaveCollection::new();
        let mut offered = Vec::new();

        for op in ops {
            let before = waves.records().to_vec();
            match op {
                Op::Insert(record) => {
                    offered.push(record.clone());
                    waves.insert(record);
                }
                Op::Merge(batch) => {
                    offered.extend(batch.iter().cloned());
                    waves.merge(batch);
                }
            }
            prop_assert_eq!(&waves.records()[..before.len()], &before[..]);
        }

        let mut keys = HashSet::new();
        for record in waves.iter() {
            prop_assert!(keys.insert(record.key()), "duplicate key for {:?}", record);
        }
        for record in &offered {
            prop_assert!(waves.contains(&record.key()), "lost offered record {:?}", record);
        }
        prop_assert!(waves.len() <= offered.len());
    }
}
