//! Chunked, parallel proof generation.
//!
//! The address list is split into contiguous chunks and each chunk is
//! handed to its own worker thread. Every worker rebuilds the full tree
//! over the COMPLETE address sequence and extracts proofs only for its
//! chunk. Rebuilding per worker is deliberate: each worker is a
//! self-contained closure over immutable input, so there is no shared
//! tree state and no locking. The coordinator merges the partial proof
//! tables (keys disjoint by construction), checks that every worker saw
//! the same root, then builds the tree once more for the canonical root.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;

use crate::error::{Error, Result};
use crate::merkle::{leaf_hash, MerkleTree};
use crate::progress::{ProgressAggregator, ProgressEvent, ProgressUpdate};
use crate::utils::canonical_address;

/// Tuning knobs for one run. Both bounds are advisory inputs into the
/// chunk-count formula; neither has an enforced upper limit.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub max_workers: usize,
    pub desired_chunk_size: usize,
    /// Workers emit a progress message every this many processed leaves.
    /// Only monotonicity and convergence matter, not the exact value.
    pub report_interval: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_workers: 5,
            desired_chunk_size: 1000,
            report_interval: 100,
        }
    }
}

/// The result of a completed run.
#[derive(Debug, Clone)]
pub struct TreeArtifacts {
    pub root: [u8; 32],
    /// Canonical lowercase address -> sibling path, for every input address.
    pub proofs: BTreeMap<String, Vec<[u8; 32]>>,
}

struct WorkerOutput {
    root: [u8; 32],
    proofs: BTreeMap<String, Vec<[u8; 32]>>,
}

enum WorkerMessage {
    Progress(ProgressEvent),
    /// Terminal; exactly one per worker, carrying its partial table or the
    /// error that stopped it.
    Finished {
        worker: usize,
        result: Result<WorkerOutput>,
    },
}

/// Compute the chunk ranges for `len` addresses.
///
/// `worker_count = min(max_workers, ceil(len / desired_chunk_size))`, at
/// least 1; `chunk_size = ceil(len / worker_count)`. The ranges partition
/// `[0, len)` with no gaps or overlaps; the last one may be shorter.
pub fn chunk_ranges(len: usize, opts: &RunOptions) -> Vec<Range<usize>> {
    let desired = opts.desired_chunk_size.max(1);
    let worker_count = len.div_ceil(desired).clamp(1, opts.max_workers.max(1));
    let chunk_size = len.div_ceil(worker_count).max(1);

    // Rounding chunk_size up can leave trailing chunks past the end
    // (e.g. len=5, 4 workers, chunk_size=2); those get dropped.
    (0..worker_count)
        .map(|i| {
            let start = (i * chunk_size).min(len);
            start..(start + chunk_size).min(len)
        })
        .filter(|range| !range.is_empty())
        .collect()
}

/// Build the whitelist root and a proof for every address.
pub fn generate(addresses: &[String], opts: &RunOptions) -> Result<TreeArtifacts> {
    generate_with_progress(addresses, opts, |_| {})
}

/// Like [`generate`], additionally invoking `on_progress` with a monotonic
/// snapshot as workers report.
pub fn generate_with_progress(
    addresses: &[String],
    opts: &RunOptions,
    mut on_progress: impl FnMut(ProgressUpdate),
) -> Result<TreeArtifacts> {
    if addresses.is_empty() {
        return Err(Error::EmptyInput);
    }

    let ranges = chunk_ranges(addresses.len(), opts);
    let worker_count = ranges.len();
    tracing::debug!(
        address_count = addresses.len(),
        worker_count,
        "dispatching proof workers"
    );

    let shared: Arc<[String]> = addresses.into();
    let (tx, rx) = mpsc::channel();
    let mut handles = Vec::with_capacity(worker_count);
    for (worker, range) in ranges.into_iter().enumerate() {
        let addresses = Arc::clone(&shared);
        let tx = tx.clone();
        let report_interval = opts.report_interval.max(1);
        handles.push(thread::spawn(move || {
            run_worker(worker, &addresses, range, report_interval, &tx);
        }));
    }
    // Only workers hold senders now, so the receive loop observes a
    // disconnect if every worker dies without a terminal message.
    drop(tx);

    let mut aggregator = ProgressAggregator::new(shared.len(), 0);
    let mut merged: BTreeMap<String, Vec<[u8; 32]>> = BTreeMap::new();
    let mut worker_root: Option<[u8; 32]> = None;
    let mut finished = 0usize;
    let mut failure: Option<Error> = None;

    while finished < worker_count {
        let message = match rx.recv() {
            Ok(message) => message,
            // A worker panicked and dropped its sender without reporting.
            Err(_) => {
                failure.get_or_insert(Error::WorkerFailure(
                    "worker exited without a terminal message".to_string(),
                ));
                break;
            }
        };
        match message {
            WorkerMessage::Progress(event) => {
                on_progress(aggregator.record(event));
            }
            WorkerMessage::Finished { worker, result } => {
                finished += 1;
                match result {
                    Ok(output) => {
                        match worker_root {
                            None => worker_root = Some(output.root),
                            Some(root) if root != output.root => {
                                tracing::error!(worker, "divergent worker root");
                                failure.get_or_insert(Error::RootMismatch);
                            }
                            Some(_) => {}
                        }
                        merged.extend(output.proofs);
                    }
                    Err(err) => {
                        tracing::error!(worker, error = %err, "worker reported failure");
                        // Bad input surfaces as what it is; everything else
                        // is a worker failure.
                        failure.get_or_insert(match err {
                            Error::Hex(_) => err,
                            other => Error::WorkerFailure(format!("worker {worker}: {other}")),
                        });
                    }
                }
            }
        }
    }

    // Every thread is joined on every path so a failed run leaks nothing.
    for handle in handles {
        if handle.join().is_err() {
            failure.get_or_insert(Error::WorkerFailure("worker panicked".to_string()));
        }
    }
    if let Some(err) = failure {
        return Err(err);
    }

    // One authoritative build for the published root. Workers hashed the
    // same sequence, so any divergence here is an internal bug.
    let tree = MerkleTree::from_addresses(&shared)?;
    let root = tree.root();
    if worker_root.is_some_and(|r| r != root) {
        tracing::error!("canonical root differs from worker roots");
        return Err(Error::RootMismatch);
    }

    Ok(TreeArtifacts {
        root,
        proofs: merged,
    })
}

fn run_worker(
    worker: usize,
    addresses: &[String],
    range: Range<usize>,
    report_interval: usize,
    tx: &Sender<WorkerMessage>,
) {
    let result = worker_proofs(addresses, range, report_interval, |increment| {
        // Coordinator gone means the run already failed; nothing to do.
        let _ = tx.send(WorkerMessage::Progress(ProgressEvent { worker, increment }));
    });
    let _ = tx.send(WorkerMessage::Finished { worker, result });
}

/// Build the full tree and extract proofs for `range` only.
fn worker_proofs(
    addresses: &[String],
    range: Range<usize>,
    report_interval: usize,
    mut report: impl FnMut(usize),
) -> Result<WorkerOutput> {
    let tree = MerkleTree::from_addresses(addresses)?;

    let mut proofs = BTreeMap::new();
    let mut since_report = 0usize;
    for address in &addresses[range] {
        let leaf = leaf_hash(address)?;
        proofs.insert(canonical_address(address), tree.proof(&leaf)?);

        since_report += 1;
        if since_report == report_interval {
            report(since_report);
            since_report = 0;
        }
    }
    // Flush the remainder so the overall percentage converges to 100.
    if since_report > 0 {
        report(since_report);
    }

    Ok(WorkerOutput {
        root: tree.root(),
        proofs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::verify;

    fn addr(index: usize) -> String {
        format!("0x{:040x}", index + 1)
    }

    fn addrs(count: usize) -> Vec<String> {
        (0..count).map(addr).collect()
    }

    #[test]
    fn chunks_partition_the_range_exactly() {
        let combos = [
            (1usize, 1usize, 1usize),
            (10, 3, 2),
            (10, 3, 5),
            (1000, 100, 5),
            (1001, 100, 5),
            (999, 1000, 5),
            (5000, 1000, 5),
            (5001, 1000, 5),
            (7, 1, 3),
            (5, 1, 4),
            (2, 1, 8),
        ];
        for (len, desired_chunk_size, max_workers) in combos {
            let opts = RunOptions {
                max_workers,
                desired_chunk_size,
                report_interval: 100,
            };
            let ranges = chunk_ranges(len, &opts);
            assert!(!ranges.is_empty());
            assert!(ranges.len() <= max_workers);
            let mut next = 0;
            for range in &ranges {
                assert_eq!(range.start, next, "gap or overlap at {range:?} (len={len})");
                assert!(range.end >= range.start);
                next = range.end;
            }
            assert_eq!(next, len, "ranges must cover [0, {len})");
        }
    }

    #[test]
    fn empty_input_fails_fast() {
        assert!(matches!(
            generate(&[], &RunOptions::default()),
            Err(Error::EmptyInput)
        ));
    }

    #[test]
    fn every_address_gets_a_verifying_proof() {
        let addresses = addrs(53);
        let opts = RunOptions {
            max_workers: 4,
            desired_chunk_size: 10,
            report_interval: 7,
        };
        let artifacts = generate(&addresses, &opts).unwrap();
        assert_eq!(artifacts.proofs.len(), addresses.len());
        for address in &addresses {
            let leaf = leaf_hash(address).unwrap();
            let proof = &artifacts.proofs[&canonical_address(address)];
            assert!(verify(&artifacts.root, &leaf, proof));
        }
    }

    #[test]
    fn parallel_run_matches_single_worker_run() {
        let addresses = addrs(217);
        let parallel = generate(
            &addresses,
            &RunOptions {
                max_workers: 5,
                desired_chunk_size: 50,
                report_interval: 100,
            },
        )
        .unwrap();
        let single = generate(
            &addresses,
            &RunOptions {
                max_workers: 1,
                desired_chunk_size: 1000,
                report_interval: 100,
            },
        )
        .unwrap();
        assert_eq!(parallel.root, single.root);
        assert_eq!(parallel.proofs, single.proofs);
    }

    #[test]
    fn repeated_runs_are_deterministic() {
        let addresses = addrs(64);
        let opts = RunOptions::default();
        let first = generate(&addresses, &opts).unwrap();
        let second = generate(&addresses, &opts).unwrap();
        assert_eq!(first.root, second.root);
        assert_eq!(first.proofs, second.proofs);
    }

    #[test]
    fn proof_table_keys_are_canonical() {
        let addresses = vec![
            "0xABCDEF0123456789ABCDEF0123456789ABCDEF01".to_string(),
            "abcdef0123456789abcdef0123456789abcdef02".to_string(),
        ];
        let artifacts = generate(&addresses, &RunOptions::default()).unwrap();
        assert!(artifacts
            .proofs
            .contains_key("0xabcdef0123456789abcdef0123456789abcdef01"));
        assert!(artifacts
            .proofs
            .contains_key("0xabcdef0123456789abcdef0123456789abcdef02"));
    }

    #[test]
    fn progress_converges_to_100() {
        let addresses = addrs(250);
        let mut last = 0u8;
        let mut calls = 0usize;
        generate_with_progress(
            &addresses,
            &RunOptions {
                max_workers: 3,
                desired_chunk_size: 100,
                report_interval: 25,
            },
            |update| {
                assert!(update.percent >= last);
                last = update.percent;
                calls += 1;
            },
        )
        .unwrap();
        assert_eq!(last, 100);
        assert!(calls > 0);
    }

    #[test]
    fn malformed_address_fails_the_run() {
        let mut addresses = addrs(10);
        addresses[7] = "0xnot_an_address".to_string();
        let err = generate(&addresses, &RunOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Hex(_)), "got {err:?}");
    }

    #[test]
    fn concrete_three_address_scenario() {
        let addresses = vec![
            format!("0x{}", "aa".repeat(19) + "01"),
            format!("0x{}", "bb".repeat(19) + "02"),
            format!("0x{}", "cc".repeat(19) + "03"),
        ];
        let opts = RunOptions::default();

        let first = generate(&addresses, &opts).unwrap();
        let second = generate(&addresses, &opts).unwrap();
        assert_eq!(first.root, second.root);

        // ceil(log2(3)) siblings for the middle address.
        let middle = canonical_address(&addresses[1]);
        let proof = &first.proofs[&middle];
        assert_eq!(proof.len(), 2);

        let leaf = leaf_hash(&addresses[1]).unwrap();
        assert!(verify(&first.root, &leaf, proof));

        // Same set, different order: different pairing, different root.
        let reordered = vec![
            addresses[2].clone(),
            addresses[0].clone(),
            addresses[1].clone(),
        ];
        let other = generate(&reordered, &opts).unwrap();
        assert_ne!(first.root, other.root);
        assert!(!verify(&other.root, &leaf, proof));
    }
}
