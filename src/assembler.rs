//! Parallel assembler: drives the solver across worker threads,
//! allocates each bucket's offset in `offset_and_seed` up front, and
//! reorders results back into strict bucket-index order before packing
//! them into the final `data` bit array. Wired with `crossbeam_channel`
//! bounded queues and `crossbeam::scope`, following a producer/worker/sink
//! pipeline idiom with bounded channels for explicit backpressure.

use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tracing::debug;

use crate::bits::BitVector;
use crate::config::{BuildConfig, Engine};
use crate::error::{Error, Result};
use crate::hash::Signature;
use crate::solve::{solve_with_retries, Degree};
use crate::store::{Bucket, BucketedHashStore};

/// `offset_and_seed[b]`: low 56 bits = prefix sum of `num_vars` for
/// buckets `< b`; top 8 bits = the retry attempt number that solved
/// bucket `b` (0 on the first try), from which [`crate::solve::seed_for_attempt`]
/// recovers the exact local seed used.
pub const OFFSET_MASK: u64 = (1u64 << 56) - 1;

#[inline]
pub fn pack_offset_seed(offset: u64, seed_byte: u8) -> u64 {
    debug_assert!(offset <= OFFSET_MASK);
    (offset & OFFSET_MASK) | ((seed_byte as u64) << 56)
}

#[inline]
pub fn unpack_offset(word: u64) -> u64 {
    word & OFFSET_MASK
}

#[inline]
pub fn unpack_seed(word: u64) -> u8 {
    (word >> 56) as u8
}

fn num_vars_for(size: usize, c: f64) -> usize {
    ((c * size as f64).ceil() as usize).max(size + 1)
}

struct WorkerResult {
    index: u32,
    seed_byte: u8,
    bits: BitVector,
}

/// Wraps a pending result for the reordering sink's min-heap: ordered
/// solely by bucket `index`, ascending (reversed so `BinaryHeap`, a
/// max-heap, pops the lowest index first).
struct HeapItem(WorkerResult);

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.0.index == other.0.index
    }
}
impl Eq for HeapItem {}
impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.0.index.cmp(&self.0.index)
    }
}

/// Assembled global tables, ready to be wrapped in a query artifact.
/// `signatures`, when `signature_check_bits > 0`, holds each ordinal's
/// masked second signature word, gathered in the same producer pass that
/// streams buckets into the solve pipeline.
pub struct Assembled {
    pub offset_and_seed: Vec<u64>,
    pub data: BitVector,
    pub signatures: Option<Vec<u64>>,
}

/// Drives the full producer/worker/sink pipeline directly off `store`:
/// the producer pulls one bucket at a time from `store.stream_buckets`
/// rather than requiring the whole key set's buckets materialized up
/// front, so peak memory stays bounded by the channels' capacity rather
/// than by `n`. A duplicate signature surfacing mid-stream discards the
/// in-flight pass (fresh channels, fresh pipeline) and restarts after the
/// store reseeds, up to `cfg.max_store_reseeds` times.
pub fn assemble<S>(
    store: &mut BucketedHashStore,
    cfg: &BuildConfig,
    signature_from_words: impl Fn(&[u64]) -> S + Send + Sync,
) -> Result<Assembled>
where
    S: Signature + Send,
{
    loop {
        match assemble_once(store, cfg, &signature_from_words) {
            Ok(assembled) => return Ok(assembled),
            Err(Error::DuplicateSignature { bucket }) => {
                store.reseed_after_duplicate(cfg.max_store_reseeds, bucket)?;
            }
            Err(e) => return Err(e),
        }
    }
}

fn assemble_once<S>(
    store: &mut BucketedHashStore,
    cfg: &BuildConfig,
    signature_from_words: &(impl Fn(&[u64]) -> S + Send + Sync),
) -> Result<Assembled>
where
    S: Signature + Send,
{
    let n = store.len();
    let num_buckets = store.bucket_count(cfg.bucket_size) as usize;
    let mut bucket_iter = store.stream_buckets(cfg.bucket_size)?;
    let c = cfg.c();

    let offset_and_seed: Mutex<Vec<u64>> = Mutex::new(vec![0u64; num_buckets + 1]);

    let worker_count = cfg.worker_count();
    let (work_tx, work_rx) = crossbeam_channel::bounded::<(u32, usize, Bucket)>(8 * worker_count);
    let (result_tx, result_rx) = crossbeam_channel::bounded::<WorkerResult>(8 * worker_count);
    let progress = AtomicUsize::new(0);
    let degree = match cfg.engine {
        Engine::Peeling { degree } => degree,
        Engine::Chd => Degree::Three, // unused by the CHD arm below
    };
    let width = cfg.value_width;
    let max_retries = cfg.max_solver_retries;
    let global_seed = cfg.global_seed;
    let engine = cfg.engine;
    let check_bits = cfg.signature_check_bits;
    let check_mask = if check_bits == 0 { 0 } else if check_bits >= 64 { u64::MAX } else { (1u64 << check_bits) - 1 };

    let first_error: Mutex<Option<Error>> = Mutex::new(None);
    let check_table: Mutex<Option<Vec<u64>>> = Mutex::new(None);

    crossbeam_utils::thread::scope(|scope| {
        // Producer: pulls one bucket at a time from the store's streaming
        // iterator, reserves its slice of `offset_and_seed`, folds its
        // signatures into the check table (when enabled), and only then
        // hands it to a worker.
        let producer_offsets = &offset_and_seed;
        let producer_first_error = &first_error;
        let producer_check_table = &check_table;
        scope.spawn(move |_| {
            let offset_and_seed = producer_offsets;
            let first_error = producer_first_error;
            let check_table = producer_check_table;
            let mut running = 0u64;
            let mut table = if check_bits > 0 { Some(vec![0u64; n as usize]) } else { None };
            loop {
                match bucket_iter.next_bucket() {
                    Ok(Some(bucket)) => {
                        let nv = match engine {
                            Engine::Peeling { .. } => num_vars_for(bucket.size(), c),
                            Engine::Chd => bucket.size().max(1),
                        };
                        {
                            let mut offs = offset_and_seed.lock().unwrap();
                            offs[bucket.index as usize] = pack_offset_seed(running, 0);
                            running += nv as u64;
                            offs[bucket.index as usize + 1] = pack_offset_seed(running, 0);
                        }
                        if let Some(table) = &mut table {
                            for (words, &value) in bucket.signatures.iter().zip(bucket.values.iter()) {
                                table[value as usize] = words.get(1).copied().unwrap_or(0) & check_mask;
                            }
                        }
                        let index = bucket.index;
                        if work_tx.send((index, nv, bucket)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        *first_error.lock().unwrap() = Some(e);
                        break;
                    }
                }
            }
            *check_table.lock().unwrap() = table;
            drop(work_tx);
        });

        // Workers
        for _ in 0..worker_count {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            let signature_from_words = &signature_from_words;
            let first_error = &first_error;
            let progress = &progress;
            scope.spawn(move |_| {
                while let Ok((i, num_vars, bucket)) = work_rx.recv() {
                    if first_error.lock().unwrap().is_some() {
                        break;
                    }
                    let sigs: Vec<S> = bucket.signatures.iter().map(|w| signature_from_words(w)).collect();
                    let values = bucket.values.clone();
                    let local_seed_base = crate::hash::mix_seed(global_seed, i as u64);

                    let outcome = match engine {
                        Engine::Peeling { .. } => {
                            solve_with_retries(&sigs, &values, local_seed_base, degree, num_vars, width, i, max_retries)
                        }
                        Engine::Chd => {
                            // CHD buckets here are treated as degree-3 peeling
                            // buckets too; the dedicated chunked CHD path
                            // (src/chd) is driven separately by
                            // `ChdFunction::build` for whole-key-set chunks.
                            solve_with_retries(&sigs, &values, local_seed_base, Degree::Three, num_vars, width, i, max_retries)
                        }
                    };

                    match outcome {
                        Ok((solution, attempt)) => {
                            let mut bits = BitVector::new();
                            for v in &solution.values {
                                bits.append_bits(*v, width);
                            }
                            let seed_byte = attempt;
                            debug!(bucket = i, num_vars, attempt, "solved bucket");
                            if result_tx.send(WorkerResult { index: i, seed_byte, bits }).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            *first_error.lock().unwrap() = Some(e);
                            break;
                        }
                    }
                    progress.fetch_add(1, Ordering::Relaxed);
                }
                drop(result_tx);
            });
        }
        drop(result_tx);
        drop(work_rx);

        // Sink: reorder strictly by bucket index.
        let data = Mutex::new(BitVector::new());
        {
            let mut heap: BinaryHeap<HeapItem> = BinaryHeap::new();
            let mut next_index = 0u32;
            let mut data_guard = data.lock().unwrap();
            while let Ok(r) = result_rx.recv() {
                heap.push(HeapItem(r));
                while let Some(top) = heap.peek() {
                    if top.0.index != next_index {
                        break;
                    }
                    let HeapItem(r) = heap.pop().unwrap();
                    data_guard.append_bitvector(&r.bits);
                    let mut offs = offset_and_seed.lock().unwrap();
                    offs[r.index as usize] = pack_offset_seed(unpack_offset(offs[r.index as usize]), r.seed_byte);
                    next_index += 1;
                }
            }
        }

        let final_data = data.into_inner().unwrap();
        let final_offsets = offset_and_seed.into_inner().unwrap();
        let final_signatures = check_table.into_inner().unwrap();
        (final_data, final_offsets, final_signatures)
    })
    .map(|(data, offset_and_seed, signatures)| Ok(Assembled { offset_and_seed, data, signatures }))
    .unwrap_or_else(|_| Err(Error::TempIo(std::io::Error::new(std::io::ErrorKind::Other, "worker thread panicked"))))
    .and_then(|assembled| {
        if let Some(e) = first_error.into_inner().unwrap() {
            Err(e)
        } else {
            Ok(assembled)
        }
    })
}
