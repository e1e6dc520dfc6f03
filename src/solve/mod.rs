//! Random-graph / linear-system solver: builds a 3- or 4-uniform
//! hypergraph per bucket, peels it, and falls back to lazy Gaussian
//! elimination on the residual 2-core. A per-bucket routine with a
//! configurable degree and a Gaussian fallback for the residual 2-core
//! that peeling alone cannot resolve.

pub mod peeling;
pub mod gauss;

use crate::config::Degree;
use crate::error::{Error, Result};
use crate::hash::{spread, Signature};

/// One bucket's equation set: `edges[e]` holds the `degree` variable
/// indices picked for signature `e`, and `known[e]` is its known term
/// (the value XORed into the solution along that edge).
pub struct System {
    pub degree: Degree,
    pub num_vars: usize,
    pub edges: Vec<Vec<u32>>,
    pub known: Vec<u64>,
    pub width: u8,
}

/// Derives `r` variable indices in `[0, num_vars)` from a rehashed word
/// `h`, by partitioning `[0, num_vars)` into `r` equal parts and picking
/// one index per part. This r-partite construction avoids degenerate
/// parallel edges, and is shared verbatim between build time
/// ([`System::build`]) and the query path, since both must derive the
/// same indices from the same `(h, num_vars, r)` triple.
pub fn variable_indices(h: u64, num_vars: usize, r: usize) -> Vec<u32> {
    let num_vars = num_vars.max(1) as u64;
    let part_size = (num_vars + r as u64 - 1) / r as u64;
    let mut idx = Vec::with_capacity(r);
    for part in 0..r {
        // Clamped so a bucket smaller than `r` variables (possible at
        // the very small end of a build, e.g. an empty or singleton
        // bucket) still only ever indexes within `[0, num_vars)`.
        let part_base = (part as u64 * part_size).min(num_vars - 1);
        let part_len = part_size.min(num_vars - part_base).max(1);
        let sub_h = crate::hash::splitmix64(h ^ (part as u64).wrapping_mul(0x9E3779B97F4A7C15));
        let v = (part_base + spread(sub_h, part_len)).min(num_vars - 1);
        idx.push(v as u32);
    }
    idx
}

impl System {
    /// Builds the hypergraph for one bucket: rehash every signature
    /// under `local_seed`, then derive `degree` variable indices per
    /// signature via [`variable_indices`].
    pub fn build<S: Signature>(
        signatures: &[S],
        values: &[u64],
        local_seed: u64,
        degree: Degree,
        num_vars: usize,
        width: u8,
    ) -> Self {
        let r = degree.arity();
        let mut edges = Vec::with_capacity(signatures.len());
        let mut known = Vec::with_capacity(signatures.len());
        for (i, sig) in signatures.iter().enumerate() {
            let h = sig.rehash(local_seed);
            edges.push(variable_indices(h, num_vars, r));
            let value = values.get(i).copied().unwrap_or(i as u64);
            known.push(value);
        }
        Self { degree, num_vars, edges, known, width }
    }

    pub fn num_eqs(&self) -> usize {
        self.edges.len()
    }
}

/// A solved bucket: a width-`w` value for every one of `num_vars`
/// variables.
#[derive(Clone, Debug)]
pub struct Solution {
    pub values: Vec<u64>,
}

impl Solution {
    pub fn new(num_vars: usize) -> Self {
        Self { values: vec![0; num_vars] }
    }
}

/// Attempts one solve of `system`: peel first, then lazy Gaussian
/// elimination on whatever 2-core remains. Returns `Unsolvable` if the
/// residual matrix is singular — the caller retries with a new
/// `local_seed`.
pub fn solve(system: &System, bucket_index: u32, local_seed: u64) -> Result<Solution> {
    let peel = peeling::peel(system);
    if peel.residual_edges.is_empty() {
        let mut solution = Solution::new(system.num_vars);
        peeling::back_substitute(system, &peel, &mut solution);
        Ok(solution)
    } else {
        let mut solution = gauss::eliminate(system, &peel.residual_edges, &peel.residual_vertices, bucket_index, local_seed)?;
        peeling::back_substitute(system, &peel, &mut solution);
        Ok(solution)
    }
}

/// Bucket-local seed step used by both the build-time retry loop and the
/// query path's reconstruction of a bucket's effective seed from its
/// stored attempt byte.
pub const SEED_STEP: u64 = 0x9E3779B97F4A7C15;

/// Derives attempt `attempt`'s effective local seed from a bucket's base
/// seed. The query path calls this with the attempt byte read back from
/// `offset_and_seed`, so the formula must stay a pure function of
/// `(base_local_seed, attempt)` rather than accumulate state across
/// attempts.
#[inline]
pub fn seed_for_attempt(base_local_seed: u64, attempt: u8) -> u64 {
    base_local_seed.wrapping_add(SEED_STEP.wrapping_mul(attempt as u64))
}

/// Runs `solve` with a seed-step retry loop: on `Unsolvable`, derive the
/// next attempt's seed from `seed_for_attempt` and rebuild+resolve the
/// hypergraph, up to `max_retries` times (capped at 255, since only a
/// single byte survives into the artifact per bucket).
pub fn solve_with_retries<S: Signature>(
    signatures: &[S],
    values: &[u64],
    base_local_seed: u64,
    degree: Degree,
    num_vars: usize,
    width: u8,
    bucket_index: u32,
    max_retries: u32,
) -> Result<(Solution, u8)> {
    let cap = max_retries.min(255);
    for attempt in 0..=cap {
        let attempt_byte = attempt as u8;
        let seed = seed_for_attempt(base_local_seed, attempt_byte);
        let system = System::build(signatures, values, seed, degree, num_vars, width);
        match solve(&system, bucket_index, seed) {
            Ok(solution) => return Ok((solution, attempt_byte)),
            Err(Error::SolverUnsolvable { .. }) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(Error::SeedExhausted { bucket: bucket_index })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_sig2;

    fn build_signatures(n: usize, seed: u64) -> Vec<crate::hash::Sig2> {
        (0..n).map(|i| hash_sig2(format!("key-{i}").as_bytes(), seed)).collect()
    }

    #[test]
    fn small_bucket_solves_degree3() {
        let sigs = build_signatures(50, 7);
        let values: Vec<u64> = (0..50).collect();
        let num_vars = ((1.10 * 50.0).ceil() as usize).max(51);
        let (solution, attempt) =
            solve_with_retries(&sigs, &values, 0xABCD, Degree::Three, num_vars, 32, 0, 200).unwrap();
        let seed = seed_for_attempt(0xABCD, attempt);

        for (i, sig) in sigs.iter().enumerate() {
            let system = System::build(&sigs, &values, seed, Degree::Three, num_vars, 32);
            let edge = &system.edges[i];
            let xor = edge.iter().fold(0u64, |acc, &v| acc ^ solution.values[v as usize]);
            assert_eq!(xor, values[i], "equation for signature {} unsatisfied ({sig:?})", i);
        }
    }

    #[test]
    fn small_bucket_solves_degree4() {
        let sigs = build_signatures(80, 11);
        let values: Vec<u64> = (0..80).collect();
        let num_vars = ((1.03 * 80.0).ceil() as usize).max(81);
        let (solution, attempt) =
            solve_with_retries(&sigs, &values, 0x1234, Degree::Four, num_vars, 32, 0, 200).unwrap();
        let seed = seed_for_attempt(0x1234, attempt);
        let system = System::build(&sigs, &values, seed, Degree::Four, num_vars, 32);
        for (i, edge) in system.edges.iter().enumerate() {
            let xor = edge.iter().fold(0u64, |acc, &v| acc ^ solution.values[v as usize]);
            assert_eq!(xor, values[i]);
        }
    }
}
