//! Lazy Gaussian elimination on the residual 2-core left after peeling.
//! Each equation is a sparse set of variable indices plus a known `u64`
//! term; row addition is symmetric difference of the index sets XORed
//! with the known terms, which — because variables are `w`-bit words,
//! not single GF(2) bits — simultaneously solves all `w` bit-planes of
//! the system at once. Pivoting is "lazy": the variable with the fewest
//! remaining occurrences is eliminated next, deferring heavier rows to
//! minimize fill-in.

use hashbrown::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::solve::System;

#[derive(Clone)]
struct Row {
    vars: Vec<u32>,
    known: u64,
}

fn sym_diff(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

pub fn eliminate(
    system: &System,
    residual_edges: &[usize],
    residual_vertices: &[u32],
    bucket_index: u32,
    local_seed: u64,
) -> Result<super::Solution> {
    let mut rows: Vec<Row> = residual_edges
        .iter()
        .map(|&e| {
            let mut vars = system.edges[e].clone();
            vars.sort_unstable();
            Row { vars, known: system.known[e] }
        })
        .collect();

    let mut var_rows: HashMap<u32, HashSet<usize>> = HashMap::new();
    for &v in residual_vertices {
        var_rows.insert(v, HashSet::new());
    }
    for (r, row) in rows.iter().enumerate() {
        for &v in &row.vars {
            var_rows.entry(v).or_default().insert(r);
        }
    }

    let mut active: HashSet<usize> = (0..rows.len()).collect();
    let mut pivots: Vec<(u32, Vec<u32>, u64)> = Vec::with_capacity(rows.len());

    while !active.is_empty() {
        let mut best_var = None;
        let mut best_count = usize::MAX;
        for (&v, rowset) in &var_rows {
            let cnt = rowset.iter().filter(|r| active.contains(r)).count();
            if cnt > 0 && cnt < best_count {
                best_count = cnt;
                best_var = Some(v);
            }
        }
        let Some(pivot_var) = best_var else {
            // No variable occurs in any active row: every remaining row
            // must already be the zero row. `0 = known` is a
            // contradiction unless `known == 0`.
            for &r in &active {
                if rows[r].known != 0 {
                    return Err(Error::SolverUnsolvable { bucket: bucket_index, seed: local_seed });
                }
            }
            break;
        };

        let candidates = &var_rows[&pivot_var];
        let pivot_row_idx = *candidates
            .iter()
            .filter(|r| active.contains(r))
            .min_by_key(|&&r| rows[r].vars.len())
            .expect("pivot_var had a positive active count");

        let pivot_row = rows[pivot_row_idx].clone();
        active.remove(&pivot_row_idx);

        let affected: Vec<usize> = var_rows[&pivot_var].iter().filter(|&&r| active.contains(&r)).copied().collect();
        for r in affected {
            let old_vars = rows[r].vars.clone();
            let new_vars = sym_diff(&old_vars, &pivot_row.vars);
            let old_set: HashSet<u32> = old_vars.iter().copied().collect();
            let new_set: HashSet<u32> = new_vars.iter().copied().collect();
            for &v in old_set.difference(&new_set) {
                if let Some(s) = var_rows.get_mut(&v) {
                    s.remove(&r);
                }
            }
            for &v in new_set.difference(&old_set) {
                var_rows.entry(v).or_default().insert(r);
            }
            rows[r].known ^= pivot_row.known;
            rows[r].vars = new_vars;
        }

        let remaining: Vec<u32> = pivot_row.vars.iter().copied().filter(|&v| v != pivot_var).collect();
        pivots.push((pivot_var, remaining, pivot_row.known));
    }

    let mut solution = super::Solution::new(system.num_vars);
    for (pivot_var, remaining, known) in pivots.iter().rev() {
        let mut xor = *known;
        for &v in remaining {
            xor ^= solution.values[v as usize];
        }
        solution.values[*pivot_var as usize] = xor;
    }
    Ok(solution)
}
