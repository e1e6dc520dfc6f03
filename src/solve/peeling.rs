//! Hypergraph peeling: repeatedly remove vertices of degree 1, recording
//! an elimination order with a distinguished "hinge" vertex per removed
//! edge. A CSR adjacency (`deg`/`off`/`edges`) peeling loop generalized
//! to any `degree.arity()`.

use crate::solve::System;

#[derive(Clone, Copy)]
pub struct PeelStep {
    pub edge: u32,
    /// Index into the edge's variable list of the hinge (the variable
    /// that had degree 1 when this edge was peeled).
    pub hinge_pos: u8,
}

pub struct PeelResult {
    /// Elimination order, in the order edges were peeled (i.e. hinge
    /// depends only on vertices peeled *before* it, so back-substitution
    /// walks this stack in reverse).
    pub order: Vec<PeelStep>,
    /// Edge ids that never reached degree 1 and so remain in the 2-core.
    pub residual_edges: Vec<usize>,
    /// Vertex ids with residual degree >= 2 after peeling.
    pub residual_vertices: Vec<u32>,
}

pub fn peel(system: &System) -> PeelResult {
    let m = system.num_vars;
    let mut deg = vec![0u32; m];
    for edge in &system.edges {
        for &v in edge {
            deg[v as usize] += 1;
        }
    }

    // CSR adjacency: vertex -> incident edge ids.
    let mut off = vec![0u32; m + 1];
    for v in 0..m {
        off[v + 1] = off[v] + deg[v];
    }
    let mut cursor = off.clone();
    let mut adj = vec![0u32; off[m] as usize];
    for (eid, edge) in system.edges.iter().enumerate() {
        for &v in edge {
            let pos = cursor[v as usize];
            adj[pos as usize] = eid as u32;
            cursor[v as usize] = pos + 1;
        }
    }

    let mut removed_edge = vec![false; system.edges.len()];
    let mut queue: Vec<u32> = (0..m as u32).filter(|&v| deg[v as usize] == 1).collect();
    let mut qhead = 0usize;
    let mut order = Vec::with_capacity(system.edges.len());

    while qhead < queue.len() {
        let v = queue[qhead];
        qhead += 1;
        if deg[v as usize] != 1 {
            continue; // degree dropped further since being queued
        }
        let start = off[v as usize] as usize;
        let end = off[v as usize + 1] as usize;
        let mut chosen_edge = None;
        for &eid in &adj[start..end] {
            if !removed_edge[eid as usize] {
                chosen_edge = Some(eid);
                break;
            }
        }
        let Some(eid) = chosen_edge else { continue };
        let edge = &system.edges[eid as usize];
        let hinge_pos = edge.iter().position(|&x| x == v).unwrap() as u8;
        removed_edge[eid as usize] = true;
        order.push(PeelStep { edge: eid, hinge_pos });
        for (pos, &u) in edge.iter().enumerate() {
            if pos as u8 == hinge_pos {
                continue;
            }
            deg[u as usize] -= 1;
            if deg[u as usize] == 1 {
                queue.push(u);
            }
        }
    }

    let residual_edges: Vec<usize> = (0..system.edges.len()).filter(|&e| !removed_edge[e]).collect();
    let residual_vertices: Vec<u32> = (0..m as u32).filter(|&v| deg[v as usize] >= 2).collect();

    PeelResult { order, residual_edges, residual_vertices }
}

/// Walks the peel stack in reverse, assigning each hinge so its edge's
/// XOR equation is satisfied given the other (already-assigned, or
/// still-zero if unassigned by peeling) endpoints. Vertices that peeling
/// never touches keep whatever the Gaussian-elimination pass (or zero)
/// left them at.
pub fn back_substitute(system: &System, peel: &PeelResult, solution: &mut super::Solution) {
    for step in peel.order.iter().rev() {
        let edge = &system.edges[step.edge as usize];
        let hinge = edge[step.hinge_pos as usize];
        let mut xor = system.known[step.edge as usize];
        for (pos, &v) in edge.iter().enumerate() {
            if pos as u8 == step.hinge_pos {
                continue;
            }
            xor ^= solution.values[v as usize];
        }
        solution.values[hinge as usize] = xor;
    }
}
