//! Undirected graph of station-to-station radio links.
//!
//! Built from heard frames: each frame's digipeater path is turned into a
//! relay chain ending at the local station. Edges are deduplicated and the
//! graph only grows. Safe to share between ingestion threads via `&self`.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::{debug, warn};

use crate::frame::Frame;
use crate::types::{AprsError, Result, StationId};

/// Deepest relay chain the inference policy reconstructs.
pub const MAX_INFERRED_HOPS: usize = 3;

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// Unordered station pair, stored with `a` sorting before `b`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Edge {
    pub a: StationId,
    pub b: StationId,
}

impl Edge {
    /// Canonical edge for a pair, `None` for a self-edge.
    ///
    /// Ordering is case-insensitive with a case-sensitive tie-break, so
    /// `("abc", "ABC")` and `("ABC", "abc")` land on the same edge.
    pub fn new(n1: &str, n2: &str) -> Option<Self> {
        if n1 == n2 {
            return None;
        }
        let (a, b) = match station_cmp(n1, n2) {
            Ordering::Less => (n1, n2),
            _ => (n2, n1),
        };
        Some(Edge {
            a: a.to_string(),
            b: b.to_string(),
        })
    }

    /// GraphViz DOT edge line.
    pub fn to_dot(&self) -> String {
        format!("\t\"{}\" -- \"{}\";\n", self.a, self.b)
    }
}

fn station_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

// ---------------------------------------------------------------------------
// StationGraph
// ---------------------------------------------------------------------------

/// Deduplicated station graph: vertex set plus undirected edge set.
#[derive(Debug, Default)]
pub struct StationGraph {
    vertices: RwLock<BTreeSet<StationId>>,
    edges: RwLock<BTreeSet<Edge>>,
}

impl StationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the edge between two stations. Self-edges are ignored.
    ///
    /// Returns true if the edge was not already present.
    pub fn add_edge(&self, n1: &str, n2: &str) -> bool {
        let Some(edge) = Edge::new(n1, n2) else {
            return false;
        };

        {
            let mut vertices = write(&self.vertices);
            vertices.insert(edge.a.clone());
            vertices.insert(edge.b.clone());
        }

        write(&self.edges).insert(edge)
    }

    pub fn vertex_count(&self) -> usize {
        read(&self.vertices).len()
    }

    pub fn edge_count(&self) -> usize {
        read(&self.edges).len()
    }

    pub fn contains_edge(&self, n1: &str, n2: &str) -> bool {
        Edge::new(n1, n2).is_some_and(|e| read(&self.edges).contains(&e))
    }

    /// Snapshot of all edges.
    pub fn edges(&self) -> Vec<Edge> {
        read(&self.edges).iter().cloned().collect()
    }

    /// Snapshot of all vertices.
    pub fn vertices(&self) -> Vec<StationId> {
        read(&self.vertices).iter().cloned().collect()
    }

    /// Render the graph in GraphViz DOT format.
    pub fn output_graph(&self) -> String {
        let edges = read(&self.edges);
        let mut out = String::from("graph G {\n\n");
        for edge in edges.iter() {
            out.push_str(&edge.to_dot());
        }
        out.push('}');
        out
    }

    /// Add the relay chain implied by a heard frame, ending at `me`.
    ///
    /// | used hops | edges                                               |
    /// |-----------|-----------------------------------------------------|
    /// | 0         | me-src                                              |
    /// | 1         | last-src, me-last                                   |
    /// | 2         | d0-src, last-d0, me-last                            |
    /// | 3         | d0-src, d1-d0, last-d1, me-last                     |
    /// | >3        | none, `UnsupportedTopology`                         |
    ///
    /// Returns the number of edges newly inserted.
    pub fn infer_topology(&self, me: &str, frame: &Frame) -> Result<usize> {
        let chain = relay_chain(me, frame)?;
        let mut added = 0;
        for pair in chain.windows(2) {
            if self.add_edge(pair[1], pair[0]) {
                added += 1;
            }
        }
        debug!(src = %frame.src, hops = frame.digi_count(), added, "topology inferred");
        Ok(added)
    }

    /// Like `infer_topology`, but logs and skips unsupported paths.
    pub fn observe(&self, me: &str, frame: &Frame) -> usize {
        match self.infer_topology(me, frame) {
            Ok(added) => added,
            Err(e) => {
                warn!(src = %frame.src, path = %frame.path_string(), "{e}, skipped");
                0
            }
        }
    }
}

/// Station chain from the source to the local station, in relay order.
fn relay_chain<'a>(me: &'a str, frame: &'a Frame) -> Result<Vec<&'a str>> {
    let count = frame.digi_count();
    if count > MAX_INFERRED_HOPS {
        return Err(AprsError::UnsupportedTopology { count });
    }

    let mut chain = vec![frame.src.as_str()];
    // All hops before the last used one are taken to have relayed as well.
    chain.extend(frame.digis[..count].iter().map(|d| d.id.as_str()));
    chain.push(me);
    Ok(chain)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    // Inserts leave the set valid at every step, so a poisoned lock is still usable.
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
