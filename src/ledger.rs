// Flowsched: deadline-aware flow scheduling for data-center networks
// Copyright (C) 2024 Flowsched Contributors
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! The time-indexed residual-capacity ledger: the only piece of mutable state in this crate.
//!
//! Per edge, the ledger keeps a sorted sequence of `(time, rate)` breakpoints describing the
//! edge's residual capacity as a left-closed, right-open piecewise-constant function of time.
//! Two sentinels are always present: `(0, Capacity(e))` and `(+inf, 0)`. A process-wide sorted
//! set of event times is kept alongside, as an over-approximation of the union of all edges'
//! breakpoints (see [`Ledger::event_times`]).

use std::collections::BTreeSet;
use std::collections::HashMap;

use thiserror::Error;

use crate::topology::Topology;
use crate::{EdgeId, Rate, Time};

/// Errors raised by [`Ledger`] methods when asked about an edge that isn't part of the topology
/// the ledger was built from. Reaching this is always a caller bug — every edge this crate's own
/// path search and validation produce comes straight from the [`Topology`] the ledger was built
/// over — but `Ledger`'s accessors are public and reachable with an arbitrary [`EdgeId`], so it is
/// handled as a typed error rather than a panic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// `edge` is not present in this ledger's topology.
    #[error("edge {0:?} not present in this ledger's topology")]
    UnknownEdge(EdgeId),
}

/// Time-indexed residual capacity of every edge in a [`Topology`], plus the global event set.
///
/// The ledger is the only mutable resource in this crate: [`Ledger::commit`] is its only mutator.
/// `Ledger::reset` restores it to the fully-idle state so that independent algorithm runs over
/// the same topology do not see each other's commitments.
#[derive(Debug, Clone)]
pub struct Ledger {
    profiles: HashMap<EdgeId, Vec<(Time, Rate)>>,
    events: BTreeSet<Time>,
}

impl Ledger {
    /// Build a fresh ledger for `topology`, with every edge idle (residual == capacity
    /// everywhere).
    pub fn new(topology: &Topology) -> Self {
        let mut ledger = Ledger {
            profiles: HashMap::new(),
            events: BTreeSet::new(),
        };
        ledger.reset(topology);
        ledger
    }

    /// Reinitialize every edge to `{(0, Capacity(e)), (+inf, 0)}` and the event set to
    /// `{0, +inf}`.
    pub fn reset(&mut self, topology: &Topology) {
        self.profiles.clear();
        for (u, v) in topology.edges() {
            let cap = topology
                .edge_attrs(u, v)
                .expect("edge reported by Topology::edges must have attrs")
                .capacity;
            self.profiles.insert(
                (u.to_string(), v.to_string()),
                vec![(Time::from(0.0), cap), (Time::from(f64::INFINITY), 0.0)],
            );
        }
        self.events.clear();
        self.events.insert(Time::from(0.0));
        self.events.insert(Time::from(f64::INFINITY));
    }

    /// The residual capacity of `edge` at time `t` (the rate of the last breakpoint `<= t`).
    ///
    /// # Errors
    /// Returns [`LedgerError::UnknownEdge`] if `edge` is not part of the topology this ledger was
    /// built from.
    pub fn residual_at(&self, edge: &EdgeId, t: Time) -> Result<Rate, LedgerError> {
        let bp = self
            .profiles
            .get(edge)
            .ok_or_else(|| LedgerError::UnknownEdge(edge.clone()))?;
        let idx = bp.partition_point(|&(bt, _)| bt <= t);
        Ok(bp[idx.saturating_sub(1)].1)
    }

    /// The full breakpoint sequence of `edge`, sorted ascending by time.
    ///
    /// # Errors
    /// Returns [`LedgerError::UnknownEdge`] if `edge` is not part of the topology this ledger was
    /// built from.
    pub fn breakpoints(&self, edge: &EdgeId) -> Result<&[(Time, Rate)], LedgerError> {
        self.profiles
            .get(edge)
            .map(Vec::as_slice)
            .ok_or_else(|| LedgerError::UnknownEdge(edge.clone()))
    }

    /// The global, process-wide sorted set of event times (a superset of every edge's own
    /// breakpoint times).
    pub fn event_times(&self) -> impl Iterator<Item = Time> + '_ {
        self.events.iter().copied()
    }

    /// Commit a rate-allocation `plan` onto every edge in `path_edges`, subtracting the plan's
    /// rate from each edge's residual, pointwise in time, and folding every breakpoint of `plan`
    /// into the global event set.
    ///
    /// This is the only mutator of the ledger. `plan` must already be normalized (see
    /// [`crate::validate::alloc_trim`]): sorted ascending by time, starting with the sentinel
    /// `(-1, 0)`.
    ///
    /// # Errors
    /// Returns [`LedgerError::UnknownEdge`] if any edge in `path_edges` is not part of the
    /// topology this ledger was built from. No edges are committed if this happens.
    pub fn commit(&mut self, path_edges: &[EdgeId], plan: &[(Time, Rate)]) -> Result<(), LedgerError> {
        for edge in path_edges {
            if !self.profiles.contains_key(edge) {
                return Err(LedgerError::UnknownEdge(edge.clone()));
            }
        }
        for &(t, _) in plan {
            self.events.insert(t);
        }
        for edge in path_edges {
            let bp = &self.profiles[edge];
            let merged = merge_subtract(bp, plan);
            self.profiles.insert(edge.clone(), merged);
        }
        Ok(())
    }

    /// Capture the current ledger state as a JSON-serializable [`LedgerSnapshot`], for saving a
    /// batch run's committed state without re-running the scheduler.
    #[cfg(feature = "serde")]
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            profiles: self
                .profiles
                .iter()
                .map(|(edge, bp)| {
                    (
                        edge.clone(),
                        bp.iter().map(|&(t, r)| (t.into_inner(), r)).collect(),
                    )
                })
                .collect(),
            events: self.events.iter().map(|t| t.into_inner()).collect(),
        }
    }

    /// Restore a ledger previously captured with [`Ledger::snapshot`]. `topology` must be the same
    /// topology the snapshot was taken against; edges present in `topology` but absent from
    /// `snapshot` are left at full residual capacity.
    #[cfg(feature = "serde")]
    pub fn from_snapshot(topology: &Topology, snapshot: &LedgerSnapshot) -> Self {
        let mut ledger = Ledger::new(topology);
        for (edge, bp) in &snapshot.profiles {
            ledger
                .profiles
                .insert(edge.clone(), bp.iter().map(|&(t, r)| (Time::from(t), r)).collect());
        }
        ledger.events = snapshot.events.iter().map(|&t| Time::from(t)).collect();
        ledger
    }
}

/// A JSON-serializable snapshot of a [`Ledger`]'s committed state.
///
/// Kept as a dedicated flat type rather than deriving `Serialize`/`Deserialize` directly on
/// [`Ledger`]: its `profiles` map is keyed by `(String, String)` edge pairs, which `serde_json`
/// cannot use as object keys, so the map is flattened into a `Vec` of pairs here instead.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LedgerSnapshot {
    profiles: Vec<(EdgeId, Vec<(f64, Rate)>)>,
    events: Vec<f64>,
}

#[cfg(feature = "serde")]
impl LedgerSnapshot {
    /// Serialize to a pretty-printed JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from a JSON string produced by [`LedgerSnapshot::to_json`].
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Compute the breakpoint sequence of `edge_bp(t) - plan(t)` for all `t`, over the union of both
/// sequences' breakpoint times.
///
/// This produces the same pointwise result as the two-cursor merge procedure the algorithm is
/// commonly described with; expressing it as "collect the union of breakpoint times, then replay
/// both piecewise-constant functions across it" is equivalent and avoids hand-rolling a
/// three-way cursor state machine.
fn merge_subtract(edge_bp: &[(Time, Rate)], plan: &[(Time, Rate)]) -> Vec<(Time, Rate)> {
    let mut times: BTreeSet<Time> = edge_bp.iter().map(|&(t, _)| t).collect();
    times.extend(plan.iter().map(|&(t, _)| t));

    let mut edge_cursor = 0usize;
    let mut plan_cursor = 0usize;
    let mut cur_edge_rate = edge_bp[0].1;
    let mut cur_plan_rate = plan[0].1;

    let mut result = Vec::with_capacity(times.len());
    for t in times {
        while edge_cursor + 1 < edge_bp.len() && edge_bp[edge_cursor + 1].0 <= t {
            edge_cursor += 1;
            cur_edge_rate = edge_bp[edge_cursor].1;
        }
        while plan_cursor + 1 < plan.len() && plan[plan_cursor + 1].0 <= t {
            plan_cursor += 1;
            cur_plan_rate = plan[plan_cursor].1;
        }
        result.push((t, cur_edge_rate - cur_plan_rate));
    }
    dedupe_consecutive(result)
}

/// Collapse consecutive breakpoints with an identical rate, keeping the first of each run. Pure
/// bookkeeping: it does not change the function `merge_subtract` computes, only how many
/// breakpoints represent it.
fn dedupe_consecutive(points: Vec<(Time, Rate)>) -> Vec<(Time, Rate)> {
    let mut out: Vec<(Time, Rate)> = Vec::with_capacity(points.len());
    for (t, r) in points {
        if let Some(&(_, last_r)) = out.last() {
            if last_r == r {
                continue;
            }
        }
        out.push((t, r));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{EdgeAttrs, Topology};

    fn single_edge_topology(capacity: f64) -> Topology {
        let mut topo = Topology::new();
        topo.add_edge(
            "a",
            "b",
            EdgeAttrs {
                capacity,
                delay: 1.0,
                cost: 1.0,
            },
        );
        topo
    }

    #[test]
    fn reset_restores_full_capacity() {
        let topo = single_edge_topology(10.0);
        let ledger = Ledger::new(&topo);
        let e = ("a".to_string(), "b".to_string());
        assert_eq!(ledger.residual_at(&e, Time::from(0.0)).unwrap(), 10.0);
        assert_eq!(ledger.residual_at(&e, Time::from(1000.0)).unwrap(), 10.0);
    }

    #[test]
    fn commit_subtracts_plan_rate_over_its_window() {
        let topo = single_edge_topology(10.0);
        let mut ledger = Ledger::new(&topo);
        let e = ("a".to_string(), "b".to_string());
        let plan = vec![
            (Time::from(-1.0), 0.0),
            (Time::from(2.0), 4.0),
            (Time::from(5.0), 0.0),
        ];
        ledger.commit(&[e.clone()], &plan).unwrap();

        assert_eq!(ledger.residual_at(&e, Time::from(0.0)).unwrap(), 10.0);
        assert_eq!(ledger.residual_at(&e, Time::from(2.0)).unwrap(), 6.0);
        assert_eq!(ledger.residual_at(&e, Time::from(4.0)).unwrap(), 6.0);
        assert_eq!(ledger.residual_at(&e, Time::from(5.0)).unwrap(), 10.0);
        assert_eq!(ledger.residual_at(&e, Time::from(100.0)).unwrap(), 10.0);
    }

    #[test]
    fn two_commits_stack_additively() {
        let topo = single_edge_topology(10.0);
        let mut ledger = Ledger::new(&topo);
        let e = ("a".to_string(), "b".to_string());
        let plan_a = vec![
            (Time::from(-1.0), 0.0),
            (Time::from(0.0), 3.0),
            (Time::from(10.0), 0.0),
        ];
        let plan_b = vec![
            (Time::from(-1.0), 0.0),
            (Time::from(2.0), 4.0),
            (Time::from(8.0), 0.0),
        ];
        ledger.commit(&[e.clone()], &plan_a).unwrap();
        ledger.commit(&[e.clone()], &plan_b).unwrap();

        assert_eq!(ledger.residual_at(&e, Time::from(1.0)).unwrap(), 7.0);
        assert_eq!(ledger.residual_at(&e, Time::from(5.0)).unwrap(), 3.0);
        assert_eq!(ledger.residual_at(&e, Time::from(9.0)).unwrap(), 7.0);
        assert_eq!(ledger.residual_at(&e, Time::from(11.0)).unwrap(), 10.0);
    }

    #[test]
    fn commit_never_drives_residual_negative_within_capacity() {
        let topo = single_edge_topology(5.0);
        let mut ledger = Ledger::new(&topo);
        let e = ("a".to_string(), "b".to_string());
        let plan = vec![
            (Time::from(-1.0), 0.0),
            (Time::from(0.0), 5.0),
            (Time::from(3.0), 0.0),
        ];
        ledger.commit(&[e.clone()], &plan).unwrap();
        for t in [0, 1, 2] {
            let r = ledger.residual_at(&e, Time::from(t as f64)).unwrap();
            assert!((0.0..=5.0).contains(&r));
        }
    }

    #[test]
    fn event_times_accumulate_plan_breakpoints() {
        let topo = single_edge_topology(10.0);
        let mut ledger = Ledger::new(&topo);
        let e = ("a".to_string(), "b".to_string());
        let plan = vec![
            (Time::from(-1.0), 0.0),
            (Time::from(2.5), 4.0),
            (Time::from(6.5), 0.0),
        ];
        ledger.commit(&[e], &plan).unwrap();
        let events: Vec<f64> = ledger.event_times().map(|t| t.into_inner()).collect();
        assert!(events.contains(&2.5));
        assert!(events.contains(&6.5));
        assert!(events.contains(&-1.0));
    }

    #[test]
    fn unknown_edge_is_a_typed_error_not_a_panic() {
        let topo = single_edge_topology(10.0);
        let mut ledger = Ledger::new(&topo);
        let bogus = ("x".to_string(), "y".to_string());
        assert_eq!(
            ledger.residual_at(&bogus, Time::from(0.0)),
            Err(LedgerError::UnknownEdge(bogus.clone()))
        );
        assert_eq!(
            ledger.breakpoints(&bogus),
            Err(LedgerError::UnknownEdge(bogus.clone()))
        );
        assert_eq!(
            ledger.commit(&[bogus.clone()], &[(Time::from(-1.0), 0.0)]),
            Err(LedgerError::UnknownEdge(bogus))
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn snapshot_round_trips_through_json() {
        let topo = single_edge_topology(10.0);
        let mut ledger = Ledger::new(&topo);
        let e = ("a".to_string(), "b".to_string());
        let plan = vec![
            (Time::from(-1.0), 0.0),
            (Time::from(2.0), 4.0),
            (Time::from(5.0), 0.0),
        ];
        ledger.commit(&[e.clone()], &plan).unwrap();

        let json = ledger.snapshot().to_json().unwrap();
        let restored = Ledger::from_snapshot(&topo, &LedgerSnapshot::from_json(&json).unwrap());

        assert_eq!(restored.residual_at(&e, Time::from(2.0)).unwrap(), 6.0);
        assert_eq!(restored.residual_at(&e, Time::from(5.0)).unwrap(), 10.0);
        let restored_events: Vec<f64> = restored.event_times().map(|t| t.into_inner()).collect();
        let original_events: Vec<f64> = ledger.event_times().map(|t| t.into_inner()).collect();
        assert_eq!(restored_events, original_events);
    }
}
