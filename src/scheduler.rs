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

//! The batch scheduler: orders flows, drives the search/validate/exclude loop per flow, and
//! commits or rejects. Two algorithm families live here — Deadline-aware Routing (DR), which
//! iteratively excludes bottleneck edges, and ECMP, which tries exactly one randomly-chosen
//! equal-cost path per flow.

use std::cmp::Ordering;
use std::collections::HashSet;

use rand::Rng;
use thiserror::Error;

use crate::flow::Flow;
use crate::ledger::{Ledger, LedgerError};
use crate::search;
use crate::topology::Topology;
use crate::validate::{self, PathOutcome};
use crate::{EdgeId, Rate, Time};

/// Programmer-error outcomes of the scheduler. Ordinary admission failure is not an error — it
/// is a [`Batch::failed`] entry.
#[derive(Error, Debug, PartialEq)]
pub enum ScheduleError {
    /// A flow named a source or destination node that does not exist in the topology at all
    /// (as opposed to existing but being disconnected, which is a normal [`Batch::failed`]
    /// outcome).
    #[error("flow references unknown node {0:?}")]
    UnknownNode(String),
    /// A path edge produced by search or validation is not part of the scheduler's own ledger.
    /// Unreachable through the public `Scheduler` API — path search only ever returns edges of
    /// the topology the ledger was built from — but surfaced here rather than left to panic, in
    /// case a future caller feeds the ledger a path from elsewhere.
    #[error(transparent)]
    UnknownEdge(#[from] LedgerError),
}

/// Sort key controlling flow admission order. The DR algorithms' only admission-control knob
/// (see the module documentation on order-sensitivity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Ascending flow size. The DR-offline default.
    SizeAscending,
    /// Ascending `(arrival, end_time)`. The DR-online default.
    ArrivalThenEndTime,
    /// Ascending `(arrival, size)`. The ECMP-offline default.
    ArrivalThenSize,
    /// Ascending end time (arrival + deadline). Available but not used by default.
    EndTimeAscending,
}

/// Compare two floats for sort purposes, treating an incomparable (NaN) pair as equal rather than
/// panicking — `Flow` places no constraint against NaN fields, so sorting must tolerate them.
fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn sorted_by(mut flows: Vec<Flow>, key: SortKey) -> Vec<Flow> {
    match key {
        SortKey::SizeAscending => {
            flows.sort_by(|a, b| cmp_f64(a.size, b.size));
        }
        SortKey::ArrivalThenEndTime => {
            flows.sort_by(|a, b| {
                cmp_f64(a.arrival, b.arrival).then_with(|| cmp_f64(a.end_time(), b.end_time()))
            });
        }
        SortKey::ArrivalThenSize => {
            flows.sort_by(|a, b| cmp_f64(a.arrival, b.arrival).then_with(|| cmp_f64(a.size, b.size)));
        }
        SortKey::EndTimeAscending => {
            flows.sort_by(|a, b| cmp_f64(a.end_time(), b.end_time()));
        }
    }
    flows
}

/// One admitted flow: the path it was routed over, its normalized rate plan, and its finish time.
#[derive(Debug, Clone, PartialEq)]
pub struct SuccessRecord {
    /// The flow as submitted.
    pub flow: Flow,
    /// The node sequence of the path it was admitted on.
    pub path: Vec<String>,
    /// The normalized rate-allocation plan committed to the ledger.
    pub plan: Vec<(Time, Rate)>,
    /// The absolute time the flow finishes transmitting.
    pub finish_time: f64,
}

/// The outcome of routing one batch of flows: which succeeded (with their plans) and which
/// failed outright.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// Flows admitted, in the order they were processed.
    pub succeeded: Vec<SuccessRecord>,
    /// Flows rejected outright, in the order they were processed.
    pub failed: Vec<Flow>,
}

impl Batch {
    /// Number of admitted flows.
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    /// Number of rejected flows.
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}

/// Drives the search/validate/commit loop for a batch of flows over one [`Topology`], owning the
/// [`Ledger`] that accumulates commitments across flows within a batch.
///
/// `reset()` (called at the start of every batch entry point below) restores the ledger to fully
/// idle so that independent algorithm runs over the same topology never see each other's
/// commitments — see the concrete scenario requiring reset isolation across successive runs on
/// one instance.
#[derive(Debug)]
pub struct Scheduler {
    topology: Topology,
    ledger: Ledger,
}

impl Scheduler {
    /// Build a scheduler over `topology`, with a freshly reset ledger.
    pub fn new(topology: Topology) -> Self {
        let ledger = Ledger::new(&topology);
        Scheduler { topology, ledger }
    }

    /// The topology this scheduler routes over.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// The current capacity ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    fn check_nodes(&self, flow: &Flow) -> Result<(), ScheduleError> {
        if self.topology.layer(&flow.src).is_none() {
            return Err(ScheduleError::UnknownNode(flow.src.clone()));
        }
        if self.topology.layer(&flow.dst).is_none() {
            return Err(ScheduleError::UnknownNode(flow.dst.clone()));
        }
        Ok(())
    }

    /// Deadline-aware Routing, offline variant: sorts by [`SortKey::SizeAscending`] then routes.
    pub fn dr_offline(&mut self, flows: Vec<Flow>) -> Result<Batch, ScheduleError> {
        self.dr_route(flows, SortKey::SizeAscending)
    }

    /// Deadline-aware Routing, online variant: sorts by [`SortKey::ArrivalThenEndTime`] then
    /// routes.
    pub fn dr_online(&mut self, flows: Vec<Flow>) -> Result<Batch, ScheduleError> {
        self.dr_route(flows, SortKey::ArrivalThenEndTime)
    }

    /// Deadline-aware Routing with an explicit sort key. For each flow, in order: clear the edge
    /// mask, then loop BFS → validate → (commit and succeed) or (exclude bottleneck and retry)
    /// until a path succeeds or none remains. Terminates in at most `|E|` iterations per flow,
    /// since every non-terminal iteration excludes at least one edge.
    pub fn dr_route(&mut self, flows: Vec<Flow>, key: SortKey) -> Result<Batch, ScheduleError> {
        self.ledger.reset(&self.topology);
        for flow in &flows {
            self.check_nodes(flow)?;
        }
        let flows = sorted_by(flows, key);

        let mut batch = Batch::default();
        for flow in flows {
            let mut mask: HashSet<EdgeId> = HashSet::new();
            let mut admitted = None;

            loop {
                let Some(path) = search::bfs(&self.topology, &flow.src, &flow.dst, &mask) else {
                    log::debug!(
                        "dr_route: no path remains for {}->{} under current exclusion mask",
                        flow.src,
                        flow.dst
                    );
                    break;
                };
                let edges = path_edges(&path);
                match validate::validate(&self.ledger, edges, &flow)? {
                    PathOutcome::Feasible {
                        edges,
                        plan,
                        finish_time,
                    } => {
                        self.ledger.commit(&edges, &plan)?;
                        admitted = Some(SuccessRecord {
                            flow: flow.clone(),
                            path,
                            plan,
                            finish_time,
                        });
                        break;
                    }
                    PathOutcome::Infeasible { edge, cumulative } => {
                        log::debug!(
                            "dr_route: excluding bottleneck edge {:?} (cumulative {:.3}) for {}->{}",
                            edge,
                            cumulative,
                            flow.src,
                            flow.dst
                        );
                        mask.insert(edge);
                    }
                }
            }

            match admitted {
                Some(record) => {
                    log::info!(
                        "flow {}->{} ({:.3} Mbit) succeeded, finishing at {:.3}",
                        record.flow.src,
                        record.flow.dst,
                        record.flow.size,
                        record.finish_time
                    );
                    batch.succeeded.push(record);
                }
                None => {
                    log::info!(
                        "flow {}->{} ({:.3} Mbit) failed",
                        flow.src,
                        flow.dst,
                        flow.size
                    );
                    batch.failed.push(flow);
                }
            }
        }

        log::info!(
            "dr_route batch complete: {} succeeded, {} failed",
            batch.success_count(),
            batch.failure_count()
        );
        Ok(batch)
    }

    /// ECMP (PDQ-style): sorts by [`SortKey::ArrivalThenSize`], then for each flow tries exactly
    /// one uniformly-random equal-cost shortest path. No iterative exclusion: an infeasible
    /// path fails the flow immediately.
    pub fn ecmp_offline(
        &mut self,
        flows: Vec<Flow>,
        rng: &mut impl Rng,
    ) -> Result<Batch, ScheduleError> {
        self.ledger.reset(&self.topology);
        for flow in &flows {
            self.check_nodes(flow)?;
        }
        let flows = sorted_by(flows, SortKey::ArrivalThenSize);

        let mut batch = Batch::default();
        for flow in flows {
            let mask: HashSet<EdgeId> = HashSet::new();
            let Some(paths) = search::ecmp_bfs(&self.topology, &flow.src, &flow.dst, &mask) else {
                log::info!("flow {}->{} failed: no path", flow.src, flow.dst);
                batch.failed.push(flow);
                continue;
            };

            let idx = rng.gen_range(0..paths.len());
            let path = paths[idx].clone();
            log::debug!(
                "ecmp_offline: chose path {} of {} candidates for {}->{}",
                idx,
                paths.len(),
                flow.src,
                flow.dst
            );
            let edges = path_edges(&path);
            match validate::validate(&self.ledger, edges, &flow)? {
                PathOutcome::Feasible {
                    edges,
                    plan,
                    finish_time,
                } => {
                    self.ledger.commit(&edges, &plan)?;
                    log::info!(
                        "flow {}->{} ({:.3} Mbit) succeeded, finishing at {:.3}",
                        flow.src,
                        flow.dst,
                        flow.size,
                        finish_time
                    );
                    batch.succeeded.push(SuccessRecord {
                        flow,
                        path,
                        plan,
                        finish_time,
                    });
                }
                PathOutcome::Infeasible { .. } => {
                    log::info!(
                        "flow {}->{} ({:.3} Mbit) failed: chosen path infeasible",
                        flow.src,
                        flow.dst,
                        flow.size
                    );
                    batch.failed.push(flow);
                }
            }
        }

        log::info!(
            "ecmp_offline batch complete: {} succeeded, {} failed",
            batch.success_count(),
            batch.failure_count()
        );
        Ok(batch)
    }
}

fn path_edges(path: &[String]) -> Vec<EdgeId> {
    path.windows(2)
        .map(|w| (w[0].clone(), w[1].clone()))
        .collect()
}
