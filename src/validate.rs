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

//! Turn a candidate path into a feasible time-varying rate plan, or reject it and name the
//! bottleneck edge.
//!
//! Rates are plain floating point throughout; comparisons are plain inequalities with no epsilon
//! smoothing, matching the numerical contract this algorithm was specified with.

use crate::flow::Flow;
use crate::ledger::{Ledger, LedgerError};
use crate::{EdgeId, Rate, Time};

/// Outcome of validating one candidate path against one flow.
#[derive(Debug, Clone, PartialEq)]
pub enum PathOutcome {
    /// The path can carry the flow to completion before its deadline.
    Feasible {
        /// The edges of the validated path.
        edges: Vec<EdgeId>,
        /// The normalized rate-allocation plan (see [`alloc_trim`]).
        plan: Vec<(Time, Rate)>,
        /// The absolute time at which the flow finishes.
        finish_time: f64,
    },
    /// The path cannot carry the flow to completion before its deadline.
    Infeasible {
        /// The edge with the smallest standalone cumulative deliverable volume over the flow's
        /// window — the bottleneck to exclude before retrying.
        edge: EdgeId,
        /// That edge's standalone cumulative deliverable volume, in Mbit.
        cumulative: f64,
    },
}

/// Validate `path_edges` against `flow`, returning a feasible rate plan or the bottleneck edge.
///
/// See the module documentation for the numerical contract. A zero-size flow is always
/// immediately [`PathOutcome::Feasible`] at its arrival time — the general integration below
/// would divide by zero computing its finish time if the path happened to be idle exactly at
/// `arrival`, so it is special-cased rather than left to fall out of the arithmetic.
///
/// # Errors
/// Returns [`LedgerError::UnknownEdge`] if any edge in `path_edges` is not part of the topology
/// `ledger` was built from.
pub fn validate(
    ledger: &Ledger,
    path_edges: Vec<EdgeId>,
    flow: &Flow,
) -> Result<PathOutcome, LedgerError> {
    if flow.size <= 0.0 {
        return Ok(PathOutcome::Feasible {
            edges: path_edges,
            plan: vec![(Time::from(-1.0), 0.0)],
            finish_time: flow.arrival,
        });
    }

    let arrival = flow.arrival;
    let end_time = flow.end_time();

    // The bottleneck rate of the path, sampled at every time any edge in the topology has ever
    // changed. No new times are introduced here; see the module-level Ledger documentation.
    let mut path_rate: Vec<(f64, Rate)> = Vec::new();
    for t in ledger.event_times() {
        let mut rate = f64::INFINITY;
        for e in &path_edges {
            rate = rate.min(ledger.residual_at(e, t)?);
        }
        path_rate.push((t.into_inner(), rate));
    }

    let mut prev_time = arrival;
    let mut prev_rate = 0.0_f64;
    let mut cumulative = 0.0_f64;
    let mut seg_end = arrival;
    let mut alloc: Vec<(Time, Rate)> = Vec::new();
    let mut feasible = false;

    for &(time, rate) in &path_rate {
        if time > prev_time {
            if time < end_time {
                cumulative += prev_rate * (time - prev_time);
                seg_end = time;
            } else {
                cumulative += prev_rate * (end_time - prev_time);
                seg_end = end_time;
            }
            alloc.push((Time::from(prev_time), prev_rate));

            if cumulative >= flow.size {
                feasible = true;
                break;
            }
            if time >= end_time {
                break;
            }
        }
        prev_time = time;
        prev_rate = rate;
    }

    if feasible {
        cumulative -= prev_rate * (seg_end - prev_time);
        let finish_time = (flow.size - cumulative) / prev_rate + prev_time;
        alloc.push((Time::from(finish_time), 0.0));
        return Ok(PathOutcome::Feasible {
            edges: path_edges,
            plan: alloc_trim(alloc),
            finish_time,
        });
    }

    let (edge, cumulative) = find_minimal_edge(ledger, &path_edges, flow)?;
    Ok(PathOutcome::Infeasible { edge, cumulative })
}

/// Normalize a raw allocation sequence: find the last index with a positive rate and, if it is
/// not the very first entry, drop everything before it (collapsing any leading idle history into
/// a single sentinel), then prepend the `(-1, 0)` sentinel unconditionally.
pub fn alloc_trim(raw: Vec<(Time, Rate)>) -> Vec<(Time, Rate)> {
    let mut last_positive: Option<usize> = None;
    for (i, &(_, rate)) in raw.iter().enumerate() {
        if rate > 0.0 {
            last_positive = Some(i);
        }
    }
    let mut trimmed = match last_positive {
        Some(k) if k > 0 => raw[k..].to_vec(),
        _ => raw,
    };
    trimmed.insert(0, (Time::from(-1.0), 0.0));
    trimmed
}

/// Find the edge in `edges` with the smallest standalone cumulative deliverable volume over
/// `flow`'s window, computed against that edge's own breakpoints alone (not the path bottleneck).
/// Ties go to the first edge encountered.
fn find_minimal_edge(
    ledger: &Ledger,
    edges: &[EdgeId],
    flow: &Flow,
) -> Result<(EdgeId, f64), LedgerError> {
    let arrival = flow.arrival;
    let end_time = flow.end_time();

    let mut min_edge: Option<EdgeId> = None;
    let mut min_cumulative = f64::INFINITY;

    for edge in edges {
        let mut prev_time = arrival;
        let mut prev_rate = 0.0_f64;
        let mut cumulative = 0.0_f64;

        for &(time, rate) in ledger.breakpoints(edge)? {
            let time = time.into_inner();
            if time > arrival {
                if time < end_time {
                    cumulative += prev_rate * (time - prev_time);
                } else {
                    cumulative += prev_rate * (end_time - prev_time);
                    break;
                }
            }
            if cumulative >= min_cumulative {
                break;
            } else if time >= end_time {
                break;
            }
            prev_time = time;
            prev_rate = rate;
        }

        if cumulative < min_cumulative {
            min_cumulative = cumulative;
            min_edge = Some(edge.clone());
        }
    }

    Ok((
        min_edge.expect("a path has at least one edge"),
        min_cumulative,
    ))
}
