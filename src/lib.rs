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

#![deny(missing_debug_implementations)]

//! # Flowsched
//!
//! A deadline-aware flow scheduler for data-center networks. Given a directed, capacitated
//! topology (typically a fat-tree) and a batch of transfer requests, each a `(src, dst, size,
//! arrival, deadline)` tuple, this crate decides whether each flow can be admitted, and if so
//! computes a path and a time-varying rate allocation on that path that delivers the flow's full
//! size before its deadline without ever exceeding any edge's residual capacity.
//!
//! ## Main concepts
//!
//! The [`topology::Topology`] is the static, read-only graph (nodes labeled by [`topology::Layer`],
//! edges carrying capacity/delay/cost) that flows are routed over. The [`ledger::Ledger`] is the
//! single piece of mutable state: a time-indexed residual-capacity function per edge, updated only
//! by [`ledger::Ledger::commit`]. [`scheduler::Scheduler`] ties everything together: it orders a
//! batch of [`flow::Flow`]s, drives [`search`] and [`validate`] per flow, and commits admitted
//! flows into the ledger.
//!
//! Three scheduling algorithms are implemented on top of the same ledger and validator:
//! [`scheduler::Scheduler::dr_offline`], [`scheduler::Scheduler::dr_online`] (both iteratively
//! exclude bottleneck edges and retry), and [`scheduler::Scheduler::ecmp_offline`] (tries a single
//! randomly-chosen equal-cost path and fails immediately if it does not fit).
//!
//! ## Example
//!
//! ```
//! use flowsched::prelude::*;
//!
//! let topo = Topology::fat_tree(4, None).unwrap();
//! let mut scheduler = Scheduler::new(topo);
//! let flows = vec![Flow::new("H-0-0-0", "H-1-1-1", 0.8, 0.0, 1.0)];
//! let batch = scheduler.dr_offline(flows).unwrap();
//! assert_eq!(batch.succeeded.len(), 1);
//! ```

pub mod flow;
pub mod ledger;
pub mod prelude;
pub mod request;
pub mod scheduler;
pub mod search;
pub mod topology;
pub mod validate;

pub(crate) type Time = ordered_float::OrderedFloat<f64>;
pub(crate) type Rate = f64;
pub(crate) type EdgeId = (String, String);
