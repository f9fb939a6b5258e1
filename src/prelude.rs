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

//! Convenience re-export of the common members.

pub use crate::flow::Flow;
pub use crate::ledger::{Ledger, LedgerError};
#[cfg(feature = "serde")]
pub use crate::ledger::LedgerSnapshot;
pub use crate::request::{query_aggr, QueryAggrParams};
pub use crate::scheduler::{Batch, ScheduleError, Scheduler, SortKey, SuccessRecord};
pub use crate::topology::{Layer, Topology, TopologyError};
pub use crate::validate::PathOutcome;
