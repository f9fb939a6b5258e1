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

//! The [`Flow`] value type: a single transfer request.

/// A single transfer request: `size` Mbit from `src` to `dst`, arriving at `arrival` and due by
/// `arrival + deadline`. Times are in ms, sizes in Mbit, rates (elsewhere) in Gbps — numerically,
/// `ms * Gbps == Mbit`.
///
/// Flows are value objects: once created they are never mutated.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Flow {
    /// Source node name.
    pub src: String,
    /// Destination node name.
    pub dst: String,
    /// Flow size, in Mbit.
    pub size: f64,
    /// Arrival time, in ms.
    pub arrival: f64,
    /// Deadline duration (relative to `arrival`), in ms.
    pub deadline: f64,
}

impl Flow {
    /// Construct a new flow.
    pub fn new(
        src: impl Into<String>,
        dst: impl Into<String>,
        size: f64,
        arrival: f64,
        deadline: f64,
    ) -> Self {
        Flow {
            src: src.into(),
            dst: dst.into(),
            size,
            arrival,
            deadline,
        }
    }

    /// The absolute time by which this flow must finish: `arrival + deadline`.
    pub fn end_time(&self) -> f64 {
        self.arrival + self.deadline
    }
}
