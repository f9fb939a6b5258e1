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

//! Statistical workload synthesis: the query-aggregation ("incast") request generator.
//!
//! One request models many senders converging on a single receiver, as in a distributed query
//! shuffle. All flows in a request share `arrival = 0`; deadlines are exponentially distributed
//! and clamped to a minimum, sizes are uniformly distributed, and senders are drawn uniformly
//! from the host pool with replacement.

use rand::Rng;
use rand_distr::{Distribution, Exp, Uniform};

use crate::flow::Flow;

/// Default lower bound (inclusive) on the number of flows in a generated request.
pub const MIN_FLOW_NUMBER: u32 = 1;
/// Default upper bound (exclusive) on the number of flows in a generated request.
pub const MAX_FLOW_NUMBER: u32 = 35;
/// Default mean deadline duration, in ms.
pub const AVR_DEADLINE: f64 = 20.0;
/// Deadlines below this floor are clamped up to it, in ms.
pub const MIN_DEADLINE: f64 = 5.0;
/// Default lower bound (inclusive) on flow size, in KB.
pub const MIN_FLOW_SIZE: f64 = 2.0;
/// Default upper bound (exclusive) on flow size, in KB.
pub const MAX_FLOW_SIZE: f64 = 50.0;

/// Overrides for [`query_aggr`]; any field left `None` falls back to the module constants (or,
/// for `flow_num`, to a random draw from `[min_flow_num, max_flow_num)`).
#[derive(Debug, Clone, Default)]
pub struct QueryAggrParams {
    /// Exact number of flows to generate; if `None`, drawn uniformly from
    /// `[min_flow_num, max_flow_num)`.
    pub flow_num: Option<u32>,
    /// Lower bound for the random `flow_num` draw, default [`MIN_FLOW_NUMBER`].
    pub min_flow_num: Option<u32>,
    /// Upper bound (exclusive) for the random `flow_num` draw, default [`MAX_FLOW_NUMBER`].
    pub max_flow_num: Option<u32>,
    /// Mean deadline duration, default [`AVR_DEADLINE`].
    pub avr_dl: Option<f64>,
    /// Lower bound on flow size in KB, default [`MIN_FLOW_SIZE`].
    pub min_flow_size: Option<f64>,
    /// Upper bound on flow size in KB, default [`MAX_FLOW_SIZE`].
    pub max_flow_size: Option<f64>,
    /// Receiver host; default a random host from `host_lst`, removed from the sender pool.
    pub receiver: Option<String>,
}

/// Generate one query-aggregation request: several senders (drawn uniformly, with replacement,
/// from `host_lst` minus the receiver) sending to a common receiver, all arriving at time 0.
///
/// Flow size is drawn uniformly in KB over `[min_flow_size, max_flow_size)` and converted to
/// Mbit by dividing by 125 (so that `ms * Gbps == Mbit` holds across the crate); deadline is
/// drawn from an exponential distribution with mean `avr_dl` and clamped up to [`MIN_DEADLINE`].
///
/// # Panics
/// Panics if `host_lst` is empty.
pub fn query_aggr(host_lst: &[String], params: QueryAggrParams, rng: &mut impl Rng) -> Vec<Flow> {
    assert!(!host_lst.is_empty(), "host_lst must be non-empty");

    let min_flow_num = params.min_flow_num.unwrap_or(MIN_FLOW_NUMBER);
    let max_flow_num = params.max_flow_num.unwrap_or(MAX_FLOW_NUMBER);
    let flow_num = params
        .flow_num
        .unwrap_or_else(|| rng.gen_range(min_flow_num..max_flow_num));
    let avr_dl = params.avr_dl.unwrap_or(AVR_DEADLINE);
    let min_flow_size = params.min_flow_size.unwrap_or(MIN_FLOW_SIZE);
    let max_flow_size = params.max_flow_size.unwrap_or(MAX_FLOW_SIZE);

    let receiver = params
        .receiver
        .unwrap_or_else(|| host_lst[rng.gen_range(0..host_lst.len())].clone());
    let sender_lst: Vec<&String> = host_lst.iter().filter(|h| **h != receiver).collect();
    let sender_lst: Vec<&String> = if sender_lst.is_empty() {
        host_lst.iter().collect()
    } else {
        sender_lst
    };

    let deadline_dist = Exp::new(1.0 / avr_dl).expect("avr_dl must be positive");
    let size_dist = Uniform::new(min_flow_size, max_flow_size);
    let sender_dist = Uniform::new(0, sender_lst.len());

    let mut request = Vec::with_capacity(flow_num as usize);
    for _ in 0..flow_num {
        let deadline = deadline_dist.sample(rng).max(MIN_DEADLINE);
        let size_kb = size_dist.sample(rng);
        let sender = sender_lst[sender_dist.sample(rng)].clone();
        // Converting KB flow sizes to Mbit flow sizes: ms * Gbps == Mbit.
        request.push(Flow::new(sender, receiver.clone(), size_kb / 125.0, 0.0, deadline));
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn hosts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("H-{i}")).collect()
    }

    #[test]
    fn generates_the_requested_flow_count() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let params = QueryAggrParams {
            flow_num: Some(10),
            ..Default::default()
        };
        let req = query_aggr(&hosts(20), params, &mut rng);
        assert_eq!(req.len(), 10);
    }

    #[test]
    fn all_flows_arrive_at_zero_and_share_receiver() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let params = QueryAggrParams {
            flow_num: Some(5),
            receiver: Some("H-0".to_string()),
            ..Default::default()
        };
        let req = query_aggr(&hosts(10), params, &mut rng);
        for flow in &req {
            assert_eq!(flow.arrival, 0.0);
            assert_eq!(flow.dst, "H-0");
            assert_ne!(flow.src, "H-0");
        }
    }

    #[test]
    fn deadlines_are_clamped_to_the_floor() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let params = QueryAggrParams {
            flow_num: Some(200),
            avr_dl: Some(0.001),
            ..Default::default()
        };
        let req = query_aggr(&hosts(5), params, &mut rng);
        assert!(req.iter().all(|f| f.deadline >= MIN_DEADLINE));
    }

    #[test]
    fn sizes_stay_within_the_converted_bounds() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(9);
        let params = QueryAggrParams {
            flow_num: Some(200),
            min_flow_size: Some(2.0),
            max_flow_size: Some(50.0),
            ..Default::default()
        };
        let req = query_aggr(&hosts(5), params, &mut rng);
        for flow in &req {
            assert!(flow.size >= 2.0 / 125.0);
            assert!(flow.size < 50.0 / 125.0);
        }
    }
}
