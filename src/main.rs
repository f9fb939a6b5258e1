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

use clap::Parser;
use rand::SeedableRng;

use flowsched::prelude::*;
use flowsched::topology::Layer;

/// Build a fat-tree, synthesize query-aggregation batches against it, and run all three
/// scheduling algorithms over the same batches to compare mean admission rates.
#[derive(Debug, Parser)]
struct Cli {
    /// Fat-tree arity (must be a positive even number).
    #[clap(long = "arity", short = 'k', default_value_t = 4)]
    arity: u32,
    /// Number of query-aggregation requests synthesized per batch.
    #[clap(long = "requests", short = 'r', default_value_t = 40)]
    requests: u32,
    /// Number of flows generated per request.
    #[clap(long = "flows", short = 'f', default_value_t = 20)]
    flows_per_request: u32,
    /// Number of independent batches to average admission counts over.
    #[clap(long = "batches", short = 'b', default_value_t = 50)]
    batches: u32,
    /// RNG seed, for reproducible batches.
    #[clap(long = "seed", short = 's', default_value_t = 0)]
    seed: u64,
}

fn main() {
    pretty_env_logger::init_timed();
    let args = Cli::parse();

    let topo = Topology::fat_tree(args.arity, None).expect("arity must be a positive even number");
    let hosts: Vec<String> = topo
        .nodes_with_layer(&Layer::Host)
        .into_iter()
        .map(str::to_string)
        .collect();
    log::info!(
        "built fat-tree k={} with {} hosts, {} edges",
        args.arity,
        hosts.len(),
        topo.edge_count()
    );

    let mut rng = rand::rngs::StdRng::seed_from_u64(args.seed);

    let mut dr_offline_succ = 0usize;
    let mut dr_offline_fail = 0usize;
    let mut dr_online_succ = 0usize;
    let mut dr_online_fail = 0usize;
    let mut ecmp_succ = 0usize;
    let mut ecmp_fail = 0usize;

    for run in 0..args.batches {
        log::info!("run {} of {} in process", run + 1, args.batches);

        let mut flows = Vec::new();
        for _ in 0..args.requests {
            let params = QueryAggrParams {
                flow_num: Some(args.flows_per_request),
                ..Default::default()
            };
            flows.extend(query_aggr(&hosts, params, &mut rng));
        }

        let mut scheduler = Scheduler::new(topo.clone());

        let batch = scheduler
            .dr_offline(flows.clone())
            .expect("flows reference only known hosts");
        dr_offline_succ += batch.success_count();
        dr_offline_fail += batch.failure_count();

        let batch = scheduler
            .dr_online(flows.clone())
            .expect("flows reference only known hosts");
        dr_online_succ += batch.success_count();
        dr_online_fail += batch.failure_count();

        let batch = scheduler
            .ecmp_offline(flows, &mut rng)
            .expect("flows reference only known hosts");
        ecmp_succ += batch.success_count();
        ecmp_fail += batch.failure_count();
    }

    let n = args.batches as f64;
    println!("Algorithm: Deadline-aware Routing Offline");
    println!("\tSucceeded: {:.3}", dr_offline_succ as f64 / n);
    println!("\tFailed: {:.3}", dr_offline_fail as f64 / n);
    println!("Algorithm: Deadline-aware Routing Online");
    println!("\tSucceeded: {:.3}", dr_online_succ as f64 / n);
    println!("\tFailed: {:.3}", dr_online_fail as f64 / n);
    println!("Algorithm: PDQ + ECMP Offline");
    println!("\tSucceeded: {:.3}", ecmp_succ as f64 / n);
    println!("\tFailed: {:.3}", ecmp_fail as f64 / n);
}
