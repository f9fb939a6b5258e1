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

//! Min-hop path search over a [`Topology`], honoring a per-call edge exclusion mask. Neither
//! variant considers capacity — that is [`crate::validate`]'s job.

use std::collections::{HashSet, VecDeque};

use crate::topology::Topology;
use crate::EdgeId;

/// Find a single min-hop path from `src` to `dst`, skipping any edge present in `mask`.
///
/// Ties are broken by BFS discovery order: a node's parent is whichever predecessor first
/// relaxed its distance. Returns `None` if `dst` is unreachable under the mask.
pub fn bfs(topo: &Topology, src: &str, dst: &str, mask: &HashSet<EdgeId>) -> Option<Vec<String>> {
    if src == dst {
        return Some(vec![src.to_string()]);
    }

    let mut dist: std::collections::HashMap<String, u32> = std::collections::HashMap::new();
    let mut parent: std::collections::HashMap<String, String> = std::collections::HashMap::new();
    dist.insert(src.to_string(), 0);
    let mut queue = VecDeque::new();
    queue.push_back(src.to_string());

    'outer: while let Some(u) = queue.pop_front() {
        let du = dist[&u];
        for v in topo.neighbors(&u) {
            if mask.contains(&(u.clone(), v.clone())) {
                continue;
            }
            if dist.contains_key(v) {
                continue;
            }
            dist.insert(v.clone(), du + 1);
            parent.insert(v.clone(), u.clone());
            if v == dst {
                break 'outer;
            }
            queue.push_back(v.clone());
        }
    }

    if !dist.contains_key(dst) {
        return None;
    }

    let mut path = vec![dst.to_string()];
    let mut cur = dst.to_string();
    while cur != src {
        cur = parent[&cur].clone();
        path.push(cur.clone());
    }
    path.reverse();
    Some(path)
}

/// Find every min-hop path from `src` to `dst`, skipping any edge present in `mask`.
///
/// Performs a layered BFS that records, for every node, the *set* of predecessors lying on some
/// min-hop path from `src`, then enumerates all root-to-leaf walks through that predecessor
/// relation by explicit backtracking. The predecessor map is read-only during enumeration (never
/// mutated in place), so distinct branches of the enumeration never interfere with each other.
/// Returns `None` if `dst` is unreachable under the mask.
pub fn ecmp_bfs(
    topo: &Topology,
    src: &str,
    dst: &str,
    mask: &HashSet<EdgeId>,
) -> Option<Vec<Vec<String>>> {
    if src == dst {
        return Some(vec![vec![src.to_string()]]);
    }

    let mut dist: std::collections::HashMap<String, u32> = std::collections::HashMap::new();
    let mut pred: std::collections::HashMap<String, Vec<String>> =
        std::collections::HashMap::new();
    dist.insert(src.to_string(), 0);
    let mut queue = VecDeque::new();
    queue.push_back(src.to_string());

    while let Some(u) = queue.pop_front() {
        let du = dist[&u];
        for v in topo.neighbors(&u) {
            if mask.contains(&(u.clone(), v.clone())) {
                continue;
            }
            match dist.get(v) {
                None => {
                    dist.insert(v.clone(), du + 1);
                    pred.insert(v.clone(), vec![u.clone()]);
                    queue.push_back(v.clone());
                }
                Some(&dv) if dv == du + 1 => {
                    pred.entry(v.clone()).or_default().push(u.clone());
                }
                _ => {}
            }
        }
    }

    if !dist.contains_key(dst) {
        return None;
    }

    let mut paths = Vec::new();
    let mut walk = vec![dst.to_string()];
    backtrack(&pred, src, dst, &mut walk, &mut paths);
    Some(paths)
}

fn backtrack(
    pred: &std::collections::HashMap<String, Vec<String>>,
    src: &str,
    node: &str,
    walk: &mut Vec<String>,
    paths: &mut Vec<Vec<String>>,
) {
    if node == src {
        let mut p = walk.clone();
        p.reverse();
        paths.push(p);
        return;
    }
    let Some(parents) = pred.get(node) else {
        return;
    };
    for parent in parents {
        walk.push(parent.clone());
        backtrack(pred, src, parent, walk, paths);
        walk.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Topology;

    #[test]
    fn bfs_finds_min_hop_path_on_fat_tree() {
        let topo = Topology::fat_tree(4, None).unwrap();
        let mask = HashSet::new();
        let path = bfs(&topo, "H-0-0-0", "H-1-1-1", &mask).unwrap();
        // host -> edge -> aggr -> core -> aggr -> edge -> host
        assert_eq!(path.len(), 7);
        assert_eq!(path.first().unwrap(), "H-0-0-0");
        assert_eq!(path.last().unwrap(), "H-1-1-1");
    }

    #[test]
    fn bfs_respects_mask() {
        let mut topo = Topology::new();
        topo.add_edge("a", "b", Default::default());
        topo.add_edge("b", "c", Default::default());
        topo.add_edge("a", "d", Default::default());
        topo.add_edge("d", "c", Default::default());
        let mut mask = HashSet::new();
        mask.insert(("a".to_string(), "b".to_string()));
        let path = bfs(&topo, "a", "c", &mask).unwrap();
        assert_eq!(path, vec!["a", "d", "c"]);
    }

    #[test]
    fn bfs_returns_none_when_unreachable() {
        let mut topo = Topology::new();
        topo.add_node("a", Default::default());
        topo.add_node("b", Default::default());
        let mask = HashSet::new();
        assert!(bfs(&topo, "a", "b", &mask).is_none());
    }

    #[test]
    fn ecmp_bfs_enumerates_all_min_hop_paths() {
        let mut topo = Topology::new();
        topo.add_edge("a", "b1", Default::default());
        topo.add_edge("a", "b2", Default::default());
        topo.add_edge("b1", "c", Default::default());
        topo.add_edge("b2", "c", Default::default());
        let mask = HashSet::new();
        let mut paths = ecmp_bfs(&topo, "a", "c", &mask).unwrap();
        paths.sort();
        assert_eq!(
            paths,
            vec![
                vec!["a".to_string(), "b1".to_string(), "c".to_string()],
                vec!["a".to_string(), "b2".to_string(), "c".to_string()],
            ]
        );
    }

    #[test]
    fn ecmp_bfs_ignores_longer_paths() {
        let mut topo = Topology::new();
        topo.add_edge("a", "b", Default::default());
        topo.add_edge("b", "c", Default::default());
        topo.add_edge("a", "x", Default::default());
        topo.add_edge("x", "y", Default::default());
        topo.add_edge("y", "c", Default::default());
        let mask = HashSet::new();
        let paths = ecmp_bfs(&topo, "a", "c", &mask).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0], vec!["a", "b", "c"]);
    }
}
