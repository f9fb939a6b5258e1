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

//! The static network topology: nodes, directed edges, the fat-tree constructor and the
//! line-oriented topology text format.
//!
//! Deliberately implemented as a plain adjacency list keyed by node name rather than on top of a
//! graph crate: the topology is small, read-only after construction, and every consumer in this
//! crate only ever needs "capacity of edge (u, v)" and "successors of u".

use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;
use thiserror::Error;

/// Layer of a node in a layered data-center topology.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Layer {
    /// A host (leaf of the topology).
    Host,
    /// A top-of-rack / edge switch.
    Edge,
    /// An aggregation switch.
    Aggr,
    /// A core switch.
    Core,
    /// A layer that does not match any of the four well-known names. Carries the raw,
    /// upper-cased token as it appeared in the topology file (the default is the literal `"-1"`,
    /// matching the original format's unset sentinel).
    Other(String),
}

impl Default for Layer {
    fn default() -> Self {
        Layer::Other("-1".to_string())
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Host => write!(f, "HOST"),
            Layer::Edge => write!(f, "EDGE"),
            Layer::Aggr => write!(f, "AGGR"),
            Layer::Core => write!(f, "CORE"),
            Layer::Other(s) => write!(f, "{s}"),
        }
    }
}

impl Layer {
    /// Parse a layer token, case-insensitively, falling back to [`Layer::Other`] for anything
    /// that isn't one of the four well-known names.
    pub fn parse(token: &str) -> Layer {
        let upper = token.to_uppercase();
        match upper.as_str() {
            "HOST" => Layer::Host,
            "EDGE" => Layer::Edge,
            "AGGR" => Layer::Aggr,
            "CORE" => Layer::Core,
            _ => Layer::Other(upper),
        }
    }
}

/// Static, read-only attributes of a directed edge.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeAttrs {
    /// Link capacity, in Gbps.
    pub capacity: f64,
    /// Link propagation delay, in ms.
    pub delay: f64,
    /// Routing cost / metric.
    pub cost: f64,
}

impl Default for EdgeAttrs {
    fn default() -> Self {
        EdgeAttrs {
            capacity: 1.0,
            delay: 1.0,
            cost: 1.0,
        }
    }
}

/// Errors produced while constructing or parsing a [`Topology`].
#[derive(Error, Debug, PartialEq)]
pub enum TopologyError {
    /// The fat-tree arity `k` must be a positive, even number.
    #[error("fat-tree arity must be a positive even number, got {0}")]
    InvalidFatTreeArity(u32),
    /// A numeric field in the topology file could not be parsed, at the given 1-based line
    /// number.
    #[error("line {line}: cannot parse {field:?} as a number: {text:?}")]
    ParseFloat {
        /// 1-based line number in the source text.
        line: usize,
        /// Which field failed to parse (`"Capacity"`, `"Delay"`, or `"Cost"`).
        field: &'static str,
        /// The offending token.
        text: String,
    },
    /// An edge line appeared before any `[NODES]`/`[EDGES]` section header.
    #[error("line {0}: edge or node line outside of a [NODES]/[EDGES] section")]
    MissingSection(usize),
    /// A node or edge line did not have enough whitespace-separated tokens.
    #[error("line {0}: expected at least {1} fields")]
    TooFewFields(usize, usize),
}

/// A directed, capacitated graph of named nodes.
///
/// Construction happens through [`Topology::fat_tree`] or [`parse`]; once built, a `Topology` is
/// immutable — attributes never change after construction (residual capacity over time lives in
/// [`crate::ledger::Ledger`], not here).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Topology {
    layers: HashMap<String, Layer>,
    adjacency: HashMap<String, Vec<String>>,
    edges: HashMap<(String, String), EdgeAttrs>,
}

impl Topology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with the given layer. Re-adding an existing node overwrites its layer.
    pub fn add_node(&mut self, name: impl Into<String>, layer: Layer) {
        let name = name.into();
        self.adjacency.entry(name.clone()).or_default();
        self.layers.insert(name, layer);
    }

    /// Add a directed edge `u -> v` with the given attributes, implicitly adding `u`/`v` as
    /// nodes (with an unset layer) if they do not already exist.
    pub fn add_edge(&mut self, u: impl Into<String>, v: impl Into<String>, attrs: EdgeAttrs) {
        let u = u.into();
        let v = v.into();
        self.adjacency.entry(u.clone()).or_default();
        self.adjacency.entry(v.clone()).or_default();
        self.layers.entry(u.clone()).or_default();
        self.layers.entry(v.clone()).or_default();
        self.adjacency.get_mut(&u).unwrap().push(v.clone());
        self.edges.insert((u, v), attrs);
    }

    /// Iterator over all node names.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.adjacency.keys().map(String::as_str)
    }

    /// Iterator over all directed edges as `(u, v)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.keys().map(|(u, v)| (u.as_str(), v.as_str()))
    }

    /// The number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Direct successors of `u`, in the order they were added.
    pub fn neighbors(&self, u: &str) -> &[String] {
        self.adjacency
            .get(u)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The static attributes of edge `(u, v)`, if it exists.
    pub fn edge_attrs(&self, u: &str, v: &str) -> Option<EdgeAttrs> {
        self.edges.get(&(u.to_string(), v.to_string())).copied()
    }

    /// The layer of a node, if it exists.
    pub fn layer(&self, node: &str) -> Option<&Layer> {
        self.layers.get(node)
    }

    /// All node names carrying the given layer.
    pub fn nodes_with_layer(&self, layer: &Layer) -> Vec<&str> {
        self.layers
            .iter()
            .filter(|(_, l)| *l == layer)
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Optional per-layer bandwidth/delay/cost overrides for [`Topology::fat_tree`].
    pub fn fat_tree_default_attrs() -> FatTreeAttrs {
        FatTreeAttrs::default()
    }

    /// Build a `k`-ary fat-tree: `k` pods, `k/2` edge and aggregation switches per pod, `k²/4`
    /// core switches, and `k³/4` hosts, bidirectionally connected.
    ///
    /// Node naming follows the original layout: hosts `H-{pod}-{edge}-{index}`, edge switches
    /// `E-{pod}-{edge}`, aggregation switches `A-{pod}-{idx}`, core switches `C-{idx}`.
    pub fn fat_tree(k: u32, attrs: Option<FatTreeAttrs>) -> Result<Topology, TopologyError> {
        if k == 0 || k % 2 != 0 {
            return Err(TopologyError::InvalidFatTreeArity(k));
        }
        let attrs = attrs.unwrap_or_default();
        let half = k / 2;
        let mut topo = Topology::new();

        for i in 0..k {
            for j in 0..half {
                topo.add_node(format!("E-{i}-{j}"), Layer::Edge);
            }
            for j in 0..half {
                topo.add_node(format!("A-{i}-{j}"), Layer::Aggr);
            }
            for j in 0..half {
                for l in 0..half {
                    topo.add_node(format!("H-{i}-{j}-{l}"), Layer::Host);
                }
            }
        }
        for i in 0..(k * k / 4) {
            topo.add_node(format!("C-{i}"), Layer::Core);
        }

        let edge_attrs = EdgeAttrs {
            capacity: attrs.edge_bw.or(attrs.bw).unwrap_or(1.0),
            delay: attrs.edge_dl.or(attrs.dl).unwrap_or(1.0),
            cost: attrs.edge_ct.or(attrs.ct).unwrap_or(1.0),
        };
        let aggr_attrs = EdgeAttrs {
            capacity: attrs.aggr_bw.or(attrs.bw).unwrap_or(1.0),
            delay: attrs.aggr_dl.or(attrs.dl).unwrap_or(1.0),
            cost: attrs.aggr_ct.or(attrs.ct).unwrap_or(1.0),
        };
        let core_attrs = EdgeAttrs {
            capacity: attrs.core_bw.or(attrs.bw).unwrap_or(1.0),
            delay: attrs.core_dl.or(attrs.dl).unwrap_or(1.0),
            cost: attrs.core_ct.or(attrs.ct).unwrap_or(1.0),
        };

        for i in 0..k {
            for j in 0..half {
                let esw = format!("E-{i}-{j}");
                for l in 0..half {
                    let h = format!("H-{i}-{j}-{l}");
                    topo.add_edge(&esw, &h, edge_attrs);
                    topo.add_edge(&h, &esw, edge_attrs);

                    let asw = format!("A-{i}-{l}");
                    topo.add_edge(&asw, &esw, aggr_attrs);
                    topo.add_edge(&esw, &asw, aggr_attrs);
                }
                let asw = format!("A-{i}-{j}");
                for l in 0..half {
                    let csw = format!("C-{}", j * half + l);
                    topo.add_edge(&csw, &asw, core_attrs);
                    topo.add_edge(&asw, &csw, core_attrs);
                }
            }
        }

        Ok(topo)
    }

    /// Serialize back into the line-oriented topology text format understood by [`parse`].
    pub fn write(&self) -> String {
        let node_lines = self
            .nodes()
            .sorted_unstable()
            .map(|n| format!("{n} {}", self.layers[n]))
            .join("\n");
        let edge_lines = self
            .edges
            .iter()
            .sorted_unstable_by_key(|(key, _)| key.clone())
            .map(|((u, v), a)| format!("{u} {v} {} {} {}", a.capacity, a.delay, a.cost))
            .join("\n");

        format!("[DIRECTED]\n\n[NODES]\n{node_lines}\n\n[EDGES]\n{edge_lines}\n")
    }
}

/// Per-layer bandwidth/delay/cost overrides for the fat-tree constructor.
///
/// Each per-layer field falls back to the matching generic field (`bw`/`dl`/`ct`) if unset, which
/// in turn falls back to `1.0` — the same three-level fallback `DRTopo.py`'s `FatTree()` applies
/// per layer/attribute pair (`edge_bw` -> `bw` -> `DEF_BW`, and so on for `dl`/`ct`).
#[derive(Debug, Clone, Copy, Default)]
pub struct FatTreeAttrs {
    /// Host-to-edge-switch link capacity override, in Gbps.
    pub edge_bw: Option<f64>,
    /// Edge-to-aggregation-switch link capacity override, in Gbps.
    pub aggr_bw: Option<f64>,
    /// Aggregation-to-core-switch link capacity override, in Gbps.
    pub core_bw: Option<f64>,
    /// Host-to-edge-switch link delay override, in ms.
    pub edge_dl: Option<f64>,
    /// Edge-to-aggregation-switch link delay override, in ms.
    pub aggr_dl: Option<f64>,
    /// Aggregation-to-core-switch link delay override, in ms.
    pub core_dl: Option<f64>,
    /// Host-to-edge-switch link cost override.
    pub edge_ct: Option<f64>,
    /// Edge-to-aggregation-switch link cost override.
    pub aggr_ct: Option<f64>,
    /// Aggregation-to-core-switch link cost override.
    pub core_ct: Option<f64>,
    /// Generic capacity override, used by any layer whose own `_bw` field is unset.
    pub bw: Option<f64>,
    /// Generic delay override, used by any layer whose own `_dl` field is unset.
    pub dl: Option<f64>,
    /// Generic cost override, used by any layer whose own `_ct` field is unset.
    pub ct: Option<f64>,
}

#[derive(PartialEq)]
enum Section {
    None,
    Nodes,
    Edges,
}

/// Parse the line-oriented topology text format.
///
/// `#` comments and blank lines are ignored. `[DIRECTED]`/`[UNDIRECTED]` (case-insensitive) set
/// the directedness mode for subsequent `[EDGES]`; in undirected mode every edge line adds both
/// directions with identical attributes. `[NODES]` lines are `NAME [LAYER]` (default layer is the
/// unset sentinel). `[EDGES]` lines are `U V [CAP [DELAY [COST]]]`, each missing trailing field
/// defaulting to `1`.
pub fn parse(text: &str) -> Result<Topology, TopologyError> {
    let mut topo = Topology::new();
    let mut directed = true;
    let mut section = Section::None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            match line.to_uppercase().as_str() {
                "[DIRECTED]" => directed = true,
                "[UNDIRECTED]" => directed = false,
                "[NODES]" => section = Section::Nodes,
                "[EDGES]" => section = Section::Edges,
                _ => {}
            }
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        match section {
            Section::None => return Err(TopologyError::MissingSection(line_no)),
            Section::Nodes => {
                if fields.is_empty() {
                    return Err(TopologyError::TooFewFields(line_no, 1));
                }
                let layer = fields
                    .get(1)
                    .map(|s| Layer::parse(s))
                    .unwrap_or_default();
                topo.add_node(fields[0], layer);
            }
            Section::Edges => {
                if fields.len() < 2 {
                    return Err(TopologyError::TooFewFields(line_no, 2));
                }
                let cap = parse_field(&fields, 2, "Capacity", line_no)?;
                let delay = parse_field(&fields, 3, "Delay", line_no)?;
                let cost = parse_field(&fields, 4, "Cost", line_no)?;
                let attrs = EdgeAttrs {
                    capacity: cap,
                    delay,
                    cost,
                };
                topo.add_edge(fields[0], fields[1], attrs);
                if !directed {
                    topo.add_edge(fields[1], fields[0], attrs);
                }
            }
        }
    }

    Ok(topo)
}

fn parse_field(
    fields: &[&str],
    index: usize,
    name: &'static str,
    line_no: usize,
) -> Result<f64, TopologyError> {
    match fields.get(index) {
        None => Ok(1.0),
        Some(text) => text.parse::<f64>().map_err(|_| TopologyError::ParseFloat {
            line: line_no,
            field: name,
            text: text.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fat_tree_rejects_odd_or_zero_k() {
        assert_eq!(
            Topology::fat_tree(0, None),
            Err(TopologyError::InvalidFatTreeArity(0))
        );
        assert_eq!(
            Topology::fat_tree(3, None),
            Err(TopologyError::InvalidFatTreeArity(3))
        );
    }

    #[test]
    fn fat_tree_k4_node_counts() {
        let topo = Topology::fat_tree(4, None).unwrap();
        assert_eq!(topo.nodes_with_layer(&Layer::Host).len(), 16);
        assert_eq!(topo.nodes_with_layer(&Layer::Edge).len(), 8);
        assert_eq!(topo.nodes_with_layer(&Layer::Aggr).len(), 8);
        assert_eq!(topo.nodes_with_layer(&Layer::Core).len(), 4);
    }

    #[test]
    fn fat_tree_is_bidirectional() {
        let topo = Topology::fat_tree(4, None).unwrap();
        assert!(topo.edge_attrs("H-0-0-0", "E-0-0").is_some());
        assert!(topo.edge_attrs("E-0-0", "H-0-0-0").is_some());
    }

    #[test]
    fn fat_tree_attrs_fall_back_through_generic_before_default() {
        // edge_bw set directly, aggr/core left to fall back to the generic `bw`, which itself
        // overrides the 1.0 default.
        let attrs = FatTreeAttrs {
            edge_bw: Some(40.0),
            bw: Some(10.0),
            ..Default::default()
        };
        let topo = Topology::fat_tree(4, Some(attrs)).unwrap();
        assert_eq!(
            topo.edge_attrs("H-0-0-0", "E-0-0").unwrap().capacity,
            40.0
        );
        assert_eq!(topo.edge_attrs("A-0-0", "E-0-0").unwrap().capacity, 10.0);
        assert_eq!(topo.edge_attrs("C-0", "A-0-0").unwrap().capacity, 10.0);
    }

    #[test]
    fn parse_defaults_missing_edge_fields_to_one() {
        let text = "[DIRECTED]\n[NODES]\na\nb\n[EDGES]\na b\n";
        let topo = parse(text).unwrap();
        let attrs = topo.edge_attrs("a", "b").unwrap();
        assert_eq!(attrs.capacity, 1.0);
        assert_eq!(attrs.delay, 1.0);
        assert_eq!(attrs.cost, 1.0);
    }

    #[test]
    fn parse_undirected_adds_both_directions() {
        let text = "[UNDIRECTED]\n[NODES]\na\nb\n[EDGES]\na b 10 2 3\n";
        let topo = parse(text).unwrap();
        assert!(topo.edge_attrs("a", "b").is_some());
        assert!(topo.edge_attrs("b", "a").is_some());
    }

    #[test]
    fn parse_rejects_bad_numeric_field() {
        let text = "[DIRECTED]\n[NODES]\na\nb\n[EDGES]\na b notanumber\n";
        let err = parse(text).unwrap_err();
        assert!(matches!(err, TopologyError::ParseFloat { line: 4, .. }));
    }

    #[test]
    fn write_then_parse_round_trips() {
        let topo = Topology::fat_tree(4, None).unwrap();
        let text = topo.write();
        let reparsed = parse(&text).unwrap();
        assert_eq!(topo.edge_count(), reparsed.edge_count());
        for (u, v) in topo.edges() {
            assert_eq!(topo.edge_attrs(u, v), reparsed.edge_attrs(u, v));
        }
        for n in topo.nodes() {
            assert_eq!(topo.layer(n), reparsed.layer(n));
        }
    }
}
