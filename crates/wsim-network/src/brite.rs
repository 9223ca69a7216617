//! BRITE topology file reader.
//!
//! Parses the plain-text output format of the BRITE topology generator: a `Nodes:` section followed by an
//! `Edges:` section. Only the fields the simulator cares about are read (node count, edge endpoints, bandwidth,
//! delay); the rest of each line (AS ids, edge type, position, ...) is ignored.

use std::collections::HashMap;

use thiserror::Error;

use crate::link::Link;
use crate::node::Node;
use crate::topology::Topology;

#[derive(Debug, Error)]
pub enum BriteParseError {
    #[error("missing 'Nodes:' section")]
    MissingNodesSection,
    #[error("missing 'Edges:' section")]
    MissingEdgesSection,
    #[error("malformed node line: {0}")]
    MalformedNode(String),
    #[error("malformed edge line: {0}")]
    MalformedEdge(String),
    #[error("edge references unknown node id {0}")]
    UnknownNode(u64),
}

/// Parses a BRITE-format topology file into a [`Topology`].
///
/// Node bandwidth/delay units follow BRITE convention (bandwidth in Mbps, delay in ms); both are converted to the
/// simulator's native units (bit/s, plain time units) on the way in.
pub fn parse_brite(contents: &str) -> Result<Topology, BriteParseError> {
    let lines: Vec<&str> = contents.lines().collect();

    let nodes_start = lines
        .iter()
        .position(|l| l.trim_start().starts_with("Nodes:"))
        .ok_or(BriteParseError::MissingNodesSection)?;
    let edges_start = lines
        .iter()
        .position(|l| l.trim_start().starts_with("Edges:"))
        .ok_or(BriteParseError::MissingEdgesSection)?;

    let mut topology = Topology::new();
    let mut node_ids: HashMap<u64, usize> = HashMap::new();

    for line in &lines[nodes_start + 1..edges_start] {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let brite_id: u64 = fields
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| BriteParseError::MalformedNode(line.to_string()))?;
        let node_id = topology.add_node(Node {
            name: format!("node{}", brite_id),
        });
        node_ids.insert(brite_id, node_id);
    }

    for line in &lines[edges_start + 1..] {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        // <id> <src> <dst> <length> <delay_ms> <bandwidth_mbps> ...
        if fields.len() < 6 {
            return Err(BriteParseError::MalformedEdge(line.to_string()));
        }
        let parse_u64 = |s: &str| s.parse::<u64>().map_err(|_| BriteParseError::MalformedEdge(line.to_string()));
        let parse_f64 = |s: &str| s.parse::<f64>().map_err(|_| BriteParseError::MalformedEdge(line.to_string()));

        let src_brite = parse_u64(fields[1])?;
        let dst_brite = parse_u64(fields[2])?;
        let delay_ms = parse_f64(fields[4])?;
        let bandwidth_mbps = parse_f64(fields[5])?;

        let src = *node_ids.get(&src_brite).ok_or(BriteParseError::UnknownNode(src_brite))?;
        let dst = *node_ids.get(&dst_brite).ok_or(BriteParseError::UnknownNode(dst_brite))?;

        let bandwidth_bps = bandwidth_mbps * 1e6;
        let delay = delay_ms / 1000.;
        topology.add_link(src, dst, Link::shared(bandwidth_bps, delay));
    }

    Ok(topology)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Topology: ( 3 Nodes, 2 Edges )
Model (1 - Waxman): ...

Nodes: ( 3 )
0\t0.0\t0.0\t1\t1\t-1\tNode_Type
1\t1.0\t1.0\t2\t2\t-1\tNode_Type
2\t2.0\t2.0\t1\t1\t-1\tNode_Type

Edges: ( 2 )
0\t0\t1\t1.41\t2.0\t10.0\t-1\t-1\tE_AS\tU
1\t1\t2\t1.41\t3.0\t5.0\t-1\t-1\tE_AS\tU
";

    #[test]
    fn parses_sample_topology() {
        let topology = parse_brite(SAMPLE).unwrap();
        assert_eq!(topology.node_count(), 3);
        assert_eq!(topology.link_count(), 2);
        let link = topology.link(0);
        assert_eq!(link.bandwidth, 10e6);
        assert_eq!(link.latency, 0.002);
    }

    #[test]
    fn missing_sections_error() {
        assert!(matches!(parse_brite("nothing here"), Err(BriteParseError::MissingNodesSection)));
    }

    #[test]
    fn unknown_edge_endpoint_errors() {
        let bad = "Nodes: ( 1 )\n0\t0\t0\t1\t1\t-1\tT\n\nEdges: ( 1 )\n0\t0\t5\t1.0\t1.0\t1.0\t-1\t-1\tE\tU\n";
        assert!(matches!(parse_brite(bad), Err(BriteParseError::UnknownNode(5))));
    }
}
