//! The SIMPLE format: geometric nodes and weighted edges, nothing else.

use std::io::{BufRead, Write};

use anyhow::{ensure, Result};

use crate::graph::{EdgeId, GraphInData, GraphOutData, Node, NodeId, Shortcut};

use super::{parse_field, LineReader};

pub(super) fn read<R: BufRead>(reader: &mut LineReader<R>) -> Result<GraphInData> {
    let (nr_of_nodes, nr_of_edges) = reader.read_counts()?;
    let mut nodes = Vec::with_capacity(nr_of_nodes);
    for id in 0..nr_of_nodes {
        let (line_nr, line) = reader.next_data_line()?;
        let mut fields = line.split_whitespace();
        let lat = parse_field(fields.next(), "latitude", line_nr)?;
        let lon = parse_field(fields.next(), "longitude", line_nr)?;
        nodes.push(Node {
            id: id as NodeId,
            lat,
            lon,
            osm_id: None,
            elevation: None,
        });
    }
    let mut edges = Vec::with_capacity(nr_of_edges);
    for id in 0..nr_of_edges {
        let (line_nr, line) = reader.next_data_line()?;
        let mut fields = line.split_whitespace();
        let src: NodeId = parse_field(fields.next(), "source node", line_nr)?;
        let tgt: NodeId = parse_field(fields.next(), "target node", line_nr)?;
        let weight = parse_field(fields.next(), "weight", line_nr)?;
        check_endpoints(src, tgt, nr_of_nodes, line_nr)?;
        edges.push(Shortcut::new_original(id as EdgeId, src, tgt, weight));
    }
    Ok(GraphInData {
        nodes,
        edges,
        meta: Vec::new(),
        levels: None,
    })
}

pub(super) fn write<W: Write>(writer: &mut W, data: &GraphOutData) -> Result<()> {
    writeln!(writer, "{}", data.nodes.len())?;
    writeln!(writer, "{}", data.edges.len())?;
    for node in &data.nodes {
        writeln!(writer, "{} {}", node.lat, node.lon)?;
    }
    for edge in &data.edges {
        writeln!(writer, "{} {} {}", edge.src, edge.tgt, edge.weight)?;
    }
    Ok(())
}

/// Shared endpoint validation for the edge lines of all formats.
pub(super) fn check_endpoints(
    src: NodeId,
    tgt: NodeId,
    nr_of_nodes: usize,
    line_nr: usize,
) -> Result<()> {
    ensure!(
        (src as usize) < nr_of_nodes && (tgt as usize) < nr_of_nodes,
        "Line {}: edge endpoint out of range ({} nodes)",
        line_nr,
        nr_of_nodes
    );
    ensure!(src != tgt, "Line {}: self-loop edge at node {}", line_nr, src);
    Ok(())
}
