//! The STD format: OSM nodes and edges with road type and speed.

use std::io::{BufRead, Write};

use anyhow::{anyhow, ensure, Result};

use crate::graph::{EdgeId, EdgeMeta, GraphInData, GraphOutData, Node, NodeId, Shortcut};

use super::simple::check_endpoints;
use super::{parse_field, LineReader};

pub(super) fn read<R: BufRead>(reader: &mut LineReader<R>) -> Result<GraphInData> {
    let (nr_of_nodes, nr_of_edges) = reader.read_counts()?;
    let mut nodes = Vec::with_capacity(nr_of_nodes);
    for id in 0..nr_of_nodes {
        let (line_nr, line) = reader.next_data_line()?;
        let mut fields = line.split_whitespace();
        nodes.push(parse_osm_node(&mut fields, id, line_nr)?);
    }
    let mut edges = Vec::with_capacity(nr_of_edges);
    let mut meta = Vec::with_capacity(nr_of_edges);
    for id in 0..nr_of_edges {
        let (line_nr, line) = reader.next_data_line()?;
        let mut fields = line.split_whitespace();
        let (edge, edge_meta) = parse_osm_edge(&mut fields, id, nr_of_nodes, line_nr)?;
        edges.push(edge);
        meta.push(edge_meta);
    }
    Ok(GraphInData {
        nodes,
        edges,
        meta,
        levels: None,
    })
}

pub(super) fn write<W: Write>(writer: &mut W, data: &GraphOutData) -> Result<()> {
    writeln!(writer, "{}", data.nodes.len())?;
    writeln!(writer, "{}", data.edges.len())?;
    for node in &data.nodes {
        write_osm_node(writer, node)?;
        writeln!(writer)?;
    }
    for (edge, meta) in data.edges.iter().zip(data.meta.iter()) {
        write_osm_edge(writer, edge, meta)?;
        writeln!(writer)?;
    }
    Ok(())
}

/// Parses `id osm_id lat lon elevation`, checking the id against the line
/// position.
pub(super) fn parse_osm_node(
    fields: &mut std::str::SplitWhitespace<'_>,
    position: usize,
    line_nr: usize,
) -> Result<Node> {
    let id: NodeId = parse_field(fields.next(), "node id", line_nr)?;
    ensure!(
        id as usize == position,
        "Line {}: node id {} does not match its position {}",
        line_nr,
        id,
        position
    );
    let osm_id = parse_field(fields.next(), "osm id", line_nr)?;
    let lat = parse_field(fields.next(), "latitude", line_nr)?;
    let lon = parse_field(fields.next(), "longitude", line_nr)?;
    let elevation = parse_field(fields.next(), "elevation", line_nr)?;
    Ok(Node {
        id,
        lat,
        lon,
        osm_id: Some(osm_id),
        elevation: Some(elevation),
    })
}

/// Parses `src tgt weight type speed`.
pub(super) fn parse_osm_edge(
    fields: &mut std::str::SplitWhitespace<'_>,
    id: usize,
    nr_of_nodes: usize,
    line_nr: usize,
) -> Result<(Shortcut, EdgeMeta)> {
    let src: NodeId = parse_field(fields.next(), "source node", line_nr)?;
    let tgt: NodeId = parse_field(fields.next(), "target node", line_nr)?;
    let weight = parse_field(fields.next(), "weight", line_nr)?;
    let road_type = parse_field(fields.next(), "road type", line_nr)?;
    let speed = parse_field(fields.next(), "speed", line_nr)?;
    check_endpoints(src, tgt, nr_of_nodes, line_nr)?;
    Ok((
        Shortcut::new_original(id as EdgeId, src, tgt, weight),
        EdgeMeta { road_type, speed },
    ))
}

pub(super) fn write_osm_node<W: Write>(writer: &mut W, node: &Node) -> Result<()> {
    let osm_id = node
        .osm_id
        .ok_or_else(|| anyhow!("Node {} has no OSM id", node.id))?;
    let elevation = node
        .elevation
        .ok_or_else(|| anyhow!("Node {} has no elevation", node.id))?;
    write!(
        writer,
        "{} {} {} {} {}",
        node.id, osm_id, node.lat, node.lon, elevation
    )?;
    Ok(())
}

pub(super) fn write_osm_edge<W: Write>(
    writer: &mut W,
    edge: &Shortcut,
    meta: &Option<EdgeMeta>,
) -> Result<()> {
    let meta = meta.unwrap_or(EdgeMeta {
        road_type: -1,
        speed: -1,
    });
    write!(
        writer,
        "{} {} {} {} {}",
        edge.src, edge.tgt, edge.weight, meta.road_type, meta.speed
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_test() {
        let input = "\
2
2
0 100001 48.7 9.1 310.5
1 100002 48.8 9.2 320
0 1 42 3 50
1 0 43 3 50
";
        let mut reader = LineReader::new(Cursor::new(input));
        let data = read(&mut reader).unwrap();
        assert_eq!(data.nodes[0].osm_id, Some(100001));
        assert_eq!(data.nodes[1].elevation, Some(320.0));
        assert_eq!(data.edges[1].weight, 43);
        assert_eq!(
            data.meta[0],
            EdgeMeta {
                road_type: 3,
                speed: 50
            }
        );
    }

    #[test]
    fn node_id_mismatch_test() {
        let input = "1\n0\n3 100001 48.7 9.1 310\n";
        let mut reader = LineReader::new(Cursor::new(input));
        let err = read(&mut reader).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }
}
