//! The FMI_CH format: FMI extended by node levels and shortcut child ids.

use std::io::{BufRead, Write};

use anyhow::{ensure, Result};

use crate::graph::{EdgeId, GraphInData, GraphOutData, Level};

use super::standard::{parse_osm_edge, parse_osm_node, write_osm_edge, write_osm_node};
use super::{parse_field, LineReader};

pub(super) fn read_ch<R: BufRead>(reader: &mut LineReader<R>) -> Result<GraphInData> {
    let (nr_of_nodes, nr_of_edges) = reader.read_counts()?;
    let mut nodes = Vec::with_capacity(nr_of_nodes);
    let mut levels = Vec::with_capacity(nr_of_nodes);
    for id in 0..nr_of_nodes {
        let (line_nr, line) = reader.next_data_line()?;
        let mut fields = line.split_whitespace();
        let node = parse_osm_node(&mut fields, id, line_nr)?;
        let level: Level = parse_field(fields.next(), "level", line_nr)?;
        nodes.push(node);
        levels.push(level);
    }
    let mut edges = Vec::with_capacity(nr_of_edges);
    let mut meta = Vec::with_capacity(nr_of_edges);
    for id in 0..nr_of_edges {
        let (line_nr, line) = reader.next_data_line()?;
        let mut fields = line.split_whitespace();
        let (mut edge, edge_meta) = parse_osm_edge(&mut fields, id, nr_of_nodes, line_nr)?;
        edge.child1 = parse_child(fields.next(), "first child", nr_of_edges, line_nr)?;
        edge.child2 = parse_child(fields.next(), "second child", nr_of_edges, line_nr)?;
        ensure!(
            edge.child1.is_some() == edge.child2.is_some(),
            "Line {}: a shortcut needs both children",
            line_nr
        );
        edges.push(edge);
        meta.push(edge_meta);
    }
    Ok(GraphInData {
        nodes,
        edges,
        meta,
        levels: Some(levels),
    })
}

pub(super) fn write_ch<W: Write>(writer: &mut W, data: &GraphOutData) -> Result<()> {
    writeln!(writer, "{}", data.nodes.len())?;
    writeln!(writer, "{}", data.edges.len())?;
    for (node, level) in data.nodes.iter().zip(data.levels.iter()) {
        write_osm_node(writer, node)?;
        writeln!(writer, " {}", level)?;
    }
    for (edge, meta) in data.edges.iter().zip(data.meta.iter()) {
        write_osm_edge(writer, edge, meta)?;
        writeln!(
            writer,
            " {} {}",
            edge.child1.map_or(-1, |child| child as i64),
            edge.child2.map_or(-1, |child| child as i64)
        )?;
    }
    Ok(())
}

/// Parses a child edge id, where `-1` means "no child".
fn parse_child(
    field: Option<&str>,
    what: &str,
    nr_of_edges: usize,
    line_nr: usize,
) -> Result<Option<EdgeId>> {
    let child: i64 = parse_field(field, what, line_nr)?;
    if child < 0 {
        return Ok(None);
    }
    ensure!(
        (child as usize) < nr_of_edges,
        "Line {}: {} {} out of range ({} edges)",
        line_nr,
        what,
        child,
        nr_of_edges
    );
    Ok(Some(child as EdgeId))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeMeta, Node, NodeId, Shortcut};
    use std::io::Cursor;

    fn out_data() -> GraphOutData {
        let nodes = (0..3)
            .map(|id| Node {
                id: id as NodeId,
                lat: 48.7 + id as f64,
                lon: 9.1,
                osm_id: Some(100 + id as i64),
                elevation: Some(300.0),
            })
            .collect();
        let edges = vec![
            Shortcut::new_original(0, 0, 1, 1),
            Shortcut {
                id: 1,
                src: 0,
                tgt: 2,
                weight: 3,
                child1: Some(0),
                child2: Some(2),
            },
            Shortcut::new_original(2, 1, 2, 2),
        ];
        GraphOutData {
            nodes,
            levels: vec![2, 1, 3],
            edges,
            meta: vec![
                Some(EdgeMeta {
                    road_type: 3,
                    speed: 50,
                }),
                None,
                Some(EdgeMeta {
                    road_type: 4,
                    speed: 30,
                }),
            ],
        }
    }

    #[test]
    fn round_trip_test() {
        let data = out_data();
        let mut buffer = Vec::new();
        write_ch(&mut buffer, &data).unwrap();
        let mut reader = LineReader::new(Cursor::new(buffer));
        let read_back = read_ch(&mut reader).unwrap();
        assert_eq!(read_back.nodes, data.nodes);
        assert_eq!(read_back.edges, data.edges);
        assert_eq!(read_back.levels, Some(data.levels));
        assert_eq!(read_back.meta[0].road_type, 3);
        // Shortcut edges carry the sentinel payload.
        assert_eq!(read_back.meta[1].road_type, -1);
    }

    #[test]
    fn lone_child_is_rejected_test() {
        let input = "\
2
1
0 100 48.7 9.1 300 1
1 101 48.8 9.1 300 2
0 1 42 3 50 0 -1
";
        let mut reader = LineReader::new(Cursor::new(input));
        let err = read_ch(&mut reader).unwrap_err();
        assert!(err.to_string().contains("both children"));
    }
}
