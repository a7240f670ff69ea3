// This file is part of ch-constructor.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! End-to-end tests through the file formats: determinism of the output
//! bytes and reconstruction from an FMI_CH file.
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use ch_constructor::contractor::{ContractionParameters, Contractor};
use ch_constructor::graph::{EdgeId, Graph, GraphInData, NodeId, Shortcut, Weight};
use ch_constructor::io::{self, FileFormat};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ch_constructor_{}_{}", std::process::id(), name))
}

/// A 3 x 3 bidirectional grid with uneven weights, as FMI text.
fn fmi_input() -> String {
    let n = 3;
    let mut edges: Vec<(usize, usize, Weight)> = Vec::new();
    let weight = |i: usize, j: usize| ((i * 7 + j * 13) % 5 + 1) as Weight;
    for x in 0..n {
        for y in 0..n - 1 {
            let (i, j) = (x + y * n, x + (y + 1) * n);
            edges.push((i, j, weight(i, j)));
            edges.push((j, i, weight(j, i)));
        }
    }
    for x in 0..n - 1 {
        for y in 0..n {
            let (i, j) = (x + y * n, x + 1 + y * n);
            edges.push((i, j, weight(i, j)));
            edges.push((j, i, weight(j, i)));
        }
    }
    let mut text = String::from("# test graph\n# generated in-code\n\n");
    writeln!(text, "{}", n * n).unwrap();
    writeln!(text, "{}", edges.len()).unwrap();
    for id in 0..n * n {
        writeln!(text, "{} {} 48.{} 9.{} 300", id, 1000 + id, id, id).unwrap();
    }
    for (src, tgt, weight) in edges {
        writeln!(text, "{} {} {} 2 50", src, tgt, weight).unwrap();
    }
    text
}

fn construct(data: GraphInData, nr_of_threads: usize) -> Graph {
    let nr_of_nodes = data.nodes.len();
    let mut graph = Graph::init(data);
    let mut contractor =
        Contractor::new(&mut graph, nr_of_threads, ContractionParameters::default()).unwrap();
    let mut pool: Vec<NodeId> = (0..nr_of_nodes as NodeId).collect();
    contractor.quick_contract(&mut pool);
    contractor.contract(&mut pool);
    assert!(pool.is_empty());
    graph
}

#[test]
fn deterministic_output_test() {
    let infile = temp_path("det_in.graph");
    fs::write(&infile, fmi_input()).unwrap();

    let mut outputs = Vec::new();
    for run in 0..2 {
        let outfile = temp_path(&format!("det_out_{}.graph", run));
        let data = io::read_graph(&infile, FileFormat::Fmi).unwrap();
        let graph = construct(data, 4);
        io::write_graph(&outfile, FileFormat::FmiCh, &graph.export()).unwrap();
        outputs.push(fs::read(&outfile).unwrap());
        let _ = fs::remove_file(&outfile);
    }
    let _ = fs::remove_file(&infile);

    assert!(!outputs[0].is_empty());
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn fmi_ch_reconstruction_test() {
    let infile = temp_path("rt_in.graph");
    let outfile = temp_path("rt_out.graph");
    fs::write(&infile, fmi_input()).unwrap();

    let data = io::read_graph(&infile, FileFormat::Fmi).unwrap();
    let graph = construct(data, 2);
    let out = graph.export();
    let first_shortcuts = shortcut_triples(out.edges.iter());
    assert!(!first_shortcuts.is_empty());
    io::write_graph(&outfile, FileFormat::FmiCh, &out).unwrap();

    // Read the FMI_CH file back, strip levels and shortcuts, re-run the
    // construction: the shortcut structure must come out the same.
    let read_back = io::read_graph(&outfile, FileFormat::FmiCh).unwrap();
    assert!(read_back.levels.is_some());
    let mut edges = Vec::new();
    let mut meta = Vec::new();
    for (edge, edge_meta) in read_back.edges.iter().zip(read_back.meta.iter()) {
        if !edge.is_shortcut() {
            let id = edges.len() as EdgeId;
            edges.push(Shortcut::new_original(id, edge.src, edge.tgt, edge.weight));
            meta.push(*edge_meta);
        }
    }
    let stripped = GraphInData {
        nodes: read_back.nodes,
        edges,
        meta,
        levels: None,
    };

    let second = construct(stripped, 2).export();
    assert_eq!(first_shortcuts, shortcut_triples(second.edges.iter()));

    let _ = fs::remove_file(&infile);
    let _ = fs::remove_file(&outfile);
}

fn shortcut_triples<'a>(
    edges: impl Iterator<Item = &'a Shortcut>,
) -> Vec<(NodeId, NodeId, Weight)> {
    let mut triples: Vec<_> = edges
        .filter(|e| e.is_shortcut())
        .map(|e| (e.src, e.tgt, e.weight))
        .collect();
    triples.sort_unstable();
    triples
}

#[test]
fn incompatible_formats_are_rejected_test() {
    assert!(io::check_compatibility(FileFormat::Simple, FileFormat::FmiCh).is_err());
    assert!(io::check_compatibility(FileFormat::FmiCh, FileFormat::Simple).is_ok());
}

#[test]
fn missing_input_file_test() {
    let err = io::read_graph(&temp_path("does_not_exist.graph"), FileFormat::Fmi).unwrap_err();
    assert!(err.to_string().contains("Cannot open"));
}

#[test]
fn malformed_input_file_test() {
    let infile = temp_path("malformed.graph");
    fs::write(&infile, "2\n1\n0 1000 48.0 9.0 300\n1 1001 48.1 9.1 300\n0 nope 3 2 50\n")
        .unwrap();
    let err = io::read_graph(&infile, FileFormat::Fmi).unwrap_err();
    assert!(format!("{:#}", err).contains("Line 5"));
    let _ = fs::remove_file(&infile);
}
