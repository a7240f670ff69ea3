//! Import / export of the graph files.

mod fmi;
mod simple;
mod standard;

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, bail, ensure, Context, Result};
use clap::ValueEnum;
use log::info;

use crate::graph::{GraphInData, GraphOutData};

/// The supported graph file formats.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FileFormat {
    /// Plain nodes (`lat lon`) and edges (`src tgt weight`).
    #[value(name = "SIMPLE")]
    Simple,
    /// OSM nodes (`id osm_id lat lon elevation`) and edges
    /// (`src tgt weight type speed`).
    #[value(name = "STD")]
    Std,
    /// Like STD, preceded by a `#`-comment header.
    #[value(name = "FMI")]
    Fmi,
    /// FMI extended by per-node levels and per-edge child ids.
    #[value(name = "FMI_CH")]
    FmiCh,
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileFormat::Simple => "SIMPLE",
            FileFormat::Std => "STD",
            FileFormat::Fmi => "FMI",
            FileFormat::FmiCh => "FMI_CH",
        };
        f.write_str(name)
    }
}

/// Checks that a graph read in `informat` carries enough payload to be
/// written in `outformat`.
///
/// SIMPLE input has no OSM node data (osm id, elevation), so it cannot feed
/// the formats that write it. The check runs before any file is touched.
pub fn check_compatibility(informat: FileFormat, outformat: FileFormat) -> Result<()> {
    ensure!(
        outformat != FileFormat::Fmi,
        "FMI is not supported as an output format, use FMI_CH"
    );
    if informat == FileFormat::Simple
        && matches!(outformat, FileFormat::Std | FileFormat::FmiCh)
    {
        bail!(
            "{} input carries no OSM node data: cannot write {} output",
            informat,
            outformat
        );
    }
    Ok(())
}

/// Reads a graph file in the given format.
pub fn read_graph(path: &Path, format: FileFormat) -> Result<GraphInData> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open graph file `{}`", path.display()))?;
    let mut reader = LineReader::new(BufReader::new(file));
    let data = match format {
        FileFormat::Simple => simple::read(&mut reader),
        // FMI differs from STD only by its comment header, which the line
        // reader skips.
        FileFormat::Std | FileFormat::Fmi => standard::read(&mut reader),
        FileFormat::FmiCh => fmi::read_ch(&mut reader),
    }
    .with_context(|| format!("Cannot read {} graph from `{}`", format, path.display()))?;
    info!(
        "Read {} nodes and {} edges from `{}`",
        data.nodes.len(),
        data.edges.len(),
        path.display()
    );
    Ok(data)
}

/// Writes the finalized graph data in the given format.
pub fn write_graph(path: &Path, format: FileFormat, data: &GraphOutData) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Cannot create output file `{}`", path.display()))?;
    let mut writer = BufWriter::new(file);
    match format {
        FileFormat::Simple => simple::write(&mut writer, data),
        FileFormat::Std => standard::write(&mut writer, data),
        FileFormat::Fmi => bail!("FMI is not supported as an output format"),
        FileFormat::FmiCh => fmi::write_ch(&mut writer, data),
    }
    .with_context(|| format!("Cannot write {} graph to `{}`", format, path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Cannot write {} graph to `{}`", format, path.display()))?;
    info!(
        "Wrote {} nodes and {} edges to `{}`",
        data.nodes.len(),
        data.edges.len(),
        path.display()
    );
    Ok(())
}

/// Line-oriented reader tracking line numbers and skipping comments.
pub(crate) struct LineReader<R> {
    reader: R,
    buffer: String,
    line_nr: usize,
}

impl<R: BufRead> LineReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        LineReader {
            reader,
            buffer: String::new(),
            line_nr: 0,
        }
    }

    /// Returns the next non-empty, non-comment line, trimmed, together with
    /// its line number.
    pub(crate) fn next_data_line(&mut self) -> Result<(usize, &str)> {
        loop {
            self.buffer.clear();
            let nr_read = self
                .reader
                .read_line(&mut self.buffer)
                .with_context(|| format!("Failed to read line {}", self.line_nr + 1))?;
            if nr_read == 0 {
                bail!("Unexpected end of file after line {}", self.line_nr);
            }
            self.line_nr += 1;
            let line = self.buffer.trim();
            if !line.is_empty() && !line.starts_with('#') {
                break;
            }
        }
        Ok((self.line_nr, self.buffer.trim()))
    }

    /// Reads the header: node count and edge count, one per line.
    pub(crate) fn read_counts(&mut self) -> Result<(usize, usize)> {
        let (line_nr, line) = self.next_data_line()?;
        let nr_of_nodes = parse_field(Some(line), "node count", line_nr)?;
        let (line_nr, line) = self.next_data_line()?;
        let nr_of_edges = parse_field(Some(line), "edge count", line_nr)?;
        Ok((nr_of_nodes, nr_of_edges))
    }
}

/// Parses a whitespace-separated field, reporting the line on failure.
pub(crate) fn parse_field<T: FromStr>(
    field: Option<&str>,
    what: &str,
    line_nr: usize,
) -> Result<T> {
    let field = field.ok_or_else(|| anyhow!("Line {}: missing {}", line_nr, what))?;
    field
        .parse()
        .map_err(|_| anyhow!("Line {}: invalid {} `{}`", line_nr, what, field))
}
