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

//! Binary to build a contraction hierarchy from a road-network graph file.
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

use ch_constructor::contractor::{ContractionParameters, Contractor};
use ch_constructor::graph::{Graph, NodeId};
use ch_constructor::io::{self, FileFormat};
use ch_constructor::logging;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Build a contraction hierarchy from a road-network graph.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Read the input graph from this file
    #[arg(short, long)]
    infile: PathBuf,
    /// Format of the input file (SIMPLE, STD, FMI)
    #[arg(short = 'f', long, value_enum, default_value_t = FileFormat::Fmi)]
    informat: FileFormat,
    /// Write the result graph to this file
    #[arg(short, long, default_value = "ch_out.graph")]
    outfile: PathBuf,
    /// Format of the output file (SIMPLE, STD, FMI_CH)
    #[arg(short = 'g', long, value_enum, default_value_t = FileFormat::FmiCh)]
    outformat: FileFormat,
    /// Number of threads to use in the calculations
    #[arg(short, long, default_value_t = 1)]
    threads: usize,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Help and version go to stdout and exit 0; real argument
            // errors exit 1.
            let code = u8::from(err.use_stderr());
            let _ = err.print();
            return ExitCode::from(code);
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run(args: Args) -> Result<()> {
    logging::initialize_logging(LevelFilter::Info)?;
    io::check_compatibility(args.informat, args.outformat)?;

    let data = io::read_graph(&args.infile, args.informat)?;
    let mut graph = Graph::init(data);

    let parameters = ContractionParameters::default();
    let mut pool: Vec<NodeId> = (0..graph.nr_of_nodes() as NodeId).collect();
    let mut contractor = Contractor::new(&mut graph, args.threads, parameters)?;
    contractor.quick_contract(&mut pool);
    contractor.contract(&mut pool);

    let data = graph.export();
    io::write_graph(&args.outfile, args.outformat, &data)
}
