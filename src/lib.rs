//! Construction of contraction hierarchies over road-network graphs.
//!
//! The crate reads a directed, weighted graph, contracts its nodes round by
//! round (an independent set per round, contracted in parallel), and writes
//! the augmented search graph back out: every original edge, every shortcut
//! that survived a witness search, and the level assigned to each node.
#![warn(
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    macro_use_extern_crate,
    missing_debug_implementations,
    missing_docs,
    non_ascii_idents,
    noop_method_call,
    single_use_lifetimes,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_crate_dependencies,
    unused_extern_crates,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications
)]
#![warn(clippy::all)]

pub mod contractor;
pub mod graph;
pub mod io;
pub mod logging;
pub mod min_queue;
pub mod selector;
pub mod witness;

pub use contractor::{ContractionParameters, Contractor};
pub use graph::{Graph, GraphInData, GraphOutData, Node, Shortcut};
pub use io::FileFormat;
pub use selector::IndependentSetSelector;
pub use witness::WitnessSearch;

// Dependencies only used in the bin.
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator as _;
